//! Remotely-authored onboarding delivery engine.
//!
//! A server returns a session token plus an ordered list of screens built
//! from polymorphic content items; this crate fetches and caches that
//! payload, walks the screens as a linear state machine, and reports
//! progress telemetry. Rendering, secure storage, and media loading stay
//! outside as collaborators.

pub mod cache;
pub mod config;
pub mod content;
pub mod engine;
pub mod error;
pub mod model;
pub mod navigation;
pub mod net;
