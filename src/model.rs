//! Wire models for the onboarding API.
//!
//! Field names mirror the server contract exactly (`apiKey`, `deviceID`,
//! `onboardingID`, ...), so every struct carries explicit serde renames where
//! camelCase alone does not cut it.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::content::item::{self, ContentItem};

/// Body of `POST /initializeApp`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InitializeRequest {
    pub api_key: String,
    #[serde(rename = "deviceID")]
    pub device_id: String,
    #[serde(rename = "deviceOS")]
    pub device_os: String,
    pub app_version: String,
    pub device_model: String,
    pub device_locale: String,
    pub app_store_country: String,
}

/// Full onboarding payload: session token plus the ordered screen list.
///
/// Immutable once received; a newer payload replaces the cached one
/// wholesale, never via partial merge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OnboardingPayload {
    pub onboarding: Onboarding,
    pub session: Session,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Onboarding {
    pub id: i64,
    #[serde(rename = "onboardingID")]
    pub onboarding_id: i64,
    pub screens: Vec<Screen>,
}

/// One onboarding screen. Screen order is significant and preserved from the
/// wire payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Screen {
    pub id: i64,
    pub title: String,
    #[serde(with = "item::lenient_items")]
    pub items: Vec<ContentItem>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub token: String,
}

/// Body of `POST /sendEvent`.
#[derive(Debug, Clone, Serialize)]
pub struct EventRequest {
    pub event: String,
    pub attributes: HashMap<String, String>,
}

/// Structured error payload decoded from 4xx/5xx bodies. The server is free
/// to send an empty object (or nothing at all), so every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct ErrorDetails {
    pub error: Option<String>,
    pub message: Option<String>,
}

/// Response type for calls whose body is ignored.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EmptyResponse {}
