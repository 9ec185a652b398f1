//! Polymorphic screen content: typed variants and the item codec.

pub mod item;
pub mod variant;

pub use item::{ContentItem, ContentItemWire, ItemType};
pub use variant::{
    BackgroundItem, BackgroundKind, ButtonItem, CustomizableItem, FontStyle, ImageItem,
    ItemSize, OnboardingItem, Padding, TextAlignment, TextItem, Variant,
};
