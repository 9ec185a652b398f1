//! Polymorphic content item variants.
//!
//! Each supported item kind (`text`, `button`, `image`, `backgroundView`)
//! has a typed variant struct whose serde shape matches the nested fragment
//! documents the server embeds in `itemJSON`. All variants satisfy the
//! [`OnboardingItem`] capability: they own an `id`, a `background_color`,
//! and can produce a structurally identical copy under a freshly generated
//! id.

use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

/// Common capability of every variant: identity, background color, and a
/// deep value copy with a fresh id.
pub trait OnboardingItem {
    fn id(&self) -> &str;
    fn background_color(&self) -> &str;
    /// Structurally identical copy under a newly generated id.
    fn copied(&self) -> Self
    where
        Self: Sized;
}

/// Text-styling capability shared by `text` and `button` variants. Consumed
/// read-only by the rendering layer, which is outside this crate.
pub trait CustomizableItem: OnboardingItem {
    fn text(&self) -> &str;
    fn font_size(&self) -> f64;
    fn font_weight(&self) -> &str;
    fn font_color(&self) -> &str;
    fn alignment(&self) -> TextAlignment;
    fn font_family(&self) -> &str;
    fn padding(&self) -> Padding;
}

/// Horizontal alignment of a text-bearing item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextAlignment {
    Center,
    Left,
    Right,
}

/// Which configured font slot a text item pulls from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FontStyle {
    Primary,
    Secondary,
    Cta,
}

impl FontStyle {
    fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "primary" => Some(Self::Primary),
            "secondary" => Some(Self::Secondary),
            "cta" => Some(Self::Cta),
            _ => None,
        }
    }
}

/// The server treats `fontStyle` as a free-form string, so a tag outside the
/// known set decodes to `None` instead of failing the whole fragment.
fn lenient_font_style<'de, D>(deserializer: D) -> Result<Option<FontStyle>, D::Error>
where
    D: Deserializer<'de>,
{
    let tag = Option::<String>::deserialize(deserializer)?;
    Ok(tag.as_deref().and_then(FontStyle::from_tag))
}

/// Edge insets for an item, in points.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Padding {
    pub leading: f64,
    pub trailing: f64,
    pub top: f64,
    pub bottom: f64,
}

impl Default for Padding {
    fn default() -> Self {
        Self {
            leading: 20.0,
            trailing: 20.0,
            top: 0.0,
            bottom: 20.0,
        }
    }
}

/// A styled text block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextItem {
    pub id: String,
    pub text: String,
    pub font_size: f64,
    pub font_weight: String,
    pub font_color: String,
    pub alignment: TextAlignment,
    #[serde(rename = "font")]
    pub font_family: String,
    pub padding: Padding,
    pub background_color: String,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient_font_style"
    )]
    pub font_style: Option<FontStyle>,
}

impl Default for TextItem {
    fn default() -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            text: "Text".to_string(),
            font_size: 18.0,
            font_weight: "Regular".to_string(),
            font_color: "#000000".to_string(),
            alignment: TextAlignment::Center,
            font_family: "SFProText".to_string(),
            padding: Padding::default(),
            background_color: "#00000000".to_string(),
            font_style: Some(FontStyle::Primary),
        }
    }
}

impl OnboardingItem for TextItem {
    fn id(&self) -> &str {
        &self.id
    }
    fn background_color(&self) -> &str {
        &self.background_color
    }
    fn copied(&self) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            ..self.clone()
        }
    }
}

impl CustomizableItem for TextItem {
    fn text(&self) -> &str {
        &self.text
    }
    fn font_size(&self) -> f64 {
        self.font_size
    }
    fn font_weight(&self) -> &str {
        &self.font_weight
    }
    fn font_color(&self) -> &str {
        &self.font_color
    }
    fn alignment(&self) -> TextAlignment {
        self.alignment
    }
    fn font_family(&self) -> &str {
        &self.font_family
    }
    fn padding(&self) -> Padding {
        self.padding
    }
}

/// A call-to-action button.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ButtonItem {
    pub id: String,
    pub text: String,
    pub font_size: f64,
    pub font_weight: String,
    pub font_color: String,
    pub alignment: TextAlignment,
    #[serde(rename = "font")]
    pub font_family: String,
    pub background_color: String,
    pub padding: Padding,
    pub corner_radius: f64,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient_font_style"
    )]
    pub font_style: Option<FontStyle>,
}

impl Default for ButtonItem {
    fn default() -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            text: "Text".to_string(),
            font_size: 18.0,
            font_weight: "Regular".to_string(),
            font_color: "#000000".to_string(),
            alignment: TextAlignment::Center,
            font_family: "SFProText".to_string(),
            background_color: "#333333".to_string(),
            padding: Padding::default(),
            corner_radius: 20.0,
            font_style: Some(FontStyle::Cta),
        }
    }
}

impl OnboardingItem for ButtonItem {
    fn id(&self) -> &str {
        &self.id
    }
    fn background_color(&self) -> &str {
        &self.background_color
    }
    fn copied(&self) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            ..self.clone()
        }
    }
}

impl CustomizableItem for ButtonItem {
    fn text(&self) -> &str {
        &self.text
    }
    fn font_size(&self) -> f64 {
        self.font_size
    }
    fn font_weight(&self) -> &str {
        &self.font_weight
    }
    fn font_color(&self) -> &str {
        &self.font_color
    }
    fn alignment(&self) -> TextAlignment {
        self.alignment
    }
    fn font_family(&self) -> &str {
        &self.font_family
    }
    fn padding(&self) -> Padding {
        self.padding
    }
}

/// Width and height of a fixed-size item, in points.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ItemSize {
    pub width: f64,
    pub height: f64,
}

impl Default for ItemSize {
    fn default() -> Self {
        Self {
            width: 200.0,
            height: 200.0,
        }
    }
}

/// An inline image referenced by URL.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageItem {
    pub id: String,
    pub padding: Padding,
    pub size: ItemSize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    pub background_color: String,
    pub corner_radius: f64,
}

impl Default for ImageItem {
    fn default() -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            padding: Padding::default(),
            size: ItemSize::default(),
            url: None,
            background_color: "#000000".to_string(),
            corner_radius: 0.0,
        }
    }
}

impl OnboardingItem for ImageItem {
    fn id(&self) -> &str {
        &self.id
    }
    fn background_color(&self) -> &str {
        &self.background_color
    }
    fn copied(&self) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            ..self.clone()
        }
    }
}

/// What a background view renders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackgroundKind {
    Image,
    Video,
    None,
}

/// Full-screen background: a color, optionally overlaid by an image or video
/// referenced by URL or carried inline as bytes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackgroundItem {
    pub id: String,
    pub background_color: String,
    #[serde(
        rename = "data",
        default,
        skip_serializing_if = "Option::is_none",
        with = "base64_bytes"
    )]
    pub raw_bytes: Option<Vec<u8>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(rename = "type")]
    pub kind: BackgroundKind,
}

impl Default for BackgroundItem {
    fn default() -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            background_color: "#000000".to_string(),
            raw_bytes: None,
            url: None,
            kind: BackgroundKind::None,
        }
    }
}

impl OnboardingItem for BackgroundItem {
    fn id(&self) -> &str {
        &self.id
    }
    fn background_color(&self) -> &str {
        &self.background_color
    }
    fn copied(&self) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            ..self.clone()
        }
    }
}

/// The tagged union over every variant with a registered fragment decoder.
#[derive(Debug, Clone, PartialEq)]
pub enum Variant {
    Text(TextItem),
    Button(ButtonItem),
    Image(ImageItem),
    Background(BackgroundItem),
}

impl Variant {
    pub fn id(&self) -> &str {
        match self {
            Self::Text(v) => v.id(),
            Self::Button(v) => v.id(),
            Self::Image(v) => v.id(),
            Self::Background(v) => v.id(),
        }
    }

    pub fn background_color(&self) -> &str {
        match self {
            Self::Text(v) => v.background_color(),
            Self::Button(v) => v.background_color(),
            Self::Image(v) => v.background_color(),
            Self::Background(v) => v.background_color(),
        }
    }

    /// Deep value copy with a fresh nested id, delegating to the variant's
    /// own `copied()`.
    pub fn copied(&self) -> Self {
        match self {
            Self::Text(v) => Self::Text(v.copied()),
            Self::Button(v) => Self::Button(v.copied()),
            Self::Image(v) => Self::Image(v.copied()),
            Self::Background(v) => Self::Background(v.copied()),
        }
    }

    /// Serialize this variant into a fresh fragment string.
    pub(crate) fn to_fragment(&self) -> Result<String, serde_json::Error> {
        match self {
            Self::Text(v) => serde_json::to_string(v),
            Self::Button(v) => serde_json::to_string(v),
            Self::Image(v) => serde_json::to_string(v),
            Self::Background(v) => serde_json::to_string(v),
        }
    }
}

/// Serde adapter: `Option<Vec<u8>>` as a standard base64 string, matching how
/// the authoring side encodes inline background bytes.
mod base64_bytes {
    use base64::Engine as _;
    use base64::engine::general_purpose::STANDARD;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(bytes: &Option<Vec<u8>>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match bytes {
            Some(b) => serializer.serialize_str(&STANDARD.encode(b)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Vec<u8>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let encoded = Option::<String>::deserialize(deserializer)?;
        match encoded {
            Some(s) => STANDARD
                .decode(s.as_bytes())
                .map(Some)
                .map_err(serde::de::Error::custom),
            None => Ok(None),
        }
    }
}
