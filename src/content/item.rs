//! Content item codec.
//!
//! The wire shape for an item is `{id, name, type, itemJSON?}` where
//! `itemJSON` is a nested serialized document carrying the fields of the
//! variant matching `type`. The codec owns the tagged-variant dispatch table,
//! the defensive fragment normalization, and the copy contract (fresh ids at
//! both the item and variant level).

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::content::variant::{BackgroundItem, ButtonItem, ImageItem, TextItem, Variant};
use crate::error::CodecError;

/// Closed enumeration of item kinds the protocol defines. Unknown wire values
/// are rejected at decode time, never coerced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemType {
    Spacer,
    Text,
    Image,
    Button,
    Video,
    BackgroundView,
    Progress,
    Gradient,
}

impl ItemType {
    /// Parse a wire tag. The only place unknown tags are turned into errors.
    pub fn parse(tag: &str) -> Result<Self, CodecError> {
        match tag {
            "spacer" => Ok(Self::Spacer),
            "text" => Ok(Self::Text),
            "image" => Ok(Self::Image),
            "button" => Ok(Self::Button),
            "video" => Ok(Self::Video),
            "backgroundView" => Ok(Self::BackgroundView),
            "progress" => Ok(Self::Progress),
            "gradient" => Ok(Self::Gradient),
            other => Err(CodecError::UnknownItemType(other.to_string())),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Spacer => "spacer",
            Self::Text => "text",
            Self::Image => "image",
            Self::Button => "button",
            Self::Video => "video",
            Self::BackgroundView => "backgroundView",
            Self::Progress => "progress",
            Self::Gradient => "gradient",
        }
    }
}

impl std::fmt::Display for ItemType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raw wire form of a content item.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentItemWire {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub item_type: String,
    #[serde(rename = "itemJSON", default, skip_serializing_if = "Option::is_none")]
    pub item_json: Option<String>,
}

/// A single renderable unit within a screen.
#[derive(Debug, Clone, PartialEq)]
pub struct ContentItem {
    pub id: String,
    pub name: String,
    pub item_type: ItemType,
    /// The fragment exactly as received, kept for diagnostics.
    pub fragment: Option<String>,
    pub variant: Option<Variant>,
}

type FragmentDecoder = fn(&str) -> Result<Variant, serde_json::Error>;

/// Dispatch table from item type to fragment decoder. Types without an entry
/// tolerate a present fragment by decoding to `variant = None`; new variants
/// are supported by adding a row here, never by open-ended inspection.
fn fragment_decoder(item_type: ItemType) -> Option<FragmentDecoder> {
    match item_type {
        ItemType::Text => Some(|s| serde_json::from_str::<TextItem>(s).map(Variant::Text)),
        ItemType::Button => Some(|s| serde_json::from_str::<ButtonItem>(s).map(Variant::Button)),
        ItemType::Image => Some(|s| serde_json::from_str::<ImageItem>(s).map(Variant::Image)),
        ItemType::BackgroundView => {
            Some(|s| serde_json::from_str::<BackgroundItem>(s).map(Variant::Background))
        }
        _ => None,
    }
}

/// Decode a fragment for a supported type, normalizing transport escaping
/// first if the verbatim text does not parse. The authoring pipeline has been
/// seen double-escaping backslashes, so a failed parse gets one retry with
/// `\\` collapsed to `\`.
fn decode_fragment(
    item_type: ItemType,
    item_id: &str,
    raw: &str,
) -> Result<Option<Variant>, CodecError> {
    let Some(decoder) = fragment_decoder(item_type) else {
        return Ok(None);
    };

    match decoder(raw) {
        Ok(variant) => Ok(Some(variant)),
        Err(first_err) => {
            let unescaped = raw.replace("\\\\", "\\");
            if unescaped != raw {
                if let Ok(variant) = decoder(&unescaped) {
                    return Ok(Some(variant));
                }
            }
            Err(CodecError::InvalidFragment {
                item_type: item_type.as_str(),
                item_id: item_id.to_string(),
                source: first_err,
            })
        }
    }
}

impl ContentItem {
    /// Build an item around a variant, deriving type, display name, and
    /// fragment from it.
    pub fn new(variant: Variant) -> Self {
        let item_type = match &variant {
            Variant::Text(_) => ItemType::Text,
            Variant::Button(_) => ItemType::Button,
            Variant::Image(_) => ItemType::Image,
            Variant::Background(_) => ItemType::BackgroundView,
        };
        let fragment = variant.to_fragment().ok();
        Self {
            id: Uuid::new_v4().to_string(),
            name: capitalized(item_type.as_str()),
            item_type,
            fragment,
            variant: Some(variant),
        }
    }

    /// Build a variant-less item (spacer, progress, ...).
    pub fn bare(item_type: ItemType) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name: capitalized(item_type.as_str()),
            item_type,
            fragment: None,
            variant: None,
        }
    }

    /// Decode one wire item. Strict: an unknown `type` fails, and a present
    /// fragment that does not structurally decode for a *supported* type
    /// fails. A fragment on an unsupported type decodes to `variant = None`.
    pub fn decode(wire: &ContentItemWire) -> Result<Self, CodecError> {
        let item_type = ItemType::parse(&wire.item_type)?;
        let variant = match wire.item_json.as_deref() {
            Some(raw) => decode_fragment(item_type, &wire.id, raw)?,
            None => None,
        };
        Ok(Self {
            id: wire.id.clone(),
            name: wire.name.clone(),
            item_type,
            fragment: wire.item_json.clone(),
            variant,
        })
    }

    /// Re-serialize to the wire shape. Scalar fields are encoded directly;
    /// `itemJSON` is re-derived from the current variant, if any.
    pub fn encode(&self) -> Result<ContentItemWire, CodecError> {
        let item_json = match &self.variant {
            Some(variant) => Some(variant.to_fragment()?),
            None => None,
        };
        Ok(ContentItemWire {
            id: self.id.clone(),
            name: self.name.clone(),
            item_type: self.item_type.as_str().to_string(),
            item_json,
        })
    }

    /// Deep value copy: fresh item id, the variant's own copy (fresh nested
    /// id), fragment re-derived from the copied variant. `name` and type are
    /// preserved.
    pub fn copy(&self) -> Self {
        let variant = self.variant.as_ref().map(Variant::copied);
        let fragment = variant.as_ref().and_then(|v| v.to_fragment().ok());
        Self {
            id: Uuid::new_v4().to_string(),
            name: self.name.clone(),
            item_type: self.item_type,
            fragment,
            variant,
        }
    }
}

fn capitalized(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

/// Serde adapter for a screen's item list.
///
/// Decoding applies per-item isolation: an item that fails to decode is
/// dropped with a warning and the rest of the screen survives. Single-item
/// [`ContentItem::decode`] stays strict; only list decoding is lenient.
pub mod lenient_items {
    use serde::ser::SerializeSeq;
    use serde::{Deserialize, Deserializer, Serializer};

    use super::{ContentItem, ContentItemWire};
    use tracing::warn;

    pub fn serialize<S>(items: &[ContentItem], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut seq = serializer.serialize_seq(Some(items.len()))?;
        for item in items {
            let wire = item.encode().map_err(serde::ser::Error::custom)?;
            seq.serialize_element(&wire)?;
        }
        seq.end()
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<ContentItem>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let wires = Vec::<ContentItemWire>::deserialize(deserializer)?;
        Ok(wires
            .iter()
            .filter_map(|wire| match ContentItem::decode(wire) {
                Ok(item) => Some(item),
                Err(err) => {
                    warn!(item_id = %wire.id, error = %err, "dropping undecodable content item");
                    None
                }
            })
            .collect())
    }
}
