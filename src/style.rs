use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::json;

use crate::error::UserInputError;

/// An opaque or translucent sRGB color, written as `#rrggbb` on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const WHITE: Color = Color::rgb(0xff, 0xff, 0xff);
    pub const BLACK: Color = Color::rgb(0, 0, 0);

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 0xff }
    }

    pub fn to_rgba(self) -> image::Rgba<u8> {
        image::Rgba([self.r, self.g, self.b, self.a])
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

impl FromStr for Color {
    type Err = UserInputError;

    /// Accepts `#rrggbb` and `#rgb`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || UserInputError::InvalidColor {
            value: s.to_string(),
        };
        let hex = s.trim().strip_prefix('#').ok_or_else(invalid)?;
        if !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(invalid());
        }
        let channel = |h: &str| u8::from_str_radix(h, 16).map_err(|_| invalid());
        match hex.len() {
            6 => Ok(Color::rgb(
                channel(&hex[0..2])?,
                channel(&hex[2..4])?,
                channel(&hex[4..6])?,
            )),
            3 => {
                let short = |i: usize| channel(&hex[i..i + 1]).map(|v| v * 17);
                Ok(Color::rgb(short(0)?, short(1)?, short(2)?))
            }
            _ => Err(invalid()),
        }
    }
}

impl Serialize for Color {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Color {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// One entry of the closed style table.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MapStyle {
    pub id: &'static str,
    pub display_name: &'static str,
    pub trace_color: Color,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<&'static str>,
    /// Draws only a flat background under the trace.
    pub background_only: bool,
}

/// What the renderer is asked to draw underneath the trace.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum StyleSource {
    Url(&'static str),
    Inline(serde_json::Value),
}

impl MapStyle {
    pub fn source(&self, background: Color) -> StyleSource {
        match self.url {
            Some(url) if !self.background_only => StyleSource::Url(url),
            _ => StyleSource::Inline(json!({
                "version": 8,
                "sources": {},
                "layers": [{
                    "id": "background",
                    "type": "background",
                    "paint": { "background-color": background.to_string() },
                }],
            })),
        }
    }
}

/// Returned for any id that is not in [`STYLES`].
pub const DEFAULT_STYLE: MapStyle = MapStyle {
    id: "streets",
    display_name: "Streets",
    trace_color: Color::BLACK,
    url: Some("mapbox://styles/mapbox/streets-v11"),
    background_only: false,
};

pub const STYLES: [MapStyle; 4] = [
    MapStyle {
        id: "vintage",
        display_name: "Vintage",
        trace_color: Color::rgb(0xda, 0x98, 0x87),
        url: Some("mapbox://styles/pyr25/cm91uzik8000f01sfb70d7qu7"),
        background_only: false,
    },
    MapStyle {
        id: "azure",
        display_name: "Azuré",
        trace_color: Color::rgb(0x63, 0x8b, 0x98),
        url: Some("mapbox://styles/pyr25/cm91vjgbc000i01sf0ow0he8n"),
        background_only: false,
    },
    MapStyle {
        id: "monochrome",
        display_name: "Minimaliste",
        trace_color: Color::rgb(0x02, 0x02, 0x02),
        url: Some("mapbox://styles/pyr25/cm91ui4lv000c01qyf9wyexrg"),
        background_only: false,
    },
    MapStyle {
        id: "trace-only",
        display_name: "Solitaire",
        trace_color: Color::BLACK,
        url: None,
        background_only: true,
    },
];

pub fn find(id: &str) -> Option<&'static MapStyle> {
    STYLES.iter().find(|s| s.id == id)
}

pub fn resolve(id: &str) -> &'static MapStyle {
    find(id).unwrap_or(&DEFAULT_STYLE)
}
