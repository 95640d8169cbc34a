use serde::Serialize;
use thiserror::Error;
use wasm_bindgen::JsValue;

/// Failures while reading a GPX document.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("XML parse error: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("document has no <gpx> root element")]
    NotGpx,

    #[error("document ends inside <{element}>")]
    Truncated { element: &'static str },

    #[error("no track data: the file contains no <trkseg> element")]
    NoTrackData,

    #[error("no valid points: every track point was missing or had invalid coordinates")]
    NoValidPoints,
}

impl ParseError {
    /// The document itself could not be read, as opposed to being valid but empty.
    pub fn is_unreadable(&self) -> bool {
        matches!(self, Self::Xml(_) | Self::NotGpx | Self::Truncated { .. })
    }
}

#[derive(Debug, Error)]
pub enum UserInputError {
    #[error("no file chosen")]
    NoFile,

    #[error("'{name}' is not a .gpx file")]
    UnsupportedFile { name: String },

    #[error("missing required field '{field}'")]
    MissingField { field: &'static str },

    #[error("invalid color '{value}'")]
    InvalidColor { value: String },

    #[error("line width {value} is outside 1..=10")]
    LineWidthOutOfRange { value: f64 },

    #[error("unsupported export format '{value}'")]
    InvalidFormat { value: String },
}

#[derive(Debug, Error)]
pub enum NetworkError {
    #[error("map provider access token is not configured")]
    MissingToken,

    #[error("map provider responded with status {status}: {body}")]
    Upstream { status: u16, body: String },
}

#[derive(Debug, Error)]
pub enum CompositionError {
    #[error("{what} surface is empty")]
    EmptySurface { what: &'static str },

    #[error("raw pixel buffer does not match {width}x{height} RGBA")]
    SurfaceSize { width: u32, height: u32 },

    #[error("renderer did not settle for style '{style}' within {waited_ms} ms")]
    RenderTimeout { style: String, waited_ms: u64 },

    #[error("renderer for style '{style}' went away before settling")]
    RenderAborted { style: String },

    #[error("renderer failed for style '{style}': {message}")]
    Render { style: String, message: String },

    #[error("image encoding failed: {0}")]
    Encode(String),

    #[error("archive creation failed: {0}")]
    Archive(String),
}

impl From<image::ImageError> for CompositionError {
    fn from(e: image::ImageError) -> Self {
        Self::Encode(e.to_string())
    }
}

impl From<zip::result::ZipError> for CompositionError {
    fn from(e: zip::result::ZipError) -> Self {
        Self::Archive(e.to_string())
    }
}

/// Every failure the poster pipeline can surface to a user.
#[derive(Debug, Error)]
pub enum PosterError {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    UserInput(#[from] UserInputError),

    #[error(transparent)]
    Network(#[from] NetworkError),

    #[error(transparent)]
    Composition(#[from] CompositionError),
}

impl PosterError {
    /// Short message for the page; each failure class keeps its own wording.
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::Parse(ParseError::NoTrackData) => "No track found in file",
            Self::Parse(ParseError::NoValidPoints) => "The track contains no valid points",
            Self::Parse(_) => "Unreadable GPX file",
            Self::UserInput(UserInputError::NoFile) => "No file chosen",
            Self::UserInput(UserInputError::UnsupportedFile { .. }) => "Please choose a .gpx file",
            Self::UserInput(_) => "Some required settings are missing or invalid",
            Self::Network(_) => "Map provider unavailable",
            Self::Composition(_) => "Export failed",
        }
    }

    pub fn status_code(&self) -> u16 {
        match self {
            Self::UserInput(_) => 400,
            _ => 500,
        }
    }

    pub fn to_body(&self) -> ErrorBody {
        ErrorBody {
            error: self.user_message().to_string(),
            details: Some(self.to_string()),
        }
    }
}

/// JSON error body returned by the HTTP handlers: `{error, details?}`.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ErrorBody {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl From<PosterError> for JsValue {
    fn from(e: PosterError) -> Self {
        JsValue::from_str(&format!("{}: {e}", e.user_message()))
    }
}
