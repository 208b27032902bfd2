// ---------------------------------------------------------------------------
// Error types for fetching, geometry loading, configuration and the catalog
// ---------------------------------------------------------------------------

use std::fmt;

/// Failure of one outbound request (probability poll or weather lookup).
///
/// Never fatal: callers log it and keep their previous state.
#[derive(Debug, Clone, PartialEq)]
pub enum FetchError {
    /// Connection, DNS, TLS or timeout failure.
    Transport(String),
    /// The server answered with a non-success status code.
    Status(u16),
    /// The body was not the expected JSON shape.
    Parse(String),
}

impl fmt::Display for FetchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FetchError::Transport(msg) => write!(f, "transport error: {msg}"),
            FetchError::Status(code) => write!(f, "server responded with HTTP {code}"),
            FetchError::Parse(msg) => write!(f, "malformed response: {msg}"),
        }
    }
}

impl std::error::Error for FetchError {}

impl From<reqwest::Error> for FetchError {
    fn from(e: reqwest::Error) -> Self {
        match e.status() {
            Some(status) => FetchError::Status(status.as_u16()),
            None => FetchError::Transport(e.to_string()),
        }
    }
}

impl From<serde_json::Error> for FetchError {
    fn from(e: serde_json::Error) -> Self {
        FetchError::Parse(e.to_string())
    }
}

/// Failure to load one line's KML/KMZ geometry.
#[derive(Debug)]
pub enum GeometryLoadError {
    Io(std::io::Error),
    /// The KMZ archive is corrupt or holds no `.kml` entry.
    Archive(String),
    Xml(String),
    /// The document parsed but contained no usable coordinate list.
    NoCoordinates,
}

impl fmt::Display for GeometryLoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GeometryLoadError::Io(e) => write!(f, "I/O error: {e}"),
            GeometryLoadError::Archive(msg) => write!(f, "KMZ archive error: {msg}"),
            GeometryLoadError::Xml(msg) => write!(f, "KML parse error: {msg}"),
            GeometryLoadError::NoCoordinates => write!(f, "no coordinates found in document"),
        }
    }
}

impl std::error::Error for GeometryLoadError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            GeometryLoadError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for GeometryLoadError {
    fn from(e: std::io::Error) -> Self {
        GeometryLoadError::Io(e)
    }
}

impl From<zip::result::ZipError> for GeometryLoadError {
    fn from(e: zip::result::ZipError) -> Self {
        GeometryLoadError::Archive(e.to_string())
    }
}

impl From<quick_xml::Error> for GeometryLoadError {
    fn from(e: quick_xml::Error) -> Self {
        GeometryLoadError::Xml(e.to_string())
    }
}

/// Invalid polling configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    ZeroInterval,
    EmptyEndpoint,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::ZeroInterval => write!(f, "poll interval must be greater than zero"),
            ConfigError::EmptyEndpoint => write!(f, "probability endpoint is empty"),
        }
    }
}

impl std::error::Error for ConfigError {}

/// Invalid line catalog.
#[derive(Debug, Clone, PartialEq)]
pub enum CatalogError {
    /// Two lines share the same id inside one group.
    DuplicateLine { group: String, id: String },
    /// The manifest file could not be read or decoded.
    Manifest(String),
}

impl fmt::Display for CatalogError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CatalogError::DuplicateLine { group, id } => {
                write!(f, "duplicate line '{id}' in group {group}")
            }
            CatalogError::Manifest(msg) => write!(f, "invalid line manifest: {msg}"),
        }
    }
}

impl std::error::Error for CatalogError {}

impl From<serde_json::Error> for CatalogError {
    fn from(e: serde_json::Error) -> Self {
        CatalogError::Manifest(e.to_string())
    }
}
