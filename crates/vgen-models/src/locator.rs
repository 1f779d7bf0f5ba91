//! Media locators.
//!
//! Every media reference that crosses a crate boundary (source images,
//! generated clips, synthesized audio) is a [`MediaLocator`]. On the wire it
//! is always a single string:
//!
//! - `https://...` / `http://...`: remote object, fetched on demand
//! - `data:<mime>;base64,<payload>`: inline payload
//! - `file:///abs/path` or a bare path: file already on local disk

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use schemars::gen::SchemaGenerator;
use schemars::schema::Schema;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use thiserror::Error;

const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "webp", "bmp"];

/// Reference to a piece of media.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum MediaLocator {
    /// Remote http(s) URL.
    Url(String),
    /// Base64 payload carried inline.
    Inline { mime_type: String, data: String },
    /// File on the local filesystem.
    Local(PathBuf),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum LocatorError {
    #[error("Media locator is empty")]
    Empty,

    #[error("Invalid data URI: {0}")]
    InvalidDataUri(String),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Unsupported locator scheme: {0}")]
    UnsupportedScheme(String),

    #[error("Invalid base64 payload: {0}")]
    InvalidPayload(String),

    #[error("Locator is not inline")]
    NotInline,
}

impl MediaLocator {
    /// Build an inline locator from raw bytes.
    pub fn inline_from_bytes(mime_type: impl Into<String>, bytes: &[u8]) -> Self {
        Self::Inline {
            mime_type: mime_type.into(),
            data: STANDARD.encode(bytes),
        }
    }

    /// Build a local locator.
    pub fn local(path: impl AsRef<Path>) -> Self {
        Self::Local(path.as_ref().to_path_buf())
    }

    pub fn is_remote(&self) -> bool {
        matches!(self, Self::Url(_))
    }

    pub fn is_inline(&self) -> bool {
        matches!(self, Self::Inline { .. })
    }

    pub fn is_local(&self) -> bool {
        matches!(self, Self::Local(_))
    }

    /// Decode the payload of an inline locator.
    pub fn decode_bytes(&self) -> Result<Vec<u8>, LocatorError> {
        match self {
            Self::Inline { data, .. } => STANDARD
                .decode(data.trim())
                .map_err(|e| LocatorError::InvalidPayload(e.to_string())),
            _ => Err(LocatorError::NotInline),
        }
    }

    /// MIME type, when known.
    pub fn mime_type(&self) -> Option<&str> {
        match self {
            Self::Inline { mime_type, .. } => Some(mime_type),
            _ => self.extension().and_then(mime_from_extension),
        }
    }

    /// File extension suitable for materializing this media on disk.
    pub fn extension(&self) -> Option<&str> {
        match self {
            Self::Inline { mime_type, .. } => extension_from_mime(mime_type),
            Self::Url(url) => {
                let without_query = url.split(['?', '#']).next().unwrap_or(url);
                let after_scheme = without_query.split_once("://").map_or(without_query, |(_, r)| r);
                let (_, path) = after_scheme.split_once('/')?;
                let last = path.rsplit('/').next()?;
                last.rsplit_once('.').map(|(_, ext)| ext).filter(|e| !e.is_empty())
            }
            Self::Local(path) => path.extension().and_then(|e| e.to_str()),
        }
    }

    /// Whether this locator points at a still image rather than a clip.
    pub fn is_image(&self) -> bool {
        match self {
            Self::Inline { mime_type, .. } => mime_type.starts_with("image/"),
            _ => self
                .extension()
                .map(|ext| IMAGE_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
                .unwrap_or(false),
        }
    }

    /// Short, log-safe description (never includes inline payloads).
    pub fn describe(&self) -> String {
        match self {
            Self::Url(url) => url.clone(),
            Self::Inline { mime_type, data } => {
                format!("inline {} ({} base64 chars)", mime_type, data.len())
            }
            Self::Local(path) => path.display().to_string(),
        }
    }
}

impl FromStr for MediaLocator {
    type Err = LocatorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(LocatorError::Empty);
        }

        if let Some(rest) = s.strip_prefix("data:") {
            let (header, data) = rest
                .split_once(',')
                .ok_or_else(|| LocatorError::InvalidDataUri("missing ',' separator".to_string()))?;
            let mime_type = header.strip_suffix(";base64").ok_or_else(|| {
                LocatorError::InvalidDataUri("only base64 data URIs are supported".to_string())
            })?;
            let mime_type = if mime_type.is_empty() {
                "application/octet-stream"
            } else {
                mime_type
            };
            return Ok(Self::Inline {
                mime_type: mime_type.to_string(),
                data: data.to_string(),
            });
        }

        if s.starts_with("http://") || s.starts_with("https://") {
            url::Url::parse(s).map_err(|e| LocatorError::InvalidUrl(e.to_string()))?;
            return Ok(Self::Url(s.to_string()));
        }

        if s.starts_with("file://") {
            let url = url::Url::parse(s).map_err(|e| LocatorError::InvalidUrl(e.to_string()))?;
            let path = url
                .to_file_path()
                .map_err(|_| LocatorError::InvalidUrl(s.to_string()))?;
            return Ok(Self::Local(path));
        }

        if let Some((scheme, _)) = s.split_once("://") {
            return Err(LocatorError::UnsupportedScheme(scheme.to_string()));
        }

        Ok(Self::Local(PathBuf::from(s)))
    }
}

impl TryFrom<String> for MediaLocator {
    type Error = LocatorError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<MediaLocator> for String {
    fn from(locator: MediaLocator) -> Self {
        locator.to_string()
    }
}

impl fmt::Display for MediaLocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Url(url) => write!(f, "{}", url),
            Self::Inline { mime_type, data } => write!(f, "data:{};base64,{}", mime_type, data),
            Self::Local(path) => write!(f, "{}", path.display()),
        }
    }
}

impl JsonSchema for MediaLocator {
    fn schema_name() -> String {
        "MediaLocator".to_string()
    }

    fn json_schema(gen: &mut SchemaGenerator) -> Schema {
        String::json_schema(gen)
    }
}

/// Map a MIME type to a file extension.
pub fn extension_from_mime(mime_type: &str) -> Option<&'static str> {
    let ext = match mime_type.to_ascii_lowercase().as_str() {
        "video/mp4" => "mp4",
        "video/webm" => "webm",
        "video/quicktime" => "mov",
        "audio/mpeg" | "audio/mp3" => "mp3",
        "audio/wav" | "audio/x-wav" | "audio/wave" => "wav",
        "audio/aac" => "aac",
        "audio/ogg" | "audio/opus" => "ogg",
        "audio/flac" => "flac",
        "image/png" => "png",
        "image/jpeg" | "image/jpg" => "jpg",
        "image/webp" => "webp",
        "image/bmp" => "bmp",
        _ => return None,
    };
    Some(ext)
}

/// Map a file extension to a MIME type.
pub fn mime_from_extension(ext: &str) -> Option<&'static str> {
    let mime = match ext.to_ascii_lowercase().as_str() {
        "mp4" => "video/mp4",
        "webm" => "video/webm",
        "mov" => "video/quicktime",
        "mp3" => "audio/mpeg",
        "wav" => "audio/wav",
        "aac" => "audio/aac",
        "ogg" | "opus" => "audio/ogg",
        "flac" => "audio/flac",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "webp" => "image/webp",
        "bmp" => "image/bmp",
        _ => return None,
    };
    Some(mime)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_variants() {
        let url: MediaLocator = "https://cdn.example.com/a/clip.mp4?sig=1".parse().unwrap();
        assert!(url.is_remote());
        assert_eq!(url.extension(), Some("mp4"));

        let inline: MediaLocator = "data:audio/mpeg;base64,SUQz".parse().unwrap();
        assert_eq!(inline.mime_type(), Some("audio/mpeg"));
        assert_eq!(inline.extension(), Some("mp3"));
        assert_eq!(inline.decode_bytes().unwrap(), b"ID3");

        let local: MediaLocator = "/tmp/scene-1.png".parse().unwrap();
        assert!(local.is_local());
        assert!(local.is_image());

        let file_uri: MediaLocator = "file:///tmp/voice.wav".parse().unwrap();
        assert_eq!(file_uri, MediaLocator::Local(PathBuf::from("/tmp/voice.wav")));
    }

    #[test]
    fn test_rejects_bad_locators() {
        assert_eq!("  ".parse::<MediaLocator>(), Err(LocatorError::Empty));
        assert!(matches!(
            "data:image/png,rawbytes".parse::<MediaLocator>(),
            Err(LocatorError::InvalidDataUri(_))
        ));
        assert!(matches!(
            "ftp://host/file.mp4".parse::<MediaLocator>(),
            Err(LocatorError::UnsupportedScheme(_))
        ));
    }

    #[test]
    fn test_serde_as_string() {
        let locator = MediaLocator::inline_from_bytes("image/png", b"\x89PNG");
        let json = serde_json::to_string(&locator).unwrap();
        assert!(json.starts_with("\"data:image/png;base64,"));

        let back: MediaLocator = serde_json::from_str(&json).unwrap();
        assert_eq!(back, locator);
    }

    #[test]
    fn test_describe_hides_payload() {
        let locator = MediaLocator::inline_from_bytes("image/png", &[0u8; 300]);
        let description = locator.describe();
        assert!(description.starts_with("inline image/png"));
        assert!(!description.contains("AAAA"));
    }
}
