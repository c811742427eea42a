use serde::Serialize;
use std::fmt;

/// Encodings an artifact may be stored in.
///
/// Declaration order matters: [`Encoding::ALL`] is the probe order, and when a
/// resource exists in several encodings the earlier one wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Encoding {
    Png,
    Mp4,
}

impl Encoding {
    pub const ALL: [Encoding; 2] = [Encoding::Png, Encoding::Mp4];

    pub fn extension(self) -> &'static str {
        match self {
            Encoding::Png => "png",
            Encoding::Mp4 => "mp4",
        }
    }

    pub fn mime_type(self) -> &'static str {
        match self {
            Encoding::Png => "image/png",
            Encoding::Mp4 => "video/mp4",
        }
    }

    /// Map a `Content-Type` header value to an encoding. Parameters such as
    /// `; charset=...` are ignored.
    pub fn from_content_type(content_type: &str) -> Option<Self> {
        let essence = content_type
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();

        Self::ALL.into_iter().find(|e| e.mime_type() == essence)
    }
}

impl fmt::Display for Encoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// A stored artifact: its storage key and externally reachable URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArtifactLocation {
    pub key: String,
    pub url: String,
    pub encoding: Encoding,
}
