use crate::error::SceneError;
use std::borrow::Cow;
use std::str::FromStr;

/// Text encoding of a scene file on disk.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Encoding {
    /// Invalid sequences are replaced, not rejected
    #[default]
    Utf8,
    /// ISO-8859-1, as written by older Hammer builds
    Latin1,
}

impl Encoding {
    pub fn decode<'a>(&self, bytes: &'a [u8]) -> Cow<'a, str> {
        match self {
            Encoding::Utf8 => String::from_utf8_lossy(bytes),
            // Every Latin-1 byte is the code point of the same value
            Encoding::Latin1 => Cow::Owned(bytes.iter().map(|&b| char::from(b)).collect()),
        }
    }
}

impl FromStr for Encoding {
    type Err = SceneError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace('_', "-").as_str() {
            "utf-8" | "utf8" => Ok(Encoding::Utf8),
            "latin-1" | "latin1" | "iso-8859-1" => Ok(Encoding::Latin1),
            _ => Err(SceneError::UnknownEncoding(s.to_string())),
        }
    }
}
