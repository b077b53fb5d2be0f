use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// Binary format version tag.
///
/// Every hashing and serialization call is parameterised by a `Format`. The
/// format's domain string is prepended to every hash computation, so the same
/// bytes written under two formats have two different addresses. All chunks
/// of one logical value must share a format.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Format {
    /// The 7.18 layout used by older stores.
    #[serde(rename = "7.18")]
    V7_18,
    /// The default layout for new stores.
    #[default]
    #[serde(rename = "ld-1")]
    Ld1,
}

impl Format {
    /// Every known format, in tag order.
    pub const ALL: [Format; 2] = [Format::V7_18, Format::Ld1];

    /// One-byte tag written at the front of every stored chunk.
    pub const fn tag(&self) -> u8 {
        match self {
            Self::V7_18 => 1,
            Self::Ld1 => 2,
        }
    }

    /// Parse a chunk's leading tag byte.
    pub fn from_tag(tag: u8) -> Result<Self, TypeError> {
        match tag {
            1 => Ok(Self::V7_18),
            2 => Ok(Self::Ld1),
            other => Err(TypeError::UnknownFormat(other)),
        }
    }

    /// Hash domain for this format.
    pub const fn domain(&self) -> &'static str {
        match self {
            Self::V7_18 => "tessera-7.18",
            Self::Ld1 => "tessera-ld-1",
        }
    }

    /// Human-readable version string, as used in configuration files.
    pub const fn version_string(&self) -> &'static str {
        match self {
            Self::V7_18 => "7.18",
            Self::Ld1 => "ld-1",
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.version_string())
    }
}

impl std::str::FromStr for Format {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Format::ALL
            .into_iter()
            .find(|f| f.version_string() == s)
            .ok_or_else(|| format!("unknown format version: {s}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tag_roundtrip() {
        for format in Format::ALL {
            assert_eq!(Format::from_tag(format.tag()).unwrap(), format);
        }
    }

    #[test]
    fn unknown_tag_is_rejected() {
        assert_eq!(Format::from_tag(0), Err(TypeError::UnknownFormat(0)));
        assert_eq!(Format::from_tag(99), Err(TypeError::UnknownFormat(99)));
    }

    #[test]
    fn domains_are_distinct() {
        assert_ne!(Format::V7_18.domain(), Format::Ld1.domain());
    }

    #[test]
    fn default_is_ld1() {
        assert_eq!(Format::default(), Format::Ld1);
    }

    #[test]
    fn parse_version_strings() {
        assert_eq!("7.18".parse::<Format>().unwrap(), Format::V7_18);
        assert_eq!("ld-1".parse::<Format>().unwrap(), Format::Ld1);
        assert!("9.9".parse::<Format>().is_err());
    }

    #[test]
    fn serde_uses_version_strings() {
        let json = serde_json::to_string(&Format::V7_18).unwrap();
        assert_eq!(json, "\"7.18\"");
        let parsed: Format = serde_json::from_str("\"ld-1\"").unwrap();
        assert_eq!(parsed, Format::Ld1);
    }
}
