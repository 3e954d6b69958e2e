use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use crate::MediaError;

/// Where a media item comes from.
///
/// - `asset:///clouds.gif`: logical name resolved by the asset source
/// - `file:///tmp/clouds.gif`: absolute file path
/// - `clouds.gif`, `./media/clouds.gif`: bare file path
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MediaUri {
    Asset(String),
    File(PathBuf),
}

impl MediaUri {
    pub fn parse(s: &str) -> Result<Self, MediaError> {
        let s = s.trim();
        if s.is_empty() {
            return Err(MediaError::InvalidUri(s.to_string()));
        }
        if let Some(rest) = s.strip_prefix("asset://") {
            let name = rest.trim_start_matches('/');
            if name.is_empty() {
                return Err(MediaError::InvalidUri(s.to_string()));
            }
            return Ok(MediaUri::Asset(name.to_string()));
        }
        if let Some(rest) = s.strip_prefix("file://") {
            if rest.is_empty() {
                return Err(MediaError::InvalidUri(s.to_string()));
            }
            return Ok(MediaUri::File(PathBuf::from(rest)));
        }
        // Any other scheme would need a network or platform resolver.
        if let Some((scheme, _)) = s.split_once("://")
            && !scheme.is_empty()
            && scheme.chars().all(|c| c.is_ascii_alphanumeric() || "+-.".contains(c))
        {
            return Err(MediaError::InvalidUri(s.to_string()));
        }
        Ok(MediaUri::File(PathBuf::from(s)))
    }

    pub fn asset(name: impl Into<String>) -> Self {
        MediaUri::Asset(name.into())
    }
}

impl FromStr for MediaUri {
    type Err = MediaError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        MediaUri::parse(s)
    }
}

impl fmt::Display for MediaUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MediaUri::Asset(name) => write!(f, "asset:///{name}"),
            MediaUri::File(path) => write!(f, "file://{}", path.display()),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MediaItem {
    pub uri: MediaUri,
}

impl MediaItem {
    pub fn new(uri: MediaUri) -> Self {
        Self { uri }
    }

    pub fn from_uri(s: &str) -> Result<Self, MediaError> {
        MediaUri::parse(s).map(Self::new)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_supported_forms() {
        assert_eq!(
            MediaUri::parse("asset:///clouds.gif").unwrap(),
            MediaUri::Asset("clouds.gif".into())
        );
        assert_eq!(
            MediaUri::parse("file:///tmp/a.gif").unwrap(),
            MediaUri::File("/tmp/a.gif".into())
        );
        assert_eq!(
            MediaUri::parse(" media/a.gif ").unwrap(),
            MediaUri::File("media/a.gif".into())
        );
        assert_eq!(
            MediaUri::parse("asset:///clouds.gif").unwrap().to_string(),
            "asset:///clouds.gif"
        );
    }

    #[test]
    fn rejects_empty_and_unknown_schemes() {
        for bad in ["", "   ", "asset:///", "file://", "https://example.com/a.mp4"] {
            assert!(
                matches!(MediaUri::parse(bad), Err(MediaError::InvalidUri(_))),
                "{bad:?} should be rejected"
            );
        }
    }
}
