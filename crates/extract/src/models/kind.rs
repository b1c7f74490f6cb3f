use crate::error::{Error, ErrorKind};
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;

/// Declared type of a cataloged file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum MediaKind {
    /// Single-frame raster image.
    Image,
    /// Multi-frame raster image (GIF, animated WebP, APNG).
    Animated,
    Video,
    /// Unrecognised extension, or a file that failed to decode.
    #[default]
    Unknown,
}
impl MediaKind {
    /// Short name used for persistence and display.
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaKind::Image => "image",
            MediaKind::Animated => "animated",
            MediaKind::Video => "video",
            MediaKind::Unknown => "unknown",
        }
    }

    /// Whether a preview thumbnail can be rendered for this kind of file.
    pub fn is_visual(&self) -> bool {
        !matches!(self, MediaKind::Unknown)
    }
}
impl FromStr for MediaKind {
    type Err = Error;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.trim().to_lowercase().as_str() {
            "image" => Self::Image,
            "animated" | "animated-image" => Self::Animated,
            "video" => Self::Video,
            "unknown" => Self::Unknown,
            _ => exn::bail!(ErrorKind::ParseError {
                field: "kind",
                value: s.to_string(),
            }),
        })
    }
}
impl Display for MediaKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("image", MediaKind::Image)]
    #[case("animated", MediaKind::Animated)]
    #[case("Animated-Image", MediaKind::Animated)]
    #[case(" video ", MediaKind::Video)]
    #[case("unknown", MediaKind::Unknown)]
    fn test_parse(#[case] input: &str, #[case] expected: MediaKind) {
        assert_eq!(input.parse::<MediaKind>().unwrap(), expected);
    }

    #[test]
    fn test_parse_rejects_unknown_names() {
        assert!("audio".parse::<MediaKind>().is_err());
    }

    #[test]
    fn test_display_parses_back() {
        for kind in [MediaKind::Image, MediaKind::Animated, MediaKind::Video, MediaKind::Unknown] {
            assert_eq!(kind.to_string().parse::<MediaKind>().unwrap(), kind);
        }
    }
}
