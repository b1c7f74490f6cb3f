use std::path::Path;

/// Raster container formats that have a dedicated extraction path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RasterFormat {
    Png,
    Jpeg,
    WebP,
    Gif,
    Bmp,
}
impl RasterFormat {
    /// Whether the container can hold more than one frame.
    pub fn can_animate(&self) -> bool {
        matches!(self, RasterFormat::Png | RasterFormat::WebP | RasterFormat::Gif)
    }
}

/// How a file gets its metadata extracted, decided purely by its extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Strategy {
    /// Decoded in-process with the `image` crate. May turn out to be animated.
    Raster(RasterFormat),
    /// Handed over to a [`VideoProbe`](crate::VideoProbe).
    Video,
    /// Not media we know about; cataloged as unknown without being opened.
    Unsupported,
}
impl Strategy {
    /// Pick the strategy for a file from its extension (case-insensitive).
    #[must_use]
    pub fn from_path(path: impl AsRef<Path>) -> Self {
        path.as_ref()
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| match ext.to_lowercase().as_str() {
                "png" => Strategy::Raster(RasterFormat::Png),
                "jpg" | "jpeg" => Strategy::Raster(RasterFormat::Jpeg),
                "webp" => Strategy::Raster(RasterFormat::WebP),
                "gif" => Strategy::Raster(RasterFormat::Gif),
                "bmp" => Strategy::Raster(RasterFormat::Bmp),
                "mp4" | "webm" | "mov" | "mkv" | "avi" | "m4v" => Strategy::Video,
                _ => Strategy::Unsupported,
            })
            .unwrap_or(Strategy::Unsupported)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("output/ComfyUI_00001_.png", Strategy::Raster(RasterFormat::Png))]
    #[case("photo.JPG", Strategy::Raster(RasterFormat::Jpeg))]
    #[case("photo.jpeg", Strategy::Raster(RasterFormat::Jpeg))]
    #[case("anim.webp", Strategy::Raster(RasterFormat::WebP))]
    #[case("anim.gif", Strategy::Raster(RasterFormat::Gif))]
    #[case("legacy.bmp", Strategy::Raster(RasterFormat::Bmp))]
    #[case("clip.mp4", Strategy::Video)]
    #[case("clip.WebM", Strategy::Video)]
    #[case("clip.mov", Strategy::Video)]
    #[case("notes.txt", Strategy::Unsupported)]
    #[case("workflow.json", Strategy::Unsupported)]
    #[case("no-extension", Strategy::Unsupported)]
    #[case(".png", Strategy::Unsupported)]
    fn test_from_path(#[case] path: &str, #[case] expected: Strategy) {
        assert_eq!(Strategy::from_path(path), expected);
    }
}
