//! Metadata extraction for the media catalog.
//!
//! The extension picks a [`Strategy`]; the strategy produces an
//! [`Extraction`](models::Extraction). Extraction never fails: anything that
//! can't be read or decoded is cataloged as unknown (or degraded) rather than
//! skipped, so a broken file still shows up.

pub mod error;
pub mod models;
mod raster;
mod strategy;
mod video;
mod workflow;

#[cfg(test)]
mod fixtures;

use std::path::Path;
use std::sync::Arc;
use tracing::instrument;

use crate::models::{Extraction, MediaDuration, MediaKind};
pub use crate::strategy::{RasterFormat, Strategy};
pub use crate::video::{Ffprobe, VideoInfo, VideoProbe};

/// Frame rate assumed for animated images, whose per-frame delays aren't
/// trusted.
pub const DEFAULT_ANIMATED_FPS: f64 = 8.0;

#[derive(Debug, Clone)]
pub struct Extractor {
    assumed_fps: f64,
    probe: Option<Arc<dyn VideoProbe>>,
}
impl Default for Extractor {
    fn default() -> Self {
        Self::new(DEFAULT_ANIMATED_FPS)
    }
}
impl Extractor {
    /// An extractor with no video probe; videos are cataloged without
    /// dimensions or duration.
    pub fn new(assumed_fps: f64) -> Self {
        Self {
            assumed_fps,
            probe: None,
        }
    }

    pub fn with_probe(self, probe: impl VideoProbe + 'static) -> Self {
        self.with_shared_probe(Arc::new(probe))
    }

    pub fn with_shared_probe(mut self, probe: Arc<dyn VideoProbe>) -> Self {
        self.probe = Some(probe);
        self
    }

    pub fn assumed_fps(&self) -> f64 {
        self.assumed_fps
    }

    /// Extract whatever can be known about the file at `path`. Blocking.
    #[instrument(skip_all, fields(path = %path.display()))]
    pub fn extract(&self, path: &Path) -> Extraction {
        match Strategy::from_path(path) {
            Strategy::Raster(format) => self.raster(path, format),
            Strategy::Video => self.video(path),
            Strategy::Unsupported => Extraction::unknown(),
        }
    }

    fn raster(&self, path: &Path, format: RasterFormat) -> Extraction {
        // Metadata survives pixel data that doesn't.
        let has_workflow = workflow::raster(path, format).unwrap_or_else(|e| {
            tracing::debug!(error = %e, "Could not scan for an embedded workflow");
            false
        });
        match raster::inspect(path, format) {
            Ok(info) if info.frames > 1 => Extraction {
                kind: MediaKind::Animated,
                dimensions: Some(info.dimensions),
                duration: MediaDuration::from_frames(info.frames, self.assumed_fps),
                has_workflow,
                degraded: false,
            },
            Ok(info) => Extraction {
                kind: MediaKind::Image,
                dimensions: Some(info.dimensions),
                duration: None,
                has_workflow,
                degraded: false,
            },
            Err(e) => {
                tracing::warn!(error = %e, "Failed to decode image; cataloging as unknown");
                Extraction::degraded(has_workflow)
            },
        }
    }

    fn video(&self, path: &Path) -> Extraction {
        let degraded = Extraction {
            kind: MediaKind::Video,
            degraded: true,
            ..Extraction::default()
        };
        let Some(probe) = &self.probe else {
            return degraded;
        };
        match probe.probe(path) {
            Ok(info) => Extraction {
                kind: MediaKind::Video,
                dimensions: info.dimensions(),
                duration: info.duration(),
                has_workflow: info.has_workflow,
                degraded: false,
            },
            Err(e) => {
                tracing::warn!(error = %e, "Failed to probe video");
                degraded
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ErrorKind, Result};
    use crate::models::Dimensions;

    #[derive(Debug)]
    struct StubProbe(Option<VideoInfo>);
    impl VideoProbe for StubProbe {
        fn probe(&self, _: &Path) -> Result<VideoInfo> {
            match &self.0 {
                Some(info) => Ok(info.clone()),
                None => exn::bail!(ErrorKind::Probe(String::from("stub"))),
            }
        }
    }

    fn write(dir: &Path, name: &str, bytes: &[u8]) -> std::path::PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, bytes).unwrap();
        path
    }

    #[test]
    fn test_still_image() {
        let temp = tempfile::tempdir().unwrap();
        let path = write(temp.path(), "still.png", &fixtures::png(800, 600, None));
        let extraction = Extractor::default().extract(&path);
        assert_eq!(extraction.kind, MediaKind::Image);
        assert_eq!(extraction.dimensions.unwrap().to_string(), "800x600");
        assert_eq!(extraction.duration, None);
        assert!(!extraction.has_workflow);
        assert!(!extraction.degraded);
    }

    #[test]
    fn test_animated_image_duration_from_assumed_rate() {
        let temp = tempfile::tempdir().unwrap();
        let path = write(temp.path(), "loop.gif", &fixtures::gif(10, 10, 48));
        let extraction = Extractor::new(16.0).extract(&path);
        assert_eq!(extraction.kind, MediaKind::Animated);
        assert_eq!(extraction.dimensions, Some(Dimensions::new(10, 10)));
        assert_eq!(extraction.duration.unwrap().to_string(), "00:03");
    }

    #[test]
    fn test_single_frame_gif_is_still() {
        let temp = tempfile::tempdir().unwrap();
        let path = write(temp.path(), "still.gif", &fixtures::gif(10, 10, 1));
        assert_eq!(Extractor::default().extract(&path).kind, MediaKind::Image);
    }

    #[test]
    fn test_workflow_in_png() {
        let temp = tempfile::tempdir().unwrap();
        let path = write(temp.path(), "gen.png", &fixtures::png(64, 64, Some(("workflow", r#"{"nodes":[]}"#))));
        let extraction = Extractor::default().extract(&path);
        assert_eq!(extraction.kind, MediaKind::Image);
        assert!(extraction.has_workflow);
    }

    #[test]
    fn test_unsupported_extension_is_not_opened() {
        // Doesn't exist, and doesn't need to.
        let extraction = Extractor::default().extract(Path::new("/nowhere/readme.txt"));
        assert_eq!(extraction, Extraction::unknown());
    }

    #[test]
    fn test_corrupt_image_degrades() {
        let temp = tempfile::tempdir().unwrap();
        let path = write(temp.path(), "broken.png", b"\x89PNG\r\n\x1a\nthis is not an image");
        let extraction = Extractor::default().extract(&path);
        assert_eq!(extraction.kind, MediaKind::Unknown);
        assert!(extraction.degraded);
        assert_eq!(extraction.dimensions, None);
    }

    #[test]
    fn test_video_with_probe() {
        let probe = StubProbe(Some(VideoInfo {
            width: Some(1920),
            height: Some(1080),
            frames: Some(300),
            fps: Some(30.0),
            duration_secs: None,
            has_workflow: true,
        }));
        let extraction = Extractor::default().with_probe(probe).extract(Path::new("/videos/clip.mp4"));
        assert_eq!(extraction.kind, MediaKind::Video);
        assert_eq!(extraction.dimensions.unwrap().to_string(), "1920x1080");
        assert_eq!(extraction.duration.unwrap().to_string(), "00:10");
        assert!(extraction.has_workflow);
        assert!(!extraction.degraded);
    }

    #[test]
    fn test_video_probe_failure_keeps_kind() {
        let extraction = Extractor::default().with_probe(StubProbe(None)).extract(Path::new("/videos/clip.webm"));
        assert_eq!(extraction.kind, MediaKind::Video);
        assert_eq!(extraction.dimensions, None);
        assert_eq!(extraction.duration, None);
        assert!(extraction.degraded);
    }

    #[test]
    fn test_video_without_probe() {
        let extraction = Extractor::default().extract(Path::new("/videos/clip.mov"));
        assert_eq!(extraction.kind, MediaKind::Video);
        assert!(extraction.degraded);
    }
}
