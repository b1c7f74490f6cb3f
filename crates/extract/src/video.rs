//! Video metadata, read by an external probe.

use crate::error::{ErrorKind, Result};
use crate::models::{Dimensions, MediaDuration};
use crate::workflow;
use exn::{OptionExt, ResultExt};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fmt::Debug;
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::instrument;

/// Reads stream information out of a video container.
///
/// Implementations block; call them from a blocking context.
pub trait VideoProbe: Send + Sync + Debug {
    fn probe(&self, path: &Path) -> Result<VideoInfo>;
}

/// What a probe found out about a video.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VideoInfo {
    pub width: Option<u32>,
    pub height: Option<u32>,
    /// Frame count as reported by the container, when it reports one.
    pub frames: Option<u64>,
    pub fps: Option<f64>,
    /// Container-reported duration, used when there's no frame count.
    pub duration_secs: Option<f64>,
    pub has_workflow: bool,
}
impl VideoInfo {
    pub fn dimensions(&self) -> Option<Dimensions> {
        Some(Dimensions::new(self.width?, self.height?))
    }

    /// Frame count over frame rate when both are known, else the container's
    /// own duration.
    pub fn duration(&self) -> Option<MediaDuration> {
        if let (Some(frames), Some(fps)) = (self.frames, self.fps)
            && let Some(duration) = MediaDuration::from_frames(frames, fps)
        {
            return Some(duration);
        }
        self.duration_secs.and_then(MediaDuration::from_secs_f64)
    }
}

/// [`VideoProbe`] backed by the `ffprobe` binary from FFmpeg.
#[derive(Debug, Clone)]
pub struct Ffprobe {
    binary: PathBuf,
}
impl Ffprobe {
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self { binary: binary.into() }
    }

    /// Find `ffprobe` on the `PATH`.
    pub fn discover() -> Result<Self> {
        let binary = which::which("ffprobe").or_raise(|| ErrorKind::ProbeUnavailable)?;
        tracing::debug!(binary = %binary.display(), "Found ffprobe");
        Ok(Self::new(binary))
    }

    pub fn binary(&self) -> &Path {
        &self.binary
    }

    /// Interpret the JSON printed by `ffprobe -print_format json -show_format -show_streams`.
    pub fn parse(json: &[u8]) -> Result<VideoInfo> {
        let output: ProbeOutput = serde_json::from_slice(json).or_raise(|| ErrorKind::ParseError {
            field: "ffprobe",
            value: String::from_utf8_lossy(json).chars().take(200).collect(),
        })?;
        let stream = output
            .streams
            .iter()
            .find(|s| s.codec_type.as_deref() == Some("video"))
            .ok_or_raise(|| ErrorKind::Probe(String::from("no video stream")))?;

        let has_workflow = output
            .streams
            .iter()
            .map(|s| &s.tags)
            .chain(std::iter::once(&output.format.tags))
            .any(tags_mention_workflow);

        Ok(VideoInfo {
            width: stream.width,
            height: stream.height,
            frames: stream.nb_frames.as_deref().and_then(|n| n.trim().parse().ok()),
            fps: [&stream.r_frame_rate, &stream.avg_frame_rate]
                .into_iter()
                .find_map(|rate| rate.as_deref().and_then(parse_rate)),
            duration_secs: [&stream.duration, &output.format.duration]
                .into_iter()
                .find_map(|d| d.as_deref().and_then(|d| d.trim().parse().ok())),
            has_workflow,
        })
    }
}
impl VideoProbe for Ffprobe {
    #[instrument(skip_all, fields(path = %path.display()))]
    fn probe(&self, path: &Path) -> Result<VideoInfo> {
        let output = Command::new(&self.binary)
            .args(["-v", "quiet", "-print_format", "json", "-show_format", "-show_streams"])
            .arg(path)
            .output()
            .or_raise(|| ErrorKind::ProbeUnavailable)?;
        if !output.status.success() {
            exn::bail!(ErrorKind::Probe(format!("ffprobe exited with {}", output.status)));
        }
        Self::parse(&output.stdout)
    }
}

#[derive(Debug, Default, Deserialize)]
struct ProbeOutput {
    #[serde(default)]
    streams: Vec<ProbeStream>,
    #[serde(default)]
    format: ProbeFormat,
}

#[derive(Debug, Default, Deserialize)]
struct ProbeStream {
    codec_type: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    nb_frames: Option<String>,
    r_frame_rate: Option<String>,
    avg_frame_rate: Option<String>,
    duration: Option<String>,
    #[serde(default)]
    tags: BTreeMap<String, String>,
}

#[derive(Debug, Default, Deserialize)]
struct ProbeFormat {
    duration: Option<String>,
    #[serde(default)]
    tags: BTreeMap<String, String>,
}

/// `"30000/1001"` or `"30"`. Zero rates (`"0/0"`) mean unknown.
fn parse_rate(rate: &str) -> Option<f64> {
    let fps = match rate.split_once('/') {
        Some((num, den)) => {
            let den: f64 = den.trim().parse().ok()?;
            if den == 0.0 {
                return None;
            }
            num.trim().parse::<f64>().ok()? / den
        },
        None => rate.trim().parse().ok()?,
    };
    (fps.is_finite() && fps > 0.0).then_some(fps)
}

fn tags_mention_workflow(tags: &BTreeMap<String, String>) -> bool {
    tags.iter().any(|(key, value)| {
        workflow::is_workflow_key(key)
            || (matches!(key.to_ascii_lowercase().as_str(), "comment" | "description") && workflow::mentions_workflow(value.as_bytes()))
    })
}
