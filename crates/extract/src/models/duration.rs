use std::fmt::{Display, Formatter, Result as FmtResult};

/// Playback length of time-based media, in whole seconds.
///
/// Displayed as `MM:SS`; minutes are not wrapped into hours, so a 90 minute
/// video is `90:00`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MediaDuration(u64);
impl MediaDuration {
    pub fn from_secs(secs: u64) -> Self {
        Self(secs)
    }

    /// Duration of `frames` played back at `fps`, truncated to whole seconds.
    ///
    /// Returns `None` for a non-positive or non-finite frame rate.
    pub fn from_frames(frames: u64, fps: f64) -> Option<Self> {
        if !fps.is_finite() || fps <= 0.0 {
            return None;
        }
        Self::from_secs_f64(frames as f64 / fps)
    }

    /// Truncates to whole seconds. `None` for negative or non-finite input.
    pub fn from_secs_f64(secs: f64) -> Option<Self> {
        if !secs.is_finite() || secs < 0.0 {
            return None;
        }
        Some(Self(secs.trunc() as u64))
    }

    pub fn as_secs(&self) -> u64 {
        self.0
    }
}
impl Display for MediaDuration {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{:02}:{:02}", self.0 / 60, self.0 % 60)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(300, 30.0, "00:10")]
    #[case(48, 16.0, "00:03")]
    #[case(47, 16.0, "00:02")]
    #[case(1, 8.0, "00:00")]
    #[case(3600, 24.0, "02:30")]
    #[case(30 * 60 * 95, 30.0, "95:00")]
    fn test_from_frames(#[case] frames: u64, #[case] fps: f64, #[case] expected: &str) {
        assert_eq!(MediaDuration::from_frames(frames, fps).unwrap().to_string(), expected);
    }

    #[rstest]
    #[case(0.0)]
    #[case(-1.0)]
    #[case(f64::NAN)]
    #[case(f64::INFINITY)]
    fn test_invalid_frame_rate(#[case] fps: f64) {
        assert_eq!(MediaDuration::from_frames(100, fps), None);
    }
}
