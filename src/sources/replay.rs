//! Replay source for recorded frames

use std::collections::VecDeque;
use std::path::Path;
use std::sync::Arc;
use tokio::time::{Duration, Interval, MissedTickBehavior, interval};
use tracing::{debug, info, trace};

use crate::clock::SharedClock;
use crate::source::FrameSource;
use crate::types::RawFrame;
use crate::{Result, StreamError};

/// Plays back recorded frame payloads at a fixed rate.
///
/// Frames are numbered from 0 in playback order and stamped with the clock
/// at emission time.
pub struct ReplaySource {
    /// Remaining payloads
    frames: VecDeque<Arc<[u8]>>,

    /// Payloads already played, kept for looping
    played: Vec<Arc<[u8]>>,

    /// Frame pacing interval, created on first use inside the runtime
    interval: Option<Interval>,

    /// Playback rate in frames per second
    fps: f64,

    looping: bool,
    next_sequence: u64,
    clock: SharedClock,
}

impl ReplaySource {
    /// Replay in-memory payloads at `fps` frames per second.
    pub fn from_frames<I, B>(frames: I, fps: f64, clock: SharedClock) -> Result<Self>
    where
        I: IntoIterator<Item = B>,
        B: Into<Arc<[u8]>>,
    {
        if !(fps.is_finite() && fps > 0.0) {
            return Err(StreamError::invalid_config("fps", "must be a positive number"));
        }

        let frames: VecDeque<Arc<[u8]>> = frames.into_iter().map(Into::into).collect();

        info!(frames = frames.len(), fps, "Replay source ready");

        Ok(Self {
            frames,
            played: Vec::new(),
            interval: None,
            fps,
            looping: false,
            next_sequence: 0,
            clock,
        })
    }

    /// Replay every regular file in `dir`, one frame per file, ordered by file name.
    pub fn from_dir<P: AsRef<Path>>(dir: P, fps: f64, clock: SharedClock) -> Result<Self> {
        let dir = dir.as_ref();
        let entries =
            std::fs::read_dir(dir).map_err(|e| StreamError::file_error(dir.to_path_buf(), e))?;

        let mut paths = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| StreamError::file_error(dir.to_path_buf(), e))?;
            let path = entry.path();
            if path.is_file() {
                paths.push(path);
            }
        }
        paths.sort();

        let mut frames = Vec::with_capacity(paths.len());
        for path in paths {
            let data = std::fs::read(&path).map_err(|e| StreamError::file_error(path.clone(), e))?;
            frames.push(data);
        }

        debug!(dir = %dir.display(), frames = frames.len(), "Loaded replay frames");
        Self::from_frames(frames, fps, clock)
    }

    /// Restart from the first frame after the last one instead of ending.
    pub fn looping(mut self, looping: bool) -> Self {
        self.looping = looping;
        self
    }

    /// Frames left before the end of the current pass
    pub fn remaining(&self) -> usize {
        self.frames.len()
    }

    pub fn fps(&self) -> f64 {
        self.fps
    }
}

#[async_trait::async_trait]
impl FrameSource for ReplaySource {
    async fn next_frame(&mut self) -> Result<Option<RawFrame>> {
        if self.frames.is_empty() {
            if !self.looping || self.played.is_empty() {
                debug!("Reached end of replay");
                return Ok(None);
            }
            self.frames.extend(self.played.drain(..));
        }

        // Wait for next frame timing (pacing)
        let fps = self.fps;
        let ticker = self.interval.get_or_insert_with(|| {
            let mut ticker = interval(Duration::from_secs_f64(1.0 / fps));
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            ticker
        });
        ticker.tick().await;

        let Some(data) = self.frames.pop_front() else {
            return Ok(None);
        };
        self.played.push(Arc::clone(&data));

        let sequence_number = self.next_sequence;
        self.next_sequence += 1;
        trace!(sequence_number, remaining = self.frames.len(), "Replaying frame");

        Ok(Some(RawFrame::new(data, sequence_number, self.clock.now_ms())))
    }

    fn name(&self) -> &str {
        "replay"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;

    fn clock() -> SharedClock {
        Arc::new(ManualClock::new(0))
    }

    #[tokio::test(start_paused = true)]
    async fn plays_frames_in_order_then_ends() {
        let mut source =
            ReplaySource::from_frames(vec![vec![1u8], vec![2u8], vec![3u8]], 30.0, clock()).unwrap();

        let mut payloads = Vec::new();
        while let Some(frame) = source.next_frame().await.unwrap() {
            payloads.push((frame.sequence_number, frame.data[0]));
        }
        assert_eq!(payloads, vec![(0, 1), (1, 2), (2, 3)]);
        assert_eq!(source.remaining(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn paces_frames_at_the_requested_rate() {
        let mut source = ReplaySource::from_frames(vec![vec![0u8]; 3], 10.0, clock()).unwrap();
        let started = tokio::time::Instant::now();

        for _ in 0..3 {
            source.next_frame().await.unwrap();
        }

        // First tick is immediate, then two 100ms intervals
        assert!(started.elapsed() >= Duration::from_millis(199));
    }

    #[tokio::test(start_paused = true)]
    async fn looping_keeps_numbering() {
        let mut source =
            ReplaySource::from_frames(vec![vec![7u8], vec![8u8]], 60.0, clock()).unwrap().looping(true);

        let mut seen = Vec::new();
        for _ in 0..5 {
            let frame = source.next_frame().await.unwrap().unwrap();
            seen.push((frame.sequence_number, frame.data[0]));
        }
        assert_eq!(seen, vec![(0, 7), (1, 8), (2, 7), (3, 8), (4, 7)]);
    }

    #[test]
    fn rejects_non_positive_rate() {
        assert!(ReplaySource::from_frames(Vec::<Vec<u8>>::new(), 0.0, clock()).is_err());
        assert!(ReplaySource::from_frames(Vec::<Vec<u8>>::new(), f64::NAN, clock()).is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn loads_directory_sorted_by_name() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("frame_002.png"), [2u8]).unwrap();
        std::fs::write(dir.path().join("frame_001.png"), [1u8]).unwrap();
        std::fs::create_dir(dir.path().join("nested")).unwrap();

        let mut source = ReplaySource::from_dir(dir.path(), 30.0, clock()).unwrap();
        assert_eq!(source.remaining(), 2);
        assert_eq!(source.next_frame().await.unwrap().unwrap().data[0], 1);
        assert_eq!(source.next_frame().await.unwrap().unwrap().data[0], 2);
    }

    #[test]
    fn missing_directory_is_a_file_error() {
        let result = ReplaySource::from_dir("/no/such/replay/dir", 30.0, clock());
        assert!(matches!(result, Err(StreamError::File { .. })));
    }
}
