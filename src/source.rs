//! Frame source trait

use crate::Result;
use crate::types::RawFrame;

/// Trait for video frame sources
///
/// Sources wrap whatever produces frames (the drone's video socket, a
/// recording, a test script) and expose its push events as a pull:
///
/// - `Ok(Some(frame))` - a frame arrived
/// - `Ok(None)` - end of stream, the source will not produce again
/// - `Err(e)` - the source reported an error; it may still produce later
///
/// `next_frame` must be cancel-safe: the driver races it against commands
/// and drops the future when a command wins.
#[async_trait::async_trait]
pub trait FrameSource: Send + 'static {
    async fn next_frame(&mut self) -> Result<Option<RawFrame>>;

    /// Short description used in logs
    fn name(&self) -> &str {
        "frame source"
    }
}
