//! Frame source implementations

pub mod channel;
pub mod replay;

pub use channel::{ChannelSource, FrameSender};
pub use replay::ReplaySource;
