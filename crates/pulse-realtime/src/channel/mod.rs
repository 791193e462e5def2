//! Channel index — channel name to subscriber set.

pub mod index;

pub use index::ChannelIndex;
