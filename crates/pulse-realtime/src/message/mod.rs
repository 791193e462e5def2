//! Wire frame and message type definitions.

pub mod frames;

pub use frames::{
    BroadcastOutcome, BroadcastRequest, ChannelMessage, ChannelStats, DeliveryOutcome,
    InboundFrame, OutboundFrame, SubscriptionConfig,
};
