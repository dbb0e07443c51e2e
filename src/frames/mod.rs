//! Frame types: link-layer frames exchanged with the radio device and the
//! protocol frames (beacon, data, ack) encoded into them.

mod link_frame;
mod protocol_frame;

pub use link_frame::{LinkFrame, ReceivedFrame, LINK_BROADCAST, LINK_PAYLOAD_SIZE};
pub use protocol_frame::{AckFrame, BeaconFrame, DataFrame};
