//! Link-layer frame carried between the protocol engine and the radio device.
//!
//! A `LinkFrame` is the unit the radio moves: a channel byte for
//! demultiplexing, the transmitter's link address, a destination address
//! (0 = broadcast) and a fixed-size payload buffer holding one encoded
//! protocol frame. Received frames additionally carry the RSSI attribute
//! the radio measured for them.

/// Destination address meaning "all nodes in range".
pub const LINK_BROADCAST: u16 = 0;

/// Payload capacity of a link frame. Sized for the largest protocol frame
/// (the 8-byte data frame).
pub const LINK_PAYLOAD_SIZE: usize = 8;

/// Wire-level frame exchanged with the radio device.
///
/// The `data` and `length` fields are public so radio device
/// implementations can access the buffer directly without copying.
#[derive(Clone, PartialEq, Eq)]
#[cfg_attr(feature = "std", derive(Debug))]
pub struct LinkFrame {
    /// Logical radio channel this frame travels on.
    pub channel: u8,
    /// Link address of the transmitting node.
    pub src: u16,
    /// Link address of the addressed node, or [`LINK_BROADCAST`].
    pub dest: u16,
    /// Raw payload buffer.
    pub data: [u8; LINK_PAYLOAD_SIZE],
    /// Number of valid bytes in `data`.
    pub length: usize,
}

impl LinkFrame {
    /// Builds a broadcast frame from an encoded protocol frame.
    pub fn broadcast(channel: u8, src: u16, payload: &[u8]) -> Self {
        Self::unicast(channel, src, LINK_BROADCAST, payload)
    }

    /// Builds a unicast frame addressed to `dest`.
    ///
    /// Payload bytes beyond [`LINK_PAYLOAD_SIZE`] are truncated; all
    /// protocol frames fit the buffer.
    pub fn unicast(channel: u8, src: u16, dest: u16, payload: &[u8]) -> Self {
        let length = payload.len().min(LINK_PAYLOAD_SIZE);
        let mut data = [0u8; LINK_PAYLOAD_SIZE];
        data[..length].copy_from_slice(&payload[..length]);
        LinkFrame {
            channel,
            src,
            dest,
            data,
            length,
        }
    }

    pub fn is_broadcast(&self) -> bool {
        self.dest == LINK_BROADCAST
    }

    /// The valid portion of the payload buffer.
    pub fn payload(&self) -> &[u8] {
        &self.data[..self.length]
    }
}

/// A frame handed up by the radio device, together with the RSSI attribute
/// of the reception, in signed decibels.
#[derive(Clone)]
#[cfg_attr(feature = "std", derive(Debug))]
pub struct ReceivedFrame {
    pub frame: LinkFrame,
    pub rssi: i8,
}

#[cfg(all(test, feature = "std"))]
mod tests {
    use super::*;

    #[test]
    fn broadcast_frame_has_broadcast_dest() {
        let frame = LinkFrame::broadcast(128, 7, &[1, 2, 3]);
        assert!(frame.is_broadcast());
        assert_eq!(frame.src, 7);
        assert_eq!(frame.payload(), &[1, 2, 3]);
    }

    #[test]
    fn unicast_frame_keeps_dest_and_payload() {
        let frame = LinkFrame::unicast(140, 3, 1, &[0xAA; 8]);
        assert!(!frame.is_broadcast());
        assert_eq!(frame.dest, 1);
        assert_eq!(frame.length, 8);
        assert_eq!(frame.payload(), &[0xAA; 8]);
    }

    #[test]
    fn oversized_payload_is_truncated() {
        let frame = LinkFrame::broadcast(128, 2, &[9; 12]);
        assert_eq!(frame.length, LINK_PAYLOAD_SIZE);
    }
}
