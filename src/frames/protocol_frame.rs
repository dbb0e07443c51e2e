//! Protocol frame formats.
//!
//! Three frame types travel over three dedicated radio channels:
//!
//! - **Beacon** (channel 128, broadcast): tree-construction advertisement
//!   carrying the advertiser's id, its hop distance to the sink and the
//!   sink's beacon sequence number.
//! - **Data** (channel 140, unicast): one sensor reading on its way to the
//!   sink, hop count incremented at every relay.
//! - **Ack** (channel 142, unicast): per-hop acknowledgement for a data
//!   frame.
//!
//! All integers are little-endian, packed with no padding. `decode`
//! validates the exact wire size and returns `None` for anything else; a
//! frame of the wrong length on a channel is dropped by the caller.

/// Beacon advertisement, 6 bytes on the wire.
#[derive(Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "std", derive(Debug))]
pub struct BeaconFrame {
    /// Id of the node this beacon advertises as a parent candidate.
    pub adv_parent: u16,
    /// Advertised hop distance to the sink via `adv_parent`.
    pub adv_hops: u16,
    /// Sink-originated beacon sequence number.
    pub adv_seq: u16,
}

impl BeaconFrame {
    pub const CHANNEL: u8 = 128;
    pub const WIRE_SIZE: usize = 6;

    pub fn encode(&self) -> [u8; Self::WIRE_SIZE] {
        let mut buf = [0u8; Self::WIRE_SIZE];
        buf[0..2].copy_from_slice(&self.adv_parent.to_le_bytes());
        buf[2..4].copy_from_slice(&self.adv_hops.to_le_bytes());
        buf[4..6].copy_from_slice(&self.adv_seq.to_le_bytes());
        buf
    }

    pub fn decode(data: &[u8]) -> Option<Self> {
        if data.len() != Self::WIRE_SIZE {
            return None;
        }
        Some(BeaconFrame {
            adv_parent: u16::from_le_bytes([data[0], data[1]]),
            adv_hops: u16::from_le_bytes([data[2], data[3]]),
            adv_seq: u16::from_le_bytes([data[4], data[5]]),
        })
    }
}

/// Sensor reading in transit, 8 bytes on the wire.
#[derive(Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "std", derive(Debug))]
pub struct DataFrame {
    /// Originating node.
    pub src: u16,
    /// Hops traversed so far; 1 at the source, incremented per relay.
    pub hops: u16,
    /// Raw 16-bit sensor code.
    pub temp_raw: u16,
    /// Per-source sequence number.
    pub data_id: u16,
}

impl DataFrame {
    pub const CHANNEL: u8 = 140;
    pub const WIRE_SIZE: usize = 8;

    pub fn encode(&self) -> [u8; Self::WIRE_SIZE] {
        let mut buf = [0u8; Self::WIRE_SIZE];
        buf[0..2].copy_from_slice(&self.src.to_le_bytes());
        buf[2..4].copy_from_slice(&self.hops.to_le_bytes());
        buf[4..6].copy_from_slice(&self.temp_raw.to_le_bytes());
        buf[6..8].copy_from_slice(&self.data_id.to_le_bytes());
        buf
    }

    pub fn decode(data: &[u8]) -> Option<Self> {
        if data.len() != Self::WIRE_SIZE {
            return None;
        }
        Some(DataFrame {
            src: u16::from_le_bytes([data[0], data[1]]),
            hops: u16::from_le_bytes([data[2], data[3]]),
            temp_raw: u16::from_le_bytes([data[4], data[5]]),
            data_id: u16::from_le_bytes([data[6], data[7]]),
        })
    }
}

/// Per-hop acknowledgement, 5 bytes on the wire.
///
/// The `data_id` echo is informational; receivers account the ACK against
/// the link it arrived on, not against a specific data frame.
#[derive(Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "std", derive(Debug))]
pub struct AckFrame {
    /// Acknowledging node.
    pub ack_from: u16,
    /// Sequence number of the acknowledged data frame.
    pub data_id: u16,
    pub ok: u8,
}

impl AckFrame {
    pub const CHANNEL: u8 = 142;
    pub const WIRE_SIZE: usize = 5;

    pub fn encode(&self) -> [u8; Self::WIRE_SIZE] {
        let mut buf = [0u8; Self::WIRE_SIZE];
        buf[0..2].copy_from_slice(&self.ack_from.to_le_bytes());
        buf[2..4].copy_from_slice(&self.data_id.to_le_bytes());
        buf[4] = self.ok;
        buf
    }

    pub fn decode(data: &[u8]) -> Option<Self> {
        if data.len() != Self::WIRE_SIZE {
            return None;
        }
        Some(AckFrame {
            ack_from: u16::from_le_bytes([data[0], data[1]]),
            data_id: u16::from_le_bytes([data[2], data[3]]),
            ok: data[4],
        })
    }
}
