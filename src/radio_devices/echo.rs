//! Loopback radio device.
//!
//! Every transmitted frame is handed straight back to the receive path at
//! a fixed strong RSSI. No medium, no topology, one node. Useful for
//! smoke-testing the engine's queue plumbing without a network; multi-node
//! behavior needs the simulator device.

use log::{log, Level};

use crate::frames::ReceivedFrame;
use crate::{RxFrameQueueSender, TxFrameQueueReceiver, MAX_NODE_COUNT};

/// RSSI attached to every echoed frame.
const ECHO_RSSI: i8 = -30;

/// Echo radio device. Stateless; the task does all the work.
pub struct RadioDevice {}

impl Default for RadioDevice {
    fn default() -> Self {
        Self::new()
    }
}

impl RadioDevice {
    pub const fn new() -> Self {
        RadioDevice {}
    }
}

/// Loops frames from the TX queue back into the RX queue.
///
/// Drops the echoed frame with a warning if the RX queue is full; the
/// engine must never be blocked by its own transmissions.
#[cfg_attr(feature = "std", embassy_executor::task(pool_size = MAX_NODE_COUNT))]
#[cfg_attr(feature = "embedded", embassy_executor::task(pool_size = 1))]
pub async fn radio_device_task(
    _radio_device: RadioDevice,
    tx_receiver: TxFrameQueueReceiver,
    rx_sender: RxFrameQueueSender,
    own_node_id: u16,
) -> ! {
    log!(Level::Info, "[{}] echo radio device task started", own_node_id);
    loop {
        let frame = tx_receiver.receive().await;
        log!(
            Level::Trace,
            "[{}] echoing frame on channel {}",
            own_node_id,
            frame.channel
        );
        if rx_sender
            .try_send(ReceivedFrame {
                frame,
                rssi: ECHO_RSSI,
            })
            .is_err()
        {
            log!(
                Level::Warn,
                "[{}] RX frame queue full, dropping echoed frame",
                own_node_id
            );
        }
    }
}
