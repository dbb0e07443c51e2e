//! Simulated radio device.
//!
//! The device does not model the medium itself; it bridges the node to an
//! external network hub through a pair of queues. Transmitted frames go
//! out on a shared "air" queue (the hub reads the transmitter from
//! `LinkFrame::src`); the hub decides who hears what, attaches the
//! per-link RSSI, and feeds each node's private input queue. This mirrors
//! how a hardware device would interrupt on reception, with the hub
//! standing in for the physics.
//!
//! Channel activity detection is not simulated: the protocol treats sends
//! as synchronous and never carrier-senses.

use embassy_futures::select::{select, Either};
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use log::{log, Level};

use crate::frames::{LinkFrame, ReceivedFrame};
use crate::{RxFrameQueueSender, TxFrameQueueReceiver, MAX_NODE_COUNT};

/// Capacity of the shared air queue (all nodes transmit into it).
pub const AIR_FRAME_QUEUE_SIZE: usize = 64;

/// Frames in flight from every node toward the network hub.
pub type AirFrameQueue =
    embassy_sync::channel::Channel<CriticalSectionRawMutex, LinkFrame, AIR_FRAME_QUEUE_SIZE>;
pub type AirFrameQueueReceiver =
    embassy_sync::channel::Receiver<'static, CriticalSectionRawMutex, LinkFrame, AIR_FRAME_QUEUE_SIZE>;
pub type AirFrameQueueSender =
    embassy_sync::channel::Sender<'static, CriticalSectionRawMutex, LinkFrame, AIR_FRAME_QUEUE_SIZE>;

/// Capacity of one node's input queue from the hub.
pub const NODE_INPUT_QUEUE_SIZE: usize = 16;

/// Frames the hub has decided this node hears, RSSI attached.
pub type NodeInputQueue =
    embassy_sync::channel::Channel<CriticalSectionRawMutex, ReceivedFrame, NODE_INPUT_QUEUE_SIZE>;
pub type NodeInputQueueReceiver = embassy_sync::channel::Receiver<
    'static,
    CriticalSectionRawMutex,
    ReceivedFrame,
    NODE_INPUT_QUEUE_SIZE,
>;
pub type NodeInputQueueSender = embassy_sync::channel::Sender<
    'static,
    CriticalSectionRawMutex,
    ReceivedFrame,
    NODE_INPUT_QUEUE_SIZE,
>;

/// Simulated radio device: one endpoint of the hub's queue pair.
pub struct RadioDevice {
    air_sender: AirFrameQueueSender,
    input_receiver: NodeInputQueueReceiver,
}

impl RadioDevice {
    /// Builds a device from the shared air queue sender and this node's
    /// private input queue receiver.
    pub const fn with(
        air_sender: AirFrameQueueSender,
        input_receiver: NodeInputQueueReceiver,
    ) -> Self {
        RadioDevice {
            air_sender,
            input_receiver,
        }
    }
}

/// Moves frames between the engine's queues and the network hub.
#[cfg_attr(feature = "std", embassy_executor::task(pool_size = MAX_NODE_COUNT))]
#[cfg_attr(feature = "embedded", embassy_executor::task(pool_size = 1))]
pub async fn radio_device_task(
    radio_device: RadioDevice,
    tx_receiver: TxFrameQueueReceiver,
    rx_sender: RxFrameQueueSender,
    own_node_id: u16,
) -> ! {
    log!(
        Level::Info,
        "[{}] simulated radio device task started",
        own_node_id
    );
    loop {
        match select(radio_device.input_receiver.receive(), tx_receiver.receive()).await {
            Either::First(received) => {
                log!(
                    Level::Trace,
                    "[{}] frame heard on channel {} rssi={}",
                    own_node_id,
                    received.frame.channel,
                    received.rssi
                );
                rx_sender.send(received).await;
            }
            Either::Second(frame) => {
                radio_device.air_sender.send(frame).await;
            }
        }
    }
}
