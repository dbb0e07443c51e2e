//! Convergecast data-collection protocol for wireless sensor networks.
//!
//! A single sink periodically floods beacons through the network; every
//! other node learns its one-hop neighbors from them, scores the
//! candidates under a configurable policy, and keeps a parent pointer
//! toward the sink. Sensor readings travel hop by hop along those
//! pointers over acknowledged unicast links, and every link's packet
//! reception ratio feeds back into parent selection.
//!
//! The crate runs the protocol as two embassy tasks per node: a radio
//! device task (feature-selected implementation) and the engine task
//! owning all protocol state. Applications wire them up through
//! [`ConvergecastManager`] and, on the sink, drain delivered readings
//! with [`ConvergecastManager::receive_delivery`].

#![cfg_attr(not(feature = "std"), no_std)]

#[cfg(all(feature = "radio-device-echo", feature = "radio-device-simulator"))]
compile_error!("Only one radio device feature can be enabled at a time");

#[cfg(all(
    not(test),
    not(any(feature = "radio-device-echo", feature = "radio-device-simulator"))
))]
compile_error!("At least one radio device feature must be enabled");

pub mod radio_devices;

mod diagnostics;
mod frames;
mod neighbor_table;
mod node_task;
mod parent_selection;
mod sensor;

use embassy_executor::Spawner;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;
use log::{log, Level};

use crate::node_task::node_task;
use crate::radio_devices::{radio_device_task, RadioDevice};

pub use crate::frames::{
    AckFrame, BeaconFrame, DataFrame, LinkFrame, ReceivedFrame, LINK_BROADCAST, LINK_PAYLOAD_SIZE,
};
pub use crate::neighbor_table::{Neighbor, NeighborTable, UNKNOWN_HOPS};
pub use crate::parent_selection::PickPolicy;
pub use crate::sensor::TemperatureSensor;

/// Identity of the collection sink.
pub const SINK_ID: u16 = 1;

/// Parent pointer value meaning "no parent known".
pub const NO_PARENT: u16 = 0;

/// Number of hop buckets in the sink's delivery histogram.
pub const HOPS_MAX: usize = 20;

/// Neighbor table capacity per node.
pub const NBR_CAP: usize = 10;

/// Send attempts required before a link's PRR is considered meaningful.
pub const PRR_MIN_SAMPLES: u16 = 3;

#[cfg(feature = "radio-device-simulator")]
pub(crate) const MAX_NODE_COUNT: usize = 64;

#[cfg(not(feature = "radio-device-simulator"))]
pub(crate) const MAX_NODE_COUNT: usize = 1;

/// Protocol timing and policy knobs.
///
/// All intervals are in seconds. The defaults are the deployment values;
/// demos shrink them to watch the tree form quickly.
#[derive(Clone)]
#[cfg_attr(feature = "std", derive(Debug))]
pub struct CollectionConfiguration {
    /// Sink beacon period.
    pub beacon_interval_secs: u16,
    /// Sensor sampling and transmission period.
    pub data_interval_secs: u16,
    /// Neighbor aging and parent reselection period.
    pub reselect_interval_secs: u16,
    /// Diagnostics dump period.
    pub stats_interval_secs: u16,
    /// Sink quiescence before the first beacon.
    pub startup_wait_secs: u16,
    /// Neighbor time-to-live without any interaction.
    pub neighbor_ttl_secs: u16,
    /// Parent scoring policy.
    pub policy: PickPolicy,
}

impl Default for CollectionConfiguration {
    fn default() -> Self {
        CollectionConfiguration {
            beacon_interval_secs: 45,
            data_interval_secs: 60,
            reselect_interval_secs: 9,
            stats_interval_secs: 28,
            startup_wait_secs: 5,
            neighbor_ttl_secs: 180,
            policy: PickPolicy::Prr,
        }
    }
}

/// One reading delivered at the sink.
#[derive(Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "std", derive(Debug))]
pub struct DataDelivery {
    /// Originating node.
    pub src: u16,
    /// Hops the frame traversed to reach the sink.
    pub hops: u16,
    /// Raw 16-bit sensor code.
    pub temp_raw: u16,
}

pub enum ReceiveDeliveryError {
    NotInited,
}

const TX_FRAME_QUEUE_SIZE: usize = 16;
pub(crate) type TxFrameQueue =
    Channel<CriticalSectionRawMutex, LinkFrame, TX_FRAME_QUEUE_SIZE>;
pub(crate) type TxFrameQueueReceiver =
    embassy_sync::channel::Receiver<'static, CriticalSectionRawMutex, LinkFrame, TX_FRAME_QUEUE_SIZE>;
pub(crate) type TxFrameQueueSender =
    embassy_sync::channel::Sender<'static, CriticalSectionRawMutex, LinkFrame, TX_FRAME_QUEUE_SIZE>;

#[cfg(feature = "embedded")]
static TX_FRAME_QUEUE: TxFrameQueue = Channel::new();

const RX_FRAME_QUEUE_SIZE: usize = 16;
pub(crate) type RxFrameQueue =
    Channel<CriticalSectionRawMutex, ReceivedFrame, RX_FRAME_QUEUE_SIZE>;
pub(crate) type RxFrameQueueReceiver = embassy_sync::channel::Receiver<
    'static,
    CriticalSectionRawMutex,
    ReceivedFrame,
    RX_FRAME_QUEUE_SIZE,
>;
pub(crate) type RxFrameQueueSender = embassy_sync::channel::Sender<
    'static,
    CriticalSectionRawMutex,
    ReceivedFrame,
    RX_FRAME_QUEUE_SIZE,
>;

#[cfg(feature = "embedded")]
static RX_FRAME_QUEUE: RxFrameQueue = Channel::new();

const DELIVERY_QUEUE_SIZE: usize = 10;
pub(crate) type DeliveryQueue =
    Channel<CriticalSectionRawMutex, DataDelivery, DELIVERY_QUEUE_SIZE>;
pub(crate) type DeliveryQueueReceiver = embassy_sync::channel::Receiver<
    'static,
    CriticalSectionRawMutex,
    DataDelivery,
    DELIVERY_QUEUE_SIZE,
>;
pub(crate) type DeliveryQueueSender = embassy_sync::channel::Sender<
    'static,
    CriticalSectionRawMutex,
    DataDelivery,
    DELIVERY_QUEUE_SIZE,
>;

#[cfg(feature = "embedded")]
static DELIVERY_QUEUE: DeliveryQueue = Channel::new();

enum ConvergecastManagerState {
    Uninitialized,
    Initialized {
        delivery_queue_receiver: DeliveryQueueReceiver,
    },
}

/// Entry point of the crate: spawns the per-node tasks and exposes the
/// sink-side delivery queue.
pub struct ConvergecastManager {
    state: ConvergecastManagerState,
}

impl ConvergecastManager {
    pub const fn new() -> Self {
        ConvergecastManager {
            state: ConvergecastManagerState::Uninitialized,
        }
    }

    /// Starts the protocol on this node.
    ///
    /// Spawns the radio device task and the engine task. `node_id` is the
    /// node's stable identity; the node with id [`SINK_ID`] acts as the
    /// sink.
    #[cfg(feature = "embedded")]
    pub fn initialize(
        &mut self,
        config: CollectionConfiguration,
        spawner: Spawner,
        radio_device: RadioDevice,
        sensor: TemperatureSensor,
        node_id: u16,
    ) -> Result<(), ()> {
        self.initialize_common(
            config,
            spawner,
            radio_device,
            sensor,
            &TX_FRAME_QUEUE,
            &RX_FRAME_QUEUE,
            &DELIVERY_QUEUE,
            node_id,
        )
    }

    /// Starts the protocol on this node.
    ///
    /// Spawns the radio device task and the engine task. `node_id` is the
    /// node's stable identity; the node with id [`SINK_ID`] acts as the
    /// sink. The std build leaks its queues so any number of nodes can
    /// run in one process.
    #[cfg(feature = "std")]
    pub fn initialize(
        &mut self,
        config: CollectionConfiguration,
        spawner: Spawner,
        radio_device: RadioDevice,
        sensor: TemperatureSensor,
        node_id: u16,
    ) -> Result<(), ()> {
        let tx_frame_queue: &'static TxFrameQueue = Box::leak(Box::new(Channel::new()));
        let rx_frame_queue: &'static RxFrameQueue = Box::leak(Box::new(Channel::new()));
        let delivery_queue: &'static DeliveryQueue = Box::leak(Box::new(Channel::new()));
        self.initialize_common(
            config,
            spawner,
            radio_device,
            sensor,
            tx_frame_queue,
            rx_frame_queue,
            delivery_queue,
            node_id,
        )
    }

    #[allow(clippy::too_many_arguments)]
    fn initialize_common(
        &mut self,
        config: CollectionConfiguration,
        spawner: Spawner,
        radio_device: RadioDevice,
        sensor: TemperatureSensor,
        tx_frame_queue: &'static TxFrameQueue,
        rx_frame_queue: &'static RxFrameQueue,
        delivery_queue: &'static DeliveryQueue,
        node_id: u16,
    ) -> Result<(), ()> {
        let radio_task_result = spawner.spawn(radio_device_task(
            radio_device,
            tx_frame_queue.receiver(),
            rx_frame_queue.sender(),
            node_id,
        ));
        if radio_task_result.is_err() {
            return Err(());
        }
        log!(Level::Debug, "[{}] radio device task spawned", node_id);

        let node_task_result = spawner.spawn(node_task(
            config,
            node_id,
            sensor,
            tx_frame_queue.sender(),
            rx_frame_queue.receiver(),
            delivery_queue.sender(),
        ));
        if node_task_result.is_err() {
            return Err(());
        }
        log!(Level::Debug, "[{}] collection node task spawned", node_id);
        log!(Level::Info, "[{}] convergecast node initialized", node_id);

        self.state = ConvergecastManagerState::Initialized {
            delivery_queue_receiver: delivery_queue.receiver(),
        };
        Ok(())
    }

    /// Waits for the next reading delivered at the sink.
    ///
    /// On non-sink nodes the queue simply never produces anything.
    pub async fn receive_delivery(&self) -> Result<DataDelivery, ReceiveDeliveryError> {
        let delivery_queue_receiver = match &self.state {
            ConvergecastManagerState::Uninitialized => {
                return Err(ReceiveDeliveryError::NotInited);
            }
            ConvergecastManagerState::Initialized {
                delivery_queue_receiver,
            } => delivery_queue_receiver,
        };
        Ok(delivery_queue_receiver.receive().await)
    }
}

#[cfg(all(test, feature = "std"))]
mod tests {
    use super::*;
    use futures::executor::block_on;

    #[test]
    fn default_configuration_matches_deployment_values() {
        let config = CollectionConfiguration::default();
        assert_eq!(config.beacon_interval_secs, 45);
        assert_eq!(config.data_interval_secs, 60);
        assert_eq!(config.reselect_interval_secs, 9);
        assert_eq!(config.stats_interval_secs, 28);
        assert_eq!(config.startup_wait_secs, 5);
        assert_eq!(config.neighbor_ttl_secs, 180);
        assert_eq!(config.policy, PickPolicy::Prr);
    }

    #[test]
    fn manager_receive_delivery_not_inited() {
        let manager = ConvergecastManager::new();
        let result = block_on(manager.receive_delivery());
        assert!(matches!(result, Err(ReceiveDeliveryError::NotInited)));
    }

    #[test]
    fn sink_and_broadcast_constants() {
        assert_eq!(SINK_ID, 1);
        assert_eq!(NO_PARENT, LINK_BROADCAST);
    }
}
