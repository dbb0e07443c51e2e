//! Three-node line demo: sink (1) - relay (2) - leaf (3).
//!
//! Runs all three nodes in one process over the simulator radio device.
//! A small network hub stands in for the physics: it reads transmitted
//! frames off the shared air queue and hands them to every node in range,
//! attaching the per-link RSSI. Intervals are shrunk from the deployment
//! defaults so the tree forms within seconds.
//!
//!     cargo run --example three-node-line

use embassy_executor::Spawner;
use env_logger::Builder;
use log::LevelFilter;

use convergecast_radio_lib::radio_devices::simulator::{
    AirFrameQueue, AirFrameQueueReceiver, NodeInputQueue, NodeInputQueueSender,
};
use convergecast_radio_lib::radio_devices::RadioDevice;
use convergecast_radio_lib::{
    CollectionConfiguration, ConvergecastManager, PickPolicy, ReceivedFrame, TemperatureSensor,
    SINK_ID,
};

/// Bidirectional radio links: (node a, node b, RSSI heard on the link).
const LINKS: &[(u16, u16, i8)] = &[(1, 2, -55), (2, 3, -63)];

const NODE_IDS: &[u16] = &[1, 2, 3];

/// Delivers every transmitted frame to the nodes in range.
#[embassy_executor::task]
async fn hub_task(
    air_receiver: AirFrameQueueReceiver,
    inputs: &'static [(u16, NodeInputQueueSender)],
) {
    loop {
        let frame = air_receiver.receive().await;
        for &(a, b, rssi) in LINKS {
            let peer = if frame.src == a {
                b
            } else if frame.src == b {
                a
            } else {
                continue;
            };
            if !frame.is_broadcast() && frame.dest != peer {
                continue;
            }
            if let Some((_, sender)) = inputs.iter().find(|(id, _)| *id == peer) {
                if sender
                    .try_send(ReceivedFrame {
                        frame: frame.clone(),
                        rssi,
                    })
                    .is_err()
                {
                    log::warn!("hub: input queue of node {} full, dropping frame", peer);
                }
            }
        }
    }
}

#[embassy_executor::main]
async fn main(spawner: Spawner) {
    Builder::new().filter_level(LevelFilter::Info).init();

    let air: &'static AirFrameQueue = Box::leak(Box::new(AirFrameQueue::new()));
    let config = CollectionConfiguration {
        beacon_interval_secs: 8,
        data_interval_secs: 10,
        reselect_interval_secs: 3,
        stats_interval_secs: 15,
        startup_wait_secs: 2,
        neighbor_ttl_secs: 30,
        policy: PickPolicy::Hop,
    };

    let mut sink_manager: Option<&'static ConvergecastManager> = None;
    let mut inputs: Vec<(u16, NodeInputQueueSender)> = Vec::new();

    for &node_id in NODE_IDS {
        let input: &'static NodeInputQueue = Box::leak(Box::new(NodeInputQueue::new()));
        let device = RadioDevice::with(air.sender(), input.receiver());

        let mut manager = ConvergecastManager::new();
        manager
            .initialize(
                config.clone(),
                spawner,
                device,
                TemperatureSensor::ramp(6000, 7),
                node_id,
            )
            .expect("spawning node tasks");
        let manager: &'static ConvergecastManager = Box::leak(Box::new(manager));
        if node_id == SINK_ID {
            sink_manager = Some(manager);
        }
        inputs.push((node_id, input.sender()));
    }

    let inputs: &'static [(u16, NodeInputQueueSender)] = Box::leak(inputs.into_boxed_slice());
    spawner.spawn(hub_task(air.receiver(), inputs)).unwrap();

    let sink_manager = sink_manager.expect("one node is the sink");
    loop {
        match sink_manager.receive_delivery().await {
            Ok(delivery) => {
                println!(
                    "delivered: src={} hops={} raw={}",
                    delivery.src, delivery.hops, delivery.temp_raw
                );
            }
            Err(_) => unreachable!("sink manager is initialized"),
        }
    }
}
