//! # Collection Node Engine
//!
//! One task per node owns all protocol state and multiplexes the four
//! periodic activities with radio reception:
//!
//! - **Beacon** (sink only): broadcast a tree advertisement every beacon
//!   interval, after an initial startup quiescence.
//! - **Data**: sample the sensor and unicast the reading to the current
//!   parent, desynchronized across nodes by `id mod interval`.
//! - **Selection**: age out stale neighbors, then re-evaluate the parent
//!   under the configured policy.
//! - **Stats**: dump the sink's hop histogram or the node's neighbor
//!   table.
//!
//! The engine keeps one deadline per activity and sleeps until the
//! earliest of them, unless a frame arrives first. Because a single task
//! owns the neighbor table, the parent pointer and the sequence state,
//! receive handling is atomic with respect to the periodic work and no
//! locking is needed. The receive arm of the select is polled first, so a
//! beacon that arrives before a due reselect influences that reselect.

use embassy_futures::select::{select, Either};
use embassy_time::{Duration, Instant, Timer};
use log::{log, Level};

use crate::diagnostics::{self, TemperatureDisplay};
use crate::frames::{AckFrame, BeaconFrame, DataFrame, LinkFrame, ReceivedFrame};
use crate::neighbor_table::NeighborTable;
use crate::parent_selection::{select_parent, PickPolicy};
use crate::sensor::TemperatureSensor;
use crate::{
    CollectionConfiguration, DataDelivery, DeliveryQueueSender, RxFrameQueueReceiver,
    TxFrameQueueSender, HOPS_MAX, MAX_NODE_COUNT, NBR_CAP, NO_PARENT, SINK_ID,
};

/// Protocol state of one node. Owned exclusively by [`node_task`].
pub(crate) struct NodeState<const CAP: usize> {
    node_id: u16,
    policy: PickPolicy,
    neighbor_ttl: Duration,
    neighbors: NeighborTable<CAP>,
    /// Current parent, or [`NO_PARENT`].
    next_hop: u16,
    /// Per-source data sequence; consumed only when a frame is sent.
    data_seq: u16,
    /// Sink-side beacon sequence.
    disc_seq_tx: u16,
    /// Flood filter: last accepted beacon sequence, 0 before the first.
    prev_seen_beacon_seq: u16,
    /// Sink-side delivery histogram, bucketed by final hop count.
    hop_hist: [u16; HOPS_MAX],
}

/// Outcome of receiving a data frame.
pub(crate) struct DataHandling {
    pub(crate) ack: AckFrame,
    /// Frame to relay onward, with its unicast destination.
    pub(crate) forward: Option<(DataFrame, u16)>,
    /// Reading to hand to the sink application.
    pub(crate) delivery: Option<DataDelivery>,
}

impl<const CAP: usize> NodeState<CAP> {
    pub(crate) fn new(node_id: u16, policy: PickPolicy, neighbor_ttl: Duration) -> Self {
        NodeState {
            node_id,
            policy,
            neighbor_ttl,
            neighbors: NeighborTable::new(),
            next_hop: NO_PARENT,
            data_seq: 0,
            disc_seq_tx: 0,
            prev_seen_beacon_seq: 0,
            hop_hist: [0; HOPS_MAX],
        }
    }

    pub(crate) fn node_id(&self) -> u16 {
        self.node_id
    }

    pub(crate) fn next_hop(&self) -> u16 {
        self.next_hop
    }

    pub(crate) fn data_seq(&self) -> u16 {
        self.data_seq
    }

    pub(crate) fn neighbors(&self) -> &NeighborTable<CAP> {
        &self.neighbors
    }

    pub(crate) fn hop_hist(&self) -> &[u16; HOPS_MAX] {
        &self.hop_hist
    }

    fn is_sink(&self) -> bool {
        self.node_id == SINK_ID
    }

    /// Builds the sink's next beacon, consuming one sequence number.
    fn next_beacon(&mut self) -> BeaconFrame {
        self.disc_seq_tx = self.disc_seq_tx.wrapping_add(1);
        BeaconFrame {
            adv_parent: SINK_ID,
            adv_hops: 1,
            adv_seq: self.disc_seq_tx,
        }
    }

    /// Processes a received beacon. Returns the rebroadcast frame when the
    /// flood filter accepts it.
    ///
    /// The advertiser is recorded as a neighbor candidate whether or not
    /// the beacon is forwarded; only forwarding is filtered. The very
    /// first beacon a node ever hears also bootstraps its parent pointer
    /// so data can flow before the first reselect pass.
    fn handle_beacon(
        &mut self,
        from: u16,
        beacon: BeaconFrame,
        rssi: i8,
        now: Instant,
    ) -> Option<BeaconFrame> {
        if self.is_sink() {
            return None;
        }

        log!(
            Level::Debug,
            "[beacon] from={} seq={} hop={} rssi={}",
            from,
            beacon.adv_seq,
            beacon.adv_hops,
            rssi
        );

        self.neighbors
            .upsert(beacon.adv_parent, rssi, beacon.adv_hops, now);

        if self.prev_seen_beacon_seq == 0 {
            self.parent_set(beacon.adv_parent);
        } else if beacon.adv_seq <= self.prev_seen_beacon_seq {
            return None;
        }
        self.prev_seen_beacon_seq = beacon.adv_seq;

        let forward = BeaconFrame {
            adv_parent: self.node_id,
            adv_hops: beacon.adv_hops.saturating_add(1),
            adv_seq: beacon.adv_seq,
        };
        log!(
            Level::Debug,
            "[beacon] fwd seq={} newhop={}",
            forward.adv_seq,
            forward.adv_hops
        );
        Some(forward)
    }

    fn parent_set(&mut self, id: u16) {
        if self.next_hop == id {
            return;
        }
        self.next_hop = id;
        match self.neighbors.find(id) {
            Some(n) => log!(
                Level::Info,
                "[route] parent={} (hop={} rssi={} prr={}%)",
                id,
                n.hops_via,
                n.rssi,
                n.prr_percent()
            ),
            None => log!(Level::Info, "[route] parent={} (hop=0 rssi=0 prr=-1%)", id),
        }
    }

    /// Charges one send attempt against the current parent's link.
    fn charge_send(&mut self) {
        self.neighbors.prr_bump(self.next_hop, false);
    }

    /// Builds the next source data frame for a non-sink node, or `None`
    /// when there is no parent (the sample is dropped and the sequence
    /// number is not consumed).
    fn next_sample(&mut self, raw: u16) -> Option<(DataFrame, u16)> {
        if self.next_hop == NO_PARENT {
            return None;
        }
        self.data_seq = self.data_seq.wrapping_add(1);
        let frame = DataFrame {
            src: self.node_id,
            hops: 1,
            temp_raw: raw,
            data_id: self.data_seq,
        };
        self.charge_send();
        log!(
            Level::Debug,
            "[tx] node={} -> {} id={}",
            self.node_id,
            self.next_hop,
            self.data_seq
        );
        Some((frame, self.next_hop))
    }

    /// The sink's own data period: it is zero hops from itself.
    fn record_sink_period(&mut self) {
        self.hop_hist[0] = self.hop_hist[0].saturating_add(1);
    }

    /// Processes a received data frame: acknowledge, keep the sender
    /// alive as a child, then deliver (sink) or relay (forwarder).
    fn handle_data(&mut self, from: u16, data: DataFrame, now: Instant) -> DataHandling {
        let ack = AckFrame {
            ack_from: self.node_id,
            data_id: data.data_id,
            ok: 1,
        };
        self.neighbors.touch(from, now);

        if self.is_sink() {
            if (data.hops as usize) < HOPS_MAX {
                let bucket = data.hops as usize;
                self.hop_hist[bucket] = self.hop_hist[bucket].saturating_add(1);
            }
            log!(
                Level::Info,
                "[sink] recv src={} hops={} temp={}",
                data.src,
                data.hops,
                TemperatureDisplay(data.temp_raw)
            );
            return DataHandling {
                ack,
                forward: None,
                delivery: Some(DataDelivery {
                    src: data.src,
                    hops: data.hops,
                    temp_raw: data.temp_raw,
                }),
            };
        }

        let mut relayed = data;
        relayed.hops = relayed.hops.saturating_add(1);

        let forward = if self.next_hop == NO_PARENT {
            log!(
                Level::Debug,
                "[relay] me={} no parent, dropping src={}",
                self.node_id,
                relayed.src
            );
            None
        } else if self.next_hop == relayed.src {
            // tree shape violated: forwarding would hand the frame back
            // to its origin
            log!(
                Level::Warn,
                "[relay] me={} refusing loop src={} == parent",
                self.node_id,
                relayed.src
            );
            None
        } else {
            self.charge_send();
            log!(
                Level::Debug,
                "[relay] me={} fwd src={} -> parent={}",
                self.node_id,
                relayed.src,
                self.next_hop
            );
            Some((relayed, self.next_hop))
        };

        DataHandling {
            ack,
            forward,
            delivery: None,
        }
    }

    /// Processes an acknowledgement: credit the link and keep the
    /// neighbor alive. The payload is not otherwise interpreted.
    fn handle_ack(&mut self, from: u16, ack: AckFrame, now: Instant) {
        log!(Level::Debug, "[ack] from={} data={}", from, ack.data_id);
        self.neighbors.prr_bump(from, true);
        self.neighbors.touch(from, now);
    }

    /// One selection pass: expire stale neighbors, then re-pick the
    /// parent. Losing the parent to aging clears the pointer; the next
    /// pass (or beacon bootstrap after a fresh start) reacquires one.
    fn run_reselect(&mut self, now: Instant) {
        if self
            .neighbors
            .expire(now, self.neighbor_ttl, self.next_hop)
        {
            log!(Level::Info, "[aging] parent {} expired; reset", self.next_hop);
            self.next_hop = NO_PARENT;
        }
        if !self.is_sink() {
            if let Some(best) = select_parent(&self.neighbors, self.policy) {
                self.parent_set(best);
            }
        }
    }

    fn log_stats(&self) {
        if self.is_sink() {
            diagnostics::log_hop_histogram(&self.hop_hist);
        } else {
            diagnostics::log_neighbor_dump(
                self.node_id,
                self.next_hop,
                self.policy,
                self.neighbors.iter(),
            );
        }
    }
}

/// Deadlines of the periodic activities.
///
/// First firings follow the startup schedule: the sink's first beacon
/// after the startup quiescence, the first data frame after the per-node
/// desynchronization offset plus one full interval, selection and stats
/// after one interval each.
struct ActivityTimers {
    beacon_at: Option<Instant>,
    data_at: Instant,
    reselect_at: Instant,
    stats_at: Instant,
    beacon_period: Duration,
    data_period: Duration,
    reselect_period: Duration,
    stats_period: Duration,
}

impl ActivityTimers {
    fn new(config: &CollectionConfiguration, node_id: u16, start: Instant) -> Self {
        let beacon_period = Duration::from_secs(config.beacon_interval_secs.max(1) as u64);
        let data_interval = config.data_interval_secs.max(1);
        let data_period = Duration::from_secs(data_interval as u64);
        let reselect_period = Duration::from_secs(config.reselect_interval_secs.max(1) as u64);
        let stats_period = Duration::from_secs(config.stats_interval_secs.max(1) as u64);

        let beacon_at = if node_id == SINK_ID {
            Some(start + Duration::from_secs(config.startup_wait_secs as u64))
        } else {
            None
        };
        let desync = Duration::from_secs((node_id % data_interval) as u64);

        ActivityTimers {
            beacon_at,
            data_at: start + desync + data_period,
            reselect_at: start + reselect_period,
            stats_at: start + stats_period,
            beacon_period,
            data_period,
            reselect_period,
            stats_period,
        }
    }

    fn next_deadline(&self) -> Instant {
        let mut next = self.data_at.min(self.reselect_at).min(self.stats_at);
        if let Some(beacon_at) = self.beacon_at {
            next = next.min(beacon_at);
        }
        next
    }
}

fn send_frame(sender: &TxFrameQueueSender, frame: LinkFrame, own_node_id: u16) {
    if sender.try_send(frame).is_err() {
        log!(
            Level::Warn,
            "[{}] TX frame queue full, dropping frame",
            own_node_id
        );
    }
}

/// Dispatches one received frame by channel.
fn handle_frame<const CAP: usize>(
    state: &mut NodeState<CAP>,
    received: ReceivedFrame,
    tx_sender: &TxFrameQueueSender,
    delivery_sender: &DeliveryQueueSender,
) {
    let ReceivedFrame { frame, rssi } = received;
    let node_id = state.node_id();
    if !frame.is_broadcast() && frame.dest != node_id {
        return;
    }
    let now = Instant::now();

    match frame.channel {
        BeaconFrame::CHANNEL => match BeaconFrame::decode(frame.payload()) {
            Some(beacon) => {
                if let Some(forward) = state.handle_beacon(frame.src, beacon, rssi, now) {
                    send_frame(
                        tx_sender,
                        LinkFrame::broadcast(BeaconFrame::CHANNEL, node_id, &forward.encode()),
                        node_id,
                    );
                }
            }
            None => log!(
                Level::Warn,
                "[{}] malformed beacon from {}, dropping",
                node_id,
                frame.src
            ),
        },
        DataFrame::CHANNEL => match DataFrame::decode(frame.payload()) {
            Some(data) => {
                let handling = state.handle_data(frame.src, data, now);
                send_frame(
                    tx_sender,
                    LinkFrame::unicast(AckFrame::CHANNEL, node_id, frame.src, &handling.ack.encode()),
                    node_id,
                );
                if let Some((forward, dest)) = handling.forward {
                    send_frame(
                        tx_sender,
                        LinkFrame::unicast(DataFrame::CHANNEL, node_id, dest, &forward.encode()),
                        node_id,
                    );
                }
                if let Some(delivery) = handling.delivery {
                    if delivery_sender.try_send(delivery).is_err() {
                        log!(
                            Level::Warn,
                            "[{}] delivery queue full, dropping reading",
                            node_id
                        );
                    }
                }
            }
            None => log!(
                Level::Warn,
                "[{}] malformed data frame from {}, dropping",
                node_id,
                frame.src
            ),
        },
        AckFrame::CHANNEL => match AckFrame::decode(frame.payload()) {
            Some(ack) => state.handle_ack(frame.src, ack, now),
            None => log!(
                Level::Warn,
                "[{}] malformed ack from {}, dropping",
                node_id,
                frame.src
            ),
        },
        other => log!(
            Level::Trace,
            "[{}] frame on unknown channel {}, ignoring",
            node_id,
            other
        ),
    }
}

/// Collection node engine task.
///
/// Owns the [`NodeState`] for its lifetime; everything that mutates
/// protocol state happens inside this loop.
#[cfg_attr(feature = "std", embassy_executor::task(pool_size = MAX_NODE_COUNT))]
#[cfg_attr(feature = "embedded", embassy_executor::task(pool_size = 1))]
pub(crate) async fn node_task(
    config: CollectionConfiguration,
    node_id: u16,
    mut sensor: TemperatureSensor,
    tx_frame_queue_sender: TxFrameQueueSender,
    rx_frame_queue_receiver: RxFrameQueueReceiver,
    delivery_queue_sender: DeliveryQueueSender,
) -> ! {
    log!(
        Level::Info,
        "[{}] collection node task started (policy={:?})",
        node_id,
        config.policy
    );

    let mut state = NodeState::<NBR_CAP>::new(
        node_id,
        config.policy,
        Duration::from_secs(config.neighbor_ttl_secs as u64),
    );
    let mut timers = ActivityTimers::new(&config, node_id, Instant::now());

    loop {
        match select(
            rx_frame_queue_receiver.receive(),
            Timer::at(timers.next_deadline()),
        )
        .await
        {
            Either::First(received) => handle_frame(
                &mut state,
                received,
                &tx_frame_queue_sender,
                &delivery_queue_sender,
            ),
            Either::Second(()) => {
                let now = Instant::now();

                if let Some(beacon_at) = timers.beacon_at {
                    if beacon_at <= now {
                        let beacon = state.next_beacon();
                        // indicator blink stands in for the sink's TX LED
                        log!(Level::Trace, "[{}] beacon indicator blink", node_id);
                        send_frame(
                            &tx_frame_queue_sender,
                            LinkFrame::broadcast(BeaconFrame::CHANNEL, node_id, &beacon.encode()),
                            node_id,
                        );
                        timers.beacon_at = Some(beacon_at + timers.beacon_period);
                    }
                }

                if timers.data_at <= now {
                    if node_id == SINK_ID {
                        state.record_sink_period();
                    } else if let Some((frame, dest)) = state.next_sample(sensor.sample()) {
                        send_frame(
                            &tx_frame_queue_sender,
                            LinkFrame::unicast(DataFrame::CHANNEL, node_id, dest, &frame.encode()),
                            node_id,
                        );
                    }
                    timers.data_at = timers.data_at + timers.data_period;
                }

                if timers.reselect_at <= now {
                    state.run_reselect(now);
                    timers.reselect_at = timers.reselect_at + timers.reselect_period;
                }

                if timers.stats_at <= now {
                    state.log_stats();
                    timers.stats_at = timers.stats_at + timers.stats_period;
                }
            }
        }
    }
}

#[cfg(all(test, feature = "std"))]
mod tests {
    use super::*;
    use crate::neighbor_table::UNKNOWN_HOPS;

    const TTL: Duration = Duration::from_secs(180);

    fn at(secs: u64) -> Instant {
        Instant::from_secs(secs)
    }

    fn node(id: u16, policy: PickPolicy) -> NodeState<NBR_CAP> {
        NodeState::new(id, policy, TTL)
    }

    #[test]
    fn sink_beacons_count_up_from_one() {
        let mut sink = node(SINK_ID, PickPolicy::Hop);
        let first = sink.next_beacon();
        assert_eq!(
            first,
            BeaconFrame {
                adv_parent: SINK_ID,
                adv_hops: 1,
                adv_seq: 1
            }
        );
        assert_eq!(sink.next_beacon().adv_seq, 2);
    }

    #[test]
    fn sink_ignores_received_beacons() {
        let mut sink = node(SINK_ID, PickPolicy::Hop);
        let beacon = BeaconFrame {
            adv_parent: 2,
            adv_hops: 2,
            adv_seq: 1,
        };
        assert!(sink.handle_beacon(2, beacon, -50, at(0)).is_none());
        assert!(sink.neighbors().is_empty());
    }

    #[test]
    fn two_node_line_delivers_one_reading() {
        let mut sink = node(1, PickPolicy::Hop);
        let mut leaf = node(2, PickPolicy::Hop);

        let beacon = sink.next_beacon();
        let forward = leaf.handle_beacon(1, beacon, -60, at(5));
        assert!(forward.is_some());
        assert_eq!(leaf.next_hop(), 1);
        assert_eq!(leaf.neighbors().find(1).unwrap().hops_via, 1);

        let (data, dest) = leaf.next_sample(6000).unwrap();
        assert_eq!(dest, 1);
        assert_eq!(data.src, 2);
        assert_eq!(data.hops, 1);
        assert_eq!(data.data_id, 1);
        // attempt charged at send time
        assert_eq!(leaf.neighbors().find(1).unwrap().tx, 1);

        let handling = sink.handle_data(2, data, at(6));
        assert_eq!(handling.ack.ack_from, 1);
        assert_eq!(handling.ack.data_id, 1);
        assert!(handling.forward.is_none());
        assert_eq!(sink.hop_hist()[1], 1);
        assert_eq!(
            handling.delivery,
            Some(DataDelivery {
                src: 2,
                hops: 1,
                temp_raw: 6000
            })
        );

        leaf.handle_ack(1, handling.ack, at(6));
        let link = leaf.neighbors().find(1).unwrap();
        assert_eq!(link.tx, 1);
        assert_eq!(link.rx_ack, 1);
        assert!((link.prr - 1.0).abs() < 1e-6);
    }

    #[test]
    fn three_node_line_relays_with_incremented_hops() {
        let mut sink = node(1, PickPolicy::Hop);
        let mut relay = node(2, PickPolicy::Hop);
        let mut leaf = node(3, PickPolicy::Hop);

        // leaf only hears the relay's rebroadcast
        let beacon = sink.next_beacon();
        let rebroadcast = relay.handle_beacon(1, beacon, -55, at(5)).unwrap();
        assert_eq!(rebroadcast.adv_parent, 2);
        assert_eq!(rebroadcast.adv_hops, 2);
        assert!(leaf.handle_beacon(2, rebroadcast, -70, at(5)).is_some());

        assert_eq!(leaf.next_hop(), 2);
        assert_eq!(leaf.neighbors().find(2).unwrap().hops_via, 2);

        let (data, dest) = leaf.next_sample(6100).unwrap();
        assert_eq!(dest, 2);

        let at_relay = relay.handle_data(3, data, at(10));
        assert_eq!(at_relay.ack.ack_from, 2);
        let (forwarded, forward_dest) = at_relay.forward.unwrap();
        assert_eq!(forward_dest, 1);
        assert_eq!(forwarded.hops, 2);
        assert_eq!(forwarded.src, 3);
        // relay charges its own uplink for the forward
        assert_eq!(relay.neighbors().find(1).unwrap().tx, 1);
        // the unknown child is not admitted by touch alone; its own
        // rebroadcasts would have to be heard first
        assert!(relay.neighbors().find(3).is_none());

        let at_sink = sink.handle_data(2, forwarded, at(10));
        assert!(at_sink.forward.is_none());
        assert_eq!(sink.hop_hist()[2], 1);
        let delivery = at_sink.delivery.unwrap();
        assert_eq!(delivery.src, 3);
        assert_eq!(delivery.hops, 2);
    }

    #[test]
    fn flood_filter_forwards_once_per_sequence() {
        let mut nodestate = node(2, PickPolicy::Hop);
        let beacon = |seq| BeaconFrame {
            adv_parent: 1,
            adv_hops: 1,
            adv_seq: seq,
        };

        assert!(nodestate.handle_beacon(1, beacon(1), -60, at(0)).is_some());
        // duplicate of the same flood round
        assert!(nodestate.handle_beacon(1, beacon(1), -60, at(1)).is_none());
        // stale round
        assert!(nodestate.handle_beacon(1, beacon(0), -60, at(2)).is_none());
        // next round goes out exactly once
        assert!(nodestate.handle_beacon(1, beacon(2), -60, at(3)).is_some());
        assert!(nodestate.handle_beacon(1, beacon(2), -60, at(4)).is_none());
    }

    #[test]
    fn rejected_beacons_still_refresh_the_neighbor() {
        let mut nodestate = node(2, PickPolicy::Hop);
        let mut beacon = BeaconFrame {
            adv_parent: 1,
            adv_hops: 1,
            adv_seq: 5,
        };
        nodestate.handle_beacon(1, beacon, -60, at(0));

        // same sequence from a stronger reception: filtered, but recorded
        beacon.adv_hops = 3;
        assert!(nodestate.handle_beacon(1, beacon, -40, at(9)).is_none());
        let n = nodestate.neighbors().find(1).unwrap();
        assert_eq!(n.rssi, -40);
        assert_eq!(n.hops_via, 3);
        assert_eq!(n.seen_at, at(9));
    }

    #[test]
    fn first_beacon_bootstraps_parent_even_under_prr_policy() {
        let mut nodestate = node(4, PickPolicy::Prr);
        let beacon = BeaconFrame {
            adv_parent: 2,
            adv_hops: 2,
            adv_seq: 7,
        };
        assert!(nodestate.handle_beacon(2, beacon, -70, at(0)).is_some());
        assert_eq!(nodestate.next_hop(), 2);
    }

    #[test]
    fn diamond_topology_parent_choice_per_policy() {
        let sink_beacon = |seq| BeaconFrame {
            adv_parent: 1,
            adv_hops: 1,
            adv_seq: seq,
        };

        // nodes 2 and 3 both hear the sink; node 4 hears both rebroadcasts
        let run = |policy: PickPolicy| {
            let mut upper_a = node(2, policy);
            let mut upper_b = node(3, policy);
            let mut bottom = node(4, policy);

            let via_a = upper_a.handle_beacon(1, sink_beacon(1), -50, at(5)).unwrap();
            let via_b = upper_b.handle_beacon(1, sink_beacon(1), -50, at(5)).unwrap();
            // node 4 hears 2 weakly first (bootstrapping onto it), then
            // 3 strongly; reselect must move off the bootstrap choice
            bottom.handle_beacon(2, via_a, -80, at(5));
            bottom.handle_beacon(3, via_b, -45, at(5));
            assert_eq!(bottom.next_hop(), 2);
            bottom.run_reselect(at(6));
            bottom
        };

        // equal hop counts: Hop policy tie-breaks to the stronger link
        assert_eq!(run(PickPolicy::Hop).next_hop(), 3);
        assert_eq!(run(PickPolicy::Rssi).next_hop(), 3);
        // PRR without samples falls back to the hop rule
        assert_eq!(run(PickPolicy::Prr).next_hop(), 3);
    }

    #[test]
    fn aging_expires_parent_and_reselect_reacquires() {
        let mut nodestate = node(2, PickPolicy::Hop);
        let beacon = BeaconFrame {
            adv_parent: 1,
            adv_hops: 1,
            adv_seq: 1,
        };
        nodestate.handle_beacon(1, beacon, -60, at(0));
        assert_eq!(nodestate.next_hop(), 1);

        // within the TTL the parent survives a reselect pass
        nodestate.run_reselect(at(180));
        assert_eq!(nodestate.next_hop(), 1);

        // one pass after the TTL elapses the slot is freed and the
        // parent pointer resets
        nodestate.run_reselect(at(181));
        assert_eq!(nodestate.next_hop(), NO_PARENT);
        assert!(nodestate.neighbors().is_empty());

        // a later beacon round plus a reselect reacquires a parent
        let later = BeaconFrame {
            adv_parent: 1,
            adv_hops: 1,
            adv_seq: 2,
        };
        nodestate.handle_beacon(1, later, -60, at(200));
        nodestate.run_reselect(at(201));
        assert_eq!(nodestate.next_hop(), 1);
    }

    #[test]
    fn no_parent_skips_sample_without_consuming_sequence() {
        let mut nodestate = node(5, PickPolicy::Hop);
        assert!(nodestate.next_sample(6000).is_none());
        assert_eq!(nodestate.data_seq(), 0);

        let beacon = BeaconFrame {
            adv_parent: 1,
            adv_hops: 1,
            adv_seq: 1,
        };
        nodestate.handle_beacon(1, beacon, -60, at(0));
        let (first, _) = nodestate.next_sample(6000).unwrap();
        let (second, _) = nodestate.next_sample(6000).unwrap();
        assert_eq!(first.data_id, 1);
        assert_eq!(second.data_id, 2);
    }

    #[test]
    fn relay_without_parent_acks_but_drops() {
        let mut relay = node(2, PickPolicy::Hop);
        let data = DataFrame {
            src: 3,
            hops: 1,
            temp_raw: 6000,
            data_id: 1,
        };
        let handling = relay.handle_data(3, data, at(0));
        assert_eq!(handling.ack.ack_from, 2);
        assert!(handling.forward.is_none());
        assert!(handling.delivery.is_none());
    }

    #[test]
    fn relay_refuses_to_forward_back_to_origin() {
        let mut relay = node(2, PickPolicy::Hop);
        // parent happens to be node 3
        let beacon = BeaconFrame {
            adv_parent: 3,
            adv_hops: 2,
            adv_seq: 1,
        };
        relay.handle_beacon(3, beacon, -60, at(0));
        assert_eq!(relay.next_hop(), 3);

        let data = DataFrame {
            src: 3,
            hops: 1,
            temp_raw: 6000,
            data_id: 9,
        };
        let handling = relay.handle_data(3, data, at(1));
        assert!(handling.forward.is_none());
        // the refused forward charges nothing
        assert_eq!(relay.neighbors().find(3).unwrap().tx, 0);
    }

    #[test]
    fn sink_excludes_out_of_range_hops_from_histogram() {
        let mut sink = node(1, PickPolicy::Hop);
        let data = DataFrame {
            src: 9,
            hops: HOPS_MAX as u16,
            temp_raw: 6000,
            data_id: 1,
        };
        let handling = sink.handle_data(9, data, at(0));
        // still delivered, just not bucketed
        assert!(handling.delivery.is_some());
        assert_eq!(sink.hop_hist().iter().sum::<u16>(), 0);

        let in_range = DataFrame {
            src: 9,
            hops: (HOPS_MAX - 1) as u16,
            temp_raw: 6000,
            data_id: 2,
        };
        sink.handle_data(9, in_range, at(1));
        assert_eq!(sink.hop_hist()[HOPS_MAX - 1], 1);
    }

    #[test]
    fn sink_records_its_own_periods_at_zero_hops() {
        let mut sink = node(1, PickPolicy::Hop);
        sink.record_sink_period();
        sink.record_sink_period();
        assert_eq!(sink.hop_hist()[0], 2);
    }

    #[test]
    fn unknown_hop_neighbors_never_win_reselect() {
        let mut nodestate = node(2, PickPolicy::Hop);
        // an ACK from a node we never heard a beacon from
        nodestate.neighbors.upsert(7, -30, UNKNOWN_HOPS, at(0));
        nodestate.run_reselect(at(1));
        assert_eq!(nodestate.next_hop(), NO_PARENT);
    }

    #[test]
    fn startup_schedule_matches_configuration() {
        let config = CollectionConfiguration::default();
        let start = at(0);

        let sink_timers = ActivityTimers::new(&config, SINK_ID, start);
        assert_eq!(sink_timers.beacon_at, Some(at(5)));
        // 1 mod 60 desync plus one interval
        assert_eq!(sink_timers.data_at, at(61));
        assert_eq!(sink_timers.reselect_at, at(9));
        assert_eq!(sink_timers.stats_at, at(28));
        assert_eq!(sink_timers.next_deadline(), at(5));

        let leaf_timers = ActivityTimers::new(&config, 2, start);
        assert_eq!(leaf_timers.beacon_at, None);
        assert_eq!(leaf_timers.data_at, at(62));
        assert_eq!(leaf_timers.next_deadline(), at(9));
    }
}
