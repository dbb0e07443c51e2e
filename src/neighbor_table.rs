//! Fixed-capacity neighbor table with link-quality accounting.
//!
//! One slot per one-hop neighbor: latest RSSI, the hop distance the
//! neighbor advertised in its beacons, and the packet reception ratio of
//! the unicast link toward it. Slots are created on first sighting,
//! refreshed in place, and reclaimed either by TTL expiry or by
//! oldest-seen eviction when the table is full. No allocation.

use embassy_time::{Duration, Instant};

/// `hops_via` value meaning the neighbor has not advertised a hop distance.
pub const UNKNOWN_HOPS: u16 = u16::MAX;

/// State kept for one one-hop neighbor.
#[derive(Clone, Copy)]
#[cfg_attr(feature = "std", derive(Debug))]
pub struct Neighbor {
    pub id: u16,
    /// RSSI of the most recent frame received from this neighbor, in dB.
    pub rssi: i8,
    /// Hop distance to the sink advertised by this neighbor, or
    /// [`UNKNOWN_HOPS`].
    pub hops_via: u16,
    /// Unicast data frames sent to this neighbor.
    pub tx: u16,
    /// Acknowledgements received from it.
    pub rx_ack: u16,
    /// `rx_ack / tx`, 0 while nothing has been sent.
    pub prr: f32,
    /// Last meaningful interaction: beacon heard, ACK received, or data
    /// forwarded from this neighbor.
    pub seen_at: Instant,
}

impl Neighbor {
    fn recompute_prr(&mut self) {
        self.prr = if self.tx == 0 {
            0.0
        } else {
            self.rx_ack as f32 / self.tx as f32
        };
    }

    /// PRR as an integer percentage for diagnostics, 0 with no samples.
    pub fn prr_percent(&self) -> i32 {
        if self.tx == 0 {
            0
        } else {
            (self.prr * 100.0) as i32
        }
    }
}

/// Arena of at most `CAP` neighbor records.
pub struct NeighborTable<const CAP: usize> {
    slots: [Option<Neighbor>; CAP],
}

impl<const CAP: usize> NeighborTable<CAP> {
    pub const fn new() -> Self {
        NeighborTable { slots: [None; CAP] }
    }

    pub fn find(&self, id: u16) -> Option<&Neighbor> {
        self.slots
            .iter()
            .filter_map(|slot| slot.as_ref())
            .find(|n| n.id == id)
    }

    fn find_mut(&mut self, id: u16) -> Option<&mut Neighbor> {
        self.slots
            .iter_mut()
            .filter_map(|slot| slot.as_mut())
            .find(|n| n.id == id)
    }

    /// Occupied slots, in index order.
    pub fn iter(&self) -> impl Iterator<Item = &Neighbor> {
        self.slots.iter().filter_map(|slot| slot.as_ref())
    }

    pub fn len(&self) -> usize {
        self.iter().count()
    }

    pub fn is_empty(&self) -> bool {
        self.iter().next().is_none()
    }

    /// Records a sighting of `id`.
    ///
    /// An existing slot keeps its PRR counters and only refreshes `rssi`,
    /// `hops_via` and `seen_at`. A new neighbor takes a free slot, or
    /// replaces the slot with the oldest `seen_at` when the table is full
    /// (ties broken by lowest index).
    pub fn upsert(&mut self, id: u16, rssi: i8, hops_via: u16, now: Instant) {
        if let Some(n) = self.find_mut(id) {
            n.rssi = rssi;
            n.hops_via = hops_via;
            n.seen_at = now;
            return;
        }

        let fresh = Neighbor {
            id,
            rssi,
            hops_via,
            tx: 0,
            rx_ack: 0,
            prr: 0.0,
            seen_at: now,
        };

        for slot in self.slots.iter_mut() {
            if slot.is_none() {
                *slot = Some(fresh);
                return;
            }
        }

        let mut oldest_index = 0;
        let mut oldest_seen = Instant::MAX;
        for (i, slot) in self.slots.iter().enumerate() {
            if let Some(n) = slot {
                if n.seen_at < oldest_seen {
                    oldest_seen = n.seen_at;
                    oldest_index = i;
                }
            }
        }
        self.slots[oldest_index] = Some(fresh);
    }

    /// Refreshes `seen_at` for `id`, if present.
    pub fn touch(&mut self, id: u16, now: Instant) {
        if let Some(n) = self.find_mut(id) {
            n.seen_at = now;
        }
    }

    /// Updates the link accounting for `id`: a send charges one attempt,
    /// an acknowledgement credits one success. Unknown ids are ignored.
    ///
    /// A credit never outruns the charges; the slot may have been recycled
    /// between a send and its ACK.
    pub fn prr_bump(&mut self, id: u16, got_ack: bool) {
        if let Some(n) = self.find_mut(id) {
            if got_ack {
                if n.rx_ack < n.tx {
                    n.rx_ack += 1;
                }
            } else {
                n.tx = n.tx.saturating_add(1);
            }
            n.recompute_prr();
        }
    }

    /// Frees every slot not seen within `ttl`. Returns true if the slot
    /// for `parent` was among the expired ones.
    pub fn expire(&mut self, now: Instant, ttl: Duration, parent: u16) -> bool {
        let mut parent_expired = false;
        for slot in self.slots.iter_mut() {
            if let Some(n) = slot {
                if now.saturating_duration_since(n.seen_at) > ttl {
                    if n.id == parent {
                        parent_expired = true;
                    }
                    *slot = None;
                }
            }
        }
        parent_expired
    }
}

#[cfg(all(test, feature = "std"))]
mod tests {
    use super::*;

    const TTL: Duration = Duration::from_secs(180);

    fn at(secs: u64) -> Instant {
        Instant::from_secs(secs)
    }

    #[test]
    fn upsert_creates_then_refreshes_in_place() {
        let mut table = NeighborTable::<4>::new();
        table.upsert(5, -70, 2, at(10));
        table.prr_bump(5, false);
        table.prr_bump(5, true);

        table.upsert(5, -60, 3, at(20));
        let n = table.find(5).unwrap();
        assert_eq!(n.rssi, -60);
        assert_eq!(n.hops_via, 3);
        assert_eq!(n.seen_at, at(20));
        // counters survive the refresh
        assert_eq!(n.tx, 1);
        assert_eq!(n.rx_ack, 1);
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn one_slot_per_id() {
        let mut table = NeighborTable::<4>::new();
        for i in 0..10 {
            table.upsert(7, -70, 1, at(i));
        }
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn full_table_evicts_oldest_seen() {
        let mut table = NeighborTable::<3>::new();
        table.upsert(1, -60, 1, at(30));
        table.upsert(2, -60, 1, at(10));
        table.upsert(3, -60, 1, at(20));

        table.upsert(4, -50, 2, at(40));
        assert!(table.find(2).is_none());
        assert!(table.find(4).is_some());
        assert_eq!(table.len(), 3);
    }

    #[test]
    fn eviction_tie_breaks_to_lowest_index() {
        let mut table = NeighborTable::<2>::new();
        table.upsert(1, -60, 1, at(10));
        table.upsert(2, -60, 1, at(10));

        table.upsert(3, -50, 1, at(20));
        // both slots equally old, slot 0 (id 1) goes
        assert!(table.find(1).is_none());
        assert!(table.find(2).is_some());
        assert!(table.find(3).is_some());
    }

    #[test]
    fn prr_charges_sends_and_credits_acks() {
        let mut table = NeighborTable::<4>::new();
        table.upsert(9, -70, 1, at(0));

        for _ in 0..4 {
            table.prr_bump(9, false);
        }
        for _ in 0..3 {
            table.prr_bump(9, true);
        }
        let n = table.find(9).unwrap();
        assert_eq!(n.tx, 4);
        assert_eq!(n.rx_ack, 3);
        assert!((n.prr - 0.75).abs() < 1e-6);

        table.prr_bump(9, false);
        let n = table.find(9).unwrap();
        assert_eq!(n.tx, 5);
        assert_eq!(n.rx_ack, 3);
        assert!((n.prr - 0.60).abs() < 1e-6);
    }

    #[test]
    fn prr_invariants_hold() {
        let mut table = NeighborTable::<4>::new();
        table.upsert(3, -70, 1, at(0));

        // stray credit on a fresh slot cannot push rx_ack past tx
        table.prr_bump(3, true);
        let n = table.find(3).unwrap();
        assert_eq!(n.rx_ack, 0);
        assert_eq!(n.tx, 0);
        assert_eq!(n.prr, 0.0);

        table.prr_bump(3, false);
        table.prr_bump(3, true);
        let n = table.find(3).unwrap();
        assert!(n.rx_ack <= n.tx);
        assert!((n.prr - n.rx_ack as f32 / n.tx as f32).abs() < 1e-6);
    }

    #[test]
    fn prr_bump_on_unknown_id_is_noop() {
        let mut table = NeighborTable::<4>::new();
        table.prr_bump(42, true);
        table.prr_bump(42, false);
        assert!(table.is_empty());
    }

    #[test]
    fn expire_frees_stale_slots_only() {
        let mut table = NeighborTable::<4>::new();
        table.upsert(1, -60, 1, at(0));
        table.upsert(2, -60, 1, at(100));

        // exactly at the TTL boundary nothing expires
        assert!(!table.expire(at(180), TTL, 0));
        assert_eq!(table.len(), 2);

        let parent_expired = table.expire(at(181), TTL, 1);
        assert!(parent_expired);
        assert!(table.find(1).is_none());
        assert!(table.find(2).is_some());
    }

    #[test]
    fn expire_reports_parent_only_when_parent_slot_freed() {
        let mut table = NeighborTable::<4>::new();
        table.upsert(1, -60, 1, at(0));
        assert!(!table.expire(at(200), TTL, 9));
        assert!(table.is_empty());
    }

    #[test]
    fn touch_keeps_a_slot_alive() {
        let mut table = NeighborTable::<4>::new();
        table.upsert(1, -60, 1, at(0));
        table.touch(1, at(150));
        assert!(!table.expire(at(300), TTL, 1));
        assert!(table.find(1).is_some());
    }
}
