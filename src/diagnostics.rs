//! Console diagnostics: allocation-free `Display` wrappers and the
//! periodic stats output. Line formats are stable enough to grep but are
//! not part of the protocol.

use core::fmt;

use log::{log, Level};

use crate::neighbor_table::{Neighbor, UNKNOWN_HOPS};
use crate::parent_selection::PickPolicy;

/// Renders a raw 16-bit sensor code as degrees with one fractional digit.
///
/// The conversion is `(raw/10 - 396)` tenths of a degree, split with
/// integer division and remainder. Raw code 6000 renders as `20.4`.
pub(crate) struct TemperatureDisplay(pub u16);

impl fmt::Display for TemperatureDisplay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tenths = (self.0 / 10) as i32 - 396;
        write!(f, "{}.{}", tenths / 10, tenths % 10)
    }
}

/// Space-separated per-hop delivery counts.
struct HopHistogramDisplay<'a>(&'a [u16]);

impl fmt::Display for HopHistogramDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut counts = self.0.iter();
        if let Some(first) = counts.next() {
            write!(f, "{}", first)?;
        }
        for count in counts {
            write!(f, " {}", count)?;
        }
        Ok(())
    }
}

/// Sink stats line: delivered frames bucketed by hop distance.
pub(crate) fn log_hop_histogram(hist: &[u16]) {
    log!(Level::Info, "[hops] {}", HopHistogramDisplay(hist));
}

/// Non-sink stats dump: current parent and one fixed-width row per
/// neighbor that has advertised a hop distance.
pub(crate) fn log_neighbor_dump<'a>(
    node_id: u16,
    parent: u16,
    policy: PickPolicy,
    neighbors: impl Iterator<Item = &'a Neighbor>,
) {
    log!(
        Level::Info,
        "[tbl] node={} parent={} policy={:?}",
        node_id,
        parent,
        policy
    );
    log!(Level::Info, " id  hop rssi tx ack prr%");
    for n in neighbors {
        if n.hops_via == UNKNOWN_HOPS {
            continue;
        }
        log!(
            Level::Info,
            " {:<3} {:<3} {:<4} {:<3} {:<3} {:>3}",
            n.id,
            n.hops_via,
            n.rssi,
            n.tx,
            n.rx_ack,
            n.prr_percent()
        );
    }
}
