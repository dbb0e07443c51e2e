//! Parent selection over the neighbor table.
//!
//! Each reselect pass scores every neighbor under the active policy and
//! takes the strict maximum; exact ties fall through a deterministic
//! tie-break chain (lower advertised hops, then higher RSSI, then lower
//! id). The PRR policy needs a minimum number of send attempts per
//! neighbor before its ratio is meaningful; until some neighbor qualifies,
//! a fallback pass reruns the hop rule with a reduced tie-break (lower
//! hops, then higher RSSI).

use crate::neighbor_table::{Neighbor, NeighborTable, UNKNOWN_HOPS};
use crate::PRR_MIN_SAMPLES;

/// Scoring policy for parent selection.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub enum PickPolicy {
    /// Prefer the neighbor advertising the shortest path to the sink.
    Hop,
    /// Prefer the strongest link.
    Rssi,
    /// Prefer the link with the best packet reception ratio.
    #[default]
    Prr,
}

impl PickPolicy {
    /// Scores a neighbor, or `None` when the policy disqualifies it
    /// outright. RSSI scores are raw signed decibels, so disqualification
    /// cannot be expressed as a score floor; it is per policy.
    fn score(self, n: &Neighbor) -> Option<f32> {
        match self {
            PickPolicy::Hop => score_hop(n),
            PickPolicy::Rssi => Some(n.rssi as f32),
            PickPolicy::Prr => {
                if n.tx < PRR_MIN_SAMPLES {
                    None
                } else {
                    Some(n.prr)
                }
            }
        }
    }
}

fn score_hop(n: &Neighbor) -> Option<f32> {
    if n.hops_via == UNKNOWN_HOPS {
        None
    } else {
        Some(1.0 / (1.0 + n.hops_via as f32))
    }
}

/// Picks the best parent candidate, or `None` when the policy disqualifies
/// every neighbor (the caller then keeps its current parent).
pub(crate) fn select_parent<const CAP: usize>(
    table: &NeighborTable<CAP>,
    policy: PickPolicy,
) -> Option<u16> {
    let mut best: Option<(&Neighbor, f32)> = None;

    for n in table.iter() {
        let s = match policy.score(n) {
            Some(s) => s,
            None => continue,
        };
        match best {
            None => best = Some((n, s)),
            Some((b, best_score)) => {
                if s > best_score {
                    best = Some((n, s));
                } else if s == best_score {
                    if n.hops_via < b.hops_via {
                        best = Some((n, s));
                    } else if n.hops_via == b.hops_via && n.rssi > b.rssi {
                        best = Some((n, s));
                    } else if n.hops_via == b.hops_via && n.rssi == b.rssi && n.id < b.id {
                        best = Some((n, s));
                    }
                }
            }
        }
    }

    // PRR with no qualified neighbor falls back to the hop rule.
    if best.is_none() && policy == PickPolicy::Prr {
        for n in table.iter() {
            let s = match score_hop(n) {
                Some(s) => s,
                None => continue,
            };
            match best {
                None => best = Some((n, s)),
                Some((b, best_score)) => {
                    if s > best_score {
                        best = Some((n, s));
                    } else if s == best_score {
                        if n.hops_via < b.hops_via {
                            best = Some((n, s));
                        } else if n.hops_via == b.hops_via && n.rssi > b.rssi {
                            best = Some((n, s));
                        }
                    }
                }
            }
        }
    }

    best.map(|(n, _)| n.id)
}
