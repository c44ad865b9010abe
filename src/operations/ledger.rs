use tracing::debug;

use crate::framing::{Ledger, LedgerCombination};
use crate::math::polygon_2d::signed_side;
use crate::math::{px_to_ft, EPSILON};

/// Whether both ledgers lie on one infinite line.
///
/// Zero-length fragments are never collinear with anything.
#[must_use]
pub fn are_ledgers_collinear(a: &Ledger, b: &Ledger) -> bool {
    if nalgebra::distance(&a.p1, &a.p2) < EPSILON || nalgebra::distance(&b.p1, &b.p2) < EPSILON {
        return false;
    }
    signed_side(&b.p1, &a.p1, &a.p2).abs() < EPSILON
        && signed_side(&b.p2, &a.p1, &a.p2).abs() < EPSILON
}

/// Extends `a` along its own line to cover every endpoint of `b`.
fn extend(a: &Ledger, b: &Ledger) -> Ledger {
    let d = a.p2 - a.p1;
    let dir = d / d.norm();
    let (t_min, t_max) = [a.p1, a.p2, b.p1, b.p2]
        .iter()
        .map(|p| (p - a.p1).dot(&dir))
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), t| {
            (lo.min(t), hi.max(t))
        });
    Ledger {
        p1: a.p1 + dir * t_min,
        p2: a.p1 + dir * t_max,
        length_ft: px_to_ft(t_max - t_min),
        section_id: a.section_id,
        combination: LedgerCombination::Extended,
    }
}

/// Combines two ledger fragments.
///
/// Collinear fragments become one extended segment. Otherwise the result is
/// a virtual ledger with the first fragment's geometry and the total length
/// of both, which is what fastener counts need.
#[must_use]
pub fn combine_ledger_pair(a: &Ledger, b: &Ledger) -> Ledger {
    if are_ledgers_collinear(a, b) {
        return extend(a, b);
    }
    Ledger {
        length_ft: a.length_ft + b.length_ft,
        combination: LedgerCombination::LShaped,
        ..a.clone()
    }
}

/// Combines any number of ledger fragments into the deck's single ledger.
///
/// Fragments are first gathered into collinear runs, each extended to one
/// segment. A single run is the ledger; several runs form an L-shaped
/// combination whose length is the total of all runs.
#[must_use]
pub fn combine_ledgers(fragments: &[Ledger]) -> Option<Ledger> {
    let mut runs: Vec<Ledger> = Vec::new();
    for fragment in fragments {
        match runs.iter_mut().find(|run| are_ledgers_collinear(run, fragment)) {
            Some(run) => *run = extend(run, fragment),
            None => runs.push(fragment.clone()),
        }
    }
    debug!(
        fragments = fragments.len(),
        runs = runs.len(),
        "combined ledger fragments"
    );

    let mut runs = runs.into_iter();
    let first = runs.next()?;
    Some(runs.fold(first, |acc, run| combine_ledger_pair(&acc, &run)))
}
