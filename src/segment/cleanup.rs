//! Shared label cleanup.
//!
//! A sample whose label disagrees with both neighbours is reset to its
//! predecessor's label. The first and last samples see a virtual neighbour
//! carrying the complement of their own label, so an isolated boundary sample
//! takes its only real neighbour's value.
use log::warn;

const MAX_PASSES: usize = 16;

fn single_pass(labels: &mut [bool]) -> bool {
    let n = labels.len();
    let mut changed = false;
    for i in 1..n - 1 {
        let (prev, cur, next) = (labels[i - 1], labels[i], labels[i + 1]);
        if cur != prev && cur != next {
            labels[i] = prev;
            changed = true;
        }
    }
    for i in [0, n - 1] {
        let cur = labels[i];
        let prev = if i > 0 { labels[i - 1] } else { !cur };
        let next = if i + 1 < n { labels[i + 1] } else { !cur };
        if cur != prev && cur != next {
            labels[i] = prev;
            changed = true;
        }
    }
    changed
}

/// Removes isolated labels in place, iterating until stable.
pub fn remove_isolated(labels: &mut [bool]) {
    if labels.len() < 2 {
        return;
    }
    for _ in 0..MAX_PASSES {
        if !single_pass(labels) {
            return;
        }
    }
    warn!("label cleanup did not settle after {} passes", MAX_PASSES);
}

/// `true` when no sample disagrees with both of its neighbours.
pub fn is_clean(labels: &[bool]) -> bool {
    labels
        .windows(3)
        .all(|w| !(w[1] != w[0] && w[1] != w[2]))
}
