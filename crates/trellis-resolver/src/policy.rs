//! Pluggable selection strategies.

use std::cmp::Ordering;
use std::sync::Arc;

use trellis_core::{Element, VersionOrder};

/// Chooses which satisfied candidates of one id become selected.
///
/// `candidates` are the id's satisfied elements whose mandatory
/// dependencies are answerable by already-selected elements; the policy
/// returns the subset to activate.
pub trait SelectionPolicy: Send + Sync {
    fn select(&self, candidates: &[Arc<Element>], order: &dyn VersionOrder) -> Vec<Arc<Element>>;
}

/// Selects at most one version per id: the one ranked highest by the
/// injected order, with the raw version string as a deterministic
/// tiebreak. This is the default policy.
#[derive(Debug, Clone, Copy, Default)]
pub struct HighestVersion;

impl SelectionPolicy for HighestVersion {
    fn select(&self, candidates: &[Arc<Element>], order: &dyn VersionOrder) -> Vec<Arc<Element>> {
        highest(candidates, order).into_iter().collect()
    }
}

/// Lets every satisfied version coexist, unless any candidate is a
/// singleton; then only the highest-ranked version survives.
#[derive(Debug, Clone, Copy, Default)]
pub struct Coexisting;

impl SelectionPolicy for Coexisting {
    fn select(&self, candidates: &[Arc<Element>], order: &dyn VersionOrder) -> Vec<Arc<Element>> {
        if candidates.iter().any(|e| e.is_singleton()) {
            highest(candidates, order).into_iter().collect()
        } else {
            candidates.to_vec()
        }
    }
}

fn highest(candidates: &[Arc<Element>], order: &dyn VersionOrder) -> Option<Arc<Element>> {
    candidates
        .iter()
        .max_by(|a, b| {
            order
                .compare(a.version(), b.version())
                .then_with(|| a.version().cmp(b.version()))
        })
        .cloned()
}

/// A fixed ordering helper for policies that need a total order over
/// elements of one id (highest first).
pub fn rank_descending(candidates: &mut [Arc<Element>], order: &dyn VersionOrder) {
    candidates.sort_by(|a, b| {
        order
            .compare(b.version(), a.version())
            .then_with(|| b.version().cmp(a.version()))
    });
}
