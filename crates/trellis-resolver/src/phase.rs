//! The three resolution phases and their traversal directions.

use crate::element_set::ElementSet;

/// One phase of the three-phase resolve pass.
///
/// Phases are ordered: a set changed by an earlier phase must be recomputed
/// by every later phase in the same pass. Satisfaction and Resolution walk
/// the graph from roots toward required sets; Selection walks the reverse
/// edges, from the satisfied leaves back toward the roots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Phase {
    Satisfaction,
    Selection,
    Resolution,
}

/// Sentinel for a set with no phase needing recomputation.
pub const UP_TO_DATE: u32 = u32::MAX;

impl Phase {
    pub fn order(self) -> u32 {
        match self {
            Phase::Satisfaction => 0,
            Phase::Selection => 1,
            Phase::Resolution => 2,
        }
    }

    /// The phase order stamped into a traversal mark's low byte.
    pub fn order_of_mark(mark: u32) -> u32 {
        mark & 0xff
    }

    /// Sets that must be visited before `set` in this phase's direction.
    pub(crate) fn ancestors(self, set: &ElementSet) -> impl Iterator<Item = &String> {
        match self {
            Phase::Satisfaction | Phase::Resolution => set.requiring_ids(),
            Phase::Selection => set.required_ids(),
        }
    }

    /// Sets to enqueue for the next level once `set` is visited.
    pub(crate) fn descendants(self, set: &ElementSet) -> impl Iterator<Item = &String> {
        match self {
            Phase::Satisfaction | Phase::Resolution => set.required_ids(),
            Phase::Selection => set.requiring_ids(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn orders_are_stable() {
        assert_eq!(Phase::Satisfaction.order(), 0);
        assert_eq!(Phase::Selection.order(), 1);
        assert_eq!(Phase::Resolution.order(), 2);
        assert!(Phase::Satisfaction < Phase::Resolution);
    }

    #[test]
    fn mark_low_byte_carries_the_order() {
        let mark = (7u32 << 8) | Phase::Selection.order();
        assert_eq!(Phase::order_of_mark(mark), 1);
    }
}
