//! The graph node: all known versions of one element id, plus adjacency
//! and traversal bookkeeping.

use std::collections::btree_map::Keys;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::Arc;

use trellis_core::Element;

use crate::phase::{Phase, UP_TO_DATE};

/// All known versions of one logical id.
///
/// Holds the available version map, the per-phase membership sets
/// (`satisfied`, `selected`, `resolved`), refcounted adjacency to the sets
/// this id requires and the sets requiring it, and the traversal marks the
/// engine uses to skip nodes whose inputs did not change.
///
/// After a successful resolve, `resolved ⊆ selected ⊆ satisfied ⊆ available`.
pub struct ElementSet {
    id: String,
    available: BTreeMap<String, Arc<Element>>,
    satisfied: BTreeSet<String>,
    selected: BTreeSet<String>,
    resolved: BTreeSet<String>,
    /// id → number of element-dependencies from this set onto that id.
    required: BTreeMap<String, usize>,
    /// id → number of element-dependencies from that set onto this id.
    requiring: BTreeMap<String, usize>,
    visited_mark: u32,
    changed_mark: u32,
    /// Lowest phase order that must recompute this set; `UP_TO_DATE` when
    /// the last resolve left it consistent.
    needing_update: u32,
}

impl ElementSet {
    pub(crate) fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            available: BTreeMap::new(),
            satisfied: BTreeSet::new(),
            selected: BTreeSet::new(),
            resolved: BTreeSet::new(),
            required: BTreeMap::new(),
            requiring: BTreeMap::new(),
            visited_mark: 0,
            changed_mark: 0,
            needing_update: Phase::Satisfaction.order(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Number of available versions.
    pub fn element_count(&self) -> usize {
        self.available.len()
    }

    pub fn is_empty(&self) -> bool {
        self.available.is_empty()
    }

    /// True when no element anywhere requires this id.
    pub fn is_root(&self) -> bool {
        self.requiring.is_empty()
    }

    pub fn element(&self, version: &str) -> Option<&Arc<Element>> {
        self.available.get(version)
    }

    /// Available elements, ordered by version id.
    pub fn available(&self) -> impl Iterator<Item = &Arc<Element>> {
        self.available.values()
    }

    pub fn available_versions(&self) -> impl Iterator<Item = &String> {
        self.available.keys()
    }

    /// Versions whose mandatory dependencies are answerable by some
    /// available element elsewhere.
    pub fn satisfied(&self) -> &BTreeSet<String> {
        &self.satisfied
    }

    /// Versions chosen by the selection phase.
    pub fn selected(&self) -> &BTreeSet<String> {
        &self.selected
    }

    /// Versions active after the resolution phase.
    pub fn resolved(&self) -> &BTreeSet<String> {
        &self.resolved
    }

    /// Resolved elements, ordered by version id.
    pub fn resolved_elements(&self) -> impl Iterator<Item = &Arc<Element>> {
        self.resolved.iter().filter_map(|v| self.available.get(v))
    }

    /// Ids of sets whose elements depend on this id.
    pub fn requiring_ids(&self) -> Keys<'_, String, usize> {
        self.requiring.keys()
    }

    /// Ids of sets this set's elements depend on.
    pub fn required_ids(&self) -> Keys<'_, String, usize> {
        self.required.keys()
    }

    pub fn requiring_count(&self) -> usize {
        self.requiring.len()
    }

    // ---- mutation (engine-internal) ----

    /// Insert an element, returning the displaced element if this version
    /// id was already present.
    pub(crate) fn insert(&mut self, element: Arc<Element>) -> Option<Arc<Element>> {
        self.available.insert(element.version().to_string(), element)
    }

    /// Remove one version, stripping any stale membership. Returns the
    /// element and whether it was resolved at the time of removal.
    pub(crate) fn remove(&mut self, version: &str) -> Option<(Arc<Element>, bool)> {
        let element = self.available.remove(version)?;
        self.satisfied.remove(version);
        self.selected.remove(version);
        let was_resolved = self.resolved.remove(version);
        Some((element, was_resolved))
    }

    pub(crate) fn add_required(&mut self, id: &str) {
        *self.required.entry(id.to_string()).or_insert(0) += 1;
    }

    /// Drop one reference onto `id`; true when it was the last one.
    pub(crate) fn remove_required(&mut self, id: &str) -> bool {
        match self.required.get_mut(id) {
            Some(count) if *count > 1 => {
                *count -= 1;
                false
            }
            Some(_) => {
                self.required.remove(id);
                true
            }
            None => false,
        }
    }

    pub(crate) fn add_requiring(&mut self, id: &str) {
        *self.requiring.entry(id.to_string()).or_insert(0) += 1;
    }

    pub(crate) fn remove_requiring(&mut self, id: &str) -> bool {
        match self.requiring.get_mut(id) {
            Some(count) if *count > 1 => {
                *count -= 1;
                false
            }
            Some(_) => {
                self.requiring.remove(id);
                true
            }
            None => false,
        }
    }

    // ---- marks ----

    pub(crate) fn visited_mark(&self) -> u32 {
        self.visited_mark
    }

    pub(crate) fn set_visited_mark(&mut self, mark: u32) {
        self.visited_mark = mark;
    }

    pub(crate) fn changed_mark(&self) -> u32 {
        self.changed_mark
    }

    pub(crate) fn set_changed_mark(&mut self, mark: u32) {
        self.changed_mark = mark;
    }

    pub(crate) fn mark_needing_update(&mut self, order: u32) {
        self.needing_update = self.needing_update.min(order);
    }

    pub(crate) fn is_needing_update(&self, order: u32) -> bool {
        self.needing_update <= order
    }

    pub(crate) fn set_up_to_date(&mut self) {
        self.needing_update = UP_TO_DATE;
    }

    // ---- phase commits ----

    /// Replace the satisfied membership; true if it changed.
    pub(crate) fn replace_satisfied(&mut self, versions: BTreeSet<String>) -> bool {
        let changed = self.satisfied != versions;
        self.satisfied = versions;
        changed
    }

    pub(crate) fn replace_selected(&mut self, versions: BTreeSet<String>) -> bool {
        let changed = self.selected != versions;
        self.selected = versions;
        changed
    }

    pub(crate) fn replace_resolved(&mut self, versions: BTreeSet<String>) -> bool {
        let changed = self.resolved != versions;
        self.resolved = versions;
        changed
    }

    /// Forcibly demote one version out of the resolved set, stamped with
    /// the caller's mark so the next resolve recomputes this set's
    /// resolution phase. True if the version was resolved.
    pub(crate) fn unresolve(&mut self, version: &str, mark: u32) -> bool {
        if !self.resolved.remove(version) {
            return false;
        }
        self.visited_mark = mark;
        self.changed_mark = mark;
        self.mark_needing_update(Phase::Resolution.order());
        true
    }
}

impl fmt::Debug for ElementSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ElementSet")
            .field("id", &self.id)
            .field("available", &self.available.keys().collect::<Vec<_>>())
            .field("satisfied", &self.satisfied)
            .field("selected", &self.selected)
            .field("resolved", &self.resolved)
            .field("required", &self.required)
            .field("requiring", &self.requiring)
            .finish()
    }
}
