//! Graph orchestration: mutation, the three-phase resolve pass, and
//! resolved-state queries.

use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::fmt;
use std::mem;
use std::sync::Arc;

use trellis_core::{Dependency, Element, MatchRule, VersionOrder};

use crate::cycle;
use crate::delta::{ChangeKind, ResolutionDelta};
use crate::element_set::ElementSet;
use crate::error::{ResolverError, Result};
use crate::phase::Phase;
use crate::policy::SelectionPolicy;

/// Which membership of a required set a dependency is checked against.
#[derive(Debug, Clone, Copy)]
enum Membership {
    Available,
    Selected,
}

/// One resolution universe: the id → element-set map, the mark counter,
/// the accumulating and last-completed deltas, and the injected version
/// order and selection policy.
///
/// Mutations (`add_element`, `remove_element`, `unresolve`) leave the graph
/// dirty; `resolve` advances it back to a consistent state and reports the
/// transitions. All operations are synchronous and single-threaded; callers
/// needing concurrent resolution use independent systems.
pub struct DependencySystem {
    sets: BTreeMap<String, ElementSet>,
    element_count: u64,
    mark_counter: u32,
    delta: ResolutionDelta,
    last_delta: ResolutionDelta,
    order: Box<dyn VersionOrder>,
    policy: Box<dyn SelectionPolicy>,
}

impl DependencySystem {
    /// Build a system around an injected version order and selection
    /// policy. Both collaborators are fixed for the system's lifetime.
    pub fn new(order: Box<dyn VersionOrder>, policy: Box<dyn SelectionPolicy>) -> Self {
        Self {
            sets: BTreeMap::new(),
            element_count: 0,
            mark_counter: 0,
            delta: ResolutionDelta::new(),
            last_delta: ResolutionDelta::new(),
            order,
            policy,
        }
    }

    /// A system with the stock segment ordering and highest-version policy.
    pub fn with_defaults() -> Self {
        Self::new(
            Box::new(trellis_core::SegmentOrder),
            Box::new(crate::policy::HighestVersion),
        )
    }

    // ---- factories ----

    pub fn create_element(
        &self,
        id: impl Into<String>,
        version: impl Into<String>,
        dependencies: Vec<Dependency>,
        singleton: bool,
    ) -> Arc<Element> {
        Arc::new(Element::new(id, version, dependencies, singleton))
    }

    pub fn create_dependency(
        &self,
        required_id: impl Into<String>,
        rule: impl MatchRule + 'static,
        required_version: Option<String>,
        optional: bool,
    ) -> Dependency {
        Dependency::new(required_id, rule, required_version, optional)
    }

    // ---- mutation ----

    /// Add one element, creating its set (and empty sets for every
    /// dependency target) as needed. Replaces a previous element with the
    /// same `(id, version)` identity.
    pub fn add_element(&mut self, element: Arc<Element>) {
        let id = element.id().to_string();
        // displace any same-identity element first so adjacency stays exact
        self.remove_element(&id, element.version());

        self.ensure_set(&id);
        for dep in element.dependencies() {
            self.ensure_set(dep.required_id());
        }
        for dep in element.dependencies() {
            self.sets.get_mut(&id).expect("set just created").add_required(dep.required_id());
            self.sets
                .get_mut(dep.required_id())
                .expect("set just created")
                .add_requiring(&id);
        }
        self.sets.get_mut(&id).expect("set just created").insert(element.clone());
        self.element_count += 1;
        tracing::debug!("added {element}");
        self.delta.record(element, ChangeKind::ADDED);
        self.mark_dirty_with_dependents(&id);
    }

    pub fn add_elements(&mut self, elements: impl IntoIterator<Item = Arc<Element>>) {
        for element in elements {
            self.add_element(element);
        }
    }

    /// Remove one version of one id. A no-op when the id or version is
    /// unknown. The emptied set survives until the next resolve prunes it
    /// (it may still be required by others).
    pub fn remove_element(&mut self, id: &str, version: &str) {
        let Some(set) = self.sets.get_mut(id) else {
            return;
        };
        let Some((element, was_resolved)) = set.remove(version) else {
            return;
        };
        for dep in element.dependencies() {
            if let Some(owner) = self.sets.get_mut(id) {
                owner.remove_required(dep.required_id());
            }
            if let Some(target) = self.sets.get_mut(dep.required_id()) {
                target.remove_requiring(id);
            }
        }
        let mut kind = ChangeKind::REMOVED;
        if was_resolved {
            kind |= ChangeKind::UNRESOLVED;
        }
        tracing::debug!("removed {element}");
        self.delta.record(element, kind);
        self.mark_dirty_with_dependents(id);
    }

    pub fn remove_elements<'a>(&mut self, elements: impl IntoIterator<Item = &'a Arc<Element>>) {
        for element in elements {
            self.remove_element(element.id(), element.version());
        }
    }

    /// Forcibly demote elements out of the resolved state, effective
    /// immediately. The demotion is stamped with a fresh resolution-order
    /// mark so the next resolve recomputes exactly those sets.
    pub fn unresolve(&mut self, elements: &[Arc<Element>]) {
        let mark = self.next_mark(Phase::Resolution.order());
        for element in elements {
            let Some(set) = self.sets.get_mut(element.id()) else {
                continue;
            };
            if set.unresolve(element.version(), mark) {
                tracing::debug!("unresolved {element}");
                self.delta.record(element.clone(), ChangeKind::UNRESOLVED);
            }
        }
    }

    // ---- resolution ----

    /// Run the three-phase pass and return the delta it produced.
    pub fn resolve(&mut self) -> Result<&ResolutionDelta> {
        self.resolve_with(true)
    }

    /// Run the three-phase pass; when `produce_delta` is false the
    /// resolution phase records no RESOLVED/UNRESOLVED transitions (the
    /// delta still rotates, keeping any mutation records).
    pub fn resolve_with(&mut self, produce_delta: bool) -> Result<&ResolutionDelta> {
        let roots = self.discover_roots();
        tracing::debug!(
            "resolving {} sets from {} roots",
            self.sets.len(),
            roots.len()
        );
        // roots → leaves: which versions could be satisfied at all
        let satisfied = self.visit(roots, Phase::Satisfaction, produce_delta)?;
        // leaves → roots: pick versions, honoring already-selected deps
        let selected = self.visit(satisfied, Phase::Selection, produce_delta)?;
        // roots → leaves: confirm and diff; the leaf output is meaningless
        self.visit(selected, Phase::Resolution, produce_delta)?;
        self.last_delta = mem::take(&mut self.delta);
        self.prune_empty_sets();
        tracing::debug!("resolved: {} changes", self.last_delta.len());
        Ok(&self.last_delta)
    }

    /// Ids of the sets nothing requires: the traversal's starting frontier.
    fn discover_roots(&self) -> Vec<String> {
        self.sets
            .values()
            .filter(|set| set.is_root())
            .map(|set| set.id().to_string())
            .collect()
    }

    /// Level-by-level walk in the phase's direction.
    ///
    /// A set is visited once all its ancestors were visited in this pass;
    /// an ancestor that changed during the pass marks the set as needing
    /// recomputation. If the frontier drains without visiting every set in
    /// the system, the unvisited remainder contains a cycle.
    fn visit(&mut self, frontier: Vec<String>, phase: Phase, produce_delta: bool) -> Result<Vec<String>> {
        let order = phase.order();
        let mark = self.next_mark(order);
        let mut visited = 0usize;
        let mut leaves: Vec<String> = Vec::new();
        let mut level = frontier;
        while !level.is_empty() {
            let mut next_level: Vec<String> = Vec::new();
            for id in level {
                let Some(set) = self.sets.get(&id) else {
                    continue;
                };
                if set.visited_mark() == mark {
                    continue;
                }
                // changed by an earlier phase of this resolve: the later
                // phase must recompute even though nothing else is dirty
                let mut needs_update = set.visited_mark() == set.changed_mark()
                    && order > Phase::order_of_mark(set.changed_mark());
                let mut ready = true;
                for ancestor_id in phase.ancestors(set) {
                    let Some(ancestor) = self.sets.get(ancestor_id) else {
                        continue;
                    };
                    if ancestor.visited_mark() != mark {
                        // an ancestor is still pending; retry on a later level
                        ready = false;
                        break;
                    }
                    if ancestor.changed_mark() == mark {
                        needs_update = true;
                    }
                }
                if !ready {
                    continue;
                }

                let set = self.sets.get_mut(&id).expect("set present");
                if needs_update {
                    set.mark_needing_update(order);
                }
                set.set_visited_mark(mark);
                if set.is_needing_update(order) {
                    self.update_set(phase, &id, mark, produce_delta);
                }
                visited += 1;

                let set = &self.sets[&id];
                let mut descendants = phase.descendants(set).peekable();
                if descendants.peek().is_none() {
                    leaves.push(id);
                } else {
                    next_level.extend(descendants.cloned());
                }
            }
            level = next_level;
        }
        if visited != self.sets.len() {
            let rendered = cycle::render_cycles(&cycle::find_cycles(&self.sets));
            tracing::debug!(
                "{:?} pass visited {visited} of {} sets; cycles: {rendered}",
                phase,
                self.sets.len()
            );
            return Err(ResolverError::CyclicSystem { cycles: rendered });
        }
        Ok(leaves)
    }

    /// Phase-specific recomputation of one set.
    fn update_set(&mut self, phase: Phase, id: &str, mark: u32, produce_delta: bool) {
        match phase {
            Phase::Satisfaction => {
                let set = &self.sets[id];
                let versions: BTreeSet<String> = set
                    .available()
                    .filter(|e| self.dependencies_met(e, Membership::Available))
                    .map(|e| e.version().to_string())
                    .collect();
                let set = self.sets.get_mut(id).expect("set present");
                if set.replace_satisfied(versions) {
                    set.set_changed_mark(mark);
                }
            }
            Phase::Selection => {
                let set = &self.sets[id];
                // a candidate's mandatory deps must already be answered by
                // selected elements of the (already-visited) required sets
                let candidates: Vec<Arc<Element>> = set
                    .satisfied()
                    .iter()
                    .filter_map(|v| set.element(v))
                    .filter(|e| self.dependencies_met(e, Membership::Selected))
                    .cloned()
                    .collect();
                let chosen = self.policy.select(&candidates, self.order.as_ref());
                let candidate_versions: BTreeSet<&str> =
                    candidates.iter().map(|e| e.version()).collect();
                let versions: BTreeSet<String> = chosen
                    .iter()
                    .filter(|e| candidate_versions.contains(e.version()))
                    .map(|e| e.version().to_string())
                    .collect();
                let set = self.sets.get_mut(id).expect("set present");
                if set.replace_selected(versions) {
                    set.set_changed_mark(mark);
                }
            }
            Phase::Resolution => {
                let set = &self.sets[id];
                // selection is globally final here, and its candidate filter
                // makes "deps selected" equivalent to "deps resolved"
                let versions: BTreeSet<String> = set
                    .selected()
                    .iter()
                    .filter_map(|v| set.element(v))
                    .filter(|e| self.dependencies_met(e, Membership::Selected))
                    .map(|e| e.version().to_string())
                    .collect();
                let old = set.resolved().clone();
                let newly_resolved: Vec<Arc<Element>> = versions
                    .difference(&old)
                    .filter_map(|v| set.element(v).cloned())
                    .collect();
                let newly_unresolved: Vec<Arc<Element>> = old
                    .difference(&versions)
                    .filter_map(|v| set.element(v).cloned())
                    .collect();
                let set = self.sets.get_mut(id).expect("set present");
                if set.replace_resolved(versions) {
                    set.set_changed_mark(mark);
                }
                set.set_up_to_date();
                if produce_delta {
                    for element in newly_unresolved {
                        self.delta.record(element, ChangeKind::UNRESOLVED);
                    }
                    for element in newly_resolved {
                        self.delta.record(element, ChangeKind::RESOLVED);
                    }
                }
            }
        }
    }

    /// Whether every mandatory dependency of `element` is answerable by
    /// some member of the required set under the given membership.
    fn dependencies_met(&self, element: &Element, membership: Membership) -> bool {
        element
            .dependencies()
            .iter()
            .all(|dep| dep.is_optional() || self.any_match(dep, membership))
    }

    fn any_match(&self, dep: &Dependency, membership: Membership) -> bool {
        let Some(target) = self.sets.get(dep.required_id()) else {
            return false;
        };
        match membership {
            Membership::Available => target.available_versions().any(|v| dep.matches(v)),
            Membership::Selected => target.selected().iter().any(|v| dep.matches(v)),
        }
    }

    /// Drop sets that hold no elements and that nothing requires.
    fn prune_empty_sets(&mut self) {
        let before = self.sets.len();
        self.sets
            .retain(|_, set| set.element_count() > 0 || set.requiring_count() > 0);
        let pruned = before - self.sets.len();
        if pruned > 0 {
            tracing::debug!("pruned {pruned} empty sets");
        }
    }

    /// Pass-unique mark: wrapping counter in the high bytes, phase order in
    /// the low byte.
    fn next_mark(&mut self, order: u32) -> u32 {
        self.mark_counter = self.mark_counter % 0xff + 1;
        (self.mark_counter << 8) | (order & 0xff)
    }

    fn ensure_set(&mut self, id: &str) {
        self.sets
            .entry(id.to_string())
            .or_insert_with(|| ElementSet::new(id));
    }

    fn mark_dirty_with_dependents(&mut self, id: &str) {
        let dependents: Vec<String> = self
            .sets
            .get(id)
            .map(|set| set.requiring_ids().cloned().collect())
            .unwrap_or_default();
        if let Some(set) = self.sets.get_mut(id) {
            set.mark_needing_update(Phase::Satisfaction.order());
        }
        for dependent in dependents {
            if let Some(set) = self.sets.get_mut(&dependent) {
                set.mark_needing_update(Phase::Satisfaction.order());
            }
        }
    }

    // ---- queries ----

    /// Every resolved element reachable from the roots, dependents before
    /// dependencies. Read-only; usable any time without re-resolving.
    ///
    /// A set with no resolved members prunes the walk: its dependencies are
    /// not reported through it.
    pub fn resolved_elements(&self) -> Vec<Arc<Element>> {
        let mut done: HashSet<&str> = HashSet::new();
        let mut out: Vec<Arc<Element>> = Vec::new();
        let mut level: Vec<&str> = self
            .sets
            .values()
            .filter(|set| set.is_root())
            .map(|set| set.id())
            .collect();
        while !level.is_empty() {
            let mut next: Vec<&str> = Vec::new();
            let mut progressed = false;
            for id in level {
                if done.contains(id) {
                    continue;
                }
                let Some(set) = self.sets.get(id) else {
                    continue;
                };
                if set.resolved().is_empty() {
                    done.insert(id);
                    progressed = true;
                    continue;
                }
                if set.requiring_ids().any(|a| !done.contains(a.as_str())) {
                    // a requirer is still pending; retry on a later level
                    next.push(id);
                    continue;
                }
                done.insert(id);
                progressed = true;
                out.extend(set.resolved_elements().cloned());
                next.extend(set.required_ids().map(|s| s.as_str()));
            }
            if !progressed {
                // the remainder is cyclic or unreachable
                break;
            }
            level = next;
        }
        out
    }

    /// Elements whose dependencies match this exact element's version.
    pub fn requiring_elements(&self, element: &Element) -> Vec<Arc<Element>> {
        let Some(set) = self.sets.get(element.id()) else {
            return Vec::new();
        };
        let mut out = Vec::new();
        for requirer_id in set.requiring_ids() {
            let Some(requirer) = self.sets.get(requirer_id) else {
                continue;
            };
            for candidate in requirer.available() {
                let depends = candidate.dependencies().iter().any(|dep| {
                    dep.required_id() == element.id() && dep.matches(element.version())
                });
                if depends {
                    out.push(candidate.clone());
                }
            }
        }
        out
    }

    pub fn element(&self, id: &str, version: &str) -> Option<Arc<Element>> {
        self.sets.get(id)?.element(version).cloned()
    }

    pub fn element_set(&self, id: &str) -> Option<&ElementSet> {
        self.sets.get(id)
    }

    /// The full id → element-set mapping.
    pub fn nodes(&self) -> &BTreeMap<String, ElementSet> {
        &self.sets
    }

    /// Total number of elements ever added to this system.
    pub fn element_count(&self) -> u64 {
        self.element_count
    }

    /// The delta produced by the most recent resolve.
    pub fn last_delta(&self) -> &ResolutionDelta {
        &self.last_delta
    }

    /// Compare two version ids under the injected order.
    pub fn compare(&self, a: &str, b: &str) -> std::cmp::Ordering {
        self.order.compare(a, b)
    }
}

impl fmt::Display for DependencySystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for set in self.sets.values() {
            for element in set.available() {
                let deps: Vec<String> = element
                    .dependencies()
                    .iter()
                    .map(|d| d.to_string())
                    .collect();
                writeln!(f, "{element}: [{}]", deps.join(", "))?;
            }
        }
        Ok(())
    }
}
