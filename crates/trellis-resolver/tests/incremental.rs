use std::sync::Arc;

use trellis_core::{Dependency, Element};
use trellis_resolver::{ChangeKind, DependencySystem};

fn elem(id: &str, version: &str, deps: Vec<Dependency>) -> Arc<Element> {
    Arc::new(Element::new(id, version, deps, false))
}

#[test]
fn adding_an_unrelated_element_touches_nothing_else() {
    let mut system = DependencySystem::with_defaults();
    system.add_element(elem("a", "1", vec![Dependency::any("b")]));
    system.add_element(elem("b", "1", vec![]));
    system.resolve().unwrap();

    system.add_element(elem("c", "1", vec![]));
    let delta = system.resolve().unwrap();
    assert_eq!(
        delta.kind_of("c", "1"),
        Some(ChangeKind::ADDED | ChangeKind::RESOLVED)
    );
    assert_eq!(delta.len(), 1);
}

#[test]
fn removing_a_resolved_dependency_cascades() {
    let mut system = DependencySystem::with_defaults();
    system.add_element(elem("a", "1", vec![Dependency::any("b")]));
    system.add_element(elem("b", "1", vec![]));
    system.resolve().unwrap();

    system.remove_element("b", "1");
    let delta = system.resolve().unwrap();
    assert_eq!(
        delta.kind_of("b", "1"),
        Some(ChangeKind::REMOVED | ChangeKind::UNRESOLVED)
    );
    assert_eq!(delta.kind_of("a", "1"), Some(ChangeKind::UNRESOLVED));
    assert!(system.resolved_elements().is_empty());
}

#[test]
fn upgrading_shifts_resolution_to_the_new_version() {
    let mut system = DependencySystem::with_defaults();
    system.add_element(elem("a", "1", vec![Dependency::any("b")]));
    system.add_element(elem("b", "1", vec![]));
    system.resolve().unwrap();

    system.add_element(elem("b", "2", vec![]));
    let delta = system.resolve().unwrap();
    assert_eq!(
        delta.kind_of("b", "2"),
        Some(ChangeKind::ADDED | ChangeKind::RESOLVED)
    );
    assert_eq!(delta.kind_of("b", "1"), Some(ChangeKind::UNRESOLVED));
    // a still has its dependency met; it is not reported
    assert_eq!(delta.kind_of("a", "1"), None);
}

#[test]
fn unresolve_then_resolve_nets_to_nothing() {
    let mut system = DependencySystem::with_defaults();
    let b = elem("b", "1", vec![]);
    system.add_element(elem("a", "1", vec![Dependency::any("b")]));
    system.add_element(b.clone());
    system.resolve().unwrap();

    system.unresolve(&[b]);
    assert!(system
        .element_set("b")
        .unwrap()
        .resolved()
        .is_empty());

    // the pass re-resolves b@1; its UNRESOLVED record cancels out
    let delta = system.resolve().unwrap();
    assert!(delta.is_empty(), "got {delta}");
    assert!(system.element_set("b").unwrap().resolved().contains("1"));
}

#[test]
fn unresolving_an_unknown_element_is_a_no_op() {
    let mut system = DependencySystem::with_defaults();
    system.add_element(elem("a", "1", vec![]));
    system.resolve().unwrap();

    system.unresolve(&[elem("ghost", "9", vec![])]);
    let delta = system.resolve().unwrap();
    assert!(delta.is_empty());
}

#[test]
fn emptied_sets_are_pruned_once_nothing_requires_them() {
    let mut system = DependencySystem::with_defaults();
    system.add_element(elem("a", "1", vec![Dependency::any("b")]));
    system.add_element(elem("b", "1", vec![]));
    system.resolve().unwrap();

    system.remove_element("b", "1");
    system.resolve().unwrap();
    // b is empty but a still requires it
    assert!(system.element_set("b").is_some());

    system.remove_element("a", "1");
    system.resolve().unwrap();
    assert!(system.element_set("a").is_none());
    assert!(system.element_set("b").is_none());
}

#[test]
fn dangling_dependency_sets_disappear_with_their_requirer() {
    let mut system = DependencySystem::with_defaults();
    system.add_element(elem("a", "1", vec![Dependency::any("missing")]));
    system.resolve().unwrap();
    assert!(system.element_set("missing").is_some());

    system.remove_element("a", "1");
    system.resolve().unwrap();
    assert!(system.element_set("missing").is_none());
}

#[test]
fn replacing_an_element_in_place_nets_to_nothing() {
    let mut system = DependencySystem::with_defaults();
    system.add_element(elem("a", "1", vec![]));
    system.resolve().unwrap();

    // same identity, new payload: the window starts and ends resolved
    system.add_element(elem("a", "1", vec![]));
    let delta = system.resolve().unwrap();
    assert!(delta.is_empty(), "got {delta}");
}

#[test]
fn suppressed_delta_still_rotates_mutation_records() {
    let mut system = DependencySystem::with_defaults();
    system.add_element(elem("a", "1", vec![]));

    let delta = system.resolve_with(false).unwrap();
    assert_eq!(delta.kind_of("a", "1"), Some(ChangeKind::ADDED));
    assert!(system.element_set("a").unwrap().resolved().contains("1"));

    // the suppressed transition is simply never reported later
    let delta = system.resolve().unwrap();
    assert!(delta.is_empty());
}

#[test]
fn last_delta_is_available_until_the_next_pass() {
    let mut system = DependencySystem::with_defaults();
    system.add_element(elem("a", "1", vec![]));
    system.resolve().unwrap();
    assert_eq!(
        system.last_delta().kind_of("a", "1"),
        Some(ChangeKind::ADDED | ChangeKind::RESOLVED)
    );

    system.resolve().unwrap();
    assert!(system.last_delta().is_empty());
}

#[test]
fn mutations_between_passes_accumulate_into_one_delta() {
    let mut system = DependencySystem::with_defaults();
    system.add_element(elem("a", "1", vec![]));
    system.resolve().unwrap();

    system.add_element(elem("b", "1", vec![]));
    system.remove_element("a", "1");
    let delta = system.resolve().unwrap();
    assert_eq!(
        delta.kind_of("b", "1"),
        Some(ChangeKind::ADDED | ChangeKind::RESOLVED)
    );
    assert_eq!(
        delta.kind_of("a", "1"),
        Some(ChangeKind::REMOVED | ChangeKind::UNRESOLVED)
    );
    assert_eq!(delta.len(), 2);
}

#[test]
fn many_passes_survive_mark_counter_wraparound() {
    let mut system = DependencySystem::with_defaults();
    system.add_element(elem("a", "1", vec![Dependency::any("b")]));
    system.add_element(elem("b", "1", vec![]));
    system.resolve().unwrap();

    // well past the 255-value counter window
    for i in 0..300u32 {
        let version = format!("1.{i}");
        system.add_element(elem("c", version.as_str(), vec![]));
        let delta = system.resolve().unwrap();
        assert!(delta.kind_of("c", &version).is_some());
    }
    assert!(system.element_set("a").unwrap().resolved().contains("1"));
}
