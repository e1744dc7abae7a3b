use std::sync::Arc;

use trellis_core::{Dependency, Element, SegmentOrder};
use trellis_resolver::{ChangeKind, Coexisting, DependencySystem, ResolverError};

fn elem(id: &str, version: &str, deps: Vec<Dependency>) -> Arc<Element> {
    Arc::new(Element::new(id, version, deps, false))
}

fn singleton(id: &str, version: &str) -> Arc<Element> {
    Arc::new(Element::new(id, version, vec![], true))
}

fn resolved_ids(system: &DependencySystem) -> Vec<String> {
    system
        .resolved_elements()
        .iter()
        .map(|e| e.to_string())
        .collect()
}

/// Every mandatory dependency of every resolved element must itself be
/// answered by a resolved element.
fn assert_consistent(system: &DependencySystem) {
    for element in system.resolved_elements() {
        for dep in element.dependencies() {
            if dep.is_optional() {
                continue;
            }
            let target = system
                .element_set(dep.required_id())
                .unwrap_or_else(|| panic!("{element} depends on unknown set"));
            let answered = target
                .resolved()
                .iter()
                .any(|version| dep.matches(version));
            assert!(answered, "{element} has unmet mandatory dependency {dep}");
        }
    }
}

#[test]
fn resolves_highest_matching_version() {
    let mut system = DependencySystem::with_defaults();
    system.add_element(elem("a", "1", vec![Dependency::any("b")]));
    system.add_element(elem("b", "1", vec![]));
    system.add_element(elem("b", "2", vec![]));

    let delta = system.resolve().unwrap();
    assert_eq!(
        delta.kind_of("a", "1"),
        Some(ChangeKind::ADDED | ChangeKind::RESOLVED)
    );
    assert_eq!(
        delta.kind_of("b", "2"),
        Some(ChangeKind::ADDED | ChangeKind::RESOLVED)
    );
    // b@1 was added but lost the selection
    assert_eq!(delta.kind_of("b", "1"), Some(ChangeKind::ADDED));

    let b = system.element_set("b").unwrap();
    assert!(b.satisfied().contains("1"));
    assert!(!b.selected().contains("1"));
    assert_eq!(b.resolved().iter().collect::<Vec<_>>(), ["2"]);
    assert_consistent(&system);
}

#[test]
fn resolving_twice_reports_nothing() {
    let mut system = DependencySystem::with_defaults();
    system.add_element(elem("a", "1", vec![Dependency::any("b")]));
    system.add_element(elem("b", "1", vec![]));
    system.resolve().unwrap();
    let before = resolved_ids(&system);

    let delta = system.resolve().unwrap();
    assert!(delta.is_empty(), "second pass produced {delta}");
    assert_eq!(resolved_ids(&system), before);
}

#[test]
fn unmet_mandatory_dependency_leaves_element_unresolved() {
    let mut system = DependencySystem::with_defaults();
    system.add_element(elem("a", "1", vec![Dependency::any("missing")]));

    let delta = system.resolve().unwrap();
    assert_eq!(delta.kind_of("a", "1"), Some(ChangeKind::ADDED));
    assert!(system.resolved_elements().is_empty());
    // the dangling target exists as an empty set while a still needs it
    let missing = system.element_set("missing").unwrap();
    assert!(missing.is_empty());
}

#[test]
fn unmet_optional_dependency_is_tolerated() {
    let mut system = DependencySystem::with_defaults();
    system.add_element(elem("a", "1", vec![Dependency::any("missing").optional()]));

    let delta = system.resolve().unwrap();
    assert_eq!(
        delta.kind_of("a", "1"),
        Some(ChangeKind::ADDED | ChangeKind::RESOLVED)
    );
    assert_eq!(resolved_ids(&system), ["a@1"]);
}

#[test]
fn cyclic_graph_fails_and_names_the_cycle() {
    let mut system = DependencySystem::with_defaults();
    system.add_element(elem("a", "1", vec![Dependency::any("b")]));
    system.add_element(elem("b", "1", vec![Dependency::any("a")]));
    system.add_element(elem("c", "1", vec![]));

    let err = system.resolve().unwrap_err();
    let ResolverError::CyclicSystem { cycles } = err;
    assert!(cycles.contains('a') && cycles.contains('b'), "got: {cycles}");
    assert!(!cycles.contains('c'));

    // the failed pass left no resolution state behind
    assert!(system.resolved_elements().is_empty());
    assert!(system.last_delta().is_empty());
}

#[test]
fn breaking_a_cycle_allows_resolution() {
    let mut system = DependencySystem::with_defaults();
    system.add_element(elem("a", "1", vec![Dependency::any("b")]));
    system.add_element(elem("b", "1", vec![Dependency::any("a")]));
    assert!(system.resolve().is_err());

    system.add_element(elem("b", "1", vec![])); // replaces the cyclic b@1
    let delta = system.resolve().unwrap();
    assert_eq!(
        delta.kind_of("a", "1"),
        Some(ChangeKind::ADDED | ChangeKind::RESOLVED)
    );
    assert_eq!(
        delta.kind_of("b", "1"),
        Some(ChangeKind::ADDED | ChangeKind::RESOLVED)
    );
    assert_consistent(&system);
}

#[test]
fn self_dependency_is_a_cycle() {
    let mut system = DependencySystem::with_defaults();
    system.add_element(elem("a", "1", vec![Dependency::any("a")]));
    let ResolverError::CyclicSystem { cycles } = system.resolve().unwrap_err();
    assert_eq!(cycles, "{a}");
}

#[test]
fn equal_versions_break_ties_on_the_raw_id() {
    let mut system = DependencySystem::with_defaults();
    system.add_element(elem("b", "2.0", vec![]));
    system.add_element(elem("b", "2.0.0", vec![]));
    system.resolve().unwrap();
    // 2.0 and 2.0.0 rank equal under segment comparison
    let b = system.element_set("b").unwrap();
    assert_eq!(b.resolved().iter().collect::<Vec<_>>(), ["2.0.0"]);
}

#[test]
fn diamond_reports_dependents_before_dependencies() {
    let mut system = DependencySystem::with_defaults();
    system.add_element(elem(
        "app",
        "1",
        vec![Dependency::any("left"), Dependency::any("right")],
    ));
    system.add_element(elem("left", "1", vec![Dependency::any("base")]));
    system.add_element(elem("right", "1", vec![Dependency::any("base")]));
    system.add_element(elem("base", "1", vec![]));
    system.resolve().unwrap();

    let order = resolved_ids(&system);
    assert_eq!(order.len(), 4);
    let pos = |id: &str| order.iter().position(|e| e.starts_with(id)).unwrap();
    assert!(pos("app") < pos("left"));
    assert!(pos("app") < pos("right"));
    assert!(pos("left") < pos("base"));
    assert!(pos("right") < pos("base"));
    assert_consistent(&system);
}

#[test]
fn version_constrained_dependency_skips_non_matching_versions() {
    let mut system = DependencySystem::with_defaults();
    system.add_element(elem("a", "1", vec![Dependency::exact("b", "1")]));
    system.add_element(elem("b", "1", vec![]));
    system.add_element(elem("b", "2", vec![]));

    system.resolve().unwrap();
    // the highest-version policy picks b@2, which a@1 cannot use
    let a = system.element_set("a").unwrap();
    assert!(a.satisfied().contains("1"));
    assert!(a.resolved().is_empty());
    let b = system.element_set("b").unwrap();
    assert_eq!(b.resolved().iter().collect::<Vec<_>>(), ["2"]);
    // the resolved walk does not pass through the unresolved root
    assert!(resolved_ids(&system).is_empty());
}

#[test]
fn coexisting_policy_resolves_every_satisfied_version() {
    let mut system = DependencySystem::new(Box::new(SegmentOrder), Box::new(Coexisting));
    system.add_element(elem("a", "1", vec![Dependency::exact("b", "1")]));
    system.add_element(elem("b", "1", vec![]));
    system.add_element(elem("b", "2", vec![]));

    system.resolve().unwrap();
    let b = system.element_set("b").unwrap();
    assert_eq!(b.resolved().len(), 2);
    // with both versions active, a@1's exact constraint is met
    assert!(system.element_set("a").unwrap().resolved().contains("1"));
    assert_consistent(&system);
}

#[test]
fn singleton_collapses_coexisting_versions() {
    let mut system = DependencySystem::new(Box::new(SegmentOrder), Box::new(Coexisting));
    system.add_element(singleton("b", "1"));
    system.add_element(elem("b", "2", vec![]));

    system.resolve().unwrap();
    let b = system.element_set("b").unwrap();
    assert_eq!(b.resolved().iter().collect::<Vec<_>>(), ["2"]);
}

#[test]
fn requiring_elements_respects_version_constraints() {
    let mut system = DependencySystem::with_defaults();
    let exact = elem("a", "1", vec![Dependency::exact("b", "1")]);
    let loose = elem("c", "1", vec![Dependency::any("b")]);
    let b1 = elem("b", "1", vec![]);
    let b2 = elem("b", "2", vec![]);
    system.add_elements([exact, loose, b1.clone(), b2.clone()]);

    let on_b1: Vec<String> = system
        .requiring_elements(&b1)
        .iter()
        .map(|e| e.id().to_string())
        .collect();
    assert_eq!(on_b1, ["a", "c"]);

    let on_b2: Vec<String> = system
        .requiring_elements(&b2)
        .iter()
        .map(|e| e.id().to_string())
        .collect();
    assert_eq!(on_b2, ["c"]);
}

#[test]
fn empty_system_resolves_to_nothing() {
    let mut system = DependencySystem::with_defaults();
    let delta = system.resolve().unwrap();
    assert!(delta.is_empty());
    assert!(system.resolved_elements().is_empty());
}

#[test]
fn chain_resolves_end_to_end() {
    let mut system = DependencySystem::with_defaults();
    system.add_element(elem("top", "1", vec![Dependency::any("mid")]));
    system.add_element(elem("mid", "1", vec![Dependency::any("bottom")]));
    system.add_element(elem("bottom", "1", vec![]));

    system.resolve().unwrap();
    assert_eq!(resolved_ids(&system), ["top@1", "mid@1", "bottom@1"]);
    assert_consistent(&system);
}

#[test]
fn missing_transitive_dependency_cascades() {
    let mut system = DependencySystem::with_defaults();
    system.add_element(elem("top", "1", vec![Dependency::any("mid")]));
    system.add_element(elem("mid", "1", vec![Dependency::any("bottom")]));

    system.resolve().unwrap();
    // mid cannot resolve, so neither can top
    assert!(system.resolved_elements().is_empty());
}
