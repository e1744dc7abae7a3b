//! Dependency resolution engine for versioned element graphs.
//!
//! The engine resolves a graph of versioned, dependency-bearing elements
//! into a consistent, conflict-free set of active versions, and reports
//! exactly what changed since the previous resolution.
//!
//! Resolution is a three-phase mark-and-sweep traversal:
//! 1. **Satisfaction** (roots → leaves): which versions have all mandatory
//!    dependencies answerable by some available element.
//! 2. **Selection** (leaves → roots): which satisfied versions are chosen
//!    per id, via the injected selection policy and version order.
//! 3. **Resolution** (roots → leaves): which selected versions end up
//!    active, with RESOLVED/UNRESOLVED transitions recorded in a delta.
//!
//! Each element set carries traversal marks so that a resolve pass only
//! recomputes sets whose inputs actually changed since the last pass.

pub mod cycle;
pub mod delta;
pub mod element_set;
pub mod error;
pub mod phase;
pub mod policy;
pub mod system;

pub use delta::{ChangeKind, ElementChange, ResolutionDelta};
pub use element_set::ElementSet;
pub use error::{ResolverError, Result};
pub use phase::Phase;
pub use policy::{Coexisting, HighestVersion, SelectionPolicy};
pub use system::DependencySystem;
