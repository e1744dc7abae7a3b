//! Core data types for the trellis dependency engine.
//!
//! This crate defines the immutable value objects the resolver operates on:
//! elements (one versioned unit with declared dependencies), dependencies
//! (one required relationship with a satisfaction rule), and the version
//! machinery used to order opaque version ids and match constraints.
//!
//! This crate is intentionally free of graph state and traversal logic; the
//! engine lives in `trellis-resolver`.

pub mod dependency;
pub mod element;
pub mod version;

pub use dependency::{Dependency, MatchRule, VersionMatch};
pub use element::{Element, UserData};
pub use version::{SegmentOrder, SegmentedVersion, VersionError, VersionOrder, VersionRange};
