//! One identified, versioned unit with declared dependencies.

use std::any::Any;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use crate::dependency::Dependency;

/// Opaque caller payload attached to elements and dependencies.
pub type UserData = Arc<dyn Any + Send + Sync>;

/// An immutable description of one versioned unit.
///
/// Identity is the `(id, version)` pair; equality and hashing ignore the
/// dependency list and payload. Elements are shared as `Arc<Element>`:
/// exactly one element set owns each element, while deltas and query
/// results hold read-only clones.
#[derive(Clone)]
pub struct Element {
    id: String,
    version: String,
    dependencies: Vec<Dependency>,
    singleton: bool,
    user_data: Option<UserData>,
}

impl Element {
    pub fn new(
        id: impl Into<String>,
        version: impl Into<String>,
        dependencies: Vec<Dependency>,
        singleton: bool,
    ) -> Self {
        Self {
            id: id.into(),
            version: version.into(),
            dependencies,
            singleton,
            user_data: None,
        }
    }

    /// Attach an opaque caller payload.
    pub fn with_user_data(mut self, user_data: UserData) -> Self {
        self.user_data = Some(user_data);
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    /// Declared dependencies, in declaration order.
    pub fn dependencies(&self) -> &[Dependency] {
        &self.dependencies
    }

    /// Whether at most one version of this id may be selected.
    pub fn is_singleton(&self) -> bool {
        self.singleton
    }

    pub fn user_data(&self) -> Option<&UserData> {
        self.user_data.as_ref()
    }
}

impl PartialEq for Element {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id && self.version == other.version
    }
}

impl Eq for Element {}

impl Hash for Element {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
        self.version.hash(state);
    }
}

impl fmt::Display for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.id, self.version)
    }
}

impl fmt::Debug for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Element")
            .field("id", &self.id)
            .field("version", &self.version)
            .field("dependencies", &self.dependencies)
            .field("singleton", &self.singleton)
            .field("user_data", &self.user_data.is_some())
            .finish()
    }
}
