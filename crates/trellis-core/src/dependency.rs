//! One required relationship between an element and a target id.

use std::fmt;
use std::sync::Arc;

use crate::element::UserData;
use crate::version::{SegmentedVersion, VersionRange};

/// Decides whether a candidate version id satisfies a dependency.
///
/// The constraint operand is the dependency's own `required_version`; a
/// dependency declared without one matches every candidate.
pub trait MatchRule: Send + Sync {
    fn matches(&self, constraint: Option<&str>, candidate: &str) -> bool;
}

impl<F> MatchRule for F
where
    F: Fn(Option<&str>, &str) -> bool + Send + Sync,
{
    fn matches(&self, constraint: Option<&str>, candidate: &str) -> bool {
        self(constraint, candidate)
    }
}

/// Stock match rules over segmented version ids.
#[derive(Debug, Clone)]
pub enum VersionMatch {
    /// Any available version satisfies the dependency.
    Any,
    /// The candidate must equal the constraint segment-for-segment.
    Exact,
    /// The candidate must rank at or above the constraint.
    AtLeast,
    /// The candidate must fall inside the given range; the constraint
    /// operand is ignored.
    Within(VersionRange),
}

impl MatchRule for VersionMatch {
    fn matches(&self, constraint: Option<&str>, candidate: &str) -> bool {
        let candidate = SegmentedVersion::parse(candidate);
        match self {
            VersionMatch::Any => true,
            VersionMatch::Exact => match constraint {
                Some(c) => SegmentedVersion::parse(c) == candidate,
                None => true,
            },
            VersionMatch::AtLeast => match constraint {
                Some(c) => candidate >= SegmentedVersion::parse(c),
                None => true,
            },
            VersionMatch::Within(range) => range.contains(&candidate),
        }
    }
}

/// An immutable description of one required relationship.
#[derive(Clone)]
pub struct Dependency {
    required_id: String,
    rule: Arc<dyn MatchRule>,
    required_version: Option<String>,
    optional: bool,
    user_data: Option<UserData>,
}

impl Dependency {
    pub fn new(
        required_id: impl Into<String>,
        rule: impl MatchRule + 'static,
        required_version: Option<String>,
        optional: bool,
    ) -> Self {
        Self {
            required_id: required_id.into(),
            rule: Arc::new(rule),
            required_version,
            optional,
            user_data: None,
        }
    }

    /// A mandatory dependency satisfied by any version of `required_id`.
    pub fn any(required_id: impl Into<String>) -> Self {
        Self::new(required_id, VersionMatch::Any, None, false)
    }

    /// A mandatory dependency on exactly `version` of `required_id`.
    pub fn exact(required_id: impl Into<String>, version: impl Into<String>) -> Self {
        Self::new(required_id, VersionMatch::Exact, Some(version.into()), false)
    }

    /// Attach an opaque caller payload.
    pub fn with_user_data(mut self, user_data: UserData) -> Self {
        self.user_data = Some(user_data);
        self
    }

    /// Mark this dependency optional.
    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    pub fn required_id(&self) -> &str {
        &self.required_id
    }

    pub fn required_version(&self) -> Option<&str> {
        self.required_version.as_deref()
    }

    pub fn is_optional(&self) -> bool {
        self.optional
    }

    pub fn user_data(&self) -> Option<&UserData> {
        self.user_data.as_ref()
    }

    /// Apply the satisfaction rule to a candidate version of `required_id`.
    pub fn matches(&self, candidate: &str) -> bool {
        self.rule
            .matches(self.required_version.as_deref(), candidate)
    }
}

impl fmt::Display for Dependency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.required_id)?;
        if let Some(ref v) = self.required_version {
            write!(f, " {v}")?;
        }
        if self.optional {
            write!(f, " (optional)")?;
        }
        Ok(())
    }
}

impl fmt::Debug for Dependency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dependency")
            .field("required_id", &self.required_id)
            .field("required_version", &self.required_version)
            .field("optional", &self.optional)
            .field("user_data", &self.user_data.is_some())
            .finish()
    }
}
