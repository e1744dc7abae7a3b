//! Per-element state-change records for one resolution pass.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use bitflags::bitflags;
use trellis_core::Element;

bitflags! {
    /// What happened to an element within one delta window.
    ///
    /// Kinds combine: an element added and then resolved in the same window
    /// carries `ADDED | RESOLVED`.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct ChangeKind: u8 {
        const ADDED = 1;
        const REMOVED = 1 << 1;
        const RESOLVED = 1 << 2;
        const UNRESOLVED = 1 << 3;
    }
}

impl fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (name, flag) in [
            ("ADDED", ChangeKind::ADDED),
            ("REMOVED", ChangeKind::REMOVED),
            ("RESOLVED", ChangeKind::RESOLVED),
            ("UNRESOLVED", ChangeKind::UNRESOLVED),
        ] {
            if self.contains(flag) {
                if !first {
                    write!(f, "|")?;
                }
                write!(f, "{name}")?;
                first = false;
            }
        }
        if first {
            write!(f, "(none)")?;
        }
        Ok(())
    }
}

/// One element's accumulated changes.
#[derive(Debug, Clone)]
pub struct ElementChange {
    element: Arc<Element>,
    kind: ChangeKind,
}

impl ElementChange {
    pub fn element(&self) -> &Arc<Element> {
        &self.element
    }

    pub fn kind(&self) -> ChangeKind {
        self.kind
    }
}

impl fmt::Display for ElementChange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.element, self.kind)
    }
}

/// The set of per-element transitions produced by one resolve pass.
///
/// Records keep insertion order. Opposing kinds for the same element cancel
/// rather than stack: a RESOLVED recorded while an UNRESOLVED is pending
/// erases the pending one (the element's state is back where the window
/// started), and likewise for ADDED/REMOVED. A record whose kinds net out
/// to nothing disappears from the delta.
#[derive(Debug, Clone, Default)]
pub struct ResolutionDelta {
    records: Vec<ElementChange>,
    index: HashMap<(String, String), usize>,
}

impl ResolutionDelta {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record(&mut self, element: Arc<Element>, kind: ChangeKind) {
        let key = (element.id().to_string(), element.version().to_string());
        if let Some(&slot) = self.index.get(&key) {
            let existing = &mut self.records[slot].kind;
            for (incoming, opposite) in [
                (ChangeKind::RESOLVED, ChangeKind::UNRESOLVED),
                (ChangeKind::UNRESOLVED, ChangeKind::RESOLVED),
                (ChangeKind::ADDED, ChangeKind::REMOVED),
                (ChangeKind::REMOVED, ChangeKind::ADDED),
            ] {
                if kind.contains(incoming) {
                    if existing.contains(opposite) {
                        existing.remove(opposite);
                    } else {
                        existing.insert(incoming);
                    }
                }
            }
            return;
        }
        self.index.insert(key, self.records.len());
        self.records.push(ElementChange { element, kind });
    }

    /// All non-empty records, in insertion order.
    pub fn changes(&self) -> impl Iterator<Item = &ElementChange> {
        self.records.iter().filter(|r| !r.kind.is_empty())
    }

    /// The accumulated kind for one element, if any change survives.
    pub fn kind_of(&self, id: &str, version: &str) -> Option<ChangeKind> {
        let slot = *self.index.get(&(id.to_string(), version.to_string()))?;
        let kind = self.records[slot].kind;
        (!kind.is_empty()).then_some(kind)
    }

    pub fn len(&self) -> usize {
        self.changes().count()
    }

    pub fn is_empty(&self) -> bool {
        self.changes().next().is_none()
    }
}

impl fmt::Display for ResolutionDelta {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return write!(f, "No element changes.");
        }
        writeln!(f, "Element changes ({}):", self.len())?;
        for change in self.changes() {
            writeln!(f, "  {change}")?;
        }
        Ok(())
    }
}
