//! Change observation over document nodes.
//!
//! A [`ChangeObserver`] registration watches one node (optionally its whole
//! subtree) and collects [`MutationRecord`]s as the document is mutated.
//! Records are not delivered synchronously: the host drains them in batches
//! at its next microtask checkpoint, so a burst of edits reaches the
//! subscriber as a single notification.

use std::fmt;

use bitflags::bitflags;

use crate::sandbox::NodeId;

bitflags! {
    /// What kinds of change an observer is interested in.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct ObserveOptions: u8 {
        /// Children added or removed.
        const CHILD_LIST = 1 << 0;
        /// Text node data changed.
        const CHARACTER_DATA = 1 << 1;
        /// Element attribute changed.
        const ATTRIBUTES = 1 << 2;
        /// Also watch every descendant of the target.
        const SUBTREE = 1 << 3;
    }
}

impl ObserveOptions {
    /// Options for watching an editable region: structure and text, deep.
    pub const EDITING: Self = Self::CHILD_LIST
        .union(Self::CHARACTER_DATA)
        .union(Self::SUBTREE);
}

/// Identifier of an observer registration. Never reused within a host.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObserverId(u64);

impl ObserverId {
    #[must_use]
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ObserverId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Kind of a recorded mutation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MutationKind {
    ChildList,
    CharacterData,
    Attributes,
}

impl MutationKind {
    const fn required_option(self) -> ObserveOptions {
        match self {
            Self::ChildList => ObserveOptions::CHILD_LIST,
            Self::CharacterData => ObserveOptions::CHARACTER_DATA,
            Self::Attributes => ObserveOptions::ATTRIBUTES,
        }
    }
}

/// One recorded change.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MutationRecord {
    pub kind: MutationKind,
    /// For child-list changes, the parent whose children changed.
    pub target: NodeId,
    /// Attribute name for attribute changes.
    pub attribute: Option<String>,
}

impl MutationRecord {
    #[must_use]
    pub fn new(kind: MutationKind, target: NodeId) -> Self {
        Self {
            kind,
            target,
            attribute: None,
        }
    }

    #[must_use]
    pub fn attribute(target: NodeId, name: &str) -> Self {
        Self {
            kind: MutationKind::Attributes,
            target,
            attribute: Some(name.to_string()),
        }
    }
}

/// An active observer registration with its undelivered records.
#[derive(Clone, Debug)]
pub struct ChangeObserver {
    id: ObserverId,
    node: NodeId,
    options: ObserveOptions,
    pending: Vec<MutationRecord>,
}

impl ChangeObserver {
    #[must_use]
    pub fn new(id: ObserverId, node: NodeId, options: ObserveOptions) -> Self {
        Self {
            id,
            node,
            options,
            pending: Vec::new(),
        }
    }

    #[must_use]
    pub fn id(&self) -> ObserverId {
        self.id
    }

    /// The observed node.
    #[must_use]
    pub fn node(&self) -> NodeId {
        self.node
    }

    #[must_use]
    pub fn options(&self) -> ObserveOptions {
        self.options
    }

    /// Whether a record of `kind` on `target` concerns this observer.
    ///
    /// `is_descendant` answers whether `target` lies strictly below the
    /// observed node; it is only consulted for subtree observers.
    pub fn wants(
        &self,
        kind: MutationKind,
        target: NodeId,
        is_descendant: impl FnOnce() -> bool,
    ) -> bool {
        if !self.options.contains(kind.required_option()) {
            return false;
        }
        target == self.node || (self.options.contains(ObserveOptions::SUBTREE) && is_descendant())
    }

    /// Queue a record for the next delivery.
    pub fn enqueue(&mut self, record: MutationRecord) {
        self.pending.push(record);
    }

    #[must_use]
    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }

    /// Drain the pending batch.
    pub fn take_records(&mut self) -> Vec<MutationRecord> {
        std::mem::take(&mut self.pending)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(raw: usize) -> NodeId {
        NodeId::new(raw)
    }

    #[test]
    fn test_editing_options() {
        let opts = ObserveOptions::EDITING;
        assert!(opts.contains(ObserveOptions::CHILD_LIST));
        assert!(opts.contains(ObserveOptions::CHARACTER_DATA));
        assert!(opts.contains(ObserveOptions::SUBTREE));
        assert!(!opts.contains(ObserveOptions::ATTRIBUTES));
    }

    #[test]
    fn test_wants_filters_by_kind() {
        let observer = ChangeObserver::new(ObserverId::new(1), node(4), ObserveOptions::EDITING);
        assert!(observer.wants(MutationKind::ChildList, node(4), || false));
        assert!(!observer.wants(MutationKind::Attributes, node(4), || false));
    }

    #[test]
    fn test_wants_subtree() {
        let deep = ChangeObserver::new(ObserverId::new(1), node(4), ObserveOptions::EDITING);
        assert!(deep.wants(MutationKind::CharacterData, node(9), || true));
        assert!(!deep.wants(MutationKind::CharacterData, node(9), || false));

        let shallow = ChangeObserver::new(
            ObserverId::new(2),
            node(4),
            ObserveOptions::CHARACTER_DATA,
        );
        assert!(!shallow.wants(MutationKind::CharacterData, node(9), || true));
    }

    #[test]
    fn test_batches_drain() {
        let mut observer =
            ChangeObserver::new(ObserverId::new(1), node(4), ObserveOptions::EDITING);
        observer.enqueue(MutationRecord::new(MutationKind::ChildList, node(4)));
        observer.enqueue(MutationRecord::new(MutationKind::CharacterData, node(5)));
        assert!(observer.has_pending());
        assert_eq!(observer.take_records().len(), 2);
        assert!(!observer.has_pending());
    }
}
