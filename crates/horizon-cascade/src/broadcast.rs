//! The broadcast bus.
//!
//! Parsers and refiners emit AST units onto a [`Broadcaster`]; subscribers
//! receive them in emission order. Buses compose into chains: a wrapper
//! records or buffers and relays to its inner bus; the chain terminus flips
//! the unit's status, so a unit transitions Unbroadcasted to Broadcasted
//! exactly once however deep the chain.

use std::collections::VecDeque;

use crate::ast::UnitKind;
use crate::tree::{NodeId, Slot, Status, SyntaxTree};

/// Receives AST units in emission order.
pub trait Broadcaster {
    /// Delivers one unit. Implementations must be idempotent with respect
    /// to already-broadcast units.
    fn broadcast(&mut self, tree: &mut SyntaxTree, unit: NodeId);
}

/// A bus that records every unit it sees and indexes them by runtime
/// variant for later retrieval.
///
/// When chained over an inner bus it relays each unit downstream; when
/// terminal it flips the unit's status itself.
#[derive(Default)]
pub struct QueryableBroadcaster<'a> {
    inner: Option<&'a mut dyn Broadcaster>,
    units: Vec<(NodeId, UnitKind)>,
}

impl<'a> QueryableBroadcaster<'a> {
    /// Creates a terminal queryable bus.
    pub fn new() -> Self {
        Self { inner: None, units: Vec::new() }
    }

    /// Creates a queryable bus relaying to `inner`.
    pub fn chained(inner: &'a mut dyn Broadcaster) -> Self {
        Self { inner: Some(inner), units: Vec::new() }
    }

    /// All recorded units, in emission order.
    pub fn all(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.units.iter().map(|(unit, _)| *unit)
    }

    /// Recorded units of the given variant (or group variant), in order.
    pub fn query(&self, kind: UnitKind) -> impl Iterator<Item = NodeId> + '_ {
        self.units
            .iter()
            .filter(move |(_, k)| *k == kind || k.group() == Some(kind))
            .map(|(unit, _)| *unit)
    }

    /// The single recorded unit of the given variant, if exactly one exists.
    pub fn find_only(&self, kind: UnitKind) -> Option<NodeId> {
        let mut matches = self.query(kind);
        let first = matches.next();
        if matches.next().is_some() {
            return None;
        }
        first
    }

    /// Number of recorded units.
    pub fn count(&self) -> usize {
        self.units.len()
    }
}

impl Broadcaster for QueryableBroadcaster<'_> {
    fn broadcast(&mut self, tree: &mut SyntaxTree, unit: NodeId) {
        let kind = tree.kind(unit);
        tracing::trace!(
            target: "horizon_cascade::broadcast",
            ?kind,
            terminal = self.inner.is_none(),
            "recording unit"
        );
        self.units.push((unit, kind));
        match self.inner.as_deref_mut() {
            Some(inner) => inner.broadcast(tree, unit),
            None => tree.mark_broadcasted(unit),
        }
    }
}

/// A bus that buffers units while paused and relays them on resume.
///
/// Used by transformations that must see a complete group of units before
/// letting any of them reach downstream subscribers.
pub struct QueueingBroadcaster<'a> {
    inner: &'a mut dyn Broadcaster,
    paused: bool,
    queue: VecDeque<NodeId>,
}

impl<'a> QueueingBroadcaster<'a> {
    /// Creates a queueing bus relaying to `inner`, initially flowing.
    pub fn new(inner: &'a mut dyn Broadcaster) -> Self {
        Self { inner, paused: false, queue: VecDeque::new() }
    }

    /// Stops relaying; subsequent broadcasts buffer in order.
    pub fn pause(&mut self) {
        self.paused = true;
    }

    /// Resumes relaying, flushing everything buffered in order.
    pub fn resume(&mut self, tree: &mut SyntaxTree) {
        tracing::trace!(
            target: "horizon_cascade::broadcast",
            queued = self.queue.len(),
            "flushing buffered units"
        );
        self.paused = false;
        while let Some(unit) = self.queue.pop_front() {
            self.inner.broadcast(tree, unit);
        }
    }

    /// Units currently buffered.
    pub fn queued(&self) -> usize {
        self.queue.len()
    }
}

impl Broadcaster for QueueingBroadcaster<'_> {
    fn broadcast(&mut self, tree: &mut SyntaxTree, unit: NodeId) {
        if self.paused {
            tracing::trace!(
                target: "horizon_cascade::broadcast",
                kind = ?tree.kind(unit),
                "buffering unit until resume"
            );
            self.queue.push_back(unit);
        } else {
            self.inner.broadcast(tree, unit);
        }
    }
}

/// Walks a composite unit and broadcasts every contained sub-unit that is
/// still unbroadcasted, container-first. This is how synthesized sub-trees
/// reach subscribers after being attached to an already-broadcast parent.
pub fn propagate(tree: &mut SyntaxTree, bus: &mut dyn Broadcaster, unit: NodeId) {
    if tree.status(unit) == Status::Unbroadcasted {
        tracing::trace!(
            target: "horizon_cascade::broadcast",
            kind = ?tree.kind(unit),
            "propagating unit"
        );
        bus.broadcast(tree, unit);
    }

    use crate::ast::NodeData;
    let mut children: Vec<NodeId> = Vec::new();
    match tree.data(unit) {
        NodeData::Stylesheet(_) => {
            children.extend(tree.children(unit, Slot::Statements));
            children.extend(tree.children(unit, Slot::Orphaned));
        }
        NodeData::Rule(_) => {
            children.extend(tree.children(unit, Slot::Selectors));
            children.extend(tree.children(unit, Slot::Declarations));
            children.extend(tree.children(unit, Slot::Orphaned));
        }
        NodeData::AtRule(d) => {
            children.extend(d.expression);
            children.extend(d.block);
        }
        NodeData::Selector(_) => {
            children.extend(tree.children(unit, Slot::Parts));
            children.extend(tree.children(unit, Slot::Orphaned));
        }
        NodeData::Declaration(d) => children.extend(d.value),
        NodeData::PropertyValue(_) => children.extend(tree.children(unit, Slot::Members)),
        NodeData::AtRuleBlock(_) => children.extend(tree.children(unit, Slot::Statements)),
        _ => {}
    }

    for child in children {
        propagate(tree, bus, child);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{NodeData, PropertyValueData, Raw, SelectorData};

    #[test]
    fn terminal_queryable_flips_status_once() {
        let mut tree = SyntaxTree::new();
        let unit = tree.alloc(NodeData::UniversalSelector);

        let mut bus = QueryableBroadcaster::new();
        bus.broadcast(&mut tree, unit);
        assert_eq!(tree.status(unit), Status::Broadcasted);

        tree.mark_processed(unit);
        bus.broadcast(&mut tree, unit);
        assert_eq!(tree.status(unit), Status::Processed);
    }

    #[test]
    fn query_filters_by_kind_in_order() {
        let mut tree = SyntaxTree::new();
        let class = tree.alloc(NodeData::ClassSelector { name: "a".into() });
        let id = tree.alloc(NodeData::IdSelector { name: "b".into() });
        let class2 = tree.alloc(NodeData::ClassSelector { name: "c".into() });

        let mut bus = QueryableBroadcaster::new();
        bus.broadcast(&mut tree, class);
        bus.broadcast(&mut tree, id);
        bus.broadcast(&mut tree, class2);

        let classes: Vec<_> = bus.query(UnitKind::ClassSelector).collect();
        assert_eq!(classes, vec![class, class2]);
        assert_eq!(bus.find_only(UnitKind::IdSelector), Some(id));
        assert_eq!(bus.find_only(UnitKind::ClassSelector), None);
    }

    #[test]
    fn group_queries_match_member_kinds() {
        let mut tree = SyntaxTree::new();
        let class = tree.alloc(NodeData::ClassSelector { name: "a".into() });
        let keyword = tree.alloc(NodeData::KeywordValue { keyword: "red".into() });

        let mut bus = QueryableBroadcaster::new();
        bus.broadcast(&mut tree, class);
        bus.broadcast(&mut tree, keyword);

        assert_eq!(bus.query(UnitKind::SelectorPart).count(), 1);
        assert_eq!(bus.query(UnitKind::Term).count(), 1);
    }

    #[test]
    fn chained_queryable_relays_and_records() {
        let mut tree = SyntaxTree::new();
        let unit = tree.alloc(NodeData::UniversalSelector);

        let mut terminal = QueryableBroadcaster::new();
        {
            let mut chained = QueryableBroadcaster::chained(&mut terminal);
            chained.broadcast(&mut tree, unit);
            assert_eq!(chained.count(), 1);
        }
        assert_eq!(terminal.count(), 1);
        assert_eq!(tree.status(unit), Status::Broadcasted);
    }

    #[test]
    fn queueing_buffers_until_resume() {
        let mut tree = SyntaxTree::new();
        let a = tree.alloc(NodeData::UniversalSelector);
        let b = tree.alloc(NodeData::UniversalSelector);

        let mut terminal = QueryableBroadcaster::new();
        let mut queueing = QueueingBroadcaster::new(&mut terminal);
        queueing.pause();
        queueing.broadcast(&mut tree, a);
        queueing.broadcast(&mut tree, b);
        assert_eq!(queueing.queued(), 2);
        assert_eq!(tree.status(a), Status::Unbroadcasted);

        queueing.resume(&mut tree);
        assert_eq!(queueing.queued(), 0);
        let delivered: Vec<_> = terminal.all().collect();
        assert_eq!(delivered, vec![a, b]);
    }

    #[test]
    fn propagate_reaches_unbroadcasted_sub_units() {
        let mut tree = SyntaxTree::new();
        let selector =
            tree.alloc(NodeData::Selector(SelectorData::from_raw(Raw::new(1, 1, ".a"))));
        let part = tree.alloc(NodeData::ClassSelector { name: "a".into() });
        tree.append(selector, Slot::Parts, part);
        tree.mark_broadcasted(selector);

        let mut bus = QueryableBroadcaster::new();
        propagate(&mut tree, &mut bus, selector);

        // The already-broadcast container is skipped; the new part is not.
        assert_eq!(bus.all().collect::<Vec<_>>(), vec![part]);
        assert_eq!(tree.status(part), Status::Broadcasted);
    }

    #[test]
    fn propagate_walks_value_members() {
        let mut tree = SyntaxTree::new();
        let value = tree.alloc(NodeData::PropertyValue(PropertyValueData::default()));
        let keyword = tree.alloc(NodeData::KeywordValue { keyword: "red".into() });
        tree.append(value, Slot::Members, keyword);

        let mut bus = QueryableBroadcaster::new();
        propagate(&mut tree, &mut bus, value);
        assert_eq!(bus.all().collect::<Vec<_>>(), vec![value, keyword]);
    }
}
