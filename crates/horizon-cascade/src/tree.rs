//! The syntax tree arena.
//!
//! All AST units live in a single [`SyntaxTree`] arena; a unit's identity is
//! its [`NodeId`]. Sibling collections are doubly-linked lists threaded
//! through the arena, owned by the containing node and addressed by a
//! [`Slot`]. A child's parent back-reference is a non-owning
//! (owner, slot) pair used for navigation and unlinking only.

use slotmap::{new_key_type, SlotMap};

use crate::ast::{
    AtRuleData, DeclarationData, NodeData, PropertyValueData, RuleData, SelectorData,
    StylesheetData, UnitKind,
};

new_key_type! {
    /// Identity of an AST unit within its [`SyntaxTree`].
    pub struct NodeId;
}

/// Lifecycle of an AST unit with respect to the broadcast bus.
///
/// Transitions are monotonic (`Unbroadcasted` to `Broadcasted` to
/// `Processed`), except for `NeverEmit` which can be entered from any state
/// and is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Status {
    /// Created but not yet delivered to subscribers.
    Unbroadcasted,
    /// Delivered at least once.
    Broadcasted,
    /// Fully processed by every subscriber.
    Processed,
    /// Kept reachable for observation but never delivered again and never
    /// written.
    NeverEmit,
}

/// An ordered collection of sibling units, embedded in the owning node.
#[derive(Debug, Default, Clone, Copy)]
pub struct NodeList {
    head: Option<NodeId>,
    tail: Option<NodeId>,
    len: usize,
}

impl NodeList {
    /// Number of members.
    pub fn len(&self) -> usize {
        self.len
    }

    /// True if the collection has no members.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

/// Addresses one child collection (or single-child position) of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Slot {
    /// Statements of a stylesheet or refined at-rule block.
    Statements,
    /// Selectors of a rule.
    Selectors,
    /// Declarations of a rule.
    Declarations,
    /// Parts of a refined selector.
    Parts,
    /// Members of a property value.
    Members,
    /// Orphaned comments of a stylesheet, rule or selector.
    Orphaned,
    /// The single value of a declaration.
    Value,
    /// The single refined expression of an at-rule.
    Expression,
    /// The single refined block of an at-rule.
    Block,
}

impl Slot {
    fn is_single(self) -> bool {
        matches!(self, Slot::Value | Slot::Expression | Slot::Block)
    }
}

/// A child's back-reference to the collection that owns it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParentLink {
    /// The owning node.
    pub owner: NodeId,
    /// The collection within the owner.
    pub slot: Slot,
}

/// One AST unit: payload plus the bookkeeping every unit carries.
#[derive(Debug)]
pub struct Node {
    line: i32,
    column: i32,
    status: Status,
    comments: Vec<String>,
    parent: Option<ParentLink>,
    prev: Option<NodeId>,
    next: Option<NodeId>,
    data: NodeData,
}

impl Node {
    /// 1-based source line, or -1 if synthesized.
    pub fn line(&self) -> i32 {
        self.line
    }

    /// 1-based source column, or -1 if synthesized.
    pub fn column(&self) -> i32 {
        self.column
    }

    /// Current lifecycle status.
    pub fn status(&self) -> Status {
        self.status
    }

    /// Comments preceding this unit in the source.
    pub fn comments(&self) -> &[String] {
        &self.comments
    }

    /// The unit payload.
    pub fn data(&self) -> &NodeData {
        &self.data
    }

    /// The runtime variant of this unit.
    pub fn kind(&self) -> UnitKind {
        self.data.kind()
    }
}

/// The arena owning every AST unit of one document.
#[derive(Debug, Default)]
pub struct SyntaxTree {
    nodes: SlotMap<NodeId, Node>,
}

impl SyntaxTree {
    /// Creates an empty tree.
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocates a synthesized unit (position -1, -1).
    pub fn alloc(&mut self, data: NodeData) -> NodeId {
        self.alloc_at(-1, -1, data)
    }

    /// Allocates a unit at the given source position.
    pub fn alloc_at(&mut self, line: i32, column: i32, data: NodeData) -> NodeId {
        self.nodes.insert(Node {
            line,
            column,
            status: Status::Unbroadcasted,
            comments: Vec::new(),
            parent: None,
            prev: None,
            next: None,
            data,
        })
    }

    /// Borrows a unit.
    ///
    /// # Panics
    ///
    /// Panics if the id does not belong to this tree.
    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id]
    }

    /// The unit payload.
    pub fn data(&self, id: NodeId) -> &NodeData {
        &self.nodes[id].data
    }

    /// Mutable access to the unit payload.
    pub fn data_mut(&mut self, id: NodeId) -> &mut NodeData {
        &mut self.nodes[id].data
    }

    /// The runtime variant of a unit.
    pub fn kind(&self, id: NodeId) -> UnitKind {
        self.nodes[id].data.kind()
    }

    /// Current lifecycle status of a unit.
    pub fn status(&self, id: NodeId) -> Status {
        self.nodes[id].status
    }

    /// Marks a unit as delivered. No-op unless currently unbroadcasted.
    pub(crate) fn mark_broadcasted(&mut self, id: NodeId) {
        let node = &mut self.nodes[id];
        if node.status == Status::Unbroadcasted {
            node.status = Status::Broadcasted;
        }
    }

    /// Marks a unit as fully processed. No-op once never-emit.
    pub(crate) fn mark_processed(&mut self, id: NodeId) {
        let node = &mut self.nodes[id];
        if node.status == Status::Broadcasted {
            node.status = Status::Processed;
        }
    }

    /// Moves a unit to the terminal never-emit status: it stays reachable
    /// for observation but is skipped by the writer and never re-delivered.
    pub fn never_emit(&mut self, id: NodeId) {
        self.nodes[id].status = Status::NeverEmit;
    }

    /// Comments attached to a unit.
    pub fn comments(&self, id: NodeId) -> &[String] {
        &self.nodes[id].comments
    }

    /// Attaches preceding comments to a unit.
    pub fn add_comments(&mut self, id: NodeId, comments: impl IntoIterator<Item = String>) {
        self.nodes[id].comments.extend(comments);
    }

    /// The unit's parent, if attached.
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id].parent.map(|link| link.owner)
    }

    /// The unit's full parent link, if attached.
    pub fn parent_link(&self, id: NodeId) -> Option<ParentLink> {
        self.nodes[id].parent
    }

    /// The next sibling within the unit's collection.
    pub fn next_sibling(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id].next
    }

    /// The previous sibling within the unit's collection.
    pub fn prev_sibling(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id].prev
    }

    fn list(&self, owner: NodeId, slot: Slot) -> &NodeList {
        match (&self.nodes[owner].data, slot) {
            (NodeData::Stylesheet(d), Slot::Statements) => &d.statements,
            (NodeData::Stylesheet(d), Slot::Orphaned) => &d.orphaned,
            (NodeData::Rule(d), Slot::Selectors) => &d.selectors,
            (NodeData::Rule(d), Slot::Declarations) => &d.declarations,
            (NodeData::Rule(d), Slot::Orphaned) => &d.orphaned,
            (NodeData::Selector(d), Slot::Parts) => &d.parts,
            (NodeData::Selector(d), Slot::Orphaned) => &d.orphaned,
            (NodeData::PropertyValue(d), Slot::Members) => &d.members,
            (NodeData::AtRuleBlock(d), Slot::Statements) => &d.statements,
            (data, slot) => panic!("no {slot:?} collection on {:?}", data.kind()),
        }
    }

    fn list_mut(&mut self, owner: NodeId, slot: Slot) -> &mut NodeList {
        match (&mut self.nodes[owner].data, slot) {
            (NodeData::Stylesheet(d), Slot::Statements) => &mut d.statements,
            (NodeData::Stylesheet(d), Slot::Orphaned) => &mut d.orphaned,
            (NodeData::Rule(d), Slot::Selectors) => &mut d.selectors,
            (NodeData::Rule(d), Slot::Declarations) => &mut d.declarations,
            (NodeData::Rule(d), Slot::Orphaned) => &mut d.orphaned,
            (NodeData::Selector(d), Slot::Parts) => &mut d.parts,
            (NodeData::Selector(d), Slot::Orphaned) => &mut d.orphaned,
            (NodeData::PropertyValue(d), Slot::Members) => &mut d.members,
            (NodeData::AtRuleBlock(d), Slot::Statements) => &mut d.statements,
            (data, slot) => panic!("no {slot:?} collection on {:?}", data.kind()),
        }
    }

    fn single_mut(&mut self, owner: NodeId, slot: Slot) -> &mut Option<NodeId> {
        match (&mut self.nodes[owner].data, slot) {
            (NodeData::Declaration(d), Slot::Value) => &mut d.value,
            (NodeData::AtRule(d), Slot::Expression) => &mut d.expression,
            (NodeData::AtRule(d), Slot::Block) => &mut d.block,
            (data, slot) => panic!("no {slot:?} position on {:?}", data.kind()),
        }
    }

    /// Iterates the members of a child collection, in order.
    pub fn children(&self, owner: NodeId, slot: Slot) -> Children<'_> {
        Children { tree: self, next: self.list(owner, slot).head }
    }

    /// Collects the member ids of a child collection.
    pub fn child_ids(&self, owner: NodeId, slot: Slot) -> Vec<NodeId> {
        self.children(owner, slot).collect()
    }

    /// First member of a child collection.
    pub fn first_child(&self, owner: NodeId, slot: Slot) -> Option<NodeId> {
        self.list(owner, slot).head
    }

    /// Last member of a child collection.
    pub fn last_child(&self, owner: NodeId, slot: Slot) -> Option<NodeId> {
        self.list(owner, slot).tail
    }

    /// Appends a unit to a child collection (or fills a single-child
    /// position). A unit attached elsewhere is detached first.
    pub fn append(&mut self, owner: NodeId, slot: Slot, child: NodeId) {
        self.detach(child);
        tracing::trace!(target: "horizon_cascade::tree", ?slot, "appending child");

        if slot.is_single() {
            if let Some(existing) = *self.single_mut(owner, slot) {
                self.detach(existing);
            }
            *self.single_mut(owner, slot) = Some(child);
            self.nodes[child].parent = Some(ParentLink { owner, slot });
            return;
        }

        let tail = self.list(owner, slot).tail;
        match tail {
            Some(tail) => {
                self.nodes[tail].next = Some(child);
                self.nodes[child].prev = Some(tail);
            }
            None => self.list_mut(owner, slot).head = Some(child),
        }
        let list = self.list_mut(owner, slot);
        list.tail = Some(child);
        list.len += 1;
        self.nodes[child].parent = Some(ParentLink { owner, slot });
    }

    /// Inserts a unit immediately before an attached sibling.
    ///
    /// # Panics
    ///
    /// Panics if the anchor is detached or lives in a single-child position.
    pub fn insert_before(&mut self, anchor: NodeId, child: NodeId) {
        let link = self.nodes[anchor].parent.expect("anchor must be attached");
        assert!(!link.slot.is_single(), "cannot insert next to a single-child position");
        tracing::trace!(target: "horizon_cascade::tree", slot = ?link.slot, "inserting before sibling");
        self.detach(child);

        let prev = self.nodes[anchor].prev;
        self.nodes[child].prev = prev;
        self.nodes[child].next = Some(anchor);
        self.nodes[anchor].prev = Some(child);
        match prev {
            Some(prev) => self.nodes[prev].next = Some(child),
            None => self.list_mut(link.owner, link.slot).head = Some(child),
        }
        self.list_mut(link.owner, link.slot).len += 1;
        self.nodes[child].parent = Some(link);
    }

    /// Inserts a unit immediately after an attached sibling.
    ///
    /// # Panics
    ///
    /// Panics if the anchor is detached or lives in a single-child position.
    pub fn insert_after(&mut self, anchor: NodeId, child: NodeId) {
        let link = self.nodes[anchor].parent.expect("anchor must be attached");
        assert!(!link.slot.is_single(), "cannot insert next to a single-child position");
        tracing::trace!(target: "horizon_cascade::tree", slot = ?link.slot, "inserting after sibling");
        self.detach(child);

        let next = self.nodes[anchor].next;
        self.nodes[child].next = next;
        self.nodes[child].prev = Some(anchor);
        self.nodes[anchor].next = Some(child);
        match next {
            Some(next) => self.nodes[next].prev = Some(child),
            None => self.list_mut(link.owner, link.slot).tail = Some(child),
        }
        self.list_mut(link.owner, link.slot).len += 1;
        self.nodes[child].parent = Some(link);
    }

    /// Unlinks a unit from its parent collection. Detached units stay in
    /// the arena (reachable for observation) but no longer appear in
    /// iteration and are not written. No-op if already detached.
    pub fn detach(&mut self, child: NodeId) {
        let Some(link) = self.nodes[child].parent else { return };
        tracing::trace!(target: "horizon_cascade::tree", slot = ?link.slot, "detaching unit");

        if link.slot.is_single() {
            *self.single_mut(link.owner, link.slot) = None;
        } else {
            let prev = self.nodes[child].prev;
            let next = self.nodes[child].next;
            match prev {
                Some(prev) => self.nodes[prev].next = next,
                None => self.list_mut(link.owner, link.slot).head = next,
            }
            match next {
                Some(next) => self.nodes[next].prev = prev,
                None => self.list_mut(link.owner, link.slot).tail = prev,
            }
            self.list_mut(link.owner, link.slot).len -= 1;
        }

        let node = &mut self.nodes[child];
        node.parent = None;
        node.prev = None;
        node.next = None;
    }

    /// The refined value of a declaration, if set.
    pub fn declaration_value(&self, declaration: NodeId) -> Option<NodeId> {
        match &self.nodes[declaration].data {
            NodeData::Declaration(d) => d.value,
            data => panic!("not a declaration: {:?}", data.kind()),
        }
    }

    /// Replaces a declaration's value. The previous value, if any, is moved
    /// to never-emit so stale observers cannot resurrect it.
    pub fn set_declaration_value(&mut self, declaration: NodeId, value: NodeId) {
        if let Some(old) = self.declaration_value(declaration) {
            self.detach(old);
            self.never_emit(old);
        }
        self.append(declaration, Slot::Value, value);
    }

    /// True once a refinable unit carries its refined form. Non-refinable
    /// units report true.
    pub fn is_refined(&self, id: NodeId) -> bool {
        match &self.nodes[id].data {
            NodeData::Selector(d) => d.raw.is_none() || !d.parts.is_empty(),
            NodeData::Declaration(d) => d.name.is_some() && d.value.is_some(),
            NodeData::AtRule(d) => {
                d.expression.is_some()
                    || d.block.is_some()
                    || (d.raw_expression.is_none() && d.raw_block.is_none())
            }
            _ => true,
        }
    }

    /// True if the unit should be written out: attached (or the stylesheet
    /// root), not never-emit, and with writable refined sub-components.
    pub fn is_writable(&self, id: NodeId) -> bool {
        let node = &self.nodes[id];
        if node.status == Status::NeverEmit {
            return false;
        }
        if node.parent.is_none() && !matches!(node.data, NodeData::Stylesheet(_)) {
            return false;
        }
        match &node.data {
            NodeData::Rule(_) => self.children(id, Slot::Selectors).any(|s| self.is_writable(s)),
            NodeData::Selector(d) => {
                if d.parts.is_empty() {
                    d.raw.is_some()
                } else {
                    self.children(id, Slot::Parts).any(|p| self.is_writable(p))
                }
            }
            NodeData::Declaration(d) => match d.value {
                Some(value) => self.is_writable(value),
                None => true,
            },
            NodeData::PropertyValue(_) => {
                self.children(id, Slot::Members).any(|m| self.is_writable(m))
            }
            NodeData::OrphanedComment { .. } => false,
            _ => true,
        }
    }

    fn list_slots(&self, id: NodeId) -> &'static [Slot] {
        match &self.nodes[id].data {
            NodeData::Stylesheet(_) => &[Slot::Statements, Slot::Orphaned],
            NodeData::Rule(_) => &[Slot::Selectors, Slot::Declarations, Slot::Orphaned],
            NodeData::Selector(_) => &[Slot::Parts, Slot::Orphaned],
            NodeData::PropertyValue(_) => &[Slot::Members],
            NodeData::AtRuleBlock(_) => &[Slot::Statements],
            _ => &[],
        }
    }

    /// Deep-copies a unit: a structurally identical sub-tree with fresh
    /// identity and unbroadcasted status. Comments and positions carry over.
    pub fn deep_copy(&mut self, id: NodeId) -> NodeId {
        tracing::trace!(target: "horizon_cascade::tree", kind = ?self.kind(id), "copying unit");
        let node = &self.nodes[id];
        let line = node.line;
        let column = node.column;
        let comments = node.comments.clone();

        let data = match &node.data {
            NodeData::Stylesheet(_) => NodeData::Stylesheet(StylesheetData::default()),
            NodeData::Rule(_) => NodeData::Rule(RuleData::default()),
            NodeData::AtRule(d) => NodeData::AtRule(AtRuleData {
                name: d.name.clone(),
                raw_expression: d.raw_expression.clone(),
                raw_block: d.raw_block.clone(),
                expression: None,
                block: None,
                should_write_name: d.should_write_name,
            }),
            NodeData::Selector(d) => NodeData::Selector(SelectorData {
                raw: d.raw.clone(),
                parts: NodeList::default(),
                orphaned: NodeList::default(),
            }),
            NodeData::Declaration(d) => NodeData::Declaration(DeclarationData {
                raw_name: d.raw_name.clone(),
                raw_value: d.raw_value.clone(),
                name: d.name.clone(),
                value: None,
            }),
            NodeData::PropertyValue(d) => NodeData::PropertyValue(PropertyValueData {
                members: NodeList::default(),
                important: d.important,
            }),
            NodeData::AtRuleBlock(_) => NodeData::AtRuleBlock(Default::default()),
            NodeData::TypeSelector { name } => NodeData::TypeSelector { name: name.clone() },
            NodeData::UniversalSelector => NodeData::UniversalSelector,
            NodeData::IdSelector { name } => NodeData::IdSelector { name: name.clone() },
            NodeData::ClassSelector { name } => NodeData::ClassSelector { name: name.clone() },
            NodeData::AttributeSelector { content } => {
                NodeData::AttributeSelector { content: content.clone() }
            }
            NodeData::PseudoClassSelector { name, args } => {
                NodeData::PseudoClassSelector { name: name.clone(), args: args.clone() }
            }
            NodeData::PseudoElementSelector { name } => {
                NodeData::PseudoElementSelector { name: name.clone() }
            }
            NodeData::Combinator(kind) => NodeData::Combinator(*kind),
            NodeData::KeywordValue { keyword } => {
                NodeData::KeywordValue { keyword: keyword.clone() }
            }
            NodeData::NumericalValue { value, unit } => {
                NodeData::NumericalValue { value: value.clone(), unit: unit.clone() }
            }
            NodeData::StringValue { quote, content } => {
                NodeData::StringValue { quote: *quote, content: content.clone() }
            }
            NodeData::HexColorValue { color } => NodeData::HexColorValue { color: color.clone() },
            NodeData::FunctionValue { name, args } => {
                NodeData::FunctionValue { name: name.clone(), args: args.clone() }
            }
            NodeData::UrlValue { content } => NodeData::UrlValue { content: content.clone() },
            NodeData::Operator(kind) => NodeData::Operator(*kind),
            NodeData::UnquotedIeFilter { content } => {
                NodeData::UnquotedIeFilter { content: content.clone() }
            }
            NodeData::AtRuleExpression { content } => {
                NodeData::AtRuleExpression { content: content.clone() }
            }
            NodeData::OrphanedComment { content, location } => {
                NodeData::OrphanedComment { content: content.clone(), location: *location }
            }
        };

        let copy = self.alloc_at(line, column, data);
        self.nodes[copy].comments = comments;

        for slot in self.list_slots(id) {
            for child in self.child_ids(id, *slot) {
                let child_copy = self.deep_copy(child);
                self.append(copy, *slot, child_copy);
            }
        }

        let single_children: Vec<(Slot, NodeId)> = match &self.nodes[id].data {
            NodeData::Declaration(d) => d.value.map(|v| (Slot::Value, v)).into_iter().collect(),
            NodeData::AtRule(d) => d
                .expression
                .map(|e| (Slot::Expression, e))
                .into_iter()
                .chain(d.block.map(|b| (Slot::Block, b)))
                .collect(),
            _ => Vec::new(),
        };
        for (slot, child) in single_children {
            let child_copy = self.deep_copy(child);
            self.append(copy, slot, child_copy);
        }

        copy
    }
}

/// Iterator over the members of one child collection.
pub struct Children<'a> {
    tree: &'a SyntaxTree,
    next: Option<NodeId>,
}

impl Iterator for Children<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let current = self.next?;
        self.next = self.tree.node(current).next;
        Some(current)
    }
}
