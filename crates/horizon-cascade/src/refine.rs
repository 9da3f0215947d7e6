//! The refinement registry.
//!
//! Refinement is the on-demand second pass turning raw fragments into typed
//! sub-trees. Plugins register [`RefinerStrategy`] objects at registration
//! time; on `refine`, strategies are consulted in registration order and
//! the first to claim the unit wins. Unclaimed units fall back to the
//! standard grammar refiners, except at-rules, which stay
//! unrefined-but-parsed and write their raw content verbatim.

use crate::ast::{CommentLocation, NodeData, PropertyName, UnitKind};
use crate::broadcast::{propagate, Broadcaster, QueryableBroadcaster};
use crate::error::{ErrorKind, ParseError};
use crate::parser;
use crate::source::Source;
use crate::tree::{NodeId, Slot, SyntaxTree};

/// A pluggable grammar handler for one or more refinable kinds.
///
/// Each method returns `Ok(true)` to claim the unit; the strategy is then
/// responsible for populating the refined children and broadcasting them on
/// the given bus. Returning `Ok(false)` passes the unit to the next
/// strategy, and ultimately to the standard refiner.
pub trait RefinerStrategy {
    /// Offers a selector for refinement.
    fn refine_selector(
        &self,
        tree: &mut SyntaxTree,
        selector: NodeId,
        bus: &mut dyn Broadcaster,
    ) -> Result<bool, ParseError> {
        let _ = (tree, selector, bus);
        Ok(false)
    }

    /// Offers a declaration for refinement.
    fn refine_declaration(
        &self,
        tree: &mut SyntaxTree,
        declaration: NodeId,
        bus: &mut dyn Broadcaster,
    ) -> Result<bool, ParseError> {
        let _ = (tree, declaration, bus);
        Ok(false)
    }

    /// Offers an at-rule for refinement.
    fn refine_at_rule(
        &self,
        tree: &mut SyntaxTree,
        at_rule: NodeId,
        bus: &mut dyn Broadcaster,
    ) -> Result<bool, ParseError> {
        let _ = (tree, at_rule, bus);
        Ok(false)
    }

    /// Offers a function value for refinement.
    fn refine_function(
        &self,
        tree: &mut SyntaxTree,
        function: NodeId,
        bus: &mut dyn Broadcaster,
    ) -> Result<bool, ParseError> {
        let _ = (tree, function, bus);
        Ok(false)
    }
}

/// The registry of refiner strategies plus the standard fallback.
///
/// Strategy lists are mutated only during plugin registration, never during
/// processing.
#[derive(Default)]
pub struct Refinery {
    strategies: Vec<Box<dyn RefinerStrategy>>,
}

impl Refinery {
    /// Registers a strategy. Order of registration is order of consultation.
    pub fn register(&mut self, strategy: Box<dyn RefinerStrategy>) {
        self.strategies.push(strategy);
    }

    /// Refines a selector. No-op if already refined.
    pub fn refine_selector(
        &self,
        tree: &mut SyntaxTree,
        selector: NodeId,
        bus: &mut dyn Broadcaster,
    ) -> Result<(), ParseError> {
        if tree.is_refined(selector) {
            return Ok(());
        }
        for strategy in &self.strategies {
            if strategy.refine_selector(tree, selector, bus)? {
                return Ok(());
            }
        }
        standard_refine_selector(tree, selector, bus)
    }

    /// Refines a declaration. No-op if already refined.
    pub fn refine_declaration(
        &self,
        tree: &mut SyntaxTree,
        declaration: NodeId,
        bus: &mut dyn Broadcaster,
    ) -> Result<(), ParseError> {
        if tree.is_refined(declaration) {
            return Ok(());
        }
        for strategy in &self.strategies {
            if strategy.refine_declaration(tree, declaration, bus)? {
                return Ok(());
            }
        }
        self.standard_refine_declaration(tree, declaration, bus)
    }

    /// Refines an at-rule. Unclaimed at-rules are not an error: they stay
    /// unrefined-but-parsed and their raw expression and block are written
    /// verbatim.
    pub fn refine_at_rule(
        &self,
        tree: &mut SyntaxTree,
        at_rule: NodeId,
        bus: &mut dyn Broadcaster,
    ) -> Result<(), ParseError> {
        if tree.is_refined(at_rule) {
            return Ok(());
        }
        for strategy in &self.strategies {
            if strategy.refine_at_rule(tree, at_rule, bus)? {
                return Ok(());
            }
        }
        Ok(())
    }

    /// Offers a function value to the registered strategies. The standard
    /// behavior keeps the generic function term unchanged.
    pub fn refine_function(
        &self,
        tree: &mut SyntaxTree,
        function: NodeId,
        bus: &mut dyn Broadcaster,
    ) -> Result<(), ParseError> {
        for strategy in &self.strategies {
            if strategy.refine_function(tree, function, bus)? {
                return Ok(());
            }
        }
        Ok(())
    }

    fn standard_refine_declaration(
        &self,
        tree: &mut SyntaxTree,
        declaration: NodeId,
        bus: &mut dyn Broadcaster,
    ) -> Result<(), ParseError> {
        let (raw_name, raw_value) = match tree.data(declaration) {
            NodeData::Declaration(d) => match (&d.raw_name, &d.raw_value) {
                (Some(name), Some(value)) => (name.clone(), value.clone()),
                _ => return Ok(()),
            },
            _ => return Ok(()),
        };

        let name = PropertyName::from_raw(&raw_name);
        let mut src = Source::anchored(&raw_value.content, raw_value.line, raw_value.column);
        let value = parser::declaration::parse_property_value(&mut src, tree, self, bus)?;

        if let NodeData::Declaration(d) = tree.data_mut(declaration) {
            d.name = Some(name);
        }
        tree.set_declaration_value(declaration, value);
        propagate(tree, bus, value);
        Ok(())
    }
}

/// The standard selector refiner: parses the raw fragment into parts,
/// broadcasting each part child-first, then attaches them.
fn standard_refine_selector(
    tree: &mut SyntaxTree,
    selector: NodeId,
    bus: &mut dyn Broadcaster,
) -> Result<(), ParseError> {
    let raw = match tree.data(selector) {
        NodeData::Selector(d) => match &d.raw {
            Some(raw) => raw.clone(),
            None => return Ok(()),
        },
        _ => return Ok(()),
    };

    let mut src = Source::anchored(&raw.content, raw.line, raw.column);
    let mut recorder = QueryableBroadcaster::chained(bus);
    let orphans = parser::selector::parse_selector_parts(&mut src, tree, &mut recorder)?;

    if !src.eof() {
        return Err(src.error(ErrorKind::UnparsableSelector));
    }

    let parts: Vec<NodeId> = recorder.query(UnitKind::SelectorPart).collect();
    for part in parts {
        tree.append(selector, Slot::Parts, part);
    }

    for body in orphans {
        let orphan = tree.alloc_at(
            src.line(),
            src.column(),
            NodeData::OrphanedComment { content: body, location: CommentLocation::Selector },
        );
        tree.append(selector, Slot::Orphaned, orphan);
        bus.broadcast(tree, orphan);
    }

    tracing::trace!(
        target: "horizon_cascade::refine",
        parts = tree.child_ids(selector, Slot::Parts).len(),
        "refined selector"
    );
    Ok(())
}

/// Claims `filter` declarations holding unquoted proprietary
/// `progid:DXImageTransform` values, capturing the value verbatim so the
/// standard value grammar never sees it.
///
/// Quoted filters (`-ms-filter: "progid:..."`) are ordinary string values
/// and are not claimed.
#[derive(Debug, Default)]
pub struct UnquotedIeFilter;

impl RefinerStrategy for UnquotedIeFilter {
    fn refine_declaration(
        &self,
        tree: &mut SyntaxTree,
        declaration: NodeId,
        bus: &mut dyn Broadcaster,
    ) -> Result<bool, ParseError> {
        let (raw_name, raw_value) = match tree.data(declaration) {
            NodeData::Declaration(d) => match (&d.raw_name, &d.raw_value) {
                (Some(name), Some(value)) => (name.clone(), value.clone()),
                _ => return Ok(false),
            },
            _ => return Ok(false),
        };

        let property = raw_name.content.trim();
        if !property.eq_ignore_ascii_case("filter") && !property.eq_ignore_ascii_case("-ms-filter")
        {
            return Ok(false);
        }
        if !raw_value.content.starts_with("progid:") {
            return Ok(false);
        }

        let value = tree.alloc_at(
            raw_value.line,
            raw_value.column,
            NodeData::UnquotedIeFilter { content: raw_value.content.clone() },
        );
        if let NodeData::Declaration(d) = tree.data_mut(declaration) {
            d.name = Some(PropertyName::from_raw(&raw_name));
        }
        tree.set_declaration_value(declaration, value);
        bus.broadcast(tree, value);
        Ok(true)
    }
}
