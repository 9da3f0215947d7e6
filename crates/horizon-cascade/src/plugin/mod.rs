//! The plugin protocol.
//!
//! A plugin subscribes to AST variants and observes (or reworks) each unit
//! as it is broadcast. Delivery happens per unit, phases in order
//! PreProcess to Rework to Validate; within a phase, plugins fire in
//! registration order, and within a plugin in subscription declaration
//! order.

pub mod auto_refine;
pub(crate) mod emitter;
pub mod prefixer;
pub mod tree_builder;

pub use auto_refine::AutoRefine;
pub use prefixer::Prefixer;
pub use tree_builder::TreeBuilder;

use std::any::Any;
use std::collections::VecDeque;

use crate::ast::UnitKind;
use crate::broadcast::propagate;
use crate::error::{Error, ErrorManager, ParseError};
use crate::refine::{Refinery, RefinerStrategy};
use crate::tree::{NodeId, Slot, SyntaxTree};

use emitter::{Engine, PendingBus};

/// The delivery phase of a subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Phase {
    /// Structural observation before any transformation.
    PreProcess,
    /// Transformation; may replace or extend the tree.
    Rework,
    /// Read-only checking; may report errors.
    Validate,
}

/// Gates a subscription on the refinement state of the carrier unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Requirement {
    /// Fires on the raw unit.
    Automatic,
    /// Fires on selectors only once refined.
    RefinedSelector,
    /// Fires on declarations only once refined.
    RefinedDeclaration,
    /// Fires on at-rules only once refined.
    RefinedAtRule,
}

/// One subscription declaration: variant × phase × requirement.
#[derive(Debug, Clone, Copy)]
pub struct Subscription {
    pub kind: UnitKind,
    pub phase: Phase,
    pub requirement: Requirement,
}

/// The subscription declarations of one plugin, in declaration order.
#[derive(Debug, Default)]
pub struct Subscriptions {
    pub(crate) entries: Vec<Subscription>,
}

impl Subscriptions {
    /// Declares a subscription.
    pub fn add(&mut self, kind: UnitKind, phase: Phase, requirement: Requirement) -> &mut Self {
        self.entries.push(Subscription { kind, phase, requirement });
        self
    }

    /// Declares a PreProcess subscription on the raw unit.
    pub fn pre_process(&mut self, kind: UnitKind) -> &mut Self {
        self.add(kind, Phase::PreProcess, Requirement::Automatic)
    }

    /// Declares a Rework subscription on the raw unit.
    pub fn rework(&mut self, kind: UnitKind) -> &mut Self {
        self.add(kind, Phase::Rework, Requirement::Automatic)
    }

    /// Declares a Rework subscription gated on refinement.
    pub fn rework_when(&mut self, kind: UnitKind, requirement: Requirement) -> &mut Self {
        self.add(kind, Phase::Rework, requirement)
    }

    /// Declares a Validate subscription on the raw unit.
    pub fn validate(&mut self, kind: UnitKind) -> &mut Self {
        self.add(kind, Phase::Validate, Requirement::Automatic)
    }

    /// Declares a Validate subscription gated on refinement.
    pub fn validate_when(&mut self, kind: UnitKind, requirement: Requirement) -> &mut Self {
        self.add(kind, Phase::Validate, requirement)
    }
}

/// Object-safe downcasting support, blanket-implemented for every plugin.
pub trait AsAny: Any {
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T: Any> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// An observer/transformer of the broadcast stream.
///
/// All methods have empty defaults; a plugin implements the ones it needs
/// and declares matching [`Subscriptions`].
pub trait Plugin: AsAny {
    /// Called once at registration. Dependencies required here are
    /// instantiated and registered before this plugin, deduplicated by
    /// type; refiner strategies registered here join the refinement
    /// registry in order.
    fn register(&mut self, registrar: &mut Registrar<'_>) {
        let _ = registrar;
    }

    /// Declares this plugin's subscriptions.
    fn subscriptions(&self, subscriptions: &mut Subscriptions) {
        let _ = subscriptions;
    }

    /// Called once per document, before parsing begins.
    fn before_pre_process(&mut self, cx: &mut PluginContext<'_>) {
        let _ = cx;
    }

    /// Called once per document, after parsing completes.
    fn after_pre_process(&mut self, cx: &mut PluginContext<'_>) {
        let _ = cx;
    }

    /// Receives a unit matching a PreProcess subscription.
    fn pre_process(&mut self, unit: NodeId, cx: &mut PluginContext<'_>) {
        let _ = (unit, cx);
    }

    /// Receives a unit matching a Rework subscription.
    fn rework(&mut self, unit: NodeId, cx: &mut PluginContext<'_>) {
        let _ = (unit, cx);
    }

    /// Receives a unit matching a Validate subscription.
    fn validate(&mut self, unit: NodeId, cx: &mut PluginContext<'_>) {
        let _ = (unit, cx);
    }
}

/// Enables recognition of unquoted proprietary IE filter values
/// (`filter: progid:...`) by registering the
/// [`crate::refine::UnquotedIeFilter`] strategy.
#[derive(Debug, Default)]
pub struct IeFilters;

impl Plugin for IeFilters {
    fn register(&mut self, registrar: &mut Registrar<'_>) {
        registrar.refiner(crate::refine::UnquotedIeFilter);
    }
}

/// Handed to [`Plugin::register`] for dependency and strategy registration.
pub struct Registrar<'a> {
    pub(crate) engine: &'a mut Engine,
}

impl Registrar<'_> {
    /// Requires a dependency plugin, constructing it with `Default` if no
    /// plugin of that type is registered yet.
    pub fn require<P: Plugin + Default + 'static>(&mut self) {
        self.require_with(P::default);
    }

    /// Requires a dependency plugin, constructing it with the factory if no
    /// plugin of that type is registered yet.
    pub fn require_with<P: Plugin + 'static>(&mut self, factory: impl FnOnce() -> P) {
        if !self.engine.has::<P>() {
            self.engine.add_boxed(Box::new(factory()));
        }
    }

    /// Registers a refiner strategy.
    pub fn refiner(&mut self, strategy: impl RefinerStrategy + 'static) {
        self.engine.refinery.register(Box::new(strategy));
    }
}

/// The window a plugin gets into the engine during delivery and hooks.
///
/// Mutations that attach new units re-broadcast them, so downstream
/// subscribers observe every replacement with a fresh
/// Unbroadcasted to Broadcasted transition.
pub struct PluginContext<'a> {
    pub(crate) tree: &'a mut SyntaxTree,
    pub(crate) refinery: &'a Refinery,
    pub(crate) errors: &'a mut dyn ErrorManager,
    pub(crate) pending: &'a mut VecDeque<NodeId>,
    pub(crate) fatal: &'a mut Option<Error>,
}

impl PluginContext<'_> {
    /// The document tree.
    pub fn tree(&self) -> &SyntaxTree {
        self.tree
    }

    /// Mutable access to the document tree. Prefer the structured mutation
    /// methods, which take care of re-broadcasting.
    pub fn tree_mut(&mut self) -> &mut SyntaxTree {
        self.tree
    }

    /// Queues a unit (and its unbroadcasted sub-units) for delivery after
    /// the current unit finishes its subscriber chain.
    pub fn broadcast(&mut self, unit: NodeId) {
        let PluginContext { tree, pending, .. } = self;
        let mut bus = PendingBus::new(pending);
        propagate(tree, &mut bus, unit);
    }

    /// Refines a refinable unit through the registry. Returns false if a
    /// refinement error was reported; the unit then stays raw.
    pub fn refine(&mut self, unit: NodeId) -> bool {
        let kind = self.tree.kind(unit);
        let result = {
            let PluginContext { tree, refinery, pending, .. } = self;
            let mut bus = PendingBus::new(pending);
            match kind {
                UnitKind::Selector => refinery.refine_selector(tree, unit, &mut bus),
                UnitKind::Declaration => refinery.refine_declaration(tree, unit, &mut bus),
                UnitKind::AtRule => refinery.refine_at_rule(tree, unit, &mut bus),
                _ => Ok(()),
            }
        };
        match result {
            Ok(()) => true,
            Err(error) => {
                self.report(error);
                false
            }
        }
    }

    /// Reports an error through the error manager.
    pub fn report(&mut self, error: ParseError) {
        if self.fatal.is_some() {
            return;
        }
        if let Err(fatal) = self.errors.report(error) {
            *self.fatal = Some(fatal);
        }
    }

    /// Appends a unit to a collection and re-broadcasts it.
    pub fn append(&mut self, owner: NodeId, slot: Slot, child: NodeId) {
        self.tree.append(owner, slot, child);
        self.broadcast(child);
    }

    /// Inserts a unit before a sibling and re-broadcasts it.
    pub fn insert_before(&mut self, anchor: NodeId, child: NodeId) {
        self.tree.insert_before(anchor, child);
        self.broadcast(child);
    }

    /// Inserts a unit after a sibling and re-broadcasts it.
    pub fn insert_after(&mut self, anchor: NodeId, child: NodeId) {
        self.tree.insert_after(anchor, child);
        self.broadcast(child);
    }

    /// Detaches a unit from its parent collection.
    pub fn detach(&mut self, unit: NodeId) {
        self.tree.detach(unit);
    }

    /// Replaces a declaration's value and re-broadcasts the replacement.
    pub fn set_declaration_value(&mut self, declaration: NodeId, value: NodeId) {
        self.tree.set_declaration_value(declaration, value);
        self.broadcast(value);
    }
}
