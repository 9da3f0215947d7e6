//! The emitter: plugin scheduling and unit delivery.
//!
//! The engine owns the registered plugins, a dispatch table indexed by unit
//! kind, the refinement registry and the error manager. Broadcasts enqueue
//! units; the flush loop delivers them one at a time, walking the dispatch
//! table phase by phase. Units broadcast from inside a handler are queued
//! and delivered immediately after the current unit's subscriber chain
//! completes, keeping the total order deterministic.

use std::any::TypeId;
use std::collections::{HashMap, VecDeque};

use crate::ast::UnitKind;
use crate::broadcast::{propagate, Broadcaster};
use crate::error::{ErrorManager, ParseError};
use crate::plugin::{Phase, Plugin, PluginContext, Registrar, Requirement, Subscriptions};
use crate::refine::Refinery;
use crate::tree::{NodeId, Status, SyntaxTree};

/// A bus that enqueues units onto the engine's pending queue. Status flips
/// at delivery time, so double-enqueueing a unit is harmless.
pub(crate) struct PendingBus<'a> {
    pending: &'a mut VecDeque<NodeId>,
}

impl<'a> PendingBus<'a> {
    pub(crate) fn new(pending: &'a mut VecDeque<NodeId>) -> Self {
        Self { pending }
    }
}

impl Broadcaster for PendingBus<'_> {
    fn broadcast(&mut self, _tree: &mut SyntaxTree, unit: NodeId) {
        self.pending.push_back(unit);
    }
}

#[derive(Debug, Clone, Copy)]
struct SubRef {
    plugin: usize,
    phase: Phase,
    requirement: Requirement,
    order: usize,
}

/// The processing engine behind one `process()` call.
pub(crate) struct Engine {
    plugins: Vec<Box<dyn Plugin>>,
    by_type: HashMap<TypeId, usize>,
    dispatch: HashMap<UnitKind, Vec<SubRef>>,
    pub(crate) refinery: Refinery,
    pub(crate) errors: Box<dyn ErrorManager>,
    pending: VecDeque<NodeId>,
    delivering: bool,
}

impl Engine {
    pub(crate) fn new(errors: Box<dyn ErrorManager>) -> Self {
        Self {
            plugins: Vec::new(),
            by_type: HashMap::new(),
            dispatch: HashMap::new(),
            refinery: Refinery::default(),
            errors,
            pending: VecDeque::new(),
            delivering: false,
        }
    }

    pub(crate) fn set_error_manager(&mut self, errors: Box<dyn ErrorManager>) {
        self.errors = errors;
    }

    /// Whether a plugin of the given type is registered.
    pub(crate) fn has<P: Plugin + 'static>(&self) -> bool {
        self.by_type.contains_key(&TypeId::of::<P>())
    }

    /// Registers a plugin: resolves its dependencies, records its
    /// subscriptions and appends it to the delivery order. Registering a
    /// second plugin of the same type is a no-op.
    pub(crate) fn add_boxed(&mut self, mut plugin: Box<dyn Plugin>) {
        let type_id = plugin.as_ref().as_any().type_id();
        if self.by_type.contains_key(&type_id) {
            tracing::debug!(target: "horizon_cascade::plugin", "duplicate plugin type ignored");
            return;
        }

        plugin.register(&mut Registrar { engine: self });

        let mut subscriptions = Subscriptions::default();
        plugin.subscriptions(&mut subscriptions);

        let index = self.plugins.len();
        self.by_type.insert(type_id, index);
        for (order, sub) in subscriptions.entries.iter().enumerate() {
            self.dispatch.entry(sub.kind).or_default().push(SubRef {
                plugin: index,
                phase: sub.phase,
                requirement: sub.requirement,
                order,
            });
        }
        self.plugins.push(plugin);
    }

    /// Typed access to a registered plugin.
    pub(crate) fn plugin<P: Plugin + 'static>(&self) -> Option<&P> {
        let index = *self.by_type.get(&TypeId::of::<P>())?;
        self.plugins[index].as_any().downcast_ref()
    }

    /// Routes an error through the error manager.
    pub(crate) fn report(&mut self, error: ParseError) -> crate::Result<()> {
        self.errors.report(error)
    }

    /// Broadcasts a unit and its sub-tree container-first, then delivers
    /// everything queued.
    pub(crate) fn broadcast_all(
        &mut self,
        tree: &mut SyntaxTree,
        unit: NodeId,
    ) -> crate::Result<()> {
        let mut bus = PendingBus::new(&mut self.pending);
        propagate(tree, &mut bus, unit);
        self.flush(tree)
    }

    /// Delivers queued units until the queue drains. Reentrant calls from
    /// within a delivery are no-ops; the outer loop picks the units up.
    pub(crate) fn flush(&mut self, tree: &mut SyntaxTree) -> crate::Result<()> {
        if self.delivering {
            return Ok(());
        }
        self.delivering = true;
        while let Some(unit) = self.pending.pop_front() {
            if let Err(error) = self.deliver(tree, unit) {
                self.delivering = false;
                self.pending.clear();
                return Err(error);
            }
        }
        self.delivering = false;
        Ok(())
    }

    fn deliver(&mut self, tree: &mut SyntaxTree, unit: NodeId) -> crate::Result<()> {
        // Broadcasting the same unit twice is idempotent.
        if tree.status(unit) != Status::Unbroadcasted {
            return Ok(());
        }
        tree.mark_broadcasted(unit);

        let kind = tree.kind(unit);
        let mut subs: Vec<SubRef> = Vec::new();
        if let Some(list) = self.dispatch.get(&kind) {
            subs.extend_from_slice(list);
        }
        if let Some(group) = kind.group() {
            if let Some(list) = self.dispatch.get(&group) {
                subs.extend_from_slice(list);
            }
        }
        subs.sort_by_key(|sub| (sub.phase, sub.plugin, sub.order));

        tracing::trace!(
            target: "horizon_cascade::broadcast",
            ?kind,
            subscribers = subs.len(),
            "delivering unit"
        );

        for sub in subs {
            let satisfied = match sub.requirement {
                Requirement::Automatic => true,
                Requirement::RefinedSelector => {
                    kind != UnitKind::Selector || tree.is_refined(unit)
                }
                Requirement::RefinedDeclaration => {
                    kind != UnitKind::Declaration || tree.is_refined(unit)
                }
                Requirement::RefinedAtRule => kind != UnitKind::AtRule || tree.is_refined(unit),
            };
            if !satisfied {
                continue;
            }

            let mut fatal = None;
            {
                let Engine { plugins, refinery, errors, pending, .. } = &mut *self;
                let plugin = &mut plugins[sub.plugin];
                let mut cx = PluginContext {
                    tree: &mut *tree,
                    refinery,
                    errors: errors.as_mut(),
                    pending,
                    fatal: &mut fatal,
                };
                match sub.phase {
                    Phase::PreProcess => plugin.pre_process(unit, &mut cx),
                    Phase::Rework => plugin.rework(unit, &mut cx),
                    Phase::Validate => plugin.validate(unit, &mut cx),
                }
            }
            if let Some(error) = fatal {
                return Err(error);
            }
        }

        tree.mark_processed(unit);
        Ok(())
    }

    /// Runs `before_pre_process` on every plugin, in registration order.
    pub(crate) fn run_before_hooks(&mut self, tree: &mut SyntaxTree) -> crate::Result<()> {
        self.run_hooks(tree, |plugin, cx| plugin.before_pre_process(cx))
    }

    /// Runs `after_pre_process` on every plugin, in registration order.
    pub(crate) fn run_after_hooks(&mut self, tree: &mut SyntaxTree) -> crate::Result<()> {
        self.run_hooks(tree, |plugin, cx| plugin.after_pre_process(cx))
    }

    fn run_hooks(
        &mut self,
        tree: &mut SyntaxTree,
        hook: impl Fn(&mut Box<dyn Plugin>, &mut PluginContext<'_>),
    ) -> crate::Result<()> {
        for index in 0..self.plugins.len() {
            let mut fatal = None;
            {
                let Engine { plugins, refinery, errors, pending, .. } = &mut *self;
                let mut cx = PluginContext {
                    tree: &mut *tree,
                    refinery,
                    errors: errors.as_mut(),
                    pending,
                    fatal: &mut fatal,
                };
                hook(&mut plugins[index], &mut cx);
            }
            if let Some(error) = fatal {
                return Err(error);
            }
            self.flush(tree)?;
        }
        Ok(())
    }

    /// Drains the errors recorded by a collecting manager.
    pub(crate) fn take_errors(&mut self) -> Vec<ParseError> {
        self.errors.take_errors()
    }

    /// Releases the plugins for post-processing retrieval.
    pub(crate) fn into_parts(self) -> (Vec<Box<dyn Plugin>>, HashMap<TypeId, usize>) {
        (self.plugins, self.by_type)
    }
}
