//! The built-in eager-refinement plugin.

use crate::ast::UnitKind;
use crate::plugin::{Plugin, PluginContext, Subscriptions};
use crate::tree::NodeId;

/// Refines units as they are broadcast, so downstream subscribers gated on
/// a refined requirement always fire.
///
/// Register it before plugins that rely on it; plugins that require it as a
/// dependency get exactly that ordering.
#[derive(Debug)]
pub struct AutoRefine {
    selectors: bool,
    declarations: bool,
    at_rules: bool,
}

impl AutoRefine {
    /// Refines every refinable unit.
    pub fn all() -> Self {
        Self { selectors: true, declarations: true, at_rules: true }
    }

    /// Refines selectors only.
    pub fn selectors_only() -> Self {
        Self { selectors: true, declarations: false, at_rules: false }
    }

    /// Refines declarations only.
    pub fn declarations_only() -> Self {
        Self { selectors: false, declarations: true, at_rules: false }
    }

    /// Refines at-rules only.
    pub fn at_rules_only() -> Self {
        Self { selectors: false, declarations: false, at_rules: true }
    }
}

impl Default for AutoRefine {
    fn default() -> Self {
        Self::all()
    }
}

impl Plugin for AutoRefine {
    fn subscriptions(&self, subscriptions: &mut Subscriptions) {
        subscriptions
            .rework(UnitKind::Selector)
            .rework(UnitKind::Declaration)
            .rework(UnitKind::AtRule);
    }

    fn rework(&mut self, unit: NodeId, cx: &mut PluginContext<'_>) {
        let wanted = match cx.tree().kind(unit) {
            UnitKind::Selector => self.selectors,
            UnitKind::Declaration => self.declarations,
            UnitKind::AtRule => self.at_rules,
            _ => false,
        };
        if wanted {
            cx.refine(unit);
        }
    }
}
