//! The built-in tree-assembly subscriber.

use crate::ast::{CommentLocation, NodeData, StylesheetData, UnitKind};
use crate::plugin::{Plugin, PluginContext, Subscriptions};
use crate::tree::{NodeId, Slot};

/// Groups broadcast statements into the stylesheet root.
///
/// Always registered first, so the stylesheet exists before any other
/// plugin observes a unit. Statements attached elsewhere by the time they
/// are delivered (for example rules a rework plugin already inserted next
/// to a sibling) are left where they are.
#[derive(Debug, Default)]
pub struct TreeBuilder {
    stylesheet: Option<NodeId>,
}

impl TreeBuilder {
    /// The stylesheet root, once `before_pre_process` has run.
    pub fn stylesheet(&self) -> Option<NodeId> {
        self.stylesheet
    }
}

impl Plugin for TreeBuilder {
    fn subscriptions(&self, subscriptions: &mut Subscriptions) {
        subscriptions
            .pre_process(UnitKind::Rule)
            .pre_process(UnitKind::AtRule)
            .pre_process(UnitKind::OrphanedComment);
    }

    fn before_pre_process(&mut self, cx: &mut PluginContext<'_>) {
        let stylesheet = cx.tree_mut().alloc_at(1, 1, NodeData::Stylesheet(StylesheetData::default()));
        self.stylesheet = Some(stylesheet);
    }

    fn after_pre_process(&mut self, cx: &mut PluginContext<'_>) {
        if let Some(stylesheet) = self.stylesheet {
            cx.broadcast(stylesheet);
        }
    }

    fn pre_process(&mut self, unit: NodeId, cx: &mut PluginContext<'_>) {
        let Some(stylesheet) = self.stylesheet else { return };
        if cx.tree().parent(unit).is_some() {
            return;
        }

        match cx.tree().data(unit) {
            NodeData::Rule(_) | NodeData::AtRule(_) => {
                cx.append(stylesheet, Slot::Statements, unit);
            }
            NodeData::OrphanedComment { location: CommentLocation::Stylesheet, .. } => {
                cx.append(stylesheet, Slot::Orphaned, unit);
            }
            _ => {}
        }
    }
}
