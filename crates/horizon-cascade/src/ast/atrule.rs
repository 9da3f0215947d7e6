//! At-rule data types.

use crate::ast::Raw;
use crate::tree::{NodeId, NodeList};

/// Payload of an at-rule unit such as `@media`, `@keyframes` or `@charset`.
///
/// The raw expression and block are captured verbatim; a registered at-rule
/// refiner may replace them with typed `expression`/`block` nodes. Unclaimed
/// at-rules stay unrefined-but-parsed and write their raw content verbatim.
#[derive(Debug)]
pub struct AtRuleData {
    /// The at-rule name, without the `@`.
    pub name: String,
    /// The raw expression, e.g. `all and (min-width: 800px)`.
    pub raw_expression: Option<Raw>,
    /// The raw block content, without the surrounding braces.
    pub raw_block: Option<Raw>,
    /// The refined expression node, if a refiner produced one.
    pub expression: Option<NodeId>,
    /// The refined block node, if a refiner produced one.
    pub block: Option<NodeId>,
    /// Whether the `@name` is written out. Custom refiners may disable this
    /// for at-rules that do not exist in the output CSS.
    pub should_write_name: bool,
}

impl AtRuleData {
    /// Creates an unrefined at-rule from its raw pieces.
    pub fn from_raw(name: impl Into<String>, raw_expression: Option<Raw>, raw_block: Option<Raw>) -> Self {
        Self {
            name: name.into(),
            raw_expression,
            raw_block,
            expression: None,
            block: None,
            should_write_name: true,
        }
    }
}

/// Payload of a refined at-rule block holding nested statements.
#[derive(Debug, Default)]
pub struct AtRuleBlockData {
    /// The nested statements, in source order.
    pub statements: NodeList,
}
