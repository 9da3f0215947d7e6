//! Selector data types.

use crate::ast::Raw;
use crate::tree::NodeList;

/// A combinator between two selector parts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CombinatorKind {
    /// Whitespace between two parts.
    Descendant,
    /// `>`
    Child,
    /// `+`
    AdjacentSibling,
    /// `~`
    GeneralSibling,
}

/// Payload of a selector unit: one comma-separated element of a rule's
/// selector group.
///
/// The raw fragment may contain grammatically incorrect CSS; refinement
/// parses it into the ordered `parts` collection. A selector created
/// dynamically from parts has no raw fragment.
#[derive(Debug, Default)]
pub struct SelectorData {
    /// The original, non-validated selector content.
    pub raw: Option<Raw>,
    /// The refined selector parts, in source order.
    pub parts: NodeList,
    /// Orphaned comments found at the tail of the selector.
    pub orphaned: NodeList,
}

impl SelectorData {
    /// Creates an unrefined selector from its raw content.
    pub fn from_raw(raw: Raw) -> Self {
        Self { raw: Some(raw), ..Self::default() }
    }
}

/// Pseudo selectors that use single-colon syntax but are pseudo elements.
pub const LEGACY_PSEUDO_ELEMENTS: &[&str] = &["first-line", "first-letter", "before", "after"];
