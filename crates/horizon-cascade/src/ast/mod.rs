//! The AST entity set.
//!
//! Every unit in the tree is a [`NodeData`] payload stored in the arena
//! ([`crate::tree::SyntaxTree`]) together with its position, status,
//! comments and sibling links. Raw fragments ([`Raw`]) are plain values
//! carried inside refinable payloads, not tree nodes.

pub mod atrule;
pub mod declaration;
pub mod selector;

pub use atrule::{AtRuleBlockData, AtRuleData};
pub use declaration::{DeclarationData, OperatorKind, PropertyName, PropertyValueData, QuoteMode};
pub use selector::{CombinatorKind, SelectorData, LEGACY_PSEUDO_ELEMENTS};

use crate::tree::NodeList;

/// An uninterpreted CSS substring with its original position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Raw {
    /// 1-based source line.
    pub line: i32,
    /// 1-based source column.
    pub column: i32,
    /// The verbatim content.
    pub content: String,
}

impl Raw {
    /// Creates a raw fragment.
    pub fn new(line: i32, column: i32, content: impl Into<String>) -> Self {
        Self { line, column, content: content.into() }
    }
}

/// The scope an orphaned comment was found in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommentLocation {
    /// At the tail of a selector.
    Selector,
    /// At the tail of a declaration block.
    Rule,
    /// At the tail of the stylesheet.
    Stylesheet,
}

/// Payload of the stylesheet root.
#[derive(Debug, Default)]
pub struct StylesheetData {
    /// Top-level statements, in source order.
    pub statements: NodeList,
    /// Orphaned comments found at the end of the document.
    pub orphaned: NodeList,
}

/// Payload of a rule: a selector group plus a declaration block.
#[derive(Debug, Default)]
pub struct RuleData {
    /// Comma-separated selectors, in source order.
    pub selectors: NodeList,
    /// Declarations, in source order.
    pub declarations: NodeList,
    /// Orphaned comments found at the tail of the declaration block.
    pub orphaned: NodeList,
}

/// The payload of one AST unit.
#[derive(Debug)]
pub enum NodeData {
    Stylesheet(StylesheetData),
    Rule(RuleData),
    AtRule(AtRuleData),
    Selector(SelectorData),
    TypeSelector { name: String },
    UniversalSelector,
    IdSelector { name: String },
    ClassSelector { name: String },
    AttributeSelector { content: String },
    PseudoClassSelector { name: String, args: Option<String> },
    PseudoElementSelector { name: String },
    Combinator(CombinatorKind),
    Declaration(DeclarationData),
    PropertyValue(PropertyValueData),
    KeywordValue { keyword: String },
    NumericalValue { value: String, unit: Option<String> },
    StringValue { quote: QuoteMode, content: String },
    HexColorValue { color: String },
    FunctionValue { name: String, args: String },
    UrlValue { content: String },
    Operator(OperatorKind),
    UnquotedIeFilter { content: String },
    AtRuleExpression { content: String },
    AtRuleBlock(AtRuleBlockData),
    OrphanedComment { content: String, location: CommentLocation },
}

impl NodeData {
    /// The runtime variant of this payload.
    pub fn kind(&self) -> UnitKind {
        match self {
            NodeData::Stylesheet(_) => UnitKind::Stylesheet,
            NodeData::Rule(_) => UnitKind::Rule,
            NodeData::AtRule(_) => UnitKind::AtRule,
            NodeData::Selector(_) => UnitKind::Selector,
            NodeData::TypeSelector { .. } => UnitKind::TypeSelector,
            NodeData::UniversalSelector => UnitKind::UniversalSelector,
            NodeData::IdSelector { .. } => UnitKind::IdSelector,
            NodeData::ClassSelector { .. } => UnitKind::ClassSelector,
            NodeData::AttributeSelector { .. } => UnitKind::AttributeSelector,
            NodeData::PseudoClassSelector { .. } => UnitKind::PseudoClassSelector,
            NodeData::PseudoElementSelector { .. } => UnitKind::PseudoElementSelector,
            NodeData::Combinator(_) => UnitKind::Combinator,
            NodeData::Declaration(_) => UnitKind::Declaration,
            NodeData::PropertyValue(_) => UnitKind::PropertyValue,
            NodeData::KeywordValue { .. } => UnitKind::KeywordValue,
            NodeData::NumericalValue { .. } => UnitKind::NumericalValue,
            NodeData::StringValue { .. } => UnitKind::StringValue,
            NodeData::HexColorValue { .. } => UnitKind::HexColorValue,
            NodeData::FunctionValue { .. } => UnitKind::FunctionValue,
            NodeData::UrlValue { .. } => UnitKind::UrlValue,
            NodeData::Operator(_) => UnitKind::Operator,
            NodeData::UnquotedIeFilter { .. } => UnitKind::UnquotedIeFilter,
            NodeData::AtRuleExpression { .. } => UnitKind::AtRuleExpression,
            NodeData::AtRuleBlock(_) => UnitKind::AtRuleBlock,
            NodeData::OrphanedComment { .. } => UnitKind::OrphanedComment,
        }
    }
}

/// The runtime variant of an AST unit, used for bus queries and plugin
/// subscriptions.
///
/// [`UnitKind::Statement`], [`UnitKind::SelectorPart`] and [`UnitKind::Term`]
/// are group variants: no unit reports them as its own kind, but a
/// subscription to a group matches every unit whose kind belongs to it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnitKind {
    Stylesheet,
    Rule,
    AtRule,
    Selector,
    TypeSelector,
    UniversalSelector,
    IdSelector,
    ClassSelector,
    AttributeSelector,
    PseudoClassSelector,
    PseudoElementSelector,
    Combinator,
    Declaration,
    PropertyValue,
    KeywordValue,
    NumericalValue,
    StringValue,
    HexColorValue,
    FunctionValue,
    UrlValue,
    Operator,
    UnquotedIeFilter,
    AtRuleExpression,
    AtRuleBlock,
    OrphanedComment,
    /// Group variant matching rules and at-rules.
    Statement,
    /// Group variant matching every selector part.
    SelectorPart,
    /// Group variant matching every value term.
    Term,
}

impl UnitKind {
    /// The group variant this kind belongs to, if any.
    pub fn group(self) -> Option<UnitKind> {
        match self {
            UnitKind::Rule | UnitKind::AtRule => Some(UnitKind::Statement),
            UnitKind::TypeSelector
            | UnitKind::UniversalSelector
            | UnitKind::IdSelector
            | UnitKind::ClassSelector
            | UnitKind::AttributeSelector
            | UnitKind::PseudoClassSelector
            | UnitKind::PseudoElementSelector
            | UnitKind::Combinator => Some(UnitKind::SelectorPart),
            UnitKind::KeywordValue
            | UnitKind::NumericalValue
            | UnitKind::StringValue
            | UnitKind::HexColorValue
            | UnitKind::FunctionValue
            | UnitKind::UrlValue => Some(UnitKind::Term),
            _ => None,
        }
    }
}
