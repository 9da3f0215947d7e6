//! The three-mode CSS writer.
//!
//! Every unit knows how to write itself for the current mode; the writer
//! walks the tree and skips non-writable units together with their
//! separators. Unrefined units write their raw fragments verbatim;
//! comments are not emitted.

use crate::ast::{CombinatorKind, NodeData, OperatorKind};
use crate::tree::{NodeId, Slot, SyntaxTree};

/// Output style.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriterMode {
    /// One declaration per line, indented inside blocks.
    Verbose,
    /// One rule per line.
    Inline,
    /// No optional whitespace at all.
    Compressed,
}

/// Serializes a syntax tree back to CSS text.
#[derive(Debug, Clone, Copy)]
pub struct StyleWriter {
    mode: WriterMode,
}

impl StyleWriter {
    /// A writer for the given mode.
    pub fn new(mode: WriterMode) -> Self {
        Self { mode }
    }

    /// A verbose-mode writer.
    pub fn verbose() -> Self {
        Self::new(WriterMode::Verbose)
    }

    /// An inline-mode writer.
    pub fn inline() -> Self {
        Self::new(WriterMode::Inline)
    }

    /// A compressed-mode writer.
    pub fn compressed() -> Self {
        Self::new(WriterMode::Compressed)
    }

    /// The selected mode.
    pub fn mode(&self) -> WriterMode {
        self.mode
    }

    /// True in verbose mode.
    pub fn is_verbose(&self) -> bool {
        self.mode == WriterMode::Verbose
    }

    /// True in inline mode.
    pub fn is_inline(&self) -> bool {
        self.mode == WriterMode::Inline
    }

    /// True in compressed mode.
    pub fn is_compressed(&self) -> bool {
        self.mode == WriterMode::Compressed
    }

    /// Writes a unit (usually the stylesheet root) to a string.
    pub fn write(&self, tree: &SyntaxTree, unit: NodeId) -> String {
        let mut out = String::new();
        self.write_into(tree, unit, &mut out);
        out
    }

    fn writable_children(&self, tree: &SyntaxTree, owner: NodeId, slot: Slot) -> Vec<NodeId> {
        tree.children(owner, slot).filter(|child| tree.is_writable(*child)).collect()
    }

    fn write_statements(&self, tree: &SyntaxTree, owner: NodeId, out: &mut String) {
        let statements = self.writable_children(tree, owner, Slot::Statements);
        for (index, statement) in statements.iter().enumerate() {
            if index > 0 && !self.is_compressed() {
                out.push('\n');
            }
            self.write_into(tree, *statement, out);
        }
    }

    fn write_into(&self, tree: &SyntaxTree, unit: NodeId, out: &mut String) {
        if !tree.is_writable(unit) && tree.parent(unit).is_some() {
            return;
        }

        match tree.data(unit) {
            NodeData::Stylesheet(_) => self.write_statements(tree, unit, out),

            NodeData::Rule(_) => {
                let selectors = self.writable_children(tree, unit, Slot::Selectors);
                for (index, selector) in selectors.iter().enumerate() {
                    if index > 0 {
                        out.push_str(if self.is_compressed() { "," } else { ", " });
                    }
                    self.write_into(tree, *selector, out);
                }

                let declarations = self.writable_children(tree, unit, Slot::Declarations);
                match self.mode {
                    WriterMode::Verbose => {
                        out.push_str(" {\n");
                        for declaration in &declarations {
                            out.push_str("  ");
                            self.write_into(tree, *declaration, out);
                            out.push_str(";\n");
                        }
                        out.push('}');
                    }
                    WriterMode::Inline => {
                        out.push_str(" {");
                        for (index, declaration) in declarations.iter().enumerate() {
                            if index > 0 {
                                out.push_str("; ");
                            }
                            self.write_into(tree, *declaration, out);
                        }
                        out.push('}');
                    }
                    WriterMode::Compressed => {
                        out.push('{');
                        for (index, declaration) in declarations.iter().enumerate() {
                            if index > 0 {
                                out.push(';');
                            }
                            self.write_into(tree, *declaration, out);
                        }
                        out.push('}');
                    }
                }
            }

            NodeData::AtRule(d) => {
                let wrote_name = d.should_write_name;
                if wrote_name {
                    out.push('@');
                    out.push_str(&d.name);
                }

                let expression = d.expression;
                let raw_expression = d.raw_expression.clone();
                if let Some(expression) = expression {
                    if wrote_name {
                        out.push(' ');
                    }
                    self.write_into(tree, expression, out);
                } else if let Some(raw) = raw_expression {
                    if wrote_name {
                        out.push(' ');
                    }
                    out.push_str(&raw.content);
                }

                if let Some(block) = d.block {
                    if self.is_compressed() {
                        out.push('{');
                    } else {
                        out.push_str(" {\n");
                    }
                    self.write_statements(tree, block, out);
                    if !self.is_compressed() {
                        out.push('\n');
                    }
                    out.push('}');
                } else if let Some(raw) = &d.raw_block {
                    if self.is_compressed() {
                        out.push('{');
                        out.push_str(raw.content.trim());
                    } else {
                        out.push_str(" {");
                        out.push_str(&raw.content);
                    }
                    out.push('}');
                } else {
                    out.push(';');
                }
            }

            NodeData::AtRuleBlock(_) => self.write_statements(tree, unit, out),
            NodeData::AtRuleExpression { content } => out.push_str(content),

            NodeData::Selector(d) => {
                if d.parts.is_empty() {
                    if let Some(raw) = &d.raw {
                        out.push_str(&raw.content);
                    }
                } else {
                    for part in self.writable_children(tree, unit, Slot::Parts) {
                        self.write_into(tree, part, out);
                    }
                }
            }

            NodeData::TypeSelector { name } => out.push_str(name),
            NodeData::UniversalSelector => out.push('*'),
            NodeData::IdSelector { name } => {
                out.push('#');
                out.push_str(name);
            }
            NodeData::ClassSelector { name } => {
                out.push('.');
                out.push_str(name);
            }
            NodeData::AttributeSelector { content } => {
                out.push('[');
                out.push_str(content);
                out.push(']');
            }
            NodeData::PseudoClassSelector { name, args } => {
                out.push(':');
                out.push_str(name);
                if let Some(args) = args {
                    out.push('(');
                    out.push_str(args);
                    out.push(')');
                }
            }
            NodeData::PseudoElementSelector { name } => {
                out.push_str("::");
                out.push_str(name);
            }
            NodeData::Combinator(kind) => match kind {
                CombinatorKind::Descendant => out.push(' '),
                CombinatorKind::Child => self.write_combinator('>', out),
                CombinatorKind::AdjacentSibling => self.write_combinator('+', out),
                CombinatorKind::GeneralSibling => self.write_combinator('~', out),
            },

            NodeData::Declaration(d) => {
                if let (Some(name), Some(value)) = (&d.name, d.value) {
                    out.push_str(&name.full_name());
                    out.push(':');
                    if self.is_verbose() {
                        out.push(' ');
                    }
                    self.write_into(tree, value, out);
                } else if let (Some(raw_name), Some(raw_value)) = (&d.raw_name, &d.raw_value) {
                    out.push_str(&raw_name.content);
                    out.push(':');
                    if self.is_verbose() {
                        out.push(' ');
                    }
                    out.push_str(&raw_value.content);
                }
            }

            NodeData::PropertyValue(d) => {
                for member in self.writable_children(tree, unit, Slot::Members) {
                    self.write_into(tree, member, out);
                }
                if d.important {
                    if !self.is_compressed() {
                        out.push(' ');
                    }
                    out.push_str("!important");
                }
            }

            NodeData::KeywordValue { keyword } => out.push_str(keyword),
            NodeData::NumericalValue { value, unit: suffix } => {
                out.push_str(value);
                if let Some(suffix) = suffix {
                    out.push_str(suffix);
                }
            }
            NodeData::StringValue { quote, content } => {
                out.push(quote.character());
                out.push_str(content);
                out.push(quote.character());
            }
            NodeData::HexColorValue { color } => {
                out.push('#');
                if self.is_compressed() {
                    out.push_str(&color.to_ascii_lowercase());
                } else {
                    out.push_str(color);
                }
            }
            NodeData::FunctionValue { name, args } => {
                out.push_str(name);
                out.push('(');
                out.push_str(args);
                out.push(')');
            }
            NodeData::UrlValue { content } => {
                out.push_str("url(");
                out.push_str(content);
                out.push(')');
            }
            NodeData::Operator(kind) => match kind {
                OperatorKind::Space => out.push(' '),
                OperatorKind::Slash => out.push('/'),
                OperatorKind::Comma => {
                    out.push(',');
                    if !self.is_compressed() {
                        out.push(' ');
                    }
                }
            },

            NodeData::UnquotedIeFilter { content } => out.push_str(content),
            NodeData::OrphanedComment { .. } => {}
        }
    }

    fn write_combinator(&self, symbol: char, out: &mut String) {
        if self.is_compressed() {
            out.push(symbol);
        } else {
            out.push(' ');
            out.push(symbol);
            out.push(' ');
        }
    }
}
