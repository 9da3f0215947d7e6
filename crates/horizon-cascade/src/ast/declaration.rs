//! Declaration, property name and property value data types.

use crate::ast::Raw;
use crate::data::Prefix;
use crate::tree::{NodeId, NodeList};

/// How a string value was quoted in the source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuoteMode {
    Single,
    Double,
}

impl QuoteMode {
    /// The quote character.
    pub fn character(self) -> char {
        match self {
            QuoteMode::Single => '\'',
            QuoteMode::Double => '"',
        }
    }
}

/// An operator between two terms in a property value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperatorKind {
    /// Whitespace between two terms.
    Space,
    /// `/`
    Slash,
    /// `,`
    Comma,
}

/// A canonical property identifier with an optional vendor prefix.
///
/// Name comparisons are ASCII case-insensitive; the original casing is
/// preserved for output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertyName {
    /// 1-based source line, or -1 if synthesized.
    pub line: i32,
    /// 1-based source column, or -1 if synthesized.
    pub column: i32,
    /// The vendor prefix, if the source name carried a recognized one.
    pub prefix: Option<Prefix>,
    /// The property name without its prefix.
    pub name: String,
}

impl PropertyName {
    /// Creates a synthesized property name (no source position).
    pub fn using(name: impl Into<String>) -> Self {
        let name = name.into();
        match Prefix::split(&name) {
            Some((prefix, rest)) => {
                Self { line: -1, column: -1, prefix: Some(prefix), name: rest.to_string() }
            }
            None => Self { line: -1, column: -1, prefix: None, name },
        }
    }

    /// Parses a property name out of a raw fragment, splitting a leading
    /// vendor prefix when it is a recognized one.
    pub fn from_raw(raw: &Raw) -> Self {
        let trimmed = raw.content.trim();
        let mut parsed = Self::using(trimmed);
        parsed.line = raw.line;
        parsed.column = raw.column;
        parsed
    }

    /// The full name including the prefix, e.g. `-moz-border-radius`.
    pub fn full_name(&self) -> String {
        match self.prefix {
            Some(prefix) => format!("{}{}", prefix.symbol(), self.name),
            None => self.name.clone(),
        }
    }

    /// True if this name carries a vendor prefix.
    pub fn is_prefixed(&self) -> bool {
        self.prefix.is_some()
    }

    /// Compares against a full name (prefix included), case-insensitively.
    pub fn matches(&self, full: &str) -> bool {
        self.full_name().eq_ignore_ascii_case(full)
    }

    /// Compares unprefixed names, case-insensitively.
    pub fn matches_ignore_prefix(&self, name: &str) -> bool {
        self.name.eq_ignore_ascii_case(name)
    }
}

/// Payload of a declaration unit.
///
/// Until refinement, only the raw name and value fragments are set; a
/// dynamically created declaration carries refined fields only.
#[derive(Debug, Default)]
pub struct DeclarationData {
    /// The original, non-validated property name.
    pub raw_name: Option<Raw>,
    /// The original, non-validated property value.
    pub raw_value: Option<Raw>,
    /// The refined property name.
    pub name: Option<PropertyName>,
    /// The refined property value node (a `PropertyValue`, or an alternate
    /// value kind claimed by a refiner strategy such as `UnquotedIeFilter`).
    pub value: Option<NodeId>,
}

impl DeclarationData {
    /// Creates an unrefined declaration from its raw fragments.
    pub fn from_raw(raw_name: Raw, raw_value: Raw) -> Self {
        Self { raw_name: Some(raw_name), raw_value: Some(raw_value), ..Self::default() }
    }
}

/// Payload of a property value: an ordered sequence of terms and operators.
#[derive(Debug, Default)]
pub struct PropertyValueData {
    /// Terms and operators, in source order.
    pub members: NodeList,
    /// True if the value carried `!important`.
    pub important: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_known_vendor_prefix() {
        let name = PropertyName::using("-moz-border-radius");
        assert_eq!(name.prefix, Some(Prefix::Moz));
        assert_eq!(name.name, "border-radius");
        assert_eq!(name.full_name(), "-moz-border-radius");
    }

    #[test]
    fn keeps_unknown_prefix_in_the_name() {
        let name = PropertyName::using("-fancy-thing");
        assert_eq!(name.prefix, None);
        assert_eq!(name.name, "-fancy-thing");
    }

    #[test]
    fn matching_is_case_insensitive() {
        let name = PropertyName::using("-MOZ-Border-Radius");
        assert!(name.matches("-moz-border-radius"));
        assert!(name.matches_ignore_prefix("BORDER-RADIUS"));
        assert!(!name.matches("border-radius"));
    }

    #[test]
    fn from_raw_keeps_the_position() {
        let raw = Raw::new(3, 5, "  color ");
        let name = PropertyName::from_raw(&raw);
        assert_eq!((name.line, name.column), (3, 5));
        assert_eq!(name.name, "color");
    }
}
