//! The refined property value grammar.
//!
//! Parses a raw declaration value into a property value node holding typed
//! terms joined by operators, plus the `!important` flag.

use crate::ast::{NodeData, OperatorKind, PropertyValueData, QuoteMode, UnitKind};
use crate::broadcast::Broadcaster;
use crate::error::{ErrorKind, ParseError};
use crate::refine::Refinery;
use crate::source::Source;
use crate::tree::{NodeId, Slot, SyntaxTree};

/// Parses a complete property value from the fragment, consuming it fully.
///
/// The returned node and its members are not broadcast here; the caller
/// propagates the finished sub-tree.
pub(crate) fn parse_property_value(
    src: &mut Source,
    tree: &mut SyntaxTree,
    refinery: &Refinery,
    bus: &mut dyn Broadcaster,
) -> Result<NodeId, ParseError> {
    let line = src.line();
    let column = src.column();
    let value = tree.alloc_at(line, column, NodeData::PropertyValue(PropertyValueData::default()));

    let mut important = false;
    let mut space: Option<(i32, i32)> = None;
    let mut last_was_term = false;
    let mut comments = Vec::new();

    loop {
        let current = match src.current() {
            Some(c) => c,
            None => break,
        };

        if current.is_whitespace() || (current == '/' && src.peek_at(1) == Some('*')) {
            if space.is_none() {
                space = Some((src.line(), src.column()));
            }
            src.collect_comments(&mut comments);
            continue;
        }

        if current == '!' {
            let position = (src.line(), src.column());
            if important {
                return Err(ParseError::new(ErrorKind::MalformedDeclaration, position.0, position.1));
            }
            src.next();
            src.skip_whitespace();
            if !src.optionally_ignore_case("important") {
                return Err(ParseError::new(ErrorKind::MalformedDeclaration, position.0, position.1));
            }
            important = true;
            space = None;
            continue;
        }

        if important {
            // Nothing may follow !important.
            return Err(src.error(ErrorKind::MalformedDeclaration));
        }

        if matches!(current, ',' | '/') {
            let kind = if current == ',' { OperatorKind::Comma } else { OperatorKind::Slash };
            let operator = tree.alloc_at(src.line(), src.column(), NodeData::Operator(kind));
            src.next();
            tree.append(value, Slot::Members, operator);
            last_was_term = false;
            space = None;
            continue;
        }

        if let Some((space_line, space_column)) = space.take() {
            if last_was_term {
                let operator = tree.alloc_at(
                    space_line,
                    space_column,
                    NodeData::Operator(OperatorKind::Space),
                );
                tree.append(value, Slot::Members, operator);
            }
        }

        let term = parse_term(src, tree, refinery, bus)?;
        tree.add_comments(term, std::mem::take(&mut comments));
        tree.append(value, Slot::Members, term);
        last_was_term = true;
    }

    let has_terms = tree
        .children(value, Slot::Members)
        .any(|m| tree.kind(m).group() == Some(UnitKind::Term));
    if !has_terms {
        return Err(ParseError::new(ErrorKind::MissingValue, line, column));
    }

    if let NodeData::PropertyValue(data) = tree.data_mut(value) {
        data.important = important;
    }
    Ok(value)
}

/// Parses one term at the cursor.
fn parse_term(
    src: &mut Source,
    tree: &mut SyntaxTree,
    refinery: &Refinery,
    bus: &mut dyn Broadcaster,
) -> Result<NodeId, ParseError> {
    let line = src.line();
    let column = src.column();

    if src.optionally('#') {
        let digits = src.chomp(|c| c.is_ascii_hexdigit());
        if !matches!(digits.chars().count(), 3 | 4 | 6 | 8) {
            return Err(ParseError::new(ErrorKind::InvalidHexColor, line, column));
        }
        return Ok(tree.alloc_at(line, column, NodeData::HexColorValue { color: digits }));
    }

    if let Some((quote, content)) = src.read_string()? {
        let quote = if quote == '\'' { QuoteMode::Single } else { QuoteMode::Double };
        return Ok(tree.alloc_at(line, column, NodeData::StringValue { quote, content }));
    }

    if let Some(number) = src.read_number() {
        if number.parse::<f64>().is_err() {
            return Err(ParseError::new(ErrorKind::InvalidNumber, line, column));
        }
        let unit = if src.optionally('%') {
            Some("%".to_string())
        } else {
            src.read_ident()
        };
        return Ok(tree.alloc_at(line, column, NodeData::NumericalValue { value: number, unit }));
    }

    if let Some(name) = src.read_ident() {
        if src.current() == Some('(') {
            let args = capture_parens(src)?;
            if name.eq_ignore_ascii_case("url") {
                return Ok(tree.alloc_at(line, column, NodeData::UrlValue { content: args }));
            }
            let function = tree.alloc_at(line, column, NodeData::FunctionValue { name, args });
            refinery.refine_function(tree, function, bus)?;
            return Ok(function);
        }
        return Ok(tree.alloc_at(line, column, NodeData::KeywordValue { keyword: name }));
    }

    Err(ParseError::new(ErrorKind::MalformedDeclaration, line, column))
}

/// Captures a balanced parenthesized expression verbatim, starting at `(`.
/// The outer parentheses are consumed and excluded; the content is trimmed.
fn capture_parens(src: &mut Source) -> Result<String, ParseError> {
    let open = ParseError::new(ErrorKind::UnclosedParen, src.line(), src.column());
    src.expect('(', ErrorKind::UnclosedParen)?;

    let mut depth = 1u32;
    let mut content = String::new();
    loop {
        match src.current() {
            None => return Err(open),
            Some('"') | Some('\'') => {
                let (quote, inner) = src.read_string()?.expect("quote checked");
                content.push(quote);
                content.push_str(&inner);
                content.push(quote);
            }
            Some('(') => {
                depth += 1;
                content.push('(');
                src.next();
            }
            Some(')') => {
                depth -= 1;
                src.next();
                if depth == 0 {
                    break;
                }
                content.push(')');
            }
            Some(c) => {
                content.push(c);
                src.next();
            }
        }
    }
    Ok(content.trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::broadcast::QueryableBroadcaster;

    fn parse(fragment: &str) -> (SyntaxTree, NodeId) {
        let mut tree = SyntaxTree::new();
        let refinery = Refinery::default();
        let mut bus = QueryableBroadcaster::new();
        let mut src = Source::new(fragment);
        let value = parse_property_value(&mut src, &mut tree, &refinery, &mut bus)
            .unwrap_or_else(|e| panic!("{fragment}: {e}"));
        (tree, value)
    }

    fn parse_err(fragment: &str) -> ParseError {
        let mut tree = SyntaxTree::new();
        let refinery = Refinery::default();
        let mut bus = QueryableBroadcaster::new();
        let mut src = Source::new(fragment);
        parse_property_value(&mut src, &mut tree, &refinery, &mut bus).unwrap_err()
    }

    fn member_kinds(fragment: &str) -> Vec<UnitKind> {
        let (tree, value) = parse(fragment);
        tree.children(value, Slot::Members).map(|m| tree.kind(m)).collect()
    }

    #[test]
    fn single_keyword() {
        let (tree, value) = parse("red");
        let members = tree.child_ids(value, Slot::Members);
        assert_eq!(members.len(), 1);
        match tree.data(members[0]) {
            NodeData::KeywordValue { keyword } => assert_eq!(keyword, "red"),
            _ => panic!("expected keyword"),
        }
    }

    #[test]
    fn space_separated_terms_get_space_operators() {
        assert_eq!(
            member_kinds("1px solid red"),
            vec![
                UnitKind::NumericalValue,
                UnitKind::Operator,
                UnitKind::KeywordValue,
                UnitKind::Operator,
                UnitKind::KeywordValue,
            ]
        );
    }

    #[test]
    fn commas_do_not_attract_space_operators() {
        assert_eq!(
            member_kinds("serif , sans-serif"),
            vec![UnitKind::KeywordValue, UnitKind::Operator, UnitKind::KeywordValue]
        );
    }

    #[test]
    fn slash_operator() {
        assert_eq!(
            member_kinds("10px/1.5"),
            vec![UnitKind::NumericalValue, UnitKind::Operator, UnitKind::NumericalValue]
        );
    }

    #[test]
    fn numeric_values_keep_text_and_unit() {
        let (tree, value) = parse("1.5em");
        let members = tree.child_ids(value, Slot::Members);
        match tree.data(members[0]) {
            NodeData::NumericalValue { value, unit } => {
                assert_eq!(value, "1.5");
                assert_eq!(unit.as_deref(), Some("em"));
            }
            _ => panic!("expected numeric"),
        }

        let (tree, value) = parse("50%");
        let members = tree.child_ids(value, Slot::Members);
        match tree.data(members[0]) {
            NodeData::NumericalValue { unit, .. } => assert_eq!(unit.as_deref(), Some("%")),
            _ => panic!("expected numeric"),
        }
    }

    #[test]
    fn hex_colors_validate_digit_count() {
        let (tree, value) = parse("#A1B2c3");
        let members = tree.child_ids(value, Slot::Members);
        match tree.data(members[0]) {
            NodeData::HexColorValue { color } => assert_eq!(color, "A1B2c3"),
            _ => panic!("expected hex color"),
        }

        assert_eq!(parse_err("#ab").kind, ErrorKind::InvalidHexColor);
        assert_eq!(parse_err("#abcde").kind, ErrorKind::InvalidHexColor);
    }

    #[test]
    fn functions_capture_args_verbatim() {
        let (tree, value) = parse("rgba(0, 0, 0, 0.5)");
        let members = tree.child_ids(value, Slot::Members);
        match tree.data(members[0]) {
            NodeData::FunctionValue { name, args } => {
                assert_eq!(name, "rgba");
                assert_eq!(args, "0, 0, 0, 0.5");
            }
            _ => panic!("expected function"),
        }
    }

    #[test]
    fn nested_function_parens_stay_balanced() {
        let (tree, value) = parse("calc(100% - (10px + 2px))");
        let members = tree.child_ids(value, Slot::Members);
        match tree.data(members[0]) {
            NodeData::FunctionValue { args, .. } => assert_eq!(args, "100% - (10px + 2px)"),
            _ => panic!("expected function"),
        }
    }

    #[test]
    fn urls_are_their_own_term_kind() {
        let (tree, value) = parse("url(images/bg.png)");
        let members = tree.child_ids(value, Slot::Members);
        match tree.data(members[0]) {
            NodeData::UrlValue { content } => assert_eq!(content, "images/bg.png"),
            _ => panic!("expected url"),
        }
    }

    #[test]
    fn strings_keep_their_quote_mode() {
        let (tree, value) = parse("\"Helvetica Neue\"");
        let members = tree.child_ids(value, Slot::Members);
        match tree.data(members[0]) {
            NodeData::StringValue { quote, content } => {
                assert_eq!(*quote, QuoteMode::Double);
                assert_eq!(content, "Helvetica Neue");
            }
            _ => panic!("expected string"),
        }
    }

    #[test]
    fn important_flag_variants() {
        for fragment in ["red !important", "red !IMPORTANT", "red ! important", "red!important"] {
            let (tree, value) = parse(fragment);
            match tree.data(value) {
                NodeData::PropertyValue(d) => assert!(d.important, "{fragment}"),
                _ => unreachable!(),
            }
        }
    }

    #[test]
    fn duplicate_important_is_malformed() {
        assert_eq!(parse_err("red !important !important").kind, ErrorKind::MalformedDeclaration);
    }

    #[test]
    fn terms_after_important_are_malformed() {
        assert_eq!(parse_err("red !important blue").kind, ErrorKind::MalformedDeclaration);
    }

    #[test]
    fn unclosed_function_reports_unclosed_paren() {
        assert_eq!(parse_err("calc(1px + 2px").kind, ErrorKind::UnclosedParen);
    }

    #[test]
    fn empty_value_is_missing_value() {
        assert_eq!(parse_err("   ").kind, ErrorKind::MissingValue);
    }
}
