//! The refined selector grammar.
//!
//! Parses a raw selector fragment into a sequence of selector parts. Parts
//! are broadcast as they are parsed (child-first), before the refining
//! selector attaches them.

use crate::ast::{CombinatorKind, NodeData, LEGACY_PSEUDO_ELEMENTS};
use crate::broadcast::Broadcaster;
use crate::error::{ErrorKind, ParseError};
use crate::source::Source;
use crate::tree::{NodeId, SyntaxTree};

/// Parses selector parts until the fragment is exhausted, broadcasting each
/// one. Returns the comment bodies left dangling at the tail (orphans).
pub(crate) fn parse_selector_parts(
    src: &mut Source,
    tree: &mut SyntaxTree,
    bus: &mut dyn Broadcaster,
) -> Result<Vec<String>, ParseError> {
    let mut comments: Vec<String> = Vec::new();
    let mut parsed_any = false;

    loop {
        if src.eof() {
            break;
        }

        let current = src.current().unwrap();

        if current.is_whitespace() {
            // Possible descendant combinator; whitespace is never skipped
            // blindly because it is significant between parts.
            let line = src.line();
            let column = src.column();
            src.collect_comments(&mut comments);
            if src.eof() {
                break;
            }

            let combinator = match src.current() {
                Some('>') | Some('+') | Some('~') => None,
                _ if parsed_any => Some(tree.alloc_at(
                    line,
                    column,
                    NodeData::Combinator(CombinatorKind::Descendant),
                )),
                _ => None,
            };
            if let Some(combinator) = combinator {
                bus.broadcast(tree, combinator);
            }
            continue;
        }

        if current == '/' && src.peek_at(1) == Some('*') {
            src.collect_comments(&mut comments);
            continue;
        }

        if matches!(current, '>' | '+' | '~') {
            let line = src.line();
            let column = src.column();
            let kind = match current {
                '>' => CombinatorKind::Child,
                '+' => CombinatorKind::AdjacentSibling,
                _ => CombinatorKind::GeneralSibling,
            };
            src.next();
            src.collect_comments(&mut comments);
            if src.eof() {
                return Err(ParseError::new(ErrorKind::UnparsableSelector, line, column));
            }
            let combinator = tree.alloc_at(line, column, NodeData::Combinator(kind));
            bus.broadcast(tree, combinator);
            continue;
        }

        let part = parse_part(src, tree)?;
        tree.add_comments(part, std::mem::take(&mut comments));
        bus.broadcast(tree, part);
        parsed_any = true;
    }

    Ok(comments)
}

/// Parses one simple selector part at the cursor.
fn parse_part(src: &mut Source, tree: &mut SyntaxTree) -> Result<NodeId, ParseError> {
    let line = src.line();
    let column = src.column();

    let data = match src.current() {
        Some('*') => {
            src.next();
            NodeData::UniversalSelector
        }
        Some('.') => {
            src.next();
            match src.read_ident() {
                Some(name) => NodeData::ClassSelector { name },
                None => return Err(ParseError::new(ErrorKind::UnparsableSelector, line, column)),
            }
        }
        Some('#') => {
            src.next();
            match src.read_ident() {
                Some(name) => NodeData::IdSelector { name },
                None => return Err(ParseError::new(ErrorKind::UnparsableSelector, line, column)),
            }
        }
        Some('[') => {
            src.next();
            let mut content = String::new();
            loop {
                match src.current() {
                    None => {
                        return Err(ParseError::new(ErrorKind::UnparsableSelector, line, column))
                    }
                    Some(']') => {
                        src.next();
                        break;
                    }
                    Some('"') | Some('\'') => {
                        let (quote, inner) = src.read_string()?.expect("quote checked");
                        content.push(quote);
                        content.push_str(&inner);
                        content.push(quote);
                    }
                    Some(c) => {
                        content.push(c);
                        src.next();
                    }
                }
            }
            NodeData::AttributeSelector { content }
        }
        Some(':') => return parse_pseudo(src, tree),
        Some(c) if c.is_ascii_alphabetic() || matches!(c, '_' | '-' | '\\') => {
            match src.read_ident() {
                Some(name) => NodeData::TypeSelector { name },
                None => return Err(ParseError::new(ErrorKind::UnparsableSelector, line, column)),
            }
        }
        _ => return Err(ParseError::new(ErrorKind::UnparsableSelector, line, column)),
    };

    Ok(tree.alloc_at(line, column, data))
}

/// Parses a pseudo class or pseudo element selector at the cursor.
///
/// One colon is a pseudo class, two colons a pseudo element, except for the
/// legacy elements (`:first-line`, `:first-letter`, `:before`, `:after`)
/// which parse as pseudo elements despite single-colon syntax. A trailing
/// `(...)` argument is captured verbatim with balanced parentheses.
pub(crate) fn parse_pseudo(
    src: &mut Source,
    tree: &mut SyntaxTree,
) -> Result<NodeId, ParseError> {
    let line = src.line();
    let column = src.column();

    src.expect(':', ErrorKind::MissingPseudoName)?;
    let mut element = src.optionally(':');

    let name = match src.read_ident() {
        Some(name) => name,
        None => return Err(ParseError::new(ErrorKind::MissingPseudoName, line, column)),
    };

    if LEGACY_PSEUDO_ELEMENTS.contains(&name.as_str()) {
        element = true;
    }

    if element {
        return Ok(tree.alloc_at(line, column, NodeData::PseudoElementSelector { name }));
    }

    let args = if src.current() == Some('(') {
        let open = ParseError::new(ErrorKind::UnclosedParen, src.line(), src.column());
        src.next();
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
        Some(content.trim().to_string())
    } else {
        None
    };

    Ok(tree.alloc_at(line, column, NodeData::PseudoClassSelector { name, args }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::UnitKind;
    use crate::broadcast::QueryableBroadcaster;

    fn parse(fragment: &str) -> (SyntaxTree, Vec<(UnitKind, NodeId)>) {
        let mut tree = SyntaxTree::new();
        let mut bus = QueryableBroadcaster::new();
        let mut src = Source::new(fragment);
        parse_selector_parts(&mut src, &mut tree, &mut bus).unwrap();
        assert!(src.eof(), "fragment not fully consumed: {fragment}");
        let parts = bus.all().map(|id| (tree.kind(id), id)).collect();
        (tree, parts)
    }

    fn kinds(fragment: &str) -> Vec<UnitKind> {
        parse(fragment).1.into_iter().map(|(kind, _)| kind).collect()
    }

    #[test]
    fn parses_simple_parts() {
        assert_eq!(kinds("p"), vec![UnitKind::TypeSelector]);
        assert_eq!(kinds("*"), vec![UnitKind::UniversalSelector]);
        assert_eq!(kinds(".class"), vec![UnitKind::ClassSelector]);
        assert_eq!(kinds("#id"), vec![UnitKind::IdSelector]);
        assert_eq!(kinds("[href]"), vec![UnitKind::AttributeSelector]);
    }

    #[test]
    fn parses_compound_and_complex_selectors() {
        assert_eq!(
            kinds(".class1 .class2"),
            vec![UnitKind::ClassSelector, UnitKind::Combinator, UnitKind::ClassSelector]
        );
        assert_eq!(
            kinds("p > .class"),
            vec![UnitKind::TypeSelector, UnitKind::Combinator, UnitKind::ClassSelector]
        );
        assert_eq!(
            kinds("p+p"),
            vec![UnitKind::TypeSelector, UnitKind::Combinator, UnitKind::TypeSelector]
        );
        assert_eq!(
            kinds("p#id.class"),
            vec![UnitKind::TypeSelector, UnitKind::IdSelector, UnitKind::ClassSelector]
        );
    }

    #[test]
    fn explicit_combinators_absorb_surrounding_whitespace() {
        let sequences = ["p > q", "p >q", "p> q", "p>q"];
        for source in sequences {
            assert_eq!(
                kinds(source),
                vec![UnitKind::TypeSelector, UnitKind::Combinator, UnitKind::TypeSelector],
                "{source}"
            );
        }
    }

    #[test]
    fn pseudo_class_and_element_by_colon_count() {
        let (tree, parts) = parse(":hover");
        assert_eq!(parts[0].0, UnitKind::PseudoClassSelector);
        match tree.data(parts[0].1) {
            NodeData::PseudoClassSelector { name, args } => {
                assert_eq!(name, "hover");
                assert!(args.is_none());
            }
            _ => unreachable!(),
        }

        let (_, parts) = parse("::selection");
        assert_eq!(parts[0].0, UnitKind::PseudoElementSelector);
    }

    #[test]
    fn legacy_pseudo_elements_coerce_from_single_colon() {
        for source in [":first-line", ":first-letter", ":before", ":after"] {
            let (tree, parts) = parse(source);
            assert_eq!(parts[0].0, UnitKind::PseudoElementSelector, "{source}");
            match tree.data(parts[0].1) {
                NodeData::PseudoElementSelector { name } => {
                    assert_eq!(format!(":{name}"), source);
                }
                _ => unreachable!(),
            }
        }
    }

    #[test]
    fn pseudo_args_are_verbatim_and_trimmed() {
        let cases = [
            (":nth-child(2n+1)", "nth-child", "2n+1"),
            (":nth-child( +3n - 2 )", "nth-child", "+3n - 2"),
            (":not([DISABLED])", "not", "[DISABLED]"),
            (":not(   .classname123)", "not", ".classname123"),
        ];
        for (source, expected_name, expected_args) in cases {
            let (tree, parts) = parse(source);
            match tree.data(parts[0].1) {
                NodeData::PseudoClassSelector { name, args } => {
                    assert_eq!(name, expected_name, "{source}");
                    assert_eq!(args.as_deref(), Some(expected_args), "{source}");
                }
                _ => panic!("expected pseudo class for {source}"),
            }
        }
    }

    #[test]
    fn pseudo_parser_stops_after_the_closing_paren() {
        let mut tree = SyntaxTree::new();
        let mut src = Source::new(":nth-child(2n+1)");
        parse_pseudo(&mut src, &mut tree).unwrap();
        assert_eq!(src.index(), 16);

        for source in [":nth-child(2n+1)   ", ":nth-child(2n+1)\n", ":nth-child(2n+1)>"] {
            let mut src = Source::new(source);
            parse_pseudo(&mut src, &mut tree).unwrap();
            assert_eq!(src.index(), 16, "{source}");
        }

        let mut src = Source::new(":not([DISABLED]))");
        parse_pseudo(&mut src, &mut tree).unwrap();
        assert_eq!(src.index(), 16);
    }

    #[test]
    fn lone_colon_reports_missing_pseudo_name_at_the_colon() {
        let mut tree = SyntaxTree::new();
        let mut src = Source::new(":");
        let err = parse_pseudo(&mut src, &mut tree).unwrap_err();
        assert_eq!(err.kind, ErrorKind::MissingPseudoName);
        assert_eq!((err.line, err.column), (1, 1));
    }

    #[test]
    fn unclosed_args_report_unclosed_paren() {
        let mut tree = SyntaxTree::new();
        let mut src = Source::new(":nth-child(2n+1");
        let err = parse_pseudo(&mut src, &mut tree).unwrap_err();
        assert_eq!(err.kind, ErrorKind::UnclosedParen);
    }

    #[test]
    fn comments_attach_to_the_following_part() {
        let mut tree = SyntaxTree::new();
        let mut bus = QueryableBroadcaster::new();
        let mut src = Source::new("/*comment*/.class");
        parse_selector_parts(&mut src, &mut tree, &mut bus).unwrap();
        let part = bus.find_only(UnitKind::ClassSelector).unwrap();
        assert_eq!(tree.comments(part), &["comment".to_string()]);
    }

    #[test]
    fn tail_comments_are_returned_as_orphans() {
        let mut tree = SyntaxTree::new();
        let mut bus = QueryableBroadcaster::new();
        let mut src = Source::new(".class /*tail*/");
        let orphans = parse_selector_parts(&mut src, &mut tree, &mut bus).unwrap();
        assert_eq!(orphans, vec!["tail".to_string()]);
        // No dangling descendant combinator for the trailing whitespace.
        assert_eq!(bus.count(), 1);
    }

    #[test]
    fn garbage_is_unparsable() {
        let mut tree = SyntaxTree::new();
        let mut bus = QueryableBroadcaster::new();
        let mut src = Source::new(".a $$");
        let err = parse_selector_parts(&mut src, &mut tree, &mut bus).unwrap_err();
        assert_eq!(err.kind, ErrorKind::UnparsableSelector);
    }
}
