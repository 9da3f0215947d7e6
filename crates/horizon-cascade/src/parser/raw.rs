//! Raw parsers: the streaming first pass.
//!
//! These parsers produce coarse, unvalidated units carrying verbatim raw
//! fragments. Grammar validation happens later, on demand, through
//! refinement. Quoted strings protect every structural character; comments
//! are extracted and attached to the next unit.

use crate::ast::{
    AtRuleData, CommentLocation, DeclarationData, NodeData, Raw, RuleData, SelectorData,
};
use crate::error::{ErrorKind, ParseError};
use crate::plugin::emitter::Engine;
use crate::source::Source;
use crate::tree::{NodeId, Slot, SyntaxTree};

/// Parses a whole document, broadcasting each statement as it completes.
///
/// Statement-level parse errors go through the error manager: a throwing
/// manager aborts, a collecting manager records the error and the parser
/// recovers at the next statement boundary.
pub(crate) fn parse_stylesheet(
    src: &mut Source,
    tree: &mut SyntaxTree,
    engine: &mut Engine,
) -> crate::Result<()> {
    loop {
        let mut comments = Vec::new();
        src.collect_comments(&mut comments);

        if src.eof() {
            for body in comments {
                let orphan = tree.alloc_at(
                    src.line(),
                    src.column(),
                    NodeData::OrphanedComment { content: body, location: CommentLocation::Stylesheet },
                );
                engine.broadcast_all(tree, orphan)?;
            }
            return Ok(());
        }

        let statement = if src.current() == Some('@') {
            match parse_at_rule(src, tree) {
                Ok(at_rule) => {
                    tree.add_comments(at_rule, comments);
                    Ok(Some(at_rule))
                }
                Err(error) => Err(error),
            }
        } else {
            parse_rule(src, tree, comments)
        };

        match statement {
            Ok(Some(statement)) => {
                engine.broadcast_all(tree, statement)?;
            }
            Ok(None) => {
                let error = src.error(ErrorKind::UnparsableContent);
                engine.report(error)?;
                skip_statement(src);
            }
            Err(error) => {
                engine.report(error)?;
                skip_statement(src);
            }
        }
    }
}

/// Parses one rule: a selector group up to `{`, then a declaration block up
/// to the matching `}`. Returns `Ok(None)` if the cursor is not at a
/// possible selector start.
///
/// The returned rule already owns its selectors and declarations; the
/// caller broadcasts the whole sub-tree container-first.
pub(crate) fn parse_rule(
    src: &mut Source,
    tree: &mut SyntaxTree,
    leading_comments: Vec<String>,
) -> Result<Option<NodeId>, ParseError> {
    let mut selectors = Vec::new();
    let mut pending_comments = leading_comments;

    loop {
        src.collect_comments(&mut pending_comments);
        let raw = match scan_raw_selector(src)? {
            Some(raw) => raw,
            None if selectors.is_empty() => return Ok(None),
            None => return Err(src.error(ErrorKind::UnparsableSelector)),
        };

        let selector =
            tree.alloc_at(raw.line, raw.column, NodeData::Selector(SelectorData::from_raw(raw)));
        tree.add_comments(selector, std::mem::take(&mut pending_comments));
        selectors.push(selector);

        if !src.optionally(',') {
            break;
        }
    }

    src.expect('{', ErrorKind::UnclosedBlock)?;

    let first = tree.node(selectors[0]);
    let (line, column) = (first.line(), first.column());
    let rule = tree.alloc_at(line, column, NodeData::Rule(RuleData::default()));
    for selector in selectors {
        tree.append(rule, Slot::Selectors, selector);
    }

    parse_declaration_block(src, tree, rule)?;
    Ok(Some(rule))
}

/// Splits the declarations of a block on top-level semicolons, appending
/// them to the rule. A trailing unterminated declaration is accepted; empty
/// declarations are skipped; comments with no following declaration become
/// orphaned at the rule.
fn parse_declaration_block(
    src: &mut Source,
    tree: &mut SyntaxTree,
    rule: NodeId,
) -> Result<(), ParseError> {
    loop {
        let mut comments = Vec::new();
        src.collect_comments(&mut comments);

        if src.optionally('}') {
            for body in comments {
                let orphan = tree.alloc_at(
                    src.line(),
                    src.column(),
                    NodeData::OrphanedComment { content: body, location: CommentLocation::Rule },
                );
                tree.append(rule, Slot::Orphaned, orphan);
            }
            return Ok(());
        }
        if src.eof() {
            return Err(src.error(ErrorKind::UnclosedBlock));
        }
        if src.optionally(';') {
            continue;
        }

        let declaration = parse_declaration(src, tree)?;
        tree.add_comments(declaration, comments);
        tree.append(rule, Slot::Declarations, declaration);
        src.optionally(';');
    }
}

/// Parses one raw declaration: everything up to the next top-level `;` or
/// `}`, split once on the first top-level `:` into name and value.
fn parse_declaration(src: &mut Source, tree: &mut SyntaxTree) -> Result<NodeId, ParseError> {
    let name_line = src.line();
    let name_column = src.column();
    let mut name = String::new();

    // Property name: up to the first top-level colon.
    loop {
        match src.current() {
            None | Some(';') | Some('}') => {
                return Err(ParseError::new(ErrorKind::MissingColon, name_line, name_column));
            }
            Some(':') => {
                src.next();
                break;
            }
            Some('"') | Some('\'') => {
                name.push_str(&consume_string_verbatim(src)?);
            }
            Some(c) => {
                name.push(c);
                src.next();
            }
        }
    }

    src.skip_whitespace();
    let value_line = src.line();
    let value_column = src.column();
    let mut value = String::new();
    let mut parens = 0u32;

    loop {
        match src.current() {
            None | Some('}') => break,
            Some(';') if parens == 0 => break,
            Some('"') | Some('\'') => {
                value.push_str(&consume_string_verbatim(src)?);
            }
            Some('/') if src.peek_at(1) == Some('*') => {
                value.push_str(&consume_comment_verbatim(src));
            }
            Some(c) => {
                if c == '(' {
                    parens += 1;
                } else if c == ')' {
                    parens = parens.saturating_sub(1);
                }
                value.push(c);
                src.next();
            }
        }
    }

    let name = name.trim_end();
    let value = value.trim_end();
    if name.is_empty() {
        return Err(ParseError::new(ErrorKind::MalformedDeclaration, name_line, name_column));
    }
    if value.is_empty() {
        return Err(ParseError::new(ErrorKind::MissingValue, value_line, value_column));
    }

    Ok(tree.alloc_at(
        name_line,
        name_column,
        NodeData::Declaration(DeclarationData::from_raw(
            Raw::new(name_line, name_column, name),
            Raw::new(value_line, value_column, value),
        )),
    ))
}

/// Parses an at-rule: `@name`, an optional raw expression terminated by `;`
/// or followed by a brace block, or a brace block with no expression.
pub(crate) fn parse_at_rule(src: &mut Source, tree: &mut SyntaxTree) -> Result<NodeId, ParseError> {
    let line = src.line();
    let column = src.column();
    src.expect('@', ErrorKind::UnparsableContent)?;

    let name = match src.read_ident() {
        Some(name) => name,
        None => return Err(ParseError::new(ErrorKind::UnparsableContent, line, column)),
    };

    src.skip_whitespace();
    let expr_line = src.line();
    let expr_column = src.column();
    let mut expression = String::new();

    loop {
        match src.current() {
            None | Some(';') | Some('{') => break,
            Some('"') | Some('\'') => expression.push_str(&consume_string_verbatim(src)?),
            Some('/') if src.peek_at(1) == Some('*') => {
                expression.push_str(&consume_comment_verbatim(src));
            }
            Some(c) => {
                expression.push(c);
                src.next();
            }
        }
    }

    let expression = expression.trim_end();
    let raw_expression = (!expression.is_empty())
        .then(|| Raw::new(expr_line, expr_column, expression));

    let raw_block = if src.optionally('{') {
        let block_line = src.line();
        let block_column = src.column();
        let open = ParseError::new(ErrorKind::UnclosedBlock, line, column);
        let mut content = String::new();
        let mut depth = 1u32;
        loop {
            match src.current() {
                None => return Err(open),
                Some('"') | Some('\'') => content.push_str(&consume_string_verbatim(src)?),
                Some('/') if src.peek_at(1) == Some('*') => {
                    content.push_str(&consume_comment_verbatim(src));
                }
                Some(c) => {
                    if c == '{' {
                        depth += 1;
                    } else if c == '}' {
                        depth -= 1;
                        if depth == 0 {
                            src.next();
                            break;
                        }
                    }
                    content.push(c);
                    src.next();
                }
            }
        }
        Some(Raw::new(block_line, block_column, content))
    } else {
        src.optionally(';');
        None
    };

    if raw_expression.is_none() && raw_block.is_none() {
        return Err(ParseError::new(ErrorKind::UnparsableContent, line, column));
    }

    Ok(tree.alloc_at(line, column, NodeData::AtRule(AtRuleData::from_raw(name, raw_expression, raw_block))))
}

fn selector_start(c: char) -> bool {
    c.is_ascii_alphabetic() || matches!(c, '.' | '#' | '*' | ':' | '[' | '_' | '-' | '\\')
}

/// Scans the verbatim content of one selector: everything up to the next
/// top-level `,` or `{`, with trailing whitespace trimmed. Returns `None`
/// without advancing if the cursor is not at a possible selector start.
fn scan_raw_selector(src: &mut Source) -> Result<Option<Raw>, ParseError> {
    match src.current() {
        Some(c) if selector_start(c) => {}
        _ => return Ok(None),
    }

    let line = src.line();
    let column = src.column();
    let mut content = String::new();

    loop {
        match src.current() {
            None | Some(',') | Some('{') => break,
            Some('"') | Some('\'') => content.push_str(&consume_string_verbatim(src)?),
            Some('/') if src.peek_at(1) == Some('*') => {
                content.push_str(&consume_comment_verbatim(src));
            }
            Some(c) => {
                content.push(c);
                src.next();
            }
        }
    }

    Ok(Some(Raw::new(line, column, content.trim_end())))
}

/// Consumes a quoted string, returning it verbatim including the quotes.
fn consume_string_verbatim(src: &mut Source) -> Result<String, ParseError> {
    let (quote, content) = src.read_string()?.expect("caller checked for a quote");
    Ok(format!("{quote}{content}{quote}"))
}

/// Consumes a `/* ... */` comment, returning it verbatim.
fn consume_comment_verbatim(src: &mut Source) -> String {
    let mut out = String::new();
    src.next();
    src.next();
    out.push_str("/*");
    loop {
        if src.eof() {
            break;
        }
        if src.current() == Some('*') && src.peek_at(1) == Some('/') {
            src.next();
            src.next();
            out.push_str("*/");
            break;
        }
        out.push(src.next().unwrap());
    }
    out
}

/// Consumes the remainder of a failed statement: through the next top-level
/// `;` or balanced `{...}` block, whichever comes first.
fn skip_statement(src: &mut Source) {
    let mut depth = 0u32;
    loop {
        match src.current() {
            None => return,
            Some('"') | Some('\'') => {
                if consume_string_verbatim(src).is_err() {
                    return;
                }
            }
            Some('/') if src.peek_at(1) == Some('*') => {
                consume_comment_verbatim(src);
            }
            Some(';') if depth == 0 => {
                src.next();
                return;
            }
            Some('{') => {
                depth += 1;
                src.next();
            }
            Some('}') => {
                src.next();
                if depth <= 1 {
                    return;
                }
                depth -= 1;
            }
            Some(_) => {
                src.next();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scan(source: &str) -> Option<Raw> {
        let mut src = Source::new(source);
        let mut comments = Vec::new();
        src.collect_comments(&mut comments);
        scan_raw_selector(&mut src).unwrap()
    }

    #[test]
    fn raw_selector_is_verbatim_up_to_comma_or_brace() {
        assert_eq!(scan(".class1, .class2").unwrap().content, ".class1");
        assert_eq!(scan(".class1 + .class2 { color: red }").unwrap().content, ".class1 + .class2");
        assert_eq!(scan("div[class]").unwrap().content, "div[class]");
        assert_eq!(scan("p\n.class\n*#id").unwrap().content, "p\n.class\n*#id");
    }

    #[test]
    fn quotes_protect_structural_characters() {
        assert_eq!(scan("E[foo=\"b,ar\"], .class").unwrap().content, "E[foo=\"b,ar\"]");
        assert_eq!(scan("E[foo=\"b{a r\"]#id, #id").unwrap().content, "E[foo=\"b{a r\"]#id");
    }

    #[test]
    fn leading_comments_are_not_part_of_the_raw_content() {
        assert_eq!(scan("/*comment*/.class.class2").unwrap().content, ".class.class2");
    }

    #[test]
    fn invalid_selector_starts_are_rejected_without_advancing() {
        assert!(scan("{color: red}").is_none());
        assert!(scan("1234").is_none());
        assert!(scan("$class").is_none());
    }

    #[test]
    fn rule_positions_point_at_the_first_selector() {
        let mut tree = SyntaxTree::new();
        let mut src = Source::new("\n  .class1 { color: red }");
        let rule = parse_rule(&mut src, &mut tree, Vec::new()).unwrap().unwrap();
        let node = tree.node(rule);
        assert_eq!((node.line(), node.column()), (2, 3));
    }

    #[test]
    fn rule_collects_selectors_and_declarations() {
        let mut tree = SyntaxTree::new();
        let mut src = Source::new(".a, .b { color: red; margin: 0 }");
        let rule = parse_rule(&mut src, &mut tree, Vec::new()).unwrap().unwrap();

        assert_eq!(tree.child_ids(rule, Slot::Selectors).len(), 2);
        let declarations = tree.child_ids(rule, Slot::Declarations);
        assert_eq!(declarations.len(), 2);

        match tree.data(declarations[0]) {
            NodeData::Declaration(d) => {
                assert_eq!(d.raw_name.as_ref().unwrap().content, "color");
                assert_eq!(d.raw_value.as_ref().unwrap().content, "red");
            }
            _ => panic!("expected a declaration"),
        }
    }

    #[test]
    fn selector_comments_attach_to_the_selector() {
        let mut tree = SyntaxTree::new();
        let mut src = Source::new("/*comment1*/.class.class {color:red}");
        let rule = parse_rule(&mut src, &mut tree, Vec::new()).unwrap().unwrap();
        let selector = tree.first_child(rule, Slot::Selectors).unwrap();
        assert_eq!(tree.comments(selector), &["comment1".to_string()]);
    }

    #[test]
    fn empty_declarations_are_skipped() {
        let mut tree = SyntaxTree::new();
        let mut src = Source::new(".a { ;; color: red;; }");
        let rule = parse_rule(&mut src, &mut tree, Vec::new()).unwrap().unwrap();
        assert_eq!(tree.child_ids(rule, Slot::Declarations).len(), 1);
    }

    #[test]
    fn trailing_unterminated_declaration_is_accepted() {
        let mut tree = SyntaxTree::new();
        let mut src = Source::new(".a { color: red }");
        let rule = parse_rule(&mut src, &mut tree, Vec::new()).unwrap().unwrap();
        assert_eq!(tree.child_ids(rule, Slot::Declarations).len(), 1);
    }

    #[test]
    fn quoted_semicolons_do_not_split_declarations() {
        let mut tree = SyntaxTree::new();
        let mut src = Source::new(".a { content: \"a;b\"; color: red }");
        let rule = parse_rule(&mut src, &mut tree, Vec::new()).unwrap().unwrap();
        let declarations = tree.child_ids(rule, Slot::Declarations);
        assert_eq!(declarations.len(), 2);
        match tree.data(declarations[0]) {
            NodeData::Declaration(d) => {
                assert_eq!(d.raw_value.as_ref().unwrap().content, "\"a;b\"");
            }
            _ => panic!("expected a declaration"),
        }
    }

    #[test]
    fn missing_colon_is_an_error() {
        let mut tree = SyntaxTree::new();
        let mut src = Source::new(".a { color red }");
        let err = parse_rule(&mut src, &mut tree, Vec::new()).unwrap_err();
        assert_eq!(err.kind, ErrorKind::MissingColon);
    }

    #[test]
    fn missing_value_is_an_error() {
        let mut tree = SyntaxTree::new();
        let mut src = Source::new(".a { color: }");
        let err = parse_rule(&mut src, &mut tree, Vec::new()).unwrap_err();
        assert_eq!(err.kind, ErrorKind::MissingValue);
    }

    #[test]
    fn unclosed_block_is_an_error() {
        let mut tree = SyntaxTree::new();
        let mut src = Source::new(".a { color: red;");
        let err = parse_rule(&mut src, &mut tree, Vec::new()).unwrap_err();
        assert_eq!(err.kind, ErrorKind::UnclosedBlock);
    }

    #[test]
    fn comments_at_block_tail_become_rule_orphans() {
        let mut tree = SyntaxTree::new();
        let mut src = Source::new(".a { color: red; /*tail*/ }");
        let rule = parse_rule(&mut src, &mut tree, Vec::new()).unwrap().unwrap();
        let orphans = tree.child_ids(rule, Slot::Orphaned);
        assert_eq!(orphans.len(), 1);
        match tree.data(orphans[0]) {
            NodeData::OrphanedComment { content, location } => {
                assert_eq!(content, "tail");
                assert_eq!(*location, CommentLocation::Rule);
            }
            _ => panic!("expected an orphaned comment"),
        }
    }

    #[test]
    fn at_rule_with_expression_only() {
        let mut tree = SyntaxTree::new();
        let mut src = Source::new("@charset \"utf-8\";");
        let at_rule = parse_at_rule(&mut src, &mut tree).unwrap();
        match tree.data(at_rule) {
            NodeData::AtRule(d) => {
                assert_eq!(d.name, "charset");
                assert_eq!(d.raw_expression.as_ref().unwrap().content, "\"utf-8\"");
                assert!(d.raw_block.is_none());
            }
            _ => panic!("expected an at-rule"),
        }
        assert!(src.eof());
    }

    #[test]
    fn at_rule_with_expression_and_block() {
        let mut tree = SyntaxTree::new();
        let mut src = Source::new("@media all and (min-width: 800px) { .a { color: red } }");
        let at_rule = parse_at_rule(&mut src, &mut tree).unwrap();
        match tree.data(at_rule) {
            NodeData::AtRule(d) => {
                assert_eq!(d.raw_expression.as_ref().unwrap().content, "all and (min-width: 800px)");
                assert_eq!(d.raw_block.as_ref().unwrap().content, " .a { color: red } ");
            }
            _ => panic!("expected an at-rule"),
        }
    }

    #[test]
    fn at_rule_with_block_only() {
        let mut tree = SyntaxTree::new();
        let mut src = Source::new("@font-face { font-family: x }");
        let at_rule = parse_at_rule(&mut src, &mut tree).unwrap();
        match tree.data(at_rule) {
            NodeData::AtRule(d) => {
                assert!(d.raw_expression.is_none());
                assert!(d.raw_block.is_some());
            }
            _ => panic!("expected an at-rule"),
        }
    }

    #[test]
    fn unclosed_at_rule_block_is_an_error() {
        let mut tree = SyntaxTree::new();
        let mut src = Source::new("@media all { .a { }");
        let err = parse_at_rule(&mut src, &mut tree).unwrap_err();
        assert_eq!(err.kind, ErrorKind::UnclosedBlock);
    }
}
