//! Lowering from the tree-sitter-php parse tree into the arena.
//!
//! This is the only module that touches the tree-sitter API. Everything
//! downstream (rules, classifier, chain walker) works on `SyntaxTree`
//! exclusively, so the grammar surface is contained here.

use tree_sitter::{Language, Parser};

use super::{NodeId, NodeKind, Span, SyntaxTree, TreeBuilder};

/// Parse failure taxonomy. All variants cause the file to be skipped with
/// zero findings; none of them abort a multi-file run.
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("tree-sitter grammar error: {0}")]
    Grammar(String),
    #[error("failed to parse {0}")]
    Failed(String),
    #[error("source contains syntax errors: {0}")]
    Syntax(String),
}

/// Parse PHP source text and lower it into a `SyntaxTree`.
///
/// `path` is used for error reporting only; no filesystem access happens
/// here. Files with syntax errors are rejected outright rather than
/// analyzed partially.
pub fn parse_php(path: &str, source: &str) -> Result<SyntaxTree, ParseError> {
    let language: Language = tree_sitter_php::LANGUAGE_PHP.into();
    let mut parser = Parser::new();
    parser
        .set_language(&language)
        .map_err(|e| ParseError::Grammar(e.to_string()))?;

    let ts_tree = parser
        .parse(source, None)
        .ok_or_else(|| ParseError::Failed(path.to_string()))?;

    let root = ts_tree.root_node();
    if root.has_error() {
        return Err(ParseError::Syntax(path.to_string()));
    }

    let mut builder = TreeBuilder::new(path);
    let root_id = builder.push(None, NodeKind::Program, Span::from_ts(root), None);
    let src = source.as_bytes();
    lower_children(root, root_id, &mut builder, src);
    Ok(builder.finish(root_id))
}

fn text_of<'s>(node: tree_sitter::Node, src: &'s [u8]) -> &'s str {
    node.utf8_text(src).unwrap_or("")
}

fn field_text(node: tree_sitter::Node, field: &str, src: &[u8]) -> Option<String> {
    node.child_by_field_name(field)
        .map(|n| text_of(n, src).to_string())
}

/// Lower all named children of `ts` as children of `parent`.
fn lower_children(ts: tree_sitter::Node, parent: NodeId, b: &mut TreeBuilder, src: &[u8]) {
    for i in 0..ts.named_child_count() {
        if let Some(child) = ts.named_child(i) {
            lower_into(child, parent, b, src);
        }
    }
}

/// Like `lower_children` but skipping specific tree-sitter node ids
/// (used when a field was already captured as the node's text payload).
fn lower_children_except(
    ts: tree_sitter::Node,
    parent: NodeId,
    b: &mut TreeBuilder,
    src: &[u8],
    skip: &[Option<usize>],
) {
    for i in 0..ts.named_child_count() {
        if let Some(child) = ts.named_child(i) {
            if skip.contains(&Some(child.id())) {
                continue;
            }
            lower_into(child, parent, b, src);
        }
    }
}

fn lower_into(ts: tree_sitter::Node, parent: NodeId, b: &mut TreeBuilder, src: &[u8]) {
    let span = Span::from_ts(ts);
    match ts.kind() {
        // Trivia and HTML interleavings carry nothing for the rules.
        "comment" | "php_tag" | "text_interpolation" | "text" => {}

        // Parameter/property modifiers are noise at this level.
        "visibility_modifier" | "static_modifier" | "final_modifier" | "abstract_modifier"
        | "readonly_modifier" | "var_modifier" | "reference_modifier" => {}

        "namespace_definition" => {
            let name = field_text(ts, "name", src);
            let skip = ts.child_by_field_name("name").map(|n| n.id());
            let id = b.push(Some(parent), NodeKind::NamespaceDecl, span, name);
            lower_children_except(ts, id, b, src, &[skip]);
        }

        "namespace_use_declaration" => {
            // One UseDecl per clause; the declaration wrapper is transparent.
            for i in 0..ts.named_child_count() {
                if let Some(clause) = ts.named_child(i) {
                    if clause.kind() == "namespace_use_clause" {
                        lower_use_clause(clause, parent, b, src);
                    }
                }
            }
        }

        "class_declaration" => {
            let name = field_text(ts, "name", src);
            let skip = ts.child_by_field_name("name").map(|n| n.id());
            let id = b.push(Some(parent), NodeKind::ClassDecl, span, name);
            lower_children_except(ts, id, b, src, &[skip]);
        }
        "interface_declaration" => {
            let name = field_text(ts, "name", src);
            let skip = ts.child_by_field_name("name").map(|n| n.id());
            let id = b.push(Some(parent), NodeKind::InterfaceDecl, span, name);
            lower_children_except(ts, id, b, src, &[skip]);
        }
        "trait_declaration" => {
            let name = field_text(ts, "name", src);
            let skip = ts.child_by_field_name("name").map(|n| n.id());
            let id = b.push(Some(parent), NodeKind::TraitDecl, span, name);
            lower_children_except(ts, id, b, src, &[skip]);
        }
        "base_clause" => {
            let id = b.push(Some(parent), NodeKind::BaseClause, span, None);
            lower_children(ts, id, b, src);
        }

        "method_declaration" => {
            let name = field_text(ts, "name", src);
            let skip = ts.child_by_field_name("name").map(|n| n.id());
            let id = b.push(Some(parent), NodeKind::MethodDecl, span, name);
            lower_children_except(ts, id, b, src, &[skip]);
        }
        "function_definition" => {
            let name = field_text(ts, "name", src);
            let skip = ts.child_by_field_name("name").map(|n| n.id());
            let id = b.push(Some(parent), NodeKind::FunctionDecl, span, name);
            lower_children_except(ts, id, b, src, &[skip]);
        }
        "anonymous_function" | "anonymous_function_creation_expression" => {
            let id = b.push(Some(parent), NodeKind::Closure, span, None);
            lower_children(ts, id, b, src);
        }
        "arrow_function" => {
            let id = b.push(Some(parent), NodeKind::ArrowFunction, span, None);
            lower_children(ts, id, b, src);
        }

        "property_declaration" => {
            for i in 0..ts.named_child_count() {
                if let Some(elem) = ts.named_child(i) {
                    if elem.kind() == "property_element" {
                        lower_property_element(elem, parent, b, src);
                    }
                }
            }
        }
        "const_declaration" => {
            let id = b.push(Some(parent), NodeKind::ConstDecl, span, None);
            lower_children(ts, id, b, src);
        }

        "compound_statement" | "declaration_list" => {
            let id = b.push(Some(parent), NodeKind::Block, span, None);
            lower_children(ts, id, b, src);
        }

        "if_statement" | "else_if_clause" => {
            let id = b.push(Some(parent), NodeKind::If, span, None);
            lower_children(ts, id, b, src);
        }
        "foreach_statement" | "for_statement" | "while_statement" | "do_statement" => {
            let id = b.push(Some(parent), NodeKind::Loop, span, None);
            lower_children(ts, id, b, src);
        }
        "switch_statement" | "match_expression" => {
            let id = b.push(Some(parent), NodeKind::Switch, span, None);
            lower_children(ts, id, b, src);
        }
        "case_statement" | "default_statement" | "match_conditional_expression"
        | "match_default_expression" => {
            let id = b.push(Some(parent), NodeKind::Case, span, None);
            lower_children(ts, id, b, src);
        }
        "conditional_expression" => {
            let id = b.push(Some(parent), NodeKind::Ternary, span, None);
            lower_children(ts, id, b, src);
        }

        "try_statement" => {
            let id = b.push(Some(parent), NodeKind::Try, span, None);
            lower_children(ts, id, b, src);
        }
        "catch_clause" => {
            let id = b.push(Some(parent), NodeKind::Catch, span, None);
            lower_children(ts, id, b, src);
        }
        "finally_clause" => {
            let id = b.push(Some(parent), NodeKind::Finally, span, None);
            lower_children(ts, id, b, src);
        }
        "throw_statement" | "throw_expression" => {
            let id = b.push(Some(parent), NodeKind::Throw, span, None);
            lower_children(ts, id, b, src);
        }
        "return_statement" => {
            let id = b.push(Some(parent), NodeKind::Return, span, None);
            lower_children(ts, id, b, src);
        }
        "echo_statement" => {
            let id = b.push(Some(parent), NodeKind::Echo, span, None);
            lower_children(ts, id, b, src);
        }
        "expression_statement" => {
            let id = b.push(Some(parent), NodeKind::ExpressionStatement, span, None);
            lower_children(ts, id, b, src);
        }

        "assignment_expression" | "augmented_assignment_expression" => {
            let id = b.push(Some(parent), NodeKind::Assignment, span, None);
            lower_children(ts, id, b, src);
        }
        "binary_expression" => {
            let op = ts
                .child_by_field_name("operator")
                .map(|n| text_of(n, src).to_string());
            let id = b.push(Some(parent), NodeKind::BinaryOp, span, op);
            lower_children(ts, id, b, src);
        }
        "unary_op_expression" | "cast_expression" => {
            let id = b.push(Some(parent), NodeKind::UnaryOp, span, None);
            lower_children(ts, id, b, src);
        }
        "parenthesized_expression" => {
            let id = b.push(Some(parent), NodeKind::Parenthesized, span, None);
            lower_children(ts, id, b, src);
        }

        "member_call_expression" | "nullsafe_member_call_expression" => {
            let name_node = ts.child_by_field_name("name").filter(|n| n.kind() == "name");
            let name = name_node.map(|n| text_of(n, src).to_string());
            // Anchor the node at the method name so findings point at the
            // call, not at the start of the whole receiver chain.
            let span = name_node.map(Span::from_ts).unwrap_or(span);
            let id = b.push(Some(parent), NodeKind::MethodCall, span, name);
            if let Some(obj) = ts.child_by_field_name("object") {
                lower_into(obj, id, b, src);
            }
            if let Some(args) = ts.child_by_field_name("arguments") {
                lower_into(args, id, b, src);
            }
        }
        "scoped_call_expression" => {
            let name_node = ts.child_by_field_name("name").filter(|n| n.kind() == "name");
            let name = name_node.map(|n| text_of(n, src).to_string());
            let span = name_node.map(Span::from_ts).unwrap_or(span);
            let id = b.push(Some(parent), NodeKind::StaticCall, span, name);
            if let Some(scope) = ts.child_by_field_name("scope") {
                lower_into(scope, id, b, src);
            }
            if let Some(args) = ts.child_by_field_name("arguments") {
                lower_into(args, id, b, src);
            }
        }
        "function_call_expression" => {
            let func = ts.child_by_field_name("function");
            let name = func
                .filter(|n| matches!(n.kind(), "name" | "qualified_name"))
                .map(|n| text_of(n, src).to_string());
            let id = b.push(Some(parent), NodeKind::FunctionCall, span, name.clone());
            if name.is_none() {
                // Dynamic callee: keep the expression as the first child.
                if let Some(f) = func {
                    lower_into(f, id, b, src);
                }
            }
            if let Some(args) = ts.child_by_field_name("arguments") {
                lower_into(args, id, b, src);
            }
        }
        "member_access_expression" | "nullsafe_member_access_expression" => {
            let name = ts
                .child_by_field_name("name")
                .filter(|n| n.kind() == "name")
                .map(|n| text_of(n, src).to_string());
            let id = b.push(Some(parent), NodeKind::PropertyAccess, span, name);
            if let Some(obj) = ts.child_by_field_name("object") {
                lower_into(obj, id, b, src);
            }
        }
        "scoped_property_access_expression" => {
            let name = field_text(ts, "name", src);
            let id = b.push(Some(parent), NodeKind::StaticPropertyAccess, span, name);
            if let Some(scope) = ts.child_by_field_name("scope") {
                lower_into(scope, id, b, src);
            }
        }

        "variable_name" => {
            let raw = text_of(ts, src);
            let name = raw.trim_start_matches('$').to_string();
            b.push(Some(parent), NodeKind::Variable, span, Some(name));
        }
        "name" | "qualified_name" => {
            b.push(
                Some(parent),
                NodeKind::NameRef,
                span,
                Some(text_of(ts, src).to_string()),
            );
        }

        "arguments" => {
            let id = b.push(Some(parent), NodeKind::ArgumentList, span, None);
            lower_children(ts, id, b, src);
        }
        "argument" => {
            let id = b.push(Some(parent), NodeKind::Argument, span, None);
            lower_children(ts, id, b, src);
        }

        "array_creation_expression" | "list_literal" => {
            let id = b.push(Some(parent), NodeKind::ArrayLiteral, span, None);
            lower_children(ts, id, b, src);
        }
        "string" | "encapsed_string" => {
            let raw = text_of(ts, src);
            let content = raw.trim_matches(|c| c == '"' || c == '\'').to_string();
            b.push(Some(parent), NodeKind::StringLiteral, span, Some(content));
        }
        "heredoc" | "nowdoc" => {
            b.push(
                Some(parent),
                NodeKind::StringLiteral,
                span,
                Some(text_of(ts, src).to_string()),
            );
        }
        "integer" => {
            b.push(
                Some(parent),
                NodeKind::IntLiteral,
                span,
                Some(text_of(ts, src).to_string()),
            );
        }
        "float" => {
            b.push(
                Some(parent),
                NodeKind::FloatLiteral,
                span,
                Some(text_of(ts, src).to_string()),
            );
        }
        "boolean" => {
            b.push(
                Some(parent),
                NodeKind::BoolLiteral,
                span,
                Some(text_of(ts, src).to_lowercase()),
            );
        }
        "null" => {
            b.push(Some(parent), NodeKind::NullLiteral, span, None);
        }

        // Anything else keeps its span and children but no dedicated kind.
        _ => {
            let id = b.push(Some(parent), NodeKind::Other, span, None);
            lower_children(ts, id, b, src);
        }
    }
}

fn lower_use_clause(clause: tree_sitter::Node, parent: NodeId, b: &mut TreeBuilder, src: &[u8]) {
    let mut imported: Option<String> = None;
    let mut alias: Option<(String, Span)> = None;

    for i in 0..clause.named_child_count() {
        if let Some(child) = clause.named_child(i) {
            match child.kind() {
                "name" | "qualified_name" => {
                    if imported.is_none() {
                        imported = Some(text_of(child, src).to_string());
                    }
                }
                "namespace_aliasing_clause" => {
                    for j in 0..child.named_child_count() {
                        if let Some(alias_name) = child.named_child(j) {
                            if alias_name.kind() == "name" {
                                alias = Some((
                                    text_of(alias_name, src).to_string(),
                                    Span::from_ts(alias_name),
                                ));
                            }
                        }
                    }
                }
                _ => {}
            }
        }
    }

    if let Some(name) = imported {
        let id = b.push(Some(parent), NodeKind::UseDecl, Span::from_ts(clause), Some(name));
        if let Some((alias_name, alias_span)) = alias {
            b.push(Some(id), NodeKind::UseAlias, alias_span, Some(alias_name));
        }
    }
}

fn lower_property_element(elem: tree_sitter::Node, parent: NodeId, b: &mut TreeBuilder, src: &[u8]) {
    let mut name: Option<String> = None;
    let mut value: Option<tree_sitter::Node> = None;

    for i in 0..elem.named_child_count() {
        if let Some(child) = elem.named_child(i) {
            if child.kind() == "variable_name" && name.is_none() {
                name = Some(text_of(child, src).trim_start_matches('$').to_string());
            } else {
                value = Some(child);
            }
        }
    }

    let id = b.push(Some(parent), NodeKind::PropertyDecl, Span::from_ts(elem), name);
    if let Some(v) = value {
        lower_into(v, id, b, src);
    }
}
