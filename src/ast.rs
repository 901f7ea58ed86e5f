use anyhow::{Context, Result, anyhow, bail};
use tree_sitter::{Node, Parser, Tree};

use crate::util;

const FUNCTION_EXPRESSION_KINDS: &[&str] = &[
    "function_expression",
    "function",
    "generator_function",
    "arrow_function",
];

const FUNCTION_DECLARATION_KINDS: &[&str] =
    &["function_declaration", "generator_function_declaration"];

/// Parse JavaScript source, rejecting trees with syntax errors. The
/// rewriter works with byte-exact edits, so a partially recovered tree is
/// not safe to rewrite.
pub fn parse(src: &str) -> Result<Tree> {
    let mut parser = Parser::new();
    parser
        .set_language(&tree_sitter_javascript::LANGUAGE.into())
        .context("failed to load JavaScript grammar")?;
    let tree = parser
        .parse(src, None)
        .ok_or_else(|| anyhow!("parser returned no tree"))?;
    let root = tree.root_node();
    if root.has_error() {
        bail!(
            "couldn't process source due to a parse error near line {}",
            first_error_line(root, src)
        );
    }
    Ok(tree)
}

fn first_error_line(root: Node<'_>, src: &str) -> usize {
    let mut stack = vec![root];
    while let Some(node) = stack.pop() {
        if node.is_error() || node.is_missing() {
            return util::line_of(src, node.start_byte());
        }
        let mut cursor = node.walk();
        let children: Vec<Node> = node.children(&mut cursor).collect();
        drop(cursor);
        for child in children.into_iter().rev() {
            if child.has_error() {
                stack.push(child);
            }
        }
    }
    util::line_of(src, root.start_byte())
}

/// Exact source text covered by a node.
pub fn node_text<'s>(node: Node<'_>, src: &'s str) -> &'s str {
    node.utf8_text(src.as_bytes()).unwrap_or("")
}

/// Named children with comment nodes filtered out. Comments are extras in
/// the grammar and can appear between call arguments, object entries, and
/// statements alike.
pub fn children<'t>(node: Node<'t>) -> Vec<Node<'t>> {
    let mut cursor = node.walk();
    node.named_children(&mut cursor)
        .filter(|n| n.kind() != "comment")
        .collect()
}

/// Unwrap `(expr)` to `expr`, repeatedly.
pub fn skip_parens<'t>(mut node: Node<'t>) -> Node<'t> {
    while node.kind() == "parenthesized_expression" {
        let inner = node
            .child_by_field_name("expression")
            .or_else(|| children(node).into_iter().next());
        let Some(inner) = inner else { break };
        node = inner;
    }
    node
}

pub fn is_identifier_named(node: Node<'_>, src: &str, name: &str) -> bool {
    node.kind() == "identifier" && node_text(node, src) == name
}

pub fn is_function_expression(node: Node<'_>) -> bool {
    FUNCTION_EXPRESSION_KINDS.contains(&node.kind())
}

pub fn is_function_declaration(node: Node<'_>) -> bool {
    FUNCTION_DECLARATION_KINDS.contains(&node.kind())
}

pub fn is_function(node: Node<'_>) -> bool {
    is_function_expression(node) || is_function_declaration(node)
}

pub fn is_class(node: Node<'_>) -> bool {
    matches!(node.kind(), "class" | "class_declaration")
}

pub fn is_var_declaration(node: Node<'_>) -> bool {
    matches!(node.kind(), "variable_declaration" | "lexical_declaration")
}

/// Callee of a call expression; field name differs for `new` expressions.
pub fn call_callee<'t>(node: Node<'t>) -> Option<Node<'t>> {
    node.child_by_field_name("function")
        .or_else(|| node.child_by_field_name("constructor"))
}

pub fn call_arguments<'t>(node: Node<'t>) -> Vec<Node<'t>> {
    match node.child_by_field_name("arguments") {
        Some(args) => children(args),
        None => Vec::new(),
    }
}

/// Object and property of a non-computed member expression. Computed
/// access is a different node kind, so a `member_expression` is always the
/// `recv.name` form.
pub fn member_parts<'t>(node: Node<'t>) -> Option<(Node<'t>, Node<'t>)> {
    if node.kind() != "member_expression" {
        return None;
    }
    let object = node.child_by_field_name("object")?;
    let property = node.child_by_field_name("property")?;
    Some((object, property))
}

/// Inner text of a string literal, without the surrounding quotes.
pub fn string_value<'s>(node: Node<'_>, src: &'s str) -> Option<&'s str> {
    if node.kind() != "string" {
        return None;
    }
    Some(node_text(node, src).trim_matches(|c| c == '"' || c == '\''))
}

/// Value of the object entry whose key is `name`. Keys may be identifiers
/// or string literals.
pub fn object_property<'t>(object: Node<'t>, src: &str, name: &str) -> Option<Node<'t>> {
    if object.kind() != "object" {
        return None;
    }
    for entry in children(object) {
        if entry.kind() != "pair" {
            continue;
        }
        let Some(key) = entry.child_by_field_name("key") else {
            continue;
        };
        let found = match key.kind() {
            "property_identifier" => node_text(key, src) == name,
            "string" => string_value(key, src) == Some(name),
            _ => false,
        };
        if found {
            return entry.child_by_field_name("value");
        }
    }
    None
}

/// Declared parameter names of a function-like node, in declaration order.
/// `None` when a parameter is a rest or destructuring pattern with no
/// single name, which makes the node ineligible for annotation. Classes
/// report their constructor's parameters, or an empty list without one.
pub fn function_params(node: Node<'_>, src: &str) -> Option<Vec<String>> {
    match node.kind() {
        "arrow_function" => {
            if let Some(single) = node.child_by_field_name("parameter") {
                if single.kind() != "identifier" {
                    return None;
                }
                return Some(vec![node_text(single, src).to_string()]);
            }
            formal_params(node.child_by_field_name("parameters")?, src)
        }
        "class" | "class_declaration" => {
            let body = node.child_by_field_name("body")?;
            for entry in children(body) {
                if entry.kind() != "method_definition" {
                    continue;
                }
                let Some(name) = entry.child_by_field_name("name") else {
                    continue;
                };
                if node_text(name, src) == "constructor" {
                    return formal_params(entry.child_by_field_name("parameters")?, src);
                }
            }
            Some(Vec::new())
        }
        "method_definition" => formal_params(node.child_by_field_name("parameters")?, src),
        _ if is_function(node) => formal_params(node.child_by_field_name("parameters")?, src),
        _ => None,
    }
}

fn formal_params(params: Node<'_>, src: &str) -> Option<Vec<String>> {
    let mut out = Vec::new();
    for param in children(params) {
        match param.kind() {
            "identifier" => out.push(node_text(param, src).to_string()),
            "assignment_pattern" => {
                let left = param.child_by_field_name("left")?;
                if left.kind() != "identifier" {
                    return None;
                }
                out.push(node_text(left, src).to_string());
            }
            _ => return None,
        }
    }
    Some(out)
}

/// `["dep", "other", function(dep, other) {}]`, the inline annotation
/// form: a trailing function (or class) preceded only by string literals.
pub fn is_annotated_array(node: Node<'_>) -> bool {
    if node.kind() != "array" {
        return false;
    }
    let elements = children(node);
    let Some(last) = elements.last() else {
        return false;
    };
    let inner = skip_parens(*last);
    if !is_function_expression(inner) && inner.kind() != "class" {
        return false;
    }
    elements[..elements.len() - 1]
        .iter()
        .all(|n| n.kind() == "string")
}

/// Non-empty array whose elements are all string literals.
pub fn is_string_array(node: Node<'_>) -> bool {
    if node.kind() != "array" {
        return false;
    }
    let elements = children(node);
    !elements.is_empty() && elements.iter().all(|n| n.kind() == "string")
}

/// The expression carried by an expression statement.
pub fn statement_expression<'t>(node: Node<'t>) -> Option<Node<'t>> {
    if node.kind() != "expression_statement" {
        return None;
    }
    children(node).into_iter().next()
}

/// Next statement in the enclosing list, skipping interleaved comments.
pub fn next_statement<'t>(node: Node<'t>) -> Option<Node<'t>> {
    let mut next = node.next_named_sibling();
    while let Some(n) = next {
        if n.kind() != "comment" {
            return Some(n);
        }
        next = n.next_named_sibling();
    }
    None
}

/// A comment's byte range and its text without the `//` or `/* */`
/// delimiters.
#[derive(Debug, Clone)]
pub struct Comment {
    pub start: usize,
    pub end: usize,
    pub text: String,
}

/// All comments in the tree, in document order.
pub fn collect_comments(root: Node<'_>, src: &str) -> Vec<Comment> {
    fn visit(node: Node<'_>, src: &str, out: &mut Vec<Comment>) {
        if node.kind() == "comment" {
            let raw = node_text(node, src);
            let text = raw
                .strip_prefix("//")
                .or_else(|| raw.strip_prefix("/*").and_then(|s| s.strip_suffix("*/")))
                .unwrap_or(raw);
            out.push(Comment {
                start: node.start_byte(),
                end: node.end_byte(),
                text: text.to_string(),
            });
            return;
        }
        let mut cursor = node.walk();
        let children: Vec<Node> = node.named_children(&mut cursor).collect();
        drop(cursor);
        for child in children {
            visit(child, src, out);
        }
    }
    let mut out = Vec::new();
    visit(root, src, &mut out);
    out
}

/// Pre-order index of node start offsets. Used to resolve a free-floating
/// marker comment to the nearest node beginning at or after it; parents
/// precede children, so the outermost node at an offset wins.
pub struct NodeIndex<'t> {
    starts: Vec<(usize, Node<'t>)>,
}

impl<'t> NodeIndex<'t> {
    pub fn build(root: Node<'t>) -> Self {
        fn visit<'t>(node: Node<'t>, starts: &mut Vec<(usize, Node<'t>)>) {
            if node.kind() == "comment" {
                return;
            }
            starts.push((node.start_byte(), node));
            let mut cursor = node.walk();
            let children: Vec<Node<'t>> = node.named_children(&mut cursor).collect();
            drop(cursor);
            for child in children {
                visit(child, starts);
            }
        }
        let mut starts = Vec::new();
        visit(root, &mut starts);
        NodeIndex { starts }
    }

    pub fn node_at_or_after(&self, pos: usize) -> Option<Node<'t>> {
        let idx = self.starts.partition_point(|(start, _)| *start < pos);
        self.starts.get(idx).map(|(_, node)| *node)
    }
}
