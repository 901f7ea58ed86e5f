//! Explicit annotation markers: `/*@ngInject*/` and `/*@ngNoInject*/`
//! comments, `"ngInject"` prologue directives, and the `ngInject(fn)` /
//! `ngNoInject(fn)` wrapper calls. Markers force or suppress annotation
//! regardless of module context.

use tree_sitter::Node;

use crate::annotate::Ctx;
use crate::ast;
use crate::resolve::{Chain, Limit};

/// Nearest marker comment directly above `node`, separated only by
/// whitespace and other comments. `Some(true)` forces annotation,
/// `Some(false)` suppresses it. Only comments that are exactly the marker,
/// modulo surrounding whitespace, count here.
pub fn leading_annotation(ctx: &Ctx<'_>, node: Node<'_>) -> Option<bool> {
    let mut boundary = node.start_byte();
    for comment in ctx.comments.iter().rev() {
        if comment.end > boundary {
            continue;
        }
        if ctx.src[comment.end..boundary]
            .chars()
            .any(|c| !c.is_whitespace())
        {
            break;
        }
        match comment.text.trim() {
            "@ngInject" => return Some(true),
            "@ngNoInject" => return Some(false),
            _ => boundary = comment.start,
        }
    }
    None
}

/// First `"ngInject"` or `"ngNoInject"` directive in the prologue of a
/// function body. The prologue ends at the first statement that is not a
/// string expression statement.
fn prologue_directive(ctx: &Ctx<'_>, node: Node<'_>) -> Option<&'static str> {
    let body = node.child_by_field_name("body")?;
    if body.kind() != "statement_block" {
        return None;
    }
    for statement in ast::children(body) {
        let Some(expr) = ast::statement_expression(statement) else {
            return None;
        };
        if expr.kind() != "string" {
            return None;
        }
        match ast::string_value(expr, ctx.src) {
            Some("ngInject") => return Some("ngInject"),
            Some("ngNoInject") => return Some("ngNoInject"),
            _ => {}
        }
    }
    None
}

/// Sweep over all comments, catching markers embedded in larger comments
/// such as jsdoc blocks. The target is the nearest node starting at or
/// after the comment; a marker with nothing after it is ignored.
pub fn inspect_comments(ctx: &mut Ctx<'_>) {
    let mut marks = Vec::new();
    for comment in &ctx.comments {
        let block = if comment.text.contains("@ngInject") {
            false
        } else if comment.text.contains("@ngNoInject") {
            true
        } else {
            continue;
        };
        marks.push((comment.end, block));
    }
    for (end, block) in marks {
        let Some(target) = ctx.starts.node_at_or_after(end) else {
            continue;
        };
        add_suspect(ctx, target, block);
    }
}

pub fn inspect_call_expression<'t>(ctx: &mut Ctx<'t>, node: Node<'t>) {
    if let Some(yes) = leading_annotation(ctx, node) {
        add_suspect(ctx, node, !yes);
        return;
    }
    let Some(callee) = ast::call_callee(node) else {
        return;
    };
    if callee.kind() != "identifier" {
        return;
    }
    let name = ast::node_text(callee, ctx.src);
    if name != "ngInject" && name != "ngNoInject" {
        return;
    }
    let args = ast::call_arguments(node);
    if args.len() != 1 {
        return;
    }
    add_suspect(ctx, ast::skip_parens(args[0]), name == "ngNoInject");
}

pub fn inspect_function<'t>(ctx: &mut Ctx<'t>, node: Node<'t>) {
    if let Some(yes) = leading_annotation(ctx, node) {
        add_suspect(ctx, node, !yes);
        return;
    }

    let declarator = node.parent().filter(|p| {
        p.kind() == "variable_declarator"
            && p.child_by_field_name("value") == Some(node)
            && p.parent().is_some_and(ast::is_var_declaration)
    });
    if let Some(declarator) = declarator {
        if let Some(yes) = leading_annotation(ctx, declarator) {
            add_suspect(ctx, declarator, !yes);
            return;
        }
        if let Some(declaration) = declarator.parent() {
            if let Some(yes) = leading_annotation(ctx, declaration) {
                add_suspect(ctx, declaration, !yes);
                return;
            }
        }
    }

    let Some(directive) = prologue_directive(ctx, node) else {
        return;
    };
    let block = directive == "ngNoInject";
    if ast::is_function_declaration(node) {
        add_suspect(ctx, node, block);
        return;
    }
    if let Some(declarator) = declarator {
        add_suspect(ctx, declarator, block);
        return;
    }
    match node.parent() {
        Some(parent) if ast::is_annotated_array(parent) => add_suspect(ctx, parent, block),
        _ => add_suspect(ctx, node, block),
    }
}

/// Class methods: a marker on the constructor, or a directive in its
/// prologue, annotates the enclosing class. A marked named method gets an
/// `$inject` statement of its own after the class.
pub fn inspect_method<'t>(ctx: &mut Ctx<'t>, node: Node<'t>) {
    let marked = leading_annotation(ctx, node)
        .map(|yes| !yes)
        .or_else(|| prologue_directive(ctx, node).map(|d| d == "ngNoInject"));
    let Some(block) = marked else {
        return;
    };
    let Some(name) = node.child_by_field_name("name") else {
        return;
    };
    if ast::node_text(name, ctx.src) == "constructor" {
        let Some(class) = node.parent().and_then(|body| body.parent()) else {
            return;
        };
        if !ast::is_class(class) {
            return;
        }
        add_suspect(ctx, class, block);
        return;
    }
    add_suspect(ctx, node, block);
}

/// `/*@ngInject*/ {..}` annotates every function-valued property of the
/// object, recursively. The marker may sit on the object itself or on an
/// enclosing assignment, statement, or declaration.
pub fn inspect_object_literal<'t>(ctx: &mut Ctx<'t>, node: Node<'t>) {
    let mut candidates = Vec::new();
    if let Some(parent) = node.parent() {
        match parent.kind() {
            "assignment_expression" => {
                if let Some(gp) = parent.parent() {
                    if gp.kind() == "expression_statement" {
                        candidates.push(gp);
                    }
                }
                candidates.push(parent);
            }
            "variable_declarator" => {
                if let Some(gp) = parent.parent() {
                    if ast::is_var_declaration(gp) {
                        candidates.push(gp);
                    }
                }
            }
            _ => {}
        }
    }
    candidates.push(node);
    for candidate in candidates {
        if let Some(yes) = leading_annotation(ctx, candidate) {
            add_suspect(ctx, node, !yes);
            return;
        }
    }
}

pub fn inspect_assignment<'t>(ctx: &mut Ctx<'t>, node: Node<'t>) {
    let Some(rhs) = node.child_by_field_name("right") else {
        return;
    };
    let rhs = ast::skip_parens(rhs);
    if !ast::is_function_expression(rhs) && !ast::is_class(rhs) {
        return;
    }
    let mut candidates = Vec::new();
    if let Some(parent) = node.parent() {
        if parent.kind() == "expression_statement" {
            candidates.push(parent);
        }
    }
    candidates.push(node);
    for candidate in candidates {
        if let Some(yes) = leading_annotation(ctx, candidate) {
            add_suspect(ctx, node, !yes);
            return;
        }
    }
}

/// Route a marked node to the thing that actually gets annotated, then
/// record it as a suspect (or block it). Marker suspects carry module
/// context by fiat and are exempt from method-name constraints.
pub fn add_suspect<'t>(ctx: &mut Ctx<'t>, target: Node<'t>, block: bool) {
    // a marker above `name.$inject = [..]` belongs to the function in the
    // next statement
    if let Some(expr) = ast::statement_expression(target) {
        if expr.kind() == "assignment_expression"
            && expr
                .child_by_field_name("right")
                .is_some_and(ast::is_string_array)
        {
            if let Some(next) = ast::next_statement(target) {
                add_suspect(ctx, next, block);
                return;
            }
        }
    }

    if target.kind() == "object" {
        add_object_values(ctx, target, block);
        return;
    }
    if target.kind() == "assignment_expression" {
        if let Some(rhs) = target.child_by_field_name("right") {
            if rhs.kind() == "object" {
                add_object_values(ctx, rhs, block);
                return;
            }
        }
    }
    if let Some(expr) = ast::statement_expression(target) {
        if expr.kind() == "assignment_expression" {
            if let Some(rhs) = expr.child_by_field_name("right") {
                if rhs.kind() == "object" {
                    add_object_values(ctx, rhs, block);
                    return;
                }
            }
        }
    }
    if ast::is_var_declaration(target) {
        let declarators: Vec<Node> = ast::children(target)
            .into_iter()
            .filter(|n| n.kind() == "variable_declarator")
            .collect();
        if declarators.len() == 1 {
            if let Some(init) = declarators[0].child_by_field_name("value") {
                if init.kind() == "object" {
                    add_object_values(ctx, init, block);
                    return;
                }
            }
        }
    }
    if target.kind() == "pair" {
        if let Some(value) = target.child_by_field_name("value") {
            add_independent(ctx, value, block);
        }
        return;
    }
    let routed = routed_binding(target).unwrap_or(target);
    add_independent(ctx, routed, block);
}

/// A function or class expression bound by a variable declarator is
/// annotated through the declarator, so every detection site converges on
/// the same suspect node and the binding keeps its name.
fn routed_binding<'t>(node: Node<'t>) -> Option<Node<'t>> {
    if !ast::is_function_expression(node) && node.kind() != "class" {
        return None;
    }
    node.parent().filter(|p| {
        p.kind() == "variable_declarator"
            && p.child_by_field_name("value") == Some(node)
            && p.parent().is_some_and(ast::is_var_declaration)
    })
}

fn add_object_values<'t>(ctx: &mut Ctx<'t>, object: Node<'t>, block: bool) {
    let mut values = Vec::new();
    collect_object_values(object, &mut values);
    for value in values {
        add_independent(ctx, value, block);
    }
}

fn collect_object_values<'t>(object: Node<'t>, out: &mut Vec<Node<'t>>) {
    for entry in ast::children(object) {
        if entry.kind() != "pair" {
            continue;
        }
        let Some(value) = entry.child_by_field_name("value") else {
            continue;
        };
        let value = ast::skip_parens(value);
        if ast::is_function_expression(value) || ast::is_class(value) || value.kind() == "array" {
            out.push(value);
        } else if value.kind() == "object" {
            collect_object_values(value, out);
        }
    }
}

fn add_independent<'t>(ctx: &mut Ctx<'t>, node: Node<'t>, block: bool) {
    ctx.tags.set_limit(node.id(), Limit::Never);
    if block {
        ctx.blocked.insert(node.id());
    } else {
        ctx.tags.set_chain(node.id(), Chain::Module);
        ctx.suspects.push(node);
    }
}
