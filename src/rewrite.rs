//! Edit emission for finals: inline annotation arrays are built, rebuilt
//! or removed in place; named functions, classes and assignments get a
//! `name.$inject = [..]` statement after their binding statement.

use std::collections::HashSet;

use anyhow::{Result, bail};
use tree_sitter::Node;

use crate::annotate::{Ctx, Mode};
use crate::ast;
use crate::fragments::Fragment;
use crate::resolve;
use crate::util;

/// Emit the edit (if any) for one final target, according to mode.
pub fn emit<'t>(ctx: &mut Ctx<'t>, target: Node<'t>) -> Result<()> {
    match ctx.mode {
        Mode::Rebuild if ast::is_annotated_array(target) => rebuild_array(ctx, target),
        Mode::Remove if ast::is_annotated_array(target) => remove_array(ctx, target),
        Mode::Add | Mode::Rebuild if is_injectable_expression(ctx, target) => {
            wrap_in_array(ctx, target)
        }
        _ if target.kind() == "string" && ctx.renaming => rename_string(ctx, target),
        _ => emit_inject_statement(ctx, target)?,
    }
    Ok(())
}

/// A function expression or class expression whose parameters can be
/// spelled out. Declarations are handled through `$inject` statements.
fn is_injectable_expression(ctx: &Ctx<'_>, node: Node<'_>) -> bool {
    if !ast::is_function_expression(node) && node.kind() != "class" {
        return false;
    }
    ast::function_params(node, ctx.src).is_some_and(|p| !p.is_empty())
}

/// `["dep", fn]` with stale strings: replace everything before the
/// function with a fresh parameter list.
fn rebuild_array<'t>(ctx: &mut Ctx<'t>, array: Node<'t>) {
    let elements = ast::children(array);
    let Some(&last) = elements.last() else {
        return;
    };
    let func = ast::skip_parens(last);
    let Some(params) = ast::function_params(func, ctx.src) else {
        return;
    };
    if params.is_empty() {
        remove_array(ctx, array);
        return;
    }
    let mut text = stringify(ctx, &params);
    text.pop();
    text.push_str(", ");
    ctx.fragments.push(Fragment {
        start: array.start_byte(),
        end: last.start_byte(),
        text,
    });
}

/// `["dep", fn]` becomes `fn`.
fn remove_array<'t>(ctx: &mut Ctx<'t>, array: Node<'t>) {
    let elements = ast::children(array);
    let Some(&last) = elements.last() else {
        return;
    };
    ctx.fragments.push(Fragment {
        start: array.start_byte(),
        end: last.start_byte(),
        text: String::new(),
    });
    ctx.fragments.push(Fragment {
        start: last.end_byte(),
        end: array.end_byte(),
        text: String::new(),
    });
}

/// `fn` becomes `["dep", fn]`.
fn wrap_in_array<'t>(ctx: &mut Ctx<'t>, func: Node<'t>) {
    let Some(params) = ast::function_params(func, ctx.src) else {
        return;
    };
    let mut prefix = stringify(ctx, &params);
    prefix.pop();
    prefix.push_str(", ");
    ctx.fragments.push(Fragment {
        start: func.start_byte(),
        end: func.start_byte(),
        text: prefix,
    });
    ctx.fragments.push(Fragment {
        start: func.end_byte(),
        end: func.end_byte(),
        text: "]".to_string(),
    });
}

/// Provider name literal at a declaration site, under --rename.
fn rename_string<'t>(ctx: &mut Ctx<'t>, node: Node<'t>) {
    let src = ctx.src;
    let Some(value) = ast::string_value(node, src) else {
        return;
    };
    let Some(renamed) = ctx.rename.get(value) else {
        return;
    };
    if renamed == value {
        return;
    }
    let text = renamed.clone();
    ctx.fragments.push(Fragment {
        start: node.start_byte() + 1,
        end: node.end_byte() - 1,
        text,
    });
}

struct InjectSite<'t> {
    name: String,
    params: Vec<String>,
    anchor: Node<'t>,
}

/// Resolve a non-array, non-expression final to a named binding and emit
/// the `name.$inject = [..]` statement for it. Follows references and
/// descends through declarations; gives up silently on shapes that have
/// no single name.
fn emit_inject_statement<'t>(ctx: &mut Ctx<'t>, target: Node<'t>) -> Result<()> {
    let src = ctx.src;
    let mut visited: HashSet<usize> = HashSet::new();
    let mut node = target;

    let site = loop {
        if !visited.insert(node.id()) {
            return Ok(());
        }
        match node.kind() {
            "variable_declaration" | "lexical_declaration" => {
                let declarators: Vec<Node<'t>> = ast::children(node)
                    .into_iter()
                    .filter(|n| n.kind() == "variable_declarator")
                    .collect();
                if declarators.len() != 1 {
                    return Ok(());
                }
                node = declarators[0];
            }
            "export_statement" => {
                let Some(decl) = node.child_by_field_name("declaration") else {
                    return Ok(());
                };
                node = decl;
            }
            "variable_declarator" => {
                let Some(name) = node.child_by_field_name("name") else {
                    return Ok(());
                };
                if name.kind() != "identifier" {
                    return Ok(());
                }
                let Some(init) = node.child_by_field_name("value") else {
                    return Ok(());
                };
                let init = ast::skip_parens(init);
                if ast::is_function_expression(init) || init.kind() == "class" {
                    let Some(params) = ast::function_params(init, src) else {
                        return Ok(());
                    };
                    let Some(declaration) = node.parent() else {
                        return Ok(());
                    };
                    break InjectSite {
                        name: ast::node_text(name, src).to_string(),
                        params,
                        anchor: through_export(declaration),
                    };
                }
                match resolve::follow_reference(ctx, init, true) {
                    Some(followed) => node = followed,
                    None => return Ok(()),
                }
            }
            "function_declaration" | "generator_function_declaration" | "class_declaration" => {
                let Some(name) = node.child_by_field_name("name") else {
                    return Ok(());
                };
                let Some(params) = ast::function_params(node, src) else {
                    return Ok(());
                };
                break InjectSite {
                    name: ast::node_text(name, src).to_string(),
                    params,
                    anchor: through_export(node),
                };
            }
            "method_definition" => {
                let Some(name) = node.child_by_field_name("name") else {
                    return Ok(());
                };
                if name.kind() != "property_identifier" {
                    return Ok(());
                }
                let Some(class) = node.parent().and_then(|body| body.parent()) else {
                    return Ok(());
                };
                if !ast::is_class(class) {
                    return Ok(());
                }
                let method = ast::node_text(name, src);
                if method != "constructor" {
                    let Some(site) = method_inject_site(src, node, method, class) else {
                        return Ok(());
                    };
                    break site;
                }
                node = class;
            }
            "class" => {
                let Some(declarator) = node.parent().filter(|p| {
                    p.kind() == "variable_declarator"
                        && p.parent().is_some_and(ast::is_var_declaration)
                }) else {
                    return Ok(());
                };
                node = declarator;
            }
            "expression_statement" => {
                let Some(expr) = ast::statement_expression(node) else {
                    return Ok(());
                };
                if expr.kind() != "assignment_expression" {
                    return Ok(());
                }
                let Some(left) = expr.child_by_field_name("left") else {
                    return Ok(());
                };
                let Some(right) = expr.child_by_field_name("right") else {
                    return Ok(());
                };
                let right = ast::skip_parens(right);
                if !ast::is_function_expression(right) && right.kind() != "class" {
                    return Ok(());
                }
                let Some(params) = ast::function_params(right, src) else {
                    return Ok(());
                };
                break InjectSite {
                    name: ast::node_text(left, src).to_string(),
                    params,
                    anchor: node,
                };
            }
            "assignment_expression" => {
                let Some(parent) = node.parent().filter(|p| p.kind() == "expression_statement")
                else {
                    return Ok(());
                };
                node = parent;
            }
            "identifier" => match resolve::follow_reference(ctx, node, true) {
                Some(followed) => node = followed,
                None => return Ok(()),
            },
            _ => return Ok(()),
        }
    };

    if site.params.is_empty() {
        return Ok(());
    }
    let Some(parent) = site.anchor.parent() else {
        return Ok(());
    };
    if !matches!(parent.kind(), "program" | "statement_block") {
        return Ok(());
    }

    // an existing statement for the same name is recycled; two of them is
    // an error we cannot resolve
    let mut existing: Option<Node<'t>> = None;
    for statement in ast::children(parent) {
        if !is_inject_statement(statement, src, &site.name) {
            continue;
        }
        if let Some(first) = existing {
            bail!(
                "conflicting inject arrays at line {} and {}",
                util::line_of(src, first.start_byte()),
                util::line_of(src, statement.start_byte())
            );
        }
        existing = Some(statement);
    }

    let rendered = stringify(ctx, &site.params);
    match (ctx.mode, existing) {
        (Mode::Rebuild, Some(statement)) => {
            ctx.fragments.push(Fragment {
                start: statement.start_byte(),
                end: statement.end_byte(),
                text: format!("{}.$inject = {};", site.name, rendered),
            });
        }
        (Mode::Remove, Some(statement)) => {
            ctx.fragments.push(Fragment {
                start: util::skip_prev_newline(src, statement.start_byte()),
                end: statement.end_byte(),
                text: String::new(),
            });
        }
        (Mode::Add, None) | (Mode::Rebuild, None) => {
            let pos = site.anchor.end_byte();
            let indent = util::line_indent(src, site.anchor.start_byte());
            ctx.fragments.push(Fragment {
                start: pos,
                end: pos,
                text: format!("{}{}{}.$inject = {};", ctx.eol, indent, site.name, rendered),
            });
        }
        _ => {}
    }
    Ok(())
}

fn through_export<'t>(node: Node<'t>) -> Node<'t> {
    match node.parent() {
        Some(parent) if parent.kind() == "export_statement" => parent,
        _ => node,
    }
}

/// `Klass.method.$inject` for a static method, `Klass.prototype.method.$inject`
/// for an instance method, anchored after the class statement.
fn method_inject_site<'t>(
    src: &'t str,
    method: Node<'t>,
    method_name: &str,
    class: Node<'t>,
) -> Option<InjectSite<'t>> {
    let params = ast::function_params(method, src)?;
    let (class_name, anchor) = match class.kind() {
        "class_declaration" => {
            let name = class.child_by_field_name("name")?;
            (ast::node_text(name, src), through_export(class))
        }
        "class" => {
            let declarator = class.parent().filter(|p| {
                p.kind() == "variable_declarator"
                    && p.parent().is_some_and(ast::is_var_declaration)
            })?;
            let name = declarator.child_by_field_name("name")?;
            if name.kind() != "identifier" {
                return None;
            }
            (ast::node_text(name, src), through_export(declarator.parent()?))
        }
        _ => return None,
    };
    let receiver = if is_static_method(method) {
        class_name.to_string()
    } else {
        format!("{class_name}.prototype")
    };
    Some(InjectSite {
        name: format!("{receiver}.{method_name}"),
        params,
        anchor,
    })
}

fn is_static_method(method: Node<'_>) -> bool {
    (0..method.child_count()).any(|i| method.child(i).is_some_and(|c| c.kind() == "static"))
}

/// `name.$inject = ..` or `name["$inject"] = ..`, where `name` is matched
/// by source text so member chains like `a.b` work.
fn is_inject_statement(node: Node<'_>, src: &str, name: &str) -> bool {
    let Some(expr) = ast::statement_expression(node) else {
        return false;
    };
    if expr.kind() != "assignment_expression" {
        return false;
    }
    let Some(left) = expr.child_by_field_name("left") else {
        return false;
    };
    match left.kind() {
        "member_expression" => {
            let Some((obj, prop)) = ast::member_parts(left) else {
                return false;
            };
            ast::node_text(obj, src) == name && ast::node_text(prop, src) == "$inject"
        }
        "subscript_expression" => {
            let Some(obj) = left.child_by_field_name("object") else {
                return false;
            };
            let Some(index) = left.child_by_field_name("index") else {
                return false;
            };
            ast::node_text(obj, src) == name && ast::string_value(index, src) == Some("$inject")
        }
        _ => false,
    }
}

/// Render a parameter list as a dependency array, applying renames.
fn stringify(ctx: &Ctx<'_>, params: &[String]) -> String {
    let quote = ctx.quote;
    let parts: Vec<String> = params
        .iter()
        .map(|p| {
            let name = ctx.rename.get(p).map(String::as_str).unwrap_or(p);
            format!("{quote}{name}{quote}")
        })
        .collect();
    format!("[{}]", parts.join(", "))
}
