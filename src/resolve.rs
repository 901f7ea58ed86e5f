//! Suspect resolution: propagate module context and method names to a
//! fixpoint, jump IIFEs, follow references, then classify the finals and
//! emit their edits.

use std::collections::HashMap;

use anyhow::Result;
use tree_sitter::Node;

use crate::annotate::Ctx;
use crate::ast;
use crate::rewrite;
use crate::scope::{self, BindingKind};
use crate::util;

/// Chain classification of a call or suspect. Module context is what
/// ultimately admits a suspect for rewriting; the router chains only keep
/// fluent call chains recognizable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Chain {
    #[default]
    None,
    Module,
    RouteProvider,
    UrlRouter,
    StateProvider,
}

/// Judging constraint attached to a target when it was found. `Method`
/// requires the suspect to sit under that module method; `Never` exempts
/// it from any such requirement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Limit {
    Method(&'static str),
    Never,
}

#[derive(Default)]
struct NodeTags {
    chain: Chain,
    method: Option<&'static str>,
    limit: Option<Limit>,
    seen: u8,
}

/// Analysis facts keyed by node id. Facts are only ever added, never
/// retracted, so propagation order cannot change the outcome.
#[derive(Default)]
pub struct TagTable {
    tags: HashMap<usize, NodeTags>,
}

impl TagTable {
    pub fn chain(&self, id: usize) -> Chain {
        self.tags.get(&id).map(|t| t.chain).unwrap_or_default()
    }

    /// Module context is sticky; the router chains may re-stamp each other.
    pub fn set_chain(&mut self, id: usize, chain: Chain) {
        let entry = self.tags.entry(id).or_default();
        if entry.chain != Chain::Module {
            entry.chain = chain;
        }
    }

    pub fn method(&self, id: usize) -> Option<&'static str> {
        self.tags.get(&id).and_then(|t| t.method)
    }

    pub fn set_method(&mut self, id: usize, method: &'static str) {
        let entry = self.tags.entry(id).or_default();
        if entry.method.is_none() {
            entry.method = Some(method);
        }
    }

    pub fn limit(&self, id: usize) -> Option<Limit> {
        self.tags.get(&id).and_then(|t| t.limit)
    }

    /// First write wins: a marker constraint recorded at detection time is
    /// not overridden by a structural one found later.
    pub fn set_limit(&mut self, id: usize, limit: Limit) {
        let entry = self.tags.entry(id).or_default();
        if entry.limit.is_none() {
            entry.limit = Some(limit);
        }
    }

    fn mark_seen(&mut self, id: usize, generation: u8) -> bool {
        let entry = self.tags.entry(id).or_default();
        if entry.seen >= generation {
            return false;
        }
        entry.seen = generation;
        true
    }
}

/// Judge all collected suspects and emit edits for the ones that hold up.
/// Returns the number of propagation rounds used to reach the fixpoint.
pub fn judge<'t>(ctx: &mut Ctx<'t>) -> Result<u32> {
    let raw = std::mem::take(&mut ctx.suspects);
    let mut suspects = Vec::new();
    for node in raw {
        if ctx.tags.mark_seen(node.id(), 1) {
            suspects.push(node);
        }
    }

    // 42 is a safety net; a couple of rounds suffice in practice
    let mut rounds = 0u32;
    for _ in 0..42 {
        rounds += 1;
        propagate(ctx, &suspects);
        if !forward(ctx, &suspects) {
            break;
        }
    }

    let mut finals = Vec::new();
    for &node in &suspects {
        let jumped = jump_over_iife(node);
        let followed = follow_reference(ctx, jumped, true).unwrap_or(jumped);

        if let Some(Limit::Method(required)) = ctx.tags.limit(node.id()) {
            if outer_method_name(ctx, node) != Some(required) {
                continue;
            }
        }
        if ctx.blocked.contains(&followed.id()) {
            continue;
        }
        if ctx.tags.mark_seen(followed.id(), 2) {
            finals.push(followed);
        }
    }

    for node in finals {
        if ctx.tags.chain(node.id()) != Chain::Module {
            eprintln!(
                "ngannotate: skipping line {}: not inside a module context",
                util::line_of(ctx.src, node.start_byte())
            );
            continue;
        }
        rewrite::emit(ctx, node)?;
    }

    Ok(rounds)
}

fn propagate<'t>(ctx: &mut Ctx<'t>, suspects: &[Node<'t>]) {
    for &node in suspects {
        if ctx.tags.chain(node.id()) != Chain::Module && has_module_ancestor(ctx, node) {
            ctx.tags.set_chain(node.id(), Chain::Module);
        }
        if ctx.tags.method(node.id()).is_none() {
            if let Some(method) = outer_method_name(ctx, node) {
                ctx.tags.set_method(node.id(), method);
            }
        }
    }
}

/// Copy module context and method names across IIFE jumps and reference
/// follows. Returns true when anything changed, so the caller knows to run
/// another round.
fn forward<'t>(ctx: &mut Ctx<'t>, suspects: &[Node<'t>]) -> bool {
    let mut modified = false;
    for &node in suspects {
        let jumped = jump_over_iife(node);
        if jumped != node {
            modified |= forward_tags(ctx, node, jumped);
        }
        let followed = follow_reference(ctx, jumped, false).unwrap_or(jumped);
        if followed != jumped {
            modified |= forward_tags(ctx, jumped, followed);
        }
    }
    modified
}

fn forward_tags(ctx: &mut Ctx<'_>, from: Node<'_>, to: Node<'_>) -> bool {
    let mut modified = false;
    if ctx.tags.chain(from.id()) == Chain::Module && ctx.tags.chain(to.id()) != Chain::Module {
        ctx.tags.set_chain(to.id(), Chain::Module);
        modified = true;
    }
    if let Some(method) = ctx.tags.method(from.id()) {
        if ctx.tags.method(to.id()).is_none() {
            ctx.tags.set_method(to.id(), method);
            modified = true;
        }
    }
    modified
}

fn has_module_ancestor(ctx: &Ctx<'_>, node: Node<'_>) -> bool {
    let mut cur = node.parent();
    while let Some(n) = cur {
        if ctx.tags.chain(n.id()) == Chain::Module {
            return true;
        }
        cur = n.parent();
    }
    false
}

/// Method name on the node itself or its nearest tagged ancestor.
fn outer_method_name(ctx: &Ctx<'_>, node: Node<'_>) -> Option<&'static str> {
    let mut cur = Some(node);
    while let Some(n) = cur {
        if let Some(method) = ctx.tags.method(n.id()) {
            return Some(method);
        }
        cur = n.parent();
    }
    None
}

/// `(function() { .. return X; })()` and `(() => X)()` stand for X.
pub fn jump_over_iife<'t>(node: Node<'t>) -> Node<'t> {
    if node.kind() != "call_expression" {
        return node;
    }
    let Some(callee) = ast::call_callee(node) else {
        return node;
    };
    let callee = ast::skip_parens(callee);
    if !ast::is_function_expression(callee) {
        return node;
    }
    let Some(body) = callee.child_by_field_name("body") else {
        return node;
    };
    if body.kind() != "statement_block" {
        // arrow function with an expression body
        return ast::skip_parens(body);
    }
    for statement in ast::children(body) {
        if statement.kind() == "return_statement" {
            let Some(expr) = ast::children(statement).into_iter().next() else {
                break;
            };
            return ast::skip_parens(expr);
        }
    }
    node
}

/// Follow an identifier reference to its declaration: declarators for
/// `var`/`let`/`const`, declarations for functions and classes, and the
/// self-name of a named function expression. Parameters and caught
/// exceptions are not followed.
pub fn follow_reference<'t>(ctx: &Ctx<'t>, node: Node<'t>, warn: bool) -> Option<Node<'t>> {
    if !scope::is_reference(node) {
        return None;
    }
    let Some(binding) = ctx.scopes.resolve(node) else {
        if warn {
            eprintln!(
                "ngannotate: could not resolve reference `{}` at line {}",
                ast::node_text(node, ctx.src),
                util::line_of(ctx.src, node.start_byte())
            );
        }
        return None;
    };
    match binding.kind {
        BindingKind::Var | BindingKind::LetConst | BindingKind::HoistedFn => binding.decl,
        _ => None,
    }
}
