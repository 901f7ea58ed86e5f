//! Run driver: parse, build the side tables, collect suspects in one
//! traversal, judge them, splice the fragment set and optionally build a
//! source map.

use std::collections::{HashMap, HashSet};
use std::time::Instant;

use anyhow::{Context as _, Result};
use regex::Regex;
use serde::Serialize;
use tree_sitter::Node;

use crate::ast;
use crate::fragments::{self, Fragment};
use crate::matchers;
use crate::nginject;
use crate::plugins::{self, Plugin};
use crate::resolve;
use crate::scope::ScopeModel;
use crate::sourcemap;
use crate::util;

/// Receivers that qualify as module references without any chain tag:
/// plain dotted names like `angular.module` or `myMod`.
const DEFAULT_RECEIVER_PATTERN: &str = r"^[a-zA-Z0-9_\$\.\s]+$";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Add,
    Remove,
    Rebuild,
}

#[derive(Debug, Clone)]
pub struct Rename {
    pub from: String,
    pub to: String,
}

#[derive(Default)]
pub struct Options {
    pub add: bool,
    pub remove: bool,
    pub single_quotes: bool,
    pub regexp: Option<String>,
    pub rename: Vec<Rename>,
    pub enable: Vec<String>,
    pub plugins: Vec<Box<dyn Plugin>>,
    pub sourcemap: bool,
    pub source_name: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunStats {
    pub parse_ms: u64,
    pub analyze_ms: u64,
    pub rounds: u32,
    pub fragments: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sourcemap_ms: Option<u64>,
}

#[derive(Debug)]
pub struct AnnotateResult {
    pub src: String,
    pub map: Option<String>,
    pub stats: RunStats,
}

/// Everything one run reads and writes. The tree outlives the context;
/// nodes are carried by value.
pub struct Ctx<'t> {
    pub src: &'t str,
    pub mode: Mode,
    pub quote: char,
    pub eol: &'static str,
    pub renaming: bool,
    pub rename: HashMap<String, String>,
    pub receiver_re: Regex,
    pub comments: Vec<ast::Comment>,
    pub starts: ast::NodeIndex<'t>,
    pub scopes: ScopeModel<'t>,
    pub tags: resolve::TagTable,
    pub suspects: Vec<Node<'t>>,
    pub blocked: HashSet<usize>,
    pub fragments: Vec<Fragment>,
    pub positions: Vec<usize>,
    pub plugins: Vec<Box<dyn Plugin>>,
}

/// Analyze `src` and produce the rewritten source, an optional source map
/// and run statistics. With neither add nor remove requested the source
/// passes through untouched.
pub fn annotate(src: &str, options: Options) -> Result<AnnotateResult> {
    let mode = match (options.add, options.remove) {
        (true, true) => Mode::Rebuild,
        (false, true) => Mode::Remove,
        (true, false) => Mode::Add,
        (false, false) => {
            return Ok(AnnotateResult {
                src: src.to_string(),
                map: None,
                stats: RunStats {
                    parse_ms: 0,
                    analyze_ms: 0,
                    rounds: 0,
                    fragments: 0,
                    sourcemap_ms: None,
                },
            });
        }
    };

    let pattern = options.regexp.as_deref().unwrap_or(DEFAULT_RECEIVER_PATTERN);
    let receiver_re = Regex::new(pattern).context("invalid receiver pattern")?;
    let plugins = plugins::assemble(&options.enable, options.plugins)?;
    let rename: HashMap<String, String> = options
        .rename
        .iter()
        .map(|r| (r.from.clone(), r.to.clone()))
        .collect();

    let parse_start = Instant::now();
    let tree = ast::parse(src)?;
    let parse_ms = parse_start.elapsed().as_millis() as u64;

    let analyze_start = Instant::now();
    let root = tree.root_node();
    let mut ctx = Ctx {
        src,
        mode,
        quote: if options.single_quotes { '\'' } else { '"' },
        eol: util::detect_eol(src),
        renaming: !rename.is_empty(),
        rename,
        receiver_re,
        comments: ast::collect_comments(root, src),
        starts: ast::NodeIndex::build(root),
        scopes: ScopeModel::build(root, src),
        tags: resolve::TagTable::default(),
        suspects: Vec::new(),
        blocked: HashSet::new(),
        fragments: Vec::new(),
        positions: Vec::new(),
        plugins,
    };

    nginject::inspect_comments(&mut ctx);
    for i in 0..ctx.plugins.len() {
        ctx.plugins[i].init(src);
    }

    walk(&mut ctx, root);

    let rounds = resolve::judge(&mut ctx)?;

    fragments::uniq(&mut ctx.fragments);
    ctx.fragments.sort_by_key(|f| (f.start, f.end));
    let out = fragments::splice(src, &ctx.fragments);
    let analyze_ms = analyze_start.elapsed().as_millis() as u64;

    let mut stats = RunStats {
        parse_ms,
        analyze_ms,
        rounds,
        fragments: ctx.fragments.len(),
        sourcemap_ms: None,
    };

    let map = if options.sourcemap {
        let map_start = Instant::now();
        let name = options.source_name.as_deref().unwrap_or("input.js");
        let json = sourcemap::build(name, src, &out, &ctx.positions, &ctx.fragments);
        stats.sourcemap_ms = Some(map_start.elapsed().as_millis() as u64);
        Some(json)
    } else {
        None
    };

    Ok(AnnotateResult {
        src: out,
        map,
        stats,
    })
}

/// One pre-order traversal. On enter, node starts are recorded and the
/// marker hooks run; on exit, the structural matchers run, so inner calls
/// are matched before the chains containing them.
fn walk<'t>(ctx: &mut Ctx<'t>, node: Node<'t>) {
    ctx.positions.push(node.start_byte());

    match node.kind() {
        "call_expression" => nginject::inspect_call_expression(ctx, node),
        "method_definition" => nginject::inspect_method(ctx, node),
        "object" => nginject::inspect_object_literal(ctx, node),
        "assignment_expression" => nginject::inspect_assignment(ctx, node),
        _ if ast::is_function(node) => nginject::inspect_function(ctx, node),
        _ => {}
    }

    for kid in ast::children(node) {
        walk(ctx, kid);
    }

    match node.kind() {
        "call_expression" => {
            for target in matchers::match_call(ctx, node).into_targets() {
                if let Some(method) = target.method_name {
                    ctx.tags.set_method(target.node.id(), method);
                }
                ctx.suspects.push(target.node);
            }
        }
        "return_statement" => {
            if let Some(controller) = matchers::match_directive_return(ctx, node) {
                ctx.suspects.push(controller);
            }
        }
        "assignment_expression" | "object" => {
            if let Some(target) = matchers::match_provider_get(ctx, node) {
                ctx.suspects.push(target);
            }
        }
        _ => {}
    }
}
