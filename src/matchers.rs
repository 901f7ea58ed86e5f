//! Structural matchers for the AngularJS dependency-injection surface:
//! module short forms, `$provide`, `$injector.invoke`, ngRoute, ui-router,
//! modal services, `$httpProvider` interceptors and `$controllerProvider`.

use tree_sitter::Node;

use crate::annotate::Ctx;
use crate::ast;
use crate::nginject;
use crate::resolve::{Chain, Limit};

const REGULAR_METHODS: &[&str] = &[
    "provider",
    "value",
    "constant",
    "bootstrap",
    "config",
    "factory",
    "directive",
    "filter",
    "run",
    "controller",
    "service",
    "animation",
    "invoke",
    "store",
    "decorator",
    "component",
];

const PROVIDE_METHODS: &[&str] = &["decorator", "service", "factory", "provider"];

const STATE_INJECTABLE_PROPS: &[&str] = &[
    "controller",
    "controllerProvider",
    "templateProvider",
    "onEnter",
    "onExit",
];

const VIEW_INJECTABLE_PROPS: &[&str] = &["controller", "controllerProvider", "templateProvider"];

const MODAL_OPEN_RECEIVERS: &[&str] = &["$modal", "$uibModal"];
const MATERIAL_SHOW_RECEIVERS: &[&str] = &["$mdDialog", "$mdToast", "$mdBottomSheet"];
const HTTP_INTERCEPTOR_ARRAYS: &[&str] = &["interceptors", "responseInterceptors"];

/// An injectable position found by a matcher, with the module method it
/// came from when that constrains later judging.
#[derive(Debug, Clone, Copy)]
pub struct Target<'t> {
    pub node: Node<'t>,
    pub method_name: Option<&'static str>,
}

impl<'t> Target<'t> {
    pub fn plain(node: Node<'t>) -> Target<'t> {
        Target {
            node,
            method_name: None,
        }
    }
}

#[derive(Debug)]
pub enum MatchResult<'t> {
    NoMatch,
    One(Target<'t>),
    Many(Vec<Target<'t>>),
}

impl<'t> MatchResult<'t> {
    pub fn found(&self) -> bool {
        !matches!(self, MatchResult::NoMatch)
    }

    pub fn into_targets(self) -> Vec<Target<'t>> {
        match self {
            MatchResult::NoMatch => Vec::new(),
            MatchResult::One(target) => vec![target],
            MatchResult::Many(targets) => targets,
        }
    }
}

type Matcher<'t> = fn(&mut Ctx<'t>, Node<'t>, Node<'t>, Node<'t>) -> MatchResult<'t>;

/// Run the matcher battery against a call expression, on traversal exit.
/// A marker comment on the call itself overrides structural matching.
pub fn match_call<'t>(ctx: &mut Ctx<'t>, call: Node<'t>) -> MatchResult<'t> {
    let src = ctx.src;
    let member = ast::call_callee(call)
        .map(ast::skip_parens)
        .and_then(ast::member_parts);
    let is_method_call = member.is_some();

    if let Some((obj, method)) = member {
        if let Some(yes) = nginject::leading_annotation(ctx, call) {
            nginject::add_suspect(ctx, call, !yes);
            return MatchResult::NoMatch;
        }

        // invoke and provide run before regular so that it cannot claim
        // them as module short forms
        let matchers: &[Matcher<'t>] = &[
            match_injector_invoke as Matcher<'t>,
            match_provide as Matcher<'t>,
            match_regular as Matcher<'t>,
            match_ngroute as Matcher<'t>,
            match_modal as Matcher<'t>,
            match_ngui as Matcher<'t>,
            match_http_provider as Matcher<'t>,
            match_controller_provider as Matcher<'t>,
        ];
        for matcher in matchers {
            let result = matcher(ctx, call, obj, method);
            if result.found() {
                return result;
            }
        }
    }

    for i in 0..ctx.plugins.len() {
        let result = ctx.plugins[i].matches(call, src, is_method_call);
        if result.found() {
            return result;
        }
    }
    MatchResult::NoMatch
}

/// `$injector.invoke(function($compile) { .. })`: every argument is an
/// injectable position.
fn match_injector_invoke<'t>(
    ctx: &mut Ctx<'t>,
    call: Node<'t>,
    obj: Node<'t>,
    method: Node<'t>,
) -> MatchResult<'t> {
    let src = ctx.src;
    if ast::node_text(method, src) != "invoke" || !ast::is_identifier_named(obj, src, "$injector")
    {
        return MatchResult::NoMatch;
    }
    let args = ast::call_arguments(call);
    if args.is_empty() {
        return MatchResult::NoMatch;
    }
    MatchResult::Many(args.into_iter().map(Target::plain).collect())
}

/// `$provide.factory("name", fn)` and friends.
fn match_provide<'t>(
    ctx: &mut Ctx<'t>,
    call: Node<'t>,
    obj: Node<'t>,
    method: Node<'t>,
) -> MatchResult<'t> {
    let src = ctx.src;
    if !ast::is_identifier_named(obj, src, "$provide") {
        return MatchResult::NoMatch;
    }
    let Some(method_name) = static_method(ast::node_text(method, src), PROVIDE_METHODS) else {
        return MatchResult::NoMatch;
    };
    let args = ast::call_arguments(call);
    if args.len() != 2 {
        return MatchResult::NoMatch;
    }
    let target = Target {
        node: args[1],
        method_name: Some(method_name),
    };
    if ctx.renaming {
        return MatchResult::Many(vec![Target::plain(args[0]), target]);
    }
    MatchResult::One(target)
}

/// The module short forms: `myMod.controller("name", fn)` and the rest of
/// the module surface, recognized through chaining, the receiver pattern,
/// or a direct `angular.module(..)` receiver.
fn match_regular<'t>(
    ctx: &mut Ctx<'t>,
    call: Node<'t>,
    obj: Node<'t>,
    method: Node<'t>,
) -> MatchResult<'t> {
    let src = ctx.src;
    let method_text = ast::node_text(method, src);

    // implicit config block: angular.module("MyMod", function(dep) {})
    if ast::is_identifier_named(obj, src, "angular") && method_text == "module" {
        let args = ast::call_arguments(call);
        if args.len() >= 2 {
            ctx.tags.set_chain(call.id(), Chain::Module);
            return MatchResult::One(Target::plain(args[args.len() - 1]));
        }
    }

    // foo.decorator is normally a short form but $stateProvider.decorator
    // takes a function that is not injectable this way
    if ast::is_identifier_named(obj, src, "$stateProvider") && method_text == "decorator" {
        return MatchResult::NoMatch;
    }

    let Some(method_name) = static_method(method_text, REGULAR_METHODS) else {
        return MatchResult::NoMatch;
    };
    let qualifies = ctx.tags.chain(obj.id()) == Chain::Module
        || ctx.receiver_re.is_match(ast::node_text(obj, src))
        || is_module_factory_call(obj, src);
    if !qualifies {
        return MatchResult::NoMatch;
    }
    ctx.tags.set_chain(call.id(), Chain::Module);

    // these continue the chain but take no injectable argument
    if matches!(method_name, "value" | "constant" | "bootstrap") {
        return MatchResult::NoMatch;
    }

    let args = ast::call_arguments(call);
    let target = if matches!(method_name, "config" | "run") {
        if args.len() == 1 { Some(args[0]) } else { None }
    } else if args.len() == 2 && args[0].kind() == "string" {
        Some(args[1])
    } else {
        None
    };
    let Some(mut target) = target else {
        return MatchResult::NoMatch;
    };

    if method_name == "component" {
        // only the controller property of the component definition object
        // is injectable, and only when there is exactly one
        if target.kind() != "object" {
            return MatchResult::NoMatch;
        }
        let mut controllers = Vec::new();
        for entry in ast::children(target) {
            if entry.kind() != "pair" {
                continue;
            }
            let Some(key) = entry.child_by_field_name("key") else {
                continue;
            };
            let named = match key.kind() {
                "property_identifier" => ast::node_text(key, src) == "controller",
                "string" => ast::string_value(key, src) == Some("controller"),
                _ => false,
            };
            if named {
                if let Some(value) = entry.child_by_field_name("value") {
                    controllers.push(value);
                }
            }
        }
        if controllers.len() != 1 {
            return MatchResult::NoMatch;
        }
        target = controllers[0];
    }

    let stamped = Target {
        node: target,
        method_name: Some(method_name),
    };
    if ctx.renaming && args.len() == 2 {
        return MatchResult::Many(vec![Target::plain(args[0]), stamped]);
    }
    MatchResult::One(stamped)
}

/// `$routeProvider.when("path", {controller: .., resolve: {..}})`.
fn match_ngroute<'t>(
    ctx: &mut Ctx<'t>,
    call: Node<'t>,
    obj: Node<'t>,
    method: Node<'t>,
) -> MatchResult<'t> {
    let src = ctx.src;
    let receiver = ctx.tags.chain(obj.id()) == Chain::RouteProvider
        || ast::is_identifier_named(obj, src, "$routeProvider");
    if !receiver {
        return MatchResult::NoMatch;
    }
    ctx.tags.set_chain(call.id(), Chain::RouteProvider);

    if ast::node_text(method, src) != "when" {
        return MatchResult::NoMatch;
    }
    let args = ast::call_arguments(call);
    if args.len() != 2 || args[1].kind() != "object" {
        return MatchResult::NoMatch;
    }
    let config = args[1];

    let mut targets = Vec::new();
    if let Some(controller) = ast::object_property(config, src, "controller") {
        targets.push(Target::plain(controller));
    }
    collect_resolve_targets(config, src, &mut targets);
    if targets.is_empty() {
        MatchResult::NoMatch
    } else {
        MatchResult::Many(targets)
    }
}

/// `$modal.open({..})`, `$uibModal.open({..})` and the Material `show`
/// services: controller and resolve values of the single config object.
fn match_modal<'t>(
    ctx: &mut Ctx<'t>,
    call: Node<'t>,
    obj: Node<'t>,
    method: Node<'t>,
) -> MatchResult<'t> {
    let src = ctx.src;
    if obj.kind() != "identifier" {
        return MatchResult::NoMatch;
    }
    let obj_name = ast::node_text(obj, src);
    let method_name = ast::node_text(method, src);
    let hit = (MODAL_OPEN_RECEIVERS.contains(&obj_name) && method_name == "open")
        || (MATERIAL_SHOW_RECEIVERS.contains(&obj_name) && method_name == "show");
    if !hit {
        return MatchResult::NoMatch;
    }
    let args = ast::call_arguments(call);
    if args.len() != 1 || args[0].kind() != "object" {
        return MatchResult::NoMatch;
    }
    let config = args[0];

    let mut targets = Vec::new();
    if let Some(controller) = ast::object_property(config, src, "controller") {
        targets.push(Target::plain(controller));
    }
    collect_resolve_targets(config, src, &mut targets);
    MatchResult::Many(targets)
}

/// ui-router: `$urlRouterProvider.when(.., fn)`, `$stateProvider.state`
/// and `stateHelperProvider.setNestedState` state definition objects,
/// including views, params and nested children.
fn match_ngui<'t>(
    ctx: &mut Ctx<'t>,
    call: Node<'t>,
    obj: Node<'t>,
    method: Node<'t>,
) -> MatchResult<'t> {
    let src = ctx.src;

    if ctx.tags.chain(obj.id()) == Chain::UrlRouter
        || ast::is_identifier_named(obj, src, "$urlRouterProvider")
    {
        ctx.tags.set_chain(call.id(), Chain::UrlRouter);
        let args = ast::call_arguments(call);
        if ast::node_text(method, src) == "when" && !args.is_empty() {
            return MatchResult::One(Target::plain(args[args.len() - 1]));
        }
        return MatchResult::NoMatch;
    }

    let receiver = ctx.tags.chain(obj.id()) == Chain::StateProvider
        || (obj.kind() == "identifier"
            && matches!(
                ast::node_text(obj, src),
                "$stateProvider" | "stateHelperProvider"
            ));
    if !receiver {
        return MatchResult::NoMatch;
    }
    ctx.tags.set_chain(call.id(), Chain::StateProvider);

    let method_name = ast::node_text(method, src);
    if method_name != "state" && method_name != "setNestedState" {
        return MatchResult::NoMatch;
    }
    let args = ast::call_arguments(call);
    if args.is_empty() || args.len() > 2 {
        return MatchResult::NoMatch;
    }
    // state("name", {..}) or state({..}); setNestedState({..}, deep?)
    let config = if method_name == "state" {
        args[args.len() - 1]
    } else {
        args[0]
    };

    let mut targets = Vec::new();
    match_state_config(config, src, &mut targets);
    if targets.is_empty() {
        MatchResult::NoMatch
    } else {
        MatchResult::Many(targets)
    }
}

fn match_state_config<'t>(config: Node<'t>, src: &str, out: &mut Vec<Target<'t>>) {
    if config.kind() != "object" {
        return;
    }
    for prop in STATE_INJECTABLE_PROPS {
        if let Some(value) = ast::object_property(config, src, prop) {
            out.push(Target::plain(value));
        }
    }
    collect_resolve_targets(config, src, out);

    // params: {simple: fn, inValue: {value: fn}}
    if let Some(params) = ast::object_property(config, src, "params") {
        if params.kind() == "object" {
            for entry in ast::children(params) {
                if entry.kind() != "pair" {
                    continue;
                }
                let Some(value) = entry.child_by_field_name("value") else {
                    continue;
                };
                if value.kind() == "object" {
                    if let Some(inner) = ast::object_property(value, src, "value") {
                        out.push(Target::plain(inner));
                    }
                } else {
                    out.push(Target::plain(value));
                }
            }
        }
    }

    // views: {name: {controller: .., resolve: {..}}}
    if let Some(views) = ast::object_property(config, src, "views") {
        if views.kind() == "object" {
            for entry in ast::children(views) {
                if entry.kind() != "pair" {
                    continue;
                }
                let Some(view) = entry.child_by_field_name("value") else {
                    continue;
                };
                if view.kind() != "object" {
                    continue;
                }
                for prop in VIEW_INJECTABLE_PROPS {
                    if let Some(value) = ast::object_property(view, src, prop) {
                        out.push(Target::plain(value));
                    }
                }
                collect_resolve_targets(view, src, out);
            }
        }
    }

    if let Some(children) = ast::object_property(config, src, "children") {
        if children.kind() == "array" {
            for child in ast::children(children) {
                match_state_config(child, src, out);
            }
        }
    }
}

/// `$httpProvider.interceptors.push(fn)` and the legacy
/// `responseInterceptors` array.
fn match_http_provider<'t>(
    ctx: &mut Ctx<'t>,
    call: Node<'t>,
    obj: Node<'t>,
    method: Node<'t>,
) -> MatchResult<'t> {
    let src = ctx.src;
    if ast::node_text(method, src) != "push" {
        return MatchResult::NoMatch;
    }
    let Some((inner_obj, inner_prop)) = ast::member_parts(obj) else {
        return MatchResult::NoMatch;
    };
    if !ast::is_identifier_named(inner_obj, src, "$httpProvider")
        || !HTTP_INTERCEPTOR_ARRAYS.contains(&ast::node_text(inner_prop, src))
    {
        return MatchResult::NoMatch;
    }
    let args = ast::call_arguments(call);
    if args.is_empty() {
        return MatchResult::NoMatch;
    }
    MatchResult::Many(args.into_iter().map(Target::plain).collect())
}

/// `$controllerProvider.register("name", fn)`.
fn match_controller_provider<'t>(
    ctx: &mut Ctx<'t>,
    call: Node<'t>,
    obj: Node<'t>,
    method: Node<'t>,
) -> MatchResult<'t> {
    let src = ctx.src;
    if !ast::is_identifier_named(obj, src, "$controllerProvider")
        || ast::node_text(method, src) != "register"
    {
        return MatchResult::NoMatch;
    }
    let args = ast::call_arguments(call);
    if args.len() != 2 {
        return MatchResult::NoMatch;
    }
    MatchResult::One(Target {
        node: args[1],
        method_name: Some("register"),
    })
}

/// `return { .. controller: fn }` is only meaningful inside directives, so
/// the target is constrained to the directive method.
pub fn match_directive_return<'t>(ctx: &mut Ctx<'t>, node: Node<'t>) -> Option<Node<'t>> {
    let expr = ast::children(node).into_iter().next()?;
    let expr = ast::skip_parens(expr);
    if expr.kind() != "object" {
        return None;
    }
    let controller = ast::object_property(expr, ctx.src, "controller")?;
    ctx.tags.set_limit(controller.id(), Limit::Method("directive"));
    Some(controller)
}

/// `(this|self|that).$get = fn` and `{ $get: fn }` are only meaningful
/// inside providers.
pub fn match_provider_get<'t>(ctx: &mut Ctx<'t>, node: Node<'t>) -> Option<Node<'t>> {
    let target = match node.kind() {
        "assignment_expression" => {
            let left = node.child_by_field_name("left")?;
            let (obj, prop) = ast::member_parts(left)?;
            if ast::node_text(prop, ctx.src) != "$get" {
                return None;
            }
            let receiver = obj.kind() == "this"
                || ast::is_identifier_named(obj, ctx.src, "self")
                || ast::is_identifier_named(obj, ctx.src, "that");
            if !receiver {
                return None;
            }
            node.child_by_field_name("right")?
        }
        "object" => ast::object_property(node, ctx.src, "$get")?,
        _ => return None,
    };
    ctx.tags.set_limit(target.id(), Limit::Method("provider"));
    Some(target)
}

fn collect_resolve_targets<'t>(config: Node<'t>, src: &str, out: &mut Vec<Target<'t>>) {
    let Some(resolve) = ast::object_property(config, src, "resolve") else {
        return;
    };
    if resolve.kind() != "object" {
        return;
    }
    for entry in ast::children(resolve) {
        if entry.kind() != "pair" {
            continue;
        }
        if let Some(value) = entry.child_by_field_name("value") {
            out.push(Target::plain(value));
        }
    }
}

fn is_module_factory_call(node: Node<'_>, src: &str) -> bool {
    if node.kind() != "call_expression" {
        return false;
    }
    let Some(callee) = ast::call_callee(node) else {
        return false;
    };
    let Some((obj, prop)) = ast::member_parts(ast::skip_parens(callee)) else {
        return false;
    };
    ast::is_identifier_named(obj, src, "angular") && ast::node_text(prop, src) == "module"
}

fn static_method(name: &str, table: &[&'static str]) -> Option<&'static str> {
    table.iter().copied().find(|m| *m == name)
}
