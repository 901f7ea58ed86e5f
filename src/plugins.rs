//! Optional matchers, compiled in but inert until named by `--enable`,
//! plus the trait callers implement to supply their own.

use anyhow::{Result, bail};
use tree_sitter::Node;

use crate::ast;
use crate::matchers::{MatchResult, Target};

/// A pluggable call matcher. Consulted on every call expression after the
/// built-in matchers fail, in registration order.
pub trait Plugin: std::fmt::Debug {
    fn name(&self) -> &str;

    /// Called once per run with the source text, before traversal.
    fn init(&mut self, _src: &str) {}

    /// `is_method_call` is true when the callee is a non-computed member
    /// expression, the shape the built-ins already examined.
    fn matches<'t>(&self, call: Node<'t>, src: &str, is_method_call: bool) -> MatchResult<'t>;
}

pub const OPTIONAL_NAMES: &[&str] = &["angular-dashboard-framework"];

/// Instantiate the optionals selected by name, then append caller-supplied
/// plugins. Unknown names abort the run before any traversal.
pub fn assemble(enable: &[String], extra: Vec<Box<dyn Plugin>>) -> Result<Vec<Box<dyn Plugin>>> {
    let mut plugins: Vec<Box<dyn Plugin>> = Vec::new();
    for name in enable {
        match name.as_str() {
            "angular-dashboard-framework" => plugins.push(Box::new(DashboardFramework)),
            _ => bail!("found no optional named {name}"),
        }
    }
    plugins.extend(extra);
    Ok(plugins)
}

/// angular-dashboard-framework: `dashboardProvider.widget(name, config)`.
/// The config object contributes its `controller` and `resolve` values,
/// and an `edit` sub-object contributes the same way.
#[derive(Debug)]
struct DashboardFramework;

impl Plugin for DashboardFramework {
    fn name(&self) -> &str {
        "angular-dashboard-framework"
    }

    fn matches<'t>(&self, call: Node<'t>, src: &str, is_method_call: bool) -> MatchResult<'t> {
        if !is_method_call {
            return MatchResult::NoMatch;
        }
        let Some((obj, prop)) = ast::call_callee(call)
            .map(ast::skip_parens)
            .and_then(ast::member_parts)
        else {
            return MatchResult::NoMatch;
        };
        if !ast::is_identifier_named(obj, src, "dashboardProvider")
            || ast::node_text(prop, src) != "widget"
        {
            return MatchResult::NoMatch;
        }
        let args = ast::call_arguments(call);
        if args.len() != 2 || args[1].kind() != "object" {
            return MatchResult::NoMatch;
        }
        let config = args[1];

        let mut targets = Vec::new();
        collect_widget_targets(config, src, &mut targets);
        if let Some(edit) = ast::object_property(config, src, "edit") {
            if edit.kind() == "object" {
                collect_widget_targets(edit, src, &mut targets);
            }
        }
        if targets.is_empty() {
            return MatchResult::NoMatch;
        }
        MatchResult::Many(targets)
    }
}

fn collect_widget_targets<'t>(config: Node<'t>, src: &str, targets: &mut Vec<Target<'t>>) {
    if let Some(controller) = ast::object_property(config, src, "controller") {
        targets.push(Target::plain(controller));
    }
    let Some(resolve) = ast::object_property(config, src, "resolve") else {
        return;
    };
    if resolve.kind() != "object" {
        return;
    }
    for pair in ast::children(resolve) {
        if pair.kind() != "pair" {
            continue;
        }
        if let Some(value) = pair.child_by_field_name("value") {
            targets.push(Target::plain(value));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn first_call<'t>(node: Node<'t>) -> Option<Node<'t>> {
        if node.kind() == "call_expression" {
            return Some(node);
        }
        let mut cursor = node.walk();
        let kids: Vec<Node> = node.named_children(&mut cursor).collect();
        kids.into_iter().find_map(first_call)
    }

    #[test]
    fn unknown_optional_name_is_an_error() {
        let err = assemble(&["no-such-thing".to_string()], Vec::new()).unwrap_err();
        assert!(err.to_string().contains("no-such-thing"));
    }

    #[test]
    fn dashboard_widget_yields_config_and_edit_targets() {
        let src = r#"dashboardProvider.widget("clock", {
            controller: function($scope) {},
            resolve: { data: function($http) {} },
            edit: {
                controller: function($scope, $q) {},
                resolve: { more: function($q) {} }
            }
        });"#;
        let tree = crate::ast::parse(src).unwrap();
        let call = first_call(tree.root_node()).unwrap();
        let plugin = DashboardFramework;
        let targets = plugin.matches(call, src, true).into_targets();
        assert_eq!(targets.len(), 4);
        for target in &targets {
            assert!(crate::ast::is_function_expression(target.node));
        }
    }

    #[test]
    fn other_receivers_do_not_match() {
        let src = r#"otherProvider.widget("clock", { controller: function($scope) {} });"#;
        let tree = crate::ast::parse(src).unwrap();
        let call = first_call(tree.root_node()).unwrap();
        let plugin = DashboardFramework;
        assert!(!plugin.matches(call, src, true).found());
    }
}
