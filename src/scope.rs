use std::collections::HashMap;

use tree_sitter::Node;

use crate::ast;

/// Names visible everywhere without a declaration. References to these are
/// never reported as unresolved, and never followed.
const AMBIENT_NAMES: &[&str] = &["undefined", "Infinity", "console"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeKind {
    /// Function or program scope; `var` and function declarations land here.
    Hoist,
    Block,
    CatchBlock,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindingKind {
    Var,
    LetConst,
    Param,
    Caught,
    HoistedFn,
    Ambient,
}

/// A resolved name. `decl` is the node a reference can be followed to: the
/// declarator for `var`/`let`/`const`, the declaration for functions and
/// classes. Parameters and caught exceptions have no followable target.
#[derive(Debug, Clone, Copy)]
pub struct Binding<'t> {
    pub kind: BindingKind,
    pub decl: Option<Node<'t>>,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
struct ScopeId(usize);

struct Scope<'t> {
    kind: ScopeKind,
    parent: Option<ScopeId>,
    bindings: HashMap<String, Binding<'t>>,
}

/// Lexical scope table for one parse tree, built in a single walk before
/// analysis starts. Queries climb from a node to its enclosing scope and
/// outward through the scope chain.
pub struct ScopeModel<'t> {
    src: &'t str,
    scopes: Vec<Scope<'t>>,
    scope_by_node: HashMap<usize, ScopeId>,
    top: ScopeId,
}

impl<'t> ScopeModel<'t> {
    pub fn build(root: Node<'t>, src: &'t str) -> ScopeModel<'t> {
        let mut model = ScopeModel {
            src,
            scopes: Vec::new(),
            scope_by_node: HashMap::new(),
            top: ScopeId(0),
        };
        let top = model.push(ScopeKind::Hoist, None);
        model.top = top;
        for name in AMBIENT_NAMES {
            model.insert(top, name.to_string(), BindingKind::Ambient, None);
        }
        model.visit(root, top);
        model
    }

    /// Binding a reference resolves to, or `None` for unresolved names.
    pub fn resolve(&self, node: Node<'t>) -> Option<&Binding<'t>> {
        let name = ast::node_text(node, self.src);
        let mut scope = Some(self.scope_of(node));
        while let Some(id) = scope {
            let entry = &self.scopes[id.0];
            if let Some(binding) = entry.bindings.get(name) {
                return Some(binding);
            }
            scope = entry.parent;
        }
        None
    }

    fn scope_of(&self, node: Node<'t>) -> ScopeId {
        let mut cur = Some(node);
        while let Some(n) = cur {
            if let Some(&id) = self.scope_by_node.get(&n.id()) {
                return id;
            }
            cur = n.parent();
        }
        self.top
    }

    fn push(&mut self, kind: ScopeKind, parent: Option<ScopeId>) -> ScopeId {
        let id = ScopeId(self.scopes.len());
        self.scopes.push(Scope {
            kind,
            parent,
            bindings: HashMap::new(),
        });
        id
    }

    fn open(&mut self, node: Node<'t>, kind: ScopeKind, parent: ScopeId) -> ScopeId {
        let id = self.push(kind, Some(parent));
        self.scope_by_node.insert(node.id(), id);
        id
    }

    fn insert(&mut self, scope: ScopeId, name: String, kind: BindingKind, decl: Option<Node<'t>>) {
        self.scopes[scope.0]
            .bindings
            .insert(name, Binding { kind, decl });
    }

    fn nearest_hoist(&self, mut scope: ScopeId) -> ScopeId {
        loop {
            let entry = &self.scopes[scope.0];
            if entry.kind == ScopeKind::Hoist {
                return scope;
            }
            match entry.parent {
                Some(parent) => scope = parent,
                None => return scope,
            }
        }
    }

    fn visit(&mut self, node: Node<'t>, current: ScopeId) {
        let mut scope = current;
        match node.kind() {
            "program" => {
                scope = self.open(node, ScopeKind::Hoist, current);
            }
            kind if ast::is_function(node) || kind == "method_definition" => {
                if ast::is_function_declaration(node) {
                    if let Some(name) = node.child_by_field_name("name") {
                        let hoist = self.nearest_hoist(current);
                        let text = ast::node_text(name, self.src).to_string();
                        self.insert(hoist, text, BindingKind::HoistedFn, Some(node));
                    }
                }
                scope = self.open(node, ScopeKind::Hoist, current);
                self.bind_params(node, scope);
                // a named function expression binds its own name inside itself
                if matches!(
                    node.kind(),
                    "function_expression" | "function" | "generator_function"
                ) {
                    if let Some(name) = node.child_by_field_name("name") {
                        let text = ast::node_text(name, self.src).to_string();
                        self.insert(scope, text, BindingKind::HoistedFn, Some(node));
                    }
                }
            }
            "statement_block" => {
                let function_body = node.parent().is_some_and(|p| {
                    ast::is_function(p) || p.kind() == "method_definition"
                });
                if !function_body {
                    scope = self.open(node, ScopeKind::Block, current);
                }
            }
            "for_statement" => {
                let lexical = node
                    .child_by_field_name("initializer")
                    .is_some_and(|init| init.kind() == "lexical_declaration");
                if lexical {
                    scope = self.open(node, ScopeKind::Block, current);
                }
            }
            "for_in_statement" => {
                // for-in and for-of; a "kind" field means the left side
                // declares a fresh binding rather than assigning an outer one
                if let Some(kw) = node.child_by_field_name("kind") {
                    let left = node
                        .child_by_field_name("left")
                        .filter(|l| l.kind() == "identifier");
                    if ast::node_text(kw, self.src) == "var" {
                        if let Some(left) = left {
                            let hoist = self.nearest_hoist(current);
                            let text = ast::node_text(left, self.src).to_string();
                            self.insert(hoist, text, BindingKind::Var, None);
                        }
                    } else {
                        scope = self.open(node, ScopeKind::Block, current);
                        if let Some(left) = left {
                            let text = ast::node_text(left, self.src).to_string();
                            self.insert(scope, text, BindingKind::LetConst, None);
                        }
                    }
                }
            }
            "catch_clause" => {
                scope = self.open(node, ScopeKind::CatchBlock, current);
                if let Some(param) = node.child_by_field_name("parameter") {
                    if param.kind() == "identifier" {
                        let text = ast::node_text(param, self.src).to_string();
                        self.insert(scope, text, BindingKind::Caught, None);
                    }
                }
            }
            "variable_declaration" => {
                let hoist = self.nearest_hoist(current);
                self.bind_declarators(node, hoist, BindingKind::Var);
            }
            "lexical_declaration" => {
                self.bind_declarators(node, current, BindingKind::LetConst);
            }
            "class_declaration" => {
                if let Some(name) = node.child_by_field_name("name") {
                    let text = ast::node_text(name, self.src).to_string();
                    self.insert(current, text, BindingKind::LetConst, Some(node));
                }
            }
            _ => {}
        }
        for child in ast::children(node) {
            self.visit(child, scope);
        }
    }

    fn bind_declarators(&mut self, declaration: Node<'t>, scope: ScopeId, kind: BindingKind) {
        for declarator in ast::children(declaration) {
            if declarator.kind() != "variable_declarator" {
                continue;
            }
            let Some(name) = declarator.child_by_field_name("name") else {
                continue;
            };
            if name.kind() != "identifier" {
                continue;
            }
            let text = ast::node_text(name, self.src).to_string();
            self.insert(scope, text, kind, Some(declarator));
        }
    }

    fn bind_params(&mut self, function: Node<'t>, scope: ScopeId) {
        if let Some(single) = function.child_by_field_name("parameter") {
            if single.kind() == "identifier" {
                let text = ast::node_text(single, self.src).to_string();
                self.insert(scope, text, BindingKind::Param, None);
            }
            return;
        }
        let Some(params) = function.child_by_field_name("parameters") else {
            return;
        };
        for param in ast::children(params) {
            let name = match param.kind() {
                "identifier" => Some(param),
                "assignment_pattern" => param
                    .child_by_field_name("left")
                    .filter(|l| l.kind() == "identifier"),
                _ => None,
            };
            if let Some(name) = name {
                let text = ast::node_text(name, self.src).to_string();
                self.insert(scope, text, BindingKind::Param, None);
            }
        }
    }
}

/// True when an identifier reads a name, as opposed to declaring one or
/// naming a member. Property names, declaration targets, parameters, and
/// loop binders are not references.
pub fn is_reference(node: Node<'_>) -> bool {
    if node.kind() != "identifier" {
        return false;
    }
    let Some(parent) = node.parent() else {
        return true;
    };
    let is_field = |name: &str| parent.child_by_field_name(name) == Some(node);
    match parent.kind() {
        "variable_declarator" => !is_field("name"),
        "function_declaration"
        | "generator_function_declaration"
        | "function_expression"
        | "function"
        | "generator_function"
        | "class"
        | "class_declaration" => !is_field("name"),
        "formal_parameters" => false,
        "assignment_pattern" => {
            let in_params = parent
                .parent()
                .is_some_and(|gp| gp.kind() == "formal_parameters");
            !(in_params && is_field("left"))
        }
        "catch_clause" => !is_field("parameter"),
        "arrow_function" => !is_field("parameter"),
        "for_in_statement" => {
            !(parent.child_by_field_name("kind").is_some() && is_field("left"))
        }
        _ => true,
    }
}
