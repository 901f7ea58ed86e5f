//! Static analysis and rewriting of AngularJS dependency injection
//! annotations: finds injectable function positions and adds, rebuilds or
//! removes the `["dep", fn]` arrays and `name.$inject` statements around
//! them, touching nothing else.

pub mod annotate;
pub mod ast;
pub mod cli;
pub mod fragments;
pub mod matchers;
pub mod nginject;
pub mod plugins;
pub mod resolve;
pub mod rewrite;
pub mod scope;
pub mod sourcemap;
pub mod util;

pub use annotate::{AnnotateResult, Mode, Options, Rename, RunStats, annotate};
pub use plugins::Plugin;
