//! Skein Nodes - built-in node library for the Skein graph engine
//!
//! Every node type in this crate registers itself at link time through
//! `inventory`, so any binary that depends on `skein-nodes` can load the
//! full library with [`registry()`].
//!
//! # Categories
//!
//! - [`basic`]: entry node, primitive literals, conversions, control flow,
//!   math and logic, variables, collections, output surfaces
//! - [`llm`]: prompt templating and streaming chat completion

pub mod basic;
pub mod llm;

mod helpers;

use skein_engine::{NodeRegistry, Result};

/// Build a registry containing every built-in node linked into the binary
pub fn registry() -> Result<NodeRegistry> {
    NodeRegistry::from_inventory()
}
