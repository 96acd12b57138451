//! Dependency resolution for products
//!
//! This module handles:
//! - Building the dependency graph from declared parent lists
//! - Topological, breadth-first and layered orders
//! - Circular dependency detection
//! - Discovering and fetching the parent closure of a product
//! - Rendering the graph as a tree

pub mod discovery;
pub mod graph;
pub mod render;

pub use discovery::{Discovery, DiscoveryRequest};
pub use graph::DependencyGraph;
pub use render::render_tree;
