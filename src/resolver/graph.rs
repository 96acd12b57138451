//! Dependency graph over a product collection
//!
//! Built once from the products' declared parent lists. Edges run from a
//! product to each of its parents (its dependencies); the reverse map holds
//! each name's dependents. Parent names that are not products themselves are
//! kept as graph nodes for closure queries but do not take part in ordering.
//!
//! ## Orders
//!
//! - **Topological** (Kahn's algorithm): dependencies first. Fails on a cycle.
//! - **Levels**: layer 0 has no dependencies, layer k sits one above its
//!   highest parent. A cycle stops the layering early without failing.
//! - **Breadth-first** from a root: the root first, then its parents, then
//!   theirs. This is the placement priority order used by the installer.

use std::collections::{BTreeSet, HashMap, HashSet, VecDeque};

use tracing::debug;

use crate::error::{InstallerError, Result};
use crate::product::{Product, ProductCollection};

#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    /// Product names in collection order
    products: Vec<String>,
    dependencies: HashMap<String, Vec<String>>,
    dependents: HashMap<String, Vec<String>>,
}

impl DependencyGraph {
    pub fn new(products: &[Product]) -> Self {
        let mut graph = Self::default();

        for product in products {
            let name = product.name().to_string();
            if graph.dependencies.contains_key(&name) {
                continue;
            }

            let mut parents: Vec<String> = Vec::new();
            for parent in &product.parents {
                if !parents.contains(parent) {
                    parents.push(parent.clone());
                }
            }

            for parent in &parents {
                graph
                    .dependents
                    .entry(parent.clone())
                    .or_default()
                    .push(name.clone());
            }

            graph.dependencies.insert(name.clone(), parents);
            graph.products.push(name);
        }

        graph
    }

    pub fn from_collection(collection: &ProductCollection) -> Self {
        Self::new(collection.as_slice())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.dependencies.contains_key(name)
    }

    pub fn product_names(&self) -> &[String] {
        &self.products
    }

    /// Immediate parents of `name`; empty for unknown names
    pub fn get_dependencies(&self, name: &str) -> Vec<String> {
        self.dependencies.get(name).cloned().unwrap_or_default()
    }

    /// Products that list `name` as a parent; empty for unknown names
    pub fn get_dependents(&self, name: &str) -> Vec<String> {
        self.dependents.get(name).cloned().unwrap_or_default()
    }

    /// Every name reachable through parent edges, each once
    pub fn get_all_dependencies(&self, name: &str) -> Vec<String> {
        Self::walk(name, &self.dependencies)
    }

    /// Every name that transitively depends on `name`, each once
    pub fn get_all_dependents(&self, name: &str) -> Vec<String> {
        Self::walk(name, &self.dependents)
    }

    fn walk(start: &str, edges: &HashMap<String, Vec<String>>) -> Vec<String> {
        let mut visited: HashSet<&str> = HashSet::from([start]);
        let mut stack = vec![start];
        let mut result = Vec::new();

        while let Some(current) = stack.pop() {
            for next in edges.get(current).into_iter().flatten() {
                if visited.insert(next.as_str()) {
                    result.push(next.clone());
                    stack.push(next.as_str());
                }
            }
        }

        result
    }

    pub fn has_circular_dependency(&self) -> bool {
        !self.find_cycles(true).is_empty()
    }

    /// Each distinct cycle once, as a closed path (`[a, b, a]`)
    pub fn get_circular_dependencies(&self) -> Vec<Vec<String>> {
        self.find_cycles(false)
    }

    fn find_cycles(&self, stop_at_first: bool) -> Vec<Vec<String>> {
        let mut search = CycleSearch {
            graph: self,
            visited: HashSet::new(),
            path: Vec::new(),
            seen_members: HashSet::new(),
            cycles: Vec::new(),
            stop_at_first,
        };

        for name in &self.products {
            if search.done() {
                break;
            }
            if !search.visited.contains(name.as_str()) {
                search.visit(name);
            }
        }

        search.cycles
    }

    /// Product names with every dependency ahead of its dependents
    pub fn get_topological_order(&self) -> Result<Vec<String>> {
        if let Some(cycle) = self.find_cycles(true).into_iter().next() {
            return Err(InstallerError::CircularDependency {
                chain: cycle.join(" -> "),
            });
        }

        let mut in_degree: HashMap<&str, usize> = self
            .products
            .iter()
            .map(|name| {
                let known = self.dependencies[name]
                    .iter()
                    .filter(|p| self.contains(p))
                    .count();
                (name.as_str(), known)
            })
            .collect();

        let mut queue: VecDeque<&str> = self
            .products
            .iter()
            .map(String::as_str)
            .filter(|name| in_degree[name] == 0)
            .collect();

        let mut order = Vec::with_capacity(self.products.len());
        while let Some(name) = queue.pop_front() {
            order.push(name.to_string());
            for dependent in self.dependents.get(name).into_iter().flatten() {
                if let Some(degree) = in_degree.get_mut(dependent.as_str()) {
                    *degree -= 1;
                    if *degree == 0 {
                        queue.push_back(dependent.as_str());
                    }
                }
            }
        }

        if order.len() != self.products.len() {
            let stuck: Vec<&str> = self
                .products
                .iter()
                .map(String::as_str)
                .filter(|name| !order.iter().any(|o| o == name))
                .collect();
            return Err(InstallerError::CircularDependency {
                chain: stuck.join(" -> "),
            });
        }

        Ok(order)
    }

    /// Products bucketed by dependency depth.
    ///
    /// Returns the layers completed so far when a cycle blocks progress.
    pub fn get_dependency_levels(&self) -> Vec<Vec<String>> {
        let mut levels: Vec<Vec<String>> = Vec::new();
        let mut placed: HashSet<String> = HashSet::new();
        let mut remaining: Vec<String> = self.products.clone();

        while !remaining.is_empty() {
            let level: Vec<String> = remaining
                .iter()
                .filter(|name| {
                    self.dependencies[name.as_str()]
                        .iter()
                        .filter(|p| self.contains(p))
                        .all(|p| placed.contains(p))
                })
                .cloned()
                .collect();

            if level.is_empty() {
                debug!(
                    "Dependency levels stopped with {} products unplaced",
                    remaining.len()
                );
                break;
            }

            placed.extend(level.iter().cloned());
            remaining.retain(|name| !placed.contains(name));
            levels.push(level);
        }

        levels
    }

    /// Breadth-first walk from `root`; empty when `root` is not a product
    pub fn get_bfs_order(&self, root: &str) -> Vec<String> {
        if !self.contains(root) {
            return Vec::new();
        }

        let mut visited: HashSet<&str> = HashSet::from([root]);
        let mut queue: VecDeque<&str> = VecDeque::from([root]);
        let mut order = Vec::new();

        while let Some(current) = queue.pop_front() {
            order.push(current.to_string());
            for parent in self.dependencies.get(current).into_iter().flatten() {
                if visited.insert(parent.as_str()) {
                    queue.push_back(parent.as_str());
                }
            }
        }

        order
    }

    /// The products of `collection` in breadth-first order from `root`
    pub fn get_bfs_ordered_products<'a>(
        &self,
        root: &str,
        collection: &'a ProductCollection,
    ) -> Vec<&'a Product> {
        self.get_bfs_order(root)
            .iter()
            .filter_map(|name| collection.get(name))
            .collect()
    }

    /// Products nothing depends on (no outgoing edge toward a dependent)
    pub fn get_root_products(&self) -> Vec<String> {
        self.products
            .iter()
            .filter(|name| {
                self.dependents
                    .get(name.as_str())
                    .is_none_or(|d| d.is_empty())
            })
            .cloned()
            .collect()
    }

    /// Products with no dependencies (no incoming edge from a parent)
    pub fn get_leaf_products(&self) -> Vec<String> {
        self.products
            .iter()
            .filter(|name| self.dependencies[name.as_str()].is_empty())
            .cloned()
            .collect()
    }

    /// Length of the longest dependency chain below `name`
    pub fn get_product_depth(&self, name: &str) -> usize {
        let mut on_path = HashSet::new();
        self.depth(name, &mut on_path)
    }

    fn depth<'a>(&'a self, name: &'a str, on_path: &mut HashSet<&'a str>) -> usize {
        if !on_path.insert(name) {
            return 0;
        }

        let depth = self
            .dependencies
            .get(name)
            .into_iter()
            .flatten()
            .map(|parent| 1 + self.depth(parent, on_path))
            .max()
            .unwrap_or(0);

        on_path.remove(name);
        depth
    }

    pub fn get_products_at_depth(&self, depth: usize) -> Vec<String> {
        self.products
            .iter()
            .filter(|name| self.get_product_depth(name) == depth)
            .cloned()
            .collect()
    }
}

/// Depth-first search state shared by cycle detection and enumeration
struct CycleSearch<'a> {
    graph: &'a DependencyGraph,
    visited: HashSet<&'a str>,
    path: Vec<&'a str>,
    seen_members: HashSet<BTreeSet<&'a str>>,
    cycles: Vec<Vec<String>>,
    stop_at_first: bool,
}

impl<'a> CycleSearch<'a> {
    fn done(&self) -> bool {
        self.stop_at_first && !self.cycles.is_empty()
    }

    fn visit(&mut self, name: &'a str) {
        let graph = self.graph;
        self.visited.insert(name);
        self.path.push(name);

        for parent in graph.dependencies.get(name).into_iter().flatten() {
            if self.done() {
                break;
            }
            let parent = parent.as_str();
            if let Some(start) = self.path.iter().position(|n| *n == parent) {
                let members: BTreeSet<&str> = self.path[start..].iter().copied().collect();
                if self.seen_members.insert(members) {
                    let mut cycle: Vec<String> =
                        self.path[start..].iter().map(|n| (*n).to_string()).collect();
                    cycle.push(parent.to_string());
                    self.cycles.push(cycle);
                }
            } else if !self.visited.contains(parent) {
                self.visit(parent);
            }
        }

        self.path.pop();
    }
}
