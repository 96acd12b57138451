//! Text rendering of dependency trees

use super::graph::DependencyGraph;

/// Render one tree per root product, roots and children sorted by name.
///
/// ```text
/// kbot
/// ├── kbot_ai
/// │   └── kbot_core
/// └── kbot_core
/// ```
///
/// A name that reappears below itself is printed once more with a
/// ` (circular)` marker and not expanded.
pub fn render_tree(graph: &DependencyGraph) -> String {
    let mut roots = graph.get_root_products();
    if roots.is_empty() {
        roots = graph.product_names().to_vec();
    }
    roots.sort();

    let mut lines = Vec::new();
    let mut ancestors = Vec::new();
    for root in &roots {
        render_node(graph, root, "", "", "", &mut ancestors, &mut lines);
    }
    lines.join("\n")
}

fn render_node(
    graph: &DependencyGraph,
    name: &str,
    prefix: &str,
    connector: &str,
    child_prefix: &str,
    ancestors: &mut Vec<String>,
    lines: &mut Vec<String>,
) {
    if ancestors.iter().any(|a| a == name) {
        lines.push(format!("{prefix}{connector}{name} (circular)"));
        return;
    }
    lines.push(format!("{prefix}{connector}{name}"));

    let mut dependencies = graph.get_dependencies(name);
    dependencies.sort();

    ancestors.push(name.to_string());
    let count = dependencies.len();
    for (i, dependency) in dependencies.iter().enumerate() {
        let last = i + 1 == count;
        let (connector, extension) = if last {
            ("└── ", "    ")
        } else {
            ("├── ", "│   ")
        };
        let grandchild_prefix = format!("{child_prefix}{extension}");
        render_node(
            graph,
            dependency,
            child_prefix,
            connector,
            &grandchild_prefix,
            ancestors,
            lines,
        );
    }
    ancestors.pop();
}
