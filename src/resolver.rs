//! Dependency resolution
//!
//! Turns the unordered set of registrations into one construction order with
//! a depth-first walk. Each visit carries the chain of ancestors separately
//! from the set of already placed entries: meeting an ancestor again is a
//! cycle, meeting a placed entry is just a shared dependency.

use std::collections::{HashMap, HashSet};

use crate::error::{KeystoneError, Result};
use crate::registry::{Descriptor, RegistryEntry};

/// View of a registration the resolver needs
pub trait Node {
    fn name(&self) -> &str;
    fn dependencies(&self) -> &[String];
    fn optional_dependencies(&self) -> &[String];
    fn requires_gui(&self) -> bool;
}

impl<N: Node + ?Sized> Node for &N {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn dependencies(&self) -> &[String] {
        (**self).dependencies()
    }

    fn optional_dependencies(&self) -> &[String] {
        (**self).optional_dependencies()
    }

    fn requires_gui(&self) -> bool {
        (**self).requires_gui()
    }
}

impl Node for Descriptor {
    fn name(&self) -> &str {
        Descriptor::name(self)
    }

    fn dependencies(&self) -> &[String] {
        Descriptor::dependencies(self)
    }

    fn optional_dependencies(&self) -> &[String] {
        Descriptor::optional_dependencies(self)
    }

    fn requires_gui(&self) -> bool {
        self.gui_required()
    }
}

impl Node for RegistryEntry {
    fn name(&self) -> &str {
        self.type_name()
    }

    fn dependencies(&self) -> &[String] {
        RegistryEntry::dependencies(self)
    }

    fn optional_dependencies(&self) -> &[String] {
        RegistryEntry::optional_dependencies(self)
    }

    fn requires_gui(&self) -> bool {
        RegistryEntry::requires_gui(self)
    }
}

/// Drop every node that needs a graphical environment when none is present
///
/// Returns the kept nodes (registration order preserved) and the names of
/// the dropped ones.
pub fn filter_headless<N: Node>(nodes: Vec<N>, graphical: bool) -> (Vec<N>, Vec<String>) {
    if graphical {
        return (nodes, Vec::new());
    }
    let (dropped, kept): (Vec<N>, Vec<N>) = nodes.into_iter().partition(|n| n.requires_gui());
    let dropped = dropped.iter().map(|n| n.name().to_string()).collect::<Vec<_>>();
    for name in &dropped {
        tracing::info!("Headless run: dropping {}", name);
    }
    (kept, dropped)
}

struct Walk<'a, N> {
    nodes: &'a [N],
    by_name: HashMap<&'a str, usize>,
    path: Vec<usize>,
    placed: HashSet<usize>,
    order: Vec<usize>,
}

impl<'a, N: Node> Walk<'a, N> {
    fn visit(&mut self, index: usize) -> Result<()> {
        if let Some(position) = self.path.iter().position(|&i| i == index) {
            return Err(self.cycle_from(position, index));
        }
        if self.placed.contains(&index) {
            return Ok(());
        }

        let nodes = self.nodes;
        let node = &nodes[index];
        self.path.push(index);

        for dependency in node.dependencies() {
            let Some(dep) = self.by_name.get(dependency.as_str()).copied() else {
                return Err(KeystoneError::missing_dependency(node.name(), dependency));
            };
            self.visit(dep)?;
        }

        for dependency in node.optional_dependencies() {
            match self.by_name.get(dependency.as_str()).copied() {
                Some(dep) => self.visit(dep)?,
                None => tracing::debug!(
                    "{}: optional dependency {} is not registered, skipping",
                    node.name(),
                    dependency
                ),
            }
        }

        self.path.pop();
        if self.placed.insert(index) {
            self.order.push(index);
        }
        Ok(())
    }

    fn cycle_from(&self, position: usize, closing: usize) -> KeystoneError {
        let cycle = self.path[position..]
            .iter()
            .chain(std::iter::once(&closing))
            .map(|&i| self.nodes[i].name())
            .collect::<Vec<_>>()
            .join(" -> ");
        tracing::error!("Circular dependency detected: {}", cycle);
        KeystoneError::CircularDependency { cycle }
    }
}

/// Compute the construction order as indices into `nodes`
///
/// Every hard dependency, and every optional dependency that is present,
/// comes strictly before its dependent. Independent subgraphs keep
/// registration order. Optional edges take part in cycle detection like
/// hard ones.
///
/// # Errors
///
/// [`KeystoneError::MissingDependency`] when a hard dependency names an
/// unknown type, [`KeystoneError::CircularDependency`] when the walk comes
/// back to one of its own ancestors.
pub fn resolve<N: Node>(nodes: &[N]) -> Result<Vec<usize>> {
    let mut by_name = HashMap::with_capacity(nodes.len());
    for (index, node) in nodes.iter().enumerate() {
        if by_name.insert(node.name(), index).is_some() {
            return Err(KeystoneError::DuplicateRegistration {
                type_name: node.name().to_string(),
            });
        }
    }

    let mut walk = Walk {
        nodes,
        by_name,
        path: Vec::new(),
        placed: HashSet::with_capacity(nodes.len()),
        order: Vec::with_capacity(nodes.len()),
    };
    for index in 0..nodes.len() {
        walk.visit(index)?;
    }
    Ok(walk.order)
}

/// Same as [`resolve`], returning type names
pub fn resolve_names<N: Node>(nodes: &[N]) -> Result<Vec<String>> {
    Ok(resolve(nodes)?
        .into_iter()
        .map(|i| nodes[i].name().to_string())
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Spec {
        name: String,
        deps: Vec<String>,
        optional: Vec<String>,
        gui: bool,
    }

    impl Node for Spec {
        fn name(&self) -> &str {
            &self.name
        }

        fn dependencies(&self) -> &[String] {
            &self.deps
        }

        fn optional_dependencies(&self) -> &[String] {
            &self.optional
        }

        fn requires_gui(&self) -> bool {
            self.gui
        }
    }

    fn node(name: &str, deps: &[&str]) -> Spec {
        Spec {
            name: name.into(),
            deps: deps.iter().map(|d| d.to_string()).collect(),
            optional: Vec::new(),
            gui: false,
        }
    }

    fn with_optional(mut spec: Spec, optional: &[&str]) -> Spec {
        spec.optional = optional.iter().map(|d| d.to_string()).collect();
        spec
    }

    fn gui(mut spec: Spec) -> Spec {
        spec.gui = true;
        spec
    }

    fn position(order: &[String], name: &str) -> usize {
        order.iter().position(|n| n == name).unwrap()
    }

    #[test]
    fn test_chain_is_ordered_dependencies_first() {
        let nodes = vec![node("A", &["B"]), node("B", &["C"]), node("C", &[])];
        assert_eq!(resolve_names(&nodes).unwrap(), ["C", "B", "A"]);
    }

    #[test]
    fn test_independent_nodes_keep_registration_order() {
        let nodes = vec![node("X", &[]), node("Y", &[]), node("Z", &[])];
        assert_eq!(resolve_names(&nodes).unwrap(), ["X", "Y", "Z"]);
    }

    #[test]
    fn test_diamond_places_shared_dependency_once() {
        let nodes = vec![
            node("D", &["A", "B"]),
            node("A", &["C"]),
            node("B", &["C"]),
            node("C", &[]),
        ];
        let order = resolve_names(&nodes).unwrap();
        assert_eq!(order.len(), 4);
        assert_eq!(order.iter().filter(|n| *n == "C").count(), 1);
        assert!(position(&order, "C") < position(&order, "A"));
        assert!(position(&order, "C") < position(&order, "B"));
        assert!(position(&order, "A") < position(&order, "D"));
        assert!(position(&order, "B") < position(&order, "D"));
    }

    #[test]
    fn test_cycle_is_rejected_in_any_registration_order() {
        let rotations = [["A", "B", "C"], ["B", "C", "A"], ["C", "A", "B"]];
        for rotation in rotations {
            let nodes: Vec<Spec> = rotation
                .iter()
                .map(|&name| match name {
                    "A" => node("A", &["B"]),
                    "B" => node("B", &["C"]),
                    _ => node("C", &["A"]),
                })
                .collect();
            let err = resolve(&nodes).unwrap_err();
            let KeystoneError::CircularDependency { cycle } = err else {
                panic!("expected a cycle, got {err}");
            };
            for name in ["A", "B", "C"] {
                assert!(cycle.contains(name), "{cycle} should mention {name}");
            }
        }
    }

    #[test]
    fn test_cycle_report_closes_the_loop() {
        let nodes = vec![node("A", &["B"]), node("B", &["C"]), node("C", &["A"])];
        let err = resolve(&nodes).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Circular dependency detected: A -> B -> C -> A"
        );
    }

    #[test]
    fn test_self_dependency_is_a_cycle() {
        let nodes = vec![node("A", &["A"])];
        assert!(matches!(
            resolve(&nodes),
            Err(KeystoneError::CircularDependency { .. })
        ));
    }

    #[test]
    fn test_missing_hard_dependency_is_rejected() {
        let nodes = vec![node("A", &["Z"])];
        let err = resolve(&nodes).unwrap_err();
        assert!(matches!(
            err,
            KeystoneError::MissingDependency { ref type_name, ref dependency }
                if type_name == "A" && dependency == "Z"
        ));
    }

    #[test]
    fn test_missing_optional_dependency_is_skipped() {
        let nodes = vec![with_optional(node("A", &[]), &["Metrics"])];
        assert_eq!(resolve_names(&nodes).unwrap(), ["A"]);
    }

    #[test]
    fn test_present_optional_dependency_is_ordered_first() {
        let nodes = vec![with_optional(node("A", &[]), &["B"]), node("B", &[])];
        assert_eq!(resolve_names(&nodes).unwrap(), ["B", "A"]);
    }

    #[test]
    fn test_cycle_through_optional_edges_is_rejected() {
        let nodes = vec![
            with_optional(node("A", &[]), &["B"]),
            with_optional(node("B", &[]), &["A"]),
        ];
        assert!(matches!(
            resolve(&nodes),
            Err(KeystoneError::CircularDependency { .. })
        ));
    }

    #[test]
    fn test_headless_filter_drops_gui_nodes() {
        let nodes = vec![gui(node("Window", &[])), node("Config", &[])];
        let (kept, dropped) = filter_headless(nodes, false);
        assert_eq!(dropped, ["Window"]);
        assert_eq!(resolve_names(&kept).unwrap(), ["Config"]);
    }

    #[test]
    fn test_headless_filter_turns_gui_dependency_into_missing() {
        let nodes = vec![gui(node("Window", &[])), node("Toolbar", &["Window"])];
        let (kept, _) = filter_headless(nodes, false);
        assert!(matches!(
            resolve(&kept),
            Err(KeystoneError::MissingDependency { ref dependency, .. }) if dependency == "Window"
        ));
    }

    #[test]
    fn test_graphical_run_keeps_everything() {
        let nodes = vec![gui(node("Window", &[])), node("Toolbar", &["Window"])];
        let (kept, dropped) = filter_headless(nodes, true);
        assert!(dropped.is_empty());
        assert_eq!(resolve_names(&kept).unwrap(), ["Window", "Toolbar"]);
    }

    #[test]
    fn test_every_dependency_precedes_its_dependent() {
        let nodes = vec![
            node("Shell", &["Projects", "Plugins"]),
            with_optional(node("Plugins", &["Settings"]), &["Theme", "Telemetry"]),
            node("Projects", &["Settings", "Vcs"]),
            node("Vcs", &[]),
            node("Theme", &["Settings"]),
            node("Settings", &[]),
        ];
        let order = resolve_names(&nodes).unwrap();
        assert_eq!(order.len(), nodes.len());
        for spec in &nodes {
            let me = position(&order, &spec.name);
            for dep in spec.deps.iter().chain(&spec.optional) {
                if let Some(dep_pos) = order.iter().position(|n| n == dep) {
                    assert!(dep_pos < me, "{dep} must precede {}", spec.name);
                }
            }
        }
    }
}
