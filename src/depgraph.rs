//! Project dependency graph: closures, validation and build ordering.

use crate::error::{Error, Result};
use std::collections::{BTreeMap, HashSet, VecDeque};
use std::fmt::Display;
use std::hash::Hash;

/// Result of a closure walk.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Closure {
    /// Reachable projects in breadth-first order, excluding the root.
    pub dependencies: Vec<String>,
    /// Names reached but absent from the graph, distinct, first-seen order.
    pub unresolved: Vec<String>,
}

/// Project name to the ordered, duplicate-free list of its direct dependencies.
#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    edges: BTreeMap<String, Vec<String>>,
}

impl DependencyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a project node. Registering twice keeps existing edges.
    pub fn add_project(&mut self, name: &str) {
        self.edges.entry(name.to_string()).or_default();
    }

    /// Add an edge `project -> dependency`, registering `project` if needed.
    pub fn add_dependency(&mut self, project: &str, dependency: &str) {
        let deps = self.edges.entry(project.to_string()).or_default();
        if !deps.iter().any(|d| d == dependency) {
            deps.push(dependency.to_string());
        }
    }

    pub fn contains(&self, project: &str) -> bool {
        self.edges.contains_key(project)
    }

    pub fn direct_dependencies(&self, project: &str) -> &[String] {
        self.edges.get(project).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Every project reachable from `root`.
    pub fn full_dependencies(&self, root: &str) -> Closure {
        self.transitive_dependencies(root, |_| true)
    }

    /// Projects reachable from `root`, expanding a non-root node only when
    /// `is_transitive` accepts it.
    pub fn transitive_dependencies(&self, root: &str, is_transitive: impl Fn(&str) -> bool) -> Closure {
        let mut closure = Closure::default();
        let mut visited: HashSet<&str> = HashSet::new();
        let mut missing: HashSet<&str> = HashSet::new();
        let mut queue: VecDeque<&str> = VecDeque::new();
        queue.push_back(root);

        while let Some(name) = queue.pop_front() {
            if visited.contains(name) {
                continue;
            }
            let Some(deps) = self.edges.get(name) else {
                if missing.insert(name) {
                    closure.unresolved.push(name.to_string());
                }
                continue;
            };
            let is_root = visited.is_empty();
            if !is_root {
                closure.dependencies.push(name.to_string());
            }
            if is_root || is_transitive(name) {
                queue.extend(deps.iter().map(String::as_str));
            }
            visited.insert(name);
        }

        closure
    }

    /// Fail with every project's unresolved dependencies in one error.
    pub fn check_resolved(&self) -> Result<()> {
        let unresolved: BTreeMap<String, Vec<String>> = self
            .edges
            .keys()
            .filter_map(|name| {
                let closure = self.full_dependencies(name);
                (!closure.unresolved.is_empty()).then(|| (name.clone(), closure.unresolved))
            })
            .collect();
        if unresolved.is_empty() {
            Ok(())
        } else {
            Err(Error::UnresolvedDependencies(unresolved))
        }
    }

    /// The full closure of `root` ordered for a linker: every project before
    /// the projects it depends on. Unrelated projects keep breadth-first order.
    pub fn link_order(&self, root: &str) -> Result<Vec<String>> {
        let mut closure = self.full_dependencies(root).dependencies;
        closure.reverse();
        let mut order = partial_order(&closure, |name| {
            self.direct_dependencies(name)
                .iter()
                .filter(|d| closure.contains(d))
                .cloned()
                .collect()
        })?;
        order.reverse();
        Ok(order)
    }

    /// All projects ordered so that each comes after its dependencies.
    pub fn build_order(&self) -> Result<Vec<String>> {
        let names: Vec<String> = self.edges.keys().cloned().collect();
        partial_order(&names, |name| {
            self.direct_dependencies(name)
                .iter()
                .filter(|d| self.contains(d))
                .cloned()
                .collect()
        })
    }
}

/// Depth-first partial ordering.
///
/// Every item is placed after the items `preconditions` returns for it.
/// Items are visited in input order, so the output is stable with respect to
/// it. A precondition that is not itself in `items` is still placed in the
/// output ahead of its dependent.
pub fn partial_order<K, F>(items: &[K], preconditions: F) -> Result<Vec<K>>
where
    K: Clone + Eq + Hash + Display,
    F: Fn(&K) -> Vec<K>,
{
    struct Walk<'f, K, F> {
        preconditions: &'f F,
        temporary: HashSet<K>,
        permanent: HashSet<K>,
        sorted: Vec<K>,
    }

    impl<K, F> Walk<'_, K, F>
    where
        K: Clone + Eq + Hash + Display,
        F: Fn(&K) -> Vec<K>,
    {
        fn visit(&mut self, node: &K) -> Result<()> {
            if self.permanent.contains(node) {
                return Ok(());
            }
            if !self.temporary.insert(node.clone()) {
                return Err(Error::DependencyCycle(node.to_string()));
            }
            for m in (self.preconditions)(node) {
                self.visit(&m)?;
            }
            self.permanent.insert(node.clone());
            self.sorted.push(node.clone());
            Ok(())
        }
    }

    let mut walk = Walk {
        preconditions: &preconditions,
        temporary: HashSet::new(),
        permanent: HashSet::new(),
        sorted: Vec::with_capacity(items.len()),
    };
    for item in items {
        walk.visit(item)?;
    }
    Ok(walk.sorted)
}
