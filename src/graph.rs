//! Dependency graph construction for generated projects.
//!
//! Projects live in an arena ([`ProjectGraph`]) and refer to each other by
//! [`ProjectId`]. [`DependencyGraphBuilder`] creates exactly one node per
//! qualified target, always after the nodes of its dependencies, and refuses
//! cycles.

use std::collections::{HashMap, HashSet};

use camino::{Utf8Component, Utf8Path, Utf8PathBuf};
use indexmap::IndexMap;

use crate::error::GraphError;
use crate::model::{QualifiedTarget, TargetSpec};

/// Index of a node in a [`ProjectGraph`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProjectId(usize);

impl ProjectId {
    /// Position of the node in creation order.
    #[must_use]
    pub const fn index(self) -> usize {
        self.0
    }
}

/// A node of the project arena.
#[derive(Debug)]
pub struct ProjectNode<N> {
    /// Target the node was created for.
    pub target: QualifiedTarget,
    /// Direct dependencies, already present in the arena.
    pub dependencies: Vec<ProjectId>,
    /// Backend-specific data.
    pub payload: N,
}

/// Arena of project nodes in creation (dependency post-) order.
#[derive(Debug)]
pub struct ProjectGraph<N> {
    nodes: Vec<ProjectNode<N>>,
    index: HashMap<QualifiedTarget, ProjectId>,
}

impl<N> Default for ProjectGraph<N> {
    fn default() -> Self {
        Self {
            nodes: Vec::new(),
            index: HashMap::new(),
        }
    }
}

impl<N> ProjectGraph<N> {
    /// Node for `id`.
    ///
    /// Ids are only handed out by the arena that owns them, so lookups made
    /// with them always succeed.
    #[must_use]
    pub fn node(&self, id: ProjectId) -> Option<&ProjectNode<N>> {
        self.nodes.get(id.0)
    }

    /// Id assigned to `target`, if it has been created.
    #[must_use]
    pub fn id_of(&self, target: &QualifiedTarget) -> Option<ProjectId> {
        self.index.get(target).copied()
    }

    /// Nodes in creation order.
    pub fn iter(&self) -> impl Iterator<Item = (ProjectId, &ProjectNode<N>)> {
        self.nodes.iter().enumerate().map(|(idx, node)| (ProjectId(idx), node))
    }

    /// Number of nodes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the arena holds no nodes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    fn push(&mut self, target: QualifiedTarget, dependencies: Vec<ProjectId>, payload: N) -> ProjectId {
        let id = ProjectId(self.nodes.len());
        self.index.insert(target.clone(), id);
        self.nodes.push(ProjectNode {
            target,
            dependencies,
            payload,
        });
        id
    }
}

/// Supplies dependency lists and node payloads to a [`DependencyGraphBuilder`].
pub trait ProjectFactory {
    /// Payload stored in each node.
    type Node;
    /// Error type; must absorb graph errors raised by the builder.
    type Error: From<GraphError>;

    /// Direct dependencies of `target`, in declaration order.
    ///
    /// # Errors
    ///
    /// Implementations report unknown targets or lookup failures.
    fn dependencies_of(&self, target: &QualifiedTarget) -> Result<Vec<QualifiedTarget>, Self::Error>;

    /// Create the payload for `target` once all dependencies exist.
    ///
    /// # Errors
    ///
    /// Implementations report backend failures.
    fn create(
        &mut self,
        target: &QualifiedTarget,
        dependencies: &[ProjectId],
        graph: &ProjectGraph<Self::Node>,
    ) -> Result<Self::Node, Self::Error>;
}

/// Memoised post-order builder with a cycle guard.
pub struct DependencyGraphBuilder<F: ProjectFactory> {
    factory: F,
    graph: ProjectGraph<F::Node>,
    stack: Vec<QualifiedTarget>,
}

impl<F: ProjectFactory> DependencyGraphBuilder<F> {
    /// Start with an empty arena.
    pub fn new(factory: F) -> Self {
        Self {
            factory,
            graph: ProjectGraph::default(),
            stack: Vec::new(),
        }
    }

    /// Ensure a node exists for `target` and return its id.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::Cycle`] when `target` is reached again while
    /// its own dependencies are being built, or any factory error.
    pub fn build(&mut self, target: &QualifiedTarget) -> Result<ProjectId, F::Error> {
        if let Some(id) = self.graph.id_of(target) {
            return Ok(id);
        }
        if let Some(pos) = self.stack.iter().position(|t| t == target) {
            let mut cycle: Vec<QualifiedTarget> = self.stack.iter().skip(pos).cloned().collect();
            cycle.push(target.clone());
            return Err(GraphError::Cycle {
                cycle: canonicalize_cycle(cycle),
            }
            .into());
        }

        let dependencies = self.factory.dependencies_of(target)?;
        self.stack.push(target.clone());
        let built = self.build_all(&dependencies);
        self.stack.pop();
        let dependency_ids = built?;

        let payload = self.factory.create(target, &dependency_ids, &self.graph)?;
        Ok(self.graph.push(target.clone(), dependency_ids, payload))
    }

    fn build_all(&mut self, targets: &[QualifiedTarget]) -> Result<Vec<ProjectId>, F::Error> {
        let mut ids = Vec::with_capacity(targets.len());
        for dep in targets {
            let id = self.build(dep)?;
            if !ids.contains(&id) {
                ids.push(id);
            }
        }
        Ok(ids)
    }

    /// Arena built so far.
    pub const fn graph(&self) -> &ProjectGraph<F::Node> {
        &self.graph
    }

    /// Consume the builder, returning the arena and the factory.
    pub fn finish(self) -> (ProjectGraph<F::Node>, F) {
        (self.graph, self.factory)
    }
}

/// Rotate a closed cycle so it starts (and ends) at its smallest member.
fn canonicalize_cycle<T: Ord + Clone>(mut cycle: Vec<T>) -> Vec<T> {
    if cycle.len() < 2 {
        return cycle;
    }
    let len = cycle.len() - 1;
    let start = cycle
        .iter()
        .take(len)
        .enumerate()
        .min_by(|(_, a), (_, b)| a.cmp(b))
        .map_or(0, |(idx, _)| idx);
    let (prefix, suffix) = cycle.split_at_mut(len);
    prefix.rotate_left(start);
    if let (Some(first), Some(slot)) = (prefix.first().cloned(), suffix.first_mut()) {
        slot.clone_from(&first);
    }
    cycle
}

/// Transitive dependencies of `roots` that are not roots themselves, in
/// discovery order.
///
/// # Errors
///
/// Returns [`GraphError::UnknownTarget`] for a dependency with no declaration.
pub fn deep_dependencies<S: std::hash::BuildHasher>(
    targets: &IndexMap<QualifiedTarget, TargetSpec, S>,
    roots: &[QualifiedTarget],
) -> Result<Vec<QualifiedTarget>, GraphError> {
    let mut seen: HashSet<&QualifiedTarget> = roots.iter().collect();
    let mut pending: Vec<&QualifiedTarget> = roots.iter().rev().collect();
    let mut found = Vec::new();
    while let Some(current) = pending.pop() {
        let Some(spec) = targets.get(current) else {
            continue;
        };
        for dep in &spec.dependencies {
            if !targets.contains_key(dep) {
                return Err(GraphError::UnknownTarget {
                    target: dep.clone(),
                    dependent: current.clone(),
                });
            }
            if seen.insert(dep) {
                found.push(dep.clone());
                pending.push(dep);
            }
        }
    }
    Ok(found)
}

fn normal_segments(path: &Utf8Path) -> Vec<&str> {
    let mut segments: Vec<&str> = Vec::new();
    for component in path.components() {
        match component {
            Utf8Component::CurDir => {}
            Utf8Component::ParentDir => {
                if matches!(segments.last(), Some(last) if *last != "..") {
                    segments.pop();
                } else {
                    segments.push("..");
                }
            }
            other => segments.push(other.as_str()),
        }
    }
    segments
}

/// Express `path` relative to the directory `base`.
///
/// Both arguments are relative to the same root. `.` and `..` components
/// are resolved lexically.
///
/// ```
/// use camino::Utf8Path;
/// use projgen::graph::relative_path;
///
/// let rel = relative_path(Utf8Path::new("base/base.vcproj"), Utf8Path::new("chrome"));
/// assert_eq!(rel, "../base/base.vcproj");
/// ```
#[must_use]
pub fn relative_path(path: &Utf8Path, base: &Utf8Path) -> Utf8PathBuf {
    let path_segments = normal_segments(path);
    let base_segments = normal_segments(base);
    let common = path_segments
        .iter()
        .zip(&base_segments)
        .take_while(|(a, b)| a == b)
        .count();
    let mut out = Utf8PathBuf::new();
    for _ in common..base_segments.len() {
        out.push("..");
    }
    for segment in path_segments.iter().skip(common) {
        out.push(segment);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn qt(name: &str) -> QualifiedTarget {
        QualifiedTarget::new("a.gyp", name)
    }

    struct MapFactory {
        edges: HashMap<QualifiedTarget, Vec<QualifiedTarget>>,
        created: Vec<QualifiedTarget>,
    }

    impl MapFactory {
        fn new(edges: &[(&str, &[&str])]) -> Self {
            Self {
                edges: edges
                    .iter()
                    .map(|(from, to)| (qt(from), to.iter().map(|t| qt(t)).collect()))
                    .collect(),
                created: Vec::new(),
            }
        }
    }

    impl ProjectFactory for MapFactory {
        type Node = String;
        type Error = GraphError;

        fn dependencies_of(&self, target: &QualifiedTarget) -> Result<Vec<QualifiedTarget>, GraphError> {
            Ok(self.edges.get(target).cloned().unwrap_or_default())
        }

        fn create(
            &mut self,
            target: &QualifiedTarget,
            _dependencies: &[ProjectId],
            _graph: &ProjectGraph<String>,
        ) -> Result<String, GraphError> {
            self.created.push(target.clone());
            Ok(target.target_name.clone())
        }
    }

    #[test]
    fn shared_dependency_is_created_once() {
        let factory = MapFactory::new(&[("a", &["b", "c"]), ("b", &["d"]), ("c", &["d"])]);
        let mut builder = DependencyGraphBuilder::new(factory);
        let root = builder.build(&qt("a")).expect("build");
        let (graph, factory) = builder.finish();
        assert_eq!(graph.len(), 4);
        let names: Vec<_> = factory.created.iter().map(|t| t.target_name.as_str()).collect();
        assert_eq!(names, ["d", "b", "c", "a"]);
        let d = graph.id_of(&qt("d")).expect("d exists");
        let b = graph.node(graph.id_of(&qt("b")).expect("b")).expect("node b");
        let c = graph.node(graph.id_of(&qt("c")).expect("c")).expect("node c");
        assert_eq!(b.dependencies, vec![d]);
        assert_eq!(c.dependencies, vec![d]);
        assert_eq!(graph.node(root).map(|n| n.payload.as_str()), Some("a"));
    }

    #[test]
    fn cycle_is_reported_from_smallest_member() {
        let factory = MapFactory::new(&[("c", &["a"]), ("a", &["b"]), ("b", &["c"])]);
        let mut builder = DependencyGraphBuilder::new(factory);
        let err = builder.build(&qt("c")).expect_err("cycle");
        let GraphError::Cycle { cycle } = err else {
            panic!("expected a cycle");
        };
        let names: Vec<_> = cycle.iter().map(|t| t.target_name.as_str()).collect();
        assert_eq!(names, ["a", "b", "c", "a"]);
    }

    #[test]
    fn self_dependency_is_a_cycle() {
        let factory = MapFactory::new(&[("a", &["a"])]);
        let mut builder = DependencyGraphBuilder::new(factory);
        assert!(matches!(builder.build(&qt("a")), Err(GraphError::Cycle { .. })));
    }

    #[test]
    fn repeated_builds_reuse_nodes() {
        let factory = MapFactory::new(&[("a", &["b"])]);
        let mut builder = DependencyGraphBuilder::new(factory);
        let first = builder.build(&qt("b")).expect("b");
        builder.build(&qt("a")).expect("a");
        assert_eq!(builder.build(&qt("b")).expect("b again"), first);
        assert_eq!(builder.graph().len(), 2);
    }

    #[rstest]
    #[case("base/base.vcproj", "chrome", "../base/base.vcproj")]
    #[case("base/base.vcproj", "base", "base.vcproj")]
    #[case("a/b/c.vcproj", "", "a/b/c.vcproj")]
    #[case("./x/../y/z.vcproj", "y", "z.vcproj")]
    #[case("../third_party/z.vcproj", "src/app", "../../../third_party/z.vcproj")]
    fn relative_paths(#[case] path: &str, #[case] base: &str, #[case] expected: &str) {
        assert_eq!(relative_path(Utf8Path::new(path), Utf8Path::new(base)), expected);
    }
}
