use std::cmp::Reverse;
use std::collections::{btree_set, BTreeSet, BinaryHeap, HashMap};

use crate::error::ResolveError;

use super::types::{Cycle, CycleMember, CycleReport, Ordering, PluginInfo};

/// Plugin ordering graph.
///
/// Nodes are addressed by insertion index; an edge `a -> b` means `a` must
/// finish each stage before `b` starts it.
#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    /// Node ids in insertion order
    nodes: Vec<String>,

    /// id -> insertion index
    index: HashMap<String, usize>,

    /// Successors: node -> nodes that run after it
    edges: Vec<BTreeSet<usize>>,

    /// Predecessors: node -> nodes it waits for
    reverse_edges: Vec<BTreeSet<usize>>,

    /// Declared constraints per node, kept for cycle reports
    declared: Vec<Vec<(Ordering, String)>>,
}

impl DependencyGraph {
    /// Build the graph from the plugin set.
    ///
    /// Constraints whose target is not in the set never become edges;
    /// validation reports them separately.
    pub fn from_plugins(plugins: &[PluginInfo]) -> Result<Self, ResolveError> {
        let mut graph = Self::default();

        for plugin in plugins {
            if graph.index.contains_key(&plugin.id) {
                return Err(ResolveError::DuplicatePlugin(plugin.id.clone()));
            }
            let node = graph.add_node(&plugin.id);
            graph.declared[node] = plugin
                .constraints
                .iter()
                .map(|c| (c.ordering, c.target.clone()))
                .collect();
        }

        for plugin in plugins {
            for constraint in &plugin.constraints {
                if !graph.index.contains_key(&constraint.target) {
                    continue;
                }
                match constraint.ordering {
                    Ordering::Before => graph.add_edge(&plugin.id, &constraint.target),
                    Ordering::After => graph.add_edge(&constraint.target, &plugin.id),
                    Ordering::None => {}
                }
            }
        }

        Ok(graph)
    }

    /// Edgeless graph over `ids`, used for the system-only fallback order.
    pub fn unordered<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut graph = Self::default();
        for id in ids {
            graph.add_node(id.as_ref());
        }
        graph
    }

    /// Add a node, returning its insertion index. Re-adding is a no-op.
    pub fn add_node(&mut self, id: &str) -> usize {
        if let Some(&existing) = self.index.get(id) {
            return existing;
        }
        let node = self.nodes.len();
        self.nodes.push(id.to_string());
        self.index.insert(id.to_string(), node);
        self.edges.push(BTreeSet::new());
        self.reverse_edges.push(BTreeSet::new());
        self.declared.push(Vec::new());
        node
    }

    /// Add `from -> to`. Unknown ids are ignored; duplicates collapse.
    pub fn add_edge(&mut self, from: &str, to: &str) {
        let (Some(&from), Some(&to)) = (self.index.get(from), self.index.get(to)) else {
            return;
        };
        self.edges[from].insert(to);
        self.reverse_edges[to].insert(from);
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    /// Node ids in insertion order.
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.nodes.iter().map(String::as_str)
    }

    pub fn has_edge(&self, from: &str, to: &str) -> bool {
        match (self.index.get(from), self.index.get(to)) {
            (Some(&from), Some(&to)) => self.edges[from].contains(&to),
            _ => false,
        }
    }

    pub fn edge_count(&self) -> usize {
        self.edges.iter().map(BTreeSet::len).sum()
    }

    /// Direct predecessors of `id`, ordered by insertion index.
    pub fn predecessors(&self, id: &str) -> Vec<String> {
        self.index
            .get(id)
            .map(|&node| {
                self.reverse_edges[node]
                    .iter()
                    .map(|&p| self.nodes[p].clone())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Topological sort using Kahn's algorithm.
    ///
    /// Among the nodes whose predecessors are all emitted, the one with the
    /// smallest insertion index goes next, so the result is a pure function
    /// of the input order and the edge set.
    ///
    /// # Time Complexity
    ///
    /// O((V + E) log V)
    pub fn topological_sort(&self) -> Result<Vec<String>, CycleReport> {
        let mut in_degree: Vec<usize> = self.reverse_edges.iter().map(BTreeSet::len).collect();

        let mut ready: BinaryHeap<Reverse<usize>> = in_degree
            .iter()
            .enumerate()
            .filter(|(_, &degree)| degree == 0)
            .map(|(node, _)| Reverse(node))
            .collect();

        let mut order = Vec::with_capacity(self.nodes.len());
        while let Some(Reverse(node)) = ready.pop() {
            order.push(self.nodes[node].clone());
            for &next in &self.edges[node] {
                in_degree[next] -= 1;
                if in_degree[next] == 0 {
                    ready.push(Reverse(next));
                }
            }
        }

        if order.len() != self.nodes.len() {
            return Err(self.cycle_report());
        }

        Ok(order)
    }

    /// Every non-trivial strongly connected component, plus self-loops.
    ///
    /// Groups are ordered by their lowest member index, members by index.
    pub fn cycle_report(&self) -> CycleReport {
        let mut groups = Tarjan::new(self).run();
        groups.retain(|group| group.len() > 1 || self.edges[group[0]].contains(&group[0]));
        for group in &mut groups {
            group.sort_unstable();
        }
        groups.sort_unstable_by_key(|group| group[0]);

        let cycles = groups
            .into_iter()
            .map(|group| {
                let in_cycle = |id: &str| {
                    self.index
                        .get(id)
                        .is_some_and(|node| group.binary_search(node).is_ok())
                };
                let members = group
                    .iter()
                    .map(|&node| CycleMember {
                        id: self.nodes[node].clone(),
                        dependencies: self.declared[node]
                            .iter()
                            .filter(|(_, target)| in_cycle(target.as_str()))
                            .cloned()
                            .collect(),
                    })
                    .collect();
                Cycle { members }
            })
            .collect();

        CycleReport { cycles }
    }
}

/// Tarjan's strongly connected components over the successor edges.
struct Tarjan<'a> {
    graph: &'a DependencyGraph,
    next_index: usize,
    index: Vec<Option<usize>>,
    lowlink: Vec<usize>,
    on_stack: Vec<bool>,
    stack: Vec<usize>,
    groups: Vec<Vec<usize>>,
}

impl<'a> Tarjan<'a> {
    fn new(graph: &'a DependencyGraph) -> Self {
        let n = graph.nodes.len();
        Self {
            graph,
            next_index: 0,
            index: vec![None; n],
            lowlink: vec![0; n],
            on_stack: vec![false; n],
            stack: Vec::new(),
            groups: Vec::new(),
        }
    }

    fn run(mut self) -> Vec<Vec<usize>> {
        for node in 0..self.graph.nodes.len() {
            if self.index[node].is_none() {
                self.connect(node);
            }
        }
        self.groups
    }

    /// Depth-first walk from `root` on an explicit frame stack: one frame per
    /// node on the current path, holding its unvisited successors.
    fn connect(&mut self, root: usize) {
        let graph = self.graph;
        let mut frames: Vec<(usize, btree_set::Iter<'a, usize>)> = Vec::new();
        self.visit(root);
        frames.push((root, graph.edges[root].iter()));

        while let Some((node, successors)) = frames.last_mut() {
            let node = *node;
            match successors.next() {
                Some(&next) => match self.index[next] {
                    None => {
                        self.visit(next);
                        frames.push((next, graph.edges[next].iter()));
                    }
                    Some(next_index) if self.on_stack[next] => {
                        self.lowlink[node] = self.lowlink[node].min(next_index);
                    }
                    Some(_) => {}
                },
                None => {
                    frames.pop();
                    if let Some(&(parent, _)) = frames.last() {
                        self.lowlink[parent] = self.lowlink[parent].min(self.lowlink[node]);
                    }
                    if Some(self.lowlink[node]) == self.index[node] {
                        self.close_group(node);
                    }
                }
            }
        }
    }

    fn visit(&mut self, node: usize) {
        self.index[node] = Some(self.next_index);
        self.lowlink[node] = self.next_index;
        self.next_index += 1;
        self.stack.push(node);
        self.on_stack[node] = true;
    }

    fn close_group(&mut self, root: usize) {
        let mut group = Vec::new();
        while let Some(member) = self.stack.pop() {
            self.on_stack[member] = false;
            group.push(member);
            if member == root {
                break;
            }
        }
        self.groups.push(group);
    }
}
