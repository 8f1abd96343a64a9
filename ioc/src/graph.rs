//! The transient dependency graph built for one construction request.
//!
//! An edge `a -> b` means `a` depends on `b`. Roots are nodes without
//! outgoing edges, i.e. nodes whose dependencies are all available.

use indexmap::{IndexMap, IndexSet};
use std::collections::HashMap;
use std::hash::Hash;

struct Node<N, T> {
  data: T,
  outgoing: IndexSet<N>,
  incoming: IndexSet<N>,
}

pub(crate) struct Graph<N, T> {
  nodes: IndexMap<N, Node<N, T>>,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Mark {
  OnPath,
  Done,
}

impl<N: Copy + Eq + Hash, T> Graph<N, T> {
  pub(crate) fn new() -> Self {
    Self {
      nodes: IndexMap::new(),
    }
  }

  /// Inserts `id` unless present. Returns `true` for a new node.
  pub(crate) fn insert_node(&mut self, id: N, data: T) -> bool {
    if self.nodes.contains_key(&id) {
      return false;
    }
    self.nodes.insert(
      id,
      Node {
        data,
        outgoing: IndexSet::new(),
        incoming: IndexSet::new(),
      },
    );
    true
  }

  /// Both endpoints must already be nodes; otherwise this is a no-op.
  pub(crate) fn insert_edge(&mut self, from: N, to: N) {
    if !self.nodes.contains_key(&from) || !self.nodes.contains_key(&to) {
      return;
    }
    if let Some(node) = self.nodes.get_mut(&from) {
      node.outgoing.insert(to);
    }
    if let Some(node) = self.nodes.get_mut(&to) {
      node.incoming.insert(from);
    }
  }

  pub(crate) fn get(&self, id: &N) -> Option<&T> {
    self.nodes.get(id).map(|node| &node.data)
  }

  pub(crate) fn remove_node(&mut self, id: &N) -> Option<T> {
    let node = self.nodes.shift_remove(id)?;
    for from in &node.incoming {
      if let Some(other) = self.nodes.get_mut(from) {
        other.outgoing.shift_remove(id);
      }
    }
    for to in &node.outgoing {
      if let Some(other) = self.nodes.get_mut(to) {
        other.incoming.shift_remove(id);
      }
    }
    Some(node.data)
  }

  /// Nodes with no outgoing edges, in insertion order.
  pub(crate) fn roots(&self) -> Vec<N> {
    self
      .nodes
      .iter()
      .filter(|(_, node)| node.outgoing.is_empty())
      .map(|(id, _)| *id)
      .collect()
  }

  pub(crate) fn is_empty(&self) -> bool {
    self.nodes.is_empty()
  }

  pub(crate) fn len(&self) -> usize {
    self.nodes.len()
  }

  /// Returns one cycle as a closed path (`a, b, a`), if any.
  ///
  /// Iterative depth-first search, so deep graphs cannot overflow the stack.
  pub(crate) fn find_cycle(&self) -> Option<Vec<N>> {
    let mut marks: HashMap<N, Mark> = HashMap::with_capacity(self.nodes.len());

    for &start in self.nodes.keys() {
      if marks.contains_key(&start) {
        continue;
      }
      marks.insert(start, Mark::OnPath);
      let mut path: Vec<(N, usize)> = vec![(start, 0)];

      while let Some(&(id, cursor)) = path.last() {
        let next = self
          .nodes
          .get(&id)
          .and_then(|node| node.outgoing.get_index(cursor))
          .copied();

        let Some(to) = next else {
          marks.insert(id, Mark::Done);
          path.pop();
          continue;
        };

        if let Some(top) = path.last_mut() {
          top.1 += 1;
        }
        match marks.get(&to) {
          Some(Mark::OnPath) => {
            let begin = path.iter().position(|(n, _)| *n == to).unwrap_or(0);
            let mut cycle: Vec<N> = path[begin..].iter().map(|(n, _)| *n).collect();
            cycle.push(to);
            return Some(cycle);
          }
          Some(Mark::Done) => {}
          None => {
            marks.insert(to, Mark::OnPath);
            path.push((to, 0));
          }
        }
      }
    }
    None
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn chain(graph: &mut Graph<u32, &'static str>, edges: &[(u32, u32)]) {
    for &(from, to) in edges {
      graph.insert_node(from, "n");
      graph.insert_node(to, "n");
      graph.insert_edge(from, to);
    }
  }

  #[test]
  fn roots_are_nodes_without_dependencies() {
    let mut graph = Graph::new();
    chain(&mut graph, &[(1, 2), (1, 3), (2, 4), (3, 4)]);

    assert_eq!(graph.roots(), vec![4]);
    graph.remove_node(&4);
    assert_eq!(graph.roots(), vec![2, 3]);
    graph.remove_node(&2);
    graph.remove_node(&3);
    assert_eq!(graph.roots(), vec![1]);
    graph.remove_node(&1);
    assert!(graph.is_empty());
  }

  #[test]
  fn insert_node_keeps_the_first_data() {
    let mut graph = Graph::new();
    assert!(graph.insert_node(7, "first"));
    assert!(!graph.insert_node(7, "second"));
    assert_eq!(graph.get(&7), Some(&"first"));
    assert_eq!(graph.len(), 1);
  }

  #[test]
  fn edges_to_unknown_nodes_are_ignored() {
    let mut graph: Graph<u32, ()> = Graph::new();
    graph.insert_node(1, ());
    graph.insert_edge(1, 2);
    assert_eq!(graph.roots(), vec![1]);
  }

  #[test]
  fn acyclic_graph_has_no_cycle() {
    let mut graph = Graph::new();
    chain(&mut graph, &[(1, 2), (1, 3), (2, 4), (3, 4)]);
    assert_eq!(graph.find_cycle(), None);
  }

  #[test]
  fn finds_a_closed_cycle_path() {
    let mut graph = Graph::new();
    chain(&mut graph, &[(1, 2), (2, 3), (3, 4), (4, 2)]);

    assert!(graph.roots().is_empty());
    assert_eq!(graph.find_cycle(), Some(vec![2, 3, 4, 2]));
  }

  #[test]
  fn finds_self_loops() {
    let mut graph = Graph::new();
    chain(&mut graph, &[(5, 5)]);
    assert_eq!(graph.find_cycle(), Some(vec![5, 5]));
  }

  #[test]
  fn deep_chains_do_not_overflow() {
    let mut graph: Graph<u32, &'static str> = Graph::new();
    let edges: Vec<(u32, u32)> = (0..100_000).map(|i| (i, i + 1)).collect();
    chain(&mut graph, &edges);
    graph.insert_edge(100_000, 0);

    let cycle = graph.find_cycle().expect("cycle");
    assert_eq!(cycle.len(), 100_002);
  }
}
