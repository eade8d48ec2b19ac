/*!
Mesh (independent loop) detection.

This module derives the meshes of a circuit from its topology alone. The circuit multigraph is first
collapsed into a simple graph, for which a spanning forest is built. Every edge not contained in the forest
closes exactly one fundamental cycle together with the forest path between its end nodes. Parallel branches
are invisible to the simple graph, so for each node pair with `k > 1` branches, `k - 1` additional two-step
meshes are appended which pair consecutive branches of the group.

The resulting number of meshes is `E - N + C` (branches minus nodes plus connected components), which is
exactly the number of independent voltage law equations of the circuit.
*/

use std::collections::{BTreeMap, BTreeSet, VecDeque};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::branch::BranchKey;

/**
One step of a [`Mesh`]: the branch with parallel index `index` between `from` and `to`, traversed from
`from` to `to`. The step is ascending if `from < to`, i.e. if it follows the branch's own orientation.

# Features

This struct can be serialized / deserialized via the [serde](https://crates.io/crates/serde)
crate if the `serde` feature is enabled.
 */
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Step<N> {
    pub from: N,
    pub to: N,
    pub index: usize,
}

impl<N: Ord + Clone> Step<N> {
    pub fn new(from: N, to: N, index: usize) -> Self {
        return Self { from, to, index };
    }

    pub fn is_ascending(&self) -> bool {
        return self.from < self.to;
    }

    /// Key of the traversed branch.
    pub fn branch(&self) -> BranchKey<N> {
        if self.is_ascending() {
            return BranchKey::new(self.from.clone(), self.to.clone(), self.index);
        }
        return BranchKey::new(self.to.clone(), self.from.clone(), self.index);
    }
}

/**
A closed loop of the circuit, given as a cyclic sequence of [`Step`]s. The `to` node of each step is the
`from` node of the next one, and the last step returns to the `from` node of the first.

# Features

This struct can be serialized / deserialized via the [serde](https://crates.io/crates/serde)
crate if the `serde` feature is enabled.
 */
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Mesh<N> {
    steps: Vec<Step<N>>,
}

impl<N: Ord + Clone> Mesh<N> {
    /// Builds the mesh visiting `nodes` in order and returning to the first one, using the branch with
    /// parallel index `index_of(a, b)` between consecutive nodes.
    fn from_cycle(nodes: &[N], index_of: impl Fn(&N, &N) -> usize) -> Self {
        let steps = (0..nodes.len())
            .map(|i| {
                let from = &nodes[i];
                let to = &nodes[(i + 1) % nodes.len()];
                Step::new(from.clone(), to.clone(), index_of(from, to))
            })
            .collect();
        return Mesh { steps };
    }

    pub fn steps(&self) -> &[Step<N>] {
        return self.steps.as_slice();
    }

    pub fn len(&self) -> usize {
        return self.steps.len();
    }

    pub fn is_empty(&self) -> bool {
        return self.steps.is_empty();
    }

    pub fn contains(&self, step: &Step<N>) -> bool {
        return self.steps.contains(step);
    }

    /**
    Coupling between the mesh and a branch:
    * 1: the mesh traverses the branch along its orientation (ascending),
    * -1: the mesh traverses the branch against its orientation,
    * 0: the branch is not part of the mesh.
     */
    pub fn coupling(&self, key: &BranchKey<N>) -> i32 {
        return self
            .steps
            .iter()
            .filter(|step| step.index == key.index)
            .map(|step| {
                if step.from == key.first && step.to == key.second {
                    1
                } else if step.from == key.second && step.to == key.first {
                    -1
                } else {
                    0
                }
            })
            .sum();
    }
}

/**
A spanning forest of the simple graph underlying the circuit, built by breadth-first search starting from
the smallest unvisited node.
 */
pub(crate) struct SpanningForest<N> {
    parent: BTreeMap<N, Option<N>>,
    depth: BTreeMap<N, usize>,
    component: BTreeMap<N, usize>,
    component_count: usize,
}

impl<N: Ord + Clone> SpanningForest<N> {
    pub(crate) fn new<'a>(pairs: impl Iterator<Item = &'a (N, N)>) -> Self
    where
        N: 'a,
    {
        let mut adjacency: BTreeMap<N, BTreeSet<N>> = BTreeMap::new();
        for (a, b) in pairs {
            adjacency.entry(a.clone()).or_default().insert(b.clone());
            adjacency.entry(b.clone()).or_default().insert(a.clone());
        }

        let mut forest = SpanningForest {
            parent: BTreeMap::new(),
            depth: BTreeMap::new(),
            component: BTreeMap::new(),
            component_count: 0,
        };

        for root in adjacency.keys() {
            if forest.parent.contains_key(root) {
                continue;
            }
            let id = forest.component_count;
            forest.component_count += 1;
            forest.parent.insert(root.clone(), None);
            forest.depth.insert(root.clone(), 0);
            forest.component.insert(root.clone(), id);

            let mut queue = VecDeque::from([root.clone()]);
            while let Some(node) = queue.pop_front() {
                let depth = forest.depth[&node];
                for neighbor in adjacency[&node].iter() {
                    if forest.parent.contains_key(neighbor) {
                        continue;
                    }
                    forest.parent.insert(neighbor.clone(), Some(node.clone()));
                    forest.depth.insert(neighbor.clone(), depth + 1);
                    forest.component.insert(neighbor.clone(), id);
                    queue.push_back(neighbor.clone());
                }
            }
        }
        return forest;
    }

    pub(crate) fn component_count(&self) -> usize {
        return self.component_count;
    }

    /// Connected component id of every node.
    pub(crate) fn components(&self) -> &BTreeMap<N, usize> {
        return &self.component;
    }

    fn is_tree_edge(&self, a: &N, b: &N) -> bool {
        return self.parent.get(b).is_some_and(|p| p.as_ref() == Some(a))
            || self.parent.get(a).is_some_and(|p| p.as_ref() == Some(b));
    }

    fn parent_of(&self, node: &N) -> Option<&N> {
        return self.parent.get(node).and_then(Option::as_ref);
    }

    /**
    Returns the nodes on the forest path from `a` to `b`, both included. Both nodes must belong to the same
    tree.
     */
    fn path(&self, a: &N, b: &N) -> Vec<N> {
        let depth = |n: &N| self.depth.get(n).copied().unwrap_or(0);
        let mut from_a = vec![a.clone()];
        let mut from_b = vec![b.clone()];
        let (mut x, mut y) = (a.clone(), b.clone());

        while depth(&x) > depth(&y) {
            let Some(p) = self.parent_of(&x) else { break };
            x = p.clone();
            from_a.push(x.clone());
        }
        while depth(&y) > depth(&x) {
            let Some(p) = self.parent_of(&y) else { break };
            y = p.clone();
            from_b.push(y.clone());
        }
        while x != y {
            let (Some(px), Some(py)) = (self.parent_of(&x), self.parent_of(&y)) else {
                break;
            };
            x = px.clone();
            y = py.clone();
            from_a.push(x.clone());
            from_b.push(y.clone());
        }

        // Both halves end at the common ancestor; keep it once
        from_b.pop();
        from_a.extend(from_b.into_iter().rev());
        return from_a;
    }
}

/**
Computes the meshes of a circuit from its branch groups, keyed by node pair and holding the parallel
indices of the group in ascending order.

Fundamental cycles come first (in order of their closing node pair), followed by the parallel branch
meshes. The steps of a fundamental cycle use the lowest-indexed branch of each node pair.
 */
pub(crate) fn find_meshes<N: Ord + Clone>(groups: &BTreeMap<(N, N), Vec<usize>>) -> Vec<Mesh<N>> {
    let forest = SpanningForest::new(groups.keys());
    let lowest_index = |a: &N, b: &N| {
        let pair = if a < b {
            (a.clone(), b.clone())
        } else {
            (b.clone(), a.clone())
        };
        return groups
            .get(&pair)
            .and_then(|indices| indices.first().copied())
            .unwrap_or(0);
    };

    let mut meshes = Vec::new();

    // One fundamental cycle per edge outside the spanning forest. The closing edge is traversed
    // from `b` to `a`.
    for (a, b) in groups.keys() {
        if forest.is_tree_edge(a, b) {
            continue;
        }
        let cycle = forest.path(a, b);
        meshes.push(Mesh::from_cycle(&cycle, lowest_index));
    }

    // Loops formed by parallel branches
    for ((a, b), indices) in groups.iter() {
        for pair in indices.windows(2) {
            meshes.push(Mesh {
                steps: vec![
                    Step::new(a.clone(), b.clone(), pair[0]),
                    Step::new(b.clone(), a.clone(), pair[1]),
                ],
            });
        }
    }

    return meshes;
}
