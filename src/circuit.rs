/*!
The circuit multigraph.

This module provides the [`Circuit`] struct, which owns the nodes and branches of a DC linear circuit and
keeps its derived state (meshes and the solved branch unknowns) up to date. Every mutation runs the full
pipeline validate → mutate → recompute meshes → solve before returning, so a [`Circuit`] never exposes a
partially updated state. Furthermore, this module contains the [`CircuitError`] enum covering all malformed
inputs as well as the [`CircuitConfig`] struct.
*/

use std::{collections::BTreeMap, fmt};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::{
    branch::{Branch, BranchDisplay, BranchKey, Components, Type},
    kirchhoff,
    mesh::{Mesh, find_meshes},
    value::ExpressionError,
};

/**
An error returned from a failed operation on a [`Circuit`].

All errors are raised before the circuit is modified; a failed call leaves the circuit unchanged.
An unstable circuit is not an error: its unknowns are reported as
[`Resolution::Indeterminate`](crate::Resolution::Indeterminate) instead.
 */
#[derive(Debug, Clone, PartialEq)]
pub enum CircuitError<N> {
    /**
    The branch end points are not in strictly ascending order (`first < second`). This also rejects
    short-circuited branches where both end points are identical.
     */
    Ordering { first: N, second: N },
    /**
    The branch components do not leave exactly one of resistance, voltage and current unknown.
    Variant contains the number of supplied components.
     */
    UnknownCount { supplied: usize },
    /**
    A supplied component could not be read as a value.
     */
    Expression {
        component: Type,
        source: ExpressionError,
    },
    /// No branch with the given key exists.
    BranchNotFound { key: BranchKey<N> },
    /// The node is not part of the circuit.
    NodeNotFound { node: N },
    /// There is no path between the two nodes.
    Disconnected { from: N, to: N },
}

impl<N: fmt::Debug> fmt::Display for CircuitError<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CircuitError::Ordering { first, second } => write!(
                f,
                "branch ({first:?}, {second:?}) does not satisfy the order '<' between its nodes"
            ),
            CircuitError::UnknownCount { supplied } => write!(
                f,
                "branch must leave exactly one of resistance, voltage and current unknown \
                 ({supplied} of 3 components supplied)"
            ),
            CircuitError::Expression { component, source } => {
                write!(f, "invalid {component} value: {source}")
            }
            CircuitError::BranchNotFound { key } => write!(f, "branch {key} does not exist"),
            CircuitError::NodeNotFound { node } => write!(f, "node {node:?} does not exist"),
            CircuitError::Disconnected { from, to } => {
                write!(f, "nodes {from:?} and {to:?} are not connected")
            }
        }
    }
}

impl<N: fmt::Debug> std::error::Error for CircuitError<N> {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CircuitError::Expression { source, .. } => Some(source),
            _ => None,
        }
    }
}

/**
Unit labels used when displaying branch components.

The defaults correspond to the usual scaling for small DC circuits: volts, kiloohms and milliamperes
(`1 V / 1 kΩ = 1 mA`).

# Features

This struct can be serialized / deserialized via the [serde](https://crates.io/crates/serde)
crate if the `serde` feature is enabled.
 */
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Units {
    pub voltage: String,
    pub resistance: String,
    pub current: String,
}

impl Default for Units {
    fn default() -> Self {
        return Self {
            voltage: "V".to_string(),
            resistance: "kΩ".to_string(),
            current: "mA".to_string(),
        };
    }
}

/**
Selects the node of each connected component whose current law equation is left out of the equation system.
The current law equations of all nodes of a component are linearly dependent, so one of them has to be
dropped; which one does not change the solution.

# Features

This enum can be serialized / deserialized via the [serde](https://crates.io/crates/serde)
crate if the `serde` feature is enabled.
 */
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum ReferenceNode {
    /// The smallest node of each component.
    First,
    /// The largest node of each component.
    #[default]
    Last,
}

/**
Configuration of a [`Circuit`].

# Features

This struct can be serialized / deserialized via the [serde](https://crates.io/crates/serde)
crate if the `serde` feature is enabled.
 */
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct CircuitConfig {
    pub units: Units,
    pub reference_node: ReferenceNode,
}

/**
A DC linear circuit modelled as a multigraph.

# Overview

Each branch of the circuit connects two nodes and carries a resistance, a voltage source and a current. Two
of these are given when the branch is added, the third one is the unknown of the branch. Whenever the
branches change, the circuit derives its independent loops ([`Circuit::meshes`]), assembles one equation per
independent node (Kirchhoff's current law) and one per mesh (Kirchhoff's voltage law), and solves the
resulting linear system for all unknowns at once. Values can be numbers or algebraic expressions; see
[`Value`](crate::Value).

Nodes are arbitrary totally ordered labels (integers, characters, strings, ...). They are created
implicitly by the first branch using them and removed with the last one. Their order fixes the sign
convention: see the [branch module docs](crate::branch).

# Examples

Three parallel branches between the nodes 1 and 2, each with a voltage source and a resistance:
```
use kirchhoff_circuit::{BranchKey, Circuit, Components};

let mut circuit = Circuit::new();
circuit.add_branch((1, 2), Components::new().resistance(3).voltage(10)).unwrap();
circuit.add_branch((1, 2), Components::new().resistance(10).voltage(7)).unwrap();
circuit.add_branch((1, 2), Components::new().resistance(2).voltage(5)).unwrap();

assert_eq!(circuit.mesh_count(), 2);
let current = |index| {
    circuit
        .branch(&BranchKey::new(1, 2, index))
        .and_then(|b| b.current())
        .and_then(|c| c.as_f64())
        .unwrap()
};
assert_eq!(current(0), 1.0);
assert_eq!(current(1), 0.0);
assert_eq!(current(2), -1.0);
```
 */
#[derive(Debug, Clone)]
pub struct Circuit<N> {
    branches: BTreeMap<(N, N), Vec<Branch<N>>>,
    meshes: Vec<Mesh<N>>,
    solved: bool,
    config: CircuitConfig,
}

impl<N: Ord + Clone + fmt::Debug> Default for Circuit<N> {
    fn default() -> Self {
        return Self::new();
    }
}

impl<N: Ord + Clone + fmt::Debug> Circuit<N> {
    /// Creates an empty circuit with the default configuration.
    pub fn new() -> Self {
        return Self::with_config(CircuitConfig::default());
    }

    pub fn with_config(config: CircuitConfig) -> Self {
        return Self {
            branches: BTreeMap::new(),
            meshes: Vec::new(),
            solved: true,
            config,
        };
    }

    /**
    Builds a circuit from a list of branches, stopping at the first invalid one.

    # Examples

    ```
    use kirchhoff_circuit::{Circuit, Components};

    let circuit = Circuit::from_branches([
        (('a', 'b'), Components::new().voltage(9).resistance(0)),
        (('b', 'c'), Components::new().resistance(3).current(1)),
        (('a', 'c'), Components::new().resistance(6).voltage(0)),
    ])
    .unwrap();
    assert_eq!(circuit.nodes(), vec!['a', 'b', 'c']);
    let descending = ((2, 1), Components::new().voltage(1).resistance(1));
    assert!(Circuit::from_branches([descending]).is_err());
    ```
     */
    pub fn from_branches<I>(branches: I) -> Result<Self, CircuitError<N>>
    where
        I: IntoIterator<Item = ((N, N), Components)>,
    {
        let mut circuit = Self::new();
        for (nodes, components) in branches {
            circuit.add_branch(nodes, components)?;
        }
        return Ok(circuit);
    }

    /**
    Adds a branch between `nodes.0` and `nodes.1` and solves the circuit again.

    The nodes must be in strictly ascending order and `components` must supply exactly two of resistance,
    voltage and current. The branch receives the smallest parallel index not yet used between the two
    nodes; its key is returned. Adding a branch may change the solved values of every other branch.
     */
    pub fn add_branch(
        &mut self,
        nodes: (N, N),
        components: Components,
    ) -> Result<BranchKey<N>, CircuitError<N>> {
        let (first, second) = nodes;
        let mut branch = Branch::new(first, second, components)?;

        let pair = (branch.first().clone(), branch.second().clone());
        let group = self.branches.entry(pair).or_default();
        let index = (0..)
            .find(|candidate| group.iter().all(|b| b.index() != *candidate))
            .unwrap_or(group.len());
        branch.set_index(index);
        let key = branch.key().clone();

        let position = group.partition_point(|b| b.index() < index);
        group.insert(position, branch);

        tracing::debug!(branch = %key, "added branch");
        self.recompute();
        return Ok(key);
    }

    /**
    Removes the branch identified by `key` and solves the circuit again. Returns the removed branch.
    Nodes which are not used by any other branch are removed as well.
     */
    pub fn del_branch(&mut self, key: &BranchKey<N>) -> Result<Branch<N>, CircuitError<N>> {
        let pair = (key.first.clone(), key.second.clone());
        let not_found = || CircuitError::BranchNotFound { key: key.clone() };

        let group = self.branches.get_mut(&pair).ok_or_else(not_found)?;
        let position = group
            .iter()
            .position(|b| b.index() == key.index)
            .ok_or_else(not_found)?;
        let removed = group.remove(position);
        if group.is_empty() {
            self.branches.remove(&pair);
        }

        tracing::debug!(branch = %key, "removed branch");
        self.recompute();
        return Ok(removed);
    }

    /// All nodes of the circuit in ascending order.
    pub fn nodes(&self) -> Vec<N> {
        let mut nodes: Vec<N> = self
            .branches
            .keys()
            .flat_map(|(a, b)| [a.clone(), b.clone()])
            .collect();
        nodes.sort();
        nodes.dedup();
        return nodes;
    }

    pub fn contains_node(&self, node: &N) -> bool {
        return self.branches.keys().any(|(a, b)| a == node || b == node);
    }

    /// All branches, ordered by node pair and parallel index.
    pub fn branches(&self) -> impl Iterator<Item = &Branch<N>> {
        return self.branches.values().flat_map(|group| group.iter());
    }

    pub fn branch(&self, key: &BranchKey<N>) -> Option<&Branch<N>> {
        return self
            .branches
            .get(&(key.first.clone(), key.second.clone()))
            .and_then(|group| group.iter().find(|b| b.index() == key.index));
    }

    /**
    Displays the branch at `key` with the units of the circuit configuration, e.g.
    `(10 V)---[3 kΩ]---\1 mA\` for the default [`Units`]. Returns `None` if the branch does not exist.
     */
    pub fn display_branch(&self, key: &BranchKey<N>) -> Option<BranchDisplay<'_, N>> {
        return self
            .branch(key)
            .map(|branch| branch.display_with(&self.config.units));
    }

    /// The branches between `first` and `second` (which must be given in ascending order).
    pub fn parallel_branches(&self, first: &N, second: &N) -> &[Branch<N>] {
        return self
            .branches
            .get(&(first.clone(), second.clone()))
            .map(Vec::as_slice)
            .unwrap_or(&[]);
    }

    /// The independent loops of the circuit, one per voltage law equation.
    pub fn meshes(&self) -> &[Mesh<N>] {
        return self.meshes.as_slice();
    }

    pub fn node_count(&self) -> usize {
        return self.nodes().len();
    }

    pub fn branch_count(&self) -> usize {
        return self.branches.values().map(Vec::len).sum();
    }

    pub fn mesh_count(&self) -> usize {
        return self.meshes.len();
    }

    /**
    Returns `false` if the last solve did not find a unique solution, in which case all unknowns are
    [`Resolution::Indeterminate`](crate::Resolution::Indeterminate). An empty circuit counts as solved.
     */
    pub fn is_solved(&self) -> bool {
        return self.solved;
    }

    pub fn config(&self) -> &CircuitConfig {
        return &self.config;
    }

    pub(crate) fn groups(&self) -> &BTreeMap<(N, N), Vec<Branch<N>>> {
        return &self.branches;
    }

    /**
    Recomputes the derived state from scratch: meshes first, then the solution of the Kirchhoff system.
     */
    fn recompute(&mut self) {
        let _span = tracing::debug_span!("recompute", branches = self.branch_count()).entered();

        let topology: BTreeMap<(N, N), Vec<usize>> = self
            .branches
            .iter()
            .map(|(pair, group)| (pair.clone(), group.iter().map(Branch::index).collect()))
            .collect();
        self.meshes = find_meshes(&topology);
        tracing::debug!(meshes = self.meshes.len(), "meshes updated");

        self.solved =
            kirchhoff::solve(&mut self.branches, &self.meshes, self.config.reference_node);
    }
}
