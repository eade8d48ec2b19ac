/*!
Potential differences between circuit nodes.

The potential of a node relative to another one is the sum of the branch potential rises
([`Branch::potential_rise`](crate::Branch::potential_rise)) along any path between the two nodes.
Since the solved branch values satisfy Kirchhoff's voltage law around every mesh, the result does not
depend on the chosen path. The path is searched with [`petgraph`]s A* implementation on the simple
graph underlying the circuit.
*/

use std::collections::BTreeMap;
use std::fmt::Debug;

use petgraph::graph::{NodeIndex, UnGraph};

use crate::{
    circuit::{Circuit, CircuitError},
    value::{Resolution, Value},
};

impl<N: Ord + Clone + Debug> Circuit<N> {
    /**
    Returns the potential of `node_a` relative to `node_b`.

    The potential is accumulated along a shortest path (by branch count) from `node_b` to `node_a`. Each
    traversed node pair contributes the potential rise `V - I*R` of its lowest-indexed branch, added if the
    pair is traversed in ascending node order and subtracted otherwise. The result is
    [`Resolution::Indeterminate`] if any branch on the path is indeterminate.

    # Examples

    ```
    use kirchhoff_circuit::{Circuit, Components, Value};

    // 9 V source feeding a 2:1 voltage divider
    let circuit = Circuit::from_branches([
        ((0, 1), Components::new().voltage(9).resistance(0)),
        ((1, 2), Components::new().voltage(0).resistance(2)),
        ((0, 2), Components::new().voltage(0).resistance(1)),
    ])
    .unwrap();

    let divided = circuit.potential_difference(&2, &0).unwrap();
    assert_eq!(divided.value(), Some(&Value::from(3)));
    assert!(circuit.potential_difference(&0, &7).is_err());
    ```
     */
    pub fn potential_difference(
        &self,
        node_a: &N,
        node_b: &N,
    ) -> Result<Resolution, CircuitError<N>> {
        for node in [node_a, node_b] {
            if !self.contains_node(node) {
                return Err(CircuitError::NodeNotFound { node: node.clone() });
            }
        }
        if node_a == node_b {
            return Ok(Resolution::Resolved(Value::from(0)));
        }

        let (graph, indices) = self.simple_graph();
        let (Some(&start), Some(&goal)) = (indices.get(node_b), indices.get(node_a)) else {
            return Err(CircuitError::Disconnected {
                from: node_a.clone(),
                to: node_b.clone(),
            });
        };

        let (_, path) = petgraph::algo::astar(&graph, start, |finish| finish == goal, |_| 1, |_| 0)
            .ok_or_else(|| CircuitError::Disconnected {
                from: node_a.clone(),
                to: node_b.clone(),
            })?;

        let mut sum = Value::from(0);
        for win in path.windows(2) {
            let (from, to) = (&graph[win[0]], &graph[win[1]]);
            let (lower, upper) = if from < to { (from, to) } else { (to, from) };
            let Some(branch) = self.parallel_branches(lower, upper).first() else {
                return Ok(Resolution::Indeterminate);
            };
            let Resolution::Resolved(rise) = branch.potential_rise() else {
                return Ok(Resolution::Indeterminate);
            };
            sum = if from < to { &sum + &rise } else { &sum - &rise };
        }
        return Ok(Resolution::Resolved(sum));
    }

    /// The simple graph underlying the circuit, with one edge per connected node pair.
    fn simple_graph(&self) -> (UnGraph<N, ()>, BTreeMap<N, NodeIndex>) {
        let nodes = self.nodes();
        let mut graph = UnGraph::<N, ()>::with_capacity(nodes.len(), self.groups().len());
        let mut indices = BTreeMap::new();
        for node in nodes {
            let index = graph.add_node(node.clone());
            indices.insert(node, index);
        }
        for (first, second) in self.groups().keys() {
            if let (Some(&a), Some(&b)) = (indices.get(first), indices.get(second)) {
                graph.add_edge(a, b, ());
            }
        }
        return (graph, indices);
    }
}
