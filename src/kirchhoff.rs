/*!
Assembly and solution of the Kirchhoff equation system.

The system has one column per branch unknown and one row per equation:
- one current law equation per node, except for one reference node per connected component
  (see [`ReferenceNode`]),
- one voltage law equation per mesh.

For a circuit with `E` branches, `N` nodes and `C` connected components these are `N - C` plus
`E - N + C` equations, i.e. exactly one per unknown. Resistance, voltage and current each enter the
equations linearly as long as only one of them is unknown per branch, so the system is linear in the
unknowns even if the given values are symbolic.

The system is solved by Gauss-Jordan elimination over exact rational functions ([`Expr`]). If no unique
solution exists, every unknown of the circuit is marked as [`Resolution::Indeterminate`].
*/

use std::collections::BTreeMap;
use std::fmt::Debug;

use na::{DMatrix, DVector};

use crate::{
    algebra::Expr,
    branch::{Branch, BranchKey, Type},
    circuit::ReferenceNode,
    mesh::{Mesh, SpanningForest},
    value::{Resolution, Value},
};

/**
Linear equation system `a * x = b`.
 */
struct System {
    a: DMatrix<Expr>,
    b: DVector<Expr>,
}

impl System {
    fn new(equations: usize, unknowns: usize) -> Self {
        return System {
            a: DMatrix::from_element(equations, unknowns, Expr::zero()),
            b: DVector::from_element(equations, Expr::zero()),
        };
    }

    fn add_coefficient(&mut self, row: usize, col: usize, value: &Expr) {
        let entry = &mut self.a[(row, col)];
        *entry = &*entry + value;
    }

    fn add_excitation(&mut self, row: usize, value: &Expr) {
        let entry = &mut self.b[row];
        *entry = &*entry + value;
    }

    /**
    Gauss-Jordan elimination. Returns `None` if the system does not have a unique solution.
     */
    fn solve(mut self) -> Option<Vec<Expr>> {
        let (rows, cols) = self.a.shape();

        for col in 0..cols {
            let pivot_row = (col..rows).find(|&row| !self.a[(row, col)].is_zero())?;
            if pivot_row != col {
                self.a.swap_rows(pivot_row, col);
                self.b.swap_rows(pivot_row, col);
            }

            let inverse = self.a[(col, col)].recip()?;
            for c in col..cols {
                self.a[(col, c)] = &self.a[(col, c)] * &inverse;
            }
            self.b[col] = &self.b[col] * &inverse;

            for row in 0..rows {
                if row == col || self.a[(row, col)].is_zero() {
                    continue;
                }
                let factor = self.a[(row, col)].clone();
                for c in col..cols {
                    if self.a[(col, c)].is_zero() {
                        continue;
                    }
                    let update = &factor * &self.a[(col, c)];
                    self.a[(row, c)] = &self.a[(row, c)] - &update;
                }
                let update = &factor * &self.b[col];
                self.b[row] = &self.b[row] - &update;
            }
        }

        // Surplus rows must have been reduced to 0 = 0
        if (cols..rows).any(|row| !self.b[row].is_zero()) {
            return None;
        }
        return Some(self.b.iter().take(cols).cloned().collect());
    }
}

/// The exact value of a given branch component.
fn given<N>(branch: &Branch<N>, ty: Type) -> Option<Expr> {
    return branch.given(ty).and_then(Value::to_expr);
}

/**
Picks the reference node of every connected component.
 */
fn reference_nodes<N: Ord + Clone>(
    components: &BTreeMap<N, usize>,
    choice: ReferenceNode,
) -> BTreeMap<usize, N> {
    let mut references = BTreeMap::new();
    for (node, id) in components.iter() {
        match choice {
            ReferenceNode::First => {
                references.entry(*id).or_insert_with(|| node.clone());
            }
            ReferenceNode::Last => {
                references.insert(*id, node.clone());
            }
        }
    }
    return references;
}

/**
Assembles the equation system. `columns` maps every branch to the column of its unknown.
Returns `None` if a given value cannot be represented exactly.
 */
fn assemble<N: Ord + Clone>(
    groups: &BTreeMap<(N, N), Vec<Branch<N>>>,
    meshes: &[Mesh<N>],
    columns: &BTreeMap<BranchKey<N>, usize>,
    reference: ReferenceNode,
) -> Option<System> {
    let forest = SpanningForest::new(groups.keys());
    let references = reference_nodes(forest.components(), reference);
    let kcl_nodes: Vec<&N> = forest
        .components()
        .iter()
        .filter(|(node, id)| references.get(*id) != Some(*node))
        .map(|(node, _)| node)
        .collect();
    tracing::debug!(
        components = forest.component_count(),
        current_law = kcl_nodes.len(),
        voltage_law = meshes.len(),
        "assembling Kirchhoff equations"
    );

    let mut system = System::new(kcl_nodes.len() + meshes.len(), columns.len());
    let one = Expr::one();
    let minus_one = -&one;

    // Current law: currents entering the node minus currents leaving it
    for (row, node) in kcl_nodes.iter().enumerate() {
        for branch in groups.values().flatten() {
            let sign = if branch.second() == *node {
                1
            } else if branch.first() == *node {
                -1
            } else {
                continue;
            };
            let col = *columns.get(branch.key())?;
            if branch.unknown() == Type::Current {
                system.add_coefficient(row, col, if sign > 0 { &one } else { &minus_one });
            } else {
                let current = given(branch, Type::Current)?;
                let moved = if sign > 0 { -current } else { current };
                system.add_excitation(row, &moved);
            }
        }
    }

    // Voltage law: the potential rises V - I*R along the mesh sum up to zero
    for (offset, mesh) in meshes.iter().enumerate() {
        let row = kcl_nodes.len() + offset;
        for step in mesh.steps() {
            let key = step.branch();
            let branch = groups
                .get(&(key.first.clone(), key.second.clone()))?
                .iter()
                .find(|b| b.index() == key.index)?;
            let col = *columns.get(&key)?;
            let s = if step.is_ascending() { &one } else { &minus_one };

            match branch.unknown() {
                Type::Current => {
                    let r = given(branch, Type::Resistance)?;
                    let v = given(branch, Type::Voltage)?;
                    system.add_coefficient(row, col, &-(s * &r));
                    system.add_excitation(row, &-(s * &v));
                }
                Type::Voltage => {
                    let r = given(branch, Type::Resistance)?;
                    let i = given(branch, Type::Current)?;
                    system.add_coefficient(row, col, s);
                    system.add_excitation(row, &(s * &(&i * &r)));
                }
                Type::Resistance => {
                    let i = given(branch, Type::Current)?;
                    let v = given(branch, Type::Voltage)?;
                    system.add_coefficient(row, col, &-(s * &i));
                    system.add_excitation(row, &-(s * &v));
                }
            }
        }
    }

    return Some(system);
}

/**
Solves the circuit and writes the results into the unknowns of all branches.

Returns `false` if the equation system has no unique solution. In that case all unknowns are set to
[`Resolution::Indeterminate`].
 */
pub(crate) fn solve<N: Ord + Clone + Debug>(
    groups: &mut BTreeMap<(N, N), Vec<Branch<N>>>,
    meshes: &[Mesh<N>],
    reference: ReferenceNode,
) -> bool {
    let columns: BTreeMap<BranchKey<N>, usize> = groups
        .values()
        .flatten()
        .enumerate()
        .map(|(col, branch)| (branch.key().clone(), col))
        .collect();
    if columns.is_empty() {
        return true;
    }

    let solution = assemble(groups, meshes, &columns, reference).and_then(|system| {
        tracing::debug!(
            equations = system.a.nrows(),
            unknowns = system.a.ncols(),
            "solving Kirchhoff equations"
        );
        system.solve()
    });

    let Some(solution) = solution else {
        tracing::warn!(
            unknowns = columns.len(),
            "circuit equations have no unique solution, all unknowns are indeterminate"
        );
        for branch in groups.values_mut().flatten() {
            branch.resolve(Resolution::Indeterminate);
        }
        return false;
    };

    for branch in groups.values_mut().flatten() {
        let resolution = columns
            .get(branch.key())
            .and_then(|col| solution.get(*col))
            .map(|expr| Resolution::Resolved(Value::from_expr(expr.clone())))
            .unwrap_or(Resolution::Indeterminate);
        branch.resolve(resolution);
    }
    return true;
}

#[cfg(test)]
mod tests {

    use super::*;
    use crate::{Circuit, Components};

    fn unknown_of(circuit: &Circuit<u32>, first: u32, second: u32, index: usize) -> Resolution {
        let branch = circuit
            .branch(&BranchKey::new(first, second, index))
            .expect("branch exists");
        return branch
            .get(branch.unknown())
            .cloned()
            .expect("branch is solved");
    }

    #[test]
    fn test_gauss_jordan() {
        // x + 2y = 5, 3x - y = 1
        let mut system = System::new(2, 2);
        system.add_coefficient(0, 0, &Expr::integer(1));
        system.add_coefficient(0, 1, &Expr::integer(2));
        system.add_coefficient(1, 0, &Expr::integer(3));
        system.add_coefficient(1, 1, &Expr::integer(-1));
        system.add_excitation(0, &Expr::integer(5));
        system.add_excitation(1, &Expr::integer(1));
        assert_eq!(system.solve(), Some(vec![Expr::integer(1), Expr::integer(2)]));
    }

    #[test]
    fn test_gauss_jordan_pivoting() {
        // y = 4, x + y = 6
        let mut system = System::new(2, 2);
        system.add_coefficient(0, 1, &Expr::integer(1));
        system.add_coefficient(1, 0, &Expr::integer(1));
        system.add_coefficient(1, 1, &Expr::integer(1));
        system.add_excitation(0, &Expr::integer(4));
        system.add_excitation(1, &Expr::integer(6));
        assert_eq!(system.solve(), Some(vec![Expr::integer(2), Expr::integer(4)]));
    }

    #[test]
    fn test_gauss_jordan_symbolic() {
        // R*x = V
        let mut system = System::new(1, 1);
        system.add_coefficient(0, 0, &Expr::variable("R"));
        system.add_excitation(0, &Expr::variable("V"));
        let solution = system.solve().unwrap();
        assert_eq!(solution[0].to_string(), "V/R");
    }

    #[test]
    fn test_gauss_jordan_singular() {
        // x + y = 1, 2x + 2y = 3
        let mut system = System::new(2, 2);
        system.add_coefficient(0, 0, &Expr::integer(1));
        system.add_coefficient(0, 1, &Expr::integer(1));
        system.add_coefficient(1, 0, &Expr::integer(2));
        system.add_coefficient(1, 1, &Expr::integer(2));
        system.add_excitation(0, &Expr::integer(1));
        system.add_excitation(1, &Expr::integer(3));
        assert_eq!(system.solve(), None);
    }

    #[test]
    fn test_reference_nodes() {
        let components = BTreeMap::from([(1, 0), (2, 0), (5, 1), (7, 1), (9, 0)]);
        assert_eq!(
            reference_nodes(&components, ReferenceNode::Last),
            BTreeMap::from([(0, 9), (1, 7)])
        );
        assert_eq!(
            reference_nodes(&components, ReferenceNode::First),
            BTreeMap::from([(0, 1), (1, 5)])
        );
    }

    #[test]
    fn test_contradictory_voltage_sources() {
        let circuit = Circuit::from_branches([
            ((1u32, 2), Components::new().resistance(0).voltage(5)),
            ((1, 2), Components::new().resistance(0).voltage(3)),
        ])
        .unwrap();
        assert!(!circuit.is_solved());
        assert!(unknown_of(&circuit, 1, 2, 0).is_indeterminate());
        assert!(unknown_of(&circuit, 1, 2, 1).is_indeterminate());
    }

    #[test]
    fn test_current_sources_in_series() {
        // Node 2 would have to absorb 1 mA
        let circuit = Circuit::from_branches([
            ((1u32, 2), Components::new().resistance(1).current(1)),
            ((2, 3), Components::new().resistance(1).current(2)),
            ((1, 3), Components::new().resistance(1).voltage(0)),
        ])
        .unwrap();
        assert!(!circuit.is_solved());
        assert!(circuit.branches().all(|b| b.potential_rise().is_indeterminate()));
    }

    #[test]
    fn test_recovers_after_removal() {
        let mut circuit = Circuit::from_branches([
            ((1u32, 2), Components::new().resistance(0).voltage(5)),
            ((1, 2), Components::new().resistance(5).voltage(0)),
        ])
        .unwrap();
        assert!(circuit.is_solved());

        let key = circuit
            .add_branch((1, 2), Components::new().resistance(0).voltage(3))
            .unwrap();
        assert!(!circuit.is_solved());

        circuit.del_branch(&key).unwrap();
        assert!(circuit.is_solved());
        assert_eq!(unknown_of(&circuit, 1, 2, 0).as_f64(), Some(1.0));
        assert_eq!(unknown_of(&circuit, 1, 2, 1).as_f64(), Some(-1.0));
    }

    #[test]
    fn test_tree_without_meshes() {
        // Without a loop no current can flow
        let circuit = Circuit::from_branches([
            ((1u32, 2), Components::new().resistance(2).voltage(5)),
            ((2, 3), Components::new().resistance(4).voltage(1)),
        ])
        .unwrap();
        assert!(circuit.is_solved());
        assert!(circuit.meshes().is_empty());
        assert_eq!(unknown_of(&circuit, 1, 2, 0).as_f64(), Some(0.0));
        assert_eq!(unknown_of(&circuit, 2, 3, 0).as_f64(), Some(0.0));
    }

    #[test]
    fn test_disconnected_components() {
        let circuit = Circuit::from_branches([
            ((1u32, 2), Components::new().resistance(1).voltage(4)),
            ((1, 2), Components::new().resistance(1).voltage(0)),
            ((10, 11), Components::new().resistance(2).current(3)),
            ((10, 11), Components::new().resistance(4).voltage(0)),
        ])
        .unwrap();
        assert!(circuit.is_solved());
        assert_eq!(unknown_of(&circuit, 1, 2, 0).as_f64(), Some(2.0));
        // Current 3 flows through the first branch and back through the second one
        assert_eq!(unknown_of(&circuit, 10, 11, 1).as_f64(), Some(-3.0));
        assert_eq!(unknown_of(&circuit, 10, 11, 0).as_f64(), Some(18.0));
    }
}
