#![allow(dead_code)]

use kirchhoff_circuit::*;

/// Example circuit from the README.md: two sources driving a resistor network with four nodes and
/// three meshes.
pub fn circuit_creation() -> Circuit<u32> {
    return Circuit::from_branches([
        ((1, 2), Components::new().voltage(12).resistance(1)),
        ((2, 3), Components::new().voltage(0).resistance(2)),
        ((3, 4), Components::new().voltage(0).resistance(3)),
        ((1, 4), Components::new().voltage(0).resistance(4)),
        ((2, 4), Components::new().voltage(0).resistance(6)),
        ((1, 3), Components::new().resistance(5).current(2)),
    ])
    .expect("this is a valid circuit");
}

pub fn numeric(resolution: Option<&Resolution>) -> f64 {
    return resolution
        .and_then(Resolution::as_f64)
        .expect("value is numeric");
}

pub fn current(circuit: &Circuit<u32>, first: u32, second: u32, index: usize) -> f64 {
    return numeric(
        circuit
            .branch(&BranchKey::new(first, second, index))
            .and_then(Branch::current),
    );
}

pub fn voltage(circuit: &Circuit<u32>, first: u32, second: u32, index: usize) -> f64 {
    return numeric(
        circuit
            .branch(&BranchKey::new(first, second, index))
            .and_then(Branch::voltage),
    );
}

/**
According to Kirchhoff's current law, the currents entering a node sum up to the currents leaving it.
 */
pub fn current_sum_check<N: Ord + Clone + std::fmt::Debug>(circuit: &Circuit<N>) {
    for node in circuit.nodes() {
        let mut sum = 0.0;
        for branch in circuit.branches() {
            let i = numeric(branch.current());
            if branch.second() == &node {
                sum += i;
            } else if branch.first() == &node {
                sum -= i;
            }
        }
        approx::assert_abs_diff_eq!(0.0, sum, epsilon = 1e-9);
    }
}

/**
According to Kirchhoff's voltage law, the potential rises around every mesh sum up to zero.
 */
pub fn voltage_sum_check<N: Ord + Clone + std::fmt::Debug>(circuit: &Circuit<N>) {
    for mesh in circuit.meshes() {
        let mut sum = 0.0;
        for step in mesh.steps() {
            let branch = circuit.branch(&step.branch()).expect("mesh step is a branch");
            let rise = numeric(Some(&branch.potential_rise()));
            sum += if step.is_ascending() { rise } else { -rise };
        }
        approx::assert_abs_diff_eq!(0.0, sum, epsilon = 1e-9);
    }
}

/**
The potential difference between two nodes equals the sum of the potential differences over any
intermediate node.
 */
pub fn potential_check<N: Ord + Clone + std::fmt::Debug>(circuit: &Circuit<N>) {
    let nodes = circuit.nodes();
    let potential = |a: &N, b: &N| numeric(Some(&circuit.potential_difference(a, b).unwrap()));
    for a in nodes.iter() {
        for b in nodes.iter() {
            approx::assert_abs_diff_eq!(potential(a, b), -potential(b, a), epsilon = 1e-9);
            for c in nodes.iter() {
                approx::assert_abs_diff_eq!(
                    potential(a, c),
                    potential(a, b) + potential(b, c),
                    epsilon = 1e-9
                );
            }
        }
    }
}
