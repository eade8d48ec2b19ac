use kirchhoff_circuit::*;

mod readme_circuit;
use readme_circuit::*;

/// Three parallel branches between the nodes 1 and 2, each consisting of a voltage source and a resistance
fn example_circuit_creation() -> Circuit<u32> {
    return Circuit::from_branches([
        ((1, 2), Components::new().resistance(3).voltage(10)),
        ((1, 2), Components::new().resistance(10).voltage(7)),
        ((1, 2), Components::new().resistance(2).voltage(5)),
    ])
    .expect("this is a valid circuit");
}

#[test]
fn test_currents() {
    let circuit = example_circuit_creation();
    assert!(circuit.is_solved());
    assert_eq!(circuit.mesh_count(), 2);

    assert_eq!(current(&circuit, 1, 2, 0), 1.0);
    assert_eq!(current(&circuit, 1, 2, 1), 0.0);
    assert_eq!(current(&circuit, 1, 2, 2), -1.0);

    // The currents leaving node 1 sum up to zero
    let sum: f64 = (0..3).map(|i| current(&circuit, 1, 2, i)).sum();
    approx::assert_abs_diff_eq!(sum, 0.0, epsilon = 1e-12);
    current_sum_check(&circuit);
    voltage_sum_check(&circuit);
}

#[test]
fn test_equal_voltage_across_branches() {
    let circuit = example_circuit_creation();
    let rises: Vec<f64> = circuit
        .branches()
        .map(|b| b.potential_rise().as_f64().unwrap())
        .collect();
    assert_eq!(rises, vec![7.0, 7.0, 7.0]);
    assert_eq!(
        circuit.potential_difference(&2, &1).unwrap(),
        Resolution::Resolved(Value::from(7))
    );
}

#[test]
fn test_meshes() {
    let circuit = example_circuit_creation();
    assert_eq!(
        circuit.meshes()[0].steps(),
        &[Step::new(1, 2, 0), Step::new(2, 1, 1)]
    );
    assert_eq!(
        circuit.meshes()[1].steps(),
        &[Step::new(1, 2, 1), Step::new(2, 1, 2)]
    );
}

#[test]
fn test_remove_middle_branch() {
    let mut circuit = example_circuit_creation();
    let removed = circuit.del_branch(&BranchKey::new(1, 2, 1)).unwrap();
    assert_eq!(removed.current().and_then(Resolution::as_f64), Some(0.0));

    // The middle branch carried no current, so nothing changes
    assert_eq!(circuit.mesh_count(), 1);
    assert_eq!(current(&circuit, 1, 2, 0), 1.0);
    assert_eq!(current(&circuit, 1, 2, 2), -1.0);
    assert_eq!(
        circuit.meshes()[0].steps(),
        &[Step::new(1, 2, 0), Step::new(2, 1, 2)]
    );
}

#[test]
fn test_display() {
    let circuit = example_circuit_creation();
    let lines: Vec<String> = circuit.branches().map(|b| b.to_string()).collect();
    assert_eq!(
        lines,
        vec![
            "(10 V)---[3 kΩ]---\\1 mA\\",
            "(7 V)---[10 kΩ]---\\0 mA\\",
            "(5 V)---[2 kΩ]---\\-1 mA\\",
        ]
    );
}
