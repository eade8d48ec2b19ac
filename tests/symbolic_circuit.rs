use kirchhoff_circuit::*;

/// Three parallel branches with symbolic resistances and excitations
fn example_circuit_creation() -> Circuit<u32> {
    return Circuit::from_branches([
        ((1, 2), Components::new().resistance("R").voltage("V1")),
        ((1, 2), Components::new().resistance("R").current("I2")),
        ((1, 2), Components::new().resistance("R").voltage(0)),
    ])
    .expect("this is a valid circuit");
}

fn unknown(circuit: &Circuit<u32>, index: usize) -> Value {
    let branch = circuit.branch(&BranchKey::new(1, 2, index)).unwrap();
    return branch.get(branch.unknown()).and_then(Resolution::value).cloned().unwrap();
}

#[test]
fn test_symbolic_solution() {
    let circuit = example_circuit_creation();
    assert!(circuit.is_solved());

    let voltage = unknown(&circuit, 1);
    assert_eq!(voltage, Value::parse("3*I2*R/2 + V1/2").unwrap());
    assert_eq!(voltage.to_string(), "3*I2*R/2 + V1/2");

    let current = unknown(&circuit, 0);
    assert_eq!(current, Value::parse("(V1 - I2*R) / (2*R)").unwrap());
    assert_eq!(current.to_string(), "(-I2*R + V1)/(2*R)");

    let current = unknown(&circuit, 2);
    assert_eq!(current, Value::parse("-(V1 + I2*R) / (2*R)").unwrap());
}

#[test]
fn test_current_law() {
    let circuit = example_circuit_creation();
    let sum = circuit
        .branches()
        .map(|b| b.current().and_then(Resolution::value).cloned().unwrap())
        .fold(Value::from(0), |acc, i| acc + i);
    assert!(sum.is_zero());
}

#[test]
fn test_potential() {
    let circuit = example_circuit_creation();
    let expected = Value::parse("(V1 + I2*R) / 2").unwrap();
    for branch in circuit.branches() {
        assert_eq!(branch.potential_rise(), Resolution::Resolved(expected.clone()));
    }
    assert_eq!(
        circuit.potential_difference(&2, &1).unwrap(),
        Resolution::Resolved(expected.clone())
    );
    assert_eq!(
        circuit.potential_difference(&1, &2).unwrap(),
        Resolution::Resolved(-expected)
    );
    assert_eq!(
        unknown(&circuit, 1).free_variables().into_iter().collect::<Vec<_>>(),
        vec!["I2", "R", "V1"]
    );
}

#[test]
fn test_mixed_values_collapse() {
    // Symbolic values which cancel yield numeric results
    let circuit = Circuit::from_branches([
        ((1, 2), Components::new().resistance("R").voltage("2*R")),
        ((1, 2), Components::new().resistance("R").voltage(0)),
    ])
    .unwrap();
    assert_eq!(unknown(&circuit, 0), Value::from(1));
    assert_eq!(unknown(&circuit, 1), Value::from(-1));
    assert!(unknown(&circuit, 0).is_numeric());
}

#[test]
fn test_decimal_inputs_agree() {
    let numbers = Circuit::from_branches([
        ((1, 2), Components::new().resistance(0.1).voltage(0.3)),
        ((1, 2), Components::new().resistance(0.2).voltage(0)),
    ])
    .unwrap();
    let strings = Circuit::from_branches([
        ((1, 2), Components::new().resistance("0.1").voltage("0.3")),
        ((1, 2), Components::new().resistance("0.2").voltage("0")),
    ])
    .unwrap();
    assert_eq!(unknown(&numbers, 0), unknown(&strings, 0));
    assert_eq!(unknown(&numbers, 0), Value::from(1));
}
