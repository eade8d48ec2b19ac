/*!
Circuit branches.

A [`Branch`] is one edge of the circuit multigraph. It connects two nodes given in strictly ascending order,
carries a parallel index which distinguishes it from other branches between the same node pair, and holds
the three attributes resistance, voltage and current. Exactly one of them is the unknown which is determined
by the Kirchhoff solver; the other two are given by the user via [`Components`].

# Sign conventions

A positive voltage or current points from the first (smaller) node to the second (larger) node:
```text
 (a)───( V )───[ R ]───\ I \───(b)      a < b
        ──►             ──►
```
The potential of the second node relative to the first one is therefore `V - I*R`
(see [`Branch::potential_rise`]).
*/

use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::{
    circuit::{CircuitError, Units},
    value::{Input, Resolution, Value},
};

/**
An enum representing the three physical quantities of a [`Branch`].

These types are not necessarily electrical quantities, but can represent any similar
physical quantities which follow the physical relationship `voltage = current * resistance`.

# Features

This enum can be serialized / deserialized via the [serde](https://crates.io/crates/serde)
crate if the `serde` feature is enabled.
 */
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Type {
    Voltage,
    Current,
    Resistance,
}

impl Type {
    /// All types in the order `V`, `R`, `I` in which branches display their components.
    pub const ALL: [Type; 3] = [Type::Voltage, Type::Resistance, Type::Current];

    fn slot(self) -> usize {
        return match self {
            Type::Voltage => 0,
            Type::Resistance => 1,
            Type::Current => 2,
        };
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let t = match self {
            Type::Voltage => "voltage",
            Type::Current => "current",
            Type::Resistance => "resistance",
        };
        write!(f, "{t}")
    }
}

/**
The user supplied components of a branch. Exactly two of the three must be given; the missing one becomes
the unknown of the branch.

# Examples

```
use kirchhoff_circuit::{Components, Type};

let components = Components::new().resistance(3).voltage("V1");
assert_eq!(components.unknown(), Some(Type::Current));

let overdefined = Components::new().resistance(3).voltage(10).current(1);
assert_eq!(overdefined.unknown(), None);
```
 */
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Components {
    pub resistance: Option<Input>,
    pub voltage: Option<Input>,
    pub current: Option<Input>,
}

impl Components {
    pub fn new() -> Self {
        return Self::default();
    }

    pub fn resistance(mut self, value: impl Into<Input>) -> Self {
        self.resistance = Some(value.into());
        return self;
    }

    pub fn voltage(mut self, value: impl Into<Input>) -> Self {
        self.voltage = Some(value.into());
        return self;
    }

    pub fn current(mut self, value: impl Into<Input>) -> Self {
        self.current = Some(value.into());
        return self;
    }

    /// Number of supplied components.
    pub fn supplied(&self) -> usize {
        return [&self.resistance, &self.voltage, &self.current]
            .iter()
            .filter(|c| c.is_some())
            .count();
    }

    /// The missing component, if exactly one is missing.
    pub fn unknown(&self) -> Option<Type> {
        return match (&self.voltage, &self.resistance, &self.current) {
            (Some(_), Some(_), None) => Some(Type::Current),
            (None, Some(_), Some(_)) => Some(Type::Voltage),
            (Some(_), None, Some(_)) => Some(Type::Resistance),
            _ => None,
        };
    }
}

/**
Identifies a branch within a [`Circuit`](crate::Circuit) by its node pair (`first < second`) and its
parallel index.

# Features

This struct can be serialized / deserialized via the [serde](https://crates.io/crates/serde)
crate if the `serde` feature is enabled.
 */
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct BranchKey<N> {
    pub first: N,
    pub second: N,
    pub index: usize,
}

impl<N> BranchKey<N> {
    pub fn new(first: N, second: N, index: usize) -> Self {
        return Self {
            first,
            second,
            index,
        };
    }
}

impl<N: fmt::Debug> fmt::Display for BranchKey<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:?}, {:?}, {})", self.first, self.second, self.index)
    }
}

/**
One edge of the circuit.

Branches are created by [`Circuit::add_branch`](crate::Circuit::add_branch), which validates the
[`Components`] and assigns the parallel index. Given components are stored as
[`Resolution::Resolved`]; the unknown is `None` until the circuit has been solved and afterwards holds the
solver result.
 */
#[derive(Debug, Clone, PartialEq)]
pub struct Branch<N> {
    key: BranchKey<N>,
    unknown: Type,
    values: [Option<Resolution>; 3],
}

impl<N: Ord + Clone + fmt::Debug> Branch<N> {
    /**
    Validates the node order and the component count and normalizes all given components into
    [`Value`]s. The parallel index is assigned later by the circuit.
     */
    pub(crate) fn new(
        first: N,
        second: N,
        components: Components,
    ) -> Result<Self, CircuitError<N>> {
        if first >= second {
            return Err(CircuitError::Ordering { first, second });
        }
        let unknown = components.unknown().ok_or(CircuitError::UnknownCount {
            supplied: components.supplied(),
        })?;

        let mut values: [Option<Resolution>; 3] = [None, None, None];
        for (ty, input) in [
            (Type::Voltage, components.voltage),
            (Type::Resistance, components.resistance),
            (Type::Current, components.current),
        ] {
            if let Some(input) = input {
                let value = input
                    .into_value()
                    .map_err(|source| CircuitError::Expression { component: ty, source })?;
                values[ty.slot()] = Some(Resolution::Resolved(value));
            }
        }

        return Ok(Self {
            key: BranchKey::new(first, second, 0),
            unknown,
            values,
        });
    }
}

impl<N> Branch<N> {
    pub fn key(&self) -> &BranchKey<N> {
        return &self.key;
    }

    /// The smaller node of the branch.
    pub fn first(&self) -> &N {
        return &self.key.first;
    }

    /// The larger node of the branch.
    pub fn second(&self) -> &N {
        return &self.key.second;
    }

    pub fn index(&self) -> usize {
        return self.key.index;
    }

    /// The attribute which was not given on construction and is determined by the solver.
    pub fn unknown(&self) -> Type {
        return self.unknown;
    }

    /**
    Returns the given or solved value of the attribute `ty`. Only the unknown can be `None`, and only
    while the branch has not been solved.
     */
    pub fn get(&self, ty: Type) -> Option<&Resolution> {
        return self.values[ty.slot()].as_ref();
    }

    pub fn resistance(&self) -> Option<&Resolution> {
        return self.get(Type::Resistance);
    }

    pub fn voltage(&self) -> Option<&Resolution> {
        return self.get(Type::Voltage);
    }

    pub fn current(&self) -> Option<&Resolution> {
        return self.get(Type::Current);
    }

    /// The value of a component given on construction (`None` for the unknown).
    pub(crate) fn given(&self, ty: Type) -> Option<&Value> {
        if ty == self.unknown {
            return None;
        }
        return self.get(ty).and_then(Resolution::value);
    }

    pub(crate) fn set_index(&mut self, index: usize) {
        self.key.index = index;
    }

    pub(crate) fn resolve(&mut self, resolution: Resolution) {
        self.values[self.unknown.slot()] = Some(resolution);
    }

    /**
    Potential of the second node relative to the first node, `V - I*R`.

    Returns [`Resolution::Indeterminate`] if the branch has not been solved or its unknown is indeterminate.
     */
    pub fn potential_rise(&self) -> Resolution {
        let component = |ty| self.get(ty).and_then(Resolution::value);
        return match (
            component(Type::Voltage),
            component(Type::Current),
            component(Type::Resistance),
        ) {
            (Some(v), Some(i), Some(r)) => Resolution::Resolved(v - &(i * r)),
            _ => Resolution::Indeterminate,
        };
    }

    /**
    Returns a displayable representation of the branch components using the given `units`,
    e.g. `(10 V)---[3 kΩ]---\1 mA\`.
     */
    pub fn display_with<'a>(&'a self, units: &'a Units) -> BranchDisplay<'a, N> {
        return BranchDisplay { branch: self, units };
    }
}

/**
Helper returned by [`Branch::display_with`].
 */
pub struct BranchDisplay<'a, N> {
    branch: &'a Branch<N>,
    units: &'a Units,
}

impl<N> fmt::Display for BranchDisplay<'_, N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for ty in Type::ALL {
            let Some(resolution) = self.branch.get(ty) else {
                continue;
            };
            if !first {
                write!(f, "---")?;
            }
            first = false;
            match ty {
                Type::Voltage => write!(f, "({resolution} {})", self.units.voltage)?,
                Type::Resistance => write!(f, "[{resolution} {}]", self.units.resistance)?,
                Type::Current => write!(f, "\\{resolution} {}\\", self.units.current)?,
            }
        }
        return Ok(());
    }
}

impl<N> fmt::Display for Branch<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let units = Units::default();
        write!(f, "{}", self.display_with(&units))
    }
}

#[cfg(test)]
mod tests {

    use super::*;

    #[test]
    fn test_unknown_detection() {
        assert_eq!(
            Components::new().voltage(1).resistance(2).unknown(),
            Some(Type::Current)
        );
        assert_eq!(
            Components::new().resistance(2).current(1).unknown(),
            Some(Type::Voltage)
        );
        assert_eq!(
            Components::new().voltage(1).current(1).unknown(),
            Some(Type::Resistance)
        );
        assert_eq!(Components::new().voltage(1).unknown(), None);
        assert_eq!(Components::new().unknown(), None);
    }

    #[test]
    fn test_branch_validation() {
        let err = Branch::new(2, 1, Components::new().voltage(1).resistance(1)).unwrap_err();
        assert!(matches!(err, CircuitError::Ordering { first: 2, second: 1 }));

        let err = Branch::new(1, 1, Components::new().voltage(1).resistance(1)).unwrap_err();
        assert!(matches!(err, CircuitError::Ordering { .. }));

        let components = Components::new().voltage(1).resistance(1).current(1);
        let err = Branch::new(1, 2, components).unwrap_err();
        assert!(matches!(err, CircuitError::UnknownCount { supplied: 3 }));

        let err = Branch::new(1, 2, Components::new().voltage("2 +").resistance(1)).unwrap_err();
        assert!(matches!(
            err,
            CircuitError::Expression {
                component: Type::Voltage,
                ..
            }
        ));
    }

    #[test]
    fn test_branch_values() {
        let branch = Branch::new('a', 'b', Components::new().voltage("V1").resistance(2)).unwrap();
        assert_eq!(branch.unknown(), Type::Current);
        assert_eq!(branch.current(), None);
        assert_eq!(branch.resistance().and_then(Resolution::as_f64), Some(2.0));
        assert_eq!(branch.given(Type::Current), None);
        assert_eq!(branch.potential_rise(), Resolution::Indeterminate);
    }

    #[test]
    fn test_potential_rise() {
        let mut branch = Branch::new(1, 2, Components::new().voltage(10).resistance(3)).unwrap();
        branch.resolve(Resolution::Resolved(Value::from(1)));
        assert_eq!(branch.potential_rise(), Resolution::Resolved(Value::from(7)));

        branch.resolve(Resolution::Indeterminate);
        assert_eq!(branch.potential_rise(), Resolution::Indeterminate);
    }

    #[test]
    fn test_display() {
        let mut branch = Branch::new(1, 2, Components::new().voltage(10).resistance(3)).unwrap();
        branch.resolve(Resolution::Resolved(Value::from(1)));
        assert_eq!(branch.to_string(), "(10 V)---[3 kΩ]---\\1 mA\\");

        let units = Units {
            voltage: "kV".to_string(),
            resistance: "Ω".to_string(),
            current: "A".to_string(),
        };
        branch.resolve(Resolution::Indeterminate);
        assert_eq!(
            branch.display_with(&units).to_string(),
            "(10 kV)---[3 Ω]---\\indeterminate A\\"
        );
    }
}
