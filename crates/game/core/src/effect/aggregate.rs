//! Attribute aggregation.
//!
//! Modifiers combine in a fixed order regardless of the order they were
//! pushed in, except for overrides where the last one wins:
//!
//! ```text
//! current = override_last ?? (base + Σ add) × Π multiply
//! ```

use super::ModifierOp;

/// Running aggregate of the modifiers targeting one attribute.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ModifierAggregate {
    add: f32,
    multiply: f32,
    override_value: Option<f32>,
}

impl ModifierAggregate {
    pub const fn new() -> Self {
        Self {
            add: 0.0,
            multiply: 1.0,
            override_value: None,
        }
    }

    pub fn push(&mut self, op: ModifierOp, value: f32) {
        match op {
            ModifierOp::Add => self.add += value,
            ModifierOp::Multiply => self.multiply *= value,
            ModifierOp::Override => self.override_value = Some(value),
        }
    }

    pub fn evaluate(&self, base: f32) -> f32 {
        match self.override_value {
            Some(value) => value,
            None => (base + self.add) * self.multiply,
        }
    }

    pub fn is_identity(&self) -> bool {
        self.add == 0.0 && self.multiply == 1.0 && self.override_value.is_none()
    }
}

impl Default for ModifierAggregate {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn aggregate(ops: &[(ModifierOp, f32)]) -> ModifierAggregate {
        let mut aggregate = ModifierAggregate::new();
        for (op, value) in ops {
            aggregate.push(*op, *value);
        }
        aggregate
    }

    #[test]
    fn adds_apply_before_multiplies() {
        let result = aggregate(&[
            (ModifierOp::Multiply, 2.0),
            (ModifierOp::Add, 3.0),
            (ModifierOp::Multiply, 1.5),
            (ModifierOp::Add, 1.0),
        ]);
        // (10 + 3 + 1) * 2 * 1.5
        assert_eq!(result.evaluate(10.0), 42.0);
    }

    #[test]
    fn push_order_of_adds_and_multiplies_does_not_matter() {
        let forward = aggregate(&[(ModifierOp::Add, 4.0), (ModifierOp::Multiply, 0.5)]);
        let reverse = aggregate(&[(ModifierOp::Multiply, 0.5), (ModifierOp::Add, 4.0)]);
        assert_eq!(forward.evaluate(6.0), reverse.evaluate(6.0));
    }

    #[test]
    fn last_override_wins_over_everything() {
        let result = aggregate(&[
            (ModifierOp::Override, 1.0),
            (ModifierOp::Add, 100.0),
            (ModifierOp::Override, 7.0),
            (ModifierOp::Multiply, 3.0),
        ]);
        assert_eq!(result.evaluate(50.0), 7.0);
    }

    #[test]
    fn empty_aggregate_is_identity() {
        let result = ModifierAggregate::new();
        assert!(result.is_identity());
        assert_eq!(result.evaluate(12.5), 12.5);
    }
}
