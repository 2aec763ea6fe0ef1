//! Multiplicative epsilon decay for epsilon-greedy exploration.
//!
//! After every environment step:
//!
//! ```text
//! ε ← max(ε · decay, ε_end)   if ε > ε_end
//! ```
//!
//! so after `t` steps `ε_t = max(ε_start · decay^t, ε_end)`.

/// Exploration rate schedule.
#[derive(Debug, Clone, PartialEq)]
pub struct EpsilonSchedule {
    start: f32,
    end: f32,
    decay: f32,
    value: f32,
    steps: usize,
}

impl EpsilonSchedule {
    /// Create a schedule starting at `start`, decaying by `decay` per step down to `end`.
    ///
    /// # Panics
    ///
    /// Panics if `end > start` or `decay` is outside `(0, 1]`.
    pub fn new(start: f32, end: f32, decay: f32) -> Self {
        assert!(end <= start, "epsilon floor must not exceed start");
        assert!(decay > 0.0 && decay <= 1.0, "epsilon decay must be in (0, 1]");
        Self {
            start,
            end,
            decay,
            value: start,
            steps: 0,
        }
    }

    /// Current exploration rate.
    pub fn value(&self) -> f32 {
        self.value
    }

    /// Apply one step of decay.
    pub fn step(&mut self) {
        if self.value > self.end {
            self.value = (self.value * self.decay).max(self.end);
        }
        self.steps += 1;
    }

    /// Number of decay steps applied.
    pub fn steps(&self) -> usize {
        self.steps
    }

    /// Initial rate.
    pub fn start(&self) -> f32 {
        self.start
    }

    /// Floor rate.
    pub fn end(&self) -> f32 {
        self.end
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_starts_at_start() {
        let schedule = EpsilonSchedule::new(1.0, 0.05, 0.9999);
        assert_eq!(schedule.value(), 1.0);
        assert_eq!(schedule.steps(), 0);
    }

    #[test]
    fn test_closed_form_before_floor() {
        let mut schedule = EpsilonSchedule::new(1.0, 0.05, 0.9999);
        for _ in 0..1000 {
            schedule.step();
        }
        let expected = 0.9999f64.powi(1000) as f32;
        assert!((schedule.value() - expected).abs() < 1e-4);
    }

    #[test]
    fn test_reaches_floor_and_stays() {
        let mut schedule = EpsilonSchedule::new(1.0, 0.05, 0.5);
        for _ in 0..20 {
            schedule.step();
        }
        assert_eq!(schedule.value(), 0.05);
        schedule.step();
        assert_eq!(schedule.value(), 0.05);
    }

    #[test]
    fn test_decay_one_is_constant() {
        let mut schedule = EpsilonSchedule::new(0.3, 0.05, 1.0);
        for _ in 0..100 {
            schedule.step();
        }
        assert_eq!(schedule.value(), 0.3);
    }

    proptest! {
        #[test]
        fn test_matches_closed_form_every_step(
            start in 0.5f32..=1.0,
            end in 0.0f32..0.5,
            decay in 0.5f32..=1.0,
            steps in 0usize..500,
        ) {
            let mut schedule = EpsilonSchedule::new(start, end, decay);
            for t in 1..=steps {
                schedule.step();
                let expected = (schedule.start() as f64 * (decay as f64).powi(t as i32))
                    .max(schedule.end() as f64);
                let value = schedule.value() as f64;
                prop_assert!(
                    (value - expected).abs() < 1e-4,
                    "step {}: got {}, expected {}", t, value, expected
                );
            }
            prop_assert_eq!(schedule.steps(), steps);
        }

        #[test]
        fn test_bounded_and_non_increasing(
            end in 0.0f32..0.5,
            decay in 0.5f32..1.0,
            steps in 0usize..500,
        ) {
            let mut schedule = EpsilonSchedule::new(1.0, end, decay);
            let mut previous = schedule.value();
            for _ in 0..steps {
                schedule.step();
                let value = schedule.value();
                prop_assert!(value <= previous);
                prop_assert!(value >= end);
                prop_assert!(value <= 1.0);
                previous = value;
            }
        }
    }
}
