use std::iter::Sum;
use std::ops::{Add, AddAssign};

use serde::{Deserialize, Serialize};

/// Running totals of one accumulator.
///
/// Totals are integers, so `merge` is exactly associative and commutative:
/// any reduction tree over any number of workers yields the same pair.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AccumulatorState {
    pub distance_sum: u64,
    pub reference_unit_count: u64,
}

impl AccumulatorState {
    pub const ZERO: Self = Self {
        distance_sum: 0,
        reference_unit_count: 0,
    };

    pub fn new(distance_sum: u64, reference_unit_count: u64) -> Self {
        Self {
            distance_sum,
            reference_unit_count,
        }
    }

    /// Pairwise sum of two states.
    #[must_use]
    pub fn merge(self, other: Self) -> Self {
        Self {
            distance_sum: self.distance_sum + other.distance_sum,
            reference_unit_count: self.reference_unit_count + other.reference_unit_count,
        }
    }

    /// `distance_sum / reference_unit_count`; NaN or infinite when there are
    /// no reference units.
    pub fn rate(&self) -> f64 {
        self.distance_sum as f64 / self.reference_unit_count as f64
    }
}

impl Add for AccumulatorState {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        self.merge(rhs)
    }
}

impl AddAssign for AccumulatorState {
    fn add_assign(&mut self, rhs: Self) {
        *self = self.merge(rhs);
    }
}

impl Sum for AccumulatorState {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::ZERO, Self::merge)
    }
}

impl<'a> Sum<&'a AccumulatorState> for AccumulatorState {
    fn sum<I: Iterator<Item = &'a Self>>(iter: I) -> Self {
        iter.copied().sum()
    }
}
