//! Growth-ratio policy for buffer reallocation.

use crate::error::{ConfigError, TryReserveError};

/// Rational factor applied to a buffer's capacity when it must grow.
///
/// Validated at construction: the ratio is always strictly greater than
/// one, which is what makes repeated single-element appends amortized
/// O(1). All values are immutable after creation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct GrowthRatio {
    numerator: usize,
    denominator: usize,
}

impl GrowthRatio {
    /// Double the capacity on every reallocation. The default.
    pub const DOUBLE: Self = Self {
        numerator: 2,
        denominator: 1,
    };

    /// Grow by half of the current capacity on every reallocation.
    pub const ONE_AND_A_HALF: Self = Self {
        numerator: 3,
        denominator: 2,
    };

    /// Create a ratio of `numerator / denominator`.
    ///
    /// Returns [`ConfigError::ZeroDenominator`] for a zero denominator and
    /// [`ConfigError::RatioNotGrowing`] unless `numerator > denominator`.
    pub const fn new(numerator: usize, denominator: usize) -> Result<Self, ConfigError> {
        if denominator == 0 {
            return Err(ConfigError::ZeroDenominator);
        }
        if numerator <= denominator {
            return Err(ConfigError::RatioNotGrowing {
                numerator,
                denominator,
            });
        }
        Ok(Self {
            numerator,
            denominator,
        })
    }

    /// The ratio's numerator.
    pub const fn numerator(&self) -> usize {
        self.numerator
    }

    /// The ratio's denominator.
    pub const fn denominator(&self) -> usize {
        self.denominator
    }

    /// The ratio as a float, for reporting and for bounding reallocation
    /// counts in tests.
    pub fn as_f64(&self) -> f64 {
        self.numerator as f64 / self.denominator as f64
    }

    /// `capacity * ratio`, or `None` if the product does not fit in `usize`.
    pub fn scale(&self, capacity: usize) -> Option<usize> {
        let whole = (capacity / self.denominator).checked_mul(self.numerator)?;
        let part = (capacity % self.denominator).checked_mul(self.numerator)? / self.denominator;
        whole.checked_add(part)
    }

    /// Next capacity for a buffer of `current` capacity that must hold
    /// `required` elements: `max(ratio * current, required)`, capped at
    /// `max`. A non-zero `current` always yields at least `current + 1`
    /// when `max` allows it.
    ///
    /// Fails with [`TryReserveError::CapacityOverflow`] when `required`
    /// itself exceeds `max`. A scaled capacity that overflows `usize`
    /// saturates to `max`.
    pub fn recommend(
        &self,
        current: usize,
        required: usize,
        max: usize,
    ) -> Result<usize, TryReserveError> {
        if required > max {
            return Err(TryReserveError::CapacityOverflow {
                requested: required,
                max,
            });
        }
        let mut scaled = self.scale(current).unwrap_or(max);
        if current > 0 {
            // Small capacities can round back down to themselves.
            scaled = scaled.max(current.saturating_add(1));
        }
        Ok(scaled.max(required).min(max))
    }
}

impl Default for GrowthRatio {
    fn default() -> Self {
        Self::DOUBLE
    }
}
