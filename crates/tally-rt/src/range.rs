use std::fmt;

use crate::error::{RunError, RunResult};

/// How a participant turns a range into its sum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SumMethod {
    /// Gauss' formula, constant time.
    #[default]
    ClosedForm,
    /// Adds every element in turn. Slow on purpose, for timing comparisons.
    Iterative,
}

/// A non-empty, inclusive range of positive integers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Range {
    start: u64,
    end: u64,
}

impl Range {
    /// Creates `[start, end]`. Requires `1 <= start <= end`.
    pub fn new(start: u64, end: u64) -> RunResult<Self> {
        if start == 0 {
            return Err(RunError::InvalidInput(format!(
                "range [{}, {}] must start at 1 or above",
                start, end
            )));
        }
        if start > end {
            return Err(RunError::InvalidInput(format!(
                "range [{}, {}] is empty",
                start, end
            )));
        }
        Ok(Self { start, end })
    }

    /// Bounds are validated by the caller.
    #[inline]
    pub(crate) fn from_bounds(start: u64, end: u64) -> Self {
        debug_assert!(start >= 1 && start <= end);
        Self { start, end }
    }

    #[inline]
    pub fn start(&self) -> u64 {
        self.start
    }

    #[inline]
    pub fn end(&self) -> u64 {
        self.end
    }

    /// Number of integers in the range.
    #[inline]
    pub fn len(&self) -> u64 {
        self.end - self.start + 1
    }

    /// Always false; kept for the `len` convention.
    #[inline]
    pub fn is_empty(&self) -> bool {
        false
    }

    #[inline]
    pub fn contains(&self, value: u64) -> bool {
        self.start <= value && value <= self.end
    }

    /// Sum of every integer in the range, in closed form.
    pub fn sum(&self) -> u128 {
        let first = u128::from(self.start);
        let last = u128::from(self.end);
        (first + last) * (last - first + 1) / 2
    }

    pub fn sum_with(&self, method: SumMethod) -> u128 {
        match method {
            SumMethod::ClosedForm => self.sum(),
            SumMethod::Iterative => (self.start..=self.end).map(u128::from).sum(),
        }
    }
}

impl fmt::Display for Range {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}]", self.start, self.end)
    }
}
