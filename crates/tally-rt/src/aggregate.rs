/// Running sum of partial results.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Aggregator {
    total: u128,
    count: usize,
}

impl Aggregator {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn add(&mut self, value: u128) {
        self.total += value;
        self.count += 1;
    }

    /// Sum of everything added so far.
    #[inline]
    pub fn total(&self) -> u128 {
        self.total
    }

    /// Number of values added so far.
    #[inline]
    pub fn count(&self) -> usize {
        self.count
    }
}

impl Extend<u128> for Aggregator {
    fn extend<I: IntoIterator<Item = u128>>(&mut self, values: I) {
        for value in values {
            self.add(value);
        }
    }
}

impl FromIterator<u128> for Aggregator {
    fn from_iter<I: IntoIterator<Item = u128>>(values: I) -> Self {
        let mut aggregator = Self::new();
        aggregator.extend(values);
        aggregator
    }
}

/// `1 + 2 + ... + n`, the oracle every strategy must reproduce.
pub fn expected_total(n: u64) -> u128 {
    let n = u128::from(n);
    n * (n + 1) / 2
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_aggregator_counts_and_sums() {
        let aggregator: Aggregator = [3, 7, 11, 34].into_iter().collect();
        assert_eq!(aggregator.total(), 55);
        assert_eq!(aggregator.count(), 4);
    }

    #[test]
    fn test_expected_total() {
        assert_eq!(expected_total(1), 1);
        assert_eq!(expected_total(20), 210);
        assert_eq!(expected_total(100), 5050);
    }
}
