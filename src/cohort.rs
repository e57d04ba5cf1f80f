use serde::{Deserialize, Serialize};

/// Head counts indexed by age in whole years. Length is fixed to the lifespan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgeVector(Vec<f64>);

impl AgeVector {
    /// Spreads `population` evenly over `lifespan` age slots.
    pub fn uniform(population: f64, lifespan: usize) -> Self {
        let per_age = if lifespan == 0 {
            0.0
        } else {
            population / lifespan as f64
        };
        Self(vec![per_age; lifespan])
    }

    pub fn lifespan(&self) -> usize {
        self.0.len()
    }

    pub fn get(&self, age: usize) -> f64 {
        self.0.get(age).copied().unwrap_or(0.0)
    }

    pub fn total(&self) -> f64 {
        self.0.iter().sum()
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }

    /// Adds `amount` split evenly over every age in `span`. Returns what was added.
    pub fn add_across(&mut self, span: MigrantSpan, amount: f64) -> f64 {
        let per_age = amount / span.len() as f64;
        let mut added = 0.0;
        for slot in &mut self.0[span.start..=span.end] {
            *slot += per_age;
            added += per_age;
        }
        added
    }

    /// Shifts every cohort one year older and puts `newborns` at age zero.
    /// Returns the oldest cohort, which has no slot to move into.
    pub fn advance(&mut self, newborns: f64) -> f64 {
        let Some(&aged_out) = self.0.last() else {
            return 0.0;
        };
        self.0.rotate_right(1);
        self.0[0] = newborns;
        aged_out
    }
}

/// Inclusive age range a migration stream is spread across, already clamped
/// into `[0, lifespan - 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MigrantSpan {
    pub start: usize,
    pub end: usize,
}

impl MigrantSpan {
    /// Clamps both bounds into the age vector. An inverted range yields `None`.
    pub fn clamped(start: i64, end: i64, lifespan: usize) -> Option<Self> {
        if lifespan == 0 {
            return None;
        }
        let top = (lifespan - 1) as i64;
        let start = start.clamp(0, top);
        let end = end.clamp(0, top);
        if end < start {
            return None;
        }
        Some(Self {
            start: start as usize,
            end: end as usize,
        })
    }

    #[allow(clippy::len_without_is_empty)]
    pub fn len(&self) -> usize {
        self.end - self.start + 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uniform_seed_fills_every_age() {
        let ages = AgeVector::uniform(800.0, 80);
        assert_eq!(ages.lifespan(), 80);
        assert!(ages.as_slice().iter().all(|&v| v == 10.0));
        assert_eq!(ages.total(), 800.0);
    }

    #[test]
    fn advance_discards_oldest_and_inserts_newborns() {
        let mut ages = AgeVector(vec![1.0, 2.0, 3.0, 4.0]);
        let aged_out = ages.advance(9.0);
        assert_eq!(aged_out, 4.0);
        assert_eq!(ages.as_slice(), &[9.0, 1.0, 2.0, 3.0]);
    }

    #[test]
    fn add_across_splits_evenly() {
        let mut ages = AgeVector::uniform(0.0, 10);
        let span = MigrantSpan::clamped(2, 5, 10).unwrap();
        let added = ages.add_across(span, 100.0);
        assert_eq!(added, 100.0);
        assert_eq!(ages.get(1), 0.0);
        assert_eq!(ages.get(2), 25.0);
        assert_eq!(ages.get(5), 25.0);
        assert_eq!(ages.get(6), 0.0);
    }

    #[test]
    fn span_clamps_out_of_range_bounds() {
        assert_eq!(
            MigrantSpan::clamped(90, 95, 80),
            Some(MigrantSpan { start: 79, end: 79 })
        );
        assert_eq!(
            MigrantSpan::clamped(-5, 3, 80),
            Some(MigrantSpan { start: 0, end: 3 })
        );
        assert_eq!(MigrantSpan::clamped(40, 20, 80), None);
        assert_eq!(MigrantSpan::clamped(0, 10, 0), None);
    }

    #[test]
    fn out_of_range_lookup_reads_zero() {
        let ages = AgeVector::uniform(10.0, 5);
        assert_eq!(ages.get(5), 0.0);
    }
}
