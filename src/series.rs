use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct YearPoint {
    pub year: i32,
    pub total: f64,
}

/// One total per simulated year, ascending by year.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct YearSeries {
    points: Vec<YearPoint>,
}

impl YearSeries {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            points: Vec::with_capacity(capacity),
        }
    }

    /// Appends a point. Callers push years in ascending order.
    pub fn push(&mut self, year: i32, total: f64) {
        debug_assert!(self.points.last().map_or(true, |p| p.year < year));
        self.points.push(YearPoint { year, total });
    }

    pub fn points(&self) -> &[YearPoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn first(&self) -> Option<&YearPoint> {
        self.points.first()
    }

    pub fn last(&self) -> Option<&YearPoint> {
        self.points.last()
    }

    pub fn total_for(&self, year: i32) -> Option<f64> {
        self.points
            .binary_search_by_key(&year, |p| p.year)
            .ok()
            .map(|idx| self.points[idx].total)
    }

    pub fn years(&self) -> Vec<i32> {
        self.points.iter().map(|p| p.year).collect()
    }

    pub fn totals(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.total).collect()
    }

    /// Adds the series together by matching year. A year present in only some
    /// inputs sums over the ones that have it.
    pub fn sum_by_year<'a>(series: impl IntoIterator<Item = &'a YearSeries>) -> YearSeries {
        let mut sums: BTreeMap<i32, f64> = BTreeMap::new();
        for s in series {
            for point in &s.points {
                *sums.entry(point.year).or_insert(0.0) += point.total;
            }
        }
        YearSeries {
            points: sums
                .into_iter()
                .map(|(year, total)| YearPoint { year, total })
                .collect(),
        }
    }
}
