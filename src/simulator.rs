//! Discrete-time age-cohort projection.
//!
//! Each simulated year records the current total, then computes births from
//! the single cohort at `birth_age`, adds migrants, ages every cohort by one
//! year and finally places the newborns at age zero.

use serde::{Deserialize, Serialize};

use crate::{
    cohort::{AgeVector, MigrantSpan},
    error::{Result, SimulationError},
    series::YearSeries,
};

pub(crate) const DEFAULT_BIRTH_AGE: usize = 30;

/// Years of output reserved up front; longer windows grow the series as they go.
const PREALLOCATED_YEARS: usize = 256;

fn default_birth_age() -> usize {
    DEFAULT_BIRTH_AGE
}

pub(crate) fn default_female_share() -> f64 {
    0.5
}

pub(crate) fn default_migrant_age_start() -> i64 {
    20
}

pub(crate) fn default_migrant_age_end() -> i64 {
    40
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationConfig {
    pub initial_population: f64,
    pub fertility_rate: f64,
    pub lifespan: usize,
    pub start_year: i32,
    pub end_year: i32,
    #[serde(default = "default_birth_age")]
    pub birth_age: usize,
    #[serde(default = "default_female_share")]
    pub female_share: f64,
}

impl SimulationConfig {
    /// Config with the default birth age and female share.
    pub fn new(
        initial_population: f64,
        fertility_rate: f64,
        lifespan: usize,
        start_year: i32,
        end_year: i32,
    ) -> Self {
        Self {
            initial_population,
            fertility_rate,
            lifespan,
            start_year,
            end_year,
            birth_age: default_birth_age(),
            female_share: default_female_share(),
        }
    }

    pub fn validate(&self) -> Result<()> {
        non_negative("initial_population", self.initial_population)?;
        non_negative("fertility_rate", self.fertility_rate)?;
        if !self.female_share.is_finite() || !(0.0..=1.0).contains(&self.female_share) {
            return Err(SimulationError::invalid(
                "female_share",
                format!("must be within [0, 1], got {}", self.female_share),
            ));
        }
        if self.lifespan == 0 {
            return Err(SimulationError::invalid("lifespan", "must be positive"));
        }
        if self.birth_age >= self.lifespan {
            return Err(SimulationError::invalid(
                "birth_age",
                format!(
                    "must be within [0, {}], got {}",
                    self.lifespan - 1,
                    self.birth_age
                ),
            ));
        }
        if self.end_year < self.start_year {
            return Err(SimulationError::invalid(
                "end_year",
                format!(
                    "{} is before start_year {}",
                    self.end_year, self.start_year
                ),
            ));
        }
        Ok(())
    }
}

/// A yearly inflow (or outflow, when negative) spread over an age band.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MigrationConfig {
    pub per_year: f64,
    #[serde(default = "default_migrant_age_start")]
    pub age_range_start: i64,
    #[serde(default = "default_migrant_age_end")]
    pub age_range_end: i64,
}

impl MigrationConfig {
    pub fn new(per_year: f64, age_range_start: i64, age_range_end: i64) -> Self {
        Self {
            per_year,
            age_range_start,
            age_range_end,
        }
    }

    fn validate(&self) -> Result<()> {
        if !self.per_year.is_finite() {
            return Err(SimulationError::invalid(
                "per_year",
                format!("must be finite, got {}", self.per_year),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy)]
struct MigrationStream {
    per_year: f64,
    span: MigrantSpan,
}

/// What happened in one simulated year.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct YearStep {
    pub year: i32,
    /// Total before this year's births, migration and aging.
    pub total: f64,
    pub births: f64,
    pub aged_out: f64,
    pub migrants: f64,
}

pub struct CohortSimulator {
    ages: AgeVector,
    streams: Vec<MigrationStream>,
    birth_age: usize,
    female_share: f64,
    fertility_rate: f64,
    year: i32,
    end_year: i32,
    finished: bool,
}

impl CohortSimulator {
    pub fn new(config: &SimulationConfig, migrations: &[MigrationConfig]) -> Result<Self> {
        config.validate()?;
        for migration in migrations {
            migration.validate()?;
        }

        // Zero streams and inverted bands contribute nothing.
        let streams = migrations
            .iter()
            .filter(|m| m.per_year != 0.0)
            .filter_map(|m| {
                MigrantSpan::clamped(m.age_range_start, m.age_range_end, config.lifespan)
                    .map(|span| MigrationStream {
                        per_year: m.per_year,
                        span,
                    })
            })
            .collect();

        Ok(Self {
            ages: AgeVector::uniform(config.initial_population, config.lifespan),
            streams,
            birth_age: config.birth_age,
            female_share: config.female_share,
            fertility_rate: config.fertility_rate,
            year: config.start_year,
            end_year: config.end_year,
            finished: false,
        })
    }

    pub fn ages(&self) -> &AgeVector {
        &self.ages
    }

    /// The year the next call to [`step`](Self::step) will record.
    pub fn current_year(&self) -> Option<i32> {
        (!self.finished).then_some(self.year)
    }

    pub fn step(&mut self) -> Option<YearStep> {
        if self.finished {
            return None;
        }
        let year = self.year;
        let total = self.ages.total();

        let births = self.ages.get(self.birth_age) * self.female_share * self.fertility_rate;

        let mut migrants = 0.0;
        for stream in &self.streams {
            migrants += self.ages.add_across(stream.span, stream.per_year);
        }

        let aged_out = self.ages.advance(births);

        if year >= self.end_year {
            self.finished = true;
        } else {
            self.year += 1;
        }

        Some(YearStep {
            year,
            total,
            births,
            aged_out,
            migrants,
        })
    }

    pub fn run(mut self) -> YearSeries {
        let mut series = YearSeries::with_capacity(series_capacity(self.year, self.end_year));
        while let Some(step) = self.step() {
            series.push(step.year, step.total);
        }
        tracing::debug!(
            lifespan = self.ages.lifespan(),
            years = series.len(),
            streams = self.streams.len(),
            final_total = series.last().map(|p| p.total),
            "cohort projection complete"
        );
        series
    }
}

/// Projects one population over `[start_year, end_year]`.
pub fn simulate(config: &SimulationConfig, migrations: &[MigrationConfig]) -> Result<YearSeries> {
    Ok(CohortSimulator::new(config, migrations)?.run())
}

fn series_capacity(start_year: i32, end_year: i32) -> usize {
    let years = (i64::from(end_year) - i64::from(start_year) + 1).max(0);
    usize::try_from(years).map_or(PREALLOCATED_YEARS, |y| y.min(PREALLOCATED_YEARS))
}

fn non_negative(field: &str, value: f64) -> Result<()> {
    if !value.is_finite() || value < 0.0 {
        return Err(SimulationError::invalid(
            field,
            format!("must be a finite non-negative number, got {value}"),
        ));
    }
    Ok(())
}
