//! Multi-population projections built from independent single-population runs.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::{
    error::Result,
    scenario::Scenario,
    series::YearSeries,
    simulator::{simulate, MigrationConfig, SimulationConfig},
};

#[derive(Debug, Clone, Copy)]
pub struct ProjectionOptions {
    /// When false every migration stream is zeroed before simulating.
    pub migration: bool,
}

impl Default for ProjectionOptions {
    fn default() -> Self {
        Self { migration: true }
    }
}

/// Per-group series plus their sum, keyed the way chart clients expect:
/// `{ "years": [..], "total": [..], "<label>": [..] }`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProjectionReport {
    pub years: Vec<i32>,
    pub total: Vec<f64>,
    #[serde(flatten)]
    pub groups: BTreeMap<String, Vec<f64>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GroupSeries {
    pub label: String,
    pub series: YearSeries,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Projection {
    pub groups: Vec<GroupSeries>,
    pub total: YearSeries,
}

impl Projection {
    pub fn report(&self) -> ProjectionReport {
        ProjectionReport {
            years: self.total.years(),
            total: self.total.totals(),
            groups: self
                .groups
                .iter()
                .map(|g| (g.label.clone(), g.series.totals()))
                .collect(),
        }
    }
}

pub fn project(scenario: &Scenario, options: ProjectionOptions) -> Result<Projection> {
    let (lifespan, birth_age) = scenario.age_bounds()?;
    let groups = scenario.resolve_groups()?;
    let net_migration = if options.migration {
        scenario.net_migration_per_year
    } else {
        0.0
    };

    let mut results = Vec::with_capacity(groups.len());
    for group in &groups {
        let config = SimulationConfig {
            initial_population: scenario.total_population * group.population_share,
            fertility_rate: group.fertility_rate,
            lifespan,
            start_year: scenario.start_year,
            end_year: scenario.end_year,
            birth_age,
            female_share: scenario.female_share,
        };
        let migration = MigrationConfig::new(
            net_migration * group.migrant_share,
            scenario.migrant_age_start,
            scenario.migrant_age_end,
        );
        let series = simulate(&config, std::slice::from_ref(&migration))?;
        results.push(GroupSeries {
            label: group.label.clone(),
            series,
        });
    }

    let total = YearSeries::sum_by_year(results.iter().map(|g| &g.series));
    tracing::debug!(
        scenario = %scenario.name,
        groups = results.len(),
        migration = options.migration,
        "projection assembled"
    );
    Ok(Projection {
        groups: results,
        total,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{error::SimulationError, scenario::GroupConfig};

    #[test]
    fn report_flattens_group_columns() {
        let scenario = Scenario {
            end_year: 2026,
            ..Scenario::default()
        };
        let report = project(&scenario, ProjectionOptions::default())
            .unwrap()
            .report();
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["years"], serde_json::json!([2025, 2026]));
        assert_eq!(json["total"].as_array().unwrap().len(), 2);
        assert_eq!(json["nonWestern"].as_array().unwrap().len(), 2);
        assert_eq!(json["western"].as_array().unwrap().len(), 2);
    }

    #[test]
    fn first_year_matches_total_population() {
        let projection = project(&Scenario::default(), ProjectionOptions::default()).unwrap();
        let first = projection.total.first().unwrap();
        assert_eq!(first.year, 2025);
        assert!((first.total - 9_051_029.0).abs() < 1e-3);
        assert_eq!(projection.total.len(), 76);
    }

    #[test]
    fn migration_off_zeroes_inflow() {
        let scenario = Scenario {
            groups: vec![GroupConfig {
                label: "all".into(),
                fertility_rate: 0.0,
                population_share: None,
                migrant_share: None,
            }],
            end_year: 2110,
            ..Scenario::default()
        };
        let on = project(&scenario, ProjectionOptions::default()).unwrap();
        let off = project(&scenario, ProjectionOptions { migration: false }).unwrap();
        assert!(on.total.total_for(2030).unwrap() > off.total.total_for(2030).unwrap());
        assert_eq!(off.total.total_for(2105), Some(0.0));
        assert_eq!(off.total.total_for(2111), None);
    }

    #[test]
    fn invalid_group_config_propagates() {
        let scenario = Scenario {
            birth_age: 90,
            ..Scenario::default()
        };
        assert!(project(&scenario, ProjectionOptions::default()).is_err());

        let scenario = Scenario {
            lifespan: 0,
            ..Scenario::default()
        };
        let err = project(&scenario, ProjectionOptions::default()).unwrap_err();
        assert_eq!(err, SimulationError::invalid("lifespan", "must be positive, got 0"));
    }
}
