use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use serde::{de::DeserializeOwned, Deserialize, Serialize};

use crate::{
    error::SimulationError,
    simulator::{
        default_female_share, default_migrant_age_end, default_migrant_age_start,
        DEFAULT_BIRTH_AGE,
    },
};

fn default_lifespan() -> i64 {
    80
}

fn default_start_year() -> i32 {
    2025
}

fn default_end_year() -> i32 {
    2100
}

fn default_birth_age() -> i64 {
    DEFAULT_BIRTH_AGE as i64
}

/// Labels the report already uses for its own columns.
const RESERVED_LABELS: [&str; 3] = ["years", "total", "country"];

const SHARE_TOLERANCE: f64 = 1e-9;

/// A national population split into origin groups that are projected
/// independently and summed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    pub name: String,
    pub total_population: f64,
    /// Signed so out-of-range values reach validation instead of failing to parse.
    #[serde(default = "default_lifespan")]
    pub lifespan: i64,
    #[serde(default = "default_start_year")]
    pub start_year: i32,
    #[serde(default = "default_end_year")]
    pub end_year: i32,
    #[serde(default = "default_birth_age")]
    pub birth_age: i64,
    #[serde(default = "default_female_share")]
    pub female_share: f64,
    #[serde(default)]
    pub net_migration_per_year: f64,
    #[serde(default = "default_migrant_age_start")]
    pub migrant_age_start: i64,
    #[serde(default = "default_migrant_age_end")]
    pub migrant_age_end: i64,
    pub groups: Vec<GroupConfig>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupConfig {
    pub label: String,
    pub fertility_rate: f64,
    /// Fraction of `total_population`. Omitted means "whatever is left".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub population_share: Option<f64>,
    /// Fraction of `net_migration_per_year`. Omitted means "whatever is left".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub migrant_share: Option<f64>,
}

/// A group with both shares resolved.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedGroup {
    pub label: String,
    pub fertility_rate: f64,
    pub population_share: f64,
    pub migrant_share: f64,
}

impl Default for Scenario {
    fn default() -> Self {
        Self {
            name: "Switzerland".into(),
            total_population: 9_051_029.0,
            lifespan: default_lifespan(),
            start_year: default_start_year(),
            end_year: default_end_year(),
            birth_age: default_birth_age(),
            female_share: default_female_share(),
            net_migration_per_year: 82_800.0,
            migrant_age_start: default_migrant_age_start(),
            migrant_age_end: default_migrant_age_end(),
            groups: vec![
                GroupConfig {
                    label: "nonWestern".into(),
                    fertility_rate: 1.74,
                    population_share: Some(0.0738),
                    migrant_share: Some(0.17),
                },
                GroupConfig {
                    label: "western".into(),
                    fertility_rate: 1.21,
                    population_share: None,
                    migrant_share: None,
                },
            ],
        }
    }
}

impl Scenario {
    /// Lifespan and birth age as vector indices.
    pub fn age_bounds(&self) -> Result<(usize, usize), SimulationError> {
        let lifespan = usize::try_from(self.lifespan)
            .ok()
            .filter(|&lifespan| lifespan > 0)
            .ok_or_else(|| {
                SimulationError::invalid("lifespan", format!("must be positive, got {}", self.lifespan))
            })?;
        let birth_age = usize::try_from(self.birth_age)
            .ok()
            .filter(|&age| age < lifespan)
            .ok_or_else(|| {
                SimulationError::invalid(
                    "birth_age",
                    format!("must be within [0, {}], got {}", lifespan - 1, self.birth_age),
                )
            })?;
        Ok((lifespan, birth_age))
    }

    /// Checks the group table and fills in omitted shares.
    pub fn resolve_groups(&self) -> Result<Vec<ResolvedGroup>, SimulationError> {
        if self.groups.is_empty() {
            return Err(SimulationError::invalid(
                "groups",
                "scenario must define at least one group",
            ));
        }

        let mut seen: Vec<&str> = Vec::with_capacity(self.groups.len());
        for group in &self.groups {
            let label = group.label.as_str();
            if label.trim().is_empty() {
                return Err(SimulationError::invalid("label", "must not be empty"));
            }
            if RESERVED_LABELS.contains(&label) {
                return Err(SimulationError::invalid(
                    "label",
                    format!("'{label}' is reserved"),
                ));
            }
            if seen.contains(&label) {
                return Err(SimulationError::invalid(
                    "label",
                    format!("'{label}' defined more than once"),
                ));
            }
            seen.push(label);
        }

        let population = resolve_shares(
            "population_share",
            self.groups.iter().map(|g| g.population_share),
        )?;
        let migrants = resolve_shares(
            "migrant_share",
            self.groups.iter().map(|g| g.migrant_share),
        )?;

        Ok(self
            .groups
            .iter()
            .zip(population)
            .zip(migrants)
            .map(|((group, population_share), migrant_share)| ResolvedGroup {
                label: group.label.clone(),
                fertility_rate: group.fertility_rate,
                population_share,
                migrant_share,
            })
            .collect())
    }
}

fn resolve_shares(
    field: &str,
    shares: impl Iterator<Item = Option<f64>>,
) -> Result<Vec<f64>, SimulationError> {
    let shares: Vec<Option<f64>> = shares.collect();
    let mut explicit = 0.0;
    let mut remainder_slot = None;
    for (idx, share) in shares.iter().enumerate() {
        match share {
            Some(value) => {
                if !value.is_finite() || !(0.0..=1.0).contains(value) {
                    return Err(SimulationError::invalid(
                        field,
                        format!("must be within [0, 1], got {value}"),
                    ));
                }
                explicit += value;
            }
            None if remainder_slot.is_some() => {
                return Err(SimulationError::invalid(
                    field,
                    "may be omitted for at most one group",
                ));
            }
            None => remainder_slot = Some(idx),
        }
    }
    if explicit > 1.0 + SHARE_TOLERANCE {
        return Err(SimulationError::invalid(
            field,
            format!("shares add up to {explicit}, more than 1"),
        ));
    }
    let remainder = (1.0 - explicit).max(0.0);
    Ok(shares
        .iter()
        .enumerate()
        .map(|(idx, share)| match share {
            Some(value) => *value,
            None if remainder_slot == Some(idx) => remainder,
            None => 0.0,
        })
        .collect())
}

pub struct ScenarioLoader {
    base_dir: PathBuf,
}

impl ScenarioLoader {
    pub fn new(base_dir: impl AsRef<Path>) -> Self {
        Self {
            base_dir: base_dir.as_ref().to_path_buf(),
        }
    }

    /// Reads a `.json` or YAML scenario, picked by file extension.
    pub fn load(&self, file: impl AsRef<Path>) -> Result<Scenario> {
        let path = self.base_dir.join(file);
        let scenario: Scenario = read_document(&path)?;
        tracing::info!(
            scenario = %scenario.name,
            path = %path.display(),
            groups = scenario.groups.len(),
            "scenario loaded"
        );
        Ok(scenario)
    }

    pub(crate) fn resolve(&self, file: impl AsRef<Path>) -> PathBuf {
        self.base_dir.join(file)
    }
}

/// Parses JSON for `.json` files and YAML for anything else.
pub(crate) fn read_document<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let data = fs::read_to_string(path)
        .with_context(|| format!("Failed to read scenario file {}", path.display()))?;
    let is_json = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
    let document = if is_json {
        serde_json::from_str(&data).with_context(|| format!("Failed to parse {}", path.display()))?
    } else {
        serde_yaml::from_str(&data).with_context(|| format!("Failed to parse {}", path.display()))?
    };
    Ok(document)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulator::{MigrationConfig, SimulationConfig};

    fn group(label: &str, population: Option<f64>, migrants: Option<f64>) -> GroupConfig {
        GroupConfig {
            label: label.into(),
            fertility_rate: 1.5,
            population_share: population,
            migrant_share: migrants,
        }
    }

    #[test]
    fn default_scenario_resolves_remainder_group() {
        let groups = Scenario::default().resolve_groups().unwrap();
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].population_share, 0.0738);
        assert!((groups[1].population_share - 0.9262).abs() < 1e-12);
        assert!((groups[1].migrant_share - 0.83).abs() < 1e-12);
    }

    #[test]
    fn rejects_two_remainder_groups() {
        let scenario = Scenario {
            groups: vec![group("a", None, Some(0.5)), group("b", None, Some(0.5))],
            ..Scenario::default()
        };
        assert!(scenario.resolve_groups().is_err());
    }

    #[test]
    fn rejects_shares_above_one() {
        let scenario = Scenario {
            groups: vec![
                group("a", Some(0.7), Some(0.5)),
                group("b", Some(0.4), Some(0.5)),
            ],
            ..Scenario::default()
        };
        let err = scenario.resolve_groups().unwrap_err();
        assert!(err.to_string().contains("population_share"));
    }

    #[test]
    fn rejects_duplicate_and_reserved_labels() {
        let duplicate = Scenario {
            groups: vec![group("a", Some(0.5), None), group("a", None, Some(1.0))],
            ..Scenario::default()
        };
        assert!(duplicate.resolve_groups().is_err());

        let reserved = Scenario {
            groups: vec![group("total", None, None)],
            ..Scenario::default()
        };
        assert!(reserved.resolve_groups().is_err());

        let empty = Scenario {
            groups: Vec::new(),
            ..Scenario::default()
        };
        assert!(empty.resolve_groups().is_err());
    }

    #[test]
    fn negative_ages_are_invalid_config() {
        let scenario = Scenario {
            lifespan: -1,
            ..Scenario::default()
        };
        let err = scenario.age_bounds().unwrap_err();
        assert!(matches!(err, SimulationError::InvalidConfig { ref field, .. } if field == "lifespan"));

        let scenario = Scenario {
            birth_age: -3,
            ..Scenario::default()
        };
        let err = scenario.age_bounds().unwrap_err();
        assert!(matches!(err, SimulationError::InvalidConfig { ref field, .. } if field == "birth_age"));

        assert_eq!(Scenario::default().age_bounds().unwrap(), (80, 30));
    }

    #[test]
    fn negative_lifespan_parses_then_fails_validation() {
        let scenario: Scenario = serde_json::from_str(
            r#"{"name": "x", "total_population": 10, "lifespan": -1,
                "groups": [{"label": "all", "fertility_rate": 1.0}]}"#,
        )
        .unwrap();
        assert_eq!(scenario.lifespan, -1);
        assert!(scenario.age_bounds().is_err());
    }

    #[test]
    fn omitted_fields_share_simulation_defaults() {
        let scenario: Scenario =
            serde_json::from_str(r#"{"name": "x", "total_population": 1, "groups": []}"#).unwrap();
        let config = SimulationConfig::new(1.0, 1.0, 80, 2025, 2030);
        let migration: MigrationConfig = serde_json::from_str(r#"{"per_year": 1.0}"#).unwrap();
        assert_eq!(scenario.age_bounds().unwrap().1, config.birth_age);
        assert_eq!(scenario.female_share, config.female_share);
        assert_eq!(scenario.migrant_age_start, migration.age_range_start);
        assert_eq!(scenario.migrant_age_end, migration.age_range_end);
    }

    #[test]
    fn single_group_takes_everything() {
        let scenario = Scenario {
            groups: vec![group("all", None, None)],
            ..Scenario::default()
        };
        let groups = scenario.resolve_groups().unwrap();
        assert_eq!(groups[0].population_share, 1.0);
        assert_eq!(groups[0].migrant_share, 1.0);
    }

    #[test]
    fn loader_reads_json_and_yaml() {
        let dir = tempfile::tempdir().unwrap();
        let yaml = "name: island\ntotal_population: 1000\ngroups:\n  - label: everyone\n    fertility_rate: 2.0\n";
        std::fs::write(dir.path().join("island.yaml"), yaml).unwrap();
        let json = r#"{"name": "island", "total_population": 1000,
            "groups": [{"label": "everyone", "fertility_rate": 2.0}]}"#;
        std::fs::write(dir.path().join("island.json"), json).unwrap();

        let loader = ScenarioLoader::new(dir.path());
        let from_yaml = loader.load("island.yaml").unwrap();
        let from_json = loader.load("island.json").unwrap();
        assert_eq!(from_yaml, from_json);
        assert_eq!(from_yaml.lifespan, 80);
        assert_eq!(from_yaml.end_year, 2100);
        assert_eq!(from_yaml.net_migration_per_year, 0.0);
    }

    #[test]
    fn loader_reports_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = ScenarioLoader::new(dir.path())
            .load("missing.yaml")
            .unwrap_err();
        assert!(err.to_string().contains("Failed to read scenario file"));
    }
}
