//! Country scenarios selectable by slug.

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::{
    error::SimulationError,
    scenario::{read_document, Scenario, ScenarioLoader},
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Country {
    pub slug: String,
    #[serde(flatten)]
    pub scenario: Scenario,
}

impl Country {
    pub fn info(&self) -> CountryInfo {
        CountryInfo {
            slug: self.slug.clone(),
            name: self.scenario.name.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Catalog {
    /// Slug served when no country is requested.
    pub default: String,
    pub countries: Vec<Country>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CountryInfo {
    pub slug: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CountryListing {
    pub default: String,
    pub countries: Vec<CountryInfo>,
}

impl Catalog {
    /// Wraps one scenario, slugged from its name.
    pub fn single(scenario: Scenario) -> Self {
        let slug = slugify(&scenario.name);
        Self {
            default: slug.clone(),
            countries: vec![Country { slug, scenario }],
        }
    }

    pub fn builtin() -> Self {
        Self::single(Scenario::default())
    }

    pub fn validate(&self) -> Result<(), SimulationError> {
        if self.countries.is_empty() {
            return Err(SimulationError::invalid(
                "countries",
                "catalog must define at least one country",
            ));
        }
        let mut seen: Vec<&str> = Vec::with_capacity(self.countries.len());
        for country in &self.countries {
            let slug = country.slug.as_str();
            if slug.trim().is_empty() {
                return Err(SimulationError::invalid("slug", "must not be empty"));
            }
            if seen.contains(&slug) {
                return Err(SimulationError::invalid(
                    "slug",
                    format!("'{slug}' defined more than once"),
                ));
            }
            seen.push(slug);
        }
        if !seen.contains(&self.default.as_str()) {
            return Err(SimulationError::invalid(
                "default",
                format!("'{}' is not a listed country", self.default),
            ));
        }
        Ok(())
    }

    pub fn get(&self, slug: &str) -> Option<&Country> {
        self.countries.iter().find(|c| c.slug == slug)
    }

    /// The requested country, or the default when `slug` is `None`.
    pub fn select(&self, slug: Option<&str>) -> Option<&Country> {
        self.get(slug.unwrap_or(&self.default))
    }

    pub fn listing(&self) -> CountryListing {
        CountryListing {
            default: self.default.clone(),
            countries: self.countries.iter().map(Country::info).collect(),
        }
    }
}

impl ScenarioLoader {
    /// Reads either a catalog (a document with `countries`) or a single
    /// scenario, which becomes a one-country catalog.
    pub fn load_catalog(&self, file: impl AsRef<Path>) -> Result<Catalog> {
        let path = self.resolve(file);
        let document: serde_json::Value = read_document(&path)?;
        let catalog = if document.get("countries").is_some() {
            serde_json::from_value::<Catalog>(document)
                .with_context(|| format!("Failed to parse catalog {}", path.display()))?
        } else {
            Catalog::single(
                serde_json::from_value::<Scenario>(document)
                    .with_context(|| format!("Failed to parse {}", path.display()))?,
            )
        };
        tracing::info!(
            path = %path.display(),
            countries = catalog.countries.len(),
            default = %catalog.default,
            "catalog loaded"
        );
        Ok(catalog)
    }
}

fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    for ch in name.chars() {
        if ch.is_alphanumeric() {
            slug.extend(ch.to_lowercase());
        } else if !slug.is_empty() && !slug.ends_with('-') {
            slug.push('-');
        }
    }
    while slug.ends_with('-') {
        slug.pop();
    }
    slug
}
