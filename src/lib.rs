pub mod catalog;
pub mod cohort;
pub mod error;
pub mod projection;
pub mod scenario;
pub mod series;
pub mod simulator;
pub mod web;

pub use catalog::{Catalog, Country};
pub use error::SimulationError;
pub use projection::{project, Projection, ProjectionOptions, ProjectionReport};
pub use scenario::{Scenario, ScenarioLoader};
pub use series::{YearPoint, YearSeries};
pub use simulator::{simulate, CohortSimulator, MigrationConfig, SimulationConfig, YearStep};
