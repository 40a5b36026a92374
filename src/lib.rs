//! Client for the IFRC GO appeal and surge alert endpoints, with a
//! choropleth map of appeals per country.

pub mod aggregate;
pub mod client;
pub mod config;
pub mod error;
pub mod fields;
pub mod lookup;
pub mod render;
pub mod server;
pub mod types;
pub mod world;

pub use aggregate::{count_by_iso3, ExclusionList};
pub use client::GoClient;
pub use render::{render_appeal_density, RenderOutcome};
pub use types::{AppealRecord, AppealType, SurgeAlertRecord};
