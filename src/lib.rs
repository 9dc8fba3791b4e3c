//! Local HTTP client and entity model for PLUM ecoNET300 boiler controllers.
//!
//! [`Config::connect`] builds an [`Econet300Api`], a [`Coordinator`] polls
//! telemetry, and [`Entities`] turns each snapshot into sensors, switches,
//! numbers, selects and thermostats.

mod api;
mod cache;
mod client;
mod config;
mod coordinator;
mod error;
mod platform;
mod types;

pub mod entity;
pub mod mapping;

pub use api::Econet300Api;
pub use cache::MemCache;
pub use client::{EconetClient, EconetClientBuilder};
pub use config::Config;
pub use coordinator::{
    Coordinator, CoordinatorBuilder, CoordinatorEvent, CoordinatorState, UpdateOutcome,
};
pub use entity::{Refreshable, Writable};
pub use error::{Error, Result};
pub use platform::{
    EcosterBundle, Entities, MixerBundle, create_ecosters, create_mixers, ecoster_indices,
    mixer_indices,
};
pub use types::*;
