// src/config/mod.rs

//! Configuration loading and validation for rollout.
//!
//! Responsibilities:
//! - Define the TOML-backed data model (`model.rs`).
//! - Load a config file from disk and apply env overrides (`loader.rs`).
//! - Validate basic invariants (`validate.rs`).

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{apply_env_overrides, default_config_path, load, load_and_validate, load_from_path};
pub use model::{
    is_unset, BuildSection, ConfigFile, DeploySection, GitSection, NewRelicSection,
    RawConfigFile, SlackSection, SyncEntry, UserInfo, UNSET,
};
