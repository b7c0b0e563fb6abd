// src/config/mod.rs

//! Configuration Resolver.
//!
//! Responsibilities:
//! - Define the TOML-backed data model (`model.rs`).
//! - Load a config file from disk (`loader.rs`).
//! - Validate it and resolve it against the environment into the immutable
//!   [`Config`] (`validate.rs`).

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{load_and_validate, load_for_cli, load_from_path};
pub use model::{
    BumpSection, Config, OptimizedSection, PathsSection, RawConfig, ServeSection, ServerSection,
    TemplateCacheSection, TestSection, TransformsSection, VetSection,
};
pub use validate::PORT_ENV_VAR;
