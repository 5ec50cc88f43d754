#![allow(unused_imports, dead_code)]
//! Shared test utilities for integration tests.
//!
//! # Modules
//!
//! - `fixtures`: small catalogs with scripted executors
//! - `assertions`: structural assertions over generated sequences

pub mod assertions;
pub mod fixtures;

pub use assertions::{assert_pool_sound, assert_well_formed, assert_ok};
pub use fixtures::{bounded_config, c_and_m_catalog, scripted, t_type, MBehavior};
