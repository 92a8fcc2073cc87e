//! Harmony model: the pure data types shared by every tuning strategy.
//!
//! # Module dependency direction
//!
//! `config` ← `model` (no internal cycles; `model` does not read `config`)
//!
//! # Key types
//!
//! - [`config::ConfigStore`] -- string keyed runtime configuration
//! - [`model::space::Space`] / [`model::dimension::Dimension`] -- the tuning domain
//! - [`model::point::Point`] -- one candidate drawn from a space
//! - [`model::performance::Performance`] -- observed objective values for a point
//! - [`model::vertex::Vertex`] -- a point paired with its performance, the unit
//!   the simplex strategies operate on

#![forbid(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]

pub mod config;
pub mod error;
pub mod model;

pub use error::ModelError;
