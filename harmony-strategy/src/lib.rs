//! Harmony strategy: the search-strategy state machines that propose and
//! refine tuning candidates.
//!
//! This crate depends only on `harmony_model` — it does NOT depend on
//! `harmony_session`.
//!
//! # Crate dependency graph
//!
//! ```text
//! harmony_model  ←  harmony_strategy  ←  harmony_session
//! (space, point)     (strategies)         (pipeline, client protocol)
//! ```
//!
//! # Key types
//!
//! - [`contract::Strategy`] -- the capability set every strategy exposes
//! - [`contract::Flow`] -- forward/backward control record shared with the pipeline
//! - [`error::StrategyError`]
//! - [`exhaustive::Exhaustive`], [`random::Random`], [`pro::Pro`], [`angel::Angel`]

#![forbid(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]

pub mod angel;
pub mod contract;
pub mod error;
pub mod exhaustive;
pub mod pro;
pub mod random;
mod simplex_engine;

pub use contract::{Flow, FlowStatus, Strategy};
pub use error::StrategyError;
