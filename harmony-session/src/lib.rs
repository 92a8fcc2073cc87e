//! Harmony session: the pipeline and session core that host a search
//! strategy and drive the client protocol.
//!
//! # Module dependency direction
//!
//! `harmony_model` ← `harmony_strategy` ← `harmony_session`
//!
//! # Key types
//!
//! - [`pipeline::Stage`] / [`pipeline::Pipeline`] -- the ordered stage chain every
//!   generated point and every report passes through
//! - [`trial::Trial`] -- one outstanding candidate, owned by the session core
//!   until analyzed or killed
//! - [`stages::point_logger::PointLogger`] -- the reference stage, logging one
//!   line per analyzed trial
//! - [`session::Session`] -- owns config/space/strategy/pipeline and exposes
//!   JOIN/FETCH/REPORT/BEST/KILL
//! - [`error::SessionError`]

#![forbid(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]

pub mod error;
pub mod pipeline;
pub mod session;
pub mod stages;
pub mod trial;

pub use error::SessionError;
pub use session::{FetchOutcome, Session};
pub use trial::{Trial, TrialStatus};
