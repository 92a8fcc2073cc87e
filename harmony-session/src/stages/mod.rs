//! Concrete pipeline stages. The point logger is the one stage whose
//! observable output is pinned down; others (constraint filters, caches)
//! are left to integrators as instances of [`crate::pipeline::Stage`].

pub mod point_logger;
