//! Manifest Assembly
//!
//! Turns the rendered documents of a cluster into the five objects applied
//! for it, all labeled and owned by the originating cluster.

mod builder;

pub use builder::*;
