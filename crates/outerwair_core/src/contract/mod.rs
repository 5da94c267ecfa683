//! Contracts for external collaborators.
//!
//! The generative compositing and clothing-analysis services live outside
//! core. Hosts plug adapters in through these traits; core only decides
//! which inputs are sent and when.

pub mod analyzer;
pub mod compositor;
