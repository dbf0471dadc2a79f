//! Domain models for Hexeko.
//!
//! These are the core types shared across all crates.

pub mod division;
pub mod financer;
pub mod membership;
pub mod role;
pub mod user;
