//! Shared primitives for the LearnHub backend crates.

pub mod topics;
pub mod types;
