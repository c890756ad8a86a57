//! Infrastructure: storage backends and chain access

pub mod chain;
pub mod platform;
