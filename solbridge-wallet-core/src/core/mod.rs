//! Core wallet functionality

pub mod approval;
pub mod keys;
pub mod service;
pub mod store;
pub mod vault;
