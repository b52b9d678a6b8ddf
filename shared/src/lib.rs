//! Shared domain models for the Pharmacy Inventory Management System
//!
//! This crate contains the entity types shared between the analytics core
//! and the request-handling layer that embeds it.

pub mod models;

pub use models::*;
