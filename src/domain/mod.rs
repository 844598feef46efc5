//! Core domain types and logic.

pub mod price;
pub mod metadata;
pub mod stats;
pub mod metrics;
pub mod pipeline;
pub mod batch;
pub mod symbols;
pub mod index_catalog;
pub mod table;
pub mod settings;
pub mod error;
