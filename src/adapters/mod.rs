//! Concrete adapter implementations for ports.

pub mod csv_adapter;
pub mod file_config_adapter;
pub mod pacer;
pub mod xlsx_adapter;
#[cfg(feature = "http")]
pub mod wikipedia_adapter;
#[cfg(feature = "http")]
pub mod yahoo_adapter;
#[cfg(feature = "web")]
pub mod web;
