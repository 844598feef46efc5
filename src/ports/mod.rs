//! Port traits implemented by adapters.

pub mod config_port;
pub mod constituent_port;
pub mod pacer_port;
pub mod price_port;
pub mod table_port;
