//! Bedrock - database bootstrap for the admin console
//!
//! This library provisions the console's database on first run, converges
//! its schema, seeds baseline data and records the connection settings.

pub mod bootstrap;
pub mod catalog;
pub mod config;
pub mod db;
