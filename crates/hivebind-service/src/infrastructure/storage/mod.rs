//! Storage infrastructure: the optional TOML startup file.
//!
//! The settings themselves live in the registry; this file only says where
//! to find them and which leaf names to use.

pub mod config;
