//! Core building blocks shared by every part of upkit
//!
//! - **config**: device/app catalog (upkit.toml) parsing and validation
//! - **context**: unified workspace context and directory layout
//! - **error**: error types with contextual help messages

pub mod config;
pub mod context;
pub mod error;
