//! Integration tests for upkit
//!
//! One test binary (see `[[test]]` in Cargo.toml) so every scenario file
//! shares the helpers module.

mod helpers;
mod test_navigation;
mod test_session;
