//! vault-env CLI library, exposed for unit tests.

pub mod app;
pub mod commands;
