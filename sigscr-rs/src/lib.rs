pub mod cli;
pub mod config;
pub mod diag;
pub mod loader;
pub mod script;
pub mod signal;
