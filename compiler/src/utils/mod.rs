//! Utility functions shared by the filter model, the compiler and the CLI

pub mod file;
pub mod naming;
pub mod pattern;
