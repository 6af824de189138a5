//! Filter trees and their compilation into parameterized GraphQL queries

pub mod app;
pub mod core;
pub mod filter;
pub mod query;
pub mod utils;
