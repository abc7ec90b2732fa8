//! fitmatch: trainer profile completion engine and client engagement
//! classification.

pub mod config;
pub mod engagement;
pub mod error;
pub mod profile;
pub mod routes;
pub mod store;
