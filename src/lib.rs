pub mod api;
pub mod config;
pub mod constants;
pub mod discover;
pub mod error;
pub mod export;
pub mod import;
pub mod loader;
pub mod logging;
pub mod mapping;
pub mod query;
pub mod routes;
pub mod schema;
pub mod validation;
pub mod value;
pub mod values;
