pub mod config;
pub mod dates;
pub mod db;
pub mod environment;
pub mod errors;
pub mod film;
pub mod label;
pub mod routes;
pub mod service;
pub mod user;
pub mod validation;

/// The ID of a film or user.
pub type Id = i64;
