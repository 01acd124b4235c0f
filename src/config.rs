use std::env;
use std::str::FromStr;

use thiserror::Error;

/// Returns the value of the named environment variable if it exists or panics.
pub fn get_variable(name: &str) -> String {
    env::var(name).unwrap_or_else(|_| panic!("must define {} environment variable", name))
}

/// Returns the value of the named environment variable, or `default`
/// if it is not set.
pub fn get_variable_or(name: &str, default: &str) -> String {
    env::var(name).unwrap_or_else(|_| default.to_owned())
}

/// Which backend holds the data.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum StorageKind {
    Memory,
    Postgres,
}

#[derive(Debug, Error)]
#[error("unknown storage kind {0:?} (expected `memory` or `postgres`)")]
pub struct UnknownStorageKind(String);

impl FromStr for StorageKind {
    type Err = UnknownStorageKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "memory" => Ok(StorageKind::Memory),
            "postgres" | "postgresql" => Ok(StorageKind::Postgres),
            _ => Err(UnknownStorageKind(s.to_owned())),
        }
    }
}
