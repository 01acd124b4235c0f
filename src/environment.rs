use std::sync::Arc;

use log::Logger;

use crate::db::Db;
use crate::errors::BackendError;
use crate::service::{CatalogService, FilmService, UserService};
use crate::validation;

/// Everything a request handler needs, cheap to clone.
#[derive(Clone)]
pub struct Environment {
    pub logger: Arc<Logger>,
    pub films: Arc<FilmService>,
    pub users: Arc<UserService>,
    pub catalog: Arc<CatalogService>,
    pub config: Config,
}

impl Environment {
    pub fn new(logger: Arc<Logger>, db: Arc<dyn Db>, config: Config) -> Self {
        Self {
            films: Arc::new(FilmService::new(logger.clone(), db.clone())),
            users: Arc::new(UserService::new(logger.clone(), db.clone())),
            catalog: Arc::new(CatalogService::new(logger.clone(), db)),
            logger,
            config,
        }
    }
}

#[derive(Clone, Copy, Debug)]
pub struct Config {
    /// How many films `/films/popular` returns when no count is given.
    pub(crate) popular_count: i64,
}

impl Config {
    /// Fails if the default popular count is not positive.
    pub fn new(popular_count: i64) -> Result<Self, BackendError> {
        validation::count(popular_count)?;

        Ok(Self { popular_count })
    }
}

impl Default for Config {
    fn default() -> Self {
        Config { popular_count: 10 }
    }
}

#[cfg(test)]
mod tests {
    use super::Config;
    use crate::errors::BackendError;

    #[test]
    fn popular_count_must_be_positive() {
        assert_eq!(Config::new(3).unwrap().popular_count, 3);

        assert!(matches!(
            Config::new(0),
            Err(BackendError::NonPositiveCount(0))
        ));
        assert!(matches!(
            Config::new(-5),
            Err(BackendError::NonPositiveCount(-5))
        ));
    }
}
