use std::sync::Arc;

use log::{debug, Logger};

use crate::db::Db;
use crate::errors::BackendError;
use crate::label::{Genre, LabelId, MpaRating};

/// Read-only access to the genre and MPA rating vocabularies.
pub struct CatalogService {
    logger: Arc<Logger>,
    db: Arc<dyn Db>,
}

impl CatalogService {
    pub fn new(logger: Arc<Logger>, db: Arc<dyn Db>) -> Self {
        CatalogService { logger, db }
    }

    pub async fn genres(&self) -> Result<Vec<Genre>, BackendError> {
        debug!(self.logger, "Retrieving genres...");

        self.db.genres().await
    }

    pub async fn genre(&self, id: LabelId) -> Result<Genre, BackendError> {
        debug!(self.logger, "Retrieving genre..."; "id" => id);

        self.db
            .genre(id)
            .await?
            .ok_or_else(|| BackendError::GenreNotFound(id.into()))
    }

    pub async fn mpa_ratings(&self) -> Result<Vec<MpaRating>, BackendError> {
        debug!(self.logger, "Retrieving MPA ratings...");

        self.db.mpa_ratings().await
    }

    pub async fn mpa_rating(&self, id: LabelId) -> Result<MpaRating, BackendError> {
        debug!(self.logger, "Retrieving MPA rating..."; "id" => id);

        self.db
            .mpa_rating(id)
            .await?
            .ok_or_else(|| BackendError::MpaNotFound(id.into()))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::CatalogService;
    use crate::db::MemoryDb;
    use crate::errors::BackendError;

    fn service() -> CatalogService {
        CatalogService::new(Arc::new(log::null_logger()), Arc::new(MemoryDb::new()))
    }

    #[tokio::test]
    async fn lists_vocabularies_in_id_order() {
        let catalog = service();

        let genres = catalog.genres().await.unwrap();
        assert_eq!(genres.len(), 6);
        assert!(genres.windows(2).all(|w| w[0].id < w[1].id));

        let ratings = catalog.mpa_ratings().await.unwrap();
        assert_eq!(
            ratings.iter().map(|r| r.name.as_str()).collect::<Vec<_>>(),
            vec!["G", "PG", "PG-13", "R", "NC-17"]
        );
    }

    #[tokio::test]
    async fn unknown_ids_are_not_found() {
        let catalog = service();

        assert_eq!(catalog.genre(2).await.unwrap().name, "Drama");
        assert!(matches!(
            catalog.genre(0).await,
            Err(BackendError::GenreNotFound(0))
        ));
        assert!(matches!(
            catalog.mpa_rating(6).await,
            Err(BackendError::MpaNotFound(6))
        ));
    }
}
