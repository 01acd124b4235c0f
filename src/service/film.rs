use std::sync::Arc;

use log::{debug, info, warn, Logger};

use crate::db::Db;
use crate::errors::BackendError;
use crate::film::{Film, FilmFields, FilmPatch, FilmPayload};
use crate::label::{LabelId, Reference};
use crate::validation;
use crate::Id;

/// Films, likes and the popularity ranking.
pub struct FilmService {
    logger: Arc<Logger>,
    db: Arc<dyn Db>,
}

impl FilmService {
    pub fn new(logger: Arc<Logger>, db: Arc<dyn Db>) -> Self {
        FilmService { logger, db }
    }

    pub async fn all(&self) -> Result<Vec<Film>, BackendError> {
        debug!(self.logger, "Retrieving all films...");

        let films = self.db.films().await?;
        self.attach_genres(films).await
    }

    pub async fn find(&self, id: Id) -> Result<Film, BackendError> {
        debug!(self.logger, "Retrieving film..."; "id" => id);

        let film = self
            .db
            .film(id)
            .await?
            .ok_or(BackendError::FilmNotFound(id))?;

        let mut films = self.attach_genres(vec![film]).await?;
        films.pop().ok_or(BackendError::FilmNotFound(id))
    }

    /// Validates and stores a new film. Any `id` in the payload is
    /// ignored.
    pub async fn create(&self, payload: FilmPayload) -> Result<Film, BackendError> {
        let name = payload.name.ok_or(BackendError::MissingField("name"))?;
        validation::film_name(&name)?;

        if let Some(description) = &payload.description {
            validation::description(description)?;
        }

        let release_date = payload
            .release_date
            .ok_or(BackendError::MissingField("releaseDate"))?;
        validation::release_date(release_date)?;

        let duration = payload
            .duration
            .ok_or(BackendError::MissingField("duration"))?;
        validation::duration(duration)?;

        let mpa = payload.mpa.ok_or(BackendError::MissingField("mpa"))?;
        let mpa_id = self.resolve_mpa(mpa).await?;
        let genre_ids = self
            .resolve_genres(payload.genres.unwrap_or_default())
            .await?;

        let fields = FilmFields {
            name,
            description: payload.description,
            release_date,
            duration,
            mpa_id,
            genre_ids,
        };

        let id = self.db.insert_film(fields).await?;
        info!(self.logger, "Created film"; "id" => id);

        self.find(id).await
    }

    /// Overwrites the fields present in the payload, leaving the rest
    /// alone. A `genres` array replaces the film's genres outright.
    pub async fn update(&self, payload: FilmPayload) -> Result<Film, BackendError> {
        let id = payload.id.ok_or(BackendError::MissingField("id"))?;
        self.require_film(id).await?;

        if let Some(name) = &payload.name {
            validation::film_name(name)?;
        }

        if let Some(description) = &payload.description {
            validation::description(description)?;
        }

        if let Some(release_date) = payload.release_date {
            validation::release_date(release_date)?;
        }

        if let Some(duration) = payload.duration {
            validation::duration(duration)?;
        }

        let mpa_id = match payload.mpa {
            Some(mpa) => Some(self.resolve_mpa(mpa).await?),
            None => None,
        };

        let genre_ids = match payload.genres {
            Some(genres) => Some(self.resolve_genres(genres).await?),
            None => None,
        };

        let patch = FilmPatch {
            name: payload.name,
            description: payload.description,
            release_date: payload.release_date,
            duration: payload.duration,
            mpa_id,
            genre_ids,
        };

        if !self.db.update_film(id, patch).await? {
            return Err(BackendError::FilmNotFound(id));
        }

        info!(self.logger, "Updated film"; "id" => id);

        self.find(id).await
    }

    pub async fn delete(&self, id: Id) -> Result<(), BackendError> {
        if !self.db.delete_film(id).await? {
            return Err(BackendError::FilmNotFound(id));
        }

        info!(self.logger, "Deleted film"; "id" => id);
        Ok(())
    }

    /// Records that the user likes the film and returns the film with
    /// its new like count.
    pub async fn like(&self, film_id: Id, user_id: Id) -> Result<Film, BackendError> {
        self.require_film(film_id).await?;
        self.require_user(user_id).await?;

        if !self.db.insert_like(film_id, user_id).await? {
            warn!(self.logger, "Duplicate like"; "film_id" => film_id, "user_id" => user_id);
            return Err(BackendError::DuplicateLike { film_id, user_id });
        }

        info!(self.logger, "Added like"; "film_id" => film_id, "user_id" => user_id);

        self.find(film_id).await
    }

    pub async fn unlike(&self, film_id: Id, user_id: Id) -> Result<Film, BackendError> {
        self.require_film(film_id).await?;
        self.require_user(user_id).await?;

        if !self.db.delete_like(film_id, user_id).await? {
            return Err(BackendError::LikeNotFound { film_id, user_id });
        }

        info!(self.logger, "Removed like"; "film_id" => film_id, "user_id" => user_id);

        self.find(film_id).await
    }

    /// The `count` most liked films, most liked first.
    pub async fn popular(&self, count: i64) -> Result<Vec<Film>, BackendError> {
        validation::count(count)?;
        debug!(self.logger, "Retrieving popular films..."; "count" => count);

        let films = self.db.popular_films(count).await?;
        self.attach_genres(films).await
    }

    /// Fills in the genres of every film with a single lookup.
    async fn attach_genres(&self, mut films: Vec<Film>) -> Result<Vec<Film>, BackendError> {
        if films.is_empty() {
            return Ok(films);
        }

        let ids = films.iter().map(|f| f.id).collect::<Vec<_>>();
        let mut genres = self.db.genres_for_films(&ids).await?;

        for film in &mut films {
            film.genres = genres.remove(&film.id).unwrap_or_default();
        }

        Ok(films)
    }

    async fn require_film(&self, id: Id) -> Result<(), BackendError> {
        match self.db.film(id).await? {
            Some(_) => Ok(()),
            None => Err(BackendError::FilmNotFound(id)),
        }
    }

    async fn require_user(&self, id: Id) -> Result<(), BackendError> {
        match self.db.user(id).await? {
            Some(_) => Ok(()),
            None => Err(BackendError::UserNotFound(id)),
        }
    }

    async fn resolve_mpa(&self, mpa: Reference) -> Result<LabelId, BackendError> {
        let id = mpa.label_id().ok_or(BackendError::MpaNotFound(mpa.id))?;

        match self.db.mpa_rating(id).await? {
            Some(rating) => Ok(rating.id),
            None => Err(BackendError::MpaNotFound(mpa.id)),
        }
    }

    /// Checks every referenced genre exists and returns the distinct
    /// IDs in ascending order.
    async fn resolve_genres(&self, genres: Vec<Reference>) -> Result<Vec<LabelId>, BackendError> {
        let mut ids = genres.iter().map(|g| g.id).collect::<Vec<_>>();
        ids.sort_unstable();
        ids.dedup();

        if ids.len() < genres.len() {
            warn!(self.logger, "Ignoring duplicate genres"; "submitted" => genres.len(), "distinct" => ids.len());
        }

        if ids.is_empty() {
            return Ok(vec![]);
        }

        let known = self.db.genres().await?;

        ids.into_iter()
            .map(|id| {
                known
                    .iter()
                    .find(|g| i64::from(g.id) == id)
                    .map(|g| g.id)
                    .ok_or(BackendError::GenreNotFound(id))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use time::macros::date;

    use super::FilmService;
    use crate::db::{Db, MemoryDb};
    use crate::errors::BackendError;
    use crate::film::FilmPayload;
    use crate::label::Reference;
    use crate::user::UserFields;
    use crate::Id;

    fn service() -> (FilmService, Arc<dyn Db>) {
        let db: Arc<dyn Db> = Arc::new(MemoryDb::new());
        (
            FilmService::new(Arc::new(log::null_logger()), db.clone()),
            db,
        )
    }

    fn payload(name: &str) -> FilmPayload {
        FilmPayload {
            name: Some(name.to_owned()),
            description: Some("A film".to_owned()),
            release_date: Some(date!(1999 - 03 - 31)),
            duration: Some(136),
            mpa: Some(Reference { id: 4 }),
            genres: Some(vec![Reference { id: 6 }, Reference { id: 4 }]),
            ..FilmPayload::default()
        }
    }

    async fn add_user(db: &Arc<dyn Db>, login: &str) -> Id {
        db.insert_user(UserFields {
            email: format!("{}@example.com", login),
            login: login.to_owned(),
            name: login.to_owned(),
            birthday: date!(1990 - 01 - 01),
        })
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn creates_and_resolves_references() {
        let (films, _) = service();

        let film = films.create(payload("The Matrix")).await.unwrap();
        assert_eq!(film.id, 1);
        assert_eq!(film.mpa.name, "R");
        assert_eq!(
            film.genres.iter().map(|g| g.name.as_str()).collect::<Vec<_>>(),
            vec!["Thriller", "Action"]
        );
        assert_eq!(film.likes_count, 0);

        assert_eq!(films.find(film.id).await.unwrap(), film);
    }

    #[tokio::test]
    async fn duplicate_genres_collapse() {
        let (films, _) = service();

        let mut request = payload("Dup");
        request.genres = Some(vec![Reference { id: 1 }, Reference { id: 1 }]);

        let film = films.create(request).await.unwrap();
        assert_eq!(film.genres.len(), 1);
    }

    #[tokio::test]
    async fn rejects_invalid_films_without_storing() {
        let (films, _) = service();

        let mut early = payload("Early");
        early.release_date = Some(date!(1895 - 12 - 27));
        assert!(matches!(
            films.create(early).await,
            Err(BackendError::ReleaseDateTooEarly { .. })
        ));

        let mut blank = payload("   ");
        blank.duration = Some(10);
        assert!(matches!(
            films.create(blank).await,
            Err(BackendError::BlankFilmName)
        ));

        let mut unrated = payload("Unrated");
        unrated.mpa = Some(Reference { id: 9 });
        assert!(matches!(
            films.create(unrated).await,
            Err(BackendError::MpaNotFound(9))
        ));

        let mut odd = payload("Odd");
        odd.genres = Some(vec![Reference { id: 1 }, Reference { id: 42 }]);
        assert!(matches!(
            films.create(odd).await,
            Err(BackendError::GenreNotFound(42))
        ));

        assert!(films.all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn release_date_bound_is_strict() {
        let (films, _) = service();

        let mut first = payload("Arrival of a Train");
        first.release_date = Some(date!(1895 - 12 - 28));
        assert!(films.create(first).await.is_err());

        let mut next = payload("The Day After");
        next.release_date = Some(date!(1895 - 12 - 29));
        assert!(films.create(next).await.is_ok());
    }

    #[tokio::test]
    async fn updates_only_provided_fields() {
        let (films, _) = service();
        let created = films.create(payload("Original")).await.unwrap();

        let updated = films
            .update(FilmPayload {
                id: Some(created.id),
                duration: Some(90),
                genres: Some(vec![]),
                ..FilmPayload::default()
            })
            .await
            .unwrap();

        assert_eq!(updated.name, "Original");
        assert_eq!(updated.description, created.description);
        assert_eq!(updated.duration, 90);
        assert!(updated.genres.is_empty());

        assert!(matches!(
            films
                .update(FilmPayload {
                    id: Some(created.id),
                    duration: Some(0),
                    ..FilmPayload::default()
                })
                .await,
            Err(BackendError::NonPositiveDuration(0))
        ));
        assert!(matches!(
            films.update(payload("No ID")).await,
            Err(BackendError::MissingField("id"))
        ));
        assert!(matches!(
            films
                .update(FilmPayload {
                    id: Some(99),
                    ..payload("Ghost")
                })
                .await,
            Err(BackendError::FilmNotFound(99))
        ));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_updates_to_different_fields_all_land() {
        let (films, _) = service();
        let films = Arc::new(films);
        let id = films.create(payload("Start")).await.unwrap().id;

        for round in 1..=50 {
            let renamer = {
                let films = films.clone();
                tokio::spawn(async move {
                    films
                        .update(FilmPayload {
                            id: Some(id),
                            name: Some(format!("Round {}", round)),
                            ..FilmPayload::default()
                        })
                        .await
                })
            };
            let retimer = {
                let films = films.clone();
                tokio::spawn(async move {
                    films
                        .update(FilmPayload {
                            id: Some(id),
                            duration: Some(100 + round),
                            ..FilmPayload::default()
                        })
                        .await
                })
            };

            renamer.await.unwrap().unwrap();
            retimer.await.unwrap().unwrap();

            let stored = films.find(id).await.unwrap();
            assert_eq!(stored.name, format!("Round {}", round));
            assert_eq!(stored.duration, 100 + round);
        }
    }

    #[tokio::test]
    async fn out_of_range_references_are_not_found() {
        let (films, _) = service();

        let mut unrated = payload("Unrated");
        unrated.mpa = Some(Reference { id: 40_000 });
        assert!(matches!(
            films.create(unrated).await,
            Err(BackendError::MpaNotFound(40_000))
        ));

        let mut odd = payload("Odd");
        odd.genres = Some(vec![Reference { id: -70_000 }]);
        assert!(matches!(
            films.create(odd).await,
            Err(BackendError::GenreNotFound(-70_000))
        ));
    }

    #[tokio::test]
    async fn likes_are_counted_once() {
        let (films, db) = service();
        let film = films.create(payload("Liked")).await.unwrap();
        let user = add_user(&db, "fan").await;

        assert_eq!(films.like(film.id, user).await.unwrap().likes_count, 1);
        assert!(matches!(
            films.like(film.id, user).await,
            Err(BackendError::DuplicateLike { .. })
        ));
        assert!(matches!(
            films.like(film.id, 99).await,
            Err(BackendError::UserNotFound(99))
        ));
        assert!(matches!(
            films.like(99, user).await,
            Err(BackendError::FilmNotFound(99))
        ));

        assert_eq!(films.unlike(film.id, user).await.unwrap().likes_count, 0);
        assert!(matches!(
            films.unlike(film.id, user).await,
            Err(BackendError::LikeNotFound { .. })
        ));
    }

    #[tokio::test]
    async fn popular_orders_by_likes_then_id() {
        let (films, db) = service();

        for name in &["A", "B", "C"] {
            films.create(payload(name)).await.unwrap();
        }

        let first = add_user(&db, "first").await;
        let second = add_user(&db, "second").await;

        films.like(3, first).await.unwrap();
        films.like(3, second).await.unwrap();
        films.like(2, first).await.unwrap();

        let ranked = films.popular(10).await.unwrap();
        assert_eq!(ranked.iter().map(|f| f.id).collect::<Vec<_>>(), vec![3, 2, 1]);
        assert_eq!(ranked[0].genres.len(), 2);

        let top = films.popular(1).await.unwrap();
        assert_eq!(top.len(), 1);
        assert_eq!(top[0].id, 3);

        assert!(matches!(
            films.popular(0).await,
            Err(BackendError::NonPositiveCount(0))
        ));
    }

    #[tokio::test]
    async fn deleting_a_film_removes_it() {
        let (films, _) = service();
        let film = films.create(payload("Doomed")).await.unwrap();

        films.delete(film.id).await.unwrap();

        assert!(matches!(
            films.find(film.id).await,
            Err(BackendError::FilmNotFound(_))
        ));
        assert!(matches!(
            films.delete(film.id).await,
            Err(BackendError::FilmNotFound(_))
        ));
    }
}
