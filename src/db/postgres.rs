use std::collections::HashMap;

use futures::future::BoxFuture;
use futures::FutureExt;
use sqlx::{
    self,
    postgres::{PgPool, PgRow},
};
use time::Date;

use crate::errors::BackendError;
use crate::film::{Film, FilmFields, FilmPatch};
use crate::label::{Genre, Label, LabelId, MpaRating};
use crate::user::{User, UserFields, UserPatch};
use crate::Id;

const USERS_EMAIL_CONSTRAINT: &str = "users_email";
const FILMS_MPA_RATING_CONSTRAINT: &str = "films_mpa_rating";
const FILM_LIKE_FILM_CONSTRAINT: &str = "film_like_film";
const FILM_LIKE_USER_CONSTRAINT: &str = "film_like_user";

/// A store backed by PostgreSQL. The schema lives in `migrations/`.
pub struct PgDb {
    pool: PgPool,
}

impl PgDb {
    pub fn new(pool: PgPool) -> Self {
        PgDb { pool }
    }
}

// these can be simplified once async functions in traits can be boxed
// automatically
impl super::FilmStorage for PgDb {
    fn films(&self) -> BoxFuture<Result<Vec<Film>, BackendError>> {
        async move {
            let query = sqlx::query(include_str!("../queries/retrieve_films.sql"));

            let films = query
                .try_map(|row: PgRow| film_from_row(&row))
                .fetch_all(&self.pool)
                .await
                .map_err(map_sqlx_error)?;

            Ok(films)
        }
        .boxed()
    }

    fn film(&self, id: Id) -> BoxFuture<Result<Option<Film>, BackendError>> {
        async move {
            let query = sqlx::query(include_str!("../queries/retrieve_film.sql"));

            let film = query
                .bind(id)
                .try_map(|row: PgRow| film_from_row(&row))
                .fetch_optional(&self.pool)
                .await
                .map_err(map_sqlx_error)?;

            Ok(film)
        }
        .boxed()
    }

    fn insert_film(&self, fields: FilmFields) -> BoxFuture<Result<Id, BackendError>> {
        async move {
            let mpa_id = fields.mpa_id;
            let map_error = |e: sqlx::Error| {
                if violates(&e, FILMS_MPA_RATING_CONSTRAINT) {
                    BackendError::MpaNotFound(mpa_id.into())
                } else {
                    map_sqlx_error(e)
                }
            };

            let mut tx = self.pool.begin().await.map_err(map_sqlx_error)?;

            let (id,): (Id,) = sqlx::query_as(include_str!("../queries/create_film.sql"))
                .bind(fields.name)
                .bind(fields.description)
                .bind(fields.release_date)
                .bind(fields.duration)
                .bind(fields.mpa_id)
                .fetch_one(&mut *tx)
                .await
                .map_err(map_error)?;

            if !fields.genre_ids.is_empty() {
                sqlx::query(include_str!("../queries/create_film_genres.sql"))
                    .bind(id)
                    .bind(fields.genre_ids)
                    .execute(&mut *tx)
                    .await
                    .map_err(map_sqlx_error)?;
            }

            tx.commit().await.map_err(map_sqlx_error)?;

            Ok(id)
        }
        .boxed()
    }

    fn update_film(&self, id: Id, patch: FilmPatch) -> BoxFuture<Result<bool, BackendError>> {
        async move {
            let mut tx = self.pool.begin().await.map_err(map_sqlx_error)?;

            let current: Option<(String, Option<String>, Date, i32, LabelId)> =
                sqlx::query_as(include_str!("../queries/retrieve_film_for_update.sql"))
                    .bind(id)
                    .fetch_optional(&mut *tx)
                    .await
                    .map_err(map_sqlx_error)?;

            let (name, description, release_date, duration, mpa_id) = match current {
                Some(row) => row,
                None => return Ok(false),
            };

            let replaces_genres = patch.genre_ids.is_some();
            let genre_ids = if replaces_genres {
                vec![]
            } else {
                sqlx::query_as::<_, (LabelId,)>(include_str!("../queries/retrieve_film_genre_ids.sql"))
                    .bind(id)
                    .fetch_all(&mut *tx)
                    .await
                    .map_err(map_sqlx_error)?
                    .into_iter()
                    .map(|(genre_id,)| genre_id)
                    .collect()
            };

            let mut fields = FilmFields {
                name,
                description,
                release_date,
                duration,
                mpa_id,
                genre_ids,
            };
            patch.apply(&mut fields);

            let mpa_id = fields.mpa_id;
            let map_error = |e: sqlx::Error| {
                if violates(&e, FILMS_MPA_RATING_CONSTRAINT) {
                    BackendError::MpaNotFound(mpa_id.into())
                } else {
                    map_sqlx_error(e)
                }
            };

            sqlx::query(include_str!("../queries/update_film.sql"))
                .bind(id)
                .bind(fields.name)
                .bind(fields.description)
                .bind(fields.release_date)
                .bind(fields.duration)
                .bind(fields.mpa_id)
                .execute(&mut *tx)
                .await
                .map_err(map_error)?;

            if replaces_genres {
                sqlx::query(include_str!("../queries/delete_film_genres.sql"))
                    .bind(id)
                    .execute(&mut *tx)
                    .await
                    .map_err(map_sqlx_error)?;

                if !fields.genre_ids.is_empty() {
                    sqlx::query(include_str!("../queries/create_film_genres.sql"))
                        .bind(id)
                        .bind(fields.genre_ids)
                        .execute(&mut *tx)
                        .await
                        .map_err(map_sqlx_error)?;
                }
            }

            tx.commit().await.map_err(map_sqlx_error)?;

            Ok(true)
        }
        .boxed()
    }

    fn delete_film(&self, id: Id) -> BoxFuture<Result<bool, BackendError>> {
        async move {
            let count = sqlx::query(include_str!("../queries/delete_film.sql"))
                .bind(id)
                .execute(&self.pool)
                .await
                .map_err(map_sqlx_error)?
                .rows_affected();

            Ok(count > 0)
        }
        .boxed()
    }

    fn insert_like(&self, film_id: Id, user_id: Id) -> BoxFuture<Result<bool, BackendError>> {
        async move {
            let count = sqlx::query(include_str!("../queries/create_like.sql"))
                .bind(film_id)
                .bind(user_id)
                .execute(&self.pool)
                .await
                .map_err(|e| {
                    if violates(&e, FILM_LIKE_FILM_CONSTRAINT) {
                        BackendError::FilmNotFound(film_id)
                    } else if violates(&e, FILM_LIKE_USER_CONSTRAINT) {
                        BackendError::UserNotFound(user_id)
                    } else {
                        map_sqlx_error(e)
                    }
                })?
                .rows_affected();

            Ok(count > 0)
        }
        .boxed()
    }

    fn delete_like(&self, film_id: Id, user_id: Id) -> BoxFuture<Result<bool, BackendError>> {
        async move {
            let count = sqlx::query(include_str!("../queries/delete_like.sql"))
                .bind(film_id)
                .bind(user_id)
                .execute(&self.pool)
                .await
                .map_err(map_sqlx_error)?
                .rows_affected();

            Ok(count > 0)
        }
        .boxed()
    }

    fn popular_films(&self, count: i64) -> BoxFuture<Result<Vec<Film>, BackendError>> {
        async move {
            let query = sqlx::query(include_str!("../queries/retrieve_popular_films.sql"));

            let films = query
                .bind(count)
                .try_map(|row: PgRow| film_from_row(&row))
                .fetch_all(&self.pool)
                .await
                .map_err(map_sqlx_error)?;

            Ok(films)
        }
        .boxed()
    }
}

impl super::UserStorage for PgDb {
    fn users(&self) -> BoxFuture<Result<Vec<User>, BackendError>> {
        async move {
            let users = sqlx::query_as::<_, User>(include_str!("../queries/retrieve_users.sql"))
                .fetch_all(&self.pool)
                .await
                .map_err(map_sqlx_error)?;

            Ok(users)
        }
        .boxed()
    }

    fn user(&self, id: Id) -> BoxFuture<Result<Option<User>, BackendError>> {
        async move {
            let user = sqlx::query_as::<_, User>(include_str!("../queries/retrieve_user.sql"))
                .bind(id)
                .fetch_optional(&self.pool)
                .await
                .map_err(map_sqlx_error)?;

            Ok(user)
        }
        .boxed()
    }

    fn user_id_by_email(&self, email: &str) -> BoxFuture<Result<Option<Id>, BackendError>> {
        let email = email.to_owned();

        async move {
            let id: Option<Id> =
                sqlx::query_as(include_str!("../queries/retrieve_user_id_by_email.sql"))
                    .bind(email)
                    .fetch_optional(&self.pool)
                    .await
                    .map_err(map_sqlx_error)?
                    .map(|(id,)| id);

            Ok(id)
        }
        .boxed()
    }

    fn insert_user(&self, fields: UserFields) -> BoxFuture<Result<Id, BackendError>> {
        async move {
            let email = fields.email.clone();

            let (id,): (Id,) = sqlx::query_as(include_str!("../queries/create_user.sql"))
                .bind(fields.email)
                .bind(fields.login)
                .bind(fields.name)
                .bind(fields.birthday)
                .fetch_one(&self.pool)
                .await
                .map_err(|e| map_user_error(e, email))?;

            Ok(id)
        }
        .boxed()
    }

    fn update_user(&self, id: Id, patch: UserPatch) -> BoxFuture<Result<bool, BackendError>> {
        async move {
            let mut tx = self.pool.begin().await.map_err(map_sqlx_error)?;

            let current: Option<User> =
                sqlx::query_as(include_str!("../queries/retrieve_user_for_update.sql"))
                    .bind(id)
                    .fetch_optional(&mut *tx)
                    .await
                    .map_err(map_sqlx_error)?;

            let mut fields = match current {
                Some(user) => UserFields::from_user(&user),
                None => return Ok(false),
            };
            patch.apply(&mut fields);

            let email = fields.email.clone();

            sqlx::query(include_str!("../queries/update_user.sql"))
                .bind(id)
                .bind(fields.email)
                .bind(fields.login)
                .bind(fields.name)
                .bind(fields.birthday)
                .execute(&mut *tx)
                .await
                .map_err(|e| map_user_error(e, email))?;

            tx.commit().await.map_err(map_sqlx_error)?;

            Ok(true)
        }
        .boxed()
    }

    fn delete_user(&self, id: Id) -> BoxFuture<Result<bool, BackendError>> {
        async move {
            let count = sqlx::query(include_str!("../queries/delete_user.sql"))
                .bind(id)
                .execute(&self.pool)
                .await
                .map_err(map_sqlx_error)?
                .rows_affected();

            Ok(count > 0)
        }
        .boxed()
    }

    fn insert_friendship(&self, user_id: Id, friend_id: Id) -> BoxFuture<Result<(), BackendError>> {
        async move {
            sqlx::query(include_str!("../queries/create_friendship.sql"))
                .bind(user_id)
                .bind(friend_id)
                .execute(&self.pool)
                .await
                .map_err(map_sqlx_error)?;

            Ok(())
        }
        .boxed()
    }

    fn delete_friendship(&self, user_id: Id, friend_id: Id) -> BoxFuture<Result<(), BackendError>> {
        async move {
            sqlx::query(include_str!("../queries/delete_friendship.sql"))
                .bind(user_id)
                .bind(friend_id)
                .execute(&self.pool)
                .await
                .map_err(map_sqlx_error)?;

            Ok(())
        }
        .boxed()
    }

    fn friends(&self, user_id: Id) -> BoxFuture<Result<Vec<User>, BackendError>> {
        async move {
            let friends =
                sqlx::query_as::<_, User>(include_str!("../queries/retrieve_friends.sql"))
                    .bind(user_id)
                    .fetch_all(&self.pool)
                    .await
                    .map_err(map_sqlx_error)?;

            Ok(friends)
        }
        .boxed()
    }

    fn common_friends(&self, user_id: Id, other_id: Id) -> BoxFuture<Result<Vec<User>, BackendError>> {
        async move {
            let friends =
                sqlx::query_as::<_, User>(include_str!("../queries/retrieve_common_friends.sql"))
                    .bind(user_id)
                    .bind(other_id)
                    .fetch_all(&self.pool)
                    .await
                    .map_err(map_sqlx_error)?;

            Ok(friends)
        }
        .boxed()
    }
}

impl super::GenreStorage for PgDb {
    fn genres(&self) -> BoxFuture<Result<Vec<Genre>, BackendError>> {
        async move {
            let genres = sqlx::query_as::<_, Label>(include_str!("../queries/retrieve_genres.sql"))
                .fetch_all(&self.pool)
                .await
                .map_err(map_sqlx_error)?;

            Ok(genres)
        }
        .boxed()
    }

    fn genre(&self, id: LabelId) -> BoxFuture<Result<Option<Genre>, BackendError>> {
        async move {
            let genre = sqlx::query_as::<_, Label>(include_str!("../queries/retrieve_genre.sql"))
                .bind(id)
                .fetch_optional(&self.pool)
                .await
                .map_err(map_sqlx_error)?;

            Ok(genre)
        }
        .boxed()
    }

    fn genres_for_films(&self, film_ids: &[Id]) -> BoxFuture<Result<HashMap<Id, Vec<Genre>>, BackendError>> {
        let film_ids = film_ids.to_vec();

        async move {
            if film_ids.is_empty() {
                return Ok(HashMap::new());
            }

            let query = sqlx::query(include_str!("../queries/retrieve_genres_for_films.sql"));

            let rows: Vec<(Id, Genre)> = query
                .bind(film_ids)
                .try_map(|row: PgRow| {
                    let film_id: Id = try_get(&row, "film_id")?;
                    let genre = Label::new(try_get(&row, "genre_id")?, try_get::<String>(&row, "name")?);

                    Ok((film_id, genre))
                })
                .fetch_all(&self.pool)
                .await
                .map_err(map_sqlx_error)?;

            let mut result: HashMap<Id, Vec<Genre>> = HashMap::new();

            for (film_id, genre) in rows {
                result.entry(film_id).or_default().push(genre);
            }

            Ok(result)
        }
        .boxed()
    }
}

impl super::MpaStorage for PgDb {
    fn mpa_ratings(&self) -> BoxFuture<Result<Vec<MpaRating>, BackendError>> {
        async move {
            let ratings =
                sqlx::query_as::<_, Label>(include_str!("../queries/retrieve_mpa_ratings.sql"))
                    .fetch_all(&self.pool)
                    .await
                    .map_err(map_sqlx_error)?;

            Ok(ratings)
        }
        .boxed()
    }

    fn mpa_rating(&self, id: LabelId) -> BoxFuture<Result<Option<MpaRating>, BackendError>> {
        async move {
            let rating =
                sqlx::query_as::<_, Label>(include_str!("../queries/retrieve_mpa_rating.sql"))
                    .bind(id)
                    .fetch_optional(&self.pool)
                    .await
                    .map_err(map_sqlx_error)?;

            Ok(rating)
        }
        .boxed()
    }
}

fn film_from_row(row: &PgRow) -> Result<Film, sqlx::Error> {
    let mpa = Label::new(
        try_get(row, "mpa_rating_id")?,
        try_get::<String>(row, "mpa_rating_name")?,
    );

    Ok(Film {
        id: try_get(row, "film_id")?,
        name: try_get(row, "name")?,
        description: try_get(row, "description")?,
        release_date: try_get(row, "release_date")?,
        duration: try_get(row, "duration")?,
        mpa,
        genres: vec![],
        likes_count: try_get(row, "likes_count")?,
    })
}

fn try_get<'a, T: sqlx::Type<sqlx::Postgres> + sqlx::decode::Decode<'a, sqlx::Postgres>>(
    row: &'a PgRow,
    column: &str,
) -> Result<T, sqlx::Error> {
    use sqlx::Row;

    row.try_get(column)
}

fn violates(error: &sqlx::Error, constraint: &str) -> bool {
    match error {
        sqlx::Error::Database(e) => e.constraint() == Some(constraint),
        _ => false,
    }
}

fn map_user_error(error: sqlx::Error, email: String) -> BackendError {
    if violates(&error, USERS_EMAIL_CONSTRAINT) {
        BackendError::EmailAlreadyExists(email)
    } else {
        map_sqlx_error(error)
    }
}

fn map_sqlx_error(error: sqlx::Error) -> BackendError {
    BackendError::Sqlx { source: error }
}
