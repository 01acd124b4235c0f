//! Storage contracts and their backends. Stores persist and retrieve;
//! every business rule lives in the services.

use std::collections::HashMap;

use futures::future::BoxFuture;

use crate::errors::BackendError;
use crate::film::{Film, FilmFields, FilmPatch};
use crate::label::{Genre, LabelId, MpaRating};
use crate::user::{User, UserFields, UserPatch};
use crate::Id;

mod memory;
mod postgres;

pub use self::memory::MemoryDb;
pub use self::postgres::PgDb;

/// Films and their likes. Returned films carry their resolved MPA
/// rating and like count but no genres (see
/// [`GenreStorage::genres_for_films`]).
pub trait FilmStorage {
    /// All films, ordered by ID.
    fn films(&self) -> BoxFuture<Result<Vec<Film>, BackendError>>;

    fn film(&self, id: Id) -> BoxFuture<Result<Option<Film>, BackendError>>;

    /// Stores a new film and returns its assigned ID.
    fn insert_film(&self, fields: FilmFields) -> BoxFuture<Result<Id, BackendError>>;

    /// Applies `patch` to the film as it is stored at the time of the
    /// write, with no other update to the same film in between. Genre
    /// links are replaced only when the patch carries them. Returns
    /// `false` if there is no such film.
    fn update_film(&self, id: Id, patch: FilmPatch) -> BoxFuture<Result<bool, BackendError>>;

    /// Removes a film with its likes and genre links. Returns `false`
    /// if there is no such film.
    fn delete_film(&self, id: Id) -> BoxFuture<Result<bool, BackendError>>;

    /// Returns `false` if the like already existed.
    fn insert_like(&self, film_id: Id, user_id: Id) -> BoxFuture<Result<bool, BackendError>>;

    /// Returns `false` if there was no such like.
    fn delete_like(&self, film_id: Id, user_id: Id) -> BoxFuture<Result<bool, BackendError>>;

    /// The `count` most liked films, ties broken by ascending ID.
    fn popular_films(&self, count: i64) -> BoxFuture<Result<Vec<Film>, BackendError>>;
}

/// Users and the friendship graph.
pub trait UserStorage {
    /// All users, ordered by ID.
    fn users(&self) -> BoxFuture<Result<Vec<User>, BackendError>>;

    fn user(&self, id: Id) -> BoxFuture<Result<Option<User>, BackendError>>;

    /// The ID of the user registered under `email`, if any.
    fn user_id_by_email(&self, email: &str) -> BoxFuture<Result<Option<Id>, BackendError>>;

    fn insert_user(&self, fields: UserFields) -> BoxFuture<Result<Id, BackendError>>;

    /// Applies `patch` to the user as stored at the time of the write,
    /// with no other update to the same user in between. Returns
    /// `false` if there is no such user.
    fn update_user(&self, id: Id, patch: UserPatch) -> BoxFuture<Result<bool, BackendError>>;

    /// Removes a user with their likes and friendships. Returns
    /// `false` if there is no such user.
    fn delete_user(&self, id: Id) -> BoxFuture<Result<bool, BackendError>>;

    /// Links both users to each other. Existing links are left alone.
    fn insert_friendship(&self, user_id: Id, friend_id: Id) -> BoxFuture<Result<(), BackendError>>;

    /// Unlinks both users in both directions. Missing links are not an
    /// error.
    fn delete_friendship(&self, user_id: Id, friend_id: Id) -> BoxFuture<Result<(), BackendError>>;

    /// The user's friends, ordered by ID.
    fn friends(&self, user_id: Id) -> BoxFuture<Result<Vec<User>, BackendError>>;

    /// Users who are friends of both, ordered by ID.
    fn common_friends(&self, user_id: Id, other_id: Id) -> BoxFuture<Result<Vec<User>, BackendError>>;
}

pub trait GenreStorage {
    fn genres(&self) -> BoxFuture<Result<Vec<Genre>, BackendError>>;

    fn genre(&self, id: LabelId) -> BoxFuture<Result<Option<Genre>, BackendError>>;

    /// Maps each of the given films to its genres, ordered by genre
    /// ID, in a single lookup. Films without genres are absent from
    /// the map.
    fn genres_for_films(&self, film_ids: &[Id]) -> BoxFuture<Result<HashMap<Id, Vec<Genre>>, BackendError>>;
}

pub trait MpaStorage {
    fn mpa_ratings(&self) -> BoxFuture<Result<Vec<MpaRating>, BackendError>>;

    fn mpa_rating(&self, id: LabelId) -> BoxFuture<Result<Option<MpaRating>, BackendError>>;
}

/// Everything the services need from a backend.
pub trait Db: FilmStorage + UserStorage + GenreStorage + MpaStorage + Send + Sync {}

impl<T> Db for T where T: FilmStorage + UserStorage + GenreStorage + MpaStorage + Send + Sync {}
