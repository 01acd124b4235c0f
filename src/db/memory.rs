use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::convert::TryFrom;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use futures::future::{self, BoxFuture, FutureExt};

use crate::errors::BackendError;
use crate::film::{Film, FilmFields, FilmPatch};
use crate::label::{Genre, LabelId, MpaRating, GENRES, MPA_RATINGS};
use crate::user::{User, UserFields, UserPatch};
use crate::Id;

/// A store that keeps everything in process memory.
///
/// Each collection sits behind its own lock, and every mutation
/// (including ID allocation) happens under that collection's write
/// lock. When both are needed, `users` is locked before `films`.
pub struct MemoryDb {
    films: RwLock<FilmTable>,
    users: RwLock<UserTable>,
    genres: Vec<Genre>,
    mpa_ratings: Vec<MpaRating>,
}

#[derive(Default)]
struct FilmTable {
    rows: BTreeMap<Id, FilmRow>,
    likes: HashMap<Id, BTreeSet<Id>>,
}

struct FilmRow {
    fields: FilmFields,
    mpa: MpaRating,
}

#[derive(Default)]
struct UserTable {
    rows: BTreeMap<Id, UserFields>,
    friends: HashMap<Id, BTreeSet<Id>>,
}

impl MemoryDb {
    /// Creates an empty store with the standard vocabularies.
    pub fn new() -> Self {
        MemoryDb::with_vocabularies(GENRES.clone(), MPA_RATINGS.clone())
    }

    pub fn with_vocabularies(genres: Vec<Genre>, mpa_ratings: Vec<MpaRating>) -> Self {
        MemoryDb {
            films: RwLock::new(FilmTable::default()),
            users: RwLock::new(UserTable::default()),
            genres,
            mpa_ratings,
        }
    }

    fn find_genre(&self, id: LabelId) -> Option<&Genre> {
        self.genres.iter().find(|g| g.id == id)
    }

    fn find_mpa_rating(&self, id: LabelId) -> Option<&MpaRating> {
        self.mpa_ratings.iter().find(|r| r.id == id)
    }

    /// Resolves the references in `fields` the way foreign keys would.
    fn make_film_row(&self, fields: FilmFields) -> Result<FilmRow, BackendError> {
        let mpa = self
            .find_mpa_rating(fields.mpa_id)
            .cloned()
            .ok_or_else(|| BackendError::MpaNotFound(fields.mpa_id.into()))?;

        if let Some(&missing) = fields
            .genre_ids
            .iter()
            .find(|&&id| self.find_genre(id).is_none())
        {
            return Err(BackendError::GenreNotFound(missing.into()));
        }

        Ok(FilmRow { fields, mpa })
    }
}

impl Default for MemoryDb {
    fn default() -> Self {
        MemoryDb::new()
    }
}

fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}

fn next_id<V>(rows: &BTreeMap<Id, V>) -> Id {
    rows.keys().next_back().copied().unwrap_or(0) + 1
}

fn ready<'a, T: Send + 'a>(result: Result<T, BackendError>) -> BoxFuture<'a, Result<T, BackendError>> {
    future::ready(result).boxed()
}

impl FilmTable {
    fn likes_count(&self, id: Id) -> i64 {
        self.likes.get(&id).map_or(0, |l| l.len() as i64)
    }

    fn film(&self, id: Id) -> Option<Film> {
        self.rows.get(&id).map(|row| Film {
            id,
            name: row.fields.name.clone(),
            description: row.fields.description.clone(),
            release_date: row.fields.release_date,
            duration: row.fields.duration,
            mpa: row.mpa.clone(),
            genres: vec![],
            likes_count: self.likes_count(id),
        })
    }
}

impl UserTable {
    fn user(&self, id: Id) -> Option<User> {
        self.rows.get(&id).map(|fields| fields.clone().into_user(id))
    }

    fn users_in<'a>(&self, ids: impl IntoIterator<Item = &'a Id>) -> Vec<User> {
        ids.into_iter().filter_map(|&id| self.user(id)).collect()
    }

    fn friend_ids(&self, id: Id) -> BTreeSet<Id> {
        self.friends.get(&id).cloned().unwrap_or_default()
    }
}

impl super::FilmStorage for MemoryDb {
    fn films(&self) -> BoxFuture<Result<Vec<Film>, BackendError>> {
        let table = read(&self.films);

        ready(Ok(table
            .rows
            .keys()
            .filter_map(|&id| table.film(id))
            .collect()))
    }

    fn film(&self, id: Id) -> BoxFuture<Result<Option<Film>, BackendError>> {
        ready(Ok(read(&self.films).film(id)))
    }

    fn insert_film(&self, fields: FilmFields) -> BoxFuture<Result<Id, BackendError>> {
        let result = self.make_film_row(fields).map(|row| {
            let mut table = write(&self.films);
            let id = next_id(&table.rows);
            table.rows.insert(id, row);
            id
        });

        ready(result)
    }

    fn update_film(&self, id: Id, patch: FilmPatch) -> BoxFuture<Result<bool, BackendError>> {
        let mut table = write(&self.films);

        let mut fields = match table.rows.get(&id) {
            Some(row) => row.fields.clone(),
            None => return ready(Ok(false)),
        };
        patch.apply(&mut fields);

        let result = self.make_film_row(fields).map(|row| {
            table.rows.insert(id, row);
            true
        });

        ready(result)
    }

    fn delete_film(&self, id: Id) -> BoxFuture<Result<bool, BackendError>> {
        let mut table = write(&self.films);
        let removed = table.rows.remove(&id).is_some();
        table.likes.remove(&id);

        ready(Ok(removed))
    }

    fn insert_like(&self, film_id: Id, user_id: Id) -> BoxFuture<Result<bool, BackendError>> {
        let users = read(&self.users);
        let mut films = write(&self.films);

        let result = if !films.rows.contains_key(&film_id) {
            Err(BackendError::FilmNotFound(film_id))
        } else if !users.rows.contains_key(&user_id) {
            Err(BackendError::UserNotFound(user_id))
        } else {
            Ok(films.likes.entry(film_id).or_default().insert(user_id))
        };

        ready(result)
    }

    fn delete_like(&self, film_id: Id, user_id: Id) -> BoxFuture<Result<bool, BackendError>> {
        let mut films = write(&self.films);
        let removed = films
            .likes
            .get_mut(&film_id)
            .map_or(false, |likes| likes.remove(&user_id));

        ready(Ok(removed))
    }

    fn popular_films(&self, count: i64) -> BoxFuture<Result<Vec<Film>, BackendError>> {
        let table = read(&self.films);
        let limit = usize::try_from(count.max(0)).unwrap_or(usize::MAX);

        let mut ranked: Vec<(i64, Id)> = table
            .rows
            .keys()
            .map(|&id| (table.likes_count(id), id))
            .collect();

        // most likes first, then lowest ID
        ranked.sort_by(|(a_likes, a_id), (b_likes, b_id)| {
            b_likes.cmp(a_likes).then(a_id.cmp(b_id))
        });

        ready(Ok(ranked
            .into_iter()
            .take(limit)
            .filter_map(|(_, id)| table.film(id))
            .collect()))
    }
}

impl super::UserStorage for MemoryDb {
    fn users(&self) -> BoxFuture<Result<Vec<User>, BackendError>> {
        let table = read(&self.users);

        ready(Ok(table.users_in(table.rows.keys())))
    }

    fn user(&self, id: Id) -> BoxFuture<Result<Option<User>, BackendError>> {
        ready(Ok(read(&self.users).user(id)))
    }

    fn user_id_by_email(&self, email: &str) -> BoxFuture<Result<Option<Id>, BackendError>> {
        let table = read(&self.users);
        let id = table
            .rows
            .iter()
            .find(|(_, fields)| fields.email == email)
            .map(|(&id, _)| id);

        ready(Ok(id))
    }

    fn insert_user(&self, fields: UserFields) -> BoxFuture<Result<Id, BackendError>> {
        let mut table = write(&self.users);

        if table.rows.values().any(|u| u.email == fields.email) {
            return ready(Err(BackendError::EmailAlreadyExists(fields.email)));
        }

        let id = next_id(&table.rows);
        table.rows.insert(id, fields);

        ready(Ok(id))
    }

    fn update_user(&self, id: Id, patch: UserPatch) -> BoxFuture<Result<bool, BackendError>> {
        let mut table = write(&self.users);

        let mut fields = match table.rows.get(&id) {
            Some(current) => current.clone(),
            None => return ready(Ok(false)),
        };
        patch.apply(&mut fields);

        if table
            .rows
            .iter()
            .any(|(&other, u)| other != id && u.email == fields.email)
        {
            return ready(Err(BackendError::EmailAlreadyExists(fields.email)));
        }

        table.rows.insert(id, fields);

        ready(Ok(true))
    }

    fn delete_user(&self, id: Id) -> BoxFuture<Result<bool, BackendError>> {
        let mut users = write(&self.users);
        let mut films = write(&self.films);

        if users.rows.remove(&id).is_none() {
            return ready(Ok(false));
        }

        if let Some(friends) = users.friends.remove(&id) {
            for friend in friends {
                if let Some(theirs) = users.friends.get_mut(&friend) {
                    theirs.remove(&id);
                }
            }
        }

        for likes in films.likes.values_mut() {
            likes.remove(&id);
        }

        ready(Ok(true))
    }

    fn insert_friendship(&self, user_id: Id, friend_id: Id) -> BoxFuture<Result<(), BackendError>> {
        let mut table = write(&self.users);

        if let Some(&missing) = [user_id, friend_id]
            .iter()
            .find(|&&id| !table.rows.contains_key(&id))
        {
            return ready(Err(BackendError::UserNotFound(missing)));
        }

        table.friends.entry(user_id).or_default().insert(friend_id);
        table.friends.entry(friend_id).or_default().insert(user_id);

        ready(Ok(()))
    }

    fn delete_friendship(&self, user_id: Id, friend_id: Id) -> BoxFuture<Result<(), BackendError>> {
        let mut table = write(&self.users);

        for (from, to) in [(user_id, friend_id), (friend_id, user_id)].iter() {
            if let Some(friends) = table.friends.get_mut(from) {
                friends.remove(to);
            }
        }

        ready(Ok(()))
    }

    fn friends(&self, user_id: Id) -> BoxFuture<Result<Vec<User>, BackendError>> {
        let table = read(&self.users);

        ready(Ok(table.users_in(&table.friend_ids(user_id))))
    }

    fn common_friends(&self, user_id: Id, other_id: Id) -> BoxFuture<Result<Vec<User>, BackendError>> {
        let table = read(&self.users);
        let mine = table.friend_ids(user_id);
        let theirs = table.friend_ids(other_id);

        ready(Ok(table.users_in(mine.intersection(&theirs))))
    }
}

impl super::GenreStorage for MemoryDb {
    fn genres(&self) -> BoxFuture<Result<Vec<Genre>, BackendError>> {
        let mut genres = self.genres.clone();
        genres.sort_by_key(|g| g.id);

        ready(Ok(genres))
    }

    fn genre(&self, id: LabelId) -> BoxFuture<Result<Option<Genre>, BackendError>> {
        ready(Ok(self.find_genre(id).cloned()))
    }

    fn genres_for_films(&self, film_ids: &[Id]) -> BoxFuture<Result<HashMap<Id, Vec<Genre>>, BackendError>> {
        let table = read(&self.films);
        let mut result = HashMap::new();

        for id in film_ids {
            if let Some(row) = table.rows.get(id) {
                let genres: Vec<Genre> = row
                    .fields
                    .genre_ids
                    .iter()
                    .filter_map(|&g| self.find_genre(g).cloned())
                    .collect();

                if !genres.is_empty() {
                    result.insert(*id, genres);
                }
            }
        }

        ready(Ok(result))
    }
}

impl super::MpaStorage for MemoryDb {
    fn mpa_ratings(&self) -> BoxFuture<Result<Vec<MpaRating>, BackendError>> {
        let mut ratings = self.mpa_ratings.clone();
        ratings.sort_by_key(|r| r.id);

        ready(Ok(ratings))
    }

    fn mpa_rating(&self, id: LabelId) -> BoxFuture<Result<Option<MpaRating>, BackendError>> {
        ready(Ok(self.find_mpa_rating(id).cloned()))
    }
}
