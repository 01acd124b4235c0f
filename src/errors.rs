use thiserror::Error;
use time::Date;

use crate::Id;

/// Enumerates high-level errors returned by this library.
#[derive(Debug, Error)]
pub enum BackendError {
    /// Represents an SQL error.
    #[error("SQLx error")]
    Sqlx { source: sqlx::Error },

    /// A required field was absent from the request body.
    #[error("Missing required field `{0}`")]
    MissingField(&'static str),

    #[error("Film name must not be blank")]
    BlankFilmName,

    #[error("Description is {length} characters long (maximum is {max})")]
    DescriptionTooLong { length: usize, max: usize },

    #[error("Release date {date} must be after {earliest}")]
    ReleaseDateTooEarly { date: Date, earliest: Date },

    #[error("Duration must be positive (got {0})")]
    NonPositiveDuration(i32),

    #[error("Email {0:?} must not be blank and must contain '@'")]
    InvalidEmail(String),

    #[error("Login must not be blank")]
    BlankLogin,

    #[error("Login {0:?} must not contain whitespace")]
    LoginContainsWhitespace(String),

    #[error("Birthday {0} is in the future")]
    BirthdayInFuture(Date),

    #[error("Count must be positive (got {0})")]
    NonPositiveCount(i64),

    #[error("Film {0} not found")]
    FilmNotFound(Id),

    #[error("User {0} not found")]
    UserNotFound(Id),

    #[error("Genre {0} not found")]
    GenreNotFound(i64),

    #[error("MPA rating {0} not found")]
    MpaNotFound(i64),

    #[error("User {user_id} has not liked film {film_id}")]
    LikeNotFound { film_id: Id, user_id: Id },

    #[error("User {user_id} already likes film {film_id}")]
    DuplicateLike { film_id: Id, user_id: Id },

    #[error("Email {0:?} is already in use")]
    EmailAlreadyExists(String),

    #[error("User {0} cannot be their own friend")]
    SelfFriendship(Id),
}

/// The broad class of an error, which decides the HTTP status.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ErrorKind {
    Validation,
    NotFound,
    Conflict,
    Internal,
}

impl ErrorKind {
    /// Short label sent to clients alongside the full message.
    pub fn label(self) -> &'static str {
        match self {
            ErrorKind::Validation => "Validation error",
            ErrorKind::NotFound => "Not found",
            ErrorKind::Conflict => "Conflict",
            ErrorKind::Internal => "Internal error",
        }
    }
}

impl BackendError {
    pub fn kind(&self) -> ErrorKind {
        use BackendError::*;

        match self {
            MissingField(..)
            | BlankFilmName
            | DescriptionTooLong { .. }
            | ReleaseDateTooEarly { .. }
            | NonPositiveDuration(..)
            | InvalidEmail(..)
            | BlankLogin
            | LoginContainsWhitespace(..)
            | BirthdayInFuture(..)
            | NonPositiveCount(..) => ErrorKind::Validation,
            FilmNotFound(..)
            | UserNotFound(..)
            | GenreNotFound(..)
            | MpaNotFound(..)
            | LikeNotFound { .. } => ErrorKind::NotFound,
            DuplicateLike { .. } | EmailAlreadyExists(..) | SelfFriendship(..) => {
                ErrorKind::Conflict
            }
            Sqlx { .. } => ErrorKind::Internal,
        }
    }
}
