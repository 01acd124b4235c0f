use serde::Serialize;
use warp::reject;

use crate::errors::BackendError;
use crate::label::LabelId;
use crate::Id;

/// A failed request: the error, plus enough context to identify the
/// request in logs and in the response body.
#[derive(Debug)]
pub struct Rejection {
    pub(crate) context: Context,
    pub(crate) error: BackendError,
}

impl Rejection {
    pub fn new(context: Context, error: BackendError) -> Self {
        Rejection { context, error }
    }

    pub fn flatten(&self) -> FlattenedRejection {
        FlattenedRejection {
            error: self.error.kind().label(),
            description: format!("{}", self.error),
            context: self.context.clone(),
        }
    }
}

impl reject::Reject for Rejection {}

#[derive(Debug, Serialize)]
pub struct FlattenedRejection {
    pub(crate) error: &'static str,
    pub(crate) description: String,
    #[serde(flatten)]
    pub(crate) context: Context,
}

#[derive(Clone, Debug, Serialize)]
#[serde(untagged)]
pub enum Context {
    Film { id: Id },
    FilmSubmission { id: Option<Id> },
    Like { film_id: Id, user_id: Id },
    Popular { count: i64 },
    User { id: Id },
    UserSubmission { id: Option<Id> },
    Friend { user_id: Id, friend_id: Id },
    CommonFriends { user_id: Id, other_id: Id },
    Genre { id: LabelId },
    MpaRating { id: LabelId },
    Listing { collection: &'static str },
    Request {},
}
