use serde::{Deserialize, Serialize};
use time::Date;

use crate::dates;
use crate::label::{Genre, LabelId, MpaRating, Reference};
use crate::Id;

/// A film in the catalog, with its rating and genres resolved.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Film {
    pub id: Id,

    pub name: String,

    /// At most 200 characters.
    pub description: Option<String>,

    #[serde(with = "dates")]
    pub release_date: Date,

    /// The running time in minutes.
    pub duration: i32,

    pub mpa: MpaRating,

    /// Ordered by genre ID. Stores return films with this left empty;
    /// the film service fills it in with one batched lookup.
    #[serde(default)]
    pub genres: Vec<Genre>,

    /// How many users like the film.
    #[serde(default)]
    pub likes_count: i64,
}

/// The validated, writable fields of a film.
#[derive(Clone, Debug, PartialEq)]
pub struct FilmFields {
    pub name: String,
    pub description: Option<String>,
    pub release_date: Date,
    pub duration: i32,
    pub mpa_id: LabelId,

    /// Sorted and free of duplicates.
    pub genre_ids: Vec<LabelId>,
}

/// Validated changes to a stored film. `None` keeps the stored value;
/// `genre_ids` replaces the whole set when present.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FilmPatch {
    pub name: Option<String>,
    pub description: Option<String>,
    pub release_date: Option<Date>,
    pub duration: Option<i32>,
    pub mpa_id: Option<LabelId>,
    pub genre_ids: Option<Vec<LabelId>>,
}

impl FilmPatch {
    /// Merges the patch into the current fields. Stores call this while
    /// holding the film exclusively.
    pub fn apply(self, fields: &mut FilmFields) {
        if let Some(name) = self.name {
            fields.name = name;
        }

        if let Some(description) = self.description {
            fields.description = Some(description);
        }

        if let Some(release_date) = self.release_date {
            fields.release_date = release_date;
        }

        if let Some(duration) = self.duration {
            fields.duration = duration;
        }

        if let Some(mpa_id) = self.mpa_id {
            fields.mpa_id = mpa_id;
        }

        if let Some(genre_ids) = self.genre_ids {
            fields.genre_ids = genre_ids;
        }
    }
}

/// A film as submitted by a client. Every field is optional so that
/// the same shape serves both creation and partial updates.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilmPayload {
    pub id: Option<Id>,

    pub name: Option<String>,

    pub description: Option<String>,

    #[serde(default)]
    #[serde(deserialize_with = "dates::deserialize_option")]
    pub release_date: Option<Date>,

    pub duration: Option<i32>,

    pub mpa: Option<Reference>,

    pub genres: Option<Vec<Reference>>,
}
