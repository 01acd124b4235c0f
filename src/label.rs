use std::convert::TryFrom;

use lazy_static::lazy_static;
use serde::{Deserialize, Serialize};

/// An entry in one of the closed vocabularies (genres and MPA
/// ratings).
#[derive(Clone, Debug, Deserialize, Eq, Hash, PartialEq, Serialize, sqlx::FromRow)]
pub struct Label {
    pub id: LabelId,
    pub name: String,
}

impl Label {
    pub fn new(id: LabelId, name: impl Into<String>) -> Self {
        Label {
            id,
            name: name.into(),
        }
    }
}

pub type Genre = Label;

pub type MpaRating = Label;

/// An ID in one of the vocabulary tables.
pub type LabelId = i16;

/// A reference to a vocabulary entry in an incoming payload. Only the
/// ID matters; any other fields the client sends are ignored. The ID is
/// decoded wider than [`LabelId`] so that out-of-range values are
/// reported as unknown entries rather than malformed JSON.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq)]
pub struct Reference {
    pub id: i64,
}

impl Reference {
    /// The referenced ID, if it can name a vocabulary entry at all.
    pub fn label_id(self) -> Option<LabelId> {
        LabelId::try_from(self.id).ok()
    }
}

lazy_static! {
    /// The genres every store is seeded with.
    pub static ref GENRES: Vec<Genre> = vec![
        Label::new(1, "Comedy"),
        Label::new(2, "Drama"),
        Label::new(3, "Cartoon"),
        Label::new(4, "Thriller"),
        Label::new(5, "Documentary"),
        Label::new(6, "Action"),
    ];

    /// The MPA ratings every store is seeded with.
    pub static ref MPA_RATINGS: Vec<MpaRating> = vec![
        Label::new(1, "G"),
        Label::new(2, "PG"),
        Label::new(3, "PG-13"),
        Label::new(4, "R"),
        Label::new(5, "NC-17"),
    ];
}
