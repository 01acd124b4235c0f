use serde::{Deserialize, Serialize};
use time::Date;

use crate::dates;
use crate::validation;
use crate::Id;

/// A registered user.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize, sqlx::FromRow)]
pub struct User {
    pub id: Id,

    /// Unique across all users.
    pub email: String,

    pub login: String,

    /// The display name. Never blank: it falls back to the login.
    pub name: String,

    #[serde(with = "dates")]
    pub birthday: Date,
}

/// The validated, writable fields of a user.
#[derive(Clone, Debug, PartialEq)]
pub struct UserFields {
    pub email: String,
    pub login: String,
    pub name: String,
    pub birthday: Date,
}

impl UserFields {
    pub fn from_user(user: &User) -> Self {
        UserFields {
            email: user.email.clone(),
            login: user.login.clone(),
            name: user.name.clone(),
            birthday: user.birthday,
        }
    }

    pub fn into_user(self, id: Id) -> User {
        User {
            id,
            email: self.email,
            login: self.login,
            name: self.name,
            birthday: self.birthday,
        }
    }
}

/// Validated changes to a stored user. `None` keeps the stored value.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct UserPatch {
    pub email: Option<String>,
    pub login: Option<String>,

    /// A blank name resets the display name to the login, taking any
    /// login change in the same patch into account.
    pub name: Option<String>,

    pub birthday: Option<Date>,
}

impl UserPatch {
    /// Merges the patch into the current fields. Stores call this while
    /// holding the user exclusively.
    pub fn apply(self, fields: &mut UserFields) {
        if let Some(email) = self.email {
            fields.email = email;
        }

        if let Some(login) = self.login {
            fields.login = login;
        }

        if let Some(name) = self.name {
            fields.name = validation::display_name(Some(&name), &fields.login);
        }

        if let Some(birthday) = self.birthday {
            fields.birthday = birthday;
        }
    }
}

/// A user as submitted by a client, for creation or partial update.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct UserPayload {
    pub id: Option<Id>,

    pub email: Option<String>,

    pub login: Option<String>,

    pub name: Option<String>,

    #[serde(default)]
    #[serde(deserialize_with = "dates::deserialize_option")]
    pub birthday: Option<Date>,
}

#[cfg(test)]
mod tests {
    use time::macros::date;

    use super::{UserFields, UserPatch};

    fn fields() -> UserFields {
        UserFields {
            email: "old@example.com".to_string(),
            login: "old".to_string(),
            name: "Old Name".to_string(),
            birthday: date!(1980 - 07 - 04),
        }
    }

    #[test]
    fn patch_keeps_absent_fields() {
        let mut current = fields();

        UserPatch {
            email: Some("new@example.com".to_string()),
            ..UserPatch::default()
        }
        .apply(&mut current);

        assert_eq!(current.email, "new@example.com");
        assert_eq!(current.login, "old");
        assert_eq!(current.name, "Old Name");
    }

    #[test]
    fn blank_name_follows_the_patched_login() {
        let mut current = fields();

        UserPatch {
            login: Some("new".to_string()),
            name: Some(" ".to_string()),
            ..UserPatch::default()
        }
        .apply(&mut current);

        assert_eq!(current.name, "new");
    }
}
