//! Field-level business rules shared by create and update.

use time::macros::date;
use time::Date;

use crate::errors::BackendError;

pub const MAX_DESCRIPTION_LENGTH: usize = 200;

/// No film can be released on or before this date.
pub const EARLIEST_RELEASE_DATE: Date = date!(1895 - 12 - 28);

pub fn film_name(name: &str) -> Result<(), BackendError> {
    if name.trim().is_empty() {
        return Err(BackendError::BlankFilmName);
    }

    Ok(())
}

pub fn description(description: &str) -> Result<(), BackendError> {
    let length = description.chars().count();

    if length > MAX_DESCRIPTION_LENGTH {
        return Err(BackendError::DescriptionTooLong {
            length,
            max: MAX_DESCRIPTION_LENGTH,
        });
    }

    Ok(())
}

pub fn release_date(date: Date) -> Result<(), BackendError> {
    if date <= EARLIEST_RELEASE_DATE {
        return Err(BackendError::ReleaseDateTooEarly {
            date,
            earliest: EARLIEST_RELEASE_DATE,
        });
    }

    Ok(())
}

pub fn duration(duration: i32) -> Result<(), BackendError> {
    if duration <= 0 {
        return Err(BackendError::NonPositiveDuration(duration));
    }

    Ok(())
}

/// Checks the shape of an email. Uniqueness needs the store and is
/// checked by the user service.
pub fn email(email: &str) -> Result<(), BackendError> {
    if email.trim().is_empty() || !email.contains('@') {
        return Err(BackendError::InvalidEmail(email.to_owned()));
    }

    Ok(())
}

pub fn login(login: &str) -> Result<(), BackendError> {
    if login.trim().is_empty() {
        return Err(BackendError::BlankLogin);
    }

    if login.contains(char::is_whitespace) {
        return Err(BackendError::LoginContainsWhitespace(login.to_owned()));
    }

    Ok(())
}

pub fn birthday(birthday: Date, today: Date) -> Result<(), BackendError> {
    if birthday > today {
        return Err(BackendError::BirthdayInFuture(birthday));
    }

    Ok(())
}

pub fn count(count: i64) -> Result<(), BackendError> {
    if count <= 0 {
        return Err(BackendError::NonPositiveCount(count));
    }

    Ok(())
}

/// Returns the display name to store: the given name unless it is
/// absent or blank, in which case the login stands in for it.
pub fn display_name(name: Option<&str>, login: &str) -> String {
    match name {
        Some(name) if !name.trim().is_empty() => name.to_owned(),
        _ => login.to_owned(),
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;
    use time::macros::date;
    use time::Duration;

    use super::*;

    #[test]
    fn release_date_bound_is_strict() {
        assert!(release_date(EARLIEST_RELEASE_DATE).is_err());
        assert!(release_date(date!(1895 - 12 - 27)).is_err());
        assert!(release_date(date!(1895 - 12 - 29)).is_ok());
    }

    #[test]
    fn description_counts_characters_not_bytes() {
        assert!(description(&"ж".repeat(200)).is_ok());
        assert!(description(&"a".repeat(201)).is_err());
        assert!(description("").is_ok());
    }

    #[test]
    fn duration_must_be_positive() {
        assert!(duration(1).is_ok());
        assert!(duration(0).is_err());
        assert!(duration(-90).is_err());
    }

    #[test]
    fn emails_need_an_at_sign() {
        assert!(email("someone@example.com").is_ok());
        assert!(email("someone.example.com").is_err());
        assert!(email("   ").is_err());
        assert!(email("").is_err());
    }

    #[test]
    fn logins_reject_blank_and_whitespace() {
        assert!(login("dolore").is_ok());
        assert!(matches!(login(""), Err(BackendError::BlankLogin)));
        assert!(matches!(login("  "), Err(BackendError::BlankLogin)));
        assert!(matches!(
            login("dolore ullamco"),
            Err(BackendError::LoginContainsWhitespace(_))
        ));
        assert!(login("tab\tlogin").is_err());
    }

    #[test]
    fn birthday_may_be_today_but_not_tomorrow() {
        let today = date!(2024 - 03 - 01);

        assert!(birthday(today, today).is_ok());
        assert!(birthday(today - Duration::days(1), today).is_ok());
        assert!(birthday(today + Duration::days(1), today).is_err());
    }

    #[test]
    fn blank_names_fall_back_to_login() {
        assert_eq!(display_name(None, "common"), "common");
        assert_eq!(display_name(Some(""), "common"), "common");
        assert_eq!(display_name(Some(" \t"), "common"), "common");
        assert_eq!(display_name(Some("Nick Name"), "common"), "Nick Name");
    }

    proptest! {
        #[test]
        fn logins_without_whitespace_are_accepted(l in "\\S{1,40}") {
            prop_assert!(login(&l).is_ok());
        }

        #[test]
        fn logins_with_inner_whitespace_are_rejected(a in "\\S{1,20}", space in "\\s+", b in "\\S{1,20}") {
            let l = format!("{}{}{}", a, space, b);
            prop_assert!(login(&l).is_err(), "{:?} is rejected", l);
        }

        #[test]
        fn non_positive_counts_are_rejected(n in i64::MIN..=0) {
            prop_assert!(count(n).is_err());
        }
    }
}
