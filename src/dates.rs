//! Serde helpers for calendar dates, which travel as `YYYY-MM-DD`.

use serde::de::Error as _;
use serde::ser::Error as _;
use serde::{Deserialize, Deserializer, Serializer};
use time::macros::format_description;
use time::Date;

/// Formats a date as `YYYY-MM-DD`.
///
/// ```
/// use reelgraph::dates::format_date;
/// use time::macros::date;
/// assert_eq!(format_date(date!(1895 - 12 - 28)).unwrap(), "1895-12-28");
/// ```
pub fn format_date(date: Date) -> Result<String, time::error::Format> {
    let format = format_description!("[year]-[month]-[day]");

    date.format(&format)
}

/// Parses a `YYYY-MM-DD` date.
pub fn parse_date(s: impl AsRef<str>) -> Result<Date, time::error::Parse> {
    let format = format_description!("[year]-[month]-[day]");

    Date::parse(s.as_ref().trim(), &format)
}

pub fn serialize<S>(date: &Date, serializer: S) -> Result<S::Ok, S::Error>
where S: Serializer {
    let formatted = format_date(*date).map_err(S::Error::custom)?;
    serializer.serialize_str(&formatted)
}

pub fn deserialize<'de, D>(deserializer: D) -> Result<Date, D::Error>
where D: Deserializer<'de> {
    let s: String = Deserialize::deserialize(deserializer)?;
    parse_date(&s).map_err(D::Error::custom)
}

/// Deserializes an optional `YYYY-MM-DD` date; `null` and absent
/// fields both become `None`.
pub fn deserialize_option<'de, D>(deserializer: D) -> Result<Option<Date>, D::Error>
where D: Deserializer<'de> {
    let o: Option<String> = Deserialize::deserialize(deserializer)?;
    o.map(|s| parse_date(&s).map_err(D::Error::custom)).transpose()
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;
    use time::{Date, Month};

    use super::{format_date, parse_date};

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 2000, ..ProptestConfig::default()
        })]

        #[test]
        fn formatted_dates_parse_back(year in 1000i32..=9999, ordinal in 1u16..=365) {
            let date = Date::from_ordinal_date(year, ordinal).unwrap();
            let formatted = format_date(date).unwrap();

            prop_assert_eq!(formatted.len(), 10, "{:?} is zero-padded", formatted);
            prop_assert_eq!(parse_date(&formatted).unwrap(), date);
        }
    }

    #[test]
    fn rejects_other_layouts() {
        assert!(parse_date("28.12.1895").is_err());
        assert!(parse_date("1895-13-01").is_err());
        assert!(parse_date("").is_err());
        assert_eq!(
            parse_date(" 2000-02-29 ").unwrap(),
            Date::from_calendar_date(2000, Month::February, 29).unwrap()
        );
    }
}
