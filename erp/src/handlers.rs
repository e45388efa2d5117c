use chrono::{NaiveDate, Utc};

pub mod admin;
pub mod auth;
pub mod dto;
pub mod portal;
pub mod reports;

/// Calendar day used for default periods, in UTC.
pub(crate) fn today() -> NaiveDate {
    Utc::now().date_naive()
}
