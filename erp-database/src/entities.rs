use chrono::{Datelike, Duration, NaiveDate};

pub mod auth_codes;
pub mod credentials;
pub mod goals;
pub mod mileage;
pub mod profiles;
pub mod sales;
pub mod sales_reps;
pub mod sessions;
pub mod visits;

/// Inclusive date range used by every dated listing.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub struct Period {
    pub from: NaiveDate,
    pub to: NaiveDate,
}

impl Period {
    pub fn new(from: NaiveDate, to: NaiveDate) -> Option<Self> {
        (from <= to).then_some(Self { from, to })
    }

    pub fn month(year: i32, month: u32) -> Option<Self> {
        let from = NaiveDate::from_ymd_opt(year, month, 1)?;
        let next = if month == 12 {
            NaiveDate::from_ymd_opt(year + 1, 1, 1)?
        } else {
            NaiveDate::from_ymd_opt(year, month + 1, 1)?
        };
        Some(Self {
            from,
            to: next - Duration::days(1),
        })
    }

    pub fn month_of(date: NaiveDate) -> Self {
        // A valid date always has a valid month around it.
        Self::month(date.year(), date.month()).unwrap_or(Self {
            from: date,
            to: date,
        })
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.from <= date && date <= self.to
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn month_handles_december_and_leap_years() {
        let december = Period::month(2024, 12).unwrap();
        assert_eq!(december.from, NaiveDate::from_ymd_opt(2024, 12, 1).unwrap());
        assert_eq!(december.to, NaiveDate::from_ymd_opt(2024, 12, 31).unwrap());

        let february = Period::month(2024, 2).unwrap();
        assert_eq!(february.to, NaiveDate::from_ymd_opt(2024, 2, 29).unwrap());
    }

    #[test]
    fn month_of_spans_the_whole_month() {
        let period = Period::month_of(NaiveDate::from_ymd_opt(2023, 2, 14).unwrap());
        assert_eq!(period.from, NaiveDate::from_ymd_opt(2023, 2, 1).unwrap());
        assert_eq!(period.to, NaiveDate::from_ymd_opt(2023, 2, 28).unwrap());

        let period = Period::month_of(NaiveDate::from_ymd_opt(2024, 12, 31).unwrap());
        assert_eq!(period.from, NaiveDate::from_ymd_opt(2024, 12, 1).unwrap());
        assert!(period.contains(NaiveDate::from_ymd_opt(2024, 12, 31).unwrap()));
    }

    #[test]
    fn invalid_months_are_rejected() {
        assert!(Period::month(2024, 0).is_none());
        assert!(Period::month(2024, 13).is_none());
    }

    #[test]
    fn reversed_ranges_are_rejected() {
        let a = NaiveDate::from_ymd_opt(2024, 3, 10).unwrap();
        let b = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        assert!(Period::new(a, b).is_none());
        assert!(Period::new(b, a).unwrap().contains(a));
    }
}
