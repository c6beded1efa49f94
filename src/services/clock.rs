use chrono::{Local, NaiveDate, NaiveDateTime};

/// Source of "now" for date filtering and pickup cut-offs.
pub trait Clock: Send + Sync {
    fn now(&self) -> NaiveDateTime;

    fn today(&self) -> NaiveDate {
        self.now().date()
    }
}

/// Wall clock in the server's local time zone.
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }
}

/// A clock frozen at one instant.
pub struct FixedClock(pub NaiveDateTime);

impl FixedClock {
    pub fn at_date(date: NaiveDate) -> Self {
        Self(date.and_hms_opt(8, 0, 0).unwrap_or_default())
    }
}

impl Clock for FixedClock {
    fn now(&self) -> NaiveDateTime {
        self.0
    }
}
