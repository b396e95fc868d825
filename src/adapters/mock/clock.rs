use crate::ports::clock::Clock;
use chrono::{Duration, NaiveDate};
use std::sync::Mutex;

/// Mock implementation of Clock
///
/// Returns a fixed date that tests can move forward explicitly.
#[derive(Debug)]
pub struct FixedClock {
    today: Mutex<NaiveDate>,
}

impl FixedClock {
    pub fn new(today: NaiveDate) -> Self {
        Self {
            today: Mutex::new(today),
        }
    }

    /// Set the current date for testing purposes
    pub fn set(&self, date: NaiveDate) {
        *self.today.lock().unwrap() = date;
    }

    /// Move the current date forward by the given number of days
    pub fn advance_days(&self, days: i64) {
        let mut today = self.today.lock().unwrap();
        *today = *today + Duration::days(days);
    }
}

impl Clock for FixedClock {
    fn today(&self) -> NaiveDate {
        *self.today.lock().unwrap()
    }
}
