use crate::ports::clock::Clock;
use chrono::{Local, NaiveDate};

/// ローカルタイムゾーンの今日を返すClock
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn today(&self) -> NaiveDate {
        Local::now().date_naive()
    }
}
