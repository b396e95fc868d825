use chrono::NaiveDate;

/// 日付の取得元
///
/// 貸出日・返却日・登録日はすべてこのポートから取得する。
pub trait Clock: Send + Sync {
    fn today(&self) -> NaiveDate;
}
