use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::value_objects::required_text;
use super::{Email, MemberId, ValidationError};

/// Member集約 - 利用登録した会員
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Member {
    pub member_id: MemberId,
    pub name: String,
    pub email: Email,
    pub phone: Option<String>,
    /// 登録日（変更不可）
    pub membership_date: NaiveDate,
}

/// 純粋関数：会員を登録する
///
/// ビジネスルール：
/// - 氏名とメールアドレスは必須
/// - 電話番号は任意（空白のみの場合は未登録として扱う）
/// - 登録日は登録した日
pub fn register_member(
    name: &str,
    email: &str,
    phone: Option<&str>,
    registered_on: NaiveDate,
) -> Result<Member, ValidationError> {
    let name = required_text("name", name)?;
    let email = Email::try_from(email)?;
    let phone = phone
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(str::to_string);

    Ok(Member {
        member_id: MemberId::new(),
        name,
        email,
        phone,
        membership_date: registered_on,
    })
}
