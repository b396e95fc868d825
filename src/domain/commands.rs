use serde::{Deserialize, Serialize};

use super::{BookId, LoanId, MemberId};

/// コマンド：書籍を登録する
///
/// 値は未検証の入力。検証はドメイン関数が行う。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddBook {
    pub title: String,
    pub author: String,
    pub isbn: String,
    pub quantity: i64,
}

/// コマンド：会員を登録する
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddMember {
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
}

/// コマンド：書籍を貸し出す
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueLoan {
    pub book_id: BookId,
    pub member_id: MemberId,
}

/// コマンド：書籍を返却する
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReturnLoan {
    pub loan_id: LoanId,
}
