use chrono::NaiveDate;
use serde::Serialize;
use std::fmt;
use uuid::Uuid;

use crate::application::catalog::ErrorKind;
use crate::domain::{
    book::Book,
    loan::{ActiveLoan, Loan, LoanCore, ReturnedLoan},
    member::Member,
};
use crate::ports::LoanRecord;

/// 書籍の出力
#[derive(Debug, Serialize)]
pub struct BookResponse {
    pub book_id: Uuid,
    pub title: String,
    pub author: String,
    pub isbn: String,
    pub quantity: u32,
    pub available: u32,
}

impl From<Book> for BookResponse {
    fn from(book: Book) -> Self {
        Self {
            book_id: book.book_id.value(),
            available: book.available(),
            quantity: book.quantity.value(),
            isbn: book.isbn.as_str().to_string(),
            title: book.title,
            author: book.author,
        }
    }
}

impl fmt::Display for BookResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}  {} / {}  ISBN {}  {}/{} available",
            self.book_id, self.title, self.author, self.isbn, self.available, self.quantity
        )
    }
}

/// 会員の出力
#[derive(Debug, Serialize)]
pub struct MemberResponse {
    pub member_id: Uuid,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub membership_date: NaiveDate,
}

impl From<Member> for MemberResponse {
    fn from(member: Member) -> Self {
        Self {
            member_id: member.member_id.value(),
            email: member.email.as_str().to_string(),
            name: member.name,
            phone: member.phone,
            membership_date: member.membership_date,
        }
    }
}

impl fmt::Display for MemberResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}  {} <{}>", self.member_id, self.name, self.email)?;
        if let Some(phone) = &self.phone {
            write!(f, "  tel {phone}")?;
        }
        write!(f, "  since {}", self.membership_date)
    }
}

/// 貸出の出力
#[derive(Debug, Serialize)]
pub struct LoanResponse {
    pub loan_id: Uuid,
    pub book_id: Uuid,
    pub member_id: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub book_title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub member_name: Option<String>,
    pub issue_date: NaiveDate,
    pub due_date: NaiveDate,
    pub return_date: Option<NaiveDate>,
    pub status: &'static str,
}

impl LoanResponse {
    fn new(core: &LoanCore, return_date: Option<NaiveDate>) -> Self {
        Self {
            loan_id: core.loan_id.value(),
            book_id: core.book_id.value(),
            member_id: core.member_id.value(),
            book_title: None,
            member_name: None,
            issue_date: core.issue_date,
            due_date: core.due_date,
            return_date,
            status: if return_date.is_some() {
                "returned"
            } else {
                "active"
            },
        }
    }

    pub fn with_names(mut self, book_title: String, member_name: String) -> Self {
        self.book_title = Some(book_title);
        self.member_name = Some(member_name);
        self
    }
}

impl From<ActiveLoan> for LoanResponse {
    fn from(loan: ActiveLoan) -> Self {
        Self::new(&loan.core, None)
    }
}

impl From<ReturnedLoan> for LoanResponse {
    fn from(loan: ReturnedLoan) -> Self {
        Self::new(&loan.core, Some(loan.return_date))
    }
}

impl From<Loan> for LoanResponse {
    fn from(loan: Loan) -> Self {
        Self::new(loan.core(), loan.return_date())
    }
}

impl From<LoanRecord> for LoanResponse {
    fn from(record: LoanRecord) -> Self {
        LoanResponse::from(record.loan).with_names(record.book_title, record.member_name)
    }
}

impl fmt::Display for LoanResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}  ", self.loan_id)?;
        match (&self.book_title, &self.member_name) {
            (Some(title), Some(name)) => write!(f, "\"{title}\" -> {name}")?,
            _ => write!(f, "book {} -> member {}", self.book_id, self.member_id)?,
        }
        write!(f, "  issued {}  due {}", self.issue_date, self.due_date)?;
        if let Some(returned) = self.return_date {
            write!(f, "  returned {returned}")?;
        }
        Ok(())
    }
}

/// 延滞中の貸出の出力
#[derive(Debug, Serialize)]
pub struct OverdueLoanResponse {
    #[serde(flatten)]
    pub loan: LoanResponse,
    pub days_overdue: i64,
}

impl fmt::Display for OverdueLoanResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}  {} day(s) overdue", self.loan, self.days_overdue)
    }
}

/// 削除結果の出力
#[derive(Debug, Serialize)]
pub struct DeletedResponse {
    pub deleted: &'static str,
    pub id: Uuid,
}

impl fmt::Display for DeletedResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Deleted {} {}", self.deleted, self.id)
    }
}

/// エラーレスポンス
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub kind: ErrorKind,
    pub error: String,
}

impl ErrorResponse {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            error: message.into(),
        }
    }
}

/// コマンドの実行結果
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum Output {
    Book(BookResponse),
    Books(Vec<BookResponse>),
    Member(MemberResponse),
    Members(Vec<MemberResponse>),
    Loan(LoanResponse),
    Loans(Vec<LoanResponse>),
    Overdue(Vec<OverdueLoanResponse>),
    Deleted(DeletedResponse),
}

impl Output {
    /// 標準出力に書く文字列
    pub fn render(&self, json: bool) -> serde_json::Result<String> {
        if json {
            serde_json::to_string_pretty(self)
        } else {
            Ok(self.to_string())
        }
    }
}

fn write_lines<T: fmt::Display>(
    f: &mut fmt::Formatter<'_>,
    items: &[T],
    empty: &str,
) -> fmt::Result {
    if items.is_empty() {
        return f.write_str(empty);
    }
    let mut first = true;
    for item in items {
        if !first {
            writeln!(f)?;
        }
        write!(f, "{item}")?;
        first = false;
    }
    Ok(())
}

impl fmt::Display for Output {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Output::Book(book) => write!(f, "{book}"),
            Output::Books(books) => write_lines(f, books, "No books."),
            Output::Member(member) => write!(f, "{member}"),
            Output::Members(members) => write_lines(f, members, "No members."),
            Output::Loan(loan) => write!(f, "{loan}"),
            Output::Loans(loans) => write_lines(f, loans, "No loans."),
            Output::Overdue(loans) => write_lines(f, loans, "No overdue loans."),
            Output::Deleted(deleted) => write!(f, "{deleted}"),
        }
    }
}
