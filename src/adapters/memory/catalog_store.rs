use crate::domain::{
    book::{self, Book},
    errors::{IssueLoanError, ReleaseError},
    loan::{self, ActiveLoan, Loan, OverdueLoan, ReturnedLoan},
    member::Member,
    value_objects::{BookId, LoanId, MemberId},
};
use crate::ports::catalog_store::{
    CatalogStore as CatalogStoreTrait, Entity, LoanRecord, Result, StoreError,
};
use async_trait::async_trait;
use chrono::NaiveDate;
use std::sync::{Mutex, MutexGuard};

/// 挿入順を保持するコレクション群
#[derive(Debug, Default)]
struct CatalogState {
    books: Vec<Book>,
    members: Vec<Member>,
    loans: Vec<Loan>,
}

impl CatalogState {
    fn book_index(&self, book_id: BookId) -> Option<usize> {
        self.books.iter().position(|b| b.book_id == book_id)
    }

    fn member_index(&self, member_id: MemberId) -> Option<usize> {
        self.members.iter().position(|m| m.member_id == member_id)
    }

    fn active_loans_for_book(&self, book_id: BookId) -> usize {
        self.loans
            .iter()
            .filter(|l| l.is_active() && l.core().book_id == book_id)
            .count()
    }

    fn active_loans_for_member(&self, member_id: MemberId) -> usize {
        self.loans
            .iter()
            .filter(|l| l.is_active() && l.core().member_id == member_id)
            .count()
    }

    fn record(&self, loan: &Loan) -> Option<LoanRecord> {
        let core = loan.core();
        let book = self.books.iter().find(|b| b.book_id == core.book_id)?;
        let member = self.members.iter().find(|m| m.member_id == core.member_id)?;
        Some(LoanRecord {
            loan: loan.clone(),
            book_title: book.title.clone(),
            member_name: member.name.clone(),
        })
    }
}

fn conflict(entity: Entity, id: uuid::Uuid, err: ReleaseError) -> StoreError {
    match err {
        ReleaseError::ActiveLoans(active_loans) => StoreError::Conflict {
            entity,
            id,
            active_loans,
        },
    }
}

/// CatalogStoreのインメモリ実装
///
/// 永続化を必要としない呼び出し元向け。ミューテックスで状態全体を保護し、
/// 前提条件の確認から更新までを1回のロック内で行う。
#[derive(Debug, Default)]
pub struct CatalogStore {
    state: Mutex<CatalogState>,
}

impl CatalogStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> Result<MutexGuard<'_, CatalogState>> {
        self.state
            .lock()
            .map_err(|_| StoreError::Corrupted("catalog state lock poisoned".to_string()))
    }
}

#[async_trait]
impl CatalogStoreTrait for CatalogStore {
    async fn insert_book(&self, book: &Book) -> Result<()> {
        let mut state = self.state()?;

        if state.books.iter().any(|b| b.isbn == book.isbn) {
            return Err(StoreError::DuplicateKey {
                field: "isbn",
                value: book.isbn.to_string(),
            });
        }

        state.books.push(book.clone());
        Ok(())
    }

    async fn delete_book(&self, book_id: BookId) -> Result<()> {
        let mut state = self.state()?;

        let index = state
            .book_index(book_id)
            .ok_or_else(|| StoreError::not_found_book(book_id))?;

        loan::ensure_releasable(state.active_loans_for_book(book_id))
            .map_err(|e| conflict(Entity::Book, book_id.value(), e))?;

        state.books.remove(index);
        state.loans.retain(|l| l.core().book_id != book_id);
        Ok(())
    }

    async fn insert_member(&self, member: &Member) -> Result<()> {
        let mut state = self.state()?;

        if state.members.iter().any(|m| m.email == member.email) {
            return Err(StoreError::DuplicateKey {
                field: "email",
                value: member.email.to_string(),
            });
        }

        state.members.push(member.clone());
        Ok(())
    }

    async fn delete_member(&self, member_id: MemberId) -> Result<()> {
        let mut state = self.state()?;

        let index = state
            .member_index(member_id)
            .ok_or_else(|| StoreError::not_found_member(member_id))?;

        loan::ensure_releasable(state.active_loans_for_member(member_id))
            .map_err(|e| conflict(Entity::Member, member_id.value(), e))?;

        state.members.remove(index);
        state.loans.retain(|l| l.core().member_id != member_id);
        Ok(())
    }

    async fn issue_loan(
        &self,
        book_id: BookId,
        member_id: MemberId,
        issued_on: NaiveDate,
    ) -> Result<ActiveLoan> {
        let mut state = self.state()?;

        let book_index = state
            .book_index(book_id)
            .ok_or(StoreError::Unavailable(book_id))?;
        let checked_out = book::check_out(&state.books[book_index])
            .map_err(|_| StoreError::Unavailable(book_id))?;

        if state.member_index(member_id).is_none() {
            return Err(StoreError::not_found_member(member_id));
        }

        loan::ensure_within_limit(state.active_loans_for_member(member_id)).map_err(|e| match e {
            IssueLoanError::LoanLimitExceeded { active_loans } => StoreError::LimitExceeded {
                member_id,
                active_loans,
            },
        })?;

        let active = loan::issue_loan(book_id, member_id, issued_on);
        state.books[book_index] = checked_out;
        state.loans.push(Loan::Active(active.clone()));

        Ok(active)
    }

    async fn return_loan(&self, loan_id: LoanId, returned_on: NaiveDate) -> Result<ReturnedLoan> {
        let mut state = self.state()?;

        let loan_index = state
            .loans
            .iter()
            .position(|l| l.loan_id() == loan_id)
            .ok_or_else(|| StoreError::not_found_loan(loan_id))?;

        let returned = loan::return_loan(state.loans[loan_index].clone(), returned_on)
            .map_err(|_| StoreError::AlreadyReturned(loan_id))?;

        let book_index = state.book_index(returned.book_id).ok_or_else(|| {
            StoreError::Corrupted(format!(
                "loan {} references missing book {}",
                loan_id, returned.book_id
            ))
        })?;
        let checked_in = book::check_in(&state.books[book_index]).map_err(|e| {
            StoreError::Corrupted(format!(
                "book {} cannot take a return: {:?}",
                returned.book_id, e
            ))
        })?;

        state.books[book_index] = checked_in;
        state.loans[loan_index] = Loan::Returned(returned.clone());

        Ok(returned)
    }

    async fn get_book(&self, book_id: BookId) -> Result<Option<Book>> {
        let state = self.state()?;
        Ok(state.books.iter().find(|b| b.book_id == book_id).cloned())
    }

    async fn get_member(&self, member_id: MemberId) -> Result<Option<Member>> {
        let state = self.state()?;
        Ok(state.members.iter().find(|m| m.member_id == member_id).cloned())
    }

    async fn get_loan(&self, loan_id: LoanId) -> Result<Option<Loan>> {
        let state = self.state()?;
        Ok(state.loans.iter().find(|l| l.loan_id() == loan_id).cloned())
    }

    async fn list_books(&self) -> Result<Vec<Book>> {
        Ok(self.state()?.books.clone())
    }

    async fn list_members(&self) -> Result<Vec<Member>> {
        Ok(self.state()?.members.clone())
    }

    async fn list_active_loans(&self) -> Result<Vec<ActiveLoan>> {
        let state = self.state()?;
        Ok(state
            .loans
            .iter()
            .filter_map(|l| match l {
                Loan::Active(active) => Some(active.clone()),
                Loan::Returned(_) => None,
            })
            .collect())
    }

    async fn overdue_loans(&self, as_of: NaiveDate) -> Result<Vec<OverdueLoan>> {
        let active = self.list_active_loans().await?;
        Ok(loan::select_overdue(active, as_of))
    }

    async fn active_loan_records(&self) -> Result<Vec<LoanRecord>> {
        let state = self.state()?;
        Ok(state
            .loans
            .iter()
            .filter(|l| l.is_active())
            .filter_map(|l| state.record(l))
            .collect())
    }

    async fn loan_history(&self) -> Result<Vec<LoanRecord>> {
        let state = self.state()?;
        let mut records: Vec<LoanRecord> = state
            .loans
            .iter()
            .rev()
            .filter_map(|l| state.record(l))
            .collect();

        // 新しい挿入順に並べてから貸出日の降順で安定ソート
        records.sort_by(|a, b| b.loan.core().issue_date.cmp(&a.loan.core().issue_date));
        Ok(records)
    }

    async fn close(&self) {}
}
