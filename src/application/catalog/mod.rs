mod catalog_service;
mod errors;
mod queries;

pub use catalog_service::{
    ServiceDependencies, add_book, add_member, delete_book, delete_member, issue_loan, return_loan,
};
pub use errors::{CatalogApplicationError, ErrorKind, Result};
pub use queries::{
    get_book, get_loan, get_member, list_active_loan_records, list_active_loans,
    list_available_books, list_books, list_members, loan_history, overdue_loans,
    overdue_loans_today,
};
