use crate::application::catalog::{
    ServiceDependencies, add_book, add_member, delete_book, delete_member, issue_loan,
    list_active_loan_records, list_available_books, list_books, list_members, loan_history,
    overdue_loans, return_loan,
};
use crate::domain::commands::*;
use crate::domain::value_objects::{BookId, LoanId, MemberId};
use std::collections::HashMap;

use super::{
    args::{BookCommand, Command, LoanCommand, MemberCommand},
    error::CliError,
    types::{
        BookResponse, DeletedResponse, LoanResponse, MemberResponse, OverdueLoanResponse, Output,
    },
};

/// コマンドを実行し、出力を返す
pub async fn execute(deps: &ServiceDependencies, command: Command) -> Result<Output, CliError> {
    match command {
        Command::Book(cmd) => execute_book(deps, cmd).await,
        Command::Member(cmd) => execute_member(deps, cmd).await,
        Command::Loan(cmd) => execute_loan(deps, cmd).await,
    }
}

async fn execute_book(deps: &ServiceDependencies, command: BookCommand) -> Result<Output, CliError> {
    match command {
        BookCommand::Add(args) => {
            let cmd = AddBook {
                title: args.title,
                author: args.author,
                isbn: args.isbn,
                quantity: args.quantity,
            };
            let book = add_book(deps, cmd).await?;
            Ok(Output::Book(book.into()))
        }
        BookCommand::Delete { book_id } => {
            delete_book(deps, BookId::from_uuid(book_id)).await?;
            Ok(Output::Deleted(DeletedResponse {
                deleted: "book",
                id: book_id,
            }))
        }
        BookCommand::List { available } => {
            let books = if available {
                list_available_books(deps).await?
            } else {
                list_books(deps).await?
            };
            Ok(Output::Books(books.into_iter().map(BookResponse::from).collect()))
        }
    }
}

async fn execute_member(
    deps: &ServiceDependencies,
    command: MemberCommand,
) -> Result<Output, CliError> {
    match command {
        MemberCommand::Add(args) => {
            let cmd = AddMember {
                name: args.name,
                email: args.email,
                phone: args.phone,
            };
            let member = add_member(deps, cmd).await?;
            Ok(Output::Member(member.into()))
        }
        MemberCommand::Delete { member_id } => {
            delete_member(deps, MemberId::from_uuid(member_id)).await?;
            Ok(Output::Deleted(DeletedResponse {
                deleted: "member",
                id: member_id,
            }))
        }
        MemberCommand::List => {
            let members = list_members(deps).await?;
            Ok(Output::Members(
                members.into_iter().map(MemberResponse::from).collect(),
            ))
        }
    }
}

async fn execute_loan(deps: &ServiceDependencies, command: LoanCommand) -> Result<Output, CliError> {
    match command {
        LoanCommand::Issue { book_id, member_id } => {
            let cmd = IssueLoan {
                book_id: BookId::from_uuid(book_id),
                member_id: MemberId::from_uuid(member_id),
            };
            let loan = issue_loan(deps, cmd).await?;
            Ok(Output::Loan(loan.into()))
        }
        LoanCommand::Return { loan_id } => {
            let cmd = ReturnLoan {
                loan_id: LoanId::from_uuid(loan_id),
            };
            let loan = return_loan(deps, cmd).await?;
            Ok(Output::Loan(loan.into()))
        }
        LoanCommand::List { history } => {
            let records = if history {
                loan_history(deps).await?
            } else {
                list_active_loan_records(deps).await?
            };
            Ok(Output::Loans(
                records.into_iter().map(LoanResponse::from).collect(),
            ))
        }
        LoanCommand::Overdue { as_of } => {
            let as_of = as_of.unwrap_or_else(|| deps.clock.today());
            let overdue = overdue_loans(deps, as_of).await?;

            // 延滞一覧にはタイトルと氏名を添える
            let mut names: HashMap<LoanId, (String, String)> = list_active_loan_records(deps)
                .await?
                .into_iter()
                .map(|record| {
                    (
                        record.loan.loan_id(),
                        (record.book_title, record.member_name),
                    )
                })
                .collect();

            let responses = overdue
                .into_iter()
                .map(|entry| {
                    let loan_id = entry.loan.loan_id;
                    let mut loan = LoanResponse::from(entry.loan);
                    if let Some((title, name)) = names.remove(&loan_id) {
                        loan = loan.with_names(title, name);
                    }
                    OverdueLoanResponse {
                        loan,
                        days_overdue: entry.days_overdue,
                    }
                })
                .collect();
            Ok(Output::Overdue(responses))
        }
    }
}
