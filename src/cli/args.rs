use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use uuid::Uuid;

/// コマンドライン引数
#[derive(Parser, Debug)]
#[command(name = "library-catalog")]
#[command(version, about = "Library catalog: books, members and loans", long_about = None)]
pub struct Cli {
    /// SQLite database file (overrides LIBRARY_DB)
    #[arg(long, global = true, value_name = "PATH")]
    pub database: Option<PathBuf>,

    /// Print results as JSON
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Command {
    /// Manage books
    #[command(subcommand)]
    Book(BookCommand),
    /// Manage members
    #[command(subcommand)]
    Member(MemberCommand),
    /// Issue, return and list loans
    #[command(subcommand)]
    Loan(LoanCommand),
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum BookCommand {
    /// Add a book
    Add(AddBookArgs),
    /// Delete a book with no active loans
    Delete { book_id: Uuid },
    /// List books in the order they were added
    List {
        /// Only books with at least one copy on the shelf
        #[arg(long)]
        available: bool,
    },
}

#[derive(Args, Debug, PartialEq, Eq)]
pub struct AddBookArgs {
    #[arg(long)]
    pub title: String,
    #[arg(long)]
    pub author: String,
    #[arg(long)]
    pub isbn: String,
    /// Number of copies (at least 1)
    #[arg(long, allow_negative_numbers = true)]
    pub quantity: i64,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum MemberCommand {
    /// Register a member
    Add(AddMemberArgs),
    /// Delete a member with no active loans
    Delete { member_id: Uuid },
    /// List members in the order they registered
    List,
}

#[derive(Args, Debug, PartialEq, Eq)]
pub struct AddMemberArgs {
    #[arg(long)]
    pub name: String,
    #[arg(long)]
    pub email: String,
    #[arg(long)]
    pub phone: Option<String>,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum LoanCommand {
    /// Lend a book to a member for 14 days
    Issue { book_id: Uuid, member_id: Uuid },
    /// Return a loan
    Return { loan_id: Uuid },
    /// List active loans
    List {
        /// Every loan, newest first, including returned ones
        #[arg(long)]
        history: bool,
    },
    /// List loans past their due date
    Overdue {
        /// Reference date (defaults to today)
        #[arg(long, value_name = "YYYY-MM-DD")]
        as_of: Option<NaiveDate>,
    },
}
