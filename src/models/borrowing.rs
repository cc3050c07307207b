//! Borrowing ledger model and the checkout/return rules

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use super::{book::Book, reader::Reader};
use crate::error::{AppError, AppResult};

/// Maximum number of simultaneously active loans per reader
pub const MAX_ACTIVE_LOANS: i64 = 3;

/// Default and maximum page size for ledger listings
pub const DEFAULT_PAGE_SIZE: i64 = 100;

/// Ledger entry from database.
///
/// An entry whose `return_date` is `None` is an active loan; once set the
/// entry is closed and never modified again.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct BorrowedBook {
    pub id: i32,
    pub book_id: i32,
    pub reader_id: i32,
    pub borrow_date: DateTime<Utc>,
    pub return_date: Option<DateTime<Utc>>,
}

impl BorrowedBook {
    pub fn is_active(&self) -> bool {
        self.return_date.is_none()
    }
}

/// Checkout / return request
#[derive(Debug, Clone, Copy, Deserialize, Serialize, Validate, ToSchema)]
pub struct BorrowingRequest {
    #[validate(range(min = 1, message = "book_id must be positive"))]
    pub book_id: i32,
    #[validate(range(min = 1, message = "reader_id must be positive"))]
    pub reader_id: i32,
}

/// Ledger entry enriched with its book and reader
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct BorrowingDetail {
    pub id: i32,
    pub book: Book,
    pub reader: Reader,
    pub borrow_date: DateTime<Utc>,
    pub return_date: Option<DateTime<Utc>>,
}

/// Paginated ledger listing
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct BorrowingList {
    pub borrowings: Vec<BorrowingDetail>,
    pub total: i64,
}

/// Active loan of a reader, enriched with the book
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ActiveBorrowing {
    pub id: i32,
    pub book: Book,
    pub borrow_date: DateTime<Utc>,
}

/// Ledger listing query parameters
#[derive(Debug, Default, Deserialize, Validate, IntoParams, ToSchema)]
#[into_params(parameter_in = Query)]
pub struct BorrowingQuery {
    /// Number of records to skip
    #[validate(range(min = 0, message = "skip cannot be negative"))]
    pub skip: Option<i64>,
    /// Maximum number of records to return (1-100)
    #[validate(range(min = 1, max = 100, message = "limit must be between 1 and 100"))]
    pub limit: Option<i64>,
    /// Only loans that have not been returned
    pub active_only: Option<bool>,
}

impl BorrowingQuery {
    pub fn skip(&self) -> i64 {
        self.skip.unwrap_or(0)
    }

    pub fn limit(&self) -> i64 {
        self.limit.unwrap_or(DEFAULT_PAGE_SIZE)
    }

    pub fn active_only(&self) -> bool {
        self.active_only.unwrap_or(false)
    }
}

/// State read (under lock) before a checkout is allowed
#[derive(Debug)]
pub struct CheckoutContext<'a> {
    pub book: &'a Book,
    pub reader: &'a Reader,
    /// Active loans currently held by the reader, all books included
    pub active_loans: i64,
    /// Whether the reader already holds an active loan of this very book
    pub holds_copy: bool,
}

/// Apply the checkout rules in order; the first violated one wins.
///
/// Existence of the book and the reader is established by the caller.
pub fn check_checkout(ctx: &CheckoutContext<'_>) -> AppResult<()> {
    if ctx.book.copies_available <= 0 {
        return Err(AppError::Conflict(format!(
            "Book '{}' has no available copies",
            ctx.book.title
        )));
    }

    if ctx.active_loans >= MAX_ACTIVE_LOANS {
        return Err(AppError::Conflict(format!(
            "Borrowing limit reached: reader '{}' already has {} active borrowings. Maximum is {}.",
            ctx.reader.name, ctx.active_loans, MAX_ACTIVE_LOANS
        )));
    }

    if ctx.holds_copy {
        return Err(AppError::Conflict(format!(
            "Reader '{}' already borrowed this book and hasn't returned it yet",
            ctx.reader.name
        )));
    }

    Ok(())
}

/// A return needs an active entry for exactly the requested (book, reader) pair
pub fn check_return(active: Option<BorrowedBook>) -> AppResult<BorrowedBook> {
    match active {
        Some(entry) if entry.is_active() => Ok(entry),
        _ => Err(AppError::Conflict(
            "This book was not borrowed by this reader or was already returned".to_string(),
        )),
    }
}
