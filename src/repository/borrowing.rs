//! Borrowing ledger repository
//!
//! Checkout and return run as single transactions. Checkout locks the book
//! row, then the reader row; concurrent requests on the same book or by the
//! same reader are therefore serialized, and the loser re-reads the committed
//! counter before its rules are evaluated.

use sqlx::{postgres::PgRow, Pool, Postgres, Row};

use crate::{
    error::{AppError, AppResult},
    models::{
        book::Book,
        borrowing::{
            check_checkout, check_return, ActiveBorrowing, BorrowedBook, BorrowingDetail,
            BorrowingQuery, CheckoutContext,
        },
        reader::Reader,
    },
};

use super::{books::lock_book, readers::lock_reader};

// Statement time, not transaction start: the entry may have been committed by a
// checkout that began after this transaction did.
const CLOSE_ENTRY: &str =
    "UPDATE borrowed_books SET return_date = statement_timestamp() WHERE id = $1 RETURNING *";

const DETAIL_COLUMNS: &str = r#"
    bb.id, bb.borrow_date, bb.return_date,
    b.id AS b_id, b.title AS b_title, b.author AS b_author, b.year AS b_year,
    b.isbn AS b_isbn, b.description AS b_description, b.copies_available AS b_copies_available,
    r.id AS r_id, r.name AS r_name, r.email AS r_email
"#;

fn book_from_row(row: &PgRow) -> Result<Book, sqlx::Error> {
    Ok(Book {
        id: row.try_get("b_id")?,
        title: row.try_get("b_title")?,
        author: row.try_get("b_author")?,
        year: row.try_get("b_year")?,
        isbn: row.try_get("b_isbn")?,
        description: row.try_get("b_description")?,
        copies_available: row.try_get("b_copies_available")?,
    })
}

fn detail_from_row(row: &PgRow) -> Result<BorrowingDetail, sqlx::Error> {
    Ok(BorrowingDetail {
        id: row.try_get("id")?,
        book: book_from_row(row)?,
        reader: Reader {
            id: row.try_get("r_id")?,
            name: row.try_get("r_name")?,
            email: row.try_get("r_email")?,
        },
        borrow_date: row.try_get("borrow_date")?,
        return_date: row.try_get("return_date")?,
    })
}

#[derive(Clone)]
pub struct BorrowingRepository {
    pool: Pool<Postgres>,
}

impl BorrowingRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Check out one copy of a book to a reader
    pub async fn checkout(&self, book_id: i32, reader_id: i32) -> AppResult<BorrowedBook> {
        let mut tx = self.pool.begin().await?;

        let book = lock_book(&mut tx, book_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Book with id {} not found", book_id)))?;

        let reader = lock_reader(&mut tx, reader_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Reader with id {} not found", reader_id)))?;

        let active_loans: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM borrowed_books WHERE reader_id = $1 AND return_date IS NULL",
        )
        .bind(reader_id)
        .fetch_one(&mut *tx)
        .await?;

        let holds_copy: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM borrowed_books
                WHERE book_id = $1 AND reader_id = $2 AND return_date IS NULL
            )
            "#,
        )
        .bind(book_id)
        .bind(reader_id)
        .fetch_one(&mut *tx)
        .await?;

        check_checkout(&CheckoutContext {
            book: &book,
            reader: &reader,
            active_loans,
            holds_copy,
        })?;

        sqlx::query("UPDATE books SET copies_available = copies_available - 1 WHERE id = $1")
            .bind(book_id)
            .execute(&mut *tx)
            .await?;

        let entry = sqlx::query_as::<_, BorrowedBook>(
            r#"
            INSERT INTO borrowed_books (book_id, reader_id, borrow_date)
            VALUES ($1, $2, NOW())
            RETURNING *
            "#,
        )
        .bind(book_id)
        .bind(reader_id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        tracing::info!(
            borrowing_id = entry.id,
            book_id,
            reader_id,
            copies_left = book.copies_available - 1,
            "Book checked out"
        );

        Ok(entry)
    }

    /// Close the active loan of a book by a reader
    pub async fn return_book(&self, book_id: i32, reader_id: i32) -> AppResult<BorrowedBook> {
        let mut tx = self.pool.begin().await?;

        let active = sqlx::query_as::<_, BorrowedBook>(
            r#"
            SELECT * FROM borrowed_books
            WHERE book_id = $1 AND reader_id = $2 AND return_date IS NULL
            FOR UPDATE
            "#,
        )
        .bind(book_id)
        .bind(reader_id)
        .fetch_optional(&mut *tx)
        .await?;

        let entry = check_return(active)?;

        let closed = sqlx::query_as::<_, BorrowedBook>(CLOSE_ENTRY)
            .bind(entry.id)
            .fetch_one(&mut *tx)
            .await?;

        sqlx::query("UPDATE books SET copies_available = copies_available + 1 WHERE id = $1")
            .bind(book_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        tracing::info!(borrowing_id = closed.id, book_id, reader_id, "Book returned");

        Ok(closed)
    }

    /// List ledger entries, most recent first
    pub async fn list(&self, query: &BorrowingQuery) -> AppResult<(Vec<BorrowingDetail>, i64)> {
        let active_only = query.active_only();

        let total: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM borrowed_books WHERE ($1 = FALSE OR return_date IS NULL)",
        )
        .bind(active_only)
        .fetch_one(&self.pool)
        .await?;

        let sql = format!(
            r#"
            SELECT {DETAIL_COLUMNS}
            FROM borrowed_books bb
            JOIN books b ON b.id = bb.book_id
            JOIN readers r ON r.id = bb.reader_id
            WHERE ($1 = FALSE OR bb.return_date IS NULL)
            ORDER BY bb.borrow_date DESC, bb.id DESC
            LIMIT $2 OFFSET $3
            "#
        );

        let rows = sqlx::query(&sql)
            .bind(active_only)
            .bind(query.limit())
            .bind(query.skip())
            .fetch_all(&self.pool)
            .await?;

        let borrowings = rows
            .iter()
            .map(detail_from_row)
            .collect::<Result<Vec<_>, _>>()?;

        Ok((borrowings, total))
    }

    /// Active loans of a reader, most recent first
    pub async fn reader_active(&self, reader_id: i32) -> AppResult<Vec<ActiveBorrowing>> {
        let sql = format!(
            r#"
            SELECT {DETAIL_COLUMNS}
            FROM borrowed_books bb
            JOIN books b ON b.id = bb.book_id
            JOIN readers r ON r.id = bb.reader_id
            WHERE bb.reader_id = $1 AND bb.return_date IS NULL
            ORDER BY bb.borrow_date DESC, bb.id DESC
            "#
        );

        let rows = sqlx::query(&sql)
            .bind(reader_id)
            .fetch_all(&self.pool)
            .await?;

        let mut result = Vec::with_capacity(rows.len());
        for row in &rows {
            result.push(ActiveBorrowing {
                id: row.try_get("id")?,
                book: book_from_row(row)?,
                borrow_date: row.try_get("borrow_date")?,
            });
        }

        Ok(result)
    }

    /// Get one ledger entry with its book and reader
    pub async fn get_detail(&self, id: i32) -> AppResult<BorrowingDetail> {
        let sql = format!(
            r#"
            SELECT {DETAIL_COLUMNS}
            FROM borrowed_books bb
            JOIN books b ON b.id = bb.book_id
            JOIN readers r ON r.id = bb.reader_id
            WHERE bb.id = $1
            "#
        );

        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| {
                AppError::NotFound(format!("Borrowing record with id {} not found", id))
            })?;

        Ok(detail_from_row(&row)?)
    }
}
