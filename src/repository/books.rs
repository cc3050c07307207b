//! Books repository (catalog store)

use sqlx::{PgConnection, Pool, Postgres};

use crate::{
    error::{AppError, AppResult},
    models::book::{Book, CreateBook, UpdateBook},
};

#[derive(Clone)]
pub struct BooksRepository {
    pool: Pool<Postgres>,
}

/// Load a book and hold its row lock until the surrounding transaction ends
pub(crate) async fn lock_book(conn: &mut PgConnection, id: i32) -> AppResult<Option<Book>> {
    let book = sqlx::query_as::<_, Book>("SELECT * FROM books WHERE id = $1 FOR UPDATE")
        .bind(id)
        .fetch_optional(conn)
        .await?;
    Ok(book)
}

async fn active_loans_for_book(conn: &mut PgConnection, id: i32) -> AppResult<i64> {
    let count: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM borrowed_books WHERE book_id = $1 AND return_date IS NULL",
    )
    .bind(id)
    .fetch_one(conn)
    .await?;
    Ok(count)
}

fn duplicate_isbn(isbn: &str) -> AppError {
    AppError::Conflict(format!("Book with ISBN {} already exists", isbn))
}

impl BooksRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    pub async fn find_by_id(&self, id: i32) -> AppResult<Option<Book>> {
        let book = sqlx::query_as::<_, Book>("SELECT * FROM books WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(book)
    }

    /// Get book by ID
    pub async fn get_by_id(&self, id: i32) -> AppResult<Book> {
        self.find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Book {} not found", id)))
    }

    pub async fn find_by_isbn(&self, isbn: &str) -> AppResult<Option<Book>> {
        let book = sqlx::query_as::<_, Book>("SELECT * FROM books WHERE isbn = $1")
            .bind(isbn)
            .fetch_optional(&self.pool)
            .await?;
        Ok(book)
    }

    /// List books ordered by ID, with the overall count
    pub async fn list(&self, skip: i64, limit: Option<i64>) -> AppResult<(Vec<Book>, i64)> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM books")
            .fetch_one(&self.pool)
            .await?;

        // LIMIT NULL means no limit in Postgres
        let books = sqlx::query_as::<_, Book>(
            "SELECT * FROM books ORDER BY id LIMIT $1 OFFSET $2",
        )
        .bind(limit)
        .bind(skip)
        .fetch_all(&self.pool)
        .await?;

        Ok((books, total))
    }

    pub async fn create(&self, book: &CreateBook) -> AppResult<Book> {
        if self.find_by_isbn(&book.isbn).await?.is_some() {
            return Err(duplicate_isbn(&book.isbn));
        }

        let created = sqlx::query_as::<_, Book>(
            r#"
            INSERT INTO books (title, author, year, isbn, description, copies_available)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(&book.title)
        .bind(&book.author)
        .bind(book.year)
        .bind(&book.isbn)
        .bind(book.description.as_deref().unwrap_or_default())
        .bind(book.copies_available)
        .fetch_one(&self.pool)
        .await?;

        Ok(created)
    }

    /// Partial update.
    ///
    /// `copies_available` is owned by the borrowing ledger while copies are out,
    /// so overwriting it is refused unless the book has no active loans.
    pub async fn update(&self, id: i32, changes: UpdateBook) -> AppResult<Book> {
        let mut tx = self.pool.begin().await?;

        let mut book = lock_book(&mut tx, id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Book with id {} not found", id)))?;

        if let Some(ref isbn) = changes.isbn {
            if *isbn != book.isbn {
                let taken: bool =
                    sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM books WHERE isbn = $1)")
                        .bind(isbn)
                        .fetch_one(&mut *tx)
                        .await?;
                if taken {
                    return Err(duplicate_isbn(isbn));
                }
            }
        }

        if let Some(copies) = changes.copies_available {
            if copies != book.copies_available {
                let out = active_loans_for_book(&mut tx, id).await?;
                if out > 0 {
                    return Err(AppError::Conflict(format!(
                        "Cannot change copies_available of book {}: {} copies in circulation",
                        id, out
                    )));
                }
            }
        }

        changes.apply_to(&mut book);

        let updated = sqlx::query_as::<_, Book>(
            r#"
            UPDATE books
            SET title = $1, author = $2, year = $3, isbn = $4, description = $5, copies_available = $6
            WHERE id = $7
            RETURNING *
            "#,
        )
        .bind(&book.title)
        .bind(&book.author)
        .bind(book.year)
        .bind(&book.isbn)
        .bind(&book.description)
        .bind(book.copies_available)
        .bind(id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(updated)
    }

    /// Delete a book together with its closed ledger history
    pub async fn delete(&self, id: i32) -> AppResult<()> {
        let mut tx = self.pool.begin().await?;

        lock_book(&mut tx, id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Book {} not found", id)))?;

        let out = active_loans_for_book(&mut tx, id).await?;
        if out > 0 {
            return Err(AppError::Conflict(format!(
                "Book {} has {} copies checked out and cannot be deleted",
                id, out
            )));
        }

        sqlx::query("DELETE FROM books WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }
}
