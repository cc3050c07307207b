//! Readers repository (membership store)

use sqlx::{PgConnection, Pool, Postgres};

use crate::{
    error::{AppError, AppResult},
    models::reader::{CreateReader, Reader, UpdateReader},
};

#[derive(Clone)]
pub struct ReadersRepository {
    pool: Pool<Postgres>,
}

/// Load a reader and hold its row lock until the surrounding transaction ends
pub(crate) async fn lock_reader(conn: &mut PgConnection, id: i32) -> AppResult<Option<Reader>> {
    let reader = sqlx::query_as::<_, Reader>("SELECT * FROM readers WHERE id = $1 FOR UPDATE")
        .bind(id)
        .fetch_optional(conn)
        .await?;
    Ok(reader)
}

fn duplicate_email(email: &str) -> AppError {
    AppError::Conflict(format!("Reader with email {} already exists", email))
}

impl ReadersRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    pub async fn find_by_id(&self, id: i32) -> AppResult<Option<Reader>> {
        let reader = sqlx::query_as::<_, Reader>("SELECT * FROM readers WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(reader)
    }

    /// Get reader by ID
    pub async fn get_by_id(&self, id: i32) -> AppResult<Reader> {
        self.find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Reader with id {} not found", id)))
    }

    pub async fn find_by_email(&self, email: &str) -> AppResult<Option<Reader>> {
        let reader = sqlx::query_as::<_, Reader>("SELECT * FROM readers WHERE email = $1")
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;
        Ok(reader)
    }

    pub async fn list(&self) -> AppResult<(Vec<Reader>, i64)> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM readers")
            .fetch_one(&self.pool)
            .await?;

        let readers = sqlx::query_as::<_, Reader>("SELECT * FROM readers ORDER BY id")
            .fetch_all(&self.pool)
            .await?;

        Ok((readers, total))
    }

    pub async fn create(&self, reader: &CreateReader) -> AppResult<Reader> {
        if self.find_by_email(&reader.email).await?.is_some() {
            return Err(duplicate_email(&reader.email));
        }

        let created = sqlx::query_as::<_, Reader>(
            "INSERT INTO readers (name, email) VALUES ($1, $2) RETURNING *",
        )
        .bind(&reader.name)
        .bind(&reader.email)
        .fetch_one(&self.pool)
        .await?;

        Ok(created)
    }

    pub async fn update(&self, id: i32, changes: UpdateReader) -> AppResult<Reader> {
        let mut tx = self.pool.begin().await?;

        let mut reader = lock_reader(&mut tx, id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Reader {} not found", id)))?;

        if let Some(ref email) = changes.email {
            if *email != reader.email {
                let taken: bool =
                    sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM readers WHERE email = $1)")
                        .bind(email)
                        .fetch_one(&mut *tx)
                        .await?;
                if taken {
                    return Err(duplicate_email(email));
                }
            }
        }

        changes.apply_to(&mut reader);

        let updated = sqlx::query_as::<_, Reader>(
            "UPDATE readers SET name = $1, email = $2 WHERE id = $3 RETURNING *",
        )
        .bind(&reader.name)
        .bind(&reader.email)
        .bind(id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(updated)
    }

    /// Delete a reader; refused while the reader still holds books
    pub async fn delete(&self, id: i32) -> AppResult<()> {
        let mut tx = self.pool.begin().await?;

        lock_reader(&mut tx, id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Reader {} not found", id)))?;

        let held: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM borrowed_books WHERE reader_id = $1 AND return_date IS NULL",
        )
        .bind(id)
        .fetch_one(&mut *tx)
        .await?;

        if held > 0 {
            return Err(AppError::Conflict(format!(
                "Reader {} still has {} borrowed books and cannot be deleted",
                id, held
            )));
        }

        sqlx::query("DELETE FROM readers WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }
}
