//! Reader (membership) service

use validator::Validate;

use crate::{
    error::AppResult,
    models::reader::{CreateReader, Reader, ReaderList, UpdateReader},
    repository::Repository,
};

#[derive(Clone)]
pub struct MembershipService {
    repository: Repository,
}

impl MembershipService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    pub async fn list_readers(&self) -> AppResult<ReaderList> {
        let (readers, total) = self.repository.readers.list().await?;
        Ok(ReaderList { readers, total })
    }

    pub async fn get_reader(&self, id: i32) -> AppResult<Reader> {
        self.repository.readers.get_by_id(id).await
    }

    pub async fn find_by_email(&self, email: &str) -> AppResult<Option<Reader>> {
        self.repository.readers.find_by_email(email).await
    }

    pub async fn create_reader(&self, reader: CreateReader) -> AppResult<Reader> {
        reader.validate()?;
        let created = self.repository.readers.create(&reader).await?;
        tracing::info!(reader_id = created.id, "Reader created");
        Ok(created)
    }

    pub async fn update_reader(&self, id: i32, changes: UpdateReader) -> AppResult<Reader> {
        changes.validate()?;
        self.repository.readers.update(id, changes).await
    }

    pub async fn delete_reader(&self, id: i32) -> AppResult<()> {
        self.repository.readers.delete(id).await?;
        tracing::info!(reader_id = id, "Reader deleted");
        Ok(())
    }
}
