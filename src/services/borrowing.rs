//! Borrowing ledger service

use validator::Validate;

use crate::{
    error::AppResult,
    models::borrowing::{
        ActiveBorrowing, BorrowedBook, BorrowingDetail, BorrowingList, BorrowingQuery,
        BorrowingRequest,
    },
    repository::Repository,
};

#[derive(Clone)]
pub struct BorrowingService {
    repository: Repository,
}

impl BorrowingService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    /// Check out a copy of a book
    pub async fn checkout(&self, request: BorrowingRequest) -> AppResult<BorrowedBook> {
        request.validate()?;
        self.repository
            .borrowing
            .checkout(request.book_id, request.reader_id)
            .await
    }

    /// Return a previously checked-out copy
    pub async fn return_book(&self, request: BorrowingRequest) -> AppResult<BorrowedBook> {
        request.validate()?;
        self.repository
            .borrowing
            .return_book(request.book_id, request.reader_id)
            .await
    }

    pub async fn list(&self, query: &BorrowingQuery) -> AppResult<BorrowingList> {
        query.validate()?;
        let (borrowings, total) = self.repository.borrowing.list(query).await?;
        Ok(BorrowingList { borrowings, total })
    }

    /// Active loans of a reader
    pub async fn reader_active(&self, reader_id: i32) -> AppResult<Vec<ActiveBorrowing>> {
        // Verify reader exists
        self.repository.readers.get_by_id(reader_id).await?;
        self.repository.borrowing.reader_active(reader_id).await
    }

    pub async fn get(&self, id: i32) -> AppResult<BorrowingDetail> {
        self.repository.borrowing.get_detail(id).await
    }
}
