//! Data models for the library server

pub mod book;
pub mod borrowing;
pub mod reader;
pub mod user;

// Re-export commonly used types
pub use book::Book;
pub use borrowing::{BorrowedBook, BorrowingDetail};
pub use reader::Reader;
pub use user::{User, UserClaims};
