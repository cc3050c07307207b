//! Book (catalog) model and related types

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

/// Book record from database
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Book {
    pub id: i32,
    pub title: String,
    pub author: String,
    pub year: i32,
    pub isbn: String,
    pub description: String,
    /// Copies currently on the shelf (not checked out)
    pub copies_available: i32,
}

/// Create book request
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateBook {
    #[validate(length(min = 1, max = 255, message = "Title must be 1-255 characters"))]
    pub title: String,
    #[validate(length(min = 1, max = 255, message = "Author must be 1-255 characters"))]
    pub author: String,
    #[validate(range(min = 1000, max = 9999, message = "Year must be between 1000 and 9999"))]
    pub year: i32,
    #[validate(length(min = 10, max = 17, message = "ISBN must be 10-17 characters"))]
    pub isbn: String,
    pub description: Option<String>,
    #[validate(range(min = 0, message = "copies_available cannot be negative"))]
    pub copies_available: i32,
}

/// Update book request; absent fields are left untouched
#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateBook {
    #[validate(length(min = 1, max = 255, message = "Title must be 1-255 characters"))]
    pub title: Option<String>,
    #[validate(length(min = 1, max = 255, message = "Author must be 1-255 characters"))]
    pub author: Option<String>,
    #[validate(range(min = 1000, max = 9999, message = "Year must be between 1000 and 9999"))]
    pub year: Option<i32>,
    #[validate(length(min = 10, max = 17, message = "ISBN must be 10-17 characters"))]
    pub isbn: Option<String>,
    pub description: Option<String>,
    /// Only accepted while none of the book's copies are checked out
    #[validate(range(min = 0, message = "copies_available cannot be negative"))]
    pub copies_available: Option<i32>,
}

impl UpdateBook {
    /// Merge the requested changes into an existing record
    pub fn apply_to(self, book: &mut Book) {
        if let Some(title) = self.title {
            book.title = title;
        }
        if let Some(author) = self.author {
            book.author = author;
        }
        if let Some(year) = self.year {
            book.year = year;
        }
        if let Some(isbn) = self.isbn {
            book.isbn = isbn;
        }
        if let Some(description) = self.description {
            book.description = description;
        }
        if let Some(copies) = self.copies_available {
            book.copies_available = copies;
        }
    }
}

/// Book list query parameters
#[derive(Debug, Default, Deserialize, Validate, IntoParams, ToSchema)]
#[into_params(parameter_in = Query)]
pub struct BookQuery {
    #[validate(range(min = 0, message = "skip cannot be negative"))]
    pub skip: Option<i64>,
    #[validate(range(min = 1, max = 1000, message = "limit must be between 1 and 1000"))]
    pub limit: Option<i64>,
}

/// Book list response
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct BookList {
    pub books: Vec<Book>,
    pub total: i64,
}
