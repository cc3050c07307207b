//! Reader (library member) model and related types

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use validator::Validate;

/// Reader record from database
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Reader {
    pub id: i32,
    pub name: String,
    pub email: String,
}

/// Create reader request
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateReader {
    #[validate(length(min = 1, max = 255, message = "Name must be 1-255 characters"))]
    pub name: String,
    #[validate(email(message = "Invalid email format"))]
    pub email: String,
}

/// Update reader request
#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateReader {
    #[validate(length(min = 1, max = 255, message = "Name must be 1-255 characters"))]
    pub name: Option<String>,
    #[validate(email(message = "Invalid email format"))]
    pub email: Option<String>,
}

impl UpdateReader {
    pub fn apply_to(self, reader: &mut Reader) {
        if let Some(name) = self.name {
            reader.name = name;
        }
        if let Some(email) = self.email {
            reader.email = email;
        }
    }
}

/// Reader list response
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ReaderList {
    pub readers: Vec<Reader>,
    pub total: i64,
}
