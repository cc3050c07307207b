//! Borrowing ledger endpoints

use axum::extract::State;

use crate::{
    error::AppResult,
    models::borrowing::{
        ActiveBorrowing, BorrowedBook, BorrowingDetail, BorrowingList, BorrowingQuery,
        BorrowingRequest,
    },
    AppState,
};

use super::{
    extract::{Json, Path, Query},
    AuthenticatedUser,
};

/// Check out a book to a reader
#[utoipa::path(
    post,
    path = "/borrowing/borrow",
    tag = "borrowing",
    security(("bearer_auth" = [])),
    request_body = BorrowingRequest,
    responses(
        (status = 200, description = "Book checked out", body = BorrowedBook),
        (status = 400, description = "No available copies, borrowing limit reached or already borrowed", body = crate::error::ErrorResponse),
        (status = 401, description = "Not authenticated", body = crate::error::ErrorResponse),
        (status = 404, description = "Book or reader not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn borrow_book(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Json(request): Json<BorrowingRequest>,
) -> AppResult<Json<BorrowedBook>> {
    tracing::debug!(
        operator = user.id,
        book_id = request.book_id,
        reader_id = request.reader_id,
        "Checkout requested"
    );
    let entry = state.services.borrowing.checkout(request).await?;
    Ok(Json(entry))
}

/// Return a borrowed book
#[utoipa::path(
    post,
    path = "/borrowing/return",
    tag = "borrowing",
    security(("bearer_auth" = [])),
    request_body = BorrowingRequest,
    responses(
        (status = 200, description = "Book returned", body = BorrowedBook),
        (status = 400, description = "Not borrowed by this reader or already returned", body = crate::error::ErrorResponse),
        (status = 401, description = "Not authenticated", body = crate::error::ErrorResponse)
    )
)]
pub async fn return_book(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Json(request): Json<BorrowingRequest>,
) -> AppResult<Json<BorrowedBook>> {
    tracing::debug!(
        operator = user.id,
        book_id = request.book_id,
        reader_id = request.reader_id,
        "Return requested"
    );
    let entry = state.services.borrowing.return_book(request).await?;
    Ok(Json(entry))
}

/// List borrowing records, most recent first
#[utoipa::path(
    get,
    path = "/borrowing/",
    tag = "borrowing",
    security(("bearer_auth" = [])),
    params(BorrowingQuery),
    responses(
        (status = 200, description = "Paginated borrowing records", body = BorrowingList),
        (status = 400, description = "Invalid pagination", body = crate::error::ErrorResponse),
        (status = 401, description = "Not authenticated", body = crate::error::ErrorResponse)
    )
)]
pub async fn list_borrowings(
    State(state): State<AppState>,
    AuthenticatedUser(_user): AuthenticatedUser,
    Query(query): Query<BorrowingQuery>,
) -> AppResult<Json<BorrowingList>> {
    let list = state.services.borrowing.list(&query).await?;
    Ok(Json(list))
}

/// Active borrowings of a reader
#[utoipa::path(
    get,
    path = "/borrowing/reader/{reader_id}",
    tag = "borrowing",
    security(("bearer_auth" = [])),
    params(
        ("reader_id" = i32, Path, description = "Reader ID")
    ),
    responses(
        (status = 200, description = "Reader's active borrowings", body = Vec<ActiveBorrowing>),
        (status = 404, description = "Reader not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn reader_borrowings(
    State(state): State<AppState>,
    AuthenticatedUser(_user): AuthenticatedUser,
    Path(reader_id): Path<i32>,
) -> AppResult<Json<Vec<ActiveBorrowing>>> {
    let loans = state.services.borrowing.reader_active(reader_id).await?;
    Ok(Json(loans))
}

/// Get a borrowing record by ID
#[utoipa::path(
    get,
    path = "/borrowing/{borrowing_id}",
    tag = "borrowing",
    security(("bearer_auth" = [])),
    params(
        ("borrowing_id" = i32, Path, description = "Borrowing record ID")
    ),
    responses(
        (status = 200, description = "Borrowing record", body = BorrowingDetail),
        (status = 404, description = "Borrowing record not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn get_borrowing(
    State(state): State<AppState>,
    AuthenticatedUser(_user): AuthenticatedUser,
    Path(borrowing_id): Path<i32>,
) -> AppResult<Json<BorrowingDetail>> {
    let detail = state.services.borrowing.get(borrowing_id).await?;
    Ok(Json(detail))
}
