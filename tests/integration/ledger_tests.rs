//! Borrowing ledger tests against a real Postgres database.
//!
//! Each test gets a fresh database with migrations applied.
//! Run with: DATABASE_URL=postgres://... cargo test --test ledger_tests -- --ignored

use library_server::{
    config::AuthConfig,
    error::AppError,
    models::{
        book::{Book, CreateBook, UpdateBook},
        borrowing::{BorrowingQuery, BorrowingRequest},
        reader::{CreateReader, Reader},
    },
    repository::Repository,
    services::Services,
};
use sqlx::PgPool;

fn services(pool: PgPool) -> Services {
    Services::new(Repository::new(pool), AuthConfig::default())
}

async fn book(services: &Services, isbn: &str, copies: i32) -> Book {
    services
        .catalog
        .create_book(CreateBook {
            title: format!("Book {}", isbn),
            author: "Author".into(),
            year: 2024,
            isbn: isbn.into(),
            description: None,
            copies_available: copies,
        })
        .await
        .expect("Failed to create book")
}

async fn reader(services: &Services, email: &str) -> Reader {
    services
        .membership
        .create_reader(CreateReader {
            name: "Ivan".into(),
            email: email.into(),
        })
        .await
        .expect("Failed to create reader")
}

fn request(book: &Book, reader: &Reader) -> BorrowingRequest {
    BorrowingRequest {
        book_id: book.id,
        reader_id: reader.id,
    }
}

async fn copies(services: &Services, book: &Book) -> i32 {
    services.catalog.get_book(book.id).await.unwrap().copies_available
}

#[sqlx::test(migrations = "./migrations")]
#[ignore]
async fn checkout_then_return_restores_counter(pool: PgPool) {
    let services = services(pool);
    let b = book(&services, "978-3-16-148410-0", 3).await;
    let r = reader(&services, "ivan@mail.ru").await;

    let entry = services.borrowing.checkout(request(&b, &r)).await.unwrap();
    assert!(entry.return_date.is_none());
    assert_eq!(copies(&services, &b).await, 2);

    let closed = services.borrowing.return_book(request(&b, &r)).await.unwrap();
    assert_eq!(closed.id, entry.id);
    assert!(closed.return_date.is_some());
    assert_eq!(copies(&services, &b).await, 3);

    // The closed entry does not block a new checkout of the same pair
    let again = services.borrowing.checkout(request(&b, &r)).await.unwrap();
    assert_ne!(again.id, entry.id);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore]
async fn missing_book_or_reader_is_not_found(pool: PgPool) {
    let services = services(pool);
    let b = book(&services, "978-3-16-148410-0", 1).await;
    let r = reader(&services, "ivan@mail.ru").await;

    let err = services
        .borrowing
        .checkout(BorrowingRequest {
            book_id: 9999,
            reader_id: r.id,
        })
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));

    let err = services
        .borrowing
        .checkout(BorrowingRequest {
            book_id: b.id,
            reader_id: 9999,
        })
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
    assert_eq!(copies(&services, &b).await, 1);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore]
async fn no_copies_leaves_counter_untouched(pool: PgPool) {
    let services = services(pool);
    let b = book(&services, "978-3-16-148410-1", 0).await;
    let r = reader(&services, "grisha@mail.ru").await;

    let err = services.borrowing.checkout(request(&b, &r)).await.unwrap_err();
    assert!(matches!(err, AppError::Conflict(ref msg) if msg.contains("no available copies")));
    assert_eq!(copies(&services, &b).await, 0);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore]
async fn fourth_concurrent_loan_is_refused(pool: PgPool) {
    let services = services(pool);
    let r = reader(&services, "artem@mail.ru").await;

    for i in 0..4 {
        let b = book(&services, &format!("978-3-16-14841-{}", i), 5).await;
        let result = services.borrowing.checkout(request(&b, &r)).await;
        if i < 3 {
            assert!(result.is_ok(), "loan {} should succeed", i);
        } else {
            assert!(matches!(
                result,
                Err(AppError::Conflict(ref msg)) if msg.contains("Borrowing limit")
            ));
            assert_eq!(copies(&services, &b).await, 5);
        }
    }

    let active = services.borrowing.reader_active(r.id).await.unwrap();
    assert_eq!(active.len(), 3);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore]
async fn same_pair_cannot_hold_two_active_loans(pool: PgPool) {
    let services = services(pool);
    let b = book(&services, "978-3-16-148410-0", 5).await;
    let r = reader(&services, "ivan@mail.ru").await;

    services.borrowing.checkout(request(&b, &r)).await.unwrap();
    let err = services.borrowing.checkout(request(&b, &r)).await.unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));
    assert_eq!(copies(&services, &b).await, 4);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore]
async fn return_without_active_loan_is_conflict(pool: PgPool) {
    let services = services(pool);
    let b = book(&services, "978-3-16-148410-0", 2).await;
    let r = reader(&services, "ivan@mail.ru").await;

    let err = services.borrowing.return_book(request(&b, &r)).await.unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));

    services.borrowing.checkout(request(&b, &r)).await.unwrap();
    services.borrowing.return_book(request(&b, &r)).await.unwrap();
    let err = services.borrowing.return_book(request(&b, &r)).await.unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));
    assert_eq!(copies(&services, &b).await, 2);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore]
async fn racing_checkouts_of_last_copy_have_one_winner(pool: PgPool) {
    let services = services(pool);
    let b = book(&services, "978-3-16-148410-0", 1).await;
    let first = reader(&services, "first@mail.ru").await;
    let second = reader(&services, "second@mail.ru").await;

    let (a, z) = tokio::join!(
        services.borrowing.checkout(request(&b, &first)),
        services.borrowing.checkout(request(&b, &second)),
    );

    assert_eq!([a.is_ok(), z.is_ok()].iter().filter(|ok| **ok).count(), 1);
    let loser = if a.is_err() { a } else { z };
    assert!(matches!(loser, Err(AppError::Conflict(_))));
    assert_eq!(copies(&services, &b).await, 0);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore]
async fn racing_checkouts_by_one_reader_respect_the_limit(pool: PgPool) {
    let services = services(pool);
    let r = reader(&services, "ivan@mail.ru").await;
    for i in 0..2 {
        let b = book(&services, &format!("978-3-16-14841-{}", i), 1).await;
        services.borrowing.checkout(request(&b, &r)).await.unwrap();
    }
    let b3 = book(&services, "978-3-16-14841-3", 1).await;
    let b4 = book(&services, "978-3-16-14841-4", 1).await;

    let (a, z) = tokio::join!(
        services.borrowing.checkout(request(&b3, &r)),
        services.borrowing.checkout(request(&b4, &r)),
    );

    assert_eq!([a.is_ok(), z.is_ok()].iter().filter(|ok| **ok).count(), 1);
    let loser = if a.is_err() { a } else { z };
    assert!(matches!(
        loser,
        Err(AppError::Conflict(ref msg)) if msg.contains("Borrowing limit")
    ));
    assert_eq!(services.borrowing.reader_active(r.id).await.unwrap().len(), 3);
    assert_eq!(copies(&services, &b3).await + copies(&services, &b4).await, 1);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore]
async fn listing_is_enriched_and_filtered(pool: PgPool) {
    let services = services(pool);
    let b1 = book(&services, "978-3-16-148410-0", 2).await;
    let b2 = book(&services, "978-3-16-148410-1", 2).await;
    let r = reader(&services, "ivan@mail.ru").await;

    services.borrowing.checkout(request(&b1, &r)).await.unwrap();
    let second = services.borrowing.checkout(request(&b2, &r)).await.unwrap();
    services.borrowing.return_book(request(&b1, &r)).await.unwrap();

    let all = services.borrowing.list(&BorrowingQuery::default()).await.unwrap();
    assert_eq!(all.total, 2);
    // Most recent first
    assert_eq!(all.borrowings[0].id, second.id);
    assert_eq!(all.borrowings[0].reader.email, "ivan@mail.ru");

    let active = services
        .borrowing
        .list(&BorrowingQuery {
            active_only: Some(true),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(active.total, 1);
    assert_eq!(active.borrowings[0].book.id, b2.id);

    let page = services
        .borrowing
        .list(&BorrowingQuery {
            skip: Some(1),
            limit: Some(1),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(page.total, 2);
    assert_eq!(page.borrowings.len(), 1);

    let detail = services.borrowing.get(second.id).await.unwrap();
    assert_eq!(detail.book.isbn, "978-3-16-148410-1");
    assert!(matches!(services.borrowing.get(9999).await, Err(AppError::NotFound(_))));
    assert!(matches!(services.borrowing.reader_active(9999).await, Err(AppError::NotFound(_))));
}

#[sqlx::test(migrations = "./migrations")]
#[ignore]
async fn counter_is_protected_while_copies_circulate(pool: PgPool) {
    let services = services(pool);
    let b = book(&services, "978-3-16-148410-0", 2).await;
    let r = reader(&services, "ivan@mail.ru").await;
    services.borrowing.checkout(request(&b, &r)).await.unwrap();

    let err = services
        .catalog
        .update_book(b.id, UpdateBook {
            copies_available: Some(10),
            ..Default::default()
        })
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));

    // Other fields remain editable
    let renamed = services
        .catalog
        .update_book(b.id, UpdateBook {
            title: Some("Renamed".into()),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(renamed.title, "Renamed");
    assert_eq!(renamed.copies_available, 1);

    assert!(matches!(services.catalog.delete_book(b.id).await, Err(AppError::Conflict(_))));
    assert!(matches!(services.membership.delete_reader(r.id).await, Err(AppError::Conflict(_))));

    services.borrowing.return_book(request(&b, &r)).await.unwrap();
    services.membership.delete_reader(r.id).await.unwrap();
    services.catalog.delete_book(b.id).await.unwrap();
}

#[sqlx::test(migrations = "./migrations")]
#[ignore]
async fn stores_enforce_unique_isbn_and_email(pool: PgPool) {
    let services = services(pool);
    let b = book(&services, "978-3-16-148410-0", 1).await;
    let r = reader(&services, "ivan@mail.ru").await;

    let found = services.catalog.find_by_isbn("978-3-16-148410-0").await.unwrap();
    assert_eq!(found.map(|f| f.id), Some(b.id));
    let found = services.membership.find_by_email("ivan@mail.ru").await.unwrap();
    assert_eq!(found.map(|f| f.id), Some(r.id));

    let dup = services
        .catalog
        .create_book(CreateBook {
            title: "Other".into(),
            author: "Author".into(),
            year: 2000,
            isbn: "978-3-16-148410-0".into(),
            description: None,
            copies_available: 1,
        })
        .await;
    assert!(matches!(dup, Err(AppError::Conflict(_))));

    let dup = services
        .membership
        .create_reader(CreateReader {
            name: "Other".into(),
            email: "ivan@mail.ru".into(),
        })
        .await;
    assert!(matches!(dup, Err(AppError::Conflict(_))));
}
