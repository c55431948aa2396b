//! PostgreSQLアダプターのテスト
//!
//! 実行にはデータベースが必要:
//! `DATABASE_URL=postgres://... cargo test --test postgres_repository_test -- --ignored`

use chrono::{Duration, SubsecRound, Utc};
use rusty_library_api::adapters::postgres;
use rusty_library_api::application::ServiceDependencies;
use rusty_library_api::application::catalog::{CatalogError, books, members, reservations};
use rusty_library_api::application::loan::{
    LoanErrorKind, borrow_book, list_overdue, mark_overdue, return_loan,
};
use rusty_library_api::domain::book::BookFilter;
use rusty_library_api::domain::commands::{BorrowBook, ReturnBook};
use rusty_library_api::domain::loan::{LoanPolicy, LoanStatus, open_loan};
use rusty_library_api::ports::{LoanFilter, LoanUpdate, RepositoryError};
use serial_test::serial;

mod common;

use common::{cleanup_database, create_test_pool, seed_book, seed_member};

async fn setup() -> ServiceDependencies {
    let pool = create_test_pool().await;
    cleanup_database(&pool).await;
    postgres::service_dependencies(pool, LoanPolicy::default())
}

#[tokio::test]
#[serial]
#[ignore]
async fn test_borrow_and_return_persist_atomically() {
    let deps = setup().await;
    // TIMESTAMPTZはマイクロ秒精度
    let now = Utc::now().trunc_subsecs(0);
    let member = seed_member(&deps, now).await;
    let book = seed_book(&deps, "Les Misérables").await;

    let loan = borrow_book(
        &deps,
        BorrowBook {
            member_id: member.member_id,
            book_id: book.book_id,
            borrowed_at: now,
        },
    )
    .await
    .unwrap();

    let stored = deps.loans.find_by_id(loan.loan_id).await.unwrap().unwrap();
    assert_eq!(stored.status, LoanStatus::Active);
    assert_eq!(stored.due_date, loan.due_date);
    assert!(!books::get_book(&deps, book.book_id).await.unwrap().available);

    return_loan(
        &deps,
        ReturnBook {
            loan_id: loan.loan_id,
            returned_at: now,
        },
    )
    .await
    .unwrap();

    let stored = deps.loans.find_by_id(loan.loan_id).await.unwrap().unwrap();
    assert_eq!(stored.status, LoanStatus::Returned);
    assert!(stored.returned_at.is_some());
    assert!(books::get_book(&deps, book.book_id).await.unwrap().available);
}

#[tokio::test]
#[serial]
#[ignore]
async fn test_second_unreturned_loan_violates_unique_index() {
    let deps = setup().await;
    let now = Utc::now();
    let first = seed_member(&deps, now).await;
    let second = seed_member(&deps, now).await;
    let book = seed_book(&deps, "Germinal").await;
    let policy = LoanPolicy::default();

    deps.loans
        .create_loan_and_update_book(
            &open_loan(first.member_id, book.book_id, now, &policy),
            false,
        )
        .await
        .unwrap();

    // アプリケーション層の確認をすり抜けた2件目
    let err = deps
        .loans
        .create_loan_and_update_book(
            &open_loan(second.member_id, book.book_id, now, &policy),
            false,
        )
        .await
        .unwrap_err();

    assert!(matches!(err, RepositoryError::UniqueViolation(_)));
    assert_eq!(
        deps.loans
            .count(&LoanFilter::default().for_book(book.book_id))
            .await
            .unwrap(),
        1
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
#[serial]
#[ignore]
async fn test_concurrent_borrows_yield_exactly_one_loan() {
    let deps = setup().await;
    let now = Utc::now();
    let book = seed_book(&deps, "Notre-Dame de Paris").await;
    let mut members = Vec::new();
    for _ in 0..6 {
        members.push(seed_member(&deps, now).await);
    }

    let handles: Vec<_> = members
        .into_iter()
        .map(|member| {
            let deps = deps.clone();
            let book_id = book.book_id;
            tokio::spawn(async move {
                borrow_book(
                    &deps,
                    BorrowBook {
                        member_id: member.member_id,
                        book_id,
                        borrowed_at: now,
                    },
                )
                .await
            })
        })
        .collect();

    let mut successes = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => successes += 1,
            Err(e) => assert!(matches!(
                e.kind(),
                LoanErrorKind::Unavailable | LoanErrorKind::Conflict
            )),
        }
    }
    assert_eq!(successes, 1);
}

#[tokio::test]
#[serial]
#[ignore]
async fn test_update_returned_loan_is_conflict() {
    let deps = setup().await;
    let now = Utc::now();
    let member = seed_member(&deps, now).await;
    let book = seed_book(&deps, "Nana").await;
    let loan = open_loan(member.member_id, book.book_id, now, &LoanPolicy::default());
    deps.loans
        .create_loan_and_update_book(&loan, false)
        .await
        .unwrap();

    deps.loans
        .update_loan_and_book(loan.loan_id, LoanUpdate::returned(now), book.book_id, true)
        .await
        .unwrap();
    let err = deps
        .loans
        .update_loan_and_book(loan.loan_id, LoanUpdate::returned(now), book.book_id, true)
        .await
        .unwrap_err();
    assert!(matches!(err, RepositoryError::Conflict));

    let err = deps
        .loans
        .update_loan_and_book(
            rusty_library_api::domain::LoanId::new(),
            LoanUpdate::returned(now),
            book.book_id,
            true,
        )
        .await
        .unwrap_err();
    assert!(matches!(err, RepositoryError::NotFound));
}

#[tokio::test]
#[serial]
#[ignore]
async fn test_overdue_sweep_and_listing() {
    let deps = setup().await;
    let now = Utc::now();
    let member = seed_member(&deps, now).await;
    let late = seed_book(&deps, "Le Rouge et le Noir").await;
    let current = seed_book(&deps, "Lucien Leuwen").await;

    // 延滞中の会員は新たに借りられないため、延滞する貸出を最後に作る
    for (book_id, at) in [
        (current.book_id, now),
        (late.book_id, now - Duration::days(20)),
    ] {
        borrow_book(
            &deps,
            BorrowBook {
                member_id: member.member_id,
                book_id,
                borrowed_at: at,
            },
        )
        .await
        .unwrap();
    }

    let overdue = list_overdue(&deps, now).await.unwrap();
    assert_eq!(overdue.len(), 1);
    assert_eq!(overdue[0].book_id, late.book_id);
    assert_eq!(overdue[0].status, LoanStatus::Active);

    assert_eq!(mark_overdue(&deps, now).await.unwrap(), 1);
    assert_eq!(mark_overdue(&deps, now).await.unwrap(), 0);
}

#[tokio::test]
#[serial]
#[ignore]
async fn test_book_filters_and_search() {
    let deps = setup().await;
    let now = Utc::now();
    let member = seed_member(&deps, now).await;
    let lent = seed_book(&deps, "Le Rouge et le Noir").await;
    seed_book(&deps, "100% Stendhal").await;

    borrow_book(
        &deps,
        BorrowBook {
            member_id: member.member_id,
            book_id: lent.book_id,
            borrowed_at: now,
        },
    )
    .await
    .unwrap();

    let available = books::list_books(
        &deps,
        &BookFilter {
            available: Some(true),
            author: Some("hugo".to_string()),
            ..BookFilter::default()
        },
    )
    .await
    .unwrap();
    assert_eq!(available.len(), 1);
    assert_eq!(available[0].title, "100% Stendhal");

    // ワイルドカード文字はリテラルとして扱う
    let found = books::search_books(&deps, "100%").await.unwrap();
    assert_eq!(found.len(), 1);
    let found = books::search_books(&deps, "%").await.unwrap();
    assert_eq!(found.len(), 1);
}

#[tokio::test]
#[serial]
#[ignore]
async fn test_delete_rules() {
    let deps = setup().await;
    let now = Utc::now();
    let member = seed_member(&deps, now).await;
    let book = seed_book(&deps, "Salammbô").await;
    let reserver = seed_member(&deps, now).await;

    reservations::reserve_book(&deps, reserver.member_id, book.book_id, now)
        .await
        .unwrap();
    members::delete_member(&deps, reserver.member_id).await.unwrap();
    assert!(
        reservations::list_reservations(&deps, None)
            .await
            .unwrap()
            .is_empty()
    );

    borrow_book(
        &deps,
        BorrowBook {
            member_id: member.member_id,
            book_id: book.book_id,
            borrowed_at: now,
        },
    )
    .await
    .unwrap();

    assert!(matches!(
        members::delete_member(&deps, member.member_id).await.unwrap_err(),
        CatalogError::MemberHasLoans
    ));
    assert!(matches!(
        books::remove_book(&deps, book.book_id).await.unwrap_err(),
        CatalogError::BookHasLoans
    ));
}
