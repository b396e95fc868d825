mod common;

use chrono::Duration;
use common::{add_book, add_member, all_fixtures, date};
use library_catalog::application::catalog::{self, ErrorKind};
use library_catalog::domain::commands::*;
use library_catalog::domain::loan::Loan;
use library_catalog::domain::value_objects::*;

// ============================================================================
// 貸出と返却
// ============================================================================

#[tokio::test]
async fn test_dune_scenario() {
    for fx in all_fixtures(date(2024, 3, 1)).await {
        let deps = &fx.deps;
        let dune = add_book(deps, "Dune", "9780441172719", 2).await;
        let alice = add_member(deps, "Alice", "alice@example.com").await;
        let bob = add_member(deps, "Bob", "bob@example.com").await;
        let carol = add_member(deps, "Carol", "carol@example.com").await;

        // A: 2 -> 1
        let loan_a = catalog::issue_loan(
            deps,
            IssueLoan {
                book_id: dune.book_id,
                member_id: alice.member_id,
            },
        )
        .await
        .unwrap();
        assert_eq!(loan_a.issue_date, date(2024, 3, 1), "{}", fx.name);
        assert_eq!(loan_a.due_date, date(2024, 3, 15), "{}", fx.name);
        let book = catalog::get_book(deps, dune.book_id).await.unwrap();
        assert_eq!(book.available(), 1, "{}", fx.name);

        // B: 1 -> 0
        catalog::issue_loan(
            deps,
            IssueLoan {
                book_id: dune.book_id,
                member_id: bob.member_id,
            },
        )
        .await
        .unwrap();
        let book = catalog::get_book(deps, dune.book_id).await.unwrap();
        assert_eq!(book.available(), 0, "{}", fx.name);

        // C: 在庫切れ
        let err = catalog::issue_loan(
            deps,
            IssueLoan {
                book_id: dune.book_id,
                member_id: carol.member_id,
            },
        )
        .await
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Unavailable, "{}", fx.name);
        let book = catalog::get_book(deps, dune.book_id).await.unwrap();
        assert_eq!(book.available(), 0, "{}", fx.name);
        assert_eq!(catalog::list_active_loans(deps).await.unwrap().len(), 2);

        // A返却: 0 -> 1
        let returned = catalog::return_loan(
            deps,
            ReturnLoan {
                loan_id: loan_a.loan_id,
            },
        )
        .await
        .unwrap();
        assert_eq!(returned.return_date, date(2024, 3, 1), "{}", fx.name);
        let book = catalog::get_book(deps, dune.book_id).await.unwrap();
        assert_eq!(book.available(), 1, "{}", fx.name);
        assert_eq!(book.quantity.value(), 2, "{}", fx.name);
    }
}

#[tokio::test]
async fn test_loan_limit() {
    for fx in all_fixtures(date(2024, 3, 1)).await {
        let deps = &fx.deps;
        let member = add_member(deps, "Alice", "alice@example.com").await;

        let mut books = Vec::new();
        for i in 0..6 {
            books.push(add_book(deps, &format!("Book {i}"), &format!("isbn-{i}"), 1).await);
        }

        // 4冊目までは貸出可能、5冊目もまだ上限未満
        for book in &books[..5] {
            catalog::issue_loan(
                deps,
                IssueLoan {
                    book_id: book.book_id,
                    member_id: member.member_id,
                },
            )
            .await
            .unwrap();
        }

        let err = catalog::issue_loan(
            deps,
            IssueLoan {
                book_id: books[5].book_id,
                member_id: member.member_id,
            },
        )
        .await
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::LimitExceeded, "{}", fx.name);

        // 拒否された貸出は在庫を変えない
        let book = catalog::get_book(deps, books[5].book_id).await.unwrap();
        assert_eq!(book.available(), 1, "{}", fx.name);

        // 1冊返却すれば再び借りられる
        let active = catalog::list_active_loans(deps).await.unwrap();
        assert_eq!(active.len(), 5, "{}", fx.name);
        catalog::return_loan(
            deps,
            ReturnLoan {
                loan_id: active[0].loan_id,
            },
        )
        .await
        .unwrap();

        catalog::issue_loan(
            deps,
            IssueLoan {
                book_id: books[5].book_id,
                member_id: member.member_id,
            },
        )
        .await
        .unwrap();
    }
}

#[tokio::test]
async fn test_return_twice_is_rejected() {
    for fx in all_fixtures(date(2024, 3, 1)).await {
        let deps = &fx.deps;
        let book = add_book(deps, "Dune", "9780441172719", 3).await;
        let member = add_member(deps, "Alice", "alice@example.com").await;

        let loan = catalog::issue_loan(
            deps,
            IssueLoan {
                book_id: book.book_id,
                member_id: member.member_id,
            },
        )
        .await
        .unwrap();

        fx.clock.advance_days(3);
        catalog::return_loan(deps, ReturnLoan { loan_id: loan.loan_id })
            .await
            .unwrap();

        fx.clock.advance_days(1);
        let err = catalog::return_loan(deps, ReturnLoan { loan_id: loan.loan_id })
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::AlreadyReturned, "{}", fx.name);

        // 在庫は1回だけ戻る、返却日も最初の返却のまま
        let book = catalog::get_book(deps, book.book_id).await.unwrap();
        assert_eq!(book.available(), 3, "{}", fx.name);
        match catalog::get_loan(deps, loan.loan_id).await.unwrap() {
            Loan::Returned(returned) => assert_eq!(returned.return_date, date(2024, 3, 4)),
            other => panic!("{}: expected returned loan, got {other:?}", fx.name),
        }
    }
}

#[tokio::test]
async fn test_issue_precondition_errors() {
    for fx in all_fixtures(date(2024, 3, 1)).await {
        let deps = &fx.deps;
        let book = add_book(deps, "Dune", "9780441172719", 1).await;
        let member = add_member(deps, "Alice", "alice@example.com").await;

        // 存在しない書籍は貸出不可として扱う
        let err = catalog::issue_loan(
            deps,
            IssueLoan {
                book_id: BookId::new(),
                member_id: member.member_id,
            },
        )
        .await
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Unavailable, "{}", fx.name);

        let err = catalog::issue_loan(
            deps,
            IssueLoan {
                book_id: book.book_id,
                member_id: MemberId::new(),
            },
        )
        .await
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound, "{}", fx.name);

        let err = catalog::return_loan(deps, ReturnLoan { loan_id: LoanId::new() })
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound, "{}", fx.name);

        // どの失敗も状態を変えない
        let book = catalog::get_book(deps, book.book_id).await.unwrap();
        assert_eq!(book.available(), 1, "{}", fx.name);
        assert!(catalog::loan_history(deps).await.unwrap().is_empty());
    }
}

// ============================================================================
// 延滞検出
// ============================================================================

#[tokio::test]
async fn test_overdue_loans() {
    for fx in all_fixtures(date(2024, 3, 1)).await {
        let deps = &fx.deps;
        let member = add_member(deps, "Alice", "alice@example.com").await;
        let early = add_book(deps, "Early", "isbn-early", 1).await;
        let late = add_book(deps, "Late", "isbn-late", 1).await;
        let returned = add_book(deps, "Returned", "isbn-returned", 1).await;
        let edge = add_book(deps, "Edge", "isbn-edge", 1).await;

        // 貸出日: 3/5 (due 3/19), 3/1 (due 3/15), 3/1 返却済み, 3/10 (due 3/24)
        fx.clock.set(date(2024, 3, 5));
        let late_loan = catalog::issue_loan(
            deps,
            IssueLoan {
                book_id: late.book_id,
                member_id: member.member_id,
            },
        )
        .await
        .unwrap();

        fx.clock.set(date(2024, 3, 1));
        let early_loan = catalog::issue_loan(
            deps,
            IssueLoan {
                book_id: early.book_id,
                member_id: member.member_id,
            },
        )
        .await
        .unwrap();
        let closed = catalog::issue_loan(
            deps,
            IssueLoan {
                book_id: returned.book_id,
                member_id: member.member_id,
            },
        )
        .await
        .unwrap();
        catalog::return_loan(deps, ReturnLoan { loan_id: closed.loan_id })
            .await
            .unwrap();

        fx.clock.set(date(2024, 3, 10));
        let edge_loan = catalog::issue_loan(
            deps,
            IssueLoan {
                book_id: edge.book_id,
                member_id: member.member_id,
            },
        )
        .await
        .unwrap();

        // 返却期限当日は延滞ではない
        let as_of = edge_loan.due_date;
        let overdue = catalog::overdue_loans(deps, as_of).await.unwrap();

        let ids: Vec<LoanId> = overdue.iter().map(|o| o.loan.loan_id).collect();
        assert_eq!(ids, vec![early_loan.loan_id, late_loan.loan_id], "{}", fx.name);
        assert_eq!(overdue[0].days_overdue, 9, "{}", fx.name);
        assert_eq!(overdue[1].days_overdue, 5, "{}", fx.name);
        for entry in &overdue {
            assert_eq!(entry.days_overdue, (as_of - entry.loan.due_date).num_days());
        }

        // 期限前は何もない
        assert!(
            catalog::overdue_loans(deps, date(2024, 3, 15))
                .await
                .unwrap()
                .is_empty(),
            "{}",
            fx.name
        );

        // 今日基準の検出は時計に従う
        fx.clock.set(early_loan.due_date + Duration::days(1));
        let today = catalog::overdue_loans_today(deps).await.unwrap();
        assert_eq!(today.len(), 1, "{}", fx.name);
        assert_eq!(today[0].days_overdue, 1, "{}", fx.name);
    }
}

#[tokio::test]
async fn test_overdue_loan_can_be_returned() {
    for fx in all_fixtures(date(2024, 3, 1)).await {
        let deps = &fx.deps;
        let book = add_book(deps, "Dune", "9780441172719", 1).await;
        let member = add_member(deps, "Alice", "alice@example.com").await;
        let loan = catalog::issue_loan(
            deps,
            IssueLoan {
                book_id: book.book_id,
                member_id: member.member_id,
            },
        )
        .await
        .unwrap();

        fx.clock.advance_days(30);
        let returned = catalog::return_loan(deps, ReturnLoan { loan_id: loan.loan_id })
            .await
            .unwrap();
        assert!(returned.return_date > returned.due_date, "{}", fx.name);
        assert!(
            catalog::overdue_loans_today(deps).await.unwrap().is_empty(),
            "{}",
            fx.name
        );
    }
}

// ============================================================================
// 登録と削除
// ============================================================================

#[tokio::test]
async fn test_duplicate_keys_are_rejected() {
    for fx in all_fixtures(date(2024, 3, 1)).await {
        let deps = &fx.deps;
        let original = add_member(deps, "Alice", "alice@example.com").await;

        let err = catalog::add_member(
            deps,
            AddMember {
                name: "Impostor".into(),
                email: "alice@example.com".into(),
                phone: Some("555-0100".into()),
            },
        )
        .await
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DuplicateKey, "{}", fx.name);

        let members = catalog::list_members(deps).await.unwrap();
        assert_eq!(members, vec![original], "{}", fx.name);

        add_book(deps, "Dune", "9780441172719", 1).await;
        let err = catalog::add_book(
            deps,
            AddBook {
                title: "Dune (reprint)".into(),
                author: "Frank Herbert".into(),
                isbn: "9780441172719".into(),
                quantity: 4,
            },
        )
        .await
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DuplicateKey, "{}", fx.name);
        assert_eq!(catalog::list_books(deps).await.unwrap().len(), 1);
    }
}

#[tokio::test]
async fn test_invalid_input_is_rejected() {
    for fx in all_fixtures(date(2024, 3, 1)).await {
        let deps = &fx.deps;

        for (title, isbn, quantity) in [("", "isbn-1", 1), ("Dune", "  ", 1), ("Dune", "isbn-1", 0)]
        {
            let err = catalog::add_book(
                deps,
                AddBook {
                    title: title.into(),
                    author: "Frank Herbert".into(),
                    isbn: isbn.into(),
                    quantity,
                },
            )
            .await
            .unwrap_err();
            assert_eq!(err.kind(), ErrorKind::InvalidInput, "{}", fx.name);
        }

        let err = catalog::add_member(
            deps,
            AddMember {
                name: "Alice".into(),
                email: String::new(),
                phone: None,
            },
        )
        .await
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput, "{}", fx.name);

        assert!(catalog::list_books(deps).await.unwrap().is_empty());
        assert!(catalog::list_members(deps).await.unwrap().is_empty());
    }
}

#[tokio::test]
async fn test_member_registration_uses_clock() {
    for fx in all_fixtures(date(2024, 2, 29)).await {
        let member = catalog::add_member(
            &fx.deps,
            AddMember {
                name: "  Alice  ".into(),
                email: "alice@example.com".into(),
                phone: Some("   ".into()),
            },
        )
        .await
        .unwrap();

        assert_eq!(member.membership_date, date(2024, 2, 29), "{}", fx.name);
        assert_eq!(member.name, "Alice", "{}", fx.name);
        assert_eq!(member.phone, None, "{}", fx.name);

        let stored = catalog::get_member(&fx.deps, member.member_id).await.unwrap();
        assert_eq!(stored, member, "{}", fx.name);
    }
}

#[tokio::test]
async fn test_delete_with_active_loan_conflicts() {
    for fx in all_fixtures(date(2024, 3, 1)).await {
        let deps = &fx.deps;
        let book = add_book(deps, "Dune", "9780441172719", 1).await;
        let member = add_member(deps, "Alice", "alice@example.com").await;
        let loan = catalog::issue_loan(
            deps,
            IssueLoan {
                book_id: book.book_id,
                member_id: member.member_id,
            },
        )
        .await
        .unwrap();

        let err = catalog::delete_book(deps, book.book_id).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Conflict, "{}", fx.name);
        let err = catalog::delete_member(deps, member.member_id)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Conflict, "{}", fx.name);

        // 返却後は削除でき、返却済みの貸出も一緒に消える
        catalog::return_loan(deps, ReturnLoan { loan_id: loan.loan_id })
            .await
            .unwrap();
        catalog::delete_book(deps, book.book_id).await.unwrap();
        catalog::delete_member(deps, member.member_id).await.unwrap();

        let err = catalog::get_book(deps, book.book_id).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound, "{}", fx.name);
        let err = catalog::get_loan(deps, loan.loan_id).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound, "{}", fx.name);
        assert!(catalog::loan_history(deps).await.unwrap().is_empty());

        let err = catalog::delete_book(deps, book.book_id).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound, "{}", fx.name);
    }
}

// ============================================================================
// 一覧
// ============================================================================

#[tokio::test]
async fn test_listing_order_and_availability() {
    for fx in all_fixtures(date(2024, 3, 1)).await {
        let deps = &fx.deps;
        let zebra = add_book(deps, "Zebra", "isbn-z", 1).await;
        let apple = add_book(deps, "Apple", "isbn-a", 2).await;
        let mango = add_book(deps, "Mango", "isbn-m", 1).await;
        let member = add_member(deps, "Alice", "alice@example.com").await;

        catalog::issue_loan(
            deps,
            IssueLoan {
                book_id: zebra.book_id,
                member_id: member.member_id,
            },
        )
        .await
        .unwrap();

        // 作成順（タイトル順ではない）
        let titles: Vec<String> = catalog::list_books(deps)
            .await
            .unwrap()
            .into_iter()
            .map(|b| b.title)
            .collect();
        assert_eq!(titles, vec!["Zebra", "Apple", "Mango"], "{}", fx.name);

        let available: Vec<BookId> = catalog::list_available_books(deps)
            .await
            .unwrap()
            .into_iter()
            .map(|b| b.book_id)
            .collect();
        assert_eq!(available, vec![apple.book_id, mango.book_id], "{}", fx.name);
    }
}

#[tokio::test]
async fn test_loan_records_and_history() {
    for fx in all_fixtures(date(2024, 3, 1)).await {
        let deps = &fx.deps;
        let dune = add_book(deps, "Dune", "isbn-dune", 2).await;
        let emma = add_book(deps, "Emma", "isbn-emma", 1).await;
        let alice = add_member(deps, "Alice", "alice@example.com").await;
        let bob = add_member(deps, "Bob", "bob@example.com").await;

        let first = catalog::issue_loan(
            deps,
            IssueLoan {
                book_id: dune.book_id,
                member_id: alice.member_id,
            },
        )
        .await
        .unwrap();

        fx.clock.advance_days(2);
        let second = catalog::issue_loan(
            deps,
            IssueLoan {
                book_id: emma.book_id,
                member_id: bob.member_id,
            },
        )
        .await
        .unwrap();
        let third = catalog::issue_loan(
            deps,
            IssueLoan {
                book_id: dune.book_id,
                member_id: bob.member_id,
            },
        )
        .await
        .unwrap();
        catalog::return_loan(deps, ReturnLoan { loan_id: first.loan_id })
            .await
            .unwrap();

        let active = catalog::list_active_loan_records(deps).await.unwrap();
        let active: Vec<(LoanId, &str, &str)> = active
            .iter()
            .map(|r| (r.loan.loan_id(), r.book_title.as_str(), r.member_name.as_str()))
            .collect();
        assert_eq!(
            active,
            vec![
                (second.loan_id, "Emma", "Bob"),
                (third.loan_id, "Dune", "Bob"),
            ],
            "{}",
            fx.name
        );

        // 貸出日の新しい順、同日は後から作成したものが先
        let history = catalog::loan_history(deps).await.unwrap();
        let ids: Vec<LoanId> = history.iter().map(|r| r.loan.loan_id()).collect();
        assert_eq!(
            ids,
            vec![third.loan_id, second.loan_id, first.loan_id],
            "{}",
            fx.name
        );
        assert!(!history[2].loan.is_active(), "{}", fx.name);
        assert_eq!(history[2].member_name, "Alice", "{}", fx.name);
    }
}

#[tokio::test]
async fn test_available_never_exceeds_quantity() {
    for fx in all_fixtures(date(2024, 3, 1)).await {
        let deps = &fx.deps;
        let book = add_book(deps, "Dune", "9780441172719", 3).await;
        let mut members = Vec::new();
        for i in 0..4 {
            members.push(add_member(deps, &format!("M{i}"), &format!("m{i}@example.com")).await);
        }

        let mut loans = Vec::new();
        for (step, member) in members.iter().enumerate() {
            let result = catalog::issue_loan(
                deps,
                IssueLoan {
                    book_id: book.book_id,
                    member_id: member.member_id,
                },
            )
            .await;
            if step < 3 {
                loans.push(result.unwrap());
            } else {
                assert_eq!(result.unwrap_err().kind(), ErrorKind::Unavailable);
            }

            let current = catalog::get_book(deps, book.book_id).await.unwrap();
            assert!(current.available() <= current.quantity.value(), "{}", fx.name);
        }

        for loan in &loans {
            catalog::return_loan(deps, ReturnLoan { loan_id: loan.loan_id })
                .await
                .unwrap();
            let current = catalog::get_book(deps, book.book_id).await.unwrap();
            assert!(current.available() <= current.quantity.value(), "{}", fx.name);
        }

        let current = catalog::get_book(deps, book.book_id).await.unwrap();
        assert_eq!(current.available(), 3, "{}", fx.name);
        assert_eq!(current.on_loan(), 0, "{}", fx.name);
    }
}
