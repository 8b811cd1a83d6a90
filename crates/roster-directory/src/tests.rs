//! Unit tests for roster-directory.

use test_case::test_case;

use super::*;

#[test]
fn creates_distinct_accounts() {
    let directory = InMemoryDirectory::new();
    let a = directory
        .create_account("ada@example.edu", "pw", "Ada")
        .unwrap();
    let b = directory
        .create_account("grace@example.edu", "pw", "Grace")
        .unwrap();

    assert_ne!(a, b);
    assert_eq!(directory.account_count(), 2);
}

#[test]
fn duplicate_email_is_rejected() {
    let directory = InMemoryDirectory::new();
    directory
        .create_account("ada@example.edu", "pw", "Ada")
        .unwrap();

    let err = directory
        .create_account("ada@example.edu", "pw2", "Ada Again")
        .unwrap_err();
    assert_eq!(
        err,
        DirectoryError::DuplicateEmail("ada@example.edu".to_string())
    );
    assert_eq!(directory.account_count(), 1);
}

#[test]
fn email_matching_ignores_case_and_surrounding_whitespace() {
    let directory = InMemoryDirectory::new();
    directory
        .create_account("Ada@Example.edu", "pw", "Ada")
        .unwrap();

    let err = directory
        .create_account("  ada@example.edu ", "pw", "Ada")
        .unwrap_err();
    assert!(matches!(err, DirectoryError::DuplicateEmail(_)));

    assert!(directory.account_by_email("ADA@EXAMPLE.EDU").is_some());
}

#[test_case("" ; "empty")]
#[test_case("   " ; "whitespace only")]
#[test_case("no-at-sign" ; "missing at sign")]
fn invalid_emails_are_rejected(email: &str) {
    let directory = InMemoryDirectory::new();
    let err = directory.create_account(email, "pw", "X").unwrap_err();
    assert!(matches!(err, DirectoryError::InvalidEmail(_)));
}
