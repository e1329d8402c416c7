//! Tests for the phone book service.

use std::sync::Arc;

use rstest::rstest;

use super::*;
use crate::domain::ports::{MockAccountSession, MockPhoneRepository};
use crate::domain::{ErrorCode, UserId};

fn row(user_id: &UserId, number: &str, phone_type: PhoneType) -> PhoneNumber {
    NewPhoneNumber::new(Some("+351"), number, phone_type)
        .expect("valid phone")
        .into_row(user_id.clone())
}

fn signed_in(user_id: &UserId) -> MockAccountSession {
    let mut session = MockAccountSession::new();
    let id = user_id.clone();
    session
        .expect_current_user_id()
        .returning(move || Some(id.clone()));
    session
}

fn book(repo: MockPhoneRepository, session: MockAccountSession) -> PhoneBook<MockPhoneRepository, MockAccountSession> {
    PhoneBook::new(Arc::new(repo), Arc::new(session))
}

#[rstest]
#[tokio::test]
async fn list_sorts_primary_first() {
    let user_id = UserId::random();
    let rows = vec![
        row(&user_id, "3", PhoneType::Other),
        row(&user_id, "1", PhoneType::Primary),
        row(&user_id, "2", PhoneType::Secondary),
    ];
    let mut repo = MockPhoneRepository::new();
    repo.expect_list_for_user().return_once(move |_| Ok(rows));

    let phones = book(repo, signed_in(&user_id)).list().await.expect("list");

    let kinds: Vec<_> = phones.iter().map(|p| p.phone_type).collect();
    assert_eq!(kinds, PhoneType::ALL.to_vec());
}

#[rstest]
#[tokio::test]
async fn list_requires_session() {
    let mut session = MockAccountSession::new();
    session.expect_current_user_id().returning(|| None);
    let mut repo = MockPhoneRepository::new();
    repo.expect_list_for_user().times(0);

    let error = book(repo, session).list().await.expect_err("anonymous");

    assert_eq!(error.code(), ErrorCode::NotAuthenticated);
}

#[rstest]
#[tokio::test]
async fn duplicate_type_is_rejected_without_insert() {
    let user_id = UserId::random();
    let rows = vec![row(&user_id, "912 000 000", PhoneType::Primary)];
    let mut repo = MockPhoneRepository::new();
    repo.expect_list_for_user().return_once(move |_| Ok(rows));
    repo.expect_insert().times(0);

    let error = book(repo, signed_in(&user_id))
        .add(Some("+351"), "913 000 000", PhoneType::Primary)
        .await
        .expect_err("duplicate");

    assert_eq!(error.code(), ErrorCode::Conflict);
    assert_eq!(error.message(), "A Primary phone number already exists");
}

#[rstest]
#[tokio::test]
async fn repository_duplicate_maps_to_conflict() {
    let user_id = UserId::random();
    let mut repo = MockPhoneRepository::new();
    repo.expect_list_for_user().return_once(|_| Ok(Vec::new()));
    repo.expect_insert()
        .return_once(|_, _| Err(PhoneRepositoryError::duplicate("unique_user_phone_type")));

    let error = book(repo, signed_in(&user_id))
        .add(None, "555 0100", PhoneType::Secondary)
        .await
        .expect_err("duplicate");

    assert_eq!(error.code(), ErrorCode::Conflict);
    assert_eq!(error.message(), "A Secondary phone number already exists");
}

#[rstest]
#[case::blank("   ")]
#[case::letters("call me")]
#[tokio::test]
async fn invalid_numbers_fail_validation(#[case] number: &str) {
    let user_id = UserId::random();
    let mut repo = MockPhoneRepository::new();
    repo.expect_list_for_user().times(0);

    let error = book(repo, signed_in(&user_id))
        .add(None, number, PhoneType::Other)
        .await
        .expect_err("invalid");

    assert_eq!(error.code(), ErrorCode::Validation);
}

#[rstest]
#[tokio::test]
async fn adding_primary_copies_number_to_profile() {
    let user_id = UserId::random();
    let stored = row(&user_id, "912 345 678", PhoneType::Primary);
    let mut repo = MockPhoneRepository::new();
    repo.expect_list_for_user().return_once(|_| Ok(Vec::new()));
    repo.expect_insert().return_once(move |_, _| Ok(stored));
    let mut session = signed_in(&user_id);
    let expected = ProfileUpdate::default().phone(Some("+351".to_owned()), "912 345 678");
    session
        .expect_update_profile()
        .withf(move |update| *update == expected)
        .times(1)
        .return_once(|_| Ok(()));

    let phone = book(repo, session)
        .add(Some("+351"), "912 345 678", PhoneType::Primary)
        .await
        .expect("added");

    assert_eq!(phone.phone_type, PhoneType::Primary);
}

#[rstest]
#[tokio::test]
async fn adding_secondary_leaves_profile_alone() {
    let user_id = UserId::random();
    let stored = row(&user_id, "555", PhoneType::Secondary);
    let mut repo = MockPhoneRepository::new();
    repo.expect_list_for_user().return_once(|_| Ok(Vec::new()));
    repo.expect_insert().return_once(move |_, _| Ok(stored));
    let mut session = signed_in(&user_id);
    session.expect_update_profile().times(0);

    book(repo, session)
        .add(None, "555", PhoneType::Secondary)
        .await
        .expect("added");
}

#[rstest]
#[tokio::test]
async fn removing_primary_clears_profile_phone() {
    let user_id = UserId::random();
    let primary = row(&user_id, "912", PhoneType::Primary);
    let primary_id = primary.id;
    let mut repo = MockPhoneRepository::new();
    repo.expect_list_for_user().return_once(move |_| Ok(vec![primary]));
    repo.expect_delete()
        .withf(move |id| *id == primary_id)
        .return_once(|_| Ok(()));
    let mut session = signed_in(&user_id);
    session
        .expect_update_profile()
        .withf(|update| *update == ProfileUpdate::default().clear_phone())
        .times(1)
        .return_once(|_| Ok(()));

    book(repo, session).remove(primary_id).await.expect("removed");
}

#[rstest]
#[tokio::test]
async fn removing_unknown_number_is_not_found() {
    let user_id = UserId::random();
    let mut repo = MockPhoneRepository::new();
    repo.expect_list_for_user().return_once(|_| Ok(Vec::new()));
    repo.expect_delete().times(0);

    let error = book(repo, signed_in(&user_id))
        .remove(Uuid::new_v4())
        .await
        .expect_err("missing");

    assert_eq!(error.code(), ErrorCode::NotFound);
}

#[rstest]
#[tokio::test]
async fn available_types_excludes_taken() {
    let user_id = UserId::random();
    let rows = vec![row(&user_id, "1", PhoneType::Secondary)];
    let mut repo = MockPhoneRepository::new();
    repo.expect_list_for_user().return_once(move |_| Ok(rows));

    let types = book(repo, signed_in(&user_id))
        .available_types()
        .await
        .expect("types");

    assert_eq!(types, vec![PhoneType::Primary, PhoneType::Other]);
}

#[rstest]
#[tokio::test]
async fn connection_failures_map_to_network() {
    let user_id = UserId::random();
    let mut repo = MockPhoneRepository::new();
    repo.expect_list_for_user()
        .return_once(|_| Err(PhoneRepositoryError::connection("refused")));

    let error = book(repo, signed_in(&user_id)).list().await.expect_err("offline");

    assert_eq!(error.code(), ErrorCode::Network);
}
