//! Tests for the booking service.

use std::sync::Arc;

use chrono::{NaiveDate, NaiveTime, Utc};
use rstest::{fixture, rstest};

use super::*;
use crate::domain::ports::{MockAccountSession, MockBookingRepository};
use crate::domain::{BookingStatus, ErrorCode};

fn day(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 3, d).expect("date")
}

fn at(h: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(h, 0, 0).expect("time")
}

fn draft_on(date: NaiveDate, hour: u32) -> BookingDraft {
    BookingDraft::new(
        "Braga",
        "Coimbra",
        (date, at(hour)),
        (date, at(hour + 2)),
        "Marta",
        "+351 911 111 111",
    )
}

#[fixture]
fn user_id() -> UserId {
    UserId::random()
}

fn signed_in(user_id: &UserId) -> MockAccountSession {
    let mut session = MockAccountSession::new();
    let id = user_id.clone();
    session
        .expect_current_user_id()
        .returning(move || Some(id.clone()));
    session
}

fn service(
    repo: MockBookingRepository,
    session: MockAccountSession,
) -> BookingService<MockBookingRepository, MockAccountSession> {
    BookingService::new(Arc::new(repo), Arc::new(session))
}

#[rstest]
#[tokio::test]
async fn list_orders_by_latest_departure(user_id: UserId) {
    let rows = vec![
        draft_on(day(1), 9).into_booking(Uuid::new_v4(), user_id.clone(), Utc::now()),
        draft_on(day(5), 8).into_booking(Uuid::new_v4(), user_id.clone(), Utc::now()),
        draft_on(day(5), 14).into_booking(Uuid::new_v4(), user_id.clone(), Utc::now()),
    ];
    let mut repo = MockBookingRepository::new();
    repo.expect_list_for_user().return_once(move |_| Ok(rows));

    let bookings = service(repo, signed_in(&user_id)).list().await.expect("list");

    let order: Vec<_> = bookings
        .iter()
        .map(|b| (b.draft.departure_date, b.draft.departure_time))
        .collect();
    assert_eq!(order, vec![(day(5), at(14)), (day(5), at(8)), (day(1), at(9))]);
}

#[rstest]
#[tokio::test]
async fn anonymous_calls_are_rejected() {
    let mut session = MockAccountSession::new();
    session.expect_current_user_id().returning(|| None);
    let mut repo = MockBookingRepository::new();
    repo.expect_insert().times(0);

    let error = service(repo, session)
        .create(draft_on(day(2), 10))
        .await
        .expect_err("anonymous");

    assert_eq!(error.code(), ErrorCode::NotAuthenticated);
}

#[rstest]
#[case::location("", "Coimbra", "Marta", "Location fields are required")]
#[case::customer("Braga", "Coimbra", " ", "Customer details are required")]
#[tokio::test]
async fn create_validates_required_fields(
    user_id: UserId,
    #[case] from: &str,
    #[case] to: &str,
    #[case] customer: &str,
    #[case] message: &str,
) {
    let mut draft = draft_on(day(2), 10);
    draft.from_location = from.to_owned();
    draft.to_location = to.to_owned();
    draft.customer_name = customer.to_owned();
    let mut repo = MockBookingRepository::new();
    repo.expect_insert().times(0);

    let error = service(repo, signed_in(&user_id))
        .create(draft)
        .await
        .expect_err("invalid");

    assert_eq!(error.code(), ErrorCode::Validation);
    assert_eq!(error.message(), message);
}

#[rstest]
#[tokio::test]
async fn create_stores_for_current_user(user_id: UserId) {
    let owner = user_id.clone();
    let mut repo = MockBookingRepository::new();
    repo.expect_insert()
        .withf(move |id, _| *id == owner)
        .return_once(|id, draft| Ok(draft.clone().into_booking(Uuid::new_v4(), id.clone(), Utc::now())));

    let booking = service(repo, signed_in(&user_id))
        .create(draft_on(day(2), 10))
        .await
        .expect("created");

    assert_eq!(booking.user_id, user_id);
    assert_eq!(booking.draft.booking_status, BookingStatus::Booked);
}

#[rstest]
#[tokio::test]
async fn other_users_booking_is_not_found(user_id: UserId) {
    let foreign = draft_on(day(3), 7).into_booking(Uuid::new_v4(), UserId::random(), Utc::now());
    let id = foreign.id;
    let mut repo = MockBookingRepository::new();
    repo.expect_find_by_id().return_once(move |_| Ok(Some(foreign)));
    repo.expect_delete().times(0);

    let error = service(repo, signed_in(&user_id))
        .delete(id)
        .await
        .expect_err("foreign");

    assert_eq!(error.code(), ErrorCode::NotFound);
}

#[rstest]
#[tokio::test]
async fn update_returns_stored_row(user_id: UserId) {
    let original = draft_on(day(3), 7).into_booking(Uuid::new_v4(), user_id.clone(), Utc::now());
    let id = original.id;
    let mut changed = original.clone();
    changed.draft.booking_status = BookingStatus::Completed;
    let mut repo = MockBookingRepository::new();
    let mut reads = vec![changed.clone(), original];
    repo.expect_find_by_id()
        .times(2)
        .returning(move |_| Ok(reads.pop()));
    repo.expect_update().times(1).return_once(|_, _| Ok(()));

    let updated = service(repo, signed_in(&user_id))
        .update(id, changed.draft.clone())
        .await
        .expect("updated");

    assert_eq!(updated.draft.booking_status, BookingStatus::Completed);
}

#[rstest]
#[tokio::test]
async fn missing_booking_is_not_found(user_id: UserId) {
    let mut repo = MockBookingRepository::new();
    repo.expect_find_by_id().return_once(|_| Ok(None));

    let error = service(repo, signed_in(&user_id))
        .get(Uuid::new_v4())
        .await
        .expect_err("missing");

    assert_eq!(error.code(), ErrorCode::NotFound);
}

#[rstest]
#[tokio::test]
async fn query_failures_map_to_internal(user_id: UserId) {
    let mut repo = MockBookingRepository::new();
    repo.expect_list_for_user()
        .return_once(|_| Err(BookingRepositoryError::query("syntax error")));

    let error = service(repo, signed_in(&user_id)).list().await.expect_err("failed");

    assert_eq!(error.code(), ErrorCode::Internal);
}
