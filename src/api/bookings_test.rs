use serde_json::json;
use time::macros::datetime;

use super::*;
use crate::support::{FakeBackend, body_of, json, not_found, path_of, signed_in, user_json};

fn booking(start: &str, end: &str, status: BookingStatus) -> Booking {
    Booking {
        id: 1,
        space_id: Some(3),
        space_name: None,
        start: start.into(),
        end: end.into(),
        status,
        total_price: None,
        comment: None,
        user_id: None,
    }
}

fn space(price: f64) -> Space {
    serde_json::from_value(json!({ "id": 3, "price_per_hour": price })).unwrap()
}

#[test]
fn status_round_trips_unknown_values() {
    assert_eq!("approved".parse::<BookingStatus>().unwrap(), BookingStatus::Approved);
    let odd: BookingStatus = serde_json::from_value(json!("on_hold")).unwrap();
    assert_eq!(odd, BookingStatus::Other("on_hold".into()));
    assert_eq!(serde_json::to_value(&odd).unwrap(), json!("on_hold"));
    assert_eq!(BookingStatus::Cancelled.to_string(), "cancelled");
}

#[test]
fn booking_accepts_every_field_spelling() {
    let camel: Booking = serde_json::from_value(json!({
        "id": 5, "spaceName": "Loft", "startDate": "2026-03-01T09:30:00Z",
        "endDate": "2026-03-01T11:00:00Z", "status": "approved", "totalPrice": "45.00"
    }))
    .unwrap();
    assert_eq!(camel.space_name.as_deref(), Some("Loft"));
    assert_eq!(camel.date(), "2026-03-01");
    assert_eq!(camel.start_clock(), Some("09:30"));
    assert_eq!(camel.total_price, Some(45.0));

    let admin: Booking = serde_json::from_value(json!({
        "id": 6, "start_time": "2026-03-02T14:00:00", "end_time": "2026-03-02T15:00:00", "user_id": 9
    }))
    .unwrap();
    assert_eq!(admin.status, BookingStatus::Pending);
    assert_eq!(admin.start_clock(), Some("14:00"));
    assert_eq!(admin.user_id, Some(9));
}

#[test]
fn empty_filter_matches_everything() {
    let filter = BookingFilter::default();
    assert!(filter.matches(&booking("", "", BookingStatus::Rejected)));
}

#[test]
fn filter_requires_every_set_criterion() {
    let filter = BookingFilter {
        status: Some(BookingStatus::Approved),
        date: Some("2026-03-01".into()),
        from_time: Some("09:00".into()),
        to_time: Some("12:00".into()),
    };
    assert!(filter.matches(&booking("2026-03-01T09:00:00Z", "", BookingStatus::Approved)));
    assert!(filter.matches(&booking("2026-03-01T12:00:00Z", "", BookingStatus::Approved)));
    assert!(!filter.matches(&booking("2026-03-01T12:01:00Z", "", BookingStatus::Approved)));
    assert!(!filter.matches(&booking("2026-03-02T10:00:00Z", "", BookingStatus::Approved)));
    assert!(!filter.matches(&booking("2026-03-01T10:00:00Z", "", BookingStatus::Pending)));
}

#[test]
fn filter_by_status_alone() {
    let filter = BookingFilter { status: Some(BookingStatus::Pending), ..BookingFilter::default() };
    let kept = filter.apply(vec![
        booking("2026-03-01T10:00:00Z", "", BookingStatus::Pending),
        booking("2026-03-01T10:00:00Z", "", BookingStatus::Cancelled),
    ]);
    assert_eq!(kept.len(), 1);
}

#[test]
fn overlap_ignores_touching_and_inactive_bookings() {
    let existing = vec![
        booking("2026-03-01T10:00:00Z", "2026-03-01T12:00:00Z", BookingStatus::Approved),
        booking("2026-03-01T14:00:00Z", "2026-03-01T16:00:00Z", BookingStatus::Cancelled),
    ];
    assert!(find_conflict(&existing, datetime!(2026-03-01 11:00 UTC), datetime!(2026-03-01 13:00 UTC)).is_some());
    assert!(find_conflict(&existing, datetime!(2026-03-01 09:00 UTC), datetime!(2026-03-01 13:00 UTC)).is_some());
    assert!(find_conflict(&existing, datetime!(2026-03-01 12:00 UTC), datetime!(2026-03-01 13:00 UTC)).is_none());
    assert!(find_conflict(&existing, datetime!(2026-03-01 14:30 UTC), datetime!(2026-03-01 15:00 UTC)).is_none());
}

#[test]
fn overlap_reads_offsetless_timestamps_as_utc() {
    let existing = vec![booking("2026-03-01T10:00:00", "2026-03-01T12:00:00", BookingStatus::Approved)];
    let hit = find_conflict(&existing, datetime!(2026-03-01 10:30 UTC), datetime!(2026-03-01 11:30 UTC));
    assert_eq!(hit.map(|b| b.id), Some(1));
    assert!(find_conflict(&existing, datetime!(2026-03-01 12:00 UTC), datetime!(2026-03-01 13:00 UTC)).is_none());
}

#[test]
fn timestamps_parse_with_or_without_offset() {
    let naive = booking("2026-03-01T10:00:00.250", "2026-03-01T12:00", BookingStatus::Pending);
    assert_eq!(naive.ends_at(), Some(datetime!(2026-03-01 12:00 UTC)));
    assert_eq!(naive.starts_at().map(OffsetDateTime::millisecond), Some(250));

    let offset = booking("2026-03-01T12:00:00+02:00", "", BookingStatus::Pending);
    assert_eq!(offset.starts_at(), Some(datetime!(2026-03-01 10:00 UTC)));
    assert_eq!(offset.ends_at(), None);
}

#[test]
fn quote_bills_at_least_one_hour() {
    let room = space(20.0);
    let start = datetime!(2026-03-01 10:00 UTC);
    assert!((quote(&room, start, datetime!(2026-03-01 10:15 UTC)) - 20.0).abs() < f64::EPSILON);
    assert!((quote(&room, start, datetime!(2026-03-01 12:30 UTC)) - 50.0).abs() < f64::EPSILON);
}

#[tokio::test]
async fn create_booking_rejects_inverted_range_without_sending() {
    let backend = FakeBackend::new(|r| match path_of(r) {
        "/auth/verify" => json(200, user_json(1, "user")),
        _ => json(201, json!({ "id": 1 })),
    });
    let session = signed_in(&backend).await;

    let at = datetime!(2026-03-01 10:00 UTC);
    let err = create_booking(&session, &NewBooking::new(3, at, at)).await.unwrap_err();
    assert!(matches!(err, ApiError::InvalidRange));
    assert_eq!(backend.hits("/bookings"), 0);
}

#[tokio::test]
async fn create_booking_posts_rfc3339_dates() {
    let backend = FakeBackend::new(|r| match path_of(r) {
        "/auth/verify" => json(200, user_json(1, "user")),
        "/bookings" => {
            let mut created = body_of(r);
            created["id"] = json!(77);
            created["status"] = json!("pending");
            json(201, created)
        }
        _ => not_found(),
    });
    let session = signed_in(&backend).await;

    let mut request = NewBooking::new(3, datetime!(2026-03-01 10:00 UTC), datetime!(2026-03-01 12:00 UTC));
    request.total_price = Some(40.0);
    let created = create_booking(&session, &request).await.unwrap();

    assert_eq!(created.id, 77);
    assert_eq!(created.start, "2026-03-01T10:00:00Z");
    assert_eq!(created.space_id, Some(3));
    let sent = backend.requests().into_iter().find(|r| path_of(r) == "/bookings").unwrap();
    assert_eq!(body_of(&sent)["total_price"], json!(40.0));
    assert!(body_of(&sent).get("comment").is_none());
}

#[tokio::test]
async fn space_bookings_passes_space_id_as_query() {
    let backend = FakeBackend::new(|r| match path_of(r) {
        "/auth/verify" => json(200, user_json(1, "user")),
        "/bookings" => json(200, json!([{ "id": 1, "start_date": "2026-03-01T10:00:00Z", "end_date": "2026-03-01T11:00:00Z" }])),
        _ => not_found(),
    });
    let session = signed_in(&backend).await;

    let bookings = space_bookings(&session, 4).await.unwrap();
    assert_eq!(bookings.len(), 1);
    let sent = backend.requests().into_iter().find(|r| path_of(r) == "/bookings").unwrap();
    assert!(sent.url.ends_with("/bookings?space_id=4"));
}

#[tokio::test]
async fn my_bookings_and_cancel() {
    let backend = FakeBackend::new(|r| match (r.method.as_str(), path_of(r)) {
        (_, "/auth/verify") => json(200, user_json(1, "user")),
        ("GET", "/bookings/my-bookings") => json(200, json!([{ "id": 8, "startDate": "2026-03-01T10:00:00Z" }])),
        ("DELETE", "/bookings/8") => json(200, json!({ "message": "cancelled" })),
        ("DELETE", _) => json(400, json!({ "message": "cannot cancel" })),
        _ => not_found(),
    });
    let session = signed_in(&backend).await;

    let mine = my_bookings(&session).await.unwrap();
    assert_eq!(mine[0].id, 8);
    cancel_booking(&session, 8).await.unwrap();
    let err = cancel_booking(&session, 9).await.unwrap_err();
    assert_eq!(err.to_string(), "cannot cancel (HTTP 400)");
}

#[tokio::test]
async fn admin_operations_require_the_admin_role() {
    let backend = FakeBackend::new(|r| match path_of(r) {
        "/auth/verify" => json(200, user_json(1, "user")),
        _ => json(200, json!([])),
    });
    let session = signed_in(&backend).await;

    assert!(matches!(all_bookings(&session).await, Err(ApiError::Forbidden)));
    assert!(matches!(
        set_booking_status(&session, 1, &BookingStatus::Approved).await,
        Err(ApiError::Forbidden)
    ));
    assert_eq!(backend.hits("/bookings/all"), 0);
    assert_eq!(backend.hits("/bookings/1/status"), 0);
}

#[tokio::test]
async fn admin_lists_and_approves() {
    let backend = FakeBackend::new(|r| match (r.method.as_str(), path_of(r)) {
        (_, "/auth/verify") => json(200, user_json(1, "admin")),
        ("GET", "/bookings/all") => json(200, json!([{ "id": 1, "status": "pending" }, { "id": 2, "status": "approved" }])),
        ("PUT", "/bookings/1/status") => json(200, json!({ "id": 1, "status": body_of(r)["status"] })),
        _ => not_found(),
    });
    let session = signed_in(&backend).await;

    let all = all_bookings(&session).await.unwrap();
    assert_eq!(all.len(), 2);
    set_booking_status(&session, 1, &BookingStatus::Approved).await.unwrap();

    let sent = backend.requests().into_iter().find(|r| path_of(r) == "/bookings/1/status").unwrap();
    assert_eq!(body_of(&sent), json!({ "status": "approved" }));
}
