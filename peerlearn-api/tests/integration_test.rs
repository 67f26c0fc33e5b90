/// Integration tests for the PeerLearn API
///
/// The first group drives the router over a pool that never connects and
/// covers what is decided before an account is looked up: missing or bad
/// tokens, request validation, health and response headers.
///
/// The second group needs PostgreSQL (`DATABASE_URL`) and is ignored by
/// default:
///
/// ```bash
/// DATABASE_URL=postgres://localhost/peerlearn_test cargo test -- --ignored
/// ```

mod common;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use chrono::{DateTime, Duration, Utc};
use common::{access_token, lazy_app, send, TestContext};
use futures::StreamExt;
use peerlearn_shared::models::notification::{CreateNotification, Notification, NotificationKind};
use peerlearn_shared::models::reminder::{CreateReminder, Reminder};
use peerlearn_shared::models::role::{AppRole, UserRole};
use peerlearn_shared::models::setting::{PlatformSetting, SettingKey};
use peerlearn_shared::realtime::{RealtimeHub, RealtimePayload};
use peerlearn_shared::reminders::dispatch_due_reminders;
use peerlearn_shared::wallet::split_commission;
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;

fn timestamp(value: &Value) -> DateTime<Utc> {
    serde_json::from_value(value.clone()).expect("RFC 3339 timestamp")
}

#[tokio::test]
async fn test_protected_route_requires_token() {
    let app = lazy_app();

    let (status, body) = send(&app, "GET", "/v1/notifications", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "unauthorized");
}

#[tokio::test]
async fn test_invalid_token_rejected() {
    let app = lazy_app();

    let (status, _) = send(&app, "GET", "/v1/todos", Some("not.a.jwt"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(
        &app,
        "GET",
        "/v1/realtime/stream?access_token=garbage",
        None,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

/// A valid token is not enough on its own: the account is looked up too
#[tokio::test]
async fn test_valid_token_without_reachable_account_fails_closed() {
    let app = lazy_app();
    let token = access_token(Uuid::new_v4(), vec![AppRole::Admin]);

    let (status, _) = send(&app, "GET", "/v1/admin/analytics", Some(&token), None).await;
    assert!(status.is_server_error(), "got {}", status);
}

#[tokio::test]
async fn test_register_validates_before_touching_database() {
    let app = lazy_app();

    let (status, body) = send(
        &app,
        "POST",
        "/v1/auth/register",
        None,
        Some(json!({
            "email": "not-an-email",
            "password": "short",
            "full_name": "A"
        })),
    )
    .await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"], "validation_error");
    assert!(body["details"].as_array().is_some_and(|d| !d.is_empty()));
}

#[tokio::test]
async fn test_health_reports_unavailable_database() {
    let app = lazy_app();

    let (status, body) = send(&app, "GET", "/health", None, None).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["database"], "disconnected");
}

#[tokio::test]
async fn test_security_headers_applied() {
    let app = lazy_app();

    let response = app
        .oneshot(
            Request::builder()
                .uri("/v1/notifications")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(
        response.headers().get("x-content-type-options").unwrap(),
        "nosniff"
    );
    assert_eq!(response.headers().get("x-frame-options").unwrap(), "DENY");
}

/// Role guards: students are kept out of teacher and admin routes
#[tokio::test]
#[ignore]
async fn test_role_guards_reject_students() {
    let mut ctx = TestContext::new().await.unwrap();
    let student = ctx.user(&[AppRole::Student], 0).await.unwrap();

    let (status, body) = ctx.send("GET", "/v1/admin/analytics", &student, None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "forbidden");

    let (status, _) = ctx
        .send(
            "PUT",
            "/v1/settings/commission_percent",
            &student,
            Some(json!({ "value": 5 })),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = ctx
        .send(
            "POST",
            "/v1/universities",
            &student,
            Some(json!({ "name": "Test University" })),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = ctx.send("GET", "/v1/wallet", &student, None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = ctx
        .send(
            "POST",
            "/v1/subjects",
            &student,
            Some(json!({ "title": "Linear Algebra" })),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    ctx.cleanup().await.unwrap();
}

/// Admin routes check `user_roles`, not the roles baked into the token
#[tokio::test]
#[ignore]
async fn test_admin_claim_without_current_role_rejected() {
    let mut ctx = TestContext::new().await.unwrap();
    let mut former_admin = ctx.user(&[AppRole::Admin], 0).await.unwrap();

    let (status, _) = ctx.send("GET", "/v1/admin/analytics", &former_admin, None).await;
    assert_eq!(status, StatusCode::OK);

    UserRole::revoke(&ctx.db, former_admin.id, AppRole::Admin)
        .await
        .unwrap();
    former_admin.token = access_token(former_admin.id, vec![AppRole::Admin]);

    let (status, _) = ctx.send("GET", "/v1/admin/analytics", &former_admin, None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    ctx.cleanup().await.unwrap();
}

/// Deactivation cuts off tokens that were issued before it
#[tokio::test]
#[ignore]
async fn test_deactivated_account_loses_access_immediately() {
    let mut ctx = TestContext::new().await.unwrap();
    let admin = ctx.user(&[AppRole::Admin], 0).await.unwrap();
    let student = ctx.user(&[AppRole::Student], 0).await.unwrap();

    let (status, _) = ctx.send("GET", "/v1/profiles/me", &student, None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = ctx
        .send(
            "PUT",
            &format!("/v1/admin/profiles/{}/active", student.id),
            &admin,
            Some(json!({ "is_active": false })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = ctx.send("GET", "/v1/profiles/me", &student, None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = ctx
        .send(
            "POST",
            "/v1/notes",
            &student,
            Some(json!({ "title": "Still here?", "content": "" })),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    ctx.cleanup().await.unwrap();
}

#[tokio::test]
#[ignore]
async fn test_realtime_stream_accepts_query_token() {
    let mut ctx = TestContext::new().await.unwrap();
    let student = ctx.user(&[AppRole::Student], 0).await.unwrap();

    let response = ctx
        .app
        .clone()
        .oneshot(
            Request::builder()
                .uri(format!("/v1/realtime/stream?access_token={}", student.token))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(response
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.starts_with("text/event-stream")));

    ctx.cleanup().await.unwrap();
}

#[tokio::test]
#[ignore]
async fn test_storage_rejects_bad_paths_and_oversized_uploads() {
    let mut ctx = TestContext::new().await.unwrap();
    let user = ctx.user(&[AppRole::Student], 0).await.unwrap();

    let (status, _) = ctx
        .upload("/v1/storage/avatars/me.png", &user, "image/png", vec![0u8; 4096])
        .await;
    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);

    let (status, _) = ctx
        .upload("/v1/storage/avatars/a/../b.png", &user, "image/png", vec![0u8; 16])
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = ctx
        .upload("/v1/storage/secrets/b.png", &user, "image/png", vec![0u8; 16])
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    ctx.cleanup().await.unwrap();
}

/// Only the owner (or an admin) can overwrite, and the owner never changes
#[tokio::test]
#[ignore]
async fn test_storage_overwrite_keeps_owner() {
    let mut ctx = TestContext::new().await.unwrap();
    let owner = ctx.user(&[AppRole::Student], 0).await.unwrap();
    let other = ctx.user(&[AppRole::Student], 0).await.unwrap();
    let admin = ctx.user(&[AppRole::Admin], 0).await.unwrap();
    let uri = format!("/v1/storage/avatars/{}/me.png", Uuid::new_v4());

    let (status, object) = ctx.upload(&uri, &owner, "image/png", vec![1u8; 32]).await;
    assert_eq!(status, StatusCode::CREATED, "{}", object);
    assert_eq!(object["owner_id"], owner.id.to_string());

    let (status, _) = ctx.upload(&uri, &other, "image/png", vec![2u8; 32]).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, object) = ctx.upload(&uri, &owner, "image/png", vec![3u8; 8]).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(object["size_bytes"], 8);

    let (status, object) = ctx.upload(&uri, &admin, "image/jpeg", vec![4u8; 4]).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(object["owner_id"], owner.id.to_string());
    assert_eq!(object["content_type"], "image/jpeg");

    ctx.cleanup().await.unwrap();
}

/// A student answering every question correctly scores 100 and passes
#[tokio::test]
#[ignore]
async fn test_quiz_all_correct_scores_100() {
    let mut ctx = TestContext::new().await.unwrap();
    let teacher = ctx.user(&[AppRole::Teacher], 0).await.unwrap();
    let student = ctx.user(&[AppRole::Student], 0).await.unwrap();
    let subject_id = ctx.approved_subject(&teacher).await.unwrap();

    let (status, quiz) = ctx
        .send(
            "POST",
            &format!("/v1/subjects/{}/quizzes", subject_id),
            &teacher,
            Some(json!({ "title": "Derivatives", "passing_score": 60 })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{}", quiz);
    let quiz_id = quiz["id"].as_str().unwrap().to_string();

    let mut answers = Vec::new();
    for (prompt, correct) in [("d/dx x^2", 0usize), ("d/dx sin x", 1)] {
        let (status, question) = ctx
            .send(
                "POST",
                &format!("/v1/quizzes/{}/questions", quiz_id),
                &teacher,
                Some(json!({
                    "prompt": prompt,
                    "options": [
                        { "label": "first", "is_correct": correct == 0 },
                        { "label": "second", "is_correct": correct == 1 },
                        { "label": "third" }
                    ]
                })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{}", question);

        answers.push(json!({
            "question_id": question["id"],
            "option_ids": [question["options"][correct]["id"]],
        }));
    }

    let (status, _) = ctx
        .send(
            "POST",
            &format!("/v1/quizzes/{}/publish", quiz_id),
            &teacher,
            Some(json!({})),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, student_view) = ctx
        .send("GET", &format!("/v1/quizzes/{}", quiz_id), &student, None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(student_view["questions"][0]["options"][0]
        .get("is_correct")
        .is_none());

    let (status, result) = ctx
        .send(
            "POST",
            &format!("/v1/quizzes/{}/attempts", quiz_id),
            &student,
            Some(json!({ "answers": answers, "time_taken_seconds": 42 })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{}", result);
    assert_eq!(result["attempt"]["score"], 100);
    assert_eq!(result["attempt"]["passed"], true);
    assert_eq!(result["first_pass"], true);

    ctx.cleanup().await.unwrap();
}

/// Schedules a session two days out and returns its ID
async fn schedule_session(
    ctx: &TestContext,
    teacher: &common::TestUser,
    subject_id: Uuid,
    max_students: i32,
) -> String {
    let (status, session) = ctx
        .send(
            "POST",
            "/v1/sessions",
            teacher,
            Some(json!({
                "subject_id": subject_id,
                "title": "Exam prep",
                "scheduled_at": (Utc::now() + Duration::days(2)).to_rfc3339(),
                "duration_minutes": 60,
                "max_students": max_students
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{}", session);
    session["id"].as_str().unwrap().to_string()
}

/// Enrolling twice in the same session is a conflict
#[tokio::test]
#[ignore]
async fn test_double_enrollment_conflicts() {
    let mut ctx = TestContext::new().await.unwrap();
    let teacher = ctx.user(&[AppRole::Teacher], 0).await.unwrap();
    let student = ctx.user(&[AppRole::Student], 0).await.unwrap();
    let subject_id = ctx.approved_subject(&teacher).await.unwrap();

    let session_id = schedule_session(&ctx, &teacher, subject_id, 10).await;
    let enroll_uri = format!("/v1/sessions/{}/enroll", session_id);

    let (status, body) = ctx.send("POST", &enroll_uri, &student, None).await;
    assert_eq!(status, StatusCode::CREATED, "{}", body);

    let (status, body) = ctx.send("POST", &enroll_uri, &student, None).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "conflict");

    ctx.cleanup().await.unwrap();
}

/// Moving a session moves the pending reminders of its students with it
#[tokio::test]
#[ignore]
async fn test_rescheduling_moves_pending_reminders() {
    let mut ctx = TestContext::new().await.unwrap();
    let teacher = ctx.user(&[AppRole::Teacher], 0).await.unwrap();
    let student = ctx.user(&[AppRole::Student], 0).await.unwrap();
    let subject_id = ctx.approved_subject(&teacher).await.unwrap();

    let session_id = schedule_session(&ctx, &teacher, subject_id, 10).await;
    let (status, _) = ctx
        .send("POST", &format!("/v1/sessions/{}/enroll", session_id), &student, None)
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, updated) = ctx
        .send(
            "PATCH",
            &format!("/v1/sessions/{}", session_id),
            &teacher,
            Some(json!({ "scheduled_at": (Utc::now() + Duration::hours(3)).to_rfc3339() })),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{}", updated);
    let scheduled_at = timestamp(&updated["scheduled_at"]);

    let lead = PlatformSetting::get_i64(&ctx.db, SettingKey::ReminderLeadMinutes)
        .await
        .unwrap();
    let session_uuid: Uuid = session_id.parse().unwrap();
    let reminders = Reminder::list_unsent_for_session(&ctx.db, session_uuid)
        .await
        .unwrap();
    assert_eq!(reminders.len(), 1);

    let reminder = &reminders[0];
    assert!(reminder.remind_at <= scheduled_at);
    let expected = scheduled_at - Duration::minutes(lead);
    if expected > Utc::now() {
        assert_eq!(reminder.remind_at, expected);
    }
    assert_eq!(
        reminder.body.as_deref(),
        Some(format!("Starts at {}", scheduled_at.format("%Y-%m-%d %H:%M UTC")).as_str())
    );

    ctx.cleanup().await.unwrap();
}

/// Capacity cannot be cut below the students already enrolled
#[tokio::test]
#[ignore]
async fn test_capacity_cannot_drop_below_enrollment() {
    let mut ctx = TestContext::new().await.unwrap();
    let teacher = ctx.user(&[AppRole::Teacher], 0).await.unwrap();
    let subject_id = ctx.approved_subject(&teacher).await.unwrap();
    let session_id = schedule_session(&ctx, &teacher, subject_id, 3).await;

    for _ in 0..2 {
        let student = ctx.user(&[AppRole::Student], 0).await.unwrap();
        let (status, _) = ctx
            .send("POST", &format!("/v1/sessions/{}/enroll", session_id), &student, None)
            .await;
        assert_eq!(status, StatusCode::CREATED);
    }

    let uri = format!("/v1/sessions/{}", session_id);
    let (status, body) = ctx
        .send("PATCH", &uri, &teacher, Some(json!({ "max_students": 1 })))
        .await;
    assert_eq!(status, StatusCode::CONFLICT, "{}", body);

    let (status, body) = ctx
        .send("PATCH", &uri, &teacher, Some(json!({ "max_students": 2 })))
        .await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["max_students"], 2);

    ctx.cleanup().await.unwrap();
}

/// After mark-all-read the unread count is zero
#[tokio::test]
#[ignore]
async fn test_mark_all_read_clears_unread_count() {
    let mut ctx = TestContext::new().await.unwrap();
    let user = ctx.user(&[AppRole::Student], 0).await.unwrap();

    for i in 0..3 {
        Notification::insert(
            &ctx.db,
            CreateNotification::new(user.id, NotificationKind::Message, format!("Hello {}", i)),
        )
        .await
        .unwrap();
    }

    let (status, body) = ctx
        .send("GET", "/v1/notifications/unread-count", &user, None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["unread"], 3);

    let (status, body) = ctx
        .send("POST", "/v1/notifications/read-all", &user, None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["marked"], 3);

    let (_, body) = ctx
        .send("GET", "/v1/notifications/unread-count", &user, None)
        .await;
    assert_eq!(body["unread"], 0);

    ctx.cleanup().await.unwrap();
}

/// A teacher cannot withdraw more than they have earned
#[tokio::test]
#[ignore]
async fn test_overdraft_withdrawal_rejected() {
    let mut ctx = TestContext::new().await.unwrap();
    let teacher = ctx.user(&[AppRole::Teacher], 0).await.unwrap();

    let (status, body) = ctx
        .send(
            "POST",
            "/v1/wallet/withdrawals",
            &teacher,
            Some(json!({
                "amount": 150,
                "method": "bank_transfer",
                "account_details": "IBAN DE89 3704 0044 0532 0130 00"
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT, "{}", body);

    let (status, body) = ctx.send("GET", "/v1/wallet", &teacher, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["available"], 0);

    ctx.cleanup().await.unwrap();
}

/// Paying for a subject: balance check, commission split and renewal
#[tokio::test]
#[ignore]
async fn test_subscription_payment_and_renewal() {
    let mut ctx = TestContext::new().await.unwrap();
    let teacher = ctx.user(&[AppRole::Teacher], 0).await.unwrap();
    let poor = ctx.user(&[AppRole::Student], 10).await.unwrap();
    let student = ctx.user(&[AppRole::Student], 200).await.unwrap();
    let subject_id = ctx.approved_subject(&teacher).await.unwrap();

    let (status, body) = ctx
        .send(
            "PUT",
            &format!("/v1/subjects/{}/price", subject_id),
            &teacher,
            Some(json!({ "price_points": 50, "duration_days": 30 })),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{}", body);

    let subscribe_uri = format!("/v1/subjects/{}/subscribe", subject_id);

    let (status, body) = ctx.send("POST", &subscribe_uri, &poor, None).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "insufficient_points");
    let (_, body) = ctx.send("GET", "/v1/profiles/me/points", &poor, None).await;
    assert_eq!(body["points"], 10);

    let (status, first) = ctx.send("POST", &subscribe_uri, &student, None).await;
    assert_eq!(status, StatusCode::CREATED, "{}", first);
    assert_eq!(first["points_paid"], 50);
    assert_eq!(first["remaining_points"], 150);

    let percent = PlatformSetting::get_i64(&ctx.db, SettingKey::CommissionPercent)
        .await
        .unwrap();
    let (commission, net) = split_commission(50, percent);

    let (status, earnings) = ctx.send("GET", "/v1/wallet/earnings", &teacher, None).await;
    assert_eq!(status, StatusCode::OK);
    let earnings = earnings.as_array().unwrap();
    assert_eq!(earnings.len(), 1);
    assert_eq!(earnings[0]["gross_amount"], 50);
    assert_eq!(earnings[0]["commission_amount"], commission);
    assert_eq!(earnings[0]["net_amount"], net);

    let (status, second) = ctx.send("POST", &subscribe_uri, &student, None).await;
    assert_eq!(status, StatusCode::CREATED, "{}", second);
    assert_eq!(second["remaining_points"], 100);
    assert_eq!(
        timestamp(&second["subscription"]["expires_at"]),
        timestamp(&first["subscription"]["expires_at"]) + Duration::days(30)
    );

    ctx.cleanup().await.unwrap();
}

/// One reminder pass writes notifications, marks reminders sent and
/// publishes to connected clients
#[tokio::test]
#[ignore]
async fn test_reminder_dispatch_writes_notifications() {
    let mut ctx = TestContext::new().await.unwrap();
    let user = ctx.user(&[AppRole::Student], 0).await.unwrap();
    let hub = RealtimeHub::new();
    let mut events = Box::pin(hub.stream_for(user.id));

    let reminder = Reminder::create(
        &ctx.db,
        CreateReminder {
            user_id: user.id,
            session_id: None,
            title: "Upcoming session: Exam prep".to_string(),
            body: Some("Starts soon".to_string()),
            remind_at: Utc::now() - Duration::minutes(1),
        },
    )
    .await
    .unwrap();

    let sent = dispatch_due_reminders(&ctx.db, &hub, 1000).await.unwrap();
    assert!(sent >= 1);

    let notifications = Notification::list(&ctx.db, user.id, false, 10, 0)
        .await
        .unwrap();
    assert_eq!(notifications.len(), 1);
    assert_eq!(notifications[0].kind, NotificationKind::SessionReminder.as_str());
    assert_eq!(notifications[0].title, reminder.title);

    let pending: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM reminders WHERE id = $1 AND sent = FALSE")
            .bind(reminder.id)
            .fetch_one(&ctx.db)
            .await
            .unwrap();
    assert_eq!(pending, 0);

    let event = tokio::time::timeout(std::time::Duration::from_secs(1), events.next())
        .await
        .unwrap();
    assert!(matches!(event, Some(RealtimePayload::Notification(n)) if n.user_id == user.id));

    ctx.cleanup().await.unwrap();
}

/// Approving an application grants the teacher role; it cannot be reviewed twice
#[tokio::test]
#[ignore]
async fn test_application_approval_grants_teacher_role() {
    let mut ctx = TestContext::new().await.unwrap();
    let admin = ctx.user(&[AppRole::Admin], 0).await.unwrap();
    let applicant = ctx.user(&[AppRole::Student], 0).await.unwrap();

    let (status, application) = ctx
        .send(
            "POST",
            "/v1/applications",
            &applicant,
            Some(json!({
                "bio": "Final-year maths student who tutors first years.",
                "qualifications": "Top marks in Analysis I and II",
                "subjects": ["Calculus", "Linear Algebra"]
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{}", application);
    let review_uri = format!(
        "/v1/admin/applications/{}/review",
        application["id"].as_str().unwrap()
    );

    let (status, reviewed) = ctx
        .send("POST", &review_uri, &admin, Some(json!({ "decision": "approved" })))
        .await;
    assert_eq!(status, StatusCode::OK, "{}", reviewed);
    assert_eq!(reviewed["status"], "approved");
    assert!(UserRole::has_role(&ctx.db, applicant.id, AppRole::Teacher)
        .await
        .unwrap());

    let (status, _) = ctx
        .send("POST", &review_uri, &admin, Some(json!({ "decision": "rejected" })))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    ctx.cleanup().await.unwrap();
}

/// Granting the teacher role by email twice is harmless
#[tokio::test]
#[ignore]
async fn test_add_teacher_is_idempotent() {
    let mut ctx = TestContext::new().await.unwrap();
    let admin = ctx.user(&[AppRole::Admin], 0).await.unwrap();
    let user = ctx.user(&[AppRole::Student], 0).await.unwrap();
    let body = json!({ "email": user.email });

    let (status, first) = ctx
        .send("POST", "/v1/admin/add-teacher", &admin, Some(body.clone()))
        .await;
    assert_eq!(status, StatusCode::OK, "{}", first);
    assert_eq!(first["user_id"], user.id.to_string());
    assert_eq!(first["granted"], true);

    let (status, second) = ctx
        .send("POST", "/v1/admin/add-teacher", &admin, Some(body))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(second["granted"], false);

    let roles = UserRole::roles_for(&ctx.db, user.id).await.unwrap();
    assert_eq!(
        roles.iter().filter(|r| **r == AppRole::Teacher).count(),
        1
    );

    ctx.cleanup().await.unwrap();
}
