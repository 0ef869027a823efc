use std::sync::Arc;
use std::time::Duration;

use artisan_shop_api::{
    config::AppConfig,
    db::{create_orm_conn, create_pool, run_migrations},
    dispatch::Dispatcher,
    error::AppError,
    middleware::auth::AuthUser,
    notify::{Notifier, StreamEvent},
    rate_limit::RateLimiter,
    routes::params::Pagination,
    services::notification_service::{self, NotificationKind},
    state::AppState,
    storage::LocalImageStore,
};
use sea_orm::{ConnectionTrait, Statement};
use uuid::Uuid;

// Integration flow: the durable notification feed and its live fan-out.
#[tokio::test]
async fn notification_feed_pipeline() -> anyhow::Result<()> {
    let database_url =
        match std::env::var("TEST_DATABASE_URL").or_else(|_| std::env::var("DATABASE_URL")) {
            Ok(url) => url,
            Err(_) => {
                eprintln!(
                    "Skipping test: set TEST_DATABASE_URL or DATABASE_URL to run integration flow tests."
                );
                return Ok(());
            }
        };

    let state = setup_state(&database_url).await?;
    let admin = AuthUser {
        user_id: Uuid::new_v4(),
        role: "admin".into(),
    };
    let customer = AuthUser {
        user_id: Uuid::new_v4(),
        role: "user".into(),
    };

    // --- a publish reaches a live subscriber as event then unread count ---
    let mut rx = state.notifier.subscribe();
    let created = notification_service::create_and_publish(
        &state,
        NotificationKind::NewOrder,
        "New order",
        "Order TY-000010 was placed",
        None,
    )
    .await?;

    match rx.recv().await? {
        StreamEvent::Notification(n) => {
            assert_eq!(n.id, created.id);
            assert_eq!(n.kind, "NEW_ORDER");
            assert!(!n.is_read);
        }
        other => panic!("expected the notification first, got {other:?}"),
    }
    match rx.recv().await? {
        StreamEvent::UnreadCount(count) => assert_eq!(count, 1),
        other => panic!("expected unread count, got {other:?}"),
    }

    // --- snapshot reflects the stored rows ---
    let second = notification_service::create_and_publish(
        &state,
        NotificationKind::PaymentProofUploaded,
        "Payment proof uploaded",
        "Sari uploaded a payment proof for order TY-000010",
        None,
    )
    .await?;

    let (items, unread) = notification_service::snapshot(&state.orm).await?;
    assert_eq!(items.len(), 2);
    assert_eq!(unread, 2);
    // Newest first.
    assert_eq!(items[0].id, second.id);
    assert_eq!(items[1].id, created.id);

    // --- the feed is admin-only ---
    let listing =
        notification_service::list(&state, &customer, Pagination::default()).await;
    assert!(matches!(listing, Err(AppError::Forbidden)));

    let listing = notification_service::list(&state, &admin, Pagination::default()).await?;
    let feed = listing.data.unwrap();
    assert_eq!(feed.items.len(), 2);
    assert_eq!(feed.unread_count, 2);

    // --- mark-read is idempotent and publishes the new unread count ---
    let marked = notification_service::mark_read(&state, &admin, created.id).await?;
    assert!(marked.data.unwrap().is_read);
    match rx.recv().await? {
        StreamEvent::UnreadCount(count) => assert_eq!(count, 1),
        other => panic!("expected unread count after mark-read, got {other:?}"),
    }

    let again = notification_service::mark_read(&state, &admin, created.id).await?;
    assert!(again.data.unwrap().is_read);

    // --- mark-all-read drains the counter ---
    notification_service::mark_all_read(&state, &admin).await?;
    let unread = notification_service::unread_count(&state.orm).await?;
    assert_eq!(unread, 0);

    // --- delete removes the row; a second delete is a 404 ---
    notification_service::delete(&state, &admin, second.id).await?;
    let gone = notification_service::delete(&state, &admin, second.id).await;
    assert!(matches!(gone, Err(AppError::NotFound)));

    let (items, _) = notification_service::snapshot(&state.orm).await?;
    assert_eq!(items.len(), 1);

    Ok(())
}

async fn setup_state(database_url: &str) -> anyhow::Result<AppState> {
    let orm = create_orm_conn(database_url).await?;
    let pool = create_pool(database_url).await?;
    run_migrations(&orm).await?;

    let backend = orm.get_database_backend();
    orm.execute(Statement::from_string(
        backend,
        "TRUNCATE TABLE payment_proofs, notifications, audit_logs, orders, settings RESTART IDENTITY CASCADE",
    ))
    .await?;

    let config = AppConfig {
        database_url: database_url.to_string(),
        host: "127.0.0.1".into(),
        port: 0,
        whatsapp_api_token: None,
        email_api_key: None,
        email_from: "no-reply@test.invalid".into(),
        upload_dir: "uploads".into(),
        public_upload_base: "/uploads".into(),
        dispatch_timeout: Duration::from_secs(1),
    };
    let upload_dir = std::env::temp_dir().join(format!("notif-flow-{}", Uuid::new_v4()));
    Ok(AppState {
        pool,
        orm: orm.clone(),
        notifier: Notifier::default(),
        dispatcher: Dispatcher::new(orm, &config),
        upload_limiter: Arc::new(RateLimiter::new(1000, Duration::from_secs(60))),
        images: Arc::new(LocalImageStore::new(upload_dir, "/uploads")),
    })
}
