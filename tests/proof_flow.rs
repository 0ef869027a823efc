use std::sync::Arc;
use std::time::Duration;

use artisan_shop_api::{
    config::AppConfig,
    db::{create_orm_conn, create_pool, run_migrations},
    dispatch::Dispatcher,
    entity::{
        notifications::{Column as NotificationCol, Entity as Notifications},
        orders::{ActiveModel as OrderActive, Entity as Orders},
        payment_proofs::{Column as ProofCol, Entity as PaymentProofs},
    },
    error::AppError,
    middleware::auth::AuthUser,
    notify::Notifier,
    rate_limit::RateLimiter,
    routes::orders::UpdateOrderStatusRequest,
    routes::proofs::ReviewProofRequest,
    services::order_service::{self, ProofUpload},
    services::proof_service,
    state::AppState,
    storage::LocalImageStore,
};
use sea_orm::ActiveValue::NotSet;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, PaginatorTrait, QueryFilter, Set,
    Statement,
};
use uuid::Uuid;

// Integration flow: customer uploads a proof, admin approves/rejects, the
// order moves through the state machine, a notification lands in the feed.
#[tokio::test]
async fn payment_proof_review_pipeline() -> anyhow::Result<()> {
    // Allow skipping when no DB is configured in the environment.
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

    // --- upload with mismatched email is an ownership error ---
    let order_id = seed_order(&state, "TY-000001", "sari@example.com").await?;
    let denied = order_service::submit_proof(
        &state,
        "TY-000001",
        "someone-else@example.com",
        jpeg_upload(1024),
    )
    .await;
    assert!(matches!(denied, Err(AppError::Forbidden)));

    // --- oversized file is rejected before any store write ---
    let too_big = order_service::submit_proof(
        &state,
        "TY-000001",
        "sari@example.com",
        jpeg_upload(6 * 1024 * 1024),
    )
    .await;
    assert!(matches!(too_big, Err(AppError::BadRequest(_))));
    assert_eq!(proof_count(&state, order_id).await?, 0);
    assert_eq!(order_status(&state, order_id).await?, "PENDING_PAYMENT");

    // --- valid upload (email match is case-insensitive) ---
    let resp = order_service::submit_proof(
        &state,
        "TY-000001",
        "SARI@Example.com",
        jpeg_upload(1024),
    )
    .await?;
    let proof = resp.data.unwrap();
    assert_eq!(proof.status, "PENDING");
    assert_eq!(order_status(&state, order_id).await?, "AWAITING_VERIFICATION");
    assert_eq!(proof_count(&state, order_id).await?, 1);

    let feed_entries = Notifications::find()
        .filter(NotificationCol::Kind.eq("PAYMENT_PROOF_UPLOADED"))
        .count(&state.orm)
        .await?;
    assert_eq!(feed_entries, 1);

    // --- approval finalizes payment; a second review surfaces as conflict ---
    let reviewed = proof_service::review_proof(
        &state,
        &admin,
        proof.id,
        ReviewProofRequest {
            status: "APPROVED".into(),
            notes: None,
        },
    )
    .await?;
    let review = reviewed.data.unwrap();
    assert_eq!(review.proof.status, "APPROVED");
    assert!(review.proof.reviewed_at.is_some());
    assert_eq!(review.order.status, "PAID");

    let double = proof_service::review_proof(
        &state,
        &admin,
        proof.id,
        ReviewProofRequest {
            status: "REJECTED".into(),
            notes: None,
        },
    )
    .await;
    assert!(matches!(double, Err(AppError::AlreadyReviewed)));
    assert_eq!(order_status(&state, order_id).await?, "PAID");

    // --- proofs cannot be attached once the order is paid ---
    let late = order_service::submit_proof(
        &state,
        "TY-000001",
        "sari@example.com",
        jpeg_upload(1024),
    )
    .await;
    assert!(matches!(late, Err(AppError::InvalidState(_))));

    // --- rejection reverts the order and stores reviewer notes ---
    let second_order = seed_order(&state, "TY-000002", "budi@example.com").await?;
    let resp =
        order_service::submit_proof(&state, "TY-000002", "budi@example.com", jpeg_upload(2048))
            .await?;
    let proof = resp.data.unwrap();

    let rejected = proof_service::review_proof(
        &state,
        &admin,
        proof.id,
        ReviewProofRequest {
            status: "REJECTED".into(),
            notes: Some("mismatched amount".into()),
        },
    )
    .await?;
    let review = rejected.data.unwrap();
    assert_eq!(review.proof.status, "REJECTED");
    assert_eq!(review.proof.notes.as_deref(), Some("mismatched amount"));
    assert_eq!(review.order.status, "PENDING_PAYMENT");
    assert_eq!(order_status(&state, second_order).await?, "PENDING_PAYMENT");

    // --- re-upload after rejection is allowed ---
    let resp =
        order_service::submit_proof(&state, "TY-000002", "budi@example.com", jpeg_upload(2048))
            .await?;
    assert_eq!(resp.data.unwrap().status, "PENDING");
    assert_eq!(proof_count(&state, second_order).await?, 2);

    // --- admin status updates go through the state machine ---
    let skipped = order_service::update_order_status(
        &state,
        &admin,
        order_id,
        UpdateOrderStatusRequest {
            status: "COMPLETED".into(),
        },
    )
    .await;
    assert!(matches!(skipped, Err(AppError::InvalidTransition { .. })));

    let processing = order_service::update_order_status(
        &state,
        &admin,
        order_id,
        UpdateOrderStatusRequest {
            status: "PROCESSING".into(),
        },
    )
    .await?;
    assert_eq!(processing.data.unwrap().status, "PROCESSING");

    let not_admin = order_service::update_order_status(
        &state,
        &customer,
        order_id,
        UpdateOrderStatusRequest {
            status: "SHIPPED".into(),
        },
    )
    .await;
    assert!(matches!(not_admin, Err(AppError::Forbidden)));

    let bad_value = order_service::update_order_status(
        &state,
        &admin,
        order_id,
        UpdateOrderStatusRequest {
            status: "shipped".into(),
        },
    )
    .await;
    assert!(matches!(bad_value, Err(AppError::BadRequest(_))));

    // --- a verdict cannot resurrect an order cancelled mid-review ---
    let cancelled_order = seed_order(&state, "TY-000003", "ayu@example.com").await?;
    let resp =
        order_service::submit_proof(&state, "TY-000003", "ayu@example.com", jpeg_upload(512))
            .await?;
    let stale_proof = resp.data.unwrap();

    order_service::update_order_status(
        &state,
        &admin,
        cancelled_order,
        UpdateOrderStatusRequest {
            status: "CANCELLED".into(),
        },
    )
    .await?;

    let revived = proof_service::review_proof(
        &state,
        &admin,
        stale_proof.id,
        ReviewProofRequest {
            status: "APPROVED".into(),
            notes: None,
        },
    )
    .await;
    assert!(matches!(revived, Err(AppError::InvalidState(_))));
    assert_eq!(order_status(&state, cancelled_order).await?, "CANCELLED");
    assert_eq!(proof_status(&state, stale_proof.id).await?, "PENDING");

    // --- two racing reviews: exactly one lands, the other conflicts ---
    let raced_order = seed_order(&state, "TY-000004", "dewi@example.com").await?;
    let resp =
        order_service::submit_proof(&state, "TY-000004", "dewi@example.com", jpeg_upload(512))
            .await?;
    let raced_proof = resp.data.unwrap();

    let approve = || ReviewProofRequest {
        status: "APPROVED".into(),
        notes: None,
    };
    let (first, second) = tokio::join!(
        proof_service::review_proof(&state, &admin, raced_proof.id, approve()),
        proof_service::review_proof(&state, &admin, raced_proof.id, approve()),
    );

    let outcomes = [first, second];
    assert_eq!(outcomes.iter().filter(|r| r.is_ok()).count(), 1);
    for outcome in outcomes {
        if let Err(err) = outcome {
            assert!(matches!(err, AppError::AlreadyReviewed));
        }
    }
    assert_eq!(order_status(&state, raced_order).await?, "PAID");
    assert_eq!(proof_status(&state, raced_proof.id).await?, "APPROVED");

    Ok(())
}

async fn setup_state(database_url: &str) -> anyhow::Result<AppState> {
    let orm = create_orm_conn(database_url).await?;
    let pool = create_pool(database_url).await?;
    run_migrations(&orm).await?;

    // Clean tables between runs
    let backend = orm.get_database_backend();
    orm.execute(Statement::from_string(
        backend,
        "TRUNCATE TABLE payment_proofs, notifications, audit_logs, orders, settings RESTART IDENTITY CASCADE",
    ))
    .await?;

    let config = test_config(database_url);
    let upload_dir = std::env::temp_dir().join(format!("proof-flow-{}", Uuid::new_v4()));
    Ok(AppState {
        pool,
        orm: orm.clone(),
        notifier: Notifier::default(),
        dispatcher: Dispatcher::new(orm, &config),
        upload_limiter: Arc::new(RateLimiter::new(1000, Duration::from_secs(60))),
        images: Arc::new(LocalImageStore::new(upload_dir, "/uploads")),
    })
}

fn test_config(database_url: &str) -> AppConfig {
    AppConfig {
        database_url: database_url.to_string(),
        host: "127.0.0.1".into(),
        port: 0,
        // No credentials: both dispatch channels stay disabled offline.
        whatsapp_api_token: None,
        email_api_key: None,
        email_from: "no-reply@test.invalid".into(),
        upload_dir: "uploads".into(),
        public_upload_base: "/uploads".into(),
        dispatch_timeout: Duration::from_secs(1),
    }
}

async fn seed_order(state: &AppState, code: &str, email: &str) -> anyhow::Result<Uuid> {
    let order = OrderActive {
        id: Set(Uuid::new_v4()),
        order_code: Set(code.into()),
        customer_name: Set("Test Customer".into()),
        customer_email: Set(email.into()),
        customer_phone: Set("+6281200000000".into()),
        shipping_address: Set("Jl. Mawar 1, Yogyakarta".into()),
        total: Set(15_000_000),
        shipping_cost: Set(1_500_000),
        discount: Set(0),
        coupon_code: Set(None),
        status: Set("PENDING_PAYMENT".into()),
        courier: Set(None),
        tracking_number: Set(None),
        created_at: NotSet,
        updated_at: NotSet,
    }
    .insert(&state.orm)
    .await?;
    Ok(order.id)
}

fn jpeg_upload(size: usize) -> ProofUpload {
    ProofUpload {
        bytes: vec![0xD8; size],
        content_type: "image/jpeg".into(),
    }
}

async fn order_status(state: &AppState, id: Uuid) -> anyhow::Result<String> {
    let order = Orders::find_by_id(id)
        .one(&state.orm)
        .await?
        .expect("order exists");
    Ok(order.status)
}

async fn proof_count(state: &AppState, order_id: Uuid) -> anyhow::Result<u64> {
    let count = PaymentProofs::find()
        .filter(ProofCol::OrderId.eq(order_id))
        .count(&state.orm)
        .await?;
    Ok(count)
}

async fn proof_status(state: &AppState, id: Uuid) -> anyhow::Result<String> {
    let proof = PaymentProofs::find_by_id(id)
        .one(&state.orm)
        .await?
        .expect("proof exists");
    Ok(proof.status)
}
