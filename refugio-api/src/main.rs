use std::net::SocketAddr;
use std::sync::Arc;

use chrono::Duration as ChronoDuration;
use tokio::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use refugio_api::{app, worker, AppState};
use refugio_booking::{AvailabilityChecker, HoldService, ReservationConfirmer, SideEffects};
use refugio_core::payment::PaymentGateway;
use refugio_core::repository::{
    CabinLock, CabinRepository, CouponRepository, HoldRepository, ReservationRepository,
};
use refugio_notify::{HttpMailer, MailerConfig};
use refugio_payments::{MercadoPagoConfig, MercadoPagoGateway};
use refugio_store::{
    DbClient, PgCabinRepository, PgCouponRepository, PgHoldRepository, PgReservationRepository,
    RedisClient,
};

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "refugio_api=debug,tower_http=debug,axum::rejection=trace".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = refugio_store::app_config::Config::load().expect("Failed to load config");
    tracing::info!("Starting Refugio API on port {}", config.server.port);

    // Postgres
    let db = DbClient::new(&config.database.url)
        .await
        .expect("Failed to connect to Postgres");
    db.migrate().await.expect("Failed to run migrations");

    // Redis (per-cabin booking lock)
    let redis = RedisClient::new(&config.redis.url, config.business_rules.cabin_lock_seconds)
        .await
        .expect("Failed to connect to Redis");

    // Payment gateway
    let gateway: Arc<dyn PaymentGateway> = Arc::new(
        MercadoPagoGateway::new(&MercadoPagoConfig {
            base_url: config.payments.base_url.clone(),
            access_token: config.payments.access_token.clone(),
            timeout_seconds: config.payments.timeout_seconds,
        })
        .expect("Failed to build payment gateway"),
    );

    // Ticket mailer
    let mailer = Arc::new(
        HttpMailer::new(&MailerConfig {
            endpoint: config.mail.endpoint.clone(),
            api_key: config.mail.api_key.clone(),
            from_address: config.mail.from_address.clone(),
        })
        .expect("Failed to build mailer"),
    );

    let reservations: Arc<dyn ReservationRepository> =
        Arc::new(PgReservationRepository::new(db.pool.clone()));
    let holds: Arc<dyn HoldRepository> = Arc::new(PgHoldRepository::new(db.pool.clone()));
    let cabins: Arc<dyn CabinRepository> = Arc::new(PgCabinRepository::new(db.pool.clone()));
    let coupons: Arc<dyn CouponRepository> = Arc::new(PgCouponRepository::new(db.pool.clone()));
    let lock: Arc<dyn CabinLock> = Arc::new(redis);

    let availability = Arc::new(AvailabilityChecker::new(
        reservations.clone(),
        holds.clone(),
    ));
    let hold_service = Arc::new(HoldService::new(
        holds.clone(),
        cabins.clone(),
        availability.clone(),
        lock,
        ChronoDuration::minutes(config.business_rules.hold_ttl_minutes),
    ));
    let side_effects = SideEffects::new(coupons, mailer, cabins.clone());
    let confirmer = Arc::new(ReservationConfirmer::new(
        reservations.clone(),
        holds.clone(),
        cabins.clone(),
        availability.clone(),
        gateway.clone(),
        side_effects,
    ));

    // Background sweep for expired holds
    tokio::spawn(worker::start_hold_expiry_worker(
        holds.clone(),
        Duration::from_secs(config.business_rules.hold_sweep_interval_seconds),
    ));

    let app_state = AppState {
        reservations,
        holds,
        cabins,
        gateway,
        availability,
        hold_service,
        confirmer,
        frontend_base_url: config.frontend.base_url.clone(),
    };

    let app = app(app_state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await.unwrap();
    axum::serve(listener, app).await.unwrap();
}
