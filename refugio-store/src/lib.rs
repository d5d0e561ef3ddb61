pub mod app_config;
pub mod cabin_repo;
pub mod coupon_repo;
pub mod database;
pub mod hold_repo;
pub mod memory;
pub mod redis_repo;
pub mod reservation_repo;

pub use cabin_repo::PgCabinRepository;
pub use coupon_repo::PgCouponRepository;
pub use database::DbClient;
pub use hold_repo::PgHoldRepository;
pub use redis_repo::RedisClient;
pub use reservation_repo::PgReservationRepository;
