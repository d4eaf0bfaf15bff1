//! Durable Repository: typed repository contracts over a relational
//! store, the only durable-storage surface the core pipeline touches.
//! One trait and Postgres implementation per table (`stations`,
//! `station_history`, `user_requests`, `recommendation_logs`,
//! `system_events`), backed by a bounded connection pool.

mod error;
mod events;
mod history;
mod pool;
mod recommendations;
mod requests;
mod stations;

pub use error::DrError;
pub use events::{PgSystemEventsRepository, SystemEventsRepository};
pub use history::{PgStationHistoryRepository, StationHistoryRepository};
pub use pool::build_pool;
pub use recommendations::{PgRecommendationLogRepository, RecommendationLogRepository};
pub use requests::{PgRequestLogRepository, RequestLogRepository, RequestStatus};
pub use stations::{PgStationRepository, StationRepository};

pub type Result<T> = std::result::Result<T, DrError>;

pub use deadpool_postgres::Pool;
