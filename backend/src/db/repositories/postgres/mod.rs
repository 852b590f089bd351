//! Postgres repository implementation using Diesel.
//!
//! This module implements the repository traits against a Postgres database.
//!
//! ## Features
//!
//! - Connection pooling with r2d2
//! - Automatic retry for transient failures
//! - Connection health monitoring
//! - Automatic migration execution
//!
//! Guarded booking writes run inside a SERIALIZABLE transaction that re-runs
//! the conflict predicate before writing. A writer that loses a race gets a
//! serialization failure, which surfaces as a retryable transaction error;
//! the retry re-runs the whole check-and-write with fresh data.
//!
//! ## Configuration
//!
//! Environment variables:
//! - `DATABASE_URL` or `PG_DATABASE_URL`: Connection string (required)
//! - `PG_POOL_MAX`: Maximum pool size (default: 10)
//! - `PG_POOL_MIN`: Minimum pool size (default: 1)
//! - `PG_CONN_TIMEOUT_SEC`: Connection timeout in seconds (default: 30)
//! - `PG_IDLE_TIMEOUT_SEC`: Idle connection timeout in seconds (default: 600)
//! - `PG_MAX_RETRIES`: Maximum retry attempts for transient failures (default: 3)
//! - `PG_RETRY_DELAY_MS`: Initial retry delay in milliseconds (default: 100)

use async_trait::async_trait;
use chrono::{DateTime, Utc, Weekday};
use diesel::pg::PgConnection;
use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, Pool};
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::task;

use crate::api::{BookingId, ProviderId, WindowId};
use crate::db::repository::{
    AvailabilityRepository, BookingFilter, BookingRepository, ErrorContext, GuardedWrite,
    RepositoryError, RepositoryResult,
};
use crate::models::{
    weekday_number, AvailabilityWindow, Booking, BookingStatus, NewAvailabilityWindow, NewBooking,
    TimeInterval, ACTIVE_STATUSES,
};
use crate::services::conflicts::ConflictQuery;

mod models;
mod schema;

use models::*;

type PgPool = Pool<ConnectionManager<PgConnection>>;

const MIGRATIONS: EmbeddedMigrations = embed_migrations!("src/db/repositories/postgres/migrations");

/// Configuration for connecting to Postgres.
#[derive(Debug, Clone)]
pub struct PostgresConfig {
    /// Database connection URL
    pub database_url: String,
    /// Maximum number of connections in the pool
    pub max_pool_size: u32,
    /// Minimum number of connections in the pool
    pub min_pool_size: u32,
    /// Connection timeout in seconds
    pub connection_timeout_sec: u64,
    /// Idle connection timeout in seconds
    pub idle_timeout_sec: u64,
    /// Maximum number of retry attempts for transient failures
    pub max_retries: u32,
    /// Initial retry delay in milliseconds (doubles with each retry)
    pub retry_delay_ms: u64,
}

impl Default for PostgresConfig {
    fn default() -> Self {
        Self {
            database_url: String::new(),
            max_pool_size: 10,
            min_pool_size: 1,
            connection_timeout_sec: 30,
            idle_timeout_sec: 600,
            max_retries: 3,
            retry_delay_ms: 100,
        }
    }
}

impl PostgresConfig {
    /// Create configuration from environment variables.
    pub fn from_env() -> Result<Self, String> {
        let database_url = std::env::var("DATABASE_URL")
            .or_else(|_| std::env::var("PG_DATABASE_URL"))
            .map_err(|_| "DATABASE_URL or PG_DATABASE_URL must be set".to_string())?;

        let max_pool_size = std::env::var("PG_POOL_MAX")
            .ok()
            .and_then(|v| v.parse::<u32>().ok())
            .unwrap_or(10);

        let min_pool_size = std::env::var("PG_POOL_MIN")
            .ok()
            .and_then(|v| v.parse::<u32>().ok())
            .unwrap_or(1);

        let connection_timeout_sec = std::env::var("PG_CONN_TIMEOUT_SEC")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(30);

        let idle_timeout_sec = std::env::var("PG_IDLE_TIMEOUT_SEC")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(600);

        let max_retries = std::env::var("PG_MAX_RETRIES")
            .ok()
            .and_then(|v| v.parse::<u32>().ok())
            .unwrap_or(3);

        let retry_delay_ms = std::env::var("PG_RETRY_DELAY_MS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(100);

        Ok(Self {
            database_url,
            max_pool_size,
            min_pool_size,
            connection_timeout_sec,
            idle_timeout_sec,
            max_retries,
            retry_delay_ms,
        })
    }

    /// Create a new configuration with a database URL.
    pub fn with_url(database_url: impl Into<String>) -> Self {
        Self {
            database_url: database_url.into(),
            ..Default::default()
        }
    }
}

/// Pool health statistics.
#[derive(Debug, Clone, Default)]
pub struct PoolStats {
    /// Number of connections currently in use
    pub connections_in_use: u32,
    /// Number of idle connections
    pub idle_connections: u32,
    /// Total number of connections in the pool
    pub total_connections: u32,
    /// Maximum pool size
    pub max_size: u32,
    /// Total successful queries executed
    pub total_queries: u64,
    /// Total failed queries
    pub failed_queries: u64,
    /// Total retried operations
    pub retried_operations: u64,
}

/// Diesel-backed repository for Postgres.
///
/// This repository implementation provides:
/// - Connection pooling with configurable limits
/// - Automatic retry for transient failures (including serialization
///   failures from the conflict guard)
/// - Health monitoring and statistics
/// - Automatic schema migrations
#[derive(Clone, Debug)]
pub struct PostgresRepository {
    pool: PgPool,
    config: PostgresConfig,
    // Metrics counters
    total_queries: std::sync::Arc<AtomicU64>,
    failed_queries: std::sync::Arc<AtomicU64>,
    retried_operations: std::sync::Arc<AtomicU64>,
}

impl PostgresRepository {
    /// Create a new repository and run pending migrations.
    pub fn new(config: PostgresConfig) -> RepositoryResult<Self> {
        let manager = ConnectionManager::<PgConnection>::new(&config.database_url);

        let pool = Pool::builder()
            .max_size(config.max_pool_size)
            .min_idle(Some(config.min_pool_size))
            .connection_timeout(Duration::from_secs(config.connection_timeout_sec))
            .idle_timeout(Some(Duration::from_secs(config.idle_timeout_sec)))
            .test_on_check_out(true) // Validate connections before use
            .build(manager)
            .map_err(|e| {
                RepositoryError::connection_with_context(
                    e.to_string(),
                    ErrorContext::new("create_pool")
                        .with_details(format!("max_size={}", config.max_pool_size)),
                )
            })?;

        // Run migrations once during initialization
        {
            let mut conn = pool.get().map_err(|e| {
                RepositoryError::connection_with_context(
                    e.to_string(),
                    ErrorContext::new("get_connection_for_migrations"),
                )
            })?;
            Self::run_migrations(&mut conn)?;
        }

        Ok(Self {
            pool,
            config,
            total_queries: std::sync::Arc::new(AtomicU64::new(0)),
            failed_queries: std::sync::Arc::new(AtomicU64::new(0)),
            retried_operations: std::sync::Arc::new(AtomicU64::new(0)),
        })
    }

    /// Run pending database migrations.
    fn run_migrations(conn: &mut PgConnection) -> RepositoryResult<()> {
        conn.run_pending_migrations(MIGRATIONS).map_err(|e| {
            RepositoryError::internal_with_context(
                format!("Migration failed: {}", e),
                ErrorContext::new("run_migrations"),
            )
        })?;

        Ok(())
    }

    /// Execute a database operation with automatic retry for transient failures.
    ///
    /// This method will retry the operation up to `max_retries` times if a
    /// retryable error occurs (connection errors, timeouts, serialization
    /// failures).
    async fn with_conn<T, F>(&self, f: F) -> RepositoryResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut PgConnection) -> RepositoryResult<T> + Send + 'static + Clone,
    {
        let pool = self.pool.clone();
        let max_retries = self.config.max_retries;
        let retry_delay_ms = self.config.retry_delay_ms;
        let total_queries = self.total_queries.clone();
        let failed_queries = self.failed_queries.clone();
        let retried_operations = self.retried_operations.clone();

        task::spawn_blocking(move || {
            let mut last_error = None;
            let mut retry_delay = Duration::from_millis(retry_delay_ms);

            for attempt in 0..=max_retries {
                if attempt > 0 {
                    retried_operations.fetch_add(1, Ordering::Relaxed);
                    std::thread::sleep(retry_delay);
                    retry_delay *= 2; // Exponential backoff
                }

                // Get connection
                let mut conn = match pool.get() {
                    Ok(c) => c,
                    Err(e) => {
                        let err = RepositoryError::connection_with_context(
                            e.to_string(),
                            ErrorContext::new("get_connection")
                                .with_details(format!("attempt={}", attempt + 1))
                                .retryable(),
                        );
                        if attempt < max_retries {
                            last_error = Some(err);
                            continue;
                        }
                        failed_queries.fetch_add(1, Ordering::Relaxed);
                        return Err(err);
                    }
                };

                // Execute the operation
                total_queries.fetch_add(1, Ordering::Relaxed);
                match f.clone()(&mut conn) {
                    Ok(result) => return Ok(result),
                    Err(e) if e.is_retryable() && attempt < max_retries => {
                        last_error = Some(e);
                        continue;
                    }
                    Err(e) => {
                        failed_queries.fetch_add(1, Ordering::Relaxed);
                        return Err(e);
                    }
                }
            }

            failed_queries.fetch_add(1, Ordering::Relaxed);
            Err(last_error.unwrap_or_else(|| {
                RepositoryError::internal("Max retries exceeded with no error captured")
            }))
        })
        .await
        .map_err(|e| {
            RepositoryError::internal_with_context(
                format!("Task join error: {}", e),
                ErrorContext::new("spawn_blocking"),
            )
        })?
    }

    /// Get pool health statistics.
    pub fn get_pool_stats(&self) -> PoolStats {
        let state = self.pool.state();
        PoolStats {
            connections_in_use: state.connections - state.idle_connections,
            idle_connections: state.idle_connections,
            total_connections: state.connections,
            max_size: self.config.max_pool_size,
            total_queries: self.total_queries.load(Ordering::Relaxed),
            failed_queries: self.failed_queries.load(Ordering::Relaxed),
            retried_operations: self.retried_operations.load(Ordering::Relaxed),
        }
    }

    /// Check if the database connection is healthy.
    pub async fn is_healthy(&self) -> bool {
        self.health_check().await.unwrap_or(false)
    }
}

/// Status strings that occupy the calendar.
fn active_status_strings() -> [&'static str; 2] {
    [ACTIVE_STATUSES[0].as_str(), ACTIVE_STATUSES[1].as_str()]
}

/// Load the active bookings overlapping `[start, end)` for the provider or
/// subject, excluding `exclude` when present. Runs inside the caller's
/// transaction for guarded writes.
fn load_conflicts(
    conn: &mut PgConnection,
    provider_id: i64,
    subject_id: Option<i64>,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    exclude: Option<i64>,
) -> RepositoryResult<Vec<Booking>> {
    use schema::bookings::dsl;

    let mut query = dsl::bookings
        .filter(dsl::status.eq_any(active_status_strings()))
        .filter(dsl::start_at.lt(end))
        .filter(dsl::end_at.gt(start))
        .into_boxed();

    query = match subject_id {
        Some(sid) => query.filter(dsl::provider_id.eq(provider_id).or(dsl::subject_id.eq(sid))),
        None => query.filter(dsl::provider_id.eq(provider_id)),
    };
    if let Some(excluded) = exclude {
        query = query.filter(dsl::id.ne(excluded));
    }

    let rows = query
        .order((dsl::start_at.asc(), dsl::id.asc()))
        .load::<BookingRow>(conn)?;
    rows.into_iter().map(TryInto::try_into).collect()
}

#[async_trait]
impl AvailabilityRepository for PostgresRepository {
    async fn create_window(
        &self,
        window: &NewAvailabilityWindow,
    ) -> RepositoryResult<AvailabilityWindow> {
        let window = window.clone();
        self.with_conn(move |conn| {
            use schema::availability_windows::dsl;

            let row: WindowRow = diesel::insert_into(dsl::availability_windows)
                .values(NewWindowRow::from(&window))
                .get_result(conn)
                .map_err(|e| RepositoryError::from(e).with_operation("create_window"))?;
            row.try_into()
        })
        .await
    }

    async fn get_window(&self, window_id: WindowId) -> RepositoryResult<AvailabilityWindow> {
        self.with_conn(move |conn| {
            use schema::availability_windows::dsl;

            let row: WindowRow = dsl::availability_windows
                .find(window_id.value())
                .first(conn)
                .map_err(|e| match e {
                    diesel::result::Error::NotFound => RepositoryError::not_found_with_context(
                        format!("Availability window {} not found", window_id),
                        ErrorContext::new("get_window").with_entity_id(window_id),
                    ),
                    other => other.into(),
                })?;
            row.try_into()
        })
        .await
    }

    async fn list_windows(
        &self,
        provider_id: ProviderId,
        weekday: Option<Weekday>,
    ) -> RepositoryResult<Vec<AvailabilityWindow>> {
        self.with_conn(move |conn| {
            use schema::availability_windows::dsl;

            let mut query = dsl::availability_windows
                .filter(dsl::provider_id.eq(provider_id.value()))
                .into_boxed();
            if let Some(day) = weekday {
                query = query.filter(dsl::weekday.eq(weekday_number(day) as i16));
            }
            let rows = query
                .order((dsl::weekday.asc(), dsl::start_time.asc(), dsl::id.asc()))
                .load::<WindowRow>(conn)?;
            rows.into_iter().map(TryInto::try_into).collect()
        })
        .await
    }

    async fn active_windows(
        &self,
        provider_id: ProviderId,
    ) -> RepositoryResult<Vec<AvailabilityWindow>> {
        self.with_conn(move |conn| {
            use schema::availability_windows::dsl;

            let rows = dsl::availability_windows
                .filter(dsl::provider_id.eq(provider_id.value()))
                .filter(dsl::is_active.eq(true))
                .order((dsl::weekday.asc(), dsl::start_time.asc(), dsl::id.asc()))
                .load::<WindowRow>(conn)?;
            rows.into_iter().map(TryInto::try_into).collect()
        })
        .await
    }

    async fn set_window_active(
        &self,
        window_id: WindowId,
        is_active: bool,
    ) -> RepositoryResult<AvailabilityWindow> {
        self.with_conn(move |conn| {
            use schema::availability_windows::dsl;

            let row: WindowRow = diesel::update(dsl::availability_windows.find(window_id.value()))
                .set((dsl::is_active.eq(is_active), dsl::updated_at.eq(Utc::now())))
                .get_result(conn)
                .map_err(|e| match e {
                    diesel::result::Error::NotFound => RepositoryError::not_found_with_context(
                        format!("Availability window {} not found", window_id),
                        ErrorContext::new("set_window_active").with_entity_id(window_id),
                    ),
                    other => other.into(),
                })?;
            row.try_into()
        })
        .await
    }
}

#[async_trait]
impl BookingRepository for PostgresRepository {
    async fn health_check(&self) -> RepositoryResult<bool> {
        self.with_conn(move |conn| {
            diesel::sql_query("SELECT 1")
                .execute(conn)
                .map_err(RepositoryError::from)?;
            Ok(true)
        })
        .await
    }

    async fn get_booking(&self, booking_id: BookingId) -> RepositoryResult<Booking> {
        self.with_conn(move |conn| {
            use schema::bookings::dsl;

            let row: BookingRow = dsl::bookings
                .find(booking_id.value())
                .first(conn)
                .map_err(|e| match e {
                    diesel::result::Error::NotFound => RepositoryError::not_found_with_context(
                        format!("Booking {} not found", booking_id),
                        ErrorContext::new("get_booking").with_entity_id(booking_id),
                    ),
                    other => other.into(),
                })?;
            row.try_into()
        })
        .await
    }

    async fn list_bookings(&self, filter: &BookingFilter) -> RepositoryResult<Vec<Booking>> {
        let filter = filter.clone();
        self.with_conn(move |conn| {
            use schema::bookings::dsl;

            let mut query = dsl::bookings.into_boxed();
            if let Some(provider_id) = filter.provider_id {
                query = query.filter(dsl::provider_id.eq(provider_id.value()));
            }
            if let Some(subject_id) = filter.subject_id {
                query = query.filter(dsl::subject_id.eq(subject_id.value()));
            }
            if let Some(from) = filter.from {
                query = query.filter(dsl::end_at.gt(from));
            }
            if let Some(to) = filter.to {
                query = query.filter(dsl::start_at.lt(to));
            }
            if let Some(status) = filter.status {
                query = query.filter(dsl::status.eq(status.as_str()));
            }

            let rows = query
                .order((dsl::start_at.desc(), dsl::id.asc()))
                .load::<BookingRow>(conn)?;
            rows.into_iter().map(TryInto::try_into).collect()
        })
        .await
    }

    async fn find_conflicts(&self, query: &ConflictQuery) -> RepositoryResult<Vec<Booking>> {
        let query = *query;
        self.with_conn(move |conn| {
            load_conflicts(
                conn,
                query.provider_id.value(),
                query.subject_id.map(|s| s.value()),
                query.interval.start,
                query.interval.end,
                query.exclude.map(|b| b.value()),
            )
        })
        .await
    }

    async fn insert_booking(&self, new: &NewBooking) -> RepositoryResult<GuardedWrite> {
        let new = new.clone();
        self.with_conn(move |conn| {
            use schema::bookings::dsl;

            conn.build_transaction()
                .serializable()
                .run(|conn| -> RepositoryResult<GuardedWrite> {
                    let conflicts = load_conflicts(
                        conn,
                        new.provider_id.value(),
                        Some(new.subject_id.value()),
                        new.start,
                        new.end,
                        None,
                    )?;
                    if !conflicts.is_empty() {
                        return Ok(GuardedWrite::Conflicted(conflicts));
                    }

                    let row: BookingRow = diesel::insert_into(dsl::bookings)
                        .values(NewBookingRow::from(&new))
                        .get_result(conn)?;
                    Ok(GuardedWrite::Committed(row.try_into()?))
                })
                .map_err(|e: RepositoryError| e.with_operation("insert_booking"))
        })
        .await
    }

    async fn reschedule_booking(
        &self,
        booking_id: BookingId,
        interval: TimeInterval,
    ) -> RepositoryResult<GuardedWrite> {
        self.with_conn(move |conn| {
            use schema::bookings::dsl;

            conn.build_transaction()
                .serializable()
                .run(|conn| -> RepositoryResult<GuardedWrite> {
                    let existing: BookingRow = dsl::bookings
                        .find(booking_id.value())
                        .for_update()
                        .first(conn)
                        .map_err(|e| match e {
                            diesel::result::Error::NotFound => {
                                RepositoryError::not_found_with_context(
                                    format!("Booking {} not found", booking_id),
                                    ErrorContext::new("reschedule_booking")
                                        .with_entity_id(booking_id),
                                )
                            }
                            other => other.into(),
                        })?;

                    let conflicts = load_conflicts(
                        conn,
                        existing.provider_id,
                        Some(existing.subject_id),
                        interval.start,
                        interval.end,
                        Some(booking_id.value()),
                    )?;
                    if !conflicts.is_empty() {
                        return Ok(GuardedWrite::Conflicted(conflicts));
                    }

                    let row: BookingRow = diesel::update(dsl::bookings.find(booking_id.value()))
                        .set((
                            dsl::start_at.eq(interval.start),
                            dsl::end_at.eq(interval.end),
                            dsl::updated_at.eq(Utc::now()),
                        ))
                        .get_result(conn)?;
                    Ok(GuardedWrite::Committed(row.try_into()?))
                })
                .map_err(|e: RepositoryError| e.with_operation("reschedule_booking"))
        })
        .await
    }

    async fn update_status(
        &self,
        booking_id: BookingId,
        status: BookingStatus,
    ) -> RepositoryResult<Booking> {
        self.with_conn(move |conn| {
            use schema::bookings::dsl;

            let row: BookingRow = diesel::update(dsl::bookings.find(booking_id.value()))
                .set((
                    dsl::status.eq(status.as_str()),
                    dsl::updated_at.eq(Utc::now()),
                ))
                .get_result(conn)
                .map_err(|e| match e {
                    diesel::result::Error::NotFound => RepositoryError::not_found_with_context(
                        format!("Booking {} not found", booking_id),
                        ErrorContext::new("update_status").with_entity_id(booking_id),
                    ),
                    other => other.into(),
                })?;
            row.try_into()
        })
        .await
    }
}
