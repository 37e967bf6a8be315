use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use sqlx::types::Json;
use sqlx::{FromRow, PgPool};
use tracing::info;

use crate::checks::{StatusCheck, StatusCheckRepository};
use crate::config::DatabaseConfig;
use crate::rentals::{
    Activation, ActiveRental, ActiveRentalId, BusinessProfile, DurationUnit, RentalRepository,
    RentalRequest, RentalRequestId, RentalStatus, RepositoryError, Slug, Transition,
};

const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS rental_requests (
        id TEXT PRIMARY KEY,
        business_name TEXT NOT NULL,
        contact_email TEXT NOT NULL,
        contact_phone TEXT NOT NULL,
        duration TEXT NOT NULL,
        duration_type TEXT NOT NULL,
        duration_value INTEGER NOT NULL,
        price TEXT NOT NULL,
        status TEXT NOT NULL,
        request_date TIMESTAMPTZ NOT NULL,
        approval_date TIMESTAMPTZ,
        expiration_date TIMESTAMPTZ,
        unique_slug TEXT NOT NULL,
        business_data JSONB NOT NULL,
        created_at TIMESTAMPTZ NOT NULL,
        updated_at TIMESTAMPTZ NOT NULL
    )
    "#,
    "CREATE UNIQUE INDEX IF NOT EXISTS rental_requests_slug_idx ON rental_requests (unique_slug)",
    r#"
    CREATE TABLE IF NOT EXISTS active_rentals (
        id TEXT PRIMARY KEY,
        rental_request_id TEXT NOT NULL,
        slug TEXT NOT NULL,
        business_name TEXT NOT NULL,
        business_data JSONB NOT NULL,
        expiration_date TIMESTAMPTZ NOT NULL,
        is_active BOOLEAN NOT NULL,
        created_at TIMESTAMPTZ NOT NULL,
        last_accessed TIMESTAMPTZ NOT NULL
    )
    "#,
    "CREATE INDEX IF NOT EXISTS active_rentals_slug_idx ON active_rentals (slug)",
    "CREATE INDEX IF NOT EXISTS active_rentals_expiration_idx ON active_rentals (expiration_date)",
    r#"
    CREATE TABLE IF NOT EXISTS status_checks (
        id TEXT PRIMARY KEY,
        client_name TEXT NOT NULL,
        timestamp TIMESTAMPTZ NOT NULL
    )
    "#,
];

const REQUEST_COLUMNS: &str = "id, business_name, contact_email, contact_phone, duration, \
     duration_type, duration_value, price, status, request_date, approval_date, \
     expiration_date, unique_slug, business_data, created_at, updated_at";

const RENTAL_COLUMNS: &str = "id, rental_request_id, slug, business_name, business_data, \
     expiration_date, is_active, created_at, last_accessed";

const UNIQUE_VIOLATION: &str = "23505";

#[derive(Debug, FromRow)]
struct RequestRow {
    id: String,
    business_name: String,
    contact_email: String,
    contact_phone: String,
    duration: String,
    duration_type: String,
    duration_value: i32,
    price: String,
    status: String,
    request_date: DateTime<Utc>,
    approval_date: Option<DateTime<Utc>>,
    expiration_date: Option<DateTime<Utc>>,
    unique_slug: String,
    business_data: Json<BusinessProfile>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<RequestRow> for RentalRequest {
    type Error = RepositoryError;

    fn try_from(row: RequestRow) -> Result<Self, Self::Error> {
        let duration_type = DurationUnit::from_label(&row.duration_type).ok_or_else(|| {
            RepositoryError::Corrupt(format!("request {}: unit '{}'", row.id, row.duration_type))
        })?;
        let status = parse_status(&row.status)?;
        let duration_value = u32::try_from(row.duration_value).map_err(|_| {
            RepositoryError::Corrupt(format!("request {}: count {}", row.id, row.duration_value))
        })?;

        Ok(Self {
            id: RentalRequestId(row.id),
            business_name: row.business_name,
            contact_email: row.contact_email,
            contact_phone: row.contact_phone,
            duration: row.duration,
            duration_type,
            duration_value,
            price: row.price,
            status,
            request_date: row.request_date,
            approval_date: row.approval_date,
            expiration_date: row.expiration_date,
            unique_slug: Slug(row.unique_slug),
            business_data: row.business_data.0,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Debug, FromRow)]
struct RentalRow {
    id: String,
    rental_request_id: String,
    slug: String,
    business_name: String,
    business_data: Json<BusinessProfile>,
    expiration_date: DateTime<Utc>,
    is_active: bool,
    created_at: DateTime<Utc>,
    last_accessed: DateTime<Utc>,
}

impl From<RentalRow> for ActiveRental {
    fn from(row: RentalRow) -> Self {
        Self {
            id: ActiveRentalId(row.id),
            rental_request_id: RentalRequestId(row.rental_request_id),
            slug: Slug(row.slug),
            business_name: row.business_name,
            business_data: row.business_data.0,
            expiration_date: row.expiration_date,
            is_active: row.is_active,
            created_at: row.created_at,
            last_accessed: row.last_accessed,
        }
    }
}

#[derive(Debug, FromRow)]
struct CheckRow {
    id: String,
    client_name: String,
    timestamp: DateTime<Utc>,
}

fn parse_status(raw: &str) -> Result<RentalStatus, RepositoryError> {
    RentalStatus::from_label(raw)
        .ok_or_else(|| RepositoryError::Corrupt(format!("unknown status '{raw}'")))
}

fn limit(value: usize) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

/// PostgreSQL-backed store. One row per document; profiles live in JSONB.
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Open a pool against `config.url`, targeting the database named by `config.name`.
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, RepositoryError> {
        let options = PgConnectOptions::from_str(&config.url)?.database(&config.name);
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .connect_with(options)
            .await?;
        info!(database = %config.name, "connected to postgres");
        Ok(Self::new(pool))
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Create collections and indexes when missing.
    pub async fn init(&self) -> Result<(), RepositoryError> {
        for statement in SCHEMA {
            sqlx::query(statement).execute(&self.pool).await?;
        }
        Ok(())
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }

    async fn current_status(
        &self,
        id: &RentalRequestId,
    ) -> Result<Transition, RepositoryError> {
        let status: Option<(String,)> =
            sqlx::query_as("SELECT status FROM rental_requests WHERE id = $1")
                .bind(&id.0)
                .fetch_optional(&self.pool)
                .await?;
        match status {
            Some((raw,)) => Ok(Transition::AlreadyDecided(parse_status(&raw)?)),
            None => Ok(Transition::Missing),
        }
    }
}

#[async_trait]
impl RentalRepository for PgStore {
    async fn insert_request(
        &self,
        request: RentalRequest,
    ) -> Result<RentalRequest, RepositoryError> {
        let duration_value = i32::try_from(request.duration_value)
            .map_err(|_| RepositoryError::Corrupt("duration count out of range".to_string()))?;

        let result = sqlx::query(&format!(
            "INSERT INTO rental_requests ({REQUEST_COLUMNS}) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)"
        ))
        .bind(&request.id.0)
        .bind(&request.business_name)
        .bind(&request.contact_email)
        .bind(&request.contact_phone)
        .bind(&request.duration)
        .bind(request.duration_type.label())
        .bind(duration_value)
        .bind(&request.price)
        .bind(request.status.label())
        .bind(request.request_date)
        .bind(request.approval_date)
        .bind(request.expiration_date)
        .bind(&request.unique_slug.0)
        .bind(Json(&request.business_data))
        .bind(request.created_at)
        .bind(request.updated_at)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(request),
            Err(sqlx::Error::Database(db_err))
                if db_err.code().as_deref() == Some(UNIQUE_VIOLATION) =>
            {
                Err(RepositoryError::Conflict)
            }
            Err(err) => Err(err.into()),
        }
    }

    async fn list_requests(&self, max: usize) -> Result<Vec<RentalRequest>, RepositoryError> {
        let rows: Vec<RequestRow> = sqlx::query_as(&format!(
            "SELECT {REQUEST_COLUMNS} FROM rental_requests ORDER BY created_at LIMIT $1"
        ))
        .bind(limit(max))
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(RentalRequest::try_from).collect()
    }

    async fn fetch_request(
        &self,
        id: &RentalRequestId,
    ) -> Result<Option<RentalRequest>, RepositoryError> {
        let row: Option<RequestRow> = sqlx::query_as(&format!(
            "SELECT {REQUEST_COLUMNS} FROM rental_requests WHERE id = $1"
        ))
        .bind(&id.0)
        .fetch_optional(&self.pool)
        .await?;
        row.map(RentalRequest::try_from).transpose()
    }

    async fn slug_in_use(&self, slug: &Slug) -> Result<bool, RepositoryError> {
        let (taken,): (bool,) =
            sqlx::query_as("SELECT EXISTS (SELECT 1 FROM rental_requests WHERE unique_slug = $1)")
                .bind(&slug.0)
                .fetch_one(&self.pool)
                .await?;
        Ok(taken)
    }

    async fn activate(&self, activation: Activation) -> Result<Transition, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let updated: Option<RequestRow> = sqlx::query_as(&format!(
            "UPDATE rental_requests \
             SET status = 'active', approval_date = $2, expiration_date = $3, updated_at = $2 \
             WHERE id = $1 AND status = 'pending' \
             RETURNING {REQUEST_COLUMNS}"
        ))
        .bind(&activation.request_id.0)
        .bind(activation.approved_at)
        .bind(activation.expires_at)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(row) = updated else {
            tx.rollback().await?;
            return self.current_status(&activation.request_id).await;
        };

        let rental = &activation.rental;
        sqlx::query(&format!(
            "INSERT INTO active_rentals ({RENTAL_COLUMNS}) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)"
        ))
        .bind(&rental.id.0)
        .bind(&rental.rental_request_id.0)
        .bind(&rental.slug.0)
        .bind(&rental.business_name)
        .bind(Json(&rental.business_data))
        .bind(rental.expiration_date)
        .bind(rental.is_active)
        .bind(rental.created_at)
        .bind(rental.last_accessed)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(Transition::Applied(RentalRequest::try_from(row)?))
    }

    async fn reject(
        &self,
        id: &RentalRequestId,
        at: DateTime<Utc>,
    ) -> Result<Transition, RepositoryError> {
        let updated: Option<RequestRow> = sqlx::query_as(&format!(
            "UPDATE rental_requests SET status = 'rejected', updated_at = $2 \
             WHERE id = $1 AND status = 'pending' \
             RETURNING {REQUEST_COLUMNS}"
        ))
        .bind(&id.0)
        .bind(at)
        .fetch_optional(&self.pool)
        .await?;

        match updated {
            Some(row) => Ok(Transition::Applied(RentalRequest::try_from(row)?)),
            None => self.current_status(id).await,
        }
    }

    async fn list_active(&self, max: usize) -> Result<Vec<ActiveRental>, RepositoryError> {
        let rows: Vec<RentalRow> = sqlx::query_as(&format!(
            "SELECT {RENTAL_COLUMNS} FROM active_rentals WHERE is_active \
             ORDER BY created_at LIMIT $1"
        ))
        .bind(limit(max))
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(ActiveRental::from).collect())
    }

    async fn find_live_by_slug(
        &self,
        slug: &Slug,
        now: DateTime<Utc>,
    ) -> Result<Option<ActiveRental>, RepositoryError> {
        let row: Option<RentalRow> = sqlx::query_as(&format!(
            "SELECT {RENTAL_COLUMNS} FROM active_rentals \
             WHERE slug = $1 AND is_active AND expiration_date > $2 LIMIT 1"
        ))
        .bind(&slug.0)
        .bind(now)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(ActiveRental::from))
    }

    async fn touch_rental(
        &self,
        id: &ActiveRentalId,
        at: DateTime<Utc>,
    ) -> Result<(), RepositoryError> {
        sqlx::query("UPDATE active_rentals SET last_accessed = $2 WHERE id = $1")
            .bind(&id.0)
            .bind(at)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn delete_rental(&self, id: &ActiveRentalId) -> Result<u64, RepositoryError> {
        let result = sqlx::query("DELETE FROM active_rentals WHERE id = $1")
            .bind(&id.0)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    async fn delete_expired(&self, now: DateTime<Utc>) -> Result<u64, RepositoryError> {
        let result = sqlx::query("DELETE FROM active_rentals WHERE expiration_date < $1")
            .bind(now)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}

#[async_trait]
impl StatusCheckRepository for PgStore {
    async fn insert_check(&self, check: StatusCheck) -> Result<StatusCheck, RepositoryError> {
        sqlx::query("INSERT INTO status_checks (id, client_name, timestamp) VALUES ($1, $2, $3)")
            .bind(&check.id)
            .bind(&check.client_name)
            .bind(check.timestamp)
            .execute(&self.pool)
            .await?;
        Ok(check)
    }

    async fn list_checks(&self, max: usize) -> Result<Vec<StatusCheck>, RepositoryError> {
        let rows: Vec<CheckRow> = sqlx::query_as(
            "SELECT id, client_name, timestamp FROM status_checks ORDER BY timestamp LIMIT $1",
        )
        .bind(limit(max))
        .fetch_all(&self.pool)
        .await?;
        Ok(rows
            .into_iter()
            .map(|row| StatusCheck {
                id: row.id,
                client_name: row.client_name,
                timestamp: row.timestamp,
            })
            .collect())
    }
}
