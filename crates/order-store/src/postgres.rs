use async_trait::async_trait;
use common::{OrderId, UserId};
use domain::{Order, OrderStatus};
use sqlx::{PgPool, Row, postgres::PgRow};

use crate::{
    ORDER_ENTITY, OrderRecord, Result, StatusChange, StoreError, Version,
    store::{OrderStore, UpdateOptions, UserLookup, skip_undecodable},
};

const SELECT_COLUMNS: &str = "sk, status, payload, status_message, transaction_id, tracking_number, version, created_at, updated_at";

/// PostgreSQL-backed order store implementation.
///
/// Uses a single `orders` table keyed by `(pk, sk)` where `pk` is the entity
/// marker and `sk` the order ID. The order document lives in `payload`.
#[derive(Clone)]
pub struct PostgresOrderStore {
    pool: PgPool,
    lookup: UserLookup,
}

impl PostgresOrderStore {
    /// Creates a new PostgreSQL order store.
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            lookup: UserLookup::default(),
        }
    }

    /// Sets the orders-by-user strategy.
    pub fn with_lookup(mut self, lookup: UserLookup) -> Self {
        self.lookup = lookup;
        self
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> std::result::Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("../../migrations").run(&self.pool).await
    }

    fn row_to_record(row: &PgRow) -> Result<OrderRecord> {
        let key: String = row.try_get("sk")?;
        let corrupt = |reason: String| StoreError::Corrupt {
            order_id: OrderId::new(key.clone()),
            reason,
        };

        let payload: serde_json::Value = row.try_get("payload")?;
        let order: Order = serde_json::from_value(payload).map_err(|e| corrupt(e.to_string()))?;
        let status: String = row.try_get("status")?;
        let status: OrderStatus = status.parse().map_err(|e: domain::ValidationError| corrupt(e.to_string()))?;

        Ok(OrderRecord {
            order,
            status,
            status_message: row.try_get("status_message")?,
            transaction_id: row.try_get("transaction_id")?,
            tracking_number: row.try_get("tracking_number")?,
            version: Version::new(row.try_get("version")?),
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }

    fn rows_to_records(rows: Vec<PgRow>) -> Vec<OrderRecord> {
        rows.iter()
            .filter_map(|row| match Self::row_to_record(row) {
                Ok(record) => Some(record),
                Err(e) => {
                    let key: String = row.try_get("sk").unwrap_or_default();
                    skip_undecodable(&key, &e);
                    None
                }
            })
            .collect()
    }
}

#[async_trait]
impl OrderStore for PostgresOrderStore {
    async fn create(&self, mut order: Order, status: OrderStatus) -> Result<OrderRecord> {
        if !order.order_id.is_assigned() {
            order.order_id = OrderId::generate();
        }
        let record = OrderRecord::new(order, status);
        let payload = serde_json::to_value(&record.order)?;

        let inserted = sqlx::query(
            r#"
            INSERT INTO orders (pk, sk, owner_id, status, payload, version, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (pk, sk) DO NOTHING
            "#,
        )
        .bind(ORDER_ENTITY)
        .bind(record.order_id().as_str())
        .bind(record.owner_id().as_str())
        .bind(record.status.as_str())
        .bind(payload)
        .bind(record.version.as_i64())
        .bind(record.created_at)
        .bind(record.updated_at)
        .execute(&self.pool)
        .await?;

        if inserted.rows_affected() == 0 {
            return Err(StoreError::AlreadyExists(record.order_id().clone()));
        }

        Ok(record)
    }

    async fn get(&self, order_id: &OrderId) -> Result<Option<OrderRecord>> {
        let row: Option<PgRow> = sqlx::query(&format!(
            "SELECT {SELECT_COLUMNS} FROM orders WHERE pk = $1 AND sk = $2"
        ))
        .bind(ORDER_ENTITY)
        .bind(order_id.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(Self::row_to_record).transpose()
    }

    async fn get_all(&self) -> Result<Vec<OrderRecord>> {
        let rows = sqlx::query(&format!(
            "SELECT {SELECT_COLUMNS} FROM orders WHERE pk = $1 ORDER BY sk ASC"
        ))
        .bind(ORDER_ENTITY)
        .fetch_all(&self.pool)
        .await?;

        Ok(Self::rows_to_records(rows))
    }

    async fn get_by_user(&self, user_id: &UserId) -> Result<Vec<OrderRecord>> {
        match self.lookup {
            UserLookup::Index => {
                let rows = sqlx::query(&format!(
                    "SELECT {SELECT_COLUMNS} FROM orders WHERE pk = $1 AND owner_id = $2 ORDER BY sk ASC"
                ))
                .bind(ORDER_ENTITY)
                .bind(user_id.as_str())
                .fetch_all(&self.pool)
                .await?;

                Ok(Self::rows_to_records(rows))
            }
            UserLookup::Scan => {
                use futures_util::TryStreamExt;

                let sql = format!(
                    "SELECT owner_id, {SELECT_COLUMNS} FROM orders WHERE pk = $1 ORDER BY sk ASC"
                );
                let mut rows = sqlx::query(&sql).bind(ORDER_ENTITY).fetch(&self.pool);

                let mut owned = Vec::new();
                while let Some(row) = rows.try_next().await? {
                    let is_owner = row
                        .try_get::<String, _>("owner_id")
                        .is_ok_and(|owner| owner == user_id.as_str());
                    if is_owner {
                        owned.push(row);
                    }
                }
                Ok(Self::rows_to_records(owned))
            }
        }
    }

    async fn update_status(
        &self,
        order_id: &OrderId,
        change: StatusChange,
        options: UpdateOptions,
    ) -> Result<OrderRecord> {
        let expected = options.expected_version.map(|v| v.as_i64());

        let row: Option<PgRow> = sqlx::query(&format!(
            r#"
            UPDATE orders SET
                status = $3,
                status_message = CASE WHEN $8::BOOLEAN THEN $4 ELSE COALESCE($4, status_message) END,
                transaction_id = CASE WHEN $8::BOOLEAN THEN $5 ELSE COALESCE($5, transaction_id) END,
                tracking_number = CASE WHEN $8::BOOLEAN THEN $6 ELSE COALESCE($6, tracking_number) END,
                version = version + 1,
                updated_at = NOW()
            WHERE pk = $1 AND sk = $2 AND ($7::BIGINT IS NULL OR version = $7)
            RETURNING {SELECT_COLUMNS}
            "#
        ))
        .bind(ORDER_ENTITY)
        .bind(order_id.as_str())
        .bind(change.status.as_str())
        .bind(change.message)
        .bind(change.transaction_id)
        .bind(change.tracking_number)
        .bind(expected)
        .bind(change.replace_details)
        .fetch_optional(&self.pool)
        .await?;

        if let Some(row) = row {
            return Self::row_to_record(&row);
        }

        // Nothing matched: either the order is missing or the version moved on
        let actual: Option<i64> =
            sqlx::query_scalar("SELECT version FROM orders WHERE pk = $1 AND sk = $2")
                .bind(ORDER_ENTITY)
                .bind(order_id.as_str())
                .fetch_optional(&self.pool)
                .await?;

        match (actual, options.expected_version) {
            (Some(actual), Some(expected)) => Err(StoreError::ConcurrencyConflict {
                order_id: order_id.clone(),
                expected,
                actual: Version::new(actual),
            }),
            _ => Err(StoreError::NotFound(order_id.clone())),
        }
    }
}
