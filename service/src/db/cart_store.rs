// basket_service/src/db/cart_store.rs

use crate::config::AppConfig;
use crate::models::CartRow;
use async_trait::async_trait;
use basket::{Cart, CartError, CartResult, CartStore, CartUpdateFn, CartWrite, MutationOutcome, UserId};
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::types::Json;
use sqlx::{Postgres, Transaction};
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS carts (
  user_id BIGINT PRIMARY KEY,
  items JSONB NOT NULL DEFAULT '[]'::jsonb,
  created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
  updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
)
"#;

/// Cart store backed by a single `carts` table, one row per user.
#[derive(Clone)]
pub struct PgCartStore {
  pool: PgPool,
}

impl PgCartStore {
  pub async fn connect(config: &AppConfig) -> Result<Self, sqlx::Error> {
    info!(max_connections = config.db_max_connections, "Connecting to database");
    let pool = PgPoolOptions::new()
      .max_connections(config.db_max_connections)
      .acquire_timeout(Duration::from_secs(5))
      .connect(&config.database_url)
      .await?;
    info!("Database connection pool established");
    Ok(Self { pool })
  }

  /// Creates the `carts` table if it does not exist yet.
  pub async fn ensure_schema(&self) -> Result<(), sqlx::Error> {
    sqlx::query(SCHEMA_SQL).execute(&self.pool).await?;
    info!("Cart schema ready");
    Ok(())
  }

  pub async fn close(&self) {
    info!("Closing database connection pool");
    self.pool.close().await;
  }

  async fn write(tx: &mut Transaction<'_, Postgres>, user_id: UserId, write: &CartWrite) -> Result<(), sqlx::Error> {
    match write {
      CartWrite::Put(cart) => {
        sqlx::query(
          r#"
          INSERT INTO carts (user_id, items)
          VALUES ($1, $2)
          ON CONFLICT (user_id) DO UPDATE
          SET items = EXCLUDED.items, updated_at = NOW()
          "#,
        )
        .bind(user_id)
        .bind(Json(cart.items()))
        .execute(&mut **tx)
        .await?;
      }
      CartWrite::Delete => {
        sqlx::query("DELETE FROM carts WHERE user_id = $1")
          .bind(user_id)
          .execute(&mut **tx)
          .await?;
      }
      CartWrite::Unchanged => {}
    }
    Ok(())
  }
}

#[async_trait]
impl CartStore for PgCartStore {
  async fn list_carts(&self) -> CartResult<Vec<Cart>> {
    let rows = sqlx::query_as::<_, CartRow>("SELECT user_id, items FROM carts ORDER BY user_id")
      .fetch_all(&self.pool)
      .await
      .map_err(CartError::store)?;
    rows.into_iter().map(CartRow::into_cart).collect()
  }

  async fn find_cart(&self, user_id: UserId) -> CartResult<Option<Cart>> {
    let row = sqlx::query_as::<_, CartRow>("SELECT user_id, items FROM carts WHERE user_id = $1")
      .bind(user_id)
      .fetch_optional(&self.pool)
      .await
      .map_err(CartError::store)?;
    row.map(CartRow::into_cart).transpose()
  }

  #[instrument(name = "pg::update_cart", skip(self, update))]
  async fn update_cart(&self, user_id: UserId, update: CartUpdateFn) -> CartResult<MutationOutcome> {
    let mut tx = self
      .pool
      .begin()
      .await
      .map_err(|e| CartError::persistence(user_id, e))?;

    let current = sqlx::query_as::<_, CartRow>("SELECT user_id, items FROM carts WHERE user_id = $1 FOR UPDATE")
      .bind(user_id)
      .fetch_optional(&mut *tx)
      .await
      .map_err(|e| CartError::persistence(user_id, e));
    let current = match current {
      Ok(row) => row,
      Err(err) => {
        rollback(tx, user_id).await;
        return Err(err);
      }
    };

    // Rejections from the update function are not store failures.
    let mutation = match current.map(CartRow::into_cart).transpose().and_then(update) {
      Ok(mutation) => mutation,
      Err(err) => {
        rollback(tx, user_id).await;
        return Err(err);
      }
    };

    if let CartWrite::Put(cart) = &mutation.write {
      if cart.user_id != user_id {
        rollback(tx, user_id).await;
        return Err(CartError::Internal(format!(
          "update for user {} produced a cart for user {}",
          user_id, cart.user_id
        )));
      }
    }

    if let Err(e) = Self::write(&mut tx, user_id, &mutation.write).await {
      rollback(tx, user_id).await;
      return Err(CartError::persistence(user_id, e));
    }

    tx.commit().await.map_err(|e| CartError::persistence(user_id, e))?;
    debug!(outcome = ?mutation.outcome, "Cart transaction committed");
    Ok(mutation.outcome)
  }
}

async fn rollback(tx: Transaction<'_, Postgres>, user_id: UserId) {
  if let Err(e) = tx.rollback().await {
    warn!(user_id, error = %e, "Rollback failed; the connection drops the transaction");
  }
}
