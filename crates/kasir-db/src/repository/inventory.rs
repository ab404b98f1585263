//! # Inventory Repository
//!
//! Stock levels keyed by (outlet, product, variant) plus the append-only
//! movement ledger.
//!
//! ## Write Discipline
//! Every level change pairs with a movement row in the same database
//! transaction, and relative changes go through `quantity = quantity + ?`
//! so concurrent writers never lose an update. Stock is allowed to go
//! negative; an oversell is a reconciliation problem, not a checkout
//! blocker.

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;
use uuid::Uuid;

use crate::error::DbResult;
use kasir_core::{InventoryLevel, InventoryMovement, MovementKind};

/// A variant key of `None` addresses the base product row, which is stored
/// with an empty-string variant so the composite primary key stays NULL-free.
fn variant_key(variant_id: Option<&str>) -> &str {
    variant_id.unwrap_or("")
}

/// Repository for inventory database operations.
#[derive(Debug, Clone)]
pub struct InventoryRepository {
    pool: SqlitePool,
}

impl InventoryRepository {
    /// Creates a new InventoryRepository.
    pub fn new(pool: SqlitePool) -> Self {
        InventoryRepository { pool }
    }

    /// Applies a relative stock change and records the movement, atomically.
    ///
    /// Creates the level row if it does not exist yet. Returns the new
    /// quantity.
    #[allow(clippy::too_many_arguments)]
    pub async fn adjust_stock(
        &self,
        outlet_id: &str,
        product_id: &str,
        variant_id: Option<&str>,
        delta: i64,
        kind: MovementKind,
        reference_type: Option<&str>,
        reference_id: Option<&str>,
        created_by: Option<&str>,
    ) -> DbResult<i64> {
        debug!(
            outlet_id = %outlet_id,
            product_id = %product_id,
            delta = delta,
            "Adjusting stock"
        );

        let mut db_tx = self.pool.begin().await?;

        let quantity: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO inventory (outlet_id, product_id, variant_id, quantity)
            VALUES (?1, ?2, ?3, ?4)
            ON CONFLICT(outlet_id, product_id, variant_id)
                DO UPDATE SET quantity = quantity + excluded.quantity
            RETURNING quantity
            "#,
        )
        .bind(outlet_id)
        .bind(product_id)
        .bind(variant_key(variant_id))
        .bind(delta)
        .fetch_one(&mut *db_tx)
        .await?;

        insert_movement(
            &mut db_tx,
            outlet_id,
            product_id,
            variant_id,
            kind,
            delta,
            reference_type,
            reference_id,
            created_by,
            None,
        )
        .await?;

        db_tx.commit().await?;
        Ok(quantity)
    }

    /// Sets an absolute stock quantity, recording the implied delta as an
    /// adjustment movement.
    pub async fn set_stock(
        &self,
        outlet_id: &str,
        product_id: &str,
        variant_id: Option<&str>,
        quantity: i64,
        created_by: Option<&str>,
        notes: Option<&str>,
    ) -> DbResult<i64> {
        let mut db_tx = self.pool.begin().await?;

        let previous: Option<i64> = sqlx::query_scalar(
            r#"
            SELECT quantity FROM inventory
            WHERE outlet_id = ?1 AND product_id = ?2 AND variant_id = ?3
            "#,
        )
        .bind(outlet_id)
        .bind(product_id)
        .bind(variant_key(variant_id))
        .fetch_optional(&mut *db_tx)
        .await?;
        let previous = previous.unwrap_or(0);

        sqlx::query(
            r#"
            INSERT INTO inventory (outlet_id, product_id, variant_id, quantity)
            VALUES (?1, ?2, ?3, ?4)
            ON CONFLICT(outlet_id, product_id, variant_id)
                DO UPDATE SET quantity = excluded.quantity
            "#,
        )
        .bind(outlet_id)
        .bind(product_id)
        .bind(variant_key(variant_id))
        .bind(quantity)
        .execute(&mut *db_tx)
        .await?;

        insert_movement(
            &mut db_tx,
            outlet_id,
            product_id,
            variant_id,
            MovementKind::Adjustment,
            quantity - previous,
            None,
            None,
            created_by,
            notes,
        )
        .await?;

        db_tx.commit().await?;
        Ok(quantity)
    }

    /// Gets the stock level for one (outlet, product, variant).
    pub async fn level(
        &self,
        outlet_id: &str,
        product_id: &str,
        variant_id: Option<&str>,
    ) -> DbResult<Option<InventoryLevel>> {
        let level = sqlx::query_as::<_, InventoryLevel>(
            r#"
            SELECT outlet_id, product_id, variant_id, quantity, min_stock
            FROM inventory
            WHERE outlet_id = ?1 AND product_id = ?2 AND variant_id = ?3
            "#,
        )
        .bind(outlet_id)
        .bind(product_id)
        .bind(variant_key(variant_id))
        .fetch_optional(&self.pool)
        .await?;

        Ok(level)
    }

    /// Sets the low-stock threshold for a level row, creating it at zero
    /// quantity if needed.
    pub async fn set_min_stock(
        &self,
        outlet_id: &str,
        product_id: &str,
        variant_id: Option<&str>,
        min_stock: i64,
    ) -> DbResult<()> {
        sqlx::query(
            r#"
            INSERT INTO inventory (outlet_id, product_id, variant_id, quantity, min_stock)
            VALUES (?1, ?2, ?3, 0, ?4)
            ON CONFLICT(outlet_id, product_id, variant_id)
                DO UPDATE SET min_stock = excluded.min_stock
            "#,
        )
        .bind(outlet_id)
        .bind(product_id)
        .bind(variant_key(variant_id))
        .bind(min_stock)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Lists levels at or below their threshold for an outlet.
    pub async fn low_stock(&self, outlet_id: &str) -> DbResult<Vec<InventoryLevel>> {
        let levels = sqlx::query_as::<_, InventoryLevel>(
            r#"
            SELECT outlet_id, product_id, variant_id, quantity, min_stock
            FROM inventory
            WHERE outlet_id = ?1 AND min_stock > 0 AND quantity <= min_stock
            ORDER BY product_id, variant_id
            "#,
        )
        .bind(outlet_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(levels)
    }

    /// Lists recent movements for a product at an outlet, newest first.
    pub async fn movements(
        &self,
        outlet_id: &str,
        product_id: &str,
        limit: i64,
    ) -> DbResult<Vec<InventoryMovement>> {
        let movements = sqlx::query_as::<_, InventoryMovement>(
            r#"
            SELECT id, outlet_id, product_id, variant_id, kind, quantity,
                   reference_type, reference_id, notes, created_by, created_at
            FROM inventory_movements
            WHERE outlet_id = ?1 AND product_id = ?2
            ORDER BY created_at DESC
            LIMIT ?3
            "#,
        )
        .bind(outlet_id)
        .bind(product_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(movements)
    }
}

#[allow(clippy::too_many_arguments)]
async fn insert_movement(
    conn: &mut SqliteConnection,
    outlet_id: &str,
    product_id: &str,
    variant_id: Option<&str>,
    kind: MovementKind,
    quantity: i64,
    reference_type: Option<&str>,
    reference_id: Option<&str>,
    created_by: Option<&str>,
    notes: Option<&str>,
) -> DbResult<()> {
    sqlx::query(
        r#"
        INSERT INTO inventory_movements (
            id, outlet_id, product_id, variant_id, kind, quantity,
            reference_type, reference_id, notes, created_by, created_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
        "#,
    )
    .bind(Uuid::new_v4().to_string())
    .bind(outlet_id)
    .bind(product_id)
    .bind(variant_id)
    .bind(kind)
    .bind(quantity)
    .bind(reference_type)
    .bind(reference_id)
    .bind(notes)
    .bind(created_by)
    .bind(Utc::now())
    .execute(&mut *conn)
    .await?;

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};

    async fn test_db() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    #[tokio::test]
    async fn test_adjust_creates_then_accumulates() {
        let db = test_db().await;
        let repo = db.inventory();

        let q = repo
            .adjust_stock("o1", "p1", None, 10, MovementKind::Purchase, None, None, None)
            .await
            .unwrap();
        assert_eq!(q, 10);

        let q = repo
            .adjust_stock(
                "o1",
                "p1",
                None,
                -3,
                MovementKind::Sale,
                Some("transaction"),
                Some("tx-1"),
                None,
            )
            .await
            .unwrap();
        assert_eq!(q, 7);

        let level = repo.level("o1", "p1", None).await.unwrap().unwrap();
        assert_eq!(level.quantity, 7);

        let moves = repo.movements("o1", "p1", 10).await.unwrap();
        assert_eq!(moves.len(), 2);
    }

    #[tokio::test]
    async fn test_stock_can_go_negative() {
        let db = test_db().await;
        let repo = db.inventory();

        let q = repo
            .adjust_stock("o1", "p1", None, -2, MovementKind::Sale, None, None, None)
            .await
            .unwrap();
        assert_eq!(q, -2);
    }

    #[tokio::test]
    async fn test_variant_rows_are_independent() {
        let db = test_db().await;
        let repo = db.inventory();

        repo.adjust_stock("o1", "p1", None, 5, MovementKind::Purchase, None, None, None)
            .await
            .unwrap();
        repo.adjust_stock(
            "o1",
            "p1",
            Some("v1"),
            8,
            MovementKind::Purchase,
            None,
            None,
            None,
        )
        .await
        .unwrap();

        let base = repo.level("o1", "p1", None).await.unwrap().unwrap();
        let variant = repo.level("o1", "p1", Some("v1")).await.unwrap().unwrap();
        assert_eq!(base.quantity, 5);
        assert_eq!(variant.quantity, 8);
    }

    #[tokio::test]
    async fn test_set_stock_records_delta_movement() {
        let db = test_db().await;
        let repo = db.inventory();

        repo.adjust_stock("o1", "p1", None, 10, MovementKind::Purchase, None, None, None)
            .await
            .unwrap();
        let q = repo
            .set_stock("o1", "p1", None, 4, Some("manager"), Some("stock opname"))
            .await
            .unwrap();
        assert_eq!(q, 4);

        let moves = repo.movements("o1", "p1", 10).await.unwrap();
        let adjustment = moves
            .iter()
            .find(|m| m.kind == MovementKind::Adjustment)
            .unwrap();
        assert_eq!(adjustment.quantity, -6);
    }

    #[tokio::test]
    async fn test_low_stock_threshold() {
        let db = test_db().await;
        let repo = db.inventory();

        repo.adjust_stock("o1", "p1", None, 3, MovementKind::Purchase, None, None, None)
            .await
            .unwrap();
        repo.set_min_stock("o1", "p1", None, 5).await.unwrap();

        let low = repo.low_stock("o1").await.unwrap();
        assert_eq!(low.len(), 1);
        assert_eq!(low[0].product_id, "p1");
    }
}
