//! # Inventory Service
//!
//! Stock management outside the checkout path: receiving, stock opname
//! (absolute counts), thresholds and history. Checkout and refund apply
//! their own movements through the orchestrator.

use std::sync::Arc;

use tracing::info;

use crate::error::EngineResult;
use kasir_core::{InventoryLevel, InventoryMovement, MovementKind};
use kasir_db::Database;

/// Service for manual stock operations.
#[derive(Clone)]
pub struct InventoryService {
    db: Arc<Database>,
}

impl InventoryService {
    /// Creates a new InventoryService.
    pub fn new(db: Arc<Database>) -> Self {
        InventoryService { db }
    }

    /// Receives purchased stock into an outlet.
    pub async fn receive_stock(
        &self,
        outlet_id: &str,
        product_id: &str,
        variant_id: Option<&str>,
        quantity: i64,
        received_by: Option<&str>,
    ) -> EngineResult<i64> {
        let new_quantity = self
            .db
            .inventory()
            .adjust_stock(
                outlet_id,
                product_id,
                variant_id,
                quantity,
                MovementKind::Purchase,
                Some("purchase"),
                None,
                received_by,
            )
            .await?;

        info!(
            outlet_id = %outlet_id,
            product_id = %product_id,
            quantity = quantity,
            "Stock received"
        );

        Ok(new_quantity)
    }

    /// Stock opname: sets the counted absolute quantity. The implied delta
    /// is recorded as an adjustment movement.
    pub async fn set_stock(
        &self,
        outlet_id: &str,
        product_id: &str,
        variant_id: Option<&str>,
        quantity: i64,
        counted_by: Option<&str>,
        notes: Option<&str>,
    ) -> EngineResult<i64> {
        let new_quantity = self
            .db
            .inventory()
            .set_stock(outlet_id, product_id, variant_id, quantity, counted_by, notes)
            .await?;

        Ok(new_quantity)
    }

    /// Gets the current level for one item.
    pub async fn level(
        &self,
        outlet_id: &str,
        product_id: &str,
        variant_id: Option<&str>,
    ) -> EngineResult<Option<InventoryLevel>> {
        Ok(self.db.inventory().level(outlet_id, product_id, variant_id).await?)
    }

    /// Sets the low-stock threshold for one item.
    pub async fn set_min_stock(
        &self,
        outlet_id: &str,
        product_id: &str,
        variant_id: Option<&str>,
        min_stock: i64,
    ) -> EngineResult<()> {
        self.db
            .inventory()
            .set_min_stock(outlet_id, product_id, variant_id, min_stock)
            .await?;
        Ok(())
    }

    /// Lists items at or below their threshold.
    pub async fn low_stock(&self, outlet_id: &str) -> EngineResult<Vec<InventoryLevel>> {
        Ok(self.db.inventory().low_stock(outlet_id).await?)
    }

    /// Lists an item's movement history, newest first.
    pub async fn movements(
        &self,
        outlet_id: &str,
        product_id: &str,
        limit: i64,
    ) -> EngineResult<Vec<InventoryMovement>> {
        Ok(self.db.inventory().movements(outlet_id, product_id, limit).await?)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use kasir_db::DbConfig;

    async fn service() -> InventoryService {
        let db = Arc::new(Database::new(DbConfig::in_memory()).await.unwrap());
        InventoryService::new(db)
    }

    #[tokio::test]
    async fn test_receive_then_opname() {
        let svc = service().await;

        assert_eq!(
            svc.receive_stock("o1", "p1", None, 20, Some("manager")).await.unwrap(),
            20
        );

        // Count found 17 on the shelf.
        assert_eq!(
            svc.set_stock("o1", "p1", None, 17, Some("manager"), Some("opname"))
                .await
                .unwrap(),
            17
        );

        let moves = svc.movements("o1", "p1", 10).await.unwrap();
        assert_eq!(moves.len(), 2);
        let opname = moves
            .iter()
            .find(|m| m.kind == MovementKind::Adjustment)
            .unwrap();
        assert_eq!(opname.quantity, -3);
    }
}
