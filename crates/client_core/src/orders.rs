use std::sync::Arc;

use tracing::info;

use shared::{
    domain::Role,
    error::MarketError,
    protocol::{AdvanceOrderRequest, Order, PlaceOrderRequest, Product, ProductSnapshot},
};

use crate::{
    gateway::MarketGateway,
    guard::admit,
    session::Session,
};

/// Owns the order state machine and the asymmetric role permissions over it.
///
/// All writes go through the remote service; on success the server-confirmed
/// order replaces the caller's record. The controller never applies a locally
/// computed status, so a concurrently committed change is not clobbered.
pub struct OrderLifecycleController {
    gateway: Arc<dyn MarketGateway>,
}

impl OrderLifecycleController {
    pub fn new(gateway: Arc<dyn MarketGateway>) -> Self {
        Self { gateway }
    }

    /// Places an order for `quantity` units of `product`. Consumer-only.
    /// The product snapshot (name and quantity label) is captured here, at
    /// placement time, and never re-derived from the live product.
    pub async fn place(
        &self,
        session: Option<&Session>,
        product: &Product,
        quantity: u32,
    ) -> Result<Order, MarketError> {
        let session = admit(session, Role::Consumer).into_result(Role::Consumer)?;
        if quantity == 0 {
            return Err(MarketError::invalid_input("order quantity must be positive"));
        }

        let request = PlaceOrderRequest {
            product_id: product.id.clone(),
            product_details: ProductSnapshot {
                name: product.name.clone(),
                quantity: format!("{quantity} {}", product.unit.bare()),
            },
        };
        let order = self.gateway.place_order(&session.token, &request).await?;
        info!(order_id = %order.id, product = %product.id, "order placed");
        Ok(order)
    }

    /// Advances an order one step along `Processing → Shipped → Delivered`.
    /// Producer-only; the next status is computed solely from the current
    /// one, and the returned order is the server-confirmed record.
    pub async fn advance(
        &self,
        session: Option<&Session>,
        order: &Order,
    ) -> Result<Order, MarketError> {
        let Some(next) = order.status.next() else {
            return Err(MarketError::AlreadyTerminal);
        };
        let session = admit(session, Role::Producer).into_result(Role::Producer)?;

        let updated = self
            .gateway
            .advance_order(&session.token, &order.id, &AdvanceOrderRequest { status: next })
            .await?;
        info!(
            order_id = %order.id,
            from = %order.status,
            to = %updated.status,
            "order advanced"
        );
        Ok(updated)
    }

    /// Orders placed by the current consumer, newest first.
    pub async fn my_orders(&self, session: Option<&Session>) -> Result<Vec<Order>, MarketError> {
        let session = admit(session, Role::Consumer).into_result(Role::Consumer)?;
        let orders = self.gateway.my_orders(&session.token).await?;
        Ok(newest_first(orders))
    }

    /// Orders addressed to the current producer, newest first.
    pub async fn producer_orders(
        &self,
        session: Option<&Session>,
    ) -> Result<Vec<Order>, MarketError> {
        let session = admit(session, Role::Producer).into_result(Role::Producer)?;
        let orders = self.gateway.producer_orders(&session.token).await?;
        Ok(newest_first(orders))
    }
}

/// Display contract: listings are shown newest first regardless of the order
/// the service returns them in.
fn newest_first(mut orders: Vec<Order>) -> Vec<Order> {
    orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    orders
}
