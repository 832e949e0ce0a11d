use std::sync::Arc;

use anyhow::Error as StoreError;
use tracing::info;

use shared::{
    domain::{ProductId, Role},
    error::MarketError,
    protocol::{LoginRequest, LoginResponse, NewProduct, Order, Product, RegisterRequest},
};

pub mod catalog;
pub mod gateway;
pub mod guard;
pub mod handoff;
pub mod orders;
pub mod session;
pub mod view;

pub use catalog::{CatalogFilterEngine, CategoryFilter};
pub use gateway::{HttpMarketGateway, MarketGateway, MissingMarketGateway};
pub use guard::{access_denied_notice, admit, Admission, DeniedReason};
pub use handoff::HandoffChannel;
pub use orders::OrderLifecycleController;
pub use session::{MemorySessionStore, Session, SessionContext, SessionStore};
pub use view::{ViewScope, ViewTicket};

/// Registration form input, validated client-side before any remote call.
#[derive(Debug, Clone)]
pub struct RegisterInput {
    pub full_name: String,
    pub email: String,
    pub password: String,
    pub confirm_password: String,
    pub role: Role,
}

impl RegisterInput {
    fn into_request(self) -> Result<RegisterRequest, MarketError> {
        if self.full_name.trim().is_empty()
            || self.email.trim().is_empty()
            || self.password.is_empty()
            || self.confirm_password.is_empty()
        {
            return Err(MarketError::invalid_input(
                "please fill out all the required fields",
            ));
        }
        if self.password != self.confirm_password {
            return Err(MarketError::invalid_input("passwords do not match"));
        }
        Ok(RegisterRequest {
            full_name: self.full_name,
            email: self.email,
            password: self.password,
            user_type: self.role,
        })
    }
}

/// Entry point for both roles: owns the session context, the category
/// handoff channel, and the order lifecycle controller, all talking to one
/// injected gateway. Every protected operation runs its admission check
/// synchronously before issuing the fetch.
pub struct MarketClient {
    session: SessionContext,
    gateway: Arc<dyn MarketGateway>,
    handoff: HandoffChannel,
    orders: OrderLifecycleController,
}

impl MarketClient {
    pub fn new(gateway: Arc<dyn MarketGateway>, store: Arc<dyn SessionStore>) -> Self {
        Self {
            session: SessionContext::new(store),
            gateway: Arc::clone(&gateway),
            handoff: HandoffChannel::new(),
            orders: OrderLifecycleController::new(gateway),
        }
    }

    /// Convenience constructor over the HTTP gateway.
    pub fn connect(server_url: impl Into<String>, store: Arc<dyn SessionStore>) -> Self {
        Self::new(Arc::new(HttpMarketGateway::new(server_url)), store)
    }

    pub fn session(&self) -> &SessionContext {
        &self.session
    }

    pub fn handoff(&self) -> &HandoffChannel {
        &self.handoff
    }

    pub fn orders(&self) -> &OrderLifecycleController {
        &self.orders
    }

    /// Admission check for a protected view.
    pub fn admit(&self, required_role: Role) -> Admission {
        admit(self.session.current().as_ref(), required_role)
    }

    fn require(&self, required_role: Role) -> Result<Session, MarketError> {
        self.admit(required_role).into_result(required_role)
    }

    /// Rehydrates the persisted session, e.g. at process start.
    pub async fn restore_session(&self) -> Result<(), MarketError> {
        self.session.restore().await.map_err(store_failure)
    }

    /// Authenticates against the service. The caller states which role they
    /// intend to sign in as; a mismatch with the registered role is rejected
    /// and no session is stored.
    pub async fn login(
        &self,
        email: &str,
        password: &str,
        intended_role: Role,
    ) -> Result<LoginResponse, MarketError> {
        if email.trim().is_empty() || password.is_empty() {
            return Err(MarketError::invalid_input(
                "please fill in both email and password",
            ));
        }

        let response = self
            .gateway
            .login(&LoginRequest {
                email: email.to_string(),
                password: password.to_string(),
            })
            .await?;

        if response.user_type != intended_role {
            return Err(MarketError::forbidden(format!(
                "login failed: this account is registered as a {}",
                response.user_type
            )));
        }

        self.session
            .establish(Session {
                token: response.token.clone(),
                role: response.user_type,
            })
            .await
            .map_err(store_failure)?;
        info!(role = %response.user_type, "logged in");
        Ok(response)
    }

    pub async fn register(&self, input: RegisterInput) -> Result<(), MarketError> {
        let request = input.into_request()?;
        self.gateway.register(&request).await
    }

    /// Clears the session and returns to the unauthenticated entry view.
    /// Idempotent.
    pub async fn logout(&self) -> Result<(), MarketError> {
        self.session.logout().await.map_err(store_failure)
    }

    /// Consumer catalog view: fetches the full product set into `engine`,
    /// honoring a pending category handoff. Returns `false` when the view
    /// was dismissed while the fetch was outstanding; the result is then
    /// discarded.
    pub async fn load_catalog(
        &self,
        ticket: &ViewTicket,
        engine: &mut CatalogFilterEngine,
    ) -> Result<bool, MarketError> {
        self.require(Role::Consumer)?;
        let products = self.gateway.list_products().await?;
        match ticket.apply(products) {
            Some(products) => {
                engine.load(products, &self.handoff);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Consumer product-detail view.
    pub async fn product_detail(&self, product_id: &ProductId) -> Result<Product, MarketError> {
        self.require(Role::Consumer)?;
        self.gateway.get_product(product_id).await
    }

    pub async fn place_order(&self, product: &Product, quantity: u32) -> Result<Order, MarketError> {
        self.orders
            .place(self.session.current().as_ref(), product, quantity)
            .await
    }

    pub async fn my_orders(&self) -> Result<Vec<Order>, MarketError> {
        self.orders.my_orders(self.session.current().as_ref()).await
    }

    /// Producer dashboard listing.
    pub async fn my_products(&self) -> Result<Vec<Product>, MarketError> {
        let session = self.require(Role::Producer)?;
        self.gateway.my_products(&session.token).await
    }

    /// Lists a new product after client-side validation.
    pub async fn create_product(&self, product: NewProduct) -> Result<Product, MarketError> {
        let session = self.require(Role::Producer)?;
        if product.name.trim().is_empty() {
            return Err(MarketError::invalid_input("product name is required"));
        }
        if !product.price.is_finite() || product.price <= 0.0 {
            return Err(MarketError::invalid_input("price must be positive"));
        }
        let created = self.gateway.create_product(&session.token, &product).await?;
        info!(product_id = %created.id, "product listed");
        Ok(created)
    }

    pub async fn producer_orders(&self) -> Result<Vec<Order>, MarketError> {
        self.orders
            .producer_orders(self.session.current().as_ref())
            .await
    }

    pub async fn advance_order(&self, order: &Order) -> Result<Order, MarketError> {
        self.orders
            .advance(self.session.current().as_ref(), order)
            .await
    }
}

fn store_failure(err: StoreError) -> MarketError {
    MarketError::remote(format!("session store failure: {err}"))
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;

#[cfg(test)]
#[path = "tests/gateway_tests.rs"]
mod gateway_tests;
