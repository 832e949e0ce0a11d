use super::*;

use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};

use shared::{
    domain::{OrderId, OrderStatus, ProductCategory, Unit, UserId},
    protocol::{AdvanceOrderRequest, PlaceOrderRequest, ProductSnapshot},
};

fn product(id: &str, name: &str, category: ProductCategory) -> Product {
    Product {
        id: ProductId(id.to_string()),
        name: name.to_string(),
        description: String::new(),
        category,
        price: 40.0,
        unit: Unit::PerKg,
        quantity: 50,
        producer: None,
        created_at: Utc::now(),
    }
}

fn order(id: &str, status: OrderStatus, created_at: DateTime<Utc>) -> Order {
    Order {
        id: OrderId(id.to_string()),
        product: ProductId("p1".to_string()),
        product_details: ProductSnapshot {
            name: "Fresh Organic Tomatoes".to_string(),
            quantity: "5 kg".to_string(),
        },
        consumer: UserId("c1".to_string()),
        producer: UserId("u1".to_string()),
        customer_name: None,
        status,
        created_at,
    }
}

#[derive(Default)]
struct TestMarketGateway {
    login_response: Option<LoginResponse>,
    products: Vec<Product>,
    orders: Vec<Order>,
    placed: Mutex<Vec<PlaceOrderRequest>>,
    advanced: Mutex<Vec<(OrderId, OrderStatus)>>,
}

impl TestMarketGateway {
    fn with_products(products: Vec<Product>) -> Self {
        Self {
            products,
            ..Self::default()
        }
    }

    fn with_orders(orders: Vec<Order>) -> Self {
        Self {
            orders,
            ..Self::default()
        }
    }

    fn with_login(response: LoginResponse) -> Self {
        Self {
            login_response: Some(response),
            ..Self::default()
        }
    }
}

#[async_trait]
impl MarketGateway for TestMarketGateway {
    async fn login(
        &self,
        _request: &shared::protocol::LoginRequest,
    ) -> Result<LoginResponse, MarketError> {
        self.login_response
            .clone()
            .ok_or_else(|| MarketError::remote("no login response configured"))
    }

    async fn register(
        &self,
        _request: &shared::protocol::RegisterRequest,
    ) -> Result<(), MarketError> {
        Ok(())
    }

    async fn list_products(&self) -> Result<Vec<Product>, MarketError> {
        Ok(self.products.clone())
    }

    async fn get_product(&self, product_id: &ProductId) -> Result<Product, MarketError> {
        self.products
            .iter()
            .find(|p| &p.id == product_id)
            .cloned()
            .ok_or_else(|| MarketError::not_found("product"))
    }

    async fn my_products(&self, _token: &str) -> Result<Vec<Product>, MarketError> {
        Ok(self.products.clone())
    }

    async fn create_product(
        &self,
        _token: &str,
        new_product: &NewProduct,
    ) -> Result<Product, MarketError> {
        let mut created = product("p-created", &new_product.name, new_product.category);
        created.price = new_product.price;
        created.unit = new_product.unit;
        created.quantity = new_product.quantity;
        Ok(created)
    }

    async fn place_order(
        &self,
        _token: &str,
        request: &PlaceOrderRequest,
    ) -> Result<Order, MarketError> {
        self.placed.lock().expect("lock").push(request.clone());
        let mut placed = order("o-new", OrderStatus::Processing, Utc::now());
        placed.product = request.product_id.clone();
        placed.product_details = request.product_details.clone();
        Ok(placed)
    }

    async fn my_orders(&self, _token: &str) -> Result<Vec<Order>, MarketError> {
        Ok(self.orders.clone())
    }

    async fn producer_orders(&self, _token: &str) -> Result<Vec<Order>, MarketError> {
        Ok(self.orders.clone())
    }

    async fn advance_order(
        &self,
        _token: &str,
        order_id: &OrderId,
        request: &AdvanceOrderRequest,
    ) -> Result<Order, MarketError> {
        self.advanced
            .lock()
            .expect("lock")
            .push((order_id.clone(), request.status));
        let mut updated = self
            .orders
            .iter()
            .find(|o| &o.id == order_id)
            .cloned()
            .unwrap_or_else(|| order(&order_id.0, OrderStatus::Processing, Utc::now()));
        updated.status = request.status;
        Ok(updated)
    }
}

fn client_with_gateway(gateway: Arc<TestMarketGateway>) -> MarketClient {
    MarketClient::new(gateway, Arc::new(MemorySessionStore::new()))
}

async fn log_in_as(client: &MarketClient, role: Role) {
    client
        .session()
        .establish(Session {
            token: "tok-test".to_string(),
            role,
        })
        .await
        .expect("establish session");
}

// --- admission -------------------------------------------------------------

#[test]
fn admit_denies_when_token_absent() {
    assert_eq!(
        admit(None, Role::Producer),
        Admission::Denied(DeniedReason::NoToken)
    );
}

#[test]
fn admit_denies_on_role_mismatch() {
    let session = Session {
        token: "tok".to_string(),
        role: Role::Consumer,
    };
    assert_eq!(
        admit(Some(&session), Role::Producer),
        Admission::Denied(DeniedReason::WrongRole)
    );
    assert_eq!(
        admit(Some(&session), Role::Consumer),
        Admission::Allowed(session.clone())
    );
}

#[tokio::test]
async fn guarded_fetch_is_not_attempted_without_admission() {
    let gateway = Arc::new(TestMarketGateway::with_products(vec![product(
        "p1",
        "Tomatoes",
        ProductCategory::Vegetable,
    )]));
    let client = client_with_gateway(Arc::clone(&gateway));

    let err = client.my_products().await.expect_err("no session");
    assert_eq!(err, MarketError::Unauthenticated);

    log_in_as(&client, Role::Consumer).await;
    let err = client.my_products().await.expect_err("wrong role");
    assert!(matches!(err, MarketError::Forbidden(_)));
}

#[tokio::test]
async fn logout_is_idempotent() {
    let client = client_with_gateway(Arc::new(TestMarketGateway::default()));
    log_in_as(&client, Role::Consumer).await;

    client.logout().await.expect("first logout");
    assert_eq!(client.session().current(), None);

    // Logging out while already logged out is a no-op, not an error.
    client.logout().await.expect("second logout");
    assert_eq!(client.session().current(), None);
}

#[tokio::test]
async fn restore_session_rehydrates_from_store() {
    let store = Arc::new(MemorySessionStore::new());
    store
        .save(&Session {
            token: "tok-persisted".to_string(),
            role: Role::Producer,
        })
        .await
        .expect("seed store");

    let client = MarketClient::new(Arc::new(TestMarketGateway::default()), store);
    assert_eq!(client.session().current(), None);
    client.restore_session().await.expect("restore");
    assert!(matches!(
        client.admit(Role::Producer),
        Admission::Allowed(_)
    ));
}

#[tokio::test]
async fn login_role_mismatch_stores_no_session() {
    let gateway = Arc::new(TestMarketGateway::with_login(LoginResponse {
        token: "tok-abc".to_string(),
        user_type: Role::Consumer,
        name: "Ravi".to_string(),
    }));
    let client = client_with_gateway(gateway);

    let err = client
        .login("ravi@example.com", "secret", Role::Producer)
        .await
        .expect_err("mismatched role");
    assert!(matches!(err, MarketError::Forbidden(_)));
    assert_eq!(client.session().current(), None);
}

#[tokio::test]
async fn login_validates_fields_before_remote_call() {
    // No login response is configured, so reaching the gateway would fail
    // with RemoteFailure instead of InvalidInput.
    let client = client_with_gateway(Arc::new(TestMarketGateway::default()));
    let err = client
        .login("", "secret", Role::Consumer)
        .await
        .expect_err("empty email");
    assert!(matches!(err, MarketError::InvalidInput(_)));
}

#[tokio::test]
async fn register_rejects_password_mismatch_before_remote_call() {
    let client = client_with_gateway(Arc::new(TestMarketGateway::default()));
    let err = client
        .register(RegisterInput {
            full_name: "Asha Patel".to_string(),
            email: "asha@example.com".to_string(),
            password: "secret".to_string(),
            confirm_password: "secrets".to_string(),
            role: Role::Producer,
        })
        .await
        .expect_err("mismatch");
    assert!(matches!(err, MarketError::InvalidInput(_)));

    let err = client
        .register(RegisterInput {
            full_name: String::new(),
            email: "asha@example.com".to_string(),
            password: "secret".to_string(),
            confirm_password: "secret".to_string(),
            role: Role::Producer,
        })
        .await
        .expect_err("missing name");
    assert!(matches!(err, MarketError::InvalidInput(_)));
}

// --- handoff ---------------------------------------------------------------

#[test]
fn handoff_consume_clears_the_slot() {
    let handoff = HandoffChannel::new();
    handoff.publish(ProductCategory::Fruit);
    assert_eq!(handoff.consume(), Some(ProductCategory::Fruit));
    assert_eq!(handoff.consume(), None);
}

#[test]
fn handoff_last_write_wins() {
    let handoff = HandoffChannel::new();
    handoff.publish(ProductCategory::Grain);
    handoff.publish(ProductCategory::Dairy);
    assert_eq!(handoff.consume(), Some(ProductCategory::Dairy));
}

// --- catalog ---------------------------------------------------------------

fn sample_catalog() -> Vec<Product> {
    vec![
        product("p1", "Tomatoes", ProductCategory::Vegetable),
        product("p2", "Mangoes", ProductCategory::Fruit),
        product("p3", "Wheat", ProductCategory::Grain),
        product("p4", "Bananas", ProductCategory::Fruit),
    ]
}

#[test]
fn select_category_filters_without_omission_or_reorder() {
    let handoff = HandoffChannel::new();
    let mut engine = CatalogFilterEngine::new();
    engine.load(sample_catalog(), &handoff);

    engine.select_category("fruit").expect("known key");
    let displayed = engine.displayed();
    assert_eq!(displayed.len(), 2);
    assert!(displayed
        .iter()
        .all(|p| p.category.key() == "fruit"));
    // Relative order of the full set is preserved.
    assert_eq!(displayed[0].id.0, "p2");
    assert_eq!(displayed[1].id.0, "p4");

    // Case-insensitive on the key.
    engine.select_category("FRUIT").expect("uppercase key");
    assert_eq!(engine.displayed().len(), 2);
}

#[test]
fn select_all_returns_full_set_in_original_order() {
    let handoff = HandoffChannel::new();
    let mut engine = CatalogFilterEngine::new();
    engine.load(sample_catalog(), &handoff);
    engine.select_category("grain").expect("filter");
    engine.select_category("all").expect("back to all");

    let ids: Vec<&str> = engine.displayed().iter().map(|p| p.id.0.as_str()).collect();
    assert_eq!(ids, ["p1", "p2", "p3", "p4"]);
}

#[test]
fn empty_full_set_filters_to_empty_not_error() {
    let handoff = HandoffChannel::new();
    let mut engine = CatalogFilterEngine::new();
    engine.load(Vec::new(), &handoff);
    engine.select_category("dairy").expect("filter");
    assert!(engine.displayed().is_empty());
}

#[test]
fn unknown_category_key_is_rejected() {
    let mut engine = CatalogFilterEngine::new();
    let err = engine.select_category("meat").expect_err("unknown key");
    assert!(matches!(err, MarketError::InvalidInput(_)));
}

#[test]
fn load_applies_pending_handoff_and_refresh_keeps_active_filter() {
    let handoff = HandoffChannel::new();
    handoff.publish(ProductCategory::Fruit);

    let mut engine = CatalogFilterEngine::new();
    engine.load(sample_catalog(), &handoff);
    assert_eq!(
        engine.active(),
        CategoryFilter::Category(ProductCategory::Fruit)
    );

    // Refreshing the data with no new handoff keeps the active filter.
    engine.load(sample_catalog(), &handoff);
    assert_eq!(
        engine.active(),
        CategoryFilter::Category(ProductCategory::Fruit)
    );

    // A fresh handoff published before the next refresh takes precedence.
    handoff.publish(ProductCategory::Grain);
    engine.load(sample_catalog(), &handoff);
    assert_eq!(
        engine.active(),
        CategoryFilter::Category(ProductCategory::Grain)
    );
}

#[tokio::test]
async fn category_browse_handoff_scenario() {
    let gateway = Arc::new(TestMarketGateway::with_products(sample_catalog()));
    let client = client_with_gateway(gateway);
    log_in_as(&client, Role::Consumer).await;

    // Category browser publishes "fruit", then the catalog view loads.
    client.handoff().publish(ProductCategory::Fruit);
    let scope = ViewScope::new();
    let mut engine = CatalogFilterEngine::new();
    let applied = client
        .load_catalog(&scope.enter(), &mut engine)
        .await
        .expect("load");
    assert!(applied);
    assert!(engine
        .displayed()
        .iter()
        .all(|p| p.category == ProductCategory::Fruit));

    // A later unrelated catalog visit starts fresh and shows everything.
    let mut second_visit = CatalogFilterEngine::new();
    let applied = client
        .load_catalog(&scope.enter(), &mut second_visit)
        .await
        .expect("second load");
    assert!(applied);
    assert_eq!(second_visit.active(), CategoryFilter::All);
    assert_eq!(second_visit.displayed().len(), 4);
}

#[tokio::test]
async fn dismissed_view_discards_catalog_result() {
    let gateway = Arc::new(TestMarketGateway::with_products(sample_catalog()));
    let client = client_with_gateway(gateway);
    log_in_as(&client, Role::Consumer).await;

    let scope = ViewScope::new();
    let ticket = scope.enter();
    scope.dismiss();

    let mut engine = CatalogFilterEngine::new();
    let applied = client
        .load_catalog(&ticket, &mut engine)
        .await
        .expect("load completes");
    assert!(!applied);
    assert!(engine.full_set().is_empty());
}

#[test]
fn view_ticket_tracks_generations() {
    let scope = ViewScope::new();
    let first = scope.enter();
    assert!(first.is_current());
    assert_eq!(first.apply(7), Some(7));

    scope.dismiss();
    assert!(!first.is_current());
    assert_eq!(first.apply(7), None);

    let second = scope.enter();
    assert!(second.is_current());
}

// --- order lifecycle -------------------------------------------------------

#[tokio::test]
async fn place_rejects_non_positive_quantity() {
    let gateway = Arc::new(TestMarketGateway::default());
    let client = client_with_gateway(Arc::clone(&gateway));
    log_in_as(&client, Role::Consumer).await;

    let tomatoes = product("p1", "Tomatoes", ProductCategory::Vegetable);
    let err = client
        .place_order(&tomatoes, 0)
        .await
        .expect_err("zero quantity");
    assert!(matches!(err, MarketError::InvalidInput(_)));
    assert!(gateway.placed.lock().expect("lock").is_empty());
}

#[tokio::test]
async fn place_requires_a_consumer_session() {
    let client = client_with_gateway(Arc::new(TestMarketGateway::default()));
    let tomatoes = product("p1", "Tomatoes", ProductCategory::Vegetable);

    let err = client.place_order(&tomatoes, 5).await.expect_err("no token");
    assert_eq!(err, MarketError::Unauthenticated);

    log_in_as(&client, Role::Producer).await;
    let err = client
        .place_order(&tomatoes, 5)
        .await
        .expect_err("wrong role");
    assert!(matches!(err, MarketError::Forbidden(_)));
}

#[tokio::test]
async fn place_captures_snapshot_at_call_time() {
    let gateway = Arc::new(TestMarketGateway::default());
    let client = client_with_gateway(Arc::clone(&gateway));
    log_in_as(&client, Role::Consumer).await;

    let mut mangoes = product("p2", "Alphonso Mangoes", ProductCategory::Fruit);
    mangoes.unit = Unit::PerDozen;

    let placed = client.place_order(&mangoes, 5).await.expect("placed");
    assert_eq!(placed.status, OrderStatus::Processing);
    assert_eq!(placed.product_details.name, "Alphonso Mangoes");
    assert_eq!(placed.product_details.quantity, "5 dozen");

    // The product changing afterwards does not touch the snapshot.
    mangoes.name = "Kesar Mangoes".to_string();
    let requests = gateway.placed.lock().expect("lock");
    assert_eq!(requests[0].product_details.name, "Alphonso Mangoes");
}

#[tokio::test]
async fn advance_walks_the_full_sequence_then_stops() {
    let placed = order("o1", OrderStatus::Processing, Utc::now());
    let gateway = Arc::new(TestMarketGateway::with_orders(vec![placed.clone()]));
    let client = client_with_gateway(Arc::clone(&gateway));
    log_in_as(&client, Role::Producer).await;

    let shipped = client.advance_order(&placed).await.expect("to shipped");
    assert_eq!(shipped.status, OrderStatus::Shipped);

    let delivered = client.advance_order(&shipped).await.expect("to delivered");
    assert_eq!(delivered.status, OrderStatus::Delivered);

    let err = client
        .advance_order(&delivered)
        .await
        .expect_err("terminal");
    assert_eq!(err, MarketError::AlreadyTerminal);

    // Exactly two remote writes, each a single step.
    let writes = gateway.advanced.lock().expect("lock");
    assert_eq!(
        *writes,
        vec![
            (OrderId("o1".to_string()), OrderStatus::Shipped),
            (OrderId("o1".to_string()), OrderStatus::Delivered),
        ]
    );
}

#[tokio::test]
async fn advance_rejects_terminal_orders_for_any_role() {
    let delivered = order("o1", OrderStatus::Delivered, Utc::now());
    let gateway = Arc::new(TestMarketGateway::with_orders(vec![delivered.clone()]));
    let client = client_with_gateway(Arc::clone(&gateway));

    for role in [Role::Producer, Role::Consumer] {
        log_in_as(&client, role).await;
        let err = client
            .advance_order(&delivered)
            .await
            .expect_err("terminal");
        assert_eq!(err, MarketError::AlreadyTerminal);
    }
    assert!(gateway.advanced.lock().expect("lock").is_empty());
}

#[tokio::test]
async fn advance_by_consumer_is_forbidden_for_non_terminal_orders() {
    let client = client_with_gateway(Arc::new(TestMarketGateway::default()));
    log_in_as(&client, Role::Consumer).await;

    for status in [OrderStatus::Processing, OrderStatus::Shipped] {
        let current = order("o1", status, Utc::now());
        let err = client.advance_order(&current).await.expect_err("forbidden");
        assert!(matches!(err, MarketError::Forbidden(_)));
    }
}

#[tokio::test]
async fn advance_applies_the_server_confirmed_record() {
    // The service returns an order that differs from the locally computed
    // next step (e.g. a concurrent client already shipped it).
    let mut concurrent = order("o1", OrderStatus::Processing, Utc::now());
    concurrent.customer_name = Some("Ravi".to_string());
    let gateway = Arc::new(TestMarketGateway::with_orders(vec![concurrent]));
    let client = client_with_gateway(gateway);
    log_in_as(&client, Role::Producer).await;

    let local = order("o1", OrderStatus::Processing, Utc::now());
    let updated = client.advance_order(&local).await.expect("advanced");
    // Everything about the result comes from the server response, not the
    // local record.
    assert_eq!(updated.customer_name.as_deref(), Some("Ravi"));
}

#[tokio::test]
async fn listings_are_sorted_newest_first() {
    let now = Utc::now();
    let oldest = order("o-old", OrderStatus::Delivered, now - Duration::hours(3));
    let middle = order("o-mid", OrderStatus::Shipped, now - Duration::hours(2));
    let newest = order("o-new", OrderStatus::Processing, now - Duration::hours(1));
    let gateway = Arc::new(TestMarketGateway::with_orders(vec![
        oldest.clone(),
        newest.clone(),
        middle.clone(),
    ]));
    let client = client_with_gateway(Arc::clone(&gateway));

    log_in_as(&client, Role::Consumer).await;
    let mine = client.my_orders().await.expect("my orders");
    let ids: Vec<&str> = mine.iter().map(|o| o.id.0.as_str()).collect();
    assert_eq!(ids, ["o-new", "o-mid", "o-old"]);

    log_in_as(&client, Role::Producer).await;
    let incoming = client.producer_orders().await.expect("producer orders");
    let ids: Vec<&str> = incoming.iter().map(|o| o.id.0.as_str()).collect();
    assert_eq!(ids, ["o-new", "o-mid", "o-old"]);
}

#[tokio::test]
async fn create_product_validates_before_remote_call() {
    let client = client_with_gateway(Arc::new(TestMarketGateway::default()));
    log_in_as(&client, Role::Producer).await;

    let listing = NewProduct {
        name: "  ".to_string(),
        description: String::new(),
        category: ProductCategory::Vegetable,
        quantity: 10,
        price: 40.0,
        unit: Unit::PerKg,
    };
    let err = client
        .create_product(listing.clone())
        .await
        .expect_err("blank name");
    assert!(matches!(err, MarketError::InvalidInput(_)));

    let err = client
        .create_product(NewProduct {
            name: "Tomatoes".to_string(),
            price: 0.0,
            ..listing
        })
        .await
        .expect_err("non-positive price");
    assert!(matches!(err, MarketError::InvalidInput(_)));
}
