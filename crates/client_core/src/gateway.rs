use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use tracing::warn;

use shared::{
    domain::{OrderId, ProductId},
    error::MarketError,
    protocol::{
        AdvanceOrderRequest, LoginRequest, LoginResponse, NewProduct, Order, PlaceOrderRequest,
        Product, RegisterRequest,
    },
};

/// Remote catalog/order service contract. Authenticated operations take the
/// opaque bearer token; the gateway never reads ambient session state.
#[async_trait]
pub trait MarketGateway: Send + Sync {
    async fn login(&self, request: &LoginRequest) -> Result<LoginResponse, MarketError>;
    async fn register(&self, request: &RegisterRequest) -> Result<(), MarketError>;
    async fn list_products(&self) -> Result<Vec<Product>, MarketError>;
    async fn get_product(&self, product_id: &ProductId) -> Result<Product, MarketError>;
    async fn my_products(&self, token: &str) -> Result<Vec<Product>, MarketError>;
    async fn create_product(
        &self,
        token: &str,
        product: &NewProduct,
    ) -> Result<Product, MarketError>;
    async fn place_order(
        &self,
        token: &str,
        request: &PlaceOrderRequest,
    ) -> Result<Order, MarketError>;
    async fn my_orders(&self, token: &str) -> Result<Vec<Order>, MarketError>;
    async fn producer_orders(&self, token: &str) -> Result<Vec<Order>, MarketError>;
    async fn advance_order(
        &self,
        token: &str,
        order_id: &OrderId,
        request: &AdvanceOrderRequest,
    ) -> Result<Order, MarketError>;
}

/// Null object for wiring paths where no service is configured.
pub struct MissingMarketGateway;

#[async_trait]
impl MarketGateway for MissingMarketGateway {
    async fn login(&self, _request: &LoginRequest) -> Result<LoginResponse, MarketError> {
        Err(unavailable())
    }

    async fn register(&self, _request: &RegisterRequest) -> Result<(), MarketError> {
        Err(unavailable())
    }

    async fn list_products(&self) -> Result<Vec<Product>, MarketError> {
        Err(unavailable())
    }

    async fn get_product(&self, _product_id: &ProductId) -> Result<Product, MarketError> {
        Err(unavailable())
    }

    async fn my_products(&self, _token: &str) -> Result<Vec<Product>, MarketError> {
        Err(unavailable())
    }

    async fn create_product(
        &self,
        _token: &str,
        _product: &NewProduct,
    ) -> Result<Product, MarketError> {
        Err(unavailable())
    }

    async fn place_order(
        &self,
        _token: &str,
        _request: &PlaceOrderRequest,
    ) -> Result<Order, MarketError> {
        Err(unavailable())
    }

    async fn my_orders(&self, _token: &str) -> Result<Vec<Order>, MarketError> {
        Err(unavailable())
    }

    async fn producer_orders(&self, _token: &str) -> Result<Vec<Order>, MarketError> {
        Err(unavailable())
    }

    async fn advance_order(
        &self,
        _token: &str,
        _order_id: &OrderId,
        _request: &AdvanceOrderRequest,
    ) -> Result<Order, MarketError> {
        Err(unavailable())
    }
}

fn unavailable() -> MarketError {
    MarketError::remote("market gateway is unavailable")
}

/// HTTP/JSON gateway over reqwest, speaking the contract in the service's
/// `/api` namespace.
pub struct HttpMarketGateway {
    http: Client,
    server_url: String,
}

impl HttpMarketGateway {
    pub fn new(server_url: impl Into<String>) -> Self {
        let server_url = server_url.into();
        Self {
            http: Client::new(),
            server_url: server_url.trim_end_matches('/').to_string(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.server_url)
    }
}

#[async_trait]
impl MarketGateway for HttpMarketGateway {
    async fn login(&self, request: &LoginRequest) -> Result<LoginResponse, MarketError> {
        let response = self
            .http
            .post(self.url("/api/auth/login"))
            .json(request)
            .send()
            .await
            .map_err(transport)?;
        decode(response, "login").await
    }

    async fn register(&self, request: &RegisterRequest) -> Result<(), MarketError> {
        let response = self
            .http
            .post(self.url("/api/auth/register"))
            .json(request)
            .send()
            .await
            .map_err(transport)?;
        ok_status(response, "registration")?;
        Ok(())
    }

    async fn list_products(&self) -> Result<Vec<Product>, MarketError> {
        let response = self
            .http
            .get(self.url("/api/products"))
            .send()
            .await
            .map_err(transport)?;
        decode(response, "product list").await
    }

    async fn get_product(&self, product_id: &ProductId) -> Result<Product, MarketError> {
        let response = self
            .http
            .get(self.url(&format!("/api/products/{product_id}")))
            .send()
            .await
            .map_err(transport)?;
        decode(response, "product").await
    }

    async fn my_products(&self, token: &str) -> Result<Vec<Product>, MarketError> {
        let response = self
            .http
            .get(self.url("/api/producer/my-products"))
            .bearer_auth(token)
            .send()
            .await
            .map_err(transport)?;
        decode(response, "producer product list").await
    }

    async fn create_product(
        &self,
        token: &str,
        product: &NewProduct,
    ) -> Result<Product, MarketError> {
        let response = self
            .http
            .post(self.url("/api/producer/products"))
            .bearer_auth(token)
            .json(product)
            .send()
            .await
            .map_err(transport)?;
        decode(response, "product creation").await
    }

    async fn place_order(
        &self,
        token: &str,
        request: &PlaceOrderRequest,
    ) -> Result<Order, MarketError> {
        let response = self
            .http
            .post(self.url("/api/orders"))
            .bearer_auth(token)
            .json(request)
            .send()
            .await
            .map_err(transport)?;
        decode(response, "order placement").await
    }

    async fn my_orders(&self, token: &str) -> Result<Vec<Order>, MarketError> {
        let response = self
            .http
            .get(self.url("/api/orders/my-orders"))
            .bearer_auth(token)
            .send()
            .await
            .map_err(transport)?;
        decode(response, "order history").await
    }

    async fn producer_orders(&self, token: &str) -> Result<Vec<Order>, MarketError> {
        let response = self
            .http
            .get(self.url("/api/orders/producer-orders"))
            .bearer_auth(token)
            .send()
            .await
            .map_err(transport)?;
        decode(response, "incoming orders").await
    }

    async fn advance_order(
        &self,
        token: &str,
        order_id: &OrderId,
        request: &AdvanceOrderRequest,
    ) -> Result<Order, MarketError> {
        let response = self
            .http
            .put(self.url(&format!("/api/orders/{order_id}/status")))
            .bearer_auth(token)
            .json(request)
            .send()
            .await
            .map_err(transport)?;
        decode(response, "status update").await
    }
}

fn transport(err: reqwest::Error) -> MarketError {
    warn!("transport failure: {err}");
    MarketError::remote(err.to_string())
}

fn ok_status(response: Response, what: &str) -> Result<Response, MarketError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    warn!(%status, "{what} request failed");
    Err(match status {
        StatusCode::UNAUTHORIZED => MarketError::Unauthenticated,
        StatusCode::FORBIDDEN => MarketError::forbidden(format!("{what} refused for this account")),
        StatusCode::NOT_FOUND => MarketError::not_found(what.to_string()),
        StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => {
            MarketError::invalid_input(format!("{what} rejected by the service"))
        }
        _ => MarketError::remote(format!("{what} failed with status {status}")),
    })
}

async fn decode<T: DeserializeOwned>(response: Response, what: &str) -> Result<T, MarketError> {
    let response = ok_status(response, what)?;
    response
        .json::<T>()
        .await
        .map_err(|err| MarketError::remote(format!("invalid {what} response: {err}")))
}
