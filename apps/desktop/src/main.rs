use std::sync::Arc;

use anyhow::{anyhow, bail, Result};
use clap::{Parser, Subcommand};

use client_core::{
    access_denied_notice, Admission, CatalogFilterEngine, MarketClient, RegisterInput, ViewScope,
};
use shared::{
    domain::{OrderId, ProductCategory, Role, Unit},
    protocol::{NewProduct, Order, Product},
};
use storage::Storage;

#[derive(Parser, Debug)]
#[command(name = "agriconnect", about = "AgriConnect marketplace client")]
struct Args {
    /// Base URL of the catalog/order service.
    #[arg(long, default_value = "http://localhost:5001")]
    server_url: String,
    /// Where the session state lives between runs.
    #[arg(long, default_value = "sqlite://agriconnect-state.db")]
    state_db: String,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create a new account.
    Register {
        #[arg(long)]
        full_name: String,
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
        #[arg(long)]
        confirm_password: String,
        /// Producer or Consumer.
        #[arg(long)]
        role: Role,
    },
    /// Sign in as the given role.
    Login {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
        /// Producer or Consumer.
        #[arg(long)]
        role: Role,
    },
    /// Clear the stored session.
    Logout,
    /// Browse the category cards; picking one pre-selects the catalog filter.
    Categories {
        /// Jump straight to the catalog filtered by this category.
        #[arg(long)]
        pick: Option<String>,
    },
    /// Consumer catalog, optionally filtered by category key.
    Browse {
        #[arg(long)]
        category: Option<String>,
    },
    /// Product detail by id.
    Show {
        product_id: String,
        /// Follow the category breadcrumb into the filtered catalog.
        #[arg(long)]
        open_category: bool,
    },
    /// Place an order as the signed-in consumer.
    Order {
        product_id: String,
        #[arg(long)]
        quantity: u32,
    },
    /// The signed-in consumer's order history.
    MyOrders,
    /// The signed-in producer's listed products.
    MyProducts,
    /// List a new product as the signed-in producer.
    AddProduct {
        #[arg(long)]
        name: String,
        #[arg(long, default_value = "")]
        description: String,
        /// vegetable, fruit, grain or dairy.
        #[arg(long)]
        category: String,
        #[arg(long)]
        quantity: u32,
        #[arg(long)]
        price: f64,
        /// kg, piece, dozen or quintal.
        #[arg(long, default_value = "kg")]
        unit: String,
    },
    /// Incoming orders for the signed-in producer.
    IncomingOrders,
    /// Advance an incoming order one fulfillment step.
    Advance { order_id: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt().init();
    let args = Args::parse();

    let storage = Storage::new(&args.state_db).await?;
    let client = MarketClient::connect(&args.server_url, Arc::new(storage));
    client.restore_session().await?;

    match args.command {
        Command::Register {
            full_name,
            email,
            password,
            confirm_password,
            role,
        } => {
            client
                .register(RegisterInput {
                    full_name,
                    email,
                    password,
                    confirm_password,
                    role,
                })
                .await?;
            println!("Account created successfully. You can now log in.");
        }
        Command::Login {
            email,
            password,
            role,
        } => {
            let response = client.login(&email, &password, role).await?;
            println!("Welcome, {}!", response.name);
        }
        Command::Logout => {
            client.logout().await?;
            println!("You have been logged out.");
        }
        Command::Categories { pick } => {
            require_view(&client, Role::Consumer)?;
            match pick {
                None => {
                    println!("Categories:");
                    for category in ProductCategory::ALL {
                        println!("  {} ({})", category, category.key());
                    }
                }
                Some(key) => {
                    let category = parse_category(&key)?;
                    client.handoff().publish(category);
                    // Same navigation as picking a card: the catalog view
                    // consumes the handoff on load.
                    show_catalog(&client, None).await?;
                }
            }
        }
        Command::Browse { category } => {
            show_catalog(&client, category.as_deref()).await?;
        }
        Command::Show {
            product_id,
            open_category,
        } => {
            let product = client
                .product_detail(&shared::domain::ProductId(product_id))
                .await?;
            print_product(&product);
            println!("{}", product.description);
            if open_category {
                client.handoff().publish(product.category);
                show_catalog(&client, None).await?;
            }
        }
        Command::Order {
            product_id,
            quantity,
        } => {
            let product = client
                .product_detail(&shared::domain::ProductId(product_id))
                .await?;
            let order = client.place_order(&product, quantity).await?;
            println!(
                "Order placed: {} ({}) — {}",
                order.product_details.name, order.product_details.quantity, order.status
            );
        }
        Command::MyOrders => {
            let orders = client.my_orders().await?;
            if orders.is_empty() {
                println!("You haven't placed any orders yet.");
            }
            for order in &orders {
                print_order(order);
            }
        }
        Command::MyProducts => {
            let products = client.my_products().await?;
            if products.is_empty() {
                println!("You have no products listed yet.");
            }
            for product in &products {
                print_product(product);
            }
        }
        Command::AddProduct {
            name,
            description,
            category,
            quantity,
            price,
            unit,
        } => {
            let created = client
                .create_product(NewProduct {
                    name,
                    description,
                    category: parse_category(&category)?,
                    quantity,
                    price,
                    unit: parse_unit(&unit)?,
                })
                .await?;
            println!("\"{}\" has been successfully listed.", created.name);
        }
        Command::IncomingOrders => {
            let orders = client.producer_orders().await?;
            if orders.is_empty() {
                println!("You have no incoming orders.");
            }
            for order in &orders {
                print_order(order);
                let action = order.status.next_action();
                println!("    next action: {}", action.text);
            }
        }
        Command::Advance { order_id } => {
            let orders = client.producer_orders().await?;
            let target = OrderId(order_id);
            let order = orders
                .iter()
                .find(|o| o.id == target)
                .ok_or_else(|| anyhow!("no incoming order with id {target}"))?;
            let updated = client.advance_order(order).await?;
            println!("Order {} is now {}.", updated.id, updated.status);
        }
    }

    Ok(())
}

/// Admission check at view entry; denial redirects to the login view with a
/// notice instead of rendering anything.
fn require_view(client: &MarketClient, role: Role) -> Result<()> {
    match client.admit(role) {
        Admission::Allowed(_) => Ok(()),
        Admission::Denied(_) => bail!(access_denied_notice(role)),
    }
}

async fn show_catalog(client: &MarketClient, category: Option<&str>) -> Result<()> {
    let scope = ViewScope::new();
    let mut engine = CatalogFilterEngine::new();
    client.load_catalog(&scope.enter(), &mut engine).await?;
    if let Some(key) = category {
        engine.select_category(key)?;
    }

    println!("Catalog ({}):", engine.active().key());
    let displayed = engine.displayed();
    if displayed.is_empty() {
        println!("  No products found in this category.");
    }
    for product in displayed {
        print_product(product);
    }
    Ok(())
}

fn print_product(product: &Product) {
    let farmer = product
        .producer
        .as_ref()
        .map(|p| p.full_name.as_str())
        .unwrap_or("N/A");
    println!(
        "  [{}] {} — ₹{} / {} — in stock: {} — farmer: {}",
        product.id, product.name, product.price, product.unit, product.quantity, farmer
    );
}

fn print_order(order: &Order) {
    let customer = order.customer_name.as_deref().unwrap_or("-");
    println!(
        "  [{}] {} ({}) — {} — customer: {} — placed {}",
        order.id,
        order.product_details.name,
        order.product_details.quantity,
        order.status.label(),
        customer,
        order.created_at.format("%Y-%m-%d")
    );
}

fn parse_category(key: &str) -> Result<ProductCategory> {
    ProductCategory::from_key(key)
        .ok_or_else(|| anyhow!("unknown category '{key}' (expected one of vegetable, fruit, grain, dairy)"))
}

fn parse_unit(value: &str) -> Result<Unit> {
    let normalized = value.trim().to_ascii_lowercase();
    let unit = match normalized.trim_start_matches("per ").trim() {
        "kg" => Unit::PerKg,
        "piece" => Unit::PerPiece,
        "dozen" => Unit::PerDozen,
        "quintal" => Unit::PerQuintal,
        _ => bail!("unknown unit '{value}' (expected kg, piece, dozen or quintal)"),
    };
    Ok(unit)
}
