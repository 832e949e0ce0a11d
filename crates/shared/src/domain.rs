use std::fmt;

use serde::{Deserialize, Serialize};

macro_rules! id_newtype {
    ($name:ident) => {
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub struct $name(pub String);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

id_newtype!(UserId);
id_newtype!(ProductId);
id_newtype!(OrderId);

/// The two account roles the marketplace knows about. The wire format uses
/// the capitalized names (`"Producer"` / `"Consumer"`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Role {
    Producer,
    Consumer,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Producer => "Producer",
            Role::Consumer => "Consumer",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "Producer" => Ok(Role::Producer),
            "Consumer" => Ok(Role::Consumer),
            other => Err(format!("unknown role '{other}'")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProductCategory {
    Vegetable,
    Fruit,
    Grain,
    Dairy,
}

impl ProductCategory {
    pub const ALL: [ProductCategory; 4] = [
        ProductCategory::Vegetable,
        ProductCategory::Fruit,
        ProductCategory::Grain,
        ProductCategory::Dairy,
    ];

    /// Lowercase filter key used by the catalog view.
    pub fn key(&self) -> &'static str {
        match self {
            ProductCategory::Vegetable => "vegetable",
            ProductCategory::Fruit => "fruit",
            ProductCategory::Grain => "grain",
            ProductCategory::Dairy => "dairy",
        }
    }

    /// Case-insensitive parse of a filter key.
    pub fn from_key(key: &str) -> Option<Self> {
        let key = key.to_ascii_lowercase();
        Self::ALL.iter().copied().find(|c| c.key() == key)
    }
}

impl fmt::Display for ProductCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProductCategory::Vegetable => f.write_str("Vegetable"),
            ProductCategory::Fruit => f.write_str("Fruit"),
            ProductCategory::Grain => f.write_str("Grain"),
            ProductCategory::Dairy => f.write_str("Dairy"),
        }
    }
}

/// Pricing unit as served by the API (`"per kg"` etc.).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Unit {
    #[serde(rename = "per kg")]
    PerKg,
    #[serde(rename = "per piece")]
    PerPiece,
    #[serde(rename = "per dozen")]
    PerDozen,
    #[serde(rename = "per quintal")]
    PerQuintal,
}

impl Unit {
    pub fn as_str(&self) -> &'static str {
        match self {
            Unit::PerKg => "per kg",
            Unit::PerPiece => "per piece",
            Unit::PerDozen => "per dozen",
            Unit::PerQuintal => "per quintal",
        }
    }

    /// Bare unit name without the "per " prefix, for quantity labels such as
    /// "5 kg".
    pub fn bare(&self) -> &'static str {
        match self {
            Unit::PerKg => "kg",
            Unit::PerPiece => "piece",
            Unit::PerDozen => "dozen",
            Unit::PerQuintal => "quintal",
        }
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fulfillment status of an order. The sequence is fixed: an order only ever
/// moves forward, one step at a time, and `Delivered` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderStatus {
    Processing,
    Shipped,
    Delivered,
}

impl OrderStatus {
    /// The single transition table. `None` means the status is terminal.
    pub fn next(&self) -> Option<OrderStatus> {
        match self {
            OrderStatus::Processing => Some(OrderStatus::Shipped),
            OrderStatus::Shipped => Some(OrderStatus::Delivered),
            OrderStatus::Delivered => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.next().is_none()
    }

    /// Badge text shown by both producer and consumer views.
    pub fn label(&self) -> &'static str {
        match self {
            OrderStatus::Processing => "Processing",
            OrderStatus::Shipped => "Shipped",
            OrderStatus::Delivered => "Delivered",
        }
    }

    /// What the fulfillment button should offer for an order in this status.
    pub fn next_action(&self) -> NextAction {
        match self.next() {
            Some(OrderStatus::Shipped) => NextAction {
                text: "Mark as Shipped",
                target: Some(OrderStatus::Shipped),
            },
            Some(OrderStatus::Delivered) => NextAction {
                text: "Mark as Delivered",
                target: Some(OrderStatus::Delivered),
            },
            _ => NextAction {
                text: "Completed",
                target: None,
            },
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Presentation of the producer's advance action. `target: None` means the
/// action is disabled, not merely hidden.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NextAction {
    pub text: &'static str,
    pub target: Option<OrderStatus>,
}

impl NextAction {
    pub fn is_disabled(&self) -> bool {
        self.target.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_sequence_is_fixed_and_terminal() {
        assert_eq!(OrderStatus::Processing.next(), Some(OrderStatus::Shipped));
        assert_eq!(OrderStatus::Shipped.next(), Some(OrderStatus::Delivered));
        assert_eq!(OrderStatus::Delivered.next(), None);
        assert!(OrderStatus::Delivered.is_terminal());
        assert!(!OrderStatus::Processing.is_terminal());
    }

    #[test]
    fn next_action_matches_status() {
        let action = OrderStatus::Processing.next_action();
        assert_eq!(action.text, "Mark as Shipped");
        assert!(!action.is_disabled());

        let action = OrderStatus::Delivered.next_action();
        assert_eq!(action.text, "Completed");
        assert!(action.is_disabled());
    }

    #[test]
    fn category_keys_round_trip_case_insensitively() {
        for category in ProductCategory::ALL {
            assert_eq!(ProductCategory::from_key(category.key()), Some(category));
            assert_eq!(
                ProductCategory::from_key(&category.key().to_ascii_uppercase()),
                Some(category)
            );
        }
        assert_eq!(ProductCategory::from_key("meat"), None);
    }

    #[test]
    fn unit_serializes_with_wire_names() {
        let json = serde_json::to_string(&Unit::PerKg).expect("serialize");
        assert_eq!(json, "\"per kg\"");
        let unit: Unit = serde_json::from_str("\"per dozen\"").expect("deserialize");
        assert_eq!(unit, Unit::PerDozen);
    }
}
