use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

pub const DEFAULT_CUSTOMER_NAME: &str = "Customer";
pub const DEFAULT_WAITER_NAME: &str = "Waiter";

macro_rules! id_newtype {
    ($name:ident) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, ToSchema)]
        #[serde(transparent)]
        pub struct $name(pub i64);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                self.0.fmt(f)
            }
        }
    };
}

id_newtype!(OrderId);
id_newtype!(TableId);

/// Kitchen lifecycle of an order.
///
/// The variants are declared in lifecycle order; `next` walks that order.
/// Nothing on the server side forces transitions to move forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
pub enum OrderStatus {
    Pending,
    InPreparation,
    ReadyToServe,
}

impl OrderStatus {
    pub const ALL: [OrderStatus; 3] = [
        OrderStatus::Pending,
        OrderStatus::InPreparation,
        OrderStatus::ReadyToServe,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            OrderStatus::Pending => "Pending",
            OrderStatus::InPreparation => "InPreparation",
            OrderStatus::ReadyToServe => "ReadyToServe",
        }
    }

    pub fn next(self) -> Option<OrderStatus> {
        match self {
            OrderStatus::Pending => Some(OrderStatus::InPreparation),
            OrderStatus::InPreparation => Some(OrderStatus::ReadyToServe),
            OrderStatus::ReadyToServe => None,
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown order status '{0}'")]
pub struct UnknownStatus(pub String);

impl FromStr for OrderStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        OrderStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| UnknownStatus(s.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: OrderId,
    pub table: String,
    pub customer_name: String,
    pub items: Vec<String>,
    pub status: OrderStatus,
    pub waiter_name: String,
    pub created_at: DateTime<Utc>,
}

/// Already-validated input for creating an order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewOrder {
    pub table: String,
    pub items: Vec<String>,
    pub waiter_name: Option<String>,
}

impl NewOrder {
    /// Waiter name to record, falling back to the generic label when the
    /// client sent nothing or an empty string.
    pub fn waiter_name_or_default(&self) -> String {
        self.waiter_name
            .as_deref()
            .filter(|name| !name.is_empty())
            .unwrap_or(DEFAULT_WAITER_NAME)
            .to_string()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum OccupancyState {
    Occupied,
    Available,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Table {
    pub id: TableId,
    pub table_number: i64,
    pub customer_name: String,
    pub capacity: u32,
    pub occupancy_state: OccupancyState,
}
