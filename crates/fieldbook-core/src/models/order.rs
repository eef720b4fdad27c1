use std::fmt;

use serde::{Deserialize, Serialize};

use super::field::Price;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OrderStatus {
    Pending,
    PendingPayment,
    PaymentSuccess,
    Expired,
}

impl OrderStatus {
    pub fn is_paid(&self) -> bool {
        matches!(self, OrderStatus::PaymentSuccess)
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            OrderStatus::Pending => "Pending",
            OrderStatus::PendingPayment => "Awaiting payment",
            OrderStatus::PaymentSuccess => "Paid",
            OrderStatus::Expired => "Expired",
        };
        f.write_str(label)
    }
}

/// Body of a booking request.
#[derive(Debug, Clone, Serialize)]
pub struct CreateOrderRequest {
    #[serde(rename = "fieldScheduleIDs")]
    pub field_schedule_ids: Vec<String>,
}

/// Order as returned right after creation; the payment link is where the
/// user completes payment.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedOrder {
    pub uuid: String,
    pub code: String,
    pub amount: Price,
    pub status: OrderStatus,
    pub payment_link: String,
}

/// Row of the booking history.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderSummary {
    pub code: String,
    pub amount: Price,
    pub status: OrderStatus,
    pub order_date: String,
    pub payment_link: String,
    #[serde(default)]
    pub invoice_link: Option<String>,
}

impl OrderSummary {
    /// Invoice link, only once one has been issued.
    pub fn invoice(&self) -> Option<&str> {
        self.invoice_link.as_deref().filter(|link| !link.is_empty())
    }
}
