//! Data contracts for the field, user and order services.
//!
//! - `Field`, `FieldDetail`, `ScheduleSlot`: field catalogue and hourly slots
//! - `UserProfile` and the auth form requests, with client-side validation
//! - `OrderSummary`, `CreatedOrder`: booking history and checkout

pub mod field;
pub mod order;
pub mod user;

pub use field::{Field, FieldDetail, Price, ScheduleSlot, SlotStatus};
pub use order::{CreateOrderRequest, CreatedOrder, OrderStatus, OrderSummary};
pub use user::{FieldError, LoginRequest, RegisterRequest, UpdateUserRequest, UserProfile};
