//! Orders created by checkout.

mod model;
mod state;

pub use model::{Address, Order, OrderLine, PaymentInfo, PaymentMethod, PaymentStatus};
pub use state::OrderStatus;
