//! Checkout step names, in execution order.

/// Step name: decrement stock for every cart line.
pub const STEP_RESERVE_STOCK: &str = "reserve_stock";

/// Step name: persist the pending order.
pub const STEP_PERSIST_ORDER: &str = "persist_order";

/// Step name: record the `PLACED_ORDER` edge.
pub const STEP_RECORD_GRAPH: &str = "record_graph";

/// Step name: delete the live cart.
pub const STEP_CLEAR_CART: &str = "clear_cart";

/// Step name: recompute the user's segment.
pub const STEP_REFRESH_SEGMENT: &str = "refresh_segment";

pub const ALL_STEPS: [&str; 5] = [
    STEP_RESERVE_STOCK,
    STEP_PERSIST_ORDER,
    STEP_RECORD_GRAPH,
    STEP_CLEAR_CART,
    STEP_REFRESH_SEGMENT,
];
