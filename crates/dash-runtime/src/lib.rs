//! Dashboard reactive runtime
//!
//! Owns the lifecycle of one dashboard instance: full re-parse on content
//! change, initial bulk query execution, input-driven partial
//! re-execution, and render-tree production. Per-query runtime state
//! lives here and nowhere else.

pub mod controller;
pub mod inputs;
pub mod render;
pub mod sanitize;

pub use controller::{DashboardController, DashboardView, QueryRuntimeState};
pub use inputs::{
    affected_queries, apply_inputs_to_query, initial_input_state, input_state_to_params,
};
pub use render::{
    InputControl, InputView, Placeholder, RenderNode, RenderedDashboard,
};
pub use sanitize::{HtmlSanitizer, StructuralSanitizer};
