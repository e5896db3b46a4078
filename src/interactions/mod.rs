//! Per-viewer like/dislike/star interactions: the pure transition rules and
//! the optimistic per-card controller built on them.

pub mod controller;
pub mod state;

pub use controller::{CardState, InteractionController, InteractionError, Phase, RefreshCallback};
pub use state::{CountDelta, InteractionCounts, InteractionKind, InteractionState};
