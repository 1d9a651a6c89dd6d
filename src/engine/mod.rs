pub mod core;
pub mod messages;
pub mod state;
pub mod worker;

// Re-export key components
pub use core::{ChartEngine, ViewRequest};
pub use messages::SeriesId;
pub use state::SeriesState;
