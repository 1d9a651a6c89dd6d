pub mod search;
pub mod smoothing;
pub mod time_utils;

pub use time_utils::TimeUtils;
