pub mod edit_distance;
pub mod error_rate;
pub mod state;
