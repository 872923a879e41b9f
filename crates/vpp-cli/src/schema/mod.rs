pub mod allocator;
pub mod league_model;
pub mod ratings;
