pub mod constants;
pub mod error;
pub mod predicate_map;
pub mod types;
