pub mod generation;
pub mod staging;
pub mod store;
