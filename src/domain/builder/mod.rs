pub mod admin;
pub mod stage;
pub mod suite_builder;


pub use suite_builder::{ForecastSuite, SuiteBuilder};
