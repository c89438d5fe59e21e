pub mod builder;
pub mod definition;
pub mod forecast;
pub mod suite;
pub mod trigger;
pub mod utils;
