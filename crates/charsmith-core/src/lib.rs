pub mod character;
pub mod clients;
pub mod config;
pub mod error;
pub mod fly;
pub mod generator;
pub mod paths;
pub mod prompt;
pub mod schema;
pub mod store;

#[cfg(test)]
mod fixtures;

pub use error::{CharsmithError, Result};
