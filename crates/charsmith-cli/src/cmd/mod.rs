pub mod config;
pub mod deploy;
pub mod fly_toml;
pub mod generate;
pub mod schema;
pub mod validate;
