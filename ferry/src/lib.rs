pub mod aws;
pub mod config;
pub mod controller;

pub use config::FerryConfig;
pub use controller::Ferry;
