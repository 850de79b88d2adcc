pub mod config;
pub mod http;

pub use config::*;
pub use http::*;
