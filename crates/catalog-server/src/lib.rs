pub mod assets;
pub mod config;
pub mod error;
pub mod routes;
pub mod server;
pub mod types;

pub use assets::*;
pub use config::*;
pub use error::*;
pub use routes::{create_router, AppState};
pub use server::CatalogServer;
pub use types::*;
