pub mod config;
pub mod engine;
pub mod error;
pub mod output;
pub mod outputs;
pub mod runtime;
pub mod session;

pub use config::*;
pub use engine::*;
pub use error::*;
pub use output::*;
pub use runtime::{SessionCommand, SessionHandle, SessionRuntime};
pub use session::*;
