pub mod catalog;
pub mod detection;
pub mod error;
pub mod models;
pub mod queue;
pub mod resolver;
pub mod traits;

pub use catalog::*;
pub use detection::*;
pub use error::*;
pub use models::*;
pub use queue::*;
pub use resolver::*;
pub use traits::*;
