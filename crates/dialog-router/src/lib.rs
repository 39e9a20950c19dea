pub mod checker;
pub mod error;
pub mod messages;
pub mod preflight;
pub mod router;
pub mod tasks;

pub use error::{RouterError, RouterResult};
pub use router::Router;
