mod comparison;
mod config;
mod error;
mod models;
mod provider;

pub(crate) use comparison::*;
pub(crate) use config::*;
pub use error::*;
pub use models::*;
pub use provider::*;
