pub mod common;
pub mod config;
pub mod jsonfile;
pub mod service;
pub mod ultradns;

pub use config::*;
