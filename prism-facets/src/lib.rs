pub mod config;
pub mod error;
pub mod facet;
pub mod index;
pub mod logging;
pub mod response;
pub mod search;

#[cfg(test)]
mod testing;

pub use config::Config;
pub use error::{Error, Result};
