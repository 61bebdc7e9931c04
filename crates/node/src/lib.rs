#![doc = include_str!("../README.md")]
pub mod config;
pub mod endpoint;
pub mod error;
pub mod logging;
pub mod prelude;
pub mod processor;
#[cfg(test)]
mod tests;
pub mod util;
