#![deny(dead_code)]
#![deny(unused_variables)]
#![deny(unused_imports)]

pub mod config;
pub mod error;
pub mod extract;
pub mod processor;
pub mod types;

pub use error::{Error, Result};
