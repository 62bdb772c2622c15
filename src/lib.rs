// src/lib.rs

//! Hoops aggregator library

pub mod error;
pub mod identity;
pub mod models;
pub mod pipeline;
pub mod render;
pub mod sources;
pub mod utils;

#[cfg(test)]
mod testing;
