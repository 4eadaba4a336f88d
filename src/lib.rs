//! Library crate for quest-hunt-back, exposing modules for integration tests.

mod config;
pub mod dao;
mod dto;
mod error;
pub mod orders;
pub mod routes;
pub mod services;
pub mod state;
