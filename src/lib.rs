// src/lib.rs

pub mod catalog;
pub mod config;
pub mod error;
pub mod handlers;
pub mod models;
pub mod recommend;
pub mod routes;
pub mod scroll;
pub mod session;
pub mod state;
pub mod store;
pub mod utils;

pub use routes::create_router;
