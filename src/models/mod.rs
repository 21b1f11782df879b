// src/models/mod.rs

pub mod assessment;
pub mod result;
pub mod session;
pub mod theme;
pub mod user;
