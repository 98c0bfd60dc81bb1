//! Nyayasathi complaint client.
//!
//! Typed access to the Nyayasathi backend: authentication, complaint
//! submission, the reviewer workflow over fetched complaints and the legal
//! assistance endpoints.

pub mod assistant;
pub mod auth;
pub mod board;
pub mod client;
pub mod config;
pub mod error;
pub mod filter;
pub mod models;
pub mod rbac;
pub mod render;
pub mod repository;
pub mod session;
pub mod workflow;

#[cfg(test)]
mod testing;
