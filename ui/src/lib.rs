//! Bazaar marketplace front end: product listings with a cascading address
//! filter, and a floating buyer/seller chat panel.

pub mod api;
pub mod chat;
pub mod components;
pub mod config;
pub mod timer;
