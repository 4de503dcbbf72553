pub mod api;
pub mod config;
pub mod dispatch;
pub mod engine;
pub mod humanize;
pub mod observability;
pub mod proto;
pub mod state;
