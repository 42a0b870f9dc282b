pub mod api;
pub mod chunk;
pub mod collection;
pub mod config;
pub mod context;
pub mod conversation;
pub mod env;
pub mod error;
pub mod gateway;
pub mod http;
pub mod import;
pub mod model;
pub mod notice;
pub mod state;
pub mod sync_gate;
pub mod wait;
