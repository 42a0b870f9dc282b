pub mod chat;
pub mod chunk;
pub mod collection;
pub mod config_source;
pub mod embed;
pub mod factory;
pub mod gateway;
pub mod http_client;
pub mod notices;
pub mod services;
pub mod sync_status;
pub mod vault;
