pub mod bootstrap;
pub mod proxy_engine;
pub mod signature_cache;
pub mod state;
pub mod upstream_client;
