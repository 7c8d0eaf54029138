mod admin;
mod proxy;
mod rate_limit;

pub use admin::{AdminState, admin_router};
pub use proxy::{ProxyState, proxy_router};
