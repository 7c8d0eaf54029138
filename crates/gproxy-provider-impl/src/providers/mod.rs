//! Concrete `UpstreamProvider` implementations, one submodule per channel.

mod http_client;
mod oauth_common;

pub mod geminicli;
