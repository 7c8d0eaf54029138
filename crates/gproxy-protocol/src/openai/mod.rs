pub mod cancel_response;
pub mod compact_response;
pub mod count_tokens;
pub mod create_chat_completions;
pub mod create_response;
pub mod delete_response;
pub mod get_model;
pub mod get_response;
pub mod list_input_items;
pub mod list_models;
pub mod list_response_items;
pub mod trace_summarize;
pub mod types;

pub use types::*;
