use sea_orm::entity::prelude::*;
use time::OffsetDateTime;

/// Durable mirror of the two Claude-lineage signature-cache kinds
/// (`claude_thinking_per_tool_use`, `claude_last_thinking_per_user`) so a
/// container restart doesn't force every in-flight conversation down to
/// `thinking: disabled`. The other three kinds are in-memory only and never
/// reach this table.
#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "signature_cache")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    #[sea_orm(unique_key = "signature_cache_kind_key")]
    pub kind: String,
    #[sea_orm(unique_key = "signature_cache_kind_key")]
    pub cache_key: String,
    pub signature: String,
    pub saved_at: OffsetDateTime,
}

impl ActiveModelBehavior for ActiveModel {}
