pub mod request;
pub mod response;
pub mod types;

pub use request::{CountTokensHeaders, CountTokensRequest, CountTokensRequestBody};
pub use response::{
    BetaCountTokensContextManagementResponse, BetaMessageTokensCount, CountTokensResponse,
};
pub use types::*;
