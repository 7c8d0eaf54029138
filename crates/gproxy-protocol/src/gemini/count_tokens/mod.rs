pub mod request;
pub mod response;
pub mod types;

pub use request::{CountTokensPath, CountTokensRequest, CountTokensRequestBody};
pub use response::CountTokensResponse;
pub use types::{
    Blob, CodeExecutionResult, Content, ContentRole, ExecutableCode, FileData, FunctionCall,
    FunctionResponse, FunctionResponseBlob, FunctionResponsePart, GenerateContentRequest,
    JsonValue, Language, Modality, ModalityTokenCount, Outcome, Part, Scheduling, VideoMetadata,
};
