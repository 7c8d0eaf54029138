use crate::gemini::generate_content::response::GenerateContentResponse;

/// Each SSE chunk of `streamGenerateContent` is shaped identically to a
/// unary `generateContent` response; only the candidates are partial.
pub type StreamGenerateContentResponse = GenerateContentResponse;
