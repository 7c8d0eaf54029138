use std::collections::HashMap;

use gproxy_protocol::claude::count_tokens::types::{
    BetaContentBlockParam as ClaudeContentBlockParam, BetaDocumentSource as ClaudeDocumentSource,
    BetaImageMediaType as ClaudeImageMediaType, BetaImageSource as ClaudeImageSource,
    BetaJSONOutputFormat as ClaudeJSONOutputFormat, BetaMessageContent as ClaudeMessageContent,
    BetaMessageParam as ClaudeMessageParam, BetaMessageRole as ClaudeMessageRole,
    BetaOutputConfig as ClaudeOutputConfig, BetaOutputEffort as ClaudeOutputEffort,
    BetaRequestDocumentBlock as ClaudeDocumentBlock, BetaSystemParam as ClaudeSystemParam,
    BetaThinkingConfigParam as ClaudeThinkingConfigParam, BetaTool as ClaudeTool,
    BetaToolBuiltin as ClaudeToolBuiltin, BetaToolChoice as ClaudeToolChoice,
    BetaToolCustom as ClaudeToolCustom, BetaToolInputSchema as ClaudeToolInputSchema,
    BetaToolResultContent as ClaudeToolResultContent,
    BetaToolResultContentBlockParam as ClaudeToolResultContentBlockParam,
    BetaWebSearchTool as ClaudeWebSearchTool, Model as ClaudeModel,
};
use gproxy_protocol::claude::create_message::request::CreateMessageRequest as ClaudeCreateMessageRequest;
use gproxy_protocol::gemini::count_tokens::types::{
    Blob as GeminiBlob, Content as GeminiContent, ContentRole as GeminiContentRole,
    FileData as GeminiFileData, Part as GeminiPart,
};
use gproxy_protocol::gemini::generate_content::request::{
    GenerateContentPath as GeminiGenerateContentPath,
    GenerateContentRequest as GeminiGenerateContentRequest,
    GenerateContentRequestBody as GeminiGenerateContentRequestBody,
};
use gproxy_protocol::gemini::generate_content::types::{
    CodeExecution, Environment, FileSearch, FunctionCallingConfig, FunctionCallingMode,
    FunctionDeclaration, GenerationConfig, GoogleSearch, ThinkingConfig, ThinkingLevel,
    Tool as GeminiTool, ToolConfig,
};
use serde_json::Value as JsonValue;

/// Convert a Claude create-message request into a Gemini generate-content request.
pub fn transform_request(request: ClaudeCreateMessageRequest) -> GeminiGenerateContentRequest {
    let model_id = match &request.body.model {
        ClaudeModel::Custom(value) => value.clone(),
        ClaudeModel::Known(known) => match serde_json::to_value(known) {
            Ok(JsonValue::String(value)) => value,
            _ => "unknown".to_string(),
        },
    };
    let model = model_id;

    let contents = map_messages_to_contents(&request.body.messages);
    let system_instruction = map_system_to_content(request.body.system);
    let tools = map_tools(request.body.tools);
    let tool_config = map_tool_choice(request.body.tool_choice);
    let output_format = request
        .body
        .output_config
        .as_ref()
        .and_then(|config| config.format.clone())
        .or(request.body.output_format.clone());
    let generation_config = map_generation_config(
        request.body.max_tokens,
        request.body.temperature,
        request.body.top_p,
        request.body.top_k,
        request.body.stop_sequences,
        request.body.thinking,
        request.body.output_config,
        output_format,
    );

    GeminiGenerateContentRequest {
        path: GeminiGenerateContentPath { model },
        body: GeminiGenerateContentRequestBody {
            contents,
            model: None,
            tools,
            tool_config,
            safety_settings: None,
            system_instruction,
            generation_config,
            cached_content: None,
        },
    }
}

fn map_system_to_content(system: Option<ClaudeSystemParam>) -> Option<GeminiContent> {
    match system {
        Some(ClaudeSystemParam::Text(text)) => text_to_content(text, None),
        Some(ClaudeSystemParam::Blocks(blocks)) => {
            let text = blocks
                .into_iter()
                .map(|block| block.text)
                .collect::<Vec<String>>()
                .join("\n");
            text_to_content(text, None)
        }
        None => None,
    }
}

fn map_messages_to_contents(messages: &[ClaudeMessageParam]) -> Vec<GeminiContent> {
    let tool_names = collect_tool_names(messages);
    let mut contents = Vec::new();

    for message in messages {
        if let Some(content) = map_message_to_content(message, &tool_names) {
            contents.push(content);
        }
    }

    contents
}

/// `tool_result`/`mcp_tool_result` blocks only carry the `tool_use_id` they answer,
/// but a Gemini `functionResponse` part needs the function `name`. Recover it from
/// the matching `tool_use`/`mcp_tool_use` block earlier in the same request.
fn collect_tool_names(messages: &[ClaudeMessageParam]) -> HashMap<String, String> {
    let mut names = HashMap::new();
    for message in messages {
        let ClaudeMessageContent::Blocks(blocks) = &message.content else {
            continue;
        };
        for block in blocks {
            match block {
                ClaudeContentBlockParam::ToolUse(tool_use) => {
                    names.insert(tool_use.id.clone(), tool_use.name.clone());
                }
                ClaudeContentBlockParam::McpToolUse(tool_use) => {
                    names.insert(tool_use.id.clone(), tool_use.name.clone());
                }
                ClaudeContentBlockParam::ServerToolUse(tool_use) => {
                    names.insert(
                        tool_use.id.clone(),
                        serde_json::to_value(&tool_use.name)
                            .ok()
                            .and_then(|v| v.as_str().map(str::to_string))
                            .unwrap_or_else(|| "web_search".to_string()),
                    );
                }
                _ => {}
            }
        }
    }
    names
}

fn map_message_to_content(
    message: &ClaudeMessageParam,
    tool_names: &HashMap<String, String>,
) -> Option<GeminiContent> {
    let role = match message.role {
        ClaudeMessageRole::User => Some(GeminiContentRole::User),
        ClaudeMessageRole::Assistant => Some(GeminiContentRole::Model),
    };

    let parts = map_message_content_to_parts(&message.content, tool_names);
    if parts.is_empty() {
        None
    } else {
        Some(GeminiContent { parts, role })
    }
}

fn map_message_content_to_parts(
    content: &ClaudeMessageContent,
    tool_names: &HashMap<String, String>,
) -> Vec<GeminiPart> {
    match content {
        ClaudeMessageContent::Text(text) => text_to_parts(text),
        ClaudeMessageContent::Blocks(blocks) => blocks
            .iter()
            .flat_map(|block| map_block_to_parts(block, tool_names))
            .collect(),
    }
}

fn text_to_content(text: String, role: Option<GeminiContentRole>) -> Option<GeminiContent> {
    if text.is_empty() {
        None
    } else {
        Some(GeminiContent {
            parts: text_to_parts(&text),
            role,
        })
    }
}

fn text_to_parts(text: &str) -> Vec<GeminiPart> {
    vec![GeminiPart {
        text: Some(text.to_string()),
        inline_data: None,
        function_call: None,
        function_response: None,
        file_data: None,
        executable_code: None,
        code_execution_result: None,
        thought: None,
        thought_signature: None,
        part_metadata: None,
        video_metadata: None,
    }]
}

fn map_block_to_parts(
    block: &ClaudeContentBlockParam,
    tool_names: &HashMap<String, String>,
) -> Vec<GeminiPart> {
    match block {
        ClaudeContentBlockParam::ToolUse(tool_use) => vec![GeminiPart {
            function_call: Some(
                gproxy_protocol::gemini::count_tokens::types::FunctionCall {
                    id: Some(tool_use.id.clone()),
                    name: tool_use.name.clone(),
                    args: Some(JsonValue::Object(tool_use.input.clone().into_iter().collect())),
                },
            ),
            ..Default::default()
        }],
        ClaudeContentBlockParam::McpToolUse(tool_use) => vec![GeminiPart {
            function_call: Some(
                gproxy_protocol::gemini::count_tokens::types::FunctionCall {
                    id: Some(tool_use.id.clone()),
                    name: tool_use.name.clone(),
                    args: Some(JsonValue::Object(tool_use.input.clone().into_iter().collect())),
                },
            ),
            ..Default::default()
        }],
        ClaudeContentBlockParam::ToolResult(tool_result) => vec![GeminiPart {
            function_response: Some(map_tool_result_to_function_response(
                &tool_result.tool_use_id,
                tool_result.content.as_ref(),
                tool_result.is_error,
                tool_names,
            )),
            ..Default::default()
        }],
        ClaudeContentBlockParam::McpToolResult(tool_result) => vec![GeminiPart {
            function_response: Some(map_mcp_tool_result_to_function_response(
                &tool_result.tool_use_id,
                tool_result.content.as_ref(),
                tool_result.is_error,
                tool_names,
            )),
            ..Default::default()
        }],
        ClaudeContentBlockParam::Thinking(thinking) => vec![GeminiPart {
            text: Some(thinking.thinking.clone()),
            thought: Some(true),
            thought_signature: Some(thinking.signature.clone()),
            ..Default::default()
        }],
        ClaudeContentBlockParam::RedactedThinking(redacted) => vec![GeminiPart {
            thought: Some(true),
            thought_signature: Some(redacted.data.clone()),
            ..Default::default()
        }],
        ClaudeContentBlockParam::ServerToolUse(tool_use) => vec![GeminiPart {
            text: Some(format!(
                "[{}: {}]",
                tool_names
                    .get(&tool_use.id)
                    .cloned()
                    .unwrap_or_else(|| "server_tool_use".to_string()),
                serde_json::to_string(&tool_use.input).unwrap_or_default()
            )),
            ..Default::default()
        }],
        ClaudeContentBlockParam::WebSearchToolResult(result) => vec![GeminiPart {
            text: Some(
                serde_json::to_string(&result.content)
                    .map(|json| format!("[web_search_result: {json}]"))
                    .unwrap_or_else(|_| "[web_search_result]".to_string()),
            ),
            ..Default::default()
        }],
        ClaudeContentBlockParam::WebFetchToolResult(result) => vec![GeminiPart {
            text: Some(
                serde_json::to_string(result)
                    .map(|json| format!("[web_fetch_result: {json}]"))
                    .unwrap_or_else(|_| "[web_fetch_result]".to_string()),
            ),
            ..Default::default()
        }],
        ClaudeContentBlockParam::CodeExecutionToolResult(result) => vec![GeminiPart {
            text: Some(
                serde_json::to_string(result)
                    .map(|json| format!("[code_execution_result: {json}]"))
                    .unwrap_or_else(|_| "[code_execution_result]".to_string()),
            ),
            ..Default::default()
        }],
        ClaudeContentBlockParam::BashCodeExecutionToolResult(result) => vec![GeminiPart {
            text: Some(
                serde_json::to_string(result)
                    .map(|json| format!("[bash_code_execution_result: {json}]"))
                    .unwrap_or_else(|_| "[bash_code_execution_result]".to_string()),
            ),
            ..Default::default()
        }],
        ClaudeContentBlockParam::TextEditorCodeExecutionToolResult(result) => vec![GeminiPart {
            text: Some(
                serde_json::to_string(result)
                    .map(|json| format!("[text_editor_code_execution_result: {json}]"))
                    .unwrap_or_else(|_| "[text_editor_code_execution_result]".to_string()),
            ),
            ..Default::default()
        }],
        ClaudeContentBlockParam::ToolSearchToolResult(result) => vec![GeminiPart {
            text: Some(
                serde_json::to_string(result)
                    .map(|json| format!("[tool_search_result: {json}]"))
                    .unwrap_or_else(|_| "[tool_search_result]".to_string()),
            ),
            ..Default::default()
        }],
        ClaudeContentBlockParam::ContainerUpload(upload) => vec![GeminiPart {
            text: Some(format!("[container_upload:{}]", upload.file_id)),
            ..Default::default()
        }],
        ClaudeContentBlockParam::SearchResult(result) => vec![GeminiPart {
            text: Some(
                serde_json::to_string(result)
                    .map(|json| format!("[search_result: {json}]"))
                    .unwrap_or_else(|_| "[search_result]".to_string()),
            ),
            ..Default::default()
        }],
        other => map_block_to_part(other).into_iter().collect(),
    }
}

/// `tool_result` content may be missing entirely (the tool produced no output),
/// a plain string, or a list of content blocks (text/image/document/...). Gemini's
/// `functionResponse.response` must be a JSON object, so non-object shapes are
/// wrapped under an `output`/`error` key.
fn map_tool_result_to_function_response(
    tool_use_id: &str,
    content: Option<&ClaudeToolResultContent>,
    is_error: Option<bool>,
    tool_names: &HashMap<String, String>,
) -> gproxy_protocol::gemini::count_tokens::types::FunctionResponse {
    let name = tool_names
        .get(tool_use_id)
        .cloned()
        .unwrap_or_else(|| "tool".to_string());

    let key = if is_error.unwrap_or(false) {
        "error"
    } else {
        "output"
    };

    let value = match content {
        None => JsonValue::String(String::new()),
        Some(ClaudeToolResultContent::Text(text)) => JsonValue::String(text.clone()),
        Some(ClaudeToolResultContent::Blocks(blocks)) => {
            let text = blocks
                .iter()
                .map(|block| match block {
                    ClaudeToolResultContentBlockParam::Text(text_block) => {
                        text_block.text.clone()
                    }
                    other => serde_json::to_string(other).unwrap_or_default(),
                })
                .collect::<Vec<String>>()
                .join("\n");
            JsonValue::String(text)
        }
    };

    let mut response = serde_json::Map::new();
    response.insert(key.to_string(), value);

    gproxy_protocol::gemini::count_tokens::types::FunctionResponse {
        id: Some(tool_use_id.to_string()),
        name,
        response: JsonValue::Object(response),
        parts: None,
        will_continue: None,
        scheduling: None,
    }
}

fn map_mcp_tool_result_to_function_response(
    tool_use_id: &str,
    content: Option<&gproxy_protocol::claude::count_tokens::types::BetaMCPToolResultContent>,
    is_error: Option<bool>,
    tool_names: &HashMap<String, String>,
) -> gproxy_protocol::gemini::count_tokens::types::FunctionResponse {
    use gproxy_protocol::claude::count_tokens::types::BetaMCPToolResultContent;

    let name = tool_names
        .get(tool_use_id)
        .cloned()
        .unwrap_or_else(|| "tool".to_string());
    let key = if is_error.unwrap_or(false) {
        "error"
    } else {
        "output"
    };
    let text = match content {
        None => String::new(),
        Some(BetaMCPToolResultContent::Text(text)) => text.clone(),
        Some(BetaMCPToolResultContent::Blocks(blocks)) => blocks
            .iter()
            .map(|block| block.text.clone())
            .collect::<Vec<String>>()
            .join("\n"),
    };

    let mut response = serde_json::Map::new();
    response.insert(key.to_string(), JsonValue::String(text));

    gproxy_protocol::gemini::count_tokens::types::FunctionResponse {
        id: Some(tool_use_id.to_string()),
        name,
        response: JsonValue::Object(response),
        parts: None,
        will_continue: None,
        scheduling: None,
    }
}

fn map_block_to_part(block: &ClaudeContentBlockParam) -> Option<GeminiPart> {
    match block {
        ClaudeContentBlockParam::Text(text_block) => Some(GeminiPart {
            text: Some(text_block.text.clone()),
            inline_data: None,
            function_call: None,
            function_response: None,
            file_data: None,
            executable_code: None,
            code_execution_result: None,
            thought: None,
            thought_signature: None,
            part_metadata: None,
            video_metadata: None,
        }),
        ClaudeContentBlockParam::Image(image_block) => match &image_block.source {
            ClaudeImageSource::Url { url } => Some(GeminiPart {
                text: None,
                inline_data: None,
                function_call: None,
                function_response: None,
                file_data: Some(GeminiFileData {
                    mime_type: None,
                    file_uri: url.clone(),
                }),
                executable_code: None,
                code_execution_result: None,
                thought: None,
                thought_signature: None,
                part_metadata: None,
                video_metadata: None,
            }),
            ClaudeImageSource::File { file_id } => Some(GeminiPart {
                text: None,
                inline_data: None,
                function_call: None,
                function_response: None,
                file_data: Some(GeminiFileData {
                    mime_type: None,
                    file_uri: file_id.clone(),
                }),
                executable_code: None,
                code_execution_result: None,
                thought: None,
                thought_signature: None,
                part_metadata: None,
                video_metadata: None,
            }),
            ClaudeImageSource::Base64 { data, media_type } => Some(GeminiPart {
                text: None,
                inline_data: Some(GeminiBlob {
                    mime_type: map_image_media_type(media_type),
                    data: data.clone(),
                }),
                function_call: None,
                function_response: None,
                file_data: None,
                executable_code: None,
                code_execution_result: None,
                thought: None,
                thought_signature: None,
                part_metadata: None,
                video_metadata: None,
            }),
        },
        ClaudeContentBlockParam::Document(document) => map_document_to_part(document),
        _ => None,
    }
}

fn map_document_to_part(document: &ClaudeDocumentBlock) -> Option<GeminiPart> {
    match &document.source {
        ClaudeDocumentSource::Url { url } => Some(GeminiPart {
            text: None,
            inline_data: None,
            function_call: None,
            function_response: None,
            file_data: Some(GeminiFileData {
                mime_type: None,
                file_uri: url.clone(),
            }),
            executable_code: None,
            code_execution_result: None,
            thought: None,
            thought_signature: None,
            part_metadata: None,
            video_metadata: None,
        }),
        ClaudeDocumentSource::File { file_id } => Some(GeminiPart {
            text: None,
            inline_data: None,
            function_call: None,
            function_response: None,
            file_data: Some(GeminiFileData {
                mime_type: None,
                file_uri: file_id.clone(),
            }),
            executable_code: None,
            code_execution_result: None,
            thought: None,
            thought_signature: None,
            part_metadata: None,
            video_metadata: None,
        }),
        ClaudeDocumentSource::Base64 { data, media_type } => Some(GeminiPart {
            text: None,
            inline_data: Some(GeminiBlob {
                mime_type: map_pdf_media_type(media_type),
                data: data.clone(),
            }),
            function_call: None,
            function_response: None,
            file_data: None,
            executable_code: None,
            code_execution_result: None,
            thought: None,
            thought_signature: None,
            part_metadata: None,
            video_metadata: None,
        }),
        ClaudeDocumentSource::Text { data, .. } => Some(GeminiPart {
            text: Some(data.clone()),
            inline_data: None,
            function_call: None,
            function_response: None,
            file_data: None,
            executable_code: None,
            code_execution_result: None,
            thought: None,
            thought_signature: None,
            part_metadata: None,
            video_metadata: None,
        }),
        ClaudeDocumentSource::Content { content } => match content {
            gproxy_protocol::claude::count_tokens::types::BetaContentBlockSourceContent::Text(
                text,
            ) => Some(GeminiPart {
                text: Some(text.clone()),
                inline_data: None,
                function_call: None,
                function_response: None,
                file_data: None,
                executable_code: None,
                code_execution_result: None,
                thought: None,
                thought_signature: None,
                part_metadata: None,
                video_metadata: None,
            }),
            gproxy_protocol::claude::count_tokens::types::BetaContentBlockSourceContent::Blocks(
                blocks,
            ) => {
                let text = blocks
                    .iter()
                    .filter_map(|block| match block {
                        ClaudeContentBlockParam::Text(text_block) => Some(text_block.text.clone()),
                        _ => None,
                    })
                    .collect::<Vec<String>>()
                    .join("\n");

                if text.is_empty() {
                    None
                } else {
                    Some(GeminiPart {
                        text: Some(text),
                        inline_data: None,
                        function_call: None,
                        function_response: None,
                        file_data: None,
                        executable_code: None,
                        code_execution_result: None,
                        thought: None,
                        thought_signature: None,
                        part_metadata: None,
                        video_metadata: None,
                    })
                }
            }
        },
    }
}

fn map_image_media_type(media_type: &ClaudeImageMediaType) -> String {
    match media_type {
        ClaudeImageMediaType::ImageJpeg => "image/jpeg",
        ClaudeImageMediaType::ImagePng => "image/png",
        ClaudeImageMediaType::ImageGif => "image/gif",
        ClaudeImageMediaType::ImageWebp => "image/webp",
    }
    .to_string()
}

fn map_pdf_media_type(
    media_type: &gproxy_protocol::claude::count_tokens::types::BetaPdfMediaType,
) -> String {
    match media_type {
        gproxy_protocol::claude::count_tokens::types::BetaPdfMediaType::ApplicationPdf => {
            "application/pdf".to_string()
        }
    }
}

fn map_tools(tools: Option<Vec<ClaudeTool>>) -> Option<Vec<GeminiTool>> {
    let tools = tools?;

    let mut output = Vec::new();
    let mut functions = Vec::new();

    for tool in tools {
        match tool {
            ClaudeTool::Custom(custom) => {
                functions.push(map_custom_tool(custom));
            }
            ClaudeTool::Builtin(builtin) => {
                if let Some(mapped) = map_builtin_tool(builtin) {
                    output.push(mapped);
                }
            }
        }
    }

    if !functions.is_empty() {
        output.push(GeminiTool {
            function_declarations: Some(functions),
            google_search_retrieval: None,
            code_execution: None,
            google_search: None,
            computer_use: None,
            url_context: None,
            file_search: None,
            google_maps: None,
        });
    }

    if output.is_empty() {
        None
    } else {
        Some(output)
    }
}

fn map_custom_tool(tool: ClaudeToolCustom) -> FunctionDeclaration {
    let schema = map_input_schema(tool.input_schema);

    FunctionDeclaration {
        name: tool.name,
        description: tool.description.unwrap_or_default(),
        behavior: None,
        parameters: None,
        parameters_json_schema: schema,
        response: None,
        response_json_schema: None,
    }
}

fn map_input_schema(schema: ClaudeToolInputSchema) -> Option<JsonValue> {
    let mut map = serde_json::Map::new();
    map.insert("type".to_string(), JsonValue::String("object".to_string()));

    if let Some(properties) = schema.properties {
        map.insert(
            "properties".to_string(),
            JsonValue::Object(properties.into_iter().collect()),
        );
    }

    if let Some(required) = schema.required {
        map.insert(
            "required".to_string(),
            JsonValue::Array(required.into_iter().map(JsonValue::String).collect()),
        );
    }

    Some(JsonValue::Object(map))
}

fn map_builtin_tool(builtin: ClaudeToolBuiltin) -> Option<GeminiTool> {
    match builtin {
        ClaudeToolBuiltin::WebSearch20250305(tool) => Some(GeminiTool {
            function_declarations: None,
            google_search_retrieval: None,
            code_execution: None,
            google_search: Some(map_web_search_tool(tool)),
            computer_use: None,
            url_context: None,
            file_search: None,
            google_maps: None,
        }),
        ClaudeToolBuiltin::CodeExecution20250522(_)
        | ClaudeToolBuiltin::CodeExecution20250825(_) => Some(GeminiTool {
            function_declarations: None,
            google_search_retrieval: None,
            code_execution: Some(CodeExecution {}),
            google_search: None,
            computer_use: None,
            url_context: None,
            file_search: None,
            google_maps: None,
        }),
        ClaudeToolBuiltin::ComputerUse20241022(_)
        | ClaudeToolBuiltin::ComputerUse20250124(_)
        | ClaudeToolBuiltin::ComputerUse20251124(_) => Some(GeminiTool {
            function_declarations: None,
            google_search_retrieval: None,
            code_execution: None,
            google_search: None,
            computer_use: Some(
                gproxy_protocol::gemini::generate_content::types::ComputerUse {
                    environment: Environment::EnvironmentBrowser,
                    excluded_predefined_functions: None,
                },
            ),
            url_context: None,
            file_search: None,
            google_maps: None,
        }),
        ClaudeToolBuiltin::ToolSearchToolBm25(_tool)
        | ClaudeToolBuiltin::ToolSearchToolBm2520251119(_tool) => Some(GeminiTool {
            function_declarations: None,
            google_search_retrieval: None,
            code_execution: None,
            google_search: None,
            computer_use: None,
            url_context: None,
            file_search: Some(FileSearch {
                file_search_store_names: Vec::new(),
                metadata_filter: None,
                top_k: None,
            }),
            google_maps: None,
        }),
        ClaudeToolBuiltin::McpToolset(_)
        | ClaudeToolBuiltin::Bash20241022(_)
        | ClaudeToolBuiltin::Bash20250124(_)
        | ClaudeToolBuiltin::TextEditor20241022(_)
        | ClaudeToolBuiltin::TextEditor20250124(_)
        | ClaudeToolBuiltin::TextEditor20250429(_)
        | ClaudeToolBuiltin::TextEditor20250728(_)
        | ClaudeToolBuiltin::Memory20250818(_)
        | ClaudeToolBuiltin::WebFetch20250910(_)
        | ClaudeToolBuiltin::ToolSearchToolRegex(_)
        | ClaudeToolBuiltin::ToolSearchToolRegex20251119(_) => None,
    }
}

fn map_web_search_tool(_tool: ClaudeWebSearchTool) -> GoogleSearch {
    GoogleSearch {
        time_range_filter: None,
    }
}

fn map_tool_choice(choice: Option<ClaudeToolChoice>) -> Option<ToolConfig> {
    let choice = choice?;

    let function_calling_config = match choice {
        ClaudeToolChoice::None => FunctionCallingConfig {
            mode: Some(FunctionCallingMode::None),
            allowed_function_names: None,
        },
        ClaudeToolChoice::Auto { .. } => FunctionCallingConfig {
            mode: Some(FunctionCallingMode::Auto),
            allowed_function_names: None,
        },
        ClaudeToolChoice::Any { .. } => FunctionCallingConfig {
            mode: Some(FunctionCallingMode::Any),
            allowed_function_names: None,
        },
        ClaudeToolChoice::Tool { name, .. } => FunctionCallingConfig {
            mode: Some(FunctionCallingMode::Any),
            allowed_function_names: Some(vec![name]),
        },
    };

    Some(ToolConfig {
        function_calling_config: Some(function_calling_config),
        retrieval_config: None,
    })
}

#[allow(clippy::too_many_arguments)]
fn map_generation_config(
    max_tokens: u32,
    temperature: Option<f64>,
    top_p: Option<f64>,
    top_k: Option<u32>,
    stop_sequences: Option<Vec<String>>,
    thinking: Option<ClaudeThinkingConfigParam>,
    output_config: Option<ClaudeOutputConfig>,
    output_format: Option<ClaudeJSONOutputFormat>,
) -> Option<GenerationConfig> {
    let thinking_config = map_thinking_config(thinking, output_config.as_ref());
    let response_json_schema = output_format.map(|format| format.schema);
    let response_mime_type = response_json_schema
        .as_ref()
        .map(|_| "application/json".to_string());

    let has_config = thinking_config.is_some()
        || response_json_schema.is_some()
        || stop_sequences.is_some()
        || max_tokens > 0
        || temperature.is_some()
        || top_p.is_some()
        || top_k.is_some();

    if !has_config {
        return None;
    }

    Some(GenerationConfig {
        stop_sequences,
        response_mime_type,
        response_schema: None,
        response_json_schema_internal: None,
        response_json_schema,
        response_modalities: None,
        candidate_count: None,
        max_output_tokens: if max_tokens > 0 {
            Some(max_tokens)
        } else {
            None
        },
        temperature,
        top_p,
        top_k,
        seed: None,
        presence_penalty: None,
        frequency_penalty: None,
        response_logprobs: None,
        logprobs: None,
        enable_enhanced_civic_answers: None,
        speech_config: None,
        thinking_config,
        image_config: None,
        media_resolution: None,
    })
}

fn map_thinking_config(
    thinking: Option<ClaudeThinkingConfigParam>,
    output_config: Option<&ClaudeOutputConfig>,
) -> Option<ThinkingConfig> {
    let effort = output_config
        .and_then(|config| config.effort)
        .and_then(map_effort_to_thinking_level);

    match thinking {
        Some(ClaudeThinkingConfigParam::Enabled { budget_tokens }) => Some(ThinkingConfig {
            include_thoughts: true,
            thinking_budget: budget_tokens,
            thinking_level: effort,
        }),
        Some(ClaudeThinkingConfigParam::Adaptive) => Some(ThinkingConfig {
            include_thoughts: true,
            thinking_budget: 0,
            thinking_level: effort,
        }),
        Some(ClaudeThinkingConfigParam::Disabled) => Some(ThinkingConfig {
            include_thoughts: false,
            thinking_budget: 0,
            thinking_level: effort,
        }),
        None => effort.map(|level| ThinkingConfig {
            include_thoughts: true,
            thinking_budget: 0,
            thinking_level: Some(level),
        }),
    }
}

fn map_effort_to_thinking_level(effort: ClaudeOutputEffort) -> Option<ThinkingLevel> {
    match effort {
        ClaudeOutputEffort::Low => Some(ThinkingLevel::Low),
        ClaudeOutputEffort::Medium => Some(ThinkingLevel::Medium),
        ClaudeOutputEffort::High => Some(ThinkingLevel::High),
        ClaudeOutputEffort::Max => Some(ThinkingLevel::High),
    }
}
