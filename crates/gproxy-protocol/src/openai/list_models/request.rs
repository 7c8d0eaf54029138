/// OpenAI's `GET /v1/models` list call takes no parameters.
pub struct ListModelsRequest;
