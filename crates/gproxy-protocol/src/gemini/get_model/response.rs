use super::types::Model;

/// The vendor returns the bare `Model` resource as the get-model response body.
pub type GetModelResponse = Model;
