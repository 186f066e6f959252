use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct SuggestRequest<'a> {
    pub object: &'a str,
}

#[derive(Debug, Clone, Serialize)]
pub struct GenerateVideoRequest<'a> {
    pub steps: &'a [String],
}
