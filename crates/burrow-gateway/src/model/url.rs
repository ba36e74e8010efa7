use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize, Serialize)]
pub struct ShortenRequest {
    pub url: String,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct ShortenResponse {
    pub result: String,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct BatchItemRequest {
    pub correlation_id: String,
    pub original_url: String,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct BatchItemResponse {
    pub correlation_id: String,
    pub short_url: String,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct UserUrlResponse {
    pub short_url: String,
    pub original_url: String,
}
