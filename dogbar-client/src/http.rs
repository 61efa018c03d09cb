//! HTTP plumbing for the hosted backend REST surface

use crate::{ClientConfig, ClientError, ClientResult};
use reqwest::{Client, Method, RequestBuilder, StatusCode, Url};
use serde::Deserialize;
use serde::de::DeserializeOwned;

/// Error body shapes the backend returns across its auth, rest and storage services
#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    msg: Option<String>,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    error_description: Option<String>,
}

impl ErrorBody {
    fn into_message(self) -> Option<String> {
        self.error_description
            .or(self.message)
            .or(self.msg)
            .or(self.error)
    }
}

/// Thin wrapper over a reqwest client that knows the backend's auth headers
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
    base_url: Url,
    anon_key: String,
}

impl HttpClient {
    /// Create a new HTTP client from configuration
    pub fn new(config: &ClientConfig) -> ClientResult<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout))
            .build()?;

        let base_url = Url::parse(&config.base_url)
            .map_err(|e| ClientError::Validation(format!("invalid base url: {e}")))?;
        if base_url.cannot_be_a_base() {
            return Err(ClientError::Validation(format!(
                "invalid base url: {}",
                config.base_url
            )));
        }

        Ok(Self {
            client,
            base_url,
            anon_key: config.anon_key.clone(),
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Build a URL from path segments; each segment is percent-encoded
    pub fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty();
            for segment in segments {
                // Object names may contain '/', keep them as nested segments
                for part in segment.split('/').filter(|p| !p.is_empty()) {
                    path.push(part);
                }
            }
        }
        url
    }

    /// Start a request carrying the `apikey` and bearer headers
    pub fn request(&self, method: Method, url: Url, token: Option<&str>) -> RequestBuilder {
        let bearer = token.unwrap_or(&self.anon_key);
        self.client
            .request(method, url)
            .header("apikey", &self.anon_key)
            .header(reqwest::header::AUTHORIZATION, format!("Bearer {bearer}"))
    }

    /// Send and decode a JSON body
    pub async fn execute<T: DeserializeOwned>(&self, request: RequestBuilder) -> ClientResult<T> {
        let response = request.send().await?;
        let response = Self::check_status(response).await?;
        let text = response.text().await?;
        serde_json::from_str(&text).map_err(|e| ClientError::decode(e.to_string()))
    }

    /// Send and discard the body
    pub async fn execute_empty(&self, request: RequestBuilder) -> ClientResult<()> {
        let response = request.send().await?;
        Self::check_status(response).await?;
        Ok(())
    }

    /// Map non-success statuses onto client errors
    async fn check_status(response: reqwest::Response) -> ClientResult<reqwest::Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let text = response.text().await.unwrap_or_default();
        Err(Self::error_for(status, &text))
    }

    fn error_for(status: StatusCode, text: &str) -> ClientError {
        let message = serde_json::from_str::<ErrorBody>(text)
            .ok()
            .and_then(ErrorBody::into_message)
            .unwrap_or_else(|| text.to_string());

        match status {
            StatusCode::UNAUTHORIZED => ClientError::Unauthorized,
            StatusCode::FORBIDDEN => ClientError::Forbidden(message),
            StatusCode::NOT_FOUND => ClientError::NotFound(message),
            StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => {
                ClientError::Validation(message)
            }
            _ => ClientError::Api {
                status: status.as_u16(),
                message,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> HttpClient {
        let config = ClientConfig::new("https://api.example.com/").with_anon_key("anon");
        HttpClient::new(&config).unwrap()
    }

    #[test]
    fn test_endpoint_encodes_segments() {
        let url = client().endpoint(&["storage", "v1", "object", "media", "my photo.png"]);
        assert_eq!(
            url.as_str(),
            "https://api.example.com/storage/v1/object/media/my%20photo.png"
        );
    }

    #[test]
    fn test_endpoint_nested_object_name() {
        let url = client().endpoint(&["storage", "v1", "object", "media", "a/b.png"]);
        assert_eq!(url.path(), "/storage/v1/object/media/a/b.png");
    }

    #[test]
    fn test_invalid_base_url() {
        let config = ClientConfig::new("not a url");
        assert!(matches!(
            HttpClient::new(&config),
            Err(ClientError::Validation(_))
        ));
    }

    #[test]
    fn test_error_mapping() {
        let err = HttpClient::error_for(
            StatusCode::BAD_REQUEST,
            r#"{"error":"invalid_grant","error_description":"Invalid login credentials"}"#,
        );
        match err {
            ClientError::Validation(msg) => assert_eq!(msg, "Invalid login credentials"),
            other => panic!("unexpected: {other:?}"),
        }

        let err = HttpClient::error_for(StatusCode::INTERNAL_SERVER_ERROR, "boom");
        match err {
            ClientError::Api { status, message } => {
                assert_eq!(status, 500);
                assert_eq!(message, "boom");
            }
            other => panic!("unexpected: {other:?}"),
        }

        assert!(matches!(
            HttpClient::error_for(StatusCode::UNAUTHORIZED, ""),
            ClientError::Unauthorized
        ));
    }
}
