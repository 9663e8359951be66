// HTTP transport shared by both search dialects
// basic auth / api key, optional cert skip, failover across addresses

use super::BackendError;
use crate::config::BackendConfig;
use reqwest::Client;
use serde_json::Value;

#[derive(Debug, Clone)]
enum Auth {
    None,
    Basic { username: String, password: String },
    ApiKey(String),
}

#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
    addresses: Vec<String>,
    auth: Auth,
}

impl HttpTransport {
    pub fn new(config: &BackendConfig) -> Result<Self, BackendError> {
        let addresses: Vec<String> = config
            .addresses
            .iter()
            .map(|a| a.trim().trim_end_matches('/').to_string())
            .filter(|a| !a.is_empty())
            .collect();
        if addresses.is_empty() {
            return Err(BackendError::NoAddress);
        }

        let client = Client::builder()
            .timeout(config.request_timeout())
            .danger_accept_invalid_certs(config.tls_skip_verify)
            .build()
            .map_err(|e| BackendError::Transport(e.to_string()))?;

        let auth = if !config.api_key.is_empty() {
            Auth::ApiKey(config.api_key.clone())
        } else if !config.username.is_empty() {
            Auth::Basic {
                username: config.username.clone(),
                password: config.password.clone(),
            }
        } else {
            Auth::None
        };

        Ok(Self {
            client,
            addresses,
            auth,
        })
    }

    pub fn addresses(&self) -> &[String] {
        &self.addresses
    }

    /// POST `body` to `path` (which may carry a query string) on the first
    /// address that answers. A transport failure moves on to the next
    /// address; an HTTP error status is returned as-is.
    pub async fn post_json(&self, path: &str, body: &Value) -> Result<Vec<u8>, BackendError> {
        let mut last_err = BackendError::NoAddress;

        for address in &self.addresses {
            let url = format!("{}/{}", address, path.trim_start_matches('/'));
            let mut request = self.client.post(&url).json(body);
            request = match &self.auth {
                Auth::None => request,
                Auth::Basic { username, password } => request.basic_auth(username, Some(password)),
                Auth::ApiKey(key) => request.header("Authorization", format!("ApiKey {}", key)),
            };

            match request.send().await {
                Ok(response) => {
                    let status = response.status();
                    if !status.is_success() {
                        let body = response.text().await.unwrap_or_default();
                        return Err(BackendError::Server {
                            status: status.as_u16(),
                            body,
                        });
                    }
                    let bytes = response
                        .bytes()
                        .await
                        .map_err(|e| BackendError::Decode(e.to_string()))?;
                    return Ok(bytes.to_vec());
                }
                Err(e) => {
                    tracing::warn!(address = %address, error = %e, "search backend unreachable, trying next address");
                    last_err = BackendError::Transport(e.to_string());
                }
            }
        }

        Err(last_err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_addresses_normalised() {
        let config = BackendConfig {
            addresses: vec!["http://a:9200/".into(), "  ".into(), "http://b:9200".into()],
            ..Default::default()
        };
        let transport = HttpTransport::new(&config).unwrap();
        assert_eq!(transport.addresses(), &["http://a:9200", "http://b:9200"]);
    }

    #[test]
    fn test_no_address() {
        let err = HttpTransport::new(&BackendConfig::default()).unwrap_err();
        assert!(matches!(err, BackendError::NoAddress));
    }

    #[test]
    fn test_api_key_preferred() {
        let config = BackendConfig {
            addresses: vec!["http://a:9200".into()],
            username: "elastic".into(),
            api_key: "k".into(),
            ..Default::default()
        };
        let transport = HttpTransport::new(&config).unwrap();
        assert!(matches!(transport.auth, Auth::ApiKey(ref k) if k == "k"));
    }
}
