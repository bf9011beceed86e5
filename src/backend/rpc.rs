use super::*;

#[derive(Debug, Deserialize)]
struct Response {
    #[serde(default)]
    result: Value,
    #[serde(default)]
    error: Option<RpcError>,
}

#[derive(Debug, Deserialize)]
struct RpcError {
    code: i64,
    message: String,
}

/// Minimal JSON-RPC client over HTTP with basic auth.
#[derive(Debug)]
pub(crate) struct Client {
    backend: &'static str,
    auth: Option<(String, String)>,
    http: reqwest::Client,
    next_id: AtomicU64,
    url: Url,
    version: &'static str,
}

impl Client {
    pub(crate) fn new(
        backend: &'static str,
        version: &'static str,
        url: Url,
        auth: Option<(String, String)>,
        timeout: Duration,
    ) -> Result<Self, BackendError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|source| BackendError::Transport { backend, source })?;

        Ok(Self {
            backend,
            auth,
            http,
            next_id: AtomicU64::new(0),
            url,
            version,
        })
    }

    pub(crate) fn request(&self, id: u64, method: &str, params: Value) -> Value {
        json!({
            "jsonrpc": self.version,
            "id": id,
            "method": method,
            "params": params,
        })
    }

    pub(crate) async fn call(&self, method: &str, params: Value) -> Result<Value, BackendError> {
        let backend = self.backend;
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);

        debug!("{backend} RPC {method} (id {id})");

        let mut request = self
            .http
            .post(self.url.clone())
            .json(&self.request(id, method, params));

        if let Some((username, password)) = &self.auth {
            request = request.basic_auth(username, Some(password));
        }

        let response = request.send().await.map_err(|source| {
            if source.is_connect() {
                BackendError::ConnectionRefused { backend }
            } else {
                BackendError::Transport { backend, source }
            }
        })?;

        let status = response.status();

        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
            return Err(BackendError::Unavailable {
                backend,
                message: format!("credentials rejected ({status})"),
            });
        }

        // RPC errors may arrive with a 500 and a JSON body.
        let body = response
            .text()
            .await
            .map_err(|source| BackendError::Transport { backend, source })?;

        let response = serde_json::from_str::<Response>(&body).map_err(|err| {
            BackendError::Decode {
                backend,
                message: format!("{status}: {err}"),
            }
        })?;

        if let Some(RpcError { code, message }) = response.error {
            return Err(BackendError::Rpc {
                backend,
                code,
                message,
            });
        }

        Ok(response.result)
    }
}
