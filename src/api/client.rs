use super::session::Session;
use crate::error::ApiError;
use crate::routes::LOGIN_ROUTE;
use parking_lot::Mutex;
use reqwest::{Client, Method, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiResponse<T> {
    #[serde(default = "default_success")]
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
    pub message: Option<String>,
}

fn default_success() -> bool {
    true
}

pub struct ApiClient {
    client: Client,
    endpoint: String,
    session: Arc<Session>,
    in_flight: Mutex<HashSet<String>>,
}

/// Held while a keyed action runs; dropping it lets the action start again.
pub struct FlightGuard<'a> {
    in_flight: &'a Mutex<HashSet<String>>,
    key: String,
}

impl Drop for FlightGuard<'_> {
    fn drop(&mut self) {
        self.in_flight.lock().remove(&self.key);
    }
}

impl ApiClient {
    pub fn new(endpoint: &str, session: Arc<Session>, timeout: Duration) -> Result<Self, ApiError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(ApiError::Client)?;

        Ok(Self {
            client,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            session,
            in_flight: Mutex::new(HashSet::new()),
        })
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Claims `key` or fails with [`ApiError::InFlight`] if it is taken.
    pub fn begin(&self, key: &str) -> Result<FlightGuard<'_>, ApiError> {
        let mut keys = self.in_flight.lock();
        if !keys.insert(key.to_string()) {
            return Err(ApiError::InFlight(key.to_string()));
        }
        Ok(FlightGuard {
            in_flight: &self.in_flight,
            key: key.to_string(),
        })
    }

    /// Runs `action` unless another action with the same key is pending.
    pub async fn single_flight<T, F>(&self, key: &str, action: F) -> Result<T, ApiError>
    where
        F: Future<Output = Result<T, ApiError>>,
    {
        let _guard = self.begin(key)?;
        action.await
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let req = self.request(Method::GET, path);
        self.data(req, "GET", path).await
    }

    pub async fn post<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        let req = self.request(Method::POST, path).json(body);
        self.data(req, "POST", path).await
    }

    pub async fn put<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        let req = self.request(Method::PUT, path).json(body);
        self.data(req, "PUT", path).await
    }

    pub async fn patch<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        let req = self.request(Method::PATCH, path).json(body);
        self.data(req, "PATCH", path).await
    }

    pub async fn delete(&self, path: &str) -> Result<(), ApiError> {
        let req = self.request(Method::DELETE, path);
        self.send::<serde_json::Value>(req, "DELETE", path).await?;
        Ok(())
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}{}", self.endpoint, path);
        let req = self.client.request(method, url);
        match self.session.token() {
            Some(token) => req.bearer_auth(token),
            None => req,
        }
    }

    async fn data<T: DeserializeOwned>(
        &self,
        req: RequestBuilder,
        method: &str,
        path: &str,
    ) -> Result<T, ApiError> {
        self.send(req, method, path)
            .await?
            .data
            .ok_or_else(|| ApiError::MissingData(path.to_string()))
    }

    async fn send<T: DeserializeOwned>(
        &self,
        req: RequestBuilder,
        method: &str,
        path: &str,
    ) -> Result<ApiResponse<T>, ApiError> {
        debug!(method, path, "API request");
        let response = req.send().await.map_err(|source| ApiError::Transport {
            path: path.to_string(),
            source,
        })?;

        let status = response.status();
        let text = response.text().await.map_err(|source| ApiError::Transport {
            path: path.to_string(),
            source,
        })?;

        if status == StatusCode::UNAUTHORIZED {
            warn!(method, path, "Token rejected, clearing session");
            self.session.logout()?;
            return Err(ApiError::Unauthorized {
                redirect_to: LOGIN_ROUTE,
            });
        }

        let body: serde_json::Value = if text.trim().is_empty() {
            serde_json::Value::Null
        } else {
            serde_json::from_str(&text).unwrap_or(serde_json::Value::String(text))
        };

        if !status.is_success() {
            let message = error_message(&body)
                .or_else(|| status.canonical_reason().map(str::to_string))
                .unwrap_or_else(|| "Request failed".to_string());
            warn!(method, path, status = status.as_u16(), %message, "API request failed");
            return Err(ApiError::Api {
                status: status.as_u16(),
                message,
                body,
            });
        }

        let envelope: ApiResponse<T> = if body.is_null() {
            ApiResponse {
                success: true,
                data: None,
                error: None,
                message: None,
            }
        } else {
            serde_json::from_value(body.clone()).map_err(|source| ApiError::Decode {
                path: path.to_string(),
                source,
            })?
        };

        if !envelope.success {
            let message = envelope
                .error
                .clone()
                .or_else(|| envelope.message.clone())
                .unwrap_or_else(|| "Unknown error".to_string());
            return Err(ApiError::Api {
                status: status.as_u16(),
                message,
                body,
            });
        }

        Ok(envelope)
    }
}

fn error_message(body: &serde_json::Value) -> Option<String> {
    match body {
        serde_json::Value::Object(map) => ["error", "message"]
            .iter()
            .find_map(|k| map.get(*k).and_then(|v| v.as_str()).map(str::to_string)),
        serde_json::Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::session::MemoryTokenStore;
    use mockito::{Matcher, Server};
    use serde_json::json;

    fn client(url: &str, token: Option<&str>) -> ApiClient {
        let store = match token {
            Some(t) => MemoryTokenStore::with_token(t),
            None => MemoryTokenStore::default(),
        };
        let session = Arc::new(Session::init(Box::new(store)));
        ApiClient::new(url, session, Duration::from_secs(5)).unwrap()
    }

    #[tokio::test]
    async fn test_get_attaches_bearer_and_unwraps_data() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/hardware")
            .match_header("authorization", "Bearer tok-1")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"success": true, "data": [{"id": 1}]}"#)
            .create_async()
            .await;

        let api = client(&server.url(), Some("tok-1"));
        let data: Vec<serde_json::Value> = api.get("/hardware").await.unwrap();
        assert_eq!(data, vec![json!({"id": 1})]);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_no_token_no_header() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/auth/me")
            .match_header("authorization", Matcher::Missing)
            .with_status(200)
            .with_body(r#"{"success": true, "data": {}}"#)
            .create_async()
            .await;

        let api = client(&server.url(), None);
        let _: serde_json::Value = api.get("/auth/me").await.unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_unauthorized_clears_session() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/users")
            .with_status(401)
            .with_body(r#"{"success": false, "error": "expired"}"#)
            .create_async()
            .await;

        let api = client(&server.url(), Some("stale"));
        let err = api.get::<serde_json::Value>("/users").await.unwrap_err();
        assert!(matches!(err, ApiError::Unauthorized { redirect_to: "/login" }));
        assert_eq!(err.status(), Some(401));
        assert!(!api.session().is_authenticated());
    }

    #[tokio::test]
    async fn test_http_error_carries_status_and_body() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("POST", "/employees")
            .with_status(422)
            .with_body(r#"{"success": false, "message": "email already exists"}"#)
            .create_async()
            .await;

        let api = client(&server.url(), Some("t"));
        let err = api
            .post::<serde_json::Value, _>("/employees", &json!({"email": "a@b.co"}))
            .await
            .unwrap_err();
        match err {
            ApiError::Api { status, message, body } => {
                assert_eq!(status, 422);
                assert_eq!(message, "email already exists");
                assert_eq!(body["success"], json!(false));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_success_false_on_200_is_an_error() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("PUT", "/software/3")
            .with_status(200)
            .with_body(r#"{"success": false, "error": "license count too low"}"#)
            .create_async()
            .await;

        let api = client(&server.url(), Some("t"));
        let err = api
            .put::<serde_json::Value, _>("/software/3", &json!({}))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Api { status: 200, ref message, .. } if message == "license count too low"));
    }

    #[tokio::test]
    async fn test_delete_accepts_empty_body() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("DELETE", "/hardware/9")
            .with_status(204)
            .create_async()
            .await;

        let api = client(&server.url(), Some("t"));
        api.delete("/hardware/9").await.unwrap();
    }

    #[tokio::test]
    async fn test_single_flight_rejects_duplicate() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/assignments")
            .with_status(200)
            .with_body(r#"{"success": true, "data": {"id": 5}}"#)
            .expect(1)
            .create_async()
            .await;

        let api = client(&server.url(), Some("t"));
        let body = json!({"assetId": "HW-001"});
        let first = api.single_flight("create:assignments", api.post::<serde_json::Value, _>("/assignments", &body));
        let second = api.single_flight("create:assignments", api.post::<serde_json::Value, _>("/assignments", &body));
        let (a, b) = tokio::join!(first, second);

        assert_eq!(a.unwrap()["id"], json!(5));
        assert!(matches!(b, Err(ApiError::InFlight(_))));
        mock.assert_async().await;

        let again = api
            .single_flight("create:assignments", async { Ok::<_, ApiError>(1) })
            .await;
        assert_eq!(again.unwrap(), 1);
    }

    #[test]
    fn test_guard_released_on_drop() {
        let api = client("http://localhost:1", None);
        let guard = api.begin("save").unwrap();
        assert!(matches!(api.begin("save"), Err(ApiError::InFlight(_))));
        assert!(api.begin("other").is_ok());
        drop(guard);
        assert!(api.begin("save").is_ok());
    }
}
