use async_trait::async_trait;
use reqwest::{Client, Method};
use serde_json::{json, Value};
use std::time::Duration;

use crate::config::EngineConfig;
use crate::errors::EngineError;

use super::{ElementRef, Session, SessionProvider};

/// W3C element reference key.
const ELEMENT_KEY: &str = "element-6066-11e4-a52e-4f735466cecf";

const CHROME_ARGS: [&str; 4] = [
    "--no-sandbox",
    "--disable-dev-shm-usage",
    "--disable-gpu",
    "--window-size=1200,800",
];

/// Opens Chrome sessions on a WebDriver server (chromedriver, selenium grid).
pub struct WebDriverProvider {
    client: Client,
    endpoint: String,
    headless: bool,
}

impl WebDriverProvider {
    /// Every HTTP request to the server is bounded by `request_timeout`.
    pub fn new(
        endpoint: impl Into<String>,
        headless: bool,
        request_timeout: Duration,
    ) -> Result<Self, EngineError> {
        let client = Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(|e| EngineError::SessionAcquisition(format!("http client: {e}")))?;

        Ok(Self {
            client,
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            headless,
        })
    }

    pub fn from_config(config: &EngineConfig) -> Result<Self, EngineError> {
        let limits = &config.limits;
        Self::new(
            config.webdriver_url.clone(),
            config.headless,
            limits.step_timeout.max(limits.session_timeout),
        )
    }
}

fn capabilities(headless: bool) -> Value {
    let mut args: Vec<&str> = CHROME_ARGS.to_vec();
    if headless {
        args.push("--headless");
    }

    json!({
        "capabilities": {
            "alwaysMatch": {
                "browserName": "chrome",
                "goog:chromeOptions": { "args": args }
            }
        }
    })
}

/// `value.sessionId` (W3C) or top-level `sessionId` (legacy servers).
fn parse_session_id(body: &Value) -> Option<String> {
    body.pointer("/value/sessionId")
        .or_else(|| body.get("sessionId"))
        .and_then(Value::as_str)
        .map(str::to_string)
}

fn parse_element(value: &Value) -> Option<ElementRef> {
    value
        .get(ELEMENT_KEY)
        .or_else(|| value.get("ELEMENT"))
        .and_then(Value::as_str)
        .map(|id| ElementRef(id.to_string()))
}

/// Error reported by the WebDriver server.
#[derive(Debug)]
struct WireError {
    kind: String,
    message: String,
}

impl WireError {
    fn from_body(status: u16, body: &Value) -> Self {
        let kind = body
            .pointer("/value/error")
            .and_then(Value::as_str)
            .unwrap_or("unknown error")
            .to_string();
        let message = body
            .pointer("/value/message")
            .and_then(Value::as_str)
            .map(|m| m.lines().next().unwrap_or_default().to_string())
            .unwrap_or_else(|| format!("HTTP {status}"));
        Self { kind, message }
    }

    fn transport(err: reqwest::Error) -> Self {
        Self {
            kind: "transport".to_string(),
            message: err.to_string(),
        }
    }
}

impl From<WireError> for EngineError {
    fn from(err: WireError) -> Self {
        EngineError::StepExecution(format!("{}: {}", err.kind, err.message))
    }
}

async fn send(
    client: &Client,
    method: Method,
    url: &str,
    body: Option<Value>,
) -> Result<Value, WireError> {
    let mut request = client.request(method, url);
    if let Some(body) = body {
        request = request.json(&body);
    }

    let response = request.send().await.map_err(WireError::transport)?;
    let status = response.status();
    let payload: Value = response.json().await.unwrap_or(Value::Null);

    if status.is_success() {
        Ok(payload)
    } else {
        Err(WireError::from_body(status.as_u16(), &payload))
    }
}

#[async_trait]
impl SessionProvider for WebDriverProvider {
    #[tracing::instrument(name = "webdriver_acquire", skip_all, fields(endpoint = %self.endpoint))]
    async fn acquire(&self) -> Result<Box<dyn Session>, EngineError> {
        let url = format!("{}/session", self.endpoint);
        let body = send(&self.client, Method::POST, &url, Some(capabilities(self.headless)))
            .await
            .map_err(|e| EngineError::SessionAcquisition(format!("{}: {}", e.kind, e.message)))?;

        let session_id = parse_session_id(&body).ok_or_else(|| {
            EngineError::SessionAcquisition("response carried no session id".to_string())
        })?;
        tracing::info!(%session_id, headless = self.headless, "WebDriver session opened");

        Ok(Box::new(WebDriverSession {
            client: self.client.clone(),
            base: format!(
                "{}/session/{}",
                self.endpoint,
                urlencoding::encode(&session_id)
            ),
        }))
    }
}

pub struct WebDriverSession {
    client: Client,
    /// `<endpoint>/session/<id>`
    base: String,
}

impl WebDriverSession {
    async fn command(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
    ) -> Result<Value, WireError> {
        let url = format!("{}{}", self.base, path);
        let payload = send(&self.client, method, &url, body).await?;
        Ok(payload.get("value").cloned().unwrap_or(Value::Null))
    }

    fn element_path(element: &ElementRef, action: &str) -> String {
        format!("/element/{}/{}", urlencoding::encode(&element.0), action)
    }
}

#[async_trait]
impl Session for WebDriverSession {
    async fn set_implicit_wait(&mut self, wait: Duration) -> Result<(), EngineError> {
        let body = json!({ "implicit": wait.as_millis() as u64 });
        self.command(Method::POST, "/timeouts", Some(body)).await?;
        Ok(())
    }

    async fn navigate(&mut self, url: &str) -> Result<(), EngineError> {
        self.command(Method::POST, "/url", Some(json!({ "url": url })))
            .await?;
        Ok(())
    }

    async fn current_url(&mut self) -> Result<String, EngineError> {
        let value = self.command(Method::GET, "/url", None).await?;
        Ok(value.as_str().unwrap_or_default().to_string())
    }

    async fn locate(&mut self, css: &str) -> Result<ElementRef, EngineError> {
        let body = json!({ "using": "css selector", "value": css });
        let value = self
            .command(Method::POST, "/element", Some(body))
            .await
            .map_err(|e| {
                if e.kind == "no such element" {
                    EngineError::ElementNotFound {
                        locator: css.to_string(),
                    }
                } else {
                    e.into()
                }
            })?;

        parse_element(&value).ok_or_else(|| EngineError::ElementNotFound {
            locator: css.to_string(),
        })
    }

    async fn clear(&mut self, element: &ElementRef) -> Result<(), EngineError> {
        let path = Self::element_path(element, "clear");
        self.command(Method::POST, &path, Some(json!({}))).await?;
        Ok(())
    }

    async fn type_text(&mut self, element: &ElementRef, text: &str) -> Result<(), EngineError> {
        let path = Self::element_path(element, "value");
        self.command(Method::POST, &path, Some(json!({ "text": text })))
            .await?;
        Ok(())
    }

    async fn click(&mut self, element: &ElementRef) -> Result<(), EngineError> {
        let path = Self::element_path(element, "click");
        self.command(Method::POST, &path, Some(json!({}))).await?;
        Ok(())
    }

    async fn is_visible(&mut self, element: &ElementRef) -> Result<bool, EngineError> {
        let path = Self::element_path(element, "displayed");
        let value = self.command(Method::GET, &path, None).await?;
        Ok(value.as_bool().unwrap_or(false))
    }

    async fn quit(&mut self) -> Result<(), EngineError> {
        let url = self.base.clone();
        send(&self.client, Method::DELETE, &url, None).await?;
        tracing::debug!("WebDriver session deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capabilities_headless_flag() {
        let caps = capabilities(true);
        let args = caps
            .pointer("/capabilities/alwaysMatch/goog:chromeOptions/args")
            .and_then(Value::as_array)
            .unwrap();
        assert!(args.iter().any(|a| a == "--headless"));
        assert!(args.iter().any(|a| a == "--window-size=1200,800"));

        let caps = capabilities(false);
        let args = caps
            .pointer("/capabilities/alwaysMatch/goog:chromeOptions/args")
            .and_then(Value::as_array)
            .unwrap();
        assert!(!args.iter().any(|a| a == "--headless"));
    }

    #[test]
    fn test_parse_session_id_w3c_and_legacy() {
        let w3c = json!({"value": {"sessionId": "abc", "capabilities": {}}});
        assert_eq!(parse_session_id(&w3c).as_deref(), Some("abc"));

        let legacy = json!({"sessionId": "def", "status": 0});
        assert_eq!(parse_session_id(&legacy).as_deref(), Some("def"));

        assert_eq!(parse_session_id(&json!({"value": null})), None);
    }

    #[test]
    fn test_parse_element_reference() {
        let value = json!({ ELEMENT_KEY: "e-1" });
        assert_eq!(parse_element(&value), Some(ElementRef("e-1".to_string())));
        assert_eq!(parse_element(&json!({"other": 1})), None);
    }

    #[test]
    fn test_wire_error_uses_first_message_line() {
        let body = json!({"value": {
            "error": "no such element",
            "message": "no such element: Unable to locate element\n  (Session info: chrome=120)"
        }});
        let err = WireError::from_body(404, &body);
        assert_eq!(err.kind, "no such element");
        assert_eq!(err.message, "no such element: Unable to locate element");

        let err = WireError::from_body(500, &Value::Null);
        assert_eq!(err.kind, "unknown error");
        assert_eq!(err.message, "HTTP 500");
    }

    #[test]
    fn test_endpoint_trailing_slash_trimmed() {
        let provider =
            WebDriverProvider::new("http://localhost:9515/", true, Duration::from_secs(5)).unwrap();
        assert_eq!(provider.endpoint, "http://localhost:9515");
    }
}
