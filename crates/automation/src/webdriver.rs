//! `BrowserSession` over the raw W3C WebDriver protocol.
//!
//! Talks straight REST to a chromedriver/geckodriver endpoint; no
//! browser library in-process. Every action carries the configured
//! per-action deadline.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::browser::{BrowserConnector, BrowserSession, TableRow};
use crate::WorkflowError;

/// W3C element identifier key in find-element responses.
const ELEMENT_KEY: &str = "element-6066-11e4-a52e-4f735466cecf";

const TABLE_ROWS_SCRIPT: &str = r#"
const table = document.querySelector(arguments[0]);
if (!table) { return []; }
return Array.from(table.querySelectorAll('tbody tr')).map(row => ({
    cells: Array.from(row.cells).map(cell => cell.innerText.trim()),
    link: row.getAttribute('data-href')
}));
"#;

pub struct WebDriverConnector {
    http: reqwest::Client,
    server_url: String,
}

impl WebDriverConnector {
    /// `action_timeout` bounds every protocol round trip.
    pub fn new(server_url: impl Into<String>, action_timeout: Duration) -> Result<Self, WorkflowError> {
        let http = reqwest::Client::builder()
            .timeout(action_timeout)
            .build()
            .map_err(|e| WorkflowError::Browser(e.to_string()))?;

        Ok(Self {
            http,
            server_url: server_url.into().trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl BrowserConnector for WebDriverConnector {
    async fn open(&self) -> Result<Box<dyn BrowserSession>, WorkflowError> {
        let body = json!({
            "capabilities": {
                "alwaysMatch": {
                    "browserName": "chrome",
                    "goog:chromeOptions": {"args": ["--headless=new", "--window-size=1280,720"]}
                }
            }
        });

        let response: Value = self
            .http
            .post(format!("{}/session", self.server_url))
            .json(&body)
            .send()
            .await
            .map_err(map_transport)?
            .error_for_status()
            .map_err(map_transport)?
            .json()
            .await
            .map_err(map_transport)?;

        let session_id = response
            .pointer("/value/sessionId")
            .and_then(|v| v.as_str())
            .ok_or_else(|| WorkflowError::Browser("no sessionId in WebDriver reply".to_string()))?;

        tracing::debug!(session_id, "browser session opened");

        Ok(Box::new(WebDriverSession {
            http: self.http.clone(),
            base: format!("{}/session/{}", self.server_url, session_id),
        }))
    }
}

struct WebDriverSession {
    http: reqwest::Client,
    base: String,
}

impl WebDriverSession {
    async fn command(
        &self,
        method: reqwest::Method,
        path: &str,
        body: Option<Value>,
    ) -> Result<Value, WorkflowError> {
        let mut request = self.http.request(method, format!("{}{}", self.base, path));
        if let Some(body) = body {
            request = request.json(&body);
        }

        let response: Value = request
            .send()
            .await
            .map_err(map_transport)?
            .error_for_status()
            .map_err(map_transport)?
            .json()
            .await
            .map_err(map_transport)?;

        Ok(response.get("value").cloned().unwrap_or(Value::Null))
    }

    async fn find(&self, css: &str) -> Result<String, WorkflowError> {
        let value = self
            .command(
                reqwest::Method::POST,
                "/element",
                Some(json!({"using": "css selector", "value": css})),
            )
            .await
            .map_err(|e| match e {
                WorkflowError::NavigationTimeout(_) => e,
                _ => WorkflowError::Browser(format!("no element matching '{css}'")),
            })?;

        value
            .get(ELEMENT_KEY)
            .and_then(|v| v.as_str())
            .map(str::to_string)
            .ok_or_else(|| WorkflowError::Browser(format!("no element matching '{css}'")))
    }
}

#[async_trait]
impl BrowserSession for WebDriverSession {
    async fn goto(&self, url: &str) -> Result<(), WorkflowError> {
        self.command(reqwest::Method::POST, "/url", Some(json!({"url": url})))
            .await?;
        Ok(())
    }

    async fn current_url(&self) -> Result<String, WorkflowError> {
        let value = self.command(reqwest::Method::GET, "/url", None).await?;
        value
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| WorkflowError::Browser("current url unavailable".to_string()))
    }

    async fn fill(&self, css: &str, value: &str) -> Result<(), WorkflowError> {
        let element = self.find(css).await?;
        self.command(
            reqwest::Method::POST,
            &format!("/element/{element}/clear"),
            Some(json!({})),
        )
        .await?;
        self.command(
            reqwest::Method::POST,
            &format!("/element/{element}/value"),
            Some(json!({"text": value})),
        )
        .await?;
        Ok(())
    }

    async fn click(&self, css: &str) -> Result<(), WorkflowError> {
        let element = self.find(css).await?;
        self.command(
            reqwest::Method::POST,
            &format!("/element/{element}/click"),
            Some(json!({})),
        )
        .await?;
        Ok(())
    }

    async fn wait_for(&self, css: &str, timeout: Duration) -> Result<(), WorkflowError> {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            if self.find(css).await.is_ok() {
                return Ok(());
            }
            if tokio::time::Instant::now() >= deadline {
                return Err(WorkflowError::NavigationTimeout(format!(
                    "'{css}' did not appear within {timeout:?}"
                )));
            }
            tokio::time::sleep(Duration::from_millis(250)).await;
        }
    }

    async fn table_rows(&self, css: &str) -> Result<Vec<TableRow>, WorkflowError> {
        let value = self
            .command(
                reqwest::Method::POST,
                "/execute/sync",
                Some(json!({"script": TABLE_ROWS_SCRIPT, "args": [css]})),
            )
            .await?;

        serde_json::from_value(value).map_err(|e| WorkflowError::Browser(e.to_string()))
    }

    async fn cookies(&self) -> Result<String, WorkflowError> {
        let value = self.command(reqwest::Method::GET, "/cookie", None).await?;
        serde_json::to_string(&value).map_err(|e| WorkflowError::Browser(e.to_string()))
    }

    async fn restore_cookies(&self, json: &str) -> Result<(), WorkflowError> {
        let cookies: Vec<Value> = serde_json::from_str(json)
            .map_err(|e| WorkflowError::Browser(format!("bad cookie state: {e}")))?;

        for cookie in cookies {
            self.command(
                reqwest::Method::POST,
                "/cookie",
                Some(json!({"cookie": cookie})),
            )
            .await?;
        }
        Ok(())
    }

    async fn close(&self) -> Result<(), WorkflowError> {
        self.command(reqwest::Method::DELETE, "", None).await?;
        Ok(())
    }
}

fn map_transport(e: reqwest::Error) -> WorkflowError {
    if e.is_timeout() {
        WorkflowError::NavigationTimeout(e.to_string())
    } else {
        WorkflowError::Browser(e.to_string())
    }
}
