//! Agency client for an etcd-v2-style REST endpoint
//!
//! ```text
//! GET    /v2/keys/<path>[?recursive=true]      read a leaf or directory
//! PUT    /v2/keys/<path>   value=<json>        write (form encoded)
//! DELETE /v2/keys/<path>?recursive=true        delete
//! ```
//!
//! Compare-and-swap uses `prevValue=<json>` / `prevExist=false`; a failed
//! precondition answers `412 Precondition Failed`.
//!
//! Value format: every value is written as JSON text, so the sentinel
//! `none` is stored as `"none"` (with quotes). Reads fall back to a plain
//! string when the stored text is not valid JSON, but `prevValue` is always
//! JSON-encoded: a key written raw by another client never matches a
//! compare-and-swap and surfaces as a conflict. All writers of the target
//! namespace must use the JSON format.
//!
//! Only `404 Not Found` and `412 Precondition Failed` count as a refused
//! write; every other non-2xx status is an [`Error::Agency`].

use reqwest::{Client, Response, StatusCode};
use serde::Deserialize;
use serde_json::Value;

use crate::agency::client::{AgencyClient, Snapshot};
use crate::common::config::AgencyConfig;
use crate::common::utils::{encode_path, last_segment};
use crate::common::{Error, Result};

const KEYS_API: &str = "v2/keys";

#[derive(Debug, Deserialize)]
struct NodeResponse {
    node: Node,
}

#[derive(Debug, Deserialize)]
struct Node {
    key: String,
    #[serde(default)]
    dir: bool,
    #[serde(default)]
    value: Option<String>,
    #[serde(default)]
    nodes: Vec<Node>,
}

impl Node {
    fn flatten_into(self, out: &mut Snapshot) {
        if self.dir {
            for child in self.nodes {
                child.flatten_into(out);
            }
        } else if let Some(raw) = self.value {
            out.insert(self.key.trim_start_matches('/').to_string(), decode_value(&raw));
        }
    }
}

fn encode_value(value: &Value) -> Result<String> {
    Ok(serde_json::to_string(value)?)
}

fn decode_value(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}

#[derive(Debug, Clone)]
pub struct HttpAgency {
    client: Client,
    endpoint: String,
}

impl HttpAgency {
    pub fn new(config: &AgencyConfig) -> Result<Self> {
        let client = Client::builder().timeout(config.timeout()).build()?;
        Ok(Self::with_client(client, &config.endpoint))
    }

    pub fn with_client(client: Client, endpoint: &str) -> Self {
        Self {
            client,
            endpoint: endpoint.trim_end_matches('/').to_string(),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}/{}", self.endpoint, KEYS_API, encode_path(path))
    }

    async fn read_node(&self, path: &str, recursive: bool) -> Result<Option<Node>> {
        let mut req = self.client.get(self.url(path));
        if recursive {
            req = req.query(&[("recursive", "true")]);
        }
        let resp = req.send().await?;
        if resp.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let body = ensure_success(resp).await?.text().await?;
        let parsed: NodeResponse = serde_json::from_str(&body)?;
        Ok(Some(parsed.node))
    }

    async fn put(&self, path: &str, form: &[(&str, String)]) -> Result<bool> {
        let resp = self.client.put(self.url(path)).form(form).send().await?;
        write_outcome(path, resp).await
    }

    async fn delete(&self, path: &str, query: &[(&str, String)]) -> Result<bool> {
        let resp = self.client.delete(self.url(path)).query(query).send().await?;
        write_outcome(path, resp).await
    }
}

/// Turn a non-2xx response into `Error::Agency`.
async fn ensure_success(resp: Response) -> Result<Response> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let message = resp.text().await.unwrap_or_default();
    Err(Error::Agency {
        status: status.as_u16(),
        message,
    })
}

/// 2xx is applied, 404/412 is a refusal, anything else is a store failure.
async fn write_outcome(path: &str, resp: Response) -> Result<bool> {
    let status = resp.status();
    if status.is_success() {
        return Ok(true);
    }
    if is_refusal(status) {
        tracing::debug!("agency refused write to {}: {}", path, status);
        return Ok(false);
    }
    ensure_success(resp).await.map(|_| false)
}

/// Missing key or failed precondition.
fn is_refusal(status: StatusCode) -> bool {
    matches!(status, StatusCode::NOT_FOUND | StatusCode::PRECONDITION_FAILED)
}

impl AgencyClient for HttpAgency {
    async fn get(&self, path: &str, recursive: bool) -> Result<Snapshot> {
        tracing::debug!("agency get {} (recursive={})", path, recursive);
        let mut out = Snapshot::new();
        if let Some(node) = self.read_node(path, recursive).await? {
            node.flatten_into(&mut out);
        }
        Ok(out)
    }

    async fn list(&self, path: &str) -> Result<Vec<String>> {
        tracing::debug!("agency list {}", path);
        let Some(node) = self.read_node(path, false).await? else {
            return Ok(Vec::new());
        };
        Ok(node
            .nodes
            .iter()
            .map(|child| last_segment(&child.key).to_string())
            .collect())
    }

    async fn set(&self, path: &str, value: Value) -> Result<bool> {
        tracing::debug!("agency set {} = {}", path, value);
        self.put(path, &[("value", encode_value(&value)?)]).await
    }

    async fn remove(&self, path: &str) -> Result<bool> {
        tracing::debug!("agency remove {}", path);
        self.delete(path, &[("recursive", "true".to_string())]).await
    }

    async fn compare_and_swap(
        &self,
        path: &str,
        expected: Option<Value>,
        new: Option<Value>,
    ) -> Result<bool> {
        tracing::debug!("agency cas {}: {:?} -> {:?}", path, expected, new);
        match (expected, new) {
            (Some(prev), Some(value)) => {
                let form = [
                    ("value", encode_value(&value)?),
                    ("prevValue", encode_value(&prev)?),
                ];
                self.put(path, &form).await
            }
            (None, Some(value)) => {
                let form = [
                    ("value", encode_value(&value)?),
                    ("prevExist", "false".to_string()),
                ];
                self.put(path, &form).await
            }
            (Some(prev), None) => self.delete(path, &[("prevValue", encode_value(&prev)?)]).await,
            (None, None) => Err(Error::InvalidRequest(format!(
                "compare_and_swap on {} with neither expected nor new value",
                path
            ))),
        }
    }
}
