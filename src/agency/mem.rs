//! In-memory agency backed by a `BTreeMap`.
//!
//! Keys are stored without a leading `/`. Directories are implicit: a path
//! is a directory when some stored key lies below it. Intended for tests and
//! single-process embedding; not persisted across restarts.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde_json::Value;
use tokio::sync::RwLock;

use crate::agency::client::{AgencyClient, Snapshot};
use crate::common::utils::child_name;
use crate::common::Result;

#[derive(Clone, Default)]
pub struct MemAgency {
    inner: Arc<RwLock<BTreeMap<String, Value>>>,
}

fn normalize(path: &str) -> String {
    path.trim_matches('/').to_string()
}

fn is_below(key: &str, dir: &str) -> bool {
    dir.is_empty() || key.strip_prefix(dir).is_some_and(|rest| rest.starts_with('/'))
}

impl MemAgency {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a store with `(path, value)` pairs.
    pub fn with_entries<K, I>(entries: I) -> Self
    where
        K: AsRef<str>,
        I: IntoIterator<Item = (K, Value)>,
    {
        let map = entries
            .into_iter()
            .map(|(k, v)| (normalize(k.as_ref()), v))
            .collect();
        Self {
            inner: Arc::new(RwLock::new(map)),
        }
    }

    /// Copy of every stored key.
    pub async fn dump(&self) -> Snapshot {
        self.inner.read().await.clone()
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.is_empty()
    }
}

impl AgencyClient for MemAgency {
    async fn get(&self, path: &str, recursive: bool) -> Result<Snapshot> {
        let path = normalize(path);
        let g = self.inner.read().await;

        if let Some(value) = g.get(&path) {
            return Ok(Snapshot::from([(path, value.clone())]));
        }

        Ok(g.iter()
            .filter(|(k, _)| is_below(k, &path))
            .filter(|(k, _)| recursive || child_name(&path, k).is_some())
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect())
    }

    async fn list(&self, path: &str) -> Result<Vec<String>> {
        let path = normalize(path);
        let g = self.inner.read().await;

        let mut names: Vec<String> = Vec::new();
        for key in g.keys().filter(|k| is_below(k, &path)) {
            let rest = if path.is_empty() {
                key.as_str()
            } else {
                &key[path.len() + 1..]
            };
            let name = rest.split('/').next().unwrap_or_default();
            if names.last().map(String::as_str) != Some(name) {
                names.push(name.to_string());
            }
        }
        Ok(names)
    }

    async fn set(&self, path: &str, value: Value) -> Result<bool> {
        let path = normalize(path);
        let mut g = self.inner.write().await;

        // A directory cannot be overwritten by a leaf.
        if g.keys().any(|k| is_below(k, &path)) {
            tracing::debug!("mem agency: refusing to overwrite directory {}", path);
            return Ok(false);
        }
        g.insert(path, value);
        Ok(true)
    }

    async fn remove(&self, path: &str) -> Result<bool> {
        let path = normalize(path);
        let mut g = self.inner.write().await;

        let before = g.len();
        g.retain(|k, _| *k != path && !is_below(k, &path));
        Ok(g.len() != before)
    }

    async fn compare_and_swap(
        &self,
        path: &str,
        expected: Option<Value>,
        new: Option<Value>,
    ) -> Result<bool> {
        let path = normalize(path);
        let mut g = self.inner.write().await;

        if g.get(&path) != expected.as_ref() {
            return Ok(false);
        }
        match new {
            Some(value) => {
                g.insert(path, value);
            }
            None => {
                g.remove(&path);
            }
        }
        Ok(true)
    }
}

impl std::fmt::Debug for MemAgency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemAgency").finish_non_exhaustive()
    }
}
