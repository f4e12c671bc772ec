use std::collections::BTreeMap;
use std::future::Future;

use serde_json::Value;

use crate::common::Result;

/// Flat view of a subtree: full key path → value.
pub type Snapshot = BTreeMap<String, Value>;

/// Minimal contract over the coordination store.
///
/// Each call is assumed atomic on its own; sequences of calls are not.
/// `Err` means the store could not be reached or answered garbage, while
/// `Ok(false)` from a mutating call means the store refused the change.
///
/// Methods use RPITIT (`-> impl Future + Send`) so implementations can be
/// plain `async fn`s without an `async-trait` dependency.
pub trait AgencyClient: Send + Sync {
    /// Read `path`. With `recursive`, every leaf below it is returned.
    /// A missing path yields an empty snapshot.
    fn get(&self, path: &str, recursive: bool) -> impl Future<Output = Result<Snapshot>> + Send;

    /// Names of the direct children of `path`.
    fn list(&self, path: &str) -> impl Future<Output = Result<Vec<String>>> + Send;

    /// Write `value` at `path`, creating or overwriting it.
    fn set(&self, path: &str, value: Value) -> impl Future<Output = Result<bool>> + Send;

    /// Delete `path` (and anything below it).
    fn remove(&self, path: &str) -> impl Future<Output = Result<bool>> + Send;

    /// Atomically replace the value at `path` if it currently equals
    /// `expected`.
    ///
    /// `expected == None` requires the key to be absent; `new == None`
    /// deletes it. Returns `Ok(false)` when the precondition did not hold.
    fn compare_and_swap(
        &self,
        path: &str,
        expected: Option<Value>,
        new: Option<Value>,
    ) -> impl Future<Output = Result<bool>> + Send;
}

impl<A: AgencyClient> AgencyClient for &A {
    fn get(&self, path: &str, recursive: bool) -> impl Future<Output = Result<Snapshot>> + Send {
        (**self).get(path, recursive)
    }

    fn list(&self, path: &str) -> impl Future<Output = Result<Vec<String>>> + Send {
        (**self).list(path)
    }

    fn set(&self, path: &str, value: Value) -> impl Future<Output = Result<bool>> + Send {
        (**self).set(path, value)
    }

    fn remove(&self, path: &str) -> impl Future<Output = Result<bool>> + Send {
        (**self).remove(path)
    }

    fn compare_and_swap(
        &self,
        path: &str,
        expected: Option<Value>,
        new: Option<Value>,
    ) -> impl Future<Output = Result<bool>> + Send {
        (**self).compare_and_swap(path, expected, new)
    }
}

impl<A: AgencyClient> AgencyClient for std::sync::Arc<A> {
    fn get(&self, path: &str, recursive: bool) -> impl Future<Output = Result<Snapshot>> + Send {
        (**self).get(path, recursive)
    }

    fn list(&self, path: &str) -> impl Future<Output = Result<Vec<String>>> + Send {
        (**self).list(path)
    }

    fn set(&self, path: &str, value: Value) -> impl Future<Output = Result<bool>> + Send {
        (**self).set(path, value)
    }

    fn remove(&self, path: &str) -> impl Future<Output = Result<bool>> + Send {
        (**self).remove(path)
    }

    fn compare_and_swap(
        &self,
        path: &str,
        expected: Option<Value>,
        new: Option<Value>,
    ) -> impl Future<Output = Result<bool>> + Send {
        (**self).compare_and_swap(path, expected, new)
    }
}
