//! End-to-end topology scenarios against an in-memory agency that records
//! every call it receives.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use agency_topology::agency::Snapshot;
use agency_topology::target::Inconsistency;
use agency_topology::{AgencyClient, Communication, Error, MemAgency, Removal, ServerEntry, WriteMode};
use serde_json::{json, Value};

#[derive(Debug, Clone, PartialEq)]
enum Call {
    Get(String),
    List(String),
    Set(String, Value),
    Remove(String),
    Cas(String, Option<Value>, Option<Value>),
}

#[derive(Default)]
struct RecordingAgency {
    inner: MemAgency,
    calls: Mutex<Vec<Call>>,
    reject_removes: AtomicBool,
    /// Applied right after the next `get`, as if another writer got in.
    interleave: Mutex<Option<(String, Value)>>,
}

impl RecordingAgency {
    fn new(inner: MemAgency) -> Self {
        Self {
            inner,
            ..Default::default()
        }
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }

    /// Calls that change state, in issue order.
    fn writes(&self) -> Vec<Call> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|c| !matches!(c, Call::Get(_) | Call::List(_)))
            .cloned()
            .collect()
    }

    fn clear(&self) {
        self.calls.lock().unwrap().clear();
    }
}

impl AgencyClient for RecordingAgency {
    async fn get(&self, path: &str, recursive: bool) -> agency_topology::Result<Snapshot> {
        self.record(Call::Get(path.to_string()));
        let snapshot = self.inner.get(path, recursive).await?;
        let pending = self.interleave.lock().unwrap().take();
        if let Some((key, value)) = pending {
            self.inner.set(&key, value).await?;
        }
        Ok(snapshot)
    }

    async fn list(&self, path: &str) -> agency_topology::Result<Vec<String>> {
        self.record(Call::List(path.to_string()));
        self.inner.list(path).await
    }

    async fn set(&self, path: &str, value: Value) -> agency_topology::Result<bool> {
        self.record(Call::Set(path.to_string(), value.clone()));
        self.inner.set(path, value).await
    }

    async fn remove(&self, path: &str) -> agency_topology::Result<bool> {
        self.record(Call::Remove(path.to_string()));
        if self.reject_removes.load(Ordering::SeqCst) {
            return Ok(false);
        }
        self.inner.remove(path).await
    }

    async fn compare_and_swap(
        &self,
        path: &str,
        expected: Option<Value>,
        new: Option<Value>,
    ) -> agency_topology::Result<bool> {
        self.record(Call::Cas(path.to_string(), expected.clone(), new.clone()));
        self.inner.compare_and_swap(path, expected, new).await
    }
}

fn default_cluster() -> Communication<RecordingAgency> {
    let inner = MemAgency::with_entries([
        ("Target/DBServers/pavel", json!("sandro")),
        ("Target/DBServers/paul", json!("sally")),
        ("Target/DBServers/patricia", json!("sandra")),
        ("Target/Coordinators/cindy", json!(2)),
        ("Target/Coordinators/carlos", json!(true)),
        ("Target/Coordinators/charly", json!("alice")),
        ("Target/Databases/_system", json!({})),
        ("Target/Databases/z_db", json!({})),
        ("Target/Databases/a_db", json!({})),
        ("Target/Databases/b_db", json!({})),
    ]);
    Communication::new(RecordingAgency::new(inner))
}

fn set(path: &str, value: &str) -> Call {
    Call::Set(path.to_string(), json!(value))
}

fn remove(path: &str) -> Call {
    Call::Remove(path.to_string())
}

#[tokio::test]
async fn test_server_list_matches_stored_pairs() {
    let comm = default_cluster();
    let list = comm.target().db_servers().get_list().await.unwrap();

    let expected = json!({
        "pavel": {"role": "primary", "secondary": "sandro"},
        "paul": {"role": "primary", "secondary": "sally"},
        "patricia": {"role": "primary", "secondary": "sandra"},
        "sandro": {"role": "secondary", "primary": "pavel"},
        "sally": {"role": "secondary", "primary": "paul"},
        "sandra": {"role": "secondary", "primary": "patricia"},
    });
    assert_eq!(serde_json::to_value(&list).unwrap(), expected);
    assert!(comm.agency().writes().is_empty());
}

#[tokio::test]
async fn test_add_primary_writes_none_once() {
    let comm = default_cluster();
    let servers = comm.target().db_servers();

    servers.add_primary("pancho").await.unwrap();
    assert_eq!(
        comm.agency().writes(),
        vec![set("Target/DBServers/pancho", "none")]
    );

    let list = servers.get_list().await.unwrap();
    assert_eq!(list["pancho"], ServerEntry::Primary { secondary: None });
}

#[tokio::test]
async fn test_add_secondary_after_primary() {
    let comm = default_cluster();
    let servers = comm.target().db_servers();

    servers.add_primary("pancho").await.unwrap();
    comm.agency().clear();
    servers.add_secondary("samuel", "pancho").await.unwrap();

    assert_eq!(
        comm.agency().writes(),
        vec![set("Target/DBServers/pancho", "samuel")]
    );
    let list = servers.get_list().await.unwrap();
    assert_eq!(list["pancho"].secondary(), Some("samuel"));
    assert!(list["samuel"].is_secondary());
}

#[tokio::test]
async fn test_add_pair_matches_primary_then_secondary() {
    let by_pair = default_cluster();
    by_pair
        .target()
        .db_servers()
        .add_pair("pancho", "samuel")
        .await
        .unwrap();
    assert_eq!(
        by_pair.agency().writes(),
        vec![set("Target/DBServers/pancho", "samuel")]
    );

    let stepwise = default_cluster();
    let servers = stepwise.target().db_servers();
    servers.add_primary("pancho").await.unwrap();
    servers.add_secondary("samuel", "pancho").await.unwrap();

    assert_eq!(
        by_pair.target().db_servers().get_list().await.unwrap(),
        servers.get_list().await.unwrap()
    );
}

#[tokio::test]
async fn test_remove_paired_primary_promotes_before_delete() {
    let comm = default_cluster();
    let servers = comm.target().db_servers();

    let outcome = servers.remove_server("pavel").await.unwrap();
    assert_eq!(
        outcome,
        Removal::SecondaryPromoted {
            secondary: "sandro".into()
        }
    );
    assert_eq!(
        comm.agency().writes(),
        vec![
            set("Target/DBServers/sandro", "none"),
            remove("Target/DBServers/pavel"),
        ]
    );

    let list = servers.get_list().await.unwrap();
    assert!(!list.contains_key("pavel"));
    assert_eq!(list["sandro"], ServerEntry::Primary { secondary: None });
    assert_eq!(list["paul"].secondary(), Some("sally"));
    assert_eq!(list["patricia"].secondary(), Some("sandra"));
}

#[tokio::test]
async fn test_remove_secondary_rewrites_primary_only() {
    let comm = default_cluster();
    let servers = comm.target().db_servers();

    servers.remove_server("sandro").await.unwrap();
    assert_eq!(
        comm.agency().writes(),
        vec![set("Target/DBServers/pavel", "none")]
    );

    let list = servers.get_list().await.unwrap();
    assert!(!list.contains_key("sandro"));
    assert_eq!(list["pavel"], ServerEntry::Primary { secondary: None });
}

#[tokio::test]
async fn test_remove_secondary_claimed_twice() {
    let comm = default_cluster();
    let servers = comm.target().db_servers();

    // add_secondary does not check whether the secondary is already taken
    servers.add_secondary("sandro", "paul").await.unwrap();
    comm.agency().clear();

    assert_eq!(
        servers.remove_server("sandro").await.unwrap(),
        Removal::SecondaryRemoved {
            primaries: vec!["paul".into(), "pavel".into()]
        }
    );
    assert_eq!(
        comm.agency().writes(),
        vec![
            set("Target/DBServers/paul", "none"),
            set("Target/DBServers/pavel", "none"),
        ]
    );

    let list = servers.get_list().await.unwrap();
    assert!(!list.contains_key("sandro"));
    assert_eq!(list["pavel"], ServerEntry::Primary { secondary: None });
    assert_eq!(list["paul"], ServerEntry::Primary { secondary: None });
    assert!(!list.contains_key("sally"));
}

#[tokio::test]
async fn test_remove_unpaired_primary_is_single_delete() {
    let comm = default_cluster();
    let servers = comm.target().db_servers();
    servers.add_primary("pancho").await.unwrap();
    comm.agency().clear();

    assert_eq!(
        servers.remove_server("pancho").await.unwrap(),
        Removal::PrimaryRemoved
    );
    assert_eq!(comm.agency().writes(), vec![remove("Target/DBServers/pancho")]);
}

#[tokio::test]
async fn test_pair_round_trip_leaves_nothing() {
    let comm = Communication::new(RecordingAgency::default());
    let servers = comm.target().db_servers();

    servers.add_pair("pancho", "samuel").await.unwrap();
    servers.remove_server("samuel").await.unwrap();
    servers.remove_server("pancho").await.unwrap();

    assert!(servers.get_list().await.unwrap().is_empty());
    assert!(comm.agency().inner.is_empty().await);
}

#[tokio::test]
async fn test_remove_unknown_server_issues_no_writes() {
    let comm = default_cluster();
    let outcome = comm.target().db_servers().remove_server("nobody").await.unwrap();

    assert_eq!(outcome, Removal::NotFound);
    assert!(comm.agency().writes().is_empty());
}

#[tokio::test]
async fn test_failed_delete_reports_partial_state() {
    let comm = default_cluster();
    let servers = comm.target().db_servers();
    comm.agency().reject_removes.store(true, Ordering::SeqCst);

    let err = servers.remove_server("pavel").await.unwrap_err();
    match &err {
        Error::PartiallyApplied { failed, .. } => {
            assert!(matches!(**failed, Error::WriteRejected(ref p) if p == "Target/DBServers/pavel"))
        }
        other => panic!("unexpected error: {other}"),
    }

    // sandro got promoted, pavel's key is still there
    assert_eq!(
        servers.audit().await.unwrap(),
        vec![Inconsistency::SecondaryAlsoPrimary {
            server: "sandro".into(),
            primary: "pavel".into(),
        }]
    );

    // retrying once the agency cooperates again converges
    comm.agency().reject_removes.store(false, Ordering::SeqCst);
    servers.remove_server("pavel").await.unwrap();
    assert!(servers.audit().await.unwrap().is_empty());

    let list = servers.get_list().await.unwrap();
    assert_eq!(list["sandro"], ServerEntry::Primary { secondary: None });
    assert!(!list.contains_key("pavel"));
}

#[tokio::test]
async fn test_guarded_mode_uses_compare_and_swap() {
    let comm = default_cluster().with_write_mode(WriteMode::Guarded);
    comm.target().db_servers().remove_server("pavel").await.unwrap();

    assert_eq!(
        comm.agency().writes(),
        vec![
            Call::Cas("Target/DBServers/sandro".into(), None, Some(json!("none"))),
            Call::Cas("Target/DBServers/pavel".into(), Some(json!("sandro")), None),
        ]
    );
}

#[tokio::test]
async fn test_guarded_mode_detects_concurrent_repairing() {
    let comm = default_cluster().with_write_mode(WriteMode::Guarded);
    *comm.agency().interleave.lock().unwrap() =
        Some(("Target/DBServers/pavel".into(), json!("samuel")));

    let err = comm.target().db_servers().remove_server("sandro").await.unwrap_err();
    assert!(matches!(err, Error::Conflict(ref p) if p == "Target/DBServers/pavel"));

    // the other writer's pairing survives
    let list = comm.target().db_servers().get_list().await.unwrap();
    assert_eq!(list["pavel"].secondary(), Some("samuel"));
}

#[tokio::test]
async fn test_plain_mode_last_writer_wins() {
    let comm = default_cluster();
    *comm.agency().interleave.lock().unwrap() =
        Some(("Target/DBServers/pavel".into(), json!("samuel")));

    comm.target().db_servers().remove_server("sandro").await.unwrap();

    let list = comm.target().db_servers().get_list().await.unwrap();
    assert_eq!(list["pavel"], ServerEntry::Primary { secondary: None });
    assert!(!list.contains_key("samuel"));
}

#[tokio::test]
async fn test_coordinator_membership() {
    let comm = default_cluster();
    let coordinators = comm.target().coordinators();

    assert_eq!(
        coordinators.get_list().await.unwrap(),
        vec!["carlos", "charly", "cindy"]
    );

    coordinators.add("carol").await.unwrap();
    assert_eq!(
        coordinators.get_list().await.unwrap(),
        vec!["carlos", "carol", "charly", "cindy"]
    );

    comm.agency().clear();
    coordinators.remove("cindy").await.unwrap();
    assert_eq!(comm.agency().writes(), vec![remove("Target/Coordinators/cindy")]);
    assert_eq!(
        coordinators.get_list().await.unwrap(),
        vec!["carlos", "carol", "charly"]
    );
}

#[tokio::test]
async fn test_remove_cindy_from_default_set() {
    let comm = default_cluster();
    let coordinators = comm.target().coordinators();

    coordinators.remove("cindy").await.unwrap();
    assert_eq!(coordinators.get_list().await.unwrap(), vec!["carlos", "charly"]);
}

#[tokio::test]
async fn test_database_list_is_sorted() {
    let comm = default_cluster();
    assert_eq!(
        comm.target().databases().get_list().await.unwrap(),
        vec!["_system", "a_db", "b_db", "z_db"]
    );
}
