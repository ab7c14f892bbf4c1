#![allow(clippy::unwrap_used)]
// End-to-end reconciliation tests against a stateful fake bridge.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use futures_util::StreamExt;
use pretty_assertions::assert_eq;
use serde_json::{Value, json};
use url::Url;
use wiremock::matchers::{method, path, path_regex};
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

use spoolsync_core::{
    CloseReason, CommitPhase, CoreError, DEFAULT_DEBOUNCE, LookupState, ScanMode, SessionError,
    SpoolId, SpoolSelection, SpoolSync, SyncConfig, TraySlot,
};

const FAST_DEBOUNCE: Duration = Duration::from_millis(20);

// ── Fake bridge ─────────────────────────────────────────────────────

#[derive(Default)]
struct BridgeState {
    tray_count: u32,
    trays: BTreeMap<String, Option<u32>>,
    locked: Vec<u32>,
    spools: Vec<u32>,
    tags: BTreeMap<u32, String>,
    reject_commits: Option<(u16, String)>,
    commit_bodies: Vec<Value>,
}

#[derive(Clone, Default)]
struct FakeBridge {
    state: Arc<Mutex<BridgeState>>,
}

struct Settings(FakeBridge);
struct Spool(FakeBridge);
struct AssignTray(FakeBridge);
struct SetUuid(FakeBridge);

fn last_segment(request: &Request) -> u32 {
    request
        .url
        .path_segments()
        .and_then(Iterator::last)
        .and_then(|s| s.parse().ok())
        .unwrap()
}

impl Respond for Settings {
    fn respond(&self, _: &Request) -> ResponseTemplate {
        let state = self.0.state.lock().unwrap();
        ResponseTemplate::new(200).set_body_json(json!({
            "tray_count": state.tray_count,
            "trays": state.trays,
            "active_tray": 0,
            "locked_trays": state.locked,
        }))
    }
}

impl Respond for Spool {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        let id = last_segment(request);
        let state = self.0.state.lock().unwrap();
        if state.spools.contains(&id) {
            ResponseTemplate::new(200).set_body_json(json!({
                "id": id,
                "remaining_length": 100_000.0,
                "filament": { "name": "Matte Black", "material": "PLA", "color_hex": "000000" }
            }))
        } else {
            ResponseTemplate::new(404).set_body_json(json!({ "message": "Spool not found" }))
        }
    }
}

impl Respond for AssignTray {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        let tray = last_segment(request);
        let body: Value = serde_json::from_slice(&request.body).unwrap();
        let mut state = self.0.state.lock().unwrap();
        state.commit_bodies.push(body.clone());
        if let Some((status, message)) = &state.reject_commits {
            return ResponseTemplate::new(*status).set_body_json(json!({ "message": message }));
        }
        let spool = body["spool_id"].as_u64().map(|id| u32::try_from(id).unwrap());
        state.trays.insert(tray.to_string(), spool);
        ResponseTemplate::new(200).set_body_json(json!({ "status": "ok" }))
    }
}

impl Respond for SetUuid {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        let spool = last_segment(request);
        let body: Value = serde_json::from_slice(&request.body).unwrap();
        let mut state = self.0.state.lock().unwrap();
        state.commit_bodies.push(body.clone());
        state
            .tags
            .insert(spool, body["tray_uuid"].as_str().unwrap().to_owned());
        ResponseTemplate::new(200).set_body_json(json!({ "status": "ok" }))
    }
}

impl FakeBridge {
    fn with(configure: impl FnOnce(&mut BridgeState)) -> Self {
        let bridge = Self::default();
        {
            let mut state = bridge.state.lock().unwrap();
            state.tray_count = 8;
            configure(&mut state);
        }
        bridge
    }

    fn tray(&self, tray: u8) -> Option<u32> {
        self.state
            .lock()
            .unwrap()
            .trays
            .get(&tray.to_string())
            .copied()
            .flatten()
    }

    fn commit_bodies(&self) -> Vec<Value> {
        self.state.lock().unwrap().commit_bodies.clone()
    }

    async fn mount(&self, server: &MockServer) {
        Mock::given(method("GET"))
            .and(path("/settings"))
            .respond_with(Settings(self.clone()))
            .mount(server)
            .await;
        Mock::given(method("GET"))
            .and(path_regex(r"^/spool/\d+$"))
            .respond_with(Spool(self.clone()))
            .mount(server)
            .await;
        Mock::given(method("POST"))
            .and(path_regex(r"^/tray/\d+$"))
            .respond_with(AssignTray(self.clone()))
            .mount(server)
            .await;
        Mock::given(method("POST"))
            .and(path_regex(r"^/set-uuid/\d+$"))
            .respond_with(SetUuid(self.clone()))
            .mount(server)
            .await;
    }
}

async fn mount_printer(server: &MockServer, tray_zero_tag: &str) {
    Mock::given(method("GET"))
        .and(path("/printer-info"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "connected": true,
            "last_update": 1_700_000_000,
            "status": { "print": { "ams": { "ams": [
                { "id": "0", "tray": [ { "id": "0", "tray_uuid": tray_zero_tag } ] }
            ] } } }
        })))
        .mount(server)
        .await;
}

async fn setup(bridge: &FakeBridge, debounce: Duration) -> (MockServer, SpoolSync) {
    let server = MockServer::start().await;
    bridge.mount(&server).await;

    let mut config = SyncConfig::new(Url::parse(&server.uri()).unwrap());
    config.debounce = debounce;
    config.capture_devices = 1;
    (server, SpoolSync::new(config).unwrap())
}

// ── Scenarios ───────────────────────────────────────────────────────

#[tokio::test]
async fn scan_settle_and_commit_assigns_tray() {
    let bridge = FakeBridge::with(|s| {
        s.trays.insert("0".into(), Some(12));
        s.spools = vec![12, 99];
    });
    let (_server, sync) = setup(&bridge, DEFAULT_DEBOUNCE).await;

    let session = sync.open_session(TraySlot::new(0)).await.unwrap();
    assert_eq!(
        session.snapshot().candidate,
        SpoolSelection::Spool(SpoolId::new(12))
    );

    assert_eq!(session.toggle_scan().unwrap(), ScanMode::Scanning);
    let started = Instant::now();
    let scanned = session
        .scan(&["https://spoolman.local/spool/99", "ignored"])
        .unwrap();
    assert_eq!(scanned, Some(SpoolId::new(99)));
    assert_eq!(session.snapshot().scan_mode, ScanMode::Manual);
    assert!(session.snapshot().is_settling());

    let state = session.settled().await;
    assert!(started.elapsed() >= DEFAULT_DEBOUNCE);
    assert_eq!(state.settled, SpoolSelection::Spool(SpoolId::new(99)));
    assert_eq!(state.lookup.record().map(|r| r.id), Some(99));
    assert!(state.actions().commit);

    session.commit().await.unwrap();

    assert_eq!(bridge.commit_bodies(), vec![json!({ "spool_id": 99 })]);
    assert_eq!(bridge.tray(0), Some(99));
    let state = session.snapshot();
    assert_eq!(state.closed, Some(CloseReason::Committed));
    assert_eq!(state.last_error, None);
    assert!(sync.presenter().current().is_none());

    // The commit invalidated the shared settings; the next read refetches.
    assert!(sync.settings_cache().is_stale());
    let settings = sync.settings().await.unwrap();
    assert_eq!(settings.assignment(TraySlot::new(0)), Some(SpoolId::new(99)));
}

#[tokio::test]
async fn clearing_input_commits_null() {
    let bridge = FakeBridge::with(|s| {
        s.trays.insert("7".into(), Some(7));
        s.spools = vec![7];
    });
    let (_server, sync) = setup(&bridge, FAST_DEBOUNCE).await;

    let session = sync.open_session(TraySlot::new(7)).await.unwrap();
    session.edit_text("").unwrap();
    let state = session.settled().await;
    assert_eq!(state.settled, SpoolSelection::NoSpool);
    assert_eq!(state.lookup, LookupState::Idle);
    assert!(state.actions().clear);

    session.clear_spool().await.unwrap();

    assert_eq!(bridge.commit_bodies(), vec![json!({ "spool_id": null })]);
    assert_eq!(bridge.tray(7), None);
    assert!(!session.is_open());
    let settings = sync.settings().await.unwrap();
    assert_eq!(settings.assignment(TraySlot::new(7)), None);
}

#[tokio::test]
async fn rejected_commit_blocks_until_edit() {
    let bridge = FakeBridge::with(|s| {
        s.trays.insert("0".into(), Some(12));
        s.spools = vec![12];
        s.reject_commits = Some((400, "spool archived".into()));
    });
    let (_server, sync) = setup(&bridge, FAST_DEBOUNCE).await;

    let session = sync.open_session(TraySlot::new(0)).await.unwrap();
    session.settled().await;

    let err = session.commit().await.unwrap_err();
    assert!(
        matches!(err, CoreError::CommitRejected { status: Some(400), .. }),
        "got: {err:?}"
    );
    assert_eq!(err.to_string(), "spool archived");

    let state = session.snapshot();
    assert!(state.is_open());
    assert_eq!(
        state.commit,
        CommitPhase::Failed {
            message: "spool archived".into()
        }
    );
    assert_eq!(
        state.last_error.as_ref().map(ToString::to_string).as_deref(),
        Some("spool archived")
    );
    assert!(!state.actions().commit);

    let again = session.commit().await.unwrap_err();
    assert!(matches!(again, CoreError::PreconditionViolated { .. }));
    assert_eq!(bridge.commit_bodies().len(), 1);

    session.edit(SpoolSelection::Spool(SpoolId::new(12))).unwrap();
    let state = session.snapshot();
    assert_eq!(state.commit, CommitPhase::Idle);
    assert_eq!(state.last_error, None);
    assert!(session.settled().await.actions().commit);
}

#[tokio::test]
async fn locked_tray_never_reaches_the_network() {
    let bridge = FakeBridge::with(|s| {
        s.trays.insert("0".into(), Some(12));
        s.locked = vec![0];
        s.spools = vec![12];
    });
    let (_server, sync) = setup(&bridge, FAST_DEBOUNCE).await;

    let session = sync.open_session(TraySlot::new(0)).await.unwrap();
    let state = session.settled().await;
    assert!(state.locked);
    assert!(!state.actions().commit);
    assert!(!state.actions().clear);

    let set = session.commit().await.unwrap_err();
    let clear = session.clear_spool().await.unwrap_err();
    assert!(matches!(set, CoreError::PreconditionViolated { .. }));
    assert!(matches!(clear, CoreError::PreconditionViolated { .. }));
    assert!(bridge.commit_bodies().is_empty());
    assert_eq!(session.snapshot().commit, CommitPhase::Idle);
}

#[tokio::test]
async fn committing_twice_matches_committing_once() {
    let bridge = FakeBridge::with(|s| {
        s.trays.insert("0".into(), Some(12));
        s.spools = vec![12, 99];
    });
    let (_server, sync) = setup(&bridge, FAST_DEBOUNCE).await;

    let mut maps = Vec::new();
    for _ in 0..2 {
        let session = sync.open_session(TraySlot::new(0)).await.unwrap();
        session.edit(SpoolSelection::Spool(SpoolId::new(99))).unwrap();
        session.settled().await;
        session.commit().await.unwrap();
        maps.push(sync.settings().await.unwrap().assignments.clone());
    }

    assert_eq!(maps[0], maps[1]);
    assert_eq!(bridge.tray(0), Some(99));
}

#[tokio::test]
async fn stale_lookup_result_is_discarded() {
    let bridge = FakeBridge::with(|s| s.spools = vec![2]);
    let server = MockServer::start().await;
    // Spool 1 answers slowly; its result arrives after the selection moved on.
    Mock::given(method("GET"))
        .and(path("/spool/1"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "id": 1 }))
                .set_delay(Duration::from_millis(300)),
        )
        .with_priority(1)
        .mount(&server)
        .await;
    bridge.mount(&server).await;
    let mut config = SyncConfig::new(Url::parse(&server.uri()).unwrap());
    config.debounce = FAST_DEBOUNCE;
    let sync = SpoolSync::new(config).unwrap();

    let session = sync.open_session(TraySlot::new(1)).await.unwrap();
    session.edit(SpoolSelection::Spool(SpoolId::new(1))).unwrap();
    tokio::time::sleep(FAST_DEBOUNCE * 4).await;
    assert_eq!(
        session.snapshot().lookup,
        LookupState::Loading { id: SpoolId::new(1) }
    );

    session.edit(SpoolSelection::Spool(SpoolId::new(2))).unwrap();
    let state = session.settled().await;
    assert_eq!(state.lookup.record().map(|r| r.id), Some(2));

    tokio::time::sleep(Duration::from_millis(400)).await;
    let state = session.snapshot();
    assert_eq!(state.settled, SpoolSelection::Spool(SpoolId::new(2)));
    assert_eq!(state.lookup.record().map(|r| r.id), Some(2));
}

#[tokio::test]
async fn unknown_spool_is_not_found_not_an_error() {
    let bridge = FakeBridge::with(|_| {});
    let (_server, sync) = setup(&bridge, FAST_DEBOUNCE).await;

    let session = sync.open_session(TraySlot::new(2)).await.unwrap();
    session.edit_text("404").unwrap();
    let state = session.settled().await;

    assert_eq!(
        state.lookup,
        LookupState::NotFound { id: SpoolId::new(404) }
    );
    assert_eq!(state.last_error, None);
    assert!(!state.actions().commit);
}

#[tokio::test]
async fn invalid_scan_surfaces_error_and_returns_to_manual() {
    let bridge = FakeBridge::with(|s| {
        s.trays.insert("0".into(), Some(12));
        s.spools = vec![12];
    });
    let (_server, sync) = setup(&bridge, FAST_DEBOUNCE).await;

    let session = sync.open_session(TraySlot::new(0)).await.unwrap();
    session.toggle_scan().unwrap();

    // An empty decode event is ignored.
    assert_eq!(session.scan::<&str>(&[]).unwrap(), None);
    assert_eq!(session.snapshot().scan_mode, ScanMode::Scanning);

    let err = session.scan(&["not a spool label"]).unwrap_err();
    assert!(matches!(err, CoreError::InvalidCode { .. }));

    let state = session.snapshot();
    assert_eq!(state.scan_mode, ScanMode::Manual);
    assert_eq!(
        state.candidate,
        SpoolSelection::Spool(SpoolId::new(12))
    );
    assert_eq!(
        state.last_error,
        Some(SessionError::InvalidCode {
            code: "not a spool label".into()
        })
    );

    assert!(matches!(
        session.scan(&["web+spoolman:s-12"]),
        Err(CoreError::PreconditionViolated { .. })
    ));

    session.toggle_scan().unwrap();
    assert_eq!(session.snapshot().last_error, None);
    assert_eq!(
        session.scan(&["web+spoolman:s-12"]).unwrap(),
        Some(SpoolId::new(12))
    );
}

#[tokio::test]
async fn scan_needs_a_capture_device() {
    let bridge = FakeBridge::with(|_| {});
    let server = MockServer::start().await;
    bridge.mount(&server).await;
    let sync = SpoolSync::new(SyncConfig::new(Url::parse(&server.uri()).unwrap())).unwrap();

    let session = sync.open_session(TraySlot::new(0)).await.unwrap();
    assert!(!session.actions().scan);
    assert!(matches!(
        session.toggle_scan(),
        Err(CoreError::PreconditionViolated { .. })
    ));
}

#[tokio::test]
async fn close_cancels_pending_settle() {
    let bridge = FakeBridge::with(|s| s.spools = vec![5]);
    let (server, sync) = setup(&bridge, FAST_DEBOUNCE).await;

    let session = sync.open_session(TraySlot::new(3)).await.unwrap();
    session.toggle_scan().unwrap();
    assert!(session.scan(&["garbage"]).is_err());
    session.edit(SpoolSelection::Spool(SpoolId::new(5))).unwrap();
    session.close();
    session.close();

    tokio::time::sleep(FAST_DEBOUNCE * 5).await;

    let state = session.snapshot();
    assert_eq!(state.closed, Some(CloseReason::Cancelled));
    assert_eq!(state.settled, SpoolSelection::Unset);
    assert_eq!(state.last_error, None);
    let lookups = server
        .received_requests()
        .await
        .unwrap()
        .into_iter()
        .filter(|r| r.url.path().starts_with("/spool/"))
        .count();
    assert_eq!(lookups, 0);
    assert!(matches!(
        session.edit(SpoolSelection::NoSpool),
        Err(CoreError::SessionClosed)
    ));
}

#[tokio::test]
async fn bind_tag_posts_tray_uuid_and_stays_open() {
    let bridge = FakeBridge::with(|s| {
        s.trays.insert("0".into(), Some(12));
        s.spools = vec![12];
    });
    let (server, sync) = setup(&bridge, FAST_DEBOUNCE).await;
    mount_printer(&server, "A1B2C3D4").await;

    let session = sync.open_session(TraySlot::new(0)).await.unwrap();
    let state = session.settled().await;
    assert_eq!(state.tag.as_ref().map(|t| t.as_str()), Some("A1B2C3D4"));
    assert!(state.actions().bind);

    session.bind_tag().await.unwrap();

    assert_eq!(
        bridge.state.lock().unwrap().tags.get(&12).map(String::as_str),
        Some("A1B2C3D4")
    );
    let state = session.snapshot();
    assert!(state.is_open());
    assert_eq!(state.commit, CommitPhase::Succeeded);
}

#[tokio::test]
async fn zero_tag_disables_binding() {
    let bridge = FakeBridge::with(|s| {
        s.trays.insert("0".into(), Some(12));
        s.spools = vec![12];
    });
    let (server, sync) = setup(&bridge, FAST_DEBOUNCE).await;
    mount_printer(&server, "00000000000000000000000000000000").await;

    let session = sync.open_session(TraySlot::new(0)).await.unwrap();
    let state = session.settled().await;
    assert_eq!(state.tag, None);
    assert!(!state.actions().bind);
    assert!(matches!(
        session.bind_tag().await,
        Err(CoreError::PreconditionViolated { .. })
    ));
}

#[tokio::test]
async fn presenter_keeps_one_session() {
    let bridge = FakeBridge::with(|_| {});
    let (_server, sync) = setup(&bridge, FAST_DEBOUNCE).await;

    let first = sync.open_session(TraySlot::new(0)).await.unwrap();
    let second = sync.open_session(TraySlot::EXTERNAL).await.unwrap();

    assert_eq!(first.snapshot().closed, Some(CloseReason::Replaced));
    assert_eq!(
        sync.presenter().current().map(|s| s.tray()),
        Some(TraySlot::EXTERNAL)
    );

    sync.presenter().dismiss();
    assert_eq!(second.snapshot().closed, Some(CloseReason::Dismissed));
    assert!(sync.presenter().current().is_none());
}

#[tokio::test]
async fn unprovisioned_tray_is_rejected() {
    let bridge = FakeBridge::with(|_| {});
    let (_server, sync) = setup(&bridge, FAST_DEBOUNCE).await;

    let err = sync.open_session(TraySlot::new(8)).await.unwrap_err();
    assert!(matches!(err, CoreError::InvalidTray { index: 8, tray_count: 8 }));
}

#[tokio::test]
async fn state_stream_starts_with_current_snapshot() {
    let bridge = FakeBridge::with(|_| {});
    let (_server, sync) = setup(&bridge, FAST_DEBOUNCE).await;

    let session = sync.open_session(TraySlot::new(0)).await.unwrap();
    let mut stream = session.stream();
    let first = stream.next().await.unwrap();
    assert_eq!(first.tray, TraySlot::new(0));
    assert_eq!(first.candidate, SpoolSelection::Unset);

    session.edit(SpoolSelection::NoSpool).unwrap();
    let next = stream.next().await.unwrap();
    assert_eq!(next.candidate, SpoolSelection::NoSpool);
}

#[tokio::test]
async fn tray_overview_rows() {
    let bridge = FakeBridge::with(|s| {
        s.tray_count = 4;
        s.trays.insert("0".into(), Some(12));
        s.locked = vec![1];
        s.spools = vec![12];
    });
    let (server, sync) = setup(&bridge, FAST_DEBOUNCE).await;
    mount_printer(&server, "FEED").await;

    let rows = sync.tray_overview().await.unwrap();
    assert_eq!(rows.len(), 5);
    assert_eq!(rows[0].spool, Some(SpoolId::new(12)));
    assert_eq!(rows[0].record.as_ref().map(|r| r.id), Some(12));
    assert_eq!(rows[0].tag.as_ref().map(|t| t.as_str()), Some("FEED"));
    assert!(rows[0].active);
    assert!(rows[1].locked);
    assert_eq!(rows[4].tray, TraySlot::EXTERNAL);
    assert_eq!(rows[4].position, None);
}

#[tokio::test]
async fn each_session_looks_spools_up_afresh() {
    let bridge = FakeBridge::with(|_| {});
    let (_server, sync) = setup(&bridge, FAST_DEBOUNCE).await;

    let first = sync.open_session(TraySlot::new(0)).await.unwrap();
    first.edit(SpoolSelection::Spool(SpoolId::new(5))).unwrap();
    assert_eq!(
        first.settled().await.lookup,
        LookupState::NotFound { id: SpoolId::new(5) }
    );
    first.close();

    bridge.state.lock().unwrap().spools.push(5);

    let second = sync.open_session(TraySlot::new(0)).await.unwrap();
    second.edit(SpoolSelection::Spool(SpoolId::new(5))).unwrap();
    let state = second.settled().await;
    assert_eq!(state.lookup.record().map(|r| r.id), Some(5));
    assert!(state.actions().commit);
}

#[tokio::test]
async fn second_commit_while_submitting_is_rejected() {
    let bridge = FakeBridge::with(|s| {
        s.trays.insert("0".into(), Some(12));
        s.spools = vec![12];
    });
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/tray/0"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "status": "ok" }))
                .set_delay(Duration::from_millis(300)),
        )
        .with_priority(1)
        .expect(1)
        .mount(&server)
        .await;
    bridge.mount(&server).await;
    let mut config = SyncConfig::new(Url::parse(&server.uri()).unwrap());
    config.debounce = FAST_DEBOUNCE;
    let sync = SpoolSync::new(config).unwrap();

    let session = sync.open_session(TraySlot::new(0)).await.unwrap();
    assert!(session.settled().await.actions().commit);

    let first = tokio::spawn({
        let session = session.clone();
        async move { session.commit().await }
    });
    for _ in 0..50 {
        if session.snapshot().commit == CommitPhase::Submitting {
            break;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    assert_eq!(session.snapshot().commit, CommitPhase::Submitting);

    let err = session.commit().await.unwrap_err();
    assert!(
        matches!(&err, CoreError::PreconditionViolated { reason } if reason == "a commit is already in progress"),
        "got: {err:?}"
    );

    first.await.unwrap().unwrap();
    assert_eq!(session.snapshot().closed, Some(CloseReason::Committed));
}

struct Printer(Arc<Mutex<String>>);

impl Respond for Printer {
    fn respond(&self, _: &Request) -> ResponseTemplate {
        let tag = self.0.lock().unwrap().clone();
        ResponseTemplate::new(200).set_body_json(json!({
            "connected": true,
            "last_update": 1_700_000_000,
            "status": { "print": { "ams": { "ams": [
                { "id": "0", "tray": [ { "id": "0", "tray_uuid": tag } ] }
            ] } } }
        }))
    }
}

#[tokio::test]
async fn telemetry_refresh_recorrelates_tag() {
    let bridge = FakeBridge::with(|s| {
        s.trays.insert("0".into(), Some(12));
        s.spools = vec![12];
    });
    let (server, sync) = setup(&bridge, FAST_DEBOUNCE).await;
    let tag = Arc::new(Mutex::new("00000000000000000000000000000000".to_owned()));
    Mock::given(method("GET"))
        .and(path("/printer-info"))
        .respond_with(Printer(Arc::clone(&tag)))
        .mount(&server)
        .await;

    let session = sync.open_session(TraySlot::new(0)).await.unwrap();
    let state = session.settled().await;
    assert_eq!(state.tag, None);
    assert!(!state.actions().bind);

    // A spool with a tag is loaded while the session is open.
    *tag.lock().unwrap() = "A1B2C3D4".to_owned();
    let (a, b) = tokio::join!(session.refresh_tag(), session.refresh_tag());
    assert_eq!(a, b);
    assert_eq!(a.as_ref().map(|t| t.as_str()), Some("A1B2C3D4"));
    let state = session.snapshot();
    assert_eq!(state.tag.as_ref().map(|t| t.as_str()), Some("A1B2C3D4"));
    assert!(state.actions().bind);

    // Telemetry without the tray drops the tag again.
    assert_eq!(session.observe_telemetry(None), None);
    assert!(!session.actions().bind);
    assert!(session.snapshot().is_open());
}
