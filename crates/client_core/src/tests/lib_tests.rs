use super::*;
use std::{collections::HashMap, sync::Arc, time::Duration};

use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use tokio::{net::TcpListener, sync::Semaphore};

#[derive(Clone)]
struct ModerationServerState {
    tree: Arc<Mutex<DirectoryNode>>,
    fail_tree: Arc<Mutex<bool>>,
    malformed_tree: Arc<Mutex<bool>>,
    listing_delays_ms: Arc<Mutex<HashMap<String, u64>>>,
    update_bodies: Arc<Mutex<Vec<UpdateStatusesRequest>>>,
    fail_updates: Arc<Mutex<bool>>,
    gate_updates: Arc<Mutex<bool>>,
    update_gate: Arc<Semaphore>,
}

fn photo(path: &str, status: PhotoStatus) -> PhotoRecord {
    PhotoRecord {
        path: path.to_string(),
        status,
        is_nude: false,
        has_face: false,
        nsfw_score: None,
    }
}

/// Pictures/X holds p1 (normal) and p2 (approved); Pictures/Y holds three
/// photos with names that only sort apart case-insensitively.
fn sample_tree() -> DirectoryNode {
    let x = DirectoryNode {
        files: vec![
            photo("Pictures/X/p1.jpg", PhotoStatus::Normal),
            photo("Pictures/X/p2.jpg", PhotoStatus::Approved),
        ],
        ..DirectoryNode::default()
    };
    let y = DirectoryNode {
        files: vec![
            photo("Pictures/Y/c.jpg", PhotoStatus::Pending),
            photo("Pictures/Y/A.jpg", PhotoStatus::Normal),
            photo("Pictures/Y/b.jpg", PhotoStatus::Approved),
        ],
        ..DirectoryNode::default()
    };
    let mut pictures = DirectoryNode::default();
    pictures.dirs.insert("X".to_string(), x);
    pictures.dirs.insert("Y".to_string(), y);
    let mut root = DirectoryNode::default();
    root.dirs.insert("Pictures".to_string(), pictures);
    root
}

async fn serve_tree(State(state): State<ModerationServerState>) -> Response {
    if *state.fail_tree.lock().await {
        return StatusCode::INTERNAL_SERVER_ERROR.into_response();
    }
    if *state.malformed_tree.lock().await {
        return (
            [(header::CONTENT_TYPE, "application/json")],
            "{\"dirs\": not-json",
        )
            .into_response();
    }
    Json(state.tree.lock().await.clone()).into_response()
}

async fn serve_listing(
    State(state): State<ModerationServerState>,
    Path(path): Path<String>,
) -> Response {
    let delay = state.listing_delays_ms.lock().await.get(&path).copied();
    if let Some(ms) = delay {
        tokio::time::sleep(Duration::from_millis(ms)).await;
    }
    let tree = state.tree.lock().await.clone();
    match crate::tree::descend(&tree, &path) {
        Some(node) => Json(DirectoryListing {
            files: node.files.clone(),
            directories: node.dirs.keys().cloned().collect(),
        })
        .into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

async fn serve_update(
    State(state): State<ModerationServerState>,
    Json(request): Json<UpdateStatusesRequest>,
) -> Response {
    if *state.gate_updates.lock().await {
        let _permit = state.update_gate.acquire().await.expect("gate");
    }
    if *state.fail_updates.lock().await {
        return StatusCode::INTERNAL_SERVER_ERROR.into_response();
    }
    state.update_bodies.lock().await.push(request.clone());
    let count = request.updates.len();
    Json(UpdateStatusesResponse {
        success: true,
        message: format!("updated {count} photo statuses"),
        updated_count: count,
        saved_updates: request.updates,
    })
    .into_response()
}

async fn spawn_moderation_server() -> (String, ModerationServerState) {
    std::env::set_var("NO_PROXY", "127.0.0.1,localhost");
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("local addr");
    let state = ModerationServerState {
        tree: Arc::new(Mutex::new(sample_tree())),
        fail_tree: Arc::new(Mutex::new(false)),
        malformed_tree: Arc::new(Mutex::new(false)),
        listing_delays_ms: Arc::new(Mutex::new(HashMap::new())),
        update_bodies: Arc::new(Mutex::new(Vec::new())),
        fail_updates: Arc::new(Mutex::new(false)),
        gate_updates: Arc::new(Mutex::new(false)),
        update_gate: Arc::new(Semaphore::new(0)),
    };
    let app = Router::new()
        .route("/api/tree", get(serve_tree))
        .route("/api/photos/:path", get(serve_listing))
        .route("/api/update_statuses", post(serve_update))
        .with_state(state.clone());
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    (format!("http://{addr}"), state)
}

fn drain(rx: &mut broadcast::Receiver<ClientEvent>) -> Vec<ClientEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

fn selected_paths(events: &[ClientEvent]) -> Vec<String> {
    events
        .iter()
        .filter_map(|event| match event {
            ClientEvent::DirectorySelected { path, .. } => Some(path.clone()),
            _ => None,
        })
        .collect()
}

#[tokio::test]
async fn load_tree_builds_navigable_tree_and_emits_event() {
    let (url, _state) = spawn_moderation_server().await;
    let client = ModerationClient::new(url);
    let mut rx = client.subscribe_events();

    client.load_tree().await.expect("load tree");

    let events = drain(&mut rx);
    let root = events
        .iter()
        .find_map(|event| match event {
            ClientEvent::TreeLoaded { root } => Some(root.clone()),
            _ => None,
        })
        .expect("tree loaded event");
    assert!(root.dirs.contains_key("Pictures"));
}

#[tokio::test]
async fn load_tree_surfaces_non_2xx_as_fetch_error() {
    let (url, state) = spawn_moderation_server().await;
    *state.fail_tree.lock().await = true;

    let client = ModerationClient::new(url);
    let err = client.load_tree().await.expect_err("must fail");
    assert!(matches!(err, ClientError::Fetch { what: "tree", .. }));
}

#[tokio::test]
async fn load_tree_rejects_a_malformed_body() {
    let (url, state) = spawn_moderation_server().await;
    *state.malformed_tree.lock().await = true;

    let client = ModerationClient::new(url);
    let err = client.load_tree().await.expect_err("must fail");
    assert!(matches!(err, ClientError::Fetch { what: "tree", .. }));
}

#[tokio::test]
async fn scoped_client_roots_the_tree_at_the_configured_path() {
    let (url, _state) = spawn_moderation_server().await;
    let client = ModerationClient::with_root(url, Some("Pictures".to_string()));

    client.load_tree().await.expect("load tree");
    client.select_directory("X").await.expect("select");

    let selection = client.selection().await;
    assert_eq!(selection.active_path.as_deref(), Some("X"));
    assert_eq!(selection.photos.len(), 2);
}

#[tokio::test]
async fn missing_scope_path_fails_the_load() {
    let (url, _state) = spawn_moderation_server().await;
    let client = ModerationClient::with_root(url, Some("Pictures/Nope".to_string()));

    let err = client.load_tree().await.expect_err("must fail");
    assert!(matches!(err, ClientError::PathNotFound { .. }));
}

#[tokio::test]
async fn selection_signals_once_and_resets_per_directory_state() {
    let (url, _state) = spawn_moderation_server().await;
    let client = ModerationClient::new(url);
    let mut rx = client.subscribe_events();

    client.load_tree().await.expect("load tree");
    client.select_directory("Pictures/X").await.expect("select X");

    let events = drain(&mut rx);
    assert_eq!(selected_paths(&events), vec!["Pictures/X".to_string()]);

    // Edit, filter and flip the sort inside X.
    client.cycle_status("Pictures/X/p1.jpg").await.expect("cycle");
    client
        .set_filter(StatusFilter::Only(PhotoStatus::Pending))
        .await;
    client.toggle_sort().await;
    assert_eq!(client.pending_count().await, 1);

    // Navigating away discards the pending edit and the filter, but the
    // sort direction survives as a user preference.
    client.select_directory("Pictures/Y").await.expect("select Y");
    assert_eq!(client.pending_count().await, 0);

    let grid = client.grid().await;
    let names: Vec<_> = grid.iter().map(|g| g.photo.file_name()).collect();
    assert_eq!(names, vec!["c.jpg", "b.jpg", "A.jpg"]);

    let events = drain(&mut rx);
    assert_eq!(selected_paths(&events), vec!["Pictures/Y".to_string()]);
}

#[tokio::test]
async fn selecting_a_missing_path_leaves_selection_untouched() {
    let (url, _state) = spawn_moderation_server().await;
    let client = ModerationClient::new(url);

    client.load_tree().await.expect("load tree");
    client.select_directory("Pictures/X").await.expect("select X");

    let before = client.selection().await;
    let err = client
        .select_directory("Pictures/Missing")
        .await
        .expect_err("must fail");
    assert!(matches!(err, ClientError::PathNotFound { .. }));
    assert_eq!(client.selection().await, before);
}

#[tokio::test]
async fn listing_selection_resolves_through_the_flat_endpoint() {
    let (url, _state) = spawn_moderation_server().await;
    let client = ModerationClient::new(url);

    let applied = client
        .select_directory_listing("Pictures/X")
        .await
        .expect("select via listing");
    assert!(applied);

    let selection = client.selection().await;
    assert_eq!(selection.active_path.as_deref(), Some("Pictures/X"));
    assert_eq!(selection.photos.len(), 2);

    let err = client
        .select_directory_listing("Pictures/Missing")
        .await
        .expect_err("must 404");
    assert!(matches!(err, ClientError::PathNotFound { .. }));
    assert_eq!(
        client.selection().await.active_path.as_deref(),
        Some("Pictures/X")
    );
}

#[tokio::test]
async fn superseded_listing_selection_is_discarded() {
    let (url, state) = spawn_moderation_server().await;
    state
        .listing_delays_ms
        .lock()
        .await
        .insert("Pictures/X".to_string(), 300);

    let client = Arc::new(ModerationClient::new(url));
    let mut rx = client.subscribe_events();

    let slow = {
        let client = Arc::clone(&client);
        tokio::spawn(async move { client.select_directory_listing("Pictures/X").await })
    };
    // Let the slow selection reach the server before starting the next one.
    tokio::time::sleep(Duration::from_millis(50)).await;

    let applied = client
        .select_directory_listing("Pictures/Y")
        .await
        .expect("select Y");
    assert!(applied);

    let stale = slow.await.expect("join").expect("request itself succeeds");
    assert!(!stale, "stale selection must be discarded");

    let selection = client.selection().await;
    assert_eq!(selection.active_path.as_deref(), Some("Pictures/Y"));

    // Only the winning selection ever signaled the grid.
    let events = drain(&mut rx);
    assert_eq!(selected_paths(&events), vec!["Pictures/Y".to_string()]);
}

#[tokio::test]
async fn cycle_then_save_persists_the_diff_and_merges_truth() {
    let (url, state) = spawn_moderation_server().await;
    let client = ModerationClient::new(url);

    client.load_tree().await.expect("load tree");
    client.select_directory("Pictures/X").await.expect("select X");

    let next = client.cycle_status("Pictures/X/p1.jpg").await.expect("cycle");
    assert_eq!(next, PhotoStatus::Pending);
    assert_eq!(client.pending_count().await, 1);

    let outcome = client.save().await.expect("save");
    assert_eq!(
        outcome,
        SaveOutcome::Saved {
            applied: vec!["Pictures/X/p1.jpg".to_string()]
        }
    );

    let bodies = state.update_bodies.lock().await.clone();
    assert_eq!(bodies.len(), 1);
    assert_eq!(
        bodies[0].updates,
        vec![StatusUpdate {
            path: "Pictures/X/p1.jpg".to_string(),
            status: PhotoStatus::Pending,
        }]
    );

    // Overlay cleared, truth updated in the selection...
    assert_eq!(client.pending_count().await, 0);
    let selection = client.selection().await;
    assert_eq!(selection.photos[0].status, PhotoStatus::Pending);

    // ...and in the tree, so re-navigation shows the saved value.
    client.select_directory("Pictures/Y").await.expect("select Y");
    client.select_directory("Pictures/X").await.expect("back to X");
    let selection = client.selection().await;
    assert_eq!(selection.photos[0].status, PhotoStatus::Pending);
}

#[tokio::test]
async fn failed_save_keeps_pending_edits_for_a_retry() {
    let (url, state) = spawn_moderation_server().await;
    *state.fail_updates.lock().await = true;

    let client = ModerationClient::new(url);
    client.load_tree().await.expect("load tree");
    client.select_directory("Pictures/X").await.expect("select X");
    client.cycle_status("Pictures/X/p1.jpg").await.expect("cycle");

    let err = client.save().await.expect_err("must fail");
    assert!(matches!(err, ClientError::Network { .. }));
    assert_eq!(client.pending_count().await, 1);

    // A retry after the backend recovers flushes the same diff.
    *state.fail_updates.lock().await = false;
    let outcome = client.save().await.expect("retry");
    assert!(matches!(outcome, SaveOutcome::Saved { .. }));
    assert_eq!(client.pending_count().await, 0);
}

#[tokio::test]
async fn save_with_an_empty_overlay_issues_no_request() {
    let (url, state) = spawn_moderation_server().await;
    let client = ModerationClient::new(url);

    client.load_tree().await.expect("load tree");
    client.select_directory("Pictures/X").await.expect("select X");

    let outcome = client.save().await.expect("save");
    assert_eq!(outcome, SaveOutcome::NothingToSave);
    assert!(state.update_bodies.lock().await.is_empty());
}

#[tokio::test]
async fn concurrent_save_is_rejected_while_the_first_is_in_flight() {
    let (url, state) = spawn_moderation_server().await;
    *state.gate_updates.lock().await = true;

    let client = Arc::new(ModerationClient::new(url));
    client.load_tree().await.expect("load tree");
    client.select_directory("Pictures/X").await.expect("select X");
    client.cycle_status("Pictures/X/p1.jpg").await.expect("cycle");

    let first = {
        let client = Arc::clone(&client);
        tokio::spawn(async move { client.save().await })
    };
    tokio::time::sleep(Duration::from_millis(50)).await;

    let err = client.save().await.expect_err("second save must be rejected");
    assert!(matches!(err, ClientError::SaveInFlight));

    state.update_gate.add_permits(1);
    let outcome = first.await.expect("join").expect("first save");
    assert!(matches!(outcome, SaveOutcome::Saved { .. }));
    assert_eq!(client.pending_count().await, 0);
}

#[tokio::test]
async fn navigating_away_discards_unsaved_edits() {
    let (url, _state) = spawn_moderation_server().await;
    let client = ModerationClient::new(url);

    client.load_tree().await.expect("load tree");
    client.select_directory("Pictures/X").await.expect("select X");
    client.cycle_status("Pictures/X/p1.jpg").await.expect("cycle");

    client.select_directory("Pictures/Y").await.expect("select Y");
    client.select_directory("Pictures/X").await.expect("back to X");

    // The discarded pending value is gone; p1 is back at server truth.
    let grid = client.grid().await;
    let p1 = grid
        .iter()
        .find(|g| g.photo.path == "Pictures/X/p1.jpg")
        .expect("p1 in grid");
    assert_eq!(p1.status, PhotoStatus::Normal);
    assert!(!p1.pending);
}

#[tokio::test]
async fn grid_updates_follow_overlay_and_view_changes() {
    let (url, _state) = spawn_moderation_server().await;
    let client = ModerationClient::new(url);
    client.load_tree().await.expect("load tree");
    client.select_directory("Pictures/X").await.expect("select X");

    client.cycle_status("Pictures/X/p1.jpg").await.expect("cycle");
    client
        .set_filter(StatusFilter::Only(PhotoStatus::Pending))
        .await;

    let grid = client.grid().await;
    assert_eq!(grid.len(), 1);
    assert_eq!(grid[0].photo.path, "Pictures/X/p1.jpg");
    assert_eq!(grid[0].status, PhotoStatus::Pending);
    assert!(grid[0].pending);

    // Server truth on the record is untouched until a save.
    assert_eq!(grid[0].photo.status, PhotoStatus::Normal);
}
