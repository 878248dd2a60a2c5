//! In-process stand-in for the Microsoft identity platform and the Graph
//! drive endpoints, served by axum on an ephemeral port.

#![allow(dead_code)]

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{header, HeaderMap, Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::{Json, Router};
use graphdrive_sharepoint::SharepointConfig;
use percent_encoding::percent_decode_str;
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

pub const TOKEN: &str = "test-token";
pub const SITE: &str = "contoso.sharepoint.com,site-guid,web-guid";
pub const LAST_MODIFIED: &str = "2024-05-01T12:00:00Z";
pub const LAST_MODIFIED_UNIX: i64 = 1_714_564_800;

#[derive(Debug, Clone)]
pub struct MockItem {
    pub id: String,
    pub content: Vec<u8>,
    pub folder: bool,
    pub mime: Option<String>,
}

#[derive(Debug, Clone)]
pub struct MockDrive {
    pub id: String,
    pub name: String,
    pub list_id: String,
}

#[derive(Debug, Clone)]
pub struct Session {
    drive_id: String,
    path: String,
    received: Vec<u8>,
}

/// A request as the server saw it.
#[derive(Debug, Clone)]
pub struct Seen {
    pub method: String,
    pub path: String,
    pub authorized: bool,
    pub content_range: Option<String>,
    pub body: Value,
}

#[derive(Debug, Default)]
pub struct MockState {
    pub base: String,
    pub token_requests: usize,
    pub drives: Vec<MockDrive>,
    /// (drive id, drive-relative path) → item.
    pub items: BTreeMap<(String, String), MockItem>,
    pub sessions: BTreeMap<String, Session>,
    pub seen: Vec<Seen>,
    /// Number of upcoming Graph calls answered with 429.
    pub throttle: u32,
    /// Number of upcoming Graph calls answered with 401 despite a valid token.
    pub reject_tokens: u32,
    /// Upload chunks accepted before the next one is rejected.
    pub fail_chunk_after: Option<u32>,
    /// Copy monitors report `failed` and nothing is copied.
    pub fail_copies: bool,
    next_id: u64,
}

impl MockState {
    fn next(&mut self, prefix: &str) -> String {
        self.next_id += 1;
        format!("{}-{}", prefix, self.next_id)
    }

    fn drive_by_id(&self, id: &str) -> Option<&MockDrive> {
        self.drives.iter().find(|d| d.id == id)
    }

    fn insert_parents(&mut self, drive_id: &str, path: &str) {
        let mut dir = parent_of(path).to_string();
        while !dir.is_empty() {
            let key = (drive_id.to_string(), dir.clone());
            if !self.items.contains_key(&key) {
                let id = self.next("item");
                self.items.insert(
                    key,
                    MockItem {
                        id,
                        content: Vec::new(),
                        folder: true,
                        mime: None,
                    },
                );
            }
            dir = parent_of(&dir).to_string();
        }
    }

    fn store(&mut self, drive_id: &str, path: &str, content: Vec<u8>, mime: Option<String>) -> Value {
        self.insert_parents(drive_id, path);
        let key = (drive_id.to_string(), path.to_string());
        let id = match self.items.get(&key) {
            Some(existing) => existing.id.clone(),
            None => self.next("item"),
        };
        self.items.insert(
            key,
            MockItem {
                id,
                content,
                folder: false,
                mime,
            },
        );
        self.item_json(drive_id, path)
    }

    fn path_of(&self, drive_id: &str, item_id: &str) -> Option<String> {
        if item_id == root_id(drive_id) {
            return Some(String::new());
        }
        self.items
            .iter()
            .find(|((d, _), item)| d == drive_id && item.id == item_id)
            .map(|((_, p), _)| p.clone())
    }

    fn item_json(&self, drive_id: &str, path: &str) -> Value {
        let drive_name = self
            .drive_by_id(drive_id)
            .map(|d| d.name.clone())
            .unwrap_or_default();
        if path.is_empty() {
            return json!({
                "id": root_id(drive_id),
                "name": "root",
                "root": {},
                "folder": { "childCount": 0 },
                "webUrl": format!("https://contoso.sharepoint.com/sites/test/{}", drive_name),
                "lastModifiedDateTime": LAST_MODIFIED,
            });
        }
        let Some(item) = self.items.get(&(drive_id.to_string(), path.to_string())) else {
            return Value::Null;
        };
        let parent = parent_of(path);
        let mut v = json!({
            "id": item.id,
            "name": path.rsplit('/').next().unwrap_or(path),
            "size": item.content.len(),
            "webUrl": format!("https://contoso.sharepoint.com/sites/test/{}/{}", drive_name, path),
            "createdDateTime": LAST_MODIFIED,
            "lastModifiedDateTime": LAST_MODIFIED,
            "parentReference": {
                "driveId": drive_id,
                "path": if parent.is_empty() {
                    format!("/drives/{}/root:", drive_id)
                } else {
                    format!("/drives/{}/root:/{}", drive_id, parent)
                },
            },
        });
        if item.folder {
            v["folder"] = json!({ "childCount": self.children(drive_id, path).len() });
        } else {
            v["file"] = json!({ "mimeType": item.mime.clone().unwrap_or_else(|| "application/octet-stream".into()) });
        }
        v
    }

    fn children(&self, drive_id: &str, dir: &str) -> Vec<String> {
        self.items
            .keys()
            .filter(|(d, p)| d == drive_id && parent_of(p) == dir)
            .map(|(_, p)| p.clone())
            .collect()
    }

    fn remove_subtree(&mut self, drive_id: &str, path: &str) -> bool {
        let prefix = format!("{}/", path);
        let before = self.items.len();
        self.items
            .retain(|(d, p), _| !(d == drive_id && (p == path || p.starts_with(&prefix))));
        before != self.items.len()
    }

    fn drive_json(&self, drive: &MockDrive) -> Value {
        json!({
            "id": drive.id,
            "name": drive.name,
            "driveType": "documentLibrary",
            "webUrl": format!("https://contoso.sharepoint.com/sites/test/{}", drive.name),
            "lastModifiedDateTime": LAST_MODIFIED,
        })
    }
}

fn root_id(drive_id: &str) -> String {
    format!("root-{}", drive_id)
}

fn parent_of(path: &str) -> &str {
    path.rfind('/').map(|i| &path[..i]).unwrap_or("")
}

/// Handle to a running mock server.
pub struct MockGraph {
    pub addr: SocketAddr,
    pub state: Arc<Mutex<MockState>>,
}

impl MockGraph {
    /// Start a server with a single `Documents` library.
    pub async fn start() -> Self {
        let state = Arc::new(Mutex::new(MockState::default()));
        let app = Router::new().fallback(handle).with_state(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        {
            let mut s = state.lock().unwrap();
            s.base = format!("http://{}", addr);
            s.drives.push(MockDrive {
                id: "drive-documents".into(),
                name: "Documents".into(),
                list_id: "list-documents".into(),
            });
        }
        Self { addr, state }
    }

    /// Connection settings pointing at this server, with no bound library.
    pub fn config(&self) -> SharepointConfig {
        let mut cfg = SharepointConfig::new("tenant-id", "client-id", "client-secret", SITE);
        cfg.graph_base_url = format!("http://{}/graph", self.addr);
        cfg.login_base_url = format!("http://{}/login", self.addr);
        cfg.timeout_sec = 10;
        cfg
    }

    pub fn add_drive(&self, name: &str) {
        let mut s = self.state.lock().unwrap();
        let id = format!("drive-{}", name.to_lowercase());
        let list_id = format!("list-{}", name.to_lowercase());
        s.drives.push(MockDrive {
            id,
            name: name.into(),
            list_id,
        });
    }

    pub fn seed(&self, drive: &str, path: &str, content: &[u8]) {
        let mut s = self.state.lock().unwrap();
        let id = s
            .drives
            .iter()
            .find(|d| d.name == drive)
            .map(|d| d.id.clone())
            .unwrap();
        s.store(&id, path, content.to_vec(), Some("text/plain".into()));
    }

    pub fn content(&self, drive: &str, path: &str) -> Option<Vec<u8>> {
        let s = self.state.lock().unwrap();
        let id = s.drives.iter().find(|d| d.name == drive)?.id.clone();
        s.items.get(&(id, path.to_string())).map(|i| i.content.clone())
    }

    pub fn token_requests(&self) -> usize {
        self.state.lock().unwrap().token_requests
    }

    pub fn throttle_next(&self, n: u32) {
        self.state.lock().unwrap().throttle = n;
    }

    pub fn reject_tokens_next(&self, n: u32) {
        self.state.lock().unwrap().reject_tokens = n;
    }

    pub fn fail_chunk_after(&self, accepted: u32) {
        self.state.lock().unwrap().fail_chunk_after = Some(accepted);
    }

    pub fn fail_copies(&self) {
        self.state.lock().unwrap().fail_copies = true;
    }

    pub fn open_sessions(&self) -> usize {
        self.state.lock().unwrap().sessions.len()
    }

    pub fn seen(&self) -> Vec<Seen> {
        self.state.lock().unwrap().seen.clone()
    }

    pub fn has_drive(&self, name: &str) -> bool {
        self.state.lock().unwrap().drives.iter().any(|d| d.name == name)
    }
}

// ─── Routing ─────────────────────────────────────────────────────────

fn status(code: StatusCode) -> Response {
    code.into_response()
}

fn graph_error(code: StatusCode, graph_code: &str) -> Response {
    (
        code,
        Json(json!({ "error": { "code": graph_code, "message": graph_code } })),
    )
        .into_response()
}

fn not_found() -> Response {
    graph_error(StatusCode::NOT_FOUND, "itemNotFound")
}

async fn handle(
    State(state): State<Arc<Mutex<MockState>>>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let raw_path = uri.path().to_string();
    let query = uri.query().unwrap_or("").to_string();
    let authorized = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .map(|v| v == format!("Bearer {}", TOKEN))
        .unwrap_or(false);
    let content_range = headers
        .get(header::CONTENT_RANGE)
        .and_then(|v| v.to_str().ok())
        .map(String::from);
    let json_body: Value = serde_json::from_slice(&body).unwrap_or(Value::Null);

    let mut s = state.lock().unwrap();
    s.seen.push(Seen {
        method: method.to_string(),
        path: raw_path.clone(),
        authorized,
        content_range: content_range.clone(),
        body: json_body.clone(),
    });

    if let Some(rest) = raw_path.strip_prefix("/login/") {
        if method == Method::POST && rest.ends_with("/oauth2/v2.0/token") {
            let form = String::from_utf8_lossy(&body);
            if !form.contains("grant_type=client_credentials") {
                return (
                    StatusCode::BAD_REQUEST,
                    Json(json!({ "error": "unsupported_grant_type" })),
                )
                    .into_response();
            }
            s.token_requests += 1;
            return Json(json!({
                "token_type": "Bearer",
                "expires_in": 3599,
                "access_token": TOKEN,
            }))
            .into_response();
        }
        return status(StatusCode::NOT_FOUND);
    }

    if let Some(sid) = raw_path.strip_prefix("/upload/") {
        return upload_chunk(&mut s, sid, &method, content_range.as_deref(), &body);
    }

    if raw_path.starts_with("/monitor/") {
        if s.fail_copies {
            return Json(json!({
                "status": "failed",
                "error": { "code": "generalException", "message": "copy aborted" },
            }))
            .into_response();
        }
        return Json(json!({ "status": "completed", "percentageComplete": 100.0 })).into_response();
    }

    let Some(graph) = raw_path.strip_prefix("/graph/") else {
        return status(StatusCode::NOT_FOUND);
    };
    if !authorized {
        return graph_error(StatusCode::UNAUTHORIZED, "InvalidAuthenticationToken");
    }
    if s.reject_tokens > 0 {
        s.reject_tokens -= 1;
        return graph_error(StatusCode::UNAUTHORIZED, "InvalidAuthenticationToken");
    }
    if s.throttle > 0 {
        s.throttle -= 1;
        return (
            StatusCode::TOO_MANY_REQUESTS,
            [(header::RETRY_AFTER, "0")],
            Json(json!({ "error": { "code": "activityLimitReached", "message": "throttled" } })),
        )
            .into_response();
    }

    let graph = graph.to_string();
    if let Some(rest) = graph.strip_prefix("sites/") {
        return sites(&mut s, rest, &method, &query, &json_body);
    }
    if let Some(rest) = graph.strip_prefix("drives/") {
        return drives(&mut s, rest, &method, &query, &headers, &body, &json_body);
    }
    status(StatusCode::NOT_FOUND)
}

fn sites(s: &mut MockState, rest: &str, method: &Method, query: &str, body: &Value) -> Response {
    let Some((site, tail)) = rest.split_once('/') else {
        return status(StatusCode::NOT_FOUND);
    };
    if percent_decode_str(site).decode_utf8_lossy() != SITE {
        return not_found();
    }
    let parts: Vec<&str> = tail.split('/').collect();
    match (method.clone(), parts.as_slice()) {
        (Method::GET, ["drives"]) => {
            let all: Vec<Value> = s.drives.iter().map(|d| s.drive_json(d)).collect();
            // Two pages whenever there is more than one library.
            if query.contains("page=2") {
                Json(json!({ "value": all[1..].to_vec() })).into_response()
            } else if all.len() > 1 {
                Json(json!({
                    "value": all[..1].to_vec(),
                    "@odata.nextLink": format!("{}/graph/sites/{}/drives?page=2", s.base, site),
                }))
                .into_response()
            } else {
                Json(json!({ "value": all })).into_response()
            }
        }
        (Method::POST, ["lists"]) => {
            let name = body["displayName"].as_str().unwrap_or_default().to_string();
            if body["list"]["template"] != "documentLibrary" {
                return graph_error(StatusCode::BAD_REQUEST, "invalidRequest");
            }
            if s.drives.iter().any(|d| d.name == name) {
                return graph_error(StatusCode::CONFLICT, "nameAlreadyExists");
            }
            let n = s.next("lib");
            let drive = MockDrive {
                id: format!("drive-{}", n),
                name: name.clone(),
                list_id: format!("list-{}", n),
            };
            let list_id = drive.list_id.clone();
            s.drives.push(drive);
            (
                StatusCode::CREATED,
                Json(json!({ "id": list_id, "name": name, "displayName": name })),
            )
                .into_response()
        }
        (Method::GET, ["lists", list_id, "drive"]) => {
            match s.drives.iter().find(|d| d.list_id == *list_id) {
                Some(d) => Json(s.drive_json(d)).into_response(),
                None => not_found(),
            }
        }
        (Method::DELETE, ["lists", list_id]) => {
            let Some(pos) = s.drives.iter().position(|d| d.list_id == *list_id) else {
                return not_found();
            };
            let drive = s.drives.remove(pos);
            s.items.retain(|(d, _), _| *d != drive.id);
            status(StatusCode::NO_CONTENT)
        }
        _ => status(StatusCode::NOT_FOUND),
    }
}

fn drives(
    s: &mut MockState,
    rest: &str,
    method: &Method,
    query: &str,
    headers: &HeaderMap,
    raw: &Bytes,
    body: &Value,
) -> Response {
    let (drive_id, tail) = rest.split_once('/').unwrap_or((rest, ""));
    let drive_id = drive_id.to_string();
    let Some(drive) = s.drive_by_id(&drive_id).cloned() else {
        return not_found();
    };

    if tail == "list" && *method == Method::GET {
        return Json(json!({ "id": drive.list_id, "name": drive.name })).into_response();
    }

    // Path addressing: root, root/children, root:/{path}:[/{action}]
    let (path, action) = if tail == "root" {
        (String::new(), String::new())
    } else if let Some(a) = tail.strip_prefix("root/") {
        (String::new(), a.to_string())
    } else if let Some(p) = tail.strip_prefix("root:/") {
        let (encoded, after) = p.split_once(':').unwrap_or((p, ""));
        let decoded = percent_decode_str(encoded).decode_utf8_lossy().to_string();
        (decoded, after.trim_start_matches('/').to_string())
    } else if let Some(p) = tail.strip_prefix("items/") {
        let (item_id, action) = p.split_once('/').unwrap_or((p, ""));
        return by_id(s, &drive_id, item_id, action, method, body);
    } else {
        return status(StatusCode::NOT_FOUND);
    };

    let key = (drive_id.clone(), path.clone());
    let exists = path.is_empty() || s.items.contains_key(&key);

    match (method.clone(), action.as_str()) {
        (Method::GET, "") => {
            if exists {
                Json(s.item_json(&drive_id, &path)).into_response()
            } else {
                not_found()
            }
        }
        (Method::GET, "content") => match s.items.get(&key) {
            Some(item) if !item.folder => item.content.clone().into_response(),
            _ => not_found(),
        },
        (Method::PUT, "content") => {
            if exists && query.contains("conflictBehavior=fail") {
                return graph_error(StatusCode::CONFLICT, "nameAlreadyExists");
            }
            let mime = headers
                .get(header::CONTENT_TYPE)
                .and_then(|v| v.to_str().ok())
                .map(String::from);
            let v = s.store(&drive_id, &path, raw.to_vec(), mime);
            (StatusCode::CREATED, Json(v)).into_response()
        }
        (Method::GET, "children") => {
            if !exists {
                return not_found();
            }
            let value: Vec<Value> = s
                .children(&drive_id, &path)
                .iter()
                .map(|p| s.item_json(&drive_id, p))
                .collect();
            Json(json!({ "value": value })).into_response()
        }
        (Method::POST, "children") => {
            if !exists {
                return not_found();
            }
            let name = body["name"].as_str().unwrap_or_default();
            let child = if path.is_empty() {
                name.to_string()
            } else {
                format!("{}/{}", path, name)
            };
            let child_key = (drive_id.clone(), child.clone());
            if s.items.contains_key(&child_key) {
                return graph_error(StatusCode::CONFLICT, "nameAlreadyExists");
            }
            let id = s.next("item");
            s.items.insert(
                child_key,
                MockItem {
                    id,
                    content: Vec::new(),
                    folder: true,
                    mime: None,
                },
            );
            (StatusCode::CREATED, Json(s.item_json(&drive_id, &child))).into_response()
        }
        (Method::POST, "createUploadSession") => {
            if exists && body["item"]["@microsoft.graph.conflictBehavior"] == "fail" {
                return graph_error(StatusCode::CONFLICT, "nameAlreadyExists");
            }
            let sid = s.next("session");
            s.sessions.insert(
                sid.clone(),
                Session {
                    drive_id: drive_id.clone(),
                    path: path.clone(),
                    received: Vec::new(),
                },
            );
            Json(json!({
                "uploadUrl": format!("{}/upload/{}", s.base, sid),
                "expirationDateTime": "2030-01-01T00:00:00Z",
                "nextExpectedRanges": ["0-"],
            }))
            .into_response()
        }
        (Method::DELETE, "") => {
            if path.is_empty() {
                return graph_error(StatusCode::FORBIDDEN, "accessDenied");
            }
            if s.remove_subtree(&drive_id, &path) {
                status(StatusCode::NO_CONTENT)
            } else {
                not_found()
            }
        }
        _ => status(StatusCode::NOT_FOUND),
    }
}

fn by_id(
    s: &mut MockState,
    drive_id: &str,
    item_id: &str,
    action: &str,
    method: &Method,
    body: &Value,
) -> Response {
    let Some(path) = s.path_of(drive_id, item_id) else {
        return not_found();
    };
    match (method.clone(), action) {
        (Method::PATCH, "") => {
            let parent_id = body["parentReference"]["id"].as_str().unwrap_or_default();
            let Some(parent) = s.path_of(drive_id, parent_id) else {
                return not_found();
            };
            let name = body["name"].as_str().unwrap_or_default();
            let target = if parent.is_empty() {
                name.to_string()
            } else {
                format!("{}/{}", parent, name)
            };
            let prefix = format!("{}/", path);
            let moved: Vec<((String, String), MockItem)> = s
                .items
                .iter()
                .filter(|((d, p), _)| d == drive_id && (*p == path || p.starts_with(&prefix)))
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect();
            for ((d, p), item) in moved {
                s.items.remove(&(d.clone(), p.clone()));
                s.items.insert((d, format!("{}{}", target, &p[path.len()..])), item);
            }
            Json(s.item_json(drive_id, &target)).into_response()
        }
        (Method::POST, "copy") => {
            let parent_id = body["parentReference"]["id"].as_str().unwrap_or_default();
            let Some(parent) = s.path_of(drive_id, parent_id) else {
                return not_found();
            };
            let name = body["name"].as_str().unwrap_or_default();
            let target = if parent.is_empty() {
                name.to_string()
            } else {
                format!("{}/{}", parent, name)
            };
            let Some(item) = s.items.get(&(drive_id.to_string(), path)).cloned() else {
                return not_found();
            };
            if !s.fail_copies {
                s.store(drive_id, &target, item.content, item.mime);
            }
            let op = s.next("op");
            let monitor = format!("{}/monitor/{}", s.base, op);
            (StatusCode::ACCEPTED, [(header::LOCATION, monitor)]).into_response()
        }
        (Method::POST, "invite") => {
            let email = body["recipients"][0]["email"].as_str().unwrap_or_default();
            let roles = body["roles"].clone();
            let id = s.next("perm");
            Json(json!({
                "value": [{
                    "id": id,
                    "roles": roles,
                    "grantedTo": { "user": { "email": email, "displayName": email } },
                }]
            }))
            .into_response()
        }
        _ => status(StatusCode::NOT_FOUND),
    }
}

fn upload_chunk(
    s: &mut MockState,
    sid: &str,
    method: &Method,
    content_range: Option<&str>,
    body: &Bytes,
) -> Response {
    if *method == Method::DELETE {
        s.sessions.remove(sid);
        return status(StatusCode::NO_CONTENT);
    }
    match s.fail_chunk_after {
        Some(0) => return graph_error(StatusCode::BAD_REQUEST, "invalidRequest"),
        Some(n) => s.fail_chunk_after = Some(n - 1),
        None => {}
    }
    let Some(range) = content_range.and_then(|r| r.strip_prefix("bytes ")) else {
        return graph_error(StatusCode::BAD_REQUEST, "invalidRange");
    };
    let Some((span, total)) = range.split_once('/') else {
        return graph_error(StatusCode::BAD_REQUEST, "invalidRange");
    };
    let (start, end) = span.split_once('-').unwrap_or(("0", "0"));
    let start: usize = start.parse().unwrap_or(0);
    let end: usize = end.parse().unwrap_or(0);
    let total: usize = total.parse().unwrap_or(0);

    let Some(session) = s.sessions.get_mut(sid) else {
        return graph_error(StatusCode::NOT_FOUND, "uploadSessionNotFound");
    };
    if start != session.received.len() || end + 1 - start != body.len() {
        return graph_error(StatusCode::RANGE_NOT_SATISFIABLE, "invalidRange");
    }
    session.received.extend_from_slice(body);

    if session.received.len() < total {
        let next = session.received.len();
        return (
            StatusCode::ACCEPTED,
            Json(json!({ "nextExpectedRanges": [format!("{}-", next)] })),
        )
            .into_response();
    }

    let Some(done) = s.sessions.remove(sid) else {
        return not_found();
    };
    let v = s.store(&done.drive_id, &done.path, done.received, None);
    (StatusCode::CREATED, Json(v)).into_response()
}
