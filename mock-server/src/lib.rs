use std::{collections::BTreeMap, sync::Arc};

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{any, get, post},
    Json, Router,
};
use serde_json::{json, Map, Value};
use tokio::{net::TcpListener, sync::RwLock};
use tracing::debug;

/// JSON documents keyed by resource path (`properties/1`, `public/info`).
#[derive(Debug, Default)]
pub struct Store {
    docs: BTreeMap<String, Value>,
    next_id: u64,
}

impl Store {
    /// Seed a document. A trailing `.json` on `path` is ignored.
    pub fn with_doc(mut self, path: &str, doc: Value) -> Self {
        self.docs.insert(normalize(path), doc);
        self
    }

    fn list(&self, collection: &str) -> Vec<Value> {
        let prefix = format!("{collection}/");
        let mut items: Vec<(&str, &Value)> = self
            .docs
            .range(prefix.clone()..)
            .take_while(|(k, _)| k.starts_with(&prefix))
            .map(|(k, v)| (&k[prefix.len()..], v))
            .filter(|(rest, _)| !rest.contains('/'))
            .collect();
        items.sort_by_key(|(id, _)| (id.parse::<u64>().ok(), *id));
        items.into_iter().map(|(_, v)| v.clone()).collect()
    }
}

#[derive(Clone, Debug, Default)]
pub struct AppState {
    db: Arc<RwLock<Store>>,
    token: Option<Arc<str>>,
}

impl AppState {
    pub fn new(store: Store) -> Self {
        Self {
            db: Arc::new(RwLock::new(store)),
            token: None,
        }
    }

    /// Require `Authorization: Bearer <token>` outside `public/`.
    pub fn with_token(mut self, token: &str) -> Self {
        self.token = Some(Arc::from(token));
        self
    }

    fn authorize(&self, headers: &HeaderMap, key: &str) -> Result<(), Response> {
        let Some(expected) = self.token.as_deref() else {
            return Ok(());
        };
        if key == "public" || key.starts_with("public/") {
            return Ok(());
        }
        let presented = headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "));
        if presented == Some(expected) {
            Ok(())
        } else {
            Err(message(StatusCode::UNAUTHORIZED, "Unauthorized"))
        }
    }
}

/// Filter used when `RUST_LOG` is unset or blank.
pub const DEFAULT_LOG_FILTER: &str = "info";

/// The tracing filter directive for an optional `RUST_LOG` value.
pub fn log_filter(rust_log: Option<String>) -> String {
    rust_log
        .filter(|v| !v.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_LOG_FILTER.to_string())
}

pub fn app() -> Router {
    app_with_state(AppState::default())
}

pub fn app_with_state(state: AppState) -> Router {
    Router::new()
        .route("/echo", post(echo).put(echo).patch(echo))
        .route("/headers", get(echo_headers))
        .route("/status/{code}", any(status_only))
        .route(
            "/{*path}",
            get(read_doc)
                .post(create_doc)
                .put(replace_doc)
                .patch(patch_doc)
                .delete(delete_doc),
        )
        .with_state(state)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

pub async fn run_with(listener: TcpListener, state: AppState) -> Result<(), std::io::Error> {
    axum::serve(listener, app_with_state(state)).await
}

fn normalize(path: &str) -> String {
    let path = path.trim_matches('/');
    path.strip_suffix(".json").unwrap_or(path).to_string()
}

fn message(status: StatusCode, text: &str) -> Response {
    (status, Json(json!({ "message": text }))).into_response()
}

fn not_found() -> Response {
    message(StatusCode::NOT_FOUND, "Not found")
}

/// Object bodies only; a present `name` must be a non-empty string.
fn validate(body: Value) -> Result<Map<String, Value>, Response> {
    let Value::Object(fields) = body else {
        return Err(message(StatusCode::BAD_REQUEST, "Expected a JSON object"));
    };
    if let Some(name) = fields.get("name") {
        if !name.as_str().is_some_and(|n| !n.trim().is_empty()) {
            return Err(message(StatusCode::UNPROCESSABLE_ENTITY, "Name required"));
        }
    }
    Ok(fields)
}

/// RFC 7396 merge patch.
fn merge_patch(target: &mut Value, patch: &Value) {
    let Value::Object(patch_fields) = patch else {
        *target = patch.clone();
        return;
    };
    if !target.is_object() {
        *target = Value::Object(Map::new());
    }
    if let Value::Object(target_fields) = target {
        for (key, value) in patch_fields {
            if value.is_null() {
                target_fields.remove(key);
            } else {
                merge_patch(target_fields.entry(key.clone()).or_insert(Value::Null), value);
            }
        }
    }
}

async fn read_doc(
    State(state): State<AppState>,
    Path(path): Path<String>,
    headers: HeaderMap,
) -> Response {
    let key = normalize(&path);
    if let Err(denied) = state.authorize(&headers, &key) {
        return denied;
    }
    let db = state.db.read().await;
    if let Some(doc) = db.docs.get(&key) {
        return Json(doc.clone()).into_response();
    }
    let last = key.rsplit('/').next().unwrap_or_default();
    if last.parse::<u64>().is_ok() {
        return not_found();
    }
    Json(Value::Array(db.list(&key))).into_response()
}

async fn create_doc(
    State(state): State<AppState>,
    Path(path): Path<String>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    let key = normalize(&path);
    if let Err(denied) = state.authorize(&headers, &key) {
        return denied;
    }
    let mut fields = match validate(body) {
        Ok(fields) => fields,
        Err(rejected) => return rejected,
    };
    let mut db = state.db.write().await;
    db.next_id += 1;
    let id = db.next_id;
    fields.insert("id".to_string(), json!(id));
    let doc = Value::Object(fields);
    db.docs.insert(format!("{key}/{id}"), doc.clone());
    debug!(%key, id, "created document");
    (StatusCode::CREATED, Json(doc)).into_response()
}

async fn replace_doc(
    State(state): State<AppState>,
    Path(path): Path<String>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    let key = normalize(&path);
    if let Err(denied) = state.authorize(&headers, &key) {
        return denied;
    }
    let mut fields = match validate(body) {
        Ok(fields) => fields,
        Err(rejected) => return rejected,
    };
    let mut db = state.db.write().await;
    let Some(doc) = db.docs.get_mut(&key) else {
        return not_found();
    };
    if let Some(id) = doc.get("id") {
        fields.insert("id".to_string(), id.clone());
    }
    *doc = Value::Object(fields);
    Json(doc.clone()).into_response()
}

async fn patch_doc(
    State(state): State<AppState>,
    Path(path): Path<String>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    let key = normalize(&path);
    if let Err(denied) = state.authorize(&headers, &key) {
        return denied;
    }
    let patch = match validate(body) {
        Ok(fields) => Value::Object(fields),
        Err(rejected) => return rejected,
    };
    let mut db = state.db.write().await;
    let Some(doc) = db.docs.get_mut(&key) else {
        return not_found();
    };
    let id = doc.get("id").cloned();
    merge_patch(doc, &patch);
    if let (Some(id), Value::Object(fields)) = (id, &mut *doc) {
        fields.insert("id".to_string(), id);
    }
    Json(doc.clone()).into_response()
}

async fn delete_doc(
    State(state): State<AppState>,
    Path(path): Path<String>,
    headers: HeaderMap,
) -> Response {
    let key = normalize(&path);
    if let Err(denied) = state.authorize(&headers, &key) {
        return denied;
    }
    match state.db.write().await.docs.remove(&key) {
        Some(_) => StatusCode::NO_CONTENT.into_response(),
        None => not_found(),
    }
}

async fn echo(body: Bytes) -> Response {
    ([(header::CONTENT_TYPE, "application/json")], body).into_response()
}

async fn echo_headers(headers: HeaderMap) -> Json<Value> {
    let fields: Map<String, Value> = headers
        .iter()
        .filter_map(|(name, value)| {
            value
                .to_str()
                .ok()
                .map(|v| (name.as_str().to_string(), Value::String(v.to_string())))
        })
        .collect();
    Json(Value::Object(fields))
}

async fn status_only(Path(code): Path<u16>) -> StatusCode {
    StatusCode::from_u16(code).unwrap_or(StatusCode::BAD_REQUEST)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_filter_defaults_to_info() {
        assert_eq!(log_filter(None), "info");
        assert_eq!(log_filter(Some("  ".to_string())), "info");
        assert_eq!(log_filter(Some("mock_server=debug".to_string())), "mock_server=debug");
    }

    #[test]
    fn normalize_strips_slashes_and_json_suffix() {
        assert_eq!(normalize("things/1.json"), "things/1");
        assert_eq!(normalize("/properties/"), "properties");
        assert_eq!(normalize("public/info"), "public/info");
    }

    #[test]
    fn list_returns_direct_children_in_id_order() {
        let store = Store::default()
            .with_doc("properties/10", json!({"id": 10}))
            .with_doc("properties/2", json!({"id": 2}))
            .with_doc("properties/2/units/1", json!({"id": 1}))
            .with_doc("propertiesx/1", json!({"id": 99}));
        assert_eq!(store.list("properties"), vec![json!({"id": 2}), json!({"id": 10})]);
        assert!(store.list("rentals").is_empty());
    }

    #[test]
    fn validate_accepts_objects_with_names() {
        let fields = validate(json!({"name": "Acme", "city": "Pune"})).unwrap();
        assert_eq!(fields.len(), 2);
        assert!(validate(json!({"city": "Pune"})).is_ok());
    }

    #[test]
    fn validate_rejects_blank_name() {
        let resp = validate(json!({"name": "  "})).unwrap_err();
        assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
        let resp = validate(json!({"name": null})).unwrap_err();
        assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[test]
    fn validate_rejects_non_objects() {
        let resp = validate(json!([1, 2])).unwrap_err();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn merge_patch_sets_replaces_and_removes() {
        let mut doc = json!({"id": 1, "name": "Acme", "meta": {"a": 1, "b": 2}, "gone": true});
        merge_patch(&mut doc, &json!({"name": "Acme 2", "meta": {"b": null, "c": 3}, "gone": null}));
        assert_eq!(doc, json!({"id": 1, "name": "Acme 2", "meta": {"a": 1, "c": 3}}));
    }

    #[test]
    fn authorize_without_token_allows_everything() {
        let state = AppState::default();
        assert!(state.authorize(&HeaderMap::new(), "properties").is_ok());
    }

    #[test]
    fn authorize_with_token_checks_bearer() {
        let state = AppState::default().with_token("abc123");
        let mut headers = HeaderMap::new();
        assert!(state.authorize(&headers, "properties").is_err());
        assert!(state.authorize(&headers, "public/info").is_ok());

        headers.insert(header::AUTHORIZATION, "Bearer wrong".parse().unwrap());
        assert!(state.authorize(&headers, "properties").is_err());

        headers.insert(header::AUTHORIZATION, "Bearer abc123".parse().unwrap());
        assert!(state.authorize(&headers, "properties").is_ok());
    }
}
