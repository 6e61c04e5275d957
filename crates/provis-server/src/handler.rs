use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use provis_schema::{Item, SchemaSignature};
use provis_store::{Criteria, StoreError};
use provis_types::{Record, Value, CTIME_FIELD, MTIME_FIELD, TYPE_FIELD, UID_FIELD};
use tracing::debug;

use crate::error::{ServerError, ServerResult};
use crate::hooks::ChangeEvent;
use crate::message::{
    ErrorEntry, ExistsResponse, FindRequest, FindResponse, HandleResponse, HealthResponse,
    InfoResponse, ItemQuery, ModifyRequest, NamesResponse, NewNameRequest, RemovedResponse,
    SaveResponse, SourceQuery,
};
use crate::state::AppState;

const VERSION: &str = env!("CARGO_PKG_VERSION");

fn event(item: &Item) -> ChangeEvent {
    ChangeEvent {
        item_type: item.type_name().to_string(),
        uid: item.uid().unwrap_or_default().to_string(),
        name: item.name().unwrap_or_default().to_string(),
    }
}

fn by_type(item_type: &str) -> Criteria {
    [(TYPE_FIELD.to_string(), Value::from(item_type))]
        .into_iter()
        .collect()
}

fn lookup(state: &AppState, item_type: &str, name: &str, source: Option<&str>) -> ServerResult<Item> {
    if state.store.registry().get(item_type).is_none() {
        return Err(StoreError::UnknownType(item_type.to_string()).into());
    }
    state
        .store
        .find_one_by_name(item_type, name, source)?
        .ok_or_else(|| ServerError::NameNotFound {
            item_type: item_type.to_string(),
            name: name.to_string(),
        })
}

fn ensure_name_free(
    state: &AppState,
    item_type: &str,
    name: &str,
    source: Option<&str>,
) -> ServerResult<()> {
    match state.store.find_one_by_name(item_type, name, source)? {
        Some(_) => Err(ServerError::NameTaken {
            item_type: item_type.to_string(),
            name: name.to_string(),
        }),
        None => Ok(()),
    }
}

fn save_response(saved: bool, item: &Item) -> SaveResponse {
    SaveResponse {
        saved,
        uid: item.uid().map(str::to_string),
        errors: item.errors().iter().map(ErrorEntry::from).collect(),
    }
}

fn issue(state: &AppState, item: Item) -> HandleResponse {
    let item_type = item.type_name().to_string();
    let uid = item.uid().map(str::to_string);
    let handle = state.handles.insert(item);
    HandleResponse {
        handle,
        item_type,
        uid,
    }
}

// ---------------------------------------------------------------------------
// Introspection
// ---------------------------------------------------------------------------

pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: VERSION.to_string(),
    })
}

pub async fn info_handler(State(state): State<AppState>) -> Json<InfoResponse> {
    Json(InfoResponse {
        name: "provis".to_string(),
        version: VERSION.to_string(),
        types: state.store.get_types(),
        sources: state.store.source_names(),
        default_source: state.store.default_source().to_string(),
    })
}

pub async fn types_handler(State(state): State<AppState>) -> Json<Vec<String>> {
    Json(state.store.get_types())
}

pub async fn signature_handler(
    State(state): State<AppState>,
    Path(item_type): Path<String>,
) -> ServerResult<Json<SchemaSignature>> {
    let schema = state
        .store
        .registry()
        .get(&item_type)
        .ok_or(StoreError::UnknownType(item_type))?;
    Ok(Json(schema.signature()))
}

// ---------------------------------------------------------------------------
// In-flight items
// ---------------------------------------------------------------------------

pub async fn new_item_handler(
    State(state): State<AppState>,
    Path(item_type): Path<String>,
    Query(query): Query<SourceQuery>,
) -> ServerResult<(StatusCode, Json<HandleResponse>)> {
    let item = state.store.new_item(&item_type, query.source.as_deref())?;
    Ok((StatusCode::CREATED, Json(issue(&state, item))))
}

/// Check out a stored item for editing.
pub async fn edit_handle_handler(
    State(state): State<AppState>,
    Path((item_type, name)): Path<(String, String)>,
    Query(query): Query<SourceQuery>,
) -> ServerResult<(StatusCode, Json<HandleResponse>)> {
    let item = lookup(&state, &item_type, &name, query.source.as_deref())?;
    Ok((StatusCode::CREATED, Json(issue(&state, item))))
}

pub async fn get_handle_handler(
    State(state): State<AppState>,
    Path(handle): Path<String>,
) -> ServerResult<Json<Record>> {
    state
        .handles
        .with_item(&handle, |item| item.deflate())
        .map(Json)
        .ok_or(ServerError::HandleNotFound(handle))
}

pub async fn modify_handle_handler(
    State(state): State<AppState>,
    Path(handle): Path<String>,
    Json(changes): Json<ModifyRequest>,
) -> ServerResult<Json<Record>> {
    let record = state
        .handles
        .with_item(&handle, |item| {
            for (name, value) in changes {
                item.modify(&name, value)?;
            }
            Ok::<_, ServerError>(item.deflate())
        })
        .ok_or_else(|| ServerError::HandleNotFound(handle.clone()))??;
    debug!(handle = %handle, "in-flight item modified");
    Ok(Json(record))
}

/// Validate and persist an in-flight item. A saved item's handle is retired.
pub async fn save_handle_handler(
    State(state): State<AppState>,
    Path(handle): Path<String>,
) -> ServerResult<Json<SaveResponse>> {
    let store = &state.store;
    let (response, saved_event) = state
        .handles
        .with_item(&handle, |item| {
            let saved = store.set(item)?;
            Ok::<_, ServerError>((save_response(saved, item), saved.then(|| event(item))))
        })
        .ok_or_else(|| ServerError::HandleNotFound(handle.clone()))??;
    if let Some(event) = saved_event {
        state.handles.remove(&handle);
        state.notify_saved(event).await;
    }
    Ok(Json(response))
}

pub async fn discard_handle_handler(
    State(state): State<AppState>,
    Path(handle): Path<String>,
) -> ServerResult<StatusCode> {
    state
        .handles
        .remove(&handle)
        .map(|_| StatusCode::NO_CONTENT)
        .ok_or(ServerError::HandleNotFound(handle))
}

// ---------------------------------------------------------------------------
// Stored items
// ---------------------------------------------------------------------------

pub async fn get_item_handler(
    State(state): State<AppState>,
    Path((item_type, name)): Path<(String, String)>,
    Query(query): Query<ItemQuery>,
) -> ServerResult<Json<Record>> {
    let source = query.source.as_deref();
    let item = lookup(&state, &item_type, &name, source)?;
    if query.rendered {
        Ok(Json(item.render(&state.store.resolver(source))))
    } else {
        Ok(Json(item.deflate()))
    }
}

pub async fn get_uid_handler(
    State(state): State<AppState>,
    Path(uid): Path<String>,
    Query(query): Query<ItemQuery>,
) -> ServerResult<Json<Record>> {
    let source = query.source.as_deref();
    if query.rendered {
        Ok(Json(state.store.get_rendered(&uid, source)?))
    } else {
        Ok(Json(state.store.get(&uid, source)?.deflate()))
    }
}

pub async fn has_item_handler(
    State(state): State<AppState>,
    Path((item_type, name)): Path<(String, String)>,
    Query(query): Query<SourceQuery>,
) -> ServerResult<Json<ExistsResponse>> {
    let exists = state
        .store
        .find_one_by_name(&item_type, &name, query.source.as_deref())?
        .is_some();
    Ok(Json(ExistsResponse { exists }))
}

pub async fn names_handler(
    State(state): State<AppState>,
    Path(item_type): Path<String>,
    Query(query): Query<SourceQuery>,
) -> ServerResult<Json<NamesResponse>> {
    if state.store.registry().get(&item_type).is_none() {
        return Err(StoreError::UnknownType(item_type).into());
    }
    let rows = state
        .store
        .find(&by_type(&item_type), &["name"], query.source.as_deref())?;
    let mut names: Vec<String> = rows
        .iter()
        .filter_map(|row| row.get(1).and_then(Value::as_str).map(str::to_string))
        .collect();
    names.sort();
    Ok(Json(NamesResponse { names }))
}

pub async fn find_handler(
    State(state): State<AppState>,
    Json(request): Json<FindRequest>,
) -> ServerResult<Json<FindResponse>> {
    let rows = state.store.find(
        &request.criteria,
        &request.projection,
        request.source.as_deref(),
    )?;
    Ok(Json(FindResponse { rows }))
}

/// Full records of every item of one type matching the criteria.
pub async fn find_items_handler(
    State(state): State<AppState>,
    Path(item_type): Path<String>,
    Json(request): Json<FindRequest>,
) -> ServerResult<Json<Vec<Record>>> {
    let mut criteria = request.criteria;
    criteria.insert(TYPE_FIELD.to_string(), Value::from(item_type.as_str()));
    let items = state
        .store
        .find_items(&criteria, request.source.as_deref())?;
    Ok(Json(items.iter().map(Item::deflate).collect()))
}

pub async fn remove_handler(
    State(state): State<AppState>,
    Path((item_type, name)): Path<(String, String)>,
    Query(query): Query<SourceQuery>,
) -> ServerResult<Json<RemovedResponse>> {
    let source = query.source.as_deref();
    let item = lookup(&state, &item_type, &name, source)?;
    let removed = state
        .store
        .remove(item.uid().unwrap_or_default(), source)?;
    if removed {
        state.notify_removed(event(&item)).await;
    }
    Ok(Json(RemovedResponse { removed }))
}

/// Store a duplicate of an item under a new name and a new identity.
pub async fn copy_handler(
    State(state): State<AppState>,
    Path((item_type, name)): Path<(String, String)>,
    Query(query): Query<SourceQuery>,
    Json(request): Json<NewNameRequest>,
) -> ServerResult<Json<SaveResponse>> {
    let source = query.source.as_deref();
    let original = lookup(&state, &item_type, &name, source)?;
    ensure_name_free(&state, &item_type, &request.new_name, source)?;

    let mut record = original.deflate();
    for identity in [UID_FIELD, CTIME_FIELD, MTIME_FIELD] {
        record.remove(identity);
    }
    let mut copy = state.store.new_item(&item_type, source)?;
    copy.inflate(&record)?;
    copy.set("name", request.new_name.as_str())?;

    let saved = state.store.set(&mut copy)?;
    if saved {
        state.notify_saved(event(&copy)).await;
    } else {
        state.store.remove(copy.uid().unwrap_or_default(), source)?;
    }
    Ok(Json(save_response(saved, &copy)))
}

pub async fn rename_handler(
    State(state): State<AppState>,
    Path((item_type, name)): Path<(String, String)>,
    Query(query): Query<SourceQuery>,
    Json(request): Json<NewNameRequest>,
) -> ServerResult<Json<SaveResponse>> {
    let source = query.source.as_deref();
    let mut item = lookup(&state, &item_type, &name, source)?;
    ensure_name_free(&state, &item_type, &request.new_name, source)?;
    item.set("name", request.new_name.as_str())?;

    let saved = state.store.set(&mut item)?;
    if saved {
        state.notify_saved(event(&item)).await;
    }
    Ok(Json(save_response(saved, &item)))
}
