use axum::routing::{get, post};
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::handler;
use crate::state::AppState;

/// Build the axum router with all provis endpoints.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/v1/health", get(handler::health_handler))
        .route("/v1/info", get(handler::info_handler))
        .route("/v1/types", get(handler::types_handler))
        .route("/v1/types/:item_type/signature", get(handler::signature_handler))
        .route("/v1/types/:item_type/names", get(handler::names_handler))
        .route("/v1/types/:item_type/find", post(handler::find_items_handler))
        .route("/v1/types/:item_type/items", post(handler::new_item_handler))
        .route(
            "/v1/types/:item_type/items/:name",
            get(handler::get_item_handler).delete(handler::remove_handler),
        )
        .route("/v1/types/:item_type/items/:name/exists", get(handler::has_item_handler))
        .route("/v1/types/:item_type/items/:name/handle", post(handler::edit_handle_handler))
        .route("/v1/types/:item_type/items/:name/copy", post(handler::copy_handler))
        .route("/v1/types/:item_type/items/:name/rename", post(handler::rename_handler))
        .route("/v1/items/:uid", get(handler::get_uid_handler))
        .route("/v1/find", post(handler::find_handler))
        .route(
            "/v1/handles/:handle",
            get(handler::get_handle_handler)
                .patch(handler::modify_handle_handler)
                .delete(handler::discard_handle_handler),
        )
        .route("/v1/handles/:handle/save", post(handler::save_handle_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
