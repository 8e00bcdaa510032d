//! Menu route handlers.

use axum::{Json, extract::State};
use serde::Serialize;

use crate::catalog::MenuItem;
use crate::state::AppState;

/// Menu response body.
#[derive(Debug, Serialize)]
pub struct MenuView {
    pub items: Vec<MenuItem>,
}

/// `GET /api/menu`
pub async fn index(State(state): State<AppState>) -> Json<MenuView> {
    Json(MenuView {
        items: state.catalog().items().to_vec(),
    })
}
