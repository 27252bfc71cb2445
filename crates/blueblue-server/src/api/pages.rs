//! HTML pages: the scan control page and the live device list.

use axum::extract::State;
use axum::response::Html;

use crate::api::error::ApiResult;
use crate::state::SharedState;

/// Render the control page with the current scan state.
pub async fn index(State(state): State<SharedState>) -> ApiResult<Html<String>> {
    let page = state.templates().render_index(state.scanner().state())?;
    Ok(Html(page))
}

/// Render the fresh devices, strongest signal first.
pub async fn devices(State(state): State<SharedState>) -> ApiResult<Html<String>> {
    // The query copies the registry out, so no lock is held while rendering.
    let devices = state.query().devices();
    let page = state.templates().render_devices(&devices)?;
    Ok(Html(page))
}
