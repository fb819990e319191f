//! Catalog Handlers - 音色与对齐后端

use axum::{extract::State, Json};
use std::sync::Arc;

use crate::application::{ListAligners, ListVoices};
use crate::infrastructure::http::dto::{AlignersResponse, VoicesResponse};
use crate::infrastructure::http::state::AppState;

pub async fn list_voices(State(state): State<Arc<AppState>>) -> Json<VoicesResponse> {
    Json(VoicesResponse {
        voices: state.list_voices_handler.handle(ListVoices),
    })
}

pub async fn list_aligners(State(state): State<Arc<AppState>>) -> Json<AlignersResponse> {
    Json(AlignersResponse {
        aligners: state.list_aligners_handler.handle(ListAligners),
    })
}
