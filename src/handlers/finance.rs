// src/handlers/finance.rs

use axum::{extract::State, response::IntoResponse, Json};

use crate::{common::error::AppError, config::AppState};

// GET /api/accounts
#[utoipa::path(
    get,
    path = "/api/accounts",
    tag = "Finance",
    responses(
        (status = 200, description = "Plano de contas com saldos correntes", body = Vec<crate::models::finance::Account>)
    )
)]
pub async fn get_accounts(
    State(app_state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let accounts = app_state.finance_service.list_accounts().await?;
    Ok(Json(accounts))
}
