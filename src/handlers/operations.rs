// src/handlers/operations.rs

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use rust_decimal::Decimal;
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::error::AppError,
    config::AppState,
    handlers::inventory::validate_not_negative,
    models::inventory::StockOwner,
};

// ---
// Transferências
// ---

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateTransferPayload {
    pub item_id: Uuid,

    // AGRICULTURE ou CATTLE; MANAGER é rejeitado pelo service.
    pub department: StockOwner,

    #[validate(custom(function = "validate_not_negative"))]
    pub quantity: Decimal,

    pub details: Option<String>,
}

// POST /api/transfers
#[utoipa::path(
    post,
    path = "/api/transfers",
    tag = "Transfers",
    request_body = CreateTransferPayload,
    responses(
        (status = 201, description = "Pedido de transferência criado como pendente", body = crate::models::operations::TransferRequest),
        (status = 404, description = "Item não encontrado")
    )
)]
pub async fn create_transfer(
    State(app_state): State<AppState>,
    Json(payload): Json<CreateTransferPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let request = app_state
        .transfer_service
        .create_request(
            payload.item_id,
            payload.department,
            payload.quantity,
            payload.details.as_deref(),
        )
        .await?;

    Ok((StatusCode::CREATED, Json(request)))
}

#[derive(Debug, Clone, Copy, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Decision {
    Approve,
    Reject,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DecisionPayload {
    pub decision: Decision,
}

// POST /api/transfers/{id}/decide
#[utoipa::path(
    post,
    path = "/api/transfers/{request_id}/decide",
    tag = "Transfers",
    request_body = DecisionPayload,
    responses(
        (status = 200, description = "Pedido aprovado (estoque e razão movidos) ou rejeitado", body = crate::models::operations::TransferRequest),
        (status = 400, description = "Estoque insuficiente no almoxarifado"),
        (status = 409, description = "Pedido já processado")
    ),
    params(
        ("request_id" = Uuid, Path, description = "ID do pedido de transferência")
    )
)]
pub async fn decide_transfer(
    State(app_state): State<AppState>,
    Path(request_id): Path<Uuid>,
    Json(payload): Json<DecisionPayload>,
) -> Result<impl IntoResponse, AppError> {
    let request = match payload.decision {
        Decision::Approve => app_state.transfer_service.approve(request_id).await?,
        Decision::Reject => app_state.transfer_service.reject(request_id).await?,
    };
    Ok(Json(request))
}

// GET /api/transfers
#[utoipa::path(
    get,
    path = "/api/transfers",
    tag = "Transfers",
    responses(
        (status = 200, description = "Pedidos de transferência, mais recentes primeiro", body = Vec<crate::models::operations::TransferRequest>)
    )
)]
pub async fn list_transfers(
    State(app_state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let requests = app_state.transfer_service.list_requests().await?;
    Ok(Json(requests))
}

// ---
// Eventos Sanitários
// ---

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateHealthEventPayload {
    pub department: StockOwner,

    #[validate(length(min = 1, message = "A descrição é obrigatória."))]
    pub description: String,
}

// POST /api/health-events
#[utoipa::path(
    post,
    path = "/api/health-events",
    tag = "Health Events",
    request_body = CreateHealthEventPayload,
    responses(
        (status = 201, description = "Evento sanitário criado como pendente", body = crate::models::operations::HealthEvent)
    )
)]
pub async fn create_health_event(
    State(app_state): State<AppState>,
    Json(payload): Json<CreateHealthEventPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let event = app_state
        .consumption_service
        .create_event(payload.department, &payload.description)
        .await?;

    Ok((StatusCode::CREATED, Json(event)))
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CompleteHealthEventPayload {
    pub medicine_item_id: Uuid,

    #[validate(custom(function = "validate_not_negative"))]
    pub quantity: Decimal,

    pub dosage: Option<String>,
}

// POST /api/health-events/{id}/complete
#[utoipa::path(
    post,
    path = "/api/health-events/{event_id}/complete",
    tag = "Health Events",
    request_body = CompleteHealthEventPayload,
    responses(
        (status = 200, description = "Evento concluído: estoque consumido e despesa reconhecida", body = crate::models::operations::HealthEvent),
        (status = 400, description = "Estoque insuficiente no pool do departamento"),
        (status = 409, description = "Evento já concluído")
    ),
    params(
        ("event_id" = Uuid, Path, description = "ID do evento sanitário")
    )
)]
pub async fn complete_health_event(
    State(app_state): State<AppState>,
    Path(event_id): Path<Uuid>,
    Json(payload): Json<CompleteHealthEventPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let event = app_state
        .consumption_service
        .complete(
            event_id,
            payload.medicine_item_id,
            payload.quantity,
            payload.dosage.as_deref(),
        )
        .await?;

    Ok(Json(event))
}

// GET /api/health-events
#[utoipa::path(
    get,
    path = "/api/health-events",
    tag = "Health Events",
    responses(
        (status = 200, description = "Eventos sanitários, mais recentes primeiro", body = Vec<crate::models::operations::HealthEvent>)
    )
)]
pub async fn list_health_events(
    State(app_state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let events = app_state.consumption_service.list_events().await?;
    Ok(Json(events))
}
