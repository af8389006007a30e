// src/handlers/inventory.rs

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use rust_decimal::Decimal;
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::{
    common::error::AppError,
    config::AppState,
    models::inventory::ItemDetails,
};

// ---
// Validação Customizada
// ---
pub(crate) fn validate_not_negative(val: &Decimal) -> Result<(), ValidationError> {
    if val.is_sign_negative() {
        let mut err = ValidationError::new("range");
        err.add_param("min".into(), &0.0);
        err.message = Some("O valor não pode ser negativo.".into());
        return Err(err);
    }
    Ok(())
}

// ---
// Payload: CreateItem
// ---
#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateItemPayload {
    #[validate(length(min = 1, message = "O nome é obrigatório."))]
    pub name: String,

    #[validate(length(min = 1, message = "A unidade de medida é obrigatória."))]
    pub unit: String,

    #[validate(custom(function = "validate_not_negative"))]
    #[serde(default)]
    pub low_stock_threshold: Decimal,

    // Os campos obrigatórios dependem da tag "category" (fertilizante,
    // medicamento, equipamento, ração).
    pub details: ItemDetails,

    // Estoque inicial opcional no almoxarifado central. Sem esse campo, o
    // item nasce zerado.
    #[validate(custom(function = "validate_not_negative"))]
    #[serde(default)]
    pub initial_stock: Decimal,

    #[validate(custom(function = "validate_not_negative"))]
    #[serde(default)]
    pub initial_cost: Decimal,
}

// POST /api/inventory/items
#[utoipa::path(
    post,
    path = "/api/inventory/items",
    tag = "Inventory",
    request_body = CreateItemPayload,
    responses(
        (status = 201, description = "Item criado com as contas contábeis provisionadas", body = crate::models::inventory::Item),
        (status = 409, description = "Já existe um item com esse nome")
    )
)]
pub async fn create_item(
    State(app_state): State<AppState>,
    Json(payload): Json<CreateItemPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let item = app_state
        .inventory_service
        .create_item(
            &payload.name,
            &payload.unit,
            payload.low_stock_threshold,
            payload.details,
            payload.initial_stock,
            payload.initial_cost,
        )
        .await?;

    Ok((StatusCode::CREATED, Json(item)))
}

// GET /api/inventory/items
#[utoipa::path(
    get,
    path = "/api/inventory/items",
    tag = "Inventory",
    responses(
        (status = 200, description = "Catálogo de itens", body = Vec<crate::models::inventory::Item>)
    )
)]
pub async fn get_all_items(
    State(app_state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let items = app_state.inventory_service.list_items().await?;
    Ok(Json(items))
}

// ---
// Payload: AddStock
// ---
#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AddStockPayload {
    pub item_id: Uuid,

    #[validate(custom(function = "validate_not_negative"))]
    pub quantity: Decimal,

    #[validate(custom(function = "validate_not_negative"))]
    pub unit_cost: Decimal,

    pub notes: Option<String>,
}

// POST /api/inventory/stock-entry
#[utoipa::path(
    post,
    path = "/api/inventory/stock-entry",
    tag = "Inventory",
    request_body = AddStockPayload,
    responses(
        (status = 201, description = "Entrada registrada no almoxarifado central", body = crate::models::inventory::InventoryRecord),
        (status = 404, description = "Item não encontrado")
    )
)]
pub async fn add_stock(
    State(app_state): State<AppState>,
    Json(payload): Json<AddStockPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let record = app_state
        .inventory_service
        .add_stock(
            payload.item_id,
            payload.quantity,
            payload.unit_cost,
            payload.notes.as_deref(),
        )
        .await?;

    Ok((StatusCode::CREATED, Json(record)))
}

// GET /api/inventory/levels
#[utoipa::path(
    get,
    path = "/api/inventory/levels",
    tag = "Inventory",
    responses(
        (status = 200, description = "Saldo por (item, pool) com custo médio derivado", body = Vec<crate::models::inventory::InventoryLevel>)
    )
)]
pub async fn get_levels(
    State(app_state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let levels = app_state.inventory_service.list_levels().await?;
    Ok(Json(levels))
}
