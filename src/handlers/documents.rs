// src/handlers/documents.rs

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::error::AppError,
    config::AppState,
    handlers::inventory::validate_not_negative,
    services::document_service::NewInvoiceLine,
};

#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceLinePayload {
    pub item_id: Uuid,

    #[validate(custom(function = "validate_not_negative"))]
    pub quantity: Decimal,

    #[validate(custom(function = "validate_not_negative"))]
    pub unit_price: Decimal,

    #[validate(custom(function = "validate_not_negative"))]
    #[serde(default)]
    pub discount_percent: Decimal,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateInvoicePayload {
    #[validate(length(min = 1, message = "O nome do fornecedor é obrigatório."))]
    pub supplier_name: String,

    // Número da NF do fornecedor; único entre documentos quando presente.
    pub reference: Option<String>,

    #[schema(value_type = String, format = Date)]
    pub issue_date: NaiveDate,

    #[schema(value_type = String, format = Date)]
    pub due_date: NaiveDate,

    #[validate(length(min = 1, message = "A nota precisa de ao menos uma linha."), nested)]
    pub lines: Vec<InvoiceLinePayload>,
}

// POST /api/purchase-invoices
#[utoipa::path(
    post,
    path = "/api/purchase-invoices",
    tag = "Purchase Invoices",
    request_body = CreateInvoicePayload,
    responses(
        (status = 201, description = "Nota emitida com número sequencial, status pendente", body = crate::models::documents::PurchaseInvoiceDetail),
        (status = 409, description = "Referência externa já utilizada")
    )
)]
pub async fn create_invoice(
    State(app_state): State<AppState>,
    Json(payload): Json<CreateInvoicePayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let lines: Vec<NewInvoiceLine> = payload
        .lines
        .iter()
        .map(|l| NewInvoiceLine {
            item_id: l.item_id,
            quantity: l.quantity,
            unit_price: l.unit_price,
            discount_percent: l.discount_percent,
        })
        .collect();

    let detail = app_state
        .document_service
        .issue_invoice(
            &payload.supplier_name,
            payload.reference.as_deref(),
            payload.issue_date,
            payload.due_date,
            &lines,
        )
        .await?;

    Ok((StatusCode::CREATED, Json(detail)))
}

// GET /api/purchase-invoices
#[utoipa::path(
    get,
    path = "/api/purchase-invoices",
    tag = "Purchase Invoices",
    responses(
        (status = 200, description = "Notas emitidas, mais recentes primeiro", body = Vec<crate::models::documents::PurchaseInvoice>)
    )
)]
pub async fn list_invoices(
    State(app_state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let invoices = app_state.document_service.list_invoices().await?;
    Ok(Json(invoices))
}
