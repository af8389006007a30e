// src/models/documents.rs

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "invoice_status", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InvoiceStatus {
    Pending,
    Approved,
    Rejected,
}

// Nota fiscal de compra. Imutável depois de persistida, exceto pela transição
// de status (tratada fora deste core). Os totais são derivados das linhas na
// emissão e nunca recalculados depois.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseInvoice {
    pub id: Uuid,

    #[schema(example = "PI-2024-06-01-007")]
    pub invoice_number: String,

    #[schema(example = "Agropecuária Boa Safra Ltda")]
    pub supplier_name: String,

    // Referência externa (número da NF do fornecedor). Única entre documentos.
    #[schema(example = "NF-88271")]
    pub reference: Option<String>,

    #[schema(value_type = String, format = Date, example = "2024-06-01")]
    pub issue_date: NaiveDate,
    #[schema(value_type = String, format = Date, example = "2024-07-01")]
    pub due_date: NaiveDate,

    #[schema(example = "1000.00")]
    pub subtotal: Decimal,
    #[schema(example = "50.00")]
    pub discount_total: Decimal,
    #[schema(example = "950.00")]
    pub total: Decimal,

    pub status: InvoiceStatus,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseInvoiceLine {
    pub id: Uuid,
    pub invoice_id: Uuid,
    pub item_id: Uuid,

    #[schema(example = "10.0")]
    pub quantity: Decimal,

    #[schema(example = "100.00")]
    pub unit_price: Decimal,

    #[schema(example = "5.0")]
    pub discount_percent: Decimal,

    #[schema(example = "950.00")]
    pub line_total: Decimal,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseInvoiceDetail {
    #[serde(flatten)]
    pub header: PurchaseInvoice,
    pub lines: Vec<PurchaseInvoiceLine>,
}
