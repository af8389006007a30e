// src/models/operations.rs

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::models::inventory::StockOwner;

// --- Enums ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "request_status", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RequestStatus {
    Pending,
    Approved,
    Rejected,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "event_status", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventStatus {
    Pending,
    Completed,
}

// --- Structs de Operação ---

// Pedido de transferência do almoxarifado central para um departamento.
// Sai de Pending exatamente uma vez (Approved ou Rejected); a aprovação é o
// gatilho da movimentação de estoque + lançamentos contábeis.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TransferRequest {
    pub id: Uuid,
    pub item_id: Uuid,

    #[schema(example = "CATTLE")]
    pub department: StockOwner,

    #[schema(example = "20.0")]
    pub quantity: Decimal,

    #[schema(example = "Vacinação do lote 7")]
    pub details: Option<String>,

    pub status: RequestStatus,
    pub requested_at: DateTime<Utc>,
    pub handled_at: Option<DateTime<Utc>>,
}

// Evento de consumo operacional (ex: tratamento sanitário de um animal).
// O item consumido, a quantidade e a dosagem são gravados na conclusão;
// a transição Pending -> Completed acontece exatamente uma vez.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct HealthEvent {
    pub id: Uuid,

    #[schema(example = "CATTLE")]
    pub department: StockOwner,

    #[schema(example = "Tratamento de verminose - brinco 4412")]
    pub description: String,

    pub status: EventStatus,

    // Preenchidos na conclusão do evento
    pub medicine_item_id: Option<Uuid>,
    pub quantity: Option<Decimal>,

    #[schema(example = "2 ml por 10 kg de peso vivo")]
    pub dosage: Option<String>,

    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}
