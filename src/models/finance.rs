// src/models/finance.rs

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

// --- Enums (Mapeando o Postgres) ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "account_group", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AccountGroup {
    Asset,     // Ativo
    Liability, // Passivo
    Equity,    // Patrimônio Líquido
    Income,    // Receita
    Expense,   // Despesa
}

// --- Structs ---

// Nó da árvore do plano de contas. Contas-pai são criadas sob demanda
// ("find or create") na primeira vez que uma categoria precisa delas.
// Saldos são alterados apenas pelos workflows, nunca pelo cadastro.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    #[schema(example = "550e8400-e29b-41d4-a716-446655440000")]
    pub id: Uuid,

    pub parent_id: Option<Uuid>,

    #[schema(example = "Estoque - Pecuária")]
    pub name: String,

    // A coluna não pode se chamar "group" (palavra reservada do SQL)
    #[sqlx(rename = "account_group")]
    pub group: AccountGroup,

    #[schema(example = "Estoques")]
    pub category: String,

    #[schema(example = "0.00")]
    pub opening_balance: Decimal,

    #[schema(example = "1500.50")]
    pub current_balance: Decimal,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// Lançamento individual no razão (auditoria de cada ajuste de saldo).
// A soma dos amounts de um mesmo evento de negócio é sempre zero
// (débito = crédito).
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LedgerEntry {
    pub id: Uuid,
    pub account_id: Uuid,

    #[schema(example = "-100.00")]
    pub amount: Decimal, // Positivo = aumenta o saldo, negativo = reduz

    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}
