// src/models/inventory.rs

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

// --- 1. Pools de Estoque ---
// Cada item pode ter saldo em três pools independentes: o almoxarifado central
// (Manager) e os dois departamentos operacionais.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "stock_owner", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StockOwner {
    Manager,
    Agriculture,
    Cattle,
}

impl StockOwner {
    pub fn label(&self) -> &'static str {
        match self {
            StockOwner::Manager => "Almoxarifado Central",
            StockOwner::Agriculture => "Agricultura",
            StockOwner::Cattle => "Pecuária",
        }
    }

    pub fn is_department(&self) -> bool {
        !matches!(self, StockOwner::Manager)
    }
}

// --- 2. Categorias de Item ---
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "item_category", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ItemCategory {
    Fertilizer,
    Medicine,
    Equipment,
    Feed,
}

// Payload polimórfico: os campos obrigatórios mudam conforme a categoria.
// A tag "category" do JSON decide a variante (nada de herança).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(tag = "category", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ItemDetails {
    #[serde(rename_all = "camelCase")]
    Fertilizer {
        npk_composition: String,
        application_notes: Option<String>,
    },
    #[serde(rename_all = "camelCase")]
    Medicine {
        active_ingredient: String,
        withdrawal_period_days: i32,
    },
    #[serde(rename_all = "camelCase")]
    Equipment {
        manufacturer: Option<String>,
        serial_number: Option<String>,
    },
    #[serde(rename_all = "camelCase")]
    Feed {
        protein_percent: Option<Decimal>,
        ration_type: Option<String>,
    },
}

impl ItemDetails {
    pub fn category(&self) -> ItemCategory {
        match self {
            ItemDetails::Fertilizer { .. } => ItemCategory::Fertilizer,
            ItemDetails::Medicine { .. } => ItemCategory::Medicine,
            ItemDetails::Equipment { .. } => ItemCategory::Equipment,
            ItemDetails::Feed { .. } => ItemCategory::Feed,
        }
    }
}

// --- 3. Itens / Catálogo ---
// O core referencia, mas nunca altera, os itens. As quatro referências de
// conta contábil são preenchidas pelo cadastro; quando faltam, os workflows
// falham com MissingAccount.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Item {
    pub id: Uuid,

    #[schema(example = "Ivermectina 1%")]
    pub name: String,

    #[schema(example = "ml")]
    pub unit: String,

    #[schema(example = "50.0")]
    pub low_stock_threshold: Decimal,

    pub category: ItemCategory,

    #[schema(value_type = ItemDetails)]
    pub details: Json<ItemDetails>,

    // Contas contábeis vinculadas
    pub expense_account_id: Option<Uuid>,
    pub manager_account_id: Option<Uuid>,
    pub agriculture_account_id: Option<Uuid>,
    pub cattle_account_id: Option<Uuid>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Item {
    /// Conta de ativo de estoque correspondente a um pool.
    pub fn asset_account_for(&self, owner: StockOwner) -> Option<Uuid> {
        match owner {
            StockOwner::Manager => self.manager_account_id,
            StockOwner::Agriculture => self.agriculture_account_id,
            StockOwner::Cattle => self.cattle_account_id,
        }
    }
}

// --- 4. Registro de Estoque (Saldo por Pool) ---
// Chave única (item_id, owner). O custo médio NUNCA é armazenado:
// é sempre derivado de total_cost / quantity na leitura.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct InventoryRecord {
    pub id: Uuid,
    pub item_id: Uuid,
    pub owner: StockOwner,

    #[schema(example = "100.0")]
    pub quantity: Decimal,

    #[schema(example = "500.00")]
    pub total_cost: Decimal,

    pub updated_at: DateTime<Utc>,
}

impl InventoryRecord {
    /// Custo médio ponderado derivado. Zero quando não há saldo
    /// (nunca divide por zero).
    pub fn average_cost(&self) -> Decimal {
        if self.quantity.is_zero() {
            Decimal::ZERO
        } else {
            self.total_cost / self.quantity
        }
    }
}

// Visão de saldo por (item, pool) para o painel de estoque. O custo médio
// aqui é o derivado, calculado na hora da resposta.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct InventoryLevel {
    pub item_id: Uuid,
    pub item_name: String,
    pub unit: String,
    pub owner: StockOwner,
    pub quantity: Decimal,
    pub total_cost: Decimal,
    pub average_cost: Decimal,
    pub below_threshold: bool,
}

// --- 5. Movimentações de Estoque (Auditoria) ---
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "stock_movement_reason", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StockMovementReason {
    InitialStock, // Vira "INITIAL_STOCK"
    Purchase,
    TransferOut,
    TransferIn,
    Consumption,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StockMovement {
    pub id: Uuid,
    pub item_id: Uuid,
    pub owner: StockOwner,
    pub quantity_changed: Decimal, // Positivo = entrada, negativo = saída
    pub reason: StockMovementReason,
    pub unit_cost: Option<Decimal>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn record(quantity: &str, total_cost: &str) -> InventoryRecord {
        InventoryRecord {
            id: Uuid::new_v4(),
            item_id: Uuid::new_v4(),
            owner: StockOwner::Manager,
            quantity: dec(quantity),
            total_cost: dec(total_cost),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn average_cost_is_derived_from_total_cost() {
        assert_eq!(record("100", "500").average_cost(), dec("5"));
        assert_eq!(record("3", "10").average_cost(), dec("10") / dec("3"));
    }

    #[test]
    fn average_cost_of_empty_record_is_zero() {
        assert_eq!(record("0", "0").average_cost(), Decimal::ZERO);
    }

    #[test]
    fn details_round_trip_keeps_category_tag() {
        let details = ItemDetails::Medicine {
            active_ingredient: "Ivermectina".to_string(),
            withdrawal_period_days: 28,
        };
        let json = serde_json::to_value(&details).unwrap();
        assert_eq!(json["category"], "MEDICINE");
        assert_eq!(json["withdrawalPeriodDays"], 28);

        let back: ItemDetails = serde_json::from_value(json).unwrap();
        assert_eq!(back.category(), ItemCategory::Medicine);
    }

    #[test]
    fn asset_account_follows_owner() {
        let manager = Uuid::new_v4();
        let cattle = Uuid::new_v4();
        let item = Item {
            id: Uuid::new_v4(),
            name: "Vermífugo".to_string(),
            unit: "ml".to_string(),
            low_stock_threshold: Decimal::ZERO,
            category: ItemCategory::Medicine,
            details: Json(ItemDetails::Medicine {
                active_ingredient: "Albendazol".to_string(),
                withdrawal_period_days: 14,
            }),
            expense_account_id: None,
            manager_account_id: Some(manager),
            agriculture_account_id: None,
            cattle_account_id: Some(cattle),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };

        assert_eq!(item.asset_account_for(StockOwner::Manager), Some(manager));
        assert_eq!(item.asset_account_for(StockOwner::Cattle), Some(cattle));
        assert_eq!(item.asset_account_for(StockOwner::Agriculture), None);
    }
}
