// src/services/inventory_service.rs

use std::collections::HashMap;
use std::sync::Arc;

use rust_decimal::Decimal;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::{AccountStore, CatalogStore, InventoryStore, NewItem, UnitOfWork, UnitOfWorkFactory},
    models::{
        finance::AccountGroup,
        inventory::{InventoryLevel, InventoryRecord, Item, ItemDetails, StockMovementReason, StockOwner},
    },
};

#[derive(Clone)]
pub struct InventoryService {
    uow: Arc<dyn UnitOfWorkFactory>,
}

impl InventoryService {
    pub fn new(uow: Arc<dyn UnitOfWorkFactory>) -> Self {
        Self { uow }
    }

    // --- CREATE ITEM ---
    // Cria o item de catálogo e provisiona sob demanda as quatro contas
    // contábeis vinculadas (três de ativo de estoque, uma de despesa de
    // consumo), tudo na mesma unidade de trabalho. Estoque inicial opcional
    // entra no almoxarifado central.
    pub async fn create_item(
        &self,
        name: &str,
        unit: &str,
        low_stock_threshold: Decimal,
        details: ItemDetails,
        initial_quantity: Decimal,
        initial_unit_cost: Decimal,
    ) -> Result<Item, AppError> {
        if name.trim().is_empty() {
            return Err(AppError::InvalidInput(
                "O nome do item não pode ser vazio.".to_string(),
            ));
        }
        if initial_quantity < Decimal::ZERO {
            return Err(AppError::InvalidInput(
                "O estoque inicial não pode ser negativo.".to_string(),
            ));
        }
        if initial_unit_cost < Decimal::ZERO {
            return Err(AppError::InvalidInput(
                "O custo inicial não pode ser negativo.".to_string(),
            ));
        }

        let mut uow = self.uow.begin().await?;

        let stock_parent = uow
            .find_or_create_parent("Estoques", AccountGroup::Asset, "Estoques")
            .await?;
        let expense_parent = uow
            .find_or_create_parent("Despesas Operacionais", AccountGroup::Expense, "Despesas")
            .await?;

        let manager_account = uow
            .find_or_create_child(
                stock_parent.id,
                &format!("Estoque - Almoxarifado - {}", name),
                AccountGroup::Asset,
                "Estoques",
            )
            .await?;
        let agriculture_account = uow
            .find_or_create_child(
                stock_parent.id,
                &format!("Estoque - Agricultura - {}", name),
                AccountGroup::Asset,
                "Estoques",
            )
            .await?;
        let cattle_account = uow
            .find_or_create_child(
                stock_parent.id,
                &format!("Estoque - Pecuária - {}", name),
                AccountGroup::Asset,
                "Estoques",
            )
            .await?;
        let expense_account = uow
            .find_or_create_child(
                expense_parent.id,
                &format!("Consumo - {}", name),
                AccountGroup::Expense,
                "Despesas",
            )
            .await?;

        let item = uow
            .create_item(&NewItem {
                name: name.to_string(),
                unit: unit.to_string(),
                low_stock_threshold,
                details,
                expense_account_id: Some(expense_account.id),
                manager_account_id: Some(manager_account.id),
                agriculture_account_id: Some(agriculture_account.id),
                cattle_account_id: Some(cattle_account.id),
            })
            .await?;

        if initial_quantity > Decimal::ZERO {
            uow.receive(
                item.id,
                StockOwner::Manager,
                initial_quantity,
                initial_quantity * initial_unit_cost,
                StockMovementReason::InitialStock,
                Some("Saldo inicial de cadastro"),
            )
            .await?;
        }

        uow.commit().await?;
        Ok(item)
    }

    pub async fn list_items(&self) -> Result<Vec<Item>, AppError> {
        let mut uow = self.uow.begin().await?;
        uow.list_items().await
    }

    // --- STOCK ENTRY ---
    // Compra avulsa direto para o almoxarifado central.
    pub async fn add_stock(
        &self,
        item_id: Uuid,
        quantity: Decimal,
        unit_cost: Decimal,
        notes: Option<&str>,
    ) -> Result<InventoryRecord, AppError> {
        let mut uow = self.uow.begin().await?;

        // 404 antes de 400: a existência do item é checada primeiro.
        uow.get_item(item_id).await?;

        let record = uow
            .receive(
                item_id,
                StockOwner::Manager,
                quantity,
                quantity * unit_cost,
                StockMovementReason::Purchase,
                notes,
            )
            .await?;

        uow.commit().await?;
        Ok(record)
    }

    // Painel de saldos por (item, pool), com o custo médio derivado na hora.
    pub async fn list_levels(&self) -> Result<Vec<InventoryLevel>, AppError> {
        let mut uow = self.uow.begin().await?;
        let items = uow.list_items().await?;
        let records = uow.list_records().await?;

        let items_by_id: HashMap<Uuid, &Item> = items.iter().map(|i| (i.id, i)).collect();

        // O alerta de estoque baixo olha o total do item somando os pools.
        let mut totals: HashMap<Uuid, Decimal> = HashMap::new();
        for record in &records {
            *totals.entry(record.item_id).or_insert(Decimal::ZERO) += record.quantity;
        }

        let mut levels = Vec::with_capacity(records.len());
        for record in records {
            let Some(item) = items_by_id.get(&record.item_id) else {
                continue;
            };
            let total = totals.get(&record.item_id).copied().unwrap_or(Decimal::ZERO);
            levels.push(InventoryLevel {
                item_id: record.item_id,
                item_name: item.name.clone(),
                unit: item.unit.clone(),
                owner: record.owner,
                quantity: record.quantity,
                total_cost: record.total_cost,
                average_cost: record.average_cost(),
                below_threshold: total < item.low_stock_threshold,
            });
        }
        Ok(levels)
    }
}
