// src/services/consumption_service.rs
//
// Eventos sanitários: um evento pendente é concluído consumindo medicamento
// do pool do próprio departamento, com reconhecimento de despesa (ativo de
// estoque -> despesa de consumo) no mesmo commit.

use std::sync::Arc;

use rust_decimal::Decimal;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::{AccountStore, CatalogStore, ConsumptionStore, InventoryStore, UnitOfWork, UnitOfWorkFactory},
    models::{
        inventory::{ItemCategory, StockMovementReason, StockOwner},
        operations::{EventStatus, HealthEvent},
    },
    services::MAX_COMMIT_ATTEMPTS,
};

#[derive(Clone)]
pub struct ConsumptionService {
    uow: Arc<dyn UnitOfWorkFactory>,
}

impl ConsumptionService {
    pub fn new(uow: Arc<dyn UnitOfWorkFactory>) -> Self {
        Self { uow }
    }

    pub async fn create_event(
        &self,
        department: StockOwner,
        description: &str,
    ) -> Result<HealthEvent, AppError> {
        if !department.is_department() {
            return Err(AppError::InvalidInput(
                "Um evento sanitário pertence a um departamento.".to_string(),
            ));
        }
        if description.trim().is_empty() {
            return Err(AppError::InvalidInput(
                "A descrição do evento não pode ser vazia.".to_string(),
            ));
        }

        let mut uow = self.uow.begin().await?;
        let event = uow.create_event(department, description).await?;
        uow.commit().await?;
        Ok(event)
    }

    pub async fn complete(
        &self,
        event_id: Uuid,
        medicine_item_id: Uuid,
        quantity: Decimal,
        dosage: Option<&str>,
    ) -> Result<HealthEvent, AppError> {
        let mut attempt = 1;
        loop {
            match self
                .try_complete(event_id, medicine_item_id, quantity, dosage)
                .await
            {
                Err(e) if e.is_retryable() && attempt < MAX_COMMIT_ATTEMPTS => {
                    tracing::warn!(
                        %event_id,
                        attempt,
                        "Transação abortada ao concluir evento sanitário, tentando de novo"
                    );
                    attempt += 1;
                }
                other => return other,
            }
        }
    }

    async fn try_complete(
        &self,
        event_id: Uuid,
        medicine_item_id: Uuid,
        quantity: Decimal,
        dosage: Option<&str>,
    ) -> Result<HealthEvent, AppError> {
        let mut uow = self.uow.begin().await?;

        let event = uow.get_event(event_id).await?;
        if event.status != EventStatus::Pending {
            return Err(AppError::AlreadyHandled(
                "O evento sanitário já foi concluído.".to_string(),
            ));
        }

        let item = uow.get_item(medicine_item_id).await?;
        if item.category != ItemCategory::Medicine {
            return Err(AppError::InvalidInput(format!(
                "O item '{}' não é um medicamento.",
                item.name
            )));
        }

        let asset_account = item.asset_account_for(event.department).ok_or_else(|| {
            AppError::MissingAccount(format!(
                "O item '{}' não tem conta de estoque de {}.",
                item.name,
                event.department.label()
            ))
        })?;
        let expense_account = item.expense_account_id.ok_or_else(|| {
            AppError::MissingAccount(format!(
                "O item '{}' não tem conta de despesa de consumo.",
                item.name
            ))
        })?;

        // Consome do pool do departamento dono do evento, nunca do central.
        let issue = uow
            .issue(
                medicine_item_id,
                event.department,
                quantity,
                StockMovementReason::Consumption,
                Some(&event.description),
            )
            .await?;

        let description = format!(
            "Consumo de {} {} de {} ({})",
            quantity, item.unit, item.name, event.description
        );
        uow.adjust_balance(asset_account, -issue.total_value, Some(&description))
            .await?;
        uow.adjust_balance(expense_account, issue.total_value, Some(&description))
            .await?;

        let updated = uow
            .mark_event_completed(event_id, medicine_item_id, quantity, dosage)
            .await?;

        uow.commit().await?;
        Ok(updated)
    }

    pub async fn list_events(&self) -> Result<Vec<HealthEvent>, AppError> {
        let mut uow = self.uow.begin().await?;
        uow.list_events().await
    }
}
