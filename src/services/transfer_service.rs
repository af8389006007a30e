// src/services/transfer_service.rs
//
// Workflow de transferência almoxarifado -> departamento. A aprovação move o
// estoque ao custo médio vigente e espelha o mesmo valor como par balanceado
// de lançamentos entre as duas contas de ativo de estoque, tudo em uma única
// unidade de trabalho.

use std::sync::Arc;

use rust_decimal::Decimal;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::{AccountStore, CatalogStore, InventoryStore, TransferStore, UnitOfWork, UnitOfWorkFactory},
    models::{
        inventory::{StockMovementReason, StockOwner},
        operations::{RequestStatus, TransferRequest},
    },
    services::MAX_COMMIT_ATTEMPTS,
};

#[derive(Clone)]
pub struct TransferService {
    uow: Arc<dyn UnitOfWorkFactory>,
}

impl TransferService {
    pub fn new(uow: Arc<dyn UnitOfWorkFactory>) -> Self {
        Self { uow }
    }

    pub async fn create_request(
        &self,
        item_id: Uuid,
        department: StockOwner,
        quantity: Decimal,
        details: Option<&str>,
    ) -> Result<TransferRequest, AppError> {
        if !department.is_department() {
            return Err(AppError::InvalidInput(
                "O destino de uma transferência deve ser um departamento.".to_string(),
            ));
        }
        if quantity <= Decimal::ZERO {
            return Err(AppError::InvalidInput(
                "A quantidade transferida deve ser maior que zero.".to_string(),
            ));
        }

        let mut uow = self.uow.begin().await?;
        uow.get_item(item_id).await?;
        let request = uow
            .create_request(item_id, department, quantity, details)
            .await?;
        uow.commit().await?;
        Ok(request)
    }

    pub async fn approve(&self, request_id: Uuid) -> Result<TransferRequest, AppError> {
        let mut attempt = 1;
        loop {
            match self.try_approve(request_id).await {
                Err(e) if e.is_retryable() && attempt < MAX_COMMIT_ATTEMPTS => {
                    tracing::warn!(
                        %request_id,
                        attempt,
                        "Transação abortada ao aprovar transferência, tentando de novo"
                    );
                    attempt += 1;
                }
                other => return other,
            }
        }
    }

    async fn try_approve(&self, request_id: Uuid) -> Result<TransferRequest, AppError> {
        let mut uow = self.uow.begin().await?;

        let request = uow.get_request(request_id).await?;
        if request.status != RequestStatus::Pending {
            return Err(AppError::AlreadyHandled(format!(
                "O pedido de transferência já foi processado (status {:?}).",
                request.status
            )));
        }

        let item = uow.get_item(request.item_id).await?;
        let manager_account = item.asset_account_for(StockOwner::Manager).ok_or_else(|| {
            AppError::MissingAccount(format!(
                "O item '{}' não tem conta de estoque do almoxarifado.",
                item.name
            ))
        })?;
        let department_account = item.asset_account_for(request.department).ok_or_else(|| {
            AppError::MissingAccount(format!(
                "O item '{}' não tem conta de estoque de {}.",
                item.name,
                request.department.label()
            ))
        })?;

        // Baixa no almoxarifado ao custo médio vigente; o departamento recebe
        // exatamente o valor que saiu.
        let issue = uow
            .issue(
                request.item_id,
                StockOwner::Manager,
                request.quantity,
                StockMovementReason::TransferOut,
                request.details.as_deref(),
            )
            .await?;
        uow.receive(
            request.item_id,
            request.department,
            request.quantity,
            issue.total_value,
            StockMovementReason::TransferIn,
            request.details.as_deref(),
        )
        .await?;

        let description = format!(
            "Transferência de {} {} de {} para {}",
            request.quantity,
            item.unit,
            item.name,
            request.department.label()
        );
        uow.adjust_balance(manager_account, -issue.total_value, Some(&description))
            .await?;
        uow.adjust_balance(department_account, issue.total_value, Some(&description))
            .await?;

        let updated = uow
            .mark_request_handled(request_id, RequestStatus::Approved)
            .await?;

        uow.commit().await?;
        Ok(updated)
    }

    // Rejeição não mexe em estoque nem em saldo: só a transição de status.
    pub async fn reject(&self, request_id: Uuid) -> Result<TransferRequest, AppError> {
        let mut uow = self.uow.begin().await?;
        let updated = uow
            .mark_request_handled(request_id, RequestStatus::Rejected)
            .await?;
        uow.commit().await?;
        Ok(updated)
    }

    pub async fn list_requests(&self) -> Result<Vec<TransferRequest>, AppError> {
        let mut uow = self.uow.begin().await?;
        uow.list_requests().await
    }
}
