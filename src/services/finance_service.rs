// src/services/finance_service.rs

use std::sync::Arc;

use crate::{
    common::error::AppError,
    db::{AccountStore, UnitOfWorkFactory},
    models::finance::Account,
};

// Leitura do plano de contas. Os saldos só mudam pelos workflows de
// transferência e consumo; aqui não há escrita.
#[derive(Clone)]
pub struct FinanceService {
    uow: Arc<dyn UnitOfWorkFactory>,
}

impl FinanceService {
    pub fn new(uow: Arc<dyn UnitOfWorkFactory>) -> Self {
        Self { uow }
    }

    pub async fn list_accounts(&self) -> Result<Vec<Account>, AppError> {
        let mut uow = self.uow.begin().await?;
        uow.list_accounts().await
    }
}
