// src/config.rs

use std::{env, sync::Arc, time::Duration};

use sqlx::{postgres::PgPoolOptions, PgPool};

use crate::{
    db::{PgUnitOfWorkFactory, UnitOfWorkFactory},
    services::{
        consumption_service::ConsumptionService, document_service::DocumentService,
        finance_service::FinanceService, inventory_service::InventoryService,
        transfer_service::TransferService,
    },
};

#[derive(Clone)]
pub struct AppState {
    pub db_pool: PgPool,
    pub inventory_service: InventoryService,
    pub transfer_service: TransferService,
    pub consumption_service: ConsumptionService,
    pub document_service: DocumentService,
    pub finance_service: FinanceService,
}

impl AppState {
    pub async fn new() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let database_url = env::var("DATABASE_URL").expect("DATABASE_URL deve ser definida");

        let db_pool = PgPoolOptions::new()
            .max_connections(5)
            .acquire_timeout(Duration::from_secs(3))
            .connect(&database_url)
            .await?;

        tracing::info!("✅ Conexão com o banco de dados estabelecida com sucesso!");

        // --- Monta o gráfico de dependências ---
        // Todos os services compartilham a mesma fábrica de unidades de
        // trabalho; cada chamada de workflow abre a sua própria transação.
        let uow_factory: Arc<dyn UnitOfWorkFactory> =
            Arc::new(PgUnitOfWorkFactory::new(db_pool.clone()));

        Ok(Self {
            db_pool,
            inventory_service: InventoryService::new(uow_factory.clone()),
            transfer_service: TransferService::new(uow_factory.clone()),
            consumption_service: ConsumptionService::new(uow_factory.clone()),
            document_service: DocumentService::new(uow_factory.clone()),
            finance_service: FinanceService::new(uow_factory),
        })
    }
}
