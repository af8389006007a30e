// src/db/mod.rs
//
// Contratos de persistência do core. Os services recebem essas interfaces
// injetadas (nada de handles globais de banco); a implementação Postgres
// roda todas as operações de um workflow dentro de UMA transação, e a
// implementação em memória serve de test double com a mesma semântica
// tudo-ou-nada.

use async_trait::async_trait;
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::{
        documents::{PurchaseInvoice, PurchaseInvoiceLine},
        finance::{Account, AccountGroup},
        inventory::{InventoryRecord, Item, ItemDetails, StockMovementReason, StockOwner},
        operations::{HealthEvent, RequestStatus, TransferRequest},
    },
};

pub mod postgres;

#[cfg(test)]
pub mod memory;

pub use postgres::PgUnitOfWorkFactory;

// ---
// Catálogo (dados de referência: o core lê, o cadastro escreve)
// ---

/// Dados para criação de um item de catálogo.
#[derive(Debug, Clone)]
pub struct NewItem {
    pub name: String,
    pub unit: String,
    pub low_stock_threshold: Decimal,
    pub details: ItemDetails,
    pub expense_account_id: Option<Uuid>,
    pub manager_account_id: Option<Uuid>,
    pub agriculture_account_id: Option<Uuid>,
    pub cattle_account_id: Option<Uuid>,
}

#[async_trait]
pub trait CatalogStore {
    async fn create_item(&mut self, new_item: &NewItem) -> Result<Item, AppError>;
    async fn get_item(&mut self, item_id: Uuid) -> Result<Item, AppError>;
    async fn list_items(&mut self) -> Result<Vec<Item>, AppError>;
}

// ---
// Estoque
// ---

/// Resultado de uma baixa de estoque: o custo unitário usado (custo médio
/// ANTES da baixa) e o valor total removido, que o chamador precisa para
/// espelhar o lançamento contábil.
#[derive(Debug, Clone)]
pub struct StockIssue {
    pub unit_cost: Decimal,
    pub total_value: Decimal,
    pub record: InventoryRecord,
}

#[async_trait]
pub trait InventoryStore {
    /// Entrada de estoque. Recebe o VALOR TOTAL da entrada (não o custo
    /// unitário) para que uma transferência deposite exatamente o que saiu
    /// do pool de origem, sem resíduo de divisão. Soma quantidade e valor ao
    /// saldo (custo médio ponderado móvel) e grava a movimentação de
    /// auditoria.
    async fn receive(
        &mut self,
        item_id: Uuid,
        owner: StockOwner,
        quantity: Decimal,
        total_cost: Decimal,
        reason: StockMovementReason,
        notes: Option<&str>,
    ) -> Result<InventoryRecord, AppError>;

    /// Baixa de estoque ao custo médio vigente. Decremento condicional no
    /// banco (nunca read-modify-write): falha com InsufficientStock sem
    /// alterar nada quando o saldo não cobre a quantidade.
    async fn issue(
        &mut self,
        item_id: Uuid,
        owner: StockOwner,
        quantity: Decimal,
        reason: StockMovementReason,
        notes: Option<&str>,
    ) -> Result<StockIssue, AppError>;

    /// Leitura pura. Zero para registro inexistente ou zerado.
    async fn average_cost(&mut self, item_id: Uuid, owner: StockOwner) -> Result<Decimal, AppError>;

    async fn list_records(&mut self) -> Result<Vec<InventoryRecord>, AppError>;
}

// ---
// Plano de Contas
// ---

#[async_trait]
pub trait AccountStore {
    /// Idempotente. A corrida de duas criações simultâneas do mesmo nome é
    /// resolvida pela constraint única (name, parent_id), não por pré-checagem.
    async fn find_or_create_parent(
        &mut self,
        name: &str,
        group: AccountGroup,
        category: &str,
    ) -> Result<Account, AppError>;

    async fn find_or_create_child(
        &mut self,
        parent_id: Uuid,
        name: &str,
        group: AccountGroup,
        category: &str,
    ) -> Result<Account, AppError>;

    async fn get_account(&mut self, account_id: Uuid) -> Result<Account, AppError>;

    /// Soma `delta` (positivo ou negativo) ao saldo corrente e grava o
    /// lançamento de auditoria. Sem piso/teto nesta camada: conta pode
    /// legitimamente ficar negativa (conta retificadora).
    async fn adjust_balance(
        &mut self,
        account_id: Uuid,
        delta: Decimal,
        description: Option<&str>,
    ) -> Result<Account, AppError>;

    async fn list_accounts(&mut self) -> Result<Vec<Account>, AppError>;
}

// ---
// Sequências de Documento
// ---

#[async_trait]
pub trait SequenceGenerator {
    /// Incrementa e retorna o contador do prefixo de forma atômica
    /// (increment-and-fetch no storage). Dois chamadores concorrentes nunca
    /// recebem o mesmo valor. O contador é corrido, nunca zera por dia.
    async fn next(&mut self, prefix: &str) -> Result<i64, AppError>;
}

// ---
// Pedidos de Transferência
// ---

#[async_trait]
pub trait TransferStore {
    async fn create_request(
        &mut self,
        item_id: Uuid,
        department: StockOwner,
        quantity: Decimal,
        details: Option<&str>,
    ) -> Result<TransferRequest, AppError>;

    async fn get_request(&mut self, request_id: Uuid) -> Result<TransferRequest, AppError>;

    /// Transição condicional Pending -> status. UPDATE com WHERE status =
    /// 'PENDING' (concorrência otimista): a segunda tentativa concorrente
    /// recebe AlreadyHandled em vez de corromper o estado.
    async fn mark_request_handled(
        &mut self,
        request_id: Uuid,
        status: RequestStatus,
    ) -> Result<TransferRequest, AppError>;

    async fn list_requests(&mut self) -> Result<Vec<TransferRequest>, AppError>;
}

// ---
// Eventos de Consumo (tratamentos sanitários)
// ---

#[async_trait]
pub trait ConsumptionStore {
    async fn create_event(
        &mut self,
        department: StockOwner,
        description: &str,
    ) -> Result<HealthEvent, AppError>;

    async fn get_event(&mut self, event_id: Uuid) -> Result<HealthEvent, AppError>;

    /// Transição condicional Pending -> Completed, gravando o item consumido,
    /// a quantidade e a dosagem. AlreadyHandled se o evento já foi concluído.
    async fn mark_event_completed(
        &mut self,
        event_id: Uuid,
        medicine_item_id: Uuid,
        quantity: Decimal,
        dosage: Option<&str>,
    ) -> Result<HealthEvent, AppError>;

    async fn list_events(&mut self) -> Result<Vec<HealthEvent>, AppError>;
}

// ---
// Documentos de Compra
// ---

#[async_trait]
pub trait InvoiceStore {
    async fn reference_in_use(&mut self, reference: &str) -> Result<bool, AppError>;

    async fn insert_invoice(
        &mut self,
        invoice: &PurchaseInvoice,
        lines: &[PurchaseInvoiceLine],
    ) -> Result<(), AppError>;

    async fn list_invoices(&mut self) -> Result<Vec<PurchaseInvoice>, AppError>;
}

// ---
// Unit of Work
// ---

/// Fronteira de atomicidade: todas as mutações feitas através de um
/// UnitOfWork são aplicadas no commit ou descartadas inteiras. Sem commit
/// explícito, o drop desfaz tudo (inclusive em caminhos de erro com `?`),
/// então um workflow não tem como "esquecer" o rollback.
#[async_trait]
pub trait UnitOfWork:
    CatalogStore
    + InventoryStore
    + AccountStore
    + SequenceGenerator
    + TransferStore
    + ConsumptionStore
    + InvoiceStore
    + Send
{
    async fn commit(self: Box<Self>) -> Result<(), AppError>;
    async fn rollback(self: Box<Self>) -> Result<(), AppError>;
}

#[async_trait]
pub trait UnitOfWorkFactory: Send + Sync {
    async fn begin(&self) -> Result<Box<dyn UnitOfWork>, AppError>;
}
