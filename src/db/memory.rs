// src/db/memory.rs
//
// Test double em memória com a MESMA semântica tudo-ou-nada da implementação
// Postgres: um Mutex serializa as unidades de trabalho (como o lock de linha
// serializa as transações) e um snapshot tirado no begin é restaurado no Drop
// se o commit nunca aconteceu.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use sqlx::types::Json;
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::{
        AccountStore, CatalogStore, ConsumptionStore, InventoryStore, InvoiceStore, NewItem,
        SequenceGenerator, StockIssue, TransferStore, UnitOfWork, UnitOfWorkFactory,
    },
    models::{
        documents::{PurchaseInvoice, PurchaseInvoiceLine},
        finance::{Account, AccountGroup, LedgerEntry},
        inventory::{InventoryRecord, Item, StockMovement, StockMovementReason, StockOwner},
        operations::{
            EventStatus, HealthEvent, RequestStatus, TransferRequest,
        },
    },
};

#[derive(Debug, Clone, Default)]
pub struct MemState {
    pub items: Vec<Item>,
    pub records: HashMap<(Uuid, StockOwner), InventoryRecord>,
    pub movements: Vec<StockMovement>,
    pub accounts: Vec<Account>,
    pub ledger: Vec<LedgerEntry>,
    pub sequences: HashMap<String, i64>,
    pub transfers: HashMap<Uuid, TransferRequest>,
    pub events: HashMap<Uuid, HealthEvent>,
    pub invoices: Vec<PurchaseInvoice>,
    pub invoice_lines: Vec<PurchaseInvoiceLine>,
}

pub struct InMemoryUnitOfWorkFactory {
    state: Arc<Mutex<MemState>>,
}

impl InMemoryUnitOfWorkFactory {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(MemState::default())),
        }
    }

    /// Acesso direto ao estado persistido, para inspeção nos testes.
    pub fn state(&self) -> Arc<Mutex<MemState>> {
        Arc::clone(&self.state)
    }
}

#[async_trait]
impl UnitOfWorkFactory for InMemoryUnitOfWorkFactory {
    async fn begin(&self) -> Result<Box<dyn UnitOfWork>, AppError> {
        let guard = Arc::clone(&self.state).lock_owned().await;
        let snapshot = guard.clone();
        Ok(Box::new(InMemoryUnitOfWork {
            guard,
            snapshot: Some(snapshot),
        }))
    }
}

pub struct InMemoryUnitOfWork {
    guard: OwnedMutexGuard<MemState>,
    // Some = ainda não commitou; restaurado no Drop.
    snapshot: Option<MemState>,
}

impl Drop for InMemoryUnitOfWork {
    fn drop(&mut self) {
        if let Some(snapshot) = self.snapshot.take() {
            *self.guard = snapshot;
        }
    }
}

#[async_trait]
impl UnitOfWork for InMemoryUnitOfWork {
    async fn commit(mut self: Box<Self>) -> Result<(), AppError> {
        self.snapshot = None;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), AppError> {
        // O Drop restaura o snapshot.
        Ok(())
    }
}

#[async_trait]
impl CatalogStore for InMemoryUnitOfWork {
    async fn create_item(&mut self, new_item: &NewItem) -> Result<Item, AppError> {
        if self.guard.items.iter().any(|i| i.name == new_item.name) {
            return Err(AppError::ItemNameAlreadyExists(new_item.name.clone()));
        }
        let now = Utc::now();
        let item = Item {
            id: Uuid::new_v4(),
            name: new_item.name.clone(),
            unit: new_item.unit.clone(),
            low_stock_threshold: new_item.low_stock_threshold,
            category: new_item.details.category(),
            details: Json(new_item.details.clone()),
            expense_account_id: new_item.expense_account_id,
            manager_account_id: new_item.manager_account_id,
            agriculture_account_id: new_item.agriculture_account_id,
            cattle_account_id: new_item.cattle_account_id,
            created_at: now,
            updated_at: now,
        };
        self.guard.items.push(item.clone());
        Ok(item)
    }

    async fn get_item(&mut self, item_id: Uuid) -> Result<Item, AppError> {
        self.guard
            .items
            .iter()
            .find(|i| i.id == item_id)
            .cloned()
            .ok_or_else(|| AppError::NotFound("Item".to_string()))
    }

    async fn list_items(&mut self) -> Result<Vec<Item>, AppError> {
        let mut items = self.guard.items.clone();
        items.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(items)
    }
}

#[async_trait]
impl InventoryStore for InMemoryUnitOfWork {
    async fn receive(
        &mut self,
        item_id: Uuid,
        owner: StockOwner,
        quantity: Decimal,
        total_cost: Decimal,
        reason: StockMovementReason,
        notes: Option<&str>,
    ) -> Result<InventoryRecord, AppError> {
        if quantity <= Decimal::ZERO {
            return Err(AppError::InvalidInput(
                "A quantidade recebida deve ser maior que zero.".to_string(),
            ));
        }
        if total_cost < Decimal::ZERO {
            return Err(AppError::InvalidInput(
                "O valor da entrada não pode ser negativo.".to_string(),
            ));
        }

        let unit_cost = total_cost / quantity;
        let record = self
            .guard
            .records
            .entry((item_id, owner))
            .or_insert_with(|| InventoryRecord {
                id: Uuid::new_v4(),
                item_id,
                owner,
                quantity: Decimal::ZERO,
                total_cost: Decimal::ZERO,
                updated_at: Utc::now(),
            });
        record.quantity += quantity;
        record.total_cost += total_cost;
        record.updated_at = Utc::now();
        let record = record.clone();

        self.push_movement(item_id, owner, quantity, reason, Some(unit_cost), notes);
        Ok(record)
    }

    async fn issue(
        &mut self,
        item_id: Uuid,
        owner: StockOwner,
        quantity: Decimal,
        reason: StockMovementReason,
        notes: Option<&str>,
    ) -> Result<StockIssue, AppError> {
        if quantity <= Decimal::ZERO {
            return Err(AppError::InvalidInput(
                "A quantidade baixada deve ser maior que zero.".to_string(),
            ));
        }

        let record = self.guard.records.get_mut(&(item_id, owner)).ok_or_else(|| {
            AppError::InsufficientStock(format!("Sem saldo do item no pool {}.", owner.label()))
        })?;

        if record.quantity < quantity {
            return Err(AppError::InsufficientStock(format!(
                "Saldo de {} insuficiente no pool {} para baixar {}.",
                record.quantity,
                owner.label(),
                quantity
            )));
        }

        let unit_cost = record.average_cost();
        let total_value = if record.quantity == quantity {
            record.total_cost
        } else {
            quantity * unit_cost
        };

        record.quantity -= quantity;
        record.total_cost -= total_value;
        record.updated_at = Utc::now();
        let record = record.clone();

        self.push_movement(item_id, owner, -quantity, reason, Some(unit_cost), notes);
        Ok(StockIssue {
            unit_cost,
            total_value,
            record,
        })
    }

    async fn average_cost(&mut self, item_id: Uuid, owner: StockOwner) -> Result<Decimal, AppError> {
        Ok(self
            .guard
            .records
            .get(&(item_id, owner))
            .map(|r| r.average_cost())
            .unwrap_or(Decimal::ZERO))
    }

    async fn list_records(&mut self) -> Result<Vec<InventoryRecord>, AppError> {
        let mut records: Vec<_> = self.guard.records.values().cloned().collect();
        records.sort_by_key(|r| (r.item_id, r.owner as u8));
        Ok(records)
    }
}

impl InMemoryUnitOfWork {
    fn push_movement(
        &mut self,
        item_id: Uuid,
        owner: StockOwner,
        quantity_changed: Decimal,
        reason: StockMovementReason,
        unit_cost: Option<Decimal>,
        notes: Option<&str>,
    ) {
        self.guard.movements.push(StockMovement {
            id: Uuid::new_v4(),
            item_id,
            owner,
            quantity_changed,
            reason,
            unit_cost,
            notes: notes.map(str::to_string),
            created_at: Utc::now(),
        });
    }

    fn find_or_create_account(
        &mut self,
        parent_id: Option<Uuid>,
        name: &str,
        group: AccountGroup,
        category: &str,
    ) -> Account {
        if let Some(existing) = self
            .guard
            .accounts
            .iter()
            .find(|a| a.name == name && a.parent_id == parent_id)
        {
            return existing.clone();
        }
        let now = Utc::now();
        let account = Account {
            id: Uuid::new_v4(),
            parent_id,
            name: name.to_string(),
            group,
            category: category.to_string(),
            opening_balance: Decimal::ZERO,
            current_balance: Decimal::ZERO,
            created_at: now,
            updated_at: now,
        };
        self.guard.accounts.push(account.clone());
        account
    }
}

#[async_trait]
impl AccountStore for InMemoryUnitOfWork {
    async fn find_or_create_parent(
        &mut self,
        name: &str,
        group: AccountGroup,
        category: &str,
    ) -> Result<Account, AppError> {
        Ok(self.find_or_create_account(None, name, group, category))
    }

    async fn find_or_create_child(
        &mut self,
        parent_id: Uuid,
        name: &str,
        group: AccountGroup,
        category: &str,
    ) -> Result<Account, AppError> {
        Ok(self.find_or_create_account(Some(parent_id), name, group, category))
    }

    async fn get_account(&mut self, account_id: Uuid) -> Result<Account, AppError> {
        self.guard
            .accounts
            .iter()
            .find(|a| a.id == account_id)
            .cloned()
            .ok_or_else(|| AppError::NotFound("Conta contábil".to_string()))
    }

    async fn adjust_balance(
        &mut self,
        account_id: Uuid,
        delta: Decimal,
        description: Option<&str>,
    ) -> Result<Account, AppError> {
        let account = self
            .guard
            .accounts
            .iter_mut()
            .find(|a| a.id == account_id)
            .ok_or_else(|| AppError::NotFound("Conta contábil".to_string()))?;
        account.current_balance += delta;
        account.updated_at = Utc::now();
        let account = account.clone();

        self.guard.ledger.push(LedgerEntry {
            id: Uuid::new_v4(),
            account_id,
            amount: delta,
            description: description.map(str::to_string),
            created_at: Utc::now(),
        });
        Ok(account)
    }

    async fn list_accounts(&mut self) -> Result<Vec<Account>, AppError> {
        let mut accounts = self.guard.accounts.clone();
        accounts.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(accounts)
    }
}

#[async_trait]
impl SequenceGenerator for InMemoryUnitOfWork {
    async fn next(&mut self, prefix: &str) -> Result<i64, AppError> {
        let counter = self.guard.sequences.entry(prefix.to_string()).or_insert(0);
        *counter += 1;
        Ok(*counter)
    }
}

#[async_trait]
impl TransferStore for InMemoryUnitOfWork {
    async fn create_request(
        &mut self,
        item_id: Uuid,
        department: StockOwner,
        quantity: Decimal,
        details: Option<&str>,
    ) -> Result<TransferRequest, AppError> {
        let request = TransferRequest {
            id: Uuid::new_v4(),
            item_id,
            department,
            quantity,
            details: details.map(str::to_string),
            status: RequestStatus::Pending,
            requested_at: Utc::now(),
            handled_at: None,
        };
        self.guard.transfers.insert(request.id, request.clone());
        Ok(request)
    }

    async fn get_request(&mut self, request_id: Uuid) -> Result<TransferRequest, AppError> {
        self.guard
            .transfers
            .get(&request_id)
            .cloned()
            .ok_or_else(|| AppError::NotFound("Pedido de transferência".to_string()))
    }

    async fn mark_request_handled(
        &mut self,
        request_id: Uuid,
        status: RequestStatus,
    ) -> Result<TransferRequest, AppError> {
        let request = self
            .guard
            .transfers
            .get_mut(&request_id)
            .ok_or_else(|| AppError::NotFound("Pedido de transferência".to_string()))?;
        if request.status != RequestStatus::Pending {
            return Err(AppError::AlreadyHandled(format!(
                "O pedido de transferência já foi processado (status {:?}).",
                request.status
            )));
        }
        request.status = status;
        request.handled_at = Some(Utc::now());
        Ok(request.clone())
    }

    async fn list_requests(&mut self) -> Result<Vec<TransferRequest>, AppError> {
        let mut requests: Vec<_> = self.guard.transfers.values().cloned().collect();
        requests.sort_by(|a, b| b.requested_at.cmp(&a.requested_at));
        Ok(requests)
    }
}

#[async_trait]
impl ConsumptionStore for InMemoryUnitOfWork {
    async fn create_event(
        &mut self,
        department: StockOwner,
        description: &str,
    ) -> Result<HealthEvent, AppError> {
        let event = HealthEvent {
            id: Uuid::new_v4(),
            department,
            description: description.to_string(),
            status: EventStatus::Pending,
            medicine_item_id: None,
            quantity: None,
            dosage: None,
            created_at: Utc::now(),
            completed_at: None,
        };
        self.guard.events.insert(event.id, event.clone());
        Ok(event)
    }

    async fn get_event(&mut self, event_id: Uuid) -> Result<HealthEvent, AppError> {
        self.guard
            .events
            .get(&event_id)
            .cloned()
            .ok_or_else(|| AppError::NotFound("Evento sanitário".to_string()))
    }

    async fn mark_event_completed(
        &mut self,
        event_id: Uuid,
        medicine_item_id: Uuid,
        quantity: Decimal,
        dosage: Option<&str>,
    ) -> Result<HealthEvent, AppError> {
        let event = self
            .guard
            .events
            .get_mut(&event_id)
            .ok_or_else(|| AppError::NotFound("Evento sanitário".to_string()))?;
        if event.status != EventStatus::Pending {
            return Err(AppError::AlreadyHandled(
                "O evento sanitário já foi concluído.".to_string(),
            ));
        }
        event.status = EventStatus::Completed;
        event.medicine_item_id = Some(medicine_item_id);
        event.quantity = Some(quantity);
        event.dosage = dosage.map(str::to_string);
        event.completed_at = Some(Utc::now());
        Ok(event.clone())
    }

    async fn list_events(&mut self) -> Result<Vec<HealthEvent>, AppError> {
        let mut events: Vec<_> = self.guard.events.values().cloned().collect();
        events.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(events)
    }
}

#[async_trait]
impl InvoiceStore for InMemoryUnitOfWork {
    async fn reference_in_use(&mut self, reference: &str) -> Result<bool, AppError> {
        Ok(self
            .guard
            .invoices
            .iter()
            .any(|i| i.reference.as_deref() == Some(reference)))
    }

    async fn insert_invoice(
        &mut self,
        invoice: &PurchaseInvoice,
        lines: &[PurchaseInvoiceLine],
    ) -> Result<(), AppError> {
        if let Some(reference) = &invoice.reference {
            if self.reference_in_use(reference).await? {
                return Err(AppError::DuplicateReference(reference.clone()));
            }
        }
        self.guard.invoices.push(invoice.clone());
        self.guard.invoice_lines.extend_from_slice(lines);
        Ok(())
    }

    async fn list_invoices(&mut self) -> Result<Vec<PurchaseInvoice>, AppError> {
        let mut invoices = self.guard.invoices.clone();
        invoices.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(invoices)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[tokio::test]
    async fn dropped_unit_of_work_leaves_no_trace() {
        let factory = InMemoryUnitOfWorkFactory::new();

        {
            let mut uow = factory.begin().await.unwrap();
            uow.create_event(StockOwner::Cattle, "Evento fantasma")
                .await
                .unwrap();
            uow.next("PI").await.unwrap();
            // Sem commit: o drop restaura o snapshot.
        }

        let state = factory.state();
        let state = state.lock().await;
        assert!(state.events.is_empty());
        assert!(state.sequences.is_empty());
    }

    #[tokio::test]
    async fn committed_unit_of_work_persists() {
        let factory = InMemoryUnitOfWorkFactory::new();

        let mut uow = factory.begin().await.unwrap();
        uow.create_event(StockOwner::Cattle, "Evento real").await.unwrap();
        uow.commit().await.unwrap();

        let state = factory.state();
        let state = state.lock().await;
        assert_eq!(state.events.len(), 1);
    }

    #[tokio::test]
    async fn explicit_rollback_discards_changes() {
        let factory = InMemoryUnitOfWorkFactory::new();

        let mut uow = factory.begin().await.unwrap();
        uow.create_event(StockOwner::Agriculture, "Plantio").await.unwrap();
        uow.rollback().await.unwrap();

        let state = factory.state();
        let state = state.lock().await;
        assert!(state.events.is_empty());
    }

    #[tokio::test]
    async fn sequence_values_are_distinct_and_monotonic() {
        let factory = InMemoryUnitOfWorkFactory::new();

        let mut seen = Vec::new();
        for _ in 0..5 {
            let mut uow = factory.begin().await.unwrap();
            seen.push(uow.next("PI").await.unwrap());
            uow.commit().await.unwrap();
        }
        assert_eq!(seen, vec![1, 2, 3, 4, 5]);

        // Prefixos diferentes têm contadores independentes.
        let mut uow = factory.begin().await.unwrap();
        assert_eq!(uow.next("SO").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn quantity_never_goes_negative_across_operations() {
        let factory = InMemoryUnitOfWorkFactory::new();
        let item_id = Uuid::new_v4();

        let mut uow = factory.begin().await.unwrap();
        uow.receive(
            item_id,
            StockOwner::Manager,
            dec("10"),
            dec("50"),
            StockMovementReason::Purchase,
            None,
        )
        .await
        .unwrap();

        uow.issue(item_id, StockOwner::Manager, dec("6"), StockMovementReason::Consumption, None)
            .await
            .unwrap();
        let err = uow
            .issue(item_id, StockOwner::Manager, dec("5"), StockMovementReason::Consumption, None)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InsufficientStock(_)));

        // A baixa que falhou não mexeu em nada.
        let record = uow.list_records().await.unwrap().remove(0);
        assert_eq!(record.quantity, dec("4"));
        assert_eq!(record.total_cost, dec("20"));
    }
}
