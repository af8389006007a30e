// src/db/postgres.rs

use async_trait::async_trait;
use rust_decimal::Decimal;
use sqlx::types::Json;
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::{
        AccountStore, CatalogStore, ConsumptionStore, InventoryStore, InvoiceStore, NewItem,
        SequenceGenerator, StockIssue, TransferStore, UnitOfWork, UnitOfWorkFactory,
    },
    models::{
        documents::{PurchaseInvoice, PurchaseInvoiceLine},
        finance::{Account, AccountGroup},
        inventory::{InventoryRecord, Item, StockMovementReason, StockOwner},
        operations::{EventStatus, HealthEvent, RequestStatus, TransferRequest},
    },
};

/// Classifica erros do Postgres: falha de serialização (40001) e deadlock
/// (40P01) viram TransactionAborted, o único kind que os workflows
/// reaplicam. O resto sobe como erro de banco.
fn map_db_error(e: sqlx::Error) -> AppError {
    if let sqlx::Error::Database(db_err) = &e {
        if let Some(code) = db_err.code() {
            if code == "40001" || code == "40P01" {
                return AppError::TransactionAborted;
            }
        }
    }
    e.into()
}

// ---
// Unit of Work sobre uma transação sqlx
// ---
// Uma instância = uma transação. Se o chamador não der commit, o Drop da
// Transaction desfaz tudo — inclusive nos caminhos de erro com `?`.

pub struct PgUnitOfWork {
    tx: Transaction<'static, Postgres>,
}

pub struct PgUnitOfWorkFactory {
    pool: PgPool,
}

impl PgUnitOfWorkFactory {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UnitOfWorkFactory for PgUnitOfWorkFactory {
    async fn begin(&self) -> Result<Box<dyn UnitOfWork>, AppError> {
        let tx = self.pool.begin().await.map_err(map_db_error)?;
        Ok(Box::new(PgUnitOfWork { tx }))
    }
}

#[async_trait]
impl UnitOfWork for PgUnitOfWork {
    async fn commit(self: Box<Self>) -> Result<(), AppError> {
        self.tx.commit().await.map_err(map_db_error)
    }

    async fn rollback(self: Box<Self>) -> Result<(), AppError> {
        self.tx.rollback().await.map_err(map_db_error)
    }
}

// ---
// Catálogo
// ---

#[async_trait]
impl CatalogStore for PgUnitOfWork {
    async fn create_item(&mut self, new_item: &NewItem) -> Result<Item, AppError> {
        sqlx::query_as::<_, Item>(
            r#"
            INSERT INTO items (
                name, unit, low_stock_threshold, category, details,
                expense_account_id, manager_account_id,
                agriculture_account_id, cattle_account_id
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING *
            "#,
        )
        .bind(&new_item.name)
        .bind(&new_item.unit)
        .bind(new_item.low_stock_threshold)
        .bind(new_item.details.category())
        .bind(Json(new_item.details.clone()))
        .bind(new_item.expense_account_id)
        .bind(new_item.manager_account_id)
        .bind(new_item.agriculture_account_id)
        .bind(new_item.cattle_account_id)
        .fetch_one(&mut *self.tx)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(db_err) = &e {
                if db_err.is_unique_violation() {
                    return AppError::ItemNameAlreadyExists(new_item.name.clone());
                }
            }
            map_db_error(e)
        })
    }

    async fn get_item(&mut self, item_id: Uuid) -> Result<Item, AppError> {
        sqlx::query_as::<_, Item>("SELECT * FROM items WHERE id = $1")
            .bind(item_id)
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(map_db_error)?
            .ok_or_else(|| AppError::NotFound("Item".to_string()))
    }

    async fn list_items(&mut self) -> Result<Vec<Item>, AppError> {
        sqlx::query_as::<_, Item>("SELECT * FROM items ORDER BY name ASC")
            .fetch_all(&mut *self.tx)
            .await
            .map_err(map_db_error)
    }
}

// ---
// Estoque
// ---

#[async_trait]
impl InventoryStore for PgUnitOfWork {
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

        // UPSERT atômico: cria o registro no primeiro recebimento, senão soma
        // quantidade e custo ao saldo existente (custo médio ponderado móvel).
        let record = sqlx::query_as::<_, InventoryRecord>(
            r#"
            INSERT INTO inventory_records (item_id, owner, quantity, total_cost)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (item_id, owner)
            DO UPDATE SET
                quantity = inventory_records.quantity + $3,
                total_cost = inventory_records.total_cost + $4,
                updated_at = NOW()
            RETURNING *
            "#,
        )
        .bind(item_id)
        .bind(owner)
        .bind(quantity)
        .bind(total_cost)
        .fetch_one(&mut *self.tx)
        .await
        .map_err(map_db_error)?;

        self.record_movement(item_id, owner, quantity, reason, Some(unit_cost), notes)
            .await?;

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

        // Tranca a linha para serializar baixas concorrentes do mesmo pool.
        let current = sqlx::query_as::<_, InventoryRecord>(
            "SELECT * FROM inventory_records WHERE item_id = $1 AND owner = $2 FOR UPDATE",
        )
        .bind(item_id)
        .bind(owner)
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(map_db_error)?
        .ok_or_else(|| {
            AppError::InsufficientStock(format!("Sem saldo do item no pool {}.", owner.label()))
        })?;

        let unit_cost = current.average_cost();
        // Baixa total zera o custo exatamente, sem resíduo de arredondamento.
        let total_value = if current.quantity == quantity {
            current.total_cost
        } else {
            quantity * unit_cost
        };

        // Decremento condicional: o guard `quantity >= $3` no SQL é a
        // última linha de defesa contra saldo negativo.
        let record = sqlx::query_as::<_, InventoryRecord>(
            r#"
            UPDATE inventory_records
            SET quantity = quantity - $3,
                total_cost = total_cost - $4,
                updated_at = NOW()
            WHERE item_id = $1 AND owner = $2 AND quantity >= $3
            RETURNING *
            "#,
        )
        .bind(item_id)
        .bind(owner)
        .bind(quantity)
        .bind(total_value)
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(map_db_error)?
        .ok_or_else(|| {
            AppError::InsufficientStock(format!(
                "Saldo de {} insuficiente no pool {} para baixar {}.",
                current.quantity,
                owner.label(),
                quantity
            ))
        })?;

        self.record_movement(item_id, owner, -quantity, reason, Some(unit_cost), notes)
            .await?;

        Ok(StockIssue {
            unit_cost,
            total_value,
            record,
        })
    }

    async fn average_cost(&mut self, item_id: Uuid, owner: StockOwner) -> Result<Decimal, AppError> {
        let record = sqlx::query_as::<_, InventoryRecord>(
            "SELECT * FROM inventory_records WHERE item_id = $1 AND owner = $2",
        )
        .bind(item_id)
        .bind(owner)
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(map_db_error)?;

        Ok(record.map(|r| r.average_cost()).unwrap_or(Decimal::ZERO))
    }

    async fn list_records(&mut self) -> Result<Vec<InventoryRecord>, AppError> {
        sqlx::query_as::<_, InventoryRecord>(
            "SELECT * FROM inventory_records ORDER BY item_id, owner",
        )
        .fetch_all(&mut *self.tx)
        .await
        .map_err(map_db_error)
    }
}

impl PgUnitOfWork {
    /// Grava a movimentação no livro de estoque (auditoria).
    async fn record_movement(
        &mut self,
        item_id: Uuid,
        owner: StockOwner,
        quantity_changed: Decimal,
        reason: StockMovementReason,
        unit_cost: Option<Decimal>,
        notes: Option<&str>,
    ) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO stock_movements (item_id, owner, quantity_changed, reason, unit_cost, notes)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(item_id)
        .bind(owner)
        .bind(quantity_changed)
        .bind(reason)
        .bind(unit_cost)
        .bind(notes)
        .execute(&mut *self.tx)
        .await
        .map_err(map_db_error)?;

        Ok(())
    }
}

// ---
// Plano de Contas
// ---

#[async_trait]
impl AccountStore for PgUnitOfWork {
    async fn find_or_create_parent(
        &mut self,
        name: &str,
        group: AccountGroup,
        category: &str,
    ) -> Result<Account, AppError> {
        // O DO UPDATE "inócuo" faz o RETURNING devolver a linha existente
        // quando a conta já foi criada (inclusive por uma transação
        // concorrente). Nada de pré-checagem com SELECT.
        sqlx::query_as::<_, Account>(
            r#"
            INSERT INTO accounts (parent_id, name, account_group, category)
            VALUES (NULL, $1, $2, $3)
            ON CONFLICT (name, parent_id)
            DO UPDATE SET updated_at = accounts.updated_at
            RETURNING *
            "#,
        )
        .bind(name)
        .bind(group)
        .bind(category)
        .fetch_one(&mut *self.tx)
        .await
        .map_err(map_db_error)
    }

    async fn find_or_create_child(
        &mut self,
        parent_id: Uuid,
        name: &str,
        group: AccountGroup,
        category: &str,
    ) -> Result<Account, AppError> {
        sqlx::query_as::<_, Account>(
            r#"
            INSERT INTO accounts (parent_id, name, account_group, category)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (name, parent_id)
            DO UPDATE SET updated_at = accounts.updated_at
            RETURNING *
            "#,
        )
        .bind(parent_id)
        .bind(name)
        .bind(group)
        .bind(category)
        .fetch_one(&mut *self.tx)
        .await
        .map_err(map_db_error)
    }

    async fn get_account(&mut self, account_id: Uuid) -> Result<Account, AppError> {
        sqlx::query_as::<_, Account>("SELECT * FROM accounts WHERE id = $1")
            .bind(account_id)
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(map_db_error)?
            .ok_or_else(|| AppError::NotFound("Conta contábil".to_string()))
    }

    async fn adjust_balance(
        &mut self,
        account_id: Uuid,
        delta: Decimal,
        description: Option<&str>,
    ) -> Result<Account, AppError> {
        let account = sqlx::query_as::<_, Account>(
            r#"
            UPDATE accounts
            SET current_balance = current_balance + $2, updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(account_id)
        .bind(delta)
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(map_db_error)?
        .ok_or_else(|| AppError::NotFound("Conta contábil".to_string()))?;

        sqlx::query(
            "INSERT INTO ledger_entries (account_id, amount, description) VALUES ($1, $2, $3)",
        )
        .bind(account_id)
        .bind(delta)
        .bind(description)
        .execute(&mut *self.tx)
        .await
        .map_err(map_db_error)?;

        Ok(account)
    }

    async fn list_accounts(&mut self) -> Result<Vec<Account>, AppError> {
        sqlx::query_as::<_, Account>("SELECT * FROM accounts ORDER BY name ASC")
            .fetch_all(&mut *self.tx)
            .await
            .map_err(map_db_error)
    }
}

// ---
// Sequências
// ---

#[async_trait]
impl SequenceGenerator for PgUnitOfWork {
    async fn next(&mut self, prefix: &str) -> Result<i64, AppError> {
        // Increment-and-fetch atômico. Dois chamadores concorrentes são
        // serializados pelo lock de linha do UPDATE e recebem valores
        // distintos; um rollback deixa um "buraco" na numeração, nunca
        // um duplicado.
        let (value,): (i64,) = sqlx::query_as(
            r#"
            INSERT INTO document_sequences (prefix, current_value)
            VALUES ($1, 1)
            ON CONFLICT (prefix)
            DO UPDATE SET current_value = document_sequences.current_value + 1
            RETURNING current_value
            "#,
        )
        .bind(prefix)
        .fetch_one(&mut *self.tx)
        .await
        .map_err(map_db_error)?;

        Ok(value)
    }
}

// ---
// Pedidos de Transferência
// ---

#[async_trait]
impl TransferStore for PgUnitOfWork {
    async fn create_request(
        &mut self,
        item_id: Uuid,
        department: StockOwner,
        quantity: Decimal,
        details: Option<&str>,
    ) -> Result<TransferRequest, AppError> {
        sqlx::query_as::<_, TransferRequest>(
            r#"
            INSERT INTO transfer_requests (item_id, department, quantity, details)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(item_id)
        .bind(department)
        .bind(quantity)
        .bind(details)
        .fetch_one(&mut *self.tx)
        .await
        .map_err(map_db_error)
    }

    async fn get_request(&mut self, request_id: Uuid) -> Result<TransferRequest, AppError> {
        sqlx::query_as::<_, TransferRequest>("SELECT * FROM transfer_requests WHERE id = $1")
            .bind(request_id)
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(map_db_error)?
            .ok_or_else(|| AppError::NotFound("Pedido de transferência".to_string()))
    }

    async fn mark_request_handled(
        &mut self,
        request_id: Uuid,
        status: RequestStatus,
    ) -> Result<TransferRequest, AppError> {
        let updated = sqlx::query_as::<_, TransferRequest>(
            r#"
            UPDATE transfer_requests
            SET status = $2, handled_at = NOW()
            WHERE id = $1 AND status = 'PENDING'
            RETURNING *
            "#,
        )
        .bind(request_id)
        .bind(status)
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(map_db_error)?;

        match updated {
            Some(request) => Ok(request),
            // Zero linhas: ou não existe, ou outro request chegou antes.
            None => {
                let existing = self.get_request(request_id).await?;
                Err(AppError::AlreadyHandled(format!(
                    "O pedido de transferência já foi processado (status {:?}).",
                    existing.status
                )))
            }
        }
    }

    async fn list_requests(&mut self) -> Result<Vec<TransferRequest>, AppError> {
        sqlx::query_as::<_, TransferRequest>(
            "SELECT * FROM transfer_requests ORDER BY requested_at DESC",
        )
        .fetch_all(&mut *self.tx)
        .await
        .map_err(map_db_error)
    }
}

// ---
// Eventos de Consumo
// ---

#[async_trait]
impl ConsumptionStore for PgUnitOfWork {
    async fn create_event(
        &mut self,
        department: StockOwner,
        description: &str,
    ) -> Result<HealthEvent, AppError> {
        sqlx::query_as::<_, HealthEvent>(
            r#"
            INSERT INTO health_events (department, description)
            VALUES ($1, $2)
            RETURNING *
            "#,
        )
        .bind(department)
        .bind(description)
        .fetch_one(&mut *self.tx)
        .await
        .map_err(map_db_error)
    }

    async fn get_event(&mut self, event_id: Uuid) -> Result<HealthEvent, AppError> {
        sqlx::query_as::<_, HealthEvent>("SELECT * FROM health_events WHERE id = $1")
            .bind(event_id)
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(map_db_error)?
            .ok_or_else(|| AppError::NotFound("Evento sanitário".to_string()))
    }

    async fn mark_event_completed(
        &mut self,
        event_id: Uuid,
        medicine_item_id: Uuid,
        quantity: Decimal,
        dosage: Option<&str>,
    ) -> Result<HealthEvent, AppError> {
        let updated = sqlx::query_as::<_, HealthEvent>(
            r#"
            UPDATE health_events
            SET status = 'COMPLETED',
                medicine_item_id = $2,
                quantity = $3,
                dosage = $4,
                completed_at = NOW()
            WHERE id = $1 AND status = 'PENDING'
            RETURNING *
            "#,
        )
        .bind(event_id)
        .bind(medicine_item_id)
        .bind(quantity)
        .bind(dosage)
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(map_db_error)?;

        match updated {
            Some(event) => Ok(event),
            None => {
                let existing = self.get_event(event_id).await?;
                debug_assert_eq!(existing.status, EventStatus::Completed);
                Err(AppError::AlreadyHandled(
                    "O evento sanitário já foi concluído.".to_string(),
                ))
            }
        }
    }

    async fn list_events(&mut self) -> Result<Vec<HealthEvent>, AppError> {
        sqlx::query_as::<_, HealthEvent>("SELECT * FROM health_events ORDER BY created_at DESC")
            .fetch_all(&mut *self.tx)
            .await
            .map_err(map_db_error)
    }
}

// ---
// Documentos de Compra
// ---

#[async_trait]
impl InvoiceStore for PgUnitOfWork {
    async fn reference_in_use(&mut self, reference: &str) -> Result<bool, AppError> {
        let (exists,): (bool,) = sqlx::query_as(
            "SELECT EXISTS(SELECT 1 FROM purchase_invoices WHERE reference = $1)",
        )
        .bind(reference)
        .fetch_one(&mut *self.tx)
        .await
        .map_err(map_db_error)?;

        Ok(exists)
    }

    async fn insert_invoice(
        &mut self,
        invoice: &PurchaseInvoice,
        lines: &[PurchaseInvoiceLine],
    ) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO purchase_invoices (
                id, invoice_number, supplier_name, reference,
                issue_date, due_date, subtotal, discount_total, total, status
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(invoice.id)
        .bind(&invoice.invoice_number)
        .bind(&invoice.supplier_name)
        .bind(&invoice.reference)
        .bind(invoice.issue_date)
        .bind(invoice.due_date)
        .bind(invoice.subtotal)
        .bind(invoice.discount_total)
        .bind(invoice.total)
        .bind(invoice.status)
        .execute(&mut *self.tx)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(db_err) = &e {
                // Backstop da constraint única: cobre a corrida entre a
                // pré-checagem e o INSERT de duas emissões simultâneas.
                if db_err.is_unique_violation() {
                    let reference = invoice.reference.clone().unwrap_or_default();
                    return AppError::DuplicateReference(reference);
                }
            }
            map_db_error(e)
        })?;

        for line in lines {
            sqlx::query(
                r#"
                INSERT INTO purchase_invoice_lines (
                    id, invoice_id, item_id, quantity, unit_price, discount_percent, line_total
                )
                VALUES ($1, $2, $3, $4, $5, $6, $7)
                "#,
            )
            .bind(line.id)
            .bind(line.invoice_id)
            .bind(line.item_id)
            .bind(line.quantity)
            .bind(line.unit_price)
            .bind(line.discount_percent)
            .bind(line.line_total)
            .execute(&mut *self.tx)
            .await
            .map_err(map_db_error)?;
        }

        Ok(())
    }

    async fn list_invoices(&mut self) -> Result<Vec<PurchaseInvoice>, AppError> {
        sqlx::query_as::<_, PurchaseInvoice>(
            "SELECT * FROM purchase_invoices ORDER BY created_at DESC",
        )
        .fetch_all(&mut *self.tx)
        .await
        .map_err(map_db_error)
    }
}
