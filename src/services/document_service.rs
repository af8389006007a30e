// src/services/document_service.rs
//
// Emissão de notas de compra. Valida cabeçalho e linhas ANTES de abrir a
// unidade de trabalho, calcula os totais, aloca o número sequencial e
// persiste com status pendente. Não toca estoque nem saldos: a aprovação do
// documento é um passo separado, fora deste core.

use std::sync::Arc;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::{CatalogStore, InvoiceStore, SequenceGenerator, UnitOfWork, UnitOfWorkFactory},
    models::documents::{InvoiceStatus, PurchaseInvoice, PurchaseInvoiceDetail, PurchaseInvoiceLine},
    services::MAX_COMMIT_ATTEMPTS,
};

const INVOICE_PREFIX: &str = "PI";

/// Linha de entrada da emissão (antes de ganhar id e total).
#[derive(Debug, Clone)]
pub struct NewInvoiceLine {
    pub item_id: Uuid,
    pub quantity: Decimal,
    pub unit_price: Decimal,
    pub discount_percent: Decimal,
}

/// `PREFIXO-AAAA-MM-DD-NNN`. O contador é global por prefixo e nunca zera
/// por dia; o padding de três dígitos cresce naturalmente depois de 999.
fn format_invoice_number(prefix: &str, date: NaiveDate, sequence: i64) -> String {
    format!("{}-{}-{:03}", prefix, date.format("%Y-%m-%d"), sequence)
}

#[derive(Clone)]
pub struct DocumentService {
    uow: Arc<dyn UnitOfWorkFactory>,
}

impl DocumentService {
    pub fn new(uow: Arc<dyn UnitOfWorkFactory>) -> Self {
        Self { uow }
    }

    pub async fn issue_invoice(
        &self,
        supplier_name: &str,
        reference: Option<&str>,
        issue_date: NaiveDate,
        due_date: NaiveDate,
        lines: &[NewInvoiceLine],
    ) -> Result<PurchaseInvoiceDetail, AppError> {
        Self::validate(supplier_name, issue_date, due_date, lines)?;

        let mut attempt = 1;
        loop {
            match self
                .try_issue(supplier_name, reference, issue_date, due_date, lines)
                .await
            {
                Err(e) if e.is_retryable() && attempt < MAX_COMMIT_ATTEMPTS => {
                    tracing::warn!(attempt, "Transação abortada ao emitir nota, tentando de novo");
                    attempt += 1;
                }
                other => return other,
            }
        }
    }

    fn validate(
        supplier_name: &str,
        issue_date: NaiveDate,
        due_date: NaiveDate,
        lines: &[NewInvoiceLine],
    ) -> Result<(), AppError> {
        if supplier_name.trim().is_empty() {
            return Err(AppError::InvalidInput(
                "O nome do fornecedor não pode ser vazio.".to_string(),
            ));
        }
        if issue_date > due_date {
            return Err(AppError::InvalidInput(
                "A data de emissão não pode ser posterior ao vencimento.".to_string(),
            ));
        }
        if lines.is_empty() {
            return Err(AppError::InvalidInput(
                "A nota precisa de ao menos uma linha.".to_string(),
            ));
        }
        for line in lines {
            if line.quantity < Decimal::ONE {
                return Err(AppError::InvalidInput(
                    "A quantidade de cada linha deve ser ao menos 1.".to_string(),
                ));
            }
            if line.unit_price < Decimal::ZERO {
                return Err(AppError::InvalidInput(
                    "O preço unitário não pode ser negativo.".to_string(),
                ));
            }
            if line.discount_percent < Decimal::ZERO
                || line.discount_percent > Decimal::ONE_HUNDRED
            {
                return Err(AppError::InvalidInput(
                    "O desconto deve estar entre 0% e 100%.".to_string(),
                ));
            }
        }
        Ok(())
    }

    async fn try_issue(
        &self,
        supplier_name: &str,
        reference: Option<&str>,
        issue_date: NaiveDate,
        due_date: NaiveDate,
        lines: &[NewInvoiceLine],
    ) -> Result<PurchaseInvoiceDetail, AppError> {
        let mut uow = self.uow.begin().await?;

        if let Some(reference) = reference {
            // Pré-checagem amigável; a constraint única no banco cobre a
            // corrida entre duas emissões simultâneas da mesma referência.
            if uow.reference_in_use(reference).await? {
                return Err(AppError::DuplicateReference(reference.to_string()));
            }
        }

        let invoice_id = Uuid::new_v4();
        let mut subtotal = Decimal::ZERO;
        let mut total = Decimal::ZERO;
        let mut rows = Vec::with_capacity(lines.len());
        for line in lines {
            uow.get_item(line.item_id).await?;

            let gross = line.quantity * line.unit_price;
            let line_total = gross - gross * line.discount_percent / Decimal::ONE_HUNDRED;
            subtotal += gross;
            total += line_total;
            rows.push(PurchaseInvoiceLine {
                id: Uuid::new_v4(),
                invoice_id,
                item_id: line.item_id,
                quantity: line.quantity,
                unit_price: line.unit_price,
                discount_percent: line.discount_percent,
                line_total,
            });
        }

        let sequence = uow.next(INVOICE_PREFIX).await?;
        let invoice = PurchaseInvoice {
            id: invoice_id,
            invoice_number: format_invoice_number(INVOICE_PREFIX, issue_date, sequence),
            supplier_name: supplier_name.to_string(),
            reference: reference.map(str::to_string),
            issue_date,
            due_date,
            subtotal,
            discount_total: subtotal - total,
            total,
            status: InvoiceStatus::Pending,
            created_at: chrono::Utc::now(),
        };

        uow.insert_invoice(&invoice, &rows).await?;
        uow.commit().await?;

        Ok(PurchaseInvoiceDetail {
            header: invoice,
            lines: rows,
        })
    }

    pub async fn list_invoices(&self) -> Result<Vec<PurchaseInvoice>, AppError> {
        let mut uow = self.uow.begin().await?;
        uow.list_invoices().await
    }
}
