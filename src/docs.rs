// src/docs.rs

use utoipa::OpenApi;

use crate::handlers;
use crate::models;

#[derive(OpenApi)]
#[openapi(
    paths(
        // --- Inventory ---
        handlers::inventory::create_item,
        handlers::inventory::get_all_items,
        handlers::inventory::add_stock,
        handlers::inventory::get_levels,

        // --- Transfers ---
        handlers::operations::create_transfer,
        handlers::operations::decide_transfer,
        handlers::operations::list_transfers,

        // --- Health Events ---
        handlers::operations::create_health_event,
        handlers::operations::complete_health_event,
        handlers::operations::list_health_events,

        // --- Purchase Invoices ---
        handlers::documents::create_invoice,
        handlers::documents::list_invoices,

        // --- Finance ---
        handlers::finance::get_accounts,
    ),
    components(
        schemas(
            // --- Inventory ---
            models::inventory::StockOwner,
            models::inventory::ItemCategory,
            models::inventory::ItemDetails,
            models::inventory::Item,
            models::inventory::InventoryRecord,
            models::inventory::InventoryLevel,
            models::inventory::StockMovementReason,
            models::inventory::StockMovement,

            // --- Operations ---
            models::operations::RequestStatus,
            models::operations::EventStatus,
            models::operations::TransferRequest,
            models::operations::HealthEvent,

            // --- Documents ---
            models::documents::InvoiceStatus,
            models::documents::PurchaseInvoice,
            models::documents::PurchaseInvoiceLine,
            models::documents::PurchaseInvoiceDetail,

            // --- Finance ---
            models::finance::AccountGroup,
            models::finance::Account,
            models::finance::LedgerEntry,

            // --- Payloads ---
            handlers::inventory::CreateItemPayload,
            handlers::inventory::AddStockPayload,
            handlers::operations::CreateTransferPayload,
            handlers::operations::Decision,
            handlers::operations::DecisionPayload,
            handlers::operations::CreateHealthEventPayload,
            handlers::operations::CompleteHealthEventPayload,
            handlers::documents::InvoiceLinePayload,
            handlers::documents::CreateInvoicePayload,
        )
    ),
    tags(
        (name = "Inventory", description = "Catálogo e estoque por pool"),
        (name = "Transfers", description = "Transferências almoxarifado -> departamento"),
        (name = "Health Events", description = "Eventos de consumo sanitário"),
        (name = "Purchase Invoices", description = "Emissão de notas de compra"),
        (name = "Finance", description = "Plano de contas")
    )
)]
pub struct ApiDoc;
