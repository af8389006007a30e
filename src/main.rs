//src/main.rs

use axum::{
    routing::{get, post},
    Router,
};
use tokio::net::TcpListener;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

mod common;
mod config;
mod db;
mod docs;
mod handlers;
mod models;
mod services;

use crate::config::AppState;
use crate::docs::ApiDoc;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt().with_target(false).compact().init();

    // .expect() é bom aqui: se a configuração falhar, a aplicação não deve iniciar.
    let app_state = AppState::new()
        .await
        .expect("Falha ao inicializar o estado da aplicação.");

    sqlx::migrate!()
        .run(&app_state.db_pool)
        .await
        .expect("Falha ao rodar as migrações do banco de dados.");

    tracing::info!("✅ Migrações do banco de dados executadas com sucesso!");

    let inventory_routes = Router::new()
        .route(
            "/items",
            post(handlers::inventory::create_item).get(handlers::inventory::get_all_items),
        )
        .route("/stock-entry", post(handlers::inventory::add_stock))
        .route("/levels", get(handlers::inventory::get_levels));

    let transfer_routes = Router::new()
        .route(
            "/",
            post(handlers::operations::create_transfer).get(handlers::operations::list_transfers),
        )
        .route(
            "/{request_id}/decide",
            post(handlers::operations::decide_transfer),
        );

    let health_event_routes = Router::new()
        .route(
            "/",
            post(handlers::operations::create_health_event)
                .get(handlers::operations::list_health_events),
        )
        .route(
            "/{event_id}/complete",
            post(handlers::operations::complete_health_event),
        );

    let invoice_routes = Router::new().route(
        "/",
        post(handlers::documents::create_invoice).get(handlers::documents::list_invoices),
    );

    // Combina tudo no router principal
    let app = Router::new()
        .route("/api/health", get(|| async { "OK" }))
        .route("/api/accounts", get(handlers::finance::get_accounts))
        .nest("/api/inventory", inventory_routes)
        .nest("/api/transfers", transfer_routes)
        .nest("/api/health-events", health_event_routes)
        .nest("/api/purchase-invoices", invoice_routes)
        .merge(SwaggerUi::new("/docs").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .with_state(app_state);

    // Inicia o servidor
    let addr = "0.0.0.0:3000";
    let listener = TcpListener::bind(addr)
        .await
        .expect("Falha ao iniciar o listener TCP");
    tracing::info!("🚀 Servidor escutando em {}", listener.local_addr().unwrap());
    axum::serve(listener, app)
        .await
        .expect("Erro no servidor Axum");
}
