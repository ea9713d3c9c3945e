// Contract Ledger - Web Server
// REST API with Axum over the in-memory portfolio

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard};
use tower_http::cors::CorsLayer;
use contract_ledger::{
    item_balances, project, tabular, Autosave, ClientTotals, DateFilter, Portfolio,
    PortfolioTotals, SaveState, Settings, SnapshotStore, SqliteStore,
};

/// Shared application state
#[derive(Clone)]
struct AppState {
    portfolio: Arc<Mutex<Portfolio>>,
    store: Arc<Mutex<SqliteStore>>,
    autosave: Arc<Mutex<Autosave>>,
    record_id: Arc<String>,
}

/// A poisoned lock still holds a usable snapshot
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// API Response wrapper
#[derive(Serialize)]
struct ApiResponse<T> {
    success: bool,
    data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl<T: Serialize> ApiResponse<T> {
    fn ok(data: T) -> Response {
        (
            StatusCode::OK,
            Json(Self {
                success: true,
                data: Some(data),
                error: None,
            }),
        )
            .into_response()
    }
}

fn error_response(status: StatusCode, message: String) -> Response {
    (
        status,
        Json(ApiResponse::<()> {
            success: false,
            data: None,
            error: Some(message),
        }),
    )
        .into_response()
}

/// `?year=2024&month=5`; anything missing or malformed means "all"
#[derive(Debug, Default, Deserialize)]
struct PeriodQuery {
    year: Option<String>,
    month: Option<String>,
}

impl PeriodQuery {
    fn filter(&self) -> DateFilter {
        DateFilter::parse(
            self.year.as_deref().unwrap_or("all"),
            self.month.as_deref().unwrap_or("all"),
        )
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct HealthResponse {
    status: &'static str,
    save_state: SaveState,
    #[serde(skip_serializing_if = "Option::is_none")]
    last_save_error: Option<String>,
}

#[derive(Serialize)]
struct TotalsResponse {
    portfolio: PortfolioTotals,
    clients: Vec<ClientTotals>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PaidResponse {
    invoice_id: String,
    is_paid: bool,
}

// ============================================================================
// API Handlers
// ============================================================================

/// GET /api/health - Health check plus autosave state
async fn health_check(State(state): State<AppState>) -> Response {
    let autosave = lock(&state.autosave);
    ApiResponse::ok(HealthResponse {
        status: "OK",
        save_state: autosave.state(),
        last_save_error: autosave.last_error().map(str::to_string),
    })
}

/// GET /api/dashboard - Filtered contracts, commitments and invoices
async fn get_dashboard(State(state): State<AppState>, Query(period): Query<PeriodQuery>) -> Response {
    let portfolio = lock(&state.portfolio);
    let mut dashboard = project(&portfolio.clients, &period.filter());
    dashboard.sort_newest_first();
    ApiResponse::ok(dashboard)
}

/// GET /api/totals - Portfolio and per-client totals
async fn get_totals(State(state): State<AppState>, Query(period): Query<PeriodQuery>) -> Response {
    let portfolio = lock(&state.portfolio);
    let dashboard = project(&portfolio.clients, &period.filter());
    ApiResponse::ok(TotalsResponse {
        portfolio: dashboard.totals(),
        clients: dashboard.client_totals(),
    })
}

/// GET /api/years - Years for the filter control
async fn get_years(State(state): State<AppState>) -> Response {
    let portfolio = lock(&state.portfolio);
    ApiResponse::ok(contract_ledger::available_years(&portfolio.clients))
}

/// GET /api/contracts/:id/items - Item table with balances and values
async fn get_contract_items(State(state): State<AppState>, Path(contract_id): Path<String>) -> Response {
    let portfolio = lock(&state.portfolio);
    match portfolio.find_contract(&contract_id) {
        Some((_, contract)) => ApiResponse::ok(tabular::items_table(contract)),
        None => error_response(StatusCode::NOT_FOUND, format!("contract not found: {}", contract_id)),
    }
}

/// GET /api/contracts/:id/balances - Quantity balances per item
async fn get_contract_balances(State(state): State<AppState>, Path(contract_id): Path<String>) -> Response {
    let portfolio = lock(&state.portfolio);
    match portfolio.find_contract(&contract_id) {
        Some((_, contract)) => ApiResponse::ok(item_balances(contract)),
        None => error_response(StatusCode::NOT_FOUND, format!("contract not found: {}", contract_id)),
    }
}

/// POST /api/contracts/:contract_id/invoices/:invoice_id/toggle-paid
async fn toggle_paid(
    State(state): State<AppState>,
    Path((contract_id, invoice_id)): Path<(String, String)>,
) -> Response {
    let result = lock(&state.portfolio).toggle_invoice_paid(&contract_id, &invoice_id);

    match result {
        Ok(is_paid) => {
            tracing::info!(%contract_id, %invoice_id, is_paid, "invoice payment toggled");
            schedule_save(&state);
            ApiResponse::ok(PaidResponse { invoice_id, is_paid })
        }
        Err(e) => error_response(StatusCode::NOT_FOUND, e.to_string()),
    }
}

/// Debounced snapshot write: only the latest edit in the window saves
fn schedule_save(state: &AppState) {
    let (generation, delay) = {
        let mut autosave = lock(&state.autosave);
        (autosave.mark_dirty(), autosave.delay())
    };
    let state = state.clone();

    tokio::spawn(async move {
        tokio::time::sleep(delay).await;

        if !lock(&state.autosave).begin(generation) {
            return; // Superseded by a newer edit
        }

        let snapshot = lock(&state.portfolio).clone();
        let result = lock(&state.store)
            .save(&state.record_id, &snapshot)
            .map(|_| ())
            .map_err(|e| format!("{:#}", e));

        lock(&state.autosave).finish(generation, result);
    });
}

// ============================================================================
// Main Server
// ============================================================================

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config_path = std::env::args()
        .skip_while(|a| a != "--config")
        .nth(1)
        .map(PathBuf::from);
    let settings = Settings::load(config_path.as_deref())?;
    settings.init_tracing();

    println!("🌐 Contract Ledger - Web Server");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    let store = SqliteStore::open(&settings.database_path)?;
    println!("✓ Database opened: {:?}", settings.database_path);

    let portfolio = match store.load(&settings.record_id)? {
        Some(portfolio) => portfolio,
        None => {
            eprintln!("❌ No snapshot '{}' yet, starting empty", settings.record_id);
            eprintln!("   Run: contract-ledger import <portfolio.json>");
            Portfolio::default()
        }
    };
    println!(
        "✓ Loaded {} clients, {} contracts",
        portfolio.clients.len(),
        portfolio.contract_count()
    );

    let state = AppState {
        portfolio: Arc::new(Mutex::new(portfolio)),
        store: Arc::new(Mutex::new(store)),
        autosave: Arc::new(Mutex::new(Autosave::new(settings.autosave_delay()))),
        record_id: Arc::new(settings.record_id.clone()),
    };

    let api_routes = Router::new()
        .route("/health", get(health_check))
        .route("/dashboard", get(get_dashboard))
        .route("/totals", get(get_totals))
        .route("/years", get(get_years))
        .route("/contracts/:id/items", get(get_contract_items))
        .route("/contracts/:id/balances", get(get_contract_balances))
        .route(
            "/contracts/:contract_id/invoices/:invoice_id/toggle-paid",
            post(toggle_paid),
        )
        .with_state(state);

    let app = Router::new()
        .nest("/api", api_routes)
        .layer(CorsLayer::permissive());

    let listener = tokio::net::TcpListener::bind(&settings.server_addr).await?;

    println!("\n🚀 Server running on http://{}", settings.server_addr);
    println!("   API: http://{}/api/dashboard", settings.server_addr);
    println!("\n   Press Ctrl+C to stop\n");

    axum::serve(listener, app).await?;
    Ok(())
}
