use axum::{
    Json, Router,
    http::StatusCode,
    routing::{get, post},
};
use cutlist_optimizer::cutlist::{self, CutlistPlan};
use cutlist_optimizer::packer::PackOptions;
use cutlist_optimizer::types::{PartSpec, StockSheetSpec};
use serde::{Deserialize, Serialize};
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;

#[derive(Deserialize, Serialize)]
struct LayoutRequest {
    parts: Vec<PartSpec>,
    sheets: Vec<StockSheetSpec>,
    #[serde(default)]
    options: PackOptions,
}

async fn layout(
    Json(req): Json<LayoutRequest>,
) -> Result<Json<CutlistPlan>, (StatusCode, String)> {
    tracing::info!(
        body = serde_json::to_string(&req).unwrap_or_default(),
        "POST /layout"
    );

    if req.sheets.is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            "at least one stock sheet class is required".to_string(),
        ));
    }
    for sheet in &req.sheets {
        if sheet.length_mm == 0 || sheet.width_mm == 0 {
            return Err((
                StatusCode::BAD_REQUEST,
                format!("stock '{}' dimensions must be non-zero", sheet.id),
            ));
        }
    }

    let plan = cutlist::plan(&req.parts, &req.sheets, req.options);
    Ok(Json(plan))
}

#[tokio::main]
async fn main() {
    // Empty DSN disables reporting, so local runs work without config
    let _sentry = sentry::init((
        std::env::var("SENTRY_DSN").unwrap_or_default(),
        sentry::ClientOptions {
            release: sentry::release_name!(),
            ..Default::default()
        },
    ));

    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open("development.log")
        .expect("failed to open development.log");

    tracing_subscriber::fmt()
        .with_writer(log_file)
        .with_target(false)
        .with_ansi(false)
        .with_max_level(Level::INFO)
        .init();

    let port = std::env::var("PORT").unwrap_or_else(|_| "3001".to_string());
    let addr = format!("0.0.0.0:{port}");

    let app = Router::new()
        .route("/up", get(|| async { "ok" }))
        .route("/layout", post(layout))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        );

    let listener = tokio::net::TcpListener::bind(&addr).await.unwrap();
    eprintln!("Listening on {addr}");
    axum::serve(listener, app).await.unwrap();
}
