//! Static site server.
//!
//! Serves the site directory as-is, with caching disabled on every response so
//! freshly collected JSON shows up on the next page load. `/tables/...` renders
//! any JSON record array in the data tree as a sortable HTML table.

use anyhow::Context;
use axum::extract::{Path as UrlPath, Query, State};
use axum::http::{HeaderValue, StatusCode, header};
use axum::response::{Html, IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use fbcw_api::table::{RenderOptions, SortOrder, Table, escape};
use log::{debug, error, info};
use serde::Deserialize;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::services::ServeDir;
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;

#[derive(Clone)]
struct SiteState {
    root: Arc<PathBuf>,
}

#[derive(Debug, Default, Deserialize)]
struct TableQuery {
    #[serde(default)]
    pointer: String,
    sort: Option<String>,
    dir: Option<String>,
}

pub fn router(site_dir: PathBuf) -> Router {
    let files = ServeDir::new(&site_dir);
    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/tables/*path", get(render_table))
        .fallback_service(files)
        .with_state(SiteState { root: Arc::new(site_dir) })
        .layer(SetResponseHeaderLayer::overriding(
            header::CACHE_CONTROL,
            HeaderValue::from_static("no-cache, no-store, must-revalidate"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::PRAGMA,
            HeaderValue::from_static("no-cache"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::EXPIRES,
            HeaderValue::from_static("0"),
        ))
        .layer(TraceLayer::new_for_http())
}

/// Serve until Ctrl-C.
pub async fn serve(site_dir: PathBuf, bind: &str) -> anyhow::Result<()> {
    let listener = TcpListener::bind(bind)
        .await
        .with_context(|| format!("binding {bind}"))?;
    let addr = listener.local_addr()?;

    info!("Serving {} on {addr}", site_dir.display());
    println!("Server running at http://{addr}/");
    println!("Serving Fantasy Baseball Civil War...");

    axum::serve(listener, router(site_dir))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    println!("\nServer stopped.");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Could not listen for Ctrl-C: {e}");
        std::future::pending::<()>().await;
    }
}

async fn render_table(
    State(state): State<SiteState>,
    UrlPath(path): UrlPath<String>,
    Query(query): Query<TableQuery>,
) -> Response {
    let Some(file) = resolve_under(&state.root, &path) else {
        return not_found();
    };
    let raw = match tokio::fs::read(&file).await {
        Ok(raw) => raw,
        Err(e) => {
            debug!("table source {} unreadable: {e}", file.display());
            return not_found();
        }
    };

    let document: serde_json::Value = match serde_json::from_slice(&raw) {
        Ok(doc) => doc,
        Err(e) => return unprocessable(format!("{path} is not valid JSON: {e}")),
    };
    let mut table = match Table::from_document(&document, &query.pointer) {
        Ok(table) => table,
        Err(e) => return unprocessable(format!("{path}: {e}")),
    };

    let order = query
        .dir
        .as_deref()
        .and_then(SortOrder::parse)
        .unwrap_or_default();
    let sorted_by = query.sort.as_deref().map(|column| {
        table.sort_by(column, order);
        (column, order)
    });

    let base_href = format!("/tables/{path}");
    let body = table.to_html(&RenderOptions {
        base_href: &base_href,
        pointer: &query.pointer,
        sorted_by,
    });
    Html(page(&path, table.len(), &body)).into_response()
}

fn page(title: &str, rows: usize, table: &str) -> String {
    format!(
        "<!DOCTYPE html>\n<html>\n<head><meta charset=\"utf-8\"><title>{title}</title></head>\n<body>\n<h1>{title}</h1>\n<p>{rows} rows</p>\n{table}</body>\n</html>\n",
        title = escape(title),
    )
}

/// Join a request path onto `root`, refusing anything that could climb out.
fn resolve_under(root: &Path, requested: &str) -> Option<PathBuf> {
    let relative = Path::new(requested.trim_start_matches('/'));
    let safe = relative
        .components()
        .all(|c| matches!(c, Component::Normal(_) | Component::CurDir));
    (safe && !requested.is_empty()).then(|| root.join(relative))
}

fn not_found() -> Response {
    (StatusCode::NOT_FOUND, "Not found").into_response()
}

fn unprocessable(message: String) -> Response {
    (StatusCode::UNPROCESSABLE_ENTITY, message).into_response()
}
