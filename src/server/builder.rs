//! ServerBuilder for fluent API to build HTTP servers

use anyhow::{Context, Result};
use axum::routing::get;
use axum::{Json, Router};
use serde_json::{Value, json};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use super::registry::{ResourceRegistry, RouteProvider};
use crate::config::Settings;
use crate::core::entity::Entity;
use crate::viewsets::ViewSet;

/// Builder for creating HTTP servers from registered viewsets
///
/// Resource routes are nested under `settings.api_prefix`; health routes and
/// custom routes stay at the root.
///
/// # Example
///
/// ```ignore
/// let app = ServerBuilder::new()
///     .with_settings(settings)
///     .register(user_viewset(store, settings.clone())?)
///     .build()?;
/// ```
pub struct ServerBuilder {
    settings: Arc<Settings>,
    registry: ResourceRegistry,
    custom_routes: Vec<Router>,
}

impl ServerBuilder {
    /// Create a new ServerBuilder with default settings
    pub fn new() -> Self {
        Self {
            settings: Arc::new(Settings::default()),
            registry: ResourceRegistry::new(),
            custom_routes: Vec::new(),
        }
    }

    pub fn with_settings(mut self, settings: Arc<Settings>) -> Self {
        self.settings = settings;
        self
    }

    /// Expose a viewset under `/{api_prefix}/{resource}`
    pub fn register<T: Entity>(mut self, viewset: ViewSet<T>) -> Self {
        self.registry.register(Box::new(Arc::new(viewset)));
        self
    }

    /// Expose any other route provider under the API prefix
    pub fn register_provider(mut self, provider: impl RouteProvider + 'static) -> Self {
        self.registry.register(Box::new(provider));
        self
    }

    /// Add routes that don't fit the viewset pattern, such as token
    /// endpoints or webhooks
    pub fn with_custom_routes(mut self, routes: Router) -> Self {
        self.custom_routes.push(routes);
        self
    }

    pub fn settings(&self) -> &Arc<Settings> {
        &self.settings
    }

    /// Build the final router
    pub fn build(self) -> Result<Router> {
        self.settings
            .validate()
            .context("refusing to build server with invalid settings")?;

        tracing::info!(
            prefix = %self.settings.api_prefix,
            resources = ?self.registry.resources(),
            "building router"
        );

        let mut app = health_routes().nest(&self.settings.api_prefix, self.registry.build_routes());
        for custom_router in self.custom_routes {
            app = app.merge(custom_router);
        }

        let app = app.layer(TraceLayer::new_for_http());
        Ok(if self.settings.cors_allow_all {
            app.layer(CorsLayer::permissive())
        } else {
            app
        })
    }

    /// Serve the application on `settings.bind_address` with graceful shutdown
    ///
    /// Handles SIGTERM and SIGINT (Ctrl+C).
    pub async fn serve(self) -> Result<()> {
        let addr = self.settings.socket_addr()?;
        let app = self.build()?;
        let listener = TcpListener::bind(addr)
            .await
            .with_context(|| format!("failed to bind {}", addr))?;

        tracing::info!("Server listening on {}", addr);

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        tracing::info!("Server shutdown complete");
        Ok(())
    }
}

impl Default for ServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

fn health_routes() -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/healthz", get(health_check))
}

async fn health_check() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "service": env!("CARGO_PKG_NAME")
    }))
}

/// Wait for shutdown signal (SIGTERM or Ctrl+C)
async fn shutdown_signal() {
    use tokio::signal;

    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!("failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C signal, initiating graceful shutdown...");
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM signal, initiating graceful shutdown...");
        },
    }
}
