//! ServerBuilder for fluent API to build the GraphQL HTTP server

use super::engine::{ExecutionEngine, SchemaEngine};
use super::exposure::{GraphQLController, GraphQLExposure};
use super::status::StatusDecider;
use crate::config::BridgeConfig;
use anyhow::Result;
use async_graphql::dynamic::Schema;
use axum::Router;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

/// Builder for the bridge's HTTP server
///
/// # Example
///
/// ```ignore
/// let schema = SchemaBuilder::new().query(test_field()).build()?;
///
/// ServerBuilder::new()
///     .with_config(BridgeConfig::default().with_env_overrides()?)
///     .with_schema(schema)
///     .serve("127.0.0.1:3000")
///     .await?;
/// ```
pub struct ServerBuilder {
    config: BridgeConfig,
    schema: Option<Schema>,
    engine: Option<Arc<dyn ExecutionEngine>>,
    status_decider: Option<Arc<dyn StatusDecider>>,
    custom_routes: Vec<Router>,
}

impl ServerBuilder {
    /// Create a new ServerBuilder with the default configuration
    pub fn new() -> Self {
        Self {
            config: BridgeConfig::default(),
            schema: None,
            engine: None,
            status_decider: None,
            custom_routes: Vec::new(),
        }
    }

    pub fn with_config(mut self, config: BridgeConfig) -> Self {
        self.config = config;
        self
    }

    /// Execute requests against `schema` with the default [`SchemaEngine`]
    pub fn with_schema(mut self, schema: Schema) -> Self {
        self.schema = Some(schema);
        self
    }

    /// Use a custom execution engine; takes precedence over [`with_schema`](Self::with_schema)
    pub fn with_engine(mut self, engine: impl ExecutionEngine + 'static) -> Self {
        self.engine = Some(Arc::new(engine));
        self
    }

    /// Override the status policy of the configuration
    pub fn with_status_decider(mut self, decider: impl StatusDecider + 'static) -> Self {
        self.status_decider = Some(Arc::new(decider));
        self
    }

    /// Add routes served next to the GraphQL endpoint
    ///
    /// ```ignore
    /// let health = Router::new().route("/health", get(|| async { "ok" }));
    ///
    /// ServerBuilder::new()
    ///     .with_schema(schema)
    ///     .with_custom_routes(health)
    ///     .build()?;
    /// ```
    pub fn with_custom_routes(mut self, routes: Router) -> Self {
        self.custom_routes.push(routes);
        self
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    /// Build the transport-agnostic controller
    pub fn build_controller(&self) -> Result<GraphQLController> {
        self.config.validate()?;

        let engine: Arc<dyn ExecutionEngine> = match (&self.engine, &self.schema) {
            (Some(engine), _) => engine.clone(),
            (None, Some(schema)) => Arc::new(SchemaEngine::new(schema.clone())),
            (None, None) => anyhow::bail!(
                "An execution engine is required. Call .with_schema() or .with_engine()"
            ),
        };

        let decider = self
            .status_decider
            .clone()
            .unwrap_or_else(|| self.config.http_code_decider.decider());

        Ok(GraphQLController::new(engine, decider, self.config.debug))
    }

    /// Build the final router: the GraphQL route, custom routes and request tracing
    pub fn build(mut self) -> Result<Router> {
        let controller = Arc::new(self.build_controller()?);
        let mut router = GraphQLExposure::build_router(controller, &self.config.uri)?;

        for routes in std::mem::take(&mut self.custom_routes) {
            router = router.merge(routes);
        }

        tracing::info!(
            uri = %self.config.uri,
            decider = %self.config.http_code_decider,
            debug = ?self.config.debug,
            "GraphQL endpoint configured"
        );

        Ok(router.layer(TraceLayer::new_for_http()))
    }

    /// Serve the application with graceful shutdown
    ///
    /// Binds `addr`, serves requests and stops on SIGTERM or Ctrl+C.
    pub async fn serve(self, addr: &str) -> Result<()> {
        let app = self.build()?;
        let listener = TcpListener::bind(addr).await?;

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

/// Wait for shutdown signal (SIGTERM or Ctrl+C)
///
/// A handler that cannot be installed is logged and never fires.
async fn shutdown_signal() {
    use tokio::signal;

    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
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
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
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
