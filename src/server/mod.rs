//! HTTP surface for the editor.
//!
//! | Route     | Method | Purpose                                   |
//! |-----------|--------|-------------------------------------------|
//! | `/`       | GET    | Embedded editor page                      |
//! | `/lock`   | POST   | Acquire or refresh a lock (`?file=`)      |
//! | `/unlock` | POST   | Release a lock (`?file=`)                 |
//! | `/save`   | POST   | Run the save pipeline on the request body |
//! | `/index`  | GET    | Read `index.md`                           |
//! | `/open`   | GET    | Read the most recently modified document  |
//! | `/new`    | POST   | Create `untitled.new`                     |

mod handlers;
mod response;

pub use handlers::{FILENAME_HEADER, LOCK_HEADER};

use crate::config::Config;
use crate::error::Result;
use crate::export::{Converter, Exporter, copy_includes};
use crate::locks::LockRegistry;
use crate::save::SavePipeline;
use crate::workspace::Workspace;
use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use std::path::Path;
use std::sync::Arc;
use tokio::net::TcpListener;

/// Largest request body accepted by `/save`.
pub const MAX_DOCUMENT_BYTES: usize = 32 * 1024 * 1024;

/// State shared by every handler.
#[derive(Debug, Clone)]
pub struct AppState {
    pipeline: Arc<SavePipeline>,
}

impl AppState {
    pub fn new(pipeline: SavePipeline) -> Self {
        Self {
            pipeline: Arc::new(pipeline),
        }
    }

    /// Prepare a workspace under `root` for serving.
    ///
    /// Resolves the directory layout, discovers the converter when export is
    /// enabled, and copies `_includes/` into the output directory. Include
    /// copy failures are logged and do not prevent startup.
    pub fn from_config(root: &Path, config: &Config) -> Result<Self> {
        let workspace = Workspace::resolve(root, config)?;
        let locks = Arc::new(LockRegistry::new(config.lock_ttl()));

        let exporter = if config.export {
            match Converter::discover(&config.converter, config.converter_timeout()) {
                Some(converter) => {
                    tracing::info!(
                        converter = %converter.program().display(),
                        output = %workspace.output_dir.display(),
                        "HTML export enabled"
                    );
                    Some(Exporter::new(converter, workspace.clone()))
                }
                None => {
                    tracing::info!(
                        converter = %config.converter,
                        "converter not found; HTML export disabled"
                    );
                    None
                }
            }
        } else {
            tracing::info!("HTML export disabled");
            None
        };

        match copy_includes(&workspace.includes_dir, &workspace.output_dir) {
            Ok(0) => {}
            Ok(copied) => tracing::debug!(copied, "copied include files"),
            Err(e) => tracing::warn!(error = %e, "failed to copy include files"),
        }

        tracing::info!(root = %workspace.root.display(), "workspace ready");
        Ok(Self::new(SavePipeline::new(workspace, locks, exporter)))
    }

    pub fn workspace(&self) -> &Workspace {
        self.pipeline.workspace()
    }

    pub fn locks(&self) -> &LockRegistry {
        self.pipeline.locks()
    }
}

/// Build the application router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::editor_page))
        .route("/lock", post(handlers::lock))
        .route("/unlock", post(handlers::unlock))
        .route("/save", post(handlers::save))
        .route("/index", get(handlers::index))
        .route("/open", get(handlers::open))
        .route("/new", post(handlers::new_document))
        .layer(DefaultBodyLimit::max(MAX_DOCUMENT_BYTES))
        .with_state(state)
}

/// Serve until Ctrl-C.
pub async fn serve(listener: TcpListener, state: AppState) -> std::io::Result<()> {
    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutting down");
}
