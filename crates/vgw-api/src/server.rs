//! HTTP server lifecycle.

use std::future::Future;
use std::sync::Arc;

use axum::Router;
use tokio::net::TcpListener;
use tracing::info;

use crate::store::StoreHandle;

/// Serve until `signal` resolves and in-flight requests have drained, then
/// close the store.
pub async fn serve<F>(
    listener: TcpListener,
    app: Router,
    store: Arc<StoreHandle>,
    signal: F,
) -> std::io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    axum::serve(listener, app)
        .with_graceful_shutdown(signal)
        .await?;

    info!("Server drained, closing store");
    store.shutdown();
    Ok(())
}
