//! Web server exposing the fusion endpoint.
//!
//! `GET /?lat=..&lon=..&size=..` answers with `{"yelp": .., "osm": ..}`.

mod handlers;
mod routes;

pub use routes::create_router;

use std::net::SocketAddr;
use std::sync::Arc;

use crate::fusion::Fuser;

/// Shared state for the web server.
#[derive(Clone)]
pub struct AppState {
    pub fuser: Arc<Fuser>,
}

impl AppState {
    pub fn new(fuser: Fuser) -> Self {
        Self {
            fuser: Arc::new(fuser),
        }
    }
}

/// Start the web server.
pub async fn serve(state: AppState, host: &str, port: u16) -> anyhow::Result<()> {
    let app = create_router(state);

    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;
    tracing::info!("Starting server at http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
