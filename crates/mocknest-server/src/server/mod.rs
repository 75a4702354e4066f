//! HTTP server hosting the mock execution engine.

pub mod handler;
mod network;
#[cfg(test)]
mod tests;

use crate::config::Config;
use crate::request_log::RequestLogWriter;
use crate::store::MockStore;
use anyhow::Result;
use handler::{handle_request, ExecutionContext};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{error, info};

pub struct ExecutionServer {
    config: Config,
    ctx: Arc<ExecutionContext>,
}

impl ExecutionServer {
    pub fn new(config: Config, store: Arc<dyn MockStore>) -> Self {
        let log_writer = RequestLogWriter::spawn(store.clone(), config.request_log.queue_capacity);
        let ctx = Arc::new(ExecutionContext { store, log_writer });
        Self { config, ctx }
    }

    pub async fn run(self) -> Result<()> {
        let addr: SocketAddr =
            format!("{}:{}", self.config.listen.host, self.config.listen.port).parse()?;
        let listener = network::create_reusable_listener(addr)?;
        info!("Mock execution server listening on http://{addr}");

        loop {
            let (stream, client_addr) = listener.accept().await?;
            let ctx = self.ctx.clone();

            tokio::spawn(async move {
                let io = TokioIo::new(stream);
                let service =
                    service_fn(move |req| handle_request(ctx.clone(), req, client_addr));

                if let Err(err) = http1::Builder::new().serve_connection(io, service).await {
                    error!("Error serving connection from {client_addr}: {err}");
                }
            });
        }
    }
}
