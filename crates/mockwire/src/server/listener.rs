//! TCP accept loop.

use super::dispatcher::RequestDispatcher;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use std::net::SocketAddr;
use std::sync::Arc;
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to read local address: {0}")]
    LocalAddr(#[source] std::io::Error),
}

/// A bound listener serving requests through a [`RequestDispatcher`].
pub struct MockServer {
    listener: TcpListener,
    local_addr: SocketAddr,
    dispatcher: Arc<RequestDispatcher>,
}

impl MockServer {
    pub async fn bind(
        addr: SocketAddr,
        dispatcher: Arc<RequestDispatcher>,
    ) -> Result<Self, ServerError> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| ServerError::Bind { addr, source })?;
        let local_addr = listener.local_addr().map_err(ServerError::LocalAddr)?;
        info!("Mock server bound to {}", local_addr);
        Ok(Self {
            listener,
            local_addr,
            dispatcher,
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Accept connections until `shutdown` fires. Connections already
    /// accepted keep running on their own tasks.
    pub async fn run(self, mut shutdown: broadcast::Receiver<()>) {
        let addr = self.local_addr;
        loop {
            tokio::select! {
                result = self.listener.accept() => {
                    match result {
                        Ok((stream, peer)) => {
                            let dispatcher = Arc::clone(&self.dispatcher);
                            tokio::spawn(async move {
                                let io = TokioIo::new(stream);
                                let service = service_fn(move |req| {
                                    Arc::clone(&dispatcher).serve(req)
                                });
                                if let Err(e) = http1::Builder::new()
                                    .serve_connection(io, service)
                                    .await
                                {
                                    debug!("Connection from {} closed: {}", peer, e);
                                }
                            });
                        }
                        Err(e) => {
                            error!("Accept error on {}: {}", addr, e);
                        }
                    }
                }
                _ = shutdown.recv() => {
                    info!("Mock server on {} shutting down", addr);
                    break;
                }
            }
        }
    }

    /// Run the accept loop on a background task.
    pub fn spawn(self) -> ServerHandle {
        let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
        let local_addr = self.local_addr;
        let task = tokio::spawn(self.run(shutdown_rx));
        ServerHandle {
            local_addr,
            shutdown_tx,
            task,
        }
    }
}

/// Handle to a server started with [`MockServer::spawn`].
pub struct ServerHandle {
    local_addr: SocketAddr,
    shutdown_tx: broadcast::Sender<()>,
    task: JoinHandle<()>,
}

impl ServerHandle {
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn base_url(&self) -> String {
        format!("http://{}", self.local_addr)
    }

    /// Stop accepting connections and wait for the accept loop to exit.
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(());
        if let Err(e) = self.task.await {
            error!("Mock server task failed: {}", e);
        }
    }
}
