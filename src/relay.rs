use std::io;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tokio_rustls::TlsAcceptor;
use tracing::{debug, error, info};

use crate::endpoint::Endpoint;
use crate::session;

/// Tells the accept loop whether a failed accept means "stop" or "broken".
///
/// `request` sets the flag under the lock before waking the loop, so by the
/// time the loop sees its accept interrupted the flag already reads `true`.
struct ShutdownFlag {
    requested: Mutex<bool>,
    accept_wakeup: Notify,
}

impl ShutdownFlag {
    fn new() -> Self {
        Self {
            requested: Mutex::new(false),
            accept_wakeup: Notify::new(),
        }
    }

    fn request(&self) {
        *self.requested.lock().unwrap() = true;
        self.accept_wakeup.notify_one();
    }

    fn is_requested(&self) -> bool {
        *self.requested.lock().unwrap()
    }
}

/// A listening relay. Accepts front connections, optionally terminates TLS on
/// them, and gives each one a relay session to a fresh backend connection.
pub struct Relay {
    local_addr: SocketAddr,
    shutdown: Arc<ShutdownFlag>,
    accept_task: JoinHandle<Result<()>>,
}

impl Relay {
    /// Binds `listen_addr` and starts accepting in a background task.
    pub async fn bind(
        listen_addr: &str,
        backend_addr: &str,
        tls: Option<TlsAcceptor>,
    ) -> Result<Self> {
        let listener = TcpListener::bind(listen_addr)
            .await
            .with_context(|| format!("Failed to bind to address {listen_addr}"))?;
        let local_addr = listener
            .local_addr()
            .context("Failed to get listener local address")?;

        let shutdown = Arc::new(ShutdownFlag::new());
        let accept_task = tokio::spawn(accept_loop(
            listener,
            tls,
            backend_addr.to_string(),
            Arc::clone(&shutdown),
        ));

        Ok(Self {
            local_addr,
            shutdown,
            accept_task,
        })
    }

    /// The bound listening address, useful when binding port 0.
    #[must_use]
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Stops accepting new connections. Sessions already relaying are left
    /// alone; only the listener goes away.
    pub fn shutdown(&self) {
        self.shutdown.request();
    }

    /// Waits for the accept loop to finish: `Ok` after a requested shutdown,
    /// `Err` if accepting failed for any other reason.
    pub async fn join(&mut self) -> Result<()> {
        (&mut self.accept_task)
            .await
            .context("Accept loop task failed")?
    }
}

async fn accept_loop(
    listener: TcpListener,
    tls: Option<TlsAcceptor>,
    backend_addr: String,
    shutdown: Arc<ShutdownFlag>,
) -> Result<()> {
    loop {
        let accepted = tokio::select! {
            accepted = listener.accept() => accepted,
            // The wakeup stands in for closing the listening socket, which
            // tokio cannot do out from under a pending accept. The listener
            // itself is dropped when this loop returns.
            () = shutdown.accept_wakeup.notified() => {
                Err(io::Error::new(io::ErrorKind::Interrupted, "listener closed"))
            }
        };

        let (stream, client_addr) = match accepted {
            Ok(connection) => connection,
            Err(e) if shutdown.is_requested() => {
                debug!(error = %e, "Accept loop stopped by shutdown");
                return Ok(());
            }
            Err(e) => {
                error!(error = %e, "Failed to accept connection");
                return Err(e).context("Failed to accept connection");
            }
        };

        let tls = tls.clone();
        let backend_addr = backend_addr.clone();
        tokio::spawn(async move {
            if let Err(e) = handle_connection(stream, client_addr, tls, &backend_addr).await {
                error!(client_addr = %client_addr, error = %e, "Connection failed");
            }
        });
    }
}

#[tracing::instrument(skip_all, fields(client_addr = %client_addr))]
async fn handle_connection(
    stream: TcpStream,
    client_addr: SocketAddr,
    tls: Option<TlsAcceptor>,
    backend_addr: &str,
) -> Result<()> {
    let front = match tls {
        Some(acceptor) => {
            let tls_stream = acceptor
                .accept(stream)
                .await
                .context("Failed to perform TLS handshake")?;
            Endpoint::Tls(Box::new(tls_stream))
        }
        None => Endpoint::Plain(stream),
    };

    debug!(backend_addr = %backend_addr, "Attempting to connect to backend");
    let back = TcpStream::connect(backend_addr)
        .await
        .with_context(|| format!("Failed to connect to backend {backend_addr}"))?;
    info!(backend_addr = %backend_addr, "Connected to backend");

    session::run(front, back).await
}
