//! # Dispatcher de Conexiones
//! src/server/dispatcher.rs
//!
//! Socket de escucha y pool fijo de workers. El accept loop nunca atiende
//! requests: solo encola cada conexión para el próximo worker libre.
//!
//! ```text
//!   run() ──▶ loop de recuperación ──▶ accept loop ──▶ WorkerPool ──▶ Pipeline
//!                  ▲                        │
//!                  └── error o pánico ──────┘
//! ```

use super::pipeline::Pipeline;
use super::pool::WorkerPool;
use super::AppState;
use crate::error::ServerError;
use socket2::{Domain, Protocol, Socket, Type};
use std::io::{self, ErrorKind};
use std::net::{SocketAddr, TcpListener};
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tracing::{debug, error, info};

/// Conexiones pendientes que acepta el kernel antes del accept
const BACKLOG: i32 = 128;

/// Pausa antes de reiniciar un accept loop que falló
const RESTART_DELAY: Duration = Duration::from_millis(100);

pub struct Server {
    listener: TcpListener,
    pool: WorkerPool,
    pipeline: Arc<Pipeline>,
}

impl Server {
    /// Abre el socket de escucha y arranca los workers
    pub fn bind(state: Arc<AppState>) -> Result<Self, ServerError> {
        let config = &state.config;
        let address = config.address();
        let addr: SocketAddr = address
            .parse()
            .map_err(|_| ServerError::Address(address.clone()))?;

        let listener = open_listener(addr, config.rec_buff_size, config.reuse_addr, config.accept_timeout())
            .map_err(|source| ServerError::Bind {
                addr: address.clone(),
                source,
            })?;
        let pool = WorkerPool::new(config.workers, "worker").map_err(ServerError::Workers)?;

        info!(addr = %address, workers = pool.size(), "socket de escucha listo");
        Ok(Self {
            listener,
            pool,
            pipeline: Arc::new(Pipeline::new(state)),
        })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Acepta conexiones para siempre
    ///
    /// Si el accept loop termina por un error o por un pánico se registra y
    /// se vuelve a empezar.
    pub fn run(&self) {
        if let Ok(addr) = self.local_addr() {
            info!(addr = %addr, "servidor aceptando conexiones");
        }

        loop {
            match panic::catch_unwind(AssertUnwindSafe(|| self.accept_loop())) {
                Ok(e) => error!(error = %e, "el accept loop falló, reiniciando"),
                Err(_) => error!("pánico en el accept loop, reiniciando"),
            }
            thread::sleep(RESTART_DELAY);
        }
    }

    /// Solo retorna ante un error que no es un timeout
    fn accept_loop(&self) -> io::Error {
        loop {
            match self.listener.accept() {
                Ok((stream, peer)) => {
                    debug!(peer = %peer, queued = self.pool.queued(), "conexión aceptada");
                    let pipeline = Arc::clone(&self.pipeline);
                    self.pool.execute(move || pipeline.handle(stream));
                }
                Err(e) if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) => {
                    debug!("timeout del accept");
                }
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return e,
            }
        }
    }
}

fn open_listener(addr: SocketAddr, recv_buffer: usize, reuse: bool, timeout: Duration) -> io::Result<TcpListener> {
    let socket = Socket::new(Domain::for_address(addr), Type::STREAM, Some(Protocol::TCP))?;
    socket.set_reuse_address(reuse)?;
    socket.set_recv_buffer_size(recv_buffer)?;
    socket.set_read_timeout(Some(timeout))?;
    socket.bind(&addr.into())?;
    socket.listen(BACKLOG)?;
    Ok(socket.into())
}
