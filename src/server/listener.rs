use std::future::Future;
use std::io;
use std::net::{SocketAddr, TcpListener, TcpStream, ToSocketAddrs};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_channel::{Receiver, Sender};
use async_global_executor::Task;
use async_io::{Async, Timer};
use futures_lite::future;
use log::{debug, info, trace, warn};

use super::{accept_buffered_with_opts, accept_with_opts, HandlerError, ResponseWriter, ServerOptions};
use crate::{Request, Result};

/// An accepted TCP connection, shared between the request reader and the
/// response writer.
pub type Connection = async_dup::Arc<Async<TcpStream>>;

/// A TCP listener serving one request per connection.
///
/// The accept loop and every connection run as tasks on the global executor.
/// [`close`](Self::close) stops accepting; connections already being served
/// run to completion. Dropping the server without closing it cancels the
/// accept loop as well.
#[derive(Debug)]
pub struct Server {
    local_addr: SocketAddr,
    closed: Arc<AtomicBool>,
    stop: Sender<()>,
    task: Option<Task<()>>,
}

impl Server {
    /// Bind `addr` and start serving with `handler`.
    ///
    /// ```no_run
    /// use wire_h1::server::{default_headers, Server, StatusCode};
    ///
    /// # fn main() -> std::io::Result<()> {
    /// let server = Server::serve("127.0.0.1:42069", |mut res, _req| async move {
    ///     let body = b"Hello World!\n";
    ///     let _ = res.write_status_line(StatusCode::Ok).await;
    ///     let _ = res.write_headers(&default_headers(body.len())).await;
    ///     let _ = res.write_body(body).await;
    /// })?;
    /// println!("listening on {}", server.local_addr());
    /// # Ok(()) }
    /// ```
    pub fn serve<A, F, Fut>(addr: A, handler: F) -> io::Result<Self>
    where
        A: ToSocketAddrs,
        F: Fn(ResponseWriter<Connection>, Request) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        Self::serve_with_opts(addr, handler, ServerOptions::default())
    }

    /// Bind `addr` and start serving with `handler` and custom options.
    pub fn serve_with_opts<A, F, Fut>(addr: A, handler: F, opts: ServerOptions) -> io::Result<Self>
    where
        A: ToSocketAddrs,
        F: Fn(ResponseWriter<Connection>, Request) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let handler = Arc::new(handler);
        let conn_opts = opts.clone();
        Self::listen(addr, opts, move |conn| {
            let handler = handler.clone();
            let opts = conn_opts.clone();
            async move { accept_with_opts(conn, |res, req| handler(res, req), opts).await }
        })
    }

    /// Bind `addr` and start serving with a buffered `endpoint`.
    ///
    /// See [`accept_buffered`](super::accept_buffered).
    pub fn serve_buffered<A, F, Fut>(addr: A, endpoint: F, opts: ServerOptions) -> io::Result<Self>
    where
        A: ToSocketAddrs,
        F: Fn(Request) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = std::result::Result<Vec<u8>, HandlerError>> + Send + 'static,
    {
        let endpoint = Arc::new(endpoint);
        let conn_opts = opts.clone();
        Self::listen(addr, opts, move |conn| {
            let endpoint = endpoint.clone();
            let opts = conn_opts.clone();
            async move { accept_buffered_with_opts(conn, |req| endpoint(req), opts).await }
        })
    }

    /// The address the listener is bound to.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Whether [`close`](Self::close) has been called.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Stop accepting connections and close the listener.
    ///
    /// Returns once the accept loop has exited. Calling it again is a no-op.
    pub async fn close(&mut self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        self.stop.close();
        if let Some(task) = self.task.take() {
            task.await;
        }
    }

    fn listen<A, C, CFut>(addr: A, opts: ServerOptions, on_conn: C) -> io::Result<Self>
    where
        A: ToSocketAddrs,
        C: Fn(Connection) -> CFut + Send + Sync + 'static,
        CFut: Future<Output = Result<()>> + Send + 'static,
    {
        let listener = Async::new(TcpListener::bind(addr)?)?;
        let local_addr = listener.get_ref().local_addr()?;
        info!("listening on {}", local_addr);

        let closed = Arc::new(AtomicBool::new(false));
        let (stop, stopped) = async_channel::bounded(1);
        let task = async_global_executor::spawn(accept_loop(
            listener,
            closed.clone(),
            stopped,
            opts,
            on_conn,
        ));

        Ok(Self {
            local_addr,
            closed,
            stop,
            task: Some(task),
        })
    }
}

async fn accept_loop<C, CFut>(
    listener: Async<TcpListener>,
    closed: Arc<AtomicBool>,
    stopped: Receiver<()>,
    opts: ServerOptions,
    on_conn: C,
) where
    C: Fn(Connection) -> CFut + Send + Sync + 'static,
    CFut: Future<Output = Result<()>> + Send + 'static,
{
    let mut backoff = Backoff::new(opts.accept_backoff, opts.max_accept_backoff);

    loop {
        let accepted = future::or(async { Some(listener.accept().await) }, async {
            let _ = stopped.recv().await;
            None
        })
        .await;

        let (stream, peer) = match accepted {
            None => break,
            Some(Ok(accepted)) => accepted,
            Some(Err(err)) => {
                if closed.load(Ordering::SeqCst) {
                    break;
                }
                let delay = backoff.next_delay();
                warn!("accept failed, retrying in {:?}: {}", delay, err);
                if sleep_or_stop(delay, &stopped).await {
                    break;
                }
                continue;
            }
        };
        backoff.reset();

        trace!("accepted connection from {}", peer);
        let conn = on_conn(async_dup::Arc::new(stream));
        async_global_executor::spawn(async move {
            if let Err(err) = conn.await {
                debug!("connection from {} failed: {}", peer, err);
            }
        })
        .detach();
    }

    info!("listener on {:?} closed", listener.get_ref().local_addr().ok());
}

/// Exponential delay between failed accepts.
#[derive(Debug)]
struct Backoff {
    initial: Duration,
    max: Duration,
    current: Duration,
}

impl Backoff {
    fn new(initial: Duration, max: Duration) -> Self {
        Self {
            initial,
            max,
            current: initial,
        }
    }

    /// The delay to wait now; the following one is twice as long, up to `max`.
    fn next_delay(&mut self) -> Duration {
        let delay = self.current;
        self.current = (self.current * 2).min(self.max);
        delay
    }

    fn reset(&mut self) {
        self.current = self.initial;
    }
}

/// Wait out `delay`, returning early with `true` if the server is stopped.
async fn sleep_or_stop(delay: Duration, stopped: &Receiver<()>) -> bool {
    future::or(
        async {
            Timer::after(delay).await;
            false
        },
        async {
            let _ = stopped.recv().await;
            true
        },
    )
    .await
}
