//! Connection handling
//!
//! Each connection is served by hyper on its own task. Requests are read
//! fully (bounded by `max_body_size`), then built and dispatched on a
//! blocking worker. The response head and body chunks travel back to hyper
//! through channels, so a servlet that flushes early streams its output.
//! On shutdown every connection finishes its current response and closes
//! instead of waiting for the next keep-alive request.

use crate::error::RequestError;
use crate::http::{build_400_response, build_413_response, build_500_response, ResponseBody};
use crate::logger;
use crate::server::dispatcher::Dispatcher;
use crate::server::request_builder::build_request;
use crate::servlet::{HttpResponse, ResponseHead, ResponseSink};
use http_body_util::{BodyExt, LengthLimitError, Limited, StreamBody};
use hyper::body::{Bytes, Frame, Incoming};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Request, Response};
use hyper_util::rt::TokioIo;
use std::convert::Infallible;
use std::io;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot, watch};
use tokio_stream::wrappers::ReceiverStream;

/// Body chunks buffered between the worker and hyper
const BODY_CHANNEL_CAPACITY: usize = 16;

/// Shared state of all connections
pub struct AppState {
    pub dispatcher: Dispatcher,
    pub max_body_size: u64,
    pub temp_dir: PathBuf,
}

type BodyFrame = Result<Frame<Bytes>, io::Error>;

/// Sink feeding a committed [`HttpResponse`] into the hyper response
struct ChannelSink {
    head: Option<oneshot::Sender<ResponseHead>>,
    body: mpsc::Sender<BodyFrame>,
}

fn client_gone() -> io::Error {
    io::Error::new(io::ErrorKind::BrokenPipe, "client connection closed")
}

impl ResponseSink for ChannelSink {
    fn send_head(&mut self, head: ResponseHead) -> io::Result<()> {
        let sender = self
            .head
            .take()
            .ok_or_else(|| io::Error::other("response head already sent"))?;
        sender.send(head).map_err(|_| client_gone())
    }

    fn send_chunk(&mut self, chunk: Bytes) -> io::Result<()> {
        if chunk.is_empty() {
            return Ok(());
        }
        self.body
            .blocking_send(Ok(Frame::data(chunk)))
            .map_err(|_| client_gone())
    }
}

/// Count the connection and serve it on a new task
///
/// A change on `shutdown` (or its sender going away) starts a graceful
/// close of the connection.
pub fn accept_connection(
    stream: tokio::net::TcpStream,
    peer_addr: SocketAddr,
    state: &Arc<AppState>,
    conn_counter: &Arc<AtomicUsize>,
    mut shutdown: watch::Receiver<bool>,
) {
    conn_counter.fetch_add(1, Ordering::SeqCst);
    logger::log_connection_accepted(&peer_addr);

    let state = Arc::clone(state);
    let conn_counter = Arc::clone(conn_counter);
    tokio::spawn(async move {
        let io = TokioIo::new(stream);
        let conn = http1::Builder::new().keep_alive(true).serve_connection(
            io,
            service_fn(move |req| handle_request(req, peer_addr, Arc::clone(&state))),
        );
        tokio::pin!(conn);

        let mut closing = false;
        let result = loop {
            tokio::select! {
                result = conn.as_mut() => break result,
                _ = shutdown.changed(), if !closing => {
                    logger::log_debug(&format!("Closing connection from {peer_addr} for shutdown"));
                    conn.as_mut().graceful_shutdown();
                    closing = true;
                }
            }
        };

        if let Err(err) = result {
            logger::log_connection_error(&err);
        }
        conn_counter.fetch_sub(1, Ordering::SeqCst);
    });
}

async fn handle_request(
    req: Request<Incoming>,
    peer_addr: SocketAddr,
    state: Arc<AppState>,
) -> Result<Response<ResponseBody>, Infallible> {
    let (parts, body) = req.into_parts();
    let limit = usize::try_from(state.max_body_size).unwrap_or(usize::MAX);

    let body = match Limited::new(body, limit).collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(e) if e.downcast_ref::<LengthLimitError>().is_some() => {
            logger::log_warning(&format!(
                "Request body from {peer_addr} exceeds {} bytes",
                state.max_body_size
            ));
            return Ok(build_413_response());
        }
        Err(e) => {
            logger::log_warning(&format!("Failed to read request body from {peer_addr}: {e}"));
            return Ok(build_400_response());
        }
    };

    let (head_tx, head_rx) = oneshot::channel();
    let (body_tx, body_rx) = mpsc::channel(BODY_CHANNEL_CAPACITY);

    let worker_state = Arc::clone(&state);
    let worker = tokio::task::spawn_blocking(move || -> Result<(), RequestError> {
        let mut request = build_request(&parts, body, peer_addr, &worker_state.temp_dir)?;
        let sink = ChannelSink {
            head: Some(head_tx),
            body: body_tx,
        };
        let mut response = HttpResponse::with_sink(Box::new(sink));
        worker_state.dispatcher.dispatch(&mut request, &mut response);
        Ok(())
    });

    if let Ok(head) = head_rx.await {
        let stream = StreamBody::new(ReceiverStream::new(body_rx));
        let mut response = Response::new(BodyExt::boxed(stream));
        *response.status_mut() = head.status;
        *response.headers_mut() = head.headers;
        return Ok(response);
    }

    // The worker finished without committing a response
    Ok(match worker.await {
        Ok(Err(RequestError::Multipart(e))) => {
            logger::log_warning(&format!("Rejected multipart body from {peer_addr}: {e}"));
            build_400_response()
        }
        Ok(Err(e)) => {
            logger::log_error(&e.to_string());
            build_500_response()
        }
        Ok(Ok(())) => {
            logger::log_error("Request finished without a response");
            build_500_response()
        }
        Err(e) => {
            logger::log_error(&format!("Request worker failed: {e}"));
            build_500_response()
        }
    })
}
