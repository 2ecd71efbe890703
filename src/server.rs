use std::{convert::Infallible, net::SocketAddr, sync::Arc, thread};

use anyhow::{Context, Result};
use http_body_util::{BodyExt, Full};
use hyper::{
    Method, Request, Response, StatusCode,
    body::{Bytes, Incoming},
    header::CONTENT_TYPE,
    server::conn::http1::Builder as Http1Builder,
    service::service_fn,
};
use hyper_util::rt::tokio::TokioIo;
use serde::Serialize;
use serde_json::json;
use tokio::{net::TcpListener, runtime::Runtime, sync::oneshot};
use uuid::Uuid;

use crate::config::AppConfig;
use crate::dispatch::{DispatchError, DispatchOutcome, Dispatcher};
use crate::request::SlashRequest;
use crate::slash::ParsedCommand;

/// Everything a request needs, shared across connections.
pub struct ServerState {
    pub config: Arc<AppConfig>,
    pub dispatcher: Dispatcher,
}

/// HTTP front door for slash commands. Runs on its own thread with its own
/// runtime; `stop` shuts the accept loop down and joins the thread.
pub struct CommandServer {
    addr: SocketAddr,
    shutdown: Option<oneshot::Sender<()>>,
    handle: Option<thread::JoinHandle<Result<()>>>,
}

impl CommandServer {
    /// Binds before spawning so the caller learns the real address even when
    /// asked to listen on port 0.
    pub fn start(addr: SocketAddr, state: Arc<ServerState>) -> Result<Self> {
        let listener =
            std::net::TcpListener::bind(addr).with_context(|| format!("failed to bind {addr}"))?;
        listener
            .set_nonblocking(true)
            .context("failed to set listener non-blocking")?;
        let local_addr = listener
            .local_addr()
            .context("failed to read bound address")?;
        let (tx, rx) = oneshot::channel();
        let handle = thread::Builder::new()
            .name("slashops-http".to_string())
            .spawn(move || -> Result<()> {
                let runtime = Runtime::new().context("failed to create server runtime")?;
                runtime.block_on(async move {
                    let listener = TcpListener::from_std(listener)
                        .context("failed to register listener with runtime")?;
                    tracing::info!("listening on http://{local_addr}");
                    let mut shutdown = rx;
                    loop {
                        tokio::select! {
                            _ = &mut shutdown => break,
                            accept = listener.accept() => match accept {
                                Ok((stream, _peer)) => {
                                    let connection_state = state.clone();
                                    tokio::spawn(async move {
                                        let service = service_fn(move |req| {
                                            handle_request(req, connection_state.clone())
                                        });
                                        let stream = TokioIo::new(stream);
                                        if let Err(err) = Http1Builder::new()
                                            .serve_connection(stream, service)
                                            .await
                                        {
                                            tracing::error!("connection error: {err}");
                                        }
                                    });
                                }
                                Err(err) => {
                                    tracing::error!("accept error: {err}");
                                }
                            },
                        }
                    }
                    Ok(())
                })
            })?;
        Ok(Self {
            addr: local_addr,
            shutdown: Some(tx),
            handle: Some(handle),
        })
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn stop(mut self) -> Result<()> {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.handle.take() {
            let joined = handle
                .join()
                .map_err(|err| anyhow::anyhow!("server thread panicked: {err:?}"))?;
            joined?;
        }
        Ok(())
    }
}

async fn handle_request(
    req: Request<Incoming>,
    state: Arc<ServerState>,
) -> Result<Response<Full<Bytes>>, Infallible> {
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    let body = req
        .into_body()
        .collect()
        .await
        .map(|collected| collected.to_bytes())
        .unwrap_or_default();
    Ok(respond(&state, &method, &path, &body).await)
}

async fn respond(
    state: &ServerState,
    method: &Method,
    path: &str,
    body: &[u8],
) -> Response<Full<Bytes>> {
    if *method == Method::GET && path == "/" {
        return text_body(StatusCode::OK, "Welcome!\n");
    }
    if *method == Method::POST && path == "/cmd" {
        return slash_command(state, body).await;
    }
    error_body(&DispatchError::not_found(format!(
        "no route for {method} {path}"
    )))
}

async fn slash_command(state: &ServerState, body: &[u8]) -> Response<Full<Bytes>> {
    let request_id = Uuid::new_v4();
    let request = SlashRequest::from_form(body);
    request.log(request_id);
    if let Err(err) = check_token(&state.config, &request) {
        return fail(request_id, err);
    }
    let command = match ParsedCommand::parse_with(&request.text, state.config.value_casing) {
        Ok(command) => command,
        Err(err) => return fail(request_id, err.into()),
    };
    match state.dispatcher.dispatch(&request, command).await {
        DispatchOutcome::Immediate(response) => json_body(StatusCode::OK, &response),
        // Dropping the handle detaches the task; it finishes on the runtime
        // and reports through the callback URL.
        DispatchOutcome::Deferred { ack, task: _ } => json_body(StatusCode::OK, &ack),
        DispatchOutcome::Failed(err) => fail(request_id, err),
    }
}

fn check_token(config: &AppConfig, request: &SlashRequest) -> Result<(), DispatchError> {
    let expected = config.slack_token.as_deref().unwrap_or_default();
    if expected.is_empty() || request.token != expected {
        return Err(DispatchError::unauthorized(
            "the request token does not match",
        ));
    }
    Ok(())
}

fn fail(request_id: Uuid, err: DispatchError) -> Response<Full<Bytes>> {
    tracing::warn!("request {request_id}: {err}");
    error_body(&err)
}

fn error_body(err: &DispatchError) -> Response<Full<Bytes>> {
    let status = StatusCode::from_u16(err.kind.http_status())
        .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    json_body(
        status,
        &json!({
            "error": err.kind.as_str(),
            "message": err.message,
        }),
    )
}

fn json_body(status: StatusCode, value: &impl Serialize) -> Response<Full<Bytes>> {
    let body = serde_json::to_string(value).unwrap_or_else(|_| "{}".to_string());
    build_body(status, "application/json; charset=utf-8", body)
}

fn text_body(status: StatusCode, text: &str) -> Response<Full<Bytes>> {
    build_body(status, "text/plain; charset=utf-8", text.to_string())
}

fn build_body(status: StatusCode, content_type: &str, body: String) -> Response<Full<Bytes>> {
    Response::builder()
        .status(status)
        .header(CONTENT_TYPE, content_type)
        .body(Full::from(Bytes::from(body)))
        .unwrap_or_else(|err| {
            Response::builder()
                .status(StatusCode::INTERNAL_SERVER_ERROR)
                .body(Full::from(Bytes::from(format!(
                    "failed to build response: {err}"
                ))))
                .unwrap()
        })
}
