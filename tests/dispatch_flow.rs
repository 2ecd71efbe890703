use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use anyhow::bail;
use async_trait::async_trait;
use http_body_util::{BodyExt, Full};
use hyper::{
    Request, Response as HttpResponse, body::Bytes, body::Incoming,
    server::conn::http1::Builder as Http1Builder, service::service_fn,
};
use hyper_util::rt::tokio::TokioIo;

use slashops::config::AppConfig;
use slashops::dispatch::{
    CommandDescriptor, CommandHandler, CommandRegistry, DispatchOutcome, Dispatcher, ErrorKind,
    HandlerContext,
};
use slashops::help::HelpTable;
use slashops::request::SlashRequest;
use slashops::response::Response;
use slashops::slash::ParsedCommand;
use slashops::tracker::{Issue, IssueTracker, IssueUpdate, NewIssue, RepoRef};

struct NullTracker;

#[async_trait]
impl IssueTracker for NullTracker {
    async fn create_issue(&self, _repo: &RepoRef, _new_issue: &NewIssue) -> anyhow::Result<Issue> {
        bail!("tracker not wired in this test")
    }

    async fn issue(&self, _repo: &RepoRef, _number: u64) -> anyhow::Result<Issue> {
        bail!("tracker not wired in this test")
    }

    async fn update_issue(
        &self,
        _repo: &RepoRef,
        _number: u64,
        _update: &IssueUpdate,
    ) -> anyhow::Result<Issue> {
        bail!("tracker not wired in this test")
    }
}

struct ReplyHandler {
    reply: &'static str,
    fail: bool,
}

#[async_trait]
impl CommandHandler for ReplyHandler {
    async fn handle(
        &self,
        _ctx: &HandlerContext,
        _request: &SlashRequest,
        _command: &ParsedCommand,
    ) -> anyhow::Result<Response> {
        if self.fail {
            bail!("tracker is down");
        }
        Ok(Response::in_channel(self.reply))
    }
}

fn dispatcher(descriptors: Vec<CommandDescriptor>) -> Dispatcher {
    let help = HelpTable::parse("base: try help\n").unwrap();
    let ctx = HandlerContext {
        config: Arc::new(AppConfig::default()),
        tracker: Arc::new(NullTracker),
    };
    Dispatcher::new(
        Arc::new(CommandRegistry::new(descriptors)),
        Arc::new(help),
        Arc::new(ctx),
    )
}

/// Collects every JSON body POSTed to it.
async fn start_capture() -> (SocketAddr, Arc<Mutex<Vec<serde_json::Value>>>) {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let seen = Arc::new(Mutex::new(Vec::new()));
    let state = seen.clone();
    tokio::spawn(async move {
        loop {
            let (stream, _peer) = match listener.accept().await {
                Ok(pair) => pair,
                Err(_) => break,
            };
            let state = state.clone();
            tokio::spawn(async move {
                let service = service_fn(move |req: Request<Incoming>| {
                    let state = state.clone();
                    async move {
                        let bytes = req.into_body().collect().await.unwrap().to_bytes();
                        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
                        state.lock().unwrap().push(body);
                        Ok::<_, Infallible>(HttpResponse::new(Full::new(Bytes::from("ok"))))
                    }
                });
                let _ = Http1Builder::new()
                    .serve_connection(TokioIo::new(stream), service)
                    .await;
            });
        }
    });
    (addr, seen)
}

fn request_with_callback(text: &str, callback: Option<String>) -> SlashRequest {
    SlashRequest {
        command: "/issues".to_string(),
        text: text.to_string(),
        user_id: "U123".to_string(),
        user_name: "steve".to_string(),
        response_url: callback,
        ..SlashRequest::default()
    }
}

#[tokio::test]
async fn detached_command_delivers_exactly_one_callback() {
    let (addr, seen) = start_capture().await;
    let dispatcher = dispatcher(vec![CommandDescriptor::detached(
        "/issues",
        Arc::new(ReplyHandler {
            reply: "issue filed",
            fail: false,
        }),
    )]);
    let request = request_with_callback("new title=x", Some(format!("http://{addr}/cb")));
    let command = ParsedCommand::parse(&request.text).unwrap();

    match dispatcher.dispatch(&request, command).await {
        DispatchOutcome::Deferred { ack, task } => {
            assert_eq!(
                ack.text.as_deref(),
                Some("Roger that!  Message received!\r\nYour new request is in process!")
            );
            task.await.unwrap();
        }
        other => panic!("expected deferred outcome, got {other:?}"),
    }

    let seen = seen.lock().unwrap();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0]["response_type"], "in_channel");
    assert_eq!(seen[0]["text"], "issue filed");
}

#[tokio::test]
async fn detached_failure_reports_through_the_callback() {
    let (addr, seen) = start_capture().await;
    let dispatcher = dispatcher(vec![CommandDescriptor::detached(
        "/issues",
        Arc::new(ReplyHandler {
            reply: "unused",
            fail: true,
        }),
    )]);
    let request = request_with_callback("new title=x", Some(format!("http://{addr}/cb")));
    let command = ParsedCommand::parse(&request.text).unwrap();

    match dispatcher.dispatch(&request, command).await {
        DispatchOutcome::Deferred { task, .. } => task.await.unwrap(),
        other => panic!("expected deferred outcome, got {other:?}"),
    }

    let seen = seen.lock().unwrap();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0]["response_type"], "ephemeral");
    assert_eq!(
        seen[0]["attachments"][0]["title"],
        "Oh snap! Something went wrong!"
    );
    assert_eq!(seen[0]["attachments"][0]["color"], "danger");
    assert!(
        seen[0]["attachments"][0]["text"]
            .as_str()
            .unwrap()
            .contains("tracker is down")
    );
}

#[tokio::test]
async fn missing_callback_url_skips_delivery() {
    let (_addr, seen) = start_capture().await;
    let dispatcher = dispatcher(vec![CommandDescriptor::detached(
        "/issues",
        Arc::new(ReplyHandler {
            reply: "issue filed",
            fail: false,
        }),
    )]);
    let request = request_with_callback("new title=x", None);
    let command = ParsedCommand::parse(&request.text).unwrap();

    match dispatcher.dispatch(&request, command).await {
        DispatchOutcome::Deferred { task, .. } => task.await.unwrap(),
        other => panic!("expected deferred outcome, got {other:?}"),
    }

    assert!(seen.lock().unwrap().is_empty());
}

#[tokio::test]
async fn unknown_command_never_reaches_the_callback() {
    let (addr, seen) = start_capture().await;
    let dispatcher = dispatcher(Vec::new());
    let request = request_with_callback("new title=x", Some(format!("http://{addr}/cb")));
    let command = ParsedCommand::parse(&request.text).unwrap();

    match dispatcher.dispatch(&request, command).await {
        DispatchOutcome::Failed(err) => assert_eq!(err.kind, ErrorKind::NotFound),
        other => panic!("expected failure, got {other:?}"),
    }

    assert!(seen.lock().unwrap().is_empty());
}
