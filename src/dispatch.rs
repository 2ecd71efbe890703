use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::callback;
use crate::config::AppConfig;
use crate::help::HelpTable;
use crate::request::SlashRequest;
use crate::response::Response;
use crate::slash::command::ParsedCommand;
use crate::slash::parse::ParseError;
use crate::tracker::IssueTracker;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    BadRequest,
    Unauthorized,
    NotFound,
    Internal,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::BadRequest => "bad-request",
            ErrorKind::Unauthorized => "unauthorized",
            ErrorKind::NotFound => "not-found",
            ErrorKind::Internal => "internal",
        }
    }

    pub fn http_status(self) -> u16 {
        match self {
            ErrorKind::BadRequest => 400,
            ErrorKind::Unauthorized => 401,
            ErrorKind::NotFound => 404,
            ErrorKind::Internal => 500,
        }
    }
}

#[derive(Clone, Debug)]
pub struct DispatchError {
    pub kind: ErrorKind,
    pub message: String,
}

impl DispatchError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        DispatchError {
            kind,
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::BadRequest, message)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Unauthorized, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotFound, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Internal, message)
    }
}

impl fmt::Display for DispatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind.as_str(), self.message)
    }
}

impl std::error::Error for DispatchError {}

impl From<ParseError> for DispatchError {
    fn from(err: ParseError) -> Self {
        Self::bad_request(err.message)
    }
}

/// Whether a handler answers on the request path or runs detached and
/// delivers through the callback URL.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HandlerMode {
    Sync,
    Detached,
}

/// Shared collaborators handed to every handler invocation.
pub struct HandlerContext {
    pub config: Arc<AppConfig>,
    pub tracker: Arc<dyn IssueTracker>,
}

#[async_trait]
pub trait CommandHandler: Send + Sync {
    async fn handle(
        &self,
        ctx: &HandlerContext,
        request: &SlashRequest,
        command: &ParsedCommand,
    ) -> anyhow::Result<Response>;
}

#[derive(Clone)]
pub struct CommandDescriptor {
    pub name: String,
    pub mode: HandlerMode,
    pub handler: Arc<dyn CommandHandler>,
}

impl CommandDescriptor {
    pub fn sync(name: impl Into<String>, handler: Arc<dyn CommandHandler>) -> Self {
        CommandDescriptor {
            name: name.into(),
            mode: HandlerMode::Sync,
            handler,
        }
    }

    pub fn detached(name: impl Into<String>, handler: Arc<dyn CommandHandler>) -> Self {
        CommandDescriptor {
            name: name.into(),
            mode: HandlerMode::Detached,
            handler,
        }
    }
}

/// Name-keyed handler table, built once at startup and never mutated.
#[derive(Default)]
pub struct CommandRegistry {
    commands: HashMap<String, CommandDescriptor>,
}

impl CommandRegistry {
    pub fn new(descriptors: Vec<CommandDescriptor>) -> Self {
        let mut commands = HashMap::new();
        for descriptor in descriptors {
            commands.insert(descriptor.name.clone(), descriptor);
        }
        CommandRegistry { commands }
    }

    pub fn get(&self, name: &str) -> Option<&CommandDescriptor> {
        self.commands.get(name)
    }

    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.commands.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

#[derive(Debug)]
pub enum DispatchOutcome {
    /// The handler finished on the request path; reply with its response.
    Immediate(Response),
    /// The handler keeps running; reply with the ack now. The task delivers
    /// its own result and is never awaited on the request path.
    Deferred {
        ack: Response,
        task: JoinHandle<()>,
    },
    Failed(DispatchError),
}

pub struct Dispatcher {
    registry: Arc<CommandRegistry>,
    help: Arc<HelpTable>,
    ctx: Arc<HandlerContext>,
    client: reqwest::Client,
}

impl Dispatcher {
    pub fn new(
        registry: Arc<CommandRegistry>,
        help: Arc<HelpTable>,
        ctx: Arc<HandlerContext>,
    ) -> Self {
        Dispatcher {
            registry,
            help,
            ctx,
            client: reqwest::Client::new(),
        }
    }

    /// Routes one parsed invocation. Help requests short-circuit before any
    /// handler lookup, so even an unregistered command can answer `help`.
    pub async fn dispatch(&self, request: &SlashRequest, command: ParsedCommand) -> DispatchOutcome {
        if let Some(topic) = command.help_path() {
            let text = self.help.for_path(topic);
            return DispatchOutcome::Immediate(Response::ephemeral(text));
        }
        let Some(descriptor) = self.registry.get(&request.command) else {
            return DispatchOutcome::Failed(DispatchError::not_found(format!(
                "command not found [{}]",
                request.command
            )));
        };
        match descriptor.mode {
            HandlerMode::Sync => {
                match descriptor.handler.handle(&self.ctx, request, &command).await {
                    Ok(response) => DispatchOutcome::Immediate(response),
                    Err(err) => {
                        DispatchOutcome::Failed(DispatchError::internal(err.to_string()))
                    }
                }
            }
            HandlerMode::Detached => {
                let ack = Response::ack(command.path.first().unwrap_or(""));
                let task =
                    self.spawn_detached(descriptor.handler.clone(), request.clone(), command);
                DispatchOutcome::Deferred { ack, task }
            }
        }
    }

    fn spawn_detached(
        &self,
        handler: Arc<dyn CommandHandler>,
        request: SlashRequest,
        command: ParsedCommand,
    ) -> JoinHandle<()> {
        let ctx = self.ctx.clone();
        let client = self.client.clone();
        let task_id = Uuid::new_v4();
        tokio::spawn(async move {
            tracing::info!(
                "task {task_id}: {} {} detached",
                request.command,
                command.path.join(" ")
            );
            let result = handler.handle(&ctx, &request, &command).await;
            callback::finish_detached(&client, task_id, &request, result).await;
        })
    }
}
