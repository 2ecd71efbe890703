use anyhow::{Context, Result, bail};
use async_trait::async_trait;

use crate::dispatch::{CommandHandler, HandlerContext};
use crate::request::SlashRequest;
use crate::response::{Attachment, COLOR_GOOD, Response, Visibility};
use crate::slash::command::ParsedCommand;
use crate::tracker::{Actor, Issue, IssueUpdate, NewIssue, RepoRef};

/// The `/issues` command: bridges slash-command text to the issue tracker.
///
/// Runs detached; whatever it returns (or fails with) goes back through the
/// caller's callback URL.
pub struct IssuesCommand;

#[async_trait]
impl CommandHandler for IssuesCommand {
    async fn handle(
        &self,
        ctx: &HandlerContext,
        request: &SlashRequest,
        command: &ParsedCommand,
    ) -> Result<Response> {
        match command.path.first() {
            Some("new") => create(ctx, request, command).await,
            Some("get") => get(ctx, command).await,
            Some("update") => update(ctx, command).await,
            Some("close") => close(ctx, command).await,
            Some(other) => bail!("Command not recognized: {other}"),
            None => bail!("No issues command specified"),
        }
    }
}

async fn create(
    ctx: &HandlerContext,
    request: &SlashRequest,
    command: &ParsedCommand,
) -> Result<Response> {
    let repo = resolve_repo(ctx, command)?;
    if !command.params.has("title") {
        bail!("Issue title was not provided");
    }
    let new_issue = NewIssue {
        title: command.params.value_or("title", "").to_string(),
        body: owned(command, "body"),
        assignee: owned(command, "assignee"),
        milestone: milestone(command),
        labels: command.params.values("labels"),
    };
    let issue = ctx
        .tracker
        .create_issue(&repo, &new_issue)
        .await
        .context("Issue creation failed")?;
    Ok(Response {
        visibility: Visibility::InChannel,
        text: Some(format!(
            "<@{}|{}> created a new issue!",
            request.user_id, request.user_name
        )),
        attachments: vec![basic_attachment(&issue)],
    })
}

async fn get(ctx: &HandlerContext, command: &ParsedCommand) -> Result<Response> {
    let repo = resolve_repo(ctx, command)?;
    let number = resolve_number(command)?;
    let issue = ctx
        .tracker
        .issue(&repo, number)
        .await
        .context("Issue fetch failed")?;
    Ok(issue_report("Get Issue", &issue))
}

async fn update(ctx: &HandlerContext, command: &ParsedCommand) -> Result<Response> {
    let repo = resolve_repo(ctx, command)?;
    let number = resolve_number(command)?;
    let changes = IssueUpdate {
        title: owned(command, "title"),
        body: owned(command, "body"),
        assignee: owned(command, "assignee"),
        state: owned(command, "state"),
        milestone: milestone(command),
        labels: command
            .params
            .has("labels")
            .then(|| command.params.values("labels")),
    };
    if changes.is_empty() {
        bail!("No updates were provided");
    }
    let issue = ctx
        .tracker
        .update_issue(&repo, number, &changes)
        .await
        .context("Issue update failed")?;
    Ok(issue_report("Update Issue", &issue))
}

async fn close(ctx: &HandlerContext, command: &ParsedCommand) -> Result<Response> {
    let repo = resolve_repo(ctx, command)?;
    let number = resolve_number(command)?;
    let issue = ctx
        .tracker
        .update_issue(&repo, number, &IssueUpdate::close())
        .await
        .context("Issue update failed")?;
    Ok(issue_report("Update Issue", &issue))
}

/// Owner comes from configuration; the repo may be overridden per
/// invocation with `repo=`.
fn resolve_repo(ctx: &HandlerContext, command: &ParsedCommand) -> Result<RepoRef> {
    let tracker = &ctx.config.tracker;
    let owner = match tracker.default_owner.as_deref() {
        Some(owner) if !owner.is_empty() => owner.to_string(),
        _ => bail!("Could not find a tracker owner in the command or the config"),
    };
    let configured = tracker.default_repo.as_deref().unwrap_or_default();
    let repo = command.params.value_or("repo", configured);
    if repo.is_empty() {
        bail!("Could not find a tracker repo in the command or the config");
    }
    Ok(RepoRef {
        owner,
        repo: repo.to_string(),
    })
}

/// The issue number may arrive as `number=` or as the word after the
/// action, as in `get 41`.
fn resolve_number(command: &ParsedCommand) -> Result<u64> {
    let number = command
        .params
        .int_value("number")
        .or_else(|| command.path.word(1).and_then(|word| word.parse().ok()));
    match number {
        Some(number) if number > 0 => Ok(number as u64),
        _ => bail!("Issue number was not provided"),
    }
}

fn owned(command: &ParsedCommand, key: &str) -> Option<String> {
    command.params.value(key).map(str::to_string)
}

fn milestone(command: &ParsedCommand) -> Option<u64> {
    command
        .params
        .int_value("milestone")
        .filter(|milestone| *milestone > 0)
        .map(|milestone| milestone as u64)
}

fn issue_report(text: &str, issue: &Issue) -> Response {
    Response::ephemeral(text)
        .with_attachment(basic_attachment(issue))
        .with_attachment(details_attachment(issue))
}

fn basic_attachment(issue: &Issue) -> Attachment {
    Attachment {
        title: Some(format!(
            "<{}|#{}>: {}",
            issue.html_url, issue.number, issue.title
        )),
        fallback: Some(format!(
            "#{}: {}\n{}",
            issue.number, issue.html_url, issue.title
        )),
        text: issue.body.clone(),
        color: Some(COLOR_GOOD.to_string()),
        mrkdwn_in: vec!["title".to_string(), "text".to_string()],
        ..Attachment::default()
    }
}

fn details_attachment(issue: &Issue) -> Attachment {
    Attachment {
        title: Some("Details".to_string()),
        text: Some(format!(
            "- Status: {}\n- Created by {}\n- Assigned: {}\n- Milestone: {}",
            issue.state,
            actor_link(issue.user.as_ref()),
            actor_link(issue.assignee.as_ref()),
            issue
                .milestone
                .as_ref()
                .map(|milestone| milestone.title.as_str())
                .unwrap_or_default(),
        )),
        mrkdwn_in: vec!["title".to_string(), "text".to_string()],
        ..Attachment::default()
    }
}

fn actor_link(actor: Option<&Actor>) -> String {
    match actor {
        Some(actor) if !actor.html_url.is_empty() => {
            format!("<{}|{}>", actor.html_url, actor.login)
        }
        Some(actor) => actor.login.clone(),
        None => String::new(),
    }
}
