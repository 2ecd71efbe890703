use anyhow::{Context, Result};
use reqwest::Client;
use uuid::Uuid;

use crate::request::SlashRequest;
use crate::response::Response;

const LOG_BODY_SNIPPET: usize = 200;

/// POSTs a response to the caller-supplied callback URL. One attempt, no
/// retry; the platform treats redelivery as a duplicate message.
pub async fn deliver(client: &Client, url: &str, response: &Response) -> Result<()> {
    let reply = client
        .post(url)
        .json(response)
        .send()
        .await
        .context("callback POST failed")?;
    let status = reply.status();
    let body = reply.text().await.unwrap_or_default();
    tracing::info!("callback delivered: status={status} body={}", snippet(&body));
    Ok(())
}

/// Epilogue of a detached command: turn the handler result into the final
/// response and push it through the callback URL. A missing URL is a
/// configuration problem on the caller's side; all we can do is log it.
pub async fn finish_detached(
    client: &Client,
    task_id: Uuid,
    request: &SlashRequest,
    result: anyhow::Result<Response>,
) {
    let response = match result {
        Ok(response) => response,
        Err(err) => {
            tracing::warn!("task {task_id}: {} failed: {err:#}", request.command);
            Response::error(&format!("{err:#}"))
        }
    };
    let Some(url) = request.response_url.as_deref() else {
        tracing::error!(
            "task {task_id}: no callback URL on {} request, dropping response",
            request.command
        );
        return;
    };
    if let Err(err) = deliver(client, url, &response).await {
        tracing::error!("task {task_id}: callback delivery failed: {err:#}");
    }
}

fn snippet(body: &str) -> String {
    let mut cut: String = body.chars().take(LOG_BODY_SNIPPET).collect();
    if cut.len() < body.len() {
        cut.push_str("...");
    }
    cut
}
