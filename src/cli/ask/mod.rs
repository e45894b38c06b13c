//! Ask command - sends a prompt to a running server and optionally waits for the answer

use std::time::Duration;

use anyhow::{bail, Context};
use clap::Args;
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::time::{sleep, Instant};
use tracing::debug;

use crate::api::types::{
    ApiErrorResponse, HistoryResponse, SignalResponse, StartWorkflowRequest,
    StartWorkflowResponse, SubmitPromptRequest,
};
use crate::domain::conversation::{Actor, HistoryEntry};
use crate::infrastructure::logging::init_logging;

#[derive(Args, Clone, Debug)]
pub struct AskArgs {
    /// Question to send
    pub prompt: String,

    #[arg(long, default_value = "http://localhost:8000")]
    pub api_url: String,

    /// Conversation to continue; started when absent or finished
    #[arg(long)]
    pub workflow_id: Option<String>,

    /// Search results the agent should request
    #[arg(long)]
    pub top_k: Option<u32>,

    /// Poll the history until the answer arrives
    #[arg(long)]
    pub wait: bool,

    #[arg(long, default_value_t = 120)]
    pub timeout_secs: u64,
}

pub async fn run(args: AskArgs) -> anyhow::Result<()> {
    let config = super::load_config()?;
    init_logging(&config.logging);

    let client = ApiClient::new(&args.api_url);
    let started = client.start(args.workflow_id.clone()).await?;
    let workflow_id = started.workflow_id;
    println!("workflow_id: {}", workflow_id);

    let before = client.history(&workflow_id).await?.history.len();
    client.submit(&workflow_id, &args.prompt, args.top_k).await?;

    if !args.wait {
        println!("Prompt sent");
        return Ok(());
    }

    let answer = client
        .wait_for_answer(
            &workflow_id,
            &args.prompt,
            before,
            Duration::from_secs(args.timeout_secs),
        )
        .await?;

    match answer.actor {
        Actor::System => bail!("{}", answer.content),
        _ => println!("{}", answer.content),
    }

    Ok(())
}

/// Thin client for the workflow endpoints
#[derive(Debug, Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    poll_interval: Duration,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            poll_interval: Duration::from_millis(500),
        }
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub async fn start(&self, workflow_id: Option<String>) -> anyhow::Result<StartWorkflowResponse> {
        self.post("/workflows/start", &StartWorkflowRequest { workflow_id })
            .await
    }

    pub async fn submit(
        &self,
        workflow_id: &str,
        prompt: &str,
        top_k: Option<u32>,
    ) -> anyhow::Result<SignalResponse> {
        let request = SubmitPromptRequest {
            prompt: prompt.to_string(),
            top_k,
        };

        self.post(&format!("/workflows/{}/prompt", workflow_id), &request)
            .await
    }

    pub async fn history(&self, workflow_id: &str) -> anyhow::Result<HistoryResponse> {
        let url = format!("{}/workflows/{}/history", self.base_url, workflow_id);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .with_context(|| format!("GET {} failed", url))?;

        decode(response).await
    }

    /// Polls the history for the entry that follows `prompt`, starting at index `from`
    pub async fn wait_for_answer(
        &self,
        workflow_id: &str,
        prompt: &str,
        from: usize,
        limit: Duration,
    ) -> anyhow::Result<HistoryEntry> {
        let deadline = Instant::now() + limit;

        loop {
            let history = self.history(workflow_id).await?.history;

            if let Some(answer) = answer_after(&history, prompt, from) {
                return Ok(answer);
            }

            if Instant::now() >= deadline {
                bail!("No answer within {}s", limit.as_secs());
            }

            debug!(entries = history.len(), "Waiting for answer");
            sleep(self.poll_interval).await;
        }
    }

    async fn post<B, T>(&self, path: &str, body: &B) -> anyhow::Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = format!("{}{}", self.base_url, path);
        let response = self
            .client
            .post(&url)
            .json(body)
            .send()
            .await
            .with_context(|| format!("POST {} failed", url))?;

        decode(response).await
    }
}

async fn decode<T: DeserializeOwned>(response: Response) -> anyhow::Result<T> {
    let status = response.status();

    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ApiErrorResponse>(&body)
            .map(|e| e.error.message)
            .unwrap_or(body);
        bail!("Server returned {}: {}", status, message);
    }

    response.json().await.context("Unexpected response body")
}

fn answer_after(history: &[HistoryEntry], prompt: &str, from: usize) -> Option<HistoryEntry> {
    history
        .iter()
        .skip(from)
        .skip_while(|entry| !(entry.actor == Actor::User && entry.content == prompt))
        .nth(1)
        .cloned()
}
