mod cli;

use std::path::Path;
use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::warn;
use tracing_subscriber::EnvFilter;

use decora_assistant::{
    AssistantSession, AttachmentUpload, BackendConfig, HttpBackend, Message, Role,
};
use decora_common::DecoraError;

#[tokio::main]
async fn main() -> decora_common::Result<()> {
    let args = cli::parse();

    let log_directive = args.log_level.as_deref().unwrap_or("decora=info");
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive(
                log_directive
                    .parse()
                    .unwrap_or_else(|_| "decora=info".parse().unwrap()),
            ),
        )
        .init();

    let host_context = match args.context.as_deref() {
        Some(raw) => serde_json::from_str(raw)
            .map_err(|e| DecoraError::Other(format!("invalid --context JSON: {e}")))?,
        None => serde_json::Value::Null,
    };

    let mut config = BackendConfig::new(args.backend_url);
    if let Some(token) = args.token {
        config = config.with_bearer_token(token);
    }
    let backend = Arc::new(HttpBackend::new(config));

    let session = AssistantSession::new(backend)
        .with_host_context(host_context)
        .with_action_callback(Arc::new(|payload| {
            println!("[action payload] {payload}");
        }));

    session.seed_greeting().await;
    let mut seen = print_new_messages(&session, 0).await;

    println!("Type a message, /attach <path>, /s <n> for a suggestion, /a <n> for an action, /quit to exit.");

    let stdin = BufReader::new(tokio::io::stdin());
    let mut lines = stdin.lines();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim().to_string();
        match line.split_once(' ') {
            _ if line.is_empty() => continue,
            _ if line == "/quit" || line == "/exit" => break,
            Some(("/attach", path)) => {
                attach(&session, path.trim()).await;
            }
            Some(("/s", index)) => {
                if let Some(suggestion) = pick_suggestion(&session, index).await {
                    session.select_suggestion(&suggestion).await;
                }
            }
            Some(("/a", index)) => {
                invoke_action(&session, index).await;
            }
            _ => {
                session.submit_text(&line).await;
            }
        }
        seen = print_new_messages(&session, seen).await;
    }

    session.close();
    Ok(())
}

/// Upload a local file for analysis.
async fn attach(session: &AssistantSession, path: &str) {
    let file_name = Path::new(path)
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string());
    match tokio::fs::read(path).await {
        Ok(bytes) => {
            session
                .submit_attachment(AttachmentUpload { file_name, bytes })
                .await;
        }
        Err(e) => {
            warn!(path, error = %e, "could not read attachment");
            println!("could not read {path}: {e}");
        }
    }
}

/// Resolve `/s <n>` against the suggestions on the latest assistant message.
async fn pick_suggestion(session: &AssistantSession, index: &str) -> Option<String> {
    let n: usize = match index.trim().parse() {
        Ok(n) => n,
        Err(_) => {
            println!("usage: /s <number>");
            return None;
        }
    };
    let picked = last_assistant(&session.messages().await)
        .and_then(|msg| msg.suggestions.get(n.checked_sub(1)?).cloned());
    if picked.is_none() {
        println!("no suggestion #{n}");
    }
    picked
}

/// Resolve `/a <n>` and hand the payload to the action callback.
async fn invoke_action(session: &AssistantSession, index: &str) {
    let n: usize = match index.trim().parse() {
        Ok(n) => n,
        Err(_) => {
            println!("usage: /a <number>");
            return;
        }
    };
    let messages = session.messages().await;
    let handles = last_assistant(&messages)
        .map(|msg| session.actions_for(msg))
        .unwrap_or_default();
    match n.checked_sub(1).and_then(|i| handles.get(i)) {
        Some(handle) => session.invoke_action(handle),
        None => println!("no action #{n}"),
    }
}

fn last_assistant(messages: &[Message]) -> Option<&Message> {
    messages.iter().rev().find(|m| m.role == Role::Assistant)
}

/// Print messages appended since `seen`; returns the new watermark.
async fn print_new_messages(session: &AssistantSession, seen: usize) -> usize {
    let messages = session.messages().await;
    for msg in &messages[seen..] {
        let speaker = match msg.role {
            Role::User => "you",
            Role::Assistant => "assistant",
            Role::System => "system",
        };
        println!("{speaker}> {}", msg.content);
        for attachment in &msg.attachments {
            println!("  [attachment] {}", attachment.display_name);
        }
        for (i, suggestion) in msg.suggestions.iter().enumerate() {
            println!("  [{}] {suggestion}", i + 1);
        }
        for (i, handle) in session.actions_for(msg).iter().enumerate() {
            println!("  [action {}] {}", i + 1, handle.label);
        }
    }
    messages.len()
}
