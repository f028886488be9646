//! # mememori-cli
//!
//! Terminal shell for one item chat. It owns the REST backend and the realtime
//! channel, builds the `ChatContext` and drives a `ChatView` from stdin.

pub mod command;
pub mod render;
pub mod shell;

use std::sync::Arc;

use mememori_chat::{ChatContext, ChatView, ThreadResolver};
use mememori_common::{ClientConfig, ClientError, ClientResult};
use mememori_core::traits::EventChannel;
use mememori_core::ItemId;
use mememori_http::HttpBackend;
use mememori_realtime::{WsChannel, WsChannelConfig};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::broadcast::error::RecvError;
use tracing::{info, warn};

pub use shell::{Flow, Shell};

/// Connect, open the chat of `item_id` and run the input loop until `/quit` or EOF
pub async fn run(config: ClientConfig, item_id: ItemId) -> ClientResult<()> {
    let user_id = config.chat.require_user()?;
    let backend = HttpBackend::new(&config.backend)?;
    let channel = Arc::new(WsChannel::connect(WsChannelConfig::from(&config.realtime)));
    info!(
        api_url = %config.backend.api_url,
        realtime_url = %config.realtime.url,
        session_id = channel.session_id(),
        "Adapters ready"
    );

    let ctx = ChatContext::builder()
        .backend(Arc::new(backend))
        .channel(channel.clone())
        .user_id(user_id)
        .settings(config.chat.clone())
        .build()?;

    // The page opening a chat creates its thread first
    let thread_id = ThreadResolver::new(&ctx).ensure(&item_id).await?;
    info!(item_id = %item_id, thread_id = %thread_id, "Thread ready");

    let view = ChatView::open(ctx, item_id);
    let listener = view.spawn_listener();
    let notices = spawn_notices(channel.as_ref());
    view.fetch_messages().await?;

    let shell = Shell::new(view.clone());
    let mut stdout = tokio::io::stdout();
    write_out(&mut stdout, &render::timeline(&view.timeline())).await?;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await.map_err(ClientError::internal)? {
        match shell.handle_line(&line).await {
            Ok((Flow::Quit, _)) => break,
            Ok((Flow::Continue, output)) => write_out(&mut stdout, &output).await?,
            Err(e) => {
                warn!(error = %e, code = e.error_code(), "Command failed");
                write_out(&mut stdout, &format!("error: {e}")).await?;
            }
        }
    }

    view.close();
    notices.abort();
    if let Err(e) = listener.await {
        warn!(error = %e, "Listener task failed");
    }
    if let Err(e) = channel.shutdown().await {
        warn!(error = %e, "Channel shutdown failed");
    }
    info!("Chat shell finished");
    Ok(())
}

/// Print a one-line notice for every incoming event
fn spawn_notices(channel: &dyn EventChannel) -> tokio::task::JoinHandle<()> {
    let mut events = channel.subscribe();
    tokio::spawn(async move {
        let mut stdout = tokio::io::stdout();
        loop {
            match events.recv().await {
                Ok(event) => {
                    if write_out(&mut stdout, &render::event_notice(&event)).await.is_err() {
                        break;
                    }
                }
                Err(RecvError::Lagged(skipped)) => warn!(skipped, "Notices lagged"),
                Err(RecvError::Closed) => break,
            }
        }
    })
}

async fn write_out(stdout: &mut tokio::io::Stdout, text: &str) -> ClientResult<()> {
    if text.is_empty() {
        return Ok(());
    }
    let mut text = text.to_string();
    if !text.ends_with('\n') {
        text.push('\n');
    }
    stdout.write_all(text.as_bytes()).await.map_err(ClientError::internal)?;
    stdout.flush().await.map_err(ClientError::internal)
}
