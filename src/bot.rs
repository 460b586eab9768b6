use crate::config::Config;
use following_watch::error::BotError;
use following_watch::models::IncomingMessage;
use following_watch::notifier::{Notifier, Outbox};
use following_watch::telegram::handler::{WatchFilter, WatchHandler};
use std::sync::Arc;
use teloxide::dispatching::{ShutdownToken, UpdateFilterExt, UpdateHandler};
use teloxide::dptree;
use teloxide::prelude::*;
use teloxide::types::{Me, UserId};
use tokio_util::sync::CancellationToken;

pub async fn run_bot(config: Config) -> anyhow::Result<()> {
    let notifier_bot = make_bot(&config.bot_token, config.api_address.as_deref())?;
    let watcher_bot = if config.has_separate_watcher() {
        make_bot(
            config.effective_watcher_token(),
            config.api_address.as_deref(),
        )?
    } else {
        notifier_bot.clone()
    };

    // Both sessions start together; a failure in one does not roll back the other.
    let (notifier_me, watcher_me) = tokio::try_join!(
        start_session("notifier", &notifier_bot),
        start_session("watcher", &watcher_bot),
    )?;

    let recipient = config.recipient();
    ensure_reachable(recipient, &[notifier_me.user.id, watcher_me.user.id])?;

    let handler = Arc::new(WatchHandler::new(
        WatchFilter::new(config.following.clone(), config.mode),
        Notifier::new(notifier_bot.clone(), recipient, config.coalesce_policy()),
    ));

    let cancel_token = CancellationToken::new();
    spawn_signal_handler(cancel_token.clone());

    let mut dispatcher =
        Dispatcher::builder(watcher_bot.clone(), handler_tree(handler.clone(), passthrough()))
            .enable_ctrlc_handler()
            .build();
    let shutdown_token = dispatcher.shutdown_token();
    let listener = teloxide::update_listeners::polling_default(watcher_bot.clone()).await;
    let mut dispatch = Box::pin(dispatcher.dispatch_with_listener(
        listener,
        LoggingErrorHandler::with_custom_text("Dispatcher error"),
    ));

    tracing::info!(
        mode = ?config.mode,
        recipient = recipient.0,
        following = config.following.len(),
        window_seconds = config.window_seconds,
        "Watching followed accounts"
    );

    tokio::select! {
        () = &mut dispatch => {
            tracing::info!("Telegram dispatcher stopped");
        }
        () = cancel_token.cancelled() => {
            tracing::info!("Shutdown signal received, stopping watcher session");
            // Polling acknowledges the last handled update only on a graceful stop.
            if request_stop(&shutdown_token) {
                dispatch.await;
            }
        }
    }

    report_stopped(&handler).await;

    Ok(())
}

/// Watches followed accounts, then hands every message on to `downstream`.
pub fn handler_tree<O: Outbox + 'static>(
    handler: Arc<WatchHandler<O>>,
    downstream: UpdateHandler<teloxide::RequestError>,
) -> UpdateHandler<teloxide::RequestError> {
    let watch_handler = Update::filter_message()
        .map(|msg: Message| IncomingMessage::from(&msg))
        // `on_message` always continues, so this filter never passes and the
        // update falls through to `downstream`.
        .filter_async(move |incoming: IncomingMessage| {
            let handler = handler.clone();
            async move { handler.on_message(&incoming).await.is_break() }
        })
        .endpoint(|| async { Ok(()) });

    dptree::entry().branch(watch_handler).branch(downstream)
}

fn passthrough() -> UpdateHandler<teloxide::RequestError> {
    Update::filter_message().endpoint(|msg: Message| async move {
        tracing::trace!(
            chat_id = msg.chat.id.0,
            message_id = msg.id.0,
            "Update passed through"
        );
        Ok(())
    })
}

/// Bot API sessions cannot message themselves or each other.
fn ensure_reachable(recipient: ChatId, sessions: &[UserId]) -> Result<(), BotError> {
    if sessions.iter().any(|&id| ChatId::from(id) == recipient) {
        return Err(BotError::ConfigInvalid(format!(
            "telegram.owner {} is one of the bot sessions; set it to a user account",
            recipient.0
        )));
    }
    Ok(())
}

/// Returns whether the dispatcher was running and will now wind down.
fn request_stop(token: &ShutdownToken) -> bool {
    match token.shutdown() {
        Ok(_) => true,
        Err(_) => {
            tracing::debug!("Dispatcher was idle, nothing to stop");
            false
        }
    }
}

fn make_bot(token: &str, api_address: Option<&str>) -> anyhow::Result<Bot> {
    let bot = Bot::new(token);
    let Some(address) = api_address else {
        return Ok(bot);
    };
    let url = address.parse().map_err(|e| {
        BotError::ConfigInvalid(format!("Invalid telegram.api_address {address}: {e}"))
    })?;
    Ok(bot.set_api_url(url))
}

async fn start_session(session: &'static str, bot: &Bot) -> Result<Me, BotError> {
    let me = bot
        .get_me()
        .await
        .map_err(|source| BotError::SessionStart { session, source })?;
    tracing::info!(session, user_id = me.user.id.0, "Session started");
    Ok(me)
}

async fn report_stopped<O: Outbox>(handler: &WatchHandler<O>) {
    let (outbound, lines) = handler
        .notifier()
        .inspect(|state| (state.outbound(), state.pending_lines().len()))
        .await;
    tracing::info!(
        last_message_id = outbound.map(|id| id.0),
        lines,
        "Stopped watcher and notifier sessions"
    );
}

fn spawn_signal_handler(cancel_token: CancellationToken) {
    tokio::spawn(async move {
        let ctrl_c = tokio::signal::ctrl_c();
        #[cfg(unix)]
        {
            let mut sigterm =
                match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
                    Ok(signal) => signal,
                    Err(e) => {
                        tracing::warn!("Failed to register SIGTERM handler: {e}");
                        if let Err(e) = ctrl_c.await {
                            tracing::warn!("Failed to listen for Ctrl+C: {e}");
                        }
                        cancel_token.cancel();
                        return;
                    }
                };
            tokio::select! {
                result = ctrl_c => {
                    if let Err(e) = result {
                        tracing::warn!("Failed to listen for Ctrl+C: {e}");
                    }
                    tracing::info!("Received SIGINT, shutting down...");
                }
                _ = sigterm.recv() => {
                    tracing::info!("Received SIGTERM, shutting down...");
                }
            }
        }
        #[cfg(not(unix))]
        {
            if let Err(e) = ctrl_c.await {
                tracing::warn!("Failed to listen for Ctrl+C: {e}");
            }
            tracing::info!("Received Ctrl+C, shutting down...");
        }
        cancel_token.cancel();
    });
}
