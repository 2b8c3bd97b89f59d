//! Telegram endpoints. Each one turns an update into a flow [`Event`] and delivers the replies.
use crate::state::AppState;
use capitulo_core::flow::action::Action;
use capitulo_core::flow::reply::{Delivery, Reply};
use capitulo_core::flow::{Command, Event, EventKind, Sender, views};
use std::sync::Arc;
use teloxide::prelude::*;
use teloxide::types::{InlineKeyboardButton, InlineKeyboardMarkup, MessageId, User};
use teloxide::utils::command::BotCommands;
use tracing::{info, instrument, warn};

#[derive(BotCommands, Clone, Copy, Debug, PartialEq, Eq)]
#[command(rename_rule = "lowercase", description = "Comandos disponibles:")]
pub enum BotCommand {
    #[command(description = "mostrar el menú principal")]
    Start,
    #[command(description = "ver tu biblioteca")]
    Biblioteca,
}

impl From<BotCommand> for Command {
    fn from(command: BotCommand) -> Self {
        match command {
            BotCommand::Start => Self::Start,
            BotCommand::Biblioteca => Self::Library,
        }
    }
}

fn sender_of(user: &User) -> Option<Sender> {
    to_sender(user.id.0, user.username.as_deref(), &user.first_name)
}

fn to_sender(id: u64, username: Option<&str>, first_name: &str) -> Option<Sender> {
    Some(Sender {
        id: i64::try_from(id).ok()?,
        username: username.map(ToOwned::to_owned),
        first_name: first_name.to_owned(),
    })
}

/// Inline keyboard for `reply`, or `None` when it has no buttons.
fn keyboard(reply: &Reply) -> Option<InlineKeyboardMarkup> {
    if reply.keyboard.is_empty() {
        return None;
    }
    let rows = reply.keyboard.iter().map(|row| {
        row.iter()
            .map(|button| {
                InlineKeyboardButton::callback(button.label.clone(), button.action.to_string())
            })
            .collect::<Vec<_>>()
    });
    Some(InlineKeyboardMarkup::new(rows))
}

async fn send(bot: &Bot, chat_id: ChatId, reply: &Reply) -> anyhow::Result<()> {
    let request = bot.send_message(chat_id, reply.text.clone());
    match keyboard(reply) {
        Some(markup) => request.reply_markup(markup).await?,
        None => request.await?,
    };
    Ok(())
}

/// Delivers replies in order. `pressed` is the message whose button triggered them, if any.
async fn deliver(
    bot: &Bot,
    chat_id: ChatId,
    pressed: Option<MessageId>,
    replies: &[Reply],
) -> anyhow::Result<()> {
    for reply in replies {
        match (reply.delivery, pressed) {
            (Delivery::Edit, Some(message_id)) => {
                let request = bot.edit_message_text(chat_id, message_id, reply.text.clone());
                let edited = match keyboard(reply) {
                    Some(markup) => request.reply_markup(markup).await,
                    None => request.await,
                };
                if let Err(err) = edited {
                    warn!(%err, "editing failed, sending a new message instead");
                    send(bot, chat_id, reply).await?;
                }
            }
            (Delivery::Edit | Delivery::Send, _) => send(bot, chat_id, reply).await?,
        }
    }
    Ok(())
}

/// Runs `event` through the flow controller. Unexpected failures become a generic apology.
async fn run_flow(state: &AppState, event: &Event) -> Vec<Reply> {
    match state.flow.handle(event).await {
        Ok(replies) => {
            info!(replies = replies.len(), "event handled");
            replies
        }
        Err(err) => {
            tracing::error!(%err, "event failed");
            vec![views::unexpected_failure()]
        }
    }
}

#[instrument(skip_all, fields(user = msg.from().map(|user| user.id.0), ?command))]
pub async fn on_command(
    bot: Bot,
    msg: Message,
    command: BotCommand,
    state: Arc<AppState>,
) -> anyhow::Result<()> {
    let Some(sender) = msg.from().and_then(sender_of) else {
        return Ok(());
    };
    let event = Event {
        sender,
        kind: EventKind::Command(command.into()),
    };
    let replies = run_flow(&state, &event).await;
    deliver(&bot, msg.chat.id, None, &replies).await
}

#[instrument(skip_all, fields(user = msg.from().map(|user| user.id.0)))]
pub async fn on_text(bot: Bot, msg: Message, state: Arc<AppState>) -> anyhow::Result<()> {
    let Some(text) = msg.text() else {
        return Ok(());
    };
    // unknown commands
    if text.starts_with('/') {
        return Ok(());
    }
    let Some(sender) = msg.from().and_then(sender_of) else {
        return Ok(());
    };
    let event = Event {
        sender,
        kind: EventKind::Text(text.to_owned()),
    };
    let replies = run_flow(&state, &event).await;
    deliver(&bot, msg.chat.id, None, &replies).await
}

#[instrument(skip_all, fields(user = q.from.id.0, data = q.data.as_deref()))]
pub async fn on_callback(bot: Bot, q: CallbackQuery, state: Arc<AppState>) -> anyhow::Result<()> {
    bot.answer_callback_query(q.id.clone()).await?;

    let Some(data) = q.data.as_deref() else {
        return Ok(());
    };
    let action = match data.parse::<Action>() {
        Ok(action) => action,
        Err(err) => {
            warn!(%err, "ignoring button press");
            return Ok(());
        }
    };
    let Some(sender) = sender_of(&q.from) else {
        return Ok(());
    };

    let (chat_id, pressed) = match &q.message {
        Some(message) => (message.chat.id, Some(message.id)),
        None => (ChatId::from(q.from.id), None),
    };
    let event = Event {
        sender,
        kind: EventKind::Callback(action),
    };
    let replies = run_flow(&state, &event).await;
    deliver(&bot, chat_id, pressed, &replies).await
}
