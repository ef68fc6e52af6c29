use axum::extract::ws::Message;
use axum_boot::middleware::ScopedSocket;
use axum_boot::prelude::*;

#[derive(Injectable)]
pub struct ChatController;

/// Logs connects and disconnects, trims every text message.
fn chat_log() -> impl WsMiddleware {
    from_ws_fn(|event: WsEvent, next: WsNext| async move {
        match event {
            WsEvent::Connect => {
                tracing::info!("chat client connected");
                next.run(WsEvent::Connect).await
            }
            WsEvent::Message(Message::Text(text)) => {
                let trimmed = text.as_str().trim().to_string();
                if trimmed.is_empty() {
                    return None;
                }
                next.run(WsEvent::Message(Message::Text(trimmed.into()))).await
            }
            other => {
                if let WsEvent::Close(_) = other {
                    tracing::info!("chat client left");
                }
                next.run(other).await
            }
        }
    })
}

async fn echo(_this: This<ChatController>, mut socket: ScopedSocket) {
    while let Some(Ok(message)) = socket.recv().await {
        if let Message::Close(_) = message {
            break;
        }
        if let Err(e) = socket.send(message).await {
            tracing::warn!(error = %e, "chat send failed");
            break;
        }
    }
}

pub fn declare(ctx: &BootContext) -> Result<()> {
    ctx.controller(
        Controller::<ChatController>::new("/ws")
            .use_ws_middleware(chat_log(), false)
            .websocket("/chat", echo),
    )?;
    Ok(())
}
