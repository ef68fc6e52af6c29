mod support;

use axum::extract::ws::{CloseFrame, Message};
use axum_boot::middleware::ScopedSocket;
use axum_boot::prelude::*;
use futures::{SinkExt, StreamExt};
use std::sync::Mutex;
use std::time::Duration;
use support::context;
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::tungstenite::Message as Frame;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

#[derive(Default)]
struct Events(Mutex<Vec<String>>);

impl Events {
    fn push(&self, event: impl Into<String>) {
        self.0.lock().unwrap().push(event.into());
    }

    fn snapshot(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }
}

#[derive(Injectable)]
struct EchoController {
    events: Arc<Events>,
}

/// Echoes data frames, answers pings with a text frame so the client can tell they got
/// through, and records when it returns.
async fn echo(this: This<EchoController>, mut socket: ScopedSocket) {
    while let Some(Ok(message)) = socket.recv().await {
        let reply = match message {
            Message::Text(_) | Message::Binary(_) => message,
            Message::Ping(_) => Message::Text("pinged".into()),
            Message::Close(_) => break,
            Message::Pong(_) => continue,
        };
        if socket.send(reply).await.is_err() {
            break;
        }
    }
    this.events.push("handler-done");
}

/// Records every event it sees, drops the text `drop` and upper-cases the rest.
fn auditing(events: &Arc<Events>) -> impl WsMiddleware {
    let events = Arc::clone(events);
    from_ws_fn(move |event: WsEvent, next: WsNext| {
        let events = Arc::clone(&events);
        async move {
            match event {
                WsEvent::Connect => {
                    events.push("connect");
                    next.run(WsEvent::Connect).await
                }
                close @ WsEvent::Close(_) => {
                    events.push("close");
                    next.run(close).await
                }
                WsEvent::Message(Message::Text(text)) => {
                    events.push(format!("message:{}", text.as_str()));
                    if text.as_str() == "drop" {
                        return None;
                    }
                    let upper = text.as_str().to_uppercase();
                    next.run(WsEvent::Message(Message::Text(upper.into()))).await
                }
                other => next.run(other).await,
            }
        }
    })
}

fn refusing() -> impl WsMiddleware {
    from_ws_fn(|event: WsEvent, next: WsNext| async move {
        match event {
            WsEvent::Connect => Some(WsEvent::Close(Some(CloseFrame {
                code: 4001,
                reason: "refused".into(),
            }))),
            other => next.run(other).await,
        }
    })
}

async fn serve(ctx: &BootContext) -> String {
    let app = provide_app(ctx, None, &[]).unwrap();
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("ws://{addr}")
}

fn echo_context(events: &Arc<Events>) -> BootContext {
    context(true)
        .register_arc(None, Arc::clone(events))
        .build()
        .unwrap()
}

async fn next_text(client: &mut Client) -> String {
    loop {
        match client.next().await {
            Some(Ok(Frame::Text(text))) => return text.as_str().to_string(),
            Some(Ok(_)) => continue,
            other => panic!("socket ended before a text frame: {other:?}"),
        }
    }
}

/// Exchanges hello, a dropped frame, a ping and bye, then closes.
async fn converse(base: &str) {
    let (mut client, _) = tokio_tungstenite::connect_async(format!("{base}/echo"))
        .await
        .unwrap();
    client.send(Frame::text("hello")).await.unwrap();
    assert_eq!(next_text(&mut client).await, "HELLO");

    // Nothing comes back for the dropped frame; the ping reply is next.
    client.send(Frame::text("drop")).await.unwrap();
    client.send(Frame::Ping(vec![1, 2, 3].into())).await.unwrap();
    assert_eq!(next_text(&mut client).await, "pinged");

    client.send(Frame::text("bye")).await.unwrap();
    assert_eq!(next_text(&mut client).await, "BYE");
    client.close(None).await.unwrap();
}

async fn settled(events: &Events) -> Vec<String> {
    for _ in 0..200 {
        let seen = events.snapshot();
        if seen.iter().any(|event| event == "handler-done") {
            return seen;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("handler did not finish: {:?}", events.snapshot());
}

#[tokio::test]
async fn chain_sees_connect_messages_and_close() {
    let events = Arc::new(Events::default());
    let ctx = echo_context(&events);
    ctx.controller(
        Controller::<EchoController>::new("/echo")
            .use_ws_middleware(auditing(&events), false)
            .websocket("", echo),
    )
    .unwrap();
    let base = serve(&ctx).await;

    converse(&base).await;
    assert_eq!(
        settled(&events).await,
        vec![
            "connect",
            "message:hello",
            "message:drop",
            "message:bye",
            "close",
            "handler-done",
        ]
    );
}

#[tokio::test]
async fn only_message_chain_skips_connect_and_close() {
    let events = Arc::new(Events::default());
    let ctx = echo_context(&events);
    ctx.controller(
        Controller::<EchoController>::new("/echo")
            .use_ws_middleware(auditing(&events), true)
            .websocket("", echo),
    )
    .unwrap();
    let base = serve(&ctx).await;

    converse(&base).await;
    assert_eq!(
        settled(&events).await,
        vec!["message:hello", "message:drop", "message:bye", "handler-done"]
    );
}

#[tokio::test]
async fn connect_rewritten_to_close_refuses_the_socket() {
    let events = Arc::new(Events::default());
    let ctx = echo_context(&events);
    ctx.controller(
        Controller::<EchoController>::new("/echo")
            .use_ws_middleware(refusing(), false)
            .websocket("", echo),
    )
    .unwrap();
    let base = serve(&ctx).await;

    let (mut client, _) = tokio_tungstenite::connect_async(format!("{base}/echo"))
        .await
        .unwrap();
    match client.next().await {
        Some(Ok(Frame::Close(Some(frame)))) => {
            assert_eq!(u16::from(frame.code), 4001);
            assert_eq!(frame.reason.as_str(), "refused");
        }
        other => panic!("expected a close frame, got {other:?}"),
    }
    assert!(events.snapshot().is_empty());
}
