use async_trait::async_trait;
use axum::extract::ws::{CloseFrame, Message, WebSocket};
use futures::future::BoxFuture;
use std::future::Future;
use std::sync::Arc;

/// What a WebSocket middleware sees.
#[derive(Debug, Clone, PartialEq)]
pub enum WsEvent {
    Connect,
    Message(Message),
    Close(Option<CloseFrame>),
}

/// The rest of the WebSocket chain. Returning `None` drops the event.
pub struct WsNext {
    run: Box<dyn FnOnce(WsEvent) -> BoxFuture<'static, Option<WsEvent>> + Send>,
}

impl WsNext {
    fn new<F>(f: F) -> Self
    where
        F: FnOnce(WsEvent) -> BoxFuture<'static, Option<WsEvent>> + Send + 'static,
    {
        Self { run: Box::new(f) }
    }

    pub async fn run(self, event: WsEvent) -> Option<WsEvent> {
        (self.run)(event).await
    }
}

#[async_trait]
pub trait WsMiddleware: Send + Sync + 'static {
    async fn dispatch(&self, event: WsEvent, next: WsNext) -> Option<WsEvent>;
}

pub struct WsFnMiddleware<F>(F);

pub fn from_ws_fn<F, Fut>(f: F) -> WsFnMiddleware<F>
where
    F: Fn(WsEvent, WsNext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Option<WsEvent>> + Send + 'static,
{
    WsFnMiddleware(f)
}

#[async_trait]
impl<F, Fut> WsMiddleware for WsFnMiddleware<F>
where
    F: Fn(WsEvent, WsNext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Option<WsEvent>> + Send + 'static,
{
    async fn dispatch(&self, event: WsEvent, next: WsNext) -> Option<WsEvent> {
        (self.0)(event, next).await
    }
}

/// Composed WebSocket middleware of one scope.
#[derive(Clone, Default)]
pub struct WsChain {
    middleware: Arc<[Arc<dyn WsMiddleware>]>,
    only_message: bool,
}

impl WsChain {
    pub fn new(middleware: Vec<Arc<dyn WsMiddleware>>, only_message: bool) -> Self {
        Self {
            middleware: middleware.into(),
            only_message,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.middleware.is_empty()
    }

    pub fn only_message(&self) -> bool {
        self.only_message
    }

    /// Same onion order as HTTP: the last declared middleware sees the event first.
    pub async fn run(&self, event: WsEvent) -> Option<WsEvent> {
        if self.middleware.is_empty() {
            return Some(event);
        }
        let innermost = WsNext::new(|event| Box::pin(async move { Some(event) }));
        let next = self.middleware.iter().fold(innermost, |next, middleware| {
            let middleware = Arc::clone(middleware);
            WsNext::new(move |event| Box::pin(async move { middleware.dispatch(event, next).await }))
        });
        next.run(event).await
    }
}

/// A WebSocket whose receive path runs the scope's WebSocket middleware.
pub struct ScopedSocket {
    socket: WebSocket,
    chain: WsChain,
    closed: bool,
}

impl ScopedSocket {
    /// Runs the connect event unless the chain only sees messages. A chain that turns the
    /// connect into a close refuses the connection.
    pub async fn accept(mut socket: WebSocket, chain: WsChain) -> Option<Self> {
        if !chain.only_message {
            if let Some(WsEvent::Close(frame)) = chain.run(WsEvent::Connect).await {
                if let Err(err) = socket.send(Message::Close(frame)).await {
                    tracing::debug!(error = %err, "failed to send close frame");
                }
                return None;
            }
        }
        Some(Self {
            socket,
            chain,
            closed: false,
        })
    }

    /// Next message after middleware. Dropped messages are skipped; pings and pongs
    /// bypass the chain.
    pub async fn recv(&mut self) -> Option<Result<Message, axum::Error>> {
        loop {
            let message = match self.socket.recv().await {
                Some(Ok(message)) => message,
                Some(Err(err)) => return Some(Err(err)),
                None => {
                    self.on_close(None).await;
                    return None;
                }
            };
            match message {
                Message::Text(_) | Message::Binary(_) => {
                    match self.chain.run(WsEvent::Message(message)).await {
                        Some(WsEvent::Message(message)) => return Some(Ok(message)),
                        Some(WsEvent::Close(frame)) => return Some(Ok(Message::Close(frame))),
                        Some(WsEvent::Connect) | None => continue,
                    }
                }
                Message::Close(frame) => {
                    self.on_close(frame.clone()).await;
                    return Some(Ok(Message::Close(frame)));
                }
                other => return Some(Ok(other)),
            }
        }
    }

    pub async fn send(&mut self, message: Message) -> Result<(), axum::Error> {
        self.socket.send(message).await
    }

    pub fn into_inner(self) -> WebSocket {
        self.socket
    }

    async fn on_close(&mut self, frame: Option<CloseFrame>) {
        if self.closed {
            return;
        }
        self.closed = true;
        if !self.chain.only_message {
            self.chain.run(WsEvent::Close(frame)).await;
        }
    }
}
