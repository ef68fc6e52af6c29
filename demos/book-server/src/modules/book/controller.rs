use super::model::Book;
use super::service::BookService;
use axum::http::HeaderMap;
use axum_boot::prelude::*;

#[derive(Injectable)]
pub struct BookController {
    service: Arc<BookService>,
}

fn user_agent() -> UseDep {
    UseDep::from_fn(|headers: HeaderMap| async move {
        Ok::<_, StatusCode>(
            headers
                .get("user-agent")
                .and_then(|v| v.to_str().ok())
                .unwrap_or("unknown")
                .to_string(),
        )
    })
}

async fn list(this: This<BookController>) -> Result<BaseResp<Vec<Book>>> {
    let agent = this.dep::<String>("ua")?;
    tracing::debug!(%agent, "listing books");
    Ok(BaseResp::ok(this.service.list()))
}

/// Unknown title; mapped to a 404 envelope by the module's exception handler.
#[derive(Debug)]
pub struct BookNotFound(pub String);

async fn get_one(
    this: This<BookController>,
    Path(title): Path<String>,
) -> std::result::Result<BaseResp<Book>, Raised<BookNotFound>> {
    let book = this.service.get(&title).ok_or(BookNotFound(title))?;
    Ok(BaseResp::ok(book))
}

async fn create(this: This<BookController>, Json(book): Json<Book>) -> Result<BaseResp<Book>> {
    let book = this.service.create(book)?;
    Ok(BaseResp::ok(book).with_msg("created"))
}

async fn remove(Inject(service): Inject<BookService>, Path(title): Path<String>) -> BaseResp<()> {
    if service.remove(&title) {
        BaseResp::ok(())
    } else {
        BaseResp::error(404, format!("cannot remove {title}"))
    }
}

pub(super) fn routes() -> Controller<BookController> {
    Controller::<BookController>::new("/book")
        .use_dep("ua", user_agent())
        .use_http_middleware(LoggingMiddleware)
        .get("", list)
        .post("", create)
        .get("/{title}", get_one)
        .nest(Prefix::<()>::new("/admin").delete("/{title}", remove))
}
