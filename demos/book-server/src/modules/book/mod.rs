mod controller;
mod model;
mod repository;
mod service;

pub use controller::{BookController, BookNotFound};
pub use model::Book;
pub use repository::{BookRepository, MemoryBookRepository};
pub use service::BookService;

use axum_boot::prelude::*;

pub const CLASSICS: &str = "四大名著";

/// Everything the book module contributes, declared from this file.
pub fn declare(ctx: &BootContext) -> Result<()> {
    ctx.bean(
        Bean::new(|_| {
            Ok(vec![
                Book::new("西游记", "吴承恩"),
                Book::new("水浒传", "施耐庵"),
                Book::new("三国演义", "罗贯中"),
                Book::new("红楼梦", "曹雪芹"),
            ])
        })
        .named(CLASSICS),
    )?;
    ctx.injectable::<MemoryBookRepository>()?;
    ctx.bind::<dyn BookRepository, MemoryBookRepository>(|repo| repo as Arc<dyn BookRepository>)?;
    ctx.injectable::<BookService>()?;
    ctx.controller(controller::routes())?;
    ctx.exception_handler(|missing: &BookNotFound| {
        BaseResp::<()>::error(404, format!("no book titled {}", missing.0))
    });
    Ok(())
}
