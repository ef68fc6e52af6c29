use super::model::Book;
use axum_boot::prelude::*;
use axum_boot::sql::{Dialect, SqlTemplate};
use serde_json::json;
use std::sync::RwLock;

pub trait BookRepository: Send + Sync {
    fn find_all(&self) -> Vec<Book>;
    fn find_by_title(&self, title: &str) -> Option<Book>;
    fn save(&self, book: Book) -> Result<()>;
    fn delete(&self, title: &str) -> bool;
}

/// In-memory store seeded with the classics. Statements are rendered as they would be
/// sent to a database and logged instead of executed.
#[derive(Injectable)]
pub struct MemoryBookRepository {
    #[inject(name = "四大名著")]
    seed: Arc<Vec<Book>>,
    #[inject(default)]
    extra: RwLock<Vec<Book>>,
}

impl MemoryBookRepository {
    fn trace_statement(&self, template: &str, values: serde_json::Value) {
        let bound = SqlTemplate::parse(template)
            .and_then(|sql| sql.fill(false, [("table", "book")]))
            .and_then(|sql| match values.as_object() {
                Some(values) => sql.bind(Dialect::Postgres, values),
                None => Err(BootError::Sql("statement values must be an object".to_string())),
            });
        match bound {
            Ok(statement) => {
                tracing::debug!(sql = %statement.sql, params = ?statement.params, "statement")
            }
            Err(e) => tracing::warn!(error = %e, "cannot render statement"),
        }
    }
}

impl BookRepository for MemoryBookRepository {
    fn find_all(&self) -> Vec<Book> {
        self.trace_statement("SELECT * FROM {table}", json!({}));
        let extra = self.extra.read().map(|b| b.clone()).unwrap_or_default();
        self.seed.iter().cloned().chain(extra).collect()
    }

    fn find_by_title(&self, title: &str) -> Option<Book> {
        self.trace_statement(
            "SELECT * FROM {table} WHERE title = {title}",
            json!({ "title": title }),
        );
        self.find_all().into_iter().find(|book| book.title == title)
    }

    fn save(&self, book: Book) -> Result<()> {
        self.trace_statement(
            "INSERT INTO {table} (title, author) VALUES ({book.title}, {book.author})",
            json!({ "book": book }),
        );
        self.extra
            .write()
            .map_err(|_| BootError::Internal("book store poisoned".to_string()))?
            .push(book);
        Ok(())
    }

    fn delete(&self, title: &str) -> bool {
        self.trace_statement(
            "DELETE FROM {table} WHERE title = {title}",
            json!({ "title": title }),
        );
        let Ok(mut extra) = self.extra.write() else {
            return false;
        };
        let before = extra.len();
        extra.retain(|book| book.title != title);
        extra.len() != before
    }
}
