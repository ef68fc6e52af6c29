use super::model::Book;
use super::repository::BookRepository;
use axum_boot::prelude::*;

#[derive(Injectable)]
pub struct BookService {
    repository: Arc<dyn BookRepository>,
}

impl BookService {
    pub fn list(&self) -> Vec<Book> {
        self.repository.find_all()
    }

    pub fn get(&self, title: &str) -> Option<Book> {
        self.repository.find_by_title(title)
    }

    pub fn create(&self, book: Book) -> Result<Book> {
        self.repository.save(book.clone())?;
        Ok(book)
    }

    /// Only books added at runtime can be removed; the classics stay.
    pub fn remove(&self, title: &str) -> bool {
        self.repository.delete(title)
    }
}
