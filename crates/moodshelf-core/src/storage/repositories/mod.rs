mod content_repository;

pub use content_repository::{ContentRepository, SqliteContentRepository};

use crate::error::Result;

pub trait Repository {
    type Entity;
    type Id;

    fn find_by_id(&self, id: &Self::Id) -> Result<Option<Self::Entity>>;
    /// Insert a new entity and return the id the store assigned to it.
    fn insert(&self, entity: &Self::Entity) -> Result<Self::Id>;
    fn delete(&self, id: &Self::Id) -> Result<bool>;
}
