use std::collections::HashMap;
use std::sync::Arc;

use crate::behavior::Behavior;

/// Error building a catalog.
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("duplicate behavior id: {0}")]
    DuplicateId(String),
    #[error("behavior with empty id")]
    EmptyId,
}

/// Fixed list of behaviors available to the scheduler.
///
/// The catalog is assembled once at startup from an explicit registration
/// list — there is no runtime discovery. Iteration order is registration
/// order, which keeps menu listings stable.
pub struct BehaviorCatalog {
    entries: Vec<Arc<dyn Behavior>>,
    by_id: HashMap<String, usize>,
}

impl std::fmt::Debug for BehaviorCatalog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BehaviorCatalog")
            .field(
                "entries",
                &self.entries.iter().map(|b| b.id()).collect::<Vec<_>>(),
            )
            .field("by_id", &self.by_id)
            .finish()
    }
}

impl BehaviorCatalog {
    pub fn new(behaviors: Vec<Arc<dyn Behavior>>) -> Result<Self, CatalogError> {
        let mut by_id = HashMap::with_capacity(behaviors.len());
        for (idx, b) in behaviors.iter().enumerate() {
            let id = b.id();
            if id.is_empty() {
                return Err(CatalogError::EmptyId);
            }
            if by_id.insert(id.to_owned(), idx).is_some() {
                return Err(CatalogError::DuplicateId(id.to_owned()));
            }
        }
        Ok(Self {
            entries: behaviors,
            by_id,
        })
    }

    pub fn get(&self, id: &str) -> Option<&Arc<dyn Behavior>> {
        self.by_id.get(id).map(|&idx| &self.entries[idx])
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn Behavior>> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// `(id, display_name)` pairs in registration order, for menus.
    pub fn listing(&self) -> Vec<(String, String)> {
        self.entries
            .iter()
            .map(|b| (b.id().to_owned(), b.display_name().to_owned()))
            .collect()
    }
}
