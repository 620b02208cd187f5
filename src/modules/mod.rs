pub mod books;

use std::sync::Arc;

use shelf_db::Db;
use shelf_kernel::{ModuleRegistry, Settings};

/// Register all project-specific modules with the registry
pub fn register_all(registry: &mut ModuleRegistry, db: &Db, settings: &Settings) {
    let store = books::store::MongoBookStore::new(db, &settings.database.collection);
    registry.register_custom(books::create_module(Arc::new(store)));
}
