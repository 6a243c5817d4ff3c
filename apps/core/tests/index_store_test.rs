use std::time::{SystemTime, UNIX_EPOCH};

use steamcount_core::model::{Catalog, CatalogEntry};

fn sample_catalog() -> Catalog {
    Catalog::new(vec![
        CatalogEntry::new(620, "Portal 2"),
        CatalogEntry::new(400, "Portal"),
        CatalogEntry::new(400, "Portal"),
        CatalogEntry::new(10, "Counter-Strike"),
    ])
}

#[test]
fn empty_cache_loads_as_none() {
    let db = steamcount_core::index_store::open_memory().unwrap();
    assert!(steamcount_core::index_store::load_catalog(&db).unwrap().is_none());
    assert_eq!(steamcount_core::index_store::cached_entry_count(&db).unwrap(), 0);
}

#[test]
fn replace_preserves_order_and_duplicates() {
    let mut db = steamcount_core::index_store::open_memory().unwrap();
    let catalog = sample_catalog();

    let written = steamcount_core::index_store::replace_catalog(&mut db, &catalog).unwrap();
    let loaded = steamcount_core::index_store::load_catalog(&db).unwrap().unwrap();

    assert_eq!(written, 4);
    assert_eq!(loaded, catalog);
    assert_eq!(loaded.entries()[0].normalized_name(), "portal 2");
}

#[test]
fn replace_discards_previous_entries() {
    let mut db = steamcount_core::index_store::open_memory().unwrap();
    steamcount_core::index_store::replace_catalog(&mut db, &sample_catalog()).unwrap();

    let smaller = Catalog::new(vec![CatalogEntry::new(367520, "Hollow Knight")]);
    steamcount_core::index_store::replace_catalog(&mut db, &smaller).unwrap();

    assert_eq!(steamcount_core::index_store::cached_entry_count(&db).unwrap(), 1);
    assert_eq!(
        steamcount_core::index_store::load_catalog(&db).unwrap(),
        Some(smaller)
    );
}

#[test]
fn persists_catalog_across_reopen() {
    let unique = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    let db_path = std::env::temp_dir()
        .join("steamcount")
        .join(format!("persist-test-{unique}.sqlite3"));

    {
        let mut db = steamcount_core::index_store::open_file(&db_path).unwrap();
        steamcount_core::index_store::replace_catalog(&mut db, &sample_catalog()).unwrap();
    }

    let reopened = steamcount_core::index_store::open_file(&db_path).unwrap();
    let loaded = steamcount_core::index_store::load_catalog(&reopened)
        .unwrap()
        .unwrap();

    assert_eq!(loaded.len(), 4);
    assert_eq!(loaded.entries()[3].name, "Counter-Strike");

    drop(reopened);
    std::fs::remove_file(&db_path).unwrap();
}
