use outerwair_core::repo::keys;
use outerwair_core::{
    CatalogError, CatalogStore, Category, CategoryFilter, DurableStore, ImageData, MemoryStore,
    SqliteStore, ValidationError,
};
use std::sync::Arc;

fn image(byte: u8) -> ImageData {
    ImageData::png(vec![byte; 16])
}

fn names(catalog: &CatalogStore, filter: CategoryFilter) -> Vec<String> {
    catalog
        .list(filter)
        .into_iter()
        .map(|item| item.name().to_string())
        .collect()
}

#[test]
fn add_lists_in_insertion_order_and_filters_by_category() {
    let store = Arc::new(MemoryStore::new());
    let mut catalog = CatalogStore::empty(store);

    catalog.add(Some(image(1)), "White Tee", Category::Tops).unwrap();
    catalog.add(Some(image(2)), "Sneakers", Category::Shoes).unwrap();
    catalog.add(Some(image(3)), "Hoodie", Category::Tops).unwrap();

    assert_eq!(
        names(&catalog, CategoryFilter::All),
        vec!["White Tee", "Sneakers", "Hoodie"]
    );
    assert_eq!(
        names(&catalog, CategoryFilter::Only(Category::Tops)),
        vec!["White Tee", "Hoodie"]
    );
    assert!(catalog.list(CategoryFilter::Only(Category::Bottoms)).is_empty());
    assert_eq!(catalog.count_in(Category::Shoes), 1);
}

#[test]
fn add_rejects_blank_name_and_missing_image() {
    let store = Arc::new(MemoryStore::new());
    let mut catalog = CatalogStore::empty(store.clone());

    let err = catalog.add(Some(image(1)), "   ", Category::Tops).unwrap_err();
    assert_eq!(err, CatalogError::Validation(ValidationError::EmptyName));
    let err = catalog.add(None, "Jacket", Category::Outerwear).unwrap_err();
    assert_eq!(err, CatalogError::Validation(ValidationError::MissingImage));

    assert!(catalog.is_empty());
    assert!(!store.contains_key(keys::CATALOG));
}

#[test]
fn catalog_survives_reload_from_sqlite() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("catalog.db");

    let saved_id = {
        let store = Arc::new(SqliteStore::open(&path, Default::default()).unwrap());
        let mut catalog = CatalogStore::empty(store);
        let outcome = catalog
            .add(Some(image(7)), "  Denim Jacket ", Category::Outerwear)
            .unwrap();
        assert!(outcome.is_durable());
        outcome.value.id()
    };

    let store = Arc::new(SqliteStore::open(&path, Default::default()).unwrap());
    let loaded = CatalogStore::load(store);
    assert!(loaded.storage_warning.is_none());
    let item = loaded.value.get(saved_id).unwrap();
    assert_eq!(item.name(), "Denim Jacket");
    assert_eq!(item.category(), Category::Outerwear);
    assert_eq!(item.image(), &image(7));
}

#[test]
fn quota_failure_keeps_item_in_memory_and_reports_warning() {
    let store = Arc::new(MemoryStore::with_capacity(256));
    let mut catalog = CatalogStore::empty(store.clone());

    let small = catalog.add(Some(image(1)), "Cap", Category::Accessories).unwrap();
    assert!(small.is_durable());

    let large = ImageData::png(vec![9; 4096]);
    let outcome = catalog.add(Some(large), "Coat", Category::Outerwear).unwrap();
    let warning = outcome.storage_warning.clone().unwrap();
    assert!(warning.is_quota_exceeded());

    assert_eq!(catalog.len(), 2);
    assert!(catalog.contains(outcome.value.id()));

    // Durable copy still holds the last successful write.
    let reloaded = CatalogStore::load(store);
    assert_eq!(names(&reloaded.value, CategoryFilter::All), vec!["Cap"]);
}

#[test]
fn remove_persists_and_ignores_unknown_ids() {
    let store = Arc::new(MemoryStore::new());
    let mut catalog = CatalogStore::empty(store.clone());
    let keep = catalog.add(Some(image(1)), "Keep", Category::Tops).unwrap().value;
    let gone = catalog.add(Some(image(2)), "Drop", Category::Tops).unwrap().value;

    let removed = catalog.remove(gone.id());
    assert_eq!(removed.value.map(|item| item.id()), Some(gone.id()));

    let revision = catalog.revision();
    let absent = catalog.remove(gone.id());
    assert!(absent.value.is_none());
    assert_eq!(catalog.revision(), revision);

    let reloaded = CatalogStore::load(store).value;
    assert!(reloaded.contains(keep.id()));
    assert!(!reloaded.contains(gone.id()));
}

#[test]
fn clear_requires_current_confirmation() {
    let store = Arc::new(MemoryStore::new());
    let mut catalog = CatalogStore::empty(store.clone());

    assert_eq!(catalog.request_clear().unwrap_err(), CatalogError::Empty);

    catalog.add(Some(image(1)), "One", Category::Tops).unwrap();
    let stale = catalog.request_clear().unwrap();
    assert_eq!(stale.item_count(), 1);
    catalog.add(Some(image(2)), "Two", Category::Bottoms).unwrap();
    assert_eq!(
        catalog.clear_all(stale).unwrap_err(),
        CatalogError::StaleConfirmation
    );
    assert_eq!(catalog.len(), 2);

    let confirmation = catalog.request_clear().unwrap();
    let cleared = catalog.clear_all(confirmation).unwrap();
    assert_eq!(cleared.value.len(), 2);
    assert!(cleared.is_durable());
    assert!(catalog.is_empty());
    assert!(!store.contains_key(keys::CATALOG));
}

#[test]
fn malformed_catalog_loads_empty_with_warning() {
    let store = Arc::new(MemoryStore::new());
    store.save(keys::CATALOG, "{not json").unwrap();

    let loaded = CatalogStore::load(store);
    assert!(loaded.value.is_empty());
    assert_eq!(
        loaded.storage_warning.map(|err| err.code()),
        Some("storage_serialization_failed")
    );
}

#[test]
fn invalid_and_duplicate_records_are_dropped_on_load() {
    let store = Arc::new(MemoryStore::new());
    let mut catalog = CatalogStore::empty(store.clone());
    catalog.add(Some(image(1)), "Valid", Category::Tops).unwrap();
    let stored = store.load(keys::CATALOG).unwrap().unwrap();

    let mut records: Vec<serde_json::Value> = serde_json::from_str(&stored).unwrap();
    let duplicate = records[0].clone();
    let mut blank = records[0].clone();
    blank["id"] = serde_json::Value::String(uuid::Uuid::now_v7().to_string());
    blank["name"] = serde_json::Value::String("  ".to_string());
    records.push(duplicate);
    records.push(blank);
    store
        .save(keys::CATALOG, &serde_json::to_string(&records).unwrap())
        .unwrap();

    let loaded = CatalogStore::load(store);
    assert!(loaded.storage_warning.is_none());
    assert_eq!(names(&loaded.value, CategoryFilter::All), vec!["Valid"]);
}

#[test]
fn one_undecodable_record_does_not_discard_the_others() {
    let store = Arc::new(MemoryStore::new());
    let mut catalog = CatalogStore::empty(store.clone());
    catalog.add(Some(image(1)), "A", Category::Tops).unwrap();
    catalog.add(Some(image(2)), "B", Category::Tops).unwrap();
    catalog.add(Some(image(3)), "C", Category::Tops).unwrap();

    let stored = store.load(keys::CATALOG).unwrap().unwrap();
    let mut records: Vec<serde_json::Value> = serde_json::from_str(&stored).unwrap();
    records[1]["category"] = serde_json::Value::String("Hats".to_string());
    records.push(serde_json::json!({
        "id": "not-a-uuid",
        "name": "Broken",
        "category": "Tops",
        "image": "not-a-data-url",
    }));
    store
        .save(keys::CATALOG, &serde_json::to_string(&records).unwrap())
        .unwrap();

    let loaded = CatalogStore::load(store.clone());
    assert!(loaded.storage_warning.is_none());
    assert_eq!(names(&loaded.value, CategoryFilter::All), vec!["A", "C"]);

    let mut catalog = loaded.value;
    catalog.add(Some(image(4)), "D", Category::Shoes).unwrap();
    let reloaded = CatalogStore::load(store).value;
    assert_eq!(names(&reloaded, CategoryFilter::All), vec!["A", "C", "D"]);
}
