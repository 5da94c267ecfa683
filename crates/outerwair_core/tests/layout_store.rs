use outerwair_core::repo::keys;
use outerwair_core::service::layout_store::category_anchor;
use outerwair_core::{
    default_position, Category, ClothingItem, DisplayRect, DurableStore, ImageData, LayoutError,
    LayoutPosition, LayoutStore, MemoryStore, PointerPosition,
};
use std::collections::HashSet;
use std::sync::Arc;

const RECT: DisplayRect = DisplayRect::new(0.0, 0.0, 200.0, 400.0);

fn item(name: &str, category: Category) -> ClothingItem {
    ClothingItem::create(Some(ImageData::png(vec![1, 2, 3])), name, category).unwrap()
}

#[test]
fn three_shoes_get_distinct_symmetric_positions() {
    let positions: Vec<LayoutPosition> = (0..3)
        .map(|index| default_position(Category::Shoes, index, 3))
        .collect();

    assert_eq!(
        positions,
        vec![
            LayoutPosition::new(60.0, 88.0),
            LayoutPosition::new(72.0, 88.0),
            LayoutPosition::new(84.0, 88.0),
        ]
    );
    let anchor = category_anchor(Category::Shoes);
    let mean_left = positions.iter().map(|position| position.left).sum::<f64>() / 3.0;
    assert_eq!(mean_left, anchor.left);

    let again: Vec<LayoutPosition> = (0..3)
        .map(|index| default_position(Category::Shoes, index, 3))
        .collect();
    assert_eq!(positions, again);
}

#[test]
fn every_category_centers_a_single_item_on_its_anchor() {
    for category in Category::ALL {
        assert_eq!(default_position(category, 0, 1), category_anchor(category));
    }
}

#[test]
fn layout_for_counts_items_per_category() {
    let layout = LayoutStore::empty(Arc::new(MemoryStore::new()));
    let items = vec![
        item("Boot", Category::Shoes),
        item("Tee", Category::Tops),
        item("Sneaker", Category::Shoes),
    ];

    let positions = layout.layout_for(&items);
    assert_eq!(positions.len(), 3);
    assert_eq!(positions[0], (items[0].id(), LayoutPosition::new(66.0, 88.0)));
    assert_eq!(positions[1], (items[1].id(), category_anchor(Category::Tops)));
    assert_eq!(positions[2], (items[2].id(), LayoutPosition::new(78.0, 88.0)));

    let distinct: HashSet<(u64, u64)> = positions
        .iter()
        .map(|(_, position)| (position.left.to_bits(), position.top.to_bits()))
        .collect();
    assert_eq!(distinct.len(), 3);
}

#[test]
fn manual_override_wins_and_is_clamped() {
    let store = Arc::new(MemoryStore::new());
    let mut layout = LayoutStore::empty(store.clone());
    let jacket = item("Jacket", Category::Outerwear);

    let stored = layout.set_position(jacket.id(), LayoutPosition::new(120.0, -5.0));
    assert!(stored.is_durable());
    assert_eq!(stored.value, LayoutPosition::new(100.0, 0.0));
    assert_eq!(
        layout.position_for(jacket.id(), Category::Outerwear, 0, 1),
        LayoutPosition::new(100.0, 0.0)
    );
    assert!(store.contains_key(keys::LAYOUT));
}

#[test]
fn drag_keeps_grab_offset_and_persists_on_release() {
    let store = Arc::new(MemoryStore::new());
    let mut layout = LayoutStore::empty(store.clone());
    let tee = item("Tee", Category::Tops);

    // Marker at (45%, 40%), pointer grabbed it at (50%, 50%).
    layout
        .begin_drag(
            tee.id(),
            LayoutPosition::new(45.0, 40.0),
            PointerPosition::new(100.0, 200.0),
            RECT,
        )
        .unwrap();
    assert_eq!(layout.active_drag(), Some(tee.id()));

    let moved = layout
        .drag_to(PointerPosition::new(150.0, 100.0), RECT)
        .unwrap();
    assert_eq!(moved, LayoutPosition::new(70.0, 15.0));
    assert_eq!(layout.position_for(tee.id(), Category::Tops, 0, 1), moved);
    assert!(!store.contains_key(keys::LAYOUT), "moves must not write");

    let released = layout.end_drag().unwrap();
    assert!(released.is_durable());
    assert_eq!(released.value, (tee.id(), moved));
    assert_eq!(layout.active_drag(), None);

    let reloaded = LayoutStore::load(store);
    assert!(reloaded.storage_warning.is_none());
    assert_eq!(reloaded.value.manual_position(tee.id()), Some(moved));
}

#[test]
fn drag_outside_display_is_clamped() {
    let mut layout = LayoutStore::empty(Arc::new(MemoryStore::new()));
    let tee = item("Tee", Category::Tops);
    layout
        .begin_drag(
            tee.id(),
            LayoutPosition::new(50.0, 50.0),
            PointerPosition::new(100.0, 200.0),
            RECT,
        )
        .unwrap();

    let moved = layout
        .drag_to(PointerPosition::new(-500.0, 9000.0), RECT)
        .unwrap();
    assert_eq!(moved, LayoutPosition::new(0.0, 100.0));
}

#[test]
fn only_one_marker_can_be_dragged() {
    let mut layout = LayoutStore::empty(Arc::new(MemoryStore::new()));
    let first = item("First", Category::Tops);
    let second = item("Second", Category::Tops);
    let pointer = PointerPosition::new(10.0, 10.0);
    let at = LayoutPosition::new(5.0, 5.0);

    layout.begin_drag(first.id(), at, pointer, RECT).unwrap();
    assert_eq!(
        layout.begin_drag(second.id(), at, pointer, RECT),
        Err(LayoutError::DragInProgress(first.id()))
    );
    assert_eq!(layout.cancel_drag(), Some(first.id()));
    assert_eq!(layout.drag_to(pointer, RECT), Err(LayoutError::NoActiveDrag));
    assert!(layout.end_drag().is_err());
}

#[test]
fn unmoved_or_cancelled_drag_does_not_write() {
    let store = Arc::new(MemoryStore::new());
    let mut layout = LayoutStore::empty(store.clone());
    let tee = item("Tee", Category::Tops);
    let at = LayoutPosition::new(50.0, 15.0);

    layout
        .begin_drag(tee.id(), at, PointerPosition::new(100.0, 60.0), RECT)
        .unwrap();
    let released = layout.end_drag().unwrap();
    assert_eq!(released.value, (tee.id(), at));
    assert!(!store.contains_key(keys::LAYOUT));

    layout
        .begin_drag(tee.id(), at, PointerPosition::new(100.0, 60.0), RECT)
        .unwrap();
    layout
        .drag_to(PointerPosition::new(150.0, 100.0), RECT)
        .unwrap();
    layout.cancel_drag();
    assert_eq!(layout.position_for(tee.id(), Category::Tops, 0, 1), at);
    assert!(!store.contains_key(keys::LAYOUT));
}

#[test]
fn zero_area_display_rejects_drag() {
    let mut layout = LayoutStore::empty(Arc::new(MemoryStore::new()));
    let tee = item("Tee", Category::Tops);
    let result = layout.begin_drag(
        tee.id(),
        LayoutPosition::new(50.0, 50.0),
        PointerPosition::new(0.0, 0.0),
        DisplayRect::new(0.0, 0.0, 0.0, 300.0),
    );
    assert_eq!(result, Err(LayoutError::ZeroAreaDisplay));
    assert_eq!(layout.active_drag(), None);
}

#[test]
fn forget_and_clear_drop_overrides() {
    let store = Arc::new(MemoryStore::new());
    let mut layout = LayoutStore::empty(store.clone());
    let a = item("A", Category::Tops);
    let b = item("B", Category::Bottoms);
    layout.set_position(a.id(), LayoutPosition::new(10.0, 10.0));
    layout.set_position(b.id(), LayoutPosition::new(20.0, 20.0));

    assert!(layout.forget(a.id()).value);
    assert!(!layout.forget(a.id()).value);
    assert_eq!(layout.manual_position(a.id()), None);

    let cleared = layout.clear();
    assert_eq!(cleared.value, 1);
    assert_eq!(layout.override_count(), 0);
    assert!(!store.contains_key(keys::LAYOUT));
}

#[test]
fn malformed_positions_load_as_defaults_with_warning() {
    let store = Arc::new(MemoryStore::new());
    store.save(keys::LAYOUT, "[1, 2").unwrap();

    let loaded = LayoutStore::load(store);
    assert_eq!(loaded.value.override_count(), 0);
    assert!(loaded.storage_warning.is_some());
}

#[test]
fn one_undecodable_override_does_not_discard_the_others() {
    let store = Arc::new(MemoryStore::new());
    let mut layout = LayoutStore::empty(store.clone());
    let a = item("A", Category::Tops);
    let b = item("B", Category::Shoes);
    layout.set_position(a.id(), LayoutPosition::new(10.0, 20.0));
    layout.set_position(b.id(), LayoutPosition::new(30.0, 40.0));

    let stored = store.load(keys::LAYOUT).unwrap().unwrap();
    let mut entries: serde_json::Map<String, serde_json::Value> =
        serde_json::from_str(&stored).unwrap();
    entries.insert(b.id().to_string(), serde_json::json!({ "left": "far" }));
    entries.insert("not-a-uuid".to_string(), serde_json::json!({ "left": 1.0, "top": 2.0 }));
    store
        .save(keys::LAYOUT, &serde_json::to_string(&entries).unwrap())
        .unwrap();

    let loaded = LayoutStore::load(store);
    assert!(loaded.storage_warning.is_none());
    assert_eq!(loaded.value.override_count(), 1);
    assert_eq!(
        loaded.value.manual_position(a.id()),
        Some(LayoutPosition::new(10.0, 20.0))
    );
    assert_eq!(loaded.value.manual_position(b.id()), None);
}
