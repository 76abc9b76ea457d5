//! Integration tests for live bindings.

use docbind::catalog::{self, HolidayPackage, SiteConfig, Testimonial};
use docbind::{
    DocumentRef, FieldFilter, Fields, LiveContext, LiveState, MemoryStore, MemoryStoreConfig,
    RemoteStore, ResourcePath, SetOptions, DEFAULT_WATCH_BUFFER,
};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;

fn fields(value: Value) -> Fields {
    value.as_object().cloned().unwrap()
}

fn test_context() -> (Arc<MemoryStore>, LiveContext) {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
    let store = Arc::new(MemoryStore::new(MemoryStoreConfig::default()));
    let context = LiveContext::new(store.clone());
    (store, context)
}

fn seed_packages(store: &MemoryStore) {
    let packages = [
        ("pkg-a", "Shimla Escape", "shimla-escape", "hill-stations"),
        ("pkg-b", "Golden Temple Yatra", "golden-temple-yatra", "pilgrimages"),
        ("pkg-c", "Hampi Ruins", "hampi-ruins", "historical"),
    ];
    for (id, name, slug, category) in packages {
        store
            .set_document(
                &DocumentRef::new(catalog::HOLIDAY_PACKAGES, id).unwrap(),
                fields(json!({
                    "name": name,
                    "slug": slug,
                    "category": category,
                    "duration": "4 Days / 3 Nights",
                    "description": "A curated trip.",
                    "rating": 4.6,
                    "image": "placeholder",
                    "gallery": [],
                    "itinerary": []
                })),
                SetOptions::default(),
            )
            .unwrap();
    }
}

// --- Collection Scenarios ---

#[test]
fn test_package_catalog_first_push() {
    let (store, context) = test_context();
    seed_packages(&store);

    let mut packages = context.collection();
    let state = packages.bind(Some("/holidayPackages"), None);
    assert!(state.loading);
    assert!(state.data.is_none());

    store.flush();

    let state = packages.state();
    assert!(!state.loading);
    let docs = state.data.unwrap();
    assert_eq!(docs.len(), 3);
    let ids: Vec<&str> = docs.iter().map(|d| d.id.as_str()).collect();
    assert_eq!(ids, vec!["pkg-a", "pkg-b", "pkg-c"]);
    assert_eq!(docs[0].to_value()["name"], "Shimla Escape");
}

#[test]
fn test_push_carries_ids_merged_with_fields() {
    let (store, context) = test_context();
    seed_packages(&store);

    let mut packages = context.collection();
    packages.bind(Some(catalog::HOLIDAY_PACKAGES), None);
    store.flush();

    let decoded: Vec<HolidayPackage> = packages.decoded().unwrap().data.unwrap();
    assert_eq!(decoded.len(), 3);
    assert_eq!(decoded[1].id, "pkg-b");
    assert_eq!(decoded[1].category, catalog::PackageCategory::Pilgrimages);
}

#[test]
fn test_live_updates_replace_data() {
    let (store, context) = test_context();
    let mut testimonials = context.collection();
    testimonials.bind(
        Some(catalog::TESTIMONIALS),
        Some(catalog::approved_testimonials()),
    );
    store.flush();
    assert_eq!(testimonials.state(), LiveState::ready(Some(vec![])));

    let mutations = context.mutations();
    let pending = mutations
        .add(
            catalog::TESTIMONIALS,
            fields(json!({"userName": "Nisha", "content": "Loved the Kerala backwaters", "rating": 5, "approved": false})),
        )
        .unwrap();
    store.flush();
    assert!(testimonials.state().data.unwrap().is_empty());

    mutations
        .update(&pending, fields(json!({"approved": true})))
        .unwrap();
    store.flush();

    let shown: Vec<Testimonial> = testimonials.decoded().unwrap().data.unwrap();
    assert_eq!(shown.len(), 1);
    assert_eq!(shown[0].user_name, "Nisha");
}

#[test]
fn test_toggling_path_resubscribes_once() {
    let (store, context) = test_context();
    seed_packages(&store);

    let mut binding = context.collection();
    binding.bind(Some(catalog::HOLIDAY_PACKAGES), None);
    store.flush();

    binding.bind(None, None);
    assert_eq!(binding.state(), LiveState::idle());
    assert_eq!(store.active_listeners(), 0);

    let state = binding.bind(Some(catalog::HOLIDAY_PACKAGES), None);
    assert!(state.loading);
    assert_eq!(store.active_listeners(), 1);
    store.flush();
    assert_eq!(binding.state().data.unwrap().len(), 3);
}

#[test]
fn test_filter_change_discards_old_push() {
    let (store, context) = test_context();
    seed_packages(&store);

    let mut binding = context.collection();
    binding.bind(
        Some(catalog::HOLIDAY_PACKAGES),
        Some(FieldFilter::eq("category", "historical")),
    );
    binding.bind(
        Some(catalog::HOLIDAY_PACKAGES),
        Some(FieldFilter::eq("category", "pilgrimages")),
    );
    store.flush();

    let docs = binding.state().data.unwrap();
    assert_eq!(docs.len(), 1);
    assert_eq!(docs[0].id, "pkg-b");
}

#[test]
fn test_watcher_sees_loading_then_data() {
    let (store, context) = test_context();
    seed_packages(&store);

    let mut binding = context.collection();
    let watcher = binding.watch();
    binding.bind(Some(catalog::HOLIDAY_PACKAGES), None);
    store.flush();

    let timeout = Duration::from_millis(100);
    assert_eq!(watcher.recv_timeout(timeout).unwrap(), LiveState::idle());
    assert!(watcher.recv_timeout(timeout).unwrap().loading);
    let ready = watcher.recv_timeout(timeout).unwrap();
    assert!(!ready.loading);
    assert_eq!(ready.data.unwrap().len(), 3);
}

#[test]
fn test_unread_watcher_stays_bounded() {
    let (store, context) = test_context();
    seed_packages(&store);

    let mut binding = context.collection();
    let unread = binding.watch();
    let reader = binding.watch();
    binding.bind(Some(catalog::HOLIDAY_PACKAGES), None);
    store.flush();

    let reference = DocumentRef::new(catalog::HOLIDAY_PACKAGES, "pkg-a").unwrap();
    for rating in 0..5000 {
        store
            .set_document(
                &reference,
                fields(json!({"rating": rating % 5})),
                SetOptions::merge(),
            )
            .unwrap();
        store.flush();
        assert!(reader.latest().is_some());
    }

    let queued = std::iter::from_fn(|| unread.try_recv().ok()).count();
    assert_eq!(queued, DEFAULT_WATCH_BUFFER);
    assert!(unread.try_recv().is_err());

    let state = binding.state();
    assert_eq!(state.data.unwrap()[0].get("rating"), Some(&json!(4)));
}

#[test]
fn test_no_first_push_stays_loading() {
    let (store, context) = test_context();
    let mut binding = context.collection();
    binding.bind(Some(catalog::VIDEOS), None);

    // Never flushed: nothing arrived, so the binding keeps loading.
    assert!(binding.state().loading);
    assert_eq!(store.pending_pushes(), 1);
}

// --- Document Scenarios ---

#[test]
fn test_absent_site_config() {
    let (store, context) = test_context();
    let mut config = context.document();

    let state = config.bind(Some("/siteConfig"), Some("notifications"));
    assert!(state.loading);

    store.flush();
    assert_eq!(config.state(), LiveState::idle());
    assert!(catalog::marquee_lines(config.decoded::<SiteConfig>().unwrap().data.as_ref()).is_empty());
}

#[test]
fn test_site_config_updates_marquee() {
    let (store, context) = test_context();
    let reference = DocumentRef::new(catalog::SITE_CONFIG, catalog::NOTIFICATIONS_DOC).unwrap();

    let mut config = context.document();
    config.bind_ref(Some(reference.clone()));
    store.flush();

    context
        .mutations()
        .set(
            &reference,
            fields(json!({"notifications": ["Early bird offers on Char Dham", "", "Visa help for Bali"]})),
            SetOptions::default(),
        )
        .unwrap();
    context
        .mutations()
        .set(
            &reference,
            fields(json!({"homePageVideoId": "dQw4w9WgXcQ"})),
            SetOptions::merge(),
        )
        .unwrap();
    store.flush();

    let site: SiteConfig = config.decoded().unwrap().data.unwrap();
    assert_eq!(site.id, "notifications");
    assert_eq!(site.home_page_video_id.as_deref(), Some("dQw4w9WgXcQ"));
    assert_eq!(
        catalog::marquee_lines(Some(&site)),
        vec!["Early bird offers on Char Dham", "Visa help for Bali"]
    );
}

#[test]
fn test_document_deleted_yields_null() {
    let (store, context) = test_context();
    seed_packages(&store);
    let reference = DocumentRef::new(catalog::HOLIDAY_PACKAGES, "pkg-c").unwrap();

    let mut binding = context.document();
    binding.bind_ref(Some(reference.clone()));
    store.flush();
    assert!(binding.state().data.is_some());

    context.mutations().delete(&reference).unwrap();
    store.flush();

    let state = binding.state();
    assert!(state.data.is_none());
    assert!(!state.loading);
}

#[test]
fn test_switching_documents() {
    let (store, context) = test_context();
    seed_packages(&store);

    let mut binding = context.document();
    binding.bind(Some(catalog::HOLIDAY_PACKAGES), Some("pkg-a"));
    binding.bind(Some(catalog::HOLIDAY_PACKAGES), Some("pkg-b"));
    assert_eq!(store.active_listeners(), 1);

    store.flush();
    assert_eq!(binding.state().data.unwrap().id, "pkg-b");
}

// --- Slug Lookup ---

#[test]
fn test_package_lookup_by_slug() {
    let (store, _context) = test_context();
    seed_packages(&store);

    let found = catalog::find_package_by_slug(store.as_ref(), "hampi-ruins")
        .unwrap()
        .unwrap();
    assert_eq!(found.id, "pkg-c");

    let packages = ResourcePath::collection(catalog::HOLIDAY_PACKAGES).unwrap();
    assert_eq!(packages.canonical_string(), "holidayPackages");
}
