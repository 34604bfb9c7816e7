use chrono::NaiveDate;
use futures::future::join_all;
use searchlayer::{async_trait, memory::InMemoryStore, prelude::*, serde_json::json};
use std::sync::atomic::{AtomicUsize, Ordering};

#[derive(Debug, Default, Clone, PartialEq, Model)]
#[model(index = "users")]
struct User {
    #[model(id)]
    id: String,
    #[model(rename = "display_name")]
    name: String,
    email: String,
    age: u32,
    joined: Option<NaiveDate>,
    tags: Vec<String>,
}

#[derive(Debug, Default, Clone, PartialEq, Model)]
#[model(index = "orders")]
struct Order {
    #[model(id)]
    id: u64,
    total: u32,
}

#[derive(Debug, Default, Clone, PartialEq, Model)]
#[model(index = "readings")]
struct Reading {
    #[model(id)]
    id: String,
    value: searchlayer::serde_json::Value,
}

fn user(name: &str, age: u32) -> User {
    User {
        name: name.to_string(),
        email: format!("{}@example.com", name.to_lowercase()),
        age,
        ..Default::default()
    }
}

fn object(value: searchlayer::serde_json::Value) -> Document {
    value.as_object().cloned().unwrap()
}

/// Delegates to an inner backend and counts the requests that reach it.
#[derive(Debug, Default)]
struct Recording<B> {
    inner: B,
    requests: AtomicUsize,
}

impl<B> Recording<B> {
    fn requests(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }

    fn hit(&self) {
        self.requests.fetch_add(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl<B: SearchBackend> SearchBackend for Recording<B> {
    async fn exists(&self, index: &str, id: &str) -> DocumentStoreResult<bool> {
        self.hit();
        self.inner.exists(index, id).await
    }

    async fn get_document(&self, index: &str, id: &str) -> DocumentStoreResult<Option<Hit>> {
        self.hit();
        self.inner.get_document(index, id).await
    }

    async fn search(&self, index: &str, request: &SearchRequest) -> DocumentStoreResult<SearchHits> {
        self.hit();
        self.inner.search(index, request).await
    }

    async fn create_document(
        &self,
        index: &str,
        id: Option<&str>,
        document: Document,
    ) -> DocumentStoreResult<Created> {
        self.hit();
        self.inner.create_document(index, id, document).await
    }

    async fn update_document(&self, index: &str, id: &str, document: Document) -> DocumentStoreResult<u64> {
        self.hit();
        self.inner.update_document(index, id, document).await
    }

    async fn index_document(&self, index: &str, id: &str, document: Document) -> DocumentStoreResult<u64> {
        self.hit();
        self.inner.index_document(index, id, document).await
    }

    async fn delete_document(&self, index: &str, id: &str) -> DocumentStoreResult<u64> {
        self.hit();
        self.inner.delete_document(index, id).await
    }
}

#[tokio::test]
async fn crud_lifecycle() {
    let store = SearchStore::new(InMemoryStore::new());
    let users = store.repository::<User>();

    let mut alice = User {
        id: "u-1".into(),
        joined: NaiveDate::from_ymd_opt(2024, 3, 1),
        tags: vec!["admin".into()],
        ..user("Alice", 31)
    };
    assert_eq!(users.create(&mut alice).await.unwrap(), 1);
    assert!(users.exists("u-1").await.unwrap());
    assert_eq!(users.load("u-1").await.unwrap(), Some(alice.clone()));

    alice.age = 32;
    assert_eq!(users.update(&alice).await.unwrap(), 1);
    assert_eq!(users.load("u-1").await.unwrap().map(|u| u.age), Some(32));

    let changes = object(json!({ "id": "u-1", "email": "a@b.com" }));
    assert_eq!(users.patch(&changes).await.unwrap(), 1);
    let patched = users.load("u-1").await.unwrap().unwrap();
    assert_eq!(patched.email, "a@b.com");
    assert_eq!(patched.age, 32);

    assert_eq!(users.delete("u-1").await.unwrap(), 1);
    assert_eq!(users.load("u-1").await.unwrap(), None);
    assert_eq!(store.backend().version("users", "u-1").await, None);
}

#[tokio::test]
async fn documents_are_stored_under_wire_names_without_identifier() {
    let store = SearchStore::new(InMemoryStore::new());
    let mut alice = User { id: "u-1".into(), ..user("Alice", 31) };

    store.repository::<User>().create(&mut alice).await.unwrap();

    let hit = store.backend().get_document("users", "u-1").await.unwrap().unwrap();
    assert_eq!(hit.source.get("display_name"), Some(&json!("Alice")));
    assert!(!hit.source.contains_key("name"));
    assert!(!hit.source.contains_key("id"));
}

#[tokio::test]
async fn create_against_existing_identifier_reports_zero() {
    let store = SearchStore::new(InMemoryStore::new());
    let users = store.repository::<User>();

    let mut first = User { id: "dup".into(), ..user("First", 20) };
    let mut second = User { id: "dup".into(), ..user("Second", 30) };

    assert_eq!(users.create(&mut first).await.unwrap(), 1);
    assert_eq!(users.create(&mut second).await.unwrap(), 0);
    assert_eq!(users.load("dup").await.unwrap().map(|u| u.name), Some("First".to_string()));
}

#[tokio::test]
async fn store_assigned_identifier_is_written_back() {
    let store = SearchStore::new(InMemoryStore::new());
    let users = store.repository::<User>();
    let mut bob = user("Bob", 40);

    users.create(&mut bob).await.unwrap();

    assert!(!bob.id.is_empty());
    assert_eq!(users.load(&bob.id).await.unwrap(), Some(bob));
}

#[tokio::test]
async fn numeric_identifiers_round_trip() {
    let store = SearchStore::new(InMemoryStore::new());
    let orders = store.repository::<Order>();
    let mut order = Order { id: 5, total: 120 };

    assert_eq!(orders.create(&mut order).await.unwrap(), 1);
    assert_eq!(orders.load("5").await.unwrap(), Some(order.clone()));

    order.total = 80;
    assert_eq!(orders.update(&order).await.unwrap(), 1);
    let found = orders.find(&FilterSpec::new()).await.unwrap();
    assert_eq!(found, [order]);
}

#[tokio::test]
async fn sorting_mixed_value_types_is_stable() {
    let store = SearchStore::new(InMemoryStore::new());
    let readings = store.repository::<Reading>();

    for i in 0..200u32 {
        let value = if i % 3 == 0 { json!(format!("r{i}")) } else { json!(i % 17) };
        let mut reading = Reading { id: format!("{i:03}"), value };
        readings.create(&mut reading).await.unwrap();
    }

    let page = readings
        .search(&FilterSpec::new(), "+value", PageRequest::new(200, 0))
        .await
        .unwrap();

    assert_eq!(page.total, 200);
    assert_eq!(page.len(), 200);
    let first_string = page.items.iter().position(|r| r.value.is_string()).unwrap();
    assert!(page.items[..first_string].iter().all(|r| r.value.is_number()));
    assert!(page.items[first_string..].iter().all(|r| r.value.is_string()));
    let numbers = page.items[..first_string]
        .iter()
        .filter_map(|r| r.value.as_u64())
        .collect::<Vec<_>>();
    assert!(numbers.windows(2).all(|pair| pair[0] <= pair[1]));
}

#[tokio::test]
async fn sort_on_undeclared_field_is_passed_to_the_store() {
    let store = SearchStore::new(InMemoryStore::new());
    let users = store.repository::<User>();

    for (id, name, score) in [("a", "A", 2), ("b", "B", 9), ("c", "C", 5)] {
        store
            .backend()
            .create_document("users", Some(id), object(json!({ "display_name": name, "score": score })))
            .await
            .unwrap();
    }

    let page = users.search(&FilterSpec::new(), "-score", PageRequest::default()).await.unwrap();

    let ids = page.items.iter().map(|u| u.id.as_str()).collect::<Vec<_>>();
    assert_eq!(ids, ["b", "c", "a"]);
}

#[tokio::test]
async fn patch_without_identifier_never_reaches_the_store() {
    let store = SearchStore::new(Recording::<InMemoryStore>::default());
    let users = store.repository::<User>();
    let changes = object(json!({ "email": "a@b.com" }));

    let err = users.patch(&changes).await.unwrap_err();

    assert!(matches!(err, DocumentStoreError::MissingIdentifier(ref key) if key == "id"));
    assert_eq!(changes.len(), 1);
    assert_eq!(store.backend().requests(), 0);
}

#[tokio::test]
async fn update_without_identifier_never_reaches_the_store() {
    let store = SearchStore::new(Recording::<InMemoryStore>::default());

    let err = store
        .repository::<User>()
        .update(&user("Nobody", 1))
        .await
        .unwrap_err();

    assert!(err.is_rejected_locally());
    assert_eq!(store.backend().requests(), 0);
}

#[tokio::test]
async fn writes_against_absent_documents_are_not_found() {
    let store = SearchStore::new(InMemoryStore::new());
    let users = store.repository::<User>();
    let ghost = User { id: "ghost".into(), ..user("Ghost", 99) };

    assert!(users.update(&ghost).await.unwrap_err().is_not_found());
    assert!(users.patch(&object(json!({ "id": "ghost", "age": 1 }))).await.unwrap_err().is_not_found());
    assert!(users.delete("ghost").await.unwrap_err().is_not_found());
}

#[tokio::test]
async fn save_creates_then_replaces() {
    let store = SearchStore::new(InMemoryStore::new());
    let users = store.repository::<User>();
    let mut carol = User { id: "u-3".into(), ..user("Carol", 25) };

    assert_eq!(users.save(&carol).await.unwrap(), 1);
    carol.tags = vec!["editor".into()];
    users.save(&carol).await.unwrap();

    assert_eq!(users.load("u-3").await.unwrap(), Some(carol));
    assert_eq!(store.backend().version("users", "u-3").await, Some(2));
}

#[tokio::test]
async fn search_pages_and_reports_total() {
    let store = SearchStore::new(InMemoryStore::new());
    let users = store.repository::<User>();

    for n in 0..57u32 {
        let mut member = User { id: format!("u-{n:02}"), ..user(&format!("Member{n}"), n) };
        users.create(&mut member).await.unwrap();
    }

    let page = users
        .search(&FilterSpec::new(), "+age", PageRequest::new(10, 20))
        .await
        .unwrap();

    assert_eq!(page.total, 57);
    assert_eq!(page.items.len(), 10);
    assert_eq!(page.items.first().map(|u| u.age), Some(20));
    assert_eq!(page.next_offset(), Some(30));

    let last = users
        .search(&FilterSpec::new(), "+age", PageRequest::from_page_number(6, 10))
        .await
        .unwrap();
    assert_eq!(last.items.len(), 7);
    assert!(!last.has_more());
}

#[tokio::test]
async fn search_filters_by_prefix_and_range() {
    let store = SearchStore::new(InMemoryStore::new());
    let users = store.repository::<User>();

    for (name, age) in [("Alice", 31), ("Albert", 17), ("Alina", 45), ("Bob", 33)] {
        users.create(&mut user(name, age)).await.unwrap();
    }

    let filter = FilterSpec::from_json(&json!({
        "display_name": "Al",
        "age": { "$gte": 18 }
    }))
    .unwrap();
    let page = users.search(&filter, "-age", PageRequest::default()).await.unwrap();

    let names = page.items.iter().map(|u| u.name.as_str()).collect::<Vec<_>>();
    assert_eq!(names, ["Alina", "Alice"]);
    assert_eq!(page.total, 2);
}

#[tokio::test]
async fn sort_on_text_field_falls_back_to_store_order() {
    let store = SearchStore::new(InMemoryStore::new());
    let users = store.repository::<User>();

    for (name, age) in [("Carol", 3), ("Alice", 1), ("Bob", 2)] {
        users.create(&mut user(name, age)).await.unwrap();
    }

    let by_age = users.search(&FilterSpec::new(), "-age,display_name", PageRequest::default()).await.unwrap();
    let rejected = users.search(&FilterSpec::new(), "-age,-display_name", PageRequest::default()).await.unwrap();

    let ages = |page: &Page<User>| page.items.iter().map(|u| u.age).collect::<Vec<_>>();
    assert_eq!(ages(&by_age), [3, 2, 1]);
    assert_eq!(ages(&rejected), [3, 1, 2]);
}

#[tokio::test]
async fn one_undecodable_document_fails_the_whole_search() {
    let store = SearchStore::new(InMemoryStore::new());
    let users = store.repository::<User>();

    users.create(&mut User { id: "a".into(), ..user("A", 1) }).await.unwrap();
    store
        .backend()
        .create_document("users", Some("b"), object(json!({ "display_name": "B", "age": "old" })))
        .await
        .unwrap();
    users.create(&mut User { id: "c".into(), ..user("C", 3) }).await.unwrap();

    let result = users.find(&FilterSpec::new()).await;

    assert!(matches!(result, Err(DocumentStoreError::Decode { ref field, .. }) if field == "age"));
}

#[tokio::test]
async fn unknown_and_missing_keys_decode_leniently() {
    let store = SearchStore::new(InMemoryStore::new());
    store
        .backend()
        .create_document("users", Some("x"), object(json!({ "display_name": "X", "legacy": true })))
        .await
        .unwrap();

    let loaded = store.repository::<User>().load("x").await.unwrap().unwrap();

    assert_eq!(loaded, User { id: "x".into(), name: "X".into(), ..Default::default() });
}

#[tokio::test]
async fn find_uses_store_default_page_size() {
    let store = SearchStore::new(InMemoryStore::new());
    let users = store.repository::<User>();

    for n in 0..12 {
        users.create(&mut user(&format!("U{n}"), n)).await.unwrap();
    }

    assert_eq!(users.all().await.unwrap().len(), 10);
    assert_eq!(
        users
            .find_one(&FilterSpec::new().range("age", RangeOp::Gt, 10))
            .await
            .unwrap()
            .map(|u| u.age),
        Some(11)
    );
}

struct AdultsNamed {
    prefix: String,
}

impl SearchCriteria for AdultsNamed {
    fn filter(&self) -> DocumentStoreResult<FilterSpec> {
        Ok(FilterSpec::new()
            .prefix("display_name", self.prefix.as_str())
            .range("age", RangeOp::Gte, 18))
    }

    fn sort(&self) -> &str {
        "+age"
    }

    fn page(&self) -> PageRequest {
        PageRequest::builder().with_limit(2).build()
    }
}

#[tokio::test]
async fn search_by_criteria() {
    let store = SearchStore::new(InMemoryStore::new());
    let users = store.repository::<User>();

    for (name, age) in [("Dana", 50), ("Dan", 20), ("Dave", 12), ("Dora", 30)] {
        users.create(&mut user(name, age)).await.unwrap();
    }

    let page = users
        .search_by(&AdultsNamed { prefix: "Da".into() })
        .await
        .unwrap();

    assert_eq!(page.items.iter().map(|u| u.age).collect::<Vec<_>>(), [20, 50]);
    assert_eq!(page.total, 2);
}

#[tokio::test]
async fn repository_in_overrides_index() {
    let store = SearchStore::new(InMemoryStore::new());
    let archive = store.repository_in::<User>("users-archive");

    archive.create(&mut User { id: "old".into(), ..user("Old", 80) }).await.unwrap();

    assert_eq!(archive.index(), "users-archive");
    assert!(store.repository::<User>().load("old").await.unwrap().is_none());
    assert_eq!(store.backend().count("users-archive").await, 1);
}

#[tokio::test]
async fn dynamic_store_behaves_like_static_one() {
    let store: DynSearchStore = SearchStore::new(InMemoryStore::new()).into_dyn();
    let users = store.repository::<User>();

    let mut eve = User { id: "eve".into(), ..user("Eve", 28) };
    assert_eq!(users.create(&mut eve).await.unwrap(), 1);
    assert_eq!(users.load("eve").await.unwrap(), Some(eve));

    assert!(store.downcast_backend::<InMemoryStore>().is_some());
    let restored = store.into_static::<InMemoryStore>().unwrap();
    assert_eq!(restored.backend().count("users").await, 1);
    restored.shutdown().await.unwrap();
}

#[tokio::test]
async fn concurrent_creates_do_not_interfere() {
    let store = SearchStore::new(InMemoryStore::new());
    let users = store.repository::<User>();

    let mut batch = (0..25)
        .map(|n| User { id: format!("c-{n}"), ..user(&format!("C{n}"), n) })
        .collect::<Vec<_>>();

    let versions = join_all(batch.iter_mut().map(|u| users.create(u))).await;

    assert!(versions.into_iter().all(|v| v.unwrap() == 1));
    assert_eq!(store.backend().count("users").await, 25);
}
