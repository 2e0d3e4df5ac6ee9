use crate::error::StoreError;
use crate::memory::MemoryStore;
use crate::Store;

#[tokio::test]
async fn scalar_roundtrip_and_delete() {
    let store = MemoryStore::new();
    assert_eq!(store.get("k").await.unwrap(), None);

    store.set("k", "v1").await.unwrap();
    assert_eq!(store.get("k").await.unwrap().as_deref(), Some("v1"));

    store.set("k", "v2").await.unwrap();
    assert_eq!(store.get("k").await.unwrap().as_deref(), Some("v2"));

    assert!(store.delete("k").await.unwrap());
    assert!(!store.delete("k").await.unwrap());
    assert_eq!(store.get("k").await.unwrap(), None);
}

#[tokio::test]
async fn hash_fields() {
    let store = MemoryStore::new();
    assert!(store.hash_get_all("h").await.unwrap().is_empty());

    store.hash_set("h", "a", "1").await.unwrap();
    store.hash_set("h", "b", "2").await.unwrap();
    assert_eq!(store.hash_get("h", "a").await.unwrap().as_deref(), Some("1"));
    assert_eq!(store.hash_get("h", "c").await.unwrap(), None);
    assert_eq!(store.hash_get_all("h").await.unwrap().len(), 2);

    assert!(store.hash_remove("h", "a").await.unwrap());
    assert!(!store.hash_remove("h", "a").await.unwrap());
    assert_eq!(store.hash_get_all("h").await.unwrap().len(), 1);
}

#[tokio::test]
async fn set_membership() {
    let store = MemoryStore::new();
    assert!(!store.set_contains("s", "x").await.unwrap());
    assert!(store.set_members("s").await.unwrap().is_empty());

    assert!(store.set_add("s", "x").await.unwrap());
    assert!(!store.set_add("s", "x").await.unwrap());
    assert!(store.set_contains("s", "x").await.unwrap());

    store.set_add("s", "y").await.unwrap();
    let members = store.set_members("s").await.unwrap();
    assert_eq!(members.len(), 2);

    assert!(store.set_remove("s", "x").await.unwrap());
    assert!(!store.set_remove("s", "x").await.unwrap());
}

#[tokio::test]
async fn list_preserves_insertion_order() {
    let store = MemoryStore::new();
    store.list_push("l", "first").await.unwrap();
    store.list_push("l", "second").await.unwrap();
    store.list_push("l", "third").await.unwrap();
    assert_eq!(
        store.list_all("l").await.unwrap(),
        vec!["first", "second", "third"]
    );

    assert!(store.list_remove("l", "second").await.unwrap());
    assert!(!store.list_remove("l", "second").await.unwrap());
    assert_eq!(store.list_all("l").await.unwrap(), vec!["first", "third"]);
}

#[tokio::test]
async fn delete_spans_all_value_kinds() {
    let store = MemoryStore::new();
    store.hash_set("k", "f", "v").await.unwrap();
    assert!(store.delete("k").await.unwrap());
    assert!(store.hash_get_all("k").await.unwrap().is_empty());

    store.set_add("k", "m").await.unwrap();
    assert!(store.delete("k").await.unwrap());
    assert!(!store.set_contains("k", "m").await.unwrap());

    store.list_push("k", "v").await.unwrap();
    assert!(store.delete("k").await.unwrap());
    assert!(store.list_all("k").await.unwrap().is_empty());
}

#[tokio::test]
async fn fail_after_exhausts_allowance() {
    let store = MemoryStore::new();
    store.set("k", "v").await.unwrap();

    store.fail_after(1);
    assert!(store.get("k").await.is_ok());
    let err = store.get("k").await.unwrap_err();
    assert!(matches!(err, StoreError::Unavailable(_)), "got: {err}");

    store.clear_failure();
    assert_eq!(store.get("k").await.unwrap().as_deref(), Some("v"));
}
