mod common;

use common::test_pool;
use memories::error::AppError;
use memories::models::{ListQuery, MemoryPatch, NewMemory, SearchCriteria, SortOrder};
use memories::store::MemoryStore;
use tempfile::TempDir;

/// A store over a real database file, so that several pool connections
/// contend for the same write lock.
async fn file_store() -> (TempDir, MemoryStore) {
    let dir = tempfile::tempdir().unwrap();
    let url = format!("sqlite:{}", dir.path().join("memories.db").display());
    let pool = memories::db::init_pool(&url).await.unwrap();
    (dir, MemoryStore::new(pool))
}

fn new_memory(title: &str, date: &str, tags: &[&str]) -> NewMemory {
    NewMemory {
        title: Some(title.to_string()),
        description: Some(format!("about {title}")),
        image: Some(None),
        date: Some(date.to_string()),
        tags: Some(tags.iter().map(|t| t.to_string()).collect()),
    }
}

#[tokio::test]
async fn duplicate_title_is_a_constraint_violation() {
    let store = MemoryStore::new(test_pool().await);
    store
        .create(new_memory("Trip", "2024-01-01 00:00:00", &[]))
        .await
        .unwrap();

    let err = store
        .create(new_memory("Trip", "2024-01-02 00:00:00", &[]))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::ConstraintViolation(_)));
}

#[tokio::test]
async fn missing_ids_are_not_found() {
    let store = MemoryStore::new(test_pool().await);

    assert!(matches!(store.get(1).await, Err(AppError::NotFound)));
    assert!(matches!(store.delete(1).await, Err(AppError::NotFound)));
    assert!(matches!(
        store.update(1, MemoryPatch::default()).await,
        Err(AppError::NotFound)
    ));
}

#[tokio::test]
async fn get_or_create_reuses_existing_tag() {
    let store = MemoryStore::new(test_pool().await);
    store
        .create(new_memory("One", "2024-01-01 00:00:00", &["alpha"]))
        .await
        .unwrap();
    let before = store.find_tag("alpha").await.unwrap().unwrap();

    store
        .create(new_memory("Two", "2024-01-02 00:00:00", &["alpha"]))
        .await
        .unwrap();
    let after = store.find_tag("alpha").await.unwrap().unwrap();

    assert_eq!(before, after);
    assert!(store.find_tag("beta").await.unwrap().is_none());
}

#[tokio::test]
async fn list_total_is_independent_of_page() {
    let store = MemoryStore::new(test_pool().await);
    for day in 1..=3 {
        store
            .create(new_memory(
                &format!("Day {day}"),
                &format!("2024-01-0{day} 00:00:00"),
                &[],
            ))
            .await
            .unwrap();
    }

    let page = store
        .list(&ListQuery {
            order: SortOrder::Asc,
            page: 2,
            limit: 2,
        })
        .await
        .unwrap();
    assert_eq!(page.total, 3);
    assert_eq!(page.memories.len(), 1);
    assert_eq!(page.memories[0].title, "Day 3");
}

#[tokio::test]
async fn same_date_ties_break_by_id() {
    let store = MemoryStore::new(test_pool().await);
    let first = store
        .create(new_memory("First", "2024-01-01 00:00:00", &[]))
        .await
        .unwrap();
    let second = store
        .create(new_memory("Second", "2024-01-01 00:00:00", &[]))
        .await
        .unwrap();

    let page = store.list(&ListQuery::default()).await.unwrap();
    let ids: Vec<i64> = page.memories.iter().map(|m| m.id).collect();
    assert_eq!(ids, vec![second.id, first.id]);
}

#[tokio::test]
async fn empty_search_is_a_validation_error() {
    let store = MemoryStore::new(test_pool().await);

    let err = store.search(&SearchCriteria::default()).await.unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));
}

#[tokio::test]
async fn init_pool_migrates_in_memory_database() {
    let pool = memories::db::init_pool("sqlite::memory:").await.unwrap();
    assert!(!pool.is_closed());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn overlapping_updates_all_complete() {
    let (_dir, store) = file_store().await;

    let mut ids = Vec::new();
    for i in 0..8 {
        let memory = store
            .create(new_memory(&format!("Memory {i}"), "2024-01-01 00:00:00", &["base"]))
            .await
            .unwrap();
        ids.push(memory.id);
    }

    let mut handles = Vec::new();
    for round in 0..160 {
        let store = store.clone();
        let id = ids[round % ids.len()];
        handles.push(tokio::spawn(async move {
            let patch = MemoryPatch {
                description: Some(format!("round {round}")),
                tags: Some(vec![format!("tag {}", round % 5)]),
                ..Default::default()
            };
            store.update(id, patch).await
        }));
    }

    for handle in handles {
        let memory = handle.await.unwrap().unwrap();
        assert_eq!(memory.tags.len(), 1);
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_creates_share_one_tag_and_one_title() {
    let (_dir, store) = file_store().await;

    let mut handles = Vec::new();
    for i in 0..40 {
        let store = store.clone();
        let title = if i % 2 == 0 {
            "Same title".to_string()
        } else {
            format!("Unique {i}")
        };
        handles.push(tokio::spawn(async move {
            let result = store
                .create(new_memory(&title, "2024-01-01 00:00:00", &["shared", "fresh"]))
                .await;
            (i % 2 == 0, result)
        }));
    }

    let mut same_ok = 0;
    let mut same_conflicts = 0;
    for handle in handles {
        match handle.await.unwrap() {
            (true, Ok(_)) => same_ok += 1,
            (true, Err(AppError::ConstraintViolation(_))) => same_conflicts += 1,
            (true, Err(e)) => panic!("unexpected error for shared title: {e}"),
            (false, result) => {
                result.unwrap();
            }
        }
    }
    assert_eq!(same_ok, 1);
    assert_eq!(same_conflicts, 19);

    for name in ["shared", "fresh"] {
        let rows: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM tag WHERE name = ?")
            .bind(name)
            .fetch_one(store.pool())
            .await
            .unwrap();
        assert_eq!(rows.0, 1, "tag {name} should exist once");
    }

    let tag = store.find_tag("shared").await.unwrap().unwrap();
    let links: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM memory_tags WHERE tag_id = ?")
        .bind(tag.id)
        .fetch_one(store.pool())
        .await
        .unwrap();
    assert_eq!(links.0, 21);
}
