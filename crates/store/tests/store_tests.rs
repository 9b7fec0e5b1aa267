//! Content store integration tests: atomicity, full-miss reads, and
//! domain deletion outcomes.

mod common;

use common::{
    TestStore, make_domain, make_file_batch, make_user, run_store_test_both, seed_file,
    test_embedding,
};
use doclink_core::{DomainDeletion, DomainId, DomainKind, SessionId, Tier, UserId, embedding};
use doclink_store::UserProfile;

#[tokio::test]
async fn test_file_lifecycle_both_backends() {
    run_store_test_both(|store| async move {
        let user = make_user(store.as_ref(), Tier::Free).await;
        let domain = make_domain(store.as_ref(), user, DomainKind::Default).await;

        let file = seed_file(
            store.as_ref(),
            user,
            domain,
            "notes.txt",
            &["First sentence.", "Second sentence."],
        )
        .await;

        let files = store.list_domain_files(user, domain).await.unwrap();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].file_name, "notes.txt");

        let content = store.read_content(&[file]).await.unwrap().unwrap();
        assert_eq!(content.rows.len(), 2);
        assert_eq!(content.embeddings.len(), 2);

        assert!(store.delete_file(file).await.unwrap());
        assert!(!store.delete_file(file).await.unwrap());
        assert!(store.read_content(&[file]).await.unwrap().is_none());
        assert_eq!(store.file_count(user).await.unwrap(), 0);
    })
    .await;
}

#[tokio::test]
async fn test_batch_write_is_atomic() {
    let harness = TestStore::new().await.unwrap();
    let store = harness.store();
    let user = make_user(store.as_ref(), Tier::Free).await;
    let domain = make_domain(store.as_ref(), user, DomainKind::Default).await;

    let existing = seed_file(store.as_ref(), user, domain, "existing.txt", &["x."]).await;

    // A batch whose second file collides with an existing primary key
    // must fail as a whole: the first file never becomes visible.
    let (fresh_id, fresh_file, fresh_content) =
        make_file_batch(user, domain, "fresh.txt", &["a.", "b."]);
    let (_, mut colliding_file, colliding_content) =
        make_file_batch(user, domain, "collide.txt", &["c."]);
    colliding_file.file_id = *existing.as_uuid();
    let mut content = fresh_content;
    content.extend(colliding_content);

    let result = store
        .insert_file_batch(user, &[fresh_file, colliding_file], &content)
        .await;
    assert!(result.is_err(), "conflicting batch must error");

    assert_eq!(store.file_count(user).await.unwrap(), 1);
    assert!(store.get_file(fresh_id).await.unwrap().is_none());
    assert!(store.read_content(&[fresh_id]).await.unwrap().is_none());
}

#[tokio::test]
async fn test_read_content_orders_and_aligns() {
    let harness = TestStore::new().await.unwrap();
    let store = harness.store();
    let user = make_user(store.as_ref(), Tier::Free).await;
    let domain = make_domain(store.as_ref(), user, DomainKind::Default).await;

    let file = seed_file(
        store.as_ref(),
        user,
        domain,
        "ordered.txt",
        &["zero.", "one.", "two."],
    )
    .await;

    let content = store.read_content(&[file]).await.unwrap().unwrap();
    let positions: Vec<i32> = content.rows.iter().map(|r| r.position).collect();
    assert_eq!(positions, vec![0, 1, 2]);
    for (i, row) in content.rows.iter().enumerate() {
        assert_eq!(row.file_name, "ordered.txt");
        // The embedding matrix is aligned row-for-row with the content.
        assert_eq!(content.embeddings[i], test_embedding(row.position as usize));
    }
}

#[tokio::test]
async fn test_read_content_misses_fully_on_unknown_file() {
    let harness = TestStore::new().await.unwrap();
    let store = harness.store();
    let user = make_user(store.as_ref(), Tier::Free).await;
    let domain = make_domain(store.as_ref(), user, DomainKind::Default).await;

    let known = seed_file(store.as_ref(), user, domain, "known.txt", &["x."]).await;
    let unknown = doclink_core::FileId::new();

    // One absent member poisons the whole read: full miss, not partial.
    assert!(store.read_content(&[known, unknown]).await.unwrap().is_none());
    assert!(store.read_content(&[known]).await.unwrap().is_some());
}

#[tokio::test]
async fn test_read_content_misses_fully_on_corrupt_embedding() {
    let harness = TestStore::new().await.unwrap();
    let store = harness.store();
    let user = make_user(harness.store.as_ref(), Tier::Free).await;
    let domain = make_domain(harness.store.as_ref(), user, DomainKind::Default).await;

    let file = seed_file(harness.store.as_ref(), user, domain, "doc.txt", &["a.", "b."]).await;

    // Corrupt one embedding blob behind the store's back.
    sqlx::query("UPDATE file_content SET embedding = $1 WHERE file_id = $2 AND position = 1")
        .bind(vec![0u8; 5])
        .bind(file.as_uuid())
        .execute(harness.pool())
        .await
        .unwrap();

    assert!(store.read_content(&[file]).await.unwrap().is_none());
}

#[tokio::test]
async fn test_delete_domain_outcomes() {
    let harness = TestStore::new().await.unwrap();
    let store = harness.store();
    let user = make_user(store.as_ref(), Tier::Free).await;

    let protected = make_domain(store.as_ref(), user, DomainKind::Default).await;
    let disposable = make_domain(store.as_ref(), user, DomainKind::UserCreated).await;

    let kept = seed_file(store.as_ref(), user, protected, "kept.txt", &["stay."]).await;
    seed_file(store.as_ref(), user, disposable, "a.txt", &["a."]).await;
    seed_file(store.as_ref(), user, disposable, "b.txt", &["b."]).await;

    // Protected: untouched, files intact.
    assert_eq!(
        store.delete_domain(protected).await.unwrap(),
        DomainDeletion::Protected
    );
    assert_eq!(store.list_domain_files(user, protected).await.unwrap().len(), 1);
    assert!(store.read_content(&[kept]).await.unwrap().is_some());

    // Unknown id: nothing matched.
    assert_eq!(
        store.delete_domain(DomainId::new()).await.unwrap(),
        DomainDeletion::NotFound
    );

    // User-created: removed with both files.
    assert_eq!(
        store.delete_domain(disposable).await.unwrap(),
        DomainDeletion::Deleted { files_removed: 2 }
    );
    assert!(store.get_domain(disposable).await.unwrap().is_none());
    assert_eq!(store.file_count(user).await.unwrap(), 1);

    // Zero content rows remain for the deleted domain's files.
    let orphans: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM file_content WHERE file_id NOT IN (SELECT file_id FROM file_info)",
    )
    .fetch_one(harness.pool())
    .await
    .unwrap();
    assert_eq!(orphans, 0);
}

#[tokio::test]
async fn test_rename_domain() {
    let harness = TestStore::new().await.unwrap();
    let store = harness.store();
    let user = make_user(store.as_ref(), Tier::Free).await;
    let domain = make_domain(store.as_ref(), user, DomainKind::Default).await;

    let now = time::OffsetDateTime::now_utc();
    assert!(store.rename_domain(domain, "Renamed", now).await.unwrap());
    assert_eq!(
        store.get_domain(domain).await.unwrap().unwrap().domain_name,
        "Renamed"
    );
    assert!(!store.rename_domain(DomainId::new(), "Ghost", now).await.unwrap());
}

#[tokio::test]
async fn test_upsert_user_refreshes_profile_not_tier() {
    let harness = TestStore::new().await.unwrap();
    let store = harness.store();

    let user_id = UserId::new();
    let mut profile = UserProfile {
        user_id,
        user_name: "Ada".to_string(),
        user_surname: None,
        user_email: "ada@example.com".to_string(),
        picture_url: None,
    };
    let created = store.upsert_user(&profile).await.unwrap();
    assert_eq!(created.user_type, "free");

    store.set_tier(user_id, Tier::Premium).await.unwrap();

    profile.user_name = "Ada L.".to_string();
    let refreshed = store.upsert_user(&profile).await.unwrap();
    assert_eq!(refreshed.user_name, "Ada L.");
    // Re-authentication never downgrades the tier.
    assert_eq!(refreshed.user_type, "premium");
}

#[tokio::test]
async fn test_user_overview_groups_files() {
    let harness = TestStore::new().await.unwrap();
    let store = harness.store();
    let user = make_user(store.as_ref(), Tier::Free).await;

    let home = make_domain(store.as_ref(), user, DomainKind::Default).await;
    let work = make_domain(store.as_ref(), user, DomainKind::UserCreated).await;
    seed_file(store.as_ref(), user, home, "home.txt", &["h."]).await;
    seed_file(store.as_ref(), user, work, "work-1.txt", &["w."]).await;
    seed_file(store.as_ref(), user, work, "work-2.txt", &["w."]).await;

    let session = SessionId::new();
    store.admit_question(user, session).await.unwrap();

    let overview = store.user_overview(user).await.unwrap().unwrap();
    assert_eq!(overview.domains.len(), 2);
    let by_id = |id: DomainId| {
        overview
            .domains
            .iter()
            .find(|d| d.domain.domain_id == *id.as_uuid())
            .unwrap()
    };
    assert_eq!(by_id(home).files.len(), 1);
    assert_eq!(by_id(work).files.len(), 2);
    assert_eq!(overview.rolling_question_count, 1);

    assert!(store.user_overview(UserId::new()).await.unwrap().is_none());

    // Embedding blobs stay opaque to the overview; sanity-check the
    // fixture helper round-trips.
    let blob = embedding::vec_to_blob(&test_embedding(3));
    assert_eq!(
        embedding::blob_to_vec(&blob, doclink_core::EMBEDDING_DIM).unwrap(),
        test_embedding(3)
    );
}

#[tokio::test]
async fn test_record_visit_counts_entrances() {
    let harness = TestStore::new().await.unwrap();
    let store = harness.store();
    let user = make_user(store.as_ref(), Tier::Free).await;
    let session = SessionId::new();

    store.record_visit(user, session).await.unwrap();
    store.record_visit(user, session).await.unwrap();
    store.record_visit(user, session).await.unwrap();

    let row = store.get_session(user, session).await.unwrap().unwrap();
    assert_eq!(row.visit_count, 3);
    assert_eq!(row.question_count, 0);
}
