//! Snapshot capture, numbering, restore and deletion.

mod common;

use assert_matches::assert_matches;

use procforge_catalog::CatalogError;
use procforge_core::error::CoreError;
use procforge_core::template::TemplateStatus;
use procforge_core::types::{new_id, DbId};
use procforge_db::models::template_draft::UpdateDraft;
use procforge_db::models::template_snapshot::{CreateSnapshot, RestoreSnapshot, TemplateSnapshot};

use common::{bpmn, harness, new_category, new_draft, scope, Harness, ACTOR};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

async fn category(h: &Harness, code: &str) -> DbId {
    h.categories
        .create_category(&scope(), ACTOR, new_category(code, None))
        .await
        .unwrap()
        .category
        .id
}

async fn draft(h: &Harness, key: &str, category_id: DbId) -> DbId {
    h.lifecycle
        .create_draft(&scope(), ACTOR, new_draft(key, key, category_id))
        .await
        .unwrap()
        .draft
        .id
}

async fn snapshot(h: &Harness, source: DbId, kind: &str, name: &str) -> TemplateSnapshot {
    h.snapshots
        .create_snapshot(
            &scope(),
            ACTOR,
            CreateSnapshot {
                source_template_id: source,
                source_kind: kind.to_string(),
                snapshot_name: name.to_string(),
            },
        )
        .await
        .unwrap()
}

// ---------------------------------------------------------------------------
// Capture
// ---------------------------------------------------------------------------

#[tokio::test]
async fn snapshot_of_draft_copies_fields() {
    let h = harness();
    let cat = category(&h, "HR").await;
    let id = draft(&h, "leave", cat).await;

    let snap = snapshot(&h, id, "draft", "before review").await;

    assert_eq!(snap.template_key, "leave");
    assert_eq!(snap.snapshot_version, 1);
    assert_eq!(snap.source_template_id, id);
    assert_eq!(snap.source_template_status, TemplateStatus::Draft);
    assert_eq!(snap.source_template_version, 1);
    assert_eq!(snap.category_code, "HR");
    assert_eq!(snap.tags, vec!["hr", "approval"]);
    assert_eq!(snap.content, bpmn("leave"));
    assert_eq!(snap.created_by, ACTOR);
}

#[tokio::test]
async fn later_source_edits_do_not_touch_snapshot() {
    let h = harness();
    let cat = category(&h, "HR").await;
    let id = draft(&h, "leave", cat).await;
    let snap = snapshot(&h, id, "draft", "v1").await;

    h.lifecycle
        .update_draft(
            &scope(),
            ACTOR,
            id,
            UpdateDraft {
                content: Some(bpmn("leave_v2")),
                tags: Some(vec!["changed".to_string()]),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    let reread = h.snapshots.get_snapshot(&scope(), snap.id).await.unwrap();
    assert_eq!(reread, snap);
}

#[tokio::test]
async fn unknown_source_kind_is_rejected() {
    let h = harness();
    let cat = category(&h, "HR").await;
    let id = draft(&h, "leave", cat).await;

    let err = h
        .snapshots
        .create_snapshot(
            &scope(),
            ACTOR,
            CreateSnapshot {
                source_template_id: id,
                source_kind: "archived".to_string(),
                snapshot_name: "nope".to_string(),
            },
        )
        .await
        .unwrap_err();
    assert_matches!(err, CatalogError::Core(CoreError::InvalidSourceKind(kind)) if kind == "archived");
}

#[tokio::test]
async fn missing_source_is_not_found() {
    let h = harness();
    let err = h
        .snapshots
        .create_snapshot(
            &scope(),
            ACTOR,
            CreateSnapshot {
                source_template_id: new_id(),
                source_kind: "published".to_string(),
                snapshot_name: "nope".to_string(),
            },
        )
        .await
        .unwrap_err();
    assert_matches!(
        err,
        CatalogError::Core(CoreError::NotFound { entity: "TemplatePublished", .. })
    );
}

#[tokio::test]
async fn versions_are_numbered_per_template_key() {
    let h = harness();
    let cat = category(&h, "HR").await;
    let leave = draft(&h, "leave", cat).await;
    let expense = draft(&h, "expense", cat).await;

    let first = snapshot(&h, leave, "draft", "one").await;
    let second = snapshot(&h, leave, "draft", "two").await;
    let other = snapshot(&h, expense, "draft", "other").await;

    assert_eq!(first.snapshot_version, 1);
    assert_eq!(second.snapshot_version, 2);
    assert_eq!(other.snapshot_version, 1);

    let listed = h.snapshots.list_snapshots(&scope(), "leave").await.unwrap();
    let versions: Vec<i32> = listed.iter().map(|s| s.snapshot_version).collect();
    assert_eq!(versions, vec![2, 1]);
}

#[tokio::test]
async fn published_snapshot_records_flow_version() {
    let h = harness();
    let cat = category(&h, "HR").await;
    let id = draft(&h, "leave", cat).await;
    let published = h.lifecycle.publish(&scope(), ACTOR, id).await.unwrap();

    let snap = snapshot(&h, published.published.id, "PUBLISHED", "live").await;

    assert_eq!(snap.template_key, "leave");
    assert_eq!(snap.source_template_status, TemplateStatus::Active);
    assert_eq!(snap.source_template_version, published.published.flow_version);
}

// ---------------------------------------------------------------------------
// Restore
// ---------------------------------------------------------------------------

#[tokio::test]
async fn restoring_twice_yields_distinct_drafts() {
    let h = harness();
    let cat = category(&h, "HR").await;
    let id = draft(&h, "leave", cat).await;
    let snap = snapshot(&h, id, "draft", "baseline").await;

    let first = h
        .snapshots
        .restore_snapshot(&scope(), ACTOR, snap.id, RestoreSnapshot::default())
        .await
        .unwrap();
    let second = h
        .snapshots
        .restore_snapshot(
            &scope(),
            "bob",
            snap.id,
            RestoreSnapshot {
                new_template_name: Some("Leave copy".to_string()),
            },
        )
        .await
        .unwrap();

    assert_ne!(first.draft.template_key, second.draft.template_key);
    assert!(first.draft.template_key.starts_with("leave_restore_"));
    assert!(second.draft.template_key.starts_with("leave_restore_"));

    assert_eq!(first.draft.name, "baseline");
    assert_eq!(first.draft.description.as_deref(), Some("Restored from snapshot: baseline"));
    assert_eq!(first.draft.status, TemplateStatus::Draft);
    assert_eq!(first.draft.version, 1);
    assert_eq!(first.draft.content, snap.content);
    assert_eq!(second.draft.name, "Leave copy");
    assert_eq!(second.draft.created_by, "bob");

    let unchanged = h.snapshots.get_snapshot(&scope(), snap.id).await.unwrap();
    assert_eq!(unchanged, snap);
}

#[tokio::test]
async fn restore_falls_back_to_captured_category() {
    let h = harness();
    let cat = category(&h, "OLD").await;
    let id = draft(&h, "leave", cat).await;
    let snap = snapshot(&h, id, "draft", "keep").await;

    h.lifecycle.delete_draft(&scope(), id).await.unwrap();
    h.categories.delete_category(&scope(), ACTOR, cat).await.unwrap();

    let restored = h
        .snapshots
        .restore_snapshot(&scope(), ACTOR, snap.id, RestoreSnapshot::default())
        .await
        .unwrap();
    assert_eq!(restored.draft.category_id, cat);
    assert_eq!(restored.draft.category_code, "OLD");
    assert_eq!(restored.draft.category_name, "Category OLD");
    assert_eq!(restored.category_path, None);
}

#[tokio::test]
async fn category_rename_keeps_snapshot_and_reaches_restored_draft() {
    let h = harness();
    let cat = category(&h, "HR").await;
    let id = draft(&h, "leave", cat).await;
    let snap = snapshot(&h, id, "draft", "keep").await;

    h.categories
        .update_category(
            &scope(),
            ACTOR,
            cat,
            procforge_db::models::category::UpdateCategory {
                name: Some("People".to_string()),
                code: Some("PPL".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    let stored = h.snapshots.get_snapshot(&scope(), snap.id).await.unwrap();
    assert_eq!(stored.category_name, "Category HR");
    assert_eq!(stored.category_code, "HR");
    assert_eq!(stored.category_name, snap.category_name);
    assert_eq!(stored.category_code, snap.category_code);

    let restored = h
        .snapshots
        .restore_snapshot(&scope(), ACTOR, snap.id, RestoreSnapshot::default())
        .await
        .unwrap();
    assert_eq!(restored.draft.category_name, "People");
    assert_eq!(restored.draft.category_code, "PPL");
    assert_eq!(restored.category_path.as_deref(), Some("People"));
}

// ---------------------------------------------------------------------------
// Delete
// ---------------------------------------------------------------------------

#[tokio::test]
async fn deleted_snapshot_is_gone() {
    let h = harness();
    let cat = category(&h, "HR").await;
    let id = draft(&h, "leave", cat).await;
    let snap = snapshot(&h, id, "draft", "temp").await;

    h.snapshots.delete_snapshot(&scope(), snap.id).await.unwrap();

    let err = h.snapshots.get_snapshot(&scope(), snap.id).await.unwrap_err();
    assert_matches!(err, CatalogError::Core(CoreError::NotFound { .. }));
    let err = h
        .snapshots
        .delete_snapshot(&scope(), snap.id)
        .await
        .unwrap_err();
    assert_matches!(err, CatalogError::Core(CoreError::NotFound { .. }));

    // Numbering continues from the remaining snapshots.
    let next = snapshot(&h, id, "draft", "again").await;
    assert_eq!(next.snapshot_version, 1);
}
