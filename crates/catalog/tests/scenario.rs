//! End-to-end walk through the catalog: categories, a draft, publication,
//! suspension, re-activation, snapshot and restore.

mod common;

use procforge_core::template::TemplateStatus;
use procforge_db::models::template_snapshot::{CreateSnapshot, RestoreSnapshot};

use common::{harness, new_category, new_draft, scope, ACTOR};

#[tokio::test]
async fn full_template_lifecycle() {
    let h = harness();
    let scope = scope();

    let a = h
        .categories
        .create_category(&scope, ACTOR, new_category("A", None))
        .await
        .unwrap();
    let b = h
        .categories
        .create_category(&scope, ACTOR, new_category("B", Some(a.category.id)))
        .await
        .unwrap();
    assert_eq!(b.category.level, 1);
    assert_eq!(b.path_names, "Category A/Category B");

    let draft = h
        .lifecycle
        .create_draft(&scope, ACTOR, new_draft("proc1", "realProc1", b.category.id))
        .await
        .unwrap();
    assert_eq!(draft.category_path.as_deref(), Some("Category A/Category B"));

    let p1 = h
        .lifecycle
        .publish(&scope, ACTOR, draft.draft.id)
        .await
        .unwrap();
    assert_eq!(p1.published.template_key, "realProc1");
    assert_eq!(p1.published.flow_version, 1);
    assert_eq!(p1.published.status, TemplateStatus::Active);
    assert!(h.lifecycle.get_draft(&scope, draft.draft.id).await.is_err());

    let suspended = h.lifecycle.suspend(&scope, p1.published.id).await.unwrap();
    assert_eq!(suspended.published.status, TemplateStatus::Inactive);

    let active = h.lifecycle.activate(&scope, p1.published.id).await.unwrap();
    assert_eq!(active.published.status, TemplateStatus::Active);

    let s1 = h
        .snapshots
        .create_snapshot(
            &scope,
            ACTOR,
            CreateSnapshot {
                source_template_id: p1.published.id,
                source_kind: "published".to_string(),
                snapshot_name: "v1".to_string(),
            },
        )
        .await
        .unwrap();
    assert_eq!(s1.snapshot_version, 1);
    assert_eq!(s1.template_key, "realProc1");

    let restored = h
        .snapshots
        .restore_snapshot(&scope, ACTOR, s1.id, RestoreSnapshot::default())
        .await
        .unwrap();
    assert!(restored.draft.template_key.starts_with("realProc1_restore_"));
    assert_eq!(restored.draft.status, TemplateStatus::Draft);
    assert_eq!(restored.draft.category_id, b.category.id);

    // The restored draft keeps category B occupied.
    let tree = h.categories.build_tree(&scope).await.unwrap();
    assert_eq!(tree.len(), 1);
    assert_eq!(tree[0].template_count, 2);
    assert_eq!(tree[0].children[0].template_count, 2);
}
