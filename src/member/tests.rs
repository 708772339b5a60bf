use chrono::{DateTime, TimeZone, Utc};

use super::aggregate::{build_member_tree, discover_generations, group_by_position, MAX_TREE_DEPTH};
use super::model::*;
use super::repository::{member_filter, DocumentMemberRepository, MemberRepository, MEMBERS, POSITIONS};
use super::service::MemberService;
use crate::document::DocumentStore;
use crate::error::AppError;

fn at(secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
}

fn info(name: &str) -> MemberInfo {
    MemberInfo {
        image_url: format!("https://cdn.test/{}.png", name),
        name: name.to_string(),
        email: format!("{}@gov.test", name.to_lowercase()),
        ..MemberInfo::default()
    }
}

fn member(id: &str, parent: Option<&str>, position: &str, generation: i32, created: i64) -> Member {
    Member {
        id: id.to_string(),
        en: info(id),
        kh: info(&format!("{}-kh", id)),
        position: position.to_string(),
        parent: parent.map(str::to_string),
        generation,
        deleted_at: None,
        created_at: at(created),
        updated_at: at(created),
    }
}

fn deleted(mut m: Member) -> Member {
    m.deleted_at = Some(at(10_000));
    m
}

fn position(id: &str, title: &str, level: i32) -> Position {
    Position {
        id: id.to_string(),
        en: PositionInfo {
            title: title.to_string(),
            level,
        },
        kh: PositionInfo {
            title: format!("{} (kh)", title),
            level,
        },
        created_at: at(0),
        updated_at: at(0),
    }
}

#[test]
fn test_generation_discovery() {
    let members = vec![
        member("a", None, "p1", 1, 0),
        member("b", None, "p1", 1, 1),
        member("c", None, "p1", 2, 2),
        member("d", None, "p1", 3, 3),
    ];
    let summary = discover_generations(&members);
    assert_eq!(summary.generations, vec![1, 2, 3]);
    assert_eq!(summary.current_generation, Some(3));
}

#[test]
fn test_generation_discovery_empty_and_deleted() {
    assert_eq!(discover_generations(&[]), GenerationSummary::default());

    let members = vec![member("a", None, "p1", 1, 0), deleted(member("b", None, "p1", 4, 1))];
    let summary = discover_generations(&members);
    assert_eq!(summary.generations, vec![1]);
    assert_eq!(summary.current_generation, Some(1));
}

#[test]
fn test_grouping_orders_by_english_level() {
    let positions = vec![position("p1", "President", 1), position("p2", "Secretary", 2)];
    let members = vec![
        member("sec", None, "p2", 3, 0),
        member("pres", None, "p1", 3, 1),
        member("old", None, "p1", 2, 2),
    ];

    let groups = group_by_position(&members, &positions, 3);
    assert_eq!(groups.len(), 2);
    assert_eq!(groups[0].position.id, "p1");
    assert_eq!(groups[1].position.id, "p2");
    assert_eq!(groups[0].members.len(), 1);
    assert_eq!(groups[0].members[0].id, "pres");
    assert_eq!(groups[0].members[0].name_kh, "pres-kh");
}

#[test]
fn test_grouping_drops_unresolved_positions_and_deleted_members() {
    let positions = vec![position("p1", "President", 1)];
    let members = vec![
        member("a", None, "p1", 1, 0),
        deleted(member("b", None, "p1", 1, 1)),
        member("c", None, "gone", 1, 2),
    ];
    let groups = group_by_position(&members, &positions, 1);
    assert_eq!(groups.len(), 1);
    let ids: Vec<&str> = groups[0].members.iter().map(|m| m.id.as_str()).collect();
    assert_eq!(ids, vec!["a"]);
}

#[test]
fn test_member_brief_serialization_keys() {
    let brief = MemberBrief::from(&member("a", None, "p1", 1, 0));
    let json = serde_json::to_value(&brief).unwrap();
    assert_eq!(json["_id"], "a");
    assert_eq!(json["name_en"], "a");
    assert_eq!(json["imageUrl_kh"], "https://cdn.test/a-kh.png");
}

#[test]
fn test_tree_three_member_chain() {
    let positions = vec![position("p1", "Chair", 1)];
    let members = vec![
        member("A", None, "p1", 1, 0),
        member("B", Some("A"), "p1", 1, 1),
        member("C", Some("B"), "p1", 1, 2),
    ];

    let tree = build_member_tree(&members, &positions, None);
    assert_eq!(tree.len(), 1);
    let root = &tree[0];
    assert_eq!(root.id, "A");
    assert_eq!(root.position.as_deref(), Some("Chair"));
    let found: Vec<(&str, u32)> = root
        .descendants
        .iter()
        .map(|d| (d.member.id.as_str(), d.level))
        .collect();
    assert_eq!(found, vec![("B", 1), ("C", 2)]);
}

#[test]
fn test_tree_depth_is_bounded() {
    let mut members = vec![member("m0", None, "p1", 1, 0)];
    for i in 1..=15 {
        let parent = format!("m{}", i - 1);
        members.push(member(&format!("m{}", i), Some(&parent), "p1", 1, i));
    }

    let tree = build_member_tree(&members, &[], None);
    assert_eq!(tree.len(), 1);
    let levels: Vec<u32> = tree[0].descendants.iter().map(|d| d.level).collect();
    assert_eq!(levels.len(), MAX_TREE_DEPTH as usize);
    assert_eq!(levels.last().copied(), Some(MAX_TREE_DEPTH));
    assert_eq!(tree[0].position, None);
}

#[test]
fn test_tree_terminates_on_cycle() {
    let members = vec![
        member("root", None, "p1", 1, 0),
        member("x", Some("y"), "p1", 1, 1),
        member("y", Some("x"), "p1", 1, 2),
    ];
    let tree = build_member_tree(&members, &[], Some("x"));
    assert_eq!(tree.len(), 1);
    assert_eq!(tree[0].id, "y");
    let ids: Vec<&str> = tree[0].descendants.iter().map(|d| d.member.id.as_str()).collect();
    assert_eq!(ids, vec!["x"]);
}

#[test]
fn test_tree_is_idempotent() {
    let members = vec![
        member("A", None, "p1", 1, 0),
        member("B", Some("A"), "p1", 1, 1),
        member("D", None, "p1", 2, 3),
    ];
    let first = build_member_tree(&members, &[], None);
    let second = build_member_tree(&members, &[], None);
    assert_eq!(first, second);
    assert_eq!(first.iter().map(|n| n.id.as_str()).collect::<Vec<_>>(), vec!["A", "D"]);
}

#[test]
fn test_tree_excludes_deleted_members() {
    let members = vec![
        member("A", None, "p1", 1, 0),
        deleted(member("B", Some("A"), "p1", 1, 1)),
        member("C", Some("B"), "p1", 1, 2),
        member("E", Some("A"), "p1", 1, 3),
        deleted(member("Z", None, "p1", 1, 4)),
    ];

    let tree = build_member_tree(&members, &[], None);
    assert_eq!(tree.len(), 1);
    let ids: Vec<&str> = tree[0].descendants.iter().map(|d| d.member.id.as_str()).collect();
    assert_eq!(ids, vec!["E"]);

    assert!(build_member_tree(&members, &[], Some("B")).is_empty());
    assert!(build_member_tree(&members, &[], Some("missing")).is_empty());
}

#[test]
fn test_tree_with_explicit_root() {
    let members = vec![
        member("A", None, "p1", 1, 0),
        member("B", Some("A"), "p1", 1, 1),
        member("C", Some("B"), "p1", 1, 2),
        member("E", Some("A"), "p1", 1, 3),
    ];
    let tree = build_member_tree(&members, &[], Some("A"));
    let roots: Vec<&str> = tree.iter().map(|n| n.id.as_str()).collect();
    assert_eq!(roots, vec!["B", "E"]);
    assert_eq!(tree[0].descendants.len(), 1);
    assert_eq!(tree[0].descendants[0].level, 1);
}

#[test]
fn test_descendant_serializes_flat() {
    let d = Descendant {
        member: member("B", Some("A"), "p1", 1, 1),
        level: 1,
    };
    let json = serde_json::to_value(&d).unwrap();
    assert_eq!(json["_id"], "B");
    assert_eq!(json["parent"], "A");
    assert_eq!(json["level"], 1);
}

#[test]
fn test_member_filter_translation() {
    let store = DocumentStore::new();
    let members = store.collection(MEMBERS);
    members.insert(&member("alice", None, "p1", 1, 0)).unwrap();
    members.insert(&member("bob", None, "p1", 2, 1)).unwrap();
    members.insert(&deleted(member("carol", None, "p1", 2, 2))).unwrap();

    let query = MemberListQuery {
        generation: Some(2),
        ..MemberListQuery::default()
    };
    assert_eq!(members.count(&member_filter(&query)), 1);

    let query = MemberListQuery {
        search: Some("ALI".to_string()),
        ..MemberListQuery::default()
    };
    assert_eq!(members.count(&member_filter(&query)), 1);

    assert_eq!(members.count(&member_filter(&MemberListQuery::default())), 2);
}

fn seeded_service() -> (DocumentStore, MemberService<DocumentMemberRepository>) {
    let store = DocumentStore::new();
    let positions = store.collection(POSITIONS);
    positions.insert(&position("p1", "President", 1)).unwrap();
    positions.insert(&position("p2", "Secretary", 2)).unwrap();

    let members = store.collection(MEMBERS);
    members.insert(&member("s3", None, "p2", 3, 0)).unwrap();
    members.insert(&member("p3", None, "p1", 3, 1)).unwrap();
    members.insert(&member("p1a", None, "p1", 1, 2)).unwrap();
    members.insert(&member("p1b", None, "p1", 1, 3)).unwrap();
    members.insert(&member("x2", None, "p2", 2, 4)).unwrap();

    let service = MemberService::new(DocumentMemberRepository::new(&store));
    (store, service)
}

#[tokio::test]
async fn test_grouped_members_defaults_to_current_generation() {
    let (_, service) = seeded_service();
    let grouped = service.grouped_members(None).await.unwrap();
    assert_eq!(grouped.generations, vec![1, 2, 3]);
    assert_eq!(grouped.current_generation, Some(3));
    let order: Vec<&str> = grouped.list.iter().map(|g| g.position.id.as_str()).collect();
    assert_eq!(order, vec!["p1", "p2"]);
}

#[tokio::test]
async fn test_grouped_members_explicit_generation() {
    let (_, service) = seeded_service();
    let grouped = service.grouped_members(Some(1)).await.unwrap();
    assert_eq!(grouped.list.len(), 1);
    let ids: Vec<&str> = grouped.list[0].members.iter().map(|m| m.id.as_str()).collect();
    assert_eq!(ids, vec!["p1a", "p1b"]);

    let empty = service.grouped_members(Some(9)).await.unwrap();
    assert!(empty.list.is_empty());
    assert_eq!(empty.generations, vec![1, 2, 3]);
}

#[tokio::test]
async fn test_grouped_members_empty_store() {
    let store = DocumentStore::new();
    let service = MemberService::new(DocumentMemberRepository::new(&store));
    let grouped = service.grouped_members(None).await.unwrap();
    assert_eq!(grouped, GroupedMembers::default());
    assert!(service.member_tree(None).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_soft_delete_hides_member_everywhere() {
    let (store, service) = seeded_service();
    service.delete_member("s3").await.unwrap();

    assert!(matches!(service.get_member("s3").await, Err(AppError::NotFound(_))));
    let grouped = service.grouped_members(Some(3)).await.unwrap();
    assert_eq!(grouped.list.len(), 1);
    assert!(store.collection(MEMBERS).find_by_id("s3").is_some());
    assert!(matches!(service.delete_member("s3").await, Err(AppError::NotFound(_))));
}

#[tokio::test]
async fn test_create_member_validates_references() {
    let (_, service) = seeded_service();
    let request = |position: &str, parent: Option<&str>| CreateMemberRequest {
        en: info("New"),
        kh: info("New-kh"),
        parent: parent.map(str::to_string),
        position: position.to_string(),
        generation: 3,
    };

    let err = service.create_member(request("nope", None)).await.unwrap_err();
    assert!(matches!(err, AppError::NotFound(ref m) if m == "Position not found"));

    let err = service.create_member(request("p1", Some("nobody"))).await.unwrap_err();
    assert!(matches!(err, AppError::NotFound(ref m) if m == "Parent member not found"));

    let created = service.create_member(request("p1", Some("p3"))).await.unwrap();
    assert_eq!(created.parent.as_deref(), Some("p3"));
    let tree = service.member_tree(Some("p3")).await.unwrap();
    assert_eq!(tree.len(), 1);
    assert_eq!(tree[0].id, created.id);
}

#[tokio::test]
async fn test_update_member_merges_and_rejects_cycles() {
    let (_, service) = seeded_service();
    service
        .update_member(
            "p1b",
            UpdateMemberRequest {
                parent: Some(Some("p1a".to_string())),
                ..UpdateMemberRequest::default()
            },
        )
        .await
        .unwrap();

    let err = service
        .update_member(
            "p1a",
            UpdateMemberRequest {
                parent: Some(Some("p1b".to_string())),
                ..UpdateMemberRequest::default()
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::BadRequest(_)));

    let err = service
        .update_member(
            "p1a",
            UpdateMemberRequest {
                parent: Some(Some("p1a".to_string())),
                ..UpdateMemberRequest::default()
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::BadRequest(_)));

    let updated = service
        .update_member(
            "p1a",
            UpdateMemberRequest {
                en: Some(MemberInfoPatch {
                    name: Some("Renamed".to_string()),
                    ..MemberInfoPatch::default()
                }),
                generation: Some(4),
                ..UpdateMemberRequest::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.en.name, "Renamed");
    assert_eq!(updated.en.email, "p1a@gov.test");
    assert_eq!(updated.generation, 4);
    assert_eq!(service.generations().await.unwrap().current_generation, Some(4));
}

#[tokio::test]
async fn test_update_member_detaches_on_null_parent() {
    let (_, service) = seeded_service();
    let attach: UpdateMemberRequest = serde_json::from_value(serde_json::json!({"parent": "p1a"})).unwrap();
    assert_eq!(attach.parent, Some(Some("p1a".to_string())));
    let attached = service.update_member("p1b", attach).await.unwrap();
    assert_eq!(attached.parent.as_deref(), Some("p1a"));

    // Omitting the field keeps the parent.
    let rename: UpdateMemberRequest = serde_json::from_value(serde_json::json!({"generation": 2})).unwrap();
    assert_eq!(rename.parent, None);
    let kept = service.update_member("p1b", rename).await.unwrap();
    assert_eq!(kept.parent.as_deref(), Some("p1a"));

    let detach: UpdateMemberRequest = serde_json::from_value(serde_json::json!({"parent": null})).unwrap();
    assert_eq!(detach.parent, Some(None));
    let detached = service.update_member("p1b", detach).await.unwrap();
    assert_eq!(detached.parent, None);
    assert_eq!(service.get_member("p1b").await.unwrap().parent, None);
}

#[tokio::test]
async fn test_position_write_invariants() {
    let (_, service) = seeded_service();
    let info = |title: &str, level: i32| PositionInfo {
        title: title.to_string(),
        level,
    };

    let err = service
        .create_position(CreatePositionRequest {
            en: info("Treasurer", 3),
            kh: info("Treasurer kh", 4),
        })
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Unprocessable(_)));

    let err = service
        .create_position(CreatePositionRequest {
            en: info("President", 1),
            kh: info("Other", 1),
        })
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Unprocessable(ref m) if m == "Position already exists"));

    let created = service
        .create_position(CreatePositionRequest {
            en: info("Treasurer", 3),
            kh: info("Treasurer kh", 3),
        })
        .await
        .unwrap();

    let err = service
        .update_position(
            &created.id,
            UpdatePositionRequest {
                en: Some(PositionInfoPatch {
                    level: Some(5),
                    ..PositionInfoPatch::default()
                }),
                ..UpdatePositionRequest::default()
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Unprocessable(_)));

    let updated = service
        .update_position(
            &created.id,
            UpdatePositionRequest {
                en: Some(PositionInfoPatch {
                    level: Some(5),
                    ..PositionInfoPatch::default()
                }),
                kh: Some(PositionInfoPatch {
                    level: Some(5),
                    ..PositionInfoPatch::default()
                }),
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.kh.level, 5);

    let err = service.delete_position("p1").await.unwrap_err();
    assert!(matches!(err, AppError::Unprocessable(_)));
    service.delete_position(&created.id).await.unwrap();
    assert!(matches!(service.get_position(&created.id).await, Err(AppError::NotFound(_))));
}

#[tokio::test]
async fn test_list_members_is_paginated_newest_first() {
    let (_, service) = seeded_service();
    let page = service
        .list_members(&MemberListQuery {
            limit: Some(2),
            ..MemberListQuery::default()
        })
        .await
        .unwrap();
    assert_eq!(page.meta.total_count, 5);
    assert_eq!(page.meta.total_pages, 3);
    assert_eq!(page.results.len(), 2);
}

#[tokio::test]
async fn test_repository_generations_are_distinct() {
    let (_, service) = seeded_service();
    let repo_store = DocumentStore::new();
    let repo = DocumentMemberRepository::new(&repo_store);
    assert!(repo.generations().await.unwrap().is_empty());
    assert_eq!(service.generations().await.unwrap().generations, vec![1, 2, 3]);
}
