mod common;

use common::*;
use serde_json::json;

fn meeting_with_members() -> serde_json::Value {
    json!({
        "user/42": {
            "group_$22_ids": [111],
            "group_$_ids": ["22"],
            "meeting_ids": [22],
            "committee_ids": [3],
        },
        "user/43": {
            "group_$22_ids": [111],
            "group_$_ids": ["22"],
            "meeting_ids": [22],
            "committee_ids": [3],
        },
        "committee/3": {"meeting_ids": [22], "user_ids": [42, 43]},
        "meeting/22": {
            "committee_id": 3,
            "name": "name_meeting_22",
            "group_ids": [111],
            "user_ids": [42, 43],
        },
        "group/111": {
            "name": "name_srtgb123",
            "meeting_id": 22,
            "user_ids": [42, 43],
        },
    })
}

#[tokio::test]
async fn test_delete_correct() {
    let store = store_with(json!({
        "meeting/22": {"name": "name_meeting_22", "group_ids": [111]},
        "group/111": {"name": "name_srtgb123", "meeting_id": 22},
    }));
    request(&store, ADMIN_ID, "group.delete", vec![json!({"id": 111})])
        .await
        .unwrap();
    assert_deleted(&store, "group/111");
    assert_model(&store, "meeting/22", json!({"group_ids": []})).await;
}

#[tokio::test]
async fn test_delete_wrong_id() {
    let store = store_with(json!({
        "meeting/22": {"name": "name_meeting_22", "group_ids": [112]},
        "group/112": {"name": "name_srtgb123", "meeting_id": 22},
    }));
    let error = request(&store, ADMIN_ID, "group.delete", vec![json!({"id": 111})])
        .await
        .unwrap_err();
    assert_eq!(error.status_code(), 400);
    assert_eq!(error.to_string(), "Model 'group/111' does not exist.");
    assert_model(&store, "group/112", json!({"name": "name_srtgb123"})).await;
}

#[tokio::test]
async fn test_delete_default_and_admin_group() {
    for field in ["default_group_for_meeting_id", "admin_group_for_meeting_id"] {
        let store = store_with(json!({
            "meeting/22": {"name": "name_meeting_22", "group_ids": [111]},
            "group/111": {"name": "name_srtgb123", "meeting_id": 22, field: 22},
        }));
        let error = request(&store, ADMIN_ID, "group.delete", vec![json!({"id": 111})])
            .await
            .unwrap_err();
        assert_eq!(
            error.to_string(),
            "You cannot delete a group with default_group_for_meeting_id or admin_group_for_meeting_id."
        );
        assert_model(&store, "group/111", json!({"meeting_id": 22})).await;
    }
}

#[tokio::test]
async fn test_delete_with_users() {
    let store = store_with(meeting_with_members());
    request(&store, ADMIN_ID, "group.delete", vec![json!({"id": 111})])
        .await
        .unwrap();

    assert_deleted(&store, "group/111");
    for user in ["user/42", "user/43"] {
        assert_model(
            &store,
            user,
            json!({
                "group_$22_ids": [],
                "group_$_ids": [],
                "meeting_ids": [],
                "committee_ids": [],
            }),
        )
        .await;
    }
    assert_model(&store, "meeting/22", json!({"user_ids": [], "group_ids": []})).await;
    assert_model(&store, "committee/3", json!({"user_ids": []})).await;
}

#[tokio::test]
async fn test_delete_two_groups_matches_sequential_deletes() {
    let models = json!({
        "user/42": {
            "group_$22_ids": [111, 112],
            "group_$_ids": ["22"],
            "meeting_ids": [22],
            "committee_ids": [3],
        },
        "committee/3": {"meeting_ids": [22], "user_ids": [42]},
        "meeting/22": {"committee_id": 3, "group_ids": [111, 112], "user_ids": [42]},
        "group/111": {"name": "a", "meeting_id": 22, "user_ids": [42]},
        "group/112": {"name": "b", "meeting_id": 22, "user_ids": [42]},
    });

    let together = store_with(models.clone());
    request(
        &together,
        ADMIN_ID,
        "group.delete",
        vec![json!({"id": 111}), json!({"id": 112})],
    )
    .await
    .unwrap();

    let sequential = store_with(models);
    for id in [111, 112] {
        request(&sequential, ADMIN_ID, "group.delete", vec![json!({"id": id})])
            .await
            .unwrap();
    }

    for fqid in ["user/42", "meeting/22", "committee/3"] {
        assert_eq!(model(&together, fqid).await, model(&sequential, fqid).await);
    }
    assert_model(
        &together,
        "user/42",
        json!({"group_$22_ids": [], "meeting_ids": [], "committee_ids": []}),
    )
    .await;
}

#[tokio::test]
async fn test_delete_restricted_directory_group() {
    let store = store_with(json!({
        "meeting/22": {"group_ids": [111], "mediafile_ids": [1, 2]},
        "group/111": {
            "meeting_id": 22,
            "mediafile_access_group_ids": [1],
            "mediafile_inherited_access_group_ids": [1, 2],
        },
        "mediafile/1": {
            "meeting_id": 22,
            "is_directory": true,
            "child_ids": [2],
            "access_group_ids": [111],
            "inherited_access_group_ids": [111],
            "is_public": false,
        },
        "mediafile/2": {
            "meeting_id": 22,
            "parent_id": 1,
            "inherited_access_group_ids": [111],
            "is_public": false,
        },
    }));
    request(&store, ADMIN_ID, "group.delete", vec![json!({"id": 111})])
        .await
        .unwrap();

    assert_model(
        &store,
        "mediafile/1",
        json!({"access_group_ids": [], "inherited_access_group_ids": [], "is_public": true}),
    )
    .await;
    assert_model(
        &store,
        "mediafile/2",
        json!({"inherited_access_group_ids": [], "is_public": true}),
    )
    .await;
}

#[tokio::test]
async fn test_delete_without_permission() {
    let store = store_with(json!({
        "meeting/1": {"committee_id": 1, "group_ids": [111, 5]},
        "committee/1": {"meeting_ids": [1]},
        "group/5": {"meeting_id": 1, "user_ids": [7], "permissions": ["user.can_see"]},
        "group/111": {"name": "name_srtgb123", "meeting_id": 1},
        "user/7": {"group_$1_ids": [5], "group_$_ids": ["1"], "meeting_ids": [1]},
    }));
    let error = request(&store, 7, "group.delete", vec![json!({"id": 111})])
        .await
        .unwrap_err();
    assert_eq!(error.status_code(), 403);
    assert_eq!(
        error.to_string(),
        "Missing permission: Permission user.can_manage in meeting 1"
    );
    assert_model(&store, "group/111", json!({"meeting_id": 1})).await;

    let store = store_with(json!({
        "meeting/1": {"committee_id": 1, "group_ids": [111, 5]},
        "committee/1": {"meeting_ids": [1]},
        "group/5": {"meeting_id": 1, "user_ids": [7], "permissions": ["user.can_manage"]},
        "group/111": {"name": "name_srtgb123", "meeting_id": 1},
        "user/7": {"group_$1_ids": [5], "group_$_ids": ["1"], "meeting_ids": [1]},
    }));
    request(&store, 7, "group.delete", vec![json!({"id": 111})])
        .await
        .unwrap();
    assert_deleted(&store, "group/111");
}

#[tokio::test]
async fn test_delete_group_shared_with_other_group() {
    let store = store_with(json!({
        "meeting/22": {"group_ids": [111, 112]},
        "group/111": {
            "meeting_id": 22,
            "mediafile_access_group_ids": [1, 2],
            "mediafile_inherited_access_group_ids": [1, 2],
        },
        "group/112": {
            "meeting_id": 22,
            "mediafile_access_group_ids": [1],
            "mediafile_inherited_access_group_ids": [1],
        },
        "mediafile/1": {
            "access_group_ids": [111, 112],
            "inherited_access_group_ids": [111, 112],
            "is_public": false,
        },
        "mediafile/2": {
            "access_group_ids": [111],
            "inherited_access_group_ids": [111],
            "is_public": false,
        },
    }));
    request(&store, ADMIN_ID, "group.delete", vec![json!({"id": 111})])
        .await
        .unwrap();

    assert_deleted_model(
        &store,
        "group/111",
        json!({"mediafile_access_group_ids": [1, 2], "mediafile_inherited_access_group_ids": [1, 2]}),
    );
    assert_model(
        &store,
        "group/112",
        json!({"mediafile_access_group_ids": [1], "mediafile_inherited_access_group_ids": [1]}),
    )
    .await;
    assert_model(
        &store,
        "mediafile/1",
        json!({"is_public": false, "access_group_ids": [112], "inherited_access_group_ids": [112]}),
    )
    .await;
    assert_model(
        &store,
        "mediafile/2",
        json!({"is_public": true, "access_group_ids": [], "inherited_access_group_ids": []}),
    )
    .await;
}

#[tokio::test]
async fn test_delete_group_keeps_descendant_own_restriction() {
    let store = store_with(json!({
        "meeting/22": {"group_ids": [111, 112]},
        "group/111": {
            "meeting_id": 22,
            "mediafile_access_group_ids": [1, 4],
            "mediafile_inherited_access_group_ids": [1, 2, 3, 4],
        },
        "group/112": {
            "meeting_id": 22,
            "mediafile_access_group_ids": [4],
            "mediafile_inherited_access_group_ids": [],
        },
        "mediafile/1": {
            "access_group_ids": [111],
            "inherited_access_group_ids": [111],
            "is_public": false,
            "child_ids": [2],
            "is_directory": true,
        },
        "mediafile/2": {
            "parent_id": 1,
            "inherited_access_group_ids": [111],
            "is_public": false,
            "child_ids": [3, 4],
            "is_directory": true,
        },
        "mediafile/3": {
            "parent_id": 2,
            "inherited_access_group_ids": [111],
            "is_public": false,
        },
        "mediafile/4": {
            "parent_id": 2,
            "access_group_ids": [111, 112],
            "inherited_access_group_ids": [111],
            "is_public": false,
        },
    }));
    request(&store, ADMIN_ID, "group.delete", vec![json!({"id": 111})])
        .await
        .unwrap();

    assert_deleted_model(
        &store,
        "group/111",
        json!({"mediafile_access_group_ids": [1, 4], "mediafile_inherited_access_group_ids": [1, 2, 3, 4]}),
    );
    assert_model(
        &store,
        "group/112",
        json!({"mediafile_access_group_ids": [4], "mediafile_inherited_access_group_ids": [4]}),
    )
    .await;
    assert_model(
        &store,
        "mediafile/1",
        json!({"is_public": true, "access_group_ids": [], "inherited_access_group_ids": []}),
    )
    .await;
    for fqid in ["mediafile/2", "mediafile/3"] {
        assert_model(&store, fqid, json!({"is_public": true, "inherited_access_group_ids": []})).await;
        assert!(!model(&store, fqid).await.contains_key("access_group_ids"));
    }
    assert_model(
        &store,
        "mediafile/4",
        json!({"is_public": false, "access_group_ids": [112], "inherited_access_group_ids": [112]}),
    )
    .await;
}

#[tokio::test]
async fn test_delete_two_groups_of_one_mediafile() {
    let store = store_with(json!({
        "meeting/22": {"group_ids": [111, 112]},
        "group/111": {
            "meeting_id": 22,
            "mediafile_access_group_ids": [1, 2],
            "mediafile_inherited_access_group_ids": [1, 2],
        },
        "group/112": {
            "meeting_id": 22,
            "mediafile_access_group_ids": [2],
            "mediafile_inherited_access_group_ids": [],
        },
        "mediafile/1": {
            "access_group_ids": [111],
            "inherited_access_group_ids": [111],
            "is_public": false,
            "child_ids": [2],
            "is_directory": true,
        },
        "mediafile/2": {
            "parent_id": 1,
            "access_group_ids": [111, 112],
            "inherited_access_group_ids": [111],
            "is_public": false,
        },
    }));
    request(
        &store,
        ADMIN_ID,
        "group.delete",
        vec![json!({"id": 111}), json!({"id": 112})],
    )
    .await
    .unwrap();

    assert_deleted_model(
        &store,
        "group/111",
        json!({"mediafile_access_group_ids": [1, 2], "mediafile_inherited_access_group_ids": [1, 2]}),
    );
    assert_deleted_model(
        &store,
        "group/112",
        json!({"mediafile_access_group_ids": [2], "mediafile_inherited_access_group_ids": [2]}),
    );
    assert_model(
        &store,
        "mediafile/1",
        json!({
            "is_public": true,
            "access_group_ids": [],
            "inherited_access_group_ids": [],
            "is_directory": true,
        }),
    )
    .await;
    assert_model(
        &store,
        "mediafile/2",
        json!({"is_public": true, "access_group_ids": [], "inherited_access_group_ids": []}),
    )
    .await;
}
