mod helpers;

use std::sync::Arc;
use std::thread;

use helpers::{MembershipBuilder, PolicyBuilder, RoleBuilder};
use role_policy::policy::{EditTarget, PolicyEngine, PolicyError, RoleDocument};

fn editor_without_blog() -> MembershipBuilder {
    MembershipBuilder::new().role(
        RoleBuilder::new("Editor")
            .policy(PolicyBuilder::allow_entries())
            .policy(PolicyBuilder::deny_entries().content_type("blog"))
            .policy(PolicyBuilder::allow_assets().actions(&["read"])),
    )
}

#[test]
fn test_queries_fail_before_membership() {
    let engine = PolicyEngine::new();
    assert!(!engine.is_ready());
    assert!(matches!(
        engine.can_access_entries(),
        Err(PolicyError::NotReady)
    ));
    assert!(matches!(
        engine.can_edit_field_locale(EditTarget::Asset, "title", "en-US"),
        Err(PolicyError::NotReady)
    ));
}

#[test]
fn test_allow_all_with_content_type_deny() {
    let engine = PolicyEngine::new();
    engine.set_membership(&editor_without_blog().build());

    assert!(engine.is_ready());
    assert!(!engine.is_admin().unwrap());
    assert!(engine.can_access_entries().unwrap());
    assert!(engine.can_access_assets().unwrap());

    assert!(engine.can_update_entries_of_type("news").unwrap());
    assert!(!engine.can_update_entries_of_type("blog").unwrap());
    // read-only asset access grants no update
    assert!(!engine.can_update_assets().unwrap());

    let blog = EditTarget::Entry {
        content_type: "blog",
    };
    let news = EditTarget::Entry {
        content_type: "news",
    };
    assert!(!engine.can_edit_field_locale(blog, "title", "en-US").unwrap());
    assert!(engine.can_edit_field_locale(news, "title", "en-US").unwrap());
}

#[test]
fn test_deny_in_second_role_blocks_content_type() {
    let engine = PolicyEngine::new();
    engine.set_membership(
        &MembershipBuilder::new()
            .role(RoleBuilder::new("Editor").policy(PolicyBuilder::allow_entries()))
            .role(
                RoleBuilder::new("No blog")
                    .policy(PolicyBuilder::deny_entries().content_type("blog")),
            )
            .build(),
    );

    assert!(!engine.can_update_entries_of_type("blog").unwrap());
    assert!(engine.can_update_entries_of_type("other").unwrap());
}

#[test]
fn test_hand_written_role_adds_no_access() {
    let hand_written: RoleDocument = serde_json::from_value(serde_json::json!({
        "sys": { "id": "legacy", "version": 2, "type": "Role" },
        "name": "Legacy",
        "policies": [
            { "effect": "allow", "actions": "all",
              "constraint": { "or": [
                  { "equals": [{ "doc": "sys.type" }, "Entry"] },
                  { "equals": [{ "doc": "sys.type" }, "Asset"] }
              ] } }
        ]
    }))
    .unwrap();

    let engine = PolicyEngine::new();
    engine.set_membership(
        &MembershipBuilder::new()
            .raw_role(hand_written)
            .role(
                RoleBuilder::new("Reader")
                    .policy(PolicyBuilder::allow_entries().actions(&["read"])),
            )
            .build(),
    );

    assert!(engine.can_access_entries().unwrap());
    assert!(!engine.can_access_assets().unwrap());
    assert!(!engine.can_update_entries_of_type("news").unwrap());
    assert!(!engine.can_update_assets().unwrap());
}

#[test]
fn test_unfamiliar_actions_fail_closed() {
    let engine = PolicyEngine::new();
    engine.set_membership(
        &MembershipBuilder::new()
            .role(
                RoleBuilder::new("Future")
                    .policy(PolicyBuilder::allow_entries().actions(&["translate"])),
            )
            .build(),
    );
    assert!(!engine.can_access_entries().unwrap());
    assert!(!engine.can_update_entries_of_type("news").unwrap());
}

#[test]
fn test_publish_only_role_grants_access() {
    let engine = PolicyEngine::new();
    engine.set_membership(
        &MembershipBuilder::new()
            .role(
                RoleBuilder::new("Publisher")
                    .policy(PolicyBuilder::allow_entries().actions(&["publish"])),
            )
            .build(),
    );
    assert!(engine.can_access_entries().unwrap());
    assert!(!engine.can_update_entries_of_type("news").unwrap());
}

#[test]
fn test_translator_role_limited_to_locale() {
    let engine = PolicyEngine::new();
    engine.set_membership(
        &MembershipBuilder::new()
            .role(
                RoleBuilder::new("Translator")
                    .policy(PolicyBuilder::allow_entries().actions(&["read"]))
                    .policy(
                        PolicyBuilder::allow_entries()
                            .actions(&["update"])
                            .path("fields.%.de-DE"),
                    ),
            )
            .build(),
    );

    let post = EditTarget::Entry {
        content_type: "post",
    };
    assert!(engine.can_edit_field_locale(post, "body", "de-DE").unwrap());
    assert!(!engine.can_edit_field_locale(post, "body", "en-US").unwrap());
    assert!(engine.can_update_entries_of_type("post").unwrap());
}

#[test]
fn test_field_deny_does_not_block_entity_update() {
    let engine = PolicyEngine::new();
    engine.set_membership(
        &MembershipBuilder::new()
            .role(
                RoleBuilder::new("Author")
                    .policy(PolicyBuilder::allow_entries())
                    .policy(
                        PolicyBuilder::deny_entries()
                            .actions(&["update"])
                            .path("fields.slug.%"),
                    ),
            )
            .build(),
    );

    let page = EditTarget::Entry {
        content_type: "page",
    };
    assert!(engine.can_update_entries_of_type("page").unwrap());
    assert!(!engine.can_edit_field_locale(page, "slug", "en-US").unwrap());
    assert!(engine.can_edit_field_locale(page, "title", "en-US").unwrap());
}

#[test]
fn test_own_content_only() {
    let engine = PolicyEngine::new();
    engine.set_membership(
        &MembershipBuilder::new()
            .role(
                RoleBuilder::new("Contributor")
                    .policy(PolicyBuilder::allow_entries().actions(&["update"]).own_only())
                    .policy(PolicyBuilder::allow_assets().actions(&["update"]).own_only()),
            )
            .build(),
    );

    assert!(engine.can_update_own_entries().unwrap());
    assert!(engine.can_update_own_assets().unwrap());
    assert!(!engine.can_update_entries_of_type("news").unwrap());
    assert!(!engine.can_update_assets().unwrap());
}

#[test]
fn test_roles_aggregate_across_membership() {
    let engine = PolicyEngine::new();
    engine.set_membership(
        &MembershipBuilder::new()
            .role(RoleBuilder::new("Entries").policy(PolicyBuilder::allow_entries()))
            .role(RoleBuilder::new("Assets").policy(PolicyBuilder::allow_assets()))
            .build(),
    );

    assert!(engine.can_update_entries_of_type("news").unwrap());
    assert!(engine.can_update_assets().unwrap());
    assert!(engine
        .can_edit_field_locale(EditTarget::Asset, "file", "en-US")
        .unwrap());
}

#[test]
fn test_admin_edits_any_field() {
    let engine = PolicyEngine::new();
    engine.set_membership(&MembershipBuilder::new().admin().build());

    assert!(engine.is_admin().unwrap());
    assert!(engine
        .can_edit_field_locale(
            EditTarget::Entry {
                content_type: "anything"
            },
            "title",
            "fr-FR"
        )
        .unwrap());
    // entity-level checks still follow the rules
    assert!(!engine.can_access_entries().unwrap());
}

#[test]
fn test_field_decisions_are_cached_per_membership() {
    let engine = PolicyEngine::new();
    let membership = editor_without_blog().build();
    engine.set_membership(&membership);

    let news = EditTarget::Entry {
        content_type: "news",
    };
    for _ in 0..5 {
        assert!(engine.can_edit_field_locale(news, "title", "en-US").unwrap());
    }
    assert_eq!(engine.rule_evaluations(), 1);

    engine.set_membership(&membership);
    assert_eq!(engine.rule_evaluations(), 0);
    assert!(engine.can_edit_field_locale(news, "title", "en-US").unwrap());
    assert_eq!(engine.rule_evaluations(), 1);
}

#[test]
fn test_later_membership_wins() {
    let engine = PolicyEngine::new();
    let first = engine.prepare_membership(&editor_without_blog().build());
    let second = engine.prepare_membership(&MembershipBuilder::new().build());
    assert!(second.ticket() > first.ticket());

    assert!(engine.install(second));
    assert!(!engine.install(first));
    assert!(!engine.can_access_entries().unwrap());
}

#[test]
fn test_concurrent_readers_see_whole_snapshots() {
    let engine = Arc::new(PolicyEngine::new());
    let open = editor_without_blog().build();
    let closed = MembershipBuilder::new().build();
    engine.set_membership(&open);

    let readers: Vec<_> = (0..4)
        .map(|_| {
            let engine = Arc::clone(&engine);
            thread::spawn(move || {
                for _ in 0..200 {
                    assert!(engine.is_ready());
                    engine.can_update_entries_of_type("news").unwrap();
                    engine
                        .can_edit_field_locale(EditTarget::Asset, "file", "en-US")
                        .unwrap();
                }
            })
        })
        .collect();

    for i in 0..50 {
        engine.set_membership(if i % 2 == 0 { &closed } else { &open });
    }
    for reader in readers {
        reader.join().unwrap();
    }
    assert!(engine.can_access_entries().unwrap());
}
