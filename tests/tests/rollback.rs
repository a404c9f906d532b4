//! Atomicity of nested writes.

use std::thread;
use tether_tests::prelude::*;

/// A user with one fresh post and one connect to a post that does not exist.
fn failing_input() -> MutationInput {
    MutationInput::new(fields! { "name" => "Phil" }).relation(
        "posts",
        vec![
            Operation::Create(MutationInput::new(fields! { "title" => "T1" })),
            Operation::Connect(Key::Int(999)),
        ],
    )
}

#[test]
fn test_failure_deep_in_the_tree_rolls_back_every_write() {
    // GIVEN
    let fx = Fixture::new();

    // WHEN
    let err = fx.engine.execute_mutation("User", &failing_input()).unwrap_err();

    // THEN
    assert!(err.to_string().contains("999"), "{err}");
    assert_eq!(err.class(), ErrorClass::Client);
    assert_eq!(fx.count("users"), 3);
    assert_eq!(fx.count("posts"), 3);
    let found = fx
        .engine
        .resolve_selection("User", &[Key::Int(4)], &[SelectionNode::field("name")])
        .unwrap();
    assert!(found.is_empty());
}

#[test]
fn test_failed_sync_leaves_pivot_rows_in_place() {
    let fx = Fixture::new();
    let input = MutationInput::new(fields! { "name" => "Renamed" })
        .relation("roles", vec![Operation::Sync(vec![Key::Int(3), Key::Int(42)])]);

    fx.engine.execute_update("User", &Key::Int(1), &input).unwrap_err();

    let ada = fx.store.find("users", &Key::Int(1)).unwrap().unwrap();
    assert_eq!(ada.get("name"), Some(&Value::from("Ada")));
    let users = fx
        .engine
        .resolve_selection("User", &[Key::Int(1)], &[SelectionNode::field("roles")])
        .unwrap();
    assert_eq!(texts(users[0].many("roles"), "label"), vec!["editor", "admin"]);
}

#[test]
fn test_unwrapped_mutations_keep_partial_writes() {
    // GIVEN
    let fx = Fixture::with_config(EngineConfig::default().with_wrap_mutations(false));

    // WHEN
    fx.engine.execute_mutation("User", &failing_input()).unwrap_err();

    // THEN
    assert_eq!(fx.count("users"), 4);
    assert_eq!(fx.count("posts"), 4);
    let found = fx
        .engine
        .resolve_selection("User", &[Key::Int(4)], &[SelectionNode::field("posts")])
        .unwrap();
    assert_eq!(texts(found[0].many("posts"), "title"), vec!["T1"]);
}

#[test]
fn test_cancelled_call_writes_nothing() {
    let fx = Fixture::new();
    let handle = CancelHandle::new();
    handle.cancel();
    let input = MutationInput::new(fields! { "name" => "Late" });

    let err = fx
        .engine
        .execute_mutation_cancellable("User", &input, &handle)
        .unwrap_err();

    assert_eq!(err.class(), ErrorClass::Client);
    assert_eq!(fx.count("users"), 3);
    assert!(fx.store.writes_on("users").is_empty());
}

#[test]
fn test_uncancelled_handle_commits() {
    let fx = Fixture::new();
    let handle = CancelHandle::new();
    let input = MutationInput::new(fields! { "name" => "OnTime" });

    let user = fx
        .engine
        .execute_mutation_cancellable("User", &input, &handle)
        .unwrap();

    assert!(fx.store.find("users", &user.key).unwrap().is_some());
}

#[test]
fn test_concurrent_writers_are_serialized() {
    // GIVEN
    let fx = Fixture::new();

    // WHEN
    thread::scope(|s| {
        for i in 0..4 {
            let engine = &fx.engine;
            s.spawn(move || {
                let input = MutationInput::new(fields! { "name" => format!("w{i}") }).relation(
                    "posts",
                    vec![Operation::Create(MutationInput::new(fields! { "title" => "t" }))],
                );
                engine.execute_mutation("User", &input).unwrap();
            });
        }
    });

    // THEN
    assert_eq!(fx.count("users"), 7);
    assert_eq!(fx.count("posts"), 7);
    let keys: Vec<Key> = (4..8).map(Key::Int).collect();
    let users = fx
        .engine
        .resolve_selection("User", &keys, &[SelectionNode::field("posts")])
        .unwrap();
    assert_eq!(users.len(), 4);
    assert!(users.iter().all(|u| u.many("posts").len() == 1));
}

#[test]
fn test_config_from_json_controls_wrapping() {
    let config = EngineConfig::from_json(r#"{ "wrapMutationsInTransaction": false }"#).unwrap();
    let fx = Fixture::with_config(config);

    fx.engine.execute_mutation("User", &failing_input()).unwrap_err();

    assert_eq!(fx.count("users"), 4);
}
