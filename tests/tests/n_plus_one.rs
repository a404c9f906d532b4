//! Query counts depend on selection depth, never on how many rows are loaded.

use proptest::prelude::*;
use std::sync::Arc;
use tether_tests::prelude::*;

/// A blog store with `users` users, each with `posts` posts, each post
/// with one comment, and every user holding role 1.
fn sized_store(users: i64, posts: i64) -> MemoryStore {
    let store = blog_store();
    for u in 10..10 + users {
        store.seed("users", fields! { "id" => u, "name" => format!("u{u}") }).unwrap();
        store.seed("role_user", fields! { "user_id" => u, "role_id" => 1i64 }).unwrap();
        for p in 0..posts {
            let post = store
                .seed("posts", fields! { "title" => format!("p{u}-{p}"), "author_id" => u })
                .unwrap();
            let comment =
                fields! { "body" => "hi", "commentable_id" => post, "commentable_type" => "Post" };
            store.seed("comments", comment).unwrap();
        }
    }
    store.clear_log();
    store
}

fn selection() -> Vec<SelectionNode> {
    vec![
        SelectionNode::field("name"),
        SelectionNode::relation(
            "posts",
            vec![SelectionNode::relation(
                "comments",
                vec![SelectionNode::relation("commentable", vec![])],
            )],
        ),
        SelectionNode::relation("roles", vec![]),
    ]
}

fn build(store: MemoryStore, config: EngineConfig) -> (Engine<MemoryStore>, Arc<MemoryStore>) {
    init_tracing();
    let store = Arc::new(store);
    let engine = Engine::new(Arc::new(blog_registry()), Arc::clone(&store), config).unwrap();
    (engine, store)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn test_query_count_is_bounded_by_selection_shape(users in 1i64..12, posts in 0i64..5) {
        let (engine, store) = build(sized_store(users, posts), EngineConfig::sequential());
        let keys: Vec<Key> = (10..10 + users).map(Key::Int).collect();

        let loaded = engine.resolve_selection("User", &keys, &selection()).unwrap();

        prop_assert_eq!(loaded.len() as i64, users);
        for user in &loaded {
            prop_assert_eq!(user.many("posts").len() as i64, posts);
        }
        // roots, posts, roles; comments and their targets only when posts exist
        let expected = if posts > 0 { 5 } else { 3 };
        prop_assert_eq!(store.query_count(), expected);
    }

    #[test]
    fn test_parallel_loading_issues_the_same_queries(users in 1i64..8, posts in 1i64..4) {
        let (engine, store) = build(sized_store(users, posts), EngineConfig::default());
        let keys: Vec<Key> = (10..10 + users).map(Key::Int).collect();

        engine.resolve_selection("User", &keys, &selection()).unwrap();

        prop_assert_eq!(store.queries_on("users"), 1);
        prop_assert_eq!(store.queries_on("posts"), 2);
        prop_assert_eq!(store.queries_on("comments"), 1);
        prop_assert_eq!(store.queries_on("role_user"), 1);
    }
}
