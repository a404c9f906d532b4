//! Read path: selection trees resolved below root keys.

use tether_tests::prelude::*;

fn rel(name: &str, children: Vec<SelectionNode>) -> SelectionNode {
    SelectionNode::relation(name, children)
}

fn field(name: &str) -> SelectionNode {
    SelectionNode::field(name)
}

mod roots {
    use super::*;

    #[test]
    fn test_roots_follow_requested_key_order() {
        // GIVEN
        let fx = Fixture::new();

        // WHEN
        let posts = fx
            .engine
            .resolve_selection("Post", &[Key::Int(3), Key::Int(1)], &[field("title")])
            .unwrap();

        // THEN
        assert_eq!(texts(&posts, "title"), vec!["Howdy", "Hello"]);
    }

    #[test]
    fn test_missing_root_keys_are_skipped() {
        let fx = Fixture::new();

        let users = fx
            .engine
            .resolve_selection("User", &[Key::Int(99), Key::Int(2)], &[field("name")])
            .unwrap();

        assert_eq!(texts(&users, "name"), vec!["Bo"]);
    }

    #[test]
    fn test_no_root_keys_issue_no_queries() {
        let fx = Fixture::new();

        let users = fx
            .engine
            .resolve_selection("User", &[], &[rel("posts", vec![])])
            .unwrap();

        assert!(users.is_empty());
        assert_eq!(fx.store.query_count(), 0);
    }

    #[test]
    fn test_unknown_root_type_is_rejected() {
        let fx = Fixture::new();

        let err = fx
            .engine
            .resolve_selection("Planet", &[Key::Int(1)], &[])
            .unwrap_err();

        assert!(matches!(err, EngineError::Registry(_)));
    }
}

mod relation_kinds {
    use super::*;

    #[test]
    fn test_belongs_to_and_one_to_many() {
        // GIVEN
        let fx = Fixture::new();
        let selection = vec![
            field("title"),
            rel("author", vec![field("name"), rel("posts", vec![field("title")])]),
        ];

        // WHEN
        let posts = fx
            .engine
            .resolve_selection("Post", &[Key::Int(1), Key::Int(3)], &selection)
            .unwrap();

        // THEN
        assert_eq!(posts[0].one("author").text("name"), "Ada");
        assert_eq!(texts(posts[0].one("author").many("posts"), "title"), vec!["Hello", "Again"]);
        assert_eq!(posts[1].one("author").text("name"), "Bo");
        assert_eq!(texts(posts[1].one("author").many("posts"), "title"), vec!["Howdy"]);
    }

    #[test]
    fn test_one_to_one_without_row_is_empty() {
        let fx = Fixture::new();

        let users = fx
            .engine
            .resolve_selection("User", &[Key::Int(1), Key::Int(2)], &[rel("profile", vec![])])
            .unwrap();

        assert_eq!(users[0].one("profile").text("bio"), "mathematician");
        assert_eq!(users[1].relation("profile"), Some(&Related::One(None)));
    }

    #[test]
    fn test_many_to_many_keeps_pivot_order() {
        // GIVEN - Ada was made editor before admin
        let fx = Fixture::new();

        // WHEN
        let users = fx
            .engine
            .resolve_selection("User", &[Key::Int(1), Key::Int(3)], &[rel("roles", vec![])])
            .unwrap();

        // THEN
        assert_eq!(texts(users[0].many("roles"), "label"), vec!["editor", "admin"]);
        assert!(users[1].many("roles").is_empty());
        assert_eq!(fx.store.queries_on("role_user"), 1);
    }

    #[test]
    fn test_polymorphic_to_queries_each_target_type_once() {
        // GIVEN
        let fx = Fixture::new();

        // WHEN
        let comments = fx
            .engine
            .resolve_selection(
                "Comment",
                &[Key::Int(1), Key::Int(2), Key::Int(3)],
                &[rel("commentable", vec![field("title")])],
            )
            .unwrap();

        // THEN
        let targets: Vec<_> = comments
            .iter()
            .map(|c| {
                let target = c.one("commentable");
                (target.entity_type.as_str(), target.text("title"))
            })
            .collect();
        assert_eq!(targets, vec![("Post", "Hello"), ("Video", "Clip"), ("Post", "Hello")]);
        assert_eq!(fx.store.queries_on("posts"), 1);
        assert_eq!(fx.store.queries_on("videos"), 1);
    }

    #[test]
    fn test_polymorphic_many_filters_by_parent_type() {
        // GIVEN - post 1 and video 1 share id 1
        let fx = Fixture::new();

        // WHEN
        let posts = fx
            .engine
            .resolve_selection("Post", &[Key::Int(1)], &[rel("comments", vec![])])
            .unwrap();
        let videos = fx
            .engine
            .resolve_selection("Video", &[Key::Int(1)], &[rel("comments", vec![])])
            .unwrap();

        // THEN
        assert_eq!(texts(posts[0].many("comments"), "body"), vec!["nice", "meh"]);
        assert_eq!(texts(videos[0].many("comments"), "body"), vec!["wow"]);
    }

    #[test]
    fn test_self_reference_follows_the_chain() {
        let fx = Fixture::new();
        let selection = vec![rel("manager", vec![rel("manager", vec![field("name")])])];

        let employees = fx
            .engine
            .resolve_selection("Employee", &[Key::Int(3)], &selection)
            .unwrap();

        let top = employees[0].one("manager").one("manager");
        assert_eq!(top.text("name"), "Boss");
        assert_eq!(fx.store.queries_on("employees"), 3);
    }
}

mod output {
    use super::*;

    #[test]
    fn test_load_only_relations_are_not_serialized() {
        // GIVEN
        let fx = Fixture::new();
        let selection = vec![
            field("title"),
            rel("author", vec![field("name")]),
            rel("comments", vec![]).load_only(),
        ];

        // WHEN
        let posts = fx
            .engine
            .resolve_selection("Post", &[Key::Int(1)], &selection)
            .unwrap();
        let json = serde_json::to_value(&posts[0]).unwrap();

        // THEN
        assert!(posts[0].relation("comments").is_some());
        assert_eq!(json["author"]["name"], "Ada");
        assert!(json.get("comments").is_none());
    }

    #[test]
    fn test_duplicate_sibling_selections_load_once() {
        let fx = Fixture::new();
        let selection = vec![
            rel("author", vec![field("name")]),
            rel("author", vec![rel("profile", vec![])]),
        ];

        let posts = fx
            .engine
            .resolve_selection("Post", &[Key::Int(1), Key::Int(2)], &selection)
            .unwrap();

        assert_eq!(posts[1].one("author").one("profile").text("bio"), "mathematician");
        assert_eq!(fx.store.queries_on("users"), 1);
        assert_eq!(fx.store.queries_on("profiles"), 1);
    }
}

mod failures {
    use super::*;
    use std::sync::Arc;
    use tether_registry::{RegistryBuilder, RelationKind};

    #[test]
    fn test_duplicate_one_to_one_rows_are_a_data_integrity_error() {
        // GIVEN
        let fx = Fixture::new();
        fx.store
            .seed("profiles", fields! { "bio" => "impostor", "user_id" => 1i64 })
            .unwrap();

        // WHEN
        let err = fx
            .engine
            .resolve_selection("User", &[Key::Int(1)], &[rel("profile", vec![])])
            .unwrap_err();

        // THEN
        assert!(err.is_data_integrity(), "{err}");
        assert_eq!(err.class(), ErrorClass::Server);
    }

    #[test]
    fn test_belongs_to_non_unique_related_key_is_a_data_integrity_error() {
        // GIVEN - posts point at users by handle, and two users share "x"
        let mut b = RegistryBuilder::new();
        b.add_entity("User", "users").columns(["id", "name", "handle"]).done().unwrap();
        b.add_entity("Post", "posts").columns(["id", "title", "author_handle"]).done().unwrap();
        b.add_relation("Post", "author", RelationKind::BelongsTo, "User")
            .owner_key("author_handle")
            .related_key("handle")
            .done()
            .unwrap();
        let store = MemoryStore::new().with_table("users", "id").with_table("posts", "id");
        store.seed("users", fields! { "id" => 1i64, "name" => "Ada", "handle" => "x" }).unwrap();
        store.seed("users", fields! { "id" => 2i64, "name" => "Bo", "handle" => "x" }).unwrap();
        store
            .seed("posts", fields! { "id" => 1i64, "title" => "Hello", "author_handle" => "x" })
            .unwrap();
        let engine =
            Engine::new(Arc::new(b.build().unwrap()), Arc::new(store), EngineConfig::default())
                .unwrap();

        // WHEN
        let err = engine
            .resolve_selection("Post", &[Key::Int(1)], &[rel("author", vec![])])
            .unwrap_err();

        // THEN
        assert!(err.is_data_integrity(), "{err}");
        assert_eq!(err.class(), ErrorClass::Server);
    }

    #[test]
    fn test_undeclared_stored_type_tag_is_rejected() {
        let fx = Fixture::new();
        fx.store
            .seed(
                "comments",
                fields! { "id" => 9i64, "body" => "?", "commentable_id" => 1i64, "commentable_type" => "Page" },
            )
            .unwrap();

        let err = fx
            .engine
            .resolve_selection("Comment", &[Key::Int(9)], &[rel("commentable", vec![])])
            .unwrap_err();

        assert!(matches!(err, EngineError::Loader(_)));
        assert!(err.to_string().contains("Page"), "{err}");
    }

    #[test]
    fn test_unknown_nested_relation_names_its_path() {
        let fx = Fixture::new();
        let selection = vec![rel("author", vec![rel("followers", vec![])])];

        let err = fx
            .engine
            .resolve_selection("Post", &[Key::Int(1)], &selection)
            .unwrap_err();

        assert!(err.to_string().contains("author.followers"), "{err}");
        assert_eq!(err.class(), ErrorClass::Server);
    }
}

mod concurrency {
    use super::*;

    #[test]
    fn test_parallel_and_sequential_loads_agree() {
        // GIVEN
        let parallel = Fixture::with_config(EngineConfig::default().with_max_eager_load_concurrency(4));
        let sequential = Fixture::with_config(EngineConfig::sequential());
        let selection = vec![
            rel("posts", vec![rel("comments", vec![])]),
            rel("roles", vec![]),
            rel("profile", vec![]),
        ];
        let keys = [Key::Int(1), Key::Int(2), Key::Int(3)];

        // WHEN
        let a = parallel.engine.resolve_selection("User", &keys, &selection).unwrap();
        let b = sequential.engine.resolve_selection("User", &keys, &selection).unwrap();

        // THEN
        assert_eq!(a, b);
        assert_eq!(parallel.store.query_count(), sequential.store.query_count());
    }
}
