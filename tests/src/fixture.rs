//! The blog schema used by the scenario tests.
//!
//! Seeded rows:
//!
//! | table       | rows                                                         |
//! |-------------|--------------------------------------------------------------|
//! | users       | 1 Ada, 2 Bo, 3 Cy                                            |
//! | profiles    | 1 (user 1)                                                   |
//! | posts       | 1 Hello (Ada), 2 Again (Ada), 3 Howdy (Bo)                   |
//! | videos      | 1 Clip                                                       |
//! | comments    | 1 nice (Post 1), 2 wow (Video 1), 3 meh (Post 1)             |
//! | roles       | 1 admin, 2 editor, 3 viewer                                  |
//! | role_user   | (1, 2), (1, 1): Ada is editor then admin                     |
//! | employees   | 1 Boss, 2 Mid (reports to 1), 3 Low (reports to 2)           |

use std::sync::{Arc, Once};
use tether_core::{fields, Value};
use tether_engine::{Engine, EngineConfig};
use tether_registry::{PivotDef, RegistryBuilder, RelationKind, RelationRegistry};
use tether_store::MemoryStore;
use tracing_subscriber::EnvFilter;

static TRACING: Once = Once::new();

/// Route engine logs to the test writer; filter with RUST_LOG.
pub fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

/// Build the blog schema.
pub fn blog_registry() -> RelationRegistry {
    let mut b = RegistryBuilder::new();
    b.add_entity("User", "users")
        .columns(["id", "name"])
        .done()
        .expect("User");
    b.add_entity("Profile", "profiles")
        .columns(["id", "bio", "user_id"])
        .done()
        .expect("Profile");
    b.add_entity("Post", "posts")
        .columns(["id", "title", "author_id"])
        .done()
        .expect("Post");
    b.add_entity("Video", "videos")
        .columns(["id", "title"])
        .done()
        .expect("Video");
    b.add_entity("Comment", "comments")
        .columns(["id", "body", "commentable_id", "commentable_type"])
        .done()
        .expect("Comment");
    b.add_entity("Role", "roles")
        .columns(["id", "label"])
        .done()
        .expect("Role");
    b.add_entity("Employee", "employees")
        .columns(["id", "name", "manager_id"])
        .done()
        .expect("Employee");

    b.add_relation("User", "posts", RelationKind::OneToMany, "Post")
        .related_key("author_id")
        .inverse("author")
        .done()
        .expect("User.posts");
    b.add_relation("Post", "author", RelationKind::BelongsTo, "User")
        .owner_key("author_id")
        .inverse("posts")
        .done()
        .expect("Post.author");
    b.add_relation("User", "profile", RelationKind::OneToOne, "Profile")
        .related_key("user_id")
        .inverse("user")
        .done()
        .expect("User.profile");
    b.add_relation("Profile", "user", RelationKind::BelongsTo, "User")
        .owner_key("user_id")
        .inverse("profile")
        .done()
        .expect("Profile.user");
    b.add_relation("User", "roles", RelationKind::ManyToMany, "Role")
        .pivot(PivotDef::new("role_user", "user_id", "role_id"))
        .inverse("users")
        .done()
        .expect("User.roles");
    b.add_relation("Role", "users", RelationKind::ManyToMany, "User")
        .pivot(PivotDef::new("role_user", "role_id", "user_id"))
        .inverse("roles")
        .done()
        .expect("Role.users");
    b.add_relation("Comment", "commentable", RelationKind::PolymorphicTo, "Commentable")
        .owner_key("commentable_id")
        .morph("commentable_type", ["Post", "Video"])
        .done()
        .expect("Comment.commentable");
    b.add_relation("Post", "comments", RelationKind::PolymorphicMany, "Comment")
        .related_key("commentable_id")
        .morph("commentable_type", ["Post"])
        .done()
        .expect("Post.comments");
    b.add_relation("Video", "comments", RelationKind::PolymorphicMany, "Comment")
        .related_key("commentable_id")
        .morph("commentable_type", ["Video"])
        .done()
        .expect("Video.comments");
    b.add_relation("Employee", "manager", RelationKind::BelongsTo, "Employee")
        .owner_key("manager_id")
        .inverse("reports")
        .done()
        .expect("Employee.manager");
    b.add_relation("Employee", "reports", RelationKind::OneToMany, "Employee")
        .related_key("manager_id")
        .inverse("manager")
        .done()
        .expect("Employee.reports");

    b.build().expect("blog registry")
}

/// A store holding the seeded blog rows, with an empty statement log.
pub fn blog_store() -> MemoryStore {
    let store = MemoryStore::new()
        .with_table("users", "id")
        .with_table("profiles", "id")
        .with_table("posts", "id")
        .with_table("videos", "id")
        .with_table("comments", "id")
        .with_table("roles", "id")
        .with_table("employees", "id")
        .with_pivot_table("role_user");

    let rows = [
        ("users", fields! { "id" => 1i64, "name" => "Ada" }),
        ("users", fields! { "id" => 2i64, "name" => "Bo" }),
        ("users", fields! { "id" => 3i64, "name" => "Cy" }),
        ("profiles", fields! { "id" => 1i64, "bio" => "mathematician", "user_id" => 1i64 }),
        ("posts", fields! { "id" => 1i64, "title" => "Hello", "author_id" => 1i64 }),
        ("posts", fields! { "id" => 2i64, "title" => "Again", "author_id" => 1i64 }),
        ("posts", fields! { "id" => 3i64, "title" => "Howdy", "author_id" => 2i64 }),
        ("videos", fields! { "id" => 1i64, "title" => "Clip" }),
        (
            "comments",
            fields! { "id" => 1i64, "body" => "nice", "commentable_id" => 1i64, "commentable_type" => "Post" },
        ),
        (
            "comments",
            fields! { "id" => 2i64, "body" => "wow", "commentable_id" => 1i64, "commentable_type" => "Video" },
        ),
        (
            "comments",
            fields! { "id" => 3i64, "body" => "meh", "commentable_id" => 1i64, "commentable_type" => "Post" },
        ),
        ("roles", fields! { "id" => 1i64, "label" => "admin" }),
        ("roles", fields! { "id" => 2i64, "label" => "editor" }),
        ("roles", fields! { "id" => 3i64, "label" => "viewer" }),
        ("role_user", fields! { "user_id" => 1i64, "role_id" => 2i64 }),
        ("role_user", fields! { "user_id" => 1i64, "role_id" => 1i64 }),
        ("employees", fields! { "id" => 1i64, "name" => "Boss", "manager_id" => Value::Null }),
        ("employees", fields! { "id" => 2i64, "name" => "Mid", "manager_id" => 1i64 }),
        ("employees", fields! { "id" => 3i64, "name" => "Low", "manager_id" => 2i64 }),
    ];
    for (table, row) in rows {
        store.seed(table, row).expect("seed row");
    }
    store.clear_log();
    store
}

/// An engine over the seeded blog store.
pub struct Fixture {
    pub engine: Engine<MemoryStore>,
    pub store: Arc<MemoryStore>,
}

impl Fixture {
    /// Default configuration.
    pub fn new() -> Self {
        Self::with_config(EngineConfig::default())
    }

    pub fn with_config(config: EngineConfig) -> Self {
        init_tracing();
        let store = Arc::new(blog_store());
        let engine = Engine::new(Arc::new(blog_registry()), Arc::clone(&store), config)
            .expect("engine");
        Self { engine, store }
    }

    /// Number of rows currently in `table`.
    pub fn count(&self, table: &str) -> usize {
        self.store.rows(table).expect("table exists").len()
    }
}

impl Default for Fixture {
    fn default() -> Self {
        Self::new()
    }
}
