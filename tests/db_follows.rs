use std::sync::Arc;

use sqlx::PgPool;
use time::macros::datetime;
use uuid::Uuid;
use yatube::{
    application::{
        authors::AuthorService,
        feed::FeedService,
        follow::{FollowError, FollowService},
        pagination::{PageNumber, Paginator},
        repos::{CreatePostParams, FollowsWriteRepo, PostsWriteRepo, RepoError},
    },
    domain::entities::AuthorRecord,
    infra::db::PostgresRepositories,
};

struct Fixture {
    pool: PgPool,
    repos: Arc<PostgresRepositories>,
    follows: FollowService,
    feed: FeedService,
    authors: AuthorService,
}

impl Fixture {
    fn new(pool: PgPool) -> Self {
        let repos = Arc::new(PostgresRepositories::new(pool.clone()));
        Self {
            follows: FollowService::new(repos.clone(), repos.clone(), repos.clone()),
            feed: FeedService::new(
                repos.clone(),
                repos.clone(),
                repos.clone(),
                repos.clone(),
                Paginator::default(),
            ),
            authors: AuthorService::new(repos.clone(), repos.clone()),
            repos,
            pool,
        }
    }

    async fn author(&self, username: &str) -> AuthorRecord {
        self.authors.register(username).await.expect("register author")
    }

    async fn post_at(&self, author: &AuthorRecord, text: &str, at: time::OffsetDateTime) {
        sqlx::query("INSERT INTO posts (id, author_id, text, created_at) VALUES ($1, $2, $3, $4)")
            .bind(Uuid::new_v4())
            .bind(author.id)
            .bind(text)
            .bind(at)
            .execute(&self.pool)
            .await
            .expect("insert post");
    }

    async fn follow_rows(&self) -> i64 {
        sqlx::query_scalar("SELECT COUNT(*) FROM follows")
            .fetch_one(&self.pool)
            .await
            .expect("count follows")
    }
}

#[sqlx::test(migrations = "./migrations")]
async fn following_twice_keeps_one_edge(pool: PgPool) {
    let fx = Fixture::new(pool);
    let alice = fx.author("alice").await;
    fx.author("bob").await;

    let first = fx.follows.follow(&alice, "bob").await.expect("first follow");
    let second = fx.follows.follow(&alice, "bob").await.expect("second follow");

    assert_eq!(first.id, second.id);
    assert_eq!(fx.follow_rows().await, 1);
}

#[sqlx::test(migrations = "./migrations")]
async fn concurrent_follows_create_a_single_edge(pool: PgPool) {
    let fx = Fixture::new(pool);
    let alice = fx.author("alice").await;
    let bob = fx.author("bob").await;

    let (left, right) = tokio::join!(
        fx.repos.insert_follow(alice.id, bob.id),
        fx.repos.insert_follow(alice.id, bob.id),
    );

    let left = left.expect("left insert");
    let right = right.expect("right insert");
    assert_eq!(left.id, right.id);
    assert_eq!(fx.follow_rows().await, 1);
}

#[sqlx::test(migrations = "./migrations")]
async fn self_follow_is_rejected_before_and_by_storage(pool: PgPool) {
    let fx = Fixture::new(pool);
    let alice = fx.author("alice").await;

    let err = fx
        .follows
        .follow(&alice, "alice")
        .await
        .expect_err("self follow");
    assert!(matches!(err, FollowError::SelfFollow));

    let err = fx
        .repos
        .insert_follow(alice.id, alice.id)
        .await
        .expect_err("storage check");
    assert!(matches!(err, RepoError::Integrity { .. }));
    assert_eq!(fx.follow_rows().await, 0);
}

#[sqlx::test(migrations = "./migrations")]
async fn unfollow_is_idempotent(pool: PgPool) {
    let fx = Fixture::new(pool);
    let alice = fx.author("alice").await;
    let bob = fx.author("bob").await;

    fx.follows.follow(&alice, "bob").await.expect("follow");
    fx.follows.unfollow(&alice, "bob").await.expect("unfollow");
    fx.follows.unfollow(&alice, "bob").await.expect("second unfollow");

    assert!(!fx.follows.is_following(alice.id, bob.id).await.expect("query"));
    assert_eq!(fx.follow_rows().await, 0);
}

#[sqlx::test(migrations = "./migrations")]
async fn feed_contains_only_followed_authors_newest_first(pool: PgPool) {
    let fx = Fixture::new(pool);
    let alice = fx.author("alice").await;
    let bob = fx.author("bob").await;
    let carol = fx.author("carol").await;
    let dave = fx.author("dave").await;

    fx.post_at(&bob, "bob old", datetime!(2024-01-01 10:00 UTC)).await;
    fx.post_at(&carol, "carol new", datetime!(2024-01-03 10:00 UTC)).await;
    fx.post_at(&bob, "bob new", datetime!(2024-01-02 10:00 UTC)).await;
    fx.post_at(&dave, "dave newest", datetime!(2024-01-04 10:00 UTC)).await;

    fx.follows.follow(&alice, "bob").await.expect("follow bob");
    fx.follows.follow(&alice, "carol").await.expect("follow carol");

    let page = fx
        .feed
        .get_feed(&alice, PageNumber::FIRST)
        .await
        .expect("feed");
    let texts: Vec<&str> = page.items.iter().map(|post| post.text.as_str()).collect();
    assert_eq!(texts, ["carol new", "bob new", "bob old"]);
    assert_eq!(page.total, 3);
}

#[sqlx::test(migrations = "./migrations")]
async fn empty_follow_set_yields_one_empty_page(pool: PgPool) {
    let fx = Fixture::new(pool);
    let alice = fx.author("alice").await;
    let bob = fx.author("bob").await;
    fx.post_at(&bob, "unseen", datetime!(2024-01-01 10:00 UTC)).await;

    let page = fx
        .feed
        .get_feed(&alice, PageNumber::new(7))
        .await
        .expect("feed");
    assert!(page.items.is_empty());
    assert_eq!(page.number, 1);
    assert_eq!(page.num_pages, 1);
}

#[sqlx::test(migrations = "./migrations")]
async fn feed_pages_clamp_to_the_last_page(pool: PgPool) {
    let fx = Fixture::new(pool);
    let alice = fx.author("alice").await;
    let bob = fx.author("bob").await;
    for day in 1..=12u8 {
        let at = datetime!(2024-01-01 00:00 UTC).replace_day(day).expect("valid day");
        fx.post_at(&bob, &format!("post {day}"), at).await;
    }
    fx.follows.follow(&alice, "bob").await.expect("follow");

    let page = fx
        .feed
        .get_feed(&alice, PageNumber::new(99))
        .await
        .expect("feed");
    assert_eq!(page.number, 2);
    assert_eq!(page.num_pages, 2);
    let texts: Vec<&str> = page.items.iter().map(|post| post.text.as_str()).collect();
    assert_eq!(texts, ["post 2", "post 1"]);
}

#[sqlx::test(migrations = "./migrations")]
async fn posts_sharing_a_timestamp_list_latest_insert_first(pool: PgPool) {
    let fx = Fixture::new(pool);
    let leo = fx.author("leo").await;

    for text in ["earlier", "later"] {
        fx.repos
            .create_post(CreatePostParams {
                author_id: leo.id,
                text: text.to_string(),
                group_id: None,
                image: None,
            })
            .await
            .expect("create post");
    }
    sqlx::query("UPDATE posts SET created_at = $1")
        .bind(datetime!(2024-03-01 12:00 UTC))
        .execute(&fx.pool)
        .await
        .expect("align timestamps");

    let page = fx
        .feed
        .home_timeline(PageNumber::FIRST)
        .await
        .expect("home timeline");
    let texts: Vec<&str> = page.items.iter().map(|post| post.text.as_str()).collect();
    assert_eq!(texts, ["later", "earlier"]);
}
