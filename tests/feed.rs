mod common;

use axum::http::{Method, StatusCode};
use common::spawn_app;
use serde_json::json;

#[tokio::test]
async fn test_feed_only_shows_followed_accounts() {
    let app = spawn_app().await;
    let (followed_id, followed) = app.sign_up("followed", true).await;
    let (_, stranger) = app.sign_up("stranger", true).await;
    let (_, viewer) = app.sign_up("viewer", false).await;

    let followed_post = app.create_post(&followed, "from a friend").await;
    app.create_post(&stranger, "from a stranger").await;

    app.post(&format!("/api/v1/follows/toggle/{}", followed_id), Some(&viewer), None)
        .await;

    let feed = app.get("/api/v1/posts/feed-posts", Some(&viewer)).await;
    assert_eq!(feed.status, StatusCode::OK);
    let docs = feed.data()["docs"].as_array().unwrap();
    assert_eq!(docs.len(), 1);
    assert_eq!(docs[0]["id"], followed_post);
    assert_eq!(docs[0]["owner"]["username"], "followed");
    assert_eq!(docs[0]["isFollowing"], true);

    let guest = app.get("/api/v1/posts/guest-posts", None).await;
    assert_eq!(guest.data()["totalDocs"], 2);
    for post in guest.data()["docs"].as_array().unwrap() {
        assert_eq!(post["isFollowing"], false);
        assert_eq!(post["isLiked"], false);
    }
}

#[tokio::test]
async fn test_rejected_posts_leave_every_feed() {
    let app = spawn_app().await;
    let admin = app.admin_token().await;
    let (star_id, star) = app.sign_up("star", true).await;
    let (_, viewer) = app.sign_up("viewer", false).await;
    let post_id = app.create_post(&star, "borderline").await;
    app.post(&format!("/api/v1/follows/toggle/{}", star_id), Some(&viewer), None)
        .await;

    let pending = app.get("/api/v1/dashboard/posts/pendings", Some(&admin)).await;
    assert_eq!(pending.data()["totalDocs"], 1);

    let rejected = app
        .json(Method::PATCH, &format!("/api/v1/dashboard/posts/reject/{}", post_id), Some(&admin), None)
        .await;
    assert_eq!(rejected.status, StatusCode::OK);
    assert_eq!(rejected.data()["status"], "rejected");

    let feed = app.get("/api/v1/posts/feed-posts", Some(&viewer)).await;
    assert_eq!(feed.data()["totalDocs"], 0);
    let single = app.get(&format!("/api/v1/posts/p/{}", post_id), None).await;
    assert_eq!(single.status, StatusCode::NOT_FOUND);
    let queue = app.get("/api/v1/dashboard/posts/rejecteds", Some(&admin)).await;
    assert_eq!(queue.data()["totalDocs"], 1);
}

#[tokio::test]
async fn test_pagination_envelope() {
    let app = spawn_app().await;
    let (_, star) = app.sign_up("star", true).await;
    for i in 0..3 {
        app.create_post(&star, &format!("post {}", i)).await;
    }

    let page = app.get("/api/v1/posts/guest-posts?page=2&limit=2", None).await;
    let data = page.data();
    assert_eq!(data["totalDocs"], 3);
    assert_eq!(data["totalPages"], 2);
    assert_eq!(data["page"], 2);
    assert_eq!(data["limit"], 2);
    assert_eq!(data["hasPrevPage"], true);
    assert_eq!(data["hasNextPage"], false);
    assert_eq!(data["prevPage"], 1);
    assert!(data["nextPage"].is_null());
    assert_eq!(data["docs"].as_array().unwrap().len(), 1);
    assert_eq!(data["docs"][0]["caption"], "post 0");

    let far = app
        .get("/api/v1/posts/guest-posts?page=9223372036854775807&limit=100", None)
        .await;
    assert_eq!(far.status, StatusCode::OK);
    assert_eq!(far.data()["docs"].as_array().unwrap().len(), 0);
    assert_eq!(far.data()["hasNextPage"], false);
}

#[tokio::test]
async fn test_only_contestants_post_and_only_owners_edit() {
    let app = spawn_app().await;
    let (_, star) = app.sign_up("star", true).await;
    let (_, voter) = app.sign_up("voter", false).await;

    let refused = app
        .multipart(
            Method::POST,
            "/api/v1/posts/create",
            &voter,
            &[("caption", "hi")],
            &[("media", "a.jpg", "image/jpeg", b"x")],
        )
        .await;
    assert_eq!(refused.status, StatusCode::FORBIDDEN);

    let too_many = app
        .multipart(
            Method::POST,
            "/api/v1/posts/create",
            &star,
            &[],
            &[
                ("media", "a.jpg", "image/jpeg", b"a"),
                ("media", "b.jpg", "image/jpeg", b"b"),
                ("media", "c.jpg", "image/jpeg", b"c"),
                ("media", "d.jpg", "image/jpeg", b"d"),
            ],
        )
        .await;
    assert_eq!(too_many.status, StatusCode::BAD_REQUEST);

    let post_id = app.create_post(&star, "original").await;
    let edit = app
        .json(
            Method::PATCH,
            &format!("/api/v1/posts/edit/{}", post_id),
            Some(&voter),
            Some(json!({ "caption": "hijacked" })),
        )
        .await;
    assert_eq!(edit.status, StatusCode::FORBIDDEN);

    let edit = app
        .json(
            Method::PATCH,
            &format!("/api/v1/posts/edit/{}", post_id),
            Some(&star),
            Some(json!({ "caption": "revised", "location": "Toronto" })),
        )
        .await;
    assert_eq!(edit.status, StatusCode::OK);
    assert_eq!(edit.data()["caption"], "revised");

    let deleted = app.post(&format!("/api/v1/posts/delete/{}", post_id), Some(&star), None).await;
    assert_eq!(deleted.status, StatusCode::OK);
    assert_eq!(app.media.deleted_ids().len(), 1);
}

#[tokio::test]
async fn test_contestant_listing_sorts_by_votes() {
    let app = spawn_app().await;
    app.sign_up("quiet", true).await;
    let (popular_id, _) = app.sign_up("popular", true).await;
    let (_, voter) = app.sign_up("voter", false).await;
    app.post(&format!("/api/v1/votes/toggle/{}", popular_id), Some(&voter), None)
        .await;

    let listing = app.get("/api/v1/users/contestants?sort=top_voted", None).await;
    assert_eq!(listing.status, StatusCode::OK);
    assert_eq!(listing.data()["totalDocs"], 2);
    assert_eq!(listing.data()["docs"][0]["username"], "popular");
    assert_eq!(listing.data()["docs"][0]["votesCount"], 1);

    let options = app.post("/api/v1/users/contestant-filtering-options", None, None).await;
    assert_eq!(options.data()["countries"], json!(["Canada"]));
}
