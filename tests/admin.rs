mod common;

use axum::http::{Method, StatusCode};
use common::{spawn_app, TestApp};
use voting_platform::models::EdgeKind;

async fn create_global_ad(app: &TestApp, admin: &str, hyperlink: &str) -> i64 {
    let res = app
        .multipart(
            Method::POST,
            "/api/v1/dashboard/ads/create-advertisement",
            admin,
            &[
                ("type", "global"),
                ("startDate", "2025-01-01"),
                ("startTime", "09:00"),
                ("endDate", "2025-01-31"),
                ("endTime", "18:00"),
                ("hyperlink", hyperlink),
            ],
            &[("images", "banner.png", "image/png", b"png-bytes")],
        )
        .await;
    assert_eq!(res.status, StatusCode::CREATED, "{}", res.body);
    assert_eq!(res.data()["isActive"], false);
    res.data()["id"].as_i64().unwrap()
}

#[tokio::test]
async fn test_admin_bootstrap_runs_once() {
    let app = spawn_app().await;
    app.admin_token().await;
    let again = app.post("/api/v1/admin/create-admins", None, None).await;
    assert_eq!(again.status, StatusCode::BAD_REQUEST);

    let wrong = app
        .post(
            "/api/v1/admin/login",
            None,
            Some(serde_json::json!({ "username": "admin1", "password": "nope" })),
        )
        .await;
    assert_eq!(wrong.status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_user_and_admin_tokens_do_not_mix() {
    let app = spawn_app().await;
    let admin = app.admin_token().await;
    let (_, user) = app.sign_up("fan", false).await;

    let as_user = app.get("/api/v1/dashboard/contestants", Some(&user)).await;
    assert_eq!(as_user.status, StatusCode::UNAUTHORIZED);
    let as_admin = app.get("/api/v1/users/current-user", Some(&admin)).await;
    assert_eq!(as_admin.status, StatusCode::UNAUTHORIZED);

    let anonymous = app.get("/api/v1/dashboard/ads", None).await;
    assert_eq!(anonymous.status, StatusCode::UNAUTHORIZED);
    let me = app.get("/api/v1/admin/current-admin", Some(&admin)).await;
    assert_eq!(me.status, StatusCode::OK);
    assert_eq!(me.data()["username"], "admin1");
}

#[tokio::test]
async fn test_single_active_global_advertisement() {
    let app = spawn_app().await;
    let admin = app.admin_token().await;
    let first = create_global_ad(&app, &admin, "https://one.test").await;
    let second = create_global_ad(&app, &admin, "https://two.test").await;

    let on = app.post(&format!("/api/v1/dashboard/ads/toggle/{}", first), Some(&admin), None).await;
    assert_eq!(on.data()["isActive"], true);
    let on = app.post(&format!("/api/v1/dashboard/ads/toggle/{}", second), Some(&admin), None).await;
    assert_eq!(on.data()["isActive"], true);

    let ads = app.get("/api/v1/dashboard/ads", Some(&admin)).await;
    let docs = ads.data()["docs"].as_array().unwrap();
    let active: Vec<_> = docs.iter().filter(|ad| ad["isActive"] == true).collect();
    assert_eq!(active.len(), 1);
    assert_eq!(active[0]["id"], second);
    assert_eq!(docs[0]["id"], second);

    app.sign_up("fan", false).await;
    let profile = app.get("/api/v1/users/p/fan", None).await;
    assert_eq!(profile.data()["globalAdvertisement"]["id"], second);
    assert_eq!(profile.data()["globalAdvertisement"]["hyperlink"], "https://two.test");

    let deleted = app.post(&format!("/api/v1/dashboard/ads/delete/{}", first), Some(&admin), None).await;
    assert_eq!(deleted.status, StatusCode::OK);
    assert_eq!(app.media.deleted_ids().len(), 1);

    app.post(&format!("/api/v1/dashboard/ads/toggle/{}", second), Some(&admin), None).await;
    let profile = app.get("/api/v1/users/p/fan", None).await;
    assert!(profile.data()["globalAdvertisement"].is_null());
}

#[tokio::test]
async fn test_advertisement_validation() {
    let app = spawn_app().await;
    let admin = app.admin_token().await;
    let (voter_id, _) = app.sign_up("voter", false).await;

    let inverted = app
        .multipart(
            Method::POST,
            "/api/v1/dashboard/ads/create-advertisement",
            &admin,
            &[
                ("type", "global"),
                ("startDate", "2025-02-01"),
                ("startTime", "09:00"),
                ("endDate", "2025-01-01"),
                ("endTime", "09:00"),
                ("hyperlink", "https://ad.test"),
            ],
            &[("images", "banner.png", "image/png", b"png")],
        )
        .await;
    assert_eq!(inverted.status, StatusCode::BAD_REQUEST);

    let voter_id = voter_id.to_string();
    let not_contestant = app
        .multipart(
            Method::POST,
            "/api/v1/dashboard/ads/create-advertisement",
            &admin,
            &[
                ("type", "individual"),
                ("contestantId", &voter_id),
                ("placement", "primary"),
                ("startDate", "2025-01-01"),
                ("startTime", "09:00"),
                ("endDate", "2025-01-02"),
                ("endTime", "09:00"),
                ("hyperlink", "https://ad.test"),
            ],
            &[("images", "banner.png", "image/png", b"png")],
        )
        .await;
    assert_eq!(not_contestant.status, StatusCode::NOT_FOUND);
    assert!(app.media.deleted_ids().is_empty());
}

#[tokio::test]
async fn test_suspended_contestant_disappears_from_public_views() {
    let app = spawn_app().await;
    let admin = app.admin_token().await;
    let (star_id, _) = app.sign_up("star", true).await;

    let toggled = app
        .json(
            Method::PATCH,
            &format!("/api/v1/dashboard/contestants/toggle/{}", star_id),
            Some(&admin),
            None,
        )
        .await;
    assert_eq!(toggled.data()["status"], "suspended");

    let public = app.get("/api/v1/users/contestants", None).await;
    assert_eq!(public.data()["totalDocs"], 0);
    let profile = app.get("/api/v1/users/p/star", None).await;
    assert_eq!(profile.status, StatusCode::NOT_FOUND);
    let dashboard = app.get("/api/v1/dashboard/contestants", Some(&admin)).await;
    assert_eq!(dashboard.data()["totalDocs"], 1);
}

#[tokio::test]
async fn test_contestant_delete_cascades_everywhere() {
    let app = spawn_app().await;
    let admin = app.admin_token().await;
    let (star_id, star) = app.sign_up("star", true).await;
    let (fan_id, fan) = app.sign_up("fan", true).await;
    let star_post = app.create_post(&star, "mine").await;
    let fan_post = app.create_post(&fan, "theirs").await;

    // Edges in both directions, on and from the contestant.
    app.post(&format!("/api/v1/follows/toggle/{}", star_id), Some(&fan), None).await;
    app.post(&format!("/api/v1/follows/toggle/{}", fan_id), Some(&star), None).await;
    app.post(&format!("/api/v1/likes/toggle/{}", star_post), Some(&fan), None).await;
    app.post(&format!("/api/v1/saved/toggle/{}", star_post), Some(&fan), None).await;
    app.post(&format!("/api/v1/likes/toggle/{}", fan_post), Some(&star), None).await;
    app.post(&format!("/api/v1/votes/toggle/{}", star_id), Some(&fan), None).await;
    app.post(&format!("/api/v1/votes/toggle/{}", fan_id), Some(&star), None).await;

    let res = app
        .post(
            &format!("/api/v1/dashboard/contestants/delete/{}", star_id),
            Some(&admin),
            None,
        )
        .await;
    assert_eq!(res.status, StatusCode::OK, "{}", res.body);
    assert_eq!(res.data()["posts"], 1);
    assert_eq!(res.data()["votes"], 2);
    assert_eq!(res.data()["follows"], 2);

    let db = &app.state.db;
    for kind in [EdgeKind::Follow, EdgeKind::Like, EdgeKind::Save, EdgeKind::Vote] {
        assert!(db.edge_targets_of(kind, star_id).await.unwrap().is_empty());
        assert!(db.edge_targets_of(kind, fan_id).await.unwrap().is_empty(), "{:?}", kind);
    }
    assert!(db.find_user(star_id).await.unwrap().is_none());
    assert!(db.find_post(star_post).await.unwrap().is_none());
    assert_eq!(app.media.deleted_ids().len(), 1);

    let fan_notifications = app.get("/api/v1/notifications", Some(&fan)).await;
    assert_eq!(fan_notifications.data()["totalDocs"], 0);
    let login = app
        .post(
            "/api/v1/users/login",
            None,
            Some(serde_json::json!({ "username": "star", "password": common::PASSWORD })),
        )
        .await;
    assert_eq!(login.status, StatusCode::FORBIDDEN);

    let again = app
        .post(
            &format!("/api/v1/dashboard/contestants/delete/{}", star_id),
            Some(&admin),
            None,
        )
        .await;
    assert_eq!(again.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_suspended_contestant_loses_access() {
    let app = spawn_app().await;
    let admin = app.admin_token().await;
    app.register("star", true).await;
    let login = app
        .post(
            "/api/v1/users/login",
            None,
            Some(serde_json::json!({ "username": "star", "password": common::PASSWORD })),
        )
        .await;
    let star_id = login.data()["user"]["id"].as_i64().unwrap();
    let access = login.data()["accessToken"].as_str().unwrap().to_string();
    let refresh = login.data()["refreshToken"].as_str().unwrap().to_string();

    app.json(
        Method::PATCH,
        &format!("/api/v1/dashboard/contestants/toggle/{}", star_id),
        Some(&admin),
        None,
    )
    .await;

    let me = app.get("/api/v1/users/current-user", Some(&access)).await;
    assert_eq!(me.status, StatusCode::UNAUTHORIZED);
    assert_eq!(me.body["success"], false);

    let post = app
        .multipart(
            Method::POST,
            "/api/v1/posts/create",
            &access,
            &[("caption", "still here")],
            &[("media", "a.jpg", "image/jpeg", b"x")],
        )
        .await;
    assert_eq!(post.status, StatusCode::UNAUTHORIZED);
    assert!(app.media.deleted_ids().is_empty());

    let refreshed = app
        .post(
            "/api/v1/users/refresh-token",
            None,
            Some(serde_json::json!({ "refreshToken": refresh })),
        )
        .await;
    assert_eq!(refreshed.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_vote_can_be_withdrawn_after_suspension() {
    let app = spawn_app().await;
    let admin = app.admin_token().await;
    let (star_id, _) = app.sign_up("star", true).await;
    let (_, fan) = app.sign_up("fan", false).await;

    let vote = app.post(&format!("/api/v1/votes/toggle/{}", star_id), Some(&fan), None).await;
    assert_eq!(vote.status, StatusCode::CREATED);

    app.json(
        Method::PATCH,
        &format!("/api/v1/dashboard/contestants/toggle/{}", star_id),
        Some(&admin),
        None,
    )
    .await;

    let withdrawn = app.post(&format!("/api/v1/votes/toggle/{}", star_id), Some(&fan), None).await;
    assert_eq!(withdrawn.status, StatusCode::OK);
    assert_eq!(withdrawn.data()["action"], "undo");

    let again = app.post(&format!("/api/v1/votes/toggle/{}", star_id), Some(&fan), None).await;
    assert_eq!(again.status, StatusCode::BAD_REQUEST);
}
