//! End-to-end conformance tests for the parlor user API.
//!
//! Each test spawns an ephemeral in-process server (real TCP, real HTTP) via
//! [`parlor_conformance::spawn_server`] and exercises the full API surface
//! with a `reqwest` HTTP client.
//!
//! # Authentication in tests
//!
//! The server resolves the `token` header against its in-process token cache;
//! there is no login endpoint (the wider application issues sessions). Tests
//! therefore:
//! 1. Create the user row directly in storage.
//! 2. Mint a session token straight into the token cache.
//! 3. Send subsequent requests with that token in the `token` header.
//!
//! This mirrors real deployment, where the login service seeds the session
//! and this service only consumes it.
//!
//! # Coverage
//!
//! | Test | Behavior |
//! |------|----------|
//! | `get_self_returns_cached_snapshot` | self view served from the token cache |
//! | `get_self_without_token_returns_401` | required-auth rejection |
//! | `update_profile_roundtrip` | multipart self-update, cache refresh |
//! | `update_profile_stores_avatar` | avatar upload + revision bump |
//! | `change_room_updates_presence` | partial presence update |
//! | `profile_shows_counts_and_relationship` | profile merge of counts + flags |
//! | `profile_unknown_id_returns_404` | profile not-found |
//! | `latest_users_caps_at_ten_newest_first` | listing order and cap |
//! | `thank_flow_transfers_and_rate_limits` | credit transfer + cooldown |
//! | `thank_self_returns_400` | self-thank rejection |
//! | `thank_unknown_returns_404` | thank target not-found |
//! | `block_sets_expiry_and_kills_sessions` | block + bulk session revocation |
//! | `block_by_member_returns_403` | moderator gate |
//! | `block_equal_rank_returns_409` | rank rule |
//! | `unblock_clears_expiry` | unblock |

use chrono::{Days, Duration, Utc};
use parlor_api::Role;
use parlor_conformance::{spawn_server, TestServer};
use parlor_server::storage::{NewUser, Storage, UserRecord};
use serde_json::Value;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn make_client() -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(5))
        .build()
        .unwrap()
}

/// Create a user row and mint a live session token for it.
async fn seed_user(server: &TestServer, user: NewUser) -> (UserRecord, String) {
    let record = server.storage.create_user(&user).await.expect("seed user");
    let token = server.tokens.issue(&record.public());
    (record, token)
}

/// A member whose cooldown window has long expired.
fn thanker(uuid: &str, name: &str) -> NewUser {
    NewUser {
        last_checkin: Utc::now() - Duration::hours(2),
        ..NewUser::new(uuid, name)
    }
}

// ---------------------------------------------------------------------------
// Self account
// ---------------------------------------------------------------------------

#[tokio::test]
async fn get_self_returns_cached_snapshot() {
    let server = spawn_server().await;
    let client = make_client();
    let (record, token) = seed_user(&server, NewUser::new("u-self", "Ada")).await;

    let resp = client
        .get(format!("{}/api/v1/user", server.base_url))
        .header("token", &token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["uuid"].as_str(), Some("u-self"));
    assert_eq!(body["name"].as_str(), Some("Ada"));
    assert_eq!(body["id"].as_i64(), Some(record.id));

    // A write that bypasses the HTTP layer is not visible: the self view is
    // the cached snapshot, not a database read.
    server
        .storage
        .update_presence("u-self", Some("chat"), None)
        .await
        .unwrap();
    let body: Value = client
        .get(format!("{}/api/v1/user", server.base_url))
        .header("token", &token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["mode"].as_str(), Some(""));
}

#[tokio::test]
async fn get_self_without_token_returns_401() {
    let server = spawn_server().await;
    let client = make_client();

    let resp = client
        .get(format!("{}/api/v1/user", server.base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 401);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["code"].as_str(), Some("unauthorized"));
}

#[tokio::test]
async fn update_profile_roundtrip() {
    let server = spawn_server().await;
    let client = make_client();
    let (_, token) = seed_user(&server, NewUser::new("u-self", "Ada")).await;

    let form = reqwest::multipart::Form::new()
        .text("name", "Ada Lovelace")
        .text("about", "first programmer");
    let resp = client
        .post(format!("{}/api/v1/user", server.base_url))
        .header("token", &token)
        .multipart(form)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["token"].as_str(), Some(token.as_str()));
    assert_eq!(body["user"]["name"].as_str(), Some("Ada Lovelace"));
    assert_eq!(body["user"]["about"].as_str(), Some("first programmer"));

    // The session cache was refreshed, so the self view shows the new name.
    let body: Value = client
        .get(format!("{}/api/v1/user", server.base_url))
        .header("token", &token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["name"].as_str(), Some("Ada Lovelace"));

    // Omitting a field overwrites it with the empty default.
    let form = reqwest::multipart::Form::new().text("name", "Ada Lovelace");
    client
        .post(format!("{}/api/v1/user", server.base_url))
        .header("token", &token)
        .multipart(form)
        .send()
        .await
        .unwrap();
    let stored = server.storage.user_by_uuid("u-self").await.unwrap().unwrap();
    assert_eq!(stored.about, "");
}

#[tokio::test]
async fn update_profile_stores_avatar() {
    let server = spawn_server().await;
    let client = make_client();
    let (record, token) = seed_user(&server, NewUser::new("u-self", "Ada")).await;

    let avatar = reqwest::multipart::Part::bytes(b"fake-jpeg-bytes".to_vec())
        .file_name("avatar.jpg")
        .mime_str("image/jpeg")
        .unwrap();
    let form = reqwest::multipart::Form::new()
        .text("name", "Ada")
        .text("about", "")
        .part("avatar", avatar);

    let resp = client
        .post(format!("{}/api/v1/user", server.base_url))
        .header("token", &token)
        .multipart(form)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["user"]["avatar"].as_i64(), Some(1));

    let (content_type, data) = server
        .blobs
        .get(&format!("{}.jpg", record.id))
        .expect("avatar blob stored");
    assert_eq!(content_type, "image/jpeg");
    assert_eq!(data.as_ref(), b"fake-jpeg-bytes");
}

#[tokio::test]
async fn change_room_updates_presence() {
    let server = spawn_server().await;
    let client = make_client();
    let (_, token) = seed_user(&server, NewUser::new("u-self", "Ada")).await;

    let resp = client
        .post(format!("{}/api/v1/change_room", server.base_url))
        .header("token", &token)
        .json(&serde_json::json!({ "mode": "chat", "room": "lobby" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    assert_eq!(resp.text().await.unwrap(), "ok");

    // Partial update: only the present field changes.
    client
        .post(format!("{}/api/v1/change_room", server.base_url))
        .header("token", &token)
        .json(&serde_json::json!({ "room": "den" }))
        .send()
        .await
        .unwrap();
    let stored = server.storage.user_by_uuid("u-self").await.unwrap().unwrap();
    assert_eq!(stored.mode, "chat");
    assert_eq!(stored.room, "den");
}

// ---------------------------------------------------------------------------
// User lookup
// ---------------------------------------------------------------------------

#[tokio::test]
async fn profile_shows_counts_and_relationship() {
    let server = spawn_server().await;
    let client = make_client();
    let (viewer, viewer_token) = seed_user(&server, NewUser::new("u-a", "Ada")).await;
    let (target, _) = seed_user(&server, NewUser::new("u-b", "Brin")).await;

    server
        .storage
        .put_follow(&viewer.uuid, &target.uuid)
        .await
        .unwrap();

    let resp = client
        .get(format!("{}/api/v1/user/{}", server.base_url, target.id))
        .header("token", &viewer_token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["uuid"].as_str(), Some("u-b"));
    assert_eq!(body["followerCount"].as_i64(), Some(1));
    assert_eq!(body["followingCount"].as_i64(), Some(0));
    assert_eq!(body["isFollowing"].as_bool(), Some(true));
    assert_eq!(body["isFollower"].as_bool(), Some(false));
}

#[tokio::test]
async fn profile_unknown_id_returns_404() {
    let server = spawn_server().await;
    let client = make_client();
    let (_, token) = seed_user(&server, NewUser::new("u-a", "Ada")).await;

    let resp = client
        .get(format!("{}/api/v1/user/4242", server.base_url))
        .header("token", &token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["code"].as_str(), Some("not_found"));
}

#[tokio::test]
async fn latest_users_caps_at_ten_newest_first() {
    let server = spawn_server().await;
    let client = make_client();
    for i in 0..12 {
        server
            .storage
            .create_user(&NewUser::new(format!("u-{i}"), format!("user{i}")))
            .await
            .unwrap();
    }

    // No token: the listing is public.
    let resp = client
        .get(format!("{}/api/v1/latest_users", server.base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    let users = body.as_array().unwrap();
    assert_eq!(users.len(), 10);
    assert_eq!(users[0]["uuid"].as_str(), Some("u-11"));
    assert_eq!(users[9]["uuid"].as_str(), Some("u-2"));
}

// ---------------------------------------------------------------------------
// Thanks
// ---------------------------------------------------------------------------

#[tokio::test]
async fn thank_flow_transfers_and_rate_limits() {
    let server = spawn_server().await;
    let client = make_client();
    let (caller, caller_token) = seed_user(&server, thanker("u-a", "Ada")).await;
    let (target, _) = seed_user(
        &server,
        NewUser {
            credit: 5,
            ..NewUser::new("u-b", "Brin")
        },
    )
    .await;

    let resp = client
        .post(format!("{}/api/v1/thank_user", server.base_url))
        .header("token", &caller_token)
        .json(&serde_json::json!({ "userId": target.uuid }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["credit"].as_i64(), Some(1));

    let stored_target = server.storage.user_by_uuid("u-b").await.unwrap().unwrap();
    assert_eq!(stored_target.credit, 8);

    // The caller's refreshed session shows the new balance.
    let body: Value = client
        .get(format!("{}/api/v1/user", server.base_url))
        .header("token", &caller_token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["credit"].as_i64(), Some(1));

    // A second thank inside the window is refused and changes nothing.
    let resp = client
        .post(format!("{}/api/v1/thank_user", server.base_url))
        .header("token", &caller_token)
        .json(&serde_json::json!({ "userId": target.uuid }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 429);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"].as_str(), Some("Too soon"));

    let stored_caller = server.storage.user_by_uuid(&caller.uuid).await.unwrap().unwrap();
    assert_eq!(stored_caller.credit, 1);
}

#[tokio::test]
async fn thank_self_returns_400() {
    let server = spawn_server().await;
    let client = make_client();
    let (caller, token) = seed_user(&server, thanker("u-a", "Ada")).await;

    let resp = client
        .post(format!("{}/api/v1/thank_user", server.base_url))
        .header("token", &token)
        .json(&serde_json::json!({ "userId": caller.uuid }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["code"].as_str(), Some("self_action_not_allowed"));
}

#[tokio::test]
async fn thank_unknown_returns_404() {
    let server = spawn_server().await;
    let client = make_client();
    let (_, token) = seed_user(&server, thanker("u-a", "Ada")).await;

    let resp = client
        .post(format!("{}/api/v1/thank_user", server.base_url))
        .header("token", &token)
        .json(&serde_json::json!({ "userId": "u-missing" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);
}

// ---------------------------------------------------------------------------
// Moderation
// ---------------------------------------------------------------------------

#[tokio::test]
async fn block_sets_expiry_and_kills_sessions() {
    let server = spawn_server().await;
    let client = make_client();
    let (_, mod_token) = seed_user(
        &server,
        NewUser {
            role: Role::Mod,
            ..NewUser::new("u-mod", "Mo")
        },
    )
    .await;
    let (target, target_token) = seed_user(&server, NewUser::new("u-b", "Brin")).await;

    let expected = Utc::now().date_naive() + Days::new(3);
    let resp = client
        .post(format!("{}/api/v1/block_user", server.base_url))
        .header("token", &mod_token)
        .json(&serde_json::json!({ "userId": target.uuid }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body.as_str(), Some(format!("Block until {expected}").as_str()));

    let stored = server.storage.user_by_uuid("u-b").await.unwrap().unwrap();
    assert_eq!(stored.block_until, Some(expected));

    // The target's session was revoked: the next request fails auth.
    let resp = client
        .get(format!("{}/api/v1/user", server.base_url))
        .header("token", &target_token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 401);
}

#[tokio::test]
async fn block_by_member_returns_403() {
    let server = spawn_server().await;
    let client = make_client();
    let (_, member_token) = seed_user(&server, NewUser::new("u-a", "Ada")).await;
    let (target, _) = seed_user(&server, NewUser::new("u-b", "Brin")).await;

    let resp = client
        .post(format!("{}/api/v1/block_user", server.base_url))
        .header("token", &member_token)
        .json(&serde_json::json!({ "userId": target.uuid }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 403);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"].as_str(), Some("No permission"));
}

#[tokio::test]
async fn block_equal_rank_returns_409() {
    let server = spawn_server().await;
    let client = make_client();
    let (_, mod_token) = seed_user(
        &server,
        NewUser {
            role: Role::Mod,
            ..NewUser::new("u-mod", "Mo")
        },
    )
    .await;
    let (peer, _) = seed_user(
        &server,
        NewUser {
            role: Role::Mod,
            ..NewUser::new("u-mod2", "Max")
        },
    )
    .await;

    let resp = client
        .post(format!("{}/api/v1/block_user", server.base_url))
        .header("token", &mod_token)
        .json(&serde_json::json!({ "userId": peer.uuid }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 409);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["code"].as_str(), Some("rank_conflict"));
}

#[tokio::test]
async fn unblock_clears_expiry() {
    let server = spawn_server().await;
    let client = make_client();
    let (_, mod_token) = seed_user(
        &server,
        NewUser {
            role: Role::Mod,
            ..NewUser::new("u-mod", "Mo")
        },
    )
    .await;
    let (target, _) = seed_user(&server, NewUser::new("u-b", "Brin")).await;
    server
        .storage
        .set_block_until(&target.uuid, Some(Utc::now().date_naive()))
        .await
        .unwrap();

    let resp = client
        .post(format!("{}/api/v1/unblock_user", server.base_url))
        .header("token", &mod_token)
        .json(&serde_json::json!({ "userId": target.uuid }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body.as_str(), Some("unblocked"));

    let stored = server.storage.user_by_uuid("u-b").await.unwrap().unwrap();
    assert_eq!(stored.block_until, None);
}
