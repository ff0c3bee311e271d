// SPDX-FileCopyrightText: 2026 IdéaLab Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! End-to-end HTTP flows through the axum router.

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use serde_json::{Value, json};
use tower::ServiceExt;

use idealab_comments::CommentService;
use idealab_config::model::{Environment, IdeaLabConfig};
use idealab_core::{IdeaId, PluginAdapter, Principal};
use idealab_gateway::{AppState, router};
use idealab_security::{
    AbuseGuard, CredentialVerifier, IdentityResolver, JwtVerifier, sign_token,
};
use idealab_storage::queries::{ideas, users};
use idealab_storage::{Database, SqliteStore};
use idealab_votes::{AddressRestriction, VoteLedger};

const SECRET: &str = "integration-secret";

struct TestApp {
    app: Router,
    store: Arc<SqliteStore>,
    idea: IdeaId,
}

async fn test_app() -> TestApp {
    let config = IdeaLabConfig::default();
    let env = Environment::Development;
    let store = Arc::new(SqliteStore::from_database(
        Database::open_in_memory().await.unwrap(),
    ));
    let idea = ideas::insert_idea(store.database().unwrap(), "Solar kiosks", "", None)
        .await
        .unwrap();

    let guard = Arc::new(AbuseGuard::from_config(&config.guard, env).unwrap());
    let verifier: Arc<dyn CredentialVerifier> = Arc::new(JwtVerifier::new(SECRET, store.clone()));
    let state = AppState {
        resolver: Arc::new(IdentityResolver::new(Some(verifier), &config.identity, env)),
        ledger: Arc::new(VoteLedger::new(
            store.clone(),
            guard.clone(),
            AddressRestriction::from_config(&config.voting),
        )),
        comments: Arc::new(CommentService::new(
            store.clone(),
            guard,
            config.comments.clone(),
        )),
        adapters: vec![store.clone() as Arc<dyn PluginAdapter>],
    };

    TestApp {
        app: router(state),
        store,
        idea,
    }
}

struct Reply {
    status: StatusCode,
    session: Option<String>,
    body: Value,
}

async fn send(app: &Router, request: Request<Body>) -> Reply {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let session = response
        .headers()
        .get(header::SET_COOKIE)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(';').next())
        .and_then(|pair| pair.strip_prefix("anonymous_session_id="))
        .map(str::to_string);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    Reply {
        status,
        session,
        body,
    }
}

fn json_request(method: &str, uri: &str, session: Option<&str>, body: Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .header("x-forwarded-for", "10.0.0.5");
    if let Some(session) = session {
        builder = builder.header(header::COOKIE, format!("anonymous_session_id={session}"));
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

fn get(uri: &str, session: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().uri(uri);
    if let Some(session) = session {
        builder = builder.header(header::COOKIE, format!("anonymous_session_id={session}"));
    }
    builder.body(Body::empty()).unwrap()
}

#[tokio::test]
async fn anonymous_upvote_then_retract() {
    let t = test_app().await;

    let first = send(
        &t.app,
        json_request(
            "POST",
            "/api/votes/regular",
            None,
            json!({"idea_id": t.idea, "vote_type": "up"}),
        ),
    )
    .await;
    assert_eq!(first.status, StatusCode::OK);
    assert_eq!(first.body["action"], "created");
    assert_eq!(first.body["vote_type"], "up");
    let session = first.session.expect("session cookie should be minted");
    assert_eq!(session.len(), 64);

    let tally = send(&t.app, get(&format!("/api/votes/idea/{}", t.idea), None)).await;
    assert_eq!(tally.body["regular"]["up"], 1);
    assert_eq!(tally.body["payment"]["would_pay"], 0);

    let mine = send(
        &t.app,
        get(&format!("/api/votes/user/{}", t.idea), Some(&session)),
    )
    .await;
    assert_eq!(mine.body["regular_vote"], "up");
    assert_eq!(mine.body["payment_vote"], Value::Null);

    let second = send(
        &t.app,
        json_request(
            "POST",
            "/api/votes/regular",
            Some(&session),
            json!({"idea_id": t.idea, "vote_type": "up"}),
        ),
    )
    .await;
    assert_eq!(second.status, StatusCode::OK);
    assert_eq!(second.body["action"], "removed");
    assert_eq!(second.body["vote_type"], Value::Null);
    assert!(second.session.is_none());
}

#[tokio::test]
async fn invalid_vote_values_are_bad_requests() {
    let t = test_app().await;
    let reply = send(
        &t.app,
        json_request(
            "POST",
            "/api/votes/payment",
            None,
            json!({"idea_id": t.idea, "vote_type": "up"}),
        ),
    )
    .await;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);
    assert_eq!(reply.body["code"], "invalid_input");

    let malformed = send(
        &t.app,
        json_request("POST", "/api/votes/regular", None, json!({"idea": 1})),
    )
    .await;
    assert_eq!(malformed.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn unknown_idea_is_not_found() {
    let t = test_app().await;
    let reply = send(
        &t.app,
        json_request(
            "POST",
            "/api/votes/regular",
            None,
            json!({"idea_id": 424242, "vote_type": "down"}),
        ),
    )
    .await;
    assert_eq!(reply.status, StatusCode::NOT_FOUND);
    assert_eq!(reply.body["code"], "not_found");
}

#[tokio::test]
async fn current_votes_without_session_do_not_mint() {
    let t = test_app().await;
    let reply = send(&t.app, get(&format!("/api/votes/user/{}", t.idea), None)).await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.body["regular_vote"], Value::Null);
    assert!(reply.session.is_none());
}

#[tokio::test]
async fn bearer_token_votes_as_the_user() {
    let t = test_app().await;
    let db = t.store.database().unwrap();
    let uid = users::insert_user(db, "marie", "marie@example.org", "user")
        .await
        .unwrap();
    let principal = Principal {
        user_id: uid,
        email: "marie@example.org".into(),
        username: "marie".into(),
        role: "user".into(),
    };
    let token = sign_token(SECRET, &principal, Duration::from_secs(600)).unwrap();

    let mut request = json_request(
        "POST",
        "/api/votes/payment",
        None,
        json!({"idea_id": t.idea, "vote_type": "would_pay"}),
    );
    request.headers_mut().insert(
        header::AUTHORIZATION,
        format!("Bearer {token}").parse().unwrap(),
    );
    let reply = send(&t.app, request).await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.body["action"], "created");
    assert!(reply.session.is_none(), "authenticated callers get no cookie");

    // Deactivated users fall back to anonymous.
    users::set_user_active(db, uid, false).await.unwrap();
    let mut request = get(&format!("/api/votes/user/{}", t.idea), None);
    request.headers_mut().insert(
        header::AUTHORIZATION,
        format!("Bearer {token}").parse().unwrap(),
    );
    let reply = send(&t.app, request).await;
    assert_eq!(reply.body["payment_vote"], Value::Null);
}

#[tokio::test]
async fn cookieless_vote_burst_is_throttled() {
    let t = test_app().await;
    let db = t.store.database().unwrap();
    let mut statuses = Vec::new();
    for i in 0..7 {
        let idea = ideas::insert_idea(db, &format!("Burst {i}"), "", None)
            .await
            .unwrap();
        let reply = send(
            &t.app,
            json_request(
                "POST",
                "/api/votes/regular",
                None,
                json!({"idea_id": idea, "vote_type": "up"}),
            ),
        )
        .await;
        statuses.push(reply.status);
        if i == 6 {
            assert_eq!(reply.body["code"], "suspicious_behavior");
        }
    }
    assert!(statuses[..6].iter().all(|s| *s == StatusCode::OK));
    assert_eq!(statuses[6], StatusCode::TOO_MANY_REQUESTS);
}

#[tokio::test]
async fn spam_comment_is_rejected() {
    let t = test_app().await;
    let reply = send(
        &t.app,
        json_request(
            "POST",
            "/api/comments",
            None,
            json!({
                "idea_id": t.idea,
                "content": "BUY NOW!!! http://a.co http://b.co http://c.co CASINO WINNER",
                "author_email": "spam@example.org"
            }),
        ),
    )
    .await;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);
    assert_eq!(reply.body["code"], "spam");
}

#[tokio::test]
async fn editing_a_comment_into_spam_is_rejected() {
    let t = test_app().await;
    let posted = send(
        &t.app,
        json_request(
            "POST",
            "/api/comments",
            None,
            json!({
                "idea_id": t.idea,
                "content": "Nice idea overall",
                "author_email": "visitor@example.org"
            }),
        ),
    )
    .await;
    assert_eq!(posted.status, StatusCode::CREATED);
    let owner = posted.session.unwrap();
    let id = posted.body["comment"]["id"].as_i64().unwrap();

    let edited = send(
        &t.app,
        json_request(
            "PUT",
            &format!("/api/comments/{id}"),
            Some(&owner),
            json!({"content": "BUY NOW!!! http://a.co http://b.co http://c.co CASINO WINNER"}),
        ),
    )
    .await;
    assert_eq!(edited.status, StatusCode::BAD_REQUEST);
    assert_eq!(edited.body["code"], "spam");

    let listed = send(&t.app, get(&format!("/api/comments/idea/{}", t.idea), None)).await;
    assert_eq!(listed.body["comments"][0]["content"], "Nice idea overall");
}

#[tokio::test]
async fn comment_lifecycle_is_owner_only() {
    let t = test_app().await;

    let posted = send(
        &t.app,
        json_request(
            "POST",
            "/api/comments",
            None,
            json!({
                "idea_id": t.idea,
                "content": "Would love this in my town",
                "author_email": "Visitor@Example.org",
                "author_name": "<Visitor>"
            }),
        ),
    )
    .await;
    assert_eq!(posted.status, StatusCode::CREATED);
    assert_eq!(posted.body["comment"]["author_name"], "Visitor");
    let owner = posted.session.unwrap();
    let id = posted.body["comment"]["id"].as_i64().unwrap();

    let listed = send(
        &t.app,
        get(&format!("/api/comments/idea/{}?page=1&limit=5", t.idea), None),
    )
    .await;
    assert_eq!(listed.body["pagination"]["total"], 1);
    assert_eq!(listed.body["pagination"]["limit"], 5);

    let intruder = send(
        &t.app,
        json_request(
            "PUT",
            &format!("/api/comments/{id}"),
            Some("someone-else"),
            json!({"content": "Hijacked"}),
        ),
    )
    .await;
    assert_eq!(intruder.status, StatusCode::FORBIDDEN);
    assert_eq!(intruder.body["code"], "forbidden");

    let no_session = send(
        &t.app,
        json_request(
            "PUT",
            &format!("/api/comments/{id}"),
            None,
            json!({"content": "Hijacked"}),
        ),
    )
    .await;
    assert_eq!(no_session.status, StatusCode::FORBIDDEN);

    let edited = send(
        &t.app,
        json_request(
            "PUT",
            &format!("/api/comments/{id}"),
            Some(&owner),
            json!({"content": "Would love this in my city"}),
        ),
    )
    .await;
    assert_eq!(edited.status, StatusCode::OK);
    assert_eq!(edited.body["comment"]["content"], "Would love this in my city");

    let deleted = send(
        &t.app,
        json_request("DELETE", &format!("/api/comments/{id}"), Some(&owner), json!({})),
    )
    .await;
    assert_eq!(deleted.status, StatusCode::OK);

    let replies = send(&t.app, get(&format!("/api/comments/{id}/replies"), None)).await;
    assert_eq!(replies.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn health_reports_storage() {
    let t = test_app().await;
    let reply = send(&t.app, get("/health", None)).await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.body["status"], "healthy");
}
