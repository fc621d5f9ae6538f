mod support;

use axum::http::StatusCode;
use playhead_config::ServerConfig;
use playhead_contracts::prelude::{MediaServer, RemoteError, TimelineUpdate};
use playhead_http::{ClientBuildError, PlexClient};
use playhead_model::{
    ContentId, MarkerKind, ServerSessionId, StreamProfile, TimelineState,
};
use serde_json::{Value, json};
use support::{FakeRemote, Recorded, dead_address};

const TOKEN: &str = "plex-token";
const DECISION: &str = "/video/:/transcode/universal/decision";

fn config(base_url: &str) -> ServerConfig {
    ServerConfig {
        base_url: Some(base_url.to_string()),
        token: Some(TOKEN.to_string()),
        client_identifier: "living-room".to_string(),
        ..ServerConfig::default()
    }
}

fn ok(body: Value) -> (StatusCode, Value) {
    (StatusCode::OK, body)
}

fn empty() -> (StatusCode, Value) {
    ok(json!({}))
}

fn episode(rating_key: &str, season: u32, index: u32) -> Value {
    json!({
        "ratingKey": rating_key,
        "type": "episode",
        "title": format!("Episode {index}"),
        "thumb": format!("/library/metadata/{rating_key}/thumb"),
        "grandparentRatingKey": "100",
        "parentIndex": season,
        "index": index,
    })
}

fn library(request: &Recorded) -> (StatusCode, Value) {
    match request.path.as_str() {
        "/library/metadata/501" => {
            let mut meta = episode("501", 1, 2);
            meta["Marker"] = json!([
                {"type": "credits", "startTimeOffset": 1_300_000, "endTimeOffset": 1_380_000},
                {"type": "intro", "startTimeOffset": 30_000, "endTimeOffset": 90_000},
            ]);
            ok(json!({ "MediaContainer": { "Metadata": [meta] } }))
        }
        "/library/metadata/502" => {
            ok(json!({ "MediaContainer": { "Metadata": [episode("502", 1, 3)] } }))
        }
        "/library/metadata/900" => ok(json!({
            "MediaContainer": { "Metadata": [{ "ratingKey": "900", "type": "movie" }] }
        })),
        "/library/metadata/100/allLeaves" => ok(json!({
            "MediaContainer": { "Metadata": [
                episode("500", 1, 1),
                episode("501", 1, 2),
                episode("502", 1, 3),
            ] }
        })),
        _ => (StatusCode::NOT_FOUND, json!({})),
    }
}

#[tokio::test]
async fn resolve_stream_names_session_and_builds_both_urls() {
    let remote = FakeRemote::start(|request| match request.path.as_str() {
        DECISION => ok(json!({
            "MediaContainer": {
                "generalDecisionCode": 1001,
                "Metadata": [{ "ratingKey": "501" }],
            }
        })),
        _ => empty(),
    })
    .await;
    let client = PlexClient::new(&config(&remote.base_url)).unwrap();

    let ticket = client
        .resolve_stream(&ContentId::new("501"), &StreamProfile::default())
        .await
        .unwrap();

    let decision = remote.only_request();
    assert_eq!(decision.path, DECISION);
    assert_eq!(decision.header("x-plex-token"), Some(TOKEN));
    assert_eq!(decision.header("x-plex-client-identifier"), Some("living-room"));
    assert_eq!(decision.param("path"), Some("/library/metadata/501"));
    assert_eq!(decision.param("protocol"), Some("hls"));
    assert_eq!(decision.param("directPlay"), Some("0"));
    assert_eq!(decision.param("directStream"), Some("0"));

    let session = ticket.server_session_id.as_str();
    assert!(!session.is_empty());
    assert_eq!(decision.param("session"), Some(session));

    assert_eq!(
        ticket.start_url.path(),
        "/video/:/transcode/universal/start.m3u8"
    );
    let start_query: Vec<(String, String)> =
        ticket.start_url.query_pairs().into_owned().collect();
    assert!(start_query.contains(&("session".into(), session.into())));
    assert!(start_query.contains(&("X-Plex-Token".into(), TOKEN.into())));

    assert_eq!(
        ticket.session_url.path(),
        format!("/video/:/transcode/universal/session/{session}/base/index.m3u8")
    );
}

#[tokio::test]
async fn stream_copy_still_goes_through_a_transcode_session() {
    let remote = FakeRemote::start(|_| {
        ok(json!({
            "MediaContainer": {
                "generalDecisionCode": 1000,
                "Metadata": [{ "ratingKey": "501" }],
            }
        }))
    })
    .await;
    let client = PlexClient::new(&config(&remote.base_url)).unwrap();
    let profile = StreamProfile {
        direct_stream: true,
        ..StreamProfile::default()
    };

    let ticket = client
        .resolve_stream(&ContentId::new("501"), &profile)
        .await
        .unwrap();

    let decision = remote.only_request();
    assert_eq!(decision.param("directPlay"), Some("0"));
    assert_eq!(decision.param("directStream"), Some("1"));
    let start_query: Vec<(String, String)> =
        ticket.start_url.query_pairs().into_owned().collect();
    assert!(start_query.contains(&("directPlay".into(), "0".into())));
    assert!(
        ticket
            .session_url
            .path()
            .starts_with("/video/:/transcode/universal/session/")
    );
}

#[tokio::test]
async fn refused_or_empty_decisions_are_not_playable() {
    let remote = FakeRemote::start(|request| match request.param("path") {
        Some("/library/metadata/1") => ok(json!({
            "MediaContainer": {
                "generalDecisionCode": 2000,
                "generalDecisionText": "cannot transcode",
                "Metadata": [{ "ratingKey": "1" }],
            }
        })),
        _ => ok(json!({ "MediaContainer": { "generalDecisionCode": 1000 } })),
    })
    .await;
    let client = PlexClient::new(&config(&remote.base_url)).unwrap();
    let profile = StreamProfile::default();

    let refused = client
        .resolve_stream(&ContentId::new("1"), &profile)
        .await
        .unwrap_err();
    assert!(matches!(refused, RemoteError::NotPlayable(ref reason) if reason.contains("2000")));

    let empty = client
        .resolve_stream(&ContentId::new("2"), &profile)
        .await
        .unwrap_err();
    assert!(empty.is_content_problem());
}

#[tokio::test]
async fn status_codes_map_onto_remote_errors() {
    let remote = FakeRemote::start(|request| match request.path.as_str() {
        DECISION => (StatusCode::UNAUTHORIZED, json!({})),
        _ => (StatusCode::SERVICE_UNAVAILABLE, json!({ "error": "busy" })),
    })
    .await;
    let client = PlexClient::new(&config(&remote.base_url)).unwrap();

    let denied = client
        .resolve_stream(&ContentId::new("501"), &StreamProfile::default())
        .await
        .unwrap_err();
    assert_eq!(denied, RemoteError::Unauthenticated);

    let start_url: url::Url =
        format!("{}/video/:/transcode/universal/start.m3u8", remote.base_url)
            .parse()
            .unwrap();
    let busy = client.start_session(&start_url).await.unwrap_err();
    assert!(matches!(busy, RemoteError::Status { status: 503, .. }));
}

#[tokio::test]
async fn unreachable_server_is_reported_as_such() {
    let client = PlexClient::new(&config(&dead_address().await)).unwrap();

    let err = client
        .fetch_markers(&ContentId::new("501"))
        .await
        .unwrap_err();
    assert!(matches!(err, RemoteError::Unreachable(_)), "got {err:?}");
}

#[tokio::test]
async fn timeline_updates_carry_state_position_and_session() {
    let remote = FakeRemote::start(|_| empty()).await;
    let client = PlexClient::new(&config(&remote.base_url)).unwrap();

    client
        .update_timeline(&TimelineUpdate {
            content_id: ContentId::new("501"),
            server_session_id: ServerSessionId::new("sess-1"),
            state: TimelineState::Paused,
            position_ms: 65_000,
            duration_ms: 1_380_000,
        })
        .await
        .unwrap();

    let request = remote.only_request();
    assert_eq!(request.path, "/:/timeline");
    assert_eq!(request.param("ratingKey"), Some("501"));
    assert_eq!(request.param("key"), Some("/library/metadata/501"));
    assert_eq!(request.param("state"), Some("paused"));
    assert_eq!(request.param("time"), Some("65000"));
    assert_eq!(request.param("duration"), Some("1380000"));
    assert_eq!(request.header("x-plex-session-identifier"), Some("sess-1"));
}

#[tokio::test]
async fn stopping_a_session_tolerates_an_already_gone_session() {
    let remote = FakeRemote::start(|request| match request.param("session") {
        Some("gone") => (StatusCode::NOT_FOUND, json!({})),
        _ => empty(),
    })
    .await;
    let client = PlexClient::new(&config(&remote.base_url)).unwrap();

    client
        .stop_session(&ServerSessionId::new("live"))
        .await
        .unwrap();
    client
        .stop_session(&ServerSessionId::new("gone"))
        .await
        .unwrap();

    let requests = remote.requests();
    assert_eq!(requests.len(), 2);
    assert!(
        requests
            .iter()
            .all(|r| r.path == "/video/:/transcode/universal/stop")
    );
}

#[tokio::test]
async fn markers_come_from_item_metadata() {
    let remote = FakeRemote::start(library).await;
    let client = PlexClient::new(&config(&remote.base_url)).unwrap();

    let markers = client.fetch_markers(&ContentId::new("501")).await.unwrap();

    let request = remote.only_request();
    assert_eq!(request.param("includeMarkers"), Some("1"));
    let kinds: Vec<_> = markers.iter().map(|m| (m.kind, m.start_ms)).collect();
    assert_eq!(
        kinds,
        vec![(MarkerKind::Credits, 1_300_000), (MarkerKind::Intro, 30_000)]
    );
}

#[tokio::test]
async fn next_up_is_the_following_episode_of_the_show() {
    let remote = FakeRemote::start(library).await;
    let client = PlexClient::new(&config(&remote.base_url)).unwrap();

    let next = client
        .fetch_next_up(&ContentId::new("501"))
        .await
        .unwrap()
        .expect("episode 501 has a successor");
    assert_eq!(next.content_id, ContentId::new("502"));
    assert_eq!(next.title, "Episode 3");
    assert_eq!(next.label, "S1:E3");
    assert_eq!(
        next.thumbnail_ref.as_deref(),
        Some("/library/metadata/502/thumb")
    );
    remote.request_to("/library/metadata/100/allLeaves");
}

#[tokio::test]
async fn last_episodes_and_movies_have_no_next_up() {
    let remote = FakeRemote::start(library).await;
    let client = PlexClient::new(&config(&remote.base_url)).unwrap();

    assert_eq!(client.fetch_next_up(&ContentId::new("502")).await.unwrap(), None);
    assert_eq!(client.fetch_next_up(&ContentId::new("900")).await.unwrap(), None);

    let leaves_requests = remote
        .requests()
        .iter()
        .filter(|r| r.path.ends_with("/allLeaves"))
        .count();
    assert_eq!(leaves_requests, 1);
}

#[test]
fn construction_requires_a_base_url() {
    let err = PlexClient::new(&ServerConfig::default()).unwrap_err();
    assert!(matches!(err, ClientBuildError::MissingBaseUrl));
}
