use std::io::Write;

use ibroadcast::{Client, Endpoints, Mood, error::Error};
use serde_json::json;
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn endpoints(server: &MockServer) -> Endpoints {
    Endpoints::rooted_at(&server.uri())
}

fn fresh_client(server: &MockServer) -> Client {
    let set = ibroadcast::TokenSet {
        access_token: "acc-1".to_string(),
        refresh_token: "ref-1".to_string(),
        expires_at: Some(chrono::Utc::now().timestamp() + 3600),
        scope: vec![],
    };
    Client::builder("cid")
        .endpoints(endpoints(server))
        .from_token_set(set)
}

fn library_payload() -> serde_json::Value {
    json!({
        "result": true,
        "authenticated": true,
        "library": {
            "albums": {
                "55": ["Abbey Road", [301, 302], 1969],
                "map": {"name": 0, "tracks": 1, "year": 2}
            },
            "artists": {
                "9": ["The Beatles", [301, 302]],
                "map": {"name": 0, "tracks": 1}
            },
            "playlists": {
                "244526": ["Starter Songs", [301], "1234-1234-1234-1234"],
                "map": {"name": 0, "tracks": 1, "uid": 2}
            },
            "tags": {
                "17": ["favorites", [301]],
                "map": {"name": 0, "tracks": 1}
            },
            "tracks": {
                "301": ["Come Together", 55, 9],
                "302": ["Something", 55, 9],
                "map": {"title": 0, "album_id": 1, "artist_id": 2}
            }
        }
    })
}

#[tokio::test]
async fn refresh_library_populates_the_caches() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/library"))
        .and(body_string_contains("\"mode\":\"library\""))
        .respond_with(ResponseTemplate::new(200).set_body_json(library_payload()))
        .expect(1)
        .mount(&server)
        .await;

    let mut client = fresh_client(&server);
    client.refresh_library().await.expect("library downloaded");

    assert_eq!(client.albums().len(), 1);
    assert_eq!(client.album("55").unwrap()["name"], json!("Abbey Road"));
    assert_eq!(client.artist("9").unwrap()["name"], json!("The Beatles"));
    assert_eq!(
        client.playlist("244526").unwrap()["uid"],
        json!("1234-1234-1234-1234")
    );
    assert_eq!(client.tag("17").unwrap()["name"], json!("favorites"));
    assert_eq!(client.track("301").unwrap()["title"], json!("Come Together"));
    assert!(client.track("999").is_none());

    assert!(client.is_tagged("17", 301));
    assert!(!client.is_tagged("17", 302));
    assert!(!client.is_tagged("999", 301));
    assert_eq!(client.track_tags(301), vec!["17".to_string()]);
    assert!(client.track_tags(302).is_empty());
}

#[tokio::test]
async fn extensions_come_from_the_cached_status() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/status"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "result": true,
            "supported": [
                {"extension": ".mp3", "label": "MP3"},
                {"extension": ".flac", "label": "FLAC"}
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let mut client = fresh_client(&server);
    let extensions = client.extensions().await.expect("extensions");
    assert_eq!(extensions, vec![".mp3", ".flac"]);

    // Second call is served from the cached status payload
    let extensions = client.extensions().await.expect("extensions");
    assert_eq!(extensions, vec![".mp3", ".flac"]);
    server.verify().await;
}

#[tokio::test]
async fn create_playlist_returns_the_new_id() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/createplaylist"))
        .and(body_string_contains("\"name\":\"Morning\""))
        .and(body_string_contains("\"mood\":\"Chill\""))
        .and(body_string_contains("\"make_public\":false"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"result": true, "playlist_id": 4711})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let client = fresh_client(&server);
    let id = client
        .create_playlist("Morning", "easy start", false, Some(Mood::Chill))
        .await
        .expect("playlist created");
    assert_eq!(id, json!(4711));
}

#[tokio::test]
async fn playlist_track_mutations_post_the_right_modes() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/appendplaylist"))
        .and(body_string_contains("\"tracks\":[301,302]"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"result": true})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/updateplaylist"))
        .and(body_string_contains("\"tracks\":[302]"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"result": true})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/deleteplaylist"))
        .and(body_string_contains("\"playlist\":4711"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"result": true})))
        .expect(1)
        .mount(&server)
        .await;

    let client = fresh_client(&server);
    client.add_tracks(4711, &[301, 302]).await.expect("appended");
    client.set_tracks(4711, &[302]).await.expect("replaced");
    client.delete_playlist(4711).await.expect("deleted");
}

#[tokio::test]
async fn tag_tracks_posts_tag_and_untag_flag() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/tagtracks"))
        .and(body_string_contains("\"tagid\":\"17\""))
        .and(body_string_contains("\"tracks\":[301]"))
        .and(body_string_contains("\"untag\":true"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"result": true})))
        .expect(1)
        .mount(&server)
        .await;

    let client = fresh_client(&server);
    client
        .tag_tracks("17", &[301], true)
        .await
        .expect("untagged");
}

#[tokio::test]
async fn trash_posts_track_ids() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/trash"))
        .and(body_string_contains("\"tracks\":[301,302]"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"result": true})))
        .expect(1)
        .mount(&server)
        .await;

    let client = fresh_client(&server);
    client.trash(&[301, 302]).await.expect("trashed");
}

#[tokio::test]
async fn failed_operations_surface_the_server_message() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/createtag"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "result": false,
            "message": "tag already exists"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = fresh_client(&server);
    let result = client.create_tag("favorites").await;
    match result {
        Err(Error::OperationFailed(message)) => assert_eq!(message, "tag already exists"),
        other => panic!("expected operation failure, got {other:?}"),
    }
}

#[tokio::test]
async fn non_success_status_maps_to_server_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/createtag"))
        .respond_with(ResponseTemplate::new(502).set_body_json(json!({"message": "bad gateway"})))
        .expect(1)
        .mount(&server)
        .await;

    let client = fresh_client(&server);
    let result = client.create_tag("favorites").await;
    match result {
        Err(Error::Server { status, message }) => {
            assert_eq!(status, 502);
            assert_eq!(message, "bad gateway");
        }
        other => panic!("expected server error, got {other:?}"),
    }
}

#[tokio::test]
async fn upload_skips_files_the_server_already_has() {
    let server = MockServer::start().await;
    // md5("hello world")
    Mock::given(method("POST"))
        .and(path("/sync"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "result": true,
            "md5": ["5eb63bbbe01eeed093cb22bb8f5acdc3"]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(b"hello world").unwrap();

    let mut client = fresh_client(&server);
    assert!(client.is_uploaded(file.path()).await.unwrap());

    // No /upload mock mounted: a request there would fail the test
    let track_id = client.upload(file.path(), None, false).await.unwrap();
    assert_eq!(track_id, None);
}

#[tokio::test]
async fn upload_posts_the_file_and_extracts_the_track_id() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/sync"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "result": true,
            "md5": []
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/upload"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "result": true,
            "message": "song.mp3 (987654) uploaded successfully"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(b"fake audio bytes").unwrap();

    let mut client = fresh_client(&server);
    let track_id = client
        .upload(file.path(), Some("song.mp3"), false)
        .await
        .expect("uploaded");
    assert_eq!(track_id, Some("987654".to_string()));
}

#[tokio::test]
async fn forced_upload_skips_the_dedup_check() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/upload"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "result": true,
            "message": "song.mp3 (111) uploaded successfully"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(b"hello world").unwrap();

    // No /sync mock: force must not consult the checksum list
    let mut client = fresh_client(&server);
    let track_id = client
        .upload(file.path(), Some("song.mp3"), true)
        .await
        .expect("uploaded");
    assert_eq!(track_id, Some("111".to_string()));
}
