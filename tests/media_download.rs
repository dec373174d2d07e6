use bgs_catalog::media::{self, MediaClient, MediaJob, HERO_MAP_FILE};
use bgs_catalog::model::{Cards, CatalogItem};
use serde_json::{json, Value};
use std::time::Duration;
use tempfile::tempdir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn item(value: Value) -> CatalogItem {
    serde_json::from_value(value).unwrap()
}

async fn serve(server: &MockServer, at: &str, status: u16, body: &[u8]) {
    Mock::given(method("GET"))
        .and(path(at))
        .respond_with(ResponseTemplate::new(status).set_body_bytes(body.to_vec()))
        .mount(server)
        .await;
}

fn cards(base: &str) -> Cards {
    Cards {
        heroes: vec![
            item(json!({
                "id": 1,
                "name": "Foo Bar!",
                "image": format!("{base}/art/h1.png"),
                "imageGold": format!("{base}/art/h1_gold.png")
            })),
            item(json!({ "id": 2, "name": "No Art" })),
        ],
        minions: vec![
            item(json!({ "id": 10, "slug": "10-scallywag", "image": format!("{base}/art/m10") })),
            item(json!({ "id": 11, "name": "Gone", "image": format!("{base}/art/missing.png") })),
        ],
    }
}

#[tokio::test]
async fn mirror_downloads_assets_and_tolerates_failures() {
    let server = MockServer::start().await;
    serve(&server, "/art/h1.png", 200, b"hero-one").await;
    serve(&server, "/art/h1_gold.png", 200, b"hero-one-gold").await;
    serve(&server, "/art/m10", 200, b"minion-ten").await;
    serve(&server, "/art/missing.png", 404, b"nope").await;

    let td = tempdir().unwrap();
    let media_dir = td.path().join("static").join("media");
    let client = MediaClient::new(Duration::from_secs(5)).unwrap();
    let snap = cards(&server.uri());

    let report = media::mirror_cards(&client, &snap, &media_dir, 3)
        .await
        .unwrap();
    assert_eq!(report.planned, 4);
    assert_eq!(report.downloaded, 3);
    assert_eq!(report.failed, 1);

    let read = |rel: &str| std::fs::read(media_dir.join(rel)).unwrap();
    assert_eq!(read("heroes/1_Foo_Bar_.png"), b"hero-one");
    assert_eq!(read("heroes/1_Foo_Bar__gold.png"), b"hero-one-gold");
    assert_eq!(read("minions/10_10-scallywag.png"), b"minion-ten");
    assert!(!media_dir.join("minions/11_Gone.png").exists());

    let leftovers = std::fs::read_dir(media_dir.join("minions"))
        .unwrap()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_name().to_string_lossy().ends_with(".part"))
        .count();
    assert_eq!(leftovers, 0);

    let map: Value = serde_json::from_slice(&read(HERO_MAP_FILE)).unwrap();
    assert_eq!(
        map,
        json!([
            {
                "id": "1",
                "name": "Foo Bar!",
                "image": "heroes/1_Foo_Bar_.png",
                "imageGold": "heroes/1_Foo_Bar__gold.png"
            },
            { "id": "2", "name": "No Art" }
        ])
    );
}

#[tokio::test]
async fn requests_carry_browser_headers() {
    let server = MockServer::start().await;
    serve(&server, "/art/h1.png", 200, b"x").await;

    let td = tempdir().unwrap();
    let client = MediaClient::new(Duration::from_secs(5)).unwrap();
    let snap = Cards {
        heroes: vec![item(json!({ "id": 1, "image": format!("{}/art/h1.png", server.uri()) }))],
        minions: vec![],
    };
    media::mirror_cards(&client, &snap, td.path(), 1)
        .await
        .unwrap();

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1);
    let headers = &requests[0].headers;
    let get = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string()
    };
    assert!(get("user-agent").starts_with("Mozilla/5.0"));
    assert_eq!(get("referer"), "https://playhearthstone.com/");
}

#[tokio::test]
async fn rerun_overwrites_the_same_paths() {
    let server = MockServer::start().await;
    serve(&server, "/art/h1.png", 200, b"v1").await;

    let td = tempdir().unwrap();
    let client = MediaClient::new(Duration::from_secs(5)).unwrap();
    let snap = Cards {
        heroes: vec![item(json!({ "id": 1, "name": "A", "image": format!("{}/art/h1.png", server.uri()) }))],
        minions: vec![],
    };
    media::mirror_cards(&client, &snap, td.path(), 2)
        .await
        .unwrap();

    server.reset().await;
    serve(&server, "/art/h1.png", 200, b"v2").await;
    let report = media::mirror_cards(&client, &snap, td.path(), 2)
        .await
        .unwrap();

    assert_eq!(report.downloaded, 1);
    let files: Vec<String> = std::fs::read_dir(td.path().join("heroes"))
        .unwrap()
        .filter_map(|e| e.ok())
        .map(|e| e.file_name().to_string_lossy().into_owned())
        .collect();
    assert_eq!(files, vec!["1_A.png".to_string()]);
    assert_eq!(std::fs::read(td.path().join("heroes/1_A.png")).unwrap(), b"v2");
}

#[tokio::test]
async fn failed_move_into_place_leaves_no_temp_file() {
    let server = MockServer::start().await;
    serve(&server, "/art/h1.png", 200, b"bytes").await;

    let td = tempdir().unwrap();
    let dest = td.path().join("1_A.png");
    // A non-empty directory at the destination makes the final rename fail.
    std::fs::create_dir_all(dest.join("occupied")).unwrap();

    let client = MediaClient::new(Duration::from_secs(5)).unwrap();
    let job = MediaJob {
        url: format!("{}/art/h1.png", server.uri()),
        dest: dest.clone(),
        relative: "1_A.png".into(),
    };
    let err = client.download(&job).await.unwrap_err();
    assert!(err.to_string().contains("failed to move download"), "{err:#}");

    let names: Vec<String> = std::fs::read_dir(td.path())
        .unwrap()
        .filter_map(|e| e.ok())
        .map(|e| e.file_name().to_string_lossy().into_owned())
        .collect();
    assert_eq!(names, vec!["1_A.png".to_string()]);
    assert!(dest.is_dir());
}
