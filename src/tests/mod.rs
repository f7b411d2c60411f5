use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use clap::Parser;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

use crate::app;
use crate::card::SpriteUrls;
use crate::catalog::{Catalog, HttpCatalog, LookupError};
use crate::cli::args::CliArgs;
use crate::config::ConfigFile;
use crate::fetcher::{FetchError, PageFetcher};
use crate::gallery::Gallery;
use crate::output::{self, CardCollector, OutputFormat};
use crate::style::{default_palette, StyleTable};

// minimal catalog server: GET /pokemon/<id> answers from `bodies`, anything else is a 404
async fn spawn_catalog(bodies: HashMap<u64, String>) -> (String, Arc<AtomicUsize>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let hits = Arc::new(AtomicUsize::new(0));
    let bodies = Arc::new(bodies);
    let server_hits = hits.clone();

    tokio::spawn(async move {
        loop {
            let (mut socket, _) = match listener.accept().await {
                Ok(conn) => conn,
                Err(_) => break,
            };
            let bodies = bodies.clone();
            let hits = server_hits.clone();
            tokio::spawn(async move {
                let mut buf = vec![0u8; 4096];
                let n = socket.read(&mut buf).await.unwrap_or(0);
                let request = String::from_utf8_lossy(&buf[..n]).to_string();
                let path = request.split_whitespace().nth(1).unwrap_or("/").to_string();
                hits.fetch_add(1, Ordering::SeqCst);

                let body = path
                    .strip_prefix("/pokemon/")
                    .and_then(|id| id.parse::<u64>().ok())
                    .and_then(|id| bodies.get(&id).cloned());
                let response = match body {
                    Some(body) => format!(
                        "HTTP/1.1 200 OK\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
                        body.len(),
                        body
                    ),
                    None => "HTTP/1.1 404 Not Found\r\ncontent-length: 9\r\nconnection: close\r\n\r\nNot Found"
                        .to_string(),
                };
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            });
        }
    });

    (format!("http://{}/pokemon", addr), hits)
}

fn entity_json(id: u64, name: &str, types: &[&str]) -> String {
    let slots: Vec<serde_json::Value> = types
        .iter()
        .enumerate()
        .map(|(i, t)| {
            serde_json::json!({
                "slot": i + 1,
                "type": { "name": t, "url": format!("https://example.com/type/{t}/") }
            })
        })
        .collect();
    serde_json::json!({ "id": id, "name": name, "types": slots, "height": 7 }).to_string()
}

fn starter_bodies() -> HashMap<u64, String> {
    HashMap::from([
        (1, entity_json(1, "bulbasaur", &["grass", "poison"])),
        (2, entity_json(2, "ivysaur", &["grass", "poison"])),
        (3, entity_json(3, "venusaur", &["grass", "poison"])),
        (4, entity_json(4, "charmander", &["fire"])),
        (5, entity_json(5, "charmeleon", &["fire"])),
        (6, entity_json(6, "charizard", &["fire", "flying"])),
    ])
}

#[tokio::test]
async fn http_catalog_decodes_records() {
    let (url, _) = spawn_catalog(starter_bodies()).await;
    let catalog = HttpCatalog::new(&url, 5, None).unwrap();
    let record = catalog.lookup(6).await.unwrap();
    assert_eq!(record.name, "charizard");
    assert_eq!(record.attributes, vec!["fire", "flying"]);
}

#[tokio::test]
async fn http_catalog_reports_missing_entity() {
    let (url, _) = spawn_catalog(starter_bodies()).await;
    let catalog = HttpCatalog::new(&url, 5, None).unwrap();
    assert!(matches!(
        catalog.lookup(999).await,
        Err(LookupError::NotFound { id: 999 })
    ));
}

#[tokio::test]
async fn fetch_past_catalog_end_fails_the_batch() {
    let (url, _) = spawn_catalog(starter_bodies()).await;
    let fetcher = PageFetcher::new(HttpCatalog::new(&url, 5, None).unwrap());

    let records = fetcher.fetch_ids(1, 6).await.unwrap();
    assert_eq!(
        records.iter().map(|r| r.id).collect::<Vec<_>>(),
        vec![1, 2, 3, 4, 5, 6]
    );

    let err = fetcher.fetch_ids(4, 8).await.unwrap_err();
    assert!(matches!(err, FetchError::Batch { start: 4, end: 8, .. }));
}

#[tokio::test]
async fn gallery_renders_pages_from_http_catalog() {
    let (url, hits) = spawn_catalog(starter_bodies()).await;
    let mut gallery = Gallery::new(
        PageFetcher::new(HttpCatalog::new(&url, 5, None).unwrap()),
        StyleTable::build(&default_palette()).unwrap(),
        SpriteUrls::new("http://sprites"),
        CardCollector::default(),
        3,
    )
    .unwrap();

    assert_eq!(gallery.advance().await.unwrap(), 3);
    assert_eq!(gallery.advance().await.unwrap(), 3);
    assert!(gallery.advance().await.is_err());
    // the failing batch may be cut short before every request reaches the server
    let hits = hits.load(Ordering::SeqCst);
    assert!((7..=9).contains(&hits), "unexpected request count {hits}");

    let styles = gallery.styles().clone();
    let cards = gallery.into_sink().into_cards();
    let classes: Vec<&str> = cards.iter().map(|c| c.style_class.as_str()).collect();
    assert_eq!(
        classes,
        vec![
            "type-grass-poison",
            "type-grass-poison",
            "type-grass-poison",
            "type-fire-monotype",
            "type-fire-monotype",
            "type-fire-flying",
        ]
    );

    let html = String::from_utf8(output::render(OutputFormat::Html, &cards, &styles).unwrap()).unwrap();
    assert!(html.contains("<h3 class=\"name\">Charizard</h3>"));
    assert!(html.contains("src=\"http://sprites/6.png\""));
    assert!(html.contains(".card.type-fire-flying { background-image: linear-gradient(to right, #f8c5a3, #b5ccff); }"));
    assert!(html.contains(".card.type-flying-fire { background-image: linear-gradient(to right, #b5ccff, #f8c5a3); }"));
}

#[tokio::test]
async fn json_to_stdout_is_not_mixed_with_status_lines() {
    let (url, _) = spawn_catalog(starter_bodies()).await;
    let args = CliArgs::parse_from(["dexgallery", "-u", url.as_str(), "-p", "3", "-F", "json"]);
    let run = app::build_run_config(args, ConfigFile::default()).unwrap();

    let mut status = Vec::new();
    let mut payload = Vec::new();
    app::run_gallery(run, &mut status, &mut payload).await.unwrap();

    let doc: serde_json::Value = serde_json::from_slice(&payload).unwrap();
    let names: Vec<&str> = doc["cards"]
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["Bulbasaur", "Ivysaur", "Venusaur"]);

    let status = String::from_utf8(status).unwrap();
    assert!(status.contains(":: Catalog"));
    assert!(status.contains(":: Completed ::"));
}

#[test]
fn default_palette_table_size() {
    let table = StyleTable::build(&default_palette()).unwrap();
    assert_eq!(table.len(), 18 * 18);
}
