use std::time::Duration;

use rss_scout::config::Config;
use rss_scout::engine::{Engine, SelectorSet};
use rss_scout::feed::pipeline::{infer_from_page, process_site, update_all};
use rss_scout::feed::{PageFetcher, Site};
use rss_scout::Error;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use test_data::*;

fn fetcher() -> PageFetcher {
    PageFetcher::new()
        .unwrap()
        .with_timeout(Duration::from_secs(5))
        .with_retries(1, Duration::from_millis(10))
}

async fn serve(server: &MockServer, route: &str, body: &str) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(body)
                .insert_header("content-type", "text/html; charset=utf-8"),
        )
        .mount(server)
        .await;
}

fn read_channel(path: &std::path::Path) -> rss::Channel {
    let xml = std::fs::read_to_string(path).unwrap();
    rss::Channel::read_from(xml.as_bytes()).unwrap()
}

#[tokio::test]
async fn test_infer_then_publish() {
    let server = MockServer::start().await;
    serve(&server, "/tzgg/index.html", NOTICE_LIST_PAGE).await;
    let temp_dir = TempDir::new().unwrap();
    let engine = Engine::default();

    let selectors = infer_from_page(&engine, NOTICE_LIST_PAGE, None).unwrap();
    let site = Site::new(
        "notices",
        &format!("{}/tzgg/index.html", server.uri()),
        temp_dir.path().join("notices.xml"),
        selectors,
    );

    let report = process_site(&fetcher(), &engine, &site).await.unwrap();
    assert_eq!(report.records, 5);
    assert_eq!(report.dropped(), 0);

    let channel = read_channel(&site.output);
    assert_eq!(channel.title(), "通知公告 - 科学技术厅");
    assert_eq!(channel.description(), "通知公告列表");
    assert_eq!(channel.language(), Some("zh-CN"));

    let items = channel.items();
    assert_eq!(items.len(), 5);
    // oldest first
    assert_eq!(items[0].title(), Some("关于调整办事指南的说明"));
    assert_eq!(items[4].title(), Some("关于开展科技项目申报的通知"));
    assert_eq!(
        items[4].link(),
        Some(format!("{}/tzgg/content/post_1.html", server.uri()).as_str())
    );
    assert_eq!(items[4].guid().map(|g| g.value()), items[4].link());
}

#[tokio::test]
async fn test_update_all_with_failing_site() {
    let server = MockServer::start().await;
    serve(&server, "/table.html", TABLE_PAGE).await;
    Mock::given(method("GET"))
        .and(path("/down.html"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;
    let temp_dir = TempDir::new().unwrap();

    let table_selectors = SelectorSet {
        container: "table.table-content > tbody".to_string(),
        item: "tr".to_string(),
        title: "a".to_string(),
        link: "a".to_string(),
        date: "td:nth-child(2)".to_string(),
    };
    let sites = vec![
        Site::new(
            "table",
            &format!("{}/table.html", server.uri()),
            temp_dir.path().join("table.xml"),
            table_selectors.clone(),
        ),
        Site::new(
            "down",
            &format!("{}/down.html", server.uri()),
            temp_dir.path().join("down.xml"),
            table_selectors,
        ),
    ];

    let summary = update_all(&fetcher(), &Engine::default(), &sites).await;
    assert_eq!(summary.succeeded.len(), 1);
    assert_eq!(summary.succeeded[0].records, 5);
    // header row has no title
    assert_eq!(summary.succeeded[0].dropped(), 1);

    assert_eq!(summary.failed.len(), 1);
    assert!(matches!(summary.failed[0].1, Error::HttpError(_)));
    assert!(!temp_dir.path().join("down.xml").exists());

    let channel = read_channel(&temp_dir.path().join("table.xml"));
    assert_eq!(channel.title(), "Announcements");
    assert_eq!(channel.items().len(), 5);
}

#[tokio::test]
async fn test_sites_from_config() {
    let server = MockServer::start().await;
    serve(&server, "/cards", CARD_PAGE).await;
    let temp_dir = TempDir::new().unwrap();
    let output = temp_dir.path().join("feeds").join("cards.xml");

    let toml = format!(
        r##"
[settings]
timezone_offset = "+00:00"

[[sites]]
name = "cards"
url = "{}/cards"
output = "{}"
title = "Newsroom cards"
language = "en"

[sites.selectors]
container = "#content"
item = "div.news-item"
title = "h3 a"
link = "h3 a"
date = "p.meta span"
"##,
        server.uri(),
        output.display()
    );
    let config_path = temp_dir.path().join("config.toml");
    std::fs::write(&config_path, toml).unwrap();

    let config = Config::load(&config_path).unwrap();
    let engine = Engine::new(config.engine.clone(), config.settings.offset().unwrap());
    let summary = update_all(&fetcher(), &engine, &config.sites).await;
    assert!(summary.is_success());

    let channel = read_channel(&output);
    assert_eq!(channel.title(), "Newsroom cards");
    assert_eq!(channel.language(), Some("en"));
    assert_eq!(channel.items()[0].title(), Some("Delta recap"));
    let pub_date =
        chrono::DateTime::parse_from_rfc2822(channel.items()[0].pub_date().unwrap()).unwrap();
    assert_eq!(pub_date.to_rfc3339(), "2024-05-01T00:00:00+00:00");
}
