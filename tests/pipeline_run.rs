//! End-to-end pipeline runs against a mock search endpoint.
//!
//! Every test starts its own `MockServer` that plays both the RSS search
//! endpoint and the article pages, and writes into its own temp directory.

use newsdeck::config::{Config, FeedConfig};
use newsdeck::feed::{Pipeline, FALLBACK_CONTENT};
use newsdeck::storage::{read_articles, Category};
use pretty_assertions::assert_eq;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{method, path, path_regex, query_param};
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

struct Item<'a> {
    title: &'a str,
    link: String,
    pub_date: &'a str,
    description: &'a str,
}

fn rss(items: &[Item<'_>]) -> String {
    let body: String = items
        .iter()
        .map(|i| {
            format!(
                "<item><title>{} - 교육신문</title><link>{}</link><pubDate>{}</pubDate>\
                 <description><![CDATA[<p>{}</p>]]></description></item>",
                i.title, i.link, i.pub_date, i.description
            )
        })
        .collect();
    format!(r#"<?xml version="1.0" encoding="UTF-8"?><rss version="2.0"><channel>{body}</channel></rss>"#)
}

fn page(description: &str) -> String {
    format!(
        r#"<html><head><meta property="og:description" content="{description}"></head><body></body></html>"#
    )
}

fn test_config(server: &MockServer, feeds: Vec<FeedConfig>) -> Config {
    let mut config = Config::default();
    config.source.endpoint = format!("{}/rss/search", server.uri());
    config.source.recency = String::new();
    config.enrich.allow_private_hosts = true;
    config.pipeline.seed = Some(5);
    config.feeds = feeds;
    config
}

fn temp_output(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("newsdeck_it_{name}_{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    dir.join("data.js")
}

async fn mount_feed(server: &MockServer, keyword: &str, response: ResponseTemplate) {
    Mock::given(method("GET"))
        .and(path("/rss/search"))
        .and(query_param("q", format!("(\"{keyword}\")")))
        .respond_with(response)
        .expect(1)
        .mount(server)
        .await;
}

const LONG: &str = "교육부는 오늘 2학기 학사 운영 지침을 발표하며 디지털 교과서 적용 범위를 단계적으로 넓히겠다고 밝혔다.";

#[tokio::test]
async fn test_failed_feed_does_not_block_others() {
    let server = MockServer::start().await;
    let base = server.uri();

    mount_feed(
        &server,
        "정책",
        ResponseTemplate::new(200).set_body_string(rss(&[
            Item {
                title: "정책 오전",
                link: format!("{base}/a/1"),
                pub_date: "Mon, 01 Jan 2024 01:00:00 GMT",
                description: LONG,
            },
            Item {
                title: "정책 오후",
                link: format!("{base}/a/2"),
                pub_date: "Mon, 01 Jan 2024 05:00:00 GMT",
                description: LONG,
            },
        ])),
    )
    .await;
    mount_feed(&server, "대학", ResponseTemplate::new(500)).await;
    mount_feed(
        &server,
        "AI",
        ResponseTemplate::new(200).set_body_string(rss(&[Item {
            title: "AI 소식",
            link: format!("{base}/a/3"),
            pub_date: "Mon, 01 Jan 2024 03:00:00 GMT",
            description: LONG,
        }])),
    )
    .await;

    let config = test_config(
        &server,
        vec![
            FeedConfig::new(Category::Policy, "정책", &["정책"]),
            FeedConfig::new(Category::Local, "대학", &["대학"]),
            FeedConfig::new(Category::Trend, "AI", &["AI"]),
        ],
    );
    let output = temp_output("partial");

    let articles = Pipeline::from_config(&config)
        .unwrap()
        .run_and_persist(&config.feeds, &output)
        .await
        .unwrap();

    let titles: Vec<&str> = articles.iter().map(|a| a.title.as_str()).collect();
    assert_eq!(titles, vec!["정책 오후", "AI 소식", "정책 오전"]);
    let ids: Vec<usize> = articles.iter().map(|a| a.id).collect();
    assert_eq!(ids, vec![1, 2, 3]);
    assert!(articles.iter().all(|a| a.category != Category::Local));
    assert_eq!(articles[0].content, LONG);
    assert_eq!(articles[0].date, "2024.01.01");

    let raw = std::fs::read_to_string(&output).unwrap();
    assert!(raw.starts_with("const newsData = ["));
    assert_eq!(read_articles(&output).unwrap(), articles);

    std::fs::remove_dir_all(output.parent().unwrap()).ok();
}

#[tokio::test]
async fn test_enrichment_replaces_only_with_longer_text() {
    let server = MockServer::start().await;
    let base = server.uri();
    let medium = "대학 혁신 사업 선정 결과가 공개됐다. 총 열 곳이 포함됐다."; // 20..50 chars

    mount_feed(
        &server,
        "대학",
        ResponseTemplate::new(200).set_body_string(rss(&[
            Item {
                title: "보강됨",
                link: format!("{base}/a/long"),
                pub_date: "Mon, 01 Jan 2024 09:00:00 GMT",
                description: "짧은 요약",
            },
            Item {
                title: "더 짧은 메타",
                link: format!("{base}/a/short"),
                pub_date: "Mon, 01 Jan 2024 08:00:00 GMT",
                description: medium,
            },
            Item {
                title: "페이지 없음",
                link: format!("{base}/a/missing"),
                pub_date: "Mon, 01 Jan 2024 07:00:00 GMT",
                description: "짧음",
            },
            Item {
                title: "충분히 김",
                link: format!("{base}/a/never"),
                pub_date: "Mon, 01 Jan 2024 06:00:00 GMT",
                description: LONG,
            },
        ])),
    )
    .await;

    Mock::given(method("GET"))
        .and(path("/a/long"))
        .respond_with(ResponseTemplate::new(200).set_body_string(page(LONG)))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/a/short"))
        .respond_with(ResponseTemplate::new(200).set_body_string(page("짧은 메타 설명")))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/a/missing"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/a/never"))
        .respond_with(ResponseTemplate::new(200).set_body_string(page("unused")))
        .expect(0)
        .mount(&server)
        .await;

    let config = test_config(
        &server,
        vec![FeedConfig::new(Category::Local, "대학", &["대학"])],
    );
    let articles = Pipeline::from_config(&config).unwrap().run(&config.feeds).await;

    let contents: Vec<&str> = articles.iter().map(|a| a.content.as_str()).collect();
    assert_eq!(contents, vec![LONG, medium, FALLBACK_CONTENT, LONG]);
}

#[tokio::test]
async fn test_disabled_enrichment_makes_no_page_requests() {
    let server = MockServer::start().await;
    let base = server.uri();

    mount_feed(
        &server,
        "에듀테크",
        ResponseTemplate::new(200).set_body_string(rss(&[Item {
            title: "에듀테크 투자",
            link: format!("{base}/a/1"),
            pub_date: "Tue, 02 Jan 2024 00:00:00 GMT",
            description: "짧다",
        }])),
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/a/1"))
        .respond_with(ResponseTemplate::new(200).set_body_string(page(LONG)))
        .expect(0)
        .mount(&server)
        .await;

    let mut config = test_config(
        &server,
        vec![FeedConfig::new(Category::Edutech, "에듀테크", &["에듀테크"])],
    );
    config.enrich.enabled = false;
    let articles = Pipeline::from_config(&config).unwrap().run(&config.feeds).await;

    assert_eq!(articles.len(), 1);
    assert_eq!(articles[0].content, FALLBACK_CONTENT);
}

#[tokio::test]
async fn test_seeded_runs_are_reproducible() {
    let server = MockServer::start().await;
    let base = server.uri();
    let items: Vec<Item<'_>> = (0..6)
        .map(|i| Item {
            title: "AI 소식",
            link: format!("{base}/a/{i}"),
            pub_date: "Wed, 03 Jan 2024 00:00:00 GMT",
            description: LONG,
        })
        .collect();
    Mock::given(method("GET"))
        .and(path("/rss/search"))
        .respond_with(ResponseTemplate::new(200).set_body_string(rss(&items)))
        .mount(&server)
        .await;

    let config = test_config(&server, vec![FeedConfig::new(Category::Trend, "AI", &["AI"])]);
    let pipeline = Pipeline::from_config(&config).unwrap();

    let first = pipeline.run(&config.feeds).await;
    let second = pipeline.run(&config.feeds).await;
    assert_eq!(first.len(), 6);
    assert_eq!(first, second);
}

#[tokio::test]
async fn test_unwritable_output_is_an_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string(rss(&[])))
        .mount(&server)
        .await;

    let config = test_config(&server, vec![FeedConfig::new(Category::Trend, "AI", &["AI"])]);
    let output = std::env::temp_dir()
        .join("newsdeck_it_missing_dir_does_not_exist")
        .join("nested")
        .join("data.js");

    let result = Pipeline::from_config(&config)
        .unwrap()
        .run_and_persist(&config.feeds, &output)
        .await;
    assert!(result.is_err());
    assert!(!output.exists());
}

/// Serves article pages slowly while counting how many are in flight.
///
/// The count drops shortly before the delayed response is sent, so a client
/// that waits for the response before starting the next request never sees
/// its own finished request still counted.
struct SlowPages {
    delay: Duration,
    in_flight: Arc<AtomicUsize>,
    peak: Arc<AtomicUsize>,
}

impl Respond for SlowPages {
    fn respond(&self, _request: &Request) -> ResponseTemplate {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);

        let in_flight = Arc::clone(&self.in_flight);
        let release_after = self.delay - Duration::from_millis(100);
        std::thread::spawn(move || {
            std::thread::sleep(release_after);
            in_flight.fetch_sub(1, Ordering::SeqCst);
        });

        ResponseTemplate::new(200)
            .set_body_string(page(LONG))
            .set_delay(self.delay)
    }
}

#[tokio::test]
async fn test_enrichment_respects_concurrency_limit() {
    let server = MockServer::start().await;
    let base = server.uri();
    let items: Vec<Item<'_>> = (0..6)
        .map(|i| Item {
            title: "에듀테크 소식",
            link: format!("{base}/page/{i}"),
            pub_date: "Thu, 04 Jan 2024 00:00:00 GMT",
            description: "짧은 요약",
        })
        .collect();
    mount_feed(
        &server,
        "에듀테크",
        ResponseTemplate::new(200).set_body_string(rss(&items)),
    )
    .await;

    let peak = Arc::new(AtomicUsize::new(0));
    Mock::given(method("GET"))
        .and(path_regex(r"^/page/\d+$"))
        .respond_with(SlowPages {
            delay: Duration::from_millis(300),
            in_flight: Arc::new(AtomicUsize::new(0)),
            peak: Arc::clone(&peak),
        })
        .expect(6)
        .mount(&server)
        .await;

    let mut config = test_config(
        &server,
        vec![FeedConfig::new(Category::Edutech, "에듀테크", &["에듀테크"])],
    );
    config.pipeline.enrich_concurrency = 2;
    let articles = Pipeline::from_config(&config)
        .unwrap()
        .run(&config.feeds)
        .await;

    assert_eq!(articles.len(), 6);
    assert!(articles.iter().all(|a| a.content == LONG));
    let peak = peak.load(Ordering::SeqCst);
    assert!((1..=2).contains(&peak), "peak in-flight page requests: {peak}");
}
