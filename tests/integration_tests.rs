//! Integration tests using mock HTTP servers
//!
//! Tests the full flow: registry pages → probe → scan → state file,
//! and the CLI runner with Telegram, CI output and the record store.

use certwatch::cli::{Cli, Runner, ScanExit};
use certwatch::decode::SummaryTableDecoder;
use certwatch::http::{HttpClient, HttpClientConfig};
use certwatch::records::RecordStore;
use certwatch::scan::StopReason;
use certwatch::template::UrlTemplate;
use certwatch::{HttpProber, ScanConfig, Scanner, StateManager};
use clap::Parser;
use pretty_assertions::assert_eq;
use serde_json::json;
use std::path::Path;
use tempfile::tempdir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const WHOOPS: &str = "<html><body><h1>Whoops, looks like something went wrong.</h1></body></html>";

const EMPTY_PAGE: &str = "<html><body><p>ไม่พบข้อมูล</p></body></html>";

fn device_page(category: &str, brand: &str, model: &str) -> String {
    format!(
        r#"<html><body><table class="table"><tbody><tr>
        <td>{category}</td><td>{brand}</td><td>{model}</td><td>C-{model}</td>
        </tr></tbody></table></body></html>"#
    )
}

fn phone_page(model: &str) -> String {
    device_page("Cellular Mobile (GSM/WCDMA/LTE/NR)", "OPPO", model)
}

async fn mount_page(server: &MockServer, id: u64, status: u16, body: impl Into<String>) {
    Mock::given(method("GET"))
        .and(path(format!("/search-equipments/{id}")))
        .respond_with(ResponseTemplate::new(status).set_body_string(body.into()))
        .mount(server)
        .await;
}

fn prober_for(server: &MockServer) -> HttpProber {
    let client = HttpClient::with_config(
        HttpClientConfig::builder()
            .max_retries(0)
            .no_rate_limit()
            .build(),
    )
    .unwrap();
    let template =
        UrlTemplate::parse(format!("{}/search-equipments/{{{{ id }}}}", server.uri())).unwrap();

    HttpProber::new(
        template,
        client,
        Box::new(SummaryTableDecoder::new().unwrap()),
    )
    .with_end_markers(vec!["Whoops, looks like something went wrong.".to_string()])
}

// ============================================================================
// Library Flow
// ============================================================================

#[tokio::test]
async fn test_scan_persists_cursor_and_suppresses_duplicates() {
    let server = MockServer::start().await;
    mount_page(&server, 1001, 200, phone_page("CPH2699")).await;
    mount_page(&server, 1002, 200, device_page("Bluetooth", "JBL", "Flip 6")).await;
    mount_page(&server, 1003, 200, EMPTY_PAGE).await;
    mount_page(&server, 1005, 200, phone_page("CPH2699")).await;
    mount_page(&server, 1006, 500, WHOOPS).await;

    let dir = tempdir().unwrap();
    let state_path = dir.path().join("state.json");
    let prober = prober_for(&server);
    let scanner = Scanner::new(ScanConfig::new().with_max_probes(4).with_blank_run_limit(Some(3)));

    // First run: 1001..=1004
    let state = StateManager::from_file(&state_path);
    let cursor = state.load_cursor("nbtc", 1000).await;
    let known = state.known_names("nbtc").await;
    let first = scanner.scan(cursor, &prober, &known).await;

    assert_eq!(first.cursor, 1004);
    assert_eq!(first.found.len(), 1);
    assert_eq!(first.found[0].id, 1001);
    assert_eq!(first.stats.off_target, 1);
    assert_eq!(first.stop_reason, StopReason::MaxProbes);

    state.record("nbtc", first.cursor, &first.new_names).await;
    state.save().await.unwrap();

    // Second run resumes from the saved file
    let state = StateManager::from_file(&state_path);
    let cursor = state.load_cursor("nbtc", 1000).await;
    assert_eq!(cursor, 1004);

    let known = state.known_names("nbtc").await;
    assert!(known.contains("CPH2699"));

    let second = scanner.scan(cursor, &prober, &known).await;
    assert!(second.found.is_empty());
    assert_eq!(second.stats.duplicates, 1);
    assert_eq!(second.stats.end_of_data, 1);
    assert_eq!(second.cursor, 1008);

    let saved: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&state_path).unwrap()).unwrap();
    assert_eq!(saved["scans"]["nbtc"]["last_processed_id"], json!(1004));
}

#[tokio::test]
async fn test_scan_reads_legacy_state_file() {
    let server = MockServer::start().await;
    mount_page(&server, 43, 200, phone_page("A3")).await;

    let dir = tempdir().unwrap();
    let state_path = dir.path().join("state.json");
    std::fs::write(&state_path, r#"{"last_id": 42}"#).unwrap();

    let state = StateManager::from_file(&state_path);
    let cursor = state.load_cursor("nbtc", 1).await;
    assert_eq!(cursor, 42);

    let outcome = Scanner::new(ScanConfig::new().with_max_probes(1))
        .scan(cursor, &prober_for(&server), &state.known_names("nbtc").await)
        .await;
    assert_eq!(outcome.found[0].id, 43);
    assert_eq!(outcome.cursor, 43);
}

// ============================================================================
// CLI Runner
// ============================================================================

struct Harness {
    registry: MockServer,
    telegram: MockServer,
    dir: tempfile::TempDir,
}

impl Harness {
    async fn start() -> Self {
        let registry = MockServer::start().await;
        mount_page(&registry, 1001, 200, phone_page("CPH2699")).await;
        mount_page(&registry, 1002, 200, EMPTY_PAGE).await;
        mount_page(&registry, 1003, 500, WHOOPS).await;

        Self {
            registry,
            telegram: MockServer::start().await,
            dir: tempdir().unwrap(),
        }
    }

    fn path(&self, name: &str) -> std::path::PathBuf {
        self.dir.path().join(name)
    }

    fn write_config(&self) -> std::path::PathBuf {
        let yaml = format!(
            r#"
source:
  url_template: "{registry}/search-equipments/{{{{ id }}}}"
  max_retries: 0
  requests_per_second: 0
scan:
  seed_id: 1000
  max_probes: 20
  blank_run_limit: 3
records:
  database: "{database}"
notify:
  telegram:
    bot_token: "123:abc"
    chat_id: "-100200"
    api_base: "{telegram}"
"#,
            registry = self.registry.uri(),
            telegram = self.telegram.uri(),
            database = self.path("equipment.duckdb").display(),
        );
        let path = self.path("watch.yaml");
        std::fs::write(&path, yaml).unwrap();
        path
    }

    async fn expect_telegram_messages(&self, count: u64) {
        Mock::given(method("POST"))
            .and(path("/bot123:abc/sendMessage"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
            .expect(count)
            .mount(&self.telegram)
            .await;
    }

    async fn run(&self, extra: &[&str]) -> ScanExit {
        let config = self.write_config();
        let state = self.path("state.json");
        let output = self.path("github_output");

        let mut args = vec![
            "certwatch".to_string(),
            "-c".to_string(),
            config.display().to_string(),
            "--state".to_string(),
            state.display().to_string(),
            "scan".to_string(),
            "--github-output".to_string(),
            output.display().to_string(),
        ];
        args.extend(extra.iter().map(ToString::to_string));

        Runner::new(Cli::parse_from(args)).run().await.unwrap()
    }
}

fn read_cursor(state_path: &Path) -> u64 {
    let saved: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(state_path).unwrap()).unwrap();
    saved["scans"]["nbtc"]["last_processed_id"].as_u64().unwrap()
}

#[tokio::test]
async fn test_runner_reports_news_then_nothing() {
    let harness = Harness::start().await;
    harness.expect_telegram_messages(1).await;

    // 1001 match, 1002 blank, 1003 end of data, 1004 missing
    let exit = harness.run(&[]).await;
    assert_eq!(exit, ScanExit::NewsFound);
    assert_eq!(exit.code(), 77);
    assert_eq!(read_cursor(&harness.path("state.json")), 1004);

    let output = std::fs::read_to_string(harness.path("github_output")).unwrap();
    let line = output.lines().next().unwrap();
    let devices: serde_json::Value =
        serde_json::from_str(line.strip_prefix("new_devices=").unwrap()).unwrap();
    assert_eq!(devices[0]["id"], 1001);
    assert_eq!(devices[0]["model"], "CPH2699");

    let store = RecordStore::open(harness.path("equipment.duckdb")).unwrap();
    let stored = store.get(1001).unwrap().unwrap();
    assert!(stored.notified);
    drop(store);

    // Nothing new past the cursor
    let exit = harness.run(&[]).await;
    assert_eq!(exit, ScanExit::NoNews);
    assert_eq!(read_cursor(&harness.path("state.json")), 1007);
}

#[tokio::test]
async fn test_runner_keeps_results_when_telegram_rejects() {
    let harness = Harness::start().await;
    Mock::given(method("POST"))
        .and(path("/bot123:abc/sendMessage"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "ok": false,
            "description": "Forbidden: bot was blocked by the user"
        })))
        .expect(1)
        .mount(&harness.telegram)
        .await;

    let exit = harness.run(&[]).await;

    assert_eq!(exit, ScanExit::NewsFound);
    assert_eq!(exit.code(), 77);

    let state_path = harness.path("state.json");
    assert_eq!(read_cursor(&state_path), 1004);
    let saved: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&state_path).unwrap()).unwrap();
    assert_eq!(saved["scans"]["nbtc"]["known_names"], json!(["CPH2699"]));

    let store = RecordStore::open(harness.path("equipment.duckdb")).unwrap();
    let stored = store.get(1001).unwrap().unwrap();
    assert!(!stored.notified);
}

#[tokio::test]
async fn test_runner_dry_run_leaves_state_untouched() {
    let harness = Harness::start().await;
    harness.expect_telegram_messages(0).await;

    let exit = harness.run(&["--dry-run"]).await;

    assert_eq!(exit, ScanExit::NewsFound);
    assert!(!harness.path("state.json").exists());
    assert!(!harness.path("github_output").exists());
    assert!(!harness.path("equipment.duckdb").exists());
}

#[tokio::test]
async fn test_runner_start_id_overrides_cursor() {
    let harness = Harness::start().await;
    harness.expect_telegram_messages(0).await;

    let exit = harness.run(&["--start-id", "1001", "--max-probes", "2"]).await;

    assert_eq!(exit, ScanExit::NoNews);
    assert_eq!(read_cursor(&harness.path("state.json")), 1003);
}

#[tokio::test]
async fn test_runner_state_write_failure_exit_code() {
    let harness = Harness::start().await;
    harness.expect_telegram_messages(0).await;

    let config = harness.write_config();
    let state = harness.path("missing-dir").join("state.json");
    let cli = Cli::parse_from([
        "certwatch",
        "-c",
        config.to_str().unwrap(),
        "--state",
        state.to_str().unwrap(),
        "scan",
        "--max-probes",
        "1",
    ]);

    let err = Runner::new(cli).run().await.unwrap_err();
    assert_eq!(ScanExit::from_error(&err), ScanExit::StateWriteFailed);
    assert_eq!(ScanExit::from_error(&err).code(), 2);
}

#[tokio::test]
async fn test_runner_rejects_invalid_config() {
    let dir = tempdir().unwrap();
    let config = dir.path().join("watch.yaml");
    std::fs::write(&config, "source:\n  url_template: \"https://example.test/no-placeholder\"\n")
        .unwrap();

    let cli = Cli::parse_from(["certwatch", "-c", config.to_str().unwrap(), "validate"]);
    let err = Runner::new(cli).run().await.unwrap_err();

    assert_eq!(ScanExit::from_error(&err), ScanExit::Fatal);
}
