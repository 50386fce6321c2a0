//! Tests for notify module

use super::*;
use crate::http::{HttpClient, HttpClientConfig};
use chrono::{TimeZone, Utc};
use pretty_assertions::assert_eq;
use serde_json::json;
use tempfile::tempdir;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn phone(id: u64, model: &str) -> MatchedRecord {
    MatchedRecord {
        category: Some("Cellular Mobile (GSM/WCDMA/LTE/NR)".to_string()),
        brand: Some("Samsung".to_string()),
        model: Some(model.to_string()),
        url: Some(format!("https://mocheck.nbtc.go.th/search-equipments/{id}")),
        ..MatchedRecord::new(id)
    }
}

fn telegram_for(server: &MockServer) -> TelegramNotifier {
    let client = HttpClient::with_config(
        HttpClientConfig::builder()
            .max_retries(0)
            .no_rate_limit()
            .build(),
    )
    .unwrap();
    TelegramNotifier::new(client, server.uri(), "123:abc", "-100200")
}

// ============================================================================
// Report Formatting
// ============================================================================

#[test]
fn test_format_report_single() {
    let found_at = Utc.with_ymd_and_hms(2025, 2, 3, 4, 5, 6).unwrap();
    let report = format_report(&[phone(6, "SM_S938B")], found_at);

    assert_eq!(
        report,
        "🔥 *New equipment found!*\n\n\
         📱 *Name:* N/A\n\
         🏷️ *Brand:* Samsung\n\
         📋 *Model:* SM\\_S938B\n\
         🏢 *Company:* N/A\n\
         📄 *Cert #:* N/A\n\
         *Category:* Cellular Mobile (GSM/WCDMA/LTE/NR)\n\
         🔗 https://mocheck.nbtc.go.th/search-equipments/6\n\n\
         *Found at:* 2025-02-03 04:05:06 UTC"
    );
}

#[test]
fn test_format_report_counts_records() {
    let found_at = Utc.with_ymd_and_hms(2025, 2, 3, 4, 5, 6).unwrap();
    let report = format_report(&[phone(1, "A"), phone(2, "B")], found_at);

    assert!(report.starts_with("🔥 *2 new equipment records found!*"));
    assert!(report.contains("search-equipments/1"));
    assert!(report.contains("search-equipments/2"));
}

#[test]
fn test_escape_markdown() {
    assert_eq!(escape_markdown("a_b*c`d[e]"), "a\\_b\\*c\\`d\\[e]");
    assert_eq!(escape_markdown("โทรศัพท์"), "โทรศัพท์");
}

#[test]
fn test_split_message_short_text_is_one_message() {
    assert_eq!(split_message("one\n\ntwo", 100), vec!["one\n\ntwo".to_string()]);
}

#[test]
fn test_split_message_on_section_boundaries() {
    let text = ["a".repeat(6), "b".repeat(6), "c".repeat(6)].join("\n\n");
    let parts = split_message(&text, 14);

    assert_eq!(
        parts,
        vec![
            format!("{}\n\n{}", "a".repeat(6), "b".repeat(6)),
            "c".repeat(6),
        ]
    );
}

#[test]
fn test_split_message_cuts_oversized_section() {
    let text = format!("head\n\n{}", "ก".repeat(25));
    let parts = split_message(&text, 10);

    assert_eq!(parts.len(), 4);
    assert_eq!(parts[0], "head");
    assert!(parts.iter().all(|p| p.chars().count() <= 10));
    assert_eq!(parts[1..].concat(), "ก".repeat(25));
}

#[test]
fn test_long_report_fits_telegram_limit() {
    let records: Vec<MatchedRecord> = (0..120).map(|i| phone(i, "Galaxy")).collect();
    let report = format_report(&records, Utc::now());
    let parts = split_message(&report, TELEGRAM_MESSAGE_LIMIT);

    assert!(parts.len() > 1);
    assert!(parts
        .iter()
        .all(|p| p.chars().count() <= TELEGRAM_MESSAGE_LIMIT));
}

// ============================================================================
// Telegram
// ============================================================================

#[tokio::test]
async fn test_telegram_sends_markdown_message() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/bot123:abc/sendMessage"))
        .and(body_partial_json(json!({
            "chat_id": "-100200",
            "parse_mode": "Markdown",
            "disable_web_page_preview": true,
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true, "result": {}})))
        .expect(1)
        .mount(&server)
        .await;

    telegram_for(&server)
        .notify(&[phone(6, "SM-S938B")])
        .await
        .unwrap();
}

#[tokio::test]
async fn test_telegram_empty_records_sends_nothing() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
        .expect(0)
        .mount(&server)
        .await;

    telegram_for(&server).notify(&[]).await.unwrap();
}

#[tokio::test]
async fn test_telegram_api_error_is_notify_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "ok": false,
            "description": "Bad Request: chat not found"
        })))
        .mount(&server)
        .await;

    let err = telegram_for(&server)
        .send_text("hello")
        .await
        .unwrap_err();
    let message = err.to_string();
    assert!(message.contains("chat not found"));
    assert!(!message.contains("123:abc"));
}

#[tokio::test]
async fn test_telegram_ok_false_is_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "ok": false,
            "description": "Forbidden"
        })))
        .mount(&server)
        .await;

    let err = telegram_for(&server).send_text("hi").await.unwrap_err();
    assert!(err.to_string().contains("Forbidden"));
}

#[test]
fn test_telegram_debug_hides_token() {
    let client = HttpClient::with_config(HttpClientConfig::default()).unwrap();
    let notifier = TelegramNotifier::new(client, "https://api.telegram.org", "secret:token", "1");
    assert!(!format!("{notifier:?}").contains("secret"));
}

// ============================================================================
// Factory / Noop
// ============================================================================

#[tokio::test]
async fn test_noop_notifier_succeeds() {
    NoopNotifier.notify(&[phone(1, "A")]).await.unwrap();
    NoopNotifier.send_text("hello").await.unwrap();
}

#[test]
fn test_notifier_from_config() {
    let config = TelegramConfig::default();
    let notifier = notifier_from_config(&config).unwrap();
    assert!(format!("{notifier:?}").contains("NoopNotifier"));

    let config = TelegramConfig {
        bot_token: Some("123:abc".to_string()),
        chat_id: Some("42".to_string()),
        ..TelegramConfig::default()
    };
    let notifier = notifier_from_config(&config).unwrap();
    assert!(format!("{notifier:?}").contains("TelegramNotifier"));
}

// ============================================================================
// CI Output
// ============================================================================

#[test]
fn test_ci_output_appends_line() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("github_output");
    std::fs::write(&path, "existing=1\n").unwrap();

    let output = CiOutput::new(&path);
    output.write(&[phone(6, "SM-S938B")]).unwrap();

    let contents = std::fs::read_to_string(&path).unwrap();
    let lines: Vec<&str> = contents.lines().collect();
    assert_eq!(lines[0], "existing=1");

    let json = lines[1].strip_prefix("new_devices=").unwrap();
    let parsed: serde_json::Value = serde_json::from_str(json).unwrap();
    assert_eq!(parsed[0]["id"], 6);
    assert_eq!(parsed[0]["model"], "SM-S938B");
}

#[test]
fn test_ci_output_missing_dir_fails() {
    let dir = tempdir().unwrap();
    let output = CiOutput::new(dir.path().join("nope").join("out"));
    assert!(output.write(&[]).is_err());
}
