//! Report text formatting

use crate::types::MatchedRecord;
use chrono::{DateTime, Utc};

/// Telegram's per-message limit, in characters
pub const TELEGRAM_MESSAGE_LIMIT: usize = 4096;

/// Escape characters that legacy Telegram Markdown treats as markup
pub fn escape_markdown(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(c, '_' | '*' | '`' | '[') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

fn field(value: Option<&str>) -> String {
    value.map_or_else(|| "N/A".to_string(), escape_markdown)
}

fn record_block(record: &MatchedRecord) -> String {
    let mut block = format!(
        "📱 *Name:* {}\n🏷️ *Brand:* {}\n📋 *Model:* {}\n🏢 *Company:* {}\n📄 *Cert #:* {}\n*Category:* {}",
        field(record.name.as_deref()),
        field(record.brand.as_deref()),
        field(record.model.as_deref()),
        field(record.company.as_deref()),
        field(record.certificate_number.as_deref()),
        field(record.category.as_deref()),
    );
    match &record.url {
        Some(url) => block.push_str(&format!("\n🔗 {url}")),
        None => block.push_str(&format!("\n🔗 ID {}", record.id)),
    }
    block
}

/// Human-readable Markdown report for newly found records
pub fn format_report(records: &[MatchedRecord], found_at: DateTime<Utc>) -> String {
    let header = match records.len() {
        1 => "🔥 *New equipment found!*".to_string(),
        n => format!("🔥 *{n} new equipment records found!*"),
    };

    let mut sections = vec![header];
    sections.extend(records.iter().map(record_block));
    sections.push(format!(
        "*Found at:* {}",
        found_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    sections.join("\n\n")
}

/// Message used by `test-notify`
pub fn test_message(sent_at: DateTime<Utc>) -> String {
    format!(
        "✅ *certwatch test message*\n\nNotifications are working.\n\n*Sent at:* {}",
        sent_at.format("%Y-%m-%d %H:%M:%S UTC")
    )
}

/// Split a report into messages of at most `limit` characters
///
/// Splits on blank lines between sections; a single oversized section is
/// cut at character boundaries.
pub fn split_message(text: &str, limit: usize) -> Vec<String> {
    let limit = limit.max(1);
    let mut messages = Vec::new();
    let mut current = String::new();
    let mut current_len = 0;

    for section in text.split("\n\n") {
        let section_len = section.chars().count();

        if current_len > 0 && current_len + 2 + section_len > limit {
            messages.push(std::mem::take(&mut current));
            current_len = 0;
        }

        if section_len > limit {
            let chars: Vec<char> = section.chars().collect();
            for chunk in chars.chunks(limit) {
                messages.push(chunk.iter().collect());
            }
            continue;
        }

        if current_len > 0 {
            current.push_str("\n\n");
            current_len += 2;
        }
        current.push_str(section);
        current_len += section_len;
    }

    if !current.is_empty() {
        messages.push(current);
    }
    messages
}
