use std::path::Path;
use std::sync::OnceLock;

use chrono::{NaiveDate, NaiveDateTime};
use regex::Regex;

use crate::error::{FindashError, Result};
use crate::models::Transaction;

// ---------------------------------------------------------------------------
// Field helpers
// ---------------------------------------------------------------------------

fn non_numeric() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[^0-9.\-]").expect("static pattern"))
}

/// Strip everything but digits, `.` and `-`, then parse. Never fails:
/// unparseable input is 0.
pub fn parse_amount(raw: &str) -> f64 {
    let cleaned = non_numeric().replace_all(raw, "");
    if cleaned.is_empty() {
        return 0.0;
    }
    match cleaned.parse::<f64>() {
        Ok(v) if v.is_finite() => v,
        _ => 0.0,
    }
}

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y", "%m/%d/%y"];

/// Parse the date column. Date-only values land on midnight.
pub fn parse_date(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(dt) = chrono::DateTime::parse_from_rfc3339(raw) {
        return Some(dt.naive_utc());
    }
    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Some(dt);
        }
    }
    for fmt in DATE_FORMATS {
        if let Ok(d) = NaiveDate::parse_from_str(raw, fmt) {
            return d.and_hms_opt(0, 0, 0);
        }
    }
    None
}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

/// Read the raw export. Failure is returned to the caller; nothing in the
/// chart or analytics code runs without rows.
pub fn load_csv(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).map_err(|source| FindashError::Load {
        path: path.display().to_string(),
        source,
    })
}

/// Parse CSV text with trimmed headers and values. Rows without a parseable
/// date are dropped here so every downstream consumer sees admitted rows only.
pub fn parse_transactions(text: &str) -> Result<Vec<Transaction>> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(text.as_bytes());

    let mut rows = Vec::new();
    let mut dropped = 0usize;
    for record in rdr.deserialize::<Transaction>() {
        match record {
            Ok(tx) if tx.timestamp().is_some() => rows.push(tx),
            Ok(_) => dropped += 1,
            Err(e) => {
                log::debug!("skipping malformed CSV row: {e}");
                dropped += 1;
            }
        }
    }
    if dropped > 0 {
        log::warn!("dropped {dropped} row(s) without a valid date");
    }
    log::debug!("parsed {} transaction(s)", rows.len());
    Ok(rows)
}

pub fn load_transactions(path: &Path) -> Result<Vec<Transaction>> {
    let text = load_csv(path)?;
    parse_transactions(&text)
}

// ---------------------------------------------------------------------------
// Filters
// ---------------------------------------------------------------------------

/// Drop rows whose Tag or Name contains any ignore keyword (case-insensitive).
pub fn apply_ignores(rows: &[Transaction], ignores: &[String]) -> Vec<Transaction> {
    let needles: Vec<String> = ignores
        .iter()
        .map(|s| s.trim().to_lowercase())
        .filter(|s| !s.is_empty())
        .collect();
    if needles.is_empty() {
        return rows.to_vec();
    }
    rows.iter()
        .filter(|tx| {
            let tag = tx.tag.to_lowercase();
            let name = tx.name.to_lowercase();
            !needles.iter().any(|k| tag.contains(k) || name.contains(k))
        })
        .cloned()
        .collect()
}

/// Search across every column plus an optional category allow-list. An empty
/// list means all categories.
pub fn filter_transactions(
    rows: &[Transaction],
    search: Option<&str>,
    categories: &[String],
) -> Vec<Transaction> {
    let query = search.map(|q| q.trim().to_lowercase()).filter(|q| !q.is_empty());
    let allow: Vec<&str> = categories
        .iter()
        .map(String::as_str)
        .filter(|c| !c.eq_ignore_ascii_case("all"))
        .collect();

    rows.iter()
        .filter(|tx| match &query {
            Some(q) => [
                &tx.date, &tx.name, &tx.amount, &tx.category, &tx.kind, &tx.tag, &tx.source,
                &tx.id,
            ]
            .iter()
            .any(|field| field.to_lowercase().contains(q.as_str())),
            None => true,
        })
        .filter(|tx| allow.is_empty() || allow.contains(&tx.category.as_str()))
        .cloned()
        .collect()
}

/// Distinct non-empty categories, sorted.
pub fn categories(rows: &[Transaction]) -> Vec<String> {
    let mut cats: Vec<String> = rows
        .iter()
        .filter(|r| !r.category.is_empty())
        .map(|r| r.category.clone())
        .collect();
    cats.sort();
    cats.dedup();
    cats
}
