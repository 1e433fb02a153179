use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use regex::Regex;

use crate::error::Result;
use crate::importer::apply_ignores;
use crate::models::Transaction;

pub const DEBIT_DIR: &str = "Debit";
pub const CREDIT_DIR: &str = "Credit";
pub const ARCHIVE_DIR: &str = "Archive";
pub const OUTPUT_FILE: &str = "combined_transactions.csv";

const HEADER: [&str; 8] = ["Date", "ID", "Tag", "Name", "Amount", "Type", "Category", "Source"];
const AUTOMATIC_PAYMENT: &str = "AUTOMATIC PAYMENT";

/// Exponents past this are left alone; the ID is then treated as text.
const MAX_ID_EXPONENT: i64 = 64;

/// Which bank export a row came from. Stamped into the `Source` column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    Debit,
    Credit,
}

impl Source {
    pub fn label(&self) -> &'static str {
        match self {
            Source::Debit => "DEBIT",
            Source::Credit => "CREDIT",
        }
    }

    fn dir(&self) -> &'static str {
        match self {
            Source::Debit => DEBIT_DIR,
            Source::Credit => CREDIT_DIR,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CombineResult {
    pub files: usize,
    pub read: usize,
    pub payments_skipped: usize,
    pub ids_expanded: usize,
    pub ids_replaced: usize,
    pub duplicates: usize,
    pub ignored: usize,
    pub written: usize,
    pub archived: Option<PathBuf>,
}

// ---------------------------------------------------------------------------
// Reading
// ---------------------------------------------------------------------------

/// `.csv` files directly inside `dir`, sorted by name. A missing folder is
/// simply empty.
fn csv_files(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Ok(Vec::new());
    }
    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        let is_csv = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("csv"));
        if is_csv && path.is_file() {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// One bank export in the eight-column layout. Header rows and rows with
/// the wrong column count are skipped; amounts lose their leading minus
/// signs since `Type` carries the direction.
pub fn read_export(path: &Path, source: Source) -> Result<Vec<Transaction>> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_path(path)?;

    let mut rows = Vec::new();
    for record in rdr.records() {
        let record = record?;
        if record.len() != HEADER.len() || record.iter().eq(HEADER) {
            continue;
        }
        rows.push(Transaction {
            date: record[0].to_string(),
            id: record[1].to_string(),
            tag: record[2].to_string(),
            name: record[3].to_string(),
            amount: record[4].trim_start_matches('-').to_string(),
            kind: record[5].to_string(),
            category: record[6].to_string(),
            source: source.label().to_string(),
        });
    }
    log::debug!("{}: {} row(s)", path.display(), rows.len());
    Ok(rows)
}

// ---------------------------------------------------------------------------
// Cleaning
// ---------------------------------------------------------------------------

fn scientific() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^([+-]?)([0-9]+)(?:\.([0-9]+))?[eE]([+-]?[0-9]+)$")
            .expect("static pattern")
    })
}

fn round_up(digits: &mut Vec<u8>) {
    for d in digits.iter_mut().rev() {
        if *d == 9 {
            *d = 0;
        } else {
            *d += 1;
            return;
        }
    }
    digits.insert(0, 1);
}

/// Spreadsheet-mangled IDs such as `1.23457E+11` back to integer digits,
/// rounding half to even. `None` when `raw` is not in scientific notation.
pub fn expand_scientific(raw: &str) -> Option<String> {
    let caps = scientific().captures(raw)?;
    let negative = &caps[1] == "-";
    let int = &caps[2];
    let frac = caps.get(3).map_or("", |m| m.as_str());
    let exp: i64 = caps[4].parse().ok()?;
    if exp.abs() > MAX_ID_EXPONENT {
        return None;
    }

    let digits: Vec<u8> = int.bytes().chain(frac.bytes()).map(|b| b - b'0').collect();
    let point = int.len() as i64 + exp;
    let (mut whole, dropped): (Vec<u8>, Vec<u8>) = if point <= 0 {
        let mut dropped = vec![0; (-point) as usize];
        dropped.extend(&digits);
        (vec![0], dropped)
    } else if point as usize >= digits.len() {
        let mut whole = digits.clone();
        whole.resize(point as usize, 0);
        (whole, Vec::new())
    } else {
        let (w, d) = digits.split_at(point as usize);
        (w.to_vec(), d.to_vec())
    };

    if let Some((&first, tail)) = dropped.split_first() {
        let tail_nonzero = tail.iter().any(|&d| d != 0);
        let last_odd = whole.last().is_some_and(|d| d % 2 == 1);
        if first > 5 || (first == 5 && (tail_nonzero || last_odd)) {
            round_up(&mut whole);
        }
    }

    let text: String = whole.iter().map(|&d| char::from(b'0' + d)).collect();
    let text = text.trim_start_matches('0');
    let text = if text.is_empty() { "0" } else { text };
    Some(if negative && text != "0" {
        format!("-{text}")
    } else {
        text.to_string()
    })
}

/// Drop card payments and repair IDs. Alphabetic IDs become `0` and the
/// original text moves into `Tag` so it stays searchable.
pub fn clean(rows: Vec<Transaction>, result: &mut CombineResult) -> Vec<Transaction> {
    let mut out = Vec::with_capacity(rows.len());
    for mut tx in rows {
        if tx.tag.to_uppercase().starts_with(AUTOMATIC_PAYMENT) {
            log::info!("skipped automatic payment on {}: {}", tx.date, tx.tag);
            result.payments_skipped += 1;
            continue;
        }
        if let Some(expanded) = expand_scientific(&tx.id) {
            log::info!("expanded scientific ID '{}' to '{expanded}' on {}", tx.id, tx.date);
            tx.id = expanded;
            result.ids_expanded += 1;
        }
        if tx.id.chars().any(char::is_alphabetic) {
            let original = std::mem::replace(&mut tx.id, "0".to_string());
            if !tx.tag.split_whitespace().any(|part| part == original) {
                tx.tag = format!("{} {original}", tx.tag).trim().to_string();
            }
            log::info!("replaced alphabetic ID '{original}' on {}: tag '{}'", tx.date, tx.tag);
            result.ids_replaced += 1;
        }
        out.push(tx);
    }
    out
}

/// Keep the first row per (Date, ID, Tag, Type, Amount).
pub fn dedupe(rows: Vec<Transaction>, result: &mut CombineResult) -> Vec<Transaction> {
    let mut seen = HashSet::new();
    let mut out = Vec::with_capacity(rows.len());
    for tx in rows {
        let key = (
            tx.date.clone(),
            tx.id.clone(),
            tx.tag.clone(),
            tx.kind.clone(),
            tx.amount.clone(),
        );
        if seen.insert(key) {
            out.push(tx);
        } else {
            log::info!("duplicate removed: {} {} {}", tx.date, tx.tag, tx.amount);
            result.duplicates += 1;
        }
    }
    out
}

// ---------------------------------------------------------------------------
// Writing
// ---------------------------------------------------------------------------

/// Move an existing output aside to `archive_dir/<timestamp>_<name>`.
fn archive_existing(output: &Path, archive_dir: &Path) -> Result<Option<PathBuf>> {
    if !output.is_file() {
        return Ok(None);
    }
    let name = output
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| OUTPUT_FILE.to_string());
    std::fs::create_dir_all(archive_dir)?;
    let stamp = chrono::Local::now().format("%Y%m%d%H%M%S");
    let dest = archive_dir.join(format!("{stamp}_{name}"));
    std::fs::rename(output, &dest)?;
    log::info!("archived {} -> {}", output.display(), dest.display());
    Ok(Some(dest))
}

fn write_combined(path: &Path, rows: &[Transaction]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let mut wtr = csv::Writer::from_path(path)?;
    wtr.write_record(HEADER)?;
    for tx in rows {
        wtr.write_record([
            &tx.date,
            &tx.id,
            &tx.tag,
            &tx.name,
            &tx.amount,
            &tx.kind,
            &tx.category,
            &tx.source,
        ])?;
    }
    wtr.flush()?;
    Ok(())
}

// ---------------------------------------------------------------------------
// combine
// ---------------------------------------------------------------------------

/// Merge `root/Debit/*.csv` and `root/Credit/*.csv` into `output`.
///
/// Rows are cleaned, de-duplicated, filtered by `ignores` and sorted by
/// date (stable, unparseable dates last). A previous `output` is archived
/// under `root/Archive` first. Nothing is written when no export exists.
pub fn combine(root: &Path, output: &Path, ignores: &[String]) -> Result<CombineResult> {
    let mut result = CombineResult::default();
    let mut rows = Vec::new();
    for source in [Source::Debit, Source::Credit] {
        for file in csv_files(&root.join(source.dir()))? {
            rows.extend(read_export(&file, source)?);
            result.files += 1;
        }
    }
    if result.files == 0 {
        return Ok(result);
    }
    result.read = rows.len();

    let rows = clean(rows, &mut result);
    let rows = dedupe(rows, &mut result);
    let mut rows = apply_ignores(&rows, ignores);
    result.ignored = result.read - result.payments_skipped - result.duplicates - rows.len();
    rows.sort_by_cached_key(|tx| {
        let ts = tx.timestamp();
        (ts.is_none(), ts)
    });

    result.archived = archive_existing(output, &root.join(ARCHIVE_DIR))?;
    write_combined(output, &rows)?;
    result.written = rows.len();
    log::info!("combined {} row(s) into {}", result.written, output.display());
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FindashError;
    use crate::importer::load_transactions;

    const EXPORT_HEADER: &str = "Date,ID,Tag,Name,Amount,Type,Category,Source\n";

    fn write_export(root: &Path, source: Source, name: &str, body: &str) {
        let dir = root.join(source.dir());
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join(name), format!("{EXPORT_HEADER}{body}")).unwrap();
    }

    fn tx(date: &str, id: &str, tag: &str) -> Transaction {
        Transaction {
            date: date.into(),
            id: id.into(),
            tag: tag.into(),
            amount: "10".into(),
            kind: "expense".into(),
            ..Default::default()
        }
    }

    #[test]
    fn test_expand_scientific() {
        assert_eq!(expand_scientific("1.23457E+11").as_deref(), Some("123457000000"));
        assert_eq!(expand_scientific("4.5e1").as_deref(), Some("45"));
        assert_eq!(expand_scientific("1.26e1").as_deref(), Some("13"));
        assert_eq!(expand_scientific("9.99e1").as_deref(), Some("100"));
        assert_eq!(expand_scientific("-1e2").as_deref(), Some("-100"));
        // Half to even.
        assert_eq!(expand_scientific("2.5e0").as_deref(), Some("2"));
        assert_eq!(expand_scientific("3.5e0").as_deref(), Some("4"));
        assert_eq!(expand_scientific("5e-1").as_deref(), Some("0"));
        assert_eq!(expand_scientific("12345"), None);
        assert_eq!(expand_scientific("ABC123"), None);
        assert_eq!(expand_scientific("1e999"), None);
    }

    #[test]
    fn test_clean_skips_payments_and_fixes_ids() {
        let rows = vec![
            tx("2024-01-01", "1", "Automatic Payment - Thank you"),
            tx("2024-01-02", "1.5E+3", "Coffee"),
            tx("2024-01-03", "REF9", "Grocer"),
            tx("2024-01-04", "REF9", "Grocer REF9"),
            tx("2024-01-05", "X1", ""),
        ];
        let mut result = CombineResult::default();
        let cleaned = clean(rows, &mut result);
        assert_eq!(result.payments_skipped, 1);
        assert_eq!(result.ids_expanded, 1);
        assert_eq!(result.ids_replaced, 3);
        assert_eq!(cleaned.len(), 4);
        assert_eq!(cleaned[0].id, "1500");
        assert_eq!(cleaned[1].id, "0");
        assert_eq!(cleaned[1].tag, "Grocer REF9");
        assert_eq!(cleaned[2].tag, "Grocer REF9");
        assert_eq!(cleaned[3].tag, "X1");
    }

    #[test]
    fn test_dedupe_keeps_first() {
        let mut second = tx("2024-01-01", "7", "Cafe");
        second.name = "different name".into();
        let rows = vec![tx("2024-01-01", "7", "Cafe"), second, tx("2024-01-01", "8", "Cafe")];
        let mut result = CombineResult::default();
        let unique = dedupe(rows, &mut result);
        assert_eq!(unique.len(), 2);
        assert_eq!(result.duplicates, 1);
        assert!(unique[0].name.is_empty());
    }

    #[test]
    fn test_read_export_strips_sign_and_stamps_source() {
        let dir = tempfile::tempdir().unwrap();
        write_export(
            dir.path(),
            Source::Credit,
            "card.csv",
            "2024-01-02, 11 ,Cafe,Coffee,-4.50,expense,Food,whatever\n\
             short,row\n",
        );
        let rows = read_export(&dir.path().join("Credit/card.csv"), Source::Credit).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].id, "11");
        assert_eq!(rows[0].amount, "4.50");
        assert_eq!(rows[0].source, "CREDIT");
    }

    #[test]
    fn test_read_export_invalid_utf8_is_csv_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.csv");
        std::fs::write(&path, b"2024-01-01,1,\xff\xfe,x,1,expense,Food,\n").unwrap();
        let err = read_export(&path, Source::Debit).unwrap_err();
        assert!(matches!(err, FindashError::Csv(_)));
    }

    #[test]
    fn test_combine_merges_sorts_and_filters() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        write_export(
            root,
            Source::Debit,
            "checking.csv",
            "2024-01-03,1,,Paycheck,1000,income,Salary,\n\
             2024-01-01,2,Rent,Landlord,-800,expense,Housing,\n\
             2024-01-02,3,TRANSFER out,Bank,50,expense,Transfer,\n",
        );
        write_export(
            root,
            Source::Credit,
            "card.csv",
            "2024-01-02,4,Cafe,Coffee,-4.50,expense,Food,\n\
             2024-01-02,4,Cafe,Coffee,4.50,expense,Food,\n\
             2024-01-04,5,AUTOMATIC PAYMENT,Card,200,income,Payment,\n",
        );
        let output = root.join(OUTPUT_FILE);
        let result = combine(root, &output, &["transfer".to_string()]).unwrap();

        assert_eq!(result.files, 2);
        assert_eq!(result.read, 6);
        assert_eq!(result.payments_skipped, 1);
        assert_eq!(result.duplicates, 1);
        assert_eq!(result.ignored, 1);
        assert_eq!(result.written, 3);
        assert_eq!(result.archived, None);

        let rows = load_transactions(&output).unwrap();
        let dates: Vec<&str> = rows.iter().map(|r| r.date.as_str()).collect();
        assert_eq!(dates, vec!["2024-01-01", "2024-01-02", "2024-01-03"]);
        assert_eq!(rows[0].amount, "800");
        assert_eq!(rows[0].source, "DEBIT");
        assert_eq!(rows[1].source, "CREDIT");
    }

    #[test]
    fn test_combine_archives_previous_output() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        write_export(root, Source::Debit, "a.csv", "2024-01-01,1,,Lunch,12,expense,Food,\n");
        let output = root.join(OUTPUT_FILE);
        combine(root, &output, &[]).unwrap();
        let second = combine(root, &output, &[]).unwrap();

        let archived = second.archived.unwrap();
        assert!(archived.starts_with(root.join(ARCHIVE_DIR)));
        assert!(archived.is_file());
        assert!(archived.to_string_lossy().ends_with("_combined_transactions.csv"));
        assert!(output.is_file());
    }

    #[test]
    fn test_combine_without_exports_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join(OUTPUT_FILE);
        std::fs::write(&output, "keep me").unwrap();
        let result = combine(dir.path(), &output, &[]).unwrap();
        assert_eq!(result, CombineResult::default());
        assert_eq!(std::fs::read_to_string(&output).unwrap(), "keep me");
    }
}
