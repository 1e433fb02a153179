use chrono::NaiveDateTime;
use serde::Deserialize;

/// One row of the combined transactions export. Every field is kept as the
/// trimmed text from the CSV; `Amount` and `Date` are interpreted lazily so
/// a malformed value never rejects the whole file.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Transaction {
    #[serde(rename = "Date", default)]
    pub date: String,
    #[serde(rename = "Name", default)]
    pub name: String,
    #[serde(rename = "Amount", default)]
    pub amount: String,
    #[serde(rename = "Category", default)]
    pub category: String,
    #[serde(rename = "Type", default)]
    pub kind: String,
    #[serde(rename = "Tag", default)]
    pub tag: String,
    #[serde(rename = "Source", default)]
    pub source: String,
    #[serde(rename = "ID", default)]
    pub id: String,
}

impl Transaction {
    /// Parsed `Date`, or `None` when the row should be dropped.
    pub fn timestamp(&self) -> Option<NaiveDateTime> {
        crate::importer::parse_date(&self.date)
    }

    pub fn amount_value(&self) -> f64 {
        crate::importer::parse_amount(&self.amount)
    }

    /// Balance direction: any type containing "income" adds to the balance.
    pub fn is_income(&self) -> bool {
        self.kind.to_lowercase().contains("income")
    }

    /// Exact type match, as used by the reports page.
    pub fn is_expense(&self) -> bool {
        self.kind.to_lowercase() == "expense"
    }

    pub fn category_or_default(&self) -> &str {
        if self.category.is_empty() {
            "Uncategorized"
        } else {
            &self.category
        }
    }

    /// Item label: Tag, else Name, else a sentinel.
    pub fn item(&self) -> &str {
        let tag = self.tag.trim();
        if !tag.is_empty() {
            return tag;
        }
        let name = self.name.trim();
        if !name.is_empty() {
            return name;
        }
        "(Unknown)"
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BalancePoint {
    pub timestamp: NaiveDateTime,
    pub balance: f64,
}

impl BalancePoint {
    pub fn x_ms(&self) -> i64 {
        epoch_ms(self.timestamp)
    }
}

pub fn epoch_ms(ts: NaiveDateTime) -> i64 {
    ts.and_utc().timestamp_millis()
}

pub fn from_epoch_ms(ms: i64) -> Option<NaiveDateTime> {
    chrono::DateTime::from_timestamp_millis(ms).map(|dt| dt.naive_utc())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tx(kind: &str) -> Transaction {
        Transaction {
            kind: kind.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_income_is_substring_match() {
        assert!(tx("Income").is_income());
        assert!(tx("other income").is_income());
        assert!(!tx("expense").is_income());
        assert!(!tx("").is_income());
    }

    #[test]
    fn test_expense_is_exact_match() {
        assert!(tx("EXPENSE").is_expense());
        assert!(!tx("expenses").is_expense());
    }

    #[test]
    fn test_item_fallbacks() {
        let mut t = Transaction {
            tag: "  Coffee ".into(),
            name: "STARBUCKS #123".into(),
            ..Default::default()
        };
        assert_eq!(t.item(), "Coffee");
        t.tag = "   ".into();
        assert_eq!(t.item(), "STARBUCKS #123");
        t.name.clear();
        assert_eq!(t.item(), "(Unknown)");
    }

    #[test]
    fn test_epoch_roundtrip() {
        let ts = chrono::NaiveDate::from_ymd_opt(2024, 3, 1)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap();
        assert_eq!(from_epoch_ms(epoch_ms(ts)), Some(ts));
    }
}
