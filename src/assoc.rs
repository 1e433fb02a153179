use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, NaiveDate};

use crate::error::FindashError;
use crate::models::Transaction;

pub const DEFAULT_MIN_SUPPORT: f64 = 0.05;
pub const DEFAULT_MIN_CONFIDENCE: f64 = 0.30;
pub const MAX_ITEMSET_SIZE: usize = 3;
pub const TOP_COOCCURRENCES: usize = 12;
pub const MAX_RULES: usize = 20;

const KEY_DELIMITER: &str = "|";

/// What a basket token represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BasketMode {
    #[default]
    Category,
    Item,
    DayOfWeekCategory,
}

impl BasketMode {
    pub fn key(&self) -> &'static str {
        match self {
            BasketMode::Category => "cat",
            BasketMode::Item => "item",
            BasketMode::DayOfWeekCategory => "dow",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            BasketMode::Category => "Categories",
            BasketMode::Item => "Items",
            BasketMode::DayOfWeekCategory => "Day + Category",
        }
    }

    fn token(&self, tx: &Transaction, day: NaiveDate) -> String {
        match self {
            BasketMode::Category => format!("C:{}", tx.category_or_default()),
            BasketMode::Item => format!("I:{}", tx.item()),
            BasketMode::DayOfWeekCategory => {
                format!("{} + {}", day.weekday(), tx.category_or_default())
            }
        }
    }
}

impl FromStr for BasketMode {
    type Err = FindashError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "cat" | "category" => Ok(BasketMode::Category),
            "item" => Ok(BasketMode::Item),
            "dow" => Ok(BasketMode::DayOfWeekCategory),
            other => Err(FindashError::InvalidMode(other.to_string())),
        }
    }
}

impl fmt::Display for BasketMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Display form of a token: mode prefix removed.
pub fn display_token(token: &str) -> &str {
    token
        .strip_prefix("C:")
        .or_else(|| token.strip_prefix("I:"))
        .unwrap_or(token)
}

/// Sorted, de-duplicated tokens. Ordering makes equal sets compare equal
/// regardless of how they were assembled.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Itemset(Vec<String>);

impl Itemset {
    pub fn new<I, S>(tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let set: BTreeSet<String> = tokens.into_iter().map(Into::into).collect();
        Itemset(set.into_iter().collect())
    }

    pub fn tokens(&self) -> &[String] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Delimiter-joined identity key.
    pub fn key(&self) -> String {
        self.0.join(KEY_DELIMITER)
    }

    pub fn without(&self, token: &str) -> Itemset {
        Itemset(self.0.iter().filter(|t| *t != token).cloned().collect())
    }

    fn union(&self, other: &Itemset) -> Itemset {
        Itemset::new(self.0.iter().chain(other.0.iter()).cloned())
    }

    fn contained_in(&self, basket: &BTreeSet<String>) -> bool {
        self.0.iter().all(|t| basket.contains(t))
    }

    pub fn label(&self) -> String {
        self.0.iter().map(|t| display_token(t)).collect::<Vec<_>>().join(" + ")
    }
}

impl fmt::Display for Itemset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.key())
    }
}

pub type SupportMap = BTreeMap<Itemset, f64>;

#[derive(Debug, Clone, PartialEq)]
pub struct Rule {
    pub antecedent: Itemset,
    pub consequent: String,
    pub support: f64,
    pub confidence: f64,
    pub lift: f64,
}

impl Rule {
    pub fn label(&self) -> String {
        format!("{} → {}", self.antecedent.label(), display_token(&self.consequent))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Cooccurrence {
    pub itemset: Itemset,
    pub support: f64,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct AssocResult {
    pub basket_count: usize,
    pub cooccurrences: Vec<Cooccurrence>,
    pub rules: Vec<Rule>,
}

// ---------------------------------------------------------------------------
// Baskets
// ---------------------------------------------------------------------------

/// One token set per calendar day that has at least one expense.
pub fn build_baskets(rows: &[Transaction], mode: BasketMode) -> Vec<BTreeSet<String>> {
    let mut by_day: BTreeMap<NaiveDate, BTreeSet<String>> = BTreeMap::new();
    for tx in rows.iter().filter(|tx| tx.is_expense()) {
        let Some(ts) = tx.timestamp() else {
            continue;
        };
        let day = ts.date();
        by_day.entry(day).or_default().insert(mode.token(tx, day));
    }
    by_day.into_values().collect()
}

// ---------------------------------------------------------------------------
// Apriori
// ---------------------------------------------------------------------------

/// Level-wise frequent itemset mining up to `max_size` tokens. An itemset
/// found in no basket is never frequent, whatever `min_support` says.
pub fn apriori(baskets: &[BTreeSet<String>], min_support: f64, max_size: usize) -> SupportMap {
    let mut support = SupportMap::new();
    if baskets.is_empty() {
        return support;
    }
    let n = baskets.len() as f64;

    let mut singles: BTreeMap<&str, usize> = BTreeMap::new();
    for basket in baskets {
        for token in basket {
            *singles.entry(token.as_str()).or_default() += 1;
        }
    }
    let mut level: Vec<Itemset> = singles
        .into_iter()
        .filter_map(|(token, count)| {
            let s = count as f64 / n;
            (s >= min_support).then(|| {
                let set = Itemset::new([token]);
                support.insert(set.clone(), s);
                set
            })
        })
        .collect();

    for k in 2..=max_size {
        if level.is_empty() {
            break;
        }
        let mut candidates: BTreeMap<Itemset, usize> = BTreeMap::new();
        for (i, a) in level.iter().enumerate() {
            for b in &level[i + 1..] {
                let union = a.union(b);
                if union.len() == k {
                    candidates.entry(union).or_insert(0);
                }
            }
        }
        for basket in baskets {
            for (candidate, count) in candidates.iter_mut() {
                if candidate.contained_in(basket) {
                    *count += 1;
                }
            }
        }
        level = candidates
            .into_iter()
            .filter(|(_, count)| *count > 0)
            .filter_map(|(set, count)| {
                let s = count as f64 / n;
                (s >= min_support).then(|| {
                    support.insert(set.clone(), s);
                    set
                })
            })
            .collect();
    }

    log::debug!(
        "apriori: {} basket(s), {} frequent itemset(s)",
        baskets.len(),
        support.len()
    );
    support
}

/// Every `A → B` with a single-token consequent, strongest lift first.
pub fn derive_rules(support: &SupportMap) -> Vec<Rule> {
    let lookup = |set: &Itemset| support.get(set).copied().unwrap_or(0.0);
    let mut rules = Vec::new();
    for (itemset, &sup_ab) in support.iter().filter(|(set, _)| set.len() >= 2) {
        for b in itemset.tokens() {
            let a = itemset.without(b);
            if a.is_empty() {
                continue;
            }
            let sup_a = lookup(&a);
            let sup_b = lookup(&Itemset::new([b.as_str()]));
            if sup_a <= 0.0 || sup_b <= 0.0 {
                continue;
            }
            let confidence = sup_ab / sup_a;
            rules.push(Rule {
                antecedent: a,
                consequent: b.clone(),
                support: sup_ab,
                confidence,
                lift: confidence / sup_b,
            });
        }
    }
    rules.sort_by(|x, y| {
        y.lift
            .total_cmp(&x.lift)
            .then_with(|| y.confidence.total_cmp(&x.confidence))
    });
    rules
}

/// Itemsets of two or more tokens, most supported first.
pub fn top_cooccurrences(support: &SupportMap, top: usize) -> Vec<Cooccurrence> {
    let mut pairs: Vec<Cooccurrence> = support
        .iter()
        .filter(|(set, _)| set.len() >= 2)
        .map(|(set, &s)| Cooccurrence { itemset: set.clone(), support: s })
        .collect();
    pairs.sort_by(|a, b| b.support.total_cmp(&a.support));
    pairs.truncate(top);
    pairs
}

/// Full recompute for the reports panel: baskets, frequent itemsets, the
/// co-occurrence list and rules above `min_confidence` (capped).
pub fn compute_rules(
    rows: &[Transaction],
    mode: BasketMode,
    min_support: f64,
    min_confidence: f64,
) -> AssocResult {
    let baskets = build_baskets(rows, mode);
    let support = apriori(&baskets, min_support, MAX_ITEMSET_SIZE);
    let cooccurrences = top_cooccurrences(&support, TOP_COOCCURRENCES);
    let rules: Vec<Rule> = derive_rules(&support)
        .into_iter()
        .filter(|r| r.confidence >= min_confidence)
        .take(MAX_RULES)
        .collect();
    AssocResult {
        basket_count: baskets.len(),
        cooccurrences,
        rules,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn basket(tokens: &[&str]) -> BTreeSet<String> {
        tokens.iter().map(|s| s.to_string()).collect()
    }

    fn set(tokens: &[&str]) -> Itemset {
        Itemset::new(tokens.iter().copied())
    }

    fn expense(date: &str, category: &str, name: &str) -> Transaction {
        Transaction {
            date: date.into(),
            kind: "expense".into(),
            category: category.into(),
            name: name.into(),
            amount: "10".into(),
            ..Default::default()
        }
    }

    #[test]
    fn test_singleton_and_pair_support() {
        let baskets = vec![
            basket(&["A", "B"]),
            basket(&["A", "B"]),
            basket(&["A"]),
            basket(&["B", "C"]),
        ];
        let support = apriori(&baskets, 0.5, 3);
        assert_eq!(support.get(&set(&["A"])), Some(&0.75));
        assert_eq!(support.get(&set(&["B"])), Some(&0.75));
        assert_eq!(support.get(&set(&["C"])), None);
        assert_eq!(support.get(&set(&["A", "B"])), Some(&0.5));
        assert_eq!(support.get(&set(&["B", "C"])), None);
        assert_eq!(support.len(), 3);
    }

    #[test]
    fn test_support_is_monotone() {
        let baskets = vec![
            basket(&["A", "B", "C"]),
            basket(&["A", "B", "C"]),
            basket(&["A", "B"]),
            basket(&["A", "C", "D"]),
            basket(&["B", "D"]),
        ];
        let support = apriori(&baskets, 0.2, 3);
        assert!(support.keys().any(|s| s.len() == 3));
        for (s, &sup) in &support {
            for t in s.tokens() {
                let sub = s.without(t);
                if sub.is_empty() {
                    continue;
                }
                let sub_sup = support.get(&sub).copied().unwrap();
                assert!(sub_sup >= sup, "{sub} < {s}");
            }
        }
    }

    #[test]
    fn test_basket_order_does_not_matter() {
        let mut baskets = vec![
            basket(&["A", "B", "C"]),
            basket(&["B", "C"]),
            basket(&["A", "C"]),
            basket(&["C", "D"]),
        ];
        let forward = apriori(&baskets, 0.25, 3);
        baskets.reverse();
        assert_eq!(apriori(&baskets, 0.25, 3), forward);
    }

    #[test]
    fn test_rules_metrics_and_order() {
        let baskets = vec![
            basket(&["A", "B"]),
            basket(&["A", "B"]),
            basket(&["A"]),
            basket(&["B", "C"]),
        ];
        let rules = derive_rules(&apriori(&baskets, 0.5, 3));
        assert_eq!(rules.len(), 2);
        for r in &rules {
            assert_eq!(r.support, 0.5);
            assert!((r.confidence - 2.0 / 3.0).abs() < 1e-12);
            assert!((r.lift - (2.0 / 3.0) / 0.75).abs() < 1e-12);
        }
        let skewed = vec![basket(&["A", "B"]), basket(&["A", "B"]), basket(&["A"]), basket(&["A"])];
        let rules = derive_rules(&apriori(&skewed, 0.1, 3));
        assert_eq!(rules[0].consequent, "A");
        assert!(rules[0].confidence > rules[1].confidence);
        assert!(rules.windows(2).all(|w| w[0].lift >= w[1].lift));
    }

    #[test]
    fn test_missing_subset_support_emits_no_rule() {
        let mut support = SupportMap::new();
        support.insert(set(&["A", "B"]), 0.4);
        support.insert(set(&["A"]), 0.5);
        assert!(derive_rules(&support).iter().all(|r| r.consequent != "A"));
        assert!(derive_rules(&support).is_empty());
        support.insert(set(&["B"]), 0.0);
        assert!(derive_rules(&support).is_empty());
    }

    #[test]
    fn test_baskets_by_day_and_mode() {
        let rows = vec![
            expense("2024-01-01", "Food", "Cafe"),
            expense("2024-01-01", "Food", "Grocer"),
            expense("2024-01-01", "", "Bus"),
            expense("2024-01-03", "Travel", "Train"),
            Transaction { kind: "income".into(), ..expense("2024-01-05", "Salary", "Job") },
        ];
        let cat = build_baskets(&rows, BasketMode::Category);
        assert_eq!(cat.len(), 2);
        assert_eq!(cat[0], basket(&["C:Food", "C:Uncategorized"]));

        let items = build_baskets(&rows, BasketMode::Item);
        assert_eq!(items[0].len(), 3);
        assert!(items[0].contains("I:Cafe"));

        let dow = build_baskets(&rows, BasketMode::DayOfWeekCategory);
        assert!(dow[0].contains("Mon + Food"));
        assert!(dow[1].contains("Wed + Travel"));
    }

    #[test]
    fn test_compute_rules_filters_and_caps() {
        let mut rows = Vec::new();
        for d in 1..=20 {
            let date = format!("2024-02-{d:02}");
            rows.push(expense(&date, "Food", "x"));
            rows.push(expense(&date, "Coffee", "x"));
            if d % 2 == 0 {
                rows.push(expense(&date, "Travel", "x"));
            }
        }
        let result = compute_rules(&rows, BasketMode::Category, 0.05, 0.9);
        assert_eq!(result.basket_count, 20);
        assert!(result.rules.iter().all(|r| r.confidence >= 0.9));
        assert!(result.rules.len() <= MAX_RULES);
        assert_eq!(result.cooccurrences[0].itemset, set(&["C:Coffee", "C:Food"]));
        assert_eq!(result.cooccurrences[0].itemset.label(), "Coffee + Food");
    }

    #[test]
    fn test_output_caps_keep_strongest_first() {
        // Bills, Food and Rent every day; Gym, Pets and Toys every other day.
        let mut rows = Vec::new();
        for d in 1..=20 {
            let date = format!("2024-03-{d:02}");
            for cat in ["Bills", "Food", "Rent"] {
                rows.push(expense(&date, cat, "x"));
            }
            if d % 2 == 0 {
                for cat in ["Gym", "Pets", "Toys"] {
                    rows.push(expense(&date, cat, "x"));
                }
            }
        }
        let baskets = build_baskets(&rows, BasketMode::Category);
        let support = apriori(&baskets, 0.05, MAX_ITEMSET_SIZE);
        // 15 pairs and 20 triples, each giving 2 or 3 rules.
        assert_eq!(top_cooccurrences(&support, usize::MAX).len(), 35);
        assert_eq!(derive_rules(&support).len(), 90);

        let result = compute_rules(&rows, BasketMode::Category, 0.05, 0.3);
        assert_eq!(result.cooccurrences.len(), TOP_COOCCURRENCES);
        assert!(result.cooccurrences[..4].iter().all(|c| c.support == 1.0));
        assert!(result.cooccurrences[4..].iter().all(|c| c.support == 0.5));
        assert!(result.cooccurrences.windows(2).all(|w| w[0].support >= w[1].support));

        assert_eq!(result.rules.len(), MAX_RULES);
        // 27 rules reach lift 2 (a part-time category implying another);
        // the cap keeps only those.
        for r in &result.rules {
            assert_eq!(r.lift, 2.0);
            assert_eq!(r.confidence, 1.0);
        }
        assert!(result
            .rules
            .windows(2)
            .all(|w| w[0].lift > w[1].lift
                || (w[0].lift == w[1].lift && w[0].confidence >= w[1].confidence)));
    }

    #[test]
    fn test_zero_thresholds_never_report_unseen_combinations() {
        let rows = vec![expense("2024-01-01", "Food", "a"), expense("2024-01-02", "Travel", "b")];
        let result = compute_rules(&rows, BasketMode::Category, 0.0, 0.0);
        assert_eq!(result.basket_count, 2);
        assert!(result.cooccurrences.is_empty());
        assert!(result.rules.is_empty());
    }

    #[test]
    fn test_no_baskets_is_empty_result() {
        let result = compute_rules(&[], BasketMode::Item, 0.05, 0.3);
        assert_eq!(result, AssocResult::default());
    }

    #[test]
    fn test_single_day_gives_no_rules_for_single_token() {
        let rows = vec![expense("2024-01-01", "Food", "a")];
        let result = compute_rules(&rows, BasketMode::Category, 0.05, 0.3);
        assert_eq!(result.basket_count, 1);
        assert!(result.rules.is_empty());
    }

    #[test]
    fn test_mode_parse_and_labels() {
        assert_eq!("dow".parse::<BasketMode>().unwrap(), BasketMode::DayOfWeekCategory);
        assert!("weekly".parse::<BasketMode>().is_err());
        assert_eq!(display_token("I:Coffee"), "Coffee");
        assert_eq!(display_token("Mon + Food"), "Mon + Food");
        assert_eq!(set(&["B", "A", "B"]).key(), "A|B");
    }
}
