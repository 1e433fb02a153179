/// Format a float as a dollar amount with thousands separators: $1,234.56
pub fn money(val: f64) -> String {
    let negative = val < 0.0;
    let cents = format!("{:.2}", val.abs());
    let (int_part, dec_part) = cents.split_once('.').unwrap_or((&cents, "00"));

    let mut with_commas = String::new();
    for (i, c) in int_part.chars().rev().enumerate() {
        if i > 0 && i % 3 == 0 {
            with_commas.push(',');
        }
        with_commas.push(c);
    }
    let with_commas: String = with_commas.chars().rev().collect();

    if negative {
        format!("-${with_commas}.{dec_part}")
    } else {
        format!("${with_commas}.{dec_part}")
    }
}

/// Money that hides its digits when sensitive values are blurred.
pub fn money_masked(val: f64, blur: bool) -> String {
    if blur {
        "$•••••".to_string()
    } else {
        money(val)
    }
}

/// Ratio in [0, 1] as a percentage with one decimal: 0.256 -> 25.6%
pub fn pct(ratio: f64) -> String {
    format!("{:.1}%", ratio * 100.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_money_formatting() {
        assert_eq!(money(1234.56), "$1,234.56");
        assert_eq!(money(-500.00), "-$500.00");
        assert_eq!(money(0.0), "$0.00");
        assert_eq!(money(1000000.99), "$1,000,000.99");
        assert_eq!(money(42.10), "$42.10");
    }

    #[test]
    fn test_masked_and_pct() {
        assert_eq!(money_masked(12.0, false), "$12.00");
        assert_eq!(money_masked(12.0, true), "$•••••");
        assert_eq!(pct(0.256), "25.6%");
        assert_eq!(pct(1.0), "100.0%");
    }
}
