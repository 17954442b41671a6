use once_cell::sync::Lazy;
use regex::Regex;

use crate::models::Price;

static PRICE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\$(\d{1,3}(?:,\d{3})+|\d+)(?:\.(\d{2}))?").expect("price regex"));

/// Reads a price label such as `"$45 - $120"`, `"Free"` or `"From $25.50"`.
///
/// Empty input, anything mentioning "free", and text with no `$` amount at all
/// are all reported as free.
pub fn parse_price(input: &str, currency: &str) -> Price {
    if input.trim().is_empty() || input.to_lowercase().contains("free") {
        return Price::free(currency);
    }

    let amounts: Vec<f64> = PRICE_RE
        .captures_iter(input)
        .filter_map(|caps| {
            let whole = caps.get(1)?.as_str().replace(',', "");
            let cents = caps.get(2).map(|m| m.as_str()).unwrap_or("00");
            format!("{whole}.{cents}").parse::<f64>().ok()
        })
        .collect();

    if amounts.is_empty() {
        return Price::free(currency);
    }

    let min = amounts.iter().copied().fold(f64::INFINITY, f64::min);
    let max = amounts.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    Price {
        min,
        max,
        currency: currency.to_string(),
        is_free: false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn free_labels() {
        for text in ["Free", "FREE entry", "", "   "] {
            let price = parse_price(text, "AUD");
            assert!(price.is_free, "{text:?}");
            assert_eq!((price.min, price.max), (0.0, 0.0));
            assert_eq!(price.currency, "AUD");
        }
    }

    #[test]
    fn range_uses_extremes() {
        let price = parse_price("$45 - $120", "AUD");
        assert!(!price.is_free);
        assert_eq!((price.min, price.max), (45.0, 120.0));

        let price = parse_price("$120, $35.50 or $60", "AUD");
        assert_eq!((price.min, price.max), (35.5, 120.0));
    }

    #[test]
    fn single_amount_and_thousands() {
        let price = parse_price("From $25.50", "AUD");
        assert_eq!((price.min, price.max), (25.5, 25.5));

        let price = parse_price("$1,250 VIP", "AUD");
        assert_eq!((price.min, price.max), (1250.0, 1250.0));
    }

    // Non-dollar labels are indistinguishable from free listings; pinned so a
    // change here is a conscious one.
    #[test]
    fn labels_without_dollar_amounts_count_as_free() {
        let price = parse_price("€30", "AUD");
        assert!(price.is_free);
        let price = parse_price("Donation at the door", "AUD");
        assert!(price.is_free);
    }
}
