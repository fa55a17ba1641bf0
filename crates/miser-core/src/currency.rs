use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A single entry in the embedded currency reference table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Currency {
    pub code: String,
    pub name: String,
    pub symbol: Option<char>,
}

/// The embedded currency table: ISO 4217 code -> `Currency`. Loaded once
/// from `currency.json`, which is baked into the binary at compile time.
/// A malformed table is a fatal startup error — there is no sensible way to
/// run without it, so the `Lazy` simply panics rather than returning a
/// `Result` through every caller.
pub static CURRENCIES: Lazy<HashMap<String, Currency>> = Lazy::new(|| {
    let raw: Vec<Currency> = serde_json::from_str(include_str!("currency.json"))
        .expect("embedded currency.json is malformed");
    raw.into_iter().map(|c| (c.code.clone(), c)).collect()
});

/// Looks up a currency by its ISO code. Codes are matched case-sensitively
/// (callers are expected to pass the canonical upper-case form).
pub fn lookup(code: &str) -> Option<&'static Currency> {
    CURRENCIES.get(code)
}

pub fn is_supported(code: &str) -> bool {
    CURRENCIES.contains_key(code)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn common_currencies_are_present() {
        assert!(is_supported("USD"));
        assert!(is_supported("EUR"));
        assert!(!is_supported("XXX_NOT_A_CURRENCY"));
    }

    #[test]
    fn usd_has_a_dollar_symbol() {
        let usd = lookup("USD").unwrap();
        assert_eq!(usd.symbol, Some('$'));
    }
}
