//! Company name → ticker lookup for common US listings

use lazy_static::lazy_static;
use std::collections::HashMap;

lazy_static! {
    static ref COMPANY_TICKERS: HashMap<&'static str, &'static str> = {
        let pairs: &[(&str, &str)] = &[
            // Tech
            ("apple", "AAPL"),
            ("microsoft", "MSFT"),
            ("google", "GOOGL"),
            ("alphabet", "GOOGL"),
            ("amazon", "AMZN"),
            ("meta", "META"),
            ("facebook", "META"),
            ("tesla", "TSLA"),
            ("nvidia", "NVDA"),
            ("netflix", "NFLX"),
            ("amd", "AMD"),
            ("intel", "INTC"),
            ("ibm", "IBM"),
            ("oracle", "ORCL"),
            ("adobe", "ADBE"),
            ("salesforce", "CRM"),
            ("cisco", "CSCO"),
            ("qualcomm", "QCOM"),
            ("tsmc", "TSM"),
            ("asml", "ASML"),
            ("broadcom", "AVGO"),
            ("snap", "SNAP"),
            ("spotify", "SPOT"),
            ("pinterest", "PINS"),
            ("palantir", "PLTR"),
            ("zoom", "ZM"),
            // Automotive
            ("ford", "F"),
            ("general motors", "GM"),
            ("toyota", "TM"),
            ("honda", "HMC"),
            ("rivian", "RIVN"),
            ("lucid", "LCID"),
            // Retail & consumer
            ("walmart", "WMT"),
            ("target", "TGT"),
            ("costco", "COST"),
            ("home depot", "HD"),
            ("lowes", "LOW"),
            ("best buy", "BBY"),
            ("mcdonalds", "MCD"),
            ("starbucks", "SBUX"),
            ("disney", "DIS"),
            ("sony", "SONY"),
            // Finance
            ("jpmorgan", "JPM"),
            ("bank of america", "BAC"),
            ("wells fargo", "WFC"),
            ("goldman sachs", "GS"),
            ("morgan stanley", "MS"),
            ("visa", "V"),
            ("mastercard", "MA"),
            ("paypal", "PYPL"),
            ("block", "SQ"),
            ("coinbase", "COIN"),
            ("robinhood", "HOOD"),
            // Healthcare
            ("pfizer", "PFE"),
            ("moderna", "MRNA"),
            ("johnson & johnson", "JNJ"),
            ("merck", "MRK"),
            ("eli lilly", "LLY"),
            // Energy
            ("exxon", "XOM"),
            ("exxon mobil", "XOM"),
            ("chevron", "CVX"),
            ("shell", "SHEL"),
            ("bp", "BP"),
        ];
        pairs.iter().copied().collect()
    };
}

/// Resolve a company name to its ticker.
///
/// Lookup ignores case, a trailing possessive and common corporate suffixes.
pub fn resolve(name: &str) -> Option<&'static str> {
    let mut key = name.trim().to_lowercase().replace(['\'', '\u{2019}', '.', ','], "");
    for suffix in [" inc", " corp", " corporation", " co", " company", " plc", " ltd"] {
        if let Some(stripped) = key.strip_suffix(suffix) {
            key = stripped.trim_end().to_string();
        }
    }

    COMPANY_TICKERS
        .get(key.as_str())
        .or_else(|| key.strip_suffix('s').and_then(|k| COMPANY_TICKERS.get(k)))
        .copied()
}

/// Whether `value` already looks like an exchange ticker (e.g. `AAPL`, `BRK.B`)
pub fn looks_like_ticker(value: &str) -> bool {
    let len = value.chars().filter(|c| c.is_ascii_alphabetic()).count();
    (1..=5).contains(&len)
        && value
            .chars()
            .all(|c| c.is_ascii_uppercase() || c == '.' || c == '-')
}

/// Ticker for `value`: looked up by name first, else kept if it already looks like one.
///
/// The name lookup runs first so upper-cased names (`TESLA`) still resolve.
pub fn normalize(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if let Some(ticker) = resolve(trimmed) {
        return Some(ticker.to_string());
    }
    looks_like_ticker(trimmed).then(|| trimmed.to_string())
}
