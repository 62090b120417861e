use crate::models::CoinMarket;

/// Insert thousands separators into the integer part of a decimal string.
fn group_thousands(s: &str) -> String {
    let (sign, rest) = s.strip_prefix('-').map_or(("", s), |r| ("-", r));
    let (int_part, frac_part) = rest.split_once('.').map_or((rest, None), |(i, f)| (i, Some(f)));

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, c) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }

    match frac_part {
        Some(f) => format!("{}{}.{}", sign, grouped, f),
        None => format!("{}{}", sign, grouped),
    }
}

/// Format a price for display. Sub-unit prices keep more precision so
/// small-cap coins don't all read as 0.00.
pub fn format_price(price: Option<f64>, currency: &str) -> String {
    let Some(price) = price else {
        return "-".to_string();
    };
    let amount = if price.abs() >= 1.0 {
        format!("{:.2}", price)
    } else {
        format!("{:.6}", price)
    };
    let symbol = match currency.to_ascii_lowercase().as_str() {
        "usd" => "$",
        "eur" => "€",
        "gbp" => "£",
        "jpy" => "¥",
        _ => "",
    };
    if symbol.is_empty() {
        format!("{} {}", group_thousands(&amount), currency.to_uppercase())
    } else {
        format!("{}{}", symbol, group_thousands(&amount))
    }
}

/// 24h change with a direction arrow, e.g. `▲ 2.50%`.
pub fn format_change(change: Option<f64>) -> String {
    match change {
        Some(c) if c > 0.0 => format!("▲ {:.2}%", c),
        Some(c) => format!("▼ {:.2}%", c.abs()),
        None => "-".to_string(),
    }
}

/// Compact large amounts: `1.32T`, `420.00B`, `15.20M`.
pub fn format_compact(value: Option<f64>) -> String {
    let Some(value) = value else {
        return "-".to_string();
    };
    let abs = value.abs();
    if abs >= 1e12 {
        format!("{:.2}T", value / 1e12)
    } else if abs >= 1e9 {
        format!("{:.2}B", value / 1e9)
    } else if abs >= 1e6 {
        format!("{:.2}M", value / 1e6)
    } else {
        group_thousands(&format!("{:.0}", value))
    }
}

/// Truncate a string to a maximum length, adding ellipsis if needed
pub fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else if max_len <= 3 {
        s.chars().take(max_len).collect()
    } else {
        let truncated: String = s.chars().take(max_len - 3).collect();
        format!("{}...", truncated)
    }
}

pub fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

/// Local filter for the home feed search box: trimmed, case-insensitive
/// match on coin name. An empty query keeps every coin.
pub fn filter_coins<'a>(coins: &'a [CoinMarket], query: &str) -> Vec<&'a CoinMarket> {
    let query = query.trim();
    if query.is_empty() {
        return coins.iter().collect();
    }
    coins
        .iter()
        .filter(|c| contains_ignore_case(&c.name, query))
        .collect()
}
