//! Attribute extractors scoped to one container's text.

use once_cell::sync::Lazy;
use regex::Regex;

const MAKES: &[(&str, &str)] = &[
    ("chevy", "Chevrolet"),
    ("chevrolet", "Chevrolet"),
    ("vw", "Volkswagen"),
    ("volkswagen", "Volkswagen"),
    ("mercedes", "Mercedes-Benz"),
    ("mercedes-benz", "Mercedes-Benz"),
    ("honda", "Honda"),
    ("toyota", "Toyota"),
    ("ford", "Ford"),
    ("nissan", "Nissan"),
    ("hyundai", "Hyundai"),
    ("kia", "Kia"),
    ("subaru", "Subaru"),
    ("mazda", "Mazda"),
    ("jeep", "Jeep"),
    ("ram", "Ram"),
    ("dodge", "Dodge"),
    ("chrysler", "Chrysler"),
    ("buick", "Buick"),
    ("cadillac", "Cadillac"),
    ("gmc", "GMC"),
    ("lincoln", "Lincoln"),
    ("acura", "Acura"),
    ("lexus", "Lexus"),
    ("infiniti", "Infiniti"),
    ("audi", "Audi"),
    ("bmw", "BMW"),
    ("volvo", "Volvo"),
    ("porsche", "Porsche"),
    ("jaguar", "Jaguar"),
    ("land rover", "Land Rover"),
    ("mitsubishi", "Mitsubishi"),
    ("tesla", "Tesla"),
    ("mini", "Mini"),
    ("fiat", "Fiat"),
    ("alfa romeo", "Alfa Romeo"),
    ("genesis", "Genesis"),
];

const MODEL_STOPWORDS: &[&str] = &["for", "sale", "certified", "pre", "owned", "used", "new"];

const LOGO_TOKENS: &[&str] = &[
    "logo", "icon", "badge", "social", "nav", "header", "footer", "banner", "button", "avatar",
    "placeholder", ".svg", ".gif",
];

const COLOR_VOCAB: &[&str] = &[
    "black", "white", "silver", "gray", "grey", "red", "blue", "green", "brown", "beige", "gold",
    "orange", "yellow", "maroon", "tan", "charcoal", "bronze", "purple",
];

static VIN_LABELED: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)VIN[:\s#]*([A-HJ-NPR-Z0-9][A-HJ-NPR-Z0-9\s-]{15,20}[A-HJ-NPR-Z0-9])").unwrap());
static VIN_BARE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b([A-HJ-NPR-Z0-9]{17})\b").unwrap());
static STOCK_LABELED: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)stock[#:\s]+([A-Z0-9-]{3,})").unwrap());
static STOCK_HASH: Lazy<Regex> = Lazy::new(|| Regex::new(r"#([A-Z0-9-]{3,})").unwrap());
static YEAR_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b(19\d{2}|20[0-3]\d)\b").unwrap());
static PRICE_LABELED: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)price[:\s]*\$?([\d,]+)").unwrap());
static PRICE_BARE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\$([\d,]+)").unwrap());
static MILEAGE_LABELED: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)mileage[:\s]*([\d,.]+)").unwrap());
static MILEAGE_BARE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)([\d,.]+)\s*(?:mi|miles|km)\b").unwrap());
static COLOR_LABELED: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)color[:\s]+([A-Za-z]+)").unwrap());
static IMG_SRC: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?is)<img\s+[^>]*src\s*=\s*["']([^"']+)["'][^>]*>"#).unwrap());
static IMG_WIDTH: Lazy<Regex> = Lazy::new(|| Regex::new(r#"(?i)width\s*=\s*["']?(\d+)"#).unwrap());
static IMG_HEIGHT: Lazy<Regex> = Lazy::new(|| Regex::new(r#"(?i)height\s*=\s*["']?(\d+)"#).unwrap());

fn strip_vin_punct(s: &str) -> String {
    s.chars().filter(|c| !c.is_whitespace() && *c != '-').collect()
}

/// VIN: prefer a labeled `VIN: …` occurrence over a bare 17-char match.
pub fn extract_vin(text: &str) -> Option<String> {
    if let Some(caps) = VIN_LABELED.captures(text) {
        let candidate = strip_vin_punct(caps.get(1).unwrap().as_str()).to_uppercase();
        if crate::model::is_valid_vin(&candidate) {
            return Some(candidate);
        }
    }
    VIN_BARE
        .find_iter(text)
        .map(|m| m.as_str().to_uppercase())
        .find(|s| crate::model::is_valid_vin(s))
}

/// Stock: labeled `stock#X` wins, else bare `#X`.
pub fn extract_stock(text: &str) -> Option<String> {
    STOCK_LABELED
        .captures(text)
        .or_else(|| STOCK_HASH.captures(text))
        .map(|c| c.get(1).unwrap().as_str().to_string())
}

/// Year: first plausible year token in `[1980, current+1]`.
pub fn extract_year(text: &str, current_year: i32) -> Option<i32> {
    YEAR_RE.find_iter(text).find_map(|m| {
        let y: i32 = m.as_str().parse().ok()?;
        (1980..=current_year + 1).contains(&y).then_some(y)
    })
}

/// Make: word-boundary match against the closed list, alias-canonicalized.
pub fn extract_make(text: &str) -> Option<String> {
    let lower = text.to_lowercase();
    let mut best: Option<(&str, usize)> = None;
    for (alias, canonical) in MAKES {
        if let Some(pos) = find_word(&lower, alias) {
            if best.is_none_or(|(_, bp)| pos < bp) {
                best = Some((canonical, pos));
            }
        }
    }
    best.map(|(c, _)| c.to_string())
}

fn find_word(haystack: &str, needle: &str) -> Option<usize> {
    let re = Regex::new(&format!(r"\b{}\b", regex::escape(needle))).ok()?;
    re.find(haystack).map(|m| m.start())
}

/// Model: greedy short capture after the make, up to price/mileage/pipe/newline.
pub fn extract_model(text: &str, make: &str) -> Option<String> {
    let lower = text.to_lowercase();
    let make_lower = make.to_lowercase();
    let pos = find_word(&lower, &make_lower)?;
    let after = text.get(pos + make.len()..)?;
    let stop = Regex::new(r"[$|\n]|\d+\s*(?:mi|miles|km)").unwrap();
    let window = match stop.find(after) {
        Some(m) => &after[..m.start()],
        None => after,
    };
    let candidate: String = window
        .split_whitespace()
        .take(3)
        .filter(|w| !MODEL_STOPWORDS.contains(&w.to_lowercase().as_str()))
        .collect::<Vec<_>>()
        .join(" ");
    let trimmed = candidate.trim_matches(|c: char| !c.is_alphanumeric());
    (!trimmed.is_empty()).then(|| title_case(trimmed))
}

fn title_case(s: &str) -> String {
    s.split_whitespace()
        .map(|w| {
            let mut chars = w.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn parse_number(raw: &str) -> Option<i64> {
    raw.chars().filter(|c| c.is_ascii_digit()).collect::<String>().parse().ok()
}

/// Price: first `$N` or `price: $N` in `[1_000, 500_000]`.
pub fn extract_price(text: &str) -> Option<i64> {
    let candidate = PRICE_LABELED
        .captures(text)
        .or_else(|| PRICE_BARE.captures(text))
        .and_then(|c| parse_number(c.get(1).unwrap().as_str()))?;
    (1_000..=500_000).contains(&candidate).then_some(candidate)
}

/// Mileage: first `N (mi|miles|km)` or `mileage: N`, `,`/`.` as thousands seps.
pub fn extract_mileage(text: &str) -> Option<i64> {
    let candidate = MILEAGE_LABELED
        .captures(text)
        .or_else(|| MILEAGE_BARE.captures(text))
        .and_then(|c| parse_number(c.get(1).unwrap().as_str()))?;
    (0..=999_998).contains(&candidate).then_some(candidate)
}

/// Color: labeled `color: X`, else closed vocabulary match.
pub fn extract_color(text: &str) -> Option<String> {
    if let Some(c) = COLOR_LABELED.captures(text) {
        return Some(title_case(c.get(1).unwrap().as_str()));
    }
    let lower = text.to_lowercase();
    COLOR_VOCAB
        .iter()
        .find(|c| find_word(&lower, c).is_some())
        .map(|c| title_case(c))
}

/// Primary image: first non-chrome `<img src>` with `width`/`height` ≥ 100.
pub fn extract_primary_image(html: &str, base: &str) -> Option<String> {
    for caps in IMG_SRC.captures_iter(html) {
        let tag_start = caps.get(0).unwrap().start();
        let tag_end = caps.get(0).unwrap().end();
        let tag = &html[tag_start..tag_end];
        let src = caps.get(1).unwrap().as_str();

        let lower_src = src.to_lowercase();
        if LOGO_TOKENS.iter().any(|t| lower_src.contains(t)) {
            continue;
        }

        let width: Option<u32> = IMG_WIDTH.captures(tag).and_then(|c| c.get(1).unwrap().as_str().parse().ok());
        let height: Option<u32> = IMG_HEIGHT.captures(tag).and_then(|c| c.get(1).unwrap().as_str().parse().ok());
        if width.is_some_and(|w| w < 100) || height.is_some_and(|h| h < 100) {
            continue;
        }

        return crate::url::resolve(src, base).ok().or_else(|| Some(src.to_string()));
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vin_prefers_labeled_over_bare() {
        let text = "Some text VIN: 1HGCV1F30LA012345 also mentions 2TVFRABC1FG123456 elsewhere";
        assert_eq!(extract_vin(text).as_deref(), Some("1HGCV1F30LA012345"));
    }

    #[test]
    fn stock_labeled_wins_over_hash() {
        assert_eq!(extract_stock("Stock#: ABC123 or #XYZ999").as_deref(), Some("ABC123"));
    }

    #[test]
    fn year_rejects_out_of_range() {
        assert_eq!(extract_year("the year 1899 model", 2026), None);
        assert_eq!(extract_year("a 2020 Honda", 2026), Some(2020));
    }

    #[test]
    fn make_canonicalizes_aliases() {
        assert_eq!(extract_make("2019 Chevy Silverado").as_deref(), Some("Chevrolet"));
        assert_eq!(extract_make("VW Golf for sale").as_deref(), Some("Volkswagen"));
        assert_eq!(extract_make("Mercedes C300").as_deref(), Some("Mercedes-Benz"));
    }

    #[test]
    fn model_extracted_after_make_and_stopwords_filtered() {
        let model = extract_model("2019 Toyota Camry for sale $21,000", "Toyota");
        assert_eq!(model.as_deref(), Some("Camry"));
    }

    #[test]
    fn price_rejects_out_of_range() {
        assert_eq!(extract_price("only $500 today"), None);
        assert_eq!(extract_price("priced at $23,495"), Some(23495));
    }

    #[test]
    fn mileage_accepts_comma_and_dot_separators() {
        assert_eq!(extract_mileage("42,000 miles"), Some(42000));
        assert_eq!(extract_mileage("mileage: 51.200 km"), Some(51200));
    }

    #[test]
    fn primary_image_skips_logos() {
        let html = r#"<img src="/logo.png" width="50" height="50"><img src="/vehicle/1.jpg" width="400" height="300">"#;
        let img = extract_primary_image(html, "https://dealer.test").unwrap();
        assert!(img.contains("vehicle/1.jpg"));
    }
}
