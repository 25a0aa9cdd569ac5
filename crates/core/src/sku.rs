//! SKU codes and category slugs.
//!
//! Every generated SKU has the shape `WF-{CODE}-{NNN}` where `CODE` is a short
//! uppercase prefix derived from the item's category and `NNN` a zero-padded
//! per-prefix sequence.

/// Prefix shared by every generated SKU.
pub const SKU_PREFIX: &str = "WF";

/// Code used when a category name contains no letters at all.
pub const FALLBACK_CODE: &str = "CA";

/// Built-in category codes. `sku_rules` rows take precedence over these.
const KNOWN_CODES: &[(&str, &str)] = &[
    ("T-Shirts", "TS"),
    ("Tumblers", "TU"),
    ("Artwork", "AR"),
    ("Sublimation", "SU"),
    ("WindowWraps", "WW"),
    ("Window Wraps", "WW"),
];

/// Derive the SKU code for a category name.
///
/// Known categories map through a fixed table; anything else uses the first
/// two letters of the name, uppercased, after dropping every non-letter.
///
/// ```
/// use whimsical_frog_core::sku::category_code;
///
/// assert_eq!(category_code("T-Shirts"), "TS");
/// assert_eq!(category_code("mugs & cups"), "MU");
/// assert_eq!(category_code("4-x"), "X");
/// ```
#[must_use]
pub fn category_code(name: &str) -> String {
    let name = name.trim();
    if let Some((_, code)) = KNOWN_CODES.iter().find(|(known, _)| *known == name) {
        return (*code).to_owned();
    }

    let code: String = name
        .chars()
        .filter(char::is_ascii_alphabetic)
        .take(2)
        .collect::<String>()
        .to_ascii_uppercase();

    if code.is_empty() {
        FALLBACK_CODE.to_owned()
    } else {
        code
    }
}

/// Whether `code` is acceptable as a stored SKU rule (1-4 ASCII letters).
#[must_use]
pub fn is_valid_code(code: &str) -> bool {
    (1..=4).contains(&code.len()) && code.chars().all(|c| c.is_ascii_alphabetic())
}

/// Format a SKU from a code and sequence number.
#[must_use]
pub fn format_sku(code: &str, sequence: u32) -> String {
    format!("{SKU_PREFIX}-{code}-{sequence:03}")
}

/// Extract the numeric sequence of a SKU generated for `code`.
///
/// Returns `None` for SKUs that were entered by hand or belong to another code.
#[must_use]
pub fn sequence_of(sku: &str, code: &str) -> Option<u32> {
    let rest = sku.strip_prefix(SKU_PREFIX)?.strip_prefix('-')?;
    let digits = rest.strip_prefix(code)?.strip_prefix('-')?;
    if digits.len() < 3 || !digits.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

/// Next free SKU for `code` given the SKUs already in use.
///
/// Returns `None` once the highest sequence in use is `u32::MAX`.
#[must_use]
pub fn next_sku<'a, I>(code: &str, existing: I) -> Option<String>
where
    I: IntoIterator<Item = &'a str>,
{
    let highest = existing
        .into_iter()
        .filter_map(|sku| sequence_of(sku, code))
        .max()
        .unwrap_or(0);
    highest.checked_add(1).map(|next| format_sku(code, next))
}

/// Turn a category name into a URL slug.
///
/// Lowercases, collapses every run of non-alphanumerics into one `-` and trims
/// dashes from both ends. Empty results become `category`.
#[must_use]
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut pending_dash = false;
    for c in name.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(c.to_ascii_lowercase());
        } else {
            pending_dash = true;
        }
    }
    if slug.is_empty() {
        "category".to_owned()
    } else {
        slug
    }
}

/// Pick a slug not contained in `taken`, suffixing `-2`, `-3`, ... as needed.
///
/// Gives up after 250 attempts and returns `None`.
#[must_use]
pub fn unique_slug<F>(base: &str, mut taken: F) -> Option<String>
where
    F: FnMut(&str) -> bool,
{
    if !taken(base) {
        return Some(base.to_owned());
    }
    (2..=250)
        .map(|n| format!("{base}-{n}"))
        .find(|candidate| !taken(candidate))
}

/// SKUs to try, in order, when looking up the price of `sku`.
///
/// Variant SKUs such as `WF-TS-002A` or `WF-TS-002-L-RED` inherit the price of
/// their base item: trailing letters are stripped first, then trailing
/// hyphen segments are dropped one at a time (never below two segments).
#[must_use]
pub fn price_lookup_candidates(sku: &str) -> Vec<String> {
    let sku = sku.trim();
    let mut candidates = vec![sku.to_owned()];

    let stripped = sku.trim_end_matches(|c: char| c.is_ascii_alphabetic());
    if !stripped.is_empty() && stripped != sku {
        candidates.push(stripped.trim_end_matches('-').to_owned());
    }

    let mut parts: Vec<&str> = sku.split('-').collect();
    while parts.len() > 2 {
        parts.pop();
        let candidate = parts.join("-");
        if !candidates.contains(&candidate) {
            candidates.push(candidate);
        }
    }

    candidates.retain(|c| !c.is_empty());
    candidates.dedup();
    candidates
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_categories() {
        assert_eq!(category_code("T-Shirts"), "TS");
        assert_eq!(category_code("Tumblers"), "TU");
        assert_eq!(category_code("Artwork"), "AR");
        assert_eq!(category_code("Sublimation"), "SU");
        assert_eq!(category_code("WindowWraps"), "WW");
        assert_eq!(category_code("Window Wraps"), "WW");
    }

    #[test]
    fn test_fallback_takes_first_two_letters() {
        assert_eq!(category_code("Hats"), "HA");
        assert_eq!(category_code("3D prints"), "DP");
        assert_eq!(category_code("  mugs"), "MU");
        assert_eq!(category_code("Q"), "Q");
    }

    #[test]
    fn test_fallback_without_letters() {
        assert_eq!(category_code("2024"), FALLBACK_CODE);
        assert_eq!(category_code(""), FALLBACK_CODE);
    }

    #[test]
    fn test_is_valid_code() {
        assert!(is_valid_code("TS"));
        assert!(is_valid_code("ABCD"));
        assert!(!is_valid_code(""));
        assert!(!is_valid_code("ABCDE"));
        assert!(!is_valid_code("T1"));
    }

    #[test]
    fn test_next_sku() {
        let existing = ["WF-TS-001", "WF-TS-007", "WF-TU-010", "CUSTOM-1"];
        assert_eq!(next_sku("TS", existing).as_deref(), Some("WF-TS-008"));
        assert_eq!(next_sku("AR", existing).as_deref(), Some("WF-AR-001"));
    }

    #[test]
    fn test_next_sku_exhausted() {
        let existing = ["WF-TS-4294967295", "WF-TS-001"];
        assert_eq!(next_sku("TS", existing), None);
        assert_eq!(
            next_sku("TS", ["WF-TS-4294967294"]).as_deref(),
            Some("WF-TS-4294967295")
        );
        assert_eq!(sequence_of("WF-TS-4294967296", "TS"), None);
    }

    #[test]
    fn test_sequence_ignores_variants() {
        assert_eq!(sequence_of("WF-TS-012", "TS"), Some(12));
        assert_eq!(sequence_of("WF-TS-012A", "TS"), None);
        assert_eq!(sequence_of("WF-TSX-012", "TS"), None);
    }

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("T-Shirts & Tanks"), "t-shirts-tanks");
        assert_eq!(slugify("  Window Wraps "), "window-wraps");
        assert_eq!(slugify("!!!"), "category");
    }

    #[test]
    fn test_unique_slug() {
        let taken = ["mugs", "mugs-2"];
        assert_eq!(
            unique_slug("mugs", |s| taken.contains(&s)).as_deref(),
            Some("mugs-3")
        );
        assert_eq!(
            unique_slug("hats", |s| taken.contains(&s)).as_deref(),
            Some("hats")
        );
        assert_eq!(unique_slug("x", |_| true), None);
    }

    #[test]
    fn test_price_lookup_candidates() {
        assert_eq!(
            price_lookup_candidates("WF-TS-002A"),
            vec!["WF-TS-002A", "WF-TS-002", "WF-TS"]
        );
        assert_eq!(
            price_lookup_candidates("WF-TS-002-L-RED"),
            vec!["WF-TS-002-L-RED", "WF-TS-002-L", "WF-TS-002", "WF-TS"]
        );
        assert_eq!(price_lookup_candidates("WF-TS-002"), vec!["WF-TS-002", "WF-TS"]);
    }
}
