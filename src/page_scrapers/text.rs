use once_cell::sync::Lazy;
use regex::Regex;


/// Splits company blocks such as `"Acme Inc · 5,001-10,000 employees"`
static COMPANY_SPLIT: Lazy<Regex> = Lazy::new(|| Regex::new(r"[\r\n]+|[•·|]|—|–").unwrap());
static TITLE_AT_COMPANY: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)^(.+?)\s+at\s+(.+)$").unwrap());
static COMPANY_TAIL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\s+(?:\d[\d,.+kKmM]*\s+)?(?:employees|followers)\b.*$").unwrap()
});

static LOCATION_SEP: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s*[•·|]\s*|\s+\.\s+|[\r\n]+").unwrap());
static REGION_CODE: Lazy<Regex> = Lazy::new(|| Regex::new(r",\s*[A-Za-z]{2}\b").unwrap());
static COUNTRY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b(United States|USA|Canada|United Kingdom|UK|Germany|France|India|Australia|Mexico|Brazil|Spain|Italy|Netherlands|Singapore)\b",
    )
    .unwrap()
});
/// Activity text that shares a subline with the location but never is one
static LOCATION_NOISE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b(posted|reposted|minutes?|hours?|days?|weeks?|months?|apply|applicants?|people|clicked|promoted|responses?|managed|saved|premium)\b",
    )
    .unwrap()
});

const MAX_LOCATION_LEN: usize = 70;


/// Collapses every run of whitespace (including non-breaking spaces) into a single space.
pub fn collapse_ws(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}


/// Reduces a raw company block to the bare company name.
///
/// Only the first chunk before a bullet or line break is kept, `"Title at Company"`
/// captures prefer the company, and employee/follower badges are dropped.
pub fn clean_company_name(raw: &str) -> String {
    let first = COMPANY_SPLIT.split(raw).next().unwrap_or_default().trim();
    let mut name = first;

    if let Some(caps) = TITLE_AT_COMPANY.captures(first) {
        let before = caps.get(1).map_or("", |m| m.as_str());
        let after = caps.get(2).map_or("", |m| m.as_str()).trim();
        let after_len = after.chars().count();
        if before.chars().count() > 20 && (2..=60).contains(&after_len) {
            name = after;
        }
    }

    collapse_ws(&COMPANY_TAIL.replace(name, ""))
}


fn looks_like_location(part: &str) -> bool {
    if part.chars().count() > MAX_LOCATION_LEN || LOCATION_NOISE.is_match(part) {
        return false;
    }
    REGION_CODE.is_match(part) || COUNTRY.is_match(part)
}


/// Scans a separator-delimited block for the first part that reads like a location.
///
/// A bare `remote` part yields the literal `"Remote"`.
pub fn pick_location(block: &str) -> Option<String> {
    LOCATION_SEP
        .split(block)
        .map(collapse_ws)
        .filter(|part| !part.is_empty())
        .find_map(|part| {
            if part.eq_ignore_ascii_case("remote") {
                Some("Remote".to_string())
            } else if looks_like_location(&part) {
                Some(part)
            } else {
                None
            }
        })
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collapses_nbsp_and_newlines() {
        assert_eq!(collapse_ws("  Senior\u{a0}\u{a0}Engineer\n  II "), "Senior Engineer II");
    }

    #[test]
    fn company_badges_are_stripped() {
        assert_eq!(clean_company_name("Acme Inc · 5,001-10,000 employees"), "Acme Inc");
        assert_eq!(clean_company_name("Acme Inc 12,345 followers"), "Acme Inc");
        assert_eq!(clean_company_name("Acme\n\nRetail"), "Acme");
    }

    #[test]
    fn long_title_at_company_prefers_company() {
        assert_eq!(
            clean_company_name("Principal Platform Engineer at Globex Corporation"),
            "Globex Corporation"
        );
        assert_eq!(clean_company_name("Eat at Joe's"), "Eat at Joe's");
    }

    #[test]
    fn picks_region_coded_part() {
        assert_eq!(
            pick_location("Acme Inc · Austin, TX · 2 weeks ago · 100 applicants").as_deref(),
            Some("Austin, TX")
        );
    }

    #[test]
    fn remote_is_normalized() {
        assert_eq!(pick_location("Acme | REMOTE | Full-time").as_deref(), Some("Remote"));
    }

    #[test]
    fn country_names_qualify() {
        assert_eq!(pick_location("Acme • Berlin Germany").as_deref(), Some("Berlin Germany"));
    }

    #[test]
    fn activity_noise_is_rejected() {
        assert_eq!(pick_location("Reposted 3 days ago, in US"), None);
        assert_eq!(pick_location("Senior Engineer"), None);
        assert_eq!(pick_location("Dayton, OH").as_deref(), Some("Dayton, OH"));
    }
}
