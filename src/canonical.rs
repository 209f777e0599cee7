//! Posting identity: reduces the many URL shapes of one job posting to a single key.

use once_cell::sync::Lazy;
use regex::Regex;
use url::Url;


pub const SITE_ORIGIN: &str = "https://www.linkedin.com";

/// Query parameters used by search and collection views to select a posting
const JOB_ID_PARAMS: [&str; 2] = ["currentJobId", "jobId"];

static JOB_PATH: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"/jobs/(?:guest/)?view/(?:[^/?#]*-)?(\d+)(?:[/?#]|$)|/jobPosting/(\d+)").unwrap()
});
static JOB_URN: Lazy<Regex> = Lazy::new(|| Regex::new(r"urn:li:(?:fs_)?jobPosting:(\d+)").unwrap());
static SUPPORTED_PAGE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^https://www\.linkedin\.com/jobs/(?:view|collections)/").unwrap()
});


fn is_job_id(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit())
}


fn id_from_path(path: &str) -> Option<String> {
    let caps = JOB_PATH.captures(path)?;
    caps.get(1).or_else(|| caps.get(2)).map(|m| m.as_str().to_string())
}


/// Finds the numeric posting id carried by `raw`, if any.
///
/// A job-id query parameter wins over the path, since collection views keep
/// the selected posting in the query while the path names the collection.
pub fn job_id_from(raw: &str) -> Option<String> {
    match Url::parse(raw) {
        Ok(url) => url
            .query_pairs()
            .find(|(key, value)| JOB_ID_PARAMS.contains(&key.as_ref()) && is_job_id(value))
            .map(|(_, value)| value.into_owned())
            .or_else(|| id_from_path(url.path())),
        // relative paths and other fragments
        Err(_) => id_from_path(raw),
    }
}


/// Finds a posting id in raw markup such as `urn:li:jobPosting:123`.
pub fn job_id_from_urn(markup: &str) -> Option<String> {
    JOB_URN
        .captures(markup)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}


pub fn url_for_job_id(id: &str) -> String {
    format!("{SITE_ORIGIN}/jobs/view/{id}/")
}


/// Normalizes `raw` into the dedupe key of the posting it shows.
///
/// URLs without a recognizable posting id are returned verbatim, so the
/// function is idempotent.
pub fn canonicalize(raw: &str) -> String {
    match job_id_from(raw) {
        Some(id) => url_for_job_id(&id),
        None => raw.to_string(),
    }
}


/// Whether `url` is a posting view that extraction can run against.
pub fn is_supported_posting_url(url: &str) -> bool {
    SUPPORTED_PAGE.is_match(url)
}


/// Turns one line of a URL list into a canonical posting URL.
///
/// Blank lines and `#` comments are skipped. Site-relative `/jobs/view/...`
/// paths are completed with the site origin.
pub fn normalize_input(line: &str) -> Option<String> {
    let s = line.trim();
    if s.is_empty() || s.starts_with('#') {
        return None;
    }
    if s.starts_with("http") {
        return Some(canonicalize(s));
    }
    if JOB_PATH.is_match(s) {
        let at = s.find("/jobs/").or_else(|| s.find("/jobPosting/"))?;
        return Some(canonicalize(&format!("{SITE_ORIGIN}{}", &s[at..])));
    }
    None
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_job_id_builds_canonical_view() {
        assert_eq!(
            canonicalize("https://www.linkedin.com/jobs/collections/recommended/?currentJobId=3812345678&origin=JYMBII"),
            "https://www.linkedin.com/jobs/view/3812345678/"
        );
    }

    #[test]
    fn tracking_variants_collapse() {
        let a = canonicalize("https://www.linkedin.com/jobs/search/?currentJobId=42&refId=abc");
        let b = canonicalize("https://www.linkedin.com/jobs/collections/top-applicant/?currentJobId=42&trk=xyz");
        let c = canonicalize("https://www.linkedin.com/jobs/view/42/?trackingId=zzz");
        assert_eq!(a, b);
        assert_eq!(b, c);
    }

    #[test]
    fn path_ids_are_recognized() {
        assert_eq!(canonicalize("https://www.linkedin.com/jobs/view/99"), url_for_job_id("99"));
        assert_eq!(canonicalize("https://www.linkedin.com/jobs/guest/view/77/"), url_for_job_id("77"));
        assert_eq!(
            canonicalize("https://www.linkedin.com/jobs/view/senior-engineer-at-acme-3812345678/"),
            url_for_job_id("3812345678")
        );
        assert_eq!(canonicalize("https://example.com/jobPosting/5"), url_for_job_id("5"));
    }

    #[test]
    fn non_numeric_query_ids_are_ignored() {
        assert_eq!(job_id_from("https://www.linkedin.com/jobs/search/?currentJobId=abc"), None);
    }

    #[test]
    fn unknown_urls_are_verbatim() {
        let raw = "https://x/1";
        assert_eq!(canonicalize(raw), raw);
    }

    #[test]
    fn canonicalize_is_idempotent() {
        for raw in [
            "https://www.linkedin.com/jobs/collections/recommended/?currentJobId=3812345678",
            "https://www.linkedin.com/jobs/view/12/?refId=1",
            "https://careers.example.org/openings?role=7",
            "not a url at all",
        ] {
            let once = canonicalize(raw);
            assert_eq!(canonicalize(&once), once, "{raw}");
        }
    }

    #[test]
    fn urn_ids_are_found_in_markup() {
        assert_eq!(
            job_id_from_urn(r#"<code>{"entityUrn":"urn:li:fs_jobPosting:31415"}</code>"#).as_deref(),
            Some("31415")
        );
    }

    #[test]
    fn supported_pages() {
        assert!(is_supported_posting_url("https://www.linkedin.com/jobs/view/1/"));
        assert!(is_supported_posting_url("https://www.linkedin.com/jobs/collections/recommended/?currentJobId=1"));
        assert!(!is_supported_posting_url("https://www.linkedin.com/feed/"));
        assert!(!is_supported_posting_url("http://www.linkedin.com/jobs/view/1/"));
    }

    #[test]
    fn input_lines() {
        assert_eq!(normalize_input("  # saved for later"), None);
        assert_eq!(normalize_input(""), None);
        assert_eq!(normalize_input("/jobs/view/123/?trk=abc").as_deref(), Some(url_for_job_id("123").as_str()));
        assert_eq!(normalize_input("../jobs/view/8").as_deref(), Some(url_for_job_id("8").as_str()));
        assert_eq!(normalize_input("garbage"), None);
    }
}
