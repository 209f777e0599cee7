use once_cell::sync::Lazy;
use regex::Regex;

use super::{text, PageScraper, PageView, ResolutionSource};


static NOTIFICATION_COUNT: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\(\d+\+?\)\s*").unwrap());
/// Dashes only separate when spaced, so `Co-Founder` survives
static SEGMENT_SEP: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s*[|•·]\s*|\s+[-–—]\s+").unwrap());


#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TabTitle {
    pub title: String,
    pub company: String,
}


/// Splits a tab title such as `"(4) Role - Company | Site"` into role and company.
///
/// Returns None unless a company segment can be told apart from the role.
pub fn parse_tab_title(raw: &str, site_name: &str) -> Option<TabTitle> {
    let stripped = NOTIFICATION_COUNT.replace(raw.trim(), "");
    let mut segments: Vec<String> = SEGMENT_SEP
        .split(&stripped)
        .map(text::collapse_ws)
        .filter(|s| !s.is_empty())
        .collect();

    if segments.last().is_some_and(|last| last.eq_ignore_ascii_case(site_name)) {
        segments.pop();
        if segments.len() < 2 {
            return None;
        }
        let company = segments.pop()?;
        return Some(TabTitle { title: segments.join(" - "), company });
    }

    match segments.as_slice() {
        [title, company, ..] => Some(TabTitle { title: title.clone(), company: company.clone() }),
        _ => None,
    }
}


/// Reads the browser tab title. Robust but imprecise.
#[derive(Default)]
pub struct TitleScraper;


impl TitleScraper {
    fn parsed(page: &PageView<'_>) -> Option<TabTitle> {
        parse_tab_title(&page.tab_title(), &page.state.options.site_name)
    }
}


impl PageScraper for TitleScraper {
    const NAME: &'static str = "title";
    const SOURCE: ResolutionSource = ResolutionSource::TitleString;

    fn title(page: &PageView<'_>) -> Option<String> {
        Self::parsed(page).map(|parsed| parsed.title)
    }

    fn company(page: &PageView<'_>) -> Option<String> {
        Self::parsed(page).map(|parsed| text::clean_company_name(&parsed.company))
    }
}
