use once_cell::sync::Lazy;
use scraper::{ElementRef, Html, Selector};

use super::{text, PageScraper, PageView, ResolutionSource};


fn selector(css: &str) -> Selector {
    Selector::parse(css).unwrap()
}


pub(super) static DOCUMENT_TITLE: Lazy<Selector> = Lazy::new(|| selector("title"));
static BODY: Lazy<Selector> = Lazy::new(|| selector("body"));

static JOB_TITLE: Lazy<Selector> = Lazy::new(|| {
    selector("h1[class*='jobs-unified-top-card__job-title'], h1[class*='job-details-jobs-title'], .top-card-layout__title, h1")
});
static COMPANY_LINKS: Lazy<Selector> = Lazy::new(|| {
    selector("a[href*='/company/'], a[data-tracking-control-name*='topcard']")
});
/// Company spots used by older and experimental layouts, in priority order
static COMPANY_FALLBACKS: Lazy<Vec<Selector>> = Lazy::new(|| {
    [
        "a[class*='jobs-unified-top-card__company-name']",
        "a.topcard__org-name-link",
        ".top-card-layout__second-subline a",
        ".sub-nav-cta__subtitle a",
        ".jobs-company__box a",
    ]
    .into_iter()
    .map(selector)
    .collect()
});
static SUBLINE: Lazy<Selector> = Lazy::new(|| {
    selector(".top-card-layout__first-subline, .jobs-unified-top-card__subtitle-primary, .jobs-unified-top-card__subtitle-primary-group")
});
static INLINE_SPANS: Lazy<Selector> = Lazy::new(|| {
    selector(".top-card-layout__entity-info span, span[class*='jobs-unified-top-card__bullet'], .jobs-unified-top-card__subtitle-primary span")
});
static TOP_CARD: Lazy<Selector> = Lazy::new(|| {
    selector(".jobs-unified-top-card, .top-card-layout, .jobs-details-top-card, .jobs-details__main")
});
static POSTED: Lazy<Selector> = Lazy::new(|| {
    selector("span[class*='posted-time-ago__text'], span[class*='jobs-unified-top-card__posted-date'], time[datetime]")
});
static TIMESTAMP: Lazy<Selector> = Lazy::new(|| selector("time[datetime]"));
static CANONICAL_LINK: Lazy<Selector> = Lazy::new(|| selector("link[rel='canonical']"));
static OG_URL: Lazy<Selector> = Lazy::new(|| selector("meta[property='og:url']"));

const MAX_SPANS: usize = 40;
const MAX_CARD_LINES: usize = 30;

/// Elements whose text never renders
const SILENT: [&str; 5] = ["script", "style", "noscript", "template", "head"];
const BLOCK: [&str; 26] = [
    "address", "article", "aside", "blockquote", "br", "dd", "div", "dl", "dt", "footer", "form", "h1", "h2",
    "h3", "h4", "h5", "h6", "header", "hr", "li", "main", "nav", "ol", "p", "section", "ul",
];


fn push_rendered_text(element: ElementRef<'_>, out: &mut String) {
    for child in element.children() {
        if let Some(text) = child.value().as_text() {
            // collapse source whitespace the way layout would
            let mut words = text.split_whitespace().peekable();
            if text.starts_with(char::is_whitespace) && !out.ends_with([' ', '\n']) && !out.is_empty() {
                out.push(' ');
            }
            while let Some(word) = words.next() {
                out.push_str(word);
                if words.peek().is_some() {
                    out.push(' ');
                }
            }
            if text.ends_with(char::is_whitespace) && !text.trim().is_empty() {
                out.push(' ');
            }
        } else if let Some(child) = ElementRef::wrap(child) {
            let name = child.value().name();
            if SILENT.contains(&name) {
                continue;
            }
            let block = BLOCK.contains(&name) || name == "tr";
            if block {
                out.push('\n');
            }
            push_rendered_text(child, out);
            if block {
                out.push('\n');
            }
        }
    }
}


/// Approximates `innerText`: words joined by single spaces, block elements on their own lines.
pub fn inner_text(element: ElementRef<'_>) -> String {
    let mut out = String::new();
    push_rendered_text(element, &mut out);
    out
}


/// Whether the element or any ancestor is hidden from layout.
pub fn is_visible(element: ElementRef<'_>) -> bool {
    std::iter::once(element)
        .chain(element.ancestors().filter_map(ElementRef::wrap))
        .all(|el| {
            let el = el.value();
            if el.attr("hidden").is_some() || el.attr("aria-hidden") == Some("true") {
                return false;
            }
            let style: String = el
                .attr("style")
                .unwrap_or_default()
                .chars()
                .filter(|c| !c.is_whitespace())
                .collect::<String>()
                .to_ascii_lowercase();
            !style.contains("display:none") && !style.contains("visibility:hidden")
        })
}


pub(super) fn first_text(document: &Html, selector: &Selector) -> Option<String> {
    document
        .select(selector)
        .next()
        .map(|el| text::collapse_ws(&inner_text(el)))
        .filter(|s| !s.is_empty())
}


/// Whether the posting's top card has rendered.
pub fn has_top_card(html: &str) -> bool {
    Html::parse_document(html).select(&TOP_CARD).next().is_some()
}


/// Reads what the user currently sees
#[derive(Default)]
pub struct DomScraper;


impl DomScraper {
    /// The human posted text, e.g. `"2 weeks ago"`
    pub fn posted_text(page: &PageView<'_>) -> Option<String> {
        first_text(&page.document, &POSTED)
    }

    pub fn timestamp_hint(page: &PageView<'_>) -> Option<String> {
        page.document
            .select(&TIMESTAMP)
            .next()
            .and_then(|el| el.value().attr("datetime"))
            .map(|s| s.trim().to_string())
    }

    /// URLs the page declares for itself
    pub fn identity_hints(page: &PageView<'_>) -> Vec<String> {
        let canonical = page.document.select(&CANONICAL_LINK).filter_map(|el| el.value().attr("href"));
        let og = page.document.select(&OG_URL).filter_map(|el| el.value().attr("content"));
        canonical.chain(og).map(str::to_string).collect()
    }
}


impl PageScraper for DomScraper {
    const NAME: &'static str = "dom";
    const SOURCE: ResolutionSource = ResolutionSource::Dom;

    fn title(page: &PageView<'_>) -> Option<String> {
        first_text(&page.document, &JOB_TITLE)
    }

    fn company(page: &PageView<'_>) -> Option<String> {
        let linked = page
            .document
            .select(&COMPANY_LINKS)
            .filter(|a| is_visible(*a))
            .map(|a| text::clean_company_name(&inner_text(a)))
            .find(|name| !name.is_empty());
        if linked.is_some() {
            return linked;
        }

        COMPANY_FALLBACKS
            .iter()
            .filter_map(|s| first_text(&page.document, s))
            .map(|block| text::clean_company_name(&block))
            .find(|name| !name.is_empty())
    }

    fn location(page: &PageView<'_>) -> Option<String> {
        let document = &page.document;

        if let Some(found) = document.select(&SUBLINE).next().and_then(|el| text::pick_location(&inner_text(el))) {
            return Some(found);
        }

        if let Some(found) = document
            .select(&INLINE_SPANS)
            .take(MAX_SPANS)
            .find_map(|el| text::pick_location(&inner_text(el)))
        {
            return Some(found);
        }

        let card = document.select(&TOP_CARD).next().or_else(|| document.select(&BODY).next())?;
        inner_text(card)
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .take(MAX_CARD_LINES)
            .find_map(text::pick_location)
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    fn body_element(document: &Html) -> ElementRef<'_> {
        document.select(&BODY).next().unwrap()
    }

    #[test]
    fn inner_text_breaks_blocks_and_collapses_inline() {
        let document = Html::parse_document(
            "<body><div>Acme\n   <b>Inc</b></div><p>Austin,  TX</p><script>var x = 1;</script></body>",
        );
        let rendered = inner_text(body_element(&document));
        let lines: Vec<&str> = rendered.lines().map(str::trim).filter(|l| !l.is_empty()).collect();
        assert_eq!(lines, vec!["Acme Inc", "Austin, TX"]);
    }

    #[test]
    fn hidden_ancestors_hide_links() {
        let document = Html::parse_document(
            r#"<body><div style="display: none"><a id="a" href="/company/a">A</a></div>
               <a id="b" aria-hidden="true" href="/company/b">B</a>
               <a id="c" href="/company/c">C</a></body>"#,
        );
        let links = Selector::parse("a").unwrap();
        let visible: Vec<bool> = document.select(&links).map(is_visible).collect();
        assert_eq!(visible, vec![false, false, true]);
    }

    #[test]
    fn top_card_detection() {
        assert!(has_top_card(r#"<div class="top-card-layout">x</div>"#));
        assert!(!has_top_card("<div class='spinner'></div>"));
    }
}
