use once_cell::sync::Lazy;
use scraper::{Html, Selector};
use serde_json::Value;
use tracing::debug;

use super::{text, PageScraper, PageView, ResolutionSource};


static LD_JSON: Lazy<Selector> = Lazy::new(|| Selector::parse(r#"script[type="application/ld+json"]"#).unwrap());


fn flatten_into(value: Value, out: &mut Vec<Value>) {
    match value {
        Value::Array(items) => items.into_iter().for_each(|item| flatten_into(item, out)),
        Value::Object(mut object) => {
            if let Some(graph) = object.remove("@graph") {
                flatten_into(graph, out);
            }
            out.push(Value::Object(object));
        }
        _ => {}
    }
}


/// Parses every JSON-LD block of the page. Malformed blocks are skipped.
pub fn structured_objects(document: &Html) -> Vec<Value> {
    let mut objects = Vec::new();
    for script in document.select(&LD_JSON) {
        let raw: String = script.text().collect();
        match serde_json::from_str::<Value>(&raw) {
            Ok(value) => flatten_into(value, &mut objects),
            Err(e) => debug!("skipping malformed ld+json block: {e}"),
        }
    }
    objects
}


/// Strings and numbers as display text
fn value_text(value: &Value) -> Option<String> {
    let text = match value {
        Value::String(s) => text::collapse_ws(s),
        Value::Number(n) => n.to_string(),
        _ => return None,
    };
    (!text.is_empty()).then_some(text)
}


/// A single value or an array of them
fn as_list(value: Option<&Value>) -> Vec<&Value> {
    match value {
        Some(Value::Array(items)) => items.iter().collect(),
        Some(Value::Null) | None => Vec::new(),
        Some(other) => vec![other],
    }
}


fn hiring_organization(object: &Value) -> Option<String> {
    let named = |holder: &Value| {
        let org = holder.get("hiringOrganization")?;
        match org {
            Value::String(_) => value_text(org),
            _ => org.get("name").and_then(value_text),
        }
    };
    named(object).or_else(|| as_list(object.get("jobLocation")).into_iter().find_map(named))
}


fn address_text(place: &Value) -> Option<String> {
    let address = place.get("address")?;
    let field = |key: &str| match address.get(key) {
        // addressCountry may be a Country object
        Some(country @ Value::Object(_)) => country.get("name").and_then(value_text),
        Some(other) => value_text(other),
        None => None,
    };

    match (field("addressLocality"), field("addressRegion")) {
        (Some(locality), Some(region)) => Some(format!("{locality}, {region}")),
        (Some(locality), None) => Some(locality),
        (None, Some(region)) => Some(region),
        (None, None) => field("addressCountry"),
    }
}


fn job_location(object: &Value) -> Option<String> {
    let location = object
        .get("jobLocation")
        .filter(|v| !v.is_null())
        .or_else(|| object.get("jobLocationType"))?;

    if let Value::String(s) = location {
        let lowered = s.to_lowercase();
        return (lowered.contains("remote") || lowered == "telecommute").then(|| "Remote".to_string());
    }
    as_list(Some(location)).into_iter().find_map(address_text)
}


/// Reads the schema.org `JobPosting` embedded in the page
#[derive(Default)]
pub struct MetadataScraper;


impl PageScraper for MetadataScraper {
    const NAME: &'static str = "metadata";
    const SOURCE: ResolutionSource = ResolutionSource::StructuredMetadata;

    fn company(page: &PageView<'_>) -> Option<String> {
        page.structured
            .iter()
            .filter_map(hiring_organization)
            .map(|name| text::clean_company_name(&name))
            .find(|name| !name.is_empty())
    }

    fn location(page: &PageView<'_>) -> Option<String> {
        page.structured.iter().find_map(job_location)
    }
}
