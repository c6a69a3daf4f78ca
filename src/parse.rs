use chrono::{DateTime, Utc};
use scraper::{Html, Selector};
use serde::Deserialize;
use serde_json::Value;
use tokio::task::spawn_blocking;
use tracing::{debug, warn};

use crate::item::{Amount, Item, TimeRemaining};
use crate::{Error, Result};

const NEXT_DATA_SELECTOR: &str = r#"script[id="__NEXT_DATA__"]"#;

/// Where the listing fragments may live, the first one present wins.
/// The search page nests them under `props`, raw JSON endpoints drop some of the prefix.
const ITEM_POINTERS: [&str; 4] = [
    "/props/pageProps/initialData/items",
    "/pageProps/initialData/items",
    "/initialData/items",
    "/items",
];

/// Listing fragment as it appears in the page data.
/// Every field is optional here, required ones are checked in [`RawListing::into_item`].
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct RawListing {
    title: Value,
    current_bid: Value,
    item_time_remaining: Value,
    msrp: Value,
    condition: Value,
    image_url: Value,
    lot_code: Value,
    utc_end_date_time: Value,
    bids_count: Value,
    auction_id: Value,
}

impl RawListing {
    /// Returns `None` when the title or the lot code is missing.
    fn into_item(self, search_term: &str) -> Option<Item> {
        let title = json_text(&self.title)?;
        let lot_code = json_text(&self.lot_code)?;

        let msrp = match self.msrp {
            Value::Null => None,
            ref v => Some(Amount::from_json(v)),
        };
        let end_datetime = self
            .utc_end_date_time
            .as_str()
            .and_then(|s| DateTime::parse_from_rfc3339(s.trim()).ok())
            .map(|dt| dt.with_timezone(&Utc));
        let bids_count = match &self.bids_count {
            Value::String(s) => s.trim().parse().ok(),
            v => v.as_u64(),
        };

        Some(Item {
            title,
            current_bid: Amount::from_json(&self.current_bid),
            time_remaining: TimeRemaining::from_json(&self.item_time_remaining),
            msrp,
            condition: json_text(&self.condition).unwrap_or_default(),
            image_url: json_text(&self.image_url),
            lot_code,
            end_datetime,
            bids_count,
            auction_id: json_text(&self.auction_id),
            search_term: search_term.to_string(),
        })
    }
}

/// Non-empty trimmed text of a string or number value.
fn json_text(value: &Value) -> Option<String> {
    let text = match value {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        _ => return None,
    };
    (!text.is_empty()).then_some(text)
}

/// Lazily turns the listing fragments of one response into [`Item`]s.
/// Fragments without a title or a lot code are skipped.
#[derive(Debug)]
pub struct Listings {
    fragments: std::vec::IntoIter<Value>,
    search_term: String,
    skipped: usize,
}

impl Listings {
    fn new(fragments: Vec<Value>, search_term: &str) -> Self {
        Self {
            fragments: fragments.into_iter(),
            search_term: search_term.to_string(),
            skipped: 0,
        }
    }

    /// Number of fragments dropped so far.
    pub fn skipped(&self) -> usize {
        self.skipped
    }
}

impl Iterator for Listings {
    type Item = Item;

    fn next(&mut self) -> Option<Item> {
        for fragment in self.fragments.by_ref() {
            let item = match fragment {
                Value::Object(_) => serde_json::from_value::<RawListing>(fragment)
                    .ok()
                    .and_then(|raw| raw.into_item(&self.search_term)),
                _ => None,
            };
            match item {
                Some(item) => return Some(item),
                None => {
                    self.skipped += 1;
                    debug!(search_term = %self.search_term, "skipping listing without title or lot code");
                }
            }
        }
        None
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (0, self.fragments.size_hint().1)
    }
}

/// Parses the response on the blocking pool, HTML parsing is CPU bound.
pub async fn parse_response(body: String, search_term: String) -> Result<Listings> {
    spawn_blocking(move || parse_page(&body, &search_term)).await?
}

/// Accepts either a search page carrying the `__NEXT_DATA__` script or a raw JSON body.
pub fn parse_page(body: &str, search_term: &str) -> Result<Listings> {
    let mut data: Value = if body.trim_start().starts_with('{') {
        serde_json::from_str(body)?
    } else {
        match extract_next_data(body)? {
            Some(json) => serde_json::from_str(&json)?,
            None => {
                warn!(search_term, "No data found in the search page");
                return Ok(Listings::new(Vec::new(), search_term));
            }
        }
    };

    let pointer = ITEM_POINTERS
        .iter()
        .copied()
        .find(|pointer| data.pointer(pointer).is_some());
    let fragments = match pointer.and_then(|p| data.pointer_mut(p)).map(Value::take) {
        Some(Value::Array(fragments)) => fragments,
        Some(Value::Null) | None => {
            debug!(search_term, "response carries no item list");
            Vec::new()
        }
        Some(other) => {
            return Err(Error::Parse(format!(
                "item list should be an array, found: {other}"
            )))
        }
    };

    Ok(Listings::new(fragments, search_term))
}

/// Contents of the `__NEXT_DATA__` script, `None` when the page has none or it is empty.
fn extract_next_data(html: &str) -> Result<Option<String>> {
    let doc = Html::parse_document(html);
    let selector = create_selector(NEXT_DATA_SELECTOR)?;

    Ok(doc
        .select(&selector)
        .next()
        .map(|script| script.text().collect::<String>())
        .filter(|json| !json.trim().is_empty()))
}

#[inline]
fn create_selector(sel_str: &str) -> Result<Selector> {
    Selector::parse(sel_str).map_err(|_| Error::ParseInvalidSelector(sel_str.into()))
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn search_page(items: Value) -> String {
        let data = json!({ "props": { "pageProps": { "initialData": { "items": items } } } });
        format!(
            r#"<html><head><title>Items</title></head><body><div id="__next"></div><script id="__NEXT_DATA__" type="application/json">{data}</script></body></html>"#
        )
    }

    fn fixture_item() -> Value {
        json!({
            "title": "Test Aquarium",
            "currentBid": 50.00,
            "imageUrl": "http://example.com/image.jpg",
            "utcEndDateTime": "2024-01-20T14:19:00Z",
            "itemTimeRemaining": "3600",
            "msrp": 100.00,
            "condition": "As Is",
            "lotCode": "TEST123",
            "bidsCount": 5,
            "auctionId": "12345"
        })
    }

    #[test]
    fn parses_all_fields() {
        let items: Vec<_> = parse_page(&search_page(json!([fixture_item()])), "aquarium")
            .unwrap()
            .collect();

        assert_eq!(items.len(), 1);
        let item = &items[0];
        assert_eq!(item.title, "Test Aquarium");
        assert_eq!(item.current_bid, Amount::Known(50.0));
        assert_eq!(item.time_remaining, TimeRemaining::Seconds(3600));
        assert_eq!(item.msrp, Some(Amount::Known(100.0)));
        assert_eq!(item.condition, "As Is");
        assert_eq!(item.image_url.as_deref(), Some("http://example.com/image.jpg"));
        assert_eq!(item.lot_code, "TEST123");
        assert_eq!(
            item.end_datetime.map(|dt| dt.to_rfc3339()),
            Some("2024-01-20T14:19:00+00:00".to_string())
        );
        assert_eq!(item.bids_count, Some(5));
        assert_eq!(item.auction_id.as_deref(), Some("12345"));
        assert_eq!(item.search_term, "aquarium");
        assert_eq!(item.hours_remaining(), Some(1.0));
    }

    #[test]
    fn skips_fragment_without_title() {
        let mut no_title = fixture_item();
        no_title.as_object_mut().unwrap().remove("title");
        let mut second = fixture_item();
        second["lotCode"] = json!("TEST456");

        let mut listings =
            parse_page(&search_page(json!([fixture_item(), no_title, second])), "aquarium")
                .unwrap();
        let items: Vec<_> = listings.by_ref().collect();

        assert_eq!(items.len(), 2);
        assert_eq!(items[0].lot_code, "TEST123");
        assert_eq!(items[1].lot_code, "TEST456");
        assert_eq!(listings.skipped(), 1);
    }

    #[test]
    fn skips_fragment_without_lot_code() {
        let mut no_lot = fixture_item();
        no_lot["lotCode"] = json!("  ");
        let items: Vec<_> = parse_page(&search_page(json!([no_lot, "garbage", 42])), "x")
            .unwrap()
            .collect();
        assert!(items.is_empty());
    }

    #[test]
    fn malformed_numbers_become_unknown() {
        let mut item = fixture_item();
        item["currentBid"] = json!("call for price");
        item["msrp"] = json!({ "amount": 3 });
        let items: Vec<_> = parse_page(&search_page(json!([item])), "x")
            .unwrap()
            .collect();

        assert_eq!(items[0].current_bid, Amount::Unknown);
        assert_eq!(items[0].msrp, Some(Amount::Unknown));
    }

    #[test]
    fn missing_optional_fields() {
        let items: Vec<_> = parse_page(
            &search_page(json!([{ "title": "Lamp", "lotCode": 991 }])),
            "lamp",
        )
        .unwrap()
        .collect();

        let item = &items[0];
        assert_eq!(item.lot_code, "991");
        assert_eq!(item.msrp, None);
        assert_eq!(item.image_url, None);
        assert_eq!(item.current_bid, Amount::Unknown);
        assert_eq!(item.time_remaining, TimeRemaining::Unknown);
        assert_eq!(item.condition, "");
    }

    #[test]
    fn parses_raw_json_body() {
        let body = json!({ "items": [fixture_item()] }).to_string();
        assert_eq!(parse_page(&body, "x").unwrap().count(), 1);
    }

    #[test]
    fn no_item_list_is_empty() {
        let body = json!({ "props": { "pageProps": {} } }).to_string();
        assert_eq!(parse_page(&body, "x").unwrap().count(), 0);
    }

    #[test]
    fn missing_script_yields_no_items() {
        let mut listings =
            parse_page("<html><body><p>Maintenance</p></body></html>", "x").unwrap();
        assert!(listings.next().is_none());
        assert_eq!(listings.skipped(), 0);

        let empty_script = r#"<html><body><script id="__NEXT_DATA__">  </script></body></html>"#;
        assert_eq!(parse_page(empty_script, "x").unwrap().count(), 0);
    }

    #[test]
    fn invalid_json_is_parse_error() {
        let html = r#"<html><body><script id="__NEXT_DATA__">{not json</script></body></html>"#;
        assert!(matches!(parse_page(html, "x").unwrap_err(), Error::Parse(_)));
    }

    #[test]
    fn item_list_of_wrong_type_is_parse_error() {
        let body = json!({ "items": "none" }).to_string();
        assert!(matches!(parse_page(&body, "x").unwrap_err(), Error::Parse(_)));
    }

    #[tokio::test]
    async fn parses_on_blocking_pool() {
        let listings = parse_response(search_page(json!([fixture_item()])), "aquarium".into())
            .await
            .unwrap();
        assert_eq!(listings.count(), 1);
    }
}
