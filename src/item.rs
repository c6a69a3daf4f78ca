use std::fmt;

use chrono::{DateTime, SecondsFormat, Utc};

/// Written in place of a value that was present in the listing but couldn't be read.
pub const UNKNOWN: &str = "unknown";

/// A currency amount as the site reports it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Amount {
    Known(f64),
    Unknown,
}

impl Amount {
    /// Accepts plain numbers as well as strings like `"$1,234.50"`.
    pub fn from_json(value: &serde_json::Value) -> Self {
        use serde_json::Value;

        match value {
            Value::Number(n) => n.as_f64().map_or(Amount::Unknown, Amount::Known),
            Value::String(s) => {
                let cleaned = s.trim().trim_start_matches('$').replace(',', "");
                match cleaned.parse::<f64>() {
                    Ok(v) if v.is_finite() => Amount::Known(v),
                    _ => Amount::Unknown,
                }
            }
            _ => Amount::Unknown,
        }
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Amount::Known(v) => write!(f, "{v}"),
            Amount::Unknown => f.write_str(UNKNOWN),
        }
    }
}

/// Time left on the auction. The site usually sends a number of seconds,
/// anything else is kept as the textual countdown it sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TimeRemaining {
    Seconds(u64),
    Countdown(String),
    Unknown,
}

impl TimeRemaining {
    pub fn from_json(value: &serde_json::Value) -> Self {
        use serde_json::Value;

        match value {
            Value::Number(n) => match n.as_u64() {
                Some(secs) => TimeRemaining::Seconds(secs),
                None => n
                    .as_f64()
                    .filter(|v| v.is_finite() && *v >= 0.0)
                    .map_or(TimeRemaining::Unknown, |v| {
                        TimeRemaining::Seconds(v.round() as u64)
                    }),
            },
            Value::String(s) => {
                let s = s.trim();
                if s.is_empty() {
                    return TimeRemaining::Unknown;
                }
                if let Ok(secs) = s.parse::<u64>() {
                    return TimeRemaining::Seconds(secs);
                }
                match s.parse::<f64>() {
                    Ok(v) if v.is_finite() && v >= 0.0 => TimeRemaining::Seconds(v.round() as u64),
                    _ => TimeRemaining::Countdown(s.to_string()),
                }
            }
            _ => TimeRemaining::Unknown,
        }
    }

    pub fn as_seconds(&self) -> Option<u64> {
        match self {
            TimeRemaining::Seconds(secs) => Some(*secs),
            _ => None,
        }
    }
}

impl fmt::Display for TimeRemaining {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimeRemaining::Seconds(secs) => write!(f, "{secs}"),
            TimeRemaining::Countdown(text) => f.write_str(text),
            TimeRemaining::Unknown => f.write_str(UNKNOWN),
        }
    }
}

/// One auction listing as it was at scrape time.
#[derive(Debug, Clone, PartialEq)]
pub struct Item {
    pub title: String,
    pub current_bid: Amount,
    pub time_remaining: TimeRemaining,
    pub msrp: Option<Amount>,
    pub condition: String,
    pub image_url: Option<String>,
    pub lot_code: String,
    pub end_datetime: Option<DateTime<Utc>>,
    pub bids_count: Option<u64>,
    pub auction_id: Option<String>,
    pub search_term: String,
}

impl Item {
    /// Column names, in the order [`Item::to_record`] writes the fields.
    pub const HEADER: [&'static str; 12] = [
        "title",
        "current_bid",
        "time_remaining",
        "msrp",
        "condition",
        "image_url",
        "lot_code",
        "end_datetime",
        "bids_count",
        "auction_id",
        "search_term",
        "hours_remaining",
    ];

    pub fn hours_remaining(&self) -> Option<f64> {
        self.time_remaining
            .as_seconds()
            .map(|secs| secs as f64 / 3600.0)
    }

    /// Stringified fields, absent optionals become empty cells.
    /// The trailing `hours_remaining` is derived from a seconds-valued `time_remaining`.
    pub fn to_record(&self) -> [String; 12] {
        [
            self.title.clone(),
            self.current_bid.to_string(),
            self.time_remaining.to_string(),
            self.msrp.map(|m| m.to_string()).unwrap_or_default(),
            self.condition.clone(),
            self.image_url.clone().unwrap_or_default(),
            self.lot_code.clone(),
            self.end_datetime
                .map(|dt| dt.to_rfc3339_opts(SecondsFormat::AutoSi, true))
                .unwrap_or_default(),
            self.bids_count.map(|n| n.to_string()).unwrap_or_default(),
            self.auction_id.clone().unwrap_or_default(),
            self.search_term.clone(),
            self.hours_remaining()
                .map(|h| h.to_string())
                .unwrap_or_default(),
        ]
    }
}

/// All the items of one scrape run, in the order they were collected.
/// Items can only be appended.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultSet {
    items: Vec<Item>,
}

impl ResultSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, item: Item) {
        self.items.push(item);
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Item> {
        self.items.iter()
    }
}

impl Extend<Item> for ResultSet {
    fn extend<T: IntoIterator<Item = Item>>(&mut self, iter: T) {
        self.items.extend(iter);
    }
}

impl<'a> IntoIterator for &'a ResultSet {
    type Item = &'a Item;
    type IntoIter = std::slice::Iter<'a, Item>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

impl IntoIterator for ResultSet {
    type Item = Item;
    type IntoIter = std::vec::IntoIter<Item>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}
