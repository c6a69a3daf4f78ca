use std::fmt::Write as _;
use std::fs::File;
use std::path::Path;

use crate::item::{Item, ResultSet};
use crate::Result;

const TITLE_WIDTH: usize = 50;

/// Writes the header and one row per item. Values are only stringified, never reformatted.
pub fn write_csv(results: &ResultSet, path: &Path) -> Result<()> {
    // Open the file ourselves so an unwritable destination surfaces as an io error.
    let file = File::create(path)?;
    let mut wtr = csv::Writer::from_writer(file);

    wtr.write_record(Item::HEADER)?;
    for item in results {
        wtr.write_record(item.to_record())?;
    }
    wtr.flush()?;
    Ok(())
}

/// Reads a file written by [`write_csv`] back as rows of strings, header excluded.
pub fn read_csv(path: &Path) -> Result<Vec<Vec<String>>> {
    let mut rdr = csv::Reader::from_path(path)?;
    let mut rows = Vec::new();
    for record in rdr.records() {
        rows.push(record?.iter().map(String::from).collect());
    }
    Ok(rows)
}

/// A short table of the results for the terminal: title, bid, hours left and the search term.
pub fn summary_table(results: &ResultSet) -> String {
    if results.is_empty() {
        return "No items found".to_string();
    }

    let mut out = String::from("Found Items:\n");
    let _ = writeln!(
        out,
        "{:<TITLE_WIDTH$} | {:>12} | {:>15} | {}",
        "title", "current_bid", "hours_remaining", "search_term"
    );
    for item in results {
        let hours = item
            .hours_remaining()
            .map(|h| format!("{h:.2}"))
            .unwrap_or_else(|| item.time_remaining.to_string());
        let _ = writeln!(
            out,
            "{:<TITLE_WIDTH$} | {:>12} | {:>15} | {}",
            truncate(&item.title, TITLE_WIDTH),
            item.current_bid,
            hours,
            item.search_term
        );
    }
    out
}

fn truncate(text: &str, width: usize) -> String {
    if text.chars().count() <= width {
        return text.to_string();
    }
    let mut short: String = text.chars().take(width - 3).collect();
    short.push_str("...");
    short
}
