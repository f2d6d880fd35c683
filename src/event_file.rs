// TUFLOW event file (`event_file.tef`), one event per return period.

use std::path::{Path, PathBuf};

use log::info;

use crate::config::ZeroPadding;
use crate::convert::ARI_WILDCARD;
use crate::error::Refh2Error;
use crate::io::atomic::write_atomic;

pub const EVENT_FILE: &str = "event_file.tef";
const DIVIDER: &str = "!-------------------------------------";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventEntry {
    /// Zero-padded label used in the event name, e.g. `020`.
    pub label: String,
    pub return_period: u32,
}

pub fn pad_width(return_periods: &[u32], padding: ZeroPadding) -> usize {
    match padding {
        ZeroPadding::Auto => return_periods
            .iter()
            .max()
            .map_or(0, |max| max.to_string().len()),
        ZeroPadding::Off => 0,
        ZeroPadding::Fixed(width) => width,
    }
}

/// Events in ascending return-period order.
pub fn event_entries(return_periods: &[u32], padding: ZeroPadding) -> Vec<EventEntry> {
    let width = pad_width(return_periods, padding);
    let mut sorted = return_periods.to_vec();
    sorted.sort_unstable();
    sorted.dedup();
    sorted
        .into_iter()
        .map(|rp| EventEntry {
            label: format!("{rp:0width$}"),
            return_period: rp,
        })
        .collect()
}

pub fn render(entries: &[EventEntry]) -> String {
    let mut out = String::new();
    out.push_str("! TEF Written by refh2_rs\n\n");
    out.push_str("!! RAINFALL EVENTS !!\n");
    for entry in entries {
        out.push_str(&format!("Define Event == {}yr\n", entry.label));
        out.push_str(&format!(
            "    BC Event Source == {ARI_WILDCARD} | {} year\n",
            entry.return_period
        ));
        out.push_str("End Define\n");
        out.push_str(DIVIDER);
        out.push('\n');
    }
    out
}

pub fn write_event_file(
    output_dir: &Path,
    return_periods: &[u32],
    padding: ZeroPadding,
) -> Result<PathBuf, Refh2Error> {
    let path = output_dir.join(EVENT_FILE);
    let entries = event_entries(return_periods, padding);
    write_atomic(&path, render(&entries).as_bytes())?;
    info!("Wrote {} ({} events)", path.display(), entries.len());
    Ok(path)
}
