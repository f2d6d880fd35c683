#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use refh2_rs::{RawConfig, RunConfig};

const BLOCK: [&str; 8] = [
    "Gross rain (mm)",
    "Urban rain (mm)",
    "Rural rain (mm)",
    "Losses (mm)",
    "Net rain (mm)",
    "Direct runoff (m3/s)",
    "Baseflow (m3/s)",
    "Total flow (m3/s)",
];

/// Raw ReFH2 output with one 8-column block per return period.
///
/// Cell value at (row, rp, col) is `rp * 1000 + row * 10 + col` so every
/// cell can be traced back to its origin.
pub fn raw_output(return_periods: &[u32], times: &[&str]) -> String {
    let mut lines = Vec::new();
    let mut header = vec!["Time".to_string()];
    for rp in return_periods {
        header.extend(BLOCK.iter().map(|h| format!("{rp} year {h}")));
    }
    lines.push(header.join(","));

    for (row, time) in times.iter().enumerate() {
        let mut cells = vec![time.to_string()];
        for rp in return_periods {
            for col in 1..=8u32 {
                cells.push(format!("{}", rp * 1000 + (row as u32) * 10 + col));
            }
        }
        lines.push(cells.join(","));
    }
    lines.join("\n") + "\n"
}

pub fn write_raw(dir: &Path, name: &str, contents: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, contents).expect("write raw output");
    path
}

/// Validated config with the output file at `output_file`.
pub fn config(output_file: &Path, extra: &str) -> RunConfig {
    RawConfig::from_toml_str(&format!(
        r#"
descriptor = 'catchment.xml'
output_file = '{}'
checksum = "0123abcd"
return_periods = [20, 2, 100]
area = 10.0
output_rainfall = true
output_hydrograph = true
rainfall_name = "Catchment_rain"
inflow_name = "Catchment_Q"
output_data = ["net_rainfall", "total_runoff"]
{extra}"#,
        output_file.display()
    ))
    .expect("parse config")
    .validate()
    .expect("valid config")
}

pub fn data_lines(text: &str) -> Vec<&str> {
    text.lines().filter(|l| !l.starts_with('!')).collect()
}
