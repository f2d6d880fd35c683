// Conversion of raw ReFH2 output into a TUFLOW time-series CSV.

use std::path::{Path, PathBuf};

use log::{debug, info};

use crate::config::OutputColumn;
use crate::error::Refh2Error;
use crate::io::atomic::write_atomic;
use crate::io::csv::open_raw_reader;
use crate::io::results::ConvertedTable;
use crate::time::parse_elapsed_hours;

// Columns per return period in the raw output.
pub const BLOCK_WIDTH: usize = 8;
pub const OUTPUT_SUFFIX: &str = "_TUFLOW.csv";
pub const ARI_WILDCARD: &str = "~ARI~";
pub const HEADER_ERROR: &str = "!! ERROR occured getting header name !!";

// Wildcard column labels found in the raw header, by boundary-condition type.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceColumns {
    pub rainfall: Option<String>,
    pub inflow: Option<String>,
}

impl SourceColumns {
    fn record(&mut self, label: String) {
        if label.to_lowercase().contains("rain") {
            self.rainfall = Some(label);
        } else {
            self.inflow = Some(label);
        }
    }
}

// Result of a successful conversion, consumed by the downstream writers.
#[derive(Debug, Clone, PartialEq)]
pub struct Conversion {
    pub path: PathBuf,
    pub timestep: f64,
    pub table: ConvertedTable,
    pub source_columns: SourceColumns,
}

impl Conversion {
    // File name referenced from the bc database.
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

// `<stem>_TUFLOW.csv` next to the raw file.
pub fn converted_path(raw_file: &Path) -> PathBuf {
    let stem = raw_file
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    raw_file.with_file_name(format!("{stem}{OUTPUT_SUFFIX}"))
}

// Split `header` around every `<digits> year` occurrence.
fn split_on_year(header: &str) -> Vec<&str> {
    let bytes = header.as_bytes();
    let mut pieces = Vec::new();
    let mut piece_start = 0;
    let mut i = 0;
    while i < bytes.len() {
        if !bytes[i].is_ascii_digit() {
            i += 1;
            continue;
        }
        let run_start = i;
        while i < bytes.len() && bytes[i].is_ascii_digit() {
            i += 1;
        }
        if header[i..].starts_with(" year") {
            pieces.push(&header[piece_start..run_start]);
            i += " year".len();
            piece_start = i;
        }
    }
    pieces.push(&header[piece_start..]);
    pieces
}

/// Replace the return-period part of a header cell with `~ARI~`.
///
/// `"100 year Total flow (m3/s)"` becomes `"~ARI~ Total flow (m3/s)"`. Cells
/// with no, or more than one, `<n> year` token yield [`HEADER_ERROR`].
pub fn wildcard_label(header: &str) -> String {
    match split_on_year(header.trim()).as_slice() {
        [before, after] => format!("{before}{ARI_WILDCARD}{after}"),
        _ => HEADER_ERROR.to_string(),
    }
}

/// Timestep in hours between the first two samples of a raw file.
pub fn derive_timestep(raw_file: &Path) -> Result<f64, Refh2Error> {
    let mut rdr = open_raw_reader(raw_file)?;
    let mut times = Vec::with_capacity(2);
    for result in rdr.records().skip(1) {
        let record = result.map_err(|e| Refh2Error::csv(raw_file, e))?;
        times.push(parse_elapsed_hours(record.get(0).unwrap_or(""))?);
        if times.len() == 2 {
            break;
        }
    }

    let &[first, second] = times.as_slice() else {
        return Err(Refh2Error::Timestep {
            path: raw_file.to_path_buf(),
            reason: "fewer than two data rows".into(),
        });
    };
    let timestep = second - first;
    if timestep.is_nan() || timestep <= 0.0 {
        return Err(Refh2Error::Timestep {
            path: raw_file.to_path_buf(),
            reason: format!("non-increasing times {first} and {second}"),
        });
    }
    Ok(timestep)
}

/// Convert `raw_file` and write `<stem>_TUFLOW.csv` alongside it.
///
/// `return_periods` must be in the order given to ReFH2, which fixes the
/// order of the blocks in each row.
pub fn convert(
    raw_file: &Path,
    return_periods: &[u32],
    output_data: &[OutputColumn],
) -> Result<Conversion, Refh2Error> {
    let timestep = derive_timestep(raw_file)?;
    info!("Timestep from {}: {timestep} hr", raw_file.display());

    let cells: Vec<usize> = (0..return_periods.len())
        .flat_map(|k| output_data.iter().map(move |c| c.index() + BLOCK_WIDTH * k))
        .collect();
    let needed = cells.iter().max().map_or(1, |m| m + 1);

    let mut rdr = open_raw_reader(raw_file)?;
    let mut records = rdr.records().enumerate();

    let header = match records.next() {
        Some((_, result)) => result.map_err(|e| Refh2Error::csv(raw_file, e))?,
        None => {
            return Err(Refh2Error::Timestep {
                path: raw_file.to_path_buf(),
                reason: "file is empty".into(),
            });
        }
    };
    if header.len() < needed {
        return Err(Refh2Error::RowTooShort {
            path: raw_file.to_path_buf(),
            line: 1,
            needed,
            found: header.len(),
        });
    }

    let mut source_columns = SourceColumns::default();
    for column in output_data {
        let label = wildcard_label(&header[column.index()]);
        debug!("Column {:?} -> '{label}'", column);
        source_columns.record(label);
    }

    let mut table = ConvertedTable::new(cells.iter().map(|&c| header[c].to_string()).collect());
    table.push_zero_row(0.0);

    for (i, result) in records {
        let record = result.map_err(|e| Refh2Error::csv(raw_file, e))?;
        if record.len() < needed {
            return Err(Refh2Error::RowTooShort {
                path: raw_file.to_path_buf(),
                line: i + 1,
                needed,
                found: record.len(),
            });
        }
        let time = parse_elapsed_hours(&record[0])? + timestep;
        table.push_row(time, cells.iter().map(|&c| record[c].to_string()).collect());
    }

    let end = table.last_time().unwrap_or(0.0) + timestep;
    table.push_zero_row(end);

    let path = converted_path(raw_file);
    let comments = [
        format!(
            "{} Processed into TUFLOW Format by refh2_rs",
            raw_file.display()
        ),
        "Zero values have been inserted at the start and end of event".to_string(),
    ];
    let bytes = table
        .to_csv_bytes(&comments)
        .map_err(|e| Refh2Error::csv(&path, e))?;
    write_atomic(&path, &bytes)?;
    info!(
        "Wrote {} ({} rows x {} columns)",
        path.display(),
        table.rows.len(),
        table.columns.len() + 1
    );

    Ok(Conversion {
        path,
        timestep,
        table,
        source_columns,
    })
}
