use std::path::{Path, PathBuf};

use log::info;

use crate::config::RunConfig;
use crate::convert::Conversion;
use crate::error::Refh2Error;
use crate::io::atomic::write_atomic;
use crate::io::csv::create_csv_writer;
use crate::io::results::TIME_HEADER;

pub const BC_DBASE_FILE: &str = "bc_dbase.csv";
const HEADER: [&str; 4] = ["Name", "Source", "Column 1", "Column 2"];

// One bc_dbase row
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BcEntry {
    pub name: String,
    pub source: String,
    pub value_column: String,
}

/// Rainfall then inflow entry, each only if its output was requested.
pub fn entries(config: &RunConfig, conversion: &Conversion) -> Result<Vec<BcEntry>, Refh2Error> {
    let mut entries = Vec::with_capacity(2);
    let source = conversion.file_name();
    let columns = &conversion.source_columns;

    if config.output_rainfall {
        let value_column = columns
            .rainfall
            .clone()
            .ok_or(Refh2Error::MissingSourceColumn { kind: "rainfall" })?;
        entries.push(BcEntry {
            name: config.rainfall_name.clone(),
            source: source.clone(),
            value_column,
        });
    }
    if config.output_hydrograph {
        let value_column = columns
            .inflow
            .clone()
            .ok_or(Refh2Error::MissingSourceColumn { kind: "inflow" })?;
        entries.push(BcEntry {
            name: config.inflow_name.clone(),
            source,
            value_column,
        });
    }
    Ok(entries)
}

fn render(entries: &[BcEntry]) -> Result<Vec<u8>, csv::Error> {
    let mut wtr = create_csv_writer(Vec::new());
    wtr.write_record(HEADER)?;
    for entry in entries {
        wtr.write_record([
            entry.name.as_str(),
            entry.source.as_str(),
            TIME_HEADER,
            entry.value_column.as_str(),
        ])?;
    }
    wtr.into_inner()
        .map_err(|e| csv::Error::from(e.into_error()))
}

pub fn write_bc_dbase(output_dir: &Path, entries: &[BcEntry]) -> Result<PathBuf, Refh2Error> {
    let path = output_dir.join(BC_DBASE_FILE);
    let bytes = render(entries).map_err(|e| Refh2Error::csv(&path, e))?;
    write_atomic(&path, &bytes)?;
    info!("Wrote {} ({} entries)", path.display(), entries.len());
    Ok(path)
}
