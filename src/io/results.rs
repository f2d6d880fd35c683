use crate::io::csv::create_csv_writer;

pub const TIME_HEADER: &str = "Time (hr)";

// One output row: time in hours followed by the selected cells
#[derive(Debug, Clone, PartialEq)]
pub struct TableRow {
    pub time: f64,
    pub values: Vec<String>,
}

// TUFLOW time-series table built by the converter
#[derive(Debug, Clone, PartialEq)]
pub struct ConvertedTable {
    pub columns: Vec<String>,
    pub rows: Vec<TableRow>,
}

impl ConvertedTable {
    pub fn new(columns: Vec<String>) -> Self {
        ConvertedTable {
            columns,
            rows: Vec::new(),
        }
    }

    pub fn push_zero_row(&mut self, time: f64) {
        let values = vec!["0".to_string(); self.columns.len()];
        self.rows.push(TableRow { time, values });
    }

    pub fn push_row(&mut self, time: f64, values: Vec<String>) {
        debug_assert_eq!(values.len(), self.columns.len());
        self.rows.push(TableRow { time, values });
    }

    pub fn last_time(&self) -> Option<f64> {
        self.rows.last().map(|r| r.time)
    }

    /// Render as CSV, prefixed by `!` comment lines.
    pub fn to_csv_bytes(&self, comments: &[String]) -> Result<Vec<u8>, csv::Error> {
        let mut buf = Vec::new();
        for comment in comments {
            buf.extend_from_slice(format!("! {comment}\n").as_bytes());
        }

        let mut wtr = create_csv_writer(buf);
        wtr.write_record(std::iter::once(TIME_HEADER).chain(self.columns.iter().map(String::as_str)))?;
        for row in &self.rows {
            wtr.write_record(
                std::iter::once(format!("{:.2}", row.time)).chain(row.values.iter().cloned()),
            )?;
        }
        wtr.into_inner()
            .map_err(|e| csv::Error::from(e.into_error()))
    }
}
