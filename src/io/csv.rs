use std::fs::File;
use std::io::{BufReader, Write};
use std::path::Path;

use csv::{Reader, ReaderBuilder, Terminator, Writer, WriterBuilder};

use crate::error::Refh2Error;

// Reader for raw ReFH2 output; the header row is handled by the caller
pub fn open_raw_reader(path: &Path) -> Result<Reader<BufReader<File>>, Refh2Error> {
    let file = File::open(path).map_err(|e| Refh2Error::io(path, e))?;
    let buffered_reader = BufReader::new(file);

    Ok(ReaderBuilder::new()
        .has_headers(false)
        .delimiter(b',')
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(buffered_reader))
}

// Writer producing LF-terminated records for TUFLOW
pub fn create_csv_writer<W: Write>(inner: W) -> Writer<W> {
    WriterBuilder::new()
        .has_headers(false)
        .terminator(Terminator::Any(b'\n'))
        .from_writer(inner)
}
