pub mod bc_dbase;
pub mod config;
pub mod convert;
pub mod error;
pub mod event_file;
pub mod gis;
pub mod invoker;
pub mod io;
pub mod pipeline;
pub mod progress;
pub mod time;

pub use config::{RawConfig, RunConfig};
pub use error::Refh2Error;
pub use pipeline::{Pipeline, RunReport};
pub use progress::{Progress, ProgressListener};
