use std::path::PathBuf;

use log::{error, info};

use crate::bc_dbase::{self, write_bc_dbase};
use crate::config::RunConfig;
use crate::convert::convert;
use crate::error::Refh2Error;
use crate::event_file::write_event_file;
use crate::gis::{LayerRecord, write_layer};
use crate::invoker::{self, ExecutableResolver};
use crate::progress::{Progress, ProgressListener};

// Files produced by a successful run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunReport {
    pub time_series: Option<PathBuf>,
    pub bc_dbase: Option<PathBuf>,
    pub event_file: Option<PathBuf>,
    pub layers: Vec<PathBuf>,
}

impl RunReport {
    pub fn files(&self) -> Vec<PathBuf> {
        self.time_series
            .iter()
            .chain(self.bc_dbase.iter())
            .chain(self.event_file.iter())
            .chain(self.layers.iter())
            .cloned()
            .collect()
    }
}

pub struct Pipeline<'a> {
    config: &'a RunConfig,
    resolver: &'a dyn ExecutableResolver,
    listener: &'a dyn ProgressListener,
}

impl<'a> Pipeline<'a> {
    pub fn new(
        config: &'a RunConfig,
        resolver: &'a dyn ExecutableResolver,
        listener: &'a dyn ProgressListener,
    ) -> Self {
        Pipeline {
            config,
            resolver,
            listener,
        }
    }

    // Run ReFH2, then post-process its output.
    pub fn run(&self) -> Result<RunReport, Refh2Error> {
        let outcome = invoker::run(self.config, self.resolver, self.listener)
            .and_then(|()| self.process());
        self.finish(outcome)
    }

    // Post-process an existing ReFH2 output file without running ReFH2.
    pub fn post_process(&self) -> Result<RunReport, Refh2Error> {
        let outcome = self.process();
        self.finish(outcome)
    }

    fn finish(&self, outcome: Result<RunReport, Refh2Error>) -> Result<RunReport, Refh2Error> {
        let message = match &outcome {
            Ok(report) => {
                info!("Run complete, {} files written", report.files().len());
                String::new()
            }
            Err(e) => {
                error!("{e}");
                e.to_string()
            }
        };
        self.listener.notify(Progress::Finished(message));
        outcome
    }

    fn process(&self) -> Result<RunReport, Refh2Error> {
        self.listener.notify(Progress::PostProcessingStarted);

        let config = self.config;
        let mut report = RunReport::default();
        if !config.emits_anything() {
            info!("Neither rainfall nor hydrograph output requested, nothing to write");
            return Ok(report);
        }

        let output_dir = config.output_dir();
        let conversion = convert(
            &config.output_file,
            &config.return_periods,
            &config.output_data,
        )?;
        report.time_series = Some(conversion.path.clone());

        let entries = bc_dbase::entries(config, &conversion)?;
        report.bc_dbase = Some(write_bc_dbase(&output_dir, &entries)?);

        report.event_file = Some(write_event_file(
            &output_dir,
            &config.return_periods,
            config.padding,
        )?);

        if let Some(gis) = &config.gis {
            for &kind in &config.gis_outputs {
                let record = LayerRecord::new(kind, config, &gis.geometry);
                let path = write_layer(&output_dir, &record, &gis.geometry, gis.crs.as_deref())?;
                report.layers.push(path);
            }
        }

        Ok(report)
    }
}
