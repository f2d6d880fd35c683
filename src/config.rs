use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::Refh2Error;
use crate::gis::{Geometry, GisOutput};

// Configuration as written in the TOML file, before validation
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawConfig {
    #[serde(default)]
    pub exe: Option<PathBuf>,
    pub descriptor: PathBuf,
    pub output_file: PathBuf,
    pub checksum: String,
    pub return_periods: Vec<i64>,
    #[serde(default)]
    pub location: Location,
    #[serde(default)]
    pub model: CatchmentModel,
    #[serde(default)]
    pub season: Season,
    #[serde(default = "default_rain_model")]
    pub rain_model: String,
    #[serde(default)]
    pub area: Option<f64>,
    #[serde(default)]
    pub area_source: AreaSource,
    #[serde(default)]
    pub duration: Option<String>,
    #[serde(default)]
    pub timestep: Option<String>,
    #[serde(default)]
    pub output_rainfall: bool,
    #[serde(default = "default_true")]
    pub output_hydrograph: bool,
    #[serde(default = "default_rainfall_name")]
    pub rainfall_name: String,
    #[serde(default = "default_inflow_name")]
    pub inflow_name: String,
    #[serde(default)]
    pub zero_padding: PaddingMode,
    #[serde(default)]
    pub pad_width: Option<usize>,
    pub output_data: Vec<OutputColumn>,
    #[serde(default)]
    pub gis: Option<GisInput>,
    #[serde(default)]
    pub gis_outputs: Vec<GisOutput>,
}

fn default_rain_model() -> String {
    "2013".to_string()
}
fn default_true() -> bool {
    true
}
fn default_rainfall_name() -> String {
    "Rainfall".to_string()
}
fn default_inflow_name() -> String {
    "Inflow".to_string()
}

// Country / region code passed to ReFH2
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
pub enum Location {
    #[default]
    #[serde(rename = "ENGWANI")]
    EnglandWales,
    #[serde(rename = "SCOTLAND")]
    Scotland,
}

impl Location {
    pub fn as_arg(&self) -> &'static str {
        match self {
            Location::EnglandWales => "ENGWANI",
            Location::Scotland => "SCOTLAND",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
pub enum CatchmentModel {
    #[serde(rename = "URBANISED")]
    Urbanised,
    #[default]
    #[serde(rename = "RURAL")]
    Rural,
}

impl CatchmentModel {
    pub fn as_arg(&self) -> &'static str {
        match self {
            CatchmentModel::Urbanised => "URBANISED",
            CatchmentModel::Rural => "RURAL",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
pub enum Season {
    #[default]
    #[serde(rename = "WINTER")]
    Winter,
    #[serde(rename = "SUMMER")]
    Summer,
}

impl Season {
    pub fn as_arg(&self) -> &'static str {
        match self {
            Season::Winter => "WINTER",
            Season::Summer => "SUMMER",
        }
    }
}

// Where the catchment area comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AreaSource {
    #[default]
    User,
    Geometry,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaddingMode {
    #[default]
    Auto,
    None,
    Fixed,
}

/// Resolved zero-padding rule for return-period labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ZeroPadding {
    /// Pad to the digit count of the largest return period.
    Auto,
    Off,
    Fixed(usize),
}

/// A column within each 8-column return-period block of the ReFH2 output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputColumn {
    GrossRainfall,
    UrbanRainfall,
    RuralRainfall,
    NetRainfall,
    DirectRunoff,
    Baseflow,
    TotalRunoff,
}

impl OutputColumn {
    /// Offset of the column inside its block; offset 0 of the first block is the time column.
    pub fn index(&self) -> usize {
        match self {
            OutputColumn::GrossRainfall => 1,
            OutputColumn::UrbanRainfall => 2,
            OutputColumn::RuralRainfall => 3,
            OutputColumn::NetRainfall => 5,
            OutputColumn::DirectRunoff => 6,
            OutputColumn::Baseflow => 7,
            OutputColumn::TotalRunoff => 8,
        }
    }

    pub fn is_rainfall(&self) -> bool {
        matches!(
            self,
            OutputColumn::GrossRainfall
                | OutputColumn::UrbanRainfall
                | OutputColumn::RuralRainfall
                | OutputColumn::NetRainfall
        )
    }
}

// Feature supplied by the host for stamping onto generated layers
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GisInput {
    pub geometry: Geometry,
    /// Coordinate reference system as WKT, written to the `.prj` sidecar.
    #[serde(default)]
    pub crs: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StormWindow {
    pub duration: String,
    pub timestep: String,
}

/// Validated, read-only run configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct RunConfig {
    pub exe: Option<PathBuf>,
    pub descriptor: PathBuf,
    pub output_file: PathBuf,
    pub checksum: String,
    pub return_periods: Vec<u32>,
    pub location: Location,
    pub model: CatchmentModel,
    pub season: Season,
    pub rain_model: String,
    pub area: f64,
    pub storm: Option<StormWindow>,
    pub output_rainfall: bool,
    pub output_hydrograph: bool,
    pub rainfall_name: String,
    pub inflow_name: String,
    pub padding: ZeroPadding,
    pub output_data: Vec<OutputColumn>,
    pub gis: Option<GisInput>,
    pub gis_outputs: Vec<GisOutput>,
}

impl RawConfig {
    pub fn from_toml_str(text: &str) -> Result<Self, Refh2Error> {
        toml::from_str(text).map_err(|e| Refh2Error::Config(e.to_string()))
    }

    pub fn from_path(path: &Path) -> Result<Self, Refh2Error> {
        let text = std::fs::read_to_string(path).map_err(|e| Refh2Error::io(path, e))?;
        Self::from_toml_str(&text)
    }

    /// Check every field once so later stages can rely on them.
    pub fn validate(self) -> Result<RunConfig, Refh2Error> {
        let invalid = |msg: String| Err(Refh2Error::Config(msg));

        if self.output_file.as_os_str().is_empty() {
            return invalid("output_file must not be empty".into());
        }
        if self.output_file.file_stem().is_none() {
            return invalid(format!(
                "output_file {} has no file name",
                self.output_file.display()
            ));
        }
        if self.checksum.trim().is_empty() {
            return invalid("checksum must not be empty".into());
        }
        if self.rain_model.trim().is_empty() {
            return invalid("rain_model must not be empty".into());
        }

        let mut return_periods: Vec<u32> = Vec::with_capacity(self.return_periods.len());
        for &rp in &self.return_periods {
            let rp = match u32::try_from(rp) {
                Ok(v) if v > 0 => v,
                _ => return invalid(format!("return period {rp} must be a positive integer")),
            };
            if !return_periods.contains(&rp) {
                return_periods.push(rp);
            }
        }
        if return_periods.is_empty() {
            return invalid("at least one return period is required".into());
        }

        let storm = match (self.duration, self.timestep) {
            (Some(duration), Some(timestep)) => Some(StormWindow { duration, timestep }),
            (None, None) => None,
            _ => return invalid("duration and timestep must be given together".into()),
        };

        let padding = match (self.zero_padding, self.pad_width) {
            (PaddingMode::Auto, _) => ZeroPadding::Auto,
            (PaddingMode::None, _) => ZeroPadding::Off,
            (PaddingMode::Fixed, Some(width)) => ZeroPadding::Fixed(width),
            (PaddingMode::Fixed, None) => {
                return invalid("pad_width is required when zero_padding = \"fixed\"".into());
            }
        };

        if self.output_data.is_empty() {
            return invalid("output_data must name at least one column".into());
        }
        let mut output_data = Vec::with_capacity(self.output_data.len());
        for column in self.output_data {
            if !output_data.contains(&column) {
                output_data.push(column);
            }
        }
        if self.output_rainfall && !output_data.iter().any(OutputColumn::is_rainfall) {
            return invalid("output_rainfall requires a rainfall column in output_data".into());
        }
        if self.output_hydrograph && !output_data.iter().any(|c| !c.is_rainfall()) {
            return invalid("output_hydrograph requires a runoff column in output_data".into());
        }

        if let Some(gis) = &self.gis {
            gis.geometry
                .check()
                .map_err(|e| Refh2Error::Config(format!("gis geometry: {e}")))?;
        } else if !self.gis_outputs.is_empty() {
            return invalid("gis_outputs requires a [gis] feature".into());
        }

        let area = match self.area_source {
            AreaSource::User => match self.area {
                Some(a) if a.is_finite() && a > 0.0 => a,
                Some(a) => return invalid(format!("area {a} must be positive")),
                None => return invalid("area is required when area_source = \"user\"".into()),
            },
            AreaSource::Geometry => match self.gis.as_ref().and_then(|g| g.geometry.area_km2()) {
                Some(a) if a > 0.0 => a,
                _ => return invalid("area_source = \"geometry\" requires a polygon feature".into()),
            },
        };

        let mut gis_outputs = Vec::with_capacity(self.gis_outputs.len());
        for kind in self.gis_outputs {
            if !gis_outputs.contains(&kind) {
                gis_outputs.push(kind);
            }
        }

        Ok(RunConfig {
            exe: self.exe,
            descriptor: self.descriptor,
            output_file: self.output_file,
            checksum: self.checksum,
            return_periods,
            location: self.location,
            model: self.model,
            season: self.season,
            rain_model: self.rain_model,
            area,
            storm,
            output_rainfall: self.output_rainfall,
            output_hydrograph: self.output_hydrograph,
            rainfall_name: self.rainfall_name,
            inflow_name: self.inflow_name,
            padding,
            output_data,
            gis: self.gis,
            gis_outputs,
        })
    }
}

impl RunConfig {
    /// Directory holding the raw output and every generated file.
    pub fn output_dir(&self) -> PathBuf {
        match self.output_file.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        }
    }

    /// Output file name without extension, used to name derived files.
    pub fn base_name(&self) -> String {
        self.output_file
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    pub fn emits_anything(&self) -> bool {
        self.output_rainfall || self.output_hydrograph
    }
}
