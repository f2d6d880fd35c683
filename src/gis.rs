// TUFLOW GIS layers stamped with boundary-condition attributes.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use log::{debug, info};
use serde::Deserialize;
use shapefile::dbase::{FieldName, FieldValue, Record, TableWriterBuilder};
use shapefile::{Point, Polygon, PolygonRing, Polyline};

use crate::config::RunConfig;
use crate::error::Refh2Error;
use crate::io::atomic;

// Feature geometry in the CRS of the host project.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", content = "coordinates")]
pub enum Geometry {
    Point([f64; 2]),
    LineString(Vec<[f64; 2]>),
    // Outer ring first, then holes.
    Polygon(Vec<Vec<[f64; 2]>>),
}

impl Geometry {
    pub fn check(&self) -> Result<(), String> {
        let finite = |c: &[f64; 2]| c[0].is_finite() && c[1].is_finite();
        match self {
            Geometry::Point(c) if finite(c) => Ok(()),
            Geometry::Point(_) => Err("point has non-finite coordinates".into()),
            Geometry::LineString(pts) if pts.len() < 2 => {
                Err("line needs at least two vertices".into())
            }
            Geometry::LineString(pts) if pts.iter().all(finite) => Ok(()),
            Geometry::LineString(_) => Err("line has non-finite coordinates".into()),
            Geometry::Polygon(rings) => {
                if rings.is_empty() {
                    return Err("polygon has no rings".into());
                }
                for ring in rings {
                    if open_ring(ring).len() < 3 {
                        return Err("polygon ring needs at least three vertices".into());
                    }
                    if !ring.iter().all(finite) {
                        return Err("polygon has non-finite coordinates".into());
                    }
                }
                Ok(())
            }
        }
    }

    // Planar area in km², assuming coordinates in metres. `None` unless a polygon.
    pub fn area_km2(&self) -> Option<f64> {
        let Geometry::Polygon(rings) = self else {
            return None;
        };
        let mut rings = rings.iter();
        let outer = ring_area(rings.next()?);
        let holes: f64 = rings.map(|r| ring_area(r)).sum();
        Some((outer - holes).max(0.0) / 1.0e6)
    }

    fn suffix(&self) -> &'static str {
        match self {
            Geometry::Point(_) => "P",
            Geometry::LineString(_) => "L",
            Geometry::Polygon(_) => "R",
        }
    }
}

// Ring without its closing vertex
fn open_ring(ring: &[[f64; 2]]) -> &[[f64; 2]] {
    match (ring.first(), ring.last()) {
        (Some(first), Some(last)) if ring.len() > 1 && first == last => &ring[..ring.len() - 1],
        _ => ring,
    }
}

fn ring_area(ring: &[[f64; 2]]) -> f64 {
    let pts = open_ring(ring);
    let n = pts.len();
    let twice: f64 = (0..n)
        .map(|i| {
            let a = pts[i];
            let b = pts[(i + 1) % n];
            a[0] * b[1] - b[0] * a[1]
        })
        .sum();
    (twice / 2.0).abs()
}

// Layer kinds that can be generated from the host feature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
pub enum GisOutput {
    // 2d_rf rainfall region.
    #[serde(rename = "rf")]
    Rf,
    // 2d_sa inflow region.
    #[serde(rename = "sa")]
    Sa,
    // 2d_sa_rf rainfall-on-catchment region.
    #[serde(rename = "sa_rf")]
    SaRf,
    // 2d_bc inflow line.
    #[serde(rename = "bc_2d")]
    Bc2d,
    // 1d_bc inflow point or region.
    #[serde(rename = "bc_1d")]
    Bc1d,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Character,
    Numeric { precision: u8 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldDef {
    pub name: &'static str,
    pub kind: FieldKind,
    pub width: u8,
}

impl FieldDef {
    const fn text(name: &'static str, width: u8) -> Self {
        FieldDef {
            name,
            kind: FieldKind::Character,
            width,
        }
    }

    const fn number(name: &'static str) -> Self {
        FieldDef {
            name,
            kind: FieldKind::Numeric { precision: 5 },
            width: 15,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum AttrValue {
    Text(String),
    Number(f64),
    Null,
}

// Schema, attribute values and file name of one layer.
#[derive(Debug, Clone, PartialEq)]
pub struct LayerRecord {
    pub kind: GisOutput,
    pub file_name: String,
    pub fields: Vec<(FieldDef, AttrValue)>,
}

impl LayerRecord {
    pub fn new(kind: GisOutput, config: &RunConfig, geometry: &Geometry) -> Self {
        use AttrValue::{Null, Number, Text};

        let name = config.base_name();
        let (file_name, fields) = match kind {
            GisOutput::Rf => (
                format!("2d_rf_{name}_R.shp"),
                vec![
                    (FieldDef::text("Name", 100), Text(config.rainfall_name.clone())),
                    (FieldDef::number("f1"), Number(1.0)),
                    (FieldDef::number("f2"), Number(1.0)),
                ],
            ),
            GisOutput::SaRf => (
                format!("2d_sa_rf_{name}_R.shp"),
                vec![
                    (FieldDef::text("Name", 100), Text(config.rainfall_name.clone())),
                    (FieldDef::number("Catchment_"), Number(config.area)),
                    (FieldDef::number("Rain_Gauge"), Null),
                    (FieldDef::number("IL"), Null),
                    (FieldDef::number("CL"), Null),
                ],
            ),
            GisOutput::Sa => (
                format!("2d_sa_{name}_R.shp"),
                vec![(FieldDef::text("Name", 100), Text(config.inflow_name.clone()))],
            ),
            GisOutput::Bc2d => (
                format!("2d_bc_{name}_L.shp"),
                vec![
                    (FieldDef::text("Type", 2), Text("QT".into())),
                    (FieldDef::text("Flags", 3), Null),
                    (FieldDef::text("Name", 100), Text(config.inflow_name.clone())),
                    (FieldDef::number("f"), Null),
                    (FieldDef::number("d"), Null),
                    (FieldDef::number("td"), Null),
                    (FieldDef::number("a"), Null),
                    (FieldDef::number("b"), Null),
                ],
            ),
            GisOutput::Bc1d => (
                format!("1d_bc_{name}_{}.shp", geometry.suffix()),
                vec![
                    (FieldDef::text("Type", 2), Text("QT".into())),
                    (FieldDef::text("Flags", 6), Null),
                    (FieldDef::text("Name", 50), Text(config.inflow_name.clone())),
                    (FieldDef::text("Descriptio", 250), Null),
                ],
            ),
        };

        LayerRecord {
            kind,
            file_name,
            fields,
        }
    }
}

const SIDECARS: [&str; 3] = ["shp", "shx", "dbf"];
const LAYER_FILES: [&str; 4] = ["shp", "shx", "dbf", "prj"];

// Write one layer (plus `.prj` when a CRS is known) into `output_dir`.
// Every file is built under a `~` name first. Destinations are checked before
// any of them is touched, and a failed move restores the previous layer.
pub fn write_layer(
    output_dir: &Path,
    record: &LayerRecord,
    geometry: &Geometry,
    crs: Option<&str>,
) -> Result<PathBuf, Refh2Error> {
    let path = output_dir.join(&record.file_name);
    let staging = output_dir.join(format!("~{}", record.file_name));
    debug!("Writing {:?} layer via {}", record.kind, staging.display());

    let staged = write_shapefile(&staging, record, geometry)
        .map_err(|message| Refh2Error::Gis {
            path: path.clone(),
            message,
        })
        .and_then(|()| match crs {
            Some(wkt) => fs::write(staging.with_extension("prj"), wkt)
                .map_err(|e| Refh2Error::io(&path.with_extension("prj"), e)),
            None => Ok(()),
        });
    if let Err(e) = staged {
        remove_staged(&staging);
        return Err(e);
    }

    // a stale .prj is removed when no CRS is given, so it must be writable too
    for ext in LAYER_FILES {
        let to = path.with_extension(ext);
        if let Err(e) = atomic::ensure_replaceable(&to) {
            remove_staged(&staging);
            return Err(Refh2Error::io(&to, e));
        }
    }

    let exts: &[&str] = if crs.is_some() {
        &LAYER_FILES
    } else {
        &SIDECARS
    };
    if let Err((to, e)) = commit(&staging, &path, exts) {
        remove_staged(&staging);
        return Err(Refh2Error::io(&to, e));
    }

    if crs.is_none() {
        let prj = path.with_extension("prj");
        match fs::remove_file(&prj) {
            Err(e) if e.kind() != io::ErrorKind::NotFound => return Err(Refh2Error::io(&prj, e)),
            _ => {}
        }
    }

    info!("Wrote {}", path.display());
    Ok(path)
}

fn backup_path(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    path.with_file_name(format!("~{name}.bak"))
}

// Move each staged file over its destination. On failure every destination
// already handled is put back the way it was.
fn commit(staging: &Path, path: &Path, exts: &[&str]) -> Result<(), (PathBuf, io::Error)> {
    let mut moved: Vec<(PathBuf, Option<PathBuf>)> = Vec::with_capacity(exts.len());
    for ext in exts {
        let to = path.with_extension(ext);
        let backup = if to.exists() {
            let backup = backup_path(&to);
            if let Err(e) = fs::rename(&to, &backup) {
                rollback(&moved);
                return Err((to, e));
            }
            Some(backup)
        } else {
            None
        };
        moved.push((to.clone(), backup));
        if let Err(e) = fs::rename(staging.with_extension(ext), &to) {
            rollback(&moved);
            return Err((to, e));
        }
    }
    for (_, backup) in moved {
        if let Some(backup) = backup {
            let _ = fs::remove_file(backup);
        }
    }
    Ok(())
}

fn rollback(moved: &[(PathBuf, Option<PathBuf>)]) {
    for (to, backup) in moved.iter().rev() {
        match backup {
            Some(backup) => {
                let _ = fs::rename(backup, to);
            }
            None => {
                let _ = fs::remove_file(to);
            }
        }
    }
}

fn remove_staged(staging: &Path) {
    for ext in LAYER_FILES {
        let _ = fs::remove_file(staging.with_extension(ext));
    }
}

fn write_shapefile(path: &Path, record: &LayerRecord, geometry: &Geometry) -> Result<(), String> {
    let mut table = TableWriterBuilder::new();
    let mut row = Record::default();
    for (field, value) in &record.fields {
        let name = FieldName::try_from(field.name)
            .map_err(|e| format!("invalid field name {}: {e:?}", field.name))?;
        table = match field.kind {
            FieldKind::Character => table.add_character_field(name, field.width),
            FieldKind::Numeric { precision } => {
                table.add_numeric_field(name, field.width, precision)
            }
        };
        let value = match (field.kind, value) {
            (FieldKind::Character, AttrValue::Text(s)) => FieldValue::Character(Some(s.clone())),
            (FieldKind::Character, AttrValue::Number(n)) => {
                FieldValue::Character(Some(n.to_string()))
            }
            (FieldKind::Character, AttrValue::Null) => FieldValue::Character(None),
            (FieldKind::Numeric { .. }, AttrValue::Number(n)) => FieldValue::Numeric(Some(*n)),
            (FieldKind::Numeric { .. }, _) => FieldValue::Numeric(None),
        };
        row.insert(field.name.to_string(), value);
    }

    let mut writer = shapefile::Writer::from_path(path, table).map_err(|e| e.to_string())?;
    let written = match geometry {
        Geometry::Point([x, y]) => writer.write_shape_and_record(&Point::new(*x, *y), &row),
        Geometry::LineString(pts) => {
            writer.write_shape_and_record(&Polyline::new(to_points(pts)), &row)
        }
        Geometry::Polygon(rings) => {
            let rings = rings
                .iter()
                .enumerate()
                .map(|(i, ring)| {
                    let mut pts = to_points(ring);
                    if pts.first() != pts.last() {
                        pts.push(pts[0]);
                    }
                    if i == 0 {
                        PolygonRing::Outer(pts)
                    } else {
                        PolygonRing::Inner(pts)
                    }
                })
                .collect();
            writer.write_shape_and_record(&Polygon::with_rings(rings), &row)
        }
    };
    written.map_err(|e| e.to_string())?;
    drop(writer);
    Ok(())
}

fn to_points(coords: &[[f64; 2]]) -> Vec<Point> {
    coords.iter().map(|[x, y]| Point::new(*x, *y)).collect()
}
