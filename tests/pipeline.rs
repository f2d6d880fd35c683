mod common;

use std::fs;
use std::path::{Path, PathBuf};

use common::{config, data_lines, raw_output, write_raw};
use refh2_rs::config::ZeroPadding;
use refh2_rs::gis::GisOutput;
use refh2_rs::progress::Recorder;
use refh2_rs::{Pipeline, Progress, Refh2Error};

const TIMES: [&str; 3] = ["00:00:00", "00:30:00", "01:00:00"];

fn no_exe() -> Option<PathBuf> {
    None
}

fn seed_raw(dir: &Path) -> PathBuf {
    write_raw(dir, "refh2.csv", &raw_output(&[20, 2, 100], &TIMES))
}

#[test]
fn post_process_writes_full_file_set() {
    let dir = tempfile::tempdir().expect("create temp dir");
    let raw = seed_raw(dir.path());
    let cfg = config(&raw, "");
    let recorder = Recorder::default();

    let report = Pipeline::new(&cfg, &no_exe, &recorder).post_process().unwrap();

    assert_eq!(
        report.files(),
        vec![
            dir.path().join("refh2_TUFLOW.csv"),
            dir.path().join("bc_dbase.csv"),
            dir.path().join("event_file.tef"),
        ]
    );
    assert_eq!(
        recorder.events(),
        vec![Progress::PostProcessingStarted, Progress::Finished(String::new())]
    );

    let bc = fs::read_to_string(dir.path().join("bc_dbase.csv")).unwrap();
    assert_eq!(
        bc,
        "Name,Source,Column 1,Column 2\n\
         Catchment_rain,refh2_TUFLOW.csv,Time (hr),~ARI~ Net rain (mm)\n\
         Catchment_Q,refh2_TUFLOW.csv,Time (hr),~ARI~ Total flow (m3/s)\n"
    );

    let tef = fs::read_to_string(dir.path().join("event_file.tef")).unwrap();
    let events: Vec<&str> = tef
        .lines()
        .filter(|l| l.starts_with("Define Event"))
        .collect();
    assert_eq!(
        events,
        vec![
            "Define Event == 002yr",
            "Define Event == 020yr",
            "Define Event == 100yr"
        ]
    );
    assert!(tef.contains("    BC Event Source == ~ARI~ | 2 year\n"));

    let ts = fs::read_to_string(dir.path().join("refh2_TUFLOW.csv")).unwrap();
    assert_eq!(data_lines(&ts).len(), 1 + TIMES.len() + 2);
}

#[test]
fn bc_dbase_rows_follow_emit_flags() {
    let dir = tempfile::tempdir().expect("create temp dir");
    let raw = seed_raw(dir.path());

    let mut cfg = config(&raw, "");
    cfg.output_rainfall = false;
    Pipeline::new(&cfg, &no_exe, &Recorder::default())
        .post_process()
        .unwrap();
    let bc = fs::read_to_string(dir.path().join("bc_dbase.csv")).unwrap();
    assert_eq!(bc.lines().count(), 2);
    assert!(bc.lines().nth(1).unwrap().starts_with("Catchment_Q,"));
}

#[test]
fn nothing_written_when_no_output_requested() {
    let dir = tempfile::tempdir().expect("create temp dir");
    let raw = seed_raw(dir.path());
    let mut cfg = config(&raw, "");
    cfg.output_rainfall = false;
    cfg.output_hydrograph = false;

    let report = Pipeline::new(&cfg, &no_exe, &Recorder::default())
        .post_process()
        .unwrap();
    assert!(report.files().is_empty());
    assert!(!dir.path().join("bc_dbase.csv").exists());
}

#[test]
fn fixed_padding_flows_into_event_file() {
    let dir = tempfile::tempdir().expect("create temp dir");
    let raw = seed_raw(dir.path());
    let mut cfg = config(&raw, "");
    cfg.padding = ZeroPadding::Fixed(5);

    Pipeline::new(&cfg, &no_exe, &Recorder::default())
        .post_process()
        .unwrap();
    let tef = fs::read_to_string(dir.path().join("event_file.tef")).unwrap();
    assert!(tef.contains("Define Event == 00002yr\n"));
    assert!(tef.contains("Define Event == 00100yr\n"));
}

#[test]
fn rerun_is_byte_identical() {
    let dir = tempfile::tempdir().expect("create temp dir");
    let raw = seed_raw(dir.path());
    let cfg = config(
        &raw,
        r#"gis_outputs = ["rf", "sa_rf", "bc_1d"]
[gis]
crs = 'PROJCS["OSGB 1936 / British National Grid"]'
[gis.geometry]
type = "Polygon"
coordinates = [[[0.0, 0.0], [100.0, 0.0], [100.0, 100.0], [0.0, 100.0], [0.0, 0.0]]]
"#,
    );

    let first = Pipeline::new(&cfg, &no_exe, &Recorder::default())
        .post_process()
        .unwrap();
    let snapshot: Vec<Vec<u8>> = first.files().iter().map(|p| fs::read(p).unwrap()).collect();
    let second = Pipeline::new(&cfg, &no_exe, &Recorder::default())
        .post_process()
        .unwrap();
    assert_eq!(first, second);
    for (path, before) in second.files().iter().zip(snapshot) {
        assert_eq!(fs::read(path).unwrap(), before, "{} changed", path.display());
    }
}

#[test]
fn gis_layers_named_by_kind() {
    let dir = tempfile::tempdir().expect("create temp dir");
    let raw = seed_raw(dir.path());
    let cfg = config(
        &raw,
        r#"gis_outputs = ["rf", "sa", "sa_rf", "bc_2d", "bc_1d"]
[gis]
crs = 'GEOGCS["WGS 84"]'
[gis.geometry]
type = "Point"
coordinates = [451000.0, 206000.0]
"#,
    );

    let report = Pipeline::new(&cfg, &no_exe, &Recorder::default())
        .post_process()
        .unwrap();
    let names: Vec<String> = report
        .layers
        .iter()
        .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
        .collect();
    assert_eq!(
        names,
        vec![
            "2d_rf_refh2_R.shp",
            "2d_sa_refh2_R.shp",
            "2d_sa_rf_refh2_R.shp",
            "2d_bc_refh2_L.shp",
            "1d_bc_refh2_P.shp",
        ]
    );
    for layer in &report.layers {
        for ext in ["shp", "shx", "dbf", "prj"] {
            assert!(layer.with_extension(ext).exists(), "{ext} missing for {layer:?}");
        }
        assert_eq!(
            fs::read_to_string(layer.with_extension("prj")).unwrap(),
            "GEOGCS[\"WGS 84\"]"
        );
    }
    let dbf = fs::read(dir.path().join("1d_bc_refh2_P.dbf")).unwrap();
    let dbf = String::from_utf8_lossy(&dbf);
    assert!(dbf.contains("Descriptio"));
    assert!(dbf.contains("Catchment_Q"));
    // no staging files left behind
    let leftovers = fs::read_dir(dir.path())
        .unwrap()
        .filter_map(Result::ok)
        .filter(|e| e.file_name().to_string_lossy().starts_with('~'))
        .count();
    assert_eq!(leftovers, 0);
}

#[test]
fn locked_bc_dbase_stops_the_run() {
    let dir = tempfile::tempdir().expect("create temp dir");
    let raw = seed_raw(dir.path());
    let cfg = config(&raw, "");

    let bc_path = dir.path().join("bc_dbase.csv");
    fs::write(&bc_path, "old").unwrap();
    set_readonly(&bc_path);

    let recorder = Recorder::default();
    let err = Pipeline::new(&cfg, &no_exe, &recorder)
        .post_process()
        .unwrap_err();

    let message = format!("{} Locked", bc_path.display());
    assert_eq!(err.to_string(), message);
    assert_eq!(
        recorder.events().last(),
        Some(&Progress::Finished(message))
    );
    assert_eq!(fs::read_to_string(&bc_path).unwrap(), "old");
    // converter ran first and keeps its output; later stages never ran
    assert!(dir.path().join("refh2_TUFLOW.csv").exists());
    assert!(!dir.path().join("event_file.tef").exists());
}

fn set_readonly(path: &Path) {
    let mut perms = fs::metadata(path).unwrap().permissions();
    perms.set_readonly(true);
    fs::set_permissions(path, perms).unwrap();
}

const RF_LAYER: &str = r#"gis_outputs = ["rf"]
[gis.geometry]
type = "Polygon"
coordinates = [[[0.0, 0.0], [100.0, 0.0], [100.0, 100.0], [0.0, 100.0], [0.0, 0.0]]]
"#;

#[test]
fn locked_layer_sidecar_leaves_no_partial_layer() {
    let dir = tempfile::tempdir().expect("create temp dir");
    let raw = seed_raw(dir.path());
    let cfg = config(&raw, RF_LAYER);

    let dbf = dir.path().join("2d_rf_refh2_R.dbf");
    fs::write(&dbf, "stale").unwrap();
    set_readonly(&dbf);

    let recorder = Recorder::default();
    let err = Pipeline::new(&cfg, &no_exe, &recorder)
        .post_process()
        .unwrap_err();

    assert!(matches!(err, Refh2Error::Locked { .. }));
    assert_eq!(err.to_string(), format!("{} Locked", dbf.display()));
    assert_eq!(
        recorder.events().last(),
        Some(&Progress::Finished(err.to_string()))
    );
    assert_eq!(fs::read_to_string(&dbf).unwrap(), "stale");
    assert!(!dir.path().join("2d_rf_refh2_R.shp").exists());
    assert!(!dir.path().join("2d_rf_refh2_R.shx").exists());
    // earlier stages completed before the layer was attempted
    for name in ["refh2_TUFLOW.csv", "bc_dbase.csv", "event_file.tef"] {
        assert!(dir.path().join(name).exists(), "{name} missing");
    }
    let leftovers = fs::read_dir(dir.path())
        .unwrap()
        .filter_map(Result::ok)
        .filter(|e| e.file_name().to_string_lossy().starts_with('~'))
        .count();
    assert_eq!(leftovers, 0);
}

#[test]
fn stale_projection_removed_without_crs() {
    let dir = tempfile::tempdir().expect("create temp dir");
    let raw = seed_raw(dir.path());
    let prj = dir.path().join("2d_rf_refh2_R.prj");
    fs::write(&prj, "GEOGCS[\"old\"]").unwrap();

    let report = Pipeline::new(&config(&raw, RF_LAYER), &no_exe, &Recorder::default())
        .post_process()
        .unwrap();
    assert_eq!(report.layers, vec![dir.path().join("2d_rf_refh2_R.shp")]);
    assert!(dir.path().join("2d_rf_refh2_R.dbf").exists());
    assert!(!prj.exists());
}

#[test]
fn missing_executable_is_reported() {
    let dir = tempfile::tempdir().expect("create temp dir");
    let cfg = config(&dir.path().join("refh2.csv"), "");
    let recorder = Recorder::default();

    let err = Pipeline::new(&cfg, &no_exe, &recorder).run().unwrap_err();
    assert!(matches!(err, Refh2Error::ExecutableNotFound));
    assert_eq!(
        recorder.events(),
        vec![
            Progress::LocatingExecutable,
            Progress::Finished("Error: Cannot Find ReFH2.exe".into())
        ]
    );
}

#[cfg(unix)]
mod fake_refh2 {
    use super::*;
    use std::os::unix::fs::PermissionsExt;

    fn script(dir: &Path, body: &str) -> PathBuf {
        let path = dir.join("RefH2CLI");
        fs::write(&path, format!("#!/bin/sh\n{body}")).unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    #[test]
    fn silent_run_is_post_processed() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let raw = raw_output(&[20, 2, 100], &TIMES);
        let exe = script(
            dir.path(),
            &format!(
                "for a in \"$@\"; do case \"$a\" in --outfile=*) out=\"${{a#--outfile=}}\";; esac; done\n\
                 cat > \"$out\" <<'EOF'\n{raw}EOF\n"
            ),
        );
        let mut cfg = config(&dir.path().join("refh2.csv"), "");
        cfg.exe = Some(exe);
        let recorder = Recorder::default();

        let report = Pipeline::new(&cfg, &no_exe, &recorder).run().unwrap();
        assert_eq!(report.time_series, Some(dir.path().join("refh2_TUFLOW.csv")));
        assert_eq!(
            recorder.events(),
            vec![
                Progress::ExternalRunStarted,
                Progress::PostProcessingStarted,
                Progress::Finished(String::new()),
            ]
        );
    }

    #[test]
    fn stdout_is_treated_as_failure() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let exe = script(dir.path(), "echo 'Licence has expired'\n");
        let mut cfg = config(&dir.path().join("refh2.csv"), "");
        cfg.exe = Some(exe);
        let recorder = Recorder::default();

        let err = Pipeline::new(&cfg, &no_exe, &recorder).run().unwrap_err();
        assert_eq!(err.to_string(), "Licence has expired");
        assert_eq!(
            recorder.events().last(),
            Some(&Progress::Finished("Licence has expired".into()))
        );
        assert!(!dir.path().join("refh2_TUFLOW.csv").exists());
    }

    #[test]
    fn non_zero_exit_reports_stderr() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let exe = script(dir.path(), "echo 'bad descriptor' >&2\nexit 3\n");
        let mut cfg = config(&dir.path().join("refh2.csv"), "");
        cfg.exe = Some(exe);

        let err = Pipeline::new(&cfg, &no_exe, &Recorder::default())
            .run()
            .unwrap_err();
        assert_eq!(err.to_string(), "bad descriptor");
    }
}

#[test]
fn gis_output_kinds_parse() {
    let dir = tempfile::tempdir().expect("create temp dir");
    let cfg = config(
        &dir.path().join("refh2.csv"),
        r#"gis_outputs = ["bc_2d", "bc_2d", "sa"]
[gis.geometry]
type = "LineString"
coordinates = [[0.0, 0.0], [10.0, 10.0]]
"#,
    );
    assert_eq!(cfg.gis_outputs, vec![GisOutput::Bc2d, GisOutput::Sa]);
    assert_eq!(cfg.gis.unwrap().crs, None);
}
