use miette::{IntoDiagnostic, Result};
use std::fs;
use std::ops::ControlFlow;
use std::path::Path;

use co2_pkg::{
    error::Error,
    pack,
    progress::{Progress, Stage},
    CompressionLevel, PackOptions, TpiArchive,
};
use tempfile::TempDir;
use tracing::{info, instrument};
use tracing_test::traced_test;

/// Counts the stages it sees and cancels once `cancel_at` entries were compressed
#[derive(Default)]
struct Recorder {
    stages: Vec<Stage>,
    cancel_at: Option<usize>,
}

impl Progress for Recorder {
    fn stage(&mut self, stage: Stage, _total: usize) {
        self.stages.push(stage);
    }

    fn entry(&mut self, index: usize, _name: &str) -> ControlFlow<()> {
        match self.cancel_at {
            Some(at) if index >= at => ControlFlow::Break(()),
            _ => ControlFlow::Continue(()),
        }
    }
}

fn populate(root: &Path, files: &[(&str, &[u8])]) -> Result<()> {
    for (name, data) in files {
        let path = root.join(name);
        fs::create_dir_all(path.parent().unwrap()).into_diagnostic()?;
        fs::write(path, data).into_diagnostic()?;
    }
    Ok(())
}

#[instrument(skip(files))]
fn validate_round_trip(files: &[(&str, &[u8])], level: CompressionLevel) -> Result<()> {
    let dir = TempDir::new().into_diagnostic()?;
    let source = dir.path().join("source");
    populate(&source, files)?;

    let report = pack(
        &source,
        dir.path().join("out").join("data"),
        PackOptions::builder().level(level).build(),
        (),
    )?;
    assert!(report.is_complete());
    assert_eq!(report.packed.len(), files.len());

    let archive = TpiArchive::open_path(dir.path().join("out").join("data.tpi"))?;
    assert_eq!(archive.len(), files.len());

    for (name, data) in files {
        info!("comparing {}", name);
        let actual = archive.get_entry_data(name)?.expect("entry is missing");
        assert_eq!(&actual[..], *data);
    }

    Ok(())
}

#[traced_test]
#[test]
fn pack_round_trips_trees() -> Result<()> {
    let deep = format!("{}/deep.bin", ["nested"; 12].join("/"));
    let large: Vec<u8> = (0..300_000u32).map(|i| (i % 7 + i / 1024) as u8).collect();

    let zeros = [0u8; 1000];
    let files = [
        ("a.txt", b"hello".as_slice()),
        ("b/c.dat", zeros.as_slice()),
        ("empty.txt", b"".as_slice()),
        ("ini/large.bin", large.as_slice()),
        (deep.as_str(), b"deep".as_slice()),
    ];

    for level in [CompressionLevel::Client, CompressionLevel::Best] {
        validate_round_trip(&files, level)?;
    }

    Ok(())
}

#[traced_test]
#[test]
fn pack_open_and_extract_scenario() -> Result<()> {
    let dir = TempDir::new().into_diagnostic()?;
    let source = dir.path().join("source");
    populate(
        &source,
        &[("a.txt", b"hello".as_slice()), ("b/c.dat", &[0u8; 1000])],
    )?;

    pack(&source, dir.path().join("data"), PackOptions::default(), ())?;

    let archive = TpiArchive::open_path(dir.path().join("data.tpi"))?;
    assert_eq!(archive.len(), 2);
    assert_eq!(archive.get_entry_data("a.txt")?, Some(b"hello".to_vec()));
    assert_eq!(archive.get_entry_data("b/c.dat")?, Some(vec![0u8; 1000]));

    let out = dir.path().join("extracted");
    let report = archive.extract_all(&out, ())?;
    assert!(report.is_complete());
    assert_eq!(fs::read(out.join("a.txt")).into_diagnostic()?, b"hello");
    assert_eq!(
        fs::read(out.join("b").join("c.dat")).into_diagnostic()?,
        vec![0u8; 1000]
    );

    Ok(())
}

#[traced_test]
#[test]
fn pack_reports_stages_in_order() -> Result<()> {
    let dir = TempDir::new().into_diagnostic()?;
    let source = dir.path().join("source");
    populate(&source, &[("a.txt", b"a".as_slice())])?;

    let mut recorder = Recorder::default();
    pack(&source, dir.path().join("data"), PackOptions::default(), &mut recorder)?;

    assert_eq!(
        recorder.stages,
        vec![
            Stage::Scanning,
            Stage::Compressing,
            Stage::WritingEntries,
            Stage::FinalizingHeader,
            Stage::Done,
        ]
    );

    Ok(())
}

#[traced_test]
#[test]
fn cancelled_pack_leaves_no_artifacts() -> Result<()> {
    let dir = TempDir::new().into_diagnostic()?;
    let source = dir.path().join("source");
    populate(&source, &[("a.txt", b"a".as_slice()), ("b.txt", b"b"), ("c.txt", b"c")])?;

    let out = dir.path().join("out");
    fs::create_dir_all(&out).into_diagnostic()?;

    let recorder = Recorder {
        cancel_at: Some(1),
        ..Default::default()
    };
    let result = pack(&source, out.join("data"), PackOptions::default(), recorder);

    assert!(matches!(result, Err(Error::Cancelled)));
    assert_eq!(fs::read_dir(&out).into_diagnostic()?.count(), 0);

    Ok(())
}

#[traced_test]
#[test]
fn include_root_prefixes_entries() -> Result<()> {
    let dir = TempDir::new().into_diagnostic()?;
    let source = dir.path().join("C3");
    populate(&source, &[("Mesh/Hero.c3", b"mesh".as_slice()), ("hero.ini", b"ini")])?;

    let report = pack(
        &source,
        dir.path().join("c3"),
        PackOptions::builder().include_root(true).build(),
        (),
    )?;
    assert_eq!(report.packed, vec!["C3/hero.ini", "C3/Mesh/Hero.c3"]);

    let archive = TpiArchive::open_path(dir.path().join("c3.tpi"))?;
    assert_eq!(archive.file_names(), vec!["c3/hero.ini", "c3/mesh/hero.c3"]);
    assert_eq!(archive.get_entry_data("c3\\MESH\\hero.C3")?, Some(b"mesh".to_vec()));

    Ok(())
}

#[traced_test]
#[test]
fn unpackable_files_are_reported() -> Result<()> {
    let dir = TempDir::new().into_diagnostic()?;
    let source = dir.path().join("source");
    let long_name = format!("{}/{}.txt", "d".repeat(200), "f".repeat(100));
    populate(
        &source,
        &[
            ("Same.txt", b"first".as_slice()),
            ("same.txt", b"second"),
            (long_name.as_str(), b"too long"),
            ("ok.txt", b"ok"),
        ],
    )?;

    let report = pack(&source, dir.path().join("data"), PackOptions::default(), ())?;

    assert!(!report.is_complete());
    assert_eq!(report.packed, vec!["ok.txt", "Same.txt"]);
    let mut failed: Vec<&str> = report.failures.iter().map(|f| f.name.as_str()).collect();
    failed.sort();
    assert_eq!(failed, vec![long_name.as_str(), "same.txt"]);
    assert!(report
        .failures
        .iter()
        .all(|f| matches!(f.error, Error::InvalidPath { .. })));

    let archive = TpiArchive::open_path(dir.path().join("data.tpi"))?;
    assert_eq!(archive.len(), 2);
    assert_eq!(archive.get_entry_data("SAME.TXT")?, Some(b"first".to_vec()));

    Ok(())
}

#[test]
fn pack_requires_a_directory() -> Result<()> {
    let dir = TempDir::new().into_diagnostic()?;
    let file = dir.path().join("file.txt");
    fs::write(&file, b"x").into_diagnostic()?;

    let result = pack(&file, dir.path().join("data"), PackOptions::default(), ());
    assert!(matches!(result, Err(Error::InvalidPath { .. })));
    assert!(!dir.path().join("data.tpi").exists());

    Ok(())
}
