//! Integration tests driving the engine the way the shell would: through
//! `ops::parse` + `ops::dispatch` against a real temp-file-backed image.

use tempfile::NamedTempFile;
use vfatfs::ops::{self, Outcome};
use vfatfs::{Engine, FsError};

fn fresh_engine() -> (Engine, std::path::PathBuf) {
    let tmp = NamedTempFile::new().expect("create temp file");
    let path = tmp.path().to_path_buf();
    std::fs::remove_file(&path).expect("remove placeholder so Engine::open formats fresh");
    (Engine::open(&path).expect("open+format fresh image"), path)
}

fn run(engine: &mut Engine, line: &str) -> Result<Outcome, FsError> {
    let tokens: Vec<&str> = line.split_ascii_whitespace().collect();
    let (name, args) = tokens.split_first().expect("non-empty command line");
    ops::dispatch(engine, ops::parse(name, args).expect("known command").expect("valid arity"))
}

fn run_ok(engine: &mut Engine, line: &str) {
    match run(engine, line).unwrap_or_else(|e| panic!("{line}: {e}")) {
        Outcome::Exit => panic!("unexpected exit from {line}"),
        _ => {}
    }
}

#[test]
fn s1_basic_round_trip() {
    let (mut engine, path) = fresh_engine();
    run_ok(&mut engine, "format 1MB");
    run_ok(&mut engine, "mkdir /d");

    let host_in = NamedTempFile::new().unwrap();
    std::fs::write(host_in.path(), [0x01, 0x02, 0x03]).unwrap();
    run_ok(&mut engine, &format!("incp {} /d/f", host_in.path().display()));

    let host_out = NamedTempFile::new().unwrap();
    std::fs::remove_file(host_out.path()).ok();
    run_ok(
        &mut engine,
        &format!("outcp /d/f {}", host_out.path().display()),
    );

    let round_tripped = std::fs::read(host_out.path()).unwrap();
    assert_eq!(round_tripped, vec![0x01, 0x02, 0x03]);

    match run(&mut engine, "info /d/f").unwrap() {
        Outcome::Text(t) => assert_eq!(t.split_ascii_whitespace().count(), 1),
        _ => panic!("expected text outcome"),
    }

    std::fs::remove_file(&path).ok();
}

#[test]
fn s2_move_preserves_data_and_removes_old_path() {
    let (mut engine, path) = fresh_engine();
    let host = NamedTempFile::new().unwrap();
    std::fs::write(host.path(), b"move me").unwrap();
    run_ok(&mut engine, &format!("incp {} /a", host.path().display()));
    run_ok(&mut engine, "mv /a /b");

    match run(&mut engine, "cat /b").unwrap() {
        Outcome::Raw(bytes) => assert_eq!(bytes, b"move me"),
        _ => panic!("expected raw outcome"),
    }

    let err = run(&mut engine, "info /a").unwrap_err();
    assert!(matches!(err, FsError::FileNotFound));

    std::fs::remove_file(&path).ok();
}

#[test]
fn s3_rmdir_refuses_nonempty() {
    let (mut engine, path) = fresh_engine();
    run_ok(&mut engine, "mkdir /d");
    let host = NamedTempFile::new().unwrap();
    std::fs::write(host.path(), b"x").unwrap();
    run_ok(&mut engine, &format!("incp {} /d/f", host.path().display()));

    let err = run(&mut engine, "rmdir /d").unwrap_err();
    assert!(matches!(err, FsError::NotEmpty));

    // state unchanged: /d/f is still readable.
    match run(&mut engine, "cat /d/f").unwrap() {
        Outcome::Raw(bytes) => assert_eq!(bytes, b"x"),
        _ => panic!("expected raw outcome"),
    }

    std::fs::remove_file(&path).ok();
}

#[test]
fn s4_defrag_makes_a_fragmented_chain_consecutive() {
    let (mut engine, path) = fresh_engine();

    // Three one-cluster files, then free the first and third, leaving a
    // gap at the middle cluster. Allocating /b right after picks the two
    // non-adjacent freed clusters, fragmenting it on purpose.
    for name in ["p", "q", "r"] {
        let host = NamedTempFile::new().unwrap();
        std::fs::write(host.path(), name).unwrap();
        run_ok(&mut engine, &format!("incp {} /{name}", host.path().display()));
    }
    run_ok(&mut engine, "rm /p");
    run_ok(&mut engine, "rm /r");

    let host_b = NamedTempFile::new().unwrap();
    std::fs::write(host_b.path(), vec![b'b'; 5000]).unwrap();
    run_ok(&mut engine, &format!("incp {} /b", host_b.path().display()));

    let fragmented = match run(&mut engine, "info /b").unwrap() {
        Outcome::Text(t) => t,
        _ => panic!("expected text outcome"),
    };
    let fragmented_clusters: Vec<u32> = fragmented
        .split_ascii_whitespace()
        .map(|s| s.parse().unwrap())
        .collect();
    assert!(
        !fragmented_clusters.windows(2).all(|w| w[1] == w[0] + 1),
        "test setup expected /b to start out fragmented, got {fragmented_clusters:?}"
    );

    run_ok(&mut engine, "defrag /b");

    let info = match run(&mut engine, "info /b").unwrap() {
        Outcome::Text(t) => t,
        _ => panic!("expected text outcome"),
    };
    let clusters: Vec<u32> = info
        .split_ascii_whitespace()
        .map(|s| s.parse().unwrap())
        .collect();
    for pair in clusters.windows(2) {
        assert_eq!(pair[1], pair[0] + 1, "clusters not consecutive: {clusters:?}");
    }

    std::fs::remove_file(&path).ok();
}

#[test]
fn s5_mkdir_twice_is_exists() {
    let (mut engine, path) = fresh_engine();
    run_ok(&mut engine, "mkdir /d");
    let err = run(&mut engine, "mkdir /d").unwrap_err();
    assert!(matches!(err, FsError::Exists));
    std::fs::remove_file(&path).ok();
}

#[test]
fn s6_format_unit_parsing() {
    let (mut engine, path) = fresh_engine();

    // "format 2 MB" splits into two tokens -> wrong arity for `format`.
    let tokens: Vec<&str> = "2 MB".split_ascii_whitespace().collect();
    let err = ops::parse("format", &tokens).unwrap().unwrap_err();
    assert!(matches!(err, FsError::InvalidOption));

    run_ok(&mut engine, "format 2MB");

    let err = run(&mut engine, "format 2KB").unwrap_err();
    assert!(matches!(err, FsError::OutOfSpace));

    std::fs::remove_file(&path).ok();
}

#[test]
fn directory_full_keeps_prior_entries_valid() {
    let (mut engine, path) = fresh_engine();
    for i in 0..vfatfs::config::max_entries() - 2 {
        let host = NamedTempFile::new().unwrap();
        std::fs::write(host.path(), format!("file {i}")).unwrap();
        run_ok(&mut engine, &format!("incp {} /f{i}", host.path().display()));
    }

    let overflow_host = NamedTempFile::new().unwrap();
    std::fs::write(overflow_host.path(), b"overflow").unwrap();
    let err = run(
        &mut engine,
        &format!("incp {} /overflow", overflow_host.path().display()),
    )
    .unwrap_err();
    assert!(matches!(err, FsError::CorruptFs));

    // the first file inserted is still there and intact.
    match run(&mut engine, "cat /f0").unwrap() {
        Outcome::Raw(bytes) => assert_eq!(bytes, b"file 0"),
        _ => panic!("expected raw outcome"),
    }

    std::fs::remove_file(&path).ok();
}
