use std::fs;

use trajkit_cli::bounding;
use trajkit_core::error::TrajError;
use trajkit_core::frame::Box3;
use trajkit_core::geom::Vec3;

mod common;
use common::{temp_path, write_models, write_text};

const CRYST1: &str = "CRYST1   30.000   40.000   50.000  90.00  90.00  90.00 P 1           1\n";

#[test]
fn reports_count_centroid_and_bounds() {
    let path = temp_path("straight.pdb");
    write_models(&path, 1, 3);
    let body = fs::read_to_string(&path).expect("read pdb");
    write_text(&path, &format!("{CRYST1}{body}"));

    let report = bounding(&path, "name CA").expect("bounding");
    assert_eq!(report.n_atoms, 3);
    assert!((report.centroid.x - 3.8).abs() < 1e-9);
    assert_eq!(report.min, Vec3::new(0.0, 0.0, 0.0));
    assert!((report.max.x - 7.6).abs() < 1e-9);
    assert_eq!(
        report.periodic_box,
        Box3::Orthorhombic {
            lx: 30.0,
            ly: 40.0,
            lz: 50.0
        }
    );

    let mut out = Vec::new();
    report.write(&mut out).expect("write");
    let text = String::from_utf8(out).expect("utf8");
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(
        lines,
        vec![
            "3 atoms in subset.",
            "Centroid at (3.800,0.000,0.000)",
            "Bounds: (0.000,0.000,0.000) x (7.600,0.000,0.000)",
            "Periodic box: (30.000,40.000,50.000) volume 60000.000",
        ]
    );
    let _ = fs::remove_file(&path);
}

#[test]
fn no_cell_line_without_cryst1() {
    let path = temp_path("nocell.pdb");
    write_models(&path, 2, 2);
    let report = bounding(&path, "all").expect("bounding");
    // only the first model counts
    assert_eq!(report.n_atoms, 4);
    let mut out = Vec::new();
    report.write(&mut out).expect("write");
    assert_eq!(String::from_utf8(out).expect("utf8").lines().count(), 3);
    let _ = fs::remove_file(&path);
}

#[test]
fn empty_selection_is_rejected() {
    let path = temp_path("nocb.pdb");
    write_models(&path, 1, 2);
    let err = bounding(&path, "name CB").unwrap_err();
    assert!(matches!(err, TrajError::InvalidSelection(_)));
    let _ = fs::remove_file(&path);
}
