#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

pub fn temp_path(label: &str) -> PathBuf {
    let mut path = std::env::temp_dir();
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    let label_path = Path::new(label);
    let stem = label_path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(label);
    let ext = label_path.extension().and_then(|s| s.to_str()).unwrap_or("");
    path.push(format!(
        "trajkit_cli_test_{stem}_{}_{}.{ext}",
        std::process::id(),
        nanos
    ));
    path
}

pub fn write_text(path: &Path, contents: &str) {
    fs::write(path, contents).expect("write temp file");
}

fn atom_line(serial: usize, name: &str, resid: usize, p: [f64; 3]) -> String {
    format!(
        "ATOM  {serial:>5} {name:<4} ALA A{resid:>4}    {:>8.3}{:>8.3}{:>8.3}  1.00  0.00\n",
        p[0], p[1], p[2]
    )
}

/// Multi-model PDB with an N and a CA per residue; the chain bends a little
/// more in every model.
pub fn write_models(path: &Path, n_models: usize, n_residues: usize) {
    let mut body = String::new();
    for model in 0..n_models {
        body.push_str(&format!("MODEL     {:>4}\n", model + 1));
        let bend = 0.15 * model as f64;
        for r in 0..n_residues {
            let x = 3.8 * r as f64;
            let y = bend * (r as f64).powi(2) * 0.1;
            let z = (bend * r as f64).sin();
            body.push_str(&atom_line(2 * r + 1, "N", r + 1, [x - 1.2, y + 0.4, z]));
            body.push_str(&atom_line(2 * r + 2, "CA", r + 1, [x, y, z]));
        }
        body.push_str("ENDMDL\n");
    }
    body.push_str("END\n");
    write_text(path, &body);
}
