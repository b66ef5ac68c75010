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
        "trajkit_io_test_{stem}_{}_{}.{ext}",
        std::process::id(),
        nanos
    ));
    path
}

pub fn write_text(path: &Path, contents: &str) {
    fs::write(path, contents).expect("write temp file");
}

/// Frame `f`, atom `a` sits at `(f, a, f + a)`.
pub fn ramp_frames(n_frames: usize, n_atoms: usize) -> Vec<Vec<[f32; 3]>> {
    (0..n_frames)
        .map(|f| {
            (0..n_atoms)
                .map(|a| [f as f32, a as f32, (f + a) as f32])
                .collect()
        })
        .collect()
}

fn record(out: &mut Vec<u8>, payload: &[u8]) {
    out.extend_from_slice(&(payload.len() as u32).to_le_bytes());
    out.extend_from_slice(payload);
    out.extend_from_slice(&(payload.len() as u32).to_le_bytes());
}

/// Writes a little-endian CHARMM DCD. `cell` is `[A, B, C]` for an
/// orthorhombic unit-cell record in every frame.
pub fn write_dcd(path: &Path, frames: &[Vec<[f32; 3]>], timestep: f32, cell: Option<[f64; 3]>) {
    let n_atoms = frames.first().map(|f| f.len()).unwrap_or(0);
    let mut out = Vec::new();

    let mut header = Vec::with_capacity(84);
    header.extend_from_slice(b"CORD");
    let mut icntrl = [0i32; 20];
    icntrl[0] = frames.len() as i32;
    icntrl[2] = 1;
    icntrl[10] = cell.is_some() as i32;
    icntrl[19] = 24;
    for (k, value) in icntrl.iter().enumerate() {
        if k == 9 {
            header.extend_from_slice(&timestep.to_le_bytes());
        } else {
            header.extend_from_slice(&value.to_le_bytes());
        }
    }
    record(&mut out, &header);

    let mut title = Vec::new();
    title.extend_from_slice(&1i32.to_le_bytes());
    let mut line = [b' '; 80];
    line[..14].copy_from_slice(b"trajkit tests ");
    title.extend_from_slice(&line);
    record(&mut out, &title);

    record(&mut out, &(n_atoms as i32).to_le_bytes());

    for frame in frames {
        if let Some([a, b, c]) = cell {
            // CHARMM order: A, cos(gamma), B, cos(beta), cos(alpha), C
            let values = [a, 0.0, b, 0.0, 0.0, c];
            let bytes: Vec<u8> = values.iter().flat_map(|v| v.to_le_bytes()).collect();
            record(&mut out, &bytes);
        }
        for axis in 0..3 {
            let bytes: Vec<u8> = frame.iter().flat_map(|p| p[axis].to_le_bytes()).collect();
            record(&mut out, &bytes);
        }
    }
    fs::write(path, out).expect("write dcd");
}
