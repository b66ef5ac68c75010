use super::*;
use nalgebra::{Rotation3, Vector3};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use trajkit_core::error::TrajError;
use trajkit_core::geom::Vec3;
use trajkit_core::system::{Atom, AtomGroup};
use trajkit_io::{MemoryFormat, Trajectory};

fn random_frames(rng: &mut StdRng, n_frames: usize, n_atoms: usize) -> Vec<Vec<Vec3>> {
    (0..n_frames)
        .map(|_| {
            (0..n_atoms)
                .map(|_| {
                    Vec3::new(
                        rng.gen_range(-10.0..10.0),
                        rng.gen_range(-10.0..10.0),
                        rng.gen_range(-10.0..10.0),
                    )
                })
                .collect()
        })
        .collect()
}

fn memory_traj(frames: Vec<Vec<Vec3>>) -> Trajectory<MemoryFormat> {
    Trajectory::new(MemoryFormat::new(frames).unwrap()).unwrap()
}

fn model_of(n_atoms: usize) -> AtomGroup {
    AtomGroup::from_atoms(
        (0..n_atoms)
            .map(|i| Atom::new(i, "CA", "GLY", i as i32 + 1))
            .collect(),
    )
}

fn centered(frame: &[Vec3]) -> Vec<f64> {
    let mut flat: Vec<f64> = frame.iter().flat_map(|p| p.to_array()).collect();
    center_at_origin(&mut flat);
    flat
}

fn cached(frames: Vec<Vec<Vec3>>) -> CoordinateMatrix {
    let n_frames = frames.len();
    let n_atoms = frames[0].len();
    let mut traj = memory_traj(frames);
    let all: Vec<usize> = (0..n_frames).collect();
    let mut cache = read_coords(&mut traj, &model_of(n_atoms), &all).unwrap();
    cache.center_all();
    cache
}

#[test]
fn rmsd_is_symmetric_and_zero_on_self() {
    let mut rng = StdRng::seed_from_u64(17);
    let sup = Superposer::default();
    for _ in 0..20 {
        let frames = random_frames(&mut rng, 2, 12);
        let u = centered(&frames[0]);
        let v = centered(&frames[1]);
        let uv = sup.rmsd(&u, &v).unwrap();
        let vu = sup.rmsd(&v, &u).unwrap();
        assert!((uv - vu).abs() < 1e-9, "{uv} vs {vu}");
        // cancellation in E0 - 2 sum(s) leaves sqrt(eps)-sized residues
        assert!(sup.rmsd(&u, &u).unwrap() < 1e-4);
    }
}

#[test]
fn rigid_motion_is_removed() {
    let mut rng = StdRng::seed_from_u64(3);
    let frame = random_frames(&mut rng, 1, 25).remove(0);
    let rot = Rotation3::from_euler_angles(0.3, -1.1, 2.4);
    let moved: Vec<Vec3> = frame
        .iter()
        .map(|p| {
            let r = rot * Vector3::new(p.x, p.y, p.z);
            Vec3::new(r.x + 5.0, r.y - 2.0, r.z + 0.5)
        })
        .collect();
    let u = centered(&frame);
    let v = centered(&moved);
    for backend in [SvdBackend::Nalgebra, SvdBackend::Jacobi] {
        let sup = Superposer::new(backend.build()).with_proper_rotation(true);
        assert!(sup.rmsd(&u, &v).unwrap() < 1e-4, "{}", sup.backend_name());
    }
}

#[test]
fn three_frame_two_atom_matrix_is_sane() {
    let frames = vec![
        vec![Vec3::new(0.0, 0.0, 0.0), Vec3::new(1.0, 0.0, 0.0)],
        vec![Vec3::new(0.0, 0.0, 0.0), Vec3::new(2.0, 0.0, 0.0)],
        vec![Vec3::new(1.0, 1.0, 1.0), Vec3::new(1.0, 4.0, 1.0)],
    ];
    let mut cache = cached(frames);
    let progress = ProgressCounter::disabled(pair_count(3));
    let m = pairwise_rmsd(&mut cache, &Superposer::default(), &progress).unwrap();
    assert_eq!((m.rows(), m.cols()), (3, 3));
    assert!(m.is_symmetric());
    for &v in m.as_slice() {
        assert!(v.is_finite() && v >= 0.0);
    }
    // bond lengths 1, 2, 3: a rigid fit leaves half the length difference per atom
    assert!((m.get(0, 1) - 0.5).abs() < 1e-9);
    assert!((m.get(0, 2) - 1.0).abs() < 1e-9);
    assert!((m.get(1, 2) - 0.5).abs() < 1e-9);
    assert_eq!(progress.done(), 3);
}

#[test]
fn cache_and_reread_agree_exactly() {
    let mut rng = StdRng::seed_from_u64(99);
    let frames = random_frames(&mut rng, 7, 9);
    let sup = Superposer::default();
    let subset = model_of(9).filter(|a| a.index != 4);

    let all: Vec<usize> = (0..7).collect();
    let mut traj = memory_traj(frames.clone());
    let mut cache = read_coords(&mut traj, &subset, &all).unwrap();
    cache.center_all();
    let from_cache = pairwise_rmsd(&mut cache, &sup, &ProgressCounter::disabled(21)).unwrap();

    let mut traj = memory_traj(frames);
    let mut source = TrajectoryFrames::new(&mut traj, &subset, all);
    let reread = pairwise_rmsd(&mut source, &sup, &ProgressCounter::disabled(21)).unwrap();

    assert_eq!(from_cache, reread);
}

#[test]
fn parallel_matches_serial() {
    let mut rng = StdRng::seed_from_u64(5);
    let mut cache = cached(random_frames(&mut rng, 15, 6));
    let sup = Superposer::default();
    let serial = pairwise_rmsd(&mut cache, &sup, &ProgressCounter::disabled(105)).unwrap();
    let progress = ProgressCounter::disabled(105);
    let parallel = pairwise_rmsd_parallel(&cache, &sup, &progress).unwrap();
    assert_eq!(serial, parallel);
    assert_eq!(progress.done(), 105);

    let mut other = cached(random_frames(&mut rng, 4, 6));
    let cross = cross_rmsd(&mut cache, &mut other, &sup, &ProgressCounter::disabled(60)).unwrap();
    let cross_par =
        cross_rmsd_parallel(&cache, &other, &sup, &ProgressCounter::disabled(60)).unwrap();
    assert_eq!(cross, cross_par);
}

#[test]
fn cross_with_itself_reproduces_pairwise() {
    let mut rng = StdRng::seed_from_u64(11);
    let mut a = cached(random_frames(&mut rng, 5, 8));
    let mut b = a.clone();
    let sup = Superposer::default();
    let pairs = pairwise_rmsd(&mut a, &sup, &ProgressCounter::disabled(10)).unwrap();
    let cross = cross_rmsd(&mut a, &mut b, &sup, &ProgressCounter::disabled(25)).unwrap();
    for i in 0..5 {
        for j in 0..5 {
            let tol = if i == j { 1e-4 } else { 1e-9 };
            assert!((pairs.get(i, j) - cross.get(i, j)).abs() < tol, "({i}, {j})");
        }
    }
}

#[test]
fn backends_agree_on_pairwise_matrix() {
    let mut rng = StdRng::seed_from_u64(23);
    let mut cache = cached(random_frames(&mut rng, 6, 10));
    let a = pairwise_rmsd(
        &mut cache,
        &Superposer::new(SvdBackend::Nalgebra.build()),
        &ProgressCounter::disabled(15),
    )
    .unwrap();
    let b = pairwise_rmsd(
        &mut cache,
        &Superposer::new(SvdBackend::Jacobi.build()),
        &ProgressCounter::disabled(15),
    )
    .unwrap();
    for (x, y) in a.as_slice().iter().zip(b.as_slice()) {
        assert!((x - y).abs() < 1e-9);
    }
}

#[test]
fn cross_rejects_different_atom_counts() {
    let mut rng = StdRng::seed_from_u64(1);
    let mut a = cached(random_frames(&mut rng, 2, 4));
    let mut b = cached(random_frames(&mut rng, 2, 5));
    let err = cross_rmsd(
        &mut a,
        &mut b,
        &Superposer::default(),
        &ProgressCounter::disabled(4),
    )
    .unwrap_err();
    assert!(matches!(err, TrajError::Mismatch(_)));
}

#[test]
fn read_coords_reports_missing_frames() {
    let mut rng = StdRng::seed_from_u64(2);
    let mut traj = memory_traj(random_frames(&mut rng, 3, 2));
    let err = read_coords(&mut traj, &model_of(2), &[0, 3]).unwrap_err();
    assert!(matches!(
        err,
        TrajError::OutOfRange {
            index: 3,
            n_frames: 3
        }
    ));
}

#[test]
fn read_coords_follows_requested_order() {
    let frames: Vec<Vec<Vec3>> = (0..4)
        .map(|f| vec![Vec3::new(f as f64, 0.0, 0.0), Vec3::new(0.0, f as f64, 0.0)])
        .collect();
    let mut traj = memory_traj(frames);
    let subset = model_of(2).filter(|a| a.index == 1);
    let cache = read_coords(&mut traj, &subset, &[3, 1]).unwrap();
    assert_eq!(cache.n_frames(), 2);
    assert_eq!(cache.row(0), &[0.0, 3.0, 0.0]);
    assert_eq!(cache.row(1), &[0.0, 1.0, 0.0]);
}
