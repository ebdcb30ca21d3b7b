//! Hybrid Euler/Lagrangian exchange scenarios against the dummy solver.

use vpm2d::{
    Bem, Collection, Convection, DummySolver, HOVolumes, Hybrid, HybridConfig, Points,
};

/// A 10x10 unit mesh with a fully open boundary, so cell mask areas are the
/// plain 0.01 cell areas.
fn open_volume() -> HOVolumes {
    let (x, elem_idx, _wall, open_idx) = vpm2d::uniform_rectangle(0.0, 1.0, 0.0, 1.0, 10, 10);
    HOVolumes::new(&x, &elem_idx, &[], &open_idx, None).unwrap()
}

fn enabled_config() -> HybridConfig {
    HybridConfig {
        enabled: true,
        ..Default::default()
    }
}

#[test]
fn test_correction_first_insertion_matches_deficit() {
    // A constant vorticity deficit of 0.1 over 100 cells of area 0.01:
    // the equivalent particles carry exactly 0.001 each, and merging
    // preserves the inserted total exactly.
    let mut vol = open_volume();
    let mut hybrid = Hybrid::new(Box::new(DummySolver::new()), enabled_config());
    let mut euler = vec![vol.clone()];
    hybrid.init(&mut euler).unwrap();
    vol = euler.pop().unwrap();

    vol.set_mask_area(0.05);
    let mask = vol.get_mask_area();
    assert_eq!(mask.len(), 100);
    for &a in mask {
        assert!((a - 0.01).abs() < 1e-12, "open mesh keeps full cell areas");
    }

    let deficit: Vec<f64> = mask.iter().map(|a| 0.1 * a).collect();
    let packet = vol.get_equivalent_particles(&deficit, 0.05).unwrap();
    assert_eq!(packet.len(), 300);
    for p in packet.chunks(3) {
        assert!((p[2] - 0.001).abs() < 1e-12, "per-cell strength {}", p[2]);
    }

    let mut vort = vec![Collection::Points(Points::empty())];
    vort[0]
        .as_points_mut()
        .unwrap()
        .add_new_with_radius(&packet, 0.05)
        .unwrap();
    assert_eq!(vort[0].get_n(), 100);

    vpm2d::merge_operation(&mut vort, 1.5, 0.2, false);
    let total = vort[0].get_total_circ(0.0);
    assert!(
        (total - 0.1).abs() < 1e-3 * 0.1,
        "inserted circulation {} vs 0.1",
        total
    );
}

#[test]
fn test_step_corrects_toward_euler_field() {
    // The dummy solver reports a uniform vorticity offset; a coupled step
    // must insert particles carrying roughly that much circulation.
    let mut solver = DummySolver::new();
    solver.vort_offset = 0.1;

    let mut hybrid = Hybrid::new(Box::new(solver), enabled_config());
    let mut euler = vec![open_volume()];
    let mut vort = vec![Collection::Points(Points::empty())];
    let mut bdry: Vec<Collection> = Vec::new();
    let bem = Bem::new();
    let mut conv = Convection::new();

    hybrid
        .first_step(0.0, [0.0, 0.0], &vort, &bdry, &bem, &mut conv, &mut euler)
        .unwrap();
    hybrid
        .step(
            0.01,
            0.01,
            100.0,
            [0.0, 0.0],
            &mut vort,
            &mut bdry,
            &bem,
            &mut conv,
            &mut euler,
            0.05,
        )
        .unwrap();

    let total = vort[0].get_total_circ(0.0);
    // The offset integrates to 0.1 circulation over the unit square; the
    // fixed-point loop may over- or under-shoot by its 1% tolerance plus
    // kernel tails outside the mesh.
    assert!(
        total > 0.05 && total < 0.2,
        "corrected circulation {}",
        total
    );
    assert!(vort[0].get_n() > 0, "particles were inserted");
}

#[test]
fn test_solver_length_mismatch_is_fatal() {
    // A solver that reports the wrong vorticity length must abort the step.
    #[derive(Default)]
    struct BadSolver {
        inner: DummySolver,
    }

    impl vpm2d::HighOrderSolver for BadSolver {
        fn set_element_order(&mut self, k: u32) {
            self.inner.set_element_order(k);
        }
        fn init(
            &mut self,
            nodes: &[f64],
            elem_idx: &[usize],
            wall_idx: &[usize],
            open_idx: &[usize],
        ) -> vpm2d::Result<()> {
            self.inner.init(nodes, elem_idx, wall_idx, open_idx)
        }
        fn get_soln_pts(&self) -> Vec<f64> {
            self.inner.get_soln_pts()
        }
        fn get_open_pts(&self) -> Vec<f64> {
            self.inner.get_open_pts()
        }
        fn set_open_vels(&mut self, packed: &[f64]) -> vpm2d::Result<()> {
            self.inner.set_open_vels(packed)
        }
        fn set_soln_vort(&mut self, vort: &[f64]) -> vpm2d::Result<()> {
            self.inner.set_soln_vort(vort)
        }
        fn solve_to(
            &mut self,
            time: f64,
            num_substeps: u32,
            time_order: u32,
            re: f64,
        ) -> vpm2d::Result<()> {
            self.inner.solve_to(time, num_substeps, time_order, re)
        }
        fn get_all_vorts(&self) -> Vec<f64> {
            vec![0.0; 7]
        }
    }

    let mut hybrid = Hybrid::new(Box::new(BadSolver::default()), enabled_config());
    let mut euler = vec![open_volume()];
    let mut vort = vec![Collection::Points(Points::empty())];
    let bem = Bem::new();
    let mut conv = Convection::new();

    let err = hybrid
        .step(
            0.01,
            0.01,
            100.0,
            [0.0, 0.0],
            &mut vort,
            &mut [],
            &bem,
            &mut conv,
            &mut euler,
            0.05,
        )
        .unwrap_err();
    assert!(matches!(err, vpm2d::Error::ExternalSolver(_)));
}
