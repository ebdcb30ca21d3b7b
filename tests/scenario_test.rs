//! End-to-end scenarios for the particle side of the engine.
//!
//! These tests verify:
//! - Seeding an isolated vortex blob and its induced far-field velocity
//! - Merge of a close particle pair
//! - Two-stage blended advection
//! - Empty-collection boundary behavior

use vpm2d::{
    merge_operation, Collection, Convection, ElemType, FlowFeature, MoveType, Points, SolveTarget,
};

const TWO_PI: f64 = 2.0 * std::f64::consts::PI;

#[test]
fn test_isolated_vortex_blob() {
    let blob = FlowFeature::VortexBlob {
        center: [0.0, 0.0],
        radius: 1.0,
        softness: 0.1,
        strength: 1.0,
        enabled: true,
    };
    let ips = 0.1;
    let mut packet = blob.init_particles(ips);
    for chunk in packet.chunks_mut(4) {
        chunk[3] = 1.2 * ips;
    }

    let n = packet.len() / 4;
    assert!((300..=350).contains(&n), "blob particle count {}", n);

    let total: f64 = packet.chunks(4).map(|p| p[2]).sum();
    assert!(
        (total - 1.0).abs() < 1e-6,
        "post-normalization circulation {}",
        total
    );

    // Velocity at (10, 0) is that of a unit point vortex: (0, 1/(2 pi 10)).
    let cloud = Points::new(&packet, ElemType::Active, MoveType::Lagrangian, None).unwrap();
    let vort = vec![Collection::Points(cloud)];
    let probe = Points::new(&[10.0, 0.0], ElemType::Inert, MoveType::Fixed, None).unwrap();
    let mut targets = vec![Collection::Points(probe)];

    let mut conv = Convection::new();
    conv.find_vels([0.0, 0.0], &vort, &[], &mut targets, SolveTarget::VelOnly, true);

    let p = targets[0].as_points().unwrap();
    let expect = 1.0 / (TWO_PI * 10.0);
    assert!(
        p.base().u[0][0].abs() < 1e-4,
        "u at probe {}",
        p.base().u[0][0]
    );
    assert!(
        (p.base().u[1][0] - expect).abs() / expect < 1e-2,
        "v at probe {} vs {}",
        p.base().u[1][0],
        expect
    );
}

#[test]
fn test_merge_pair_scenario() {
    let cloud = Points::new(
        &[0.0, 0.0, 1.0, 1.0, 0.1, 0.0, 1.0, 1.0],
        ElemType::Active,
        MoveType::Lagrangian,
        None,
    )
    .unwrap();
    let mut vort = vec![Collection::Points(cloud)];

    merge_operation(&mut vort, 1.5, 0.2, false);

    let p = vort[0].as_points().unwrap();
    assert_eq!(p.get_n(), 1);
    assert!((p.base().x[0][0] - 0.05).abs() < 1e-14);
    assert!(p.base().x[1][0].abs() < 1e-14);
    assert!((p.base().strengths().unwrap()[0] - 2.0).abs() < 1e-14);
    assert!((p.r[0] - 2.0_f64.sqrt()).abs() < 1e-14);
}

#[test]
fn test_two_stage_move() {
    let mut p = Points::new(
        &[0.0, 0.0, 1.0, 0.1],
        ElemType::Active,
        MoveType::Lagrangian,
        None,
    )
    .unwrap();

    let mut stage1 = p.base().clone();
    stage1.u[0][0] = 1.0;
    stage1.u[1][0] = 0.0;
    let mut stage2 = p.base().clone();
    stage2.u[0][0] = 0.0;
    stage2.u[1][0] = 1.0;

    p.base_mut().move_weighted(0.0, 1.0, 0.5, &stage1, 0.5, &stage2);
    assert!((p.base().x[0][0] - 0.5).abs() < 1e-15);
    assert!((p.base().x[1][0] - 0.5).abs() < 1e-15);
}

#[test]
fn test_empty_points_boundaries() {
    let p = Points::empty();
    assert_eq!(p.get_n(), 0);
    assert_eq!(p.base().get_max_str(), 1.0);
    assert_eq!(p.base().get_total_circ(0.0), 0.0);
}
