use treesim::models;
use treesim::{MatrixSpec, SkylineParameter};

fn rates_of(model: &treesim::Model) -> Vec<f64> {
    model
        .events()
        .iter()
        .map(|e| e.rate().map_or(f64::NAN, |r| r.value_at_time(0.0)))
        .collect()
}

#[test]
fn test_bd_reduces_to_canonical_rates() {
    // R = 2, infectious period = 2, p = 0.5: b = 0.5, birth = 1.0,
    // sampling = 0.25, death = 0.25.
    let model = models::bd(2.0, 2.0, 0.5).unwrap();
    assert_eq!(rates_of(&model), vec![1.0, 0.25, 0.25]);
}

#[test]
fn test_epidemiological_with_skyline_reproduction_number() {
    let r = SkylineParameter::new(vec![2.0, 1.0], vec![3.0]).unwrap();
    let model =
        models::epidemiological(&["X"], "X", r, 1.0, 0.5, None, None).unwrap();
    let birth = model.events()[0].rate().unwrap();
    assert_eq!(birth.change_times(), &[3.0]);
    assert_eq!(birth.value_at_time(0.0), 2.0);
    assert_eq!(birth.value_at_time(3.0), 1.0);
    // Death and sampling stay constant.
    assert_eq!(model.events()[1].rate().unwrap().value_at_time(0.0), 0.5);
    assert_eq!(model.events()[2].rate().unwrap().value_at_time(0.0), 0.5);
}

#[test]
fn test_canonical_migration_layout() {
    let model = models::canonical(
        &["A", "B"],
        "A",
        0.0,
        0.0,
        0.0,
        false,
        Some(MatrixSpec::from(vec![vec![1.0], vec![2.0]])),
        None,
    )
    .unwrap();
    // Per-state trios first, then migrations A->B and B->A.
    assert_eq!(model.events().len(), 8);
    assert_eq!(model.events()[6].rate().unwrap().value_at_time(0.0), 1.0);
    assert_eq!(model.events()[7].rate().unwrap().value_at_time(0.0), 2.0);
}

#[test]
fn test_canonical_rejects_unknown_init_state() {
    assert!(models::canonical(&["A", "B"], "C", 0.0, 0.0, 0.0, false, None, None).is_err());
}

#[test]
fn test_canonical_rejects_cross_rates_for_a_single_state() {
    assert!(models::canonical(
        &["A"],
        "A",
        0.0,
        0.0,
        0.0,
        false,
        Some(MatrixSpec::from(1.0)),
        None
    )
    .is_err());
}

#[test]
fn test_bdei_wires_incubation_and_transmission() {
    // R = 3, infectious period = 2, incubation period = 4, p = 0.25.
    let model = models::bdei("E", 3.0, 2.0, 4.0, 0.25).unwrap();
    // Trios for E and I, one migration pair, one cross-birth pair.
    assert_eq!(model.events().len(), 10);
    let rates = rates_of(&model);
    // E has no birth, death or sampling of its own.
    assert_eq!(&rates[0..3], &[0.0, 0.0, 0.0]);
    // I: birth 0, death (1 - p) / period, sampling p / period.
    assert_eq!(&rates[3..6], &[0.0, 0.375, 0.125]);
    // Migration E->I at 1 / incubation, I->E silent.
    assert_eq!(&rates[6..8], &[0.25, 0.0]);
    // Cross-birth E->I silent, I->E at R / infectious period.
    assert_eq!(&rates[8..10], &[0.0, 1.5]);

    assert!(models::bdei("X", 3.0, 2.0, 4.0, 0.25).is_err());
}

#[test]
fn test_bdss_apportions_the_reproduction_number() {
    let (r, ip, r_ss, f_ss, p) = (2.0, 1.0, 5.0, 0.1, 0.5);
    let model = models::bdss("I", r, ip, r_ss, f_ss, p).unwrap();

    let r_is = r * f_ss / (1.0 + r_ss * f_ss - f_ss);
    let r_si = (r - r_ss * r_is) * r_ss;
    let r_s = r_ss * r_is;
    let r_i = r_si / r_ss;
    let b = 1.0 / ip;

    let rates = rates_of(&model);
    assert_eq!(rates.len(), 8);
    // Within-state births for I and S.
    assert_eq!(rates[0], r_i * b);
    assert_eq!(rates[3], r_s * b);
    // Cross births I->S and S->I.
    assert_eq!(rates[6], r_is * b);
    assert_eq!(rates[7], r_si * b);

    assert!(models::bdss("E", r, ip, r_ss, f_ss, p).is_err());
}

#[test]
fn test_fbd_rates() {
    // d = 1, turnover = 0.5, p = 0.5: birth 2, death 1, sampling 0.5.
    let model = models::fbd(&["X"], "X", 1.0, 0.5, 0.5, None, None).unwrap();
    assert_eq!(rates_of(&model), vec![2.0, 1.0, 0.5]);
}

#[test]
fn test_sir_model_registers_the_susceptible_pool() {
    let model = models::sir(0.5, 0.2, 0.1, 100).unwrap();
    assert_eq!(model.events().len(), 3);
    assert_eq!(model.metadata_value(models::SUSCEPTIBLES_KEY), Some(100.0));
    assert_eq!(
        model.tree().node(model.root()).state(),
        Some(models::INFECTIOUS_STATE)
    );
}
