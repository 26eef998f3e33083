use proptest::prelude::*;

use treesim::{
    skyline_matrix, skyline_parameter, skyline_vector, SkylineMatrix, SkylineParameter,
    SkylineVector, VectorSpec,
};

fn param(value: &[f64], change_times: &[f64]) -> SkylineParameter {
    SkylineParameter::new(value.to_vec(), change_times.to_vec()).unwrap()
}

#[test]
fn test_init_with_scalar_value() {
    let p = SkylineParameter::constant(5.0);
    assert_eq!(p.value(), &[5.0]);
    assert!(p.change_times().is_empty());
}

#[test]
fn test_init_with_value_and_change_times() {
    let p = param(&[5.0, 2.0, 3.0], &[1.0, 2.5]);
    assert_eq!(p.value(), &[5.0, 2.0, 3.0]);
    assert_eq!(p.change_times(), &[1.0, 2.5]);
}

#[test]
fn test_init_removes_consecutive_duplicate_values() {
    let p = param(&[3.0, 5.0, 5.0], &[1.0, 2.0]);
    assert_eq!(p.value(), &[3.0, 5.0]);
    assert_eq!(p.change_times(), &[1.0]);

    let p = param(&[5.0, 5.0, 5.0], &[1.0, 2.0]);
    assert_eq!(p.value(), &[5.0]);
    assert!(p.change_times().is_empty());
}

#[test]
fn test_init_with_mismatched_lengths() {
    assert!(SkylineParameter::new(vec![5.0, 2.0, 3.0], vec![1.0]).is_err());
    assert!(SkylineParameter::new(vec![5.0, 2.0], vec![]).is_err());
}

#[test]
fn test_init_with_negative_change_times() {
    assert!(SkylineParameter::new(vec![5.0, 2.0], vec![-1.0]).is_err());
    assert!(SkylineParameter::new(vec![5.0, 2.0], vec![0.0]).is_err());
}

#[test]
fn test_init_with_unsorted_change_times() {
    assert!(SkylineParameter::new(vec![5.0, 2.0, 3.0], vec![2.0, 1.0]).is_err());
    assert!(SkylineParameter::new(vec![5.0, 2.0, 3.0], vec![1.0, 1.0]).is_err());
}

#[test]
fn test_get_value_at_time() {
    let p = param(&[5.0, 2.0, 3.0], &[1.0, 2.0]);
    assert_eq!(p.value_at_time(0.5), 5.0);
    assert_eq!(p.value_at_time(1.0), 2.0);
    assert_eq!(p.value_at_time(1.5), 2.0);
    assert_eq!(p.value_at_time(2.0), 3.0);
    assert_eq!(p.value_at_time(100.0), 3.0);
}

#[test]
#[should_panic]
fn test_get_value_at_negative_time() {
    let p = SkylineParameter::constant(7.0);
    p.value_at_time(-1.0);
}

#[test]
fn test_parameter_arithmetic() {
    let scalar = 10.0;
    let sp1 = param(&[5.0, 2.0], &[4.0]);
    let sp2 = param(&[3.0, 4.0], &[1.0]);

    assert_eq!(sp1.clone() + scalar, param(&[15.0, 12.0], &[4.0]));
    assert_eq!(scalar + sp1.clone(), param(&[15.0, 12.0], &[4.0]));
    assert_eq!(sp1.clone() + sp2.clone(), param(&[8.0, 9.0, 6.0], &[1.0, 4.0]));

    assert_eq!(sp1.clone() - scalar, param(&[-5.0, -8.0], &[4.0]));
    assert_eq!(scalar - sp1.clone(), param(&[5.0, 8.0], &[4.0]));
    assert_eq!(sp1.clone() - sp2.clone(), param(&[2.0, 1.0, -2.0], &[1.0, 4.0]));

    assert_eq!(sp1.clone() * scalar, param(&[50.0, 20.0], &[4.0]));
    assert_eq!(scalar * sp1.clone(), param(&[50.0, 20.0], &[4.0]));
    assert_eq!(sp1.clone() * sp2.clone(), param(&[15.0, 20.0, 8.0], &[1.0, 4.0]));

    assert_eq!(sp1.clone() / scalar, param(&[0.5, 0.2], &[4.0]));
    assert_eq!(scalar / sp1.clone(), param(&[2.0, 5.0], &[4.0]));
    assert_eq!(sp1 / sp2, param(&[5.0 / 3.0, 1.25, 0.5], &[1.0, 4.0]));
}

#[test]
fn test_operating_merges_change_times() {
    let a = param(&[3.0, 5.0], &[1.0]);
    let b = param(&[2.0, 4.0, 1.0], &[1.0, 3.0]);
    let ab = a * b;
    assert_eq!(ab.value_at_time(0.0), 6.0);
    assert_eq!(ab.value_at_time(1.0), 20.0);
    assert_eq!(ab.value_at_time(3.0), 5.0);
    assert_eq!(ab.change_times(), &[1.0, 3.0]);
}

#[test]
fn test_equality_is_structural_on_canonical_form() {
    assert_eq!(
        SkylineParameter::constant(5.0),
        param(&[5.0, 5.0], &[1.0])
    );
    assert_eq!(param(&[5.0, 4.0], &[1.0]), param(&[5.0, 4.0], &[1.0]));
    assert_ne!(param(&[5.0, 4.0], &[1.0]), param(&[4.0, 5.0], &[1.0]));
}

#[test]
fn test_is_zero() {
    assert!(SkylineParameter::constant(0.0).is_zero());
    assert!(!param(&[0.0, 1.0], &[3.0]).is_zero());
}

#[test]
fn test_parameter_serde_round_trip() {
    let p = param(&[5.0, 2.0], &[4.0]);
    let json = serde_json::to_string(&p).unwrap();
    assert_eq!(json, r#"{"value":[5.0,2.0],"change_times":[4.0]}"#);
    let back: SkylineParameter = serde_json::from_str(&json).unwrap();
    assert_eq!(back, p);

    let constant: SkylineParameter = serde_json::from_str("3.5").unwrap();
    assert_eq!(constant, SkylineParameter::constant(3.5));

    assert!(serde_json::from_str::<SkylineParameter>(
        r#"{"value":[5.0,2.0],"change_times":[-1.0]}"#
    )
    .is_err());
}

#[test]
fn test_skyline_parameter_factory() {
    assert_eq!(skyline_parameter(5.0).unwrap(), SkylineParameter::constant(5.0));
    let p = param(&[5.0, 2.0], &[4.0]);
    assert_eq!(skyline_parameter(p.clone()).unwrap(), p);
}

#[test]
fn test_vector_from_piecewise() {
    let v = SkylineVector::from_piecewise(vec![vec![5.0, 2.0], vec![3.0, 4.0]], vec![1.0])
        .unwrap();
    assert_eq!(v.len(), 2);
    assert_eq!(v[0], param(&[5.0, 3.0], &[1.0]));
    assert_eq!(v[1], param(&[2.0, 4.0], &[1.0]));
    assert_eq!(v.change_times(), vec![1.0]);
    assert_eq!(v.value_at_time(0.0), vec![5.0, 2.0]);
    assert_eq!(v.value_at_time(1.0), vec![3.0, 4.0]);
}

#[test]
fn test_vector_from_piecewise_errors() {
    assert!(SkylineVector::from_piecewise(
        vec![vec![5.0, 2.0], vec![4.0, 2.0], vec![4.0, 5.0], vec![4.0, 2.0]],
        vec![1.0, 2.0]
    )
    .is_err());
    assert!(
        SkylineVector::from_piecewise(vec![vec![5.0, 2.0], vec![3.0]], vec![1.0]).is_err()
    );
    assert!(SkylineVector::from_piecewise(vec![vec![5.0, 2.0]], vec![-1.0]).is_err());
}

#[test]
fn test_vector_change_times_are_the_union() {
    let v = SkylineVector::new(vec![
        param(&[5.0, 2.0], &[4.0]),
        param(&[3.0, 4.0], &[1.0]),
        SkylineParameter::constant(5.0),
    ])
    .unwrap();
    assert_eq!(v.change_times(), vec![1.0, 4.0]);
    assert_eq!(v.value_at_time(0.0), vec![5.0, 3.0, 5.0]);
    assert_eq!(v.value_at_time(1.0), vec![5.0, 4.0, 5.0]);
    assert_eq!(v.value_at_time(4.0), vec![2.0, 4.0, 5.0]);
}

#[test]
fn test_vector_arithmetic() {
    let scalar = 10.0;
    let sp = param(&[5.0, 2.0], &[4.0]);
    let sv1 =
        SkylineVector::from_piecewise(vec![vec![3.0, 4.0], vec![4.0, 5.0]], vec![1.0]).unwrap();
    let sv2 =
        SkylineVector::from_piecewise(vec![vec![4.0, 2.0], vec![3.0, 1.0]], vec![2.0]).unwrap();

    assert_eq!(
        sv1.clone() + scalar,
        SkylineVector::from_piecewise(vec![vec![13.0, 14.0], vec![14.0, 15.0]], vec![1.0])
            .unwrap()
    );
    assert_eq!(
        scalar - sv1.clone(),
        SkylineVector::from_piecewise(vec![vec![7.0, 6.0], vec![6.0, 5.0]], vec![1.0]).unwrap()
    );
    assert_eq!(
        sp.clone() + sv1.clone(),
        SkylineVector::from_piecewise(
            vec![vec![8.0, 9.0], vec![9.0, 10.0], vec![6.0, 7.0]],
            vec![1.0, 4.0]
        )
        .unwrap()
    );
    assert_eq!(
        sv1.clone() * sp,
        SkylineVector::from_piecewise(
            vec![vec![15.0, 20.0], vec![20.0, 25.0], vec![8.0, 10.0]],
            vec![1.0, 4.0]
        )
        .unwrap()
    );
    assert_eq!(
        sv1.clone() + sv2.clone(),
        SkylineVector::from_piecewise(
            vec![vec![7.0, 6.0], vec![8.0, 7.0], vec![7.0, 6.0]],
            vec![1.0, 2.0]
        )
        .unwrap()
    );
    assert_eq!(
        sv1 / sv2,
        SkylineVector::from_piecewise(
            vec![
                vec![0.75, 2.0],
                vec![1.0, 2.5],
                vec![4.0 / 3.0, 5.0]
            ],
            vec![1.0, 2.0]
        )
        .unwrap()
    );
}

#[test]
#[should_panic]
fn test_vector_length_mismatch_panics() {
    let a = SkylineVector::splat(SkylineParameter::constant(1.0), 2).unwrap();
    let b = SkylineVector::splat(SkylineParameter::constant(1.0), 3).unwrap();
    let _ = a + b;
}

#[test]
fn test_skyline_vector_factory() {
    let p = param(&[5.0, 2.0], &[1.0]);
    assert_eq!(
        skyline_vector(p.clone(), 3).unwrap(),
        SkylineVector::splat(p.clone(), 3).unwrap()
    );
    assert_eq!(
        skyline_vector(5.0, 4).unwrap(),
        SkylineVector::splat(SkylineParameter::constant(5.0), 4).unwrap()
    );
    let v = skyline_vector(vec![p.clone(), SkylineParameter::constant(5.0)], 2).unwrap();
    assert_eq!(v[0], p);
    assert_eq!(v[1], SkylineParameter::constant(5.0));

    assert!(skyline_vector(5.0, 0).is_err());
    assert!(skyline_vector(vec![5.0, 6.0, 8.0], 2).is_err());
    let existing = SkylineVector::splat(SkylineParameter::constant(1.0), 2).unwrap();
    assert!(skyline_vector(VectorSpec::from(existing.clone()), 3).is_err());
    assert_eq!(skyline_vector(VectorSpec::from(existing.clone()), 2).unwrap(), existing);
}

#[test]
fn test_broadcast_matrix_of_constants() {
    let m = skyline_matrix(5.0, 3, 2).unwrap();
    assert_eq!(m.num_rows(), 3);
    assert_eq!(m.num_cols(), 2);
    assert!(m.change_times().is_empty());
    assert_eq!(
        m.value_at_time(0.0),
        vec![vec![5.0, 5.0], vec![5.0, 5.0], vec![5.0, 5.0]]
    );
}

fn matrix(rows: Vec<Vec<f64>>) -> SkylineMatrix {
    SkylineMatrix::new(
        rows.into_iter()
            .map(|row| {
                SkylineVector::new(row.into_iter().map(SkylineParameter::constant).collect())
                    .unwrap()
            })
            .collect(),
    )
    .unwrap()
}

#[test]
fn test_matrix_scalar_and_parameter_arithmetic() {
    let m = matrix(vec![vec![4.0, 2.0], vec![3.0, 1.0]]);
    let shifted = m.clone() + 10.0;
    assert_eq!(
        shifted.value_at_time(0.0),
        vec![vec![14.0, 12.0], vec![13.0, 11.0]]
    );

    let sp = param(&[5.0, 2.0], &[4.0]);
    let scaled = sp - m;
    assert_eq!(scaled.change_times(), vec![4.0]);
    assert_eq!(
        scaled.value_at_time(0.0),
        vec![vec![1.0, 3.0], vec![2.0, 4.0]]
    );
    assert_eq!(
        scaled.value_at_time(4.0),
        vec![vec![-2.0, 0.0], vec![-1.0, 1.0]]
    );
}

#[test]
fn test_square_matrix_broadcast_prefers_rows() {
    // With a square matrix, entry i of the vector applies to row i.
    let v = SkylineVector::from_piecewise(vec![vec![3.0, 4.0]], vec![]).unwrap();
    let m = matrix(vec![vec![4.0, 2.0], vec![3.0, 1.0]]);
    let sum = v + m;
    assert_eq!(
        sum.value_at_time(0.0),
        vec![vec![7.0, 5.0], vec![7.0, 5.0]]
    );
}

#[test]
fn test_rectangular_matrix_broadcasts_by_matching_dimension() {
    let m = matrix(vec![vec![1.0, 2.0, 3.0], vec![4.0, 5.0, 6.0]]);

    let per_row = SkylineVector::from_piecewise(vec![vec![10.0, 20.0]], vec![]).unwrap();
    assert_eq!(
        (m.clone() + per_row).value_at_time(0.0),
        vec![vec![11.0, 12.0, 13.0], vec![24.0, 25.0, 26.0]]
    );

    let per_col =
        SkylineVector::from_piecewise(vec![vec![100.0, 200.0, 300.0]], vec![]).unwrap();
    assert_eq!(
        (m + per_col).value_at_time(0.0),
        vec![vec![101.0, 202.0, 303.0], vec![104.0, 205.0, 306.0]]
    );
}

#[test]
#[should_panic]
fn test_matrix_vector_shape_mismatch_panics() {
    let m = matrix(vec![vec![1.0, 2.0, 3.0], vec![4.0, 5.0, 6.0]]);
    let v = SkylineVector::from_piecewise(vec![vec![1.0, 2.0, 3.0, 4.0]], vec![]).unwrap();
    let _ = m + v;
}

#[test]
fn test_skyline_matrix_factory() {
    let p = param(&[5.0, 2.0], &[1.0]);
    let m = skyline_matrix(p.clone(), 2, 3).unwrap();
    assert_eq!(m.get(1, 2), &p);

    let per_row = SkylineVector::new(vec![p.clone(), SkylineParameter::constant(7.0)]).unwrap();
    let m = skyline_matrix(per_row, 2, 2).unwrap();
    assert_eq!(m.get(0, 1), &p);
    assert_eq!(m.get(1, 0), &SkylineParameter::constant(7.0));

    let m = skyline_matrix(vec![vec![1.0, 2.0], vec![3.0, 4.0]], 2, 2).unwrap();
    assert_eq!(m.get(1, 0), &SkylineParameter::constant(3.0));

    assert!(skyline_matrix(5.0, 0, 2).is_err());
    assert!(skyline_matrix(vec![vec![1.0], vec![2.0]], 2, 2).is_err());
    assert!(skyline_matrix(vec![vec![1.0, 2.0]], 2, 2).is_err());
}

prop_compose! {
    fn arb_parameter()(
        change_times in proptest::collection::vec(0.01f64..100.0, 0..4),
        values in proptest::collection::vec(-10.0f64..10.0, 5),
    ) -> SkylineParameter {
        let mut change_times = change_times;
        change_times.sort_by(f64::total_cmp);
        change_times.dedup();
        let values = values[..change_times.len() + 1].to_vec();
        SkylineParameter::new(values, change_times).unwrap()
    }
}

proptest! {
    #[test]
    fn prop_canonical_form(p in arb_parameter()) {
        for pair in p.value().windows(2) {
            prop_assert_ne!(pair[0], pair[1]);
        }
        for pair in p.change_times().windows(2) {
            prop_assert!(pair[0] < pair[1]);
        }
        prop_assert_eq!(p.value().len(), p.change_times().len() + 1);
    }

    #[test]
    fn prop_algebra_soundness(
        a in arb_parameter(),
        b in arb_parameter(),
        s in 0.0f64..150.0,
    ) {
        prop_assert_eq!((a.clone() + b.clone()).value_at_time(s), a.value_at_time(s) + b.value_at_time(s));
        prop_assert_eq!((a.clone() - b.clone()).value_at_time(s), a.value_at_time(s) - b.value_at_time(s));
        prop_assert_eq!((a.clone() * b.clone()).value_at_time(s), a.value_at_time(s) * b.value_at_time(s));
    }

    #[test]
    fn prop_broadcasting_commutes_with_lookup(
        k in -5.0f64..5.0,
        a in arb_parameter(),
        b in arb_parameter(),
        s in 0.0f64..150.0,
    ) {
        let v = SkylineVector::new(vec![a, b]).unwrap();
        let expected: Vec<f64> = v.value_at_time(s).iter().map(|x| k + x).collect();
        prop_assert_eq!((k + v.clone()).value_at_time(s), expected.clone());
        prop_assert_eq!((v + k).value_at_time(s), expected);
    }
}
