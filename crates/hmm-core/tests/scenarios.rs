//! End-to-end scenarios exercising the builder, both re-estimators, and
//! the engine façade together against a single `Hmm`.

use hmm_core::{baum_welch_training, viterbi_training, EdgeName, Hmm};

fn fair_biased_hmm() -> Hmm {
    let mut hmm = Hmm::new(2, 2).unwrap();
    hmm.set_init(&[0.5, 0.5]).unwrap();
    hmm.set_transitions(&[vec![0.9, 0.1], vec![0.1, 0.9]])
        .unwrap();
    hmm.set_symbol_emissions(&[vec![0.5, 0.5], vec![0.1, 0.9]])
        .unwrap();
    hmm.set_observations(&[0, 0, 1, 1, 1, 1, 1, 0, 1, 1])
        .unwrap();
    hmm
}

fn row_sums_to_one(row: &[f64]) {
    let sum: f64 = row.iter().map(|v| v.exp()).sum();
    assert!((sum - 1.0).abs() < 1e-6, "row sums to {sum}, not 1");
}

#[test]
fn fair_biased_coin_one_baum_welch_step_and_viterbi_decode() {
    let mut hmm = fair_biased_hmm();

    let (_, bits) = baum_welch_training(&mut hmm).unwrap();
    assert!(bits.is_finite());
    row_sums_to_one(hmm.init_log().unwrap());
    for row in hmm.trans_log().unwrap() {
        row_sums_to_one(row);
    }
    for row in hmm.symbol_emiss_log().unwrap() {
        row_sums_to_one(row);
    }

    let mut fresh = fair_biased_hmm();
    let (_, predicted) = viterbi_training(&mut fresh).unwrap();
    assert_eq!(predicted.len(), 10);
    // Observations 2..=6 are all `1`s; the biased state should dominate
    // that run even though it need not cover every index in it.
    let run_in_state1 = predicted[2..=6].iter().filter(|&&s| s == 1).count();
    assert!(run_in_state1 >= 3, "predicted states: {predicted:?}");
}

#[test]
fn degenerate_start_is_not_a_no_path() {
    let mut hmm = Hmm::new(2, 2).unwrap();
    hmm.set_init(&[1.0, 0.0]).unwrap();
    hmm.set_transitions(&[vec![0.9, 0.1], vec![0.1, 0.9]])
        .unwrap();
    hmm.set_symbol_emissions(&[vec![0.5, 0.5], vec![0.1, 0.9]])
        .unwrap();
    hmm.set_observations(&[0, 1, 1]).unwrap();
    let (_, predicted) = viterbi_training(&mut hmm).unwrap();
    assert_eq!(predicted[0], 0);
}

#[test]
fn forbidden_trajectory_propagates_as_no_path_from_the_facade() {
    let mut hmm = Hmm::new(2, 2).unwrap();
    hmm.set_init(&[1.0, 0.0]).unwrap();
    hmm.set_transitions(&[vec![1.0, 0.0], vec![0.0, 1.0]])
        .unwrap();
    hmm.set_symbol_emissions(&[vec![1.0, 0.0], vec![0.0, 1.0]])
        .unwrap();
    hmm.set_observations(&[0, 1]).unwrap();
    assert!(matches!(
        viterbi_training(&mut hmm),
        Err(hmm_core::Error::NoPath)
    ));
    assert!(matches!(
        baum_welch_training(&mut hmm),
        Err(hmm_core::Error::NoPath)
    ));
}

#[test]
fn continuous_shift_invariance_holds_bit_for_bit_after_baum_welch() {
    let build = |shift: f64| {
        let mut hmm = Hmm::new(2, 0).unwrap();
        hmm.set_init(&[0.5, 0.5]).unwrap();
        hmm.set_transitions(&[vec![0.6, 0.4], vec![0.3, 0.7]])
            .unwrap();
        let mut rows = vec![
            vec![-0.5, -1.2],
            vec![-0.9, -0.3],
            vec![-0.2, -0.8],
            vec![-1.1, -0.4],
            vec![-0.6, -0.6],
        ];
        for v in &mut rows[2] {
            *v += shift;
        }
        hmm.set_time_emissions(&rows).unwrap();
        hmm
    };

    let mut unshifted = build(0.0);
    let mut shifted = build(1000.0);
    baum_welch_training(&mut unshifted).unwrap();
    baum_welch_training(&mut shifted).unwrap();

    assert_eq!(unshifted.init_log(), shifted.init_log());
    assert_eq!(unshifted.trans_log(), shifted.trans_log());
    assert_eq!(unshifted.state_freqs, shifted.state_freqs);
}

#[test]
fn idempotence_of_convergence() {
    let mut hmm = fair_biased_hmm();
    let mut last_bits = f64::NAN;
    for _ in 0..200 {
        let (changed, bits) = baum_welch_training(&mut hmm).unwrap();
        last_bits = bits;
        if !changed {
            break;
        }
    }
    let (changed, bits) = baum_welch_training(&mut hmm).unwrap();
    assert!(!changed);
    assert!((bits - last_bits).abs() < 1e-9);
}

#[test]
fn pseudocount_fallback_on_never_visited_state() {
    let mut hmm = Hmm::new(2, 2).unwrap();
    hmm.set_init(&[1.0, 0.0]).unwrap();
    hmm.set_transitions(&[vec![1.0, 0.0], vec![0.5, 0.5]])
        .unwrap();
    hmm.set_symbol_emissions(&[vec![0.5, 0.5], vec![0.5, 0.5]])
        .unwrap();
    hmm.set_observations(&[0, 0, 0, 1, 0]).unwrap();
    let (_, predicted) = viterbi_training(&mut hmm).unwrap();
    assert!(!predicted.contains(&1));
    let uniform = (1.0f64 / 2.0).ln();
    assert_eq!(hmm.trans_log().unwrap()[1], vec![uniform, uniform]);
}

#[test]
fn viterbi_best_path_starts_and_ends_correctly() {
    let mut hmm = fair_biased_hmm();
    let g = hmm_core::to_wdag(&hmm).unwrap();
    let path = g.find_best_path().unwrap();
    assert!(matches!(path.edge_names.first(), Some(EdgeName::Start { .. })));
    assert!(matches!(path.edge_names.last(), Some(EdgeName::Finish)));
    let (_, predicted) = viterbi_training(&mut hmm).unwrap();
    assert!(predicted.iter().all(|&s| s < 2));
}
