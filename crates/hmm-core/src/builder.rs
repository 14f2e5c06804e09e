//! Trellis builder: unrolls an [`Hmm`] plus observations into a [`Wdag`]
//! whose edge names encode parameter provenance for the re-estimators.

use crate::error::{Error, Result};
use crate::hmm::Hmm;
use crate::wdag::{EdgeName, Wdag};

/// Builds the time-unrolled trellis for `hmm`.
///
/// Produces exactly `2*N*T + 2` nodes: one start node, two `N`-wide
/// layers per timepoint (state-reached, then symbol-emitted), and one
/// end node.
pub fn to_wdag(hmm: &Hmm) -> Result<Wdag> {
    if !hmm.has_all_data() {
        return Err(Error::Configuration(
            "cannot build a trellis: HMM is missing required parameters or data".to_string(),
        ));
    }
    let n = hmm.n_states();
    let t_count = hmm
        .n_timepoints()
        .expect("has_all_data() guarantees a timepoint count");
    if t_count == 0 {
        return Err(Error::Configuration(
            "cannot build a trellis with zero timepoints".to_string(),
        ));
    }

    let init_log = hmm.init_log().expect("has_all_data() guarantees init_log");
    let trans_log = hmm
        .trans_log()
        .expect("has_all_data() guarantees trans_log");

    let mut g = Wdag::new();
    let start = g.add_node();

    let mut a_layers: Vec<Vec<usize>> = Vec::with_capacity(t_count);
    let mut b_layers: Vec<Vec<usize>> = Vec::with_capacity(t_count);
    for _ in 0..t_count {
        let a: Vec<usize> = (0..n).map(|_| g.add_node()).collect();
        let b: Vec<usize> = (0..n).map(|_| g.add_node()).collect();
        a_layers.push(a);
        b_layers.push(b);
    }
    let end = g.add_node();

    g.set_required_start(start);
    g.set_required_end(end);

    for i in 0..n {
        g.add_edge(a_layers[0][i], start, EdgeName::Start { state: i }, init_log[i]);
    }

    for t in 1..t_count {
        for i_prev in 0..n {
            for i in 0..n {
                g.add_edge(
                    a_layers[t][i],
                    b_layers[t - 1][i_prev],
                    EdgeName::Trans {
                        from: i_prev,
                        to: i,
                    },
                    trans_log[i_prev][i],
                );
            }
        }
    }

    if hmm.is_discrete() {
        let symbol_emiss_log = hmm
            .symbol_emiss_log()
            .expect("has_all_data() guarantees symbol_emiss_log for discrete models");
        let observations = hmm
            .observations()
            .expect("has_all_data() guarantees observations for discrete models");
        for t in 0..t_count {
            let obs = observations[t];
            for i in 0..n {
                g.add_edge(
                    b_layers[t][i],
                    a_layers[t][i],
                    EdgeName::Emit {
                        state: i,
                        symbol: Some(obs),
                    },
                    symbol_emiss_log[i][obs],
                );
            }
        }
    } else {
        let time_emiss_log = hmm
            .time_emiss_log()
            .expect("has_all_data() guarantees time_emiss_log for continuous models");
        for (t, row) in time_emiss_log.iter().enumerate() {
            let row_max = row.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
            if row_max != 0.0 {
                tracing::warn!(t, row_max, "clamping continuous emission row by its max");
            }
            for i in 0..n {
                g.add_edge(
                    b_layers[t][i],
                    a_layers[t][i],
                    EdgeName::Emit {
                        state: i,
                        symbol: None,
                    },
                    row[i] - row_max,
                );
            }
        }
    }

    for i in 0..n {
        g.add_edge(end, b_layers[t_count - 1][i], EdgeName::Finish, 0.0);
    }

    tracing::debug!(
        nodes = g.n_nodes(),
        edges = g.n_edges(),
        n_states = n,
        n_timepoints = t_count,
        "built trellis"
    );

    Ok(g)
}

#[cfg(test)]
mod tests {
    use super::*;

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

    #[test]
    fn trellis_has_expected_node_count() {
        let hmm = fair_biased_hmm();
        let g = to_wdag(&hmm).unwrap();
        assert_eq!(g.n_nodes(), 2 * 2 * 10 + 2);
    }

    #[test]
    fn missing_data_is_configuration_error() {
        let hmm = Hmm::new(2, 2).unwrap();
        assert!(matches!(to_wdag(&hmm), Err(Error::Configuration(_))));
    }

    #[test]
    fn degenerate_start_does_not_forbid_best_path() {
        let mut hmm = Hmm::new(2, 2).unwrap();
        hmm.set_init(&[1.0, 0.0]).unwrap();
        hmm.set_transitions(&[vec![0.9, 0.1], vec![0.1, 0.9]])
            .unwrap();
        hmm.set_symbol_emissions(&[vec![0.5, 0.5], vec![0.1, 0.9]])
            .unwrap();
        hmm.set_observations(&[0, 1]).unwrap();
        let g = to_wdag(&hmm).unwrap();
        let path = g.find_best_path().unwrap();
        assert_eq!(path.edge_names[0], crate::wdag::EdgeName::Start { state: 0 });
    }

    #[test]
    fn forbidden_trajectory_is_no_path() {
        // Absorbing states; observing symbol 1 forces a transition out of
        // state 0's zero-probability emission.
        let mut hmm = Hmm::new(2, 2).unwrap();
        hmm.set_init(&[1.0, 0.0]).unwrap();
        hmm.set_transitions(&[vec![1.0, 0.0], vec![0.0, 1.0]])
            .unwrap();
        hmm.set_symbol_emissions(&[vec![1.0, 0.0], vec![0.0, 1.0]])
            .unwrap();
        hmm.set_observations(&[0, 1]).unwrap();
        let g = to_wdag(&hmm).unwrap();
        assert!(matches!(g.find_best_path(), Err(Error::NoPath)));
    }

    #[test]
    fn continuous_shift_invariance_of_alpha_ratio() {
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

        let g0 = to_wdag(&build(0.0)).unwrap();
        let g1 = to_wdag(&build(1000.0)).unwrap();
        let post0 = g0.find_posterior_probs().unwrap();
        let post1 = g1.find_posterior_probs().unwrap();
        // Row-max normalisation absorbs a uniform per-row shift entirely,
        // so the two trellises compute identical alpha.
        assert!((post0.alpha - post1.alpha).abs() < 1e-9);
    }
}
