//! Viterbi re-estimator: hard-assignment parameter update from the
//! single best-path edge-name sequence of a solved trellis.

use crate::error::{Error, Result};
use crate::hmm::Hmm;
use crate::wdag::EdgeName;
use hmm_math::LOG_ZERO;

/// Re-estimates `trans_log` and (for discrete models) `symbol_emiss_log`
/// from the best-path edge names, and sets `state_freqs`.
///
/// `init_log` is intentionally left untouched: a single best path says
/// nothing about the relative likelihood of the states it didn't visit
/// at t=0, so there is no sound way to re-derive it from hard counts.
///
/// Returns `(changed, predicted_states)`, where `changed` is true iff any
/// updated log-probability differs bit-for-bit from its prior value.
pub fn reestimate(hmm: &mut Hmm, path: &[EdgeName]) -> Result<(bool, Vec<usize>)> {
    let n = hmm.n_states();
    let m = hmm.n_symbols();
    let discrete = hmm.is_discrete();

    let mut trans_counts = vec![vec![0u64; n]; n];
    let mut state_counts = vec![0u64; n];
    let mut emiss_counts = vec![vec![0u64; m.max(1)]; n];
    let mut predicted_states = Vec::new();

    for name in path {
        match *name {
            EdgeName::Trans { from, to } => trans_counts[from][to] += 1,
            EdgeName::Emit { state, symbol } => {
                state_counts[state] += 1;
                if discrete {
                    let s = symbol.expect("discrete emission edge must carry a symbol");
                    emiss_counts[state][s] += 1;
                }
                predicted_states.push(state);
            }
            EdgeName::Start { .. } | EdgeName::Finish => {}
        }
    }

    let t_count = hmm
        .n_timepoints()
        .ok_or_else(|| Error::Configuration("HMM has no timepoints to re-estimate from".into()))?;
    if predicted_states.len() != t_count {
        return Err(Error::Numeric(format!(
            "best path carried {} emission edges, expected {t_count}",
            predicted_states.len()
        )));
    }

    let new_trans = counts_to_log_rows(&trans_counts, n);

    let new_symbol_emiss = if discrete {
        Some(counts_to_log_rows(&emiss_counts, m))
    } else {
        None
    };

    let old_trans = hmm.trans_log.clone();
    let old_symbol_emiss = hmm.symbol_emiss_log.clone();

    let mut changed = old_trans.as_ref() != Some(&new_trans);
    if let Some(ref new_se) = new_symbol_emiss {
        changed |= old_symbol_emiss.as_ref() != Some(new_se);
        if state_counts.iter().all(|&c| c == 0) {
            tracing::warn!("Viterbi re-estimation saw no emissions at all; all rows fall back to uniform");
        }
    }

    hmm.trans_log = Some(new_trans);
    if let Some(new_se) = new_symbol_emiss {
        hmm.symbol_emiss_log = Some(new_se);
    }

    hmm.state_freqs = state_counts
        .iter()
        .map(|&c| c as f64 / t_count as f64)
        .collect();
    hmm.ran_viterbi = true;

    Ok((changed, predicted_states))
}

/// Converts a row of integer counts to a log-probability row, falling
/// back to the uniform distribution `log(1/len)` when the row's total is
/// zero, i.e. the source state was never visited on the path.
fn counts_to_log_rows(counts: &[Vec<u64>], row_len: usize) -> Vec<Vec<f64>> {
    counts
        .iter()
        .map(|row| {
            let total: u64 = row.iter().sum();
            if total == 0 {
                vec![(1.0 / row_len as f64).ln(); row_len]
            } else {
                row.iter()
                    .map(|&c| {
                        if c == 0 {
                            LOG_ZERO
                        } else {
                            (c as f64 / total as f64).ln()
                        }
                    })
                    .collect()
            }
        })
        .collect()
}
