//! Baum-Welch re-estimator: soft-assignment parameter update from a
//! solved trellis's forward/backward posteriors.

use crate::error::{Error, Result};
use crate::hmm::Hmm;
use crate::wdag::{EdgeName, Posteriors, Wdag};
use hmm_math::{is_log_zero, lnsum, lnsum_all, LOG_ZERO};

/// Re-estimates `init_log`, `trans_log`, and (for discrete models)
/// `symbol_emiss_log` from the edge posteriors of a solved trellis, and
/// sets `state_freqs` to the expected per-state occupancy fraction.
///
/// Unlike [`crate::viterbi::reestimate`], `init_log` is updated here:
/// the start edges' posterior mass is exactly the information needed to
/// re-estimate it, which the Viterbi path alone does not carry.
///
/// Returns `(changed, alpha)`, where `alpha` is the trellis's total
/// log-likelihood in nats (same units as [`Posteriors::alpha`]).
pub fn reestimate(hmm: &mut Hmm, g: &Wdag, post: &Posteriors) -> Result<(bool, f64)> {
    let n = hmm.n_states();
    let m = hmm.n_symbols();
    let discrete = hmm.is_discrete();
    let t_count = hmm
        .n_timepoints()
        .ok_or_else(|| Error::Configuration("HMM has no timepoints to re-estimate from".into()))?;
    let alpha = post.alpha;
    if is_log_zero(alpha) {
        return Err(Error::NoPath);
    }

    let mut new_init = vec![LOG_ZERO; n];
    let mut new_trans = vec![vec![LOG_ZERO; n]; n];
    let mut new_emiss = vec![vec![LOG_ZERO; m.max(1)]; n];
    let mut state_occ = vec![LOG_ZERO; n];
    let mut emit_edge_count = 0usize;

    for v in 0..g.n_nodes() {
        for edge in g.edges_into(v) {
            let p = post.fw[edge.parent] + edge.log_weight + post.bw[v] - alpha;
            if p.is_nan() {
                return Err(Error::Numeric(format!(
                    "NaN posterior mass on edge into node {v} via {:?}",
                    edge.name
                )));
            }
            match edge.name {
                EdgeName::Start { state } => new_init[state] = lnsum(new_init[state], p),
                EdgeName::Trans { from, to } => {
                    new_trans[from][to] = lnsum(new_trans[from][to], p)
                }
                EdgeName::Emit { state, symbol } => {
                    state_occ[state] = lnsum(state_occ[state], p);
                    if let Some(s) = symbol {
                        new_emiss[state][s] = lnsum(new_emiss[state][s], p);
                    }
                    emit_edge_count += 1;
                }
                EdgeName::Finish => {}
            }
        }
    }

    if emit_edge_count != n * t_count {
        return Err(Error::Numeric(format!(
            "trellis carried {emit_edge_count} emission edges, expected {}",
            n * t_count
        )));
    }

    for i in 0..n {
        let row_total = lnsum_all(&new_trans[i]);
        if is_log_zero(row_total) {
            let uniform = (1.0 / n as f64).ln();
            new_trans[i] = vec![uniform; n];
        } else {
            for v in &mut new_trans[i] {
                *v -= row_total;
            }
        }
    }

    let new_symbol_emiss = if discrete {
        let mut rows = new_emiss;
        for i in 0..n {
            if is_log_zero(state_occ[i]) {
                let uniform = (1.0 / m as f64).ln();
                rows[i] = vec![uniform; m];
            } else {
                for v in &mut rows[i] {
                    *v -= state_occ[i];
                }
            }
        }
        Some(rows)
    } else {
        None
    };

    let old_init = hmm.init_log.clone();
    let old_trans = hmm.trans_log.clone();
    let old_symbol_emiss = hmm.symbol_emiss_log.clone();

    let mut changed = old_init.as_ref() != Some(&new_init) || old_trans.as_ref() != Some(&new_trans);
    if let Some(ref new_se) = new_symbol_emiss {
        changed |= old_symbol_emiss.as_ref() != Some(new_se);
    }

    hmm.init_log = Some(new_init);
    hmm.trans_log = Some(new_trans);
    if let Some(new_se) = new_symbol_emiss {
        hmm.symbol_emiss_log = Some(new_se);
    }
    hmm.state_freqs = state_occ
        .iter()
        .map(|&occ| if is_log_zero(occ) { 0.0 } else { occ.exp() / t_count as f64 })
        .collect();
    hmm.ran_baum_welch = true;

    Ok((changed, alpha))
}
