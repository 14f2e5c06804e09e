//! Engine façade: builds a trellis from an [`Hmm`]'s current parameters
//! and data, solves it, and hands the result to the matching
//! re-estimator.

use crate::baum_welch;
use crate::builder::to_wdag;
use crate::error::{Error, Result};
use crate::hmm::Hmm;
use crate::viterbi;

/// Runs one round of Viterbi training: decode the best state path under
/// `hmm`'s current parameters, then hard-reassign `trans_log` and (for
/// discrete models) `symbol_emiss_log` from the path actually taken.
///
/// Returns `(changed, predicted_states)`.
pub fn viterbi_training(hmm: &mut Hmm) -> Result<(bool, Vec<usize>)> {
    if !hmm.has_all_data() {
        return Err(Error::Configuration(
            "cannot run Viterbi training: HMM is missing required parameters or data".to_string(),
        ));
    }
    let g = to_wdag(hmm)?;
    let path = g.find_best_path()?;
    viterbi::reestimate(hmm, &path.edge_names)
}

/// Runs one round of Baum-Welch training: compute forward/backward
/// posteriors under `hmm`'s current parameters, then soft-reassign
/// `init_log`, `trans_log`, and (for discrete models) `symbol_emiss_log`
/// from the posterior mass on every edge.
///
/// Returns `(changed, log_likelihood_bits)`, the log-likelihood
/// expressed in bits rather than the nats used internally — the unit
/// convention the façade exposes to callers.
pub fn baum_welch_training(hmm: &mut Hmm) -> Result<(bool, f64)> {
    if !hmm.has_all_data() {
        return Err(Error::Configuration(
            "cannot run Baum-Welch training: HMM is missing required parameters or data"
                .to_string(),
        ));
    }
    let g = to_wdag(hmm)?;
    let post = g.find_posterior_probs()?;
    let (changed, alpha_nats) = baum_welch::reestimate(hmm, &g, &post)?;
    let alpha_bits = alpha_nats / std::f64::consts::LN_2;
    if !changed {
        tracing::debug!(alpha_bits, "baum-welch converged");
    }
    Ok((changed, alpha_bits))
}
