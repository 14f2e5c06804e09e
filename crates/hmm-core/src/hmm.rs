//! HMM parameter store: initial, transition, and emission distributions
//! in log space, plus the readiness bookkeeping the façade asserts on.

use crate::error::{Error, Result};
use hmm_math::is_log_zero;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Tolerance for "probability vector sums to one" and "entry in [0,1]"
/// checks. Lives beside the validation it governs rather than in a
/// separate configuration layer — this crate has no on-disk footprint
/// to configure.
const EPSILON: f64 = 1e-6;

/// A Hidden Markov Model's parameters, stored in log space.
///
/// `n_symbols == 0` selects the continuous variant: emissions are
/// supplied as precomputed per-timepoint log-likelihoods rather than a
/// discrete symbol table.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Hmm {
    n_states: usize,
    n_symbols: usize,

    pub(crate) init_log: Option<Vec<f64>>,
    pub(crate) trans_log: Option<Vec<Vec<f64>>>,
    pub(crate) symbol_emiss_log: Option<Vec<Vec<f64>>>,
    observations: Option<Vec<usize>>,
    /// `[T][N]`, pre-logged by the caller.
    time_emiss_log: Option<Vec<Vec<f64>>>,

    /// Populated by training, real-valued (not log), length `n_states`.
    pub state_freqs: Vec<f64>,

    /// Set once `viterbi_training` has run. Purely observational: callers
    /// may inspect it, but nothing in this crate conditions behavior on it.
    pub ran_viterbi: bool,
    /// Set once `baum_welch_training` has run. Purely observational: callers
    /// may inspect it, but nothing in this crate conditions behavior on it.
    pub ran_baum_welch: bool,
}

impl Hmm {
    /// Creates an empty parameter store for `n_states` hidden states and
    /// `n_symbols` discrete observation symbols (`0` selects the
    /// continuous variant).
    pub fn new(n_states: usize, n_symbols: usize) -> Result<Self> {
        if n_states == 0 {
            return Err(Error::Configuration(
                "n_states must be at least 1".to_string(),
            ));
        }
        Ok(Self {
            n_states,
            n_symbols,
            init_log: None,
            trans_log: None,
            symbol_emiss_log: None,
            observations: None,
            time_emiss_log: None,
            state_freqs: vec![0.0; n_states],
            ran_viterbi: false,
            ran_baum_welch: false,
        })
    }

    pub fn n_states(&self) -> usize {
        self.n_states
    }

    pub fn n_symbols(&self) -> usize {
        self.n_symbols
    }

    pub fn is_discrete(&self) -> bool {
        self.n_symbols > 0
    }

    pub fn init_log(&self) -> Option<&[f64]> {
        self.init_log.as_deref()
    }

    pub fn trans_log(&self) -> Option<&[Vec<f64>]> {
        self.trans_log.as_deref()
    }

    pub fn symbol_emiss_log(&self) -> Option<&[Vec<f64>]> {
        self.symbol_emiss_log.as_deref()
    }

    pub fn observations(&self) -> Option<&[usize]> {
        self.observations.as_deref()
    }

    pub fn time_emiss_log(&self) -> Option<&[Vec<f64>]> {
        self.time_emiss_log.as_deref()
    }

    /// Number of timepoints: `len(observations)` (discrete) or
    /// `rows(time_emiss_log)` (continuous). `None` until the relevant
    /// data is loaded.
    pub fn n_timepoints(&self) -> Option<usize> {
        if self.is_discrete() {
            self.observations.as_ref().map(|o| o.len())
        } else {
            self.time_emiss_log.as_ref().map(|t| t.len())
        }
    }

    /// `init ∧ trans ∧ (discrete ? (symbol_emiss ∧ obs) : time_emiss)`.
    pub fn has_all_data(&self) -> bool {
        let base = self.init_log.is_some() && self.trans_log.is_some();
        if !base {
            return false;
        }
        if self.is_discrete() {
            self.symbol_emiss_log.is_some() && self.observations.is_some()
        } else {
            self.time_emiss_log.is_some()
        }
    }

    /// Sets the initial-state distribution `init_log[i] = log P(state i
    /// at t=0)`.
    pub fn set_init(&mut self, probs: &[f64]) -> Result<()> {
        validate_distribution("init", probs, self.n_states)?;
        self.init_log = Some(probs.iter().map(|p| p.ln()).collect());
        Ok(())
    }

    /// Sets the transition matrix; each row must be a valid distribution
    /// over the `n_states` target states.
    pub fn set_transitions(&mut self, probs: &[Vec<f64>]) -> Result<()> {
        if probs.len() != self.n_states {
            return Err(Error::Configuration(format!(
                "transition matrix must have {} rows, got {}",
                self.n_states,
                probs.len()
            )));
        }
        for (i, row) in probs.iter().enumerate() {
            validate_distribution(&format!("transitions[{i}]"), row, self.n_states)?;
        }
        self.trans_log = Some(
            probs
                .iter()
                .map(|row| row.iter().map(|p| p.ln()).collect())
                .collect(),
        );
        Ok(())
    }

    /// Sets the discrete emission matrix `symbol_emiss_log[i][s]`.
    /// Requires a discrete model (`n_symbols > 0`).
    pub fn set_symbol_emissions(&mut self, probs: &[Vec<f64>]) -> Result<()> {
        if !self.is_discrete() {
            return Err(Error::Configuration(
                "symbol emissions set on a continuous HMM (n_symbols == 0)".to_string(),
            ));
        }
        if probs.len() != self.n_states {
            return Err(Error::Configuration(format!(
                "symbol emission matrix must have {} rows, got {}",
                self.n_states,
                probs.len()
            )));
        }
        for (i, row) in probs.iter().enumerate() {
            validate_distribution(&format!("symbol_emiss[{i}]"), row, self.n_symbols)?;
        }
        self.symbol_emiss_log = Some(
            probs
                .iter()
                .map(|row| row.iter().map(|p| p.ln()).collect())
                .collect(),
        );
        Ok(())
    }

    /// Sets the discrete observation sequence. Requires a discrete model
    /// and every symbol in `[0, n_symbols)`.
    pub fn set_observations(&mut self, obs: &[usize]) -> Result<()> {
        if !self.is_discrete() {
            return Err(Error::Configuration(
                "observations set on a continuous HMM (n_symbols == 0)".to_string(),
            ));
        }
        for (t, &s) in obs.iter().enumerate() {
            if s >= self.n_symbols {
                return Err(Error::Domain(format!(
                    "observation[{t}] = {s} is out of range [0, {})",
                    self.n_symbols
                )));
            }
        }
        self.observations = Some(obs.to_vec());
        Ok(())
    }

    /// Sets the continuous per-timepoint log-likelihoods
    /// `time_emiss_log[t][j]`. Requires a continuous model and rejects
    /// any non-finite entry or entry equal to [`hmm_math::LOG_ZERO`].
    pub fn set_time_emissions(&mut self, log_liks: &[Vec<f64>]) -> Result<()> {
        if self.is_discrete() {
            return Err(Error::Configuration(
                "time emissions set on a discrete HMM (n_symbols > 0)".to_string(),
            ));
        }
        for (t, row) in log_liks.iter().enumerate() {
            if row.len() != self.n_states {
                return Err(Error::Configuration(format!(
                    "time_emiss_log[{t}] must have {} entries, got {}",
                    self.n_states,
                    row.len()
                )));
            }
            for (j, &v) in row.iter().enumerate() {
                if !v.is_finite() {
                    return Err(Error::Domain(format!(
                        "time_emiss_log[{t}][{j}] = {v} is not finite"
                    )));
                }
                if is_log_zero(v) {
                    return Err(Error::Domain(format!(
                        "time_emiss_log[{t}][{j}] is LOG_ZERO, which is not permitted in continuous emissions"
                    )));
                }
            }
        }
        self.time_emiss_log = Some(log_liks.to_vec());
        Ok(())
    }
}

fn validate_distribution(label: &str, probs: &[f64], expected_len: usize) -> Result<()> {
    if probs.len() != expected_len {
        return Err(Error::Configuration(format!(
            "{label} must have {expected_len} entries, got {}",
            probs.len()
        )));
    }
    for (i, &p) in probs.iter().enumerate() {
        if !(0.0..=1.0).contains(&p) {
            return Err(Error::Configuration(format!(
                "{label}[{i}] = {p} is not in [0, 1]"
            )));
        }
    }
    let sum: f64 = probs.iter().sum();
    if (sum - 1.0).abs() > EPSILON.max(EPSILON * probs.len() as f64) {
        return Err(Error::Configuration(format!(
            "{label} sums to {sum}, expected 1.0 within tolerance"
        )));
    }
    Ok(())
}
