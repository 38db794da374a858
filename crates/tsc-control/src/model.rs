//! The decision-model seam.

use log::trace;
use tsc_core::ActionClass;

use crate::observation::BAND_COUNT;
use crate::{ControlError, ControlResult, Observation};

/// A stateless policy mapping an observation to an action class.
///
/// One model is shared by every adaptive controller of a run, so it must be
/// `Send + Sync`.  Any `Fn(&Observation) -> ActionClass` is a model.
///
/// # Example
///
/// ```rust,ignore
/// let always_ns = |_: &Observation| ActionClass::NsThrough;
/// let controller = AdaptiveController::new(topology, config, Arc::new(always_ns))?;
/// ```
pub trait DecisionModel: Send + Sync + 'static {
    fn decide(&self, observation: &Observation) -> ControlResult<ActionClass>;
}

impl<F> DecisionModel for F
where
    F: Fn(&Observation) -> ActionClass + Send + Sync + 'static,
{
    fn decide(&self, observation: &Observation) -> ControlResult<ActionClass> {
        Ok(self(observation))
    }
}

/// Adapter for models that emit a raw action index (e.g. the argmax of a
/// Q-value vector).  Indices outside `0..4` are rejected.
pub struct IndexModel<F>(pub F);

impl<F> DecisionModel for IndexModel<F>
where
    F: Fn(&[f32]) -> usize + Send + Sync + 'static,
{
    fn decide(&self, observation: &Observation) -> ControlResult<ActionClass> {
        let n = (self.0)(observation.as_slice());
        ActionClass::try_from(n).map_err(ControlError::InvalidAction)
    }
}

/// Built-in heuristic: serve the action whose two target movements occupy
/// the most distance bands within `horizon` bands of the stop line.
///
/// Ties go to the lowest action index.
#[derive(Copy, Clone, Debug)]
pub struct OccupancyModel {
    pub horizon: usize,
}

impl Default for OccupancyModel {
    /// Look up to 160 m back (bands 0..8).
    fn default() -> Self {
        Self { horizon: 8 }
    }
}

impl DecisionModel for OccupancyModel {
    fn decide(&self, observation: &Observation) -> ControlResult<ActionClass> {
        let horizon = self.horizon.min(BAND_COUNT);
        let mut best = (ActionClass::NsThrough, 0usize);
        for action in ActionClass::ALL {
            let score: usize = action
                .targets()
                .iter()
                .map(|&m| observation.occupied_bands(m, horizon))
                .sum();
            if score > best.1 {
                best = (action, score);
            }
        }
        trace!("occupancy model: {} (score {})", best.0, best.1);
        Ok(best.0)
    }
}
