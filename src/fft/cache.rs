//! Memoizing wrapper around any planner.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tracing::{debug, trace};

use super::planner::{FftPlan, FftPlanner, PlanError, PlanKey};

/// Computes each plan once and hands out the shared result afterwards.
/// Entries are never replaced; failed plans are not cached.
pub struct PlanCache<P> {
    inner: P,
    plans: Mutex<HashMap<PlanKey, Arc<FftPlan>>>,
}

impl<P: FftPlanner> PlanCache<P> {
    pub fn new(inner: P) -> Self {
        Self {
            inner,
            plans: Mutex::new(HashMap::new()),
        }
    }

    pub fn len(&self) -> usize {
        self.plans.lock().map(|plans| plans.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<P: FftPlanner> FftPlanner for PlanCache<P> {
    fn plan(&self, key: &PlanKey) -> Result<Arc<FftPlan>, PlanError> {
        let mut plans = self.plans.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(plan) = plans.get(key) {
            trace!(length = key.length, lines = key.lines, "plan cache hit");
            return Ok(Arc::clone(plan));
        }
        let plan = self.inner.plan(key)?;
        debug!(
            length = key.length,
            lines = key.lines,
            planes = key.planes,
            passes = plan.passes.len(),
            "planned transform"
        );
        plans.insert(key.clone(), Arc::clone(&plan));
        Ok(plan)
    }
}
