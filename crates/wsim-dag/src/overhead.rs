//! Dispatch/queue/post/cluster-assembly delay model built on top of [`DistributionGenerator`] (§4.4, §4.7).
//!
//! Each of the four delays is drawn from its own generator so that, e.g., reconfiguring the queue delay's
//! distribution doesn't perturb the WED delay's random stream.

use crate::distribution::DistributionGenerator;
use crate::parsers::config::OverheadParams;

/// Owns one [`DistributionGenerator`] per overhead kind, seeded independently off the run seed.
pub struct OverheadModel {
    wed: DistributionGenerator,
    queue: DistributionGenerator,
    post: DistributionGenerator,
    cluster: DistributionGenerator,
    wed_interval: usize,
}

impl OverheadModel {
    pub fn new(params: &OverheadParams, seed: u64) -> Self {
        Self {
            wed: DistributionGenerator::new(params.wed_delay, seed ^ 0x5ED),
            queue: DistributionGenerator::new(params.queue_delay, seed ^ 0x9EE0E),
            post: DistributionGenerator::new(params.post_delay, seed ^ 0x90591),
            cluster: DistributionGenerator::new(params.cluster_delay, seed ^ 0xC105),
            wed_interval: params.wed_interval,
        }
    }

    /// Workflow-engine dispatch delay, applied once per batch of ready jobs released to a scheduler.
    pub fn wed_delay(&mut self) -> f64 {
        self.wed.sample()
    }

    /// Scheduler's per-job queueing delay, applied before a job is actually submitted to its datacenter.
    pub fn queue_delay(&mut self) -> f64 {
        self.queue.sample()
    }

    /// Scheduler's per-job post-processing delay, applied before a completed job's return is forwarded
    /// back to the workflow engine.
    pub fn post_delay(&mut self) -> f64 {
        self.post.sample()
    }

    /// Clustering engine's per-job assembly delay, applied once per job minted (including reclustered
    /// replacements).
    pub fn cluster_delay(&mut self) -> f64 {
        self.cluster.sample()
    }

    /// Maximum number of ready jobs the workflow engine releases to a scheduler in one batch.
    pub fn wed_interval(&self) -> usize {
        self.wed_interval
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::distribution::DistributionSpec;

    #[test]
    fn distinct_kinds_draw_from_independent_streams() {
        let params = OverheadParams {
            wed_delay: DistributionSpec::Constant(1.),
            queue_delay: DistributionSpec::Constant(2.),
            post_delay: DistributionSpec::Constant(3.),
            cluster_delay: DistributionSpec::Constant(4.),
            wed_interval: 5,
        };
        let mut model = OverheadModel::new(&params, 42);
        assert_eq!(model.wed_delay(), 1.);
        assert_eq!(model.queue_delay(), 2.);
        assert_eq!(model.post_delay(), 3.);
        assert_eq!(model.cluster_delay(), 4.);
        assert_eq!(model.wed_interval(), 5);
    }

    #[test]
    fn default_zero_overhead_never_delays_anything() {
        let mut model = OverheadModel::new(&OverheadParams::default(), 1);
        assert_eq!(model.wed_delay(), 0.);
        assert_eq!(model.queue_delay(), 0.);
        assert_eq!(model.post_delay(), 0.);
        assert_eq!(model.cluster_delay(), 0.);
    }
}
