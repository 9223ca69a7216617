//! Network model implementations.

pub mod constant;
pub mod topology_aware;

pub use constant::ConstantBandwidthNetworkModel;
pub use topology_aware::TopologyAwareNetworkModel;
