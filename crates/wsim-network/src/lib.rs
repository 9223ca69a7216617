#![warn(missing_docs)]
#![doc = include_str!("../README.md")]

pub mod brite;
pub mod link;
pub mod model;
pub mod models;
pub mod network;
pub mod node;
pub mod routing;
pub mod topology;

pub use link::{BandwidthSharingPolicy, Link, LinkId};
pub use model::{DataTransfer, DataTransferCompleted, NetworkModel};
pub use network::{Message, MessageDelivered, Network};
pub use node::{Node, NodeId};
pub use topology::Topology;
