//! The five simulated entities that make up one experiment run (§4.3, §4.4):
//! `Planner -> ClusteringEngine -> WorkflowEngine -> WorkflowScheduler -> Datacenter`, plus the
//! [`state`] and [`events`] they share.

pub mod clustering;
pub mod datacenter;
pub mod events;
pub mod planner;
pub mod state;
pub mod workflow_engine;
pub mod workflow_scheduler;
