//! Datacenter event tag set.
//!
//! Each tag is a distinct Rust type dispatched through `cast!` in the datacenter's
//! [`EventHandler`](wsim_core::handler::EventHandler) implementation, mirroring the fixed CloudSim tag set: resource
//! inquiry, VM lifecycle, cloudlet lifecycle, data staging, ping and the internal re-processing tick.

use serde::Serialize;

// RESOURCE / FREE-PE INQUIRY //////////////////////////////////////////////////////////////////////

#[derive(Clone, Serialize)]
pub struct ResourceCharacteristicsRequest;

#[derive(Clone, Serialize)]
pub struct FreePesRequest;

#[derive(Clone, Serialize)]
pub struct FreePesReply {
    pub free_pes: u32,
}

// VM LIFECYCLE ////////////////////////////////////////////////////////////////////////////////////

#[derive(Clone, Serialize)]
pub struct VmCreate {
    pub vm_id: u32,
    pub ack: bool,
}

#[derive(Clone, Serialize)]
pub struct VmCreateAck {
    pub vm_id: u32,
    pub success: bool,
}

#[derive(Clone, Serialize)]
pub struct VmDestroy {
    pub vm_id: u32,
    pub ack: bool,
}

#[derive(Clone, Serialize)]
pub struct VmDestroyAck {
    pub vm_id: u32,
    pub success: bool,
}

#[derive(Clone, Serialize)]
pub struct VmMigrate {
    pub vm_id: u32,
    pub dest_host_id: u32,
    pub ack: bool,
}

#[derive(Clone, Serialize)]
pub struct VmMigrateAck {
    pub vm_id: u32,
    pub success: bool,
}

// CLOUDLET LIFECYCLE //////////////////////////////////////////////////////////////////////////////

#[derive(Clone, Serialize)]
pub struct CloudletSubmit {
    pub cloudlet_id: u64,
    pub vm_id: u32,
    pub ack: bool,
}

#[derive(Clone, Serialize)]
pub struct CloudletSubmitAck {
    pub cloudlet_id: u64,
    pub success: bool,
}

#[derive(Clone, Serialize)]
pub struct CloudletCancel {
    pub cloudlet_id: u64,
}

#[derive(Clone, Serialize)]
pub struct CloudletPause {
    pub cloudlet_id: u64,
    pub ack: bool,
}

#[derive(Clone, Serialize)]
pub struct CloudletPauseAck {
    pub cloudlet_id: u64,
    pub success: bool,
}

#[derive(Clone, Serialize)]
pub struct CloudletResume {
    pub cloudlet_id: u64,
    pub ack: bool,
}

#[derive(Clone, Serialize)]
pub struct CloudletResumeAck {
    pub cloudlet_id: u64,
    pub success: bool,
}

#[derive(Clone, Serialize)]
pub struct CloudletMove {
    pub cloudlet_id: u64,
    pub dest_vm_id: u32,
    pub dest_datacenter: Option<usize>,
}

/// Delivered back to the submitting scheduler when a cloudlet leaves the exec/finished lists, whatever the reason.
#[derive(Clone, Serialize)]
pub struct CloudletReturn {
    pub cloudlet_id: u64,
}

#[derive(Clone, Serialize)]
pub struct CloudletStatusRequest {
    pub cloudlet_id: u64,
}

// DATA STAGING ////////////////////////////////////////////////////////////////////////////////////

#[derive(Clone, Serialize)]
pub struct DataAdd {
    pub file_name: String,
    pub size: u64,
    pub vm_id: Option<u32>,
}

#[derive(Clone, Serialize)]
pub struct DataDelete {
    pub file_name: String,
    pub vm_id: Option<u32>,
}

// PING (ambient) //////////////////////////////////////////////////////////////////////////////////

#[derive(Clone, Serialize)]
pub struct Ping {
    pub hops: Vec<usize>,
    pub sent_time: f64,
}

#[derive(Clone, Serialize)]
pub struct PingReply {
    pub hops: Vec<usize>,
    pub sent_time: f64,
}

// INTERNAL ////////////////////////////////////////////////////////////////////////////////////////

/// Internal re-processing tick (`VM_DATACENTER_EVENT` in the CloudSim source). Several of these may be in flight
/// at once; each just re-runs `update_cloudlet_processing` for whatever has changed by then.
#[derive(Clone, Serialize)]
pub struct DatacenterTick;
