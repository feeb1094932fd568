// chatguard: offensive-text classification over HTTP
//
// This is the library root. The binary wires these modules together; the
// integration tests drive them directly with mock scorers.

pub mod artifacts;
pub mod classifier;
pub mod config;
pub mod denylist;
pub mod output;
pub mod status;
pub mod web;
