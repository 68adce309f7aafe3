pub mod defaults;
#[allow(clippy::module_inception)]
pub mod ip_source;
pub(crate) mod stun;
pub(crate) mod website;
