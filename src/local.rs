use std::net::IpAddr;

use tracing::debug;

use crate::ResolveError;

/// Turns the (interface name, address) pairs from the host into address
/// strings, keeping the order the host listed them in.
pub(crate) fn interface_addresses(interfaces: Vec<(String, IpAddr)>) -> Vec<String> {
    interfaces
        .into_iter()
        .map(|(name, ip)| {
            debug!("Interface {} has address {}", name, ip);
            ip.to_string()
        })
        .collect()
}

/// Addresses of every local network interface. Does not touch the network.
pub fn get_local_ips() -> Result<Vec<String>, ResolveError> {
    let interfaces = local_ip_address::list_afinet_netifas()?;
    Ok(interface_addresses(interfaces))
}

/// The hostname this machine is configured with. Does not touch the network.
pub fn get_hostname() -> Result<String, ResolveError> {
    let name = hostname::get().map_err(ResolveError::Hostname)?;
    Ok(name.to_string_lossy().into_owned())
}
