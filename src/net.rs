//! Local network address discovery for the startup banner.

use std::net::{IpAddr, Ipv4Addr};

use sysinfo::Networks;

/// Returns the first non-loopback IPv4 address from `interfaces`.
///
/// Interfaces are visited in name order so the choice is stable across runs.
pub fn first_external_ipv4<'a, I>(interfaces: I) -> Option<Ipv4Addr>
where
    I: IntoIterator<Item = (&'a str, IpAddr)>,
{
    let mut candidates: Vec<(&str, Ipv4Addr)> = interfaces
        .into_iter()
        .filter_map(|(name, addr)| match addr {
            IpAddr::V4(v4) if !v4.is_loopback() && !v4.is_unspecified() => Some((name, v4)),
            _ => None,
        })
        .collect();
    candidates.sort_by_key(|(name, _)| *name);
    candidates.first().map(|(_, addr)| *addr)
}

/// Scans the host's interfaces for a LAN-reachable IPv4 address.
#[must_use]
pub fn lan_ipv4() -> Option<Ipv4Addr> {
    let networks = Networks::new_with_refreshed_list();
    first_external_ipv4(networks.list().iter().flat_map(|(name, data)| {
        data.ip_networks()
            .iter()
            .map(move |network| (name.as_str(), network.addr))
    }))
}

/// Host name to advertise for LAN access, `localhost` when none is found.
#[must_use]
pub fn lan_host() -> String {
    lan_ipv4().map_or_else(|| "localhost".to_string(), |ip| ip.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv6Addr;

    #[test]
    fn skips_loopback_and_ipv6() {
        let interfaces = [
            ("lo", IpAddr::V4(Ipv4Addr::LOCALHOST)),
            ("eth0", IpAddr::V6(Ipv6Addr::new(0xfe80, 0, 0, 0, 0, 0, 0, 1))),
            ("eth0", IpAddr::V4(Ipv4Addr::new(192, 168, 0, 146))),
        ];
        assert_eq!(
            first_external_ipv4(interfaces),
            Some(Ipv4Addr::new(192, 168, 0, 146))
        );
    }

    #[test]
    fn picks_first_interface_by_name() {
        let interfaces = [
            ("wlan0", IpAddr::V4(Ipv4Addr::new(10, 0, 0, 7))),
            ("eth0", IpAddr::V4(Ipv4Addr::new(192, 168, 1, 20))),
        ];
        assert_eq!(
            first_external_ipv4(interfaces),
            Some(Ipv4Addr::new(192, 168, 1, 20))
        );
    }

    #[test]
    fn none_when_only_internal() {
        let interfaces = [("lo", IpAddr::V4(Ipv4Addr::LOCALHOST))];
        assert_eq!(first_external_ipv4(interfaces), None);
        assert_eq!(first_external_ipv4(Vec::<(&str, IpAddr)>::new()), None);
    }

    #[test]
    fn lan_host_is_never_empty() {
        assert!(!lan_host().is_empty());
    }
}
