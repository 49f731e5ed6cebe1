use std::net::{IpAddr, Ipv6Addr, SocketAddr, TcpListener, ToSocketAddrs};

use anyhow::{Context, Result};
use tracing::{info, warn};
use url::Url;

use crate::config::Config;

/// Port used when no addresses are configured.
pub const DEFAULT_PORT: u16 = 8999;

/// Resolves the configured endpoint URLs into socket addresses.
///
/// Hostnames are resolved via DNS preferring IPv6 addresses, falling back
/// to the IPv4 results when the name has none. An empty address list
/// yields one wildcard endpoint on the default port.
pub fn resolve_endpoints(cfg: &Config) -> Result<Vec<SocketAddr>> {
    let mut endpoints = Vec::new();

    for raw in &cfg.addresses {
        let url = Url::parse(raw).with_context(|| format!("invalid listen address {raw:?}"))?;
        let host = url
            .host_str()
            .with_context(|| format!("listen address {raw:?} has no host"))?;
        let port = url.port_or_known_default().unwrap_or(DEFAULT_PORT);

        // url keeps the brackets on IPv6 literals
        let bare = host.trim_start_matches('[').trim_end_matches(']');
        if let Ok(ip) = bare.parse::<IpAddr>() {
            endpoints.push(SocketAddr::new(ip, port));
            continue;
        }

        let resolved: Vec<SocketAddr> = (host, port)
            .to_socket_addrs()
            .with_context(|| format!("failed to resolve host {host:?}"))?
            .collect();
        let v6: Vec<SocketAddr> = resolved.iter().copied().filter(|a| a.is_ipv6()).collect();
        if v6.is_empty() {
            warn!(host, "No IPv6 address for host, falling back to IPv4");
            endpoints.extend(resolved);
        } else {
            endpoints.extend(v6);
        }
    }

    if endpoints.is_empty() {
        endpoints.push(SocketAddr::new(
            IpAddr::V6(Ipv6Addr::UNSPECIFIED),
            DEFAULT_PORT,
        ));
    }

    endpoints.dedup();
    Ok(endpoints)
}

/// Binds a listener per endpoint. Any bind failure is fatal: a server
/// that cannot listen where it was told to must not come up half-bound.
pub fn bind_endpoints(endpoints: &[SocketAddr], backlog: usize) -> Result<Vec<TcpListener>> {
    let mut listeners = Vec::with_capacity(endpoints.len());

    for endpoint in endpoints {
        let listener =
            TcpListener::bind(endpoint).with_context(|| format!("failed to bind {endpoint}"))?;
        let local = listener
            .local_addr()
            .context("bound listener has no local address")?;
        info!(endpoint = %local, backlog, "Bound to endpoint");
        listeners.push(listener);
    }

    Ok(listeners)
}
