//! Breadth-first scan supervisor.
//!
//! Each round snapshots the frontier, drops addresses already probed,
//! dispatches the rest to a bounded worker pool, and feeds the returned
//! neighbor addresses into the next round. Cancellation is cooperative:
//! the supervisor stops dispatching between rounds and workers return
//! empty-handed on entry; in-flight probes are drained, never aborted.

use std::collections::HashSet;
use std::net::IpAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use ipnetwork::IpNetwork;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{error, warn};

use super::probe;
use super::registry::ScanState;
use crate::config::NetmapConfig;
use crate::db::{GraphStore, LinkUpsert};
use crate::models::DeviceType;

/// Split a community input on commas, trimming whitespace and dropping
/// empties; defaults to ["public"].
pub fn parse_communities(input: &str) -> Vec<String> {
    let communities: Vec<String> = input
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect();
    if communities.is_empty() {
        vec!["public".to_string()]
    } else {
        communities
    }
}

/// Expand a scan target into candidate host addresses. A CIDR enumerates
/// the network's host addresses (network and broadcast skipped below
/// /31); a bare address is probed as-is.
pub fn expand_targets(network: &str) -> Result<Vec<String>> {
    let network = network.trim();
    if !network.contains('/') {
        return Ok(vec![network.to_string()]);
    }

    let parsed: IpNetwork = network
        .parse()
        .with_context(|| format!("invalid network: {network}"))?;
    match parsed {
        IpNetwork::V4(net) => {
            let hosts = if net.prefix() >= 31 {
                net.iter().map(|ip| ip.to_string()).collect()
            } else {
                net.iter()
                    .filter(|ip| *ip != net.network() && *ip != net.broadcast())
                    .map(|ip| ip.to_string())
                    .collect()
            };
            Ok(hosts)
        }
        IpNetwork::V6(_) => anyhow::bail!("IPv6 scan targets are not supported"),
    }
}

/// Run one scan to completion. Always clears the active flag on exit; any
/// error escaping the rounds is logged as a terminal "Scan Error" line.
pub async fn run_scan(
    store: Arc<GraphStore>,
    state: Arc<ScanState>,
    config: Arc<NetmapConfig>,
    map_id: i64,
    network: String,
    community: String,
) {
    if let Err(e) = scan_rounds(&store, &state, &config, map_id, &network, &community).await {
        error!(map_id, error = %e, "scan failed");
        state.log(format!("Scan Error: {e}"));
    }
    state.finish();
}

async fn scan_rounds(
    store: &Arc<GraphStore>,
    state: &Arc<ScanState>,
    config: &Arc<NetmapConfig>,
    map_id: i64,
    network: &str,
    community: &str,
) -> Result<()> {
    let communities = Arc::new(parse_communities(community));
    let workers = Arc::new(Semaphore::new(config.scan.max_workers.max(1)));

    let mut frontier = expand_targets(network)?;
    let mut probed: HashSet<String> = HashSet::new();

    while !frontier.is_empty() {
        if state.is_cancelled() {
            break;
        }

        // Snapshot the round, keeping only never-probed addresses.
        let batch: Vec<String> = frontier
            .drain(..)
            .filter(|ip| probed.insert(ip.clone()))
            .collect();
        if batch.is_empty() {
            break;
        }

        state.log(format!("Probing {} IPs in parallel...", batch.len()));

        let mut round: JoinSet<Vec<String>> = JoinSet::new();
        for ip in batch {
            let workers = workers.clone();
            let store = store.clone();
            let state = state.clone();
            let config = config.clone();
            let communities = communities.clone();
            round.spawn(async move {
                let _permit = match workers.acquire_owned().await {
                    Ok(permit) => permit,
                    Err(_) => return Vec::new(),
                };
                probe_worker(&store, &state, &config, map_id, &ip, &communities).await
            });
        }

        let mut next = Vec::new();
        while let Some(joined) = round.join_next().await {
            let neighbor_ips = joined.context("probe task panicked")?;
            next.extend(neighbor_ips);
        }
        frontier = next;
    }

    state.log("Scan complete.");
    Ok(())
}

/// Probe one address and write its device and links. Store failures are
/// logged per call; the scan continues.
async fn probe_worker(
    store: &GraphStore,
    state: &ScanState,
    config: &NetmapConfig,
    map_id: i64,
    ip: &str,
    communities: &[String],
) -> Vec<String> {
    if state.is_cancelled() {
        return Vec::new();
    }

    let addr: IpAddr = match ip.parse() {
        Ok(addr) => addr,
        Err(_) => {
            warn!(ip, "skipping unparseable address");
            return Vec::new();
        }
    };

    let Some(report) = probe::probe_host(addr, communities, &config.snmp).await else {
        return Vec::new();
    };

    state.log(format!("Found device: {} ({})", report.device.sys_name, ip));

    if let Err(e) = store
        .upsert_device(
            map_id,
            ip,
            &report.device.sys_name,
            &report.device.sys_descr,
            &report.device.sys_object_id,
            DeviceType::Router,
        )
        .await
    {
        error!(map_id, ip, error = %e, "failed to store device");
        state.log(format!("Error storing device {ip}: {e}"));
    }

    let mut neighbor_ips = Vec::new();
    for neighbor in &report.neighbors {
        state.log(format!(
            "  Found Link: {} -> {} ({})",
            ip, neighbor.ip, neighbor.device_type
        ));

        // Stub row so the link has both endpoints even if the neighbor's
        // own probe never happens.
        if let Err(e) = store
            .upsert_device(
                map_id,
                &neighbor.ip,
                &neighbor.sys_name,
                "Discovered via LLDP",
                "Unknown",
                neighbor.device_type,
            )
            .await
        {
            error!(map_id, ip = %neighbor.ip, error = %e, "failed to store neighbor");
            state.log(format!("Error storing device {}: {e}", neighbor.ip));
        }

        let link = LinkUpsert {
            source_ip: ip.to_string(),
            target_ip: neighbor.ip.clone(),
            protocol: "LLDP".to_string(),
            source_port: neighbor.local_port.clone(),
            target_port: neighbor.remote_port.clone(),
            speed: neighbor.speed.clone(),
            status: neighbor.status.clone(),
            source_vlan: neighbor.vlan.clone(),
            // Only the probed side's VLAN is known here; the remote
            // endpoint's own probe fills target_vlan via the mirrored
            // write.
            target_vlan: String::new(),
            source_is_root: neighbor.is_root_port,
            target_is_root: false,
        };
        if let Err(e) = store.upsert_link(map_id, link).await {
            error!(map_id, ip, error = %e, "failed to store link");
            state.log(format!("Error storing link {} -> {}: {e}", ip, neighbor.ip));
        }

        neighbor_ips.push(neighbor.ip.clone());
    }

    neighbor_ips
}
