//! # Serve Command Utilities
//!
//! File: cli/src/commands/serve/utils.rs
//! Author: Christi Mahu
//!
//! ## Overview
//!
//! Startup helpers for the `serve` command:
//! - Local IP address detection for the "Network URL" line
//! - The startup banner summarizing where and how the server runs
//!
//! ## Examples
//!
//! ```rust
//! // Print the banner once the listener is bound
//! utils::print_banner(&config, addr, state.registry.load().len());
//! ```
//!
use super::config::ServerConfig;
use std::net::{IpAddr, SocketAddr};
use tracing::{debug, info};

/// # Get Local IP Address (`get_local_ip`)
///
/// Asks the `local-ip-address` crate for the address of the machine's primary
/// network interface, so users on other machines know which URL to open.
///
/// ## Returns
///
/// * `Option<IpAddr>`: The detected address, or `None` if detection failed or
///   only produced a loopback / unspecified address.
pub fn get_local_ip() -> Option<IpAddr> {
    let ip = match local_ip_address::local_ip() {
        Ok(ip) => ip,
        Err(e) => {
            debug!("Could not determine local network address: {}", e);
            return None;
        }
    };
    // A loopback address is no use to other machines.
    if ip.is_loopback() || ip.is_unspecified() {
        debug!("Ignoring non-routable local address {}", ip);
        return None;
    }
    info!("Detected local network address {}", ip);
    Some(ip)
}

/// # Print Startup Banner (`print_banner`)
///
/// Prints the local (and, when bound to all interfaces, network) URL plus the
/// effective configuration.
///
/// ## Arguments
///
/// * `config`: The merged server configuration.
/// * `addr`: The address the listener is bound to.
/// * `project_count`: Number of records in the registry at startup.
pub fn print_banner(config: &ServerConfig, addr: SocketAddr, project_count: usize) {
    println!("\n=================================================================");
    println!("📦 QFIL Downloader");
    println!("🌐 Local URL:         http://localhost:{}", addr.port());
    // Only worth looking up when other machines can actually connect.
    if addr.ip().is_unspecified() {
        if let Some(ip) = get_local_ip() {
            println!("🔗 Network URL:       http://{}:{}", ip, addr.port());
        }
    }
    println!("⚙️  Binding to address: {}", addr);
    println!(
        "📋 Projects file:     {} ({} registered)",
        config.app.projects_file, project_count
    );
    println!(
        "📁 Package layout:    <project_path>/{}/",
        config.app.package_subdir
    );
    println!(
        "🧹 Cleanup delay:     {}s",
        config.app.cleanup_delay_secs
    );
    println!("🔒 CORS enabled:      {}", config.enable_cors);
    println!("🐞 Debug mode:        {}", config.debug);
    println!("=================================================================\n");
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Whatever the machine's network setup, a loopback address is never reported.
    #[test]
    fn test_get_local_ip_never_returns_loopback() {
        if let Some(ip) = get_local_ip() {
            assert!(!ip.is_loopback());
            assert!(!ip.is_unspecified());
        }
    }
}
