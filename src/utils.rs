use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::time::Duration;

use bgp_rs::{Prefix, AFI};
use chrono::{DateTime, TimeZone, Utc};
use ipnetwork::IpNetwork;
use log::warn;

pub const EMPTY_VALUE: &str = "---";

/// Parse a CIDR prefix (E.g. "192.168.0.0/24") with a strict dotted/colon address
///   Host bits may be set, the mask length is required
pub fn parse_cidr(prefix: &str) -> Option<IpNetwork> {
    let i = prefix.find('/')?;
    let (addr, mask) = prefix.split_at(i);
    let mask = &mask[1..]; // Skip remaining '/'
    let addr: IpAddr = addr.parse().ok()?;
    if mask.is_empty() || !mask.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    let length: u8 = mask.parse().ok()?;
    IpNetwork::new(addr, length).ok()
}

/// Convert an IpNetwork (E.g. "192.168.0.0/24") to a bgp_rs::Prefix
///   Host bits are cleared, so "192.168.0.1/24" becomes "192.168.0.0/24"
pub fn prefix_from_network(network: &IpNetwork) -> Prefix {
    let (protocol, octets) = match network {
        IpNetwork::V4(v4) => (AFI::IPV4, v4.network().octets().to_vec()),
        IpNetwork::V6(v6) => (AFI::IPV6, v6.network().octets().to_vec()),
    };
    Prefix {
        protocol,
        length: network.prefix(),
        prefix: octets,
    }
}

/// Recover the address of a bgp_rs::Prefix
///   Prefixes decoded from the wire may carry only the significant octets,
///   so remaining octets are zero-filled
pub fn addr_from_prefix(prefix: &Prefix) -> Option<IpAddr> {
    match prefix.protocol {
        AFI::IPV4 => {
            let mut buffer = [0u8; 4];
            let len = prefix.prefix.len().min(4);
            buffer[..len].clone_from_slice(&prefix.prefix[..len]);
            Some(IpAddr::from(Ipv4Addr::from(buffer)))
        }
        AFI::IPV6 => {
            let mut buffer = [0u8; 16];
            let len = prefix.prefix.len().min(16);
            buffer[..len].clone_from_slice(&prefix.prefix[..len]);
            Some(IpAddr::from(Ipv6Addr::from(buffer)))
        }
        _ => None,
    }
}

/// Split a 32-bit value into its two 16-bit halves joined by `sep`
/// E.g. 65636 -> "1:100"
pub fn u32_to_dotted(value: u32, sep: char) -> String {
    format!("{}{}{}", value >> 16, sep, value & 0xffff)
}

/// Display an ASN, as dotted if it exceeds the 2-byte limit
/// E.g. 4259840100 -> "65000.100"
pub fn asn_to_display(asn: u32) -> String {
    if asn <= u32::from(std::u16::MAX) {
        asn.to_string()
    } else {
        u32_to_dotted(asn, '.')
    }
}

/// Parse a duration string (E.g. "60s", "5m", "1h30m"),
/// falling back to `default` when it can't be parsed
pub fn duration_or_default(value: &str, default: Duration, what: &str) -> Duration {
    match humantime::parse_duration(value.trim()) {
        Ok(duration) if duration > Duration::from_secs(0) => duration,
        _ => {
            warn!(
                "Invalid {} '{}', defaulting to {}",
                what,
                value,
                humantime::format_duration(default)
            );
            default
        }
    }
}

fn fit_with_remainder(dividend: u64, divisor: u64) -> (u64, u64) {
    let fit = dividend / divisor;
    let remainder = dividend % divisor;
    (fit, remainder)
}

/// Given a duration, format like "00:00:00"
pub fn format_elapsed_time(elapsed: chrono::Duration) -> String {
    let elapsed = elapsed.num_seconds().unsigned_abs();
    let (hours, remainder) = fit_with_remainder(elapsed, 3600);
    let (minutes, seconds) = fit_with_remainder(remainder, 60);
    format!("{:02}:{:02}:{:02}", hours, minutes, seconds)
}

/// Given a timestamp, get the elapsed time and return formatted string
pub fn format_time_as_elapsed<Tz>(time: DateTime<Tz>) -> String
where
    Tz: TimeZone,
{
    format_elapsed_time(Utc::now().signed_duration_since(time))
}
