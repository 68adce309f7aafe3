//! Built-in source lists, fastest responders first.
//!
//! The order comes from watching response times and is never changed at
//! runtime. Websites come before STUN servers because they need no name lookup
//! of their own beyond the HTTP connection.

use crate::address::Family;

use super::ip_source::SourceDescriptor;

pub static IPV4_SOURCES: &[SourceDescriptor] = &[
    SourceDescriptor::website("https://ipv4.icanhazip.com", Family::V4),
    SourceDescriptor::website("https://api.ipify.org", Family::V4),
    SourceDescriptor::website("https://v4.ident.me", Family::V4),
    SourceDescriptor::website("https://ipinfo.io/ip", Family::V4),
    SourceDescriptor::website("https://ipecho.net/plain", Family::V4),
    SourceDescriptor::website_json("https://ipinfo.io/json", "ip", Family::V4),
    SourceDescriptor::stun("stun.l.google.com:19302", Family::V4),
    SourceDescriptor::stun("stun1.l.google.com:19302", Family::V4),
    SourceDescriptor::stun("stun.cloudflare.com:3478", Family::V4),
];

pub static IPV6_SOURCES: &[SourceDescriptor] = &[
    SourceDescriptor::website("https://ipv6.icanhazip.com", Family::V6),
    SourceDescriptor::website("https://api6.ipify.org", Family::V6),
    SourceDescriptor::website("https://v6.ident.me", Family::V6),
    SourceDescriptor::website_json("https://api6.ipify.org?format=json", "ip", Family::V6),
    SourceDescriptor::stun("stun.l.google.com:19302", Family::V6),
    SourceDescriptor::stun("stun.cloudflare.com:3478", Family::V6),
];

pub static ANY_SOURCES: &[SourceDescriptor] = &[
    SourceDescriptor::website("https://icanhazip.com", Family::Any),
    SourceDescriptor::website("https://ifconfig.co/ip", Family::Any),
    SourceDescriptor::website("https://api64.ipify.org", Family::Any),
    SourceDescriptor::website("https://ident.me", Family::Any),
    SourceDescriptor::website("https://ipaddr.site", Family::Any),
    SourceDescriptor::website_json("https://api64.ipify.org?format=json", "ip", Family::Any),
    SourceDescriptor::stun("stun.l.google.com:19302", Family::Any),
];

/// Sites that answer a plain GET with a 2xx and next to no body.
pub static ONLINE_WEB_SERVERS: &[&str] = &[
    "https://www.google.com/generate_204",
    "https://cp.cloudflare.com/generate_204",
    "http://www.msftconnecttest.com/connecttest.txt",
    "https://www.apple.com/library/test/success.html",
];
