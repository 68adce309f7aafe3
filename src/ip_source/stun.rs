//! Public address discovery with a STUN (RFC 5389) binding request.
//!
//! We send a single Binding Request over UDP and read the address the server
//! saw us coming from out of the Binding Success Response.

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};
use std::time::Duration;

use async_trait::async_trait;
use tokio::net::{lookup_host, UdpSocket};
use tokio::time::timeout;
use tracing::trace;

use crate::address::{validate, Family};
use crate::ResolveError;

use super::ip_source::IPSource;

const BINDING_REQUEST: u16 = 0x0001;
const BINDING_SUCCESS: u16 = 0x0101;
const MAGIC_COOKIE: u32 = 0x2112_A442;
const HEADER_LEN: usize = 20;

const ATTR_MAPPED_ADDRESS: u16 = 0x0001;
const ATTR_XOR_MAPPED_ADDRESS: u16 = 0x0020;
/// Used by servers that predate the final RFC 5389 numbering.
const ATTR_XOR_MAPPED_ADDRESS_OLD: u16 = 0x8020;

const ADDRESS_FAMILY_V4: u8 = 0x01;
const ADDRESS_FAMILY_V6: u8 = 0x02;

pub(crate) type TransactionId = [u8; 12];

pub(crate) struct IPSourceStun {
    pub(crate) server: String,
    pub(crate) family: Family,
    pub(crate) timeout: Duration,
}

pub(crate) fn binding_request(transaction_id: &TransactionId) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(HEADER_LEN);
    bytes.extend(BINDING_REQUEST.to_be_bytes());
    // no attributes
    bytes.extend(0u16.to_be_bytes());
    bytes.extend(MAGIC_COOKIE.to_be_bytes());
    bytes.extend(transaction_id);
    bytes
}

fn read_u16(bytes: &[u8], at: usize) -> u16 {
    u16::from_be_bytes([bytes[at], bytes[at + 1]])
}

/// Reads the mapped address out of a binding response. XOR-MAPPED-ADDRESS wins
/// over MAPPED-ADDRESS when a server sends both.
pub(crate) fn parse_binding_response(
    bytes: &[u8],
    transaction_id: &TransactionId,
) -> Result<IpAddr, String> {
    if bytes.len() < HEADER_LEN {
        return Err(format!("reply is only {} bytes long", bytes.len()));
    }
    let message_type = read_u16(bytes, 0);
    if message_type != BINDING_SUCCESS {
        return Err(format!("unexpected message type {:#06x}", message_type));
    }
    if bytes[4..8] != MAGIC_COOKIE.to_be_bytes() {
        return Err("wrong magic cookie".to_string());
    }
    if bytes[8..HEADER_LEN] != transaction_id[..] {
        return Err("reply is for another transaction".to_string());
    }
    let length = read_u16(bytes, 2) as usize;
    let body = bytes
        .get(HEADER_LEN..HEADER_LEN + length)
        .ok_or_else(|| "reply is shorter than its header says".to_string())?;

    let mut mapped = None;
    let mut offset = 0;
    while offset + 4 <= body.len() {
        let attr_type = read_u16(body, offset);
        let attr_len = read_u16(body, offset + 2) as usize;
        let value = body
            .get(offset + 4..offset + 4 + attr_len)
            .ok_or_else(|| format!("attribute {:#06x} is truncated", attr_type))?;
        match attr_type {
            ATTR_XOR_MAPPED_ADDRESS | ATTR_XOR_MAPPED_ADDRESS_OLD => {
                return decode_address(value, Some(transaction_id));
            }
            ATTR_MAPPED_ADDRESS => mapped = Some(decode_address(value, None)?),
            _ => trace!("skipping STUN attribute {:#06x}", attr_type),
        }
        // values are padded to a multiple of 4 bytes
        offset += 4 + (attr_len + 3) / 4 * 4;
    }
    mapped.ok_or_else(|| "reply has no mapped address".to_string())
}

/// Decodes a (XOR-)MAPPED-ADDRESS value. With a transaction id the address is
/// XOR'ed with the magic cookie followed by the transaction id.
fn decode_address(value: &[u8], xor_with: Option<&TransactionId>) -> Result<IpAddr, String> {
    if value.len() < 4 {
        return Err("address attribute is truncated".to_string());
    }
    let mut mask = [0u8; 16];
    if let Some(transaction_id) = xor_with {
        mask[..4].copy_from_slice(&MAGIC_COOKIE.to_be_bytes());
        mask[4..].copy_from_slice(transaction_id);
    }
    let address = &value[4..];
    match value[1] {
        ADDRESS_FAMILY_V4 if address.len() == 4 => {
            let mut octets = [0u8; 4];
            for (i, octet) in octets.iter_mut().enumerate() {
                *octet = address[i] ^ mask[i];
            }
            Ok(IpAddr::V4(Ipv4Addr::from(octets)))
        }
        ADDRESS_FAMILY_V6 if address.len() == 16 => {
            let mut octets = [0u8; 16];
            for (i, octet) in octets.iter_mut().enumerate() {
                *octet = address[i] ^ mask[i];
            }
            Ok(IpAddr::V6(Ipv6Addr::from(octets)))
        }
        family => Err(format!(
            "address family {:#04x} with {} address bytes",
            family,
            address.len()
        )),
    }
}

impl IPSourceStun {
    async fn server_address(&self) -> Result<SocketAddr, ResolveError> {
        let mut candidates = lookup_host(self.server.as_str())
            .await
            .map_err(|error| ResolveError::unreachable(&self.server, error))?;
        candidates
            .find(|candidate| self.family.matches(&candidate.ip()))
            .ok_or_else(|| {
                ResolveError::unreachable(&self.server, format!("no {} address", self.family))
            })
    }

    async fn exchange(&self) -> Result<IpAddr, ResolveError> {
        let server = self.server_address().await?;
        let local: SocketAddr = match server {
            SocketAddr::V4(_) => (Ipv4Addr::UNSPECIFIED, 0).into(),
            SocketAddr::V6(_) => (Ipv6Addr::UNSPECIFIED, 0).into(),
        };
        let socket = UdpSocket::bind(local)
            .await
            .map_err(|error| ResolveError::unreachable(&self.server, error))?;
        socket
            .connect(server)
            .await
            .map_err(|error| ResolveError::unreachable(&self.server, error))?;

        let transaction_id: TransactionId = rand::random();
        socket
            .send(&binding_request(&transaction_id))
            .await
            .map_err(|error| ResolveError::unreachable(&self.server, error))?;

        let mut buffer = [0u8; 1024];
        let received = socket
            .recv(&mut buffer)
            .await
            .map_err(|error| ResolveError::unreachable(&self.server, error))?;

        parse_binding_response(&buffer[..received], &transaction_id)
            .map_err(|reason| ResolveError::malformed(&self.server, reason))
    }
}

#[async_trait]
impl IPSource for IPSourceStun {
    fn name(&self) -> &str {
        &self.server
    }

    async fn get_ip(&self) -> Result<String, ResolveError> {
        // one deadline for the lookup and the whole exchange
        let ip = timeout(self.timeout, self.exchange())
            .await
            .map_err(|_| ResolveError::unreachable(&self.server, "timed out"))??;
        validate(&ip.to_string(), self.family)
            .map_err(|reason| ResolveError::malformed(&self.server, reason))
    }
}

#[cfg(test)]
mod tests {
    use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};
    use std::time::{Duration, Instant};

    use tokio::net::UdpSocket;

    use super::{
        binding_request, parse_binding_response, IPSource, IPSourceStun, TransactionId,
        MAGIC_COOKIE,
    };
    use crate::address::Family;
    use crate::ResolveError;

    const TRANSACTION: TransactionId = [1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12];

    fn xor_mapped_v4(ip: Ipv4Addr, port: u16) -> Vec<u8> {
        let cookie = MAGIC_COOKIE.to_be_bytes();
        let mut value = vec![0, 0x01];
        value.extend((port ^ 0x2112).to_be_bytes());
        for (i, octet) in ip.octets().iter().enumerate() {
            value.push(octet ^ cookie[i]);
        }
        value
    }

    fn xor_mapped_v6(ip: Ipv6Addr, transaction_id: &TransactionId) -> Vec<u8> {
        let mut mask = MAGIC_COOKIE.to_be_bytes().to_vec();
        mask.extend(transaction_id);
        let mut value = vec![0, 0x02, 0, 0];
        for (i, octet) in ip.octets().iter().enumerate() {
            value.push(octet ^ mask[i]);
        }
        value
    }

    fn response(transaction_id: &TransactionId, attributes: &[(u16, Vec<u8>)]) -> Vec<u8> {
        let mut body = Vec::new();
        for (attr_type, value) in attributes {
            body.extend(attr_type.to_be_bytes());
            body.extend((value.len() as u16).to_be_bytes());
            body.extend(value);
            while body.len() % 4 != 0 {
                body.push(0);
            }
        }
        let mut bytes = vec![0x01, 0x01];
        bytes.extend((body.len() as u16).to_be_bytes());
        bytes.extend(MAGIC_COOKIE.to_be_bytes());
        bytes.extend(transaction_id);
        bytes.extend(body);
        bytes
    }

    #[test]
    fn request_layout() {
        let request = binding_request(&TRANSACTION);
        let expected = b"\x00\x01\x00\x00\x21\x12\xa4\x42\x01\x02\x03\x04\x05\x06\x07\x08\x09\x0a\x0b\x0c";
        assert_eq!(request, expected);
    }

    #[test]
    fn xor_mapped_address_v4() {
        let bytes = response(
            &TRANSACTION,
            &[(0x0020, xor_mapped_v4(Ipv4Addr::new(69, 89, 31, 226), 54321))],
        );
        assert_eq!(
            parse_binding_response(&bytes, &TRANSACTION).unwrap(),
            IpAddr::V4(Ipv4Addr::new(69, 89, 31, 226))
        );
    }

    #[test]
    fn xor_mapped_address_v6() {
        let ip: Ipv6Addr = "2345:425:2ca1::567:5673:23b5".parse().unwrap();
        let bytes = response(&TRANSACTION, &[(0x8020, xor_mapped_v6(ip, &TRANSACTION))]);
        assert_eq!(
            parse_binding_response(&bytes, &TRANSACTION).unwrap(),
            IpAddr::V6(ip)
        );
    }

    #[test]
    fn skips_unknown_attributes_and_prefers_xor() {
        let software = b"test server".to_vec();
        let plain = vec![0, 0x01, 0x1f, 0x90, 10, 0, 0, 1];
        let bytes = response(
            &TRANSACTION,
            &[
                (0x8022, software),
                (0x0001, plain),
                (0x0020, xor_mapped_v4(Ipv4Addr::new(1, 2, 3, 4), 80)),
            ],
        );
        assert_eq!(
            parse_binding_response(&bytes, &TRANSACTION).unwrap(),
            IpAddr::V4(Ipv4Addr::new(1, 2, 3, 4))
        );
    }

    #[test]
    fn mapped_address_fallback() {
        let plain = vec![0, 0x01, 0x1f, 0x90, 10, 0, 0, 1];
        let bytes = response(&TRANSACTION, &[(0x0001, plain)]);
        assert_eq!(
            parse_binding_response(&bytes, &TRANSACTION).unwrap(),
            IpAddr::V4(Ipv4Addr::new(10, 0, 0, 1))
        );
    }

    #[test]
    fn rejects_bad_replies() {
        let good = response(
            &TRANSACTION,
            &[(0x0020, xor_mapped_v4(Ipv4Addr::new(1, 2, 3, 4), 80))],
        );
        assert!(parse_binding_response(&good[..10], &TRANSACTION).is_err());
        assert!(parse_binding_response(&good[..good.len() - 2], &TRANSACTION).is_err());
        assert!(parse_binding_response(&good, &[0; 12]).is_err());

        let mut error_response = good.clone();
        error_response[1] = 0x11;
        assert!(parse_binding_response(&error_response, &TRANSACTION).is_err());

        let empty = response(&TRANSACTION, &[]);
        assert!(parse_binding_response(&empty, &TRANSACTION).is_err());
    }

    /// Answers a single binding request the way a STUN server would.
    async fn stun_responder(reply_with: Ipv4Addr) -> SocketAddr {
        let socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let address = socket.local_addr().unwrap();
        tokio::spawn(async move {
            let mut buffer = [0u8; 512];
            let (len, peer) = socket.recv_from(&mut buffer).await.unwrap();
            assert_eq!(len, 20);
            let mut transaction_id = [0u8; 12];
            transaction_id.copy_from_slice(&buffer[8..20]);
            let reply = response(
                &transaction_id,
                &[(0x0020, xor_mapped_v4(reply_with, peer.port()))],
            );
            socket.send_to(&reply, peer).await.unwrap();
        });
        address
    }

    #[tokio::test]
    async fn exchange_with_server() {
        let server = stun_responder(Ipv4Addr::new(69, 89, 31, 226)).await;
        let source = IPSourceStun {
            server: server.to_string(),
            family: Family::V4,
            timeout: Duration::from_secs(2),
        };
        assert_eq!(source.get_ip().await.unwrap(), "69.89.31.226");
    }

    #[tokio::test]
    async fn silent_server_times_out() {
        // bound but never answers
        let silent = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let source = IPSourceStun {
            server: silent.local_addr().unwrap().to_string(),
            family: Family::V4,
            timeout: Duration::from_millis(200),
        };
        assert!(matches!(
            source.get_ip().await,
            Err(ResolveError::SourceUnreachable { .. })
        ));
    }

    #[tokio::test]
    async fn whole_exchange_shares_one_deadline() {
        let silent = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let deadline = Duration::from_millis(500);
        let source = IPSourceStun {
            server: silent.local_addr().unwrap().to_string(),
            family: Family::V4,
            timeout: deadline,
        };

        let started = Instant::now();
        let result = source.get_ip().await;
        let elapsed = started.elapsed();

        assert!(matches!(result, Err(ResolveError::SourceUnreachable { .. })));
        assert!(elapsed >= deadline);
        assert!(elapsed < deadline.mul_f32(1.2), "took {:?}", elapsed);
    }

    #[tokio::test]
    async fn server_without_matching_family() {
        let source = IPSourceStun {
            server: "127.0.0.1:3478".to_string(),
            family: Family::V6,
            timeout: Duration::from_millis(200),
        };
        assert!(matches!(
            source.get_ip().await,
            Err(ResolveError::SourceUnreachable { .. })
        ));
    }

    #[tokio::test]
    #[ignore]
    async fn google_stun_test() {
        let source = IPSourceStun {
            server: "stun.l.google.com:19302".to_string(),
            family: Family::V4,
            timeout: Duration::from_secs(2),
        };
        let ip = source.get_ip().await.expect("Failed to get the IP address");
        assert!(ip.parse::<Ipv4Addr>().is_ok());
    }
}
