//! Ethernet header construction and the IPv4 subnet rewrite applied on the wire.

use core::fmt;
use std::net::Ipv4Addr;

use crate::error::HeaderError;
use crate::frame::{ETH_ALEN, ETH_HLEN, IPV4_MIN_HEADER_LEN, MIN_TX_LEN};

pub const ETHERTYPE_IPV4: u16 = 0x0800;
pub const ETHERTYPE_ARP: u16 = 0x0806;

/// Offsets within the IPv4 header.
const IPV4_CHECKSUM: usize = 10;
const IPV4_SRC: usize = 12;
const IPV4_DST: usize = 16;
/// Octet of each address whose low bit selects the virtual subnet.
const SUBNET_OCTET: usize = 2;

#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct MacAddr(pub [u8; ETH_ALEN]);

impl MacAddr {
    pub const BROADCAST: Self = Self([0xff; ETH_ALEN]);

    /// The address of the other end of the pair: identical except for the low bit of the last
    /// octet.
    pub const fn peer(self) -> Self {
        let mut octets = self.0;
        octets[ETH_ALEN - 1] ^= 0x01;
        Self(octets)
    }

    pub const fn octets(self) -> [u8; ETH_ALEN] {
        self.0
    }
}

impl fmt::Debug for MacAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:02x}:{:02x}:{:02x}:{:02x}:{:02x}:{:02x}",
            self.0[0], self.0[1], self.0[2], self.0[3], self.0[4], self.0[5]
        )
    }
}

impl fmt::Display for MacAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Write an Ethernet II header for `own` into the start of `frame`.
///
/// Missing hints fall back to `own`. There is no address resolution on the pair, so the
/// destination always has the low bit of its last octet flipped: with no hint that yields the
/// peer's address.
///
/// Returns the header length.
pub fn build_header(
    frame: &mut [u8],
    own: MacAddr,
    ether_type: u16,
    dest: Option<MacAddr>,
    source: Option<MacAddr>,
) -> Result<usize, HeaderError> {
    if frame.len() < ETH_HLEN {
        return Err(HeaderError::Truncated {
            len: frame.len(),
            needed: ETH_HLEN,
        });
    }

    let dst = dest.unwrap_or(own).peer();
    let src = source.unwrap_or(own);
    frame[0..6].copy_from_slice(&dst.0);
    frame[6..12].copy_from_slice(&src.0);
    frame[12..14].copy_from_slice(&ether_type.to_be_bytes());
    Ok(ETH_HLEN)
}

/// Validate the IPv4 header that follows the Ethernet header and return its length in bytes.
pub fn ipv4_header_len(frame: &[u8]) -> Result<usize, HeaderError> {
    if frame.len() < MIN_TX_LEN {
        return Err(HeaderError::Truncated {
            len: frame.len(),
            needed: MIN_TX_LEN,
        });
    }

    let version = frame[ETH_HLEN] >> 4;
    if version != 4 {
        return Err(HeaderError::NotIpv4 { version });
    }
    let ihl = frame[ETH_HLEN] & 0x0f;
    let header_len = usize::from(ihl) * 4;
    if header_len < IPV4_MIN_HEADER_LEN {
        return Err(HeaderError::BadHeaderLength { ihl });
    }
    if frame.len() < ETH_HLEN + header_len {
        return Err(HeaderError::Truncated {
            len: frame.len(),
            needed: ETH_HLEN + header_len,
        });
    }
    Ok(header_len)
}

/// Addresses before and after [`rewrite_ipv4_subnets`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubnetRewrite {
    pub src_before: Ipv4Addr,
    pub dst_before: Ipv4Addr,
    pub src: Ipv4Addr,
    pub dst: Ipv4Addr,
}

/// Move an IPv4-in-Ethernet frame across the pair's two virtual subnets.
///
/// Flips the low bit of the third octet of both the source and destination addresses, then
/// recomputes the header checksum. Applying it twice restores the original frame.
pub fn rewrite_ipv4_subnets(frame: &mut [u8]) -> Result<SubnetRewrite, HeaderError> {
    let header_len = ipv4_header_len(frame)?;
    let ip = &mut frame[ETH_HLEN..ETH_HLEN + header_len];

    let src_before = read_addr(ip, IPV4_SRC);
    let dst_before = read_addr(ip, IPV4_DST);

    ip[IPV4_SRC + SUBNET_OCTET] ^= 0x01;
    ip[IPV4_DST + SUBNET_OCTET] ^= 0x01;

    ip[IPV4_CHECKSUM..IPV4_CHECKSUM + 2].fill(0);
    let csum = ipv4_header_checksum(ip);
    ip[IPV4_CHECKSUM..IPV4_CHECKSUM + 2].copy_from_slice(&csum.to_be_bytes());

    Ok(SubnetRewrite {
        src_before,
        dst_before,
        src: read_addr(ip, IPV4_SRC),
        dst: read_addr(ip, IPV4_DST),
    })
}

/// RFC 1071 checksum over an IPv4 header.
///
/// Computed over a header whose checksum field is zero, the result is the value to store.
/// Computed over a header with a valid checksum in place, the result is zero.
pub fn ipv4_header_checksum(header: &[u8]) -> u16 {
    let mut sum: u32 = 0;
    let mut chunks = header.chunks_exact(2);
    for chunk in &mut chunks {
        sum += u32::from(u16::from_be_bytes([chunk[0], chunk[1]]));
    }
    if let Some(&last) = chunks.remainder().first() {
        sum += u32::from(last) << 8;
    }
    while (sum >> 16) != 0 {
        sum = (sum & 0xFFFF) + (sum >> 16);
    }
    !(sum as u16)
}

fn read_addr(ip: &[u8], offset: usize) -> Ipv4Addr {
    Ipv4Addr::new(ip[offset], ip[offset + 1], ip[offset + 2], ip[offset + 3])
}
