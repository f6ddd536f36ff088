#![allow(dead_code)]

use aero_net_pair::{ipv4_header_checksum, InterfaceId, LinkHost, ETH_HLEN};

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    Stop(InterfaceId),
    Wake(InterfaceId),
}

/// Host that records everything the pair tells it.
#[derive(Debug, Default)]
pub struct Recorder {
    pub delivered: Mutex<Vec<(InterfaceId, Vec<u8>)>>,
    pub signals: Mutex<Vec<Signal>>,
    pub fail_alloc: AtomicBool,
}

impl Recorder {
    pub fn delivered_to(&self, iface: InterfaceId) -> Vec<Vec<u8>> {
        self.delivered
            .lock()
            .unwrap()
            .iter()
            .filter(|(to, _)| *to == iface)
            .map(|(_, frame)| frame.clone())
            .collect()
    }

    pub fn signals(&self) -> Vec<Signal> {
        self.signals.lock().unwrap().clone()
    }

    /// Signals recorded so far, clearing the log.
    pub fn take_signals(&self) -> Vec<Signal> {
        std::mem::take(&mut *self.signals.lock().unwrap())
    }
}

impl LinkHost for Recorder {
    fn deliver(&self, iface: InterfaceId, frame: Vec<u8>) {
        self.delivered.lock().unwrap().push((iface, frame));
    }

    fn queue_stop(&self, iface: InterfaceId) {
        self.signals.lock().unwrap().push(Signal::Stop(iface));
    }

    fn queue_wake(&self, iface: InterfaceId) {
        self.signals.lock().unwrap().push(Signal::Wake(iface));
    }

    fn alloc_rx_buffer(&self, _iface: InterfaceId, len: usize) -> Option<Vec<u8>> {
        if self.fail_alloc.load(Ordering::SeqCst) {
            return None;
        }
        Some(Vec::with_capacity(len))
    }
}

/// IPv4-in-Ethernet frame of `len` bytes from `src` to `dst`, with `tag` written right after a
/// 20-byte IP header. The header checksum is valid.
pub fn ipv4_frame(len: usize, src: [u8; 4], dst: [u8; 4], tag: u8) -> Vec<u8> {
    let mut frame = vec![0u8; len];
    frame[0..6].copy_from_slice(b"\0SNUL1");
    frame[6..12].copy_from_slice(b"\0SNUL0");
    frame[12..14].copy_from_slice(&0x0800u16.to_be_bytes());
    let ip = &mut frame[ETH_HLEN..];
    ip[0] = 0x45;
    ip[2..4].copy_from_slice(&((len - ETH_HLEN) as u16).to_be_bytes());
    ip[8] = 64;
    ip[9] = 17;
    ip[12..16].copy_from_slice(&src);
    ip[16..20].copy_from_slice(&dst);
    let csum = ipv4_header_checksum(&ip[..20]);
    ip[10..12].copy_from_slice(&csum.to_be_bytes());
    if len > ETH_HLEN + 20 {
        ip[20] = tag;
    }
    frame
}

pub fn ip_src(frame: &[u8]) -> [u8; 4] {
    frame[ETH_HLEN + 12..ETH_HLEN + 16].try_into().unwrap()
}

pub fn ip_dst(frame: &[u8]) -> [u8; 4] {
    frame[ETH_HLEN + 16..ETH_HLEN + 20].try_into().unwrap()
}
