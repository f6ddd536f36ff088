use crate::{
    ipv4_header_checksum, rewrite_ipv4_subnets, InterfaceId, InterfacePair, LinkHost, PairConfig,
    ETH_HLEN, IPV4_MIN_HEADER_LEN,
};
use proptest::prelude::*;
use proptest::test_runner::TestCaseResult;

use std::sync::Mutex;

#[derive(Debug, Clone)]
enum Op {
    Transmit { from: InterfaceId, len: usize },
    Poll { iface: InterfaceId, budget: usize },
    RxInterrupts { iface: InterfaceId, enabled: bool },
    Close(InterfaceId),
    Open(InterfaceId),
}

const MAX_OPS: usize = 96;
const SEQ_OFFSET: usize = ETH_HLEN + IPV4_MIN_HEADER_LEN;
const MIN_FRAME: usize = SEQ_OFFSET + 4;

#[derive(Default)]
struct Capture {
    delivered: Mutex<Vec<(InterfaceId, Vec<u8>)>>,
}

impl LinkHost for Capture {
    fn deliver(&self, iface: InterfaceId, frame: Vec<u8>) {
        self.delivered
            .lock()
            .unwrap()
            .push((iface, frame));
    }
}

fn iface_strategy() -> impl Strategy<Value = InterfaceId> {
    prop_oneof![Just(InterfaceId::A), Just(InterfaceId::B)]
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        6 => (iface_strategy(), MIN_FRAME..=256usize)
            .prop_map(|(from, len)| Op::Transmit { from, len }),
        2 => (iface_strategy(), 0usize..=4).prop_map(|(iface, budget)| Op::Poll { iface, budget }),
        2 => (iface_strategy(), any::<bool>())
            .prop_map(|(iface, enabled)| Op::RxInterrupts { iface, enabled }),
        1 => iface_strategy().prop_map(Op::Close),
        1 => iface_strategy().prop_map(Op::Open),
    ]
}

fn sequenced_frame(len: usize, seq: u32) -> Vec<u8> {
    let mut frame = vec![0u8; len];
    frame[12..14].copy_from_slice(&0x0800u16.to_be_bytes());
    let ip = &mut frame[ETH_HLEN..ETH_HLEN + IPV4_MIN_HEADER_LEN];
    ip[0] = 0x45;
    ip[12..16].copy_from_slice(&[192, 168, 0, 1]);
    ip[16..20].copy_from_slice(&[192, 168, 0, 2]);
    frame[SEQ_OFFSET..SEQ_OFFSET + 4].copy_from_slice(&seq.to_be_bytes());
    frame
}

fn check_conservation(pair: &InterfacePair<Capture>) -> TestCaseResult {
    for owner in InterfaceId::ALL {
        let free = pair.interface(owner).lock().pool.available();
        let queued: usize = InterfaceId::ALL
            .iter()
            .map(|&holder| pair.interface(holder).lock().rx_queue.count_from(owner))
            .sum();
        prop_assert_eq!(free + queued, pair.config().pool_size, "pool of {}", owner);

        // Between calls the host has been told the current queue state.
        let state = pair.interface(owner).lock();
        prop_assert!(!state.signalling);
        prop_assert_eq!(state.host_queue, state.queue, "queue of {}", owner);
    }
    Ok(())
}

fn run_ops(pool_size: usize, ops: Vec<Op>) -> TestCaseResult {
    let config = PairConfig::default().with_pool_size(pool_size);
    let pair = InterfacePair::new(config, Capture::default()).unwrap();
    for id in InterfaceId::ALL {
        pair.open(id);
    }

    let mut seq = 0u32;
    for op in ops {
        match op {
            Op::Transmit { from, len } => {
                seq += 1;
                let _ = pair.transmit(from, &sequenced_frame(len, seq));
            }
            Op::Poll { iface, budget } => {
                let queued = pair.status(iface).rx_queue_len;
                let processed = pair.poll_rx(iface, budget);
                prop_assert_eq!(processed, queued.min(budget));
            }
            Op::RxInterrupts { iface, enabled } => pair.set_rx_interrupts(iface, enabled),
            Op::Close(iface) => pair.close(iface),
            Op::Open(iface) => pair.open(iface),
        }
        check_conservation(&pair)?;
    }

    // Frames reach each receiver in the order they were sent.
    let delivered = pair.host().delivered.lock().unwrap().clone();
    for receiver in InterfaceId::ALL {
        let seqs: Vec<u32> = delivered
            .iter()
            .filter(|(iface, _)| *iface == receiver)
            .map(|(_, frame)| {
                u32::from_be_bytes(frame[SEQ_OFFSET..SEQ_OFFSET + 4].try_into().unwrap())
            })
            .collect();
        prop_assert!(
            seqs.windows(2).all(|w| w[0] < w[1]),
            "out of order delivery on {}: {:?}",
            receiver,
            seqs
        );
    }

    prop_assert!(pair.shutdown().is_ok());
    Ok(())
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 128,
        .. ProptestConfig::default()
    })]

    #[test]
    fn buffers_are_conserved_and_delivery_is_fifo(
        pool_size in 1usize..=6,
        ops in proptest::collection::vec(op_strategy(), 1..MAX_OPS),
    ) {
        run_ops(pool_size, ops)?;
    }

    #[test]
    fn subnet_rewrite_is_an_involution_with_valid_checksum(
        src in any::<[u8; 4]>(),
        dst in any::<[u8; 4]>(),
        options in 0usize..=10,
        payload in proptest::collection::vec(any::<u8>(), 0..64),
    ) {
        let header_len = IPV4_MIN_HEADER_LEN + options * 4;
        let mut frame = vec![0u8; ETH_HLEN + header_len];
        frame[ETH_HLEN] = 0x40 | (header_len / 4) as u8;
        frame[ETH_HLEN + 12..ETH_HLEN + 16].copy_from_slice(&src);
        frame[ETH_HLEN + 16..ETH_HLEN + 20].copy_from_slice(&dst);
        frame.extend_from_slice(&payload);

        let mut once = frame.clone();
        let rewrite = rewrite_ipv4_subnets(&mut once).unwrap();
        prop_assert_eq!(rewrite.src.octets()[2], src[2] ^ 1);
        prop_assert_eq!(rewrite.dst.octets()[2], dst[2] ^ 1);
        prop_assert_eq!(ipv4_header_checksum(&once[ETH_HLEN..ETH_HLEN + header_len]), 0);
        prop_assert_eq!(&once[ETH_HLEN + header_len..], payload.as_slice());

        let mut twice = once.clone();
        rewrite_ipv4_subnets(&mut twice).unwrap();
        prop_assert_eq!(&twice[ETH_HLEN + 12..ETH_HLEN + 20], &frame[ETH_HLEN + 12..ETH_HLEN + 20]);
    }
}
