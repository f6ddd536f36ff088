#![forbid(unsafe_code)]

use std::sync::atomic::{AtomicU64, Ordering};

use aero_net_pair::{
    ipv4_header_checksum, DropReason, InterfaceId, InterfacePair, InterfaceStats, LinkHost,
    PairConfig, ETHERTYPE_IPV4, ETH_HLEN, IPV4_MIN_HEADER_LEN,
};
use anyhow::{Context, Result};
use clap::Parser;

/// Drive traffic across a pair of back-to-back emulated interfaces and report the counters.
///
/// Unset options fall back to the `AERO_NET_PAIR_*` environment variables, then to defaults.
#[derive(Debug, Parser)]
#[command(about = "Exercise an emulated sn0/sn1 interface pair")]
struct Args {
    /// Frames preallocated per interface.
    #[arg(long)]
    pool_size: Option<usize>,

    /// MTU applied to both interfaces.
    #[arg(long)]
    mtu: Option<usize>,

    /// Leave receive interrupts off and drain the receive queues by polling.
    #[arg(long)]
    no_rx_interrupts: bool,

    /// Frames handed to the upper layer per poll.
    #[arg(long, default_value_t = 4)]
    poll_budget: usize,

    /// Rounds of traffic; each round sends one frame in each direction.
    #[arg(long, default_value_t = 16)]
    frames: u32,

    /// Length of every frame, Ethernet header included. Short frames are padded on the wire.
    #[arg(long, default_value_t = 98)]
    frame_len: usize,
}

/// Counts what the pair hands up without keeping the frames.
#[derive(Debug, Default)]
struct CountingHost {
    delivered: [AtomicU64; 2],
    stops: AtomicU64,
    wakes: AtomicU64,
}

impl LinkHost for CountingHost {
    fn deliver(&self, iface: InterfaceId, frame: Vec<u8>) {
        tracing::trace!(%iface, len = frame.len(), "delivered");
        self.delivered[iface.index()].fetch_add(1, Ordering::Relaxed);
    }

    fn queue_stop(&self, iface: InterfaceId) {
        tracing::debug!(%iface, "queue stopped");
        self.stops.fetch_add(1, Ordering::Relaxed);
    }

    fn queue_wake(&self, iface: InterfaceId) {
        tracing::debug!(%iface, "queue woken");
        self.wakes.fetch_add(1, Ordering::Relaxed);
    }
}

#[derive(Debug)]
struct Summary {
    stats: [InterfaceStats; 2],
    delivered: [u64; 2],
    stops: u64,
    wakes: u64,
}

/// Apply the explicit arguments on top of `config`.
fn config_from(args: &Args, mut config: PairConfig) -> PairConfig {
    if let Some(pool_size) = args.pool_size {
        config = config.with_pool_size(pool_size);
    }
    if let Some(mtu) = args.mtu {
        config = config.with_mtu(mtu);
    }
    if args.no_rx_interrupts {
        config = config.with_rx_interrupts(false);
    }
    config
}

/// An IPv4 frame from `from`'s subnet (192.168.0.0/24 for sn0, 192.168.1.0/24 for sn1) to the
/// matching host on the other side.
fn make_frame(
    pair: &InterfacePair<CountingHost>,
    from: InterfaceId,
    len: usize,
    seq: u32,
) -> Result<Vec<u8>> {
    let mut frame = vec![0u8; len.max(ETH_HLEN + IPV4_MIN_HEADER_LEN)];
    pair.build_header(from, &mut frame, ETHERTYPE_IPV4, None, None)
        .context("building Ethernet header")?;

    let subnet = from.index() as u8;
    let total_len = u16::try_from(frame.len() - ETH_HLEN).context("frame too long")?;
    let ip = &mut frame[ETH_HLEN..];
    ip[0] = 0x45;
    ip[2..4].copy_from_slice(&total_len.to_be_bytes());
    ip[4..6].copy_from_slice(&(seq as u16).to_be_bytes());
    ip[8] = 64;
    ip[9] = 17;
    ip[12..16].copy_from_slice(&[192, 168, subnet, 1]);
    ip[16..20].copy_from_slice(&[192, 168, subnet, 2]);
    let csum = ipv4_header_checksum(&ip[..IPV4_MIN_HEADER_LEN]);
    ip[10..12].copy_from_slice(&csum.to_be_bytes());
    Ok(frame)
}

fn send(pair: &InterfacePair<CountingHost>, from: InterfaceId, frame: &[u8], budget: usize) {
    match pair.transmit(from, frame) {
        Ok(()) => {}
        Err(err) if err.reason == DropReason::PoolEmpty => {
            // Every buffer is parked in the peer's receive queue; drain some and retry once.
            let drained = pair.poll_rx(from.peer(), budget.max(1));
            tracing::debug!(iface = %from, drained, "pool exhausted, polled peer");
            if let Err(err) = pair.transmit(from, frame) {
                tracing::warn!(%err, "retry failed");
            }
        }
        Err(err) => tracing::warn!(%err, "transmit failed"),
    }
}

fn run(args: &Args, base: PairConfig) -> Result<Summary> {
    let config = config_from(args, base);
    tracing::info!(?config, frames = args.frames, "starting");

    let pair = InterfacePair::new(config, CountingHost::default())
        .context("creating interface pair")?;
    for id in InterfaceId::ALL {
        pair.open(id);
    }

    for seq in 0..args.frames {
        for from in InterfaceId::ALL {
            let frame = make_frame(&pair, from, args.frame_len, seq)?;
            send(&pair, from, &frame, args.poll_budget);
        }
    }

    for id in InterfaceId::ALL {
        while pair.poll_rx(id, args.poll_budget.max(1)) > 0 {}
    }

    let stats = InterfaceId::ALL.map(|id| pair.stats(id));
    let host = pair.shutdown().context("tearing down interface pair")?;
    Ok(Summary {
        stats,
        delivered: host.delivered.map(AtomicU64::into_inner),
        stops: host.stops.into_inner(),
        wakes: host.wakes.into_inner(),
    })
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args = Args::parse();
    let base = PairConfig::from_env().context("reading AERO_NET_PAIR_* environment")?;
    let summary = run(&args, base)?;

    for id in InterfaceId::ALL {
        let s = summary.stats[id.index()];
        println!(
            "{id}: tx {} pkts / {} bytes ({} dropped), rx {} pkts / {} bytes ({} dropped), delivered {}",
            s.tx_packets,
            s.tx_bytes,
            s.tx_dropped,
            s.rx_packets,
            s.rx_bytes,
            s.rx_dropped,
            summary.delivered[id.index()],
        );
    }
    println!("queue stops: {}, wakes: {}", summary.stops, summary.wakes);
    Ok(())
}
