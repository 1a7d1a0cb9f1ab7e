#![cfg(test)]
//! Deterministic virtual-clock runs: whole nodes driven by `advance_to`, the
//! way the offline evaluation harness runs them.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use message::{ChannelId, Direction, Header, Limits, Message};
use mixer::{StrategyConfig, TallyStats};
use node::{CascadePosition, MixNode, NodeConfig};
use timers::VirtualScheduler;

const LIMITS: Limits = Limits {
    request_size: 64,
    reply_size: 64,
};

fn config(strategy: StrategyConfig, position: usize, length: usize) -> NodeConfig {
    NodeConfig {
        strategy,
        cascade: Some(CascadePosition { position, length }),
        request_size: 64,
        reply_size: 64,
        with_pseudonym: false,
        queue_capacity: 32,
        delivery_capacity: 32,
        seed: Some(11),
    }
}

fn request(port: u16, body: &[u8]) -> Message {
    let payload = Header {
        port,
        pseudonym: None,
    }
    .encode_onto(body);
    Message::request(ChannelId(1), payload, &LIMITS)
}

/// A two-mix cascade sharing one virtual clock: the entry mix holds traffic
/// until its tick, the exit mix strips the header into the terminating
/// socket. The run is fully deterministic.
#[test]
fn cascade_relay_under_virtual_clock() -> Result<()> {
    let sim = VirtualScheduler::new();

    let mut entry = MixNode::new(config(
        StrategyConfig::TimedBatch {
            sending_rate_ms: 100,
        },
        0,
        2,
    ))?
    .with_scheduler(Arc::new(sim.clone()));
    entry.initialize()?;
    entry.begin()?;
    let entry_out = entry.take_outbound().expect("outbound");

    let mut exit = MixNode::new(config(StrategyConfig::NoDelay, 1, 2))?
        .with_scheduler(Arc::new(sim.clone()));
    exit.initialize()?;
    let socket = exit.register_port(4711)?;
    exit.begin()?;

    entry.add_request(request(4711, b"m1"))?;
    entry.add_request(request(4711, b"m2"))?;
    assert!(entry_out.try_recv().is_err(), "held until the tick");

    sim.advance_by(Duration::from_millis(100));

    // Play the transport layer: carry the fired frames to the exit mix.
    for frame in entry_out.try_iter() {
        exit.add_request(frame.message)?;
    }
    assert_eq!(socket.try_recv().expect("delivered"), b"m1".to_vec());
    assert_eq!(socket.try_recv().expect("delivered"), b"m2".to_vec());

    entry.shutdown()?;
    exit.shutdown()?;
    Ok(())
}

/// Random-delay mix under the virtual clock: everything accepted before
/// `max_delay` has elapsed is out by then, and the observed mean dwell stays
/// inside the delay bound.
#[test]
fn random_delay_flushes_within_bound() -> Result<()> {
    let sim = VirtualScheduler::new();
    let stats = Arc::new(TallyStats::new());
    let mut node = MixNode::new(config(StrategyConfig::RandomDelay { max_delay_ms: 50 }, 0, 2))?
        .with_scheduler(Arc::new(sim.clone()))
        .with_stats(stats.clone());
    node.initialize()?;
    node.begin()?;
    let outbound = node.take_outbound().expect("outbound");

    for i in 0..20u16 {
        node.add_request(request(1, &i.to_be_bytes()))?;
    }
    sim.advance_by(Duration::from_millis(50));

    assert_eq!(outbound.try_iter().count(), 20);
    let snapshot = stats.snapshot(Direction::Request);
    assert_eq!(snapshot.accepted, 20);
    assert_eq!(snapshot.forwarded, 20);
    assert!(snapshot.mean_dwell() <= Duration::from_millis(50));

    node.shutdown()?;
    Ok(())
}

/// A dynamic pool trends back to `min_messages` after a burst: one idle tick
/// with `fraction = 1` releases everything above the floor and nothing below
/// it.
#[test]
fn dynamic_pool_trends_to_floor() -> Result<()> {
    let sim = VirtualScheduler::new();
    let stats = Arc::new(TallyStats::new());
    let mut node = MixNode::new(config(
        StrategyConfig::DynamicPool {
            sending_rate_ms: 100,
            min_messages: 2,
            fraction: 1.0,
        },
        0,
        2,
    ))?
    .with_scheduler(Arc::new(sim.clone()))
    .with_stats(stats.clone());
    node.initialize()?;
    node.begin()?;
    let outbound = node.take_outbound().expect("outbound");

    for i in 0..10u16 {
        node.add_request(request(1, &i.to_be_bytes()))?;
    }
    sim.advance_by(Duration::from_millis(100));
    assert_eq!(outbound.try_iter().count(), 8);

    // Idle ticks leave the floor untouched.
    sim.advance_by(Duration::from_millis(500));
    assert_eq!(outbound.try_iter().count(), 0);
    assert_eq!(stats.snapshot(Direction::Request).forwarded, 8);

    node.shutdown()?;
    Ok(())
}
