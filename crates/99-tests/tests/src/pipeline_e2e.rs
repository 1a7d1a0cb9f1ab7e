#![cfg(test)]
//! End-to-end runs through a live node: producer threads, a slow transport
//! consumer, and the bounded queue between them.

use std::collections::BTreeSet;
use std::thread;
use std::time::Duration;

use anyhow::Result;
use message::{ChannelId, Header, Limits, Message};
use mixer::StrategyConfig;
use node::{CascadePosition, MixNode, NodeConfig};

const LIMITS: Limits = Limits {
    request_size: 64,
    reply_size: 64,
};

fn config(strategy: StrategyConfig) -> NodeConfig {
    NodeConfig {
        strategy,
        cascade: Some(CascadePosition {
            position: 0,
            length: 2,
        }),
        request_size: 64,
        reply_size: 64,
        with_pseudonym: false,
        queue_capacity: 4,
        delivery_capacity: 8,
        seed: Some(3),
    }
}

fn tagged_request(tag: u16) -> Message {
    let payload = Header {
        port: 1,
        pseudonym: None,
    }
    .encode_onto(&tag.to_be_bytes());
    Message::request(ChannelId(u64::from(tag)), payload, &LIMITS)
}

fn tag_of(msg: &Message) -> u16 {
    let body = &msg.payload()[Header::PORT_LEN..];
    u16::from_be_bytes([body[0], body[1]])
}

/// Two producer threads push 300 requests through a synchronous batch mix
/// while a deliberately slow consumer drains the deliberately small outbound
/// queue. Back-pressure throttles the pipeline, and exactly 300 distinct
/// frames come out the other end.
#[test]
fn threaded_pipeline_conserves_messages() -> Result<()> {
    let mut node = MixNode::new(config(StrategyConfig::SynchronousBatch { batch_size: 5 }))?;
    node.initialize()?;
    node.begin()?;
    let outbound = node.take_outbound().expect("outbound queue");

    let consumer = thread::spawn(move || {
        let mut tags = Vec::new();
        while tags.len() < 300 {
            match outbound.recv_timeout(Duration::from_secs(5)) {
                Ok(frame) => {
                    tags.push(tag_of(&frame.message));
                    if tags.len() % 50 == 0 {
                        thread::sleep(Duration::from_millis(1));
                    }
                }
                Err(_) => break,
            }
        }
        tags
    });

    let node = std::sync::Arc::new(node);
    let mut producers = Vec::new();
    for worker in 0..2u16 {
        let node = std::sync::Arc::clone(&node);
        producers.push(thread::spawn(move || {
            for i in 0..150u16 {
                node.add_request(tagged_request(worker * 1000 + i))
                    .expect("running node accepts");
            }
        }));
    }
    for producer in producers {
        producer.join().unwrap();
    }

    let tags = consumer.join().unwrap();
    assert_eq!(tags.len(), 300);
    let unique: BTreeSet<u16> = tags.iter().copied().collect();
    assert_eq!(unique.len(), 300, "a frame was lost or duplicated");
    Ok(())
}

/// The threshold pool keeps its residue across firings when driven through
/// the whole pipeline, not just the strategy in isolation.
#[test]
fn threshold_pool_residue_survives_the_pipeline() -> Result<()> {
    let mut node = MixNode::new(config(StrategyConfig::ThresholdBatch {
        threshold: 5,
        pool_size: 2,
    }))?;
    node.initialize()?;
    node.begin()?;
    let outbound = node.take_outbound().expect("outbound queue");

    for tag in 0..5u16 {
        node.add_request(tagged_request(tag))?;
    }
    let mut first: Vec<u16> = outbound.try_iter().map(|f| tag_of(&f.message)).collect();
    first.sort_unstable();
    assert_eq!(first, vec![0, 1, 2]);

    // Two stay behind; three more arrivals complete the next firing.
    for tag in 5..8u16 {
        node.add_request(tagged_request(tag))?;
    }
    let mut second: Vec<u16> = outbound.try_iter().map(|f| tag_of(&f.message)).collect();
    second.sort_unstable();
    assert_eq!(second, vec![3, 4, 5]);

    node.shutdown()?;
    Ok(())
}
