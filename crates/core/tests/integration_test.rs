//! Integration tests for the full packet pipeline.
//!
//! These tests verify end-to-end behavior: message -> producer -> buffer ->
//! transformer/packetizer -> packets, with verification that the packets
//! reassemble into the uppercased message.

use std::sync::mpsc;
use std::thread;
use std::time::{Duration, Instant};

use packet_pipeline_core::{
    error::{ConfigError, Error, PipelineError},
    reassemble,
    sink::from_fn,
    worker::uppercase,
    DrainPolicy, Packet, Pipeline, PipelineConfig,
};

fn wire(packets: &[Packet]) -> Vec<String> {
    packets.iter().map(Packet::serialize).collect()
}

/// The reference message, paced so the three workers visibly interleave.
#[test]
fn test_reference_message_with_pacing() {
    let config = PipelineConfig::fast()
        .with_poll_interval(Duration::from_millis(2))
        .with_produce_interval(Duration::from_millis(1));
    let pipeline = Pipeline::new(config).unwrap();

    let packets = pipeline.collect("HelloWorldIamAdam").unwrap();

    assert_eq!(
        wire(&packets),
        vec!["00:05:HELLO", "01:05:WORLD", "02:05:IAMAD", "03:02:AM"]
    );
    assert_eq!(reassemble(&packets).unwrap(), "HELLOWORLDIAMADAM");
}

/// A tiny buffer forces the producer to back off repeatedly.
#[test]
fn test_small_buffer_backpressure() {
    let message = "the producer has to wait for room in a two slot buffer";
    let config = PipelineConfig::fast().with_capacity(2).with_chunk_size(7);
    let pipeline = Pipeline::new(config).unwrap();

    let mut packets: Vec<Packet> = Vec::new();
    let report = pipeline.run(message, &mut packets).unwrap();

    let expected: String = message.chars().map(uppercase).collect();
    assert_eq!(reassemble(&packets).unwrap(), expected);
    assert!(report.metrics.buffer_high_water <= 2);
    assert_eq!(report.metrics.chars_produced, message.len() as u64);
    assert_eq!(report.metrics.chars_in_flight(), 0);
}

/// Every packet's length field matches its payload, and numbering has no gaps.
#[test]
fn test_framing_of_every_packet() {
    let message = "a".repeat(255);
    let pipeline = Pipeline::new(PipelineConfig::fast().with_chunk_size(3)).unwrap();

    let packets = pipeline.collect(&message).unwrap();

    assert_eq!(packets.len(), 85);
    for (i, packet) in packets.iter().enumerate() {
        let serialized = packet.serialize();
        let parsed = Packet::parse(&serialized).unwrap();
        assert_eq!(parsed.packet_number(), i);
        assert_eq!(parsed.message_length(), 3);
        assert_eq!(&serialized[..6], format!("{:02}:03:", i));
    }
}

/// A single-character chunk at the numbering limit: exactly 100 packets.
#[test]
fn test_numbering_limit() {
    let message = "z".repeat(100);
    let pipeline = Pipeline::new(PipelineConfig::fast().with_chunk_size(1)).unwrap();

    let packets = pipeline.collect(&message).unwrap();

    assert_eq!(packets.len(), 100);
    assert_eq!(packets.last().unwrap().serialize(), "99:01:Z");

    let too_many = "z".repeat(101);
    assert!(matches!(
        pipeline.collect(&too_many),
        Err(Error::Config(ConfigError::TooManyPackets { packets: 101, .. }))
    ));
}

/// Packets can be consumed on another thread while the run is in progress.
#[test]
fn test_channel_sink_streams_packets() {
    let (tx, rx) = mpsc::channel::<Packet>();
    let consumer = thread::spawn(move || rx.iter().map(|p| p.serialize()).collect::<Vec<_>>());

    let pipeline = Pipeline::new(PipelineConfig::fast()).unwrap();
    let report = pipeline.run("streaming!", tx).unwrap();

    let received = consumer.join().unwrap();
    assert_eq!(report.packets_emitted, 2);
    assert_eq!(received, vec!["00:05:STREA", "01:05:MING!"]);
}

/// The run terminates promptly after the last character is drained.
#[test]
fn test_terminates_in_bounded_time() {
    let pipeline = Pipeline::new(PipelineConfig::fast()).unwrap();

    let start = Instant::now();
    let mut emitted = Vec::new();
    pipeline
        .run("short", from_fn(|p: Packet| emitted.push(p)))
        .unwrap();

    assert!(start.elapsed() < Duration::from_secs(5));
    assert_eq!(wire(&emitted), vec!["00:05:SHORT"]);
}

/// A sink slower than the drain timeout forces shutdown with characters
/// still buffered; everything emitted before the abort stays well framed.
#[test]
fn test_drain_timeout_aborts_slow_sink() {
    let config = PipelineConfig::fast()
        .with_capacity(2)
        .with_chunk_size(1)
        .with_drain_timeout(Duration::from_millis(30));
    let pipeline = Pipeline::new(config).unwrap();

    let mut emitted = Vec::new();
    let result = pipeline.run(
        "abcdefgh",
        from_fn(|p: Packet| {
            thread::sleep(Duration::from_millis(100));
            emitted.push(p);
        }),
    );

    match result {
        Err(Error::Pipeline(PipelineError::DrainTimeout { timeout, remaining })) => {
            assert_eq!(timeout, Duration::from_millis(30));
            assert!(remaining > 0);
        }
        other => panic!("expected a drain timeout, got {:?}", other),
    }

    // the sink is borrowable again, so every worker has been joined
    assert!(!emitted.is_empty());
    assert!(emitted.len() < 8);
    let joined = reassemble(&emitted).unwrap();
    assert!("ABCDEFGH".starts_with(&joined));
    for (i, packet) in emitted.iter().enumerate() {
        assert_eq!(packet.serialize(), format!("{:02}:01:{}", i, &joined[i..=i]));
    }
}

/// Immediate draining keeps order; only the case of each character may vary.
#[test]
fn test_immediate_drain_policy() {
    let message = "MiXeD cAsE message";
    let config = PipelineConfig::fast().with_drain_policy(DrainPolicy::Immediate);
    let pipeline = Pipeline::new(config).unwrap();

    let packets = pipeline.collect(message).unwrap();

    let joined = reassemble(&packets).unwrap();
    assert_eq!(joined.to_uppercase(), message.to_uppercase());
    assert_eq!(packets.len(), 4);
}

/// One pipeline can be reused for independent runs; numbering restarts.
#[test]
fn test_pipeline_reuse() {
    let pipeline = Pipeline::new(PipelineConfig::fast()).unwrap();

    let first = pipeline.collect("abcdefg").unwrap();
    let second = pipeline.collect("hij").unwrap();

    assert_eq!(wire(&first), vec!["00:05:ABCDE", "01:02:FG"]);
    assert_eq!(wire(&second), vec!["00:03:HIJ"]);
}
