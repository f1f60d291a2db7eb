//! Demonstration of the pet monitor pipeline.
//!
//! This example shows how to:
//! 1. Start a capture feed over a synthetic scene with a moving subject
//! 2. Build a pipeline with a scripted detector
//! 3. Process frames and watch the behavior score evolve
//! 4. Print the run statistics
//!
//! Run with: cargo run --example monitor_demo

use std::time::{Duration, Instant};

use pet_monitor::{
    capture::{CaptureFeed, SyntheticSource},
    core::{
        BehaviorAnalyzer, BehaviorConfig, Candidate, ClassifierConfig, FrameDifferencer,
        MotionConfig, PetClassifier, PipelineContext, SharedStatus,
    },
    detector::FixedDetector,
    eventlog::create_shared_stats,
};
use uuid::Uuid;

fn main() {
    println!("Pet Monitor - Pipeline Demo");
    println!("===========================");
    println!();

    let stats = create_shared_stats();
    let detector = FixedDetector::new(vec![
        Candidate::new("cat", 0.87),
        Candidate::new("dog", 0.42),
        Candidate::new("sofa", 0.95),
    ]);

    let mut pipeline = PipelineContext::new(
        FrameDifferencer::new(MotionConfig::default()),
        PetClassifier::new(Box::new(detector), ClassifierConfig::default()),
        BehaviorAnalyzer::new(BehaviorConfig::default()),
        SharedStatus::new(Uuid::new_v4(), "demo-camera"),
    )
    .with_stats(stats.clone());

    let mut feed = CaptureFeed::new();
    if let Err(e) = feed.start(
        Box::new(SyntheticSource::new(320, 240).with_moving_subject(12)),
        Duration::from_millis(50),
        stats.clone(),
    ) {
        eprintln!("Failed to start capture: {e}");
        return;
    }

    println!("Processing frames for 5 seconds...");
    println!();

    let started = Instant::now();
    while started.elapsed() < Duration::from_secs(5) {
        let Ok(frame) = feed.receiver().recv_timeout(Duration::from_millis(200)) else {
            continue;
        };
        let snapshot = pipeline.process_frame(&frame);

        if snapshot.frame_sequence % 10 == 0 {
            println!(
                "[frame {:>3}] motion: {:>5} px ({:?}) | pet: {} | score: {:>3} | status: {}{}",
                snapshot.frame_sequence,
                snapshot.motion_magnitude,
                snapshot.motion_level,
                snapshot.pet.label().unwrap_or("none"),
                snapshot.behavior.score,
                snapshot.behavior.status,
                snapshot
                    .behavior
                    .alert
                    .map(|a| format!(" | alert: {a}"))
                    .unwrap_or_default()
            );
        }
    }

    feed.stop();

    println!();
    println!("{}", stats.summary());
}
