use pretty_assertions::assert_eq;

use crate::profile::{Profiler, Recommendation};
use crate::EngineStats;

#[test]
fn histogram_buckets_by_power_of_two() {
    let mut profiler = Profiler::new();
    profiler.record_dispatch(1, 10, 0);
    profiler.record_dispatch(1, 10, 1);
    profiler.record_dispatch(1, 10, 2);
    profiler.record_dispatch(1, 10, 3);
    profiler.record_dispatch(1, 10, 1024);

    let histogram = profiler.histogram();
    assert_eq!(histogram.bucket(0), 2); // 0 and 1 ns
    assert_eq!(histogram.bucket(1), 2); // 2 and 3 ns
    assert_eq!(histogram.bucket(10), 1); // 1024 ns
    assert_eq!(histogram.total(), 5);
}

#[test]
fn mean_latency() {
    let mut profiler = Profiler::new();
    assert_eq!(profiler.mean_dispatch_nanos(), 0.0);

    profiler.record_dispatch(1, 10, 100);
    profiler.record_dispatch(1, 10, 300);
    assert_eq!(profiler.mean_dispatch_nanos(), 200.0);
}

#[test]
fn family_frequency_feeds_optimizer() {
    let mut profiler = Profiler::new();
    for _ in 0..5 {
        profiler.record_dispatch(1, 10, 50);
    }
    profiler.record_dispatch(1, 20, 50);
    profiler.record_dispatch(2, 30, 50);

    let freq = profiler.family_frequency(1);
    assert_eq!(freq.get(10), 5);
    assert_eq!(freq.get(20), 1);
    assert_eq!(freq.get(30), 0);
    assert_eq!(freq.total(), 6);
}

#[test]
fn hot_paths_are_sorted_and_filtered() {
    let mut profiler = Profiler::new();
    for _ in 0..90 {
        profiler.record_dispatch(1, 10, 50);
    }
    for _ in 0..9 {
        profiler.record_dispatch(1, 20, 50);
    }
    profiler.record_dispatch(2, 30, 50);

    let paths = profiler.hot_paths(0.05);
    assert_eq!(paths.len(), 2);
    assert_eq!(paths[0].arg_hash, 10);
    assert_eq!(paths[0].calls, 90);
    assert!(paths[0].fraction > 0.89);
    assert_eq!(paths[1].arg_hash, 20);
}

#[test]
fn concentrated_family_gets_hot_prefix_recommendation() {
    let mut profiler = Profiler::new();
    // 10 distinct tuples; the first takes nearly all traffic.
    for _ in 0..1000 {
        profiler.record_dispatch(7, 1, 10);
    }
    for arg in 2..11u64 {
        profiler.record_dispatch(7, arg, 10);
    }

    let stats = EngineStats {
        dispatches: 1009,
        cache_hits: 900,
        ..EngineStats::default()
    };
    let recommendations = profiler.recommendations(&stats);
    assert_eq!(
        recommendations,
        vec![Recommendation::BuildHotPrefix { signature_hash: 7 }]
    );
}

#[test]
fn poor_cache_rate_recommends_growth() {
    let mut profiler = Profiler::new();
    profiler.record_dispatch(7, 1, 10);
    profiler.record_dispatch(7, 2, 10);

    let stats = EngineStats {
        dispatches: 100,
        cache_hits: 10,
        ..EngineStats::default()
    };
    let recommendations = profiler.recommendations(&stats);
    assert!(recommendations.contains(&Recommendation::GrowInlineCache { signature_hash: 7 }));
}

#[test]
fn wide_family_recommends_compression() {
    let mut profiler = Profiler::new();
    for arg in 0..100u64 {
        profiler.record_dispatch(9, arg, 10);
    }

    let stats = EngineStats {
        dispatches: 100,
        cache_hits: 90,
        ..EngineStats::default()
    };
    let recommendations = profiler.recommendations(&stats);
    assert!(recommendations.contains(&Recommendation::CompressTable { signature_hash: 9 }));
}
