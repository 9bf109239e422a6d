// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]

//! End-to-end scheduling: configuration, binding, manager and runners
//! driven by a fake wall clock.

use cadence_core::clock::FakeClock;
use cadence_core::{
    Processor, ProcessorError, ProcessorManager, ProcessorRegistry, ProcessorState,
    RunnerOptions, SchedulerConfig,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

const CONFIG: &str = r#"
[trigger.nightly]
type = "schedule"
time = "02:30"

[[processor]]
name = "hourly"
kind = "count"
trigger = { type = "interval", every = "1h" }

[[processor]]
name = "nightly"
kind = "count"
trigger = { type = "ref", name = "nightly" }

[[processor]]
name = "weekday-nightly"
kind = "count"
trigger = { type = "filter", weekdays = ["sat", "sun"], trigger = { type = "ref", name = "nightly" } }

[[processor]]
name = "manual"
kind = "count"
"#;

type Counts = Arc<Mutex<HashMap<String, Arc<AtomicUsize>>>>;

struct CountingProcessor {
    name: String,
    runs: Arc<AtomicUsize>,
}

impl Processor for CountingProcessor {
    fn name(&self) -> &str {
        &self.name
    }

    fn start(&self) -> Result<(), ProcessorError> {
        self.runs.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

fn registry(counts: Counts) -> ProcessorRegistry {
    ProcessorRegistry::new().with("count", move |name: &str, _params: &toml::Table| {
        let runs = Arc::new(AtomicUsize::new(0));
        counts
            .lock()
            .unwrap()
            .insert(name.to_string(), Arc::clone(&runs));
        let processor: Arc<dyn Processor> = Arc::new(CountingProcessor {
            name: name.to_string(),
            runs,
        });
        Ok(processor)
    })
}

fn runs(counts: &Counts, name: &str) -> usize {
    counts.lock().unwrap()[name].load(Ordering::SeqCst)
}

fn eventually(mut check: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + Duration::from_secs(5);
    while Instant::now() < deadline {
        if check() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(5));
    }
    check()
}

#[test]
fn processors_follow_their_triggers() {
    // Wednesday
    let clock = FakeClock::new();
    clock.set_ymd_hms(2004, 12, 1, 10, 0, 0);
    let counts: Counts = Arc::default();
    let config: SchedulerConfig = CONFIG.parse().unwrap();
    let registry = registry(Arc::clone(&counts));
    let source_clock = clock.clone();
    let manager = ProcessorManager::with_options(
        move || config.bind_with_clock(&registry, &source_clock),
        RunnerOptions {
            poll_interval: Duration::from_millis(5),
        },
    );

    manager.start_all().unwrap();
    std::thread::sleep(Duration::from_millis(50));
    for name in ["hourly", "nightly", "weekday-nightly", "manual"] {
        assert_eq!(runs(&counts, name), 0, "{} ran early", name);
    }

    clock.advance(Duration::from_secs(60 * 60));
    assert!(eventually(|| runs(&counts, "hourly") == 1));
    assert_eq!(runs(&counts, "nightly"), 0);

    // Thursday 02:30: the interval is overdue as well
    clock.set_ymd_hms(2004, 12, 2, 2, 30, 0);
    assert!(eventually(|| runs(&counts, "nightly") == 1));
    assert!(eventually(|| runs(&counts, "weekday-nightly") == 1));
    assert!(eventually(|| runs(&counts, "hourly") == 2));
    std::thread::sleep(Duration::from_millis(50));
    assert_eq!(runs(&counts, "nightly"), 1);
    assert_eq!(runs(&counts, "hourly"), 2);

    // Saturday 02:30: the weekend filter holds back its inner schedule
    clock.set_ymd_hms(2004, 12, 4, 2, 30, 0);
    assert!(eventually(|| runs(&counts, "nightly") == 2));
    assert!(eventually(|| runs(&counts, "hourly") == 3));
    std::thread::sleep(Duration::from_millis(50));
    assert_eq!(runs(&counts, "weekday-nightly"), 1);

    manager.force("manual").unwrap();
    assert!(eventually(|| runs(&counts, "manual") == 1));

    let status = manager.status().unwrap();
    let hourly = status.iter().find(|s| s.name == "hourly").unwrap();
    assert_eq!(hourly.state, ProcessorState::Running);
    assert_eq!(
        hourly.next_fire_time,
        "2004-12-04T03:30:00".parse().ok()
    );
    let manual = status.iter().find(|s| s.name == "manual").unwrap();
    assert_eq!(manual.next_fire_time, None);

    manager.stop_all().unwrap();
    for s in manager.status().unwrap() {
        assert_eq!(s.state, ProcessorState::Stopped);
    }
    assert!(manager.queued().unwrap().is_empty());
}
