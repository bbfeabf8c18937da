//! Control loop integration tests
//!
//! Drives whole monitors through the public API. Timing scenarios run on
//! tokio's paused clock so multi-second watchers finish instantly.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::Instant;

use tickwatch::control::{ChannelCommandSource, ChannelEventHandler};
use tickwatch::domain::{CheckResult, FaultSource};
use tickwatch::runner::run_once;
use tickwatch::watcher::CommandWatcherConfig;
use tickwatch::{
    BoxError, Command, CommandWatcher, ControlLoop, ControlState, Event, Fault, Hook, Hooks, Iteration,
    IterationHooks, MonitorConfig, Verdict, Watcher, WatcherHooks,
};

type Log = Arc<Mutex<Vec<String>>>;

/// Returns a fixed verdict, optionally after a delay
struct Fixed {
    name: &'static str,
    group: Option<&'static str>,
    valid: bool,
    delay: Duration,
    calls: Arc<AtomicUsize>,
    spans: Option<Arc<Mutex<Vec<(&'static str, Instant, Instant)>>>>,
}

impl Fixed {
    fn new(name: &'static str, valid: bool) -> Self {
        Self {
            name,
            group: None,
            valid,
            delay: Duration::ZERO,
            calls: Arc::default(),
            spans: None,
        }
    }

    fn delayed(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    fn grouped(mut self, group: &'static str) -> Self {
        self.group = Some(group);
        self
    }

    fn recording(mut self, spans: Arc<Mutex<Vec<(&'static str, Instant, Instant)>>>) -> Self {
        self.spans = Some(spans);
        self
    }
}

#[async_trait]
impl Watcher for Fixed {
    fn name(&self) -> &str {
        self.name
    }

    fn group(&self) -> Option<&str> {
        self.group
    }

    async fn execute(&self) -> Result<Verdict, BoxError> {
        let start = Instant::now();
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        if let Some(spans) = &self.spans {
            spans.lock().unwrap().push((self.name, start, Instant::now()));
        }
        if self.valid {
            Ok(Verdict::valid("healthy"))
        } else {
            Ok(Verdict::invalid("unhealthy"))
        }
    }
}

/// Blocks on every call after the first
struct BlocksAfterFirst {
    calls: AtomicUsize,
}

#[async_trait]
impl Watcher for BlocksAfterFirst {
    fn name(&self) -> &str {
        "db"
    }

    async fn execute(&self) -> Result<Verdict, BoxError> {
        if self.calls.fetch_add(1, Ordering::SeqCst) > 0 {
            tokio::time::sleep(Duration::from_secs(5)).await;
        }
        Ok(Verdict::valid("replica in sync"))
    }
}

struct Refused;

#[async_trait]
impl Watcher for Refused {
    fn name(&self) -> &str {
        "cache"
    }

    async fn execute(&self) -> Result<Verdict, BoxError> {
        Err("connection refused".into())
    }
}

fn iteration_log(log: &Log) -> IterationHooks {
    let (s, f, c) = (log.clone(), log.clone(), log.clone());
    Hooks::new()
        .on_success(Hook::sync(move |it: &Iteration| {
            s.lock().unwrap().push(format!("success #{}", it.ordinal));
            Ok(())
        }))
        .on_failure(Hook::sync(move |it: &Iteration| {
            f.lock().unwrap().push(format!("failure #{}", it.ordinal));
            Ok(())
        }))
        .on_completed(Hook::sync(move |it: &Iteration| {
            c.lock().unwrap().push(format!("completed #{}", it.ordinal));
            Ok(())
        }))
}

fn count(log: &Log, prefix: &str) -> usize {
    log.lock().unwrap().iter().filter(|e| e.starts_with(prefix)).count()
}

#[tokio::test(start_paused = true)]
async fn test_single_valid_watcher_once() {
    let log: Log = Arc::default();
    let config = MonitorConfig::builder()
        .add_watcher(Fixed::new("api", true), None, None)
        .set_hooks(iteration_log(&log))
        .run_only_once()
        .retain_iterations(1)
        .build()
        .unwrap();

    let monitor = ControlLoop::new(config).start();
    let handle = monitor.handle().clone();
    let summary = monitor.wait().await.unwrap();

    assert_eq!(summary.iterations_completed, 1);
    let iterations = handle.recent_iterations();
    assert_eq!(iterations.len(), 1);
    assert_eq!(iterations[0].ordinal, 1);
    assert!(iterations[0].is_valid());
    assert_eq!(*log.lock().unwrap(), vec!["success #1", "completed #1"]);
}

#[tokio::test(start_paused = true)]
async fn test_single_invalid_watcher_once() {
    let log: Log = Arc::default();
    let config = MonitorConfig::builder()
        .add_watcher(Fixed::new("api", false), None, None)
        .set_hooks(iteration_log(&log))
        .run_only_once()
        .build()
        .unwrap();

    ControlLoop::new(config).run().await;
    assert_eq!(count(&log, "failure"), 1);
    assert_eq!(count(&log, "success"), 0);
    assert_eq!(count(&log, "completed"), 1);
}

#[tokio::test(start_paused = true)]
async fn test_pause_start_runs_nothing_while_paused() {
    let watcher = Fixed::new("api", true);
    let calls = watcher.calls.clone();
    let config = MonitorConfig::builder()
        .add_watcher(watcher, None, Some(Duration::from_secs(10)))
        .build()
        .unwrap();

    let monitor = ControlLoop::new(config).start();
    let handle = monitor.handle().clone();
    tokio::time::sleep(Duration::from_secs(1)).await;
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    handle.pause();
    handle.resume();
    tokio::time::sleep(Duration::from_secs(4)).await;
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(handle.state(), ControlState::Running);

    tokio::time::sleep(Duration::from_secs(6)).await;
    assert_eq!(calls.load(Ordering::SeqCst), 2);

    handle.stop();
    assert_eq!(monitor.wait().await.unwrap().final_state, ControlState::Stopped);
}

#[tokio::test(start_paused = true)]
async fn test_kill_during_blocking_watcher() {
    let log: Log = Arc::default();
    let config = MonitorConfig::builder()
        .add_watcher(
            BlocksAfterFirst {
                calls: AtomicUsize::new(0),
            },
            None,
            Some(Duration::from_secs(2)),
        )
        .set_hooks(iteration_log(&log))
        .retain_iterations(5)
        .build()
        .unwrap();

    let began = Instant::now();
    let monitor = ControlLoop::new(config).start();
    let handle = monitor.handle().clone();
    // tick 1 completes at once, tick 2 starts at 2s and blocks for 5s
    tokio::time::sleep(Duration::from_secs(3)).await;
    handle.kill();

    let summary = monitor.wait().await.unwrap();
    assert_eq!(summary.final_state, ControlState::Killed);
    assert_eq!(summary.iterations_completed, 1);
    let ordinals: Vec<u64> = handle.recent_iterations().iter().map(|i| i.ordinal).collect();
    assert_eq!(ordinals, vec![1]);
    assert_eq!(count(&log, "completed"), 1);
    // halted well before the blocked call would have returned at 7s
    assert!(began.elapsed() < Duration::from_secs(4));
}

#[tokio::test(start_paused = true)]
async fn test_faulting_watcher_reported_and_loop_continues() {
    let faults: Arc<Mutex<Vec<Fault>>> = Arc::default();
    let outcomes: Log = Arc::default();
    let (f, o1, o2) = (faults.clone(), outcomes.clone(), outcomes.clone());
    let global: WatcherHooks = Hooks::new()
        .on_error(Hook::sync(move |fault: &Fault| {
            f.lock().unwrap().push(fault.clone());
            Ok(())
        }))
        .on_success(Hook::sync(move |r: &CheckResult| {
            o1.lock().unwrap().push(format!("success {}", r.watcher_name()));
            Ok(())
        }))
        .on_failure(Hook::sync(move |r: &CheckResult| {
            o2.lock().unwrap().push(format!("failure {}", r.watcher_name()));
            Ok(())
        }));

    let config = MonitorConfig::builder()
        .add_watcher(Refused, None, Some(Duration::from_secs(1)))
        .set_global_watcher_hooks(global)
        .retain_iterations(10)
        .build()
        .unwrap();

    let monitor = ControlLoop::new(config).start();
    let handle = monitor.handle().clone();
    tokio::time::sleep(Duration::from_millis(1500)).await;
    handle.stop();
    let summary = monitor.wait().await.unwrap();

    assert_eq!(summary.iterations_completed, 2);
    for iteration in handle.recent_iterations() {
        let result = iteration.result_for("cache").unwrap();
        assert!(!result.is_valid);
        assert!(result.description.contains("connection refused"));
    }
    let faults = faults.lock().unwrap();
    assert_eq!(faults.len(), 2);
    assert!(faults.iter().all(|f| f.source == FaultSource::Watcher { name: "cache".into() }));
    assert!(outcomes.lock().unwrap().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_group_serializes_watchers() {
    let spans: Arc<Mutex<Vec<(&'static str, Instant, Instant)>>> = Arc::default();
    let config = MonitorConfig::builder()
        .add_watcher(
            Fixed::new("primary", true)
                .grouped("db")
                .delayed(Duration::from_secs(2))
                .recording(spans.clone()),
            None,
            None,
        )
        .add_watcher(
            Fixed::new("replica", true)
                .grouped("db")
                .delayed(Duration::from_secs(1))
                .recording(spans.clone()),
            None,
            None,
        )
        .build()
        .unwrap();

    let iteration = run_once(config).await.unwrap();
    assert!(iteration.is_valid());
    assert!(iteration.execution_time >= Duration::from_secs(3));
    assert!(iteration.execution_time < Duration::from_millis(3100));

    let spans = spans.lock().unwrap();
    assert_eq!(spans.len(), 2);
    let (first, second) = (&spans[0], &spans[1]);
    assert_eq!(first.0, "primary");
    assert!(second.1 >= first.2, "group members overlapped");
}

#[tokio::test(start_paused = true)]
async fn test_remote_commands_and_events() {
    let source = Arc::new(ChannelCommandSource::new());
    let (handler, mut events) = ChannelEventHandler::new();
    let watcher = Fixed::new("api", true);
    let calls = watcher.calls.clone();
    let config = MonitorConfig::builder()
        .add_watcher(watcher, None, Some(Duration::from_secs(5)))
        .set_command_source(source.clone())
        .set_event_handler(Arc::new(handler))
        .build()
        .unwrap();

    let monitor = ControlLoop::new(config).start();

    source.send(Command::Ping);
    assert!(matches!(events.recv().await, Some(Event::PingResponded { .. })));
    assert_eq!(monitor.handle().state(), ControlState::Created);
    assert_eq!(calls.load(Ordering::SeqCst), 0);

    source.send(Command::Start);
    match events.recv().await {
        Some(Event::CommandExecuted { command, .. }) => assert_eq!(command, Command::Start),
        other => panic!("unexpected event {:?}", other),
    }
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    source.send(Command::Pause);
    source.send(Command::Stop);
    let summary = monitor.wait().await.unwrap();
    assert_eq!(summary.final_state, ControlState::Stopped);

    let mut acknowledged = Vec::new();
    while let Some(event) = events.recv().await {
        if let Event::CommandExecuted { command, .. } = event {
            acknowledged.push(command);
        }
    }
    assert_eq!(acknowledged, vec![Command::Pause, Command::Stop]);
}

#[tokio::test]
async fn test_command_watchers_check() {
    let config = MonitorConfig::builder()
        .add_watcher(CommandWatcher::simple("shell-ok", "echo up"), None, None)
        .add_watcher(
            CommandWatcher::new("shell-down", CommandWatcherConfig::new("exit 2").group("host")),
            None,
            None,
        )
        .build()
        .unwrap();

    let iteration = run_once(config).await.unwrap();
    assert!(!iteration.is_valid());
    assert!(iteration.result_for("shell-ok").unwrap().is_valid);
    let failed: Vec<&str> = iteration.failed_results().map(|r| r.watcher_name()).collect();
    assert_eq!(failed, vec!["shell-down"]);
}
