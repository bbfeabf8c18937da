//! ControlLoop - drives the scheduler under the command/event plane.
//!
//! Each cycle:
//! 1. Drains pending commands in FIFO order and applies them
//! 2. Exits once Stopped or Killed
//! 3. Created/Paused: waits for a command or the poll interval
//! 4. Running: runs a tick if anything is due, then waits until the next due
//!    time or the next command
//!
//! Commands keep flowing while a tick runs. Pings are answered at once, an
//! accepted Kill abandons the in-flight tick, and Stop or Pause let it finish.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use super::handle::{CommandSender, ControlHandle, History, RunSummary, RunningMonitor};
use crate::config::MonitorConfig;
use crate::control::{CommandCallback, CommandController, CommandEffect, CommandSource, EventPublisher};
use crate::domain::{Command, ControlState, Event, Fault, Iteration};
use crate::hooks::HookDispatcher;
use crate::scheduler::{DueWatcher, IterationScheduler};
use crate::watcher::WatcherExecutor;

/// Top-level driver
pub struct ControlLoop {
    config: MonitorConfig,
}

impl ControlLoop {
    pub fn new(config: MonitorConfig) -> Self {
        Self { config }
    }

    /// Spawn the driver on the current runtime
    pub fn start(self) -> RunningMonitor {
        let (driver, handle) = self.prepare();
        let task = tokio::spawn(driver.run());
        RunningMonitor::new(handle, task)
    }

    /// Run the driver on the calling task until it exits
    pub async fn run(self) -> RunSummary {
        let (driver, _handle) = self.prepare();
        driver.run().await
    }

    fn prepare(self) -> (Driver, ControlHandle) {
        let config = self.config;
        let (tx, rx) = mpsc::unbounded_channel();
        let sender = CommandSender::new(tx);
        let (state_tx, state_rx) = watch::channel(ControlState::Created);
        let history = History::new(config.retain_iterations);

        let registration = config.command_source.map(|source| {
            let sender = sender.clone();
            let callback: CommandCallback = Arc::new(move |command: Command| {
                if !sender.send(command) {
                    log::debug!("Control loop gone, dropping {}", command);
                }
            });
            source.on_command_received(Arc::clone(&callback));
            (source, callback)
        });

        let dispatcher = HookDispatcher::new(config.global_watcher_hooks, config.iteration_hooks);
        let scheduler = IterationScheduler::new(
            config.watchers,
            config.default_interval,
            WatcherExecutor::new(config.watcher_timeout),
            dispatcher.clone(),
        )
        .with_max_in_flight(config.max_in_flight);

        let driver = Driver {
            scheduler,
            plane: CommandPlane {
                controller: CommandController::new(),
                dispatcher: dispatcher.clone(),
                rx,
                kill: CancellationToken::new(),
                state_tx,
                run_only_once: config.run_only_once,
                pending_start_ack: false,
                commands_open: true,
            },
            dispatcher,
            event_handler: config.event_handler,
            event_grace: config.event_grace_period,
            history: history.clone(),
            poll_interval: config.poll_interval,
            run_only_once: config.run_only_once,
            auto_start: registration.is_none(),
            registration,
        };

        (driver, ControlHandle::new(sender, state_rx, history))
    }
}

impl std::fmt::Debug for ControlLoop {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ControlLoop").field("config", &self.config).finish()
    }
}

struct Driver {
    scheduler: IterationScheduler,
    plane: CommandPlane,
    dispatcher: HookDispatcher,
    event_handler: Option<Arc<dyn crate::control::EventHandler>>,
    event_grace: Duration,
    history: History,
    poll_interval: Duration,
    run_only_once: bool,
    auto_start: bool,
    /// Source and the callback registered with it; removed on exit
    registration: Option<(Arc<dyn CommandSource>, CommandCallback)>,
}

impl Driver {
    async fn run(mut self) -> RunSummary {
        let publisher = EventPublisher::spawn(self.event_handler.take(), self.dispatcher.clone(), self.event_grace);

        if self.run_only_once {
            self.run_once(&publisher).await;
        } else {
            if self.auto_start {
                self.plane.apply(Command::Start, &publisher).await;
                self.plane.pending_start_ack = false;
            }
            self.run_loop(&publisher).await;
        }

        if let Some((source, callback)) = self.registration.take() {
            source.remove_callback(&callback);
        }

        let summary = RunSummary {
            iterations_completed: self.scheduler.completed_iterations(),
            final_state: self.plane.controller.state(),
        };
        tracing::info!(
            state = %summary.final_state,
            iterations = summary.iterations_completed,
            "Control loop exited"
        );
        publisher.shutdown().await;
        summary
    }

    async fn run_loop(&mut self, publisher: &EventPublisher) {
        loop {
            self.plane.drain(publisher).await;

            let state = self.plane.controller.state();
            if state.is_terminal() {
                break;
            }

            if !state.is_running() {
                if !self.plane.commands_open {
                    log::warn!("Command channel closed while {}, exiting", state);
                    break;
                }
                self.plane.wait(self.poll_interval, publisher).await;
                continue;
            }

            if let Some(due) = self.scheduler.due_watchers(Instant::now()) {
                // a Start that lands mid-tick is acked after the next tick
                let ack_due = self.plane.pending_start_ack;
                if let Some(iteration) = self.tick(due, publisher).await {
                    if ack_due {
                        self.plane.flush_start_ack(publisher);
                    }
                    self.history.push(iteration);
                }
                continue;
            }

            let idle = self.scheduler.time_until_next_due(Instant::now());
            tracing::trace!(idle_ms = idle.as_millis() as u64, "Waiting for next due watcher");
            self.plane.wait(idle, publisher).await;
        }
    }

    /// One tick over every watcher, then stop. Only pings are honoured.
    async fn run_once(&mut self, publisher: &EventPublisher) {
        self.plane.apply(Command::Start, publisher).await;
        self.plane.pending_start_ack = false;
        self.plane.drain(publisher).await;

        let due = self.scheduler.all_watchers(Instant::now());
        if let Some(iteration) = self.tick(due, publisher).await {
            self.history.push(iteration);
        }

        self.plane.drain(publisher).await;
        self.plane.apply(Command::Stop, publisher).await;
    }

    /// Run a tick while still applying commands as they arrive
    async fn tick(&mut self, due: Vec<DueWatcher>, publisher: &EventPublisher) -> Option<Iteration> {
        let kill = self.plane.kill.clone();
        let tick = self.scheduler.run_tick(due, &kill);
        tokio::pin!(tick);

        loop {
            tokio::select! {
                iteration = &mut tick => return iteration,
                command = self.plane.rx.recv(), if self.plane.commands_open => match command {
                    Some(command) => self.plane.handle(command, publisher).await,
                    None => self.plane.commands_open = false,
                },
            }
        }
    }
}

/// Command intake and the control state machine
struct CommandPlane {
    controller: CommandController,
    dispatcher: HookDispatcher,
    rx: mpsc::UnboundedReceiver<Command>,
    /// Cancelled once Kill is accepted
    kill: CancellationToken,
    state_tx: watch::Sender<ControlState>,
    run_only_once: bool,
    /// Start is acknowledged after the first tick that follows it
    pending_start_ack: bool,
    commands_open: bool,
}

impl CommandPlane {
    async fn drain(&mut self, publisher: &EventPublisher) {
        loop {
            match self.rx.try_recv() {
                Ok(command) => self.handle(command, publisher).await,
                Err(mpsc::error::TryRecvError::Empty) => break,
                Err(mpsc::error::TryRecvError::Disconnected) => {
                    self.commands_open = false;
                    break;
                }
            }
        }
    }

    /// Sleep for `timeout` unless a command arrives first
    async fn wait(&mut self, timeout: Duration, publisher: &EventPublisher) {
        if !self.commands_open {
            tokio::time::sleep(timeout).await;
            return;
        }

        let received = tokio::select! {
            _ = tokio::time::sleep(timeout) => None,
            command = self.rx.recv() => Some(command),
        };
        match received {
            Some(Some(command)) => self.handle(command, publisher).await,
            Some(None) => self.commands_open = false,
            None => {}
        }
    }

    async fn handle(&mut self, command: Command, publisher: &EventPublisher) {
        if self.run_only_once && command != Command::Ping {
            log::info!("Ignoring {} in run-once mode", command);
            return;
        }
        self.apply(command, publisher).await;
    }

    async fn apply(&mut self, command: Command, publisher: &EventPublisher) {
        match self.controller.apply(command) {
            Ok(CommandEffect::PingAnswered) => {
                tracing::debug!(state = %self.controller.state(), "Ping answered");
                publisher.publish(Event::ping_responded());
            }
            Ok(CommandEffect::Transitioned { to, .. }) => {
                self.state_tx.send_replace(to);
                if command == Command::Start {
                    self.pending_start_ack = true;
                    return;
                }
                if to == ControlState::Killed {
                    self.kill.cancel();
                }
                self.flush_start_ack(publisher);
                publisher.publish(Event::command_executed(command));
            }
            Err(e) => {
                log::warn!("{}", e);
                self.dispatcher
                    .report(&Fault::command(command, e.to_string()))
                    .await;
            }
        }
    }

    fn flush_start_ack(&mut self, publisher: &EventPublisher) {
        if std::mem::take(&mut self.pending_start_ack) {
            publisher.publish(Event::command_executed(Command::Start));
        }
    }
}

/// Run a single tick and return it
pub async fn run_once(config: MonitorConfig) -> Option<Iteration> {
    let mut config = config;
    config.run_only_once = true;
    config.retain_iterations = config.retain_iterations.max(1);
    let monitor = ControlLoop::new(config).start();
    let handle = monitor.handle().clone();
    match monitor.wait().await {
        Ok(_) => handle.recent_iterations().pop(),
        Err(e) => {
            log::error!("Control loop task failed: {}", e);
            None
        }
    }
}
