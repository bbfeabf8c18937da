//! HookDispatcher - fires lifecycle hooks in a fixed order
//!
//! Per result:
//!   watcher on_start, global on_start, (execution),
//!   watcher success|failure|error, global success|failure|error,
//!   watcher on_completed, global on_completed
//!
//! A failing hook is logged and reported to the global `on_error` once, then
//! dispatch continues. Failures inside `on_error` hooks are only logged.

use std::sync::Arc;

use super::{Hook, HookSlot, IterationHooks, WatcherHooks};
use crate::domain::{Fault, Iteration, WatcherInfo};
use crate::watcher::Execution;

const GLOBAL: &str = "global";
const ITERATION: &str = "iteration";

/// Dispatches watcher-level and iteration-level hooks
#[derive(Debug, Clone, Default)]
pub struct HookDispatcher {
    /// Applied to every watcher result
    global: Arc<WatcherHooks>,
    /// Applied to iterations and control-plane faults
    iteration: Arc<IterationHooks>,
}

impl HookDispatcher {
    pub fn new(global: WatcherHooks, iteration: IterationHooks) -> Self {
        Self {
            global: Arc::new(global),
            iteration: Arc::new(iteration),
        }
    }

    /// Fire `on_start` immediately before a watcher runs
    pub async fn watcher_started(&self, info: &WatcherInfo, hooks: &WatcherHooks) {
        self.fire(&info.name, HookSlot::Start, hooks.on_start.as_ref(), info)
            .await;
        self.fire(GLOBAL, HookSlot::Start, self.global.on_start.as_ref(), info)
            .await;
    }

    /// Fire the outcome hooks and `on_completed` for a finished execution
    pub async fn watcher_finished(&self, execution: &Execution, hooks: &WatcherHooks) {
        let result = &execution.result;
        let name = result.watcher.name.as_str();

        match &execution.fault {
            Some(fault) => {
                fire_error(name, hooks.on_error.as_ref(), fault).await;
                fire_error(GLOBAL, self.global.on_error.as_ref(), fault).await;
            }
            None => {
                let slot = if result.is_valid {
                    HookSlot::Success
                } else {
                    HookSlot::Failure
                };
                let (own, global) = match slot {
                    HookSlot::Success => (&hooks.on_success, &self.global.on_success),
                    _ => (&hooks.on_failure, &self.global.on_failure),
                };
                self.fire(name, slot, own.as_ref(), result).await;
                self.fire(GLOBAL, slot, global.as_ref(), result).await;
            }
        }

        self.fire(name, HookSlot::Completed, hooks.on_completed.as_ref(), result)
            .await;
        self.fire(GLOBAL, HookSlot::Completed, self.global.on_completed.as_ref(), result)
            .await;
    }

    /// Fire the iteration-level `on_start` with the ordinal about to run
    pub async fn iteration_started(&self, ordinal: u64) {
        self.fire_iteration(HookSlot::Start, self.iteration.on_start.as_ref(), &ordinal)
            .await;
    }

    /// Fire the iteration-level outcome hook, then `on_completed`
    pub async fn iteration_completed(&self, iteration: &Iteration) {
        let (slot, hook) = if iteration.is_valid() {
            (HookSlot::Success, self.iteration.on_success.as_ref())
        } else {
            (HookSlot::Failure, self.iteration.on_failure.as_ref())
        };
        self.fire_iteration(slot, hook, iteration).await;
        self.fire_iteration(HookSlot::Completed, self.iteration.on_completed.as_ref(), iteration)
            .await;
    }

    /// Report a control-plane fault (rejected command, delivery failure)
    pub async fn report(&self, fault: &Fault) {
        fire_error(ITERATION, self.iteration.on_error.as_ref(), fault).await;
    }

    async fn fire<T: Clone + Send + Sync + 'static>(
        &self,
        owner: &str,
        slot: HookSlot,
        hook: Option<&Hook<T>>,
        arg: &T,
    ) {
        let Some(hook) = hook else { return };
        if let Err(e) = hook.invoke(arg).await {
            let label = format!("{}.{}", owner, slot);
            tracing::warn!(hook = %label, error = %e, "Hook failed");
            let fault = Fault::hook(label, e.to_string());
            fire_error(GLOBAL, self.global.on_error.as_ref(), &fault).await;
        }
    }

    async fn fire_iteration<T: Clone + Send + Sync + 'static>(
        &self,
        slot: HookSlot,
        hook: Option<&Hook<T>>,
        arg: &T,
    ) {
        let Some(hook) = hook else { return };
        if let Err(e) = hook.invoke(arg).await {
            let label = format!("{}.{}", ITERATION, slot);
            tracing::warn!(hook = %label, error = %e, "Hook failed");
            let fault = Fault::hook(label, e.to_string());
            self.report(&fault).await;
        }
    }
}

async fn fire_error(owner: &str, hook: Option<&Hook<Fault>>, fault: &Fault) {
    let Some(hook) = hook else { return };
    if let Err(e) = hook.invoke(fault).await {
        let label = format!("{}.{}", owner, HookSlot::Error);
        tracing::error!(
            hook = %label,
            error = %e,
            fault = %fault,
            "on_error hook failed"
        );
    }
}
