//! Lifecycle hooks
//!
//! Hooks are plain data: a struct of optional callback slots. Each slot holds
//! either a synchronous closure or an asynchronous one returning a boxed future.
//! The same shape serves both watcher results and whole iterations:
//!
//! - `WatcherHooks` = `Hooks<WatcherInfo, CheckResult>`
//! - `IterationHooks` = `Hooks<u64, Iteration>` (the start slot receives the ordinal)

pub mod dispatcher;

use std::any::Any;
use std::fmt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use futures::future::BoxFuture;

use crate::domain::{CheckResult, Fault, Iteration, WatcherInfo};
use crate::error::BoxError;

pub use dispatcher::HookDispatcher;

/// Return type of every hook callback
pub type HookResult = std::result::Result<(), BoxError>;

type SyncHookFn<T> = dyn Fn(&T) -> HookResult + Send + Sync;
type AsyncHookFn<T> = dyn Fn(T) -> BoxFuture<'static, HookResult> + Send + Sync;

/// A single callback, synchronous or asynchronous
pub enum Hook<T> {
    Sync(Arc<SyncHookFn<T>>),
    Async(Arc<AsyncHookFn<T>>),
}

impl<T> Clone for Hook<T> {
    fn clone(&self) -> Self {
        match self {
            Hook::Sync(f) => Hook::Sync(Arc::clone(f)),
            Hook::Async(f) => Hook::Async(Arc::clone(f)),
        }
    }
}

impl<T> fmt::Debug for Hook<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Hook::Sync(_) => write!(f, "Hook::Sync"),
            Hook::Async(_) => write!(f, "Hook::Async"),
        }
    }
}

impl<T: Clone + Send + 'static> Hook<T> {
    /// Wrap a synchronous callback
    pub fn sync<F>(f: F) -> Self
    where
        F: Fn(&T) -> HookResult + Send + Sync + 'static,
    {
        Hook::Sync(Arc::new(f))
    }

    /// Wrap an asynchronous callback; it receives an owned copy of the argument
    pub fn from_async<F, Fut>(f: F) -> Self
    where
        F: Fn(T) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HookResult> + Send + 'static,
    {
        Hook::Async(Arc::new(move |arg| Box::pin(f(arg))))
    }

    /// Invoke the callback. Panics are caught and turned into errors.
    pub async fn invoke(&self, arg: &T) -> HookResult {
        match self {
            Hook::Sync(f) => std::panic::catch_unwind(AssertUnwindSafe(|| f(arg)))
                .unwrap_or_else(|panic| Err(panic_message(panic).into())),
            Hook::Async(f) => {
                let fut = match std::panic::catch_unwind(AssertUnwindSafe(|| f(arg.clone()))) {
                    Ok(fut) => fut,
                    Err(panic) => return Err(panic_message(panic).into()),
                };
                AssertUnwindSafe(fut)
                    .catch_unwind()
                    .await
                    .unwrap_or_else(|panic| Err(panic_message(panic).into()))
            }
        }
    }
}

/// Render a panic payload as text
pub(crate) fn panic_message(panic: Box<dyn Any + Send>) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        format!("panicked: {}", s)
    } else if let Some(s) = panic.downcast_ref::<String>() {
        format!("panicked: {}", s)
    } else {
        "panicked".to_string()
    }
}

/// Lifecycle slot names, used in logs and fault sources
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookSlot {
    Start,
    Success,
    Failure,
    Completed,
    Error,
}

impl fmt::Display for HookSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            HookSlot::Start => "on_start",
            HookSlot::Success => "on_success",
            HookSlot::Failure => "on_failure",
            HookSlot::Completed => "on_completed",
            HookSlot::Error => "on_error",
        };
        write!(f, "{}", name)
    }
}

/// Optional callbacks for each lifecycle point
pub struct Hooks<S, T> {
    pub(crate) on_start: Option<Hook<S>>,
    pub(crate) on_success: Option<Hook<T>>,
    pub(crate) on_failure: Option<Hook<T>>,
    pub(crate) on_completed: Option<Hook<T>>,
    pub(crate) on_error: Option<Hook<Fault>>,
}

/// Hooks applied to watcher results
pub type WatcherHooks = Hooks<WatcherInfo, CheckResult>;

/// Hooks applied to whole iterations and control-plane faults
pub type IterationHooks = Hooks<u64, Iteration>;

impl<S, T> Default for Hooks<S, T> {
    fn default() -> Self {
        Self {
            on_start: None,
            on_success: None,
            on_failure: None,
            on_completed: None,
            on_error: None,
        }
    }
}

impl<S, T> Clone for Hooks<S, T> {
    fn clone(&self) -> Self {
        Self {
            on_start: self.on_start.clone(),
            on_success: self.on_success.clone(),
            on_failure: self.on_failure.clone(),
            on_completed: self.on_completed.clone(),
            on_error: self.on_error.clone(),
        }
    }
}

impl<S, T> fmt::Debug for Hooks<S, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Hooks")
            .field("on_start", &self.on_start.is_some())
            .field("on_success", &self.on_success.is_some())
            .field("on_failure", &self.on_failure.is_some())
            .field("on_completed", &self.on_completed.is_some())
            .field("on_error", &self.on_error.is_some())
            .finish()
    }
}

impl<S, T> Hooks<S, T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_start(mut self, hook: Hook<S>) -> Self {
        self.on_start = Some(hook);
        self
    }

    pub fn on_success(mut self, hook: Hook<T>) -> Self {
        self.on_success = Some(hook);
        self
    }

    pub fn on_failure(mut self, hook: Hook<T>) -> Self {
        self.on_failure = Some(hook);
        self
    }

    pub fn on_completed(mut self, hook: Hook<T>) -> Self {
        self.on_completed = Some(hook);
        self
    }

    pub fn on_error(mut self, hook: Hook<Fault>) -> Self {
        self.on_error = Some(hook);
        self
    }

    /// No slot is populated
    pub fn is_empty(&self) -> bool {
        self.on_start.is_none()
            && self.on_success.is_none()
            && self.on_failure.is_none()
            && self.on_completed.is_none()
            && self.on_error.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn test_sync_hook_invoked() {
        let calls = Arc::new(AtomicUsize::new(0));
        let c = calls.clone();
        let hook: Hook<u64> = Hook::sync(move |n| {
            c.fetch_add(*n as usize, Ordering::SeqCst);
            Ok(())
        });
        hook.invoke(&3).await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_async_hook_invoked() {
        let calls = Arc::new(AtomicUsize::new(0));
        let c = calls.clone();
        let hook: Hook<u64> = Hook::from_async(move |n| {
            let c = c.clone();
            async move {
                tokio::task::yield_now().await;
                c.fetch_add(n as usize, Ordering::SeqCst);
                Ok::<(), BoxError>(())
            }
        });
        hook.invoke(&5).await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 5);
    }

    #[tokio::test]
    async fn test_hook_error_returned() {
        let hook: Hook<u64> = Hook::sync(|_| Err("webhook rejected".into()));
        let err = hook.invoke(&1).await.unwrap_err();
        assert_eq!(err.to_string(), "webhook rejected");
    }

    #[tokio::test]
    async fn test_sync_panic_caught() {
        let hook: Hook<u64> = Hook::sync(|_| panic!("bad hook"));
        let err = hook.invoke(&1).await.unwrap_err();
        assert_eq!(err.to_string(), "panicked: bad hook");
    }

    #[tokio::test]
    async fn test_async_panic_caught() {
        let hook: Hook<u64> = Hook::from_async(|n: u64| async move {
            if n > 0 {
                panic!("async boom");
            }
            Ok::<(), BoxError>(())
        });
        let err = hook.invoke(&1).await.unwrap_err();
        assert!(err.to_string().contains("async boom"));
    }

    #[test]
    fn test_hooks_builder() {
        let hooks: WatcherHooks = Hooks::new();
        assert!(hooks.is_empty());

        let hooks = hooks.on_failure(Hook::sync(|_| Ok(())));
        assert!(!hooks.is_empty());
        assert!(hooks.on_failure.is_some());
        assert!(hooks.on_success.is_none());
    }

    #[test]
    fn test_hook_slot_display() {
        assert_eq!(HookSlot::Completed.to_string(), "on_completed");
        assert_eq!(HookSlot::Error.to_string(), "on_error");
    }
}
