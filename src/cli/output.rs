//! Terminal output for results, iterations and faults.

use colored::*;
use tickwatch::domain::{CheckResult, Fault, Iteration};
use tickwatch::hooks::{Hook, Hooks, IterationHooks, WatcherHooks};

pub fn result_line(result: &CheckResult) -> String {
    let status = if result.is_valid { "ok".green() } else { "FAIL".red() };
    format!(
        "  {:>4} {} ({}ms) {}",
        status,
        result.watcher_name().bold(),
        result.elapsed.as_millis(),
        result.description
    )
}

pub fn iteration_line(iteration: &Iteration) -> String {
    let failed = iteration.failed_results().count();
    let summary = if iteration.is_valid() {
        format!("all {} valid", iteration.results.len()).green()
    } else {
        format!("{} of {} invalid", failed, iteration.results.len()).red()
    };
    format!(
        "{} #{} {} in {}ms",
        "Iteration".cyan(),
        iteration.ordinal,
        summary,
        iteration.execution_time.as_millis()
    )
}

pub fn fault_line(fault: &Fault) -> String {
    format!("  {} {}", "error:".red().bold(), fault)
}

/// Hooks that print each watcher result and fault as it happens
pub fn watcher_printer() -> WatcherHooks {
    Hooks::new()
        .on_completed(Hook::sync(|result: &CheckResult| {
            println!("{}", result_line(result));
            Ok(())
        }))
        .on_error(Hook::sync(|fault: &Fault| {
            eprintln!("{}", fault_line(fault));
            Ok(())
        }))
}

/// Hooks that print an iteration summary and control-plane faults
pub fn iteration_printer() -> IterationHooks {
    Hooks::new()
        .on_completed(Hook::sync(|iteration: &Iteration| {
            println!("{}", iteration_line(iteration));
            Ok(())
        }))
        .on_error(Hook::sync(|fault: &Fault| {
            eprintln!("{}", fault_line(fault));
            Ok(())
        }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use std::time::Duration;
    use tickwatch::domain::{Verdict, WatcherInfo};

    fn plain() {
        colored::control::set_override(false);
    }

    #[test]
    fn test_result_line() {
        plain();
        let result = CheckResult::from_verdict(
            WatcherInfo::new("api", None),
            Verdict::valid("GET / -> 200 OK"),
            Duration::from_millis(12),
        );
        assert_eq!(result_line(&result), "    ok api (12ms) GET / -> 200 OK");
    }

    #[test]
    fn test_iteration_line_counts_failures() {
        plain();
        let ok = CheckResult::from_verdict(WatcherInfo::new("a", None), Verdict::valid("ok"), Duration::ZERO);
        let bad = CheckResult::failed(WatcherInfo::new("b", None), "down", Duration::ZERO);
        let iteration = Iteration {
            ordinal: 3,
            started_at: Utc::now(),
            completed_at: Utc::now(),
            execution_time: Duration::from_millis(40),
            results: vec![ok, bad],
        };
        assert_eq!(iteration_line(&iteration), "Iteration #3 1 of 2 invalid in 40ms");
    }
}
