//! Progress indicators for iqform CLI.

use colored::Colorize;
use declarative::{Address, ApplyResult, ProgressCallback};
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::sync::Mutex;

const TEMPLATE: &str = "{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}";

/// Progress bar over the resources of one run
///
/// Prints one line per finished resource above the bar. With `quiet` the bar
/// is hidden and only failures are printed.
pub struct BarProgress {
    bar: Mutex<Option<ProgressBar>>,
    quiet: bool,
}

impl BarProgress {
    pub fn new(quiet: bool) -> Self {
        Self {
            bar: Mutex::new(None),
            quiet,
        }
    }

    fn with_bar(&self, f: impl FnOnce(&ProgressBar)) {
        let guard = self
            .bar
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        if let Some(bar) = guard.as_ref() {
            f(bar);
        }
    }
}

impl ProgressCallback for BarProgress {
    fn on_start(&self, count: usize) {
        let bar = if self.quiet {
            ProgressBar::with_draw_target(Some(count as u64), ProgressDrawTarget::hidden())
        } else {
            ProgressBar::new(count as u64)
        };
        bar.set_style(
            ProgressStyle::default_bar()
                .template(TEMPLATE)
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("=>-"),
        );
        *self
            .bar
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner) = Some(bar);
    }

    fn on_resource_start(&self, address: &Address, description: &str) {
        log::debug!("{description} {address}");
        self.with_bar(|bar| bar.set_message(format!("{description} {address}")));
    }

    fn on_resource_complete(&self, address: &Address, result: &ApplyResult) {
        let line = result_line(address, result);
        self.with_bar(|bar| {
            if let Some(line) = &line
                && (!self.quiet || !result.is_success())
            {
                bar.println(line);
            }
            bar.inc(1);
        });
    }

    fn on_complete(&self) {
        self.with_bar(ProgressBar::finish_and_clear);
    }
}

/// One status line for a finished resource, `None` when nothing happened
pub fn result_line(address: &Address, result: &ApplyResult) -> Option<String> {
    let line = match result {
        ApplyResult::NoChange => return None,
        ApplyResult::Created => format!("  {} {} created", "+".green(), address),
        ApplyResult::Replaced => format!("  {} {} replaced", "±".yellow(), address),
        ApplyResult::Removed => format!("  {} {} destroyed", "-".red(), address),
        ApplyResult::Refreshed => format!("  {} {} refreshed", "↻".cyan(), address),
        ApplyResult::Gone => format!(
            "  {} {} {}",
            "⚠".yellow(),
            address,
            "no longer exists, removed from state".dimmed()
        ),
        ApplyResult::Failed { error } => {
            format!("  {} {} {}", "✗".red(), address.to_string().bold(), error)
        }
        ApplyResult::Skipped { reason } => {
            format!("  {} {} {}", "○".dimmed(), address, reason.dimmed())
        }
    };
    Some(line)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_result_line() {
        colored::control::set_override(false);
        let address = Address::new("source_control", "root");

        assert!(result_line(&address, &ApplyResult::NoChange).is_none());
        assert_eq!(
            result_line(&address, &ApplyResult::Created).unwrap(),
            "  + source_control.root created"
        );
        let failed = ApplyResult::Failed {
            error: "Error creating source control entry: boom".into(),
        };
        assert!(result_line(&address, &failed).unwrap().ends_with("boom"));
    }

    #[test]
    fn test_hidden_bar_accepts_callbacks() {
        let progress = BarProgress::new(true);
        let address = Address::new("source_control", "root");
        progress.on_start(1);
        progress.on_resource_start(&address, "Creating");
        progress.on_resource_complete(&address, &ApplyResult::Created);
        progress.on_complete();
    }
}
