use std::fmt::Write;
use std::path::Path;

use anyhow::{Context, Result};
use owo_colors::OwoColorize;
use tracing::debug;

use pysweep_cache::{SweepReporter, Sweeper};

use crate::commands::{ExitStatus, human_readable_bytes};
use crate::printer::Printer;

/// Remove every `__pycache__` directory beneath the given root.
pub(crate) fn clean(root: &Path, printer: Printer) -> Result<ExitStatus> {
    let sweeper = Sweeper::new(root);
    let reporter = PrinterReporter { printer };
    let summary = sweeper.sweep(Some(&reporter)).with_context(|| {
        format!(
            "Failed to sweep cache directories under: {}",
            root.display()
        )
    })?;

    // Write a summary of the number of directories removed, unless the sweep
    // found nothing.
    if summary.num_dirs > 0 {
        match summary.num_dirs {
            1 => write!(printer.stderr(), "Removed 1 directory")?,
            num_dirs_removed => {
                write!(printer.stderr(), "Removed {num_dirs_removed} directories")?;
            }
        }

        // If any, write a summary of the total byte count removed.
        if summary.total_bytes > 0 {
            let bytes = if summary.total_bytes < 1024 {
                format!("{}B", summary.total_bytes)
            } else {
                let (bytes, unit) = human_readable_bytes(summary.total_bytes);
                format!("{bytes:.1}{unit}")
            };
            write!(printer.stderr(), " ({})", bytes.green())?;
        }

        writeln!(printer.stderr())?;
    } else {
        debug!("No cache directories found under: {}", root.display());
    }

    Ok(ExitStatus::Success)
}

/// Announces each cache directory on stdout as it is removed.
struct PrinterReporter {
    printer: Printer,
}

impl SweepReporter for PrinterReporter {
    fn on_remove(&self, path: &Path) {
        let _ = writeln!(
            self.printer.stdout(),
            "Removing cache directory: {}",
            path.display().cyan()
        );
    }
}
