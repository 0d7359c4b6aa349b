// Where the rendered report ends up
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::Context;
use chrono::{DateTime, Local};

/// `search_<last package segment>_<timestamp>.log`
pub fn report_filename(package: &str, now: DateTime<Local>) -> String {
    let last = package
        .trim_end_matches('/')
        .rsplit('/')
        .next()
        .filter(|s| !s.is_empty())
        .unwrap_or("package");
    format!("search_{}_{}.log", last, now.format("%Y-%m-%d_%H:%M:%S"))
}

/// Print to stdout, or drop a file into `output_dir` and return its path
pub fn write_report(
    content: &str,
    output_dir: Option<&Path>,
    package: &str,
) -> anyhow::Result<Option<PathBuf>> {
    let Some(dir) = output_dir else {
        let mut stdout = std::io::stdout().lock();
        stdout.write_all(content.as_bytes())?;
        stdout.flush()?;
        return Ok(None);
    };

    let path = dir.join(report_filename(package, Local::now()));
    std::fs::write(&path, content).with_context(|| format!("writing {}", path.display()))?;
    Ok(Some(path))
}
