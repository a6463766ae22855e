use std::{path::Path, time::Duration};

use anyhow::{Context, Result};
use glint_core::{PageSession, PageSignal};
use indicatif::{ProgressBar, ProgressStyle};
use serde::Deserialize;
use tokio::{
    fs::File,
    io::{AsyncBufReadExt, BufReader},
};

/// One line of a recorded session: a page signal, optionally delayed
/// relative to the previous line.
#[derive(Debug, Deserialize)]
pub struct ReplayLine {
    #[serde(default)]
    pub after_ms: u64,
    #[serde(flatten)]
    pub signal: PageSignal,
}

pub fn parse_line(line: &str) -> Result<Option<ReplayLine>> {
    let trimmed = line.trim();
    if trimmed.is_empty() || trimmed.starts_with("//") {
        return Ok(None);
    }
    Ok(Some(serde_json::from_str(trimmed)?))
}

pub async fn load(path: &Path) -> Result<Vec<ReplayLine>> {
    let file = File::open(path)
        .await
        .with_context(|| format!("opening {}", path.display()))?;
    let mut lines = BufReader::new(file).lines();

    let mut out = Vec::new();
    let mut n = 0usize;
    while let Some(line) = lines.next_line().await? {
        n += 1;
        if let Some(parsed) =
            parse_line(&line).with_context(|| format!("{}:{}", path.display(), n))?
        {
            out.push(parsed);
        }
    }
    Ok(out)
}

/// Feeds every line to the page session, honouring delays scaled by `speed`.
pub async fn run(page: &mut PageSession, lines: Vec<ReplayLine>, speed: f64) -> Result<()> {
    let pb = ProgressBar::new(lines.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.cyan} [{bar:30.cyan/blue}] {pos}/{len} signals")?
            .progress_chars("=> "),
    );

    for line in lines {
        if line.after_ms > 0 && speed > 0.0 {
            let delay = Duration::from_secs_f64(line.after_ms as f64 / 1000.0 / speed);
            tokio::time::sleep(delay).await;
        }
        pb.suspend(|| tracing::debug!(signal = ?line.signal, "replaying"));
        page.handle(line.signal).await;
        pb.inc(1);
    }

    pb.finish_and_clear();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn skips_blank_and_comment_lines() {
        assert!(parse_line("   ").unwrap().is_none());
        assert!(parse_line("// hero section").unwrap().is_none());
    }

    #[test]
    fn delay_is_optional() {
        let line = parse_line(r#"{"kind":"page_hide"}"#).unwrap().unwrap();
        assert_eq!(line.after_ms, 0);

        let line = parse_line(r#"{"after_ms":250,"kind":"resize","width":390,"height":844}"#)
            .unwrap()
            .unwrap();
        assert_eq!(line.after_ms, 250);
        assert!(matches!(
            line.signal,
            PageSignal::Resize {
                width: 390,
                height: 844
            }
        ));
    }

    #[tokio::test]
    async fn load_reports_line_numbers() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, r#"{{"kind":"page_hide"}}"#).unwrap();
        writeln!(file, "not json").unwrap();

        let err = load(file.path()).await.unwrap_err();
        assert!(format!("{err:#}").contains(":2"));
    }
}
