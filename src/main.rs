use anyhow::{bail, Context, Result};
use audiopreview::page::{parse_actions, SimulatedPage};
use audiopreview::PreviewConfig;
use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Replay user actions against the preview players of a page and print the
/// resulting player states as JSON.
#[derive(Debug, Parser)]
#[command(name = "audiopreview", version, about)]
struct Cli {
    /// Rendered HTML page containing the preview players
    #[arg(long)]
    page: PathBuf,

    /// JSON array of actions, e.g. [{"action":"play","ordinal":0}]
    #[arg(long)]
    script: Option<PathBuf>,

    /// Seeks landing above this position (seconds) resume playback
    #[arg(long)]
    seek_threshold: Option<f64>,

    /// Maximum number of events handled per action
    #[arg(long)]
    max_cascade: Option<usize>,

    /// Class name identifying preview players
    #[arg(long)]
    player_class: Option<String>,
}

impl Cli {
    fn config(&self) -> PreviewConfig {
        let mut cfg = PreviewConfig::default();
        if let Some(t) = self.seek_threshold {
            cfg.seek_resume_threshold = t;
        }
        if let Some(n) = self.max_cascade {
            cfg.max_cascade = n;
        }
        if let Some(class) = &self.player_class {
            cfg.player_class = class.clone();
        }
        cfg
    }
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn run(cli: Cli) -> Result<()> {
    let config = cli.config();
    config.validate().context("invalid options")?;

    let mut page = SimulatedPage::from_file(&cli.page, &config)
        .with_context(|| format!("load page {}", cli.page.display()))?;
    if page.players().is_empty() {
        bail!("no preview players found in {}", cli.page.display());
    }

    let actions = match &cli.script {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("read script {}", path.display()))?;
            parse_actions(&text).with_context(|| format!("parse script {}", path.display()))?
        }
        None => Vec::new(),
    };

    for action in &actions {
        let handled = page.apply(action);
        log::debug!("{:?} handled {} events", action, handled);
    }
    log::info!(
        "applied {} actions to {} players",
        actions.len(),
        page.players().len()
    );

    let out = serde_json::to_string_pretty(&page.snapshot()).context("serialize snapshot")?;
    println!("{}", out);
    Ok(())
}

fn main() {
    init_logging();
    let cli = Cli::parse();
    if let Err(e) = run(cli) {
        eprintln!("audiopreview: {:#}", e);
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const PAGE: &str = r#"<html><body>
<audio class="audiopreview" audiopreview_nb="0" preload="auto"></audio>
<audio class="audiopreview" audiopreview_nb="1" preload="none"></audio>
</body></html>"#;

    fn temp_with(contents: &str) -> NamedTempFile {
        let mut f = NamedTempFile::new().unwrap();
        f.write_all(contents.as_bytes()).unwrap();
        f
    }

    fn cli(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("audiopreview").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn flags_override_defaults() {
        let c = cli(&[
            "--page",
            "p.html",
            "--seek-threshold",
            "0.5",
            "--max-cascade",
            "16",
            "--player-class",
            "preview",
        ]);
        let cfg = c.config();
        assert_eq!(cfg.seek_resume_threshold, 0.5);
        assert_eq!(cfg.max_cascade, 16);
        assert_eq!(cfg.player_class, "preview");
        assert_eq!(cfg.ordinal_attribute, "audiopreview_nb");
    }

    #[test]
    fn no_flags_keep_defaults() {
        let c = cli(&["--page", "p.html"]);
        assert!(c.script.is_none());
        assert_eq!(c.config(), PreviewConfig::default());
    }

    #[test]
    fn page_is_required() {
        assert!(Cli::try_parse_from(["audiopreview"]).is_err());
    }

    #[test]
    fn run_fails_without_players() {
        let page = temp_with("<html><body><p>nothing here</p></body></html>");
        let c = cli(&["--page", page.path().to_str().unwrap()]);
        let err = run(c).unwrap_err();
        assert!(format!("{:#}", err).contains("no preview players"));
    }

    #[test]
    fn run_fails_on_malformed_script() {
        let page = temp_with(PAGE);
        let script = temp_with(r#"[{"action":"jump"}]"#);
        let c = cli(&[
            "--page",
            page.path().to_str().unwrap(),
            "--script",
            script.path().to_str().unwrap(),
        ]);
        let err = run(c).unwrap_err();
        assert!(format!("{:#}", err).contains("parse script"));
    }

    #[test]
    fn run_rejects_invalid_flags() {
        let page = temp_with(PAGE);
        let c = cli(&["--page", page.path().to_str().unwrap(), "--max-cascade", "0"]);
        assert!(run(c).is_err());
    }

    #[test]
    fn run_succeeds_with_valid_script() {
        let page = temp_with(PAGE);
        let script = temp_with(r#"[{"action":"play","ordinal":0},{"action":"finish","ordinal":0}]"#);
        let c = cli(&[
            "--page",
            page.path().to_str().unwrap(),
            "--script",
            script.path().to_str().unwrap(),
        ]);
        assert!(run(c).is_ok());
    }
}
