//! Headless-browser strategies that print the markup document to PDF.
//!
//! Strategies are tried in the configured order and each attempt is isolated: a launch
//! failure, a non-zero exit, a timeout or an empty output file only moves on to the next
//! strategy. When every strategy fails the error lists each attempt.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use log::{debug, info, warn};
use thiserror::Error;
use tokio::process::Command;

use crate::config::{BrowserKind, RenderConfig};

/// Lines of stderr kept in an exit error.
const MAX_ERROR_LINES: usize = 10;

#[derive(Error, Debug)]
pub enum BrowserError {
    #[error("{engine}: executable '{command}' not found")]
    NotFound { engine: String, command: String },

    #[error("{engine}: failed to launch: {source}")]
    Launch {
        engine: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{engine}: timed out after {seconds}s")]
    Timeout { engine: String, seconds: u64 },

    #[error("{engine}: exited with {status}: {stderr}")]
    Exit {
        engine: String,
        status: String,
        stderr: String,
    },

    #[error("{engine}: produced no PDF output")]
    EmptyOutput { engine: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("no browser engines are configured")]
    NoStrategies,

    #[error("all browser engines failed: {}", .0.join("; "))]
    AllStrategiesFailed(Vec<String>),
}

/// One way of turning an HTML file into a PDF file.
#[async_trait]
pub trait BrowserStrategy: Send + Sync {
    /// Short engine name used in logs and errors.
    fn name(&self) -> &str;

    /// Prints `html` into `pdf`. Implementations must not leave a partial file behind
    /// as a success.
    async fn print(&self, html: &Path, pdf: &Path) -> Result<(), BrowserError>;
}

/// Runs an external command to completion within `timeout`, keeping the tail of stderr.
async fn run_command(
    engine: &str,
    program: &str,
    args: Vec<String>,
    timeout: Duration,
) -> Result<(), BrowserError> {
    let mut command = Command::new(program);
    command
        .args(&args)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    debug!("{}: running {} {}", engine, program, args.join(" "));

    let child = match command.spawn() {
        Ok(child) => child,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(BrowserError::NotFound {
                engine: engine.to_string(),
                command: program.to_string(),
            })
        }
        Err(source) => {
            return Err(BrowserError::Launch {
                engine: engine.to_string(),
                source,
            })
        }
    };

    let output = match tokio::time::timeout(timeout, child.wait_with_output()).await {
        Ok(output) => output?,
        Err(_) => {
            return Err(BrowserError::Timeout {
                engine: engine.to_string(),
                seconds: timeout.as_secs(),
            })
        }
    };
    if output.status.success() {
        return Ok(());
    }
    let stderr = String::from_utf8_lossy(&output.stderr);
    let lines: Vec<&str> = stderr.lines().collect();
    let tail = lines[lines.len().saturating_sub(MAX_ERROR_LINES)..].join("\n");
    Err(BrowserError::Exit {
        engine: engine.to_string(),
        status: output.status.to_string(),
        stderr: tail,
    })
}

/// Chrome or Chromium with `--headless --print-to-pdf`.
pub struct ChromiumCli {
    pub binary: String,
    pub timeout: Duration,
}

#[async_trait]
impl BrowserStrategy for ChromiumCli {
    fn name(&self) -> &str {
        BrowserKind::Chromium.name()
    }

    async fn print(&self, html: &Path, pdf: &Path) -> Result<(), BrowserError> {
        let args = vec![
            "--headless".to_string(),
            "--disable-gpu".to_string(),
            "--no-sandbox".to_string(),
            "--no-pdf-header-footer".to_string(),
            "--window-size=1280,720".to_string(),
            "--run-all-compositor-stages-before-draw".to_string(),
            "--virtual-time-budget=5000".to_string(),
            format!("--print-to-pdf={}", pdf.display()),
            format!("file://{}", html.display()),
        ];
        run_command(self.name(), &self.binary, args, self.timeout).await
    }
}

/// The WeasyPrint command line renderer.
pub struct WeasyprintCli {
    pub binary: String,
    pub timeout: Duration,
}

#[async_trait]
impl BrowserStrategy for WeasyprintCli {
    fn name(&self) -> &str {
        BrowserKind::Weasyprint.name()
    }

    async fn print(&self, html: &Path, pdf: &Path) -> Result<(), BrowserError> {
        let args = vec![
            "--quiet".to_string(),
            html.display().to_string(),
            pdf.display().to_string(),
        ];
        run_command(self.name(), &self.binary, args, self.timeout).await
    }
}

/// Builds the strategy chain from the configured engine order.
pub fn strategies_from_config(config: &RenderConfig) -> Vec<Box<dyn BrowserStrategy>> {
    config
        .browsers
        .iter()
        .map(|kind| -> Box<dyn BrowserStrategy> {
            let binary = config.browser_binary(*kind).to_string();
            let timeout = config.browser_timeout();
            match kind {
                BrowserKind::Chromium => Box::new(ChromiumCli { binary, timeout }),
                BrowserKind::Weasyprint => Box::new(WeasyprintCli { binary, timeout }),
            }
        })
        .collect()
}

/// Output path of attempt `index` inside the work directory.
fn attempt_path(dir: &Path, index: usize, name: &str) -> PathBuf {
    dir.join(format!("deck-{}-{}.pdf", index + 1, name))
}

/// Prints `html` with the first strategy that succeeds.
///
/// # Arguments
///
/// * `html` - The complete markup document.
/// * `strategies` - Engines in the order they should be tried.
///
/// # Returns
///
/// The PDF bytes of the first successful engine, or `AllStrategiesFailed` with one
/// entry per attempt.
pub async fn print_to_pdf(
    html: &str,
    strategies: &[Box<dyn BrowserStrategy>],
) -> Result<Vec<u8>, BrowserError> {
    if strategies.is_empty() {
        return Err(BrowserError::NoStrategies);
    }
    let dir = tempfile::tempdir()?;
    let html_path = dir.path().join("deck.html");
    tokio::fs::write(&html_path, html).await?;

    let mut failures = Vec::new();
    for (index, strategy) in strategies.iter().enumerate() {
        let pdf_path = attempt_path(dir.path(), index, strategy.name());
        let attempt = match strategy.print(&html_path, &pdf_path).await {
            Ok(()) => match tokio::fs::read(&pdf_path).await {
                Ok(bytes) if !bytes.is_empty() => Ok(bytes),
                _ => Err(BrowserError::EmptyOutput {
                    engine: strategy.name().to_string(),
                }),
            },
            Err(e) => Err(e),
        };
        match attempt {
            Ok(bytes) => {
                info!("{} printed {} bytes of PDF", strategy.name(), bytes.len());
                return Ok(bytes);
            }
            Err(e) => {
                warn!("Browser engine {} failed: {}", strategy.name(), e);
                failures.push(e.to_string());
            }
        }
    }
    Err(BrowserError::AllStrategiesFailed(failures))
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    /// Writes fixed bytes, or fails without writing anything.
    pub(crate) struct FakeStrategy {
        pub name: &'static str,
        pub output: Option<Vec<u8>>,
        pub calls: Arc<AtomicUsize>,
    }

    impl FakeStrategy {
        pub(crate) fn boxed(name: &'static str, output: Option<&[u8]>) -> Box<dyn BrowserStrategy> {
            Box::new(FakeStrategy {
                name,
                output: output.map(<[u8]>::to_vec),
                calls: Arc::new(AtomicUsize::new(0)),
            })
        }
    }

    #[async_trait]
    impl BrowserStrategy for FakeStrategy {
        fn name(&self) -> &str {
            self.name
        }

        async fn print(&self, html: &Path, pdf: &Path) -> Result<(), BrowserError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            assert!(html.exists());
            match &self.output {
                Some(bytes) => {
                    tokio::fs::write(pdf, bytes).await?;
                    Ok(())
                }
                None => Err(BrowserError::Launch {
                    engine: self.name.to_string(),
                    source: std::io::Error::other("no display"),
                }),
            }
        }
    }

    #[tokio::test]
    async fn falls_back_to_the_next_engine() {
        let strategies = vec![
            FakeStrategy::boxed("first", None),
            FakeStrategy::boxed("second", Some(b"%PDF-1.7".as_slice())),
        ];
        let bytes = print_to_pdf("<html></html>", &strategies).await.unwrap();
        assert_eq!(bytes, b"%PDF-1.7");
    }

    #[tokio::test]
    async fn stops_at_the_first_success() {
        let calls = Arc::new(AtomicUsize::new(0));
        let strategies: Vec<Box<dyn BrowserStrategy>> = vec![
            FakeStrategy::boxed("first", Some(b"%PDF-a".as_slice())),
            Box::new(FakeStrategy {
                name: "second",
                output: Some(b"%PDF-b".to_vec()),
                calls: calls.clone(),
            }),
        ];
        let bytes = print_to_pdf("<html></html>", &strategies).await.unwrap();
        assert_eq!(bytes, b"%PDF-a");
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn reports_every_failed_attempt() {
        let strategies = vec![
            FakeStrategy::boxed("first", None),
            FakeStrategy::boxed("second", Some(b"".as_slice())),
        ];
        match print_to_pdf("<html></html>", &strategies).await {
            Err(BrowserError::AllStrategiesFailed(attempts)) => {
                assert_eq!(attempts.len(), 2);
                assert!(attempts[0].contains("first"));
                assert!(attempts[1].contains("no PDF output"));
            }
            other => panic!("unexpected result: {:?}", other.map(|b| b.len())),
        }
    }

    #[tokio::test]
    async fn missing_executables_are_reported_by_name() {
        let strategy = WeasyprintCli {
            binary: "definitely-not-a-real-weasyprint-binary".to_string(),
            timeout: Duration::from_secs(5),
        };
        let err = strategy
            .print(Path::new("/tmp/in.html"), Path::new("/tmp/out.pdf"))
            .await
            .unwrap_err();
        assert!(matches!(err, BrowserError::NotFound { .. }));
    }

    #[tokio::test]
    async fn no_engines_is_its_own_error() {
        assert!(matches!(
            print_to_pdf("<html></html>", &[]).await,
            Err(BrowserError::NoStrategies)
        ));
    }

    #[test]
    fn chain_follows_the_configured_order() {
        let config = RenderConfig {
            browsers: vec![BrowserKind::Weasyprint, BrowserKind::Chromium],
            ..Default::default()
        };
        let names: Vec<String> = strategies_from_config(&config)
            .iter()
            .map(|s| s.name().to_string())
            .collect();
        assert_eq!(names, vec!["weasyprint", "chromium"]);
    }
}
