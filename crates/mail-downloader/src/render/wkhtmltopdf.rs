use std::process::{Output, Stdio};

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::process::Command as TokioCommand;
use tracing::debug;

use super::{RenderError, Renderer};
use crate::config::RendererConfig;

/// Lines of renderer stderr kept in an error message.
const STDERR_LINES: usize = 5;

/// Renders through an external `wkhtmltopdf` process, markup on stdin and PDF
/// on stdout.
#[derive(Debug, Clone)]
pub struct WkhtmltopdfRenderer {
    command: String,
    args: Vec<String>,
}

impl WkhtmltopdfRenderer {
    pub fn new(config: &RendererConfig) -> Self {
        let mut args: Vec<String> = [
            "--quiet",
            "--encoding",
            "utf-8",
            "--disable-local-file-access",
            "--orientation",
            if config.landscape {
                "Landscape"
            } else {
                "Portrait"
            },
            if config.print_background {
                "--background"
            } else {
                "--no-background"
            },
        ]
        .into_iter()
        .map(str::to_string)
        .collect();

        if let Some(page_size) = config.page_size.as_deref().filter(|s| !s.trim().is_empty()) {
            args.push("--page-size".to_string());
            args.push(page_size.trim().to_string());
        }

        // read from stdin, write to stdout
        args.push("-".to_string());
        args.push("-".to_string());

        Self {
            command: config.command.clone(),
            args,
        }
    }

    pub fn command(&self) -> &str {
        &self.command
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }
}

#[async_trait]
impl Renderer for WkhtmltopdfRenderer {
    async fn render(&self, markup: &[u8]) -> Result<Vec<u8>, RenderError> {
        let mut cmd = TokioCommand::new(&self.command);
        cmd.args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let mut child = cmd.spawn().map_err(|e| RenderError::Spawn {
            command: self.command.clone(),
            source: e,
        })?;

        // Feed stdin from a separate task so a full stdout pipe cannot block us.
        let writer = child.stdin.take().map(|mut stdin| {
            let markup = markup.to_vec();
            tokio::spawn(async move {
                stdin.write_all(&markup).await?;
                stdin.shutdown().await
            })
        });

        let output = child.wait_with_output().await.map_err(RenderError::Output)?;

        let written = match writer {
            Some(handle) => handle
                .await
                .map_err(|e| RenderError::Stdin(std::io::Error::other(e)))
                .and_then(|result| result.map_err(RenderError::Stdin)),
            None => Ok(()),
        };

        if !output.status.success() {
            return Err(RenderError::Exit {
                status: output.status.to_string(),
                message: stderr_excerpt(&output),
            });
        }
        if output.stdout.is_empty() {
            return Err(RenderError::EmptyOutput);
        }
        written?;

        debug!(bytes = output.stdout.len(), "Rendered PDF");
        Ok(output.stdout)
    }
}

fn stderr_excerpt(output: &Output) -> String {
    let stderr = String::from_utf8_lossy(&output.stderr);
    let lines: Vec<&str> = stderr
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .take(STDERR_LINES)
        .collect();

    if lines.is_empty() {
        "no error output".to_string()
    } else {
        lines.join("; ")
    }
}
