//! Picks the body of a mail worth rendering and hands it to a PDF renderer.

pub mod wkhtmltopdf;

use async_trait::async_trait;
use thiserror::Error;

use crate::email::{detect, ContentType, Mail};

pub use wkhtmltopdf::WkhtmltopdfRenderer;

#[derive(Error, Debug)]
pub enum RenderError {
    #[error("Failed to start renderer '{command}': {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to pass markup to renderer: {0}")]
    Stdin(#[source] std::io::Error),

    #[error("Failed to read renderer output: {0}")]
    Output(#[source] std::io::Error),

    #[error("Renderer exited with {status}: {message}")]
    Exit { status: String, message: String },

    #[error("Renderer produced no output")]
    EmptyOutput,
}

/// Why no PDF was produced for a mail.
#[derive(Error, Debug)]
pub enum RenderFailure {
    #[error("no renderable body")]
    NoRenderableBody,

    #[error("{0}")]
    Renderer(#[from] RenderError),
}

/// Turns HTML (or plain text) markup into PDF bytes.
#[async_trait]
pub trait Renderer: Send + Sync {
    async fn render(&self, markup: &[u8]) -> Result<Vec<u8>, RenderError>;
}

/// Concatenated HTML bodies, or failing that the concatenated plain text
/// bodies, in part order.
pub fn select_markup(bodies: &[Vec<u8>]) -> Option<Vec<u8>> {
    let kinds: Vec<ContentType> = bodies.iter().map(|body| detect(body)).collect();

    [ContentType::HTML, ContentType::PLAIN]
        .into_iter()
        .find_map(|wanted| {
            let markup: Vec<u8> = bodies
                .iter()
                .zip(&kinds)
                .filter(|(_, kind)| **kind == wanted)
                .flat_map(|(body, _)| body.iter().copied())
                .collect();
            (!markup.is_empty()).then_some(markup)
        })
}

/// Renders the best body of `mail`.
pub async fn render_mail(renderer: &dyn Renderer, mail: &Mail) -> Result<Vec<u8>, RenderFailure> {
    let markup = select_markup(mail.bodies()).ok_or(RenderFailure::NoRenderableBody)?;
    Ok(renderer.render(&markup).await?)
}
