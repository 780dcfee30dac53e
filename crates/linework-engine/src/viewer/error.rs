use std::fmt;

/// Errors returned by the public [`Viewer`](super::Viewer) API.
#[derive(Debug)]
pub enum ViewerError {
    /// No render context could be created, or the context was lost.
    RenderContextUnavailable,
    /// The viewer was destroyed and must not be used.
    Destroyed,
    /// The scene worker failed to produce a document.
    Load(anyhow::Error),
    /// The load was superseded or the worker went away before answering.
    LoadCancelled,
    /// The document references data outside its own buffers.
    InvalidDocument(String),
    /// A draw failed on an otherwise live context.
    Render(anyhow::Error),
}

impl fmt::Display for ViewerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RenderContextUnavailable => f.write_str("render context unavailable"),
            Self::Destroyed => f.write_str("viewer has been destroyed"),
            Self::Load(e) => write!(f, "scene load failed: {e:#}"),
            Self::LoadCancelled => f.write_str("scene load cancelled"),
            Self::InvalidDocument(msg) => write!(f, "invalid scene document: {msg}"),
            Self::Render(e) => write!(f, "render failed: {e:#}"),
        }
    }
}

impl std::error::Error for ViewerError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Load(e) | Self::Render(e) => Some(e.as_ref()),
            _ => None,
        }
    }
}
