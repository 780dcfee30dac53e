use core::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

use anyhow::Context as _;
use tokio::sync::{mpsc, oneshot};

use super::ViewerError;
use crate::scene::SceneDocument;

/// Stage reported through load progress.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum ProgressPhase {
    Font,
    Fetch,
    Parse,
    Prepare,
}

impl fmt::Display for ProgressPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Font => "font",
            Self::Fetch => "fetch",
            Self::Parse => "parse",
            Self::Prepare => "prepare",
        })
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct Progress {
    pub phase: ProgressPhase,
    pub processed: u64,
    /// `None` when the total is not known up front.
    pub total: Option<u64>,
}

/// What to parse.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParseRequest {
    /// Path or URL of the drawing, interpreted by the parser.
    pub source: String,
    /// Font files, tried in order for each glyph.
    pub fonts: Vec<String>,
}

/// Handed to a parser while it runs on the worker thread.
pub struct ParseContext {
    progress: mpsc::UnboundedSender<Progress>,
    cancelled: Arc<AtomicBool>,
}

impl ParseContext {
    /// Reports progress. Dropped silently once nobody listens.
    pub fn report(&self, phase: ProgressPhase, processed: u64, total: Option<u64>) {
        let _ = self.progress.send(Progress {
            phase,
            processed,
            total,
        });
    }

    /// Parsers should poll this between stages and bail out early.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}

/// Produces scene documents. Runs off the viewer thread.
pub trait SceneParser: Send + Sync {
    fn parse(&self, request: &ParseRequest, cx: &ParseContext) -> anyhow::Result<SceneDocument>;
}

/// Callback receiving load progress on the viewer's thread.
pub type ProgressCallback = Box<dyn FnMut(Progress)>;

/// Arguments of `Viewer::load`.
#[derive(Default)]
pub struct LoadRequest {
    pub source: String,
    pub fonts: Vec<String>,
    pub progress: Option<ProgressCallback>,
}

impl LoadRequest {
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            ..Self::default()
        }
    }

    pub fn with_fonts(mut self, fonts: Vec<String>) -> Self {
        self.fonts = fonts;
        self
    }

    pub fn with_progress(mut self, progress: impl FnMut(Progress) + 'static) -> Self {
        self.progress = Some(Box::new(progress));
        self
    }
}

impl fmt::Debug for LoadRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoadRequest")
            .field("source", &self.source)
            .field("fonts", &self.fonts)
            .field("progress", &self.progress.is_some())
            .finish()
    }
}

type ParseResult = anyhow::Result<SceneDocument>;

/// One parse running on a dedicated thread.
///
/// Dropping or destroying the worker abandons the result: the thread keeps
/// running until the parser returns, and its answer is discarded.
pub struct SceneWorker {
    cancelled: Arc<AtomicBool>,
    result: Option<oneshot::Receiver<ParseResult>>,
    progress: Option<mpsc::UnboundedReceiver<Progress>>,
}

impl SceneWorker {
    pub fn spawn(parser: Arc<dyn SceneParser>, request: ParseRequest) -> anyhow::Result<Self> {
        let cancelled = Arc::new(AtomicBool::new(false));
        let (result_tx, result_rx) = oneshot::channel();
        let (progress_tx, progress_rx) = mpsc::unbounded_channel();

        let cx = ParseContext {
            progress: progress_tx,
            cancelled: cancelled.clone(),
        };

        thread::Builder::new()
            .name("linework-scene-worker".into())
            .spawn(move || {
                log::debug!("parsing {:?}", request.source);
                let result = parser.parse(&request, &cx);
                if result_tx.send(result).is_err() {
                    log::debug!("late scene result for {:?} discarded", request.source);
                }
            })
            .context("failed to spawn scene worker thread")?;

        Ok(Self {
            cancelled,
            result: Some(result_rx),
            progress: Some(progress_rx),
        })
    }

    /// Waits for the document, relaying progress to `on_progress` meanwhile.
    pub async fn load(&mut self, mut on_progress: impl FnMut(Progress)) -> Result<SceneDocument, ViewerError> {
        let Some(mut result) = self.result.take() else {
            return Err(ViewerError::LoadCancelled);
        };
        let mut progress = self.progress.take();

        let outcome = loop {
            tokio::select! {
                biased;

                Some(p) = recv_progress(&mut progress) => on_progress(p),
                res = &mut result => break res,
            }
        };

        // Progress sent before the result is still queued.
        if let Some(rx) = progress.as_mut() {
            while let Ok(p) = rx.try_recv() {
                on_progress(p);
            }
        }

        match outcome {
            Ok(Ok(doc)) if !self.is_cancelled() => Ok(doc),
            Ok(Ok(_)) => Err(ViewerError::LoadCancelled),
            Ok(Err(e)) => Err(ViewerError::Load(e)),
            Err(_) => Err(ViewerError::LoadCancelled),
        }
    }

    /// Stops listening. With `cancel`, the parser is asked to stop early.
    pub fn destroy(&mut self, cancel: bool) {
        if cancel {
            self.cancelled.store(true, Ordering::Release);
        }
        self.result = None;
        self.progress = None;
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}

impl Drop for SceneWorker {
    fn drop(&mut self) {
        self.destroy(true);
    }
}

async fn recv_progress(rx: &mut Option<mpsc::UnboundedReceiver<Progress>>) -> Option<Progress> {
    match rx {
        Some(rx) => rx.recv().await,
        None => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc as std_mpsc;
    use std::sync::Mutex;
    use std::time::Duration;

    struct Scripted {
        steps: u64,
        fail: bool,
    }

    impl SceneParser for Scripted {
        fn parse(&self, request: &ParseRequest, cx: &ParseContext) -> anyhow::Result<SceneDocument> {
            for i in 0..self.steps {
                cx.report(ProgressPhase::Parse, i + 1, Some(self.steps));
            }
            anyhow::ensure!(!self.fail, "cannot parse {}", request.source);
            Ok(SceneDocument::default())
        }
    }

    /// Blocks until released, then records whether it was cancelled.
    struct Gated {
        release: Mutex<std_mpsc::Receiver<()>>,
        saw_cancel: std_mpsc::Sender<bool>,
    }

    impl SceneParser for Gated {
        fn parse(&self, _: &ParseRequest, cx: &ParseContext) -> anyhow::Result<SceneDocument> {
            let _ = self
                .release
                .lock()
                .map_err(|_| anyhow::anyhow!("poisoned"))?
                .recv_timeout(Duration::from_secs(5));
            let _ = self.saw_cancel.send(cx.is_cancelled());
            Ok(SceneDocument::default())
        }
    }

    fn request() -> ParseRequest {
        ParseRequest {
            source: "drawing.dxf".into(),
            fonts: vec![],
        }
    }

    #[test]
    fn progress_is_relayed_in_order_before_result() {
        let parser = Arc::new(Scripted { steps: 5, fail: false });
        let mut worker = SceneWorker::spawn(parser, request()).unwrap();
        let mut seen = Vec::new();
        let doc = pollster::block_on(worker.load(|p| seen.push(p.processed)));
        assert!(doc.is_ok());
        assert_eq!(seen, vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn parser_error_surfaces_as_load_error() {
        let parser = Arc::new(Scripted { steps: 0, fail: true });
        let mut worker = SceneWorker::spawn(parser, request()).unwrap();
        let err = pollster::block_on(worker.load(|_| {})).unwrap_err();
        assert!(matches!(err, ViewerError::Load(_)));
        assert!(err.to_string().contains("drawing.dxf"));
    }

    #[test]
    fn destroyed_worker_discards_late_result() {
        let (release_tx, release_rx) = std_mpsc::channel();
        let (cancel_tx, cancel_rx) = std_mpsc::channel();
        let parser = Arc::new(Gated {
            release: Mutex::new(release_rx),
            saw_cancel: cancel_tx,
        });

        let mut worker = SceneWorker::spawn(parser, request()).unwrap();
        worker.destroy(true);
        release_tx.send(()).unwrap();

        assert_eq!(cancel_rx.recv_timeout(Duration::from_secs(5)), Ok(true));
        let err = pollster::block_on(worker.load(|_| {})).unwrap_err();
        assert!(matches!(err, ViewerError::LoadCancelled));
    }

    #[test]
    fn dropping_worker_cancels_parser() {
        let (release_tx, release_rx) = std_mpsc::channel();
        let (cancel_tx, cancel_rx) = std_mpsc::channel();
        let parser = Arc::new(Gated {
            release: Mutex::new(release_rx),
            saw_cancel: cancel_tx,
        });

        drop(SceneWorker::spawn(parser, request()).unwrap());
        release_tx.send(()).unwrap();
        assert_eq!(cancel_rx.recv_timeout(Duration::from_secs(5)), Ok(true));
    }
}
