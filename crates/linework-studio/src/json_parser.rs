use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use linework_engine::scene::{SceneBuffers, SceneDocument};
use linework_engine::viewer::{ParseContext, ParseRequest, ProgressPhase, SceneParser};

/// Reads a scene document serialized as JSON from a local file.
///
/// A document without inline buffers takes its geometry from little-endian
/// sidecars next to it: `plan.vertices.bin`, `plan.indices.bin` and
/// `plan.transforms.bin` for `plan.json`. Missing sidecars count as empty.
#[derive(Debug, Default)]
pub struct JsonSceneParser;

impl SceneParser for JsonSceneParser {
    fn parse(&self, request: &ParseRequest, ctx: &ParseContext) -> Result<SceneDocument> {
        let path = Path::new(&request.source);

        ctx.report(ProgressPhase::Fetch, 0, None);
        let bytes = fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
        let total = bytes.len() as u64;
        ctx.report(ProgressPhase::Fetch, total, Some(total));

        if ctx.is_cancelled() {
            bail!("cancelled");
        }

        ctx.report(ProgressPhase::Parse, 0, Some(total));
        let mut doc = parse_document(&bytes).with_context(|| format!("invalid scene document {}", path.display()))?;
        attach_sidecars(&mut doc, path)?;
        ctx.report(ProgressPhase::Parse, total, Some(total));

        let batches = doc.batches.len() as u64;
        ctx.report(ProgressPhase::Prepare, batches, Some(batches));
        Ok(doc)
    }
}

fn parse_document(bytes: &[u8]) -> Result<SceneDocument> {
    Ok(serde_json::from_slice(bytes)?)
}

/// Fills the buffers of a document that carries none inline.
fn attach_sidecars(doc: &mut SceneDocument, path: &Path) -> Result<()> {
    if doc.buffers.byte_len() > 0 {
        return Ok(());
    }
    if let Some(buffers) = read_sidecars(path)? {
        log::debug!("{}: {} B of sidecar buffers", path.display(), buffers.byte_len());
        doc.buffers = buffers;
    }
    Ok(())
}

fn sidecar(path: &Path, kind: &str) -> PathBuf {
    path.with_extension(format!("{kind}.bin"))
}

fn read_sidecars(path: &Path) -> Result<Option<SceneBuffers>> {
    let read = |kind: &str| -> Result<Option<Vec<u8>>> {
        let file = sidecar(path, kind);
        match fs::read(&file) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e).with_context(|| format!("failed to read {}", file.display())),
        }
    };

    let vertices = read("vertices")?;
    let indices = read("indices")?;
    let transforms = read("transforms")?;
    if vertices.is_none() && indices.is_none() && transforms.is_none() {
        return Ok(None);
    }

    let buffers = SceneBuffers::from_le_bytes(
        vertices.as_deref().unwrap_or_default(),
        indices.as_deref().unwrap_or_default(),
        transforms.as_deref().unwrap_or_default(),
    )
    .with_context(|| format!("invalid sidecar buffers for {}", path.display()))?;
    Ok(Some(buffers))
}
