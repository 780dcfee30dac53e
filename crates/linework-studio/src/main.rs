mod json_parser;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::{env, fs};

use anyhow::{Context, Result, bail};
use linework_engine::input::{InputEvent, Key, KeyState};
use linework_engine::logging::{LoggingConfig, init_logging};
use linework_engine::viewer::{
    DEFAULT_FIT_PADDING, EventKind, LoadRequest, Viewer, ViewerEvent, ViewerOptions, ViewerState,
};
use linework_engine::window::{Runtime, RuntimeConfig, RuntimeCtx, ViewerApp};

use crate::json_parser::JsonSceneParser;

const USAGE: &str = "usage: linework-studio <scene.json> [--options options.json]";

const LOGGED_EVENTS: [EventKind; 8] = [
    EventKind::Loaded,
    EventKind::Cleared,
    EventKind::Destroyed,
    EventKind::Resized,
    EventKind::PointerDown,
    EventKind::PointerUp,
    EventKind::ViewChanged,
    EventKind::Message,
];

fn main() -> Result<()> {
    init_logging(LoggingConfig::default());

    let args = Args::parse(env::args().skip(1))?;
    let options = match &args.options {
        Some(path) => read_options(path)?,
        None => ViewerOptions::default(),
    };

    let title = format!("linework - {}", args.scene.display());
    let config = RuntimeConfig {
        title,
        ..RuntimeConfig::default()
    };

    let studio = Studio {
        source: args.scene.to_string_lossy().into_owned(),
        layers: Vec::new(),
    };

    Runtime::run(config, options, Arc::new(JsonSceneParser), studio)
}

#[derive(Debug, PartialEq)]
struct Args {
    scene: PathBuf,
    options: Option<PathBuf>,
}

impl Args {
    fn parse(mut args: impl Iterator<Item = String>) -> Result<Self> {
        let mut scene = None;
        let mut options = None;

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--options" => {
                    let path = args.next().context("--options needs a path")?;
                    options = Some(PathBuf::from(path));
                }
                "-h" | "--help" => bail!(USAGE),
                _ if scene.is_none() => scene = Some(PathBuf::from(arg)),
                _ => bail!("unexpected argument {arg:?}\n{USAGE}"),
            }
        }

        Ok(Self {
            scene: scene.context(USAGE)?,
            options,
        })
    }
}

fn read_options(path: &Path) -> Result<ViewerOptions> {
    let text = fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("invalid viewer options {}", path.display()))
}

/// Loads one scene and maps keys to view and layer commands.
struct Studio {
    source: String,
    /// Non-empty layer names, in the order digits select them.
    layers: Vec<String>,
}

impl Studio {
    fn fit(&self, viewer: &mut Viewer<'_>) {
        let (Some(bounds), Some(origin)) = (viewer.bounds(), viewer.origin()) else {
            return;
        };
        let fitted = viewer.fit_view(
            bounds.min_x - origin.x,
            bounds.max_x - origin.x,
            bounds.min_y - origin.y,
            bounds.max_y - origin.y,
            DEFAULT_FIT_PADDING,
        );
        if let Err(e) = fitted {
            log::warn!("fit view failed: {e}");
        }
    }

    fn toggle_layer(&self, viewer: &mut Viewer<'_>, digit: u8) {
        let Some(name) = (digit as usize).checked_sub(1).and_then(|i| self.layers.get(i)) else {
            return;
        };
        let visible = viewer.layer(name).is_some_and(|l| l.is_visible());
        log::info!("layer {name}: {}", if visible { "hidden" } else { "shown" });
        if let Err(e) = viewer.show_layer(name, !visible) {
            log::warn!("toggling layer {name} failed: {e}");
        }
    }
}

impl ViewerApp for Studio {
    fn on_ready(&mut self, viewer: &mut Viewer<'_>, _ctx: &mut RuntimeCtx) {
        if viewer.state() == ViewerState::Degraded {
            log::error!("not loading {}: no render context", self.source);
            return;
        }

        for kind in LOGGED_EVENTS {
            let subscribed = viewer.subscribe(kind, |event| match event {
                ViewerEvent::Message { text, level } => log::info!("[{level}] {text}"),
                other => log::debug!("event {other:?}"),
            });
            if let Err(e) = subscribed {
                log::warn!("cannot log {} events: {e}", kind.name());
            }
        }

        let request = LoadRequest::new(self.source.clone()).with_progress(|p| match p.total {
            Some(total) => log::info!("{}: {}/{}", p.phase, p.processed, total),
            None => log::info!("{}: {}", p.phase, p.processed),
        });

        match pollster::block_on(viewer.load(request)) {
            Ok(()) => {
                self.layers = viewer.layers(true).into_iter().map(|l| l.name).collect();
                for (i, layer) in self.layers.iter().enumerate().take(9) {
                    log::info!("[{}] layer {layer}", i + 1);
                }
            }
            Err(e) => log::error!("failed to load {}: {e}", self.source),
        }
    }

    fn on_input(&mut self, viewer: &mut Viewer<'_>, event: &InputEvent, ctx: &mut RuntimeCtx) {
        let InputEvent::Key {
            key,
            state: KeyState::Pressed,
            repeat: false,
            ..
        } = event
        else {
            return;
        };

        match key {
            Key::Escape => ctx.exit(),
            Key::F => self.fit(viewer),
            other => {
                if let Some(digit) = other.digit().filter(|d| *d > 0) {
                    self.toggle_layer(viewer, digit);
                }
            }
        }
    }
}
