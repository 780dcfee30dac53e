use core::fmt;
use std::sync::Arc;

use super::batch::ExpandEnv;
use super::camera::{Camera, DEFAULT_FIT_PADDING};
use super::color_resolver::ColorResolver;
use super::controls::PanZoomControls;
use super::events::{EventBus, EventKind, MessageLevel, PointerEvent, SubscriptionId, ViewerEvent};
use super::graph::{PrimitiveDesc, RenderGraph};
use super::layer::{Layer, LayerInfo};
use super::material::MaterialCache;
use super::model::SceneModel;
use super::worker::{LoadRequest, ParseRequest, SceneParser, SceneWorker};
use super::{ViewerError, ViewerOptions};
use crate::coords::{Bounds, Vec2, Viewport};
use crate::input::{InputEvent, MouseButtonState, PointerButtonEvent};
use crate::render::{ContextAttempt, ContextProvider, Frame, RenderSurface};
use crate::scene::SceneDocument;

const DEGRADED_NOTICE: &str =
    "Unable to create a render context. The drawing cannot be displayed on this system.";
const EMPTY_DOCUMENT: &str = "Empty document";
const MISSING_FONTS: &str = "Some characters cannot be properly displayed due to missing fonts";

/// Lifecycle state of a [`Viewer`].
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum ViewerState {
    Ready,
    Clearing,
    /// A scene worker is outstanding.
    Loading,
    Building,
    /// No render context could be created. Only `destroy` is accepted;
    /// `render` redraws the placeholder, if one was acquired.
    Degraded,
    Destroyed,
}

impl fmt::Display for ViewerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Ready => "ready",
            Self::Clearing => "clearing",
            Self::Loading => "loading",
            Self::Building => "building",
            Self::Degraded => "degraded",
            Self::Destroyed => "destroyed",
        })
    }
}

/// Displays one scene document on one render surface.
///
/// Draws happen only in response to API calls and input; there is no frame
/// loop. Every state-changing call checks that the render context is still
/// alive and fails with [`ViewerError::RenderContextUnavailable`] otherwise.
pub struct Viewer<'w> {
    options: ViewerOptions,
    state: ViewerState,
    surface: Option<Box<dyn RenderSurface + 'w>>,
    notice: Option<String>,
    parser: Arc<dyn SceneParser>,

    camera: Camera,
    controls: Option<PanZoomControls>,
    colors: ColorResolver,

    model: SceneModel,
    materials: MaterialCache,
    graph: RenderGraph,

    events: EventBus,
}

impl<'w> Viewer<'w> {
    /// Acquires a render context, falling back to reduced requirements and
    /// finally to a placeholder that only shows the degraded notice.
    /// Never fails.
    pub fn new(
        options: ViewerOptions,
        provider: &mut dyn ContextProvider<'w>,
        parser: Arc<dyn SceneParser>,
    ) -> Self {
        let mut surface = None;
        for attempt in [ContextAttempt::Preferred, ContextAttempt::Compatible] {
            match provider.acquire(attempt, &options) {
                Ok(s) => {
                    log::debug!("render context acquired ({attempt})");
                    surface = Some(s);
                    break;
                }
                Err(e) => log::warn!("{attempt} render context unavailable: {e:#}"),
            }
        }

        let (state, notice) = if surface.is_some() {
            (ViewerState::Ready, None)
        } else {
            log::error!("{DEGRADED_NOTICE}");
            surface = provider
                .acquire(ContextAttempt::Placeholder, &options)
                .inspect_err(|e| log::error!("placeholder surface unavailable: {e:#}"))
                .ok();
            (ViewerState::Degraded, Some(DEGRADED_NOTICE.to_owned()))
        };

        let viewport = Viewport::new(options.canvas_width as f64, options.canvas_height as f64);
        let mut viewer = Self {
            camera: Camera::new(viewport),
            controls: None,
            colors: ColorResolver::from_options(&options),
            model: SceneModel::default(),
            materials: MaterialCache::new(options.point_size),
            graph: RenderGraph::new(),
            events: EventBus::default(),
            options,
            state,
            surface,
            notice,
            parser,
        };

        if viewer.surface.is_some() {
            if let Err(e) = viewer.render() {
                log::warn!("initial draw failed: {e}");
            }
        }
        viewer
    }

    #[inline]
    pub fn state(&self) -> ViewerState {
        self.state
    }

    /// Diagnostic shown in place of the drawing when degraded.
    pub fn notice(&self) -> Option<&str> {
        self.notice.as_deref()
    }

    #[inline]
    pub fn options(&self) -> &ViewerOptions {
        &self.options
    }

    #[inline]
    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    #[inline]
    pub fn graph(&self) -> &RenderGraph {
        &self.graph
    }

    #[inline]
    pub fn materials(&self) -> &MaterialCache {
        &self.materials
    }

    pub fn layer(&self, name: &str) -> Option<&Layer> {
        self.model.layers.by_name(name)
    }

    fn ensure_context(&self) -> Result<(), ViewerError> {
        match self.state {
            ViewerState::Destroyed => Err(ViewerError::Destroyed),
            ViewerState::Degraded => Err(ViewerError::RenderContextUnavailable),
            _ => match &self.surface {
                Some(s) if !s.is_lost() => Ok(()),
                _ => Err(ViewerError::RenderContextUnavailable),
            },
        }
    }

    // ── loading ─────────────────────────────────────────────────────────────

    /// Parses `request.source` on a worker thread and displays the result.
    ///
    /// Old content is discarded first. Progress callbacks run on the caller's
    /// thread while the worker is awaited.
    pub async fn load(&mut self, request: LoadRequest) -> Result<(), ViewerError> {
        self.clear()?;

        let LoadRequest {
            source,
            fonts,
            mut progress,
        } = request;
        log::info!("loading {source:?}");

        // Dropping this future drops the worker, which cancels the parse,
        // and the guard, which leaves `Loading`.
        let mut worker = SceneWorker::spawn(self.parser.clone(), ParseRequest { source, fonts })
            .map_err(ViewerError::Load)?;
        let result = {
            let _loading = LoadingGuard::enter(&mut self.state);
            worker
                .load(|p| {
                    if let Some(cb) = progress.as_mut() {
                        cb(p);
                    }
                })
                .await
        };
        worker.destroy(false);

        let doc = result.inspect_err(|e| log::error!("{e}"))?;
        self.ensure_context()?;
        self.build(doc)
    }

    /// Displays an already parsed document. Old content is discarded first.
    pub fn load_document(&mut self, doc: SceneDocument) -> Result<(), ViewerError> {
        self.clear()?;
        self.build(doc)
    }

    fn build(&mut self, doc: SceneDocument) -> Result<(), ViewerError> {
        self.state = ViewerState::Building;
        let built = self.instantiate(doc);
        self.state = ViewerState::Ready;
        built?;

        self.events.emit(ViewerEvent::Loaded);

        match self.model.local_bounds() {
            Some(b) => {
                let (center, width) = self.camera.fit(b.min_x, b.max_x, b.min_y, b.max_y, DEFAULT_FIT_PADDING);
                self.apply_view(center, width);
            }
            None => self.message(EMPTY_DOCUMENT, MessageLevel::Warn),
        }

        if self.model.has_missing_chars {
            self.message(MISSING_FONTS, MessageLevel::Warn);
        }

        self.controls = Some(PanZoomControls::new());
        self.render()
    }

    fn instantiate(&mut self, doc: SceneDocument) -> Result<(), ViewerError> {
        let (model, top_level) = SceneModel::build(doc)?;
        self.model = model;

        for batch in &top_level {
            let env = ExpandEnv {
                blocks: &self.model.blocks,
                layers: &self.model.layers,
                colors: &self.colors,
            };
            let primitives: Vec<PrimitiveDesc> = batch.create_objects(env, &mut self.materials).collect();
            for desc in primitives {
                self.attach(desc);
            }
        }

        log::debug!(
            "instantiated {} primitives with {} materials",
            self.graph.len(),
            self.materials.len()
        );
        Ok(())
    }

    /// Adds a primitive to the graph and to its layer together.
    fn attach(&mut self, desc: PrimitiveDesc) {
        let layer_id = desc.layer;
        let id = self.graph.add(desc);
        if let Some(layer) = layer_id.and_then(|l| self.model.layers.get_mut(l)) {
            layer.push_object(id);
            if !layer.is_visible() {
                self.graph.set_visible(id, false);
            }
        }
    }

    // ── teardown ────────────────────────────────────────────────────────────

    /// Discards the document and every GPU resource built from it.
    pub fn clear(&mut self) -> Result<(), ViewerError> {
        self.ensure_context()?;
        self.state = ViewerState::Clearing;
        self.reset();
        self.state = ViewerState::Ready;
        self.render()
    }

    /// Releases everything. Later calls fail with [`ViewerError::Destroyed`].
    pub fn destroy(&mut self) -> Result<(), ViewerError> {
        match self.state {
            ViewerState::Destroyed => return Ok(()),
            ViewerState::Degraded => {
                self.state = ViewerState::Destroyed;
                self.events.clear();
                return Ok(());
            }
            _ => {}
        }

        self.reset();
        self.events.emit(ViewerEvent::Destroyed);
        self.events.clear();
        self.surface = None;
        self.state = ViewerState::Destroyed;
        log::debug!("viewer destroyed");
        Ok(())
    }

    fn reset(&mut self) {
        self.controls = None;
        self.dispose();
        self.apply_view(Vec2::zero(), 2.0);
        self.events.emit(ViewerEvent::Cleared);
    }

    /// Releases primitives and materials. Layers are emptied before the
    /// graph so their object lists never outlive the primitives.
    fn dispose(&mut self) {
        let mut layered = 0;
        for layer in self.model.layers.iter_mut() {
            layered += layer.dispose().len();
        }

        let primitives = self.graph.clear();
        debug_assert!(layered <= primitives.len());
        let materials = self.materials.clear();

        if let Some(surface) = self.surface.as_mut() {
            for p in &primitives {
                surface.release_primitive(p.id);
            }
            for id in &materials {
                surface.release_material(*id);
            }
        }

        if !primitives.is_empty() {
            log::debug!("released {} primitives and {} materials", primitives.len(), materials.len());
        }
        self.model = SceneModel::default();
    }

    // ── view ────────────────────────────────────────────────────────────────

    /// Centers the view on `center` (scene units, origin-relative) showing
    /// `width` units across.
    pub fn set_view(&mut self, center: Vec2, width: f64) -> Result<(), ViewerError> {
        self.ensure_context()?;
        self.apply_view(center, width);
        self.render()
    }

    /// Fits the given bounds into the canvas with relative `padding`.
    pub fn fit_view(
        &mut self,
        min_x: f64,
        max_x: f64,
        min_y: f64,
        max_y: f64,
        padding: f64,
    ) -> Result<(), ViewerError> {
        self.ensure_context()?;
        let (center, width) = self.camera.fit(min_x, max_x, min_y, max_y, padding);
        self.apply_view(center, width);
        self.render()
    }

    fn apply_view(&mut self, center: Vec2, width: f64) {
        self.camera.set_view(center, width);
        self.events.emit(ViewerEvent::ViewChanged);
    }

    /// Resizes the canvas, keeping the view center and scale.
    pub fn set_size(&mut self, width: u32, height: u32) -> Result<(), ViewerError> {
        self.ensure_context()?;

        let viewport = Viewport::new(width as f64, height as f64);
        if viewport.is_valid() {
            self.camera.resize(viewport);
        }
        self.options.canvas_width = width;
        self.options.canvas_height = height;
        if let Some(surface) = self.surface.as_mut() {
            surface.resize(width, height);
        }

        self.events.emit(ViewerEvent::Resized { width, height });
        self.events.emit(ViewerEvent::ViewChanged);
        self.render()
    }

    // ── layers ──────────────────────────────────────────────────────────────

    /// Shows or hides every primitive of layer `name`. Unknown names are ignored.
    pub fn show_layer(&mut self, name: &str, visible: bool) -> Result<(), ViewerError> {
        self.ensure_context()?;
        let Some(id) = self.model.layers.id(name) else {
            return Ok(());
        };
        if let Some(layer) = self.model.layers.get_mut(id) {
            layer.set_visible(visible);
            for &object in layer.objects() {
                self.graph.set_visible(object, visible);
            }
        }
        self.render()
    }

    /// Layers in declaration order, colors as drawn.
    pub fn layers(&self, non_empty_only: bool) -> Vec<LayerInfo> {
        self.model
            .layers
            .iter()
            .filter(|l| !non_empty_only || !l.objects().is_empty())
            .map(|l| LayerInfo {
                name: l.name.clone(),
                display_name: l.display_name.clone(),
                color: self.colors.correct(l.color),
            })
            .collect()
    }

    /// Scene bounds in document coordinates, if the document has any.
    pub fn bounds(&self) -> Option<Bounds> {
        self.model.bounds
    }

    /// Document point the scene coordinates are relative to.
    pub fn origin(&self) -> Option<Vec2> {
        self.model.origin
    }

    // ── events ──────────────────────────────────────────────────────────────

    pub fn subscribe(
        &mut self,
        kind: EventKind,
        handler: impl FnMut(&ViewerEvent) + 'static,
    ) -> Result<SubscriptionId, ViewerError> {
        self.ensure_context()?;
        Ok(self.events.subscribe(kind, handler))
    }

    /// Returns `Ok(false)` if `id` is not subscribed to `kind`.
    pub fn unsubscribe(&mut self, kind: EventKind, id: SubscriptionId) -> Result<bool, ViewerError> {
        self.ensure_context()?;
        Ok(self.events.unsubscribe(kind, id))
    }

    fn message(&mut self, text: &str, level: MessageLevel) {
        match level {
            MessageLevel::Info => log::info!("{text}"),
            MessageLevel::Warn => log::warn!("{text}"),
            MessageLevel::Error => log::error!("{text}"),
        }
        self.events.emit(ViewerEvent::Message {
            text: text.to_owned(),
            level,
        });
    }

    // ── drawing and input ───────────────────────────────────────────────────

    /// Draws the current scene. A degraded viewer redraws its placeholder
    /// instead and fails only if it has none.
    pub fn render(&mut self) -> Result<(), ViewerError> {
        let notice = match self.state {
            ViewerState::Degraded => self.notice.as_deref(),
            _ => {
                self.ensure_context()?;
                None
            }
        };
        let Some(surface) = self.surface.as_mut() else {
            return Err(ViewerError::RenderContextUnavailable);
        };

        let frame = Frame {
            graph: &self.graph,
            materials: &self.materials,
            view_proj: self.camera.view_proj(),
            clear_color: self.colors.background(),
            clear_alpha: self.options.clear_alpha,
            notice,
        };

        surface.draw(&frame).map_err(|e| {
            if surface.is_lost() {
                ViewerError::RenderContextUnavailable
            } else {
                ViewerError::Render(e)
            }
        })
    }

    /// Feeds a pointer, wheel or focus event to the viewer.
    ///
    /// Button events are published as `pointerdown`/`pointerup`; drags and
    /// wheel turns move the camera. Returns true if the view changed.
    pub fn handle_input(&mut self, event: &InputEvent) -> bool {
        if self.ensure_context().is_err() {
            return false;
        }

        if let InputEvent::PointerButton(PointerButtonEvent { button, state, x, y, .. }) = event {
            let canvas = Vec2::new(*x as f64, *y as f64);
            let pointer = PointerEvent {
                button: *button,
                canvas,
                position: self.camera.canvas_to_scene(canvas),
            };
            self.events.emit(match state {
                MouseButtonState::Pressed => ViewerEvent::PointerDown(pointer),
                MouseButtonState::Released => ViewerEvent::PointerUp(pointer),
            });
        }

        let Some(controls) = self.controls.as_mut() else {
            return false;
        };
        if !controls.handle(&mut self.camera, event) {
            return false;
        }

        if let Err(e) = self.render() {
            log::warn!("redraw after input failed: {e}");
        }
        self.events.emit(ViewerEvent::ViewChanged);
        true
    }
}

/// Holds a viewer in `Loading` while its worker is awaited.
struct LoadingGuard<'a> {
    state: &'a mut ViewerState,
}

impl<'a> LoadingGuard<'a> {
    fn enter(state: &'a mut ViewerState) -> Self {
        *state = ViewerState::Loading;
        Self { state }
    }
}

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        if *self.state == ViewerState::Loading {
            *self.state = ViewerState::Ready;
        }
    }
}
