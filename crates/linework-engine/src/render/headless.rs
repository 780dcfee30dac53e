use std::cell::RefCell;
use std::collections::{BTreeSet, HashSet};
use std::rc::Rc;

use super::{ContextAttempt, ContextProvider, Frame, RenderSurface};
use crate::paint::Rgb;
use crate::scene::InstanceType;
use crate::viewer::{MaterialId, PrimitiveId, PrimitiveKind, ViewerOptions};

/// One draw call recorded by [`HeadlessSurface`].
#[derive(Debug, Clone, PartialEq)]
pub struct DrawRecord {
    pub primitive: PrimitiveId,
    pub material: MaterialId,
    pub kind: PrimitiveKind,
    pub color: Rgb,
    pub instance_type: InstanceType,
    pub instances: u32,
}

#[derive(Debug, Default)]
struct ProbeState {
    attempts: Vec<ContextAttempt>,
    frames: usize,
    last_frame: Vec<DrawRecord>,
    last_notice: Option<String>,
    last_clear: Option<Rgb>,
    size: (u32, u32),
    lost: bool,
    primitives: HashSet<PrimitiveId>,
    materials: BTreeSet<MaterialId>,
    released_primitives: usize,
    released_materials: usize,
}

/// Shared view into a headless context and the surfaces it created.
#[derive(Debug, Clone, Default)]
pub struct HeadlessProbe(Rc<RefCell<ProbeState>>);

impl HeadlessProbe {
    /// Acquisition attempts so far, in order.
    pub fn attempts(&self) -> Vec<ContextAttempt> {
        self.0.borrow().attempts.clone()
    }

    pub fn frames(&self) -> usize {
        self.0.borrow().frames
    }

    pub fn last_frame(&self) -> Vec<DrawRecord> {
        self.0.borrow().last_frame.clone()
    }

    /// Notice shown by the last frame, set only by placeholder surfaces.
    pub fn last_notice(&self) -> Option<String> {
        self.0.borrow().last_notice.clone()
    }

    /// Background the last frame was cleared to.
    pub fn last_clear(&self) -> Option<Rgb> {
        self.0.borrow().last_clear
    }

    pub fn size(&self) -> (u32, u32) {
        self.0.borrow().size
    }

    /// Primitives uploaded and not yet released.
    pub fn live_primitives(&self) -> usize {
        self.0.borrow().primitives.len()
    }

    /// Materials bound and not yet released.
    pub fn live_materials(&self) -> usize {
        self.0.borrow().materials.len()
    }

    pub fn released_primitives(&self) -> usize {
        self.0.borrow().released_primitives
    }

    pub fn released_materials(&self) -> usize {
        self.0.borrow().released_materials
    }

    /// Simulates losing the device, e.g. across sleep and wake.
    pub fn lose_context(&self) {
        self.0.borrow_mut().lost = true;
    }
}

/// [`ContextProvider`] without a GPU, for tests and headless hosts.
#[derive(Debug, Default)]
pub struct HeadlessContext {
    probe: HeadlessProbe,
    failures: usize,
}

impl HeadlessContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fails the first `n` acquisitions.
    pub fn failing(n: usize) -> Self {
        Self {
            failures: n,
            ..Self::default()
        }
    }

    pub fn probe(&self) -> HeadlessProbe {
        self.probe.clone()
    }
}

impl<'w> ContextProvider<'w> for HeadlessContext {
    fn acquire(
        &mut self,
        attempt: ContextAttempt,
        options: &ViewerOptions,
    ) -> anyhow::Result<Box<dyn RenderSurface + 'w>> {
        let mut state = self.probe.0.borrow_mut();
        state.attempts.push(attempt);
        if self.failures > 0 {
            self.failures -= 1;
            anyhow::bail!("headless context refused {attempt} attempt");
        }
        state.lost = false;
        state.size = (options.canvas_width, options.canvas_height);
        drop(state);

        Ok(Box::new(HeadlessSurface {
            probe: self.probe.clone(),
            placeholder: attempt == ContextAttempt::Placeholder,
        }))
    }
}

/// Records draw calls instead of issuing them.
#[derive(Debug)]
pub struct HeadlessSurface {
    probe: HeadlessProbe,
    placeholder: bool,
}

impl RenderSurface for HeadlessSurface {
    fn is_lost(&self) -> bool {
        self.probe.0.borrow().lost
    }

    fn resize(&mut self, width: u32, height: u32) {
        self.probe.0.borrow_mut().size = (width, height);
    }

    fn draw(&mut self, frame: &Frame<'_>) -> anyhow::Result<()> {
        let mut state = self.probe.0.borrow_mut();
        anyhow::ensure!(!state.lost, "headless context lost");

        state.frames += 1;
        state.last_clear = Some(frame.clear_color);
        if self.placeholder {
            state.last_frame.clear();
            state.last_notice = frame.notice.map(str::to_owned);
            return Ok(());
        }

        let mut records = Vec::new();
        for (primitive, material) in frame.draws() {
            state.primitives.insert(primitive.id);
            state.materials.insert(material.id);
            records.push(DrawRecord {
                primitive: primitive.id,
                material: material.id,
                kind: primitive.kind,
                color: material.color,
                instance_type: primitive.geometry.instance_type(),
                instances: primitive.geometry.instance_count(),
            });
        }

        state.last_frame = records;
        state.last_notice = None;
        Ok(())
    }

    fn release_primitive(&mut self, id: PrimitiveId) {
        let mut state = self.probe.0.borrow_mut();
        if state.primitives.remove(&id) {
            state.released_primitives += 1;
        }
    }

    fn release_material(&mut self, id: MaterialId) {
        let mut state = self.probe.0.borrow_mut();
        if state.materials.remove(&id) {
            state.released_materials += 1;
        }
    }
}
