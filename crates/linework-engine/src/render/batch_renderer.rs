use std::collections::HashMap;

use bytemuck::{Pod, Zeroable};
use wgpu::util::DeviceExt;

use super::{Frame, RenderCtx, RenderTarget};
use crate::paint::Rgb;
use crate::scene::InstanceType;
use crate::viewer::{Material, MaterialId, Primitive, PrimitiveId, PrimitiveKind};

type PipelineKey = (InstanceType, PrimitiveKind);

/// Draws render-graph primitives with one pipeline per instancing mode and
/// topology. Materials only bind a color uniform.
///
/// Geometry is uploaded the first time a primitive is drawn and kept until
/// it is released. Point size is not configurable under wgpu; points are
/// drawn one pixel wide.
#[derive(Default)]
pub struct BatchRenderer {
    pipeline_format: Option<(wgpu::TextureFormat, u32)>,
    pipelines: HashMap<PipelineKey, wgpu::RenderPipeline>,

    globals_layout: Option<wgpu::BindGroupLayout>,
    material_layout: Option<wgpu::BindGroupLayout>,
    globals_ubo: Option<wgpu::Buffer>,
    globals_bind_group: Option<wgpu::BindGroup>,

    primitives: HashMap<PrimitiveId, GpuPrimitive>,
    materials: HashMap<MaterialId, GpuMaterial>,
}

struct GpuPrimitive {
    vertices: wgpu::Buffer,
    vertex_count: u32,
    indices: Option<(wgpu::Buffer, u32)>,
    instances: Option<(wgpu::Buffer, u32)>,
}

struct GpuMaterial {
    // Keeps the uniform alive for the bind group.
    _ubo: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
}

impl BatchRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Clears the target and draws every visible primitive of `frame`.
    pub fn render(&mut self, ctx: &RenderCtx<'_>, target: &mut RenderTarget<'_>, frame: &Frame<'_>) {
        self.ensure_pipelines(ctx);
        self.ensure_bindings(ctx);
        self.write_globals(ctx, frame);

        let srgb = ctx.surface_format.is_srgb();
        let mut draws = Vec::new();
        for (primitive, material) in frame.draws() {
            if !self.ensure_primitive(ctx, primitive) {
                continue;
            }
            self.ensure_material(ctx, material, srgb);
            draws.push((primitive.id, material.id, (primitive.geometry.instance_type(), primitive.kind)));
        }

        let clear = clear_color(frame.clear_color, frame.clear_alpha, srgb);

        let Some(globals) = self.globals_bind_group.as_ref() else { return };

        let mut rpass = target.encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("linework scene pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: target.color_view,
                resolve_target: target.resolve_target,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(clear),
                    store: wgpu::StoreOp::Store,
                },
                depth_slice: None,
            })],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
            multiview_mask: None,
        });

        rpass.set_bind_group(0, globals, &[]);

        for (pid, mid, key) in draws {
            let (Some(gp), Some(gm), Some(pipeline)) = (
                self.primitives.get(&pid),
                self.materials.get(&mid),
                self.pipelines.get(&key),
            ) else {
                continue;
            };

            rpass.set_pipeline(pipeline);
            rpass.set_bind_group(1, &gm.bind_group, &[]);
            rpass.set_vertex_buffer(0, gp.vertices.slice(..));

            let instances = match &gp.instances {
                Some((buf, n)) => {
                    rpass.set_vertex_buffer(1, buf.slice(..));
                    0..*n
                }
                None => 0..1,
            };

            match &gp.indices {
                Some((buf, n)) => {
                    rpass.set_index_buffer(buf.slice(..), wgpu::IndexFormat::Uint16);
                    rpass.draw_indexed(0..*n, 0, instances);
                }
                None => rpass.draw(0..gp.vertex_count, instances),
            }
        }
    }

    pub fn release_primitive(&mut self, id: PrimitiveId) {
        self.primitives.remove(&id);
    }

    pub fn release_material(&mut self, id: MaterialId) {
        self.materials.remove(&id);
    }

    fn ensure_pipelines(&mut self, ctx: &RenderCtx<'_>) {
        let format = (ctx.surface_format, ctx.sample_count);
        if self.pipeline_format == Some(format) && !self.pipelines.is_empty() {
            return;
        }

        let shader = ctx.device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("linework batch shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("shaders/batch.wgsl").into()),
        });

        let globals_layout = uniform_layout(ctx, "linework globals bgl", size_of::<GlobalsUniform>());
        let material_layout = uniform_layout(ctx, "linework material bgl", size_of::<MaterialUniform>());

        let pipeline_layout = ctx.device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("linework batch pipeline layout"),
            bind_group_layouts: &[&globals_layout, &material_layout],
            immediate_size: 0,
        });

        let mut pipelines = HashMap::new();
        for instance_type in InstanceType::ALL {
            for kind in [PrimitiveKind::Points, PrimitiveKind::Lines, PrimitiveKind::Triangles] {
                let pipeline = create_pipeline(ctx, &shader, &pipeline_layout, instance_type, kind);
                pipelines.insert((instance_type, kind), pipeline);
            }
        }

        self.pipeline_format = Some(format);
        self.pipelines = pipelines;
        self.globals_layout = Some(globals_layout);
        self.material_layout = Some(material_layout);

        // Bind groups follow their layouts.
        self.globals_ubo = None;
        self.globals_bind_group = None;
        self.materials.clear();
    }

    fn ensure_bindings(&mut self, ctx: &RenderCtx<'_>) {
        if self.globals_bind_group.is_some() && self.globals_ubo.is_some() {
            return;
        }
        let Some(layout) = self.globals_layout.as_ref() else { return };

        let ubo = ctx.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("linework globals ubo"),
            size: size_of::<GlobalsUniform>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let bind_group = ctx.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("linework globals bind group"),
            layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: ubo.as_entire_binding(),
            }],
        });

        self.globals_ubo = Some(ubo);
        self.globals_bind_group = Some(bind_group);
    }

    fn write_globals(&self, ctx: &RenderCtx<'_>, frame: &Frame<'_>) {
        let Some(ubo) = self.globals_ubo.as_ref() else { return };
        let u = GlobalsUniform {
            view_proj: frame.view_proj,
        };
        ctx.queue.write_buffer(ubo, 0, bytemuck::bytes_of(&u));
    }

    /// Uploads `primitive` once. Returns false if it has nothing to draw.
    fn ensure_primitive(&mut self, ctx: &RenderCtx<'_>, primitive: &Primitive) -> bool {
        if self.primitives.contains_key(&primitive.id) {
            return true;
        }

        let geometry = &primitive.geometry;
        let vertices = geometry.vertices();
        if vertices.is_empty() || geometry.instance_count() == 0 {
            return false;
        }

        let label = format!("linework primitive {}", primitive.id.raw());
        let upload = |contents: &[u8], usage| {
            ctx.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(&label),
                contents,
                usage,
            })
        };

        let gp = GpuPrimitive {
            vertices: upload(bytemuck::cast_slice(vertices), wgpu::BufferUsages::VERTEX),
            vertex_count: geometry.vertex_count(),
            indices: geometry
                .indices()
                .filter(|i| !i.is_empty())
                .map(|i| (upload(bytemuck::cast_slice(i), wgpu::BufferUsages::INDEX), i.len() as u32)),
            instances: match geometry.instance_type() {
                InstanceType::None => None,
                _ => Some((
                    upload(bytemuck::cast_slice(geometry.instances()), wgpu::BufferUsages::VERTEX),
                    geometry.instance_count(),
                )),
            },
        };

        self.primitives.insert(primitive.id, gp);
        true
    }

    fn ensure_material(&mut self, ctx: &RenderCtx<'_>, material: &Material, srgb: bool) {
        if self.materials.contains_key(&material.id) {
            return;
        }
        let Some(layout) = self.material_layout.as_ref() else { return };

        let [r, g, b] = if srgb { material.color.to_linear_f32() } else { material.color.to_srgb_f32() };
        let u = MaterialUniform { color: [r, g, b, 1.0] };

        let ubo = ctx.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("linework material ubo"),
            contents: bytemuck::bytes_of(&u),
            usage: wgpu::BufferUsages::UNIFORM,
        });

        let bind_group = ctx.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("linework material bind group"),
            layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: ubo.as_entire_binding(),
            }],
        });

        self.materials.insert(material.id, GpuMaterial { _ubo: ubo, bind_group });
    }
}

fn uniform_layout(ctx: &RenderCtx<'_>, label: &str, size: usize) -> wgpu::BindGroupLayout {
    ctx.device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some(label),
        entries: &[wgpu::BindGroupLayoutEntry {
            binding: 0,
            visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Uniform,
                has_dynamic_offset: false,
                min_binding_size: wgpu::BufferSize::new(size as u64),
            },
            count: None,
        }],
    })
}

fn create_pipeline(
    ctx: &RenderCtx<'_>,
    shader: &wgpu::ShaderModule,
    layout: &wgpu::PipelineLayout,
    instance_type: InstanceType,
    kind: PrimitiveKind,
) -> wgpu::RenderPipeline {
    let (entry_point, buffers): (&str, &[wgpu::VertexBufferLayout<'static>]) = match instance_type {
        InstanceType::None => ("vs_plain", &PLAIN_BUFFERS),
        InstanceType::Full => ("vs_full", &FULL_BUFFERS),
        InstanceType::Point => ("vs_point", &POINT_BUFFERS),
    };

    let topology = match kind {
        PrimitiveKind::Points => wgpu::PrimitiveTopology::PointList,
        PrimitiveKind::Lines => wgpu::PrimitiveTopology::LineList,
        PrimitiveKind::Triangles => wgpu::PrimitiveTopology::TriangleList,
    };

    ctx.device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some(&format!("linework {instance_type:?} {kind:?} pipeline")),
        layout: Some(layout),

        vertex: wgpu::VertexState {
            module: shader,
            entry_point: Some(entry_point),
            compilation_options: Default::default(),
            buffers,
        },

        fragment: Some(wgpu::FragmentState {
            module: shader,
            entry_point: Some("fs_main"),
            compilation_options: Default::default(),
            targets: &[Some(wgpu::ColorTargetState {
                format: ctx.surface_format,
                blend: Some(wgpu::BlendState::PREMULTIPLIED_ALPHA_BLENDING),
                write_mask: wgpu::ColorWrites::ALL,
            })],
        }),

        primitive: wgpu::PrimitiveState {
            topology,
            strip_index_format: None,
            front_face: wgpu::FrontFace::Ccw,
            cull_mode: None,
            polygon_mode: wgpu::PolygonMode::Fill,
            unclipped_depth: false,
            conservative: false,
        },

        depth_stencil: None,
        multisample: wgpu::MultisampleState {
            count: ctx.sample_count,
            ..Default::default()
        },

        multiview_mask: None,
        cache: None,
    })
}

pub(super) fn clear_color(color: Rgb, alpha: f32, srgb: bool) -> wgpu::Color {
    let [r, g, b] = if srgb { color.to_linear_f32() } else { color.to_srgb_f32() };
    // Premultiplied, matching the blend state.
    let a = alpha.clamp(0.0, 1.0) as f64;
    wgpu::Color {
        r: r as f64 * a,
        g: g as f64 * a,
        b: b as f64 * a,
        a,
    }
}

#[repr(C)]
#[derive(Debug, Copy, Clone, Pod, Zeroable)]
struct GlobalsUniform {
    view_proj: [[f32; 4]; 4],
}

#[repr(C)]
#[derive(Debug, Copy, Clone, Pod, Zeroable)]
struct MaterialUniform {
    color: [f32; 4],
}

const POSITION_ATTRS: [wgpu::VertexAttribute; 1] = wgpu::vertex_attr_array![0 => Float32x2];

const FULL_ATTRS: [wgpu::VertexAttribute; 2] = wgpu::vertex_attr_array![
    1 => Float32x3, // row 0
    2 => Float32x3  // row 1
];

const POINT_ATTRS: [wgpu::VertexAttribute; 1] = wgpu::vertex_attr_array![1 => Float32x2];

const POSITION: wgpu::VertexBufferLayout<'static> = wgpu::VertexBufferLayout {
    array_stride: 2 * size_of::<f32>() as u64,
    step_mode: wgpu::VertexStepMode::Vertex,
    attributes: &POSITION_ATTRS,
};

const PLAIN_BUFFERS: [wgpu::VertexBufferLayout<'static>; 1] = [POSITION];

const FULL_BUFFERS: [wgpu::VertexBufferLayout<'static>; 2] = [
    POSITION,
    wgpu::VertexBufferLayout {
        array_stride: 6 * size_of::<f32>() as u64,
        step_mode: wgpu::VertexStepMode::Instance,
        attributes: &FULL_ATTRS,
    },
];

const POINT_BUFFERS: [wgpu::VertexBufferLayout<'static>; 2] = [
    POSITION,
    wgpu::VertexBufferLayout {
        array_stride: 2 * size_of::<f32>() as u64,
        step_mode: wgpu::VertexStepMode::Instance,
        attributes: &POINT_ATTRS,
    },
];
