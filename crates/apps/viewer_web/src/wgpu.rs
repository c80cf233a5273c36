#[cfg(target_arch = "wasm32")]
mod imp {
    use ::wgpu::util::DeviceExt;
    use gpu::{MeshData, RenderCommand, RenderFrame};
    use scene::components::Shading;
    use scene::{GeometryId, Released, SceneGraph};
    use std::borrow::Cow;
    use std::collections::HashMap;
    use tracing::{debug, info};

    /// Per-draw uniforms live at this stride inside one dynamic-offset buffer.
    const DRAW_STRIDE: u64 = 256;

    const SHADER: &str = r#"
struct Globals {
    view_proj: mat4x4<f32>,
    light_dir: vec4<f32>,
    camera_pos: vec4<f32>,
};

struct Draw {
    model: mat4x4<f32>,
    color: vec4<f32>,
    emissive: vec4<f32>,
};

@group(0) @binding(0) var<uniform> globals: Globals;
@group(0) @binding(1) var<uniform> draw: Draw;

struct MeshOut {
    @builtin(position) pos: vec4<f32>,
    @location(0) normal: vec3<f32>,
};

@vertex
fn vs_mesh(@location(0) position: vec3<f32>, @location(1) normal: vec3<f32>) -> MeshOut {
    let world = draw.model * vec4<f32>(position, 1.0);
    let n = (draw.model * vec4<f32>(normal, 0.0)).xyz;
    return MeshOut(globals.view_proj * world, n);
}

@fragment
fn fs_lit(in: MeshOut) -> @location(0) vec4<f32> {
    let n = normalize(in.normal);
    let ndotl = max(dot(n, normalize(globals.light_dir.xyz)), 0.0);
    let shade = 0.35 + 0.65 * ndotl;
    return vec4<f32>(draw.color.rgb * shade + draw.emissive.rgb * 0.6, draw.color.a);
}

@fragment
fn fs_flat(in: MeshOut) -> @location(0) vec4<f32> {
    return draw.color;
}

@vertex
fn vs_line(@location(0) position: vec3<f32>) -> @builtin(position) vec4<f32> {
    return globals.view_proj * draw.model * vec4<f32>(position, 1.0);
}

@fragment
fn fs_line() -> @location(0) vec4<f32> {
    return draw.color;
}

struct PointOut {
    @builtin(position) pos: vec4<f32>,
    @location(0) color: vec3<f32>,
};

@vertex
fn vs_point(@location(0) position: vec3<f32>, @location(1) color: vec3<f32>) -> PointOut {
    return PointOut(globals.view_proj * draw.model * vec4<f32>(position, 1.0), color);
}

@fragment
fn fs_point(in: PointOut) -> @location(0) vec4<f32> {
    return vec4<f32>(in.color * draw.color.rgb, draw.color.a);
}
"#;

    #[repr(C)]
    #[derive(Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
    struct Globals {
        view_proj: [[f32; 4]; 4],
        light_dir: [f32; 4],
        camera_pos: [f32; 4],
    }

    #[repr(C)]
    #[derive(Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
    struct DrawUniform {
        model: [[f32; 4]; 4],
        color: [f32; 4],
        emissive: [f32; 4],
    }

    impl DrawUniform {
        fn from_command(cmd: &RenderCommand) -> Self {
            let [r, g, b] = cmd.emissive;
            Self {
                model: cmd.model,
                color: cmd.color,
                emissive: [r, g, b, cmd.point_size],
            }
        }
    }

    struct GpuMesh {
        vertices: ::wgpu::Buffer,
        indices: Option<::wgpu::Buffer>,
        count: u32,
    }

    pub struct WgpuContext {
        _instance: &'static ::wgpu::Instance,
        surface: ::wgpu::Surface<'static>,
        device: ::wgpu::Device,
        queue: ::wgpu::Queue,
        config: ::wgpu::SurfaceConfiguration,
        _canvas: web_sys::HtmlCanvasElement,
        shader: ::wgpu::ShaderModule,
        layout: ::wgpu::PipelineLayout,
        bind_group_layout: ::wgpu::BindGroupLayout,
        globals: ::wgpu::Buffer,
        draws: ::wgpu::Buffer,
        draw_capacity: u64,
        bind_group: ::wgpu::BindGroup,
        depth_view: ::wgpu::TextureView,
        pipelines: HashMap<(Shading, bool), ::wgpu::RenderPipeline>,
        meshes: HashMap<GeometryId, GpuMesh>,
    }

    impl std::fmt::Debug for WgpuContext {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            f.debug_struct("WgpuContext")
                .field("width", &self.config.width)
                .field("height", &self.config.height)
                .field("meshes", &self.meshes.len())
                .field("pipelines", &self.pipelines.len())
                .finish()
        }
    }

    fn create_depth_view(
        device: &::wgpu::Device,
        config: &::wgpu::SurfaceConfiguration,
    ) -> ::wgpu::TextureView {
        let tex = device.create_texture(&::wgpu::TextureDescriptor {
            label: Some("globe-depth"),
            size: ::wgpu::Extent3d {
                width: config.width.max(1),
                height: config.height.max(1),
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: ::wgpu::TextureDimension::D2,
            format: ::wgpu::TextureFormat::Depth24Plus,
            usage: ::wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });
        tex.create_view(&::wgpu::TextureViewDescriptor::default())
    }

    fn create_draw_buffer(device: &::wgpu::Device, slots: u64) -> ::wgpu::Buffer {
        device.create_buffer(&::wgpu::BufferDescriptor {
            label: Some("globe-draws"),
            size: slots.max(1) * DRAW_STRIDE,
            usage: ::wgpu::BufferUsages::UNIFORM | ::wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        })
    }

    fn create_bind_group(
        device: &::wgpu::Device,
        layout: &::wgpu::BindGroupLayout,
        globals: &::wgpu::Buffer,
        draws: &::wgpu::Buffer,
    ) -> ::wgpu::BindGroup {
        device.create_bind_group(&::wgpu::BindGroupDescriptor {
            label: Some("globe-bg"),
            layout,
            entries: &[
                ::wgpu::BindGroupEntry {
                    binding: 0,
                    resource: globals.as_entire_binding(),
                },
                ::wgpu::BindGroupEntry {
                    binding: 1,
                    resource: ::wgpu::BindingResource::Buffer(::wgpu::BufferBinding {
                        buffer: draws,
                        offset: 0,
                        size: ::wgpu::BufferSize::new(std::mem::size_of::<DrawUniform>() as u64),
                    }),
                },
            ],
        })
    }

    const MESH_ATTRIBUTES: [::wgpu::VertexAttribute; 2] =
        ::wgpu::vertex_attr_array![0 => Float32x3, 1 => Float32x3];
    const LINE_ATTRIBUTES: [::wgpu::VertexAttribute; 1] =
        ::wgpu::vertex_attr_array![0 => Float32x3];

    fn build_pipeline(
        device: &::wgpu::Device,
        layout: &::wgpu::PipelineLayout,
        shader: &::wgpu::ShaderModule,
        format: ::wgpu::TextureFormat,
        shading: Shading,
        depth_write: bool,
    ) -> ::wgpu::RenderPipeline {
        let (vs, fs, stride, attributes, topology, cull): (
            &str,
            &str,
            u64,
            &[::wgpu::VertexAttribute],
            ::wgpu::PrimitiveTopology,
            Option<::wgpu::Face>,
        ) = match shading {
            Shading::Lit => (
                "vs_mesh",
                "fs_lit",
                24,
                &MESH_ATTRIBUTES,
                ::wgpu::PrimitiveTopology::TriangleList,
                Some(::wgpu::Face::Back),
            ),
            Shading::Unlit => (
                "vs_mesh",
                "fs_flat",
                24,
                &MESH_ATTRIBUTES,
                ::wgpu::PrimitiveTopology::TriangleList,
                Some(::wgpu::Face::Back),
            ),
            Shading::BackFace => (
                "vs_mesh",
                "fs_flat",
                24,
                &MESH_ATTRIBUTES,
                ::wgpu::PrimitiveTopology::TriangleList,
                Some(::wgpu::Face::Front),
            ),
            Shading::Line => (
                "vs_line",
                "fs_line",
                12,
                &LINE_ATTRIBUTES,
                ::wgpu::PrimitiveTopology::LineList,
                None,
            ),
            Shading::Point => (
                "vs_point",
                "fs_point",
                24,
                &MESH_ATTRIBUTES,
                ::wgpu::PrimitiveTopology::PointList,
                None,
            ),
        };

        device.create_render_pipeline(&::wgpu::RenderPipelineDescriptor {
            label: Some("globe-pipeline"),
            layout: Some(layout),
            vertex: ::wgpu::VertexState {
                module: shader,
                entry_point: Some(vs),
                compilation_options: Default::default(),
                buffers: &[::wgpu::VertexBufferLayout {
                    array_stride: stride,
                    step_mode: ::wgpu::VertexStepMode::Vertex,
                    attributes,
                }],
            },
            fragment: Some(::wgpu::FragmentState {
                module: shader,
                entry_point: Some(fs),
                compilation_options: Default::default(),
                targets: &[Some(::wgpu::ColorTargetState {
                    format,
                    blend: Some(::wgpu::BlendState::ALPHA_BLENDING),
                    write_mask: ::wgpu::ColorWrites::ALL,
                })],
            }),
            primitive: ::wgpu::PrimitiveState {
                topology,
                strip_index_format: None,
                front_face: ::wgpu::FrontFace::Ccw,
                cull_mode: cull,
                polygon_mode: ::wgpu::PolygonMode::Fill,
                unclipped_depth: false,
                conservative: false,
            },
            // Background points ignore depth entirely; everything else tests
            // against the globe.
            depth_stencil: Some(::wgpu::DepthStencilState {
                format: ::wgpu::TextureFormat::Depth24Plus,
                depth_write_enabled: depth_write,
                depth_compare: if shading == Shading::Point {
                    ::wgpu::CompareFunction::Always
                } else {
                    ::wgpu::CompareFunction::LessEqual
                },
                stencil: ::wgpu::StencilState::default(),
                bias: ::wgpu::DepthBiasState::default(),
            }),
            multisample: ::wgpu::MultisampleState::default(),
            multiview_mask: None,
            cache: None,
        })
    }

    fn upload(device: &::wgpu::Device, data: &MeshData) -> GpuMesh {
        let count = data.element_count();
        match data {
            MeshData::Triangles { vertices, indices } => GpuMesh {
                vertices: device.create_buffer_init(&::wgpu::util::BufferInitDescriptor {
                    label: Some("globe-mesh-vertices"),
                    contents: bytemuck::cast_slice(vertices),
                    usage: ::wgpu::BufferUsages::VERTEX,
                }),
                indices: Some(device.create_buffer_init(&::wgpu::util::BufferInitDescriptor {
                    label: Some("globe-mesh-indices"),
                    contents: bytemuck::cast_slice(indices),
                    usage: ::wgpu::BufferUsages::INDEX,
                })),
                count,
            },
            MeshData::Lines { vertices } => GpuMesh {
                vertices: device.create_buffer_init(&::wgpu::util::BufferInitDescriptor {
                    label: Some("globe-line-vertices"),
                    contents: bytemuck::cast_slice(vertices),
                    usage: ::wgpu::BufferUsages::VERTEX,
                }),
                indices: None,
                count,
            },
            MeshData::Points { vertices } => GpuMesh {
                vertices: device.create_buffer_init(&::wgpu::util::BufferInitDescriptor {
                    label: Some("globe-point-vertices"),
                    contents: bytemuck::cast_slice(vertices),
                    usage: ::wgpu::BufferUsages::VERTEX,
                }),
                indices: None,
                count,
            },
        }
    }

    pub async fn init_wgpu_from_canvas(
        canvas_elem: web_sys::HtmlCanvasElement,
    ) -> Result<WgpuContext, String> {
        let width = canvas_elem.width().max(1);
        let height = canvas_elem.height().max(1);

        // `wgpu::Surface` must not outlive its `wgpu::Instance`; the instance
        // is leaked for the lifetime of the page.
        let instance: &'static ::wgpu::Instance = Box::leak(Box::new(::wgpu::Instance::new(
            &::wgpu::InstanceDescriptor {
                backends: ::wgpu::Backends::BROWSER_WEBGPU | ::wgpu::Backends::GL,
                ..Default::default()
            },
        )));

        let surface = instance
            .create_surface(::wgpu::SurfaceTarget::Canvas(canvas_elem.clone()))
            .map_err(|e| format!("surface error: {e}"))?;

        let adapter = instance
            .request_adapter(&::wgpu::RequestAdapterOptions {
                power_preference: ::wgpu::PowerPreference::HighPerformance,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .map_err(|e| format!("adapter error: {e}"))?;

        let (device, queue) = adapter
            .request_device(&::wgpu::DeviceDescriptor {
                label: Some("globe-device"),
                required_features: ::wgpu::Features::empty(),
                required_limits: ::wgpu::Limits::downlevel_webgl2_defaults(),
                ..Default::default()
            })
            .await
            .map_err(|e| format!("device error: {e}"))?;

        let caps = surface.get_capabilities(&adapter);
        let format = caps
            .formats
            .iter()
            .copied()
            .find(|f| f.is_srgb())
            .or_else(|| caps.formats.first().copied())
            .ok_or_else(|| "surface reports no formats".to_string())?;
        let alpha_mode = caps
            .alpha_modes
            .first()
            .copied()
            .unwrap_or(::wgpu::CompositeAlphaMode::Auto);

        let config = ::wgpu::SurfaceConfiguration {
            usage: ::wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width,
            height,
            desired_maximum_frame_latency: 2,
            present_mode: ::wgpu::PresentMode::Fifo,
            alpha_mode,
            view_formats: vec![],
        };
        surface.configure(&device, &config);
        let depth_view = create_depth_view(&device, &config);

        let shader = device.create_shader_module(::wgpu::ShaderModuleDescriptor {
            label: Some("globe-shader"),
            source: ::wgpu::ShaderSource::Wgsl(Cow::Borrowed(SHADER)),
        });

        let bind_group_layout =
            device.create_bind_group_layout(&::wgpu::BindGroupLayoutDescriptor {
                label: Some("globe-bgl"),
                entries: &[
                    ::wgpu::BindGroupLayoutEntry {
                        binding: 0,
                        visibility: ::wgpu::ShaderStages::VERTEX_FRAGMENT,
                        ty: ::wgpu::BindingType::Buffer {
                            ty: ::wgpu::BufferBindingType::Uniform,
                            has_dynamic_offset: false,
                            min_binding_size: None,
                        },
                        count: None,
                    },
                    ::wgpu::BindGroupLayoutEntry {
                        binding: 1,
                        visibility: ::wgpu::ShaderStages::VERTEX_FRAGMENT,
                        ty: ::wgpu::BindingType::Buffer {
                            ty: ::wgpu::BufferBindingType::Uniform,
                            has_dynamic_offset: true,
                            min_binding_size: ::wgpu::BufferSize::new(
                                std::mem::size_of::<DrawUniform>() as u64,
                            ),
                        },
                        count: None,
                    },
                ],
            });

        let layout = device.create_pipeline_layout(&::wgpu::PipelineLayoutDescriptor {
            label: Some("globe-pipeline-layout"),
            bind_group_layouts: &[&bind_group_layout],
            immediate_size: 0,
        });

        let globals = device.create_buffer(&::wgpu::BufferDescriptor {
            label: Some("globe-globals"),
            size: std::mem::size_of::<Globals>() as u64,
            usage: ::wgpu::BufferUsages::UNIFORM | ::wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let draw_capacity = 64;
        let draws = create_draw_buffer(&device, draw_capacity);
        let bind_group = create_bind_group(&device, &bind_group_layout, &globals, &draws);

        info!(width, height, ?format, "gpu.ready");

        Ok(WgpuContext {
            _instance: instance,
            surface,
            device,
            queue,
            config,
            _canvas: canvas_elem,
            shader,
            layout,
            bind_group_layout,
            globals,
            draws,
            draw_capacity,
            bind_group,
            depth_view,
            pipelines: HashMap::new(),
            meshes: HashMap::new(),
        })
    }

    pub fn resize_wgpu(ctx: &mut WgpuContext, width: u32, height: u32) {
        ctx.config.width = width.max(1);
        ctx.config.height = height.max(1);
        ctx.surface.configure(&ctx.device, &ctx.config);
        ctx.depth_view = create_depth_view(&ctx.device, &ctx.config);
    }

    /// Drops GPU buffers for geometries the scene has released.
    pub fn release(ctx: &mut WgpuContext, released: &[Released]) {
        for item in released {
            if let Released::Geometry(id) = item {
                if ctx.meshes.remove(id).is_some() {
                    debug!(?id, "gpu.mesh_released");
                }
            }
        }
    }

    fn ensure_meshes(ctx: &mut WgpuContext, scene: &SceneGraph, frame: &RenderFrame) {
        for cmd in &frame.commands {
            if ctx.meshes.contains_key(&cmd.geometry) {
                continue;
            }
            let Some(geometry) = scene.geometry(cmd.geometry) else {
                continue;
            };
            let mesh = upload(&ctx.device, &MeshData::from_geometry(geometry));
            ctx.meshes.insert(cmd.geometry, mesh);
        }
    }

    fn ensure_draw_capacity(ctx: &mut WgpuContext, slots: u64) {
        if slots <= ctx.draw_capacity {
            return;
        }
        let capacity = slots.next_power_of_two();
        ctx.draws = create_draw_buffer(&ctx.device, capacity);
        ctx.bind_group =
            create_bind_group(&ctx.device, &ctx.bind_group_layout, &ctx.globals, &ctx.draws);
        ctx.draw_capacity = capacity;
    }

    fn ensure_pipelines(ctx: &mut WgpuContext, frame: &RenderFrame) {
        for cmd in &frame.commands {
            let key = (cmd.shading, cmd.depth_write);
            if ctx.pipelines.contains_key(&key) {
                continue;
            }
            let pipeline = build_pipeline(
                &ctx.device,
                &ctx.layout,
                &ctx.shader,
                ctx.config.format,
                cmd.shading,
                cmd.depth_write,
            );
            ctx.pipelines.insert(key, pipeline);
        }
    }

    /// Draws one collected frame. Commands arrive already sorted by pass and
    /// order, so they are submitted as-is into a single render pass.
    pub fn render_frame(
        ctx: &mut WgpuContext,
        scene: &SceneGraph,
        frame: &RenderFrame,
    ) -> Result<(), String> {
        ensure_meshes(ctx, scene, frame);
        ensure_pipelines(ctx, frame);
        ensure_draw_capacity(ctx, frame.commands.len() as u64);

        let [lx, ly, lz] = frame.light_dir;
        let [cx, cy, cz] = frame.camera_position;
        let globals = Globals {
            view_proj: frame.view_proj,
            light_dir: [lx, ly, lz, 0.0],
            camera_pos: [cx, cy, cz, 1.0],
        };
        ctx.queue
            .write_buffer(&ctx.globals, 0, bytemuck::bytes_of(&globals));

        let mut staging = vec![0u8; frame.commands.len() * DRAW_STRIDE as usize];
        for (i, cmd) in frame.commands.iter().enumerate() {
            let start = i * DRAW_STRIDE as usize;
            let uniform = DrawUniform::from_command(cmd);
            let bytes = bytemuck::bytes_of(&uniform);
            staging[start..start + bytes.len()].copy_from_slice(bytes);
        }
        if !staging.is_empty() {
            ctx.queue.write_buffer(&ctx.draws, 0, &staging);
        }

        let surface_frame = ctx
            .surface
            .get_current_texture()
            .map_err(|e| format!("surface acquire failed: {e}"))?;
        let view = surface_frame
            .texture
            .create_view(&::wgpu::TextureViewDescriptor::default());

        let mut encoder = ctx
            .device
            .create_command_encoder(&::wgpu::CommandEncoderDescriptor {
                label: Some("globe-encoder"),
            });

        {
            let mut rpass = encoder.begin_render_pass(&::wgpu::RenderPassDescriptor {
                label: Some("globe-pass"),
                color_attachments: &[Some(::wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    depth_slice: None,
                    ops: ::wgpu::Operations {
                        load: ::wgpu::LoadOp::Clear(::wgpu::Color {
                            r: 0.0,
                            g: 0.0,
                            b: 0.0,
                            a: 0.0,
                        }),
                        store: ::wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(::wgpu::RenderPassDepthStencilAttachment {
                    view: &ctx.depth_view,
                    depth_ops: Some(::wgpu::Operations {
                        load: ::wgpu::LoadOp::Clear(1.0),
                        store: ::wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                occlusion_query_set: None,
                timestamp_writes: None,
                multiview_mask: None,
            });

            for (i, cmd) in frame.commands.iter().enumerate() {
                let (Some(mesh), Some(pipeline)) = (
                    ctx.meshes.get(&cmd.geometry),
                    ctx.pipelines.get(&(cmd.shading, cmd.depth_write)),
                ) else {
                    continue;
                };
                let offset = (i as u64 * DRAW_STRIDE) as u32;
                rpass.set_pipeline(pipeline);
                rpass.set_bind_group(0, &ctx.bind_group, &[offset]);
                rpass.set_vertex_buffer(0, mesh.vertices.slice(..));
                match &mesh.indices {
                    Some(indices) => {
                        rpass.set_index_buffer(indices.slice(..), ::wgpu::IndexFormat::Uint32);
                        rpass.draw_indexed(0..mesh.count, 0, 0..1);
                    }
                    None => rpass.draw(0..mesh.count, 0..1),
                }
            }
        }

        ctx.queue.submit(std::iter::once(encoder.finish()));
        surface_frame.present();
        Ok(())
    }
}

#[cfg(not(target_arch = "wasm32"))]
mod imp {
    use gpu::RenderFrame;
    use scene::{Released, SceneGraph};

    #[derive(Debug, Default)]
    pub struct WgpuContext;

    pub async fn init_wgpu_from_canvas(
        _canvas: web_sys::HtmlCanvasElement,
    ) -> Result<WgpuContext, String> {
        Err("wgpu initialization is only available on wasm32 targets".to_string())
    }

    pub fn resize_wgpu(_ctx: &mut WgpuContext, _width: u32, _height: u32) {}

    pub fn release(_ctx: &mut WgpuContext, _released: &[Released]) {}

    pub fn render_frame(
        _ctx: &mut WgpuContext,
        _scene: &SceneGraph,
        _frame: &RenderFrame,
    ) -> Result<(), String> {
        Err("wgpu rendering is only available on wasm32 targets".to_string())
    }
}

pub use imp::{WgpuContext, init_wgpu_from_canvas, release, render_frame, resize_wgpu};
