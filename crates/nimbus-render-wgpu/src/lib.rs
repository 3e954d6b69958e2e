use std::borrow::Cow;
use std::collections::HashMap;
use std::ops::Range;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

use nimbus_core::{
    GlyphRasterConfig, ImageHandle, Rect, RenderBackend, Scene, SceneNode, image_exists,
    with_image,
};
use nimbus_text::{GlyphKey, SwashContent};

const ATLAS_START: u32 = 1024;
const ATLAS_MAX: u32 = 4096;

/// Growable instance buffer, rewritten once per frame.
struct InstanceBuffer {
    label: &'static str,
    buf: wgpu::Buffer,
    cap: u64,
}

impl InstanceBuffer {
    fn new(device: &wgpu::Device, label: &'static str, cap: u64) -> Self {
        Self {
            label,
            buf: Self::alloc(device, label, cap),
            cap,
        }
    }

    fn alloc(device: &wgpu::Device, label: &str, cap: u64) -> wgpu::Buffer {
        device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(label),
            size: cap,
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        })
    }

    fn upload(&mut self, device: &wgpu::Device, queue: &wgpu::Queue, bytes: &[u8]) {
        if bytes.is_empty() {
            return;
        }
        let len = bytes.len() as u64;
        if len > self.cap {
            self.cap = len.next_power_of_two();
            log::debug!("growing {} to {} bytes", self.label, self.cap);
            self.buf = Self::alloc(device, self.label, self.cap);
        }
        queue.write_buffer(&self.buf, 0, bytes);
    }
}

/// Row-based rectangle packer with a one pixel gutter.
#[derive(Clone, Debug, PartialEq)]
struct Shelf {
    size: u32,
    next_x: u32,
    next_y: u32,
    row_h: u32,
}

impl Shelf {
    fn new(size: u32) -> Self {
        Self {
            size,
            next_x: 1,
            next_y: 1,
            row_h: 0,
        }
    }

    fn alloc(&mut self, w: u32, h: u32) -> Option<(u32, u32)> {
        if w + 2 > self.size || h + 2 > self.size {
            return None;
        }
        if self.next_x + w + 1 > self.size {
            self.next_x = 1;
            self.next_y += self.row_h + 1;
            self.row_h = 0;
        }
        if self.next_y + h + 1 > self.size {
            return None;
        }
        let pos = (self.next_x, self.next_y);
        self.next_x += w + 1;
        self.row_h = self.row_h.max(h);
        Some(pos)
    }
}

#[derive(Clone, Copy, Debug)]
struct GlyphInfo {
    u0: f32,
    v0: f32,
    u1: f32,
    v1: f32,
    w: f32,
    h: f32,
}

/// Glyph atlas for one texel format (A8 masks or RGBA color glyphs).
struct Atlas {
    label: &'static str,
    format: wgpu::TextureFormat,
    bytes_per_pixel: u32,
    tex: wgpu::Texture,
    bind: wgpu::BindGroup,
    shelf: Shelf,
    map: HashMap<GlyphKey, GlyphInfo>,
}

impl Atlas {
    fn new(
        device: &wgpu::Device,
        layout: &wgpu::BindGroupLayout,
        sampler: &wgpu::Sampler,
        label: &'static str,
        format: wgpu::TextureFormat,
        bytes_per_pixel: u32,
        size: u32,
    ) -> Self {
        let tex = create_texture(device, label, format, size, size);
        let bind = texture_bind_group(device, layout, sampler, &tex, label);
        Self {
            label,
            format,
            bytes_per_pixel,
            tex,
            bind,
            shelf: Shelf::new(size),
            map: HashMap::new(),
        }
    }

    fn accepts(&self, content: SwashContent) -> bool {
        match content {
            SwashContent::Color => self.bytes_per_pixel == 4,
            SwashContent::Mask | SwashContent::SubpixelMask => self.bytes_per_pixel == 1,
        }
    }

    fn get_or_upload(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        layout: &wgpu::BindGroupLayout,
        sampler: &wgpu::Sampler,
        key: GlyphKey,
    ) -> Option<GlyphInfo> {
        if let Some(info) = self.map.get(&key) {
            return Some(*info);
        }
        let gb = nimbus_text::rasterize(key)?;
        if gb.w == 0 || gb.h == 0 || gb.data.is_empty() || !self.accepts(gb.content) {
            return None;
        }
        let pos = match self.shelf.alloc(gb.w, gb.h) {
            Some(p) => p,
            None => {
                self.grow(device, queue, layout, sampler)?;
                self.shelf.alloc(gb.w, gb.h)?
            }
        };
        let info = self.write(queue, pos, gb.w, gb.h, &gb.data);
        self.map.insert(key, info);
        Some(info)
    }

    fn write(&self, queue: &wgpu::Queue, (x, y): (u32, u32), w: u32, h: u32, data: &[u8]) -> GlyphInfo {
        queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &self.tex,
                mip_level: 0,
                origin: wgpu::Origin3d { x, y, z: 0 },
                aspect: wgpu::TextureAspect::All,
            },
            data,
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(w * self.bytes_per_pixel),
                rows_per_image: Some(h),
            },
            wgpu::Extent3d {
                width: w,
                height: h,
                depth_or_array_layers: 1,
            },
        );
        let size = self.shelf.size as f32;
        GlyphInfo {
            u0: x as f32 / size,
            v0: y as f32 / size,
            u1: (x + w) as f32 / size,
            v1: (y + h) as f32 / size,
            w: w as f32,
            h: h as f32,
        }
    }

    /// Doubles the texture and re-rasterizes every cached glyph into it.
    fn grow(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        layout: &wgpu::BindGroupLayout,
        sampler: &wgpu::Sampler,
    ) -> Option<()> {
        let new_size = (self.shelf.size * 2).min(ATLAS_MAX);
        if new_size == self.shelf.size {
            log::warn!("{} is full at {new_size}px", self.label);
            return None;
        }
        log::debug!("growing {} to {new_size}px", self.label);
        self.tex = create_texture(device, self.label, self.format, new_size, new_size);
        self.bind = texture_bind_group(device, layout, sampler, &self.tex, self.label);
        self.shelf = Shelf::new(new_size);
        let keys: Vec<GlyphKey> = self.map.drain().map(|(k, _)| k).collect();
        for key in keys {
            if let Some(gb) = nimbus_text::rasterize(key)
                && let Some(pos) = self.shelf.alloc(gb.w, gb.h)
            {
                let info = self.write(queue, pos, gb.w, gb.h, &gb.data);
                self.map.insert(key, info);
            }
        }
        Some(())
    }
}

/// GPU copy of one entry of the image store.
struct GpuImage {
    tex: wgpu::Texture,
    bind: wgpu::BindGroup,
    size: (u32, u32),
    generation: u64,
}

#[repr(C)]
#[derive(Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
struct RectInstance {
    // min corner and extent in NDC
    xywh: [f32; 4],
    radius: f32,
    // linear rgba
    color: [f32; 4],
}

#[repr(C)]
#[derive(Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
struct BorderInstance {
    xywh: [f32; 4],
    radius: f32,
    stroke: f32,
    color: [f32; 4],
}

#[repr(C)]
#[derive(Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
struct TexturedInstance {
    xywh: [f32; 4],
    // u_left, v_bottom, u_right, v_top
    uv: [f32; 4],
    color: [f32; 4],
}

enum Cmd {
    PushClip(Rect),
    PopClip,
    Rects(Range<u32>),
    Borders(Range<u32>),
    Masks(Range<u32>),
    Colors(Range<u32>),
    Image(ImageHandle, u32),
}

/// Collects instances for a whole frame. Batches of the same kind are
/// merged until a clip change or an image forces a break, which keeps
/// images ordered against the content painted before and after them.
#[derive(Default)]
struct Recorder {
    rects: Vec<RectInstance>,
    borders: Vec<BorderInstance>,
    masks: Vec<TexturedInstance>,
    colors: Vec<TexturedInstance>,
    images: Vec<TexturedInstance>,
    open: [u32; 4],
    cmds: Vec<Cmd>,
}

impl Recorder {
    fn flush(&mut self) {
        let lens = [
            self.rects.len() as u32,
            self.borders.len() as u32,
            self.masks.len() as u32,
            self.colors.len() as u32,
        ];
        for (kind, (&start, &end)) in self.open.iter().zip(lens.iter()).enumerate() {
            if end > start {
                let r = start..end;
                self.cmds.push(match kind {
                    0 => Cmd::Rects(r),
                    1 => Cmd::Borders(r),
                    2 => Cmd::Masks(r),
                    _ => Cmd::Colors(r),
                });
            }
        }
        self.open = lens;
    }

    fn image(&mut self, handle: ImageHandle, inst: TexturedInstance) {
        self.flush();
        self.cmds.push(Cmd::Image(handle, self.images.len() as u32));
        self.images.push(inst);
    }
}

pub struct WgpuBackend {
    surface: wgpu::Surface<'static>,
    device: wgpu::Device,
    queue: wgpu::Queue,
    config: wgpu::SurfaceConfiguration,

    rect_pipeline: wgpu::RenderPipeline,
    border_pipeline: wgpu::RenderPipeline,
    mask_pipeline: wgpu::RenderPipeline,
    rgba_pipeline: wgpu::RenderPipeline,
    texture_layout: wgpu::BindGroupLayout,
    sampler: wgpu::Sampler,

    atlas_mask: Atlas,
    atlas_color: Atlas,
    images: HashMap<ImageHandle, GpuImage>,

    buf_rect: InstanceBuffer,
    buf_border: InstanceBuffer,
    buf_mask: InstanceBuffer,
    buf_color: InstanceBuffer,
    buf_image: InstanceBuffer,
}

impl WgpuBackend {
    pub fn new(window: Arc<winit::window::Window>) -> anyhow::Result<Self> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor::from_env_or_default());
        let surface = instance.create_surface(window.clone())?;

        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::HighPerformance,
            compatible_surface: Some(&surface),
            force_fallback_adapter: false,
        }))
        .map_err(|e| anyhow::anyhow!("no suitable GPU adapter: {e}"))?;
        log::info!("using adapter {:?}", adapter.get_info().name);

        let (device, queue) =
            pollster::block_on(adapter.request_device(&wgpu::DeviceDescriptor {
                label: Some("nimbus device"),
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::downlevel_webgl2_defaults()
                    .using_resolution(adapter.limits()),
                experimental_features: wgpu::ExperimentalFeatures::disabled(),
                memory_hints: wgpu::MemoryHints::default(),
                trace: wgpu::Trace::Off,
            }))?;

        let size = window.inner_size();
        let caps = surface.get_capabilities(&adapter);
        let format = caps
            .formats
            .iter()
            .copied()
            .find(|f| f.is_srgb())
            .or_else(|| caps.formats.first().copied())
            .ok_or_else(|| anyhow::anyhow!("surface reports no formats"))?;
        let present_mode = caps
            .present_modes
            .iter()
            .copied()
            .find(|m| *m == wgpu::PresentMode::Mailbox)
            .unwrap_or(wgpu::PresentMode::Fifo);
        let alpha_mode = caps
            .alpha_modes
            .first()
            .copied()
            .unwrap_or(wgpu::CompositeAlphaMode::Auto);

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode,
            alpha_mode,
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);

        let rect_shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("rect.wgsl"),
            source: wgpu::ShaderSource::Wgsl(Cow::Borrowed(include_str!("shaders/rect.wgsl"))),
        });
        let border_shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("border.wgsl"),
            source: wgpu::ShaderSource::Wgsl(Cow::Borrowed(include_str!("shaders/border.wgsl"))),
        });
        let textured_shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("textured.wgsl"),
            source: wgpu::ShaderSource::Wgsl(Cow::Borrowed(include_str!(
                "shaders/textured.wgsl"
            ))),
        });

        let texture_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("texture bind layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        multisampled: false,
                        view_dimension: wgpu::TextureViewDimension::D2,
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        });
        let plain_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("plain pipeline layout"),
            bind_group_layouts: &[],
            push_constant_ranges: &[],
        });
        let textured_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("textured pipeline layout"),
            bind_group_layouts: &[&texture_layout],
            push_constant_ranges: &[],
        });

        let rect_attrs = wgpu::vertex_attr_array![0 => Float32x4, 1 => Float32, 2 => Float32x4];
        let border_attrs = wgpu::vertex_attr_array![
            0 => Float32x4, 1 => Float32, 2 => Float32, 3 => Float32x4
        ];
        let textured_attrs =
            wgpu::vertex_attr_array![0 => Float32x4, 1 => Float32x4, 2 => Float32x4];

        let rect_pipeline = create_pipeline(
            &device,
            "rect pipeline",
            &plain_layout,
            &rect_shader,
            "fs_main",
            std::mem::size_of::<RectInstance>() as u64,
            &rect_attrs,
            format,
        );
        let border_pipeline = create_pipeline(
            &device,
            "border pipeline",
            &plain_layout,
            &border_shader,
            "fs_main",
            std::mem::size_of::<BorderInstance>() as u64,
            &border_attrs,
            format,
        );
        let mask_pipeline = create_pipeline(
            &device,
            "glyph mask pipeline",
            &textured_layout,
            &textured_shader,
            "fs_mask",
            std::mem::size_of::<TexturedInstance>() as u64,
            &textured_attrs,
            format,
        );
        let rgba_pipeline = create_pipeline(
            &device,
            "rgba pipeline",
            &textured_layout,
            &textured_shader,
            "fs_rgba",
            std::mem::size_of::<TexturedInstance>() as u64,
            &textured_attrs,
            format,
        );

        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("linear clamp sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });

        let atlas_mask = Atlas::new(
            &device,
            &texture_layout,
            &sampler,
            "glyph atlas A8",
            wgpu::TextureFormat::R8Unorm,
            1,
            ATLAS_START,
        );
        let atlas_color = Atlas::new(
            &device,
            &texture_layout,
            &sampler,
            "glyph atlas RGBA",
            wgpu::TextureFormat::Rgba8UnormSrgb,
            4,
            ATLAS_START,
        );

        Ok(Self {
            buf_rect: InstanceBuffer::new(&device, "rect instances", 1 << 16),
            buf_border: InstanceBuffer::new(&device, "border instances", 1 << 14),
            buf_mask: InstanceBuffer::new(&device, "glyph mask instances", 1 << 16),
            buf_color: InstanceBuffer::new(&device, "glyph color instances", 1 << 12),
            buf_image: InstanceBuffer::new(&device, "image instances", 1 << 10),
            surface,
            device,
            queue,
            config,
            rect_pipeline,
            border_pipeline,
            mask_pipeline,
            rgba_pipeline,
            texture_layout,
            sampler,
            atlas_mask,
            atlas_color,
            images: HashMap::new(),
        })
    }

    /// Makes sure the GPU copy of `handle` matches the image store.
    /// Returns false when the image no longer exists.
    fn sync_image(&mut self, handle: ImageHandle) -> bool {
        let Some((w, h, generation, rgba)) =
            with_image(handle, |d| (d.width, d.height, d.generation, d.rgba.clone()))
        else {
            return false;
        };
        if w == 0 || h == 0 {
            return false;
        }
        if let Some(g) = self.images.get(&handle)
            && g.generation == generation
        {
            return true;
        }
        let reuse = self.images.get(&handle).is_some_and(|g| g.size == (w, h));
        if !reuse {
            let tex = create_texture(
                &self.device,
                "image",
                wgpu::TextureFormat::Rgba8UnormSrgb,
                w,
                h,
            );
            let bind =
                texture_bind_group(&self.device, &self.texture_layout, &self.sampler, &tex, "image");
            self.images.insert(
                handle,
                GpuImage {
                    tex,
                    bind,
                    size: (w, h),
                    generation,
                },
            );
        }
        let Some(gpu) = self.images.get_mut(&handle) else {
            return false;
        };
        self.queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &gpu.tex,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            &rgba,
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(w * 4),
                rows_per_image: Some(h),
            },
            wgpu::Extent3d {
                width: w,
                height: h,
                depth_or_array_layers: 1,
            },
        );
        gpu.generation = generation;
        true
    }

    fn record(&mut self, scene: &Scene, glyph_cfg: GlyphRasterConfig) -> Recorder {
        let fb_w = self.config.width as f32;
        let fb_h = self.config.height as f32;
        let mut rec = Recorder::default();

        for node in &scene.nodes {
            match node {
                SceneNode::Rect {
                    rect,
                    color,
                    radius,
                } => rec.rects.push(RectInstance {
                    xywh: to_ndc(rect, fb_w, fb_h),
                    radius: to_ndc_len(*radius, fb_w, fb_h),
                    color: color.to_linear(),
                }),
                SceneNode::Border {
                    rect,
                    color,
                    width,
                    radius,
                } => rec.borders.push(BorderInstance {
                    xywh: to_ndc(rect, fb_w, fb_h),
                    radius: to_ndc_len(*radius, fb_w, fb_h),
                    stroke: to_ndc_len(*width, fb_w, fb_h),
                    color: color.to_linear(),
                }),
                SceneNode::Text {
                    rect,
                    text,
                    color,
                    size,
                } => {
                    let px = if *size > 0.0 { *size } else { glyph_cfg.px }.clamp(8.0, 96.0);
                    for sg in nimbus_text::shape_line(text, px) {
                        let x = rect.x + sg.x + sg.bearing_x;
                        let y = rect.y + sg.y - sg.bearing_y;
                        if let Some(info) = self.atlas_color.get_or_upload(
                            &self.device,
                            &self.queue,
                            &self.texture_layout,
                            &self.sampler,
                            sg.key,
                        ) {
                            rec.colors.push(TexturedInstance {
                                xywh: to_ndc(&Rect::new(x, y, info.w, info.h), fb_w, fb_h),
                                uv: [info.u0, info.v1, info.u1, info.v0],
                                // color glyphs keep their own colors
                                color: [1.0, 1.0, 1.0, color.to_linear()[3]],
                            });
                        } else if let Some(info) = self.atlas_mask.get_or_upload(
                            &self.device,
                            &self.queue,
                            &self.texture_layout,
                            &self.sampler,
                            sg.key,
                        ) {
                            rec.masks.push(TexturedInstance {
                                xywh: to_ndc(&Rect::new(x, y, info.w, info.h), fb_w, fb_h),
                                uv: [info.u0, info.v1, info.u1, info.v0],
                                color: color.to_linear(),
                            });
                        }
                    }
                }
                SceneNode::Image {
                    rect,
                    handle,
                    tint,
                    uv,
                } => {
                    if self.sync_image(*handle) {
                        rec.image(
                            *handle,
                            TexturedInstance {
                                xywh: to_ndc(rect, fb_w, fb_h),
                                uv: [uv[0], uv[3], uv[2], uv[1]],
                                color: tint.to_linear(),
                            },
                        );
                    }
                }
                SceneNode::PushClip { rect, .. } => {
                    rec.flush();
                    rec.cmds.push(Cmd::PushClip(*rect));
                }
                SceneNode::PopClip => {
                    rec.flush();
                    rec.cmds.push(Cmd::PopClip);
                }
            }
        }
        rec.flush();
        rec
    }

    fn acquire_frame(&mut self) -> Option<wgpu::SurfaceTexture> {
        for _ in 0..3 {
            match self.surface.get_current_texture() {
                Ok(f) => return Some(f),
                Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                    log::warn!("surface lost or outdated; reconfiguring");
                    self.surface.configure(&self.device, &self.config);
                }
                Err(wgpu::SurfaceError::Timeout) => {
                    log::warn!("surface timeout; retrying");
                }
                Err(e) => {
                    log::error!("cannot acquire surface texture: {e}");
                    return None;
                }
            }
        }
        None
    }
}

impl RenderBackend for WgpuBackend {
    fn configure_surface(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        self.config.width = width;
        self.config.height = height;
        self.surface.configure(&self.device, &self.config);
    }

    fn frame(&mut self, scene: &Scene, glyph_cfg: GlyphRasterConfig) {
        if self.config.width == 0 || self.config.height == 0 {
            return;
        }
        let Some(frame) = self.acquire_frame() else {
            return;
        };
        let view = frame
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let rec = self.record(scene, glyph_cfg);
        // Images removed from the store since the last frame.
        self.images.retain(|h, _| image_exists(*h));

        let (device, queue) = (&self.device, &self.queue);
        self.buf_rect
            .upload(device, queue, bytemuck::cast_slice(&rec.rects));
        self.buf_border
            .upload(device, queue, bytemuck::cast_slice(&rec.borders));
        self.buf_mask
            .upload(device, queue, bytemuck::cast_slice(&rec.masks));
        self.buf_color
            .upload(device, queue, bytemuck::cast_slice(&rec.colors));
        self.buf_image
            .upload(device, queue, bytemuck::cast_slice(&rec.images));

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("frame encoder"),
            });
        {
            let c = scene.clear_color.to_linear();
            let mut rpass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("main pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color {
                            r: c[0] as f64,
                            g: c[1] as f64,
                            b: c[2] as f64,
                            a: c[3] as f64,
                        }),
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });

            let (fb_w, fb_h) = (self.config.width, self.config.height);
            rpass.set_scissor_rect(0, 0, fb_w, fb_h);
            let root = Rect::new(0.0, 0.0, fb_w as f32, fb_h as f32);
            let mut clips: Vec<Rect> = Vec::with_capacity(8);

            for cmd in &rec.cmds {
                match cmd {
                    Cmd::PushClip(r) => {
                        let top = clips.last().copied().unwrap_or(root);
                        let next = top.intersect(r).unwrap_or(Rect::new(0.0, 0.0, 0.0, 0.0));
                        clips.push(next);
                        let (x, y, w, h) = to_scissor(&next, fb_w, fb_h);
                        rpass.set_scissor_rect(x, y, w, h);
                    }
                    Cmd::PopClip => {
                        if clips.pop().is_none() {
                            log::warn!("PopClip with empty clip stack");
                        }
                        let top = clips.last().copied().unwrap_or(root);
                        let (x, y, w, h) = to_scissor(&top, fb_w, fb_h);
                        rpass.set_scissor_rect(x, y, w, h);
                    }
                    Cmd::Rects(r) => {
                        rpass.set_pipeline(&self.rect_pipeline);
                        rpass.set_vertex_buffer(0, self.buf_rect.buf.slice(..));
                        rpass.draw(0..6, r.clone());
                    }
                    Cmd::Borders(r) => {
                        rpass.set_pipeline(&self.border_pipeline);
                        rpass.set_vertex_buffer(0, self.buf_border.buf.slice(..));
                        rpass.draw(0..6, r.clone());
                    }
                    Cmd::Masks(r) => {
                        rpass.set_pipeline(&self.mask_pipeline);
                        rpass.set_bind_group(0, &self.atlas_mask.bind, &[]);
                        rpass.set_vertex_buffer(0, self.buf_mask.buf.slice(..));
                        rpass.draw(0..6, r.clone());
                    }
                    Cmd::Colors(r) => {
                        rpass.set_pipeline(&self.rgba_pipeline);
                        rpass.set_bind_group(0, &self.atlas_color.bind, &[]);
                        rpass.set_vertex_buffer(0, self.buf_color.buf.slice(..));
                        rpass.draw(0..6, r.clone());
                    }
                    Cmd::Image(handle, i) => {
                        let Some(gpu) = self.images.get(handle) else {
                            continue;
                        };
                        rpass.set_pipeline(&self.rgba_pipeline);
                        rpass.set_bind_group(0, &gpu.bind, &[]);
                        rpass.set_vertex_buffer(0, self.buf_image.buf.slice(..));
                        rpass.draw(0..6, *i..*i + 1);
                    }
                }
            }
        }

        self.queue.submit(std::iter::once(encoder.finish()));
        if let Err(e) = catch_unwind(AssertUnwindSafe(|| frame.present())) {
            log::warn!("frame.present panicked: {e:?}");
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn create_pipeline(
    device: &wgpu::Device,
    label: &str,
    layout: &wgpu::PipelineLayout,
    shader: &wgpu::ShaderModule,
    fs_entry: &str,
    stride: u64,
    attributes: &[wgpu::VertexAttribute],
    format: wgpu::TextureFormat,
) -> wgpu::RenderPipeline {
    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some(label),
        layout: Some(layout),
        vertex: wgpu::VertexState {
            module: shader,
            entry_point: Some("vs_main"),
            buffers: &[wgpu::VertexBufferLayout {
                array_stride: stride,
                step_mode: wgpu::VertexStepMode::Instance,
                attributes,
            }],
            compilation_options: wgpu::PipelineCompilationOptions::default(),
        },
        fragment: Some(wgpu::FragmentState {
            module: shader,
            entry_point: Some(fs_entry),
            targets: &[Some(wgpu::ColorTargetState {
                format,
                blend: Some(wgpu::BlendState::ALPHA_BLENDING),
                write_mask: wgpu::ColorWrites::ALL,
            })],
            compilation_options: wgpu::PipelineCompilationOptions::default(),
        }),
        primitive: wgpu::PrimitiveState::default(),
        depth_stencil: None,
        multisample: wgpu::MultisampleState::default(),
        multiview: None,
        cache: None,
    })
}

fn create_texture(
    device: &wgpu::Device,
    label: &str,
    format: wgpu::TextureFormat,
    width: u32,
    height: u32,
) -> wgpu::Texture {
    device.create_texture(&wgpu::TextureDescriptor {
        label: Some(label),
        size: wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format,
        usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
        view_formats: &[],
    })
}

fn texture_bind_group(
    device: &wgpu::Device,
    layout: &wgpu::BindGroupLayout,
    sampler: &wgpu::Sampler,
    tex: &wgpu::Texture,
    label: &str,
) -> wgpu::BindGroup {
    let view = tex.create_view(&wgpu::TextureViewDescriptor::default());
    device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some(label),
        layout,
        entries: &[
            wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::TextureView(&view),
            },
            wgpu::BindGroupEntry {
                binding: 1,
                resource: wgpu::BindingResource::Sampler(sampler),
            },
        ],
    })
}

/// Pixel rect to `[min_x, min_y, w, h]` in NDC (y up).
fn to_ndc(r: &Rect, fb_w: f32, fb_h: f32) -> [f32; 4] {
    let x0 = (r.x / fb_w) * 2.0 - 1.0;
    let x1 = ((r.x + r.w) / fb_w) * 2.0 - 1.0;
    let y0 = 1.0 - (r.y / fb_h) * 2.0;
    let y1 = 1.0 - ((r.y + r.h) / fb_h) * 2.0;
    [x0.min(x1), y0.min(y1), (x1 - x0).abs(), (y1 - y0).abs()]
}

/// Pixel length to NDC, using the tighter axis.
fn to_ndc_len(px: f32, fb_w: f32, fb_h: f32) -> f32 {
    ((px / fb_w) * 2.0).min((px / fb_h) * 2.0)
}

/// Pixel rect to a scissor rect clamped to the framebuffer. Off-screen and
/// empty rects become a zero-area scissor.
fn to_scissor(r: &Rect, fb_w: u32, fb_h: u32) -> (u32, u32, u32, u32) {
    if r.w <= 0.0 || r.h <= 0.0 {
        return (0, 0, 0, 0);
    }
    let x0 = r.x.floor().max(0.0) as i64;
    let y0 = r.y.floor().max(0.0) as i64;
    let x1 = ((r.x + r.w).ceil() as i64).min(fb_w as i64);
    let y1 = ((r.y + r.h).ceil() as i64).min(fb_h as i64);
    if x1 <= x0 || y1 <= y0 {
        return (0, 0, 0, 0);
    }
    (x0 as u32, y0 as u32, (x1 - x0) as u32, (y1 - y0) as u32)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ndc_maps_corners() {
        let full = to_ndc(&Rect::new(0.0, 0.0, 200.0, 100.0), 200.0, 100.0);
        assert_eq!(full, [-1.0, -1.0, 2.0, 2.0]);
        let top_left = to_ndc(&Rect::new(0.0, 0.0, 100.0, 50.0), 200.0, 100.0);
        assert_eq!(top_left, [-1.0, 0.0, 1.0, 1.0]);
    }

    #[test]
    fn scissor_is_clamped() {
        assert_eq!(
            to_scissor(&Rect::new(-10.0, 5.5, 50.0, 500.0), 100, 100),
            (0, 5, 40, 95)
        );
        assert_eq!(to_scissor(&Rect::new(150.0, 0.0, 10.0, 10.0), 100, 100), (0, 0, 0, 0));
        assert_eq!(to_scissor(&Rect::new(0.0, 0.0, 0.0, 10.0), 100, 100), (0, 0, 0, 0));
    }

    #[test]
    fn shelf_packs_rows_and_reports_full() {
        let mut s = Shelf::new(16);
        assert_eq!(s.alloc(6, 4), Some((1, 1)));
        assert_eq!(s.alloc(6, 5), Some((8, 1)));
        // next row starts below the tallest glyph of the previous one
        assert_eq!(s.alloc(6, 3), Some((1, 7)));
        assert_eq!(s.alloc(14, 14), None);
        assert_eq!(s.alloc(20, 1), None);
    }

    #[test]
    fn recorder_breaks_batches_around_images() {
        let mut rec = Recorder::default();
        let inst = TexturedInstance {
            xywh: [0.0; 4],
            uv: [0.0; 4],
            color: [1.0; 4],
        };
        let rect = RectInstance {
            xywh: [0.0; 4],
            radius: 0.0,
            color: [1.0; 4],
        };
        rec.rects.push(rect);
        rec.image(ImageHandle::default(), inst);
        rec.rects.push(rect);
        rec.rects.push(rect);
        rec.flush();
        let kinds: Vec<String> = rec
            .cmds
            .iter()
            .map(|c| match c {
                Cmd::Rects(r) => format!("rects {r:?}"),
                Cmd::Image(_, i) => format!("image {i}"),
                _ => "other".to_string(),
            })
            .collect();
        assert_eq!(kinds, ["rects 0..1", "image 0", "rects 1..3"]);
    }
}
