// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! The primary rasterization backend.
//!
//! Fullscreen-triangle render pipelines over the assembled fragment
//! programs. GLSL sources go through naga's GLSL front-end into IR and
//! from there to wgpu, so compile errors surface as typed
//! [`ShaderError`]s instead of device panics.

use super::context::WgpuContext;
use super::conversions;
use polychora_core::renderer::{
    BackendKind, CompositeLayer, GraphicsBackend, ProgramDescriptor, ProgramId, ProgramSource,
    RenderError, ResourceError, ShaderError, TextureFormat, TextureId, UniformBufferId,
};
use polychora_core::shader::ShaderLanguage;
use std::borrow::Cow;
use std::collections::HashMap;
use std::time::Instant;

/// Soft shader-compile timeout; a compile that runs longer fails the
/// owning system.
const SHADER_COMPILE_TIMEOUT_MS: u64 = 2000;

/// The composite blit: sample a layer texture, scale its alpha by the
/// layer opacity, and let the pipeline blend state do the rest. Internal
/// plumbing — none of the shared shader math belongs here.
const COMPOSITE_SHADER: &str = r#"
struct CompositeParams {
    opacity: f32,
    _pad0: f32,
    _pad1: f32,
    _pad2: f32,
}

@group(0) @binding(0) var src: texture_2d<f32>;
@group(0) @binding(1) var src_sampler: sampler;
@group(0) @binding(2) var<uniform> params: CompositeParams;

struct VsOut {
    @builtin(position) position: vec4<f32>,
    @location(0) uv: vec2<f32>,
}

@vertex
fn vs_main(@builtin(vertex_index) index: u32) -> VsOut {
    var corners = array<vec2<f32>, 3>(
        vec2<f32>(-1.0, -1.0),
        vec2<f32>(3.0, -1.0),
        vec2<f32>(-1.0, 3.0)
    );
    var out: VsOut;
    let p = corners[index];
    out.position = vec4<f32>(p, 0.0, 1.0);
    out.uv = vec2<f32>(p.x * 0.5 + 0.5, 1.0 - (p.y * 0.5 + 0.5));
    return out;
}

@fragment
fn fs_main(in: VsOut) -> @location(0) vec4<f32> {
    var color = textureSample(src, src_sampler, in.uv);
    color.a = color.a * params.opacity;
    return color;
}
"#;

#[derive(Debug)]
struct ProgramEntry {
    pipeline: wgpu::RenderPipeline,
    label: String,
}

#[derive(Debug)]
struct BufferEntry {
    buffer: wgpu::Buffer,
    size: u64,
    bind_group: wgpu::BindGroup,
}

#[derive(Debug)]
struct TextureEntry {
    #[allow(dead_code)]
    texture: wgpu::Texture,
    view: wgpu::TextureView,
}

/// Device-lifetime fixtures rebuilt wholesale after a context loss.
#[derive(Debug)]
struct Fixtures {
    uniform_layout: wgpu::BindGroupLayout,
    composite_layout: wgpu::BindGroupLayout,
    composite_pipelines: [wgpu::RenderPipeline; 4],
    sampler: wgpu::Sampler,
    /// One tiny opacity buffer per composite slot, so all layers of one
    /// pass can carry distinct opacities within a single submission.
    opacity_buffers: Vec<wgpu::Buffer>,
}

/// The primary rasterization [`GraphicsBackend`].
#[derive(Debug)]
pub struct RasterBackend {
    context: WgpuContext,
    fixtures: Fixtures,
    programs: HashMap<ProgramId, ProgramEntry>,
    buffers: HashMap<UniformBufferId, BufferEntry>,
    textures: HashMap<TextureId, TextureEntry>,
    next_program_id: usize,
    next_buffer_id: usize,
    next_texture_id: usize,
    encoder: Option<wgpu::CommandEncoder>,
    lost: bool,
    disposed: bool,
}

const TARGET_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;
const COMPOSITE_SLOTS: usize = 16;

impl RasterBackend {
    /// Creates the backend on a fresh headless context.
    pub fn new() -> Result<Self, RenderError> {
        let context = WgpuContext::new("polychora raster backend")?;
        let fixtures = Self::build_fixtures(&context.device)?;
        Ok(Self {
            context,
            fixtures,
            programs: HashMap::new(),
            buffers: HashMap::new(),
            textures: HashMap::new(),
            next_program_id: 0,
            next_buffer_id: 0,
            next_texture_id: 0,
            encoder: None,
            lost: false,
            disposed: false,
        })
    }

    fn build_fixtures(device: &wgpu::Device) -> Result<Fixtures, RenderError> {
        let uniform_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("raster uniform layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            }],
        });

        let composite_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("composite layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 2,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
            ],
        });

        let module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("composite blit"),
            source: wgpu::ShaderSource::Wgsl(Cow::Borrowed(COMPOSITE_SHADER)),
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("composite pipeline layout"),
            bind_group_layouts: &[&composite_layout],
            push_constant_ranges: &[],
        });

        let make_pipeline = |blend: wgpu::BlendState, label: &str| {
            device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some(label),
                layout: Some(&pipeline_layout),
                vertex: wgpu::VertexState {
                    module: &module,
                    entry_point: Some("vs_main"),
                    buffers: &[],
                    compilation_options: Default::default(),
                },
                fragment: Some(wgpu::FragmentState {
                    module: &module,
                    entry_point: Some("fs_main"),
                    targets: &[Some(wgpu::ColorTargetState {
                        format: TARGET_FORMAT,
                        blend: Some(blend),
                        write_mask: wgpu::ColorWrites::ALL,
                    })],
                    compilation_options: Default::default(),
                }),
                primitive: wgpu::PrimitiveState::default(),
                depth_stencil: None,
                multisample: wgpu::MultisampleState::default(),
                multiview: None,
                cache: None,
            })
        };

        use polychora_core::renderer::BlendMode;
        let composite_pipelines = [
            make_pipeline(conversions::blend_state(BlendMode::Normal), "composite normal"),
            make_pipeline(
                conversions::blend_state(BlendMode::Multiply),
                "composite multiply",
            ),
            make_pipeline(conversions::blend_state(BlendMode::Screen), "composite screen"),
            make_pipeline(
                conversions::blend_state(BlendMode::Additive),
                "composite additive",
            ),
        ];

        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("composite sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });

        let opacity_buffers = (0..COMPOSITE_SLOTS)
            .map(|i| {
                device.create_buffer(&wgpu::BufferDescriptor {
                    label: Some(&format!("composite opacity {i}")),
                    size: 16,
                    usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
                    mapped_at_creation: false,
                })
            })
            .collect();

        Ok(Fixtures {
            uniform_layout,
            composite_layout,
            composite_pipelines,
            sampler,
            opacity_buffers,
        })
    }

    fn guard_lost(&self) -> Result<(), ResourceError> {
        if self.lost {
            Err(ResourceError::ContextLost)
        } else {
            Ok(())
        }
    }

    fn compile_module(
        &self,
        label: &str,
        source: &str,
        language: ShaderLanguage,
        stage: naga::ShaderStage,
    ) -> Result<wgpu::ShaderModule, ResourceError> {
        let module = match language {
            ShaderLanguage::Wgsl => naga::front::wgsl::parse_str(source).map_err(|e| {
                ShaderError::CompilationFailed {
                    label: label.to_string(),
                    details: e.emit_to_string(source),
                }
            })?,
            ShaderLanguage::Glsl => {
                let mut frontend = naga::front::glsl::Frontend::default();
                frontend
                    .parse(&naga::front::glsl::Options::from(stage), source)
                    .map_err(|e| ShaderError::CompilationFailed {
                        label: label.to_string(),
                        details: e.emit_to_string(source),
                    })?
            }
        };
        Ok(self
            .context
            .device
            .create_shader_module(wgpu::ShaderModuleDescriptor {
                label: Some(label),
                source: wgpu::ShaderSource::Naga(Cow::Owned(module)),
            }))
    }

    fn entry_point(language: ShaderLanguage, fragment: bool) -> &'static str {
        match language {
            // naga's GLSL front-end names every entry point "main".
            ShaderLanguage::Glsl => "main",
            ShaderLanguage::Wgsl => {
                if fragment {
                    "fs_main"
                } else {
                    "vs_main"
                }
            }
        }
    }
}

impl GraphicsBackend for RasterBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Raster
    }

    fn create_program(
        &mut self,
        descriptor: &ProgramDescriptor<'_>,
    ) -> Result<ProgramId, ResourceError> {
        self.guard_lost()?;
        let started = Instant::now();

        let (vertex, fragment, language) = match descriptor.source {
            ProgramSource::Raster {
                vertex,
                fragment,
                language,
            } => (vertex, fragment, language),
            ProgramSource::Compute { .. } => {
                return Err(ShaderError::WrongBackend {
                    label: descriptor.label.to_string(),
                    expected: "a vertex + fragment pair",
                }
                .into())
            }
        };

        let vs = self.compile_module(
            descriptor.label,
            vertex,
            language,
            naga::ShaderStage::Vertex,
        )?;
        let fs = self.compile_module(
            descriptor.label,
            fragment,
            language,
            naga::ShaderStage::Fragment,
        )?;

        let pipeline_layout =
            self.context
                .device
                .create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                    label: Some(descriptor.label),
                    bind_group_layouts: &[&self.fixtures.uniform_layout],
                    push_constant_ranges: &[],
                });

        let pipeline = self
            .context
            .device
            .create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some(descriptor.label),
                layout: Some(&pipeline_layout),
                vertex: wgpu::VertexState {
                    module: &vs,
                    entry_point: Some(Self::entry_point(language, false)),
                    buffers: &[],
                    compilation_options: Default::default(),
                },
                fragment: Some(wgpu::FragmentState {
                    module: &fs,
                    entry_point: Some(Self::entry_point(language, true)),
                    targets: &[Some(wgpu::ColorTargetState {
                        format: TARGET_FORMAT,
                        blend: None,
                        write_mask: wgpu::ColorWrites::ALL,
                    })],
                    compilation_options: Default::default(),
                }),
                primitive: wgpu::PrimitiveState::default(),
                depth_stencil: None,
                multisample: wgpu::MultisampleState::default(),
                multiview: None,
                cache: None,
            });

        let elapsed = started.elapsed().as_millis() as u64;
        if elapsed > SHADER_COMPILE_TIMEOUT_MS {
            return Err(ShaderError::Timeout {
                label: descriptor.label.to_string(),
                elapsed_ms: elapsed,
            }
            .into());
        }

        let id = ProgramId(self.next_program_id);
        self.next_program_id += 1;
        self.programs.insert(
            id,
            ProgramEntry {
                pipeline,
                label: descriptor.label.to_string(),
            },
        );
        log::debug!("RasterBackend: created program '{}' as {id:?}", descriptor.label);
        Ok(id)
    }

    fn destroy_program(&mut self, id: ProgramId) -> Result<(), ResourceError> {
        self.programs
            .remove(&id)
            .map(|entry| log::debug!("RasterBackend: destroyed program '{}'", entry.label))
            .ok_or(ResourceError::InvalidHandle)
    }

    fn create_uniform_buffer(&mut self, size: u64) -> Result<UniformBufferId, ResourceError> {
        self.guard_lost()?;
        let buffer = self.context.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("layer uniforms"),
            size,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let bind_group = self
            .context
            .device
            .create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some("layer uniform bind group"),
                layout: &self.fixtures.uniform_layout,
                entries: &[wgpu::BindGroupEntry {
                    binding: 0,
                    resource: buffer.as_entire_binding(),
                }],
            });
        let id = UniformBufferId(self.next_buffer_id);
        self.next_buffer_id += 1;
        self.buffers.insert(
            id,
            BufferEntry {
                buffer,
                size,
                bind_group,
            },
        );
        Ok(id)
    }

    fn write_uniforms(&mut self, id: UniformBufferId, data: &[u8]) -> Result<(), ResourceError> {
        self.guard_lost()?;
        let entry = self.buffers.get(&id).ok_or(ResourceError::InvalidHandle)?;
        if data.len() as u64 > entry.size {
            return Err(ResourceError::OutOfBounds);
        }
        self.context.queue.write_buffer(&entry.buffer, 0, data);
        Ok(())
    }

    fn destroy_uniform_buffer(&mut self, id: UniformBufferId) -> Result<(), ResourceError> {
        self.buffers
            .remove(&id)
            .map(|_| ())
            .ok_or(ResourceError::InvalidHandle)
    }

    fn create_texture(
        &mut self,
        width: u32,
        height: u32,
        format: TextureFormat,
    ) -> Result<TextureId, ResourceError> {
        self.guard_lost()?;
        let texture = self.context.device.create_texture(&wgpu::TextureDescriptor {
            label: Some("layer target"),
            size: wgpu::Extent3d {
                width: width.max(1),
                height: height.max(1),
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: conversions::texture_format(format),
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT
                | wgpu::TextureUsages::TEXTURE_BINDING
                | wgpu::TextureUsages::COPY_SRC,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let id = TextureId(self.next_texture_id);
        self.next_texture_id += 1;
        self.textures.insert(id, TextureEntry { texture, view });
        Ok(id)
    }

    fn destroy_texture(&mut self, id: TextureId) -> Result<(), ResourceError> {
        self.textures
            .remove(&id)
            .map(|_| ())
            .ok_or(ResourceError::InvalidHandle)
    }

    fn begin_frame(&mut self) -> Result<(), RenderError> {
        if self.lost {
            return Err(RenderError::ContextLost);
        }
        if self.encoder.is_some() {
            return Err(RenderError::RenderingFailed(
                "begin_frame called with a frame already open".into(),
            ));
        }
        self.encoder = Some(self.context.device.create_command_encoder(
            &wgpu::CommandEncoderDescriptor {
                label: Some("raster frame"),
            },
        ));
        Ok(())
    }

    fn draw(
        &mut self,
        program: ProgramId,
        uniforms: UniformBufferId,
        target: TextureId,
    ) -> Result<(), RenderError> {
        if self.lost {
            return Err(RenderError::ContextLost);
        }
        let program = self
            .programs
            .get(&program)
            .ok_or(ResourceError::InvalidHandle)?;
        let uniforms = self
            .buffers
            .get(&uniforms)
            .ok_or(ResourceError::InvalidHandle)?;
        let target = self
            .textures
            .get(&target)
            .ok_or(ResourceError::InvalidHandle)?;
        let encoder = self
            .encoder
            .as_mut()
            .ok_or_else(|| RenderError::RenderingFailed("draw outside a frame".into()))?;

        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some(&program.label),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: &target.view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(wgpu::Color::TRANSPARENT),
                    store: wgpu::StoreOp::Store,
                },
                depth_slice: None,
            })],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
        });
        pass.set_pipeline(&program.pipeline);
        pass.set_bind_group(0, &uniforms.bind_group, &[]);
        pass.draw(0..3, 0..1);
        Ok(())
    }

    fn composite(
        &mut self,
        layers: &[CompositeLayer],
        target: TextureId,
    ) -> Result<(), RenderError> {
        if self.lost {
            return Err(RenderError::ContextLost);
        }
        if layers.len() > self.fixtures.opacity_buffers.len() {
            return Err(RenderError::RenderingFailed(format!(
                "composite of {} layers exceeds the {} slots",
                layers.len(),
                self.fixtures.opacity_buffers.len()
            )));
        }

        // Bind groups must outlive the pass, so build them all first.
        let mut bind_groups = Vec::with_capacity(layers.len());
        for (slot, layer) in layers.iter().enumerate() {
            let source = self
                .textures
                .get(&layer.texture)
                .ok_or(ResourceError::InvalidHandle)?;
            let opacity_buffer = &self.fixtures.opacity_buffers[slot];
            self.context.queue.write_buffer(
                opacity_buffer,
                0,
                bytemuck::bytes_of(&[layer.opacity, 0.0, 0.0, 0.0]),
            );
            bind_groups.push((
                self.context
                    .device
                    .create_bind_group(&wgpu::BindGroupDescriptor {
                        label: Some("composite layer"),
                        layout: &self.fixtures.composite_layout,
                        entries: &[
                            wgpu::BindGroupEntry {
                                binding: 0,
                                resource: wgpu::BindingResource::TextureView(&source.view),
                            },
                            wgpu::BindGroupEntry {
                                binding: 1,
                                resource: wgpu::BindingResource::Sampler(&self.fixtures.sampler),
                            },
                            wgpu::BindGroupEntry {
                                binding: 2,
                                resource: opacity_buffer.as_entire_binding(),
                            },
                        ],
                    }),
                conversions::blend_tag(layer.blend) as usize,
            ));
        }

        let target = self
            .textures
            .get(&target)
            .ok_or(ResourceError::InvalidHandle)?;
        let encoder = self
            .encoder
            .as_mut()
            .ok_or_else(|| RenderError::RenderingFailed("composite outside a frame".into()))?;

        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("composite"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: &target.view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                    store: wgpu::StoreOp::Store,
                },
                depth_slice: None,
            })],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
        });
        for (bind_group, pipeline_index) in &bind_groups {
            pass.set_pipeline(&self.fixtures.composite_pipelines[*pipeline_index]);
            pass.set_bind_group(0, bind_group, &[]);
            pass.draw(0..3, 0..1);
        }
        Ok(())
    }

    fn end_frame(&mut self) -> Result<(), RenderError> {
        let encoder = self
            .encoder
            .take()
            .ok_or_else(|| RenderError::RenderingFailed("end_frame without begin_frame".into()))?;
        self.context.queue.submit(std::iter::once(encoder.finish()));
        Ok(())
    }

    fn handle_context_loss(&mut self) {
        log::warn!("RasterBackend: context lost; invalidating all resources");
        self.lost = true;
        self.encoder = None;
        self.programs.clear();
        self.buffers.clear();
        self.textures.clear();
    }

    fn restore(&mut self) -> Result<(), RenderError> {
        if !self.lost {
            return Ok(());
        }
        self.context.recreate_device("polychora raster backend")?;
        self.fixtures = Self::build_fixtures(&self.context.device)?;
        self.lost = false;
        log::info!("RasterBackend: context restored");
        Ok(())
    }

    fn context_lost(&self) -> bool {
        self.lost
    }

    fn supports_feature(&self, feature: &str) -> bool {
        matches!(feature, "raster" | "glsl" | "crossfade" | "composite")
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }

    fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        self.disposed = true;
        self.encoder = None;
        self.programs.clear();
        self.buffers.clear();
        self.textures.clear();
        log::info!(
            "RasterBackend: disposed (adapter \"{}\")",
            self.context.adapter_name
        );
    }
}
