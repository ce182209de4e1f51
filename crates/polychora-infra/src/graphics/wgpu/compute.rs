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

//! The secondary compute-capable backend.
//!
//! Runs the assembled WGSL compute programs over storage textures — one
//! thread per pixel — and composites with a ping-pong blend kernel,
//! since storage textures cannot be read and written in one dispatch at
//! the formats the stack uses.

use super::context::WgpuContext;
use super::conversions;
use polychora_core::renderer::{
    BackendKind, CompositeLayer, GraphicsBackend, ProgramDescriptor, ProgramId, ProgramSource,
    RenderError, ResourceError, ShaderError, TextureFormat, TextureId, UniformBufferId,
};
use std::borrow::Cow;
use std::collections::HashMap;
use std::time::Instant;

const SHADER_COMPILE_TIMEOUT_MS: u64 = 2000;
const WORKGROUP_SIZE: u32 = 8;

/// Blend kernel: reads the stack below and one layer, writes the blended
/// result to the other ping-pong half. Mode 4 seeds the stack from the
/// first layer over an implicit black background.
const COMPOSITE_SHADER: &str = r#"
struct CompositeParams {
    opacity: f32,
    blend_mode: u32,
    _pad0: f32,
    _pad1: f32,
}

@group(0) @binding(0) var below_tex: texture_2d<f32>;
@group(0) @binding(1) var layer_tex: texture_2d<f32>;
@group(0) @binding(2) var dst: texture_storage_2d<rgba8unorm, write>;
@group(0) @binding(3) var<uniform> params: CompositeParams;

@compute @workgroup_size(8, 8, 1)
fn cs_composite(@builtin(global_invocation_id) gid: vec3<u32>) {
    let dims = textureDimensions(dst);
    if (gid.x >= dims.x || gid.y >= dims.y) {
        return;
    }
    let coord = vec2<i32>(i32(gid.x), i32(gid.y));
    let below = textureLoad(below_tex, coord, 0);
    var src = textureLoad(layer_tex, coord, 0);
    src.a = src.a * params.opacity;

    var out_color = below;
    if (params.blend_mode == 0u) {
        out_color = vec4<f32>(
            src.rgb * src.a + below.rgb * (1.0 - src.a),
            src.a + below.a * (1.0 - src.a)
        );
    } else if (params.blend_mode == 1u) {
        out_color = vec4<f32>(below.rgb * mix(vec3<f32>(1.0), src.rgb, src.a), below.a);
    } else if (params.blend_mode == 2u) {
        out_color = vec4<f32>(
            vec3<f32>(1.0) - (vec3<f32>(1.0) - below.rgb) * (vec3<f32>(1.0) - src.rgb * src.a),
            below.a
        );
    } else if (params.blend_mode == 3u) {
        out_color = vec4<f32>(below.rgb + src.rgb * src.a, below.a);
    } else {
        out_color = vec4<f32>(src.rgb * src.a, 1.0);
    }
    textureStore(dst, coord, out_color);
}
"#;

#[derive(Debug)]
struct ProgramEntry {
    pipeline: wgpu::ComputePipeline,
    label: String,
}

#[derive(Debug)]
struct BufferEntry {
    buffer: wgpu::Buffer,
    size: u64,
}

#[derive(Debug)]
struct TextureEntry {
    texture: wgpu::Texture,
    view: wgpu::TextureView,
    width: u32,
    height: u32,
}

#[derive(Debug)]
struct Fixtures {
    program_layout: wgpu::BindGroupLayout,
    composite_layout: wgpu::BindGroupLayout,
    composite_pipeline: wgpu::ComputePipeline,
    /// One params buffer per composite slot so layers keep distinct
    /// opacities within one submission.
    composite_params: Vec<wgpu::Buffer>,
}

/// Ping-pong accumulation pair, recreated when the composite target size
/// changes.
#[derive(Debug)]
struct AccumPair {
    textures: [wgpu::Texture; 2],
    views: [wgpu::TextureView; 2],
    width: u32,
    height: u32,
}

/// The secondary compute-capable [`GraphicsBackend`].
#[derive(Debug)]
pub struct ComputeBackend {
    context: WgpuContext,
    fixtures: Fixtures,
    programs: HashMap<ProgramId, ProgramEntry>,
    buffers: HashMap<UniformBufferId, BufferEntry>,
    textures: HashMap<TextureId, TextureEntry>,
    accum: Option<AccumPair>,
    next_program_id: usize,
    next_buffer_id: usize,
    next_texture_id: usize,
    encoder: Option<wgpu::CommandEncoder>,
    lost: bool,
    disposed: bool,
}

const COMPOSITE_SLOTS: usize = 16;

impl ComputeBackend {
    /// Creates the backend on a fresh headless context.
    pub fn new() -> Result<Self, RenderError> {
        let context = WgpuContext::new("polychora compute backend")?;
        let fixtures = Self::build_fixtures(&context.device)?;
        Ok(Self {
            context,
            fixtures,
            programs: HashMap::new(),
            buffers: HashMap::new(),
            textures: HashMap::new(),
            accum: None,
            next_program_id: 0,
            next_buffer_id: 0,
            next_texture_id: 0,
            encoder: None,
            lost: false,
            disposed: false,
        })
    }

    fn build_fixtures(device: &wgpu::Device) -> Result<Fixtures, RenderError> {
        let program_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("compute program layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::COMPUTE,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::COMPUTE,
                    ty: wgpu::BindingType::StorageTexture {
                        access: wgpu::StorageTextureAccess::WriteOnly,
                        format: wgpu::TextureFormat::Rgba8Unorm,
                        view_dimension: wgpu::TextureViewDimension::D2,
                    },
                    count: None,
                },
            ],
        });

        let composite_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("compute composite layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::COMPUTE,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: false },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::COMPUTE,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: false },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 2,
                    visibility: wgpu::ShaderStages::COMPUTE,
                    ty: wgpu::BindingType::StorageTexture {
                        access: wgpu::StorageTextureAccess::WriteOnly,
                        format: wgpu::TextureFormat::Rgba8Unorm,
                        view_dimension: wgpu::TextureViewDimension::D2,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 3,
                    visibility: wgpu::ShaderStages::COMPUTE,
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
            label: Some("compute composite"),
            source: wgpu::ShaderSource::Wgsl(Cow::Borrowed(COMPOSITE_SHADER)),
        });
        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("compute composite pipeline layout"),
            bind_group_layouts: &[&composite_layout],
            push_constant_ranges: &[],
        });
        let composite_pipeline =
            device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
                label: Some("compute composite"),
                layout: Some(&pipeline_layout),
                module: &module,
                entry_point: Some("cs_composite"),
                compilation_options: Default::default(),
                cache: None,
            });

        let composite_params = (0..COMPOSITE_SLOTS)
            .map(|i| {
                device.create_buffer(&wgpu::BufferDescriptor {
                    label: Some(&format!("compute composite params {i}")),
                    size: 16,
                    usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
                    mapped_at_creation: false,
                })
            })
            .collect();

        Ok(Fixtures {
            program_layout,
            composite_layout,
            composite_pipeline,
            composite_params,
        })
    }

    fn guard_lost(&self) -> Result<(), ResourceError> {
        if self.lost {
            Err(ResourceError::ContextLost)
        } else {
            Ok(())
        }
    }

    fn workgroups(extent: u32) -> u32 {
        extent.div_ceil(WORKGROUP_SIZE)
    }

    fn ensure_accum(&mut self, width: u32, height: u32) {
        let needs_new = match &self.accum {
            Some(pair) => pair.width != width || pair.height != height,
            None => true,
        };
        if !needs_new {
            return;
        }
        let make = |label: &str| {
            self.context.device.create_texture(&wgpu::TextureDescriptor {
                label: Some(label),
                size: wgpu::Extent3d {
                    width,
                    height,
                    depth_or_array_layers: 1,
                },
                mip_level_count: 1,
                sample_count: 1,
                dimension: wgpu::TextureDimension::D2,
                format: wgpu::TextureFormat::Rgba8Unorm,
                usage: wgpu::TextureUsages::STORAGE_BINDING
                    | wgpu::TextureUsages::TEXTURE_BINDING
                    | wgpu::TextureUsages::COPY_SRC,
                view_formats: &[],
            })
        };
        let a = make("composite accum a");
        let b = make("composite accum b");
        let va = a.create_view(&wgpu::TextureViewDescriptor::default());
        let vb = b.create_view(&wgpu::TextureViewDescriptor::default());
        self.accum = Some(AccumPair {
            textures: [a, b],
            views: [va, vb],
            width,
            height,
        });
    }
}

impl GraphicsBackend for ComputeBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Compute
    }

    fn create_program(
        &mut self,
        descriptor: &ProgramDescriptor<'_>,
    ) -> Result<ProgramId, ResourceError> {
        self.guard_lost()?;
        let started = Instant::now();

        let (source, entry) = match descriptor.source {
            ProgramSource::Compute { source, entry } => (source, entry),
            ProgramSource::Raster { .. } => {
                return Err(ShaderError::WrongBackend {
                    label: descriptor.label.to_string(),
                    expected: "a WGSL compute module",
                }
                .into())
            }
        };

        // Parse up front so malformed source becomes a typed error
        // instead of a device-side validation panic.
        let module = naga::front::wgsl::parse_str(source).map_err(|e| {
            ShaderError::CompilationFailed {
                label: descriptor.label.to_string(),
                details: e.emit_to_string(source),
            }
        })?;
        let module = self
            .context
            .device
            .create_shader_module(wgpu::ShaderModuleDescriptor {
                label: Some(descriptor.label),
                source: wgpu::ShaderSource::Naga(Cow::Owned(module)),
            });

        let pipeline_layout =
            self.context
                .device
                .create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                    label: Some(descriptor.label),
                    bind_group_layouts: &[&self.fixtures.program_layout],
                    push_constant_ranges: &[],
                });
        let pipeline =
            self.context
                .device
                .create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
                    label: Some(descriptor.label),
                    layout: Some(&pipeline_layout),
                    module: &module,
                    entry_point: Some(entry),
                    compilation_options: Default::default(),
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
        log::debug!(
            "ComputeBackend: created program '{}' as {id:?}",
            descriptor.label
        );
        Ok(id)
    }

    fn destroy_program(&mut self, id: ProgramId) -> Result<(), ResourceError> {
        self.programs
            .remove(&id)
            .map(|entry| log::debug!("ComputeBackend: destroyed program '{}'", entry.label))
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
        let id = UniformBufferId(self.next_buffer_id);
        self.next_buffer_id += 1;
        self.buffers.insert(id, BufferEntry { buffer, size });
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
        if format != TextureFormat::Rgba8Unorm {
            return Err(ResourceError::BackendError(format!(
                "compute backend targets must be rgba8unorm, got {format:?}"
            )));
        }
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
            usage: wgpu::TextureUsages::STORAGE_BINDING
                | wgpu::TextureUsages::TEXTURE_BINDING
                | wgpu::TextureUsages::COPY_SRC
                | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let id = TextureId(self.next_texture_id);
        self.next_texture_id += 1;
        self.textures.insert(
            id,
            TextureEntry {
                texture,
                view,
                width: width.max(1),
                height: height.max(1),
            },
        );
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
                label: Some("compute frame"),
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

        let bind_group = self
            .context
            .device
            .create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some("compute draw"),
                layout: &self.fixtures.program_layout,
                entries: &[
                    wgpu::BindGroupEntry {
                        binding: 0,
                        resource: uniforms.buffer.as_entire_binding(),
                    },
                    wgpu::BindGroupEntry {
                        binding: 1,
                        resource: wgpu::BindingResource::TextureView(&target.view),
                    },
                ],
            });

        let encoder = self
            .encoder
            .as_mut()
            .ok_or_else(|| RenderError::RenderingFailed("draw outside a frame".into()))?;
        let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
            label: Some(&program.label),
            timestamp_writes: None,
        });
        pass.set_pipeline(&program.pipeline);
        pass.set_bind_group(0, &bind_group, &[]);
        pass.dispatch_workgroups(
            Self::workgroups(target.width),
            Self::workgroups(target.height),
            1,
        );
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
        if layers.len() > self.fixtures.composite_params.len() {
            return Err(RenderError::RenderingFailed(format!(
                "composite of {} layers exceeds the {} slots",
                layers.len(),
                self.fixtures.composite_params.len()
            )));
        }
        let (target_width, target_height) = {
            let entry = self
                .textures
                .get(&target)
                .ok_or(ResourceError::InvalidHandle)?;
            (entry.width, entry.height)
        };
        self.ensure_accum(target_width, target_height);

        // Build the per-layer bind groups first; they must outlive the
        // passes and the pass borrows the encoder.
        let accum = match &self.accum {
            Some(pair) => pair,
            None => {
                return Err(RenderError::Internal(
                    "composite accumulation pair missing".into(),
                ))
            }
        };
        let mut steps = Vec::with_capacity(layers.len());
        for (slot, layer) in layers.iter().enumerate() {
            let source = self
                .textures
                .get(&layer.texture)
                .ok_or(ResourceError::InvalidHandle)?;
            let params_buffer = &self.fixtures.composite_params[slot];
            // The first layer seeds the stack over implicit black
            // (mode 4); the rest blend against the accumulated below.
            let mode = if slot == 0 {
                4u32
            } else {
                conversions::blend_tag(layer.blend)
            };
            self.context.queue.write_buffer(
                params_buffer,
                0,
                bytemuck::bytes_of(&CompositeParamsRaw {
                    opacity: layer.opacity,
                    blend_mode: mode,
                    _pad0: 0.0,
                    _pad1: 0.0,
                }),
            );
            let below = &accum.views[slot % 2];
            let dst = &accum.views[(slot + 1) % 2];
            steps.push(
                self.context
                    .device
                    .create_bind_group(&wgpu::BindGroupDescriptor {
                        label: Some("compute composite step"),
                        layout: &self.fixtures.composite_layout,
                        entries: &[
                            wgpu::BindGroupEntry {
                                binding: 0,
                                resource: wgpu::BindingResource::TextureView(below),
                            },
                            wgpu::BindGroupEntry {
                                binding: 1,
                                resource: wgpu::BindingResource::TextureView(&source.view),
                            },
                            wgpu::BindGroupEntry {
                                binding: 2,
                                resource: wgpu::BindingResource::TextureView(dst),
                            },
                            wgpu::BindGroupEntry {
                                binding: 3,
                                resource: params_buffer.as_entire_binding(),
                            },
                        ],
                    }),
            );
        }

        let encoder = self
            .encoder
            .as_mut()
            .ok_or_else(|| RenderError::RenderingFailed("composite outside a frame".into()))?;
        for bind_group in &steps {
            let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                label: Some("composite step"),
                timestamp_writes: None,
            });
            pass.set_pipeline(&self.fixtures.composite_pipeline);
            pass.set_bind_group(0, bind_group, &[]);
            pass.dispatch_workgroups(
                Self::workgroups(target_width),
                Self::workgroups(target_height),
                1,
            );
        }

        // The last write landed in views[layers.len() % 2]; copy it out.
        if !layers.is_empty() {
            let final_index = layers.len() % 2;
            let target_entry = self
                .textures
                .get(&target)
                .ok_or(ResourceError::InvalidHandle)?;
            encoder.copy_texture_to_texture(
                accum.textures[final_index].as_image_copy(),
                target_entry.texture.as_image_copy(),
                wgpu::Extent3d {
                    width: target_width,
                    height: target_height,
                    depth_or_array_layers: 1,
                },
            );
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
        log::warn!("ComputeBackend: context lost; invalidating all resources");
        self.lost = true;
        self.encoder = None;
        self.programs.clear();
        self.buffers.clear();
        self.textures.clear();
        self.accum = None;
    }

    fn restore(&mut self) -> Result<(), RenderError> {
        if !self.lost {
            return Ok(());
        }
        self.context.recreate_device("polychora compute backend")?;
        self.fixtures = Self::build_fixtures(&self.context.device)?;
        self.lost = false;
        log::info!("ComputeBackend: context restored");
        Ok(())
    }

    fn context_lost(&self) -> bool {
        self.lost
    }

    fn supports_feature(&self, feature: &str) -> bool {
        matches!(feature, "compute" | "wgsl" | "crossfade" | "composite")
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
        self.accum = None;
        log::info!(
            "ComputeBackend: disposed (adapter \"{}\")",
            self.context.adapter_name
        );
    }
}

#[derive(Debug, Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
#[repr(C)]
struct CompositeParamsRaw {
    opacity: f32,
    blend_mode: u32,
    _pad0: f32,
    _pad1: f32,
}
