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

//! Headless wgpu state shared by both backends.
//!
//! The engine renders to offscreen targets and composites there; surface
//! presentation is the host's concern, so the context is created without
//! a window.

use polychora_core::renderer::RenderError;

/// Holds the core wgpu state objects required for rendering.
#[derive(Debug)]
pub struct WgpuContext {
    /// The wgpu instance the adapter came from.
    pub instance: wgpu::Instance,
    /// The selected physical adapter.
    pub adapter: wgpu::Adapter,
    /// The logical device.
    pub device: wgpu::Device,
    /// The submission queue.
    pub queue: wgpu::Queue,
    /// Cached adapter name for diagnostics.
    pub adapter_name: String,
}

impl WgpuContext {
    /// Creates a headless context on the best available adapter.
    pub fn new(label: &str) -> Result<Self, RenderError> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor::default());
        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::HighPerformance,
            compatible_surface: None,
            force_fallback_adapter: false,
        }))
        .map_err(|e| RenderError::InitializationFailed(format!("no suitable adapter: {e}")))?;

        let adapter_info = adapter.get_info();
        log::info!(
            "WgpuContext({label}): using adapter \"{}\" (backend {:?})",
            adapter_info.name,
            adapter_info.backend
        );

        let (device, queue) = pollster::block_on(adapter.request_device(&wgpu::DeviceDescriptor {
            label: Some(label),
            required_features: wgpu::Features::empty(),
            required_limits: wgpu::Limits::default(),
            memory_hints: wgpu::MemoryHints::Performance,
            trace: wgpu::Trace::Off,
        }))
        .map_err(|e| RenderError::InitializationFailed(format!("device creation failed: {e}")))?;

        device.on_uncaptured_error(Box::new(|e| {
            log::error!("WGPU uncaptured error: {e:?}");
        }));

        Ok(Self {
            instance,
            adapter,
            device,
            queue,
            adapter_name: adapter_info.name,
        })
    }

    /// Re-creates the device and queue after a (real or simulated)
    /// context loss, keeping the instance and adapter.
    pub fn recreate_device(&mut self, label: &str) -> Result<(), RenderError> {
        log::warn!("WgpuContext({label}): re-creating logical device after context loss");
        let (device, queue) =
            pollster::block_on(self.adapter.request_device(&wgpu::DeviceDescriptor {
                label: Some(label),
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::default(),
                memory_hints: wgpu::MemoryHints::Performance,
                trace: wgpu::Trace::Off,
            }))
            .map_err(|e| {
                RenderError::InitializationFailed(format!("device re-creation failed: {e}"))
            })?;
        self.device = device;
        self.queue = queue;
        Ok(())
    }
}
