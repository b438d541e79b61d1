use tracing::debug;
use winit::dpi::PhysicalSize;

/// Shader parameters for compositing the caption layer.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct LayerParams {
    texel: [f32; 2],
    sigma_px: f32,
    _pad: f32,
}

impl LayerParams {
    /// `blur_px` is the exit blur in logical pixels.
    pub fn new(size: PhysicalSize<u32>, blur_px: f32, scale_factor: f32) -> Self {
        Self {
            texel: [
                1.0 / size.width.max(1) as f32,
                1.0 / size.height.max(1) as f32,
            ],
            sigma_px: (blur_px * scale_factor).max(0.0),
            _pad: 0.0,
        }
    }
}

/// Offscreen target the captions are rendered into, composited over the
/// frame with the same exit blur the frame gets.
pub struct CaptionLayer {
    format: wgpu::TextureFormat,
    pipeline: wgpu::RenderPipeline,
    bind_group_layout: wgpu::BindGroupLayout,
    sampler: wgpu::Sampler,
    params: wgpu::Buffer,
    target: Option<(wgpu::TextureView, wgpu::BindGroup)>,
    size: PhysicalSize<u32>,
}

impl CaptionLayer {
    pub fn new(device: &wgpu::Device, format: wgpu::TextureFormat) -> Self {
        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("flipbook-caption-layer-shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("layer.wgsl").into()),
        });

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("flipbook-caption-layer-bgl"),
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

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("flipbook-caption-layer-pipeline-layout"),
            bind_group_layouts: &[&bind_group_layout],
            immediate_size: 0,
        });

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("flipbook-caption-layer-pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs"),
                buffers: &[],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs"),
                targets: &[Some(wgpu::ColorTargetState {
                    format,
                    blend: Some(wgpu::BlendState::PREMULTIPLIED_ALPHA_BLENDING),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            }),
            primitive: wgpu::PrimitiveState::default(),
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            multiview_mask: None,
            cache: None,
        });

        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("flipbook-caption-layer-sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::MipmapFilterMode::Nearest,
            ..Default::default()
        });

        let params = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("flipbook-caption-layer-params"),
            size: std::mem::size_of::<LayerParams>() as wgpu::BufferAddress,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        Self {
            format,
            pipeline,
            bind_group_layout,
            sampler,
            params,
            target: None,
            size: PhysicalSize::new(0, 0),
        }
    }

    /// Drops the offscreen target; it is reallocated at the new size on the
    /// next frame that has captions.
    pub fn resize(&mut self, size: PhysicalSize<u32>) {
        if size != self.size {
            self.size = size;
            self.target = None;
        }
    }

    /// Render target for the caption pass, or `None` while the window has no area.
    pub fn view(&mut self, device: &wgpu::Device) -> Option<&wgpu::TextureView> {
        if self.size.width == 0 || self.size.height == 0 {
            return None;
        }
        if self.target.is_none() {
            debug!(
                width = self.size.width,
                height = self.size.height,
                "allocating caption layer"
            );
            let texture = device.create_texture(&wgpu::TextureDescriptor {
                label: Some("flipbook-caption-layer"),
                size: wgpu::Extent3d {
                    width: self.size.width,
                    height: self.size.height,
                    depth_or_array_layers: 1,
                },
                mip_level_count: 1,
                sample_count: 1,
                dimension: wgpu::TextureDimension::D2,
                format: self.format,
                usage: wgpu::TextureUsages::RENDER_ATTACHMENT
                    | wgpu::TextureUsages::TEXTURE_BINDING,
                view_formats: &[],
            });
            let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
            let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some("flipbook-caption-layer-bind-group"),
                layout: &self.bind_group_layout,
                entries: &[
                    wgpu::BindGroupEntry {
                        binding: 0,
                        resource: wgpu::BindingResource::TextureView(&view),
                    },
                    wgpu::BindGroupEntry {
                        binding: 1,
                        resource: wgpu::BindingResource::Sampler(&self.sampler),
                    },
                    wgpu::BindGroupEntry {
                        binding: 2,
                        resource: self.params.as_entire_binding(),
                    },
                ],
            });
            self.target = Some((view, bind_group));
        }
        self.target.as_ref().map(|(view, _)| view)
    }

    pub fn set_blur(&self, queue: &wgpu::Queue, blur_px: f32, scale_factor: f32) {
        let params = LayerParams::new(self.size, blur_px, scale_factor);
        queue.write_buffer(&self.params, 0, bytemuck::bytes_of(&params));
    }

    pub fn draw(&self, pass: &mut wgpu::RenderPass<'_>) {
        let Some((_, bind_group)) = self.target.as_ref() else {
            return;
        };
        pass.set_pipeline(&self.pipeline);
        pass.set_bind_group(0, bind_group, &[]);
        pass.draw(0..3, 0..1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blur_radius_scales_to_device_pixels() {
        let params = LayerParams::new(PhysicalSize::new(200, 100), 10.0, 2.0);
        assert_eq!(params.texel, [0.005, 0.01]);
        assert_eq!(params.sigma_px, 20.0);
        assert_eq!(bytemuck::bytes_of(&params).len(), 16);
    }

    #[test]
    fn idle_exit_leaves_captions_sharp() {
        let params = LayerParams::new(PhysicalSize::new(0, 0), 0.0, 1.5);
        assert_eq!(params.sigma_px, 0.0);
        assert_eq!(params.texel, [1.0, 1.0]);
    }
}
