//! Explicit GPU context and render-thread marshalling
//!
//! The context is constructed once at startup by the application and passed
//! to every component that needs GPU access. GPU work requested from the
//! logic thread goes through [`RenderDispatcher::run_sync`], which blocks
//! until the render thread has executed the job.

use std::sync::Arc;

use crossbeam_channel::{Receiver, Sender};

use crate::error::RenderError;

use super::TARGET_FORMAT;

/// Device and queue shared by every renderer. Owned by the application,
/// lives on the render thread.
pub struct RenderContext {
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
}

impl RenderContext {
    /// Create a headless context on the best available adapter.
    pub fn new() -> Result<Self, RenderError> {
        pollster::block_on(Self::new_async())
    }

    async fn new_async() -> Result<Self, RenderError> {
        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor::default());

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: None,
                force_fallback_adapter: false,
            })
            .await
            .ok_or(RenderError::GpuUnavailable)?;

        log::info!("Using GPU: {}", adapter.get_info().name);
        log::info!("Backend: {:?}", adapter.get_info().backend);

        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: Some("projmap-engine device"),
                    required_features: wgpu::Features::empty(),
                    required_limits: wgpu::Limits::downlevel_defaults(),
                },
                None,
            )
            .await
            .map_err(|e| RenderError::DeviceCreation(e.to_string()))?;

        Ok(Self { device, queue })
    }

    /// Allocate an off-screen render target.
    pub fn create_target(&self, label: &str, width: u32, height: u32) -> RenderTarget {
        let width = width.max(1);
        let height = height.max(1);
        let texture = self.device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: TARGET_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT
                | wgpu::TextureUsages::TEXTURE_BINDING
                | wgpu::TextureUsages::COPY_SRC,
            view_formats: &[],
        });
        let view = Arc::new(texture.create_view(&wgpu::TextureViewDescriptor::default()));
        log::info!("Created render target '{label}' {width}x{height}");
        RenderTarget {
            texture,
            view,
            width,
            height,
        }
    }
}

/// An off-screen render target plus its sampleable view.
pub struct RenderTarget {
    pub texture: wgpu::Texture,
    pub view: Arc<wgpu::TextureView>,
    pub width: u32,
    pub height: u32,
}

type RenderJob = Box<dyn FnOnce(&RenderContext) + Send>;

/// Logic-thread handle for pushing GPU work onto the render thread.
#[derive(Clone)]
pub struct RenderDispatcher {
    sender: Sender<(RenderJob, Sender<()>)>,
}

/// Render-thread end of the job channel. Drained once per frame.
pub struct RenderJobQueue {
    receiver: Receiver<(RenderJob, Sender<()>)>,
}

/// Create the pair of channel endpoints for render-thread marshalling.
pub fn render_channel() -> (RenderDispatcher, RenderJobQueue) {
    let (sender, receiver) = crossbeam_channel::unbounded();
    (RenderDispatcher { sender }, RenderJobQueue { receiver })
}

impl RenderDispatcher {
    /// Run `job` on the render thread and block until it has completed.
    pub fn run_sync<F>(&self, job: F) -> Result<(), RenderError>
    where
        F: FnOnce(&RenderContext) + Send + 'static,
    {
        let (ack_tx, ack_rx) = crossbeam_channel::bounded(1);
        self.sender
            .send((Box::new(job), ack_tx))
            .map_err(|_| RenderError::RenderThreadGone)?;
        ack_rx.recv().map_err(|_| RenderError::RenderThreadGone)
    }
}

impl RenderJobQueue {
    /// Execute every pending job. Call once per frame on the render thread
    /// before drawing.
    pub fn process_pending(&self, ctx: &RenderContext) {
        while let Ok((job, ack)) = self.receiver.try_recv() {
            job(ctx);
            let _ = ack.send(());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_sync_fails_when_queue_dropped() {
        let (dispatcher, queue) = render_channel();
        drop(queue);
        let result = dispatcher.run_sync(|_| {});
        assert!(matches!(result, Err(RenderError::RenderThreadGone)));
    }

    #[test]
    fn test_run_sync_blocks_until_job_ran() {
        // No GPU in most CI environments: skip quietly when none is found.
        let Ok(ctx) = RenderContext::new() else {
            eprintln!("skipping: no GPU adapter");
            return;
        };

        use std::sync::atomic::{AtomicBool, Ordering};

        let (dispatcher, queue) = render_channel();
        let ran = Arc::new(AtomicBool::new(false));
        let stop = Arc::new(AtomicBool::new(false));
        let ran_in_job = ran.clone();
        let stop_in_thread = stop.clone();

        let render_thread = std::thread::spawn(move || {
            // Poll until the test is done, as a frame loop would.
            while !stop_in_thread.load(Ordering::SeqCst) {
                queue.process_pending(&ctx);
                std::thread::sleep(std::time::Duration::from_millis(1));
            }
        });

        dispatcher
            .run_sync(move |_| ran_in_job.store(true, Ordering::SeqCst))
            .unwrap();
        assert!(ran.load(Ordering::SeqCst));

        stop.store(true, Ordering::SeqCst);
        render_thread.join().unwrap();
    }
}
