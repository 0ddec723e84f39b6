//! One mounted room: GPU context, scene, materials and the loads still in
//! flight. [`RoomSession::teardown`] undoes everything a session set up.

use std::{collections::HashMap, iter, time::Duration};

use ab_glyph::FontArc;
use cgmath::{EuclideanSpace, Matrix4, SquareMatrix};
use image::Rgb32FImage;

use crate::{
    builders::book::{self, PortfolioBookParams, printed_cover},
    config::{RecolorRule, RoomLayout},
    context::Context,
    data_structures::{
        material::{MaterialLibrary, TextureSlot, TextureSource},
        scene_graph::{ContainerNode, SceneNode, SlotId, collect_lights, find_slot_mut},
        texture::Texture,
    },
    render::{Instanced, draw_batch, sort_batches},
    resources::{
        AssetSource,
        gltf::LoadedModel,
        headphones::load_headphones,
        plant::load_plant,
        task::{AssetError, AssetTasks, Spawner, TaskId},
    },
    room::{AssetRequest, assemble_room, place_model},
};

/// What a finished load hands back to the render thread.
pub enum AssetPayload {
    Texture {
        group: String,
        slot: TextureSlot,
        source: TextureSource,
    },
    Environment(Rgb32FImage),
    Font(FontArc),
    Model { slot: SlotId, model: LoadedModel },
}

pub struct RoomSession {
    ctx: Context,
    root: ContainerNode,
    materials: MaterialLibrary,
    tasks: AssetTasks<AssetPayload>,
    /// Model slot waiting on each task.
    slots: HashMap<TaskId, SlotId>,
    book: PortfolioBookParams,
    /// Re-applied whenever a model brings new materials.
    recolor: Vec<RecolorRule>,
    started: instant::Instant,
    #[cfg(target_arch = "wasm32")]
    canvas: Option<web_sys::HtmlCanvasElement>,
    torn_down: bool,
}

impl RoomSession {
    /// Builds the room and starts every load it asks for.
    pub fn new(ctx: Context, layout: &RoomLayout, spawner: Spawner) -> Self {
        let mut materials = MaterialLibrary::new();
        let assembly = assemble_room(layout, &mut materials);

        let timeout = Duration::try_from_secs_f32(layout.assets.timeout_secs)
            .ok()
            .filter(|limit| !limit.is_zero());
        let mut tasks = AssetTasks::new(spawner, timeout);
        let source = AssetSource::new(layout.assets.root.clone());
        let mut slots = HashMap::new();
        for request in assembly.requests {
            let slot = match &request {
                AssetRequest::Headphones { slot, .. } | AssetRequest::Plant { slot, .. } => Some(*slot),
                _ => None,
            };
            let id = spawn_request(&mut tasks, &source, request);
            if let Some(slot) = slot {
                slots.insert(id, slot);
            }
        }

        Self {
            ctx,
            root: assembly.root,
            materials,
            tasks,
            slots,
            book: layout.book.clone(),
            recolor: layout.recolor.clone(),
            started: instant::Instant::now(),
            #[cfg(target_arch = "wasm32")]
            canvas: None,
            torn_down: false,
        }
    }

    /// The canvas this session draws into, removed again on teardown.
    #[cfg(target_arch = "wasm32")]
    pub fn with_canvas(mut self, canvas: web_sys::HtmlCanvasElement) -> Self {
        self.canvas = Some(canvas);
        self
    }

    pub fn context(&self) -> &Context {
        &self.ctx
    }

    pub fn root(&self) -> &ContainerNode {
        &self.root
    }

    pub fn materials(&self) -> &MaterialLibrary {
        &self.materials
    }

    pub fn pending_assets(&self) -> usize {
        self.tasks.pending()
    }

    pub fn is_torn_down(&self) -> bool {
        self.torn_down
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        if !self.torn_down {
            self.ctx.resize(width, height);
        }
    }

    /// Applies every load that finished since the last frame.
    pub fn poll_assets(&mut self) {
        for (id, outcome) in self.tasks.poll() {
            let slot = self.slots.remove(&id);
            match outcome {
                Ok(payload) => self.apply(payload),
                Err(error) => {
                    let Some(slot) = slot.and_then(|slot| find_slot_mut(&mut self.root, slot)) else {
                        continue;
                    };
                    match error {
                        AssetError::Cancelled { .. } => slot.cancel(),
                        error => slot.fail(error.to_string()),
                    }
                }
            }
        }
    }

    fn apply(&mut self, payload: AssetPayload) {
        match payload {
            AssetPayload::Texture { group, slot, source } => {
                let members = self.materials.group(&group).to_vec();
                if members.is_empty() {
                    log::warn!("no material in group `{group}` for a loaded texture");
                }
                for handle in members {
                    self.materials.set_texture(handle, slot, source.clone());
                }
            }
            AssetPayload::Environment(image) => {
                match Texture::create_environment(&self.ctx.device, &self.ctx.queue, &image) {
                    Ok(environment) => self.ctx.light.set_environment(&self.ctx.device, environment),
                    Err(e) => log::error!("cannot use environment map: {e:#}"),
                }
            }
            AssetPayload::Font(font) => {
                if !self.book.with_text {
                    return;
                }
                let cover = printed_cover(&self.book, Some(&font));
                let members = self.materials.group(book::COVER_GROUP).to_vec();
                for handle in members {
                    self.materials.set_texture(handle, TextureSlot::Color, cover.clone());
                }
            }
            AssetPayload::Model { slot, model } => {
                place_model(&mut self.root, slot, model, &mut self.materials, &self.recolor);
            }
        }
    }

    /// Draws one frame and asks for the next.
    pub fn render(&mut self) -> Result<(), wgpu::SurfaceError> {
        if self.torn_down {
            return Ok(());
        }
        self.poll_assets();

        let ctx = &mut self.ctx;
        ctx.window.request_redraw();
        // Rendering requires the surface to be configured
        if !ctx.is_surface_configured() {
            return Ok(());
        }

        self.root.update_world_transforms(&Matrix4::identity());
        self.root.write_to_buffers(&ctx.queue, &ctx.device, &mut ctx.cache);
        self.materials.write_to_buffers(&ctx.device, &ctx.queue, &mut ctx.cache);
        ctx.light.update(&ctx.queue, &collect_lights(&self.root));
        ctx.camera.write_to_buffer(&ctx.queue);
        ctx.post.set_time(&ctx.queue, self.started.elapsed().as_secs_f32());

        let output = ctx.surface.get_current_texture()?;
        let view = output.texture.create_view(&wgpu::TextureViewDescriptor::default());
        let mut encoder = ctx.device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("Render Encoder"),
        });

        let mut opaque: Vec<Instanced> = Vec::new();
        let mut transparent: Vec<Instanced> = Vec::new();
        self.root
            .get_render(&self.materials, &ctx.cache)
            .split(&mut opaque, &mut transparent);
        sort_batches(&mut opaque, &mut transparent, ctx.camera.camera.eye.to_vec());

        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Scene Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: ctx.post.hdr_view(),
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(ctx.clear_colour),
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &ctx.depth_texture.view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                occlusion_query_set: None,
                timestamp_writes: None,
            });
            let camera = &ctx.camera.bind_group;
            let light = &ctx.light.bind_group;
            draw_batch(&mut render_pass, &ctx.pipelines, &opaque, camera, light);
            draw_batch(&mut render_pass, &ctx.pipelines, &transparent, camera, light);
        }

        ctx.post.run(&mut encoder, &view);
        ctx.queue.submit(iter::once(encoder.finish()));
        output.present();
        Ok(())
    }

    /// Cancels outstanding loads, frees GPU resources and detaches the
    /// canvas. Safe to call more than once.
    pub fn teardown(&mut self) {
        if self.torn_down {
            return;
        }
        self.torn_down = true;
        let cancelled = self.tasks.cancel_all();
        for slot in self.slots.drain().map(|(_, slot)| slot) {
            if let Some(slot) = find_slot_mut(&mut self.root, slot) {
                slot.cancel();
            }
        }
        self.root.release();
        self.materials.release();
        self.ctx.release();
        #[cfg(target_arch = "wasm32")]
        if let Some(canvas) = self.canvas.take() {
            canvas.remove();
        }
        log::info!("room torn down, {cancelled} loads cancelled");
    }
}

impl Drop for RoomSession {
    fn drop(&mut self) {
        self.teardown();
    }
}

fn spawn_request(tasks: &mut AssetTasks<AssetPayload>, source: &AssetSource, request: AssetRequest) -> TaskId {
    let label = request.label();
    let source = source.clone();
    match request {
        AssetRequest::Texture {
            path,
            group,
            slot,
            settings,
        } => tasks.spawn(label, async move {
            let texture = source.load_texture_source(&path, settings).await?;
            Ok(AssetPayload::Texture {
                group,
                slot,
                source: texture,
            })
        }),
        AssetRequest::Environment { path } => tasks.spawn(label, async move {
            Ok(AssetPayload::Environment(source.load_environment(&path).await?))
        }),
        AssetRequest::CoverFont { path } => tasks.spawn(label, async move {
            Ok(AssetPayload::Font(source.load_font(&path).await?))
        }),
        AssetRequest::Headphones { slot, options } => tasks.spawn(label, async move {
            let model = load_headphones(&source, &options).await?;
            Ok(AssetPayload::Model { slot, model })
        }),
        AssetRequest::Plant { slot, options } => tasks.spawn(label, async move {
            let model = load_plant(&source, &options).await?;
            Ok(AssetPayload::Model { slot, model })
        }),
    }
}
