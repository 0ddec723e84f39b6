//! The winit application: opens the window (or canvas), creates the GPU
//! context, then hands every frame to the [`RoomSession`].

use std::sync::Arc;

use winit::{
    application::ApplicationHandler,
    event::WindowEvent,
    event_loop::{ActiveEventLoop, EventLoop, EventLoopProxy},
    window::{Window, WindowId},
};

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

use crate::{config::RoomLayout, context::Context, resources::task::Spawner, session::RoomSession};

/// Element the room mounts into when started through [`run`] in the browser.
#[cfg(target_arch = "wasm32")]
pub const DEFAULT_CONTAINER: &str = "studio-room";

pub enum RoomEvent {
    /// The GPU context finished initialising in the browser.
    #[allow(dead_code)]
    Initialized(Box<Context>),
    #[allow(dead_code)]
    InitFailed(String),
}

pub struct App {
    #[cfg(not(target_arch = "wasm32"))]
    async_runtime: tokio::runtime::Runtime,
    #[allow(dead_code)]
    proxy: EventLoopProxy<RoomEvent>,
    layout: RoomLayout,
    session: Option<RoomSession>,
    #[cfg(target_arch = "wasm32")]
    container_id: String,
    #[cfg(target_arch = "wasm32")]
    canvas: Option<web_sys::HtmlCanvasElement>,
}

impl App {
    fn new(
        event_loop: &EventLoop<RoomEvent>,
        layout: RoomLayout,
        #[cfg(target_arch = "wasm32")] container_id: String,
    ) -> anyhow::Result<Self> {
        let proxy = event_loop.create_proxy();
        #[cfg(not(target_arch = "wasm32"))]
        let async_runtime = tokio::runtime::Runtime::new()?;
        Ok(Self {
            #[cfg(not(target_arch = "wasm32"))]
            async_runtime,
            proxy,
            layout,
            session: None,
            #[cfg(target_arch = "wasm32")]
            container_id,
            #[cfg(target_arch = "wasm32")]
            canvas: None,
        })
    }

    fn start(&mut self, ctx: Context) {
        #[cfg(not(target_arch = "wasm32"))]
        let spawner = Spawner::new(self.async_runtime.handle().clone());
        #[cfg(target_arch = "wasm32")]
        let spawner = Spawner::new();

        let size = ctx.window.inner_size();
        let window = ctx.window.clone();
        let session = RoomSession::new(ctx, &self.layout, spawner);
        #[cfg(target_arch = "wasm32")]
        let session = match self.canvas.take() {
            Some(canvas) => session.with_canvas(canvas),
            None => session,
        };
        self.session = Some(session);
        if let Some(session) = &mut self.session {
            session.resize(size.width, size.height);
        }
        window.request_redraw();
    }

    fn shut_down(&mut self, event_loop: &ActiveEventLoop) {
        if let Some(mut session) = self.session.take() {
            session.teardown();
        }
        event_loop.exit();
    }
}

impl ApplicationHandler<RoomEvent> for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.session.is_some() {
            return;
        }

        #[allow(unused_mut)]
        let mut window_attributes = Window::default_attributes().with_title("Studio");

        #[cfg(target_arch = "wasm32")]
        {
            use winit::platform::web::WindowAttributesExtWebSys;

            match mount_canvas(&self.container_id) {
                Ok(canvas) => {
                    window_attributes = window_attributes.with_canvas(Some(canvas.clone()));
                    self.canvas = Some(canvas);
                }
                Err(e) => {
                    log::error!("cannot mount the room: {e:#}");
                    event_loop.exit();
                    return;
                }
            }
        }

        let window = match event_loop.create_window(window_attributes) {
            Ok(window) => Arc::new(window),
            Err(e) => {
                log::error!("cannot create a window: {e}");
                event_loop.exit();
                return;
            }
        };

        #[cfg(not(target_arch = "wasm32"))]
        {
            let layout = &self.layout;
            let init_future = Context::new(window, &layout.camera, &layout.post, layout.clear_color.into());
            match self.async_runtime.block_on(init_future) {
                Ok(ctx) => self.start(ctx),
                Err(e) => {
                    log::error!("cannot create the GPU context: {e:#}");
                    event_loop.exit();
                }
            }
        }

        #[cfg(target_arch = "wasm32")]
        {
            let camera = self.layout.camera.clone();
            let post = self.layout.post;
            let clear_colour = self.layout.clear_color.into();
            let proxy = self.proxy.clone();
            wasm_bindgen_futures::spawn_local(async move {
                let event = match Context::new(window, &camera, &post, clear_colour).await {
                    Ok(ctx) => RoomEvent::Initialized(Box::new(ctx)),
                    Err(e) => RoomEvent::InitFailed(format!("{e:#}")),
                };
                if proxy.send_event(event).is_err() {
                    log::error!("event loop closed before the room was ready");
                }
            });
        }
    }

    fn user_event(&mut self, event_loop: &ActiveEventLoop, event: RoomEvent) {
        match event {
            // This is the message from our wasm `spawn_local`
            RoomEvent::Initialized(ctx) => self.start(*ctx),
            RoomEvent::InitFailed(reason) => {
                log::error!("cannot create the GPU context: {reason}");
                self.shut_down(event_loop);
            }
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _window_id: WindowId, event: WindowEvent) {
        let session = match &mut self.session {
            Some(session) => session,
            None => return,
        };

        match event {
            WindowEvent::CloseRequested | WindowEvent::Destroyed => self.shut_down(event_loop),
            WindowEvent::Resized(size) => session.resize(size.width, size.height),
            WindowEvent::RedrawRequested => match session.render() {
                Ok(()) => {}
                // Reconfigure the surface if it's lost or outdated
                Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                    let size = session.context().window.inner_size();
                    session.resize(size.width, size.height);
                }
                Err(e) => {
                    log::error!("Unable to render {e}");
                }
            },
            _ => {}
        }
    }

    fn exiting(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(mut session) = self.session.take() {
            session.teardown();
        }
    }
}

/// Creates a canvas filling the element `container_id`, replacing whatever
/// the element held before.
#[cfg(target_arch = "wasm32")]
fn mount_canvas(container_id: &str) -> anyhow::Result<web_sys::HtmlCanvasElement> {
    use anyhow::Context as _;
    use wasm_bindgen::JsCast;

    let js = |e: JsValue| anyhow::anyhow!("{e:?}");
    let document = web_sys::window()
        .and_then(|window| window.document())
        .context("no browser document")?;
    let container = document
        .get_element_by_id(container_id)
        .with_context(|| format!("no element with id `{container_id}`"))?;
    let canvas: web_sys::HtmlCanvasElement = document
        .create_element("canvas")
        .map_err(js)?
        .dyn_into()
        .map_err(|_| anyhow::anyhow!("created element is not a canvas"))?;
    canvas
        .set_attribute("style", "display:block;width:100%;height:100%")
        .map_err(js)?;
    canvas.set_width(container.client_width().max(1) as u32);
    canvas.set_height(container.client_height().max(1) as u32);
    container.replace_children_with_node_1(&canvas);
    Ok(canvas)
}

fn init_logger() {
    #[cfg(not(target_arch = "wasm32"))]
    {
        if let Err(e) = env_logger::try_init() {
            println!("Warning: Could not initialize logger: {}", e);
        };
    }

    #[cfg(target_arch = "wasm32")]
    {
        // a second mount finds the logger already installed
        let _ = console_log::init_with_level(log::Level::Info);
    }
}

fn launch(layout: RoomLayout, #[cfg(target_arch = "wasm32")] container_id: String) -> anyhow::Result<()> {
    init_logger();

    let event_loop: EventLoop<RoomEvent> = EventLoop::with_user_event().build()?;
    let mut app = App::new(
        &event_loop,
        layout,
        #[cfg(target_arch = "wasm32")]
        container_id,
    )?;

    event_loop.run_app(&mut app)?;

    Ok(())
}

/// Opens the room and renders until the window closes. In the browser the
/// room mounts into the element with id [`DEFAULT_CONTAINER`].
pub fn run(layout: RoomLayout) -> anyhow::Result<()> {
    launch(
        layout,
        #[cfg(target_arch = "wasm32")]
        String::from(DEFAULT_CONTAINER),
    )
}

/// Mounts the default room into the element `container_id`.
#[cfg(target_arch = "wasm32")]
#[wasm_bindgen]
pub fn mount_room(container_id: String) -> Result<(), JsValue> {
    launch(RoomLayout::default(), container_id).map_err(|e| JsValue::from_str(&format!("{e:#}")))
}
