use std::path::PathBuf;
use std::time::{Duration, Instant};

use pixels::{Error as PixelsError, Pixels, SurfaceTexture};
use thiserror::Error;
use tracing::{info, warn};
use winit::dpi::LogicalSize;
use winit::error::{EventLoopError, OsError};
use winit::event::{ElementState, Event, KeyEvent, MouseButton, WindowEvent};
use winit::event_loop::{ControlFlow, EventLoop};
use winit::keyboard::{KeyCode, PhysicalKey};
use winit::window::WindowBuilder;

use crate::geom::Vec2;
use crate::layer::{LayerError, PointerSample, TileMap};
use crate::rendering::{clear_frame, draw_layer, TextureStore};

const CLEAR_COLOR: [u8; 4] = [20, 22, 28, 255];

#[derive(Debug, Clone)]
pub struct ViewerConfig {
    pub window_title: String,
    pub window_width: u32,
    pub window_height: u32,
    pub scroll_speed_px_per_second: f32,
    pub max_frame_delta: Duration,
    pub metrics_log_interval: Duration,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            window_title: "Tilestream Viewer".to_string(),
            window_width: 1280,
            window_height: 720,
            scroll_speed_px_per_second: 240.0,
            max_frame_delta: Duration::from_millis(250),
            metrics_log_interval: Duration::from_secs(1),
        }
    }
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("failed to create event loop: {0}")]
    CreateEventLoop(#[source] EventLoopError),
    #[error("failed to create application window: {0}")]
    CreateWindow(#[source] OsError),
    #[error("failed to initialize frame surface: {0}")]
    CreateSurface(#[source] PixelsError),
    #[error(transparent)]
    Layer(#[from] LayerError),
    #[error("event loop failed: {0}")]
    EventLoopRun(#[source] EventLoopError),
}

/// Opens a window and streams `map` through it: arrow keys pan the camera,
/// the pointer drives tile interaction events, and every frame is drawn by
/// the software blitter.
pub fn run_viewer(config: ViewerConfig, mut map: TileMap, asset_root: PathBuf) -> Result<(), AppError> {
    let event_loop = EventLoop::new().map_err(AppError::CreateEventLoop)?;
    let window: &'static winit::window::Window = Box::leak(Box::new(
        WindowBuilder::new()
            .with_title(config.window_title.clone())
            .with_inner_size(LogicalSize::new(
                config.window_width as f64,
                config.window_height as f64,
            ))
            .build(&event_loop)
            .map_err(AppError::CreateWindow)?,
    ));
    let size = window.inner_size();
    let surface = SurfaceTexture::new(size.width, size.height, window);
    let mut pixels: Pixels<'static> =
        Pixels::new(size.width, size.height, surface).map_err(AppError::CreateSurface)?;
    let mut store = TextureStore::new(asset_root);

    event_loop.set_control_flow(ControlFlow::Poll);

    let mut scroll = Vec2::ZERO;
    let mut viewport = (size.width, size.height);
    render_visible_window(&mut map, scroll, viewport)?;
    info!(
        tile_width = map.tile_width(),
        tile_height = map.tile_height(),
        layers = map.layers().len(),
        live_nodes = map.live_node_count(),
        "map_window_rendered"
    );

    let max_frame_delta = config.max_frame_delta;
    let scroll_speed = config.scroll_speed_px_per_second;
    let metrics_log_interval = config.metrics_log_interval;
    let mut collector = InputCollector::default();
    let mut last_frame_instant = Instant::now();
    let mut last_metrics_instant = Instant::now();
    let mut frames_since_metrics = 0u32;

    event_loop
        .run(move |event, window_target| match event {
            Event::WindowEvent { window_id, event } if window_id == window.id() => match event {
                WindowEvent::CloseRequested => {
                    info!(reason = "window_close", "shutdown_requested");
                    window_target.exit();
                }
                WindowEvent::Resized(new_size) => {
                    if new_size.width == 0 || new_size.height == 0 {
                        return;
                    }
                    if let Err(error) = pixels.resize_surface(new_size.width, new_size.height) {
                        warn!(error = %error, "surface_resize_failed");
                        window_target.exit();
                        return;
                    }
                    if let Err(error) = pixels.resize_buffer(new_size.width, new_size.height) {
                        warn!(error = %error, "frame_resize_failed");
                        window_target.exit();
                        return;
                    }
                    viewport = (new_size.width, new_size.height);
                    if let Err(error) = render_visible_window(&mut map, scroll, viewport) {
                        warn!(error = %error, "window_rebuild_reported_broken_tile");
                    }
                }
                WindowEvent::CursorMoved { position, .. } => {
                    collector.cursor_position_px =
                        Some(Vec2::new(position.x as f32, position.y as f32));
                }
                WindowEvent::CursorLeft { .. } => {
                    collector.cursor_position_px = None;
                }
                WindowEvent::MouseInput { state, button, .. } => {
                    collector.handle_mouse_input(button, state);
                }
                WindowEvent::KeyboardInput { event, .. } => {
                    collector.handle_keyboard_input(&event);
                    if collector.quit_requested {
                        info!(reason = "escape_key", "shutdown_requested");
                        window_target.exit();
                    }
                }
                WindowEvent::RedrawRequested => {
                    let now = Instant::now();
                    let frame_dt = now
                        .saturating_duration_since(last_frame_instant)
                        .min(max_frame_delta);
                    last_frame_instant = now;

                    let direction = collector.scroll_direction();
                    if direction != Vec2::ZERO {
                        let delta = Vec2::new(
                            direction.x * scroll_speed * frame_dt.as_secs_f32(),
                            direction.y * scroll_speed * frame_dt.as_secs_f32(),
                        );
                        scroll += delta;
                        if let Err(error) = map.pan(delta.x, delta.y) {
                            warn!(error = %error, "pan_reported_broken_tile");
                        }
                    }

                    let (pressed, released) = collector.take_click_edges();
                    let sample = PointerSample {
                        position_px: collector.cursor_position_px.map(|cursor| cursor + scroll),
                        pressed,
                        released,
                    };
                    map.route_pointer(sample);
                    for (layer_id, interaction) in map.poll_interactions() {
                        info!(
                            layer = layer_id.0,
                            kind = ?interaction.kind,
                            tile_id = interaction.tile_id,
                            x = interaction.coord.x,
                            y = interaction.coord.y,
                            "tile_interaction"
                        );
                    }

                    let frame = pixels.frame_mut();
                    clear_frame(frame, CLEAR_COLOR);
                    for layer in map.layers() {
                        draw_layer(frame, viewport.0, viewport.1, layer, scroll, &mut store);
                    }
                    if let Err(error) = pixels.render() {
                        warn!(error = %error, "frame_present_failed");
                        window_target.exit();
                        return;
                    }

                    frames_since_metrics += 1;
                    let since_metrics = now.saturating_duration_since(last_metrics_instant);
                    if since_metrics >= metrics_log_interval {
                        let fps = frames_since_metrics as f64 / since_metrics.as_secs_f64();
                        info!(
                            fps = fps.round() as u32,
                            live_nodes = map.live_node_count(),
                            scroll_x = scroll.x,
                            scroll_y = scroll.y,
                            "viewer_metrics"
                        );
                        frames_since_metrics = 0;
                        last_metrics_instant = now;
                    }
                }
                _ => {}
            },
            Event::AboutToWait => {
                window.request_redraw();
            }
            Event::LoopExiting => {
                info!("shutdown");
            }
            _ => {}
        })
        .map_err(AppError::EventLoopRun)
}

/// Rebuilds every layer window to cover the viewport from the current
/// scroll position, one spare tile on each axis.
fn render_visible_window(
    map: &mut TileMap,
    scroll: Vec2,
    viewport: (u32, u32),
) -> Result<(), LayerError> {
    let tile_width = map.tile_width().max(1);
    let tile_height = map.tile_height().max(1);
    let start_x = (scroll.x / tile_width as f32).floor() as i32;
    let start_y = (scroll.y / tile_height as f32).floor() as i32;
    map.render_tiles(
        start_x,
        start_y,
        visible_tile_span(viewport.0, tile_width),
        visible_tile_span(viewport.1, tile_height),
    )
}

fn visible_tile_span(viewport_px: u32, tile_px: u32) -> i32 {
    (viewport_px / tile_px.max(1)) as i32 + 2
}

#[derive(Debug, Default)]
struct InputCollector {
    quit_requested: bool,
    left_is_down: bool,
    right_is_down: bool,
    up_is_down: bool,
    down_is_down: bool,
    cursor_position_px: Option<Vec2>,
    click_pressed_edge: bool,
    click_released_edge: bool,
}

impl InputCollector {
    fn handle_keyboard_input(&mut self, key_event: &KeyEvent) {
        let is_down = key_event.state == ElementState::Pressed;
        match key_event.physical_key {
            PhysicalKey::Code(KeyCode::ArrowLeft) => self.left_is_down = is_down,
            PhysicalKey::Code(KeyCode::ArrowRight) => self.right_is_down = is_down,
            PhysicalKey::Code(KeyCode::ArrowUp) => self.up_is_down = is_down,
            PhysicalKey::Code(KeyCode::ArrowDown) => self.down_is_down = is_down,
            PhysicalKey::Code(KeyCode::Escape) => {
                if is_down {
                    self.quit_requested = true;
                }
            }
            _ => {}
        }
    }

    fn handle_mouse_input(&mut self, button: MouseButton, state: ElementState) {
        if button != MouseButton::Left {
            return;
        }
        match state {
            ElementState::Pressed => self.click_pressed_edge = true,
            ElementState::Released => self.click_released_edge = true,
        }
    }

    fn scroll_direction(&self) -> Vec2 {
        let x = (self.right_is_down as i32 - self.left_is_down as i32) as f32;
        let y = (self.down_is_down as i32 - self.up_is_down as i32) as f32;
        Vec2::new(x, y)
    }

    fn take_click_edges(&mut self) -> (bool, bool) {
        let edges = (self.click_pressed_edge, self.click_released_edge);
        self.click_pressed_edge = false;
        self.click_released_edge = false;
        edges
    }
}
