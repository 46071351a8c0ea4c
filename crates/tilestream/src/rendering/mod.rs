mod blitter;
mod texture;

pub use blitter::{clear_frame, draw_layer};
pub use texture::{LoadedImage, TextureStore};
