pub mod markdown;
pub mod scroll;
pub mod viewport;

pub use markdown::{BULLET, ImageStyle, LineKind, RenderOptions, classify_line, render};
pub use scroll::{Control, Transition};
pub use viewport::{MarkdownRenderer, PADDING, Renderer, Viewport, ViewportFrame};
