use std::time::Instant;

use crate::markdown::{self, RenderOptions};
use crate::scroll::{self, Control, Transition};

/// Columns reserved on the left of every rendered line.
pub const PADDING: usize = 4;

/// Turns raw document text into laid-out terminal text.
pub trait Renderer {
    fn render(&self, text: &str, width: usize, padding: usize) -> String;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct MarkdownRenderer {
    pub options: RenderOptions,
}

impl MarkdownRenderer {
    pub fn new(options: RenderOptions) -> Self {
        Self { options }
    }
}

impl Renderer for MarkdownRenderer {
    fn render(&self, text: &str, width: usize, padding: usize) -> String {
        markdown::render(text, width, padding, &self.options)
    }
}

/// The rendered buffer and the corner of the window that should be shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ViewportFrame<'a> {
    pub text: &'a str,
    pub x_offset: usize,
    pub y_offset: usize,
    pub line_count: usize,
}

impl<'a> ViewportFrame<'a> {
    pub fn visible_lines(self, height: usize) -> impl Iterator<Item = &'a str> {
        self.text.lines().skip(self.y_offset).take(height)
    }
}

/// Scroll state over one document, re-rendered only when the width changes.
pub struct Viewport<R = MarkdownRenderer> {
    renderer: R,
    raw: String,
    rendered: String,
    cached_width: Option<u16>,
    line_count: usize,
    x_offset: usize,
    y_offset: usize,
    height: usize,
}

impl Viewport {
    pub fn new(raw: impl Into<String>, options: RenderOptions) -> Self {
        Self::with_renderer(raw, MarkdownRenderer::new(options))
    }
}

impl<R: Renderer> Viewport<R> {
    pub fn with_renderer(raw: impl Into<String>, renderer: R) -> Self {
        Self {
            renderer,
            raw: raw.into(),
            rendered: String::new(),
            cached_width: None,
            line_count: 0,
            x_offset: 0,
            y_offset: 0,
            height: 1,
        }
    }

    /// Replaces the document. The next layout pass renders it from scratch.
    pub fn set_content(&mut self, raw: impl Into<String>) {
        self.raw = raw.into();
        self.rendered.clear();
        self.cached_width = None;
        self.line_count = 0;
        self.x_offset = 0;
        self.y_offset = 0;
    }

    /// Reconciles the state with the terminal size. Re-renders on a width
    /// change only; any size change re-clamps the vertical offset.
    pub fn layout(&mut self, width: u16, height: u16) -> ViewportFrame<'_> {
        let width = width.max(1);
        let height = usize::from(height.max(1));

        if !self.raw.is_empty() && self.cached_width != Some(width) {
            let started = Instant::now();
            let text_width = usize::from(width).saturating_sub(PADDING).max(1);
            self.rendered = self.renderer.render(&self.raw, text_width, PADDING);
            self.cached_width = Some(width);
            self.line_count = self.rendered.matches('\n').count();
            tracing::debug!(
                width,
                lines = self.line_count,
                elapsed_us = started.elapsed().as_micros() as u64,
                "rendered document"
            );
        }

        self.height = height;
        self.y_offset = scroll::clamp_offset(self.y_offset, self.line_count, height);
        self.frame()
    }

    /// Applies a transition against the height of the last layout pass.
    pub fn handle(&mut self, transition: Transition) -> Control {
        if transition == Transition::Quit {
            return Control::Quit;
        }

        let next = scroll::apply(transition, self.y_offset, self.line_count, self.height);
        self.y_offset = scroll::clamp_offset(next, self.line_count, self.height);
        tracing::trace!(?transition, offset = self.y_offset, "scrolled");
        Control::Continue
    }

    pub fn frame(&self) -> ViewportFrame<'_> {
        ViewportFrame {
            text: &self.rendered,
            x_offset: self.x_offset,
            y_offset: self.y_offset,
            line_count: self.line_count,
        }
    }

    pub fn raw(&self) -> &str {
        &self.raw
    }

    pub fn cached_width(&self) -> Option<u16> {
        self.cached_width
    }

    pub fn line_count(&self) -> usize {
        self.line_count
    }

    pub fn y_offset(&self) -> usize {
        self.y_offset
    }

    pub fn renderer(&self) -> &R {
        &self.renderer
    }
}
