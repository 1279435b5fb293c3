/// A discrete change requested by the user, resolved against the viewport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Transition {
    LineUp,
    LineDown,
    PageUp,
    PageDown,
    Top,
    Bottom,
    Quit,
}

/// What the event loop should do after a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Control {
    Continue,
    Quit,
}

/// Largest vertical offset for `line_count` rendered lines in a window of
/// `height` rows. The window may scroll one line past the last one.
pub fn max_offset(line_count: usize, height: usize) -> usize {
    (line_count + 1).saturating_sub(height)
}

pub fn clamp_offset(offset: usize, line_count: usize, height: usize) -> usize {
    offset.min(max_offset(line_count, height))
}

pub fn line_up(offset: usize) -> usize {
    offset.saturating_sub(1)
}

pub fn line_down(offset: usize, line_count: usize, height: usize) -> usize {
    clamp_offset(offset.saturating_add(1), line_count, height)
}

pub fn page_up(offset: usize, height: usize) -> usize {
    offset.saturating_sub(height / 2)
}

pub fn page_down(offset: usize, line_count: usize, height: usize) -> usize {
    clamp_offset(offset.saturating_add(height / 2), line_count, height)
}

/// Jump target for the last page. Uses `height` as a floor rather than 0, so
/// callers holding a line count must clamp the result.
pub fn bottom(line_count: usize, height: usize) -> usize {
    height.max(max_offset(line_count, height))
}

/// Resolves a transition to the next vertical offset. `Quit` keeps the offset.
pub fn apply(transition: Transition, offset: usize, line_count: usize, height: usize) -> usize {
    match transition {
        Transition::LineUp => line_up(offset),
        Transition::LineDown => line_down(offset, line_count, height),
        Transition::PageUp => page_up(offset, height),
        Transition::PageDown => page_down(offset, line_count, height),
        Transition::Top => 0,
        Transition::Bottom => bottom(line_count, height),
        Transition::Quit => offset,
    }
}
