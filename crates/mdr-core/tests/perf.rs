use std::time::Instant;

use mdr_core::{RenderOptions, Transition, Viewport, render};

fn p95_us(values: &[u128]) -> u128 {
    let mut sorted = values.to_vec();
    sorted.sort_unstable();
    let idx = ((sorted.len() as f64) * 0.95).ceil() as usize - 1;
    sorted[idx]
}

fn large_markdown() -> String {
    let mut markdown = String::new();
    while markdown.len() < 200 * 1024 {
        markdown.push_str("# head\n\n- one\n- two\n\n`inline` and some prose that wraps\n\n");
    }
    markdown
}

#[test]
#[ignore = "perf smoke runs in perf CI job"]
fn render_p95_under_budget() {
    let markdown = large_markdown();

    let mut samples = Vec::new();
    for _ in 0..50 {
        let started = Instant::now();
        let _ = render(&markdown, 100, 4, &RenderOptions::default());
        samples.push(started.elapsed().as_micros());
    }

    let p95 = p95_us(&samples);
    assert!(p95 <= 40_000, "p95_us={p95}");
}

#[test]
#[ignore = "perf smoke runs in perf CI job"]
fn cached_layout_p95_under_budget() {
    let mut viewport = Viewport::new(large_markdown(), RenderOptions::default());
    viewport.layout(120, 40);

    let mut samples = Vec::new();
    for _ in 0..500 {
        let started = Instant::now();
        viewport.handle(Transition::LineDown);
        let _ = viewport.layout(120, 40);
        samples.push(started.elapsed().as_micros());
    }

    let p95 = p95_us(&samples);
    assert!(p95 <= 100, "p95_us={p95}");
}
