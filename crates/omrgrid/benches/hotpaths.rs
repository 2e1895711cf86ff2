//! Benchmarks for the scan hot paths: fiducial candidate detection and
//! full-sheet bubble classification.

use criterion::{criterion_group, criterion_main, Criterion};

use omrgrid::classify::{classify_sheet, ClassifyConfig};
use omrgrid::marker::{find_marker_candidates, MarkerDetectConfig};
use omrgrid::preprocess::to_gray;
use omrgrid::render::render_sheet;
use omrgrid::SheetLayout;

fn bench_marker_detection(c: &mut Criterion) {
    let layout = SheetLayout::default();
    let sheet = render_sheet(&layout, 100, &[]);
    let gray = to_gray(&sheet);
    let config = MarkerDetectConfig::default();

    c.bench_function("marker_candidates_full_sheet", |b| {
        b.iter(|| find_marker_candidates(&gray, &config))
    });
}

fn bench_classification(c: &mut Criterion) {
    let layout = SheetLayout::default();
    let filled: Vec<Option<char>> = (0..100)
        .map(|i| Some(layout.choices[i % layout.choices.len()]))
        .collect();
    let sheet = render_sheet(&layout, 100, &filled);
    let gray = to_gray(&sheet);
    let config = ClassifyConfig::default();

    c.bench_function("classify_100_questions", |b| {
        b.iter(|| classify_sheet(&gray, &layout, 100, &config))
    });
}

criterion_group!(benches, bench_marker_detection, bench_classification);
criterion_main!(benches);
