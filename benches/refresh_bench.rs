use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use ratatui::Terminal;
use ratatui::backend::TestBackend;
use ratatui::layout::Rect;
use ramtop::system::differ::diff;
use ramtop::system::selection::{SelectionSet, reconcile};
use ramtop::system::snapshot::{MemorySummary, ProcessIdentity, ProcessRow, Snapshot};
use ramtop::ui::table::{self, TableView};
use ramtop::ui::theme::Theme;
use std::hint::black_box;

fn make_rows(n: usize, shift: u64) -> Vec<ProcessRow> {
    (0..n)
        .map(|i| ProcessRow {
            identity: ProcessIdentity::new(i as u32 + 1, 1_000 + i as u64),
            name: format!("proc_{i}"),
            memory_bytes: ((n - i) as u64 + 1) * 1024 + (i as u64 % 7) * shift,
            access_denied: i % 50 == 0,
        })
        .collect()
}

fn memory() -> MemorySummary {
    MemorySummary {
        total_bytes: 16 * 1024 * 1024 * 1024,
        used_bytes: 9 * 1024 * 1024 * 1024,
        available_bytes: 7 * 1024 * 1024 * 1024,
    }
}

/// Previous/current pair where a tenth of the processes exit and are replaced.
fn make_pair(n: usize) -> (Snapshot, Snapshot) {
    let previous = Snapshot::new(make_rows(n, 0), memory());
    let mut current = make_rows(n, 4096);
    for (i, row) in current.iter_mut().enumerate().filter(|(i, _)| i % 10 == 0) {
        row.identity = ProcessIdentity::new(row.identity.pid, 900_000 + i as u64);
    }
    (previous, Snapshot::new(current, memory()))
}

fn bench_diff(c: &mut Criterion) {
    let mut group = c.benchmark_group("diff_500_1000_2000");

    for size in [500usize, 1000, 2000] {
        let pair = make_pair(size);
        group.bench_with_input(BenchmarkId::from_parameter(size), &pair, |b, (prev, cur)| {
            b.iter(|| black_box(diff(black_box(Some(prev)), black_box(cur))))
        });
    }

    group.finish();
}

fn bench_reconcile(c: &mut Criterion) {
    let mut group = c.benchmark_group("reconcile_500_1000_2000");

    for size in [500usize, 1000, 2000] {
        let (previous, current) = make_pair(size);
        let selection: SelectionSet = previous.identities().step_by(3).collect();
        group.bench_with_input(
            BenchmarkId::from_parameter(size),
            &(selection, current),
            |b, (selection, current)| {
                b.iter(|| black_box(reconcile(black_box(selection), black_box(current))))
            },
        );
    }

    group.finish();
}

fn bench_snapshot_build(c: &mut Criterion) {
    let mut group = c.benchmark_group("snapshot_build_500_1000_2000");

    for size in [500usize, 1000, 2000] {
        let rows = make_rows(size, 4096);
        group.bench_with_input(BenchmarkId::from_parameter(size), &rows, |b, rows| {
            b.iter(|| black_box(Snapshot::new(black_box(rows.clone()), memory())))
        });
    }

    group.finish();
}

fn bench_table_render(c: &mut Criterion) {
    let mut group = c.benchmark_group("table_render_500_1000_2000");
    let theme = Theme::dark();

    for size in [500usize, 1000, 2000] {
        let (previous, current) = make_pair(size);
        let changes = diff(Some(&previous), &current);
        let selection: SelectionSet = current.identities().step_by(5).collect();

        group.bench_with_input(BenchmarkId::from_parameter(size), &current, |b, current| {
            b.iter(|| {
                let backend = TestBackend::new(160, 50);
                let mut terminal = Terminal::new(backend).expect("bench terminal init failed");
                let view = TableView {
                    snapshot: Some(current),
                    diff: Some(&changes),
                    selection: &selection,
                    cursor: Some(size / 2),
                    offset: size / 2,
                };
                terminal
                    .draw(|frame| {
                        table::render(frame, Rect::new(0, 0, 160, 50), black_box(&view), &theme);
                    })
                    .expect("bench draw failed");
                black_box(terminal.backend());
            })
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_diff,
    bench_reconcile,
    bench_snapshot_build,
    bench_table_render
);
criterion_main!(benches);
