//! Piece table performance benchmarks.

#![allow(clippy::semicolon_if_nothing_returned)]

use criterion::{BatchSize, Criterion, criterion_group, criterion_main};
use piecetable::{Bias, PieceTable, PieceTableOptions};
use std::hint::black_box;

fn sample_text(lines: usize) -> String {
    (0..lines)
        .map(|i| format!("Line number {i} with some content, 日本語 too\n"))
        .collect()
}

fn creation(c: &mut Criterion) {
    c.bench_function("piecetable_new", |b| {
        b.iter(|| PieceTable::new());
    });

    let long_text = sample_text(1_000);
    c.bench_function("piecetable_with_text_1k_lines", |b| {
        b.iter(|| PieceTable::with_text(black_box(&long_text)));
    });
}

fn insertion(c: &mut Criterion) {
    c.bench_function("piecetable_type_char_merged", |b| {
        let table = PieceTable::new();
        b.iter(|| {
            table.insert(table.len(), black_box("x"));
        });
    });

    c.bench_function("piecetable_type_char_unmerged", |b| {
        let options = PieceTableOptions {
            merge_typing: false,
            ..PieceTableOptions::default()
        };
        let table = PieceTable::with_options("", options);
        b.iter(|| {
            table.insert(table.len(), black_box("x"));
        });
    });

    let text = sample_text(1_000);
    c.bench_function("piecetable_insert_middle", |b| {
        b.iter_batched(
            || PieceTable::with_text(&text),
            |table| {
                for i in 0..100 {
                    table.insert(i * 300, black_box("word "));
                }
            },
            BatchSize::SmallInput,
        );
    });
}

fn erasure(c: &mut Criterion) {
    let text = sample_text(1_000);
    c.bench_function("piecetable_erase_fragmented", |b| {
        b.iter_batched(
            || {
                let table = PieceTable::with_text(&text);
                for i in 0..200 {
                    table.insert(i * 150, "ab");
                }
                table
            },
            |table| table.erase(black_box(100), black_box(20_000)),
            BatchSize::SmallInput,
        );
    });
}

fn undo_redo(c: &mut Criterion) {
    c.bench_function("piecetable_undo_redo_cycle", |b| {
        let table = PieceTable::with_text("Hello");
        table.insert(5, " World");
        table.insert(0, ">> ");
        b.iter(|| {
            table.undo();
            table.redo();
        });
    });

    c.bench_function("piecetable_undo_redo_with_markers", |b| {
        let table = PieceTable::with_text(&sample_text(100));
        for i in 0..100 {
            table.create_marker(i * 40, Bias::Forward);
        }
        table.erase(1_000, 2_000);
        b.iter(|| {
            table.undo();
            table.redo();
        });
    });
}

fn reading(c: &mut Criterion) {
    let table = PieceTable::with_text(&sample_text(1_000));
    for i in 0..100 {
        table.insert(i * 400, "edit");
    }
    let len = table.len();

    c.bench_function("piecetable_text", |b| {
        let mut buf = String::new();
        b.iter(|| {
            table.text_into(&mut buf);
            black_box(buf.len())
        });
    });

    c.bench_function("piecetable_rune_offset", |b| {
        b.iter(|| table.rune_offset(black_box(len / 2)));
    });

    c.bench_function("piecetable_read_rune_at", |b| {
        b.iter(|| table.read_rune_at(black_box(len - 10)));
    });

    c.bench_function("piecetable_lines", |b| {
        b.iter(|| table.lines());
    });
}

criterion_group!(benches, creation, insertion, erasure, undo_redo, reading);
criterion_main!(benches);
