//! Shared access to one table from several threads.
//!
//! Readers must always observe a consistent document: every snapshot is one
//! of the states the writer produced, never a half-applied edit.

use std::io::Read;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;

use piecetable::{Bias, PieceTable};

fn assert_send_sync<T: Send + Sync>() {}

#[test]
fn table_is_send_and_sync() {
    assert_send_sync::<PieceTable>();
}

#[test]
fn readers_see_whole_edits() {
    let table = Arc::new(PieceTable::with_text("[]"));
    let done = Arc::new(AtomicBool::new(false));

    let writer = {
        let table = Arc::clone(&table);
        let done = Arc::clone(&done);
        thread::spawn(move || {
            for i in 0..200 {
                // Every state is "[" + "d," pairs + "]", so its length stays even.
                table.insert(table.len() - 1, &format!("{},", i % 10));
                if i % 7 == 0 {
                    table.undo();
                }
            }
            done.store(true, Ordering::Release);
        })
    };

    let readers: Vec<_> = (0..4)
        .map(|_| {
            let table = Arc::clone(&table);
            let done = Arc::clone(&done);
            thread::spawn(move || {
                let mut snapshots = 0usize;
                while !done.load(Ordering::Acquire) {
                    let text = table.text();
                    assert!(text.starts_with('[') && text.ends_with(']'), "torn read: {text}");
                    assert_eq!(text.len() % 2, 0, "torn read: {text}");
                    snapshots += 1;
                }
                snapshots
            })
        })
        .collect();

    writer.join().unwrap();
    for reader in readers {
        reader.join().unwrap();
    }

    let text = table.text();
    assert!(text.starts_with("[1,") && text.ends_with(']'));
    assert_eq!(table.len(), text.chars().count());
}

#[test]
fn markers_and_readers_across_threads() {
    let table = Arc::new(PieceTable::with_text("head|tail"));
    let marker = table.create_marker(5, Bias::Forward);

    let handles: Vec<_> = (0..4)
        .map(|n| {
            let table = Arc::clone(&table);
            thread::spawn(move || {
                for _ in 0..25 {
                    table.insert(0, &n.to_string());
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(table.len(), 9 + 100);
    assert_eq!(table.marker_offset(marker), Some(105));
    assert_eq!(table.text_range(104, 109), "|tail");

    let mut out = String::new();
    table.reader().read_to_string(&mut out).unwrap();
    assert_eq!(out, table.text());
}
