//! Tokenizer throughput benchmarks.

#![allow(missing_docs)]

use std::hint::black_box;
use std::io::Write;

use camino::Utf8PathBuf;
use criterion::{Criterion, Throughput, criterion_group, criterion_main};
use wf_core::{count_file, tokenize};

const LINE: &str = "The quick brown fox, dressed in a top hat and monocle, jumps over the lazy dog \
                    who's napping on a sunlit hammock while eating a giant slice of pepperoni pizza.\n";

fn corpus(lines: usize) -> Vec<u8> {
    LINE.repeat(lines).into_bytes()
}

fn bench_tokenize(c: &mut Criterion) {
    let data = corpus(1_000);
    let mut group = c.benchmark_group("tokenize");
    group.throughput(Throughput::Bytes(data.len() as u64));
    group.bench_function("in_memory", |b| b.iter(|| tokenize(black_box(&data))));
    group.finish();
}

fn bench_count_file(c: &mut Criterion) {
    let data = corpus(1_000);
    let Ok(mut file) = tempfile::NamedTempFile::new() else {
        return;
    };
    if file.write_all(&data).is_err() {
        return;
    }
    let Ok(path) = Utf8PathBuf::try_from(file.path().to_path_buf()) else {
        return;
    };

    let mut group = c.benchmark_group("count_file");
    group.throughput(Throughput::Bytes(data.len() as u64));
    group.bench_function("mmap", |b| b.iter(|| count_file(black_box(&path))));
    group.finish();
}

criterion_group!(benches, bench_tokenize, bench_count_file);
criterion_main!(benches);
