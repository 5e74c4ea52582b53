//! Performance benchmarks for the ISA v4 VM.
//!
//! Measures `step_one_instruction` throughput (via `step`) and the
//! checkpoint-scratch-copy overhead `step_to` pays on every call.

#![allow(missing_docs)]

use criterion::{Criterion, Throughput, black_box, criterion_group, criterion_main};
use eniacvm_core::Vm;
use std::time::Duration;

/// A single row of five `inc A`s followed by a sled slot.
fn looping_vm() -> Vm {
    let mut vm = Vm::new();
    vm.ft.mark_initialized();
    vm.ft.set_row(100, [52, 52, 52, 52, 52, 99]);
    vm
}

fn bench_step(c: &mut Criterion) {
    let mut group = c.benchmark_group("step");
    group.throughput(Throughput::Elements(1));
    group.measurement_time(Duration::from_secs(5));

    group.bench_function("single_row", |b| {
        b.iter(|| {
            let mut vm = looping_vm();
            black_box(vm.step());
        });
    });

    group.finish();
}

fn bench_step_to(c: &mut Criterion) {
    let mut group = c.benchmark_group("step_to");
    group.throughput(Throughput::Elements(1));
    group.measurement_time(Duration::from_secs(5));

    group.bench_function("checkpoint_every_row", |b| {
        b.iter(|| {
            let mut vm = looping_vm();
            black_box(vm.step_to(1000));
        });
    });

    group.finish();
}

criterion_group!(benches, bench_step, bench_step_to);
criterion_main!(benches);
