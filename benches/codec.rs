#![allow(unused)]
extern crate cilbridge;

use criterion::{criterion_group, criterion_main, Criterion, Throughput};
use std::hint::black_box;

use cilbridge::backend::{ForeignInstruction, ForeignModule, ForeignOperand};
use cilbridge::prelude::*;

/// Builds a repetitive counting body: constants, locals, arithmetic and a backward
/// conditional branch per block, closed by a return.
fn sample_stream(blocks: usize) -> Vec<ForeignInstruction> {
    let mut ops = Vec::new();
    for index in 0..blocks {
        ops.push((Op::LdcI4, ForeignOperand::Int32(index as i32)));
        ops.push((Op::Stloc, ForeignOperand::UInt16(0)));
        ops.push((Op::Ldloc, ForeignOperand::UInt16(0)));
        ops.push((Op::LdcI4, ForeignOperand::Int32(1)));
        ops.push((Op::Add, ForeignOperand::None));
        ops.push((Op::Stloc, ForeignOperand::UInt16(0)));
        ops.push((Op::Ldloc, ForeignOperand::UInt16(0)));
        ops.push((Op::LdcI4, ForeignOperand::Int32(100)));
        ops.push((Op::Blt, ForeignOperand::Target(0)));
    }
    ops.push((Op::Ret, ForeignOperand::None));

    let mut instructions = Vec::with_capacity(ops.len());
    let mut offset = 0;
    let mut block_starts = Vec::new();
    for (index, (op, operand)) in ops.into_iter().enumerate() {
        if index % 9 == 0 {
            block_starts.push(offset);
        }
        let instruction = ForeignInstruction::new(offset, op, operand);
        offset = instruction.next_offset();
        instructions.push(instruction);
    }

    // Each conditional branch targets its own block leader.
    for (block, start) in block_starts.iter().enumerate().take(blocks) {
        instructions[block * 9 + 8].operand = ForeignOperand::Target(*start);
    }
    instructions
}

fn bench_codec(c: &mut Criterion) {
    let module = ForeignModule::new("bench");
    let stream = sample_stream(256);

    let mut group = c.benchmark_group("codec");
    group.throughput(Throughput::Elements(stream.len() as u64));

    group.bench_function("decode_stream", |b| {
        b.iter(|| {
            let session = ResolveSession::new(&module);
            let decoded = decode_stream(&session, black_box(&stream)).unwrap();
            black_box(decoded)
        });
    });

    let session = ResolveSession::new(&module);
    let decoded = decode_stream(&session, &stream).unwrap();
    group.bench_function("encode_stream", |b| {
        b.iter(|| {
            let mut emitter = Emitter::new(ForeignModule::new("generated"));
            let encoded = encode_stream(black_box(&decoded), &mut emitter).unwrap();
            black_box(encoded)
        });
    });

    group.finish();
}

criterion_group!(benches, bench_codec);
criterion_main!(benches);
