use criterion::{black_box, criterion_group, criterion_main, Criterion};
use emu_core::cpu_65816::{ArrayBus, Cpu65816};

/// Build a bus with a small arithmetic loop at the reset vector.
fn bench_bus() -> ArrayBus {
    let mut bus = ArrayBus::new();

    // Reset vector -> $8000
    bus.poke(0x00, 0xFFFC, 0x00);
    bus.poke(0x00, 0xFFFD, 0x80);

    bus.load(
        0x00,
        0x8000,
        &[
            0xA9, 0x42, // LDA #$42
            0x8D, 0x00, 0x20, // STA $2000
            0xA2, 0x10, // LDX #$10
            0x18, // CLC
            0x69, 0x01, // ADC #$01
            0xCA, // DEX
            0xD0, 0xFB, // BNE -5
            0x4C, 0x00, 0x80, // JMP $8000
        ],
    );

    bus
}

fn cpu_65816_benchmark(c: &mut Criterion) {
    c.bench_function("cpu_65816_10k_steps", |b| {
        b.iter(|| {
            let mut cpu = Cpu65816::new(bench_bus());
            cpu.reset();
            cpu.step();
            cpu.step();
            for _ in 0..10_000 {
                black_box(cpu.step());
            }
            black_box(cpu.cycles_spent)
        })
    });
}

criterion_group!(benches, cpu_65816_benchmark);
criterion_main!(benches);
