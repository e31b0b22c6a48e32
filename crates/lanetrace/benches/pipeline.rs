use criterion::{BatchSize, Criterion, criterion_group, criterion_main};
use lanetrace::{Engine, PipelineConfig, RawRecord};

fn synthetic(n: usize) -> Vec<RawRecord> {
    (0..n)
        .map(|i| {
            let id = format!("person-{i:04}");
            match i % 5 {
                0 => RawRecord::new(id).status("Held in Gaza"),
                1 => RawRecord::new(id)
                    .status("Released")
                    .circumstances("Released via deal")
                    .release_date(&format!("2023-11-{:02}", 24 + i % 7)),
                2 => RawRecord::new(id)
                    .status("Released")
                    .circumstances("Rescued in military operation")
                    .release_date("2024-06-08"),
                3 => RawRecord::new(id)
                    .status("Deceased")
                    .death_context("Killed in Captivity")
                    .death_date("2024-01-10"),
                _ => RawRecord::new(id)
                    .status("Deceased - Returned")
                    .death_context("Died Before/During Kidnapping")
                    .circumstances("Returned in Deal - Body")
                    .release_date("2025-02-27"),
            }
        })
        .collect()
}

fn engine() -> Engine {
    Engine::new(PipelineConfig::default()).with_fixed_now(chrono::NaiveDate::from_ymd_opt(2025, 10, 18))
}

fn bench_full_pipeline(c: &mut Criterion) {
    let mut group = c.benchmark_group("pipeline");
    for n in [50, 250, 1000] {
        let records = synthetic(n);
        group.bench_function(format!("cold_{n}"), |b| {
            b.iter_batched(
                engine,
                |mut engine| {
                    let _ = engine.run(&records).unwrap();
                },
                BatchSize::SmallInput,
            );
        });
        group.bench_function(format!("resize_{n}"), |b| {
            let mut engine = engine();
            let _ = engine.run(&records).unwrap();
            let mut width = 1200.0;
            b.iter(|| {
                width = if width > 1000.0 { 900.0 } else { 1200.0 };
                engine.set_viewport(width, 800.0);
                let _ = engine.run(&records).unwrap();
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_full_pipeline);
criterion_main!(benches);
