use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use swissknife_types::{ErrorKind, FetchResult, Reading, Snapshot, SourceId};

/// A snapshot shaped like a real deployment: the four fixed feeds plus stops.
fn snapshot_with_stops(stops: usize) -> Snapshot {
    let mut builder = Snapshot::builder()
        .tick(42)
        .result(
            SourceId::currency_usd(),
            Reading::new(950.5).with_attribute("date", "2024-01-01T03:00:00.000Z"),
        )
        .result(SourceId::currency_uf(), Reading::new(36_789.12))
        .result(
            SourceId::transit_status(),
            Reading::new("Operational").with_attribute("issues", 0),
        )
        .result(
            SourceId::seismic(),
            FetchResult::failure(ErrorKind::EmptyResult, "no seismic events reported"),
        );

    for i in 0..stops {
        let buses: Vec<serde_json::Value> = (0..5)
            .map(|b| serde_json::json!({"id": format!("5{:02}", b), "arrival_time": "Menos de 5 min"}))
            .collect();
        builder = builder.result(
            SourceId::transit_stop(&format!("PA{}", i)),
            Reading::new(buses.len()).with_attribute("buses", serde_json::Value::Array(buses)),
        );
    }

    builder.build()
}

fn bench_export(c: &mut Criterion) {
    let mut group = c.benchmark_group("snapshot_export");

    for stops in [0, 5, 50] {
        let snapshot = snapshot_with_stops(stops);
        let json = serde_json::to_string_pretty(&snapshot).unwrap();
        group.throughput(Throughput::Bytes(json.len() as u64));

        group.bench_with_input(BenchmarkId::from_parameter(stops), &snapshot, |b, snapshot| {
            b.iter(|| black_box(serde_json::to_string_pretty(snapshot).unwrap()));
        });
    }
    group.finish();
}

fn bench_import(c: &mut Criterion) {
    let json = serde_json::to_string(&snapshot_with_stops(50)).unwrap();

    c.bench_function("snapshot_import_50_stops", |b| {
        b.iter(|| black_box(serde_json::from_str::<Snapshot>(&json).unwrap()));
    });
}

criterion_group!(benches, bench_export, bench_import);
criterion_main!(benches);
