use tsetlini::container::BitRow;
use tsetlini::kernel::{evaluate_range_bitwise, evaluate_range_classic};
use tsetlini::rng::IntGen;
use tsetlini::state::TaState;
use tsetlini::ClassifierClassic;

criterion::criterion_main!(benches);
criterion::criterion_group! {
    name = benches;
    config = criterion::Criterion::default()
        .without_plots()
        .noise_threshold(3.0)
        .significance_level(0.01)
        .sample_size(10)
        .measurement_time(std::time::Duration::from_secs(1));
    targets =
        evaluating_classic_clause_range,
        evaluating_bitwise_clause_range,
        fitting_noisy_xor_classifier,
        drawing_integer_prng_stream,
}

fn classic_fixture() -> (TaState, Vec<u8>) {
    let mut igen = IntGen::new(7);
    let state = TaState::init(500, 256, 1, false, false, &mut igen).unwrap();
    let x = (0..256).map(|i| (i % 3 == 0) as u8).collect();
    (state, x)
}

fn evaluating_classic_clause_range(c: &mut criterion::Criterion) {
    let (state, x) = classic_fixture();
    let mut out = vec![0u8; state.number_of_clauses()];
    c.bench_function("evaluate 500 classic clauses over 256 features", |b| {
        b.iter(|| {
            evaluate_range_classic(&state.counters, 0, out.len(), &x, 16, false, None, &mut out);
        })
    });
}

fn evaluating_bitwise_clause_range(c: &mut criterion::Criterion) {
    let mut igen = IntGen::new(7);
    let state = TaState::init(500, 256, 1, true, false, &mut igen).unwrap();
    let x_bytes: Vec<u8> = (0..256).map(|i| (i % 3 == 0) as u8).collect();
    let x_bits = BitRow::from_bits(&x_bytes).unwrap();
    let mut out = vec![0u8; state.number_of_clauses()];
    c.bench_function("evaluate 500 bitwise clauses over 256 features", |b| {
        b.iter(|| {
            evaluate_range_bitwise(
                state.signs.as_ref().unwrap(),
                0,
                out.len(),
                x_bits.blocks(),
                64,
                false,
                None,
                &mut out,
            );
        })
    });
}

fn fitting_noisy_xor_classifier(c: &mut criterion::Criterion) {
    let base_x = [vec![0u8, 0, 1], vec![0, 1, 0], vec![1, 0, 0], vec![1, 1, 1]];
    let base_y = [0i32, 1, 1, 0];
    let mut x = Vec::new();
    let mut y = Vec::new();
    for _ in 0..200 {
        x.extend(base_x.iter().cloned());
        y.extend(base_y.iter().copied());
    }
    c.bench_function("fit 5 epochs over 800 samples", |b| {
        b.iter(|| {
            let mut clf =
                ClassifierClassic::new(r#"{"clauses_per_label": 8, "threshold": 5, "s": 3.0, "random_state": 1}"#)
                    .unwrap();
            clf.fit(&x, &y, None, 5).unwrap();
        })
    });
}

fn drawing_integer_prng_stream(c: &mut criterion::Criterion) {
    c.bench_function("draw 100k integer PRNG values", |b| {
        b.iter(|| {
            let mut igen = IntGen::new(1);
            let mut acc = 0u64;
            for _ in 0..100_000 {
                acc = acc.wrapping_add(igen.next() as u64);
            }
            acc
        })
    });
}
