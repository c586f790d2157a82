use criterion::{black_box, criterion_group, criterion_main, Criterion};
use strided_tensor::Tensor;

fn bench_elementwise(c: &mut Criterion) {
    let a = Tensor::<f64>::arange(1 << 20).reshape(&[1 << 10, 1 << 10]).unwrap();
    let b = Tensor::<f64>::from_elem([1 << 10, 1 << 10], 0.5);

    c.bench_function("add_contiguous_1m", |bench| {
        bench.iter(|| black_box(&a + &b));
    });

    c.bench_function("add_transposed_1m", |bench| {
        let bt = b.swap_axes(0, 1).unwrap();
        bench.iter(|| black_box(&a + &bt));
    });

    c.bench_function("fill_parallel_1m", |bench| {
        let mut out = Tensor::<f64>::new([1 << 10, 1 << 10]);
        bench.iter(|| out.par_fill(black_box(1.0)));
    });

    c.bench_function("sum_last_axis_1m", |bench| {
        bench.iter(|| black_box(a.sum_last_axes(1).unwrap()));
    });
}

criterion_group!(benches, bench_elementwise);
criterion_main!(benches);
