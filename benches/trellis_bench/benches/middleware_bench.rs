//! Middleware composition benchmarks
//!
//! Benchmarks the overhead of stacking middlewares around an endpoint.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use http::Method;
use std::sync::Arc;
use trellis::prelude::*;
use trellis::{chain, boxed};

fn passthrough(next: BoxHandler) -> BoxHandler {
    next
}

fn bench_chain_depth(c: &mut Criterion) {
    let rt = tokio::runtime::Builder::new_current_thread()
        .build()
        .expect("runtime");
    let mut group = c.benchmark_group("chain_depth");

    for depth in [0usize, 1, 3, 5, 10, 20] {
        let middlewares: Vec<BoxMiddleware> = (0..depth)
            .map(|_| Arc::new(passthrough as fn(BoxHandler) -> BoxHandler) as BoxMiddleware)
            .collect();
        let handler = chain(&middlewares, boxed(|_: Request| async { "ok" }));

        group.bench_with_input(BenchmarkId::new("layers", depth), &depth, |b, _| {
            b.iter(|| {
                let req = Request::new(Method::GET, http::Uri::from_static("/"));
                rt.block_on(handler.call(black_box(req)))
            })
        });
    }

    group.finish();
}

fn bench_standard_stack(c: &mut Criterion) {
    let rt = tokio::runtime::Builder::new_current_thread()
        .build()
        .expect("runtime");

    let mut mux = Mux::new();
    mux.layer(RequestIdLayer::new())
        .layer(Recoverer::new())
        .layer(StripSlashes::new());
    mux.get("/users/{id}", |req: Request| async move {
        url_param(&req, "id").len().to_string()
    });

    c.bench_function("standard_stack/param", |b| {
        b.iter(|| {
            let req = Request::new(Method::GET, http::Uri::from_static("/users/42/"));
            rt.block_on(mux.call(black_box(req)))
        })
    });
}

criterion_group!(benches, bench_chain_depth, bench_standard_stack);
criterion_main!(benches);
