//! Route lookup benchmarks
//!
//! Measures tree lookups for static, parameter, regexp and catch-all routes,
//! with and without a mount point in between.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use http::Method;
use trellis::prelude::*;
use trellis::RouteContext;

async fn ok(_: Request) -> &'static str {
    "ok"
}

/// A route table shaped like a typical REST API
fn api() -> Mux {
    let mut mux = Mux::new();
    mux.get("/", ok);
    mux.get("/health", ok);
    mux.get("/about/team", ok);
    for resource in ["users", "articles", "comments", "tags", "orders"] {
        mux.get(&format!("/{}", resource), ok);
        mux.post(&format!("/{}", resource), ok);
        mux.get(&format!("/{}/{{id}}", resource), ok);
        mux.put(&format!("/{}/{{id}}", resource), ok);
        mux.delete(&format!("/{}/{{id}}", resource), ok);
        mux.get(&format!("/{}/{{id}}/history/{{rev:[0-9]+}}", resource), ok);
    }
    mux.get("/static/*", ok);
    mux.route("/admin", |r| {
        r.get("/", ok);
        r.get("/users/{id}", ok);
        r.get("/logs/*", ok);
    });
    mux
}

fn bench_lookup(c: &mut Criterion) {
    let mux = api();
    let mut group = c.benchmark_group("lookup");

    let cases = [
        ("static", "/about/team"),
        ("param", "/articles/42"),
        ("regexp", "/orders/7/history/12"),
        ("catch_all", "/static/css/site/main.css"),
        ("mounted_param", "/admin/users/99"),
        ("miss", "/does/not/exist"),
    ];

    for (name, path) in cases {
        group.bench_with_input(BenchmarkId::new("match_route", name), &path, |b, path| {
            b.iter(|| {
                let mut ctx = RouteContext::new();
                mux.match_route(&mut ctx, &Method::GET, black_box(path))
            })
        });
    }

    group.finish();
}

fn bench_dispatch(c: &mut Criterion) {
    let rt = tokio::runtime::Builder::new_current_thread()
        .build()
        .expect("runtime");
    let mux = api();

    c.bench_function("dispatch/param", |b| {
        b.iter(|| {
            let req = Request::new(Method::GET, http::Uri::from_static("/users/12345"));
            rt.block_on(mux.call(black_box(req)))
        })
    });
}

criterion_group!(benches, bench_lookup, bench_dispatch);
criterion_main!(benches);
