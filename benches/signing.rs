//! Benchmarks for the per-call hot path
//!
//! Run with: `cargo bench`
//! View results: `open target/criterion/report/index.html`

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use kraken_rest::kraken::auth::sign_request;
use kraken_rest::{Credentials, QueryArgs};

const SECRET: &str =
    "kQH5HW/8p1uGOVjbgWA7FunAmGO8lsSUXNsu3eow76sz84Q18fWxnyRzBHCd3pd5nE9qa99HAZtuZuj6F1huXg==";

fn order_args() -> QueryArgs {
    QueryArgs::new()
        .arg("ordertype", "limit")
        .arg("pair", "XBTUSD")
        .arg("price", "37500")
        .arg("type", "buy")
        .arg("volume", "1.25")
        .opt("userref", None::<String>)
}

fn benchmark_signing(c: &mut Criterion) {
    let creds = Credentials::new("key", SECRET).unwrap();
    let body = order_args().encode_with_nonce("1616492376594");

    // Keyed MAC cloned per call
    c.bench_function("credentials_sign", |b| {
        b.iter(|| creds.sign(black_box("/0/private/AddOrder"), black_box(&body), "1616492376594"))
    });

    // MAC keyed from raw bytes on every call
    let secret = b"0123456789abcdef0123456789abcdef";
    c.bench_function("sign_request", |b| {
        b.iter(|| {
            sign_request(
                black_box("/0/private/AddOrder"),
                black_box(&body),
                "1616492376594",
                secret,
            )
        })
    });
}

fn benchmark_encoding(c: &mut Criterion) {
    let args = order_args();
    c.bench_function("encode_with_nonce", |b| {
        b.iter(|| black_box(&args).encode_with_nonce("1616492376594"))
    });
}

criterion_group!(benches, benchmark_signing, benchmark_encoding);
criterion_main!(benches);
