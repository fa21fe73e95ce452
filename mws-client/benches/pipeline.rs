//! Benchmarks for the request and response pipeline.
//!
//! Measures:
//! - Parameter finalization (timestamps, structured lists, camelization)
//! - Flat-file decoding and row parsing
//! - XML payload extraction
//! - Overhead of an active `tracing` subscriber on the pipeline
//!
//! Run with: `cargo bench --bench pipeline`

#![allow(clippy::let_underscore_must_use, reason = "Criterion benchmarks ignore results")]
#![allow(missing_docs, reason = "Benchmark functions are self-documenting")]

use std::{fmt::Write as _, hint::black_box};

use chrono::{TimeZone, Utc};
use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use mws_client::{
    marketplace::TextEncoding,
    params::{ParamKey, ParamValue, ParameterMap, Parameters, StructuredListRegistry},
    response::{FlatFileResponse, XmlResponse},
    transport::ResponseEnvelope,
};

fn list_orders_params(statuses: usize) -> Parameters {
    let statuses: Vec<ParamValue> = (0..statuses).map(|i| format!("Status{i}").into()).collect();
    Parameters::new()
        .with(ParamKey::symbol("created_after"), Utc.with_ymd_and_hms(2015, 1, 1, 0, 0, 0).unwrap())
        .with(ParamKey::symbol("order_status"), statuses)
        .with(ParamKey::symbol("marketplace_id"), vec!["ATVPDKIKX0DER", "A2EUQ1WTGCTBG2"])
        .with(ParamKey::symbol("max_results_per_page"), 100)
}

fn fees_estimate_params(requests: usize) -> Parameters {
    let list: Vec<ParamValue> = (0..requests)
        .map(|i| {
            let mut estimate = ParameterMap::new();
            estimate.insert(ParamKey::symbol("marketplace_id"), "ATVPDKIKX0DER".into());
            estimate.insert(ParamKey::symbol("id_type"), "ASIN".into());
            estimate.insert(ParamKey::symbol("id_value"), format!("B00{i:05}").into());
            estimate.insert(ParamKey::symbol("is_amazon_fulfilled"), true.into());
            estimate.into()
        })
        .collect();
    Parameters::new().with(ParamKey::symbol("fees_estimate_request_list"), list)
}

fn report_body(rows: usize) -> Vec<u8> {
    let mut body = String::from("Feed Processing Summary:\n\tProcessed\t\t10\n\tSuccessful\t\t10\n\n");
    body.push_str("sku\tasin\tprice\tquantity\ttitle\n");
    for i in 0..rows {
        let _ = writeln!(body, "SKU-{i}\tB00{i:05}\t{}.99\t{}\tWidget \"{i}\" deluxe", i % 100, i % 7);
    }
    body.into_bytes()
}

fn flat_envelope(body: Vec<u8>) -> ResponseEnvelope {
    ResponseEnvelope {
        status: 200,
        headers: vec![("Content-Type".to_owned(), "text/plain;charset=Cp1252".to_owned())],
        body: Some(body),
    }
}

fn bench_params_finalize(c: &mut Criterion) {
    let _ = tracing_subscriber::fmt().with_max_level(tracing::Level::ERROR).try_init();

    let registry = StructuredListRegistry::with_defaults();
    let mut group = c.benchmark_group("params_finalize");

    for size in [1_usize, 10, 100] {
        group.bench_with_input(BenchmarkId::new("list_orders", size), &size, |b, &size| {
            b.iter_batched(
                || list_orders_params(size),
                |params| black_box(params.finalize(&registry, &[])),
                criterion::BatchSize::SmallInput,
            );
        });

        group.bench_with_input(BenchmarkId::new("fees_estimate", size), &size, |b, &size| {
            b.iter_batched(
                || fees_estimate_params(size),
                |params| black_box(params.finalize(&registry, &[])),
                criterion::BatchSize::SmallInput,
            );
        });
    }

    group.finish();
}

fn bench_flat_file(c: &mut Criterion) {
    let mut group = c.benchmark_group("flat_file");

    for rows in [10_usize, 1_000, 10_000] {
        let body = report_body(rows);

        group.bench_with_input(BenchmarkId::new("decode", rows), &body, |b, body| {
            b.iter(|| black_box(FlatFileResponse::new(flat_envelope(body.clone()), TextEncoding::Windows1252)));
        });

        let response = FlatFileResponse::new(flat_envelope(body), TextEncoding::Windows1252);
        group.bench_with_input(BenchmarkId::new("parse", rows), &response, |b, response| {
            b.iter(|| black_box(response.parse()));
        });
        group.bench_with_input(BenchmarkId::new("parse_each", rows), &response, |b, response| {
            b.iter(|| {
                let mut count = 0_usize;
                let _ = response.parse_each(|_| count += 1);
                black_box(count)
            });
        });
    }

    group.finish();
}

fn bench_xml(c: &mut Criterion) {
    let mut body = String::from("<ListOrdersResponse><ListOrdersResult><NextToken>abc</NextToken><Orders>");
    for i in 0..500 {
        let _ = write!(body, "<Order><AmazonOrderId>902-{i}</AmazonOrderId><OrderStatus>Pending</OrderStatus></Order>");
    }
    body.push_str("</Orders></ListOrdersResult></ListOrdersResponse>");
    let envelope = ResponseEnvelope {
        status: 200,
        headers: vec![("Content-Type".to_owned(), "text/xml".to_owned())],
        body: Some(body.into_bytes()),
    };

    c.bench_function("xml_decode_500_orders", |b| {
        b.iter(|| {
            let response = XmlResponse::new(black_box(envelope.clone()));
            black_box(response.map(|r| r.next_token().map(str::to_owned)))
        });
    });
}

fn bench_with_tracing(c: &mut Criterion) {
    let mut group = c.benchmark_group("params_with_tracing");
    let registry = StructuredListRegistry::with_defaults();

    for level in [tracing::Level::ERROR, tracing::Level::TRACE] {
        group.bench_function(BenchmarkId::new("list_orders_100", level), |b| {
            let subscriber =
                tracing_subscriber::fmt().with_max_level(level).with_writer(std::io::sink).finish();
            tracing::subscriber::with_default(subscriber, || {
                b.iter_batched(
                    || list_orders_params(100),
                    |params| black_box(params.finalize(&registry, &[])),
                    criterion::BatchSize::SmallInput,
                );
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_params_finalize, bench_flat_file, bench_xml, bench_with_tracing);
criterion_main!(benches);
