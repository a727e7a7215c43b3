//! Benchmarks for srcmd decoding and encoding
//!
//! Run with: cargo bench -p srcmd-core --bench codec_benchmark

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use pulldown_cmark::{Options, Parser as MdParser};
use srcmd_core::{decode, encode, EncodeOptions};

const HEADER: &str = r#"<!-- srcbook:{"language":"javascript"} -->

# Benchmark notebook

<details>
  <summary>package.json</summary>

```json
{
  "type": "module",
  "dependencies": {
    "lodash": "^4.17.21"
  }
}
```
</details>
"#;

/// One markdown section followed by one code cell.
const SECTION: &str = r#"
## Section

This is a paragraph with *emphasis*, **strong text**, and `inline code`.
It demonstrates prose between code cells.

- First item
- Second item

<details open>
  <summary>file.mjs</summary>

```javascript
import _ from 'lodash';

export function fibonacci(n) {
  return n < 2 ? n : fibonacci(n - 1) + fibonacci(n - 2);
}

console.log(_.range(10).map(fibonacci));
```
</details>
"#;

fn notebook(sections: usize) -> String {
    let mut text = HEADER.to_string();
    for i in 0..sections {
        text.push_str(&SECTION.replace("file.mjs", &format!("file{}.mjs", i)));
    }
    text
}

fn bench_decode(c: &mut Criterion) {
    let mut group = c.benchmark_group("decode");
    let sample = notebook(4);

    group.throughput(Throughput::Bytes(sample.len() as u64));

    group.bench_function("srcmd_decode", |b| {
        b.iter(|| {
            let decoded = decode(black_box(&sample)).unwrap();
            black_box(decoded.cells.len())
        })
    });

    group.bench_function("pulldown_events", |b| {
        b.iter(|| {
            let parser = MdParser::new_ext(black_box(&sample), Options::empty());
            let events: Vec<_> = parser.collect();
            black_box(events.len())
        })
    });

    group.finish();
}

fn bench_encode(c: &mut Criterion) {
    let mut group = c.benchmark_group("encode");
    let decoded = decode(&notebook(4)).unwrap();

    for (name, options) in [
        ("inline", EncodeOptions::inline()),
        ("external", EncodeOptions::external()),
    ] {
        group.bench_function(name, |b| {
            b.iter(|| {
                let text = encode(black_box(&decoded.cells), &decoded.metadata, options).unwrap();
                black_box(text.len())
            })
        });
    }

    group.finish();
}

fn bench_scaling(c: &mut Criterion) {
    let mut group = c.benchmark_group("scaling");

    for sections in [1, 5, 10, 20].iter() {
        let content = notebook(*sections);
        group.throughput(Throughput::Bytes(content.len() as u64));

        group.bench_with_input(
            BenchmarkId::new("round_trip", sections),
            &content,
            |b, content| {
                b.iter(|| {
                    let decoded = decode(black_box(content)).unwrap();
                    let text =
                        encode(&decoded.cells, &decoded.metadata, EncodeOptions::inline()).unwrap();
                    black_box(text.len())
                })
            },
        );
    }

    group.finish();
}

criterion_group!(benches, bench_decode, bench_encode, bench_scaling);
criterion_main!(benches);
