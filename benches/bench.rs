use criterion::{criterion_group, criterion_main, Criterion};
use modulemd::ModuleIndex;

fn stream_doc(module: &str, stream: &str) -> String {
    format!(
        "---\ndocument: modulemd\nversion: 2\ndata:\n  name: {module}\n  stream: \"{stream}\"\n  summary: summary\n  description: description\n  license:\n    module:\n    - MIT\n  dependencies:\n  - buildrequires:\n      platform:\n      - \"{stream}\"\n    requires:\n      platform:\n      - \"{stream}\"\n...\n"
    )
}

fn representative_multidoc_stream(modules: usize, streams_per_module: usize) -> String {
    let mut out = String::new();
    for m in 0..modules {
        for s in 0..streams_per_module {
            out.push_str(&stream_doc(&format!("module{m}"), &s.to_string()));
        }
    }
    out
}

pub fn codec(c: &mut Criterion) {
    let source = representative_multidoc_stream(50, 4);

    c.bench_function("parse representative multi-document stream", |b| {
        b.iter(|| {
            let mut index = ModuleIndex::new();
            index.update_from_str(&source, true).unwrap()
        })
    });

    let index = {
        let mut index = ModuleIndex::new();
        index.update_from_str(&source, true).unwrap();
        index
    };

    c.bench_function("emit representative multi-document stream", |b| {
        b.iter(|| index.dump_to_string().unwrap())
    });
}

criterion_group!(benches, codec);
criterion_main!(benches);
