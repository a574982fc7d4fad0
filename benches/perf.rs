use std::hint::black_box;
use std::rc::Rc;

use criterion::{Criterion, criterion_group, criterion_main};
use tui_recordtree::{
    AttributeMapping, AttributeValue, HostRecord, KeyValue, OrphanPolicy, RecordId, SearchQuery,
    SelectionMode, SortPolicy, TreeDataProvider, TreeIndex, TreeViewState, project,
    sort_descriptors,
};

#[derive(Clone)]
struct Rec {
    id: RecordId,
    code: i64,
    parent: Option<i64>,
}

impl HostRecord for Rec {
    fn record_id(&self) -> RecordId {
        self.id
    }
}

fn mapping() -> AttributeMapping<Rec> {
    AttributeMapping::<Rec>::new(
        Box::new(|r: &Rec| AttributeValue::available(KeyValue::from(r.code))),
        Box::new(|r: &Rec| match r.parent {
            Some(parent) => AttributeValue::available(KeyValue::from(parent)),
            None => AttributeValue::empty(),
        }),
        Rc::new(|r: &Rec| AttributeValue::available(format!("node {}", r.code))),
        None,
    )
}

// Ten-way fan-out: record n hangs under record n / 10.
fn records(count: i64) -> Vec<Rec> {
    (1..=count)
        .map(|code| Rec {
            id: RecordId::from_u128(u128::try_from(code).unwrap_or_default()),
            code,
            parent: (code >= 10).then_some(code / 10),
        })
        .collect()
}

fn provider(rows: &[Rec], mapping: &AttributeMapping<Rec>) -> TreeDataProvider<Rec> {
    let mut descriptors = project(rows, mapping);
    sort_descriptors(&mut descriptors, SortPolicy::FoldersFirst);
    TreeDataProvider::new(TreeIndex::materialize(
        RecordId::from_u128(0),
        descriptors,
        OrphanPolicy::Drop,
    ))
}

fn bench_materialize(c: &mut Criterion) {
    let rows = records(20_000);
    let mapping = mapping();
    c.bench_function("materialize_20k", |b| {
        b.iter(|| black_box(provider(black_box(&rows), &mapping)));
    });
}

fn bench_visible_rows(c: &mut Criterion) {
    let rows = records(20_000);
    let loader = provider(&rows, &mapping());
    c.bench_function("expand_all_rows_20k", |b| {
        b.iter(|| {
            let mut state = TreeViewState::with_capacity(SelectionMode::Single, 20_000);
            state.expand_all(&loader);
            state.ensure_rows(&loader);
            black_box(state.visible_len())
        });
    });
}

fn bench_search(c: &mut Criterion) {
    let rows = records(20_000);
    let loader = provider(&rows, &mapping());
    let mut state = TreeViewState::new(SelectionMode::Single);
    state.expand_all(&loader);
    c.bench_function("search_20k", |b| {
        b.iter(|| {
            state.set_search(&loader, SearchQuery::new(black_box("node 19")));
            black_box(state.search_matches().len())
        });
    });
}

criterion_group!(benches, bench_materialize, bench_visible_rows, bench_search);
criterion_main!(benches);
