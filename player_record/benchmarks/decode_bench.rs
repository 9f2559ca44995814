use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use player_record::fixture::{compound, encode_record, gzip, player_tree, string, FixtureWorld};
use player_record::{resolve_player_state, PlayerId, RecordDecoder, TagKind, TagList, TagValue};

/// A record padded with an inventory of `items` stacks, the part of real
/// records that dominates their size.
fn padded_record(items: usize) -> Vec<u8> {
    let mut tree = player_tree(
        [120.5, 64.0, -300.25],
        0,
        FixtureWorld::Uuid {
            most: 0x1111,
            least: 0x2222,
        },
    );
    let stacks = (0..items)
        .map(|slot| {
            compound([
                ("id", string("minecraft:cobblestone")),
                ("Slot", TagValue::Int(slot as i32)),
                ("Count", TagValue::Int(64)),
            ])
        })
        .collect();
    if let TagValue::Compound(entries) = &mut tree {
        entries.insert(
            "Inventory".to_string(),
            TagValue::List(TagList::new(TagKind::Compound, stacks).expect("homogeneous")),
        );
    }
    gzip(&encode_record("", &tree))
}

fn bench_decode(c: &mut Criterion) {
    let mut group = c.benchmark_group("record");
    let decoder = RecordDecoder::new();
    let player = PlayerId::from_u128(0xfeed);

    for items in [0usize, 36, 256, 2048] {
        let bytes = padded_record(items);
        group.throughput(Throughput::Bytes(bytes.len() as u64));
        group.bench_with_input(
            BenchmarkId::new("decode_resolve", items),
            &bytes,
            |b, bytes| {
                b.iter(|| {
                    let tree = decoder.decode_bytes(bytes).expect("decode");
                    resolve_player_state(&tree, 0, player).expect("resolve")
                })
            },
        );
    }

    group.finish();
}

criterion_group!(decode_benches, bench_decode);
criterion_main!(decode_benches);
