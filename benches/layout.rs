use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use std::hint::black_box;
use talent_tree_planner::{
    Blueprint, LayoutConfig, NodeBlueprint, NodeKind, TalentTree, compute_layout,
};

/// One path with `nodes` nodes fanned over five branches, dense enough to need relaxation.
fn fan_blueprint(nodes: usize) -> Blueprint {
    let mut out = vec![NodeBlueprint::new("root", NodeKind::Genesis, 1)];
    for i in 0..nodes {
        let id = format!("n{i}");
        let parent = if i < 5 {
            "root".to_string()
        } else {
            format!("n{}", i - 5)
        };
        let kind = if i % 4 == 3 { NodeKind::Minor } else { NodeKind::Keystone };
        out.push(
            NodeBlueprint::new(&id, kind, 1)
                .requires(&[parent.as_str()])
                .at((i % 5) as f32, (i / 5) as f32 * 0.4),
        );
    }
    Blueprint::single_path("bench", nodes as u32 + 1, out)
}

fn bench_layout(c: &mut Criterion) {
    let mut group = c.benchmark_group("layout");
    for size in [25usize, 100, 250] {
        let blueprint = fan_blueprint(size);
        let config = LayoutConfig::default();
        group.bench_with_input(BenchmarkId::new("relax", size), &blueprint, |b, bp| {
            b.iter(|| compute_layout(black_box(bp), black_box(&config)).unwrap())
        });
    }
    group.finish();
}

fn bench_allocation(c: &mut Criterion) {
    let blueprint = fan_blueprint(250);
    c.bench_function("allocate_all_then_reset", |b| {
        let mut tree = TalentTree::from_blueprint(&blueprint).unwrap();
        let ids: Vec<String> = tree.nodes().iter().map(|n| n.id.clone()).collect();
        b.iter(|| {
            for id in &ids {
                let _ = tree.allocate(black_box(id));
            }
            tree.reset();
        })
    });
    c.bench_function("cascade_from_root", |b| {
        let mut tree = TalentTree::from_blueprint(&blueprint).unwrap();
        let ids: Vec<String> = tree.nodes().iter().map(|n| n.id.clone()).collect();
        b.iter(|| {
            for id in &ids {
                let _ = tree.allocate(id);
            }
            black_box(tree.deallocate("root").unwrap().len())
        })
    });
}

criterion_group!(benches, bench_layout, bench_allocation);
criterion_main!(benches);
