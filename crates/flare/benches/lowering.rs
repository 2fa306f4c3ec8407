use criterion::{Criterion, black_box, criterion_group, criterion_main};
use flare::{Delta, Node, Select, Shape, ToAst, and, any, ast, event, gt, lt, select, shape, stream};

fn wide_shape(fields: usize) -> Shape {
    (0..fields).map(|i| (format!("f{i}"), gt(i as i64))).collect()
}

fn deep_query() -> Select {
    let s = stream("weather").filtered(shape! { "season" => "summer" }).unwrap();
    let t = stream("sensors");

    let serial = (0..20).fold(s.when(shape! { "temp" => lt(0) }).unwrap(), |acc, i| {
        acc.then(
            t.when(shape! { "reading" => shape! { "value" => gt(i) } })
                .unwrap()
                .within(Delta::default().minutes(5)),
        )
    });
    let switch = s
        .when(event(shape! { "x" => lt(0.1) }).then(shape! { "x" => gt(0) }))
        .unwrap();

    select()
        .between("2017-06-01T00:00:00+00:00", "2017-06-12T00:00:00+00:00")
        .of([any([serial, switch])])
        .unwrap()
}

fn bench_shape_lowering(c: &mut Criterion) {
    let s = stream("S");
    let shape = wide_shape(64);

    c.bench_function("lower_wide_shape", |b| {
        b.iter(|| s.when(black_box(shape.clone())).unwrap())
    });
}

fn bench_and_fold(c: &mut Criterion) {
    let s = stream("S");
    let leaves: Vec<Node> = (0..256)
        .map(|i| s.when(shape! { format!("f{i}") => true }).unwrap())
        .collect();

    c.bench_function("fold_and_256", |b| {
        b.iter(|| and(black_box(leaves.clone())).unwrap())
    });
}

fn bench_render(c: &mut Criterion) {
    let query = deep_query();

    c.bench_function("query_to_value", |b| {
        b.iter(|| black_box(&query).ast().unwrap())
    });
    c.bench_function("query_to_pretty_string", |b| {
        b.iter(|| ast(black_box(&query), 2).unwrap())
    });
}

criterion_group!(lowering, bench_shape_lowering, bench_and_fold, bench_render);
criterion_main!(lowering);
