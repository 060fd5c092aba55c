//! Benchmarks for the placement engine.

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use colorsort::geometry::GridTransform;
use colorsort::grid::{BoardSet, GridShape};
use colorsort::{
    Board, BoardId, BoardSpec, Color, EngineConfig, Game, LevelDefinition, PieceSpec, Ray,
    Session, Shape, Vec3,
};

fn board(id: &str, size: u32, pieces: Vec<PieceSpec>) -> BoardSpec {
    BoardSpec {
        id: id.to_string(),
        rows: size,
        columns: size,
        pieces,
        ..BoardSpec::default()
    }
}

/// A 16x16 board full of dominoes next to an empty one.
fn crowded_level() -> LevelDefinition {
    let pieces = (0..16)
        .flat_map(|y| (0..8).map(move |x| (x * 2, y)))
        .enumerate()
        .map(|(i, (x, y))| PieceSpec {
            id: format!("d{i}"),
            color: Color::from(if i % 2 == 0 { "red" } else { "blue" }),
            fixed: false,
            shape: Shape::Full,
            parts: vec![(x, y), (x + 1, y)],
        })
        .collect();
    LevelDefinition {
        horizontal_spacing: 20.0,
        boards: vec![board("full", 16, pieces), board("empty", 16, Vec::new())],
        ..LevelDefinition::default()
    }
}

/// Benchmark a full press, move, release and settle cycle there and back.
fn bench_drag_cycle(c: &mut Criterion) {
    let config = EngineConfig {
        snap_duration: 0.0,
        return_duration: 0.0,
        ..EngineConfig::default()
    };
    let mut game = Game::new(config, vec![crowded_level()]);
    game.start().unwrap();
    let cell = |game: &Game, board: usize, x: i32, y: i32| {
        let at = game
            .session()
            .board(BoardId(board))
            .unwrap()
            .cell_position((x, y));
        Ray::vertical(at.x, at.y)
    };
    let home = cell(&game, 0, 0, 0);
    let away = cell(&game, 1, 4, 4);

    c.bench_function("drag_cycle", |b| {
        b.iter(|| {
            game.press(black_box(home));
            game.drag(away);
            game.release();
            game.tick(0.0);
            game.press(away);
            game.drag(home);
            game.release();
            game.tick(0.0);
        })
    });
}

/// Benchmark the spatial lookup across several large boards.
fn bench_nearest_cell(c: &mut Criterion) {
    let boards = BoardSet::new(
        (0..4)
            .map(|i| {
                Board::new(
                    BoardId(i),
                    format!("b{i}"),
                    GridTransform::new(Vec3::new(i as f32 * 70.0, 0.0, 0.0), 1.0),
                    &GridShape::Rectangle {
                        rows: 64,
                        columns: 64,
                    },
                )
            })
            .collect(),
    );
    let point = Vec3::new(150.3, 31.6, -1.0);

    c.bench_function("nearest_cell", |b| {
        b.iter(|| boards.nearest_cell(black_box(point), 1.1, |_, cell| !cell.is_occupied()))
    });
}

/// Benchmark building a crowded stage, including the initial completion pass.
fn bench_load_stage(c: &mut Criterion) {
    let level = crowded_level();
    let mut session = Session::new(EngineConfig::default());

    c.bench_function("load_stage", |b| {
        b.iter(|| session.load_stage(black_box(&level)))
    });
}

criterion_group!(
    benches,
    bench_drag_cycle,
    bench_nearest_cell,
    bench_load_stage
);
criterion_main!(benches);
