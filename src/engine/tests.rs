use super::*;
use futures::executor::block_on;
use futures::FutureExt;

fn blinker() -> Grid {
    Grid::from_cells(
        7,
        7,
        [(2, 3), (3, 3), (4, 3)].map(|(x, y)| (Coord::new(x, y), 0)),
    )
    .unwrap()
}

fn engine(grid: Grid) -> GenerationEngine {
    GenerationEngine::new(grid, EngineConfig::default().with_chunk_size(2)).unwrap()
}

#[test]
fn test_failed_task_keeps_previous_grid() {
    let engine = engine(blinker());
    let before = engine.snapshot();
    let target = Coord::new(3, 3);

    let result = block_on(engine.advance_with(move |snapshot: &Grid, coord| {
        if coord == target {
            Err(EngineError::InvalidCoordinate {
                x: coord.x,
                y: coord.y,
                width: snapshot.width(),
                height: snapshot.height(),
            })
        } else {
            cell::compute(snapshot, coord)
        }
    }));

    assert!(matches!(
        result,
        Err(EngineError::ComputeFailure { generation: 1, .. })
    ));
    assert_eq!(*engine.snapshot(), *before);
    assert_eq!(engine.generation(), 0);
    assert_eq!(engine.phase(), Phase::Idle);
    assert_eq!(engine.shared.in_flight.count(), 0);
}

#[test]
fn test_failure_joins_every_task_before_returning() {
    let engine = GenerationEngine::new(
        Grid::random(60, 60, 2, 0.4, Some(7)).unwrap(),
        EngineConfig::default().with_chunk_size(1),
    )
    .unwrap();
    let before = engine.snapshot();

    for round in 0..50 {
        let result = block_on(engine.advance_with(move |snapshot: &Grid, coord| {
            if (coord.x + coord.y) % 17 == round % 17 {
                Err(EngineError::InvalidConfig("injected".into()))
            } else {
                std::thread::yield_now();
                cell::compute(snapshot, coord)
            }
        }));
        assert!(result.is_err());
        assert_eq!(engine.shared.in_flight.count(), 0, "round {}", round);
        assert_eq!(engine.phase(), Phase::Idle);
    }
    assert_eq!(*engine.snapshot(), *before);
    assert_eq!(engine.generation(), 0);
}

#[test]
fn test_dropped_advance_still_commits() {
    let grid = Grid::random(400, 400, 3, 0.3, Some(11)).unwrap();
    let expected = {
        let reference = engine(grid.clone());
        reference.advance_generation().unwrap();
        let mut cells = reference.live_cells();
        cells.sort_unstable();
        cells
    };

    let engine = engine(grid);
    // one poll starts the cycle, then the future is dropped
    let _ = engine.advance().now_or_never();
    assert_eq!(engine.shared.in_flight.wait_idle(Duration::from_secs(30)), 0);

    assert_eq!(engine.generation(), 1);
    assert_eq!(engine.phase(), Phase::Idle);
    let mut cells = engine.live_cells();
    cells.sort_unstable();
    assert_eq!(cells, expected);
}

#[test]
fn test_panicking_task_is_reported() {
    let engine = engine(blinker());
    let before = engine.snapshot();

    let result = block_on(engine.advance_with(|_: &Grid, coord| -> Result<Cell> {
        if coord == Coord::new(2, 2) {
            panic!("injected fault");
        }
        Ok(Cell::new(coord, None))
    }));

    match result {
        Err(EngineError::ComputeFailure { reason, .. }) => {
            assert!(reason.contains("injected fault"), "{}", reason)
        }
        other => panic!("expected compute failure, got {:?}", other),
    }
    assert_eq!(*engine.snapshot(), *before);
}

#[test]
fn test_retry_after_failure_recomputes_same_snapshot() {
    let engine = engine(blinker());
    let failed = block_on(engine.advance_with(|_: &Grid, _| -> Result<Cell> {
        Err(EngineError::InvalidConfig("injected".into()))
    }));
    assert!(failed.is_err());

    let stats = engine.advance_generation().unwrap();
    assert_eq!(stats.generation, 1);
    assert_eq!(stats.population, 3);
    assert_eq!(stats.changed, 4);
    assert_eq!(engine.get(3, 2).unwrap(), Some(0));
    assert_eq!(engine.get(2, 3).unwrap(), None);
    assert_eq!(engine.phase(), Phase::Idle);
}

#[test]
fn test_set_does_not_touch_held_snapshot() {
    let engine = engine(blinker());
    let held = engine.snapshot();

    engine.set(0, 0, Some(0)).unwrap();
    assert_eq!(held.get(0, 0).unwrap(), None);
    assert_eq!(engine.get(0, 0).unwrap(), Some(0));

    engine.set(3, 3, None).unwrap();
    assert_eq!(held.population(), 3);
    assert_eq!(engine.snapshot().population(), 3);
}

#[test]
fn test_set_validates_input() {
    let engine = engine(blinker());
    assert!(matches!(
        engine.set(1, 1, Some(1)),
        Err(EngineError::InvalidPopulation { id: 1, count: 1 })
    ));
    assert!(matches!(
        engine.set(7, 0, Some(0)),
        Err(EngineError::InvalidCoordinate { .. })
    ));

    engine.set_populations_count(2).unwrap();
    engine.set(1, 1, Some(1)).unwrap();
    assert_eq!(engine.get(1, 1).unwrap(), Some(1));
    assert!(engine.set_populations_count(0).is_err());
}

#[test]
fn test_clear_resets_generation() {
    let engine = engine(blinker());
    engine.advance_generation().unwrap();
    assert_eq!(engine.generation(), 1);

    engine.clear();
    assert_eq!(engine.generation(), 0);
    assert!(engine.live_cells().is_empty());
    assert_eq!(engine.advance_generation().unwrap().frontier, 0);
}

#[test]
fn test_statistics_report() {
    let engine = engine(blinker());
    engine.advance_generation().unwrap();
    let report = engine.statistics();
    assert!(report.contains("Generation: 1"), "{}", report);
    assert!(report.contains("Population: 3"), "{}", report);
    assert!(report.contains("Workers: 4"), "{}", report);
}

#[test]
fn test_shutdown_when_idle() {
    let engine = engine(blinker());
    engine.advance_generation().unwrap();
    assert!(engine.shutdown().is_ok());
}

#[test]
fn test_shutdown_times_out_on_stuck_task() {
    let engine = GenerationEngine::new(
        blinker(),
        EngineConfig::default().with_shutdown_grace(Duration::from_millis(20)),
    )
    .unwrap();
    let stuck = engine.shared.in_flight.enter();

    match engine.shutdown() {
        Err(EngineError::ShutdownTimeout { outstanding, grace }) => {
            assert_eq!(outstanding, 1);
            assert_eq!(grace, Duration::from_millis(20));
        }
        other => panic!("expected shutdown timeout, got {:?}", other),
    }
    drop(stuck);
}
