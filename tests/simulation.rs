use zombie_screen::pixel::{ALIVE, DEAD, DYING, ZOMBIE};
use zombie_screen::{
    CpuGrid, GridSize, Outcome, PixelState, SeedPattern, Simulation, SimulationSettings, Texel,
};

fn settings(width: u32, height: u32, seeds: &[[u32; 2]]) -> SimulationSettings {
    let mut settings = SimulationSettings::with_size(width, height);
    settings.seeds = seeds.to_vec();
    settings
}

/// Simulation over an arbitrary starting image (alive background plus stamps).
fn synthetic(width: u32, height: u32, stamps: &[([u32; 2], Texel)]) -> Simulation<CpuGrid> {
    let size = GridSize::new(width, height).unwrap();
    let mut data: Vec<u8> = std::iter::repeat(ALIVE)
        .take(size.pixel_count())
        .flatten()
        .collect();
    for (p, t) in stamps {
        let i = size.index(p[0], p[1]) * 4;
        data[i..i + 4].copy_from_slice(t);
    }
    let grid = CpuGrid::new(size, &data).unwrap();
    let seeds = SeedPattern::from_points(size, &[]);
    Simulation::new(grid, seeds, &SimulationSettings::with_size(width, height)).unwrap()
}

fn assert_consistent(sim: &Simulation<CpuGrid>) {
    let size = sim.size();
    assert_eq!(
        sim.num_dead_pixels() + sim.num_alive_pixels(),
        size.width * size.height
    );
    assert_eq!(sim.are_all_pixels_alive(), sim.num_dead_pixels() == 0);
    let scanned = sim.snapshot().count(PixelState::Alive) as u32;
    assert_eq!(scanned, sim.num_alive_pixels());
}

#[test]
fn initial_state_is_deterministic() {
    let a = Simulation::cpu(&settings(64, 48, &[[3, 4], [60, 40]])).unwrap();
    let b = Simulation::cpu(&settings(64, 48, &[[3, 4], [60, 40]])).unwrap();
    assert_eq!(a.cpu_snapshot(), b.cpu_snapshot());
    assert_eq!(a.num_alive_pixels(), 64 * 48 - 2);
    assert_eq!(a.snapshot().state(3, 4), Some(PixelState::Dead));
    assert_eq!(a.snapshot().state(60, 40), Some(PixelState::Dead));
    assert_eq!(a.generation(), 0);
}

#[test]
fn reference_grid_seeds_one_dead_pixel() {
    let sim = Simulation::cpu(&SimulationSettings::default()).unwrap();
    assert_eq!(sim.size(), GridSize::new(640, 480).unwrap());
    assert_eq!(sim.num_alive_pixels(), 307_200 - 1);
    assert_eq!(sim.snapshot().state(320, 240), Some(PixelState::Dead));
}

#[test]
fn simulate_never_resurrects_or_cures() {
    let mut sim = Simulation::cpu(&settings(20, 20, &[[2, 2], [15, 9]])).unwrap();
    let mut previous = sim.snapshot().clone();
    for step in 0..300 {
        sim.simulate(if step < 100 { 0.3 } else { 1.0 });
        let next = sim.snapshot();
        for y in 0..20 {
            for x in 0..20 {
                let before = previous.state(x, y).unwrap();
                let after = next.state(x, y).unwrap();
                if before != PixelState::Alive {
                    assert_ne!(after, PixelState::Alive, "({x},{y}) came back to life");
                }
                if before == PixelState::Zombie {
                    assert_eq!(previous.texel(x, y), next.texel(x, y));
                }
            }
        }
        assert_consistent(&sim);
        previous = next.clone();
    }
}

#[test]
fn single_zombie_contaminates_exactly_its_moore_neighbors() {
    let mut sim = synthetic(5, 5, &[([2, 2], ZOMBIE)]);
    sim.simulate(0.0);
    for y in 0..5u32 {
        for x in 0..5u32 {
            let state = sim.snapshot().state(x, y).unwrap();
            let chebyshev = (x as i32 - 2).abs().max((y as i32 - 2).abs());
            match chebyshev {
                0 => assert_eq!(state, PixelState::Zombie),
                1 => assert_eq!(state, PixelState::Dying, "({x},{y})"),
                _ => assert_eq!(state, PixelState::Alive, "({x},{y})"),
            }
        }
    }
    assert_eq!(sim.num_alive_pixels(), 25 - 9);
}

#[test]
fn zero_speed_never_zombifies() {
    let mut sim = Simulation::cpu(&settings(10, 10, &[[5, 5]])).unwrap();
    let initial = sim.cpu_snapshot().to_vec();
    for _ in 0..1000 {
        sim.simulate(0.0);
    }
    assert_eq!(sim.snapshot().count(PixelState::Zombie), 0);
    assert_eq!(sim.cpu_snapshot(), &initial[..]);
    assert_eq!(sim.generation(), 1000);
}

#[test]
fn press_only_touches_pixels_inside_the_brush() {
    let (w, h) = (64u32, 48u32);
    let mut sim = synthetic(w, h, &[([5, 5], ZOMBIE), ([33, 24], DEAD)]);
    let before = sim.snapshot().clone();
    sim.press_screen(0.5, 0.5);
    let after = sim.snapshot();

    let aspect = w as f32 / h as f32;
    let mut killed = 0;
    for y in 0..h {
        for x in 0..w {
            let dx = ((x as f32 + 0.5) / w as f32 - 0.5) * aspect;
            let dy = (y as f32 + 0.5) / h as f32 - 0.5;
            if (dx * dx + dy * dy).sqrt() < 0.02 {
                assert_eq!(after.texel(x, y), Some(DYING));
                killed += 1;
            } else {
                assert_eq!(after.texel(x, y), before.texel(x, y), "({x},{y}) changed");
            }
        }
    }
    assert_eq!(killed, 4);
    assert_consistent(&sim);
}

#[test]
fn press_outside_the_grid_changes_nothing() {
    let mut sim = synthetic(32, 32, &[]);
    let before = sim.cpu_snapshot().to_vec();
    sim.press_screen(1.5, -0.4);
    sim.press_screen(-3.0, 0.5);
    assert_eq!(sim.cpu_snapshot(), &before[..]);
    assert!(sim.are_all_pixels_alive());
}

#[test]
fn heal_over_alive_region_reports_zero() {
    let mut sim = synthetic(20, 20, &[([0, 0], ZOMBIE)]);
    assert_eq!(sim.heal_pixels_at_position(5, 5, 6, 4), 0);
    assert_eq!(sim.heal_pixels_at_position(-30, -30, 10, 10), 0);
    assert_eq!(sim.heal_pixels_at_position(2, 2, 0, 7), 0);
    assert_consistent(&sim);
}

#[test]
fn heal_reports_every_restored_pixel() {
    let stamps = [
        ([4, 4], DEAD),
        ([5, 4], DYING),
        ([8, 6], ZOMBIE),
        ([6, 5], [0, 3, 0, 255]),
        ([7, 5], [17, 255, 0, 255]),
        ([4, 6], ZOMBIE),
        // Outside the rectangle, must survive the heal.
        ([9, 4], ZOMBIE),
        ([4, 7], DEAD),
    ];
    let mut sim = synthetic(20, 20, &stamps);
    assert_eq!(sim.heal_pixels_at_position(4, 4, 5, 3), 6);
    assert_eq!(sim.snapshot().texel(8, 6), Some(ALIVE));
    assert_eq!(sim.snapshot().state(9, 4), Some(PixelState::Zombie));
    assert_eq!(sim.snapshot().state(4, 7), Some(PixelState::Dead));
    assert_eq!(sim.num_alive_pixels(), 400 - 2);
    assert_consistent(&sim);
}

#[test]
fn heal_rectangle_is_clipped_to_the_grid() {
    let mut sim = synthetic(6, 6, &[([0, 0], DEAD), ([5, 5], DEAD), ([1, 1], ZOMBIE)]);
    assert_eq!(sim.heal_pixels_at_position(-3, -3, 5, 5), 2);
    assert_eq!(sim.snapshot().state(5, 5), Some(PixelState::Dead));
}

#[test]
fn aggregates_stay_consistent_through_mixed_play() {
    let mut sim = Simulation::cpu(&settings(40, 30, &[[10, 10], [30, 20]])).unwrap();
    for frame in 0..400u32 {
        if frame % 37 == 0 {
            sim.press_screen((frame % 40) as f32 / 40.0, 0.4);
        }
        if frame % 53 == 0 {
            sim.heal_pixels_at_position(8, 8, 5, 5);
        }
        sim.simulate(1.0);
        assert_consistent(&sim);
        let ratio = sim.num_dead_pixels() as f32 / 1200.0;
        assert!((sim.dead_pixel_ratio() - ratio).abs() < 1e-6);
    }
}

#[test]
fn ten_by_ten_scenario() {
    let mut sim = Simulation::cpu(&settings(10, 10, &[[5, 5]])).unwrap();
    assert_eq!(sim.num_alive_pixels(), 99);

    sim.simulate(1.0);
    assert_eq!(sim.snapshot().texel(5, 5), Some(ZOMBIE));
    assert_eq!(sim.num_alive_pixels(), 99);

    sim.simulate(1.0);
    assert_eq!(sim.num_alive_pixels(), 91);
    for (dx, dy) in zombie_screen::pixel::NEIGHBOR_OFFSETS {
        let (x, y) = ((5 + dx) as u32, (5 + dy) as u32);
        assert_eq!(sim.snapshot().texel(x, y), Some(DYING));
    }
}

#[test]
fn infection_eventually_loses_the_screen() {
    let mut sim = Simulation::cpu(&settings(10, 10, &[[5, 5]])).unwrap();
    // Ring k around the seed starts dying on step 2 + 256 * (k - 1).
    for _ in 0..1025 {
        sim.simulate(1.0);
    }
    assert_eq!(sim.num_alive_pixels(), 19);
    assert_eq!(sim.outcome(), Outcome::Running);

    sim.simulate(1.0);
    assert_eq!(sim.num_alive_pixels(), 0);
    assert!(sim.are_most_pixels_dead());
    assert_eq!(sim.outcome(), Outcome::Lost);
}

#[test]
fn outcome_thresholds() {
    let alive_only = synthetic(10, 10, &[]);
    assert_eq!(alive_only.outcome(), Outcome::Won);

    let mut stamps: Vec<([u32; 2], Texel)> = Vec::new();
    for i in 0..90u32 {
        stamps.push(([i % 10, i / 10], DEAD));
    }
    let ten_alive = synthetic(10, 10, &stamps);
    assert_eq!(ten_alive.num_alive_pixels(), 10);
    assert!(!ten_alive.are_most_pixels_dead());

    stamps.push(([0, 9], DEAD));
    let nine_alive = synthetic(10, 10, &stamps);
    assert!(nine_alive.are_most_pixels_dead());
    assert_eq!(nine_alive.outcome(), Outcome::Lost);
}

#[test]
fn frame_applies_heal_before_transition() {
    // A zombie next to an alive pixel: healing the zombie within the same frame
    // must keep its neighbor from being contaminated.
    let mut sim = synthetic(4, 4, &[([1, 1], ZOMBIE)]);
    sim.queue_heal(1, 1, 1, 1);
    let report = sim.step_frame(0.0);
    assert_eq!(report.healed, 1);
    assert_eq!(report.outcome, Outcome::Won);
    assert_eq!(sim.snapshot().count(PixelState::Dying), 0);
}

#[test]
fn frame_applies_press_before_transition() {
    let mut sim = synthetic(10, 10, &[]);
    sim.queue_press(0.55, 0.55);
    sim.step_frame(0.0);
    // Killed this frame, then decayed once by the transition.
    assert_eq!(sim.snapshot().texel(5, 5), Some([253, 255, 0, 255]));
}
