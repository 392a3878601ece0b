// tests/test_tessellation.rs
// Ribbon geometry invariants

use bigline::style::{ResolvedSymbol, Symbol, UvRect};
use bigline::vector::{validate_arrays, LineTessellator, MAX_VERTICES};
use bigline::RenderError;
use glam::Vec2;

fn zigzag(n: usize) -> Vec<Vec2> {
    (0..n)
        .map(|i| Vec2::new(i as f32 * 3.0, if i % 2 == 0 { 0.0 } else { 2.0 }))
        .collect()
}

#[test]
fn two_point_line_round_trip() {
    let symbol = Symbol::solid(6.0, Default::default());
    let mut t = LineTessellator::new(0.0, 4.0);
    t.add_line(&[Vec2::ZERO, Vec2::new(25.0, 0.0)], &ResolvedSymbol::solid(&symbol));

    let arrays = t.arrays();
    assert_eq!(arrays.vertex_count(), 4);
    assert_eq!(arrays.element_count(), 6);

    // Ribbon width equals the line width at both ends
    for end in [0, 2] {
        let left = Vec2::from(arrays.normal_array[end].normal);
        let right = Vec2::from(arrays.normal_array[end + 1].normal);
        assert!(((left - right).length() - 6.0).abs() < 1e-5);
        assert_eq!(arrays.normal_array[end].corner, 1.0);
        assert_eq!(arrays.normal_array[end + 1].corner, -1.0);
    }
    assert_eq!(arrays.normal_array[2].linesofar, 25.0);
}

#[test]
fn duplicate_points_emit_no_degenerate_segment() {
    let symbol = Symbol::solid(2.0, Default::default());
    let resolved = ResolvedSymbol::solid(&symbol);

    let mut clean = LineTessellator::default();
    clean.add_line(&[Vec2::ZERO, Vec2::new(5.0, 0.0), Vec2::new(5.0, 5.0)], &resolved);

    let mut dup = LineTessellator::default();
    dup.add_line(
        &[Vec2::ZERO, Vec2::ZERO, Vec2::new(5.0, 0.0), Vec2::new(5.0, 5.0)],
        &resolved,
    );

    assert_eq!(dup.arrays(), clean.arrays());
    assert!(dup
        .arrays()
        .normal_array
        .iter()
        .all(|n| n.normal[0].is_finite() && n.normal[1].is_finite()));
}

#[test]
fn indices_stay_in_bounds_across_lines() {
    let dashed = Symbol::dashed(3.0, &[4.0, 4.0]);
    let textured = ResolvedSymbol {
        symbol: &dashed,
        tex_coord: Some(UvRect { x: 0.0, y: 0.0, w: 1.0, h: 1.0 }),
    };
    let mut t = LineTessellator::default();
    for n in 2..20 {
        t.add_line(&zigzag(n), &textured);
    }
    let arrays = t.arrays();
    assert_eq!(arrays.element_count() % 3, 0);
    assert!(arrays
        .element_array
        .iter()
        .all(|&i| (i as usize) < arrays.vertex_count()));
    assert_eq!(arrays.normal_array.len(), arrays.vertex_count());
    assert_eq!(arrays.style_array.len(), arrays.vertex_count());
    assert!(validate_arrays(arrays).is_ok());
}

#[test]
fn arrays_are_idempotent() {
    let symbol = Symbol::default();
    let mut t = LineTessellator::default();
    t.add_line(&zigzag(7), &ResolvedSymbol::solid(&symbol));
    let first = t.arrays().clone();
    let second = t.arrays().clone();
    assert_eq!(first, second);
}

#[test]
fn oversized_batch_is_rejected() {
    let symbol = Symbol::default();
    let resolved = ResolvedSymbol::solid(&symbol);
    let mut t = LineTessellator::default();
    // 2 vertices per point
    let line: Vec<Vec2> = (0..=MAX_VERTICES / 2).map(|i| Vec2::new(i as f32, 0.0)).collect();
    t.add_line(&line, &resolved);
    assert!(t.arrays().vertex_count() > MAX_VERTICES);
    assert!(matches!(
        validate_arrays(t.arrays()),
        Err(RenderError::IndexOverflow { .. })
    ));
}
