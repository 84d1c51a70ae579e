//! Property-based invariant tests for template compilation and line layout.
//!
//! Verifies:
//! 1. A flex line is exactly as wide as the target whenever the rest fits
//! 2. Flex resolves to zero once the rest is wider than the target
//! 3. Percentage clamping is idempotent and always lands in 0..=100
//! 4. Templates with two `=` markers never compile
//! 5. Rendering never writes past the line buffer's capacity
//! 6. Bar fill never exceeds the bar and grows with the percentage

use lanebar::layout::{clamp_percentage, filled_columns};
use lanebar::{CompileError, Format, LineBuffer, measure, render_line};
use proptest::prelude::*;

// ── Strategy helpers ──────────────────────────────────────────────────

fn arb_literal() -> impl Strategy<Value = String> {
    "[a-z |:\\[\\]%-]{1,6}"
}

fn arb_title() -> impl Strategy<Value = String> {
    "[A-Za-z0-9 ._-]{0,24}"
}

/// A directive or literal that takes a fixed or measured width.
fn arb_sized_piece() -> impl Strategy<Value = String> {
    prop_oneof![
        arb_literal(),
        Just("$t".to_owned()),
        Just("$p".to_owned()),
        (0usize..30).prop_map(|n| format!("${n}t")),
        (0usize..10).prop_map(|n| format!("${n}p")),
        (1usize..40, prop_oneof![Just('#'), Just('='), Just('.')])
            .prop_map(|(n, fill)| format!("${n}b{fill}")),
    ]
}

fn arb_flex_piece() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("$=t".to_owned()),
        Just("$=p".to_owned()),
        Just("$=b#".to_owned()),
        Just("$=b ".to_owned()),
    ]
}

/// A template with exactly one flex directive somewhere among sized pieces.
fn arb_flex_template() -> impl Strategy<Value = String> {
    (
        prop::collection::vec(arb_sized_piece(), 0..6),
        arb_flex_piece(),
        any::<prop::sample::Index>(),
    )
        .prop_map(|(mut pieces, flex, at)| {
            let at = at.index(pieces.len() + 1);
            pieces.insert(at, flex);
            pieces.concat()
        })
}

fn arb_template() -> impl Strategy<Value = String> {
    prop_oneof![
        prop::collection::vec(arb_sized_piece(), 1..8).prop_map(|pieces| pieces.concat()),
        arb_flex_template(),
    ]
}

fn arb_percentage() -> impl Strategy<Value = f32> {
    prop_oneof![
        -50.0f32..150.0,
        Just(0.0),
        Just(100.0),
        Just(f32::NAN),
        Just(f32::INFINITY),
        Just(f32::NEG_INFINITY),
    ]
}

// ── Properties ────────────────────────────────────────────────────────

proptest! {
    #[test]
    fn flex_line_fills_the_target(
        template in arb_flex_template(),
        title in arb_title(),
        percentage in arb_percentage(),
        extra in 0usize..60,
    ) {
        let format = Format::compile(&template).unwrap();
        let taken = measure(&format, &title, percentage, 0).taken;
        let width = (taken + extra).max(2);

        let m = measure(&format, &title, percentage, width);
        prop_assert_eq!(m.total(), width);

        let mut line = LineBuffer::for_width(width);
        render_line(&format, &title, percentage, width, &mut line);
        prop_assert_eq!(line.columns(), width);
    }

    #[test]
    fn flex_is_zero_when_the_rest_overflows(
        template in arb_flex_template(),
        title in arb_title(),
        percentage in arb_percentage(),
        short in 0usize..60,
    ) {
        let format = Format::compile(&template).unwrap();
        let taken = measure(&format, &title, percentage, 0).taken;
        let width = taken.saturating_sub(short + 1);

        let m = measure(&format, &title, percentage, width);
        prop_assert_eq!(m.flex, 0);
        prop_assert_eq!(m.taken, taken);
    }

    #[test]
    fn clamp_is_idempotent(value in any::<f32>()) {
        let once = clamp_percentage(value);
        prop_assert!((0.0..=100.0).contains(&once));
        prop_assert_eq!(clamp_percentage(once), once);
    }

    #[test]
    fn two_flex_markers_never_compile(
        before in prop::collection::vec(arb_sized_piece(), 0..4),
        first in arb_flex_piece(),
        between in prop::collection::vec(arb_sized_piece(), 0..4),
        second in arb_flex_piece(),
    ) {
        let template = [before.concat(), first, between.concat(), second].concat();
        let err = Format::compile(&template).unwrap_err();
        let is_multiple_flex = matches!(err, CompileError::MultipleFlexFields { .. });
        prop_assert!(is_multiple_flex, "{template:?}: {err}");
    }

    #[test]
    fn lines_never_exceed_capacity(
        template in arb_template(),
        title in "\\PC{0,40}",
        percentage in arb_percentage(),
        width in 0usize..200,
        capacity in 0usize..300,
    ) {
        let format = Format::compile(&template).unwrap();
        let mut line = LineBuffer::new(capacity);
        render_line(&format, &title, percentage, width, &mut line);
        prop_assert!(line.as_str().len() <= capacity);
    }

    #[test]
    fn bar_fill_is_bounded_and_monotonic(
        width in 0usize..500,
        a in arb_percentage(),
        b in arb_percentage(),
    ) {
        let (lo, hi) = {
            let (a, b) = (clamp_percentage(a), clamp_percentage(b));
            if a <= b { (a, b) } else { (b, a) }
        };
        prop_assert!(filled_columns(width, hi) <= width);
        prop_assert!(filled_columns(width, lo) <= filled_columns(width, hi));
        prop_assert_eq!(filled_columns(width, 100.0), width);
        prop_assert_eq!(filled_columns(width, 0.0), 0);
    }
}
