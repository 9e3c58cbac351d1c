use super::{Kernel, LifeRule};
use crate::grid::Block;

fn block(rows: usize, cols: usize, cells: &[u8]) -> Block {
    Block::from_cells(rows, cols, cells.to_vec()).unwrap()
}

#[rustfmt::skip]
fn vertical_blinker() -> Block {
    block(5, 5, &[
        0, 0, 0, 0, 0,
        0, 0, 1, 0, 0,
        0, 0, 1, 0, 0,
        0, 0, 1, 0, 0,
        0, 0, 0, 0, 0,
    ])
}

#[rustfmt::skip]
fn horizontal_blinker() -> Block {
    block(5, 5, &[
        0, 0, 0, 0, 0,
        0, 0, 0, 0, 0,
        0, 1, 1, 1, 0,
        0, 0, 0, 0, 0,
        0, 0, 0, 0, 0,
    ])
}

#[test]
fn blinker_oscillates_with_period_two() {
    let rule = LifeRule;
    assert_eq!(rule.apply(&vertical_blinker()), horizontal_blinker());
    assert_eq!(rule.apply(&horizontal_blinker()), vertical_blinker());
}

#[test]
fn still_life_is_fixed() {
    #[rustfmt::skip]
    let b = block(4, 4, &[
        0, 0, 0, 0,
        0, 1, 1, 0,
        0, 1, 1, 0,
        0, 0, 0, 0,
    ]);
    assert_eq!(LifeRule.apply(&b), b);
}

#[test]
fn lonely_cell_dies() {
    #[rustfmt::skip]
    let b = block(3, 3, &[
        0, 0, 0,
        0, 1, 0,
        0, 0, 0,
    ]);
    assert_eq!(LifeRule.apply(&b), Block::new(3, 3));
}

#[test]
fn degenerate_blocks_have_no_interior() {
    let out = LifeRule.apply(&block(2, 5, &[1; 10]));
    assert_eq!(out, Block::new(2, 5));
    let out = LifeRule.apply(&Block::new(0, 0));
    assert_eq!(out, Block::new(0, 0));
}
