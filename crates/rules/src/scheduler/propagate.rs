//! Forward flag propagation.

use crate::error::Result;
use crate::flagger::{FlagColumn, Flagger};

/// Carry every flagged cell forward onto the next `n` cells.
///
/// Triggers are the cells flagged on entry. Destinations are visited by
/// distance first, then by trigger position, and a destination that is
/// already flagged is left alone. A flag is never removed, and where two
/// triggers reach the same cell the value written first stays.
pub fn extend(flagger: &dyn Flagger, column: &mut FlagColumn, n: usize) -> Result<()> {
    if n == 0 {
        return Ok(());
    }
    let mut flagged = flagger.is_flagged_default(column)?;
    let triggers: Vec<usize> = flagged
        .iter()
        .enumerate()
        .filter_map(|(i, &f)| f.then_some(i))
        .collect();
    if triggers.is_empty() {
        return Ok(());
    }

    let original = column.clone();
    let len = column.len();
    // no destination lies more than `len` cells ahead
    for k in 1..=n.min(len) {
        for &i in &triggers {
            let dst = i + k;
            if dst >= len || flagged[dst] {
                continue;
            }
            column.copy_cell_from(&original, i, dst);
            flagged[dst] = true;
        }
    }
    Ok(())
}
