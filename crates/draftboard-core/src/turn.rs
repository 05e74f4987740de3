// Snake-draft turn cursor.
//
// Whose turn it is is never stored: it is a pure function of how many picks
// have been made and how many managers there are.

/// Index of the manager on the clock after `picks_made` picks.
///
/// Round `r = picks_made / n` runs forward on even rounds and backward on odd
/// rounds. A manager count of zero is treated as one.
pub fn turn_index(picks_made: usize, manager_count: usize) -> usize {
    let n = manager_count.max(1);
    let round = picks_made / n;
    let slot = picks_made % n;
    if round % 2 == 0 {
        slot
    } else {
        n - 1 - slot
    }
}

/// 0-based round in which pick number `picks_made` (0-based) falls.
pub fn round_of(picks_made: usize, manager_count: usize) -> usize {
    picks_made / manager_count.max(1)
}

/// The full manager order for one round.
pub fn snake_order(round: usize, manager_count: usize) -> Vec<usize> {
    let n = manager_count.max(1);
    (0..n).map(|slot| turn_index(round * n + slot, n)).collect()
}

/// Total picks in a draft of `rounds` rounds.
pub fn total_picks(rounds: usize, manager_count: usize) -> usize {
    rounds * manager_count
}
