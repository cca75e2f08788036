/// Slot counts a table may have, ascending. Each entry is the smallest prime
/// greater than twice the previous one.
const PRIMES: [u64; 61] = [
    3,
    7,
    17,
    37,
    79,
    163,
    331,
    673,
    1361,
    2729,
    5471,
    10949,
    21911,
    43853,
    87719,
    175447,
    350899,
    701819,
    1403641,
    2807303,
    5614657,
    11229331,
    22458671,
    44917381,
    89834777,
    179669557,
    359339171,
    718678369,
    1437356741,
    2874713497,
    5749427029,
    11498854069,
    22997708177,
    45995416409,
    91990832831,
    183981665689,
    367963331389,
    735926662813,
    1471853325643,
    2943706651297,
    5887413302609,
    11774826605231,
    23549653210463,
    47099306420939,
    94198612841897,
    188397225683869,
    376794451367743,
    753588902735509,
    1507177805471059,
    3014355610942127,
    6028711221884317,
    12057422443768697,
    24114844887537407,
    48229689775074839,
    96459379550149709,
    192918759100299439,
    385837518200598889,
    771675036401197787,
    1543350072802395601,
    3086700145604791213,
    6173400291209582429,
];

/// Returns the smallest table capacity that can hold `required` elements.
///
/// Zero needs no storage at all. Returns `None` when no entry is large enough
/// or the entry does not fit in a `usize`.
pub(crate) fn capacity_for(required: usize) -> Option<usize> {
    if required == 0 {
        return Some(0);
    }
    PRIMES
        .iter()
        .copied()
        .find(|&prime| prime >= required as u64)
        .and_then(|prime| usize::try_from(prime).ok())
}

/// Returns the largest table capacity not exceeding `limit`.
pub(crate) fn largest_at_most(limit: usize) -> usize {
    PRIMES
        .iter()
        .copied()
        .take_while(|&prime| prime <= limit as u64)
        .last()
        .and_then(|prime| usize::try_from(prime).ok())
        .unwrap_or(0)
}
