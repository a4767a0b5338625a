/// [Cantor pairing function][cantor-pairing], with the first argument as the tie-breaker.
///
/// ```text
/// (a, b) -> (a + b) * (a + b + 1) / 2 + a
/// ```
///
/// Arithmetic wraps around, so the result is only suitable as a hash.
///
/// [cantor-pairing]: https://en.wikipedia.org/wiki/Pairing_function#Cantor_pairing_function
#[inline]
pub fn pair(a: u64, b: u64) -> u64 {
    let s = a.wrapping_add(b);
    let t = s.wrapping_add(1);
    // One of `s` and `s + 1` is even, so halve that one before multiplying.
    let tri = if s % 2 == 0 {
        (s / 2).wrapping_mul(t)
    } else {
        s.wrapping_mul(t / 2)
    };
    tri.wrapping_add(a)
}

/// Pairing of three values, nested as `pair(c, pair(a, b))`.
#[inline]
pub fn triple(a: u64, b: u64, c: u64) -> u64 {
    pair(c, pair(a, b))
}
