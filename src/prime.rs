//! Prime numbers for sizing the node table, the level sub-tables and the operation caches.
//!
//! Candidates are first screened by trial division against the small primes and then
//! confirmed with a deterministic Miller-Rabin test, which is exact for every `u64`
//! when run with the first twelve primes as witnesses.

const SMALL_PRIMES: [u64; 12] = [2, 3, 5, 7, 11, 13, 17, 19, 23, 29, 31, 37];

fn mul_mod(a: u64, b: u64, m: u64) -> u64 {
    ((a as u128 * b as u128) % m as u128) as u64
}

fn pow_mod(mut base: u64, mut exp: u64, m: u64) -> u64 {
    let mut result = 1 % m;
    base %= m;
    while exp > 0 {
        if exp & 1 == 1 {
            result = mul_mod(result, base, m);
        }
        base = mul_mod(base, base, m);
        exp >>= 1;
    }
    result
}

fn has_easy_factors(n: u64) -> bool {
    SMALL_PRIMES.iter().any(|&p| n != p && n % p == 0)
}

fn miller_rabin(n: u64) -> bool {
    let mut d = n - 1;
    let mut s = 0;
    while d % 2 == 0 {
        d /= 2;
        s += 1;
    }

    'witness: for &a in SMALL_PRIMES.iter() {
        if a % n == 0 {
            continue;
        }
        let mut x = pow_mod(a, d, n);
        if x == 1 || x == n - 1 {
            continue;
        }
        for _ in 1..s {
            x = mul_mod(x, x, n);
            if x == n - 1 {
                continue 'witness;
            }
        }
        return false;
    }
    true
}

/// Checks whether `n` is prime.
pub fn is_prime(n: u64) -> bool {
    if n < 2 {
        return false;
    }
    if SMALL_PRIMES.contains(&n) {
        return true;
    }
    if has_easy_factors(n) {
        return false;
    }
    miller_rabin(n)
}

/// Returns the smallest prime greater than or equal to `n`.
pub fn prime_gte(n: usize) -> usize {
    if n <= 2 {
        return 2;
    }
    let mut p = n as u64 | 1;
    while !is_prime(p) {
        p += 2;
    }
    p as usize
}

/// Returns the largest prime less than or equal to `n`.
///
/// Values below 2 have no such prime and are returned unchanged.
pub fn prime_lte(n: usize) -> usize {
    if n < 3 {
        return n;
    }
    let mut p = if n % 2 == 0 { n as u64 - 1 } else { n as u64 };
    while !is_prime(p) {
        p -= 2;
    }
    p as usize
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_prime() {
        let primes: Vec<u64> = (0..50).filter(|&n| is_prime(n)).collect();
        assert_eq!(primes, vec![2, 3, 5, 7, 11, 13, 17, 19, 23, 29, 31, 37, 41, 43, 47]);
    }

    #[test]
    fn test_is_prime_large() {
        assert!(is_prime(1_000_000_007));
        assert!(is_prime(2_147_483_647));
        assert!(!is_prime(1_000_000_007 * 3));
        // Strong pseudoprime to bases 2, 3, 5 and 7.
        assert!(!is_prime(3_215_031_751));
    }

    #[test]
    fn test_prime_gte() {
        assert_eq!(prime_gte(0), 2);
        assert_eq!(prime_gte(2), 2);
        assert_eq!(prime_gte(3), 3);
        assert_eq!(prime_gte(4), 5);
        assert_eq!(prime_gte(24), 29);
        assert_eq!(prime_gte(10_000), 10_007);
    }

    #[test]
    fn test_prime_lte() {
        assert_eq!(prime_lte(1), 1);
        assert_eq!(prime_lte(2), 2);
        assert_eq!(prime_lte(4), 3);
        assert_eq!(prime_lte(28), 23);
        assert_eq!(prime_lte(29), 29);
        assert_eq!(prime_lte(20_000), 19_997);
    }
}
