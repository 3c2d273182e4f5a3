//! Naive primality testing — deliberately inefficient to consume CPU.

/// Trial division by odd candidates up to the square root.
pub fn is_prime(n: u64) -> bool {
    if n < 2 {
        return false;
    }
    if n == 2 {
        return true;
    }
    if n % 2 == 0 {
        return false;
    }

    let mut i = 3;
    while i * i <= n {
        if n % i == 0 {
            return false;
        }
        i += 2;
    }
    true
}

/// All primes in `[start, end)`.
pub fn primes_in_range(start: u64, end: u64) -> Vec<u64> {
    (start..end).filter(|&n| is_prime(n)).collect()
}
