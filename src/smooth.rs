// Lengths whose only prime factors are 2, 3 and 5 ("5-smooth" or regular
// numbers). rustfft handles those sizes with its fast radix kernels, and we
// use them as padded transform lengths for linear convolutions.

const PRIMES: [usize; 3] = [2, 3, 5];

/// Lazy ascending sequence of 5-smooth numbers, starting at 1.
///
/// The classic three-pointer merge: for each prime we keep a pointer into
/// the numbers produced so far and the next multiple it would contribute.
/// Every step emits the smallest candidate and advances all the primes that
/// produced it, so duplicates like 6 = 2*3 = 3*2 come out once.
///
/// Each instance starts over from 1. The sequence ends only when the next
/// value would overflow `usize`.
pub struct SmoothNumbers {
    produced: Vec<usize>,
    pointers: [usize; 3],
    candidates: [usize; 3],
}

impl SmoothNumbers {
    pub fn new() -> SmoothNumbers {
        SmoothNumbers {
            produced: Vec::new(),
            pointers: [0; 3],
            candidates: PRIMES,
        }
    }
}

impl Default for SmoothNumbers {
    fn default() -> Self {
        SmoothNumbers::new()
    }
}

impl Iterator for SmoothNumbers {
    type Item = usize;

    fn next(&mut self) -> Option<usize> {
        if self.produced.is_empty() {
            self.produced.push(1);
            return Some(1);
        }
        let next = *self.candidates.iter().min()?;
        if next == usize::MAX {
            // a candidate overflowed on the previous step
            return None;
        }
        self.produced.push(next);
        for (i, prime) in PRIMES.iter().enumerate() {
            if self.candidates[i] == next {
                self.pointers[i] += 1;
                self.candidates[i] = self.produced[self.pointers[i]]
                    .checked_mul(*prime)
                    .unwrap_or(usize::MAX);
            }
        }
        Some(next)
    }
}

/// Smallest 5-smooth number `n >= target`. `target` itself is returned when
/// it already is 5-smooth; 0 maps to 1.
pub fn next_regular(target: usize) -> usize {
    SmoothNumbers::new()
        .find(|&n| n >= target)
        .unwrap_or(target)
}

/// True when `n` has no prime factor other than 2, 3 and 5.
pub fn is_smooth(mut n: usize) -> bool {
    if n == 0 {
        return false;
    }
    for p in PRIMES.iter() {
        while n % p == 0 {
            n /= p;
        }
    }
    n == 1
}
