use num_traits::PrimInt;

/// Monotonic id source. Panics on overflow rather than reusing ids.
pub struct Counter<T>(T);

impl<T: PrimInt> Counter<T> {
    pub fn new() -> Self {
        Self(T::zero())
    }

    pub fn next(&mut self) -> T {
        let result = self.0;
        self.0 = self.0.checked_add(&T::one()).unwrap();
        result
    }
}

#[cfg(test)]
mod tests {
    use super::Counter;

    #[test]
    fn counts_from_zero() {
        let mut counter: Counter<u16> = Counter::new();
        assert_eq!(counter.next(), 0);
        assert_eq!(counter.next(), 1);
        assert_eq!(counter.next(), 2);
    }
}
