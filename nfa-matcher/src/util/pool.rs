use std::{
    ops::{Deref, DerefMut},
    sync::Mutex,
};

/// A thread safe free list of values.
///
/// The high level search APIs on [`Regex`](crate::matcher::Regex) hide the
/// fact that a [`Cache`](crate::nfa::backtrack::Cache) is needed at all. To
/// achieve this, a pool is used to retrieve cache values in a thread safe
/// way that also permits reuse. Every such search call therefore requires a
/// mutex acquisition. This is usually fast enough to not notice, but when
/// the same matcher is shared across many threads that each run lots of
/// searches on short haystacks, the lock can become a bottleneck. In that
/// case, either clone the matcher per thread (a clone gets a fresh pool and
/// shares the read-only parts), or use the lower level `_with` APIs that
/// accept a cache explicitly.
pub(crate) struct Pool<T> {
    create: fn() -> T,
    stack: Mutex<Vec<T>>,
}

impl<T> Pool<T> {
    pub(crate) fn new(create: fn() -> T) -> Pool<T> {
        Pool { create, stack: Mutex::new(vec![]) }
    }

    /// Pops a value off the free list, creating a fresh one if the list is
    /// empty. The value returns to the list when the guard is dropped.
    pub(crate) fn get(&self) -> PoolGuard<'_, T> {
        let value = self.stack.lock().ok().and_then(|mut stack| stack.pop());
        let value = value.unwrap_or_else(|| (self.create)());
        PoolGuard { pool: self, value: Some(value) }
    }
}

impl<T> core::fmt::Debug for Pool<T> {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        f.debug_struct("Pool").finish_non_exhaustive()
    }
}

pub(crate) struct PoolGuard<'a, T> {
    pool: &'a Pool<T>,
    value: Option<T>,
}

impl<T> Deref for PoolGuard<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        self.value.as_ref().unwrap()
    }
}

impl<T> DerefMut for PoolGuard<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        self.value.as_mut().unwrap()
    }
}

impl<T> Drop for PoolGuard<'_, T> {
    fn drop(&mut self) {
        if let Some(value) = self.value.take() {
            // A poisoned lock drops the value instead of returning it.
            if let Ok(mut stack) = self.pool.stack.lock() {
                stack.push(value);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reuses_values() {
        let pool: Pool<Vec<u32>> = Pool::new(Vec::new);
        {
            let mut v = pool.get();
            v.push(42);
        }
        // The same allocation comes back, contents intact.
        let v = pool.get();
        assert_eq!(*v, vec![42]);
    }

    #[test]
    fn distinct_values_when_contended() {
        let pool: Pool<Vec<u32>> = Pool::new(Vec::new);
        let a = pool.get();
        let b = pool.get();
        assert_eq!(*a, Vec::<u32>::new());
        assert_eq!(*b, Vec::<u32>::new());
    }
}
