// src/recycle.rs

//! Object recycling pool.
//!
//! [`Recycler`] hands out values of a [`Reusable`] type, preferring
//! previously recycled ones over freshly generated ones. Every acquired
//! value is re-initialized before it is returned, and every recycled value
//! is torn down before it re-enters the pool.

/// A value that can be pooled: re-initialized on every acquisition and torn
/// down when returned.
pub trait Reusable {
    /// Reset the value to a clean state; called on every acquisition,
    /// whether the value is fresh or reused.
    fn initialize(&mut self);

    /// Release any held resources before the value re-enters the pool.
    fn destroy(&mut self) {}
}

/// Pool of reusable values with a caller-supplied generator.
pub struct Recycler<T: Reusable> {
    pool: Vec<T>,
    generate: Box<dyn Fn() -> T + Send + Sync>,
}

impl<T: Reusable> Recycler<T> {
    pub fn new<F>(generate: F) -> Self
    where
        F: Fn() -> T + Send + Sync + 'static,
    {
        Self {
            pool: Vec::new(),
            generate: Box::new(generate),
        }
    }

    /// Number of values currently parked in the pool.
    pub fn len(&self) -> usize {
        self.pool.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pool.is_empty()
    }

    /// Take a value from the pool, or generate one if the pool is empty;
    /// either way it is initialized before being handed out.
    pub fn acquire(&mut self) -> T {
        let mut value = self.pool.pop().unwrap_or_else(|| (self.generate)());
        value.initialize();
        value
    }

    /// Tear a value down and return it to the pool.
    pub fn recycle(&mut self, mut value: T) {
        value.destroy();
        self.pool.push(value);
    }
}
