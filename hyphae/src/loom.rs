pub(crate) use self::inner::*;

#[cfg(loom)]
mod inner {
    pub(crate) use loom::{cell, sync};

    #[cfg(feature = "race-window")]
    pub(crate) use loom::thread;
}

#[cfg(not(loom))]
mod inner {
    pub(crate) use std::sync;

    #[cfg(feature = "race-window")]
    pub(crate) use std::thread;

    pub(crate) mod cell {
        #[derive(Debug)]
        pub(crate) struct UnsafeCell<T>(core::cell::UnsafeCell<T>);

        impl<T> UnsafeCell<T> {
            pub(crate) const fn new(data: T) -> UnsafeCell<T> {
                UnsafeCell(core::cell::UnsafeCell::new(data))
            }

            #[inline(always)]
            pub(crate) fn with<F, R>(&self, f: F) -> R
            where
                F: FnOnce(*const T) -> R,
            {
                f(self.0.get())
            }

            #[inline(always)]
            pub(crate) fn with_mut<F, R>(&self, f: F) -> R
            where
                F: FnOnce(*mut T) -> R,
            {
                f(self.0.get())
            }
        }
    }
}
