use std::{
    fmt::{self, Display},
    marker::PhantomData,
    mem::{self, MaybeUninit},
    ops::Deref,
    ptr::NonNull,
};

use unsafe_libyaml as sys;

use crate::rules::values::Span;

/// Heap allocation that libyaml can keep pointers into for as long as the
/// owning parser lives.
pub(crate) struct Owned<T, Init = T> {
    ptr: NonNull<T>,
    marker: PhantomData<NonNull<Init>>,
}

impl<T> Owned<T> {
    pub fn new_uninit() -> Owned<MaybeUninit<T>, T> {
        let boxed = Box::new(MaybeUninit::<T>::uninit());
        Owned {
            ptr: unsafe { NonNull::new_unchecked(Box::into_raw(boxed)) },
            marker: PhantomData,
        }
    }

    pub unsafe fn assume_init(definitely_init: Owned<MaybeUninit<T>, T>) -> Owned<T> {
        let ptr = definitely_init.ptr;
        mem::forget(definitely_init);
        Owned {
            ptr: ptr.cast(),
            marker: PhantomData,
        }
    }
}

#[repr(transparent)]
pub(crate) struct InitPtr<T> {
    pub ptr: *mut T,
}

impl<T, Init> Deref for Owned<T, Init> {
    type Target = InitPtr<Init>;

    fn deref(&self) -> &Self::Target {
        unsafe { &*(&self.ptr as *const NonNull<T> as *const InitPtr<Init>) }
    }
}

impl<T, Init> Drop for Owned<T, Init> {
    fn drop(&mut self) {
        let _ = unsafe { Box::from_raw(self.ptr.as_ptr()) };
    }
}

/// Position reported by libyaml, zero based.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub(crate) struct Mark {
    pub index: u64,
    pub line: u64,
    pub column: u64,
}

impl Mark {
    pub fn is_unset(&self) -> bool {
        self.line == 0 && self.column == 0
    }
}

impl Display for Mark {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {} column {}", self.line + 1, self.column + 1)
    }
}

pub(crate) fn system_mark(mark: sys::yaml_mark_t) -> Mark {
    Mark {
        index: mark.index,
        line: mark.line,
        column: mark.column,
    }
}

pub(crate) fn system_span(start: sys::yaml_mark_t, end: sys::yaml_mark_t) -> Span {
    Span::new(start.index as usize, end.index as usize)
}
