#![no_std]

//! A **heap-allocated**, **growable**, **contiguous** array, `no_std` compatible.
//!
//! `DynArray<T>` owns one block of storage sized to its capacity and keeps
//! its live elements packed at the front of it, in index order.
//! Storage is allocated lazily on the first insertion and doubles whenever it
//! runs out (`0 → 1 → 2 → 4 → 8 → …`), which keeps appends amortized `O(1)`.
//!
//! On top of the usual slice API (through [`Deref`]) it offers:
//! - in-place construction with [`DynArray::emplace`] and [`DynArray::emplace_with`],
//! - checked access with [`DynArray::at`] returning [`Error::OutOfRange`],
//! - position markers ([`Cursor`], [`CursorMut`]) supporting offsets and comparison,
//! - fallible growth ([`DynArray::try_push`], [`DynArray::try_reserve`]) that leaves
//!   the array untouched on failure.
//!
//! ```rust
//! use dyn_array::{DynArray, Error};
//!
//! let mut v = DynArray::new();
//! assert!(v.is_empty());
//! assert_eq!(v.capacity(), 0);
//!
//! v.push(10);
//! v.push(20);
//! v.push(30);
//! assert_eq!(v.len(), 3);
//! assert_eq!(v.capacity(), 4);
//! assert_eq!(&v[..], &[10, 20, 30]);
//!
//! assert_eq!(v.at(1), Ok(&20));
//! assert_eq!(v.at(3), Err(Error::OutOfRange { index: 3, len: 3 }));
//!
//! v.clear();
//! assert!(v.is_empty());
//! assert_eq!(v.capacity(), 4);
//! ```

extern crate alloc;

use alloc::alloc::{Layout, alloc, dealloc, handle_alloc_error};
use alloc::string::String;
use alloc::vec::Vec;
use core::hash::Hash;
use core::iter::FusedIterator;
use core::marker::PhantomData;
use core::mem::{self, ManuallyDrop};
use core::ops::{Add, AddAssign, Deref, DerefMut, Sub};
use core::ptr::{self, NonNull};
use core::slice::{Iter, IterMut};

use tracing::{error, trace};

// ---

/// Errors returned by fallible [`DynArray`] operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// Checked access with an index outside `0..len`.
    #[error("index {index} out of range for array of length {len}")]
    OutOfRange { index: usize, len: usize },

    /// The requested capacity does not fit in a valid memory layout.
    #[error("capacity overflow")]
    CapacityOverflow,

    /// The global allocator could not provide the storage block.
    #[error("memory allocation of {} bytes failed", .layout.size())]
    AllocFailed { layout: Layout },
}

impl Error {
    /// Turns a growth failure into the matching unrecoverable failure:
    /// the allocator's OOM hook for exhaustion, a panic otherwise.
    #[cold]
    #[track_caller]
    fn raise(self) -> ! {
        match self {
            Error::AllocFailed { layout } => handle_alloc_error(layout),
            other => panic!("{other}"),
        }
    }
}

// ---

/// Types that can be built from an argument pack by [`DynArray::emplace`].
///
/// The argument pack is usually a tuple mirroring a constructor signature,
/// e.g. `(count, ch)` for a `String` made of `count` copies of `ch`.
pub trait Construct<Args>: Sized {
    fn construct(args: Args) -> Self;
}

impl<T: Default> Construct<()> for T {
    fn construct((): ()) -> Self {
        T::default()
    }
}

impl Construct<(usize, char)> for String {
    fn construct((count, ch): (usize, char)) -> Self {
        core::iter::repeat_n(ch, count).collect()
    }
}

impl<'a> Construct<&'a str> for String {
    fn construct(s: &'a str) -> Self {
        String::from(s)
    }
}

impl<T: Clone> Construct<(usize, T)> for Vec<T> {
    fn construct((count, value): (usize, T)) -> Self {
        alloc::vec![value; count]
    }
}

// ---

/// A heap-allocated, growable, contiguous array.
///
/// Slots `0..len` hold live elements, slots `len..capacity` are uninitialized.
/// The array is the only owner of its storage block.
pub struct DynArray<T> {
    ptr: NonNull<T>,
    cap: usize,
    len: usize,
    _marker: PhantomData<T>,
}

// SAFETY: the array uniquely owns its elements, like `Box<[T]>`.
unsafe impl<T: Send> Send for DynArray<T> {}
// SAFETY: shared access only ever hands out `&T`.
unsafe impl<T: Sync> Sync for DynArray<T> {}

impl<T> Default for DynArray<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for DynArray<T>
where
    T: Clone,
{
    fn clone(&self) -> Self {
        let mut cloned = Self::with_capacity(self.len);
        cloned.extend(self.iter().cloned());
        cloned
    }
}

impl<T, const M: usize> From<[T; M]> for DynArray<T> {
    fn from(value: [T; M]) -> Self {
        value.into_iter().collect()
    }
}

impl<T> DynArray<T> {
    /// Creates a new, empty `DynArray`.
    /// No storage is allocated until an element is inserted.
    ///
    /// ```
    /// use dyn_array::DynArray;
    ///
    /// let v = DynArray::<i32>::new();
    /// assert_eq!(v.len(), 0);
    /// assert_eq!(v.capacity(), 0);
    /// assert!(v.is_empty());
    /// ```
    pub const fn new() -> Self {
        Self {
            ptr: NonNull::dangling(),
            cap: 0,
            len: 0,
            _marker: PhantomData,
        }
    }

    /// Creates an empty `DynArray` with storage for exactly `capacity` elements.
    ///
    /// # Panics
    ///
    /// Panics if the capacity overflows a valid layout; aborts through
    /// [`handle_alloc_error`] if the allocator fails.
    pub fn with_capacity(capacity: usize) -> Self {
        Self::try_with_capacity(capacity).unwrap_or_else(|e| e.raise())
    }

    /// Fallible version of [`DynArray::with_capacity`].
    pub fn try_with_capacity(capacity: usize) -> Result<Self, Error> {
        let mut array = Self::new();
        if capacity > 0 {
            array.reallocate(capacity)?;
        }
        Ok(array)
    }

    /// Returns the number of live elements.
    pub const fn len(&self) -> usize {
        self.len
    }

    /// Returns `true` if the array holds no elements.
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Returns the number of slots in the current storage block.
    pub const fn capacity(&self) -> usize {
        self.cap
    }

    /// Returns a shared slice over the live elements.
    pub fn as_slice(&self) -> &[T] {
        // SAFETY: `ptr` is non-null and aligned, and `0..len` are initialized.
        unsafe { core::slice::from_raw_parts(self.ptr.as_ptr(), self.len) }
    }

    /// Returns a mutable slice over the live elements.
    pub fn as_mut_slice(&mut self) -> &mut [T] {
        // SAFETY: as in `as_slice`, and `&mut self` guarantees exclusivity.
        unsafe { core::slice::from_raw_parts_mut(self.ptr.as_ptr(), self.len) }
    }

    /// Returns an iterator over immutable references to the elements.
    pub fn iter(&self) -> Iter<'_, T> {
        self.as_slice().iter()
    }

    /// Returns an iterator over mutable references to the elements.
    pub fn iter_mut(&mut self) -> IterMut<'_, T> {
        self.as_mut_slice().iter_mut()
    }

    /// Returns a reference to the element at `index`, or
    /// [`Error::OutOfRange`] if `index >= len`.
    ///
    /// ```
    /// use dyn_array::{DynArray, Error};
    ///
    /// let v = DynArray::from([100, 200]);
    /// assert_eq!(v.at(0), Ok(&100));
    /// assert_eq!(v.at(2), Err(Error::OutOfRange { index: 2, len: 2 }));
    /// assert_eq!(v.at(999), Err(Error::OutOfRange { index: 999, len: 2 }));
    /// ```
    pub fn at(&self, index: usize) -> Result<&T, Error> {
        let len = self.len;
        self.as_slice()
            .get(index)
            .ok_or(Error::OutOfRange { index, len })
    }

    /// Mutable counterpart of [`DynArray::at`].
    pub fn at_mut(&mut self, index: usize) -> Result<&mut T, Error> {
        let len = self.len;
        self.as_mut_slice()
            .get_mut(index)
            .ok_or(Error::OutOfRange { index, len })
    }

    /// Appends an element, growing the storage if it is full.
    ///
    /// # Panics
    ///
    /// Panics on capacity overflow; aborts through [`handle_alloc_error`]
    /// if the allocator fails. Use [`DynArray::try_push`] to observe either.
    ///
    /// ```
    /// use dyn_array::DynArray;
    ///
    /// let mut v = DynArray::new();
    /// for i in 0..10 {
    ///     v.push(i);
    /// }
    /// assert_eq!(v.len(), 10);
    /// assert_eq!(v.capacity(), 16);
    /// assert_eq!(v[9], 9);
    /// ```
    pub fn push(&mut self, value: T) {
        self.emplace_with(move || value);
    }

    /// Appends an element, reporting growth failures instead of aborting.
    /// On error the array is unchanged and `value` is dropped.
    pub fn try_push(&mut self, value: T) -> Result<&mut T, Error> {
        self.try_reserve(1)?;
        // SAFETY: `try_reserve(1)` left at least one free slot.
        Ok(unsafe { self.write_next(move || value) })
    }

    /// Constructs a new element at the end from an argument pack.
    ///
    /// ```
    /// use dyn_array::DynArray;
    ///
    /// let mut v = DynArray::<String>::new();
    /// v.emplace((5_usize, 'a'));
    /// assert_eq!(v.len(), 1);
    /// assert_eq!(v[0], "aaaaa");
    /// ```
    pub fn emplace<A>(&mut self, args: A) -> &mut T
    where
        T: Construct<A>,
    {
        self.emplace_with(move || T::construct(args))
    }

    /// Constructs a new element at the end with `f`, writing its result straight
    /// into the reserved slot, and returns a reference to it.
    ///
    /// Storage is reserved before `f` runs; if `f` panics the length is unchanged.
    ///
    /// ```
    /// use dyn_array::DynArray;
    ///
    /// let mut v = DynArray::new();
    /// let last = v.emplace_with(|| [0u8; 64]);
    /// last[0] = 1;
    /// assert_eq!(v[0][0], 1);
    /// ```
    pub fn emplace_with<F>(&mut self, f: F) -> &mut T
    where
        F: FnOnce() -> T,
    {
        self.reserve(1);
        // SAFETY: `reserve(1)` left at least one free slot.
        unsafe { self.write_next(f) }
    }

    /// Removes the last element and returns it, or `None` if the array is empty.
    /// The capacity is retained.
    pub fn pop(&mut self) -> Option<T> {
        if self.len == 0 {
            return None;
        }

        self.len -= 1;
        // SAFETY: slot `len` was initialized and is now outside the live range.
        Some(unsafe { self.ptr.as_ptr().add(self.len).read() })
    }

    /// Drops all elements in index order and resets the length to zero.
    /// The storage block is kept for reuse.
    ///
    /// ```
    /// use dyn_array::DynArray;
    ///
    /// let mut v = DynArray::from([1, 2]);
    /// v.clear();
    /// assert!(v.is_empty());
    ///
    /// v.push(100);
    /// assert_eq!(v[0], 100);
    /// ```
    pub fn clear(&mut self) {
        let len = self.len;
        if len == 0 {
            return;
        }

        trace!(dropped = len, capacity = self.cap, "clearing elements");

        // Length goes first so a panicking destructor cannot lead to a double drop.
        self.len = 0;
        // SAFETY: `0..len` were initialized and are no longer reachable.
        unsafe {
            ptr::drop_in_place(ptr::slice_from_raw_parts_mut(self.ptr.as_ptr(), len));
        }
    }

    /// Ensures room for at least `additional` more elements.
    ///
    /// # Panics
    ///
    /// Panics on capacity overflow; aborts through [`handle_alloc_error`]
    /// if the allocator fails.
    pub fn reserve(&mut self, additional: usize) {
        if let Err(e) = self.try_reserve(additional) {
            e.raise()
        }
    }

    /// Ensures room for at least `additional` more elements.
    ///
    /// When growth is needed the new capacity is the larger of `len + additional`
    /// and twice the current capacity. On error nothing is modified.
    ///
    /// ```
    /// use dyn_array::{DynArray, Error};
    ///
    /// let mut v = DynArray::from([1u64, 2, 3]);
    /// assert_eq!(v.try_reserve(usize::MAX), Err(Error::CapacityOverflow));
    /// assert_eq!(v, [1, 2, 3]);
    /// ```
    pub fn try_reserve(&mut self, additional: usize) -> Result<(), Error> {
        let required = self
            .len
            .checked_add(additional)
            .ok_or(Error::CapacityOverflow)?;

        if required <= self.cap {
            return Ok(());
        }

        self.reallocate(required.max(self.cap.saturating_mul(2)))
    }

    /// Returns a cursor positioned at the first element.
    ///
    /// ```
    /// use dyn_array::DynArray;
    ///
    /// let v = DynArray::from([10, 20, 30]);
    /// let mut it = v.begin();
    /// assert_eq!(*it, 10);
    /// it.move_next();
    /// assert_eq!(*it, 20);
    /// assert_eq!(*(v.begin() + 2), 30);
    /// assert!(v.begin() + v.len() == v.end());
    /// ```
    pub fn begin(&self) -> Cursor<'_, T> {
        Cursor {
            array: self,
            index: 0,
        }
    }

    /// Returns a cursor positioned one past the last element.
    pub fn end(&self) -> Cursor<'_, T> {
        Cursor {
            array: self,
            index: self.len,
        }
    }

    /// Returns a mutable cursor positioned at the first element.
    ///
    /// ```
    /// use dyn_array::DynArray;
    ///
    /// let mut v = DynArray::from([10, 20, 30]);
    /// *v.begin_mut() = 50;
    /// assert_eq!(v[0], 50);
    /// ```
    pub fn begin_mut(&mut self) -> CursorMut<'_, T> {
        CursorMut {
            array: self,
            index: 0,
        }
    }

    /// Writes `f()` into slot `len` and makes it live.
    ///
    /// # Safety
    ///
    /// `len < cap` must hold.
    unsafe fn write_next<F>(&mut self, f: F) -> &mut T
    where
        F: FnOnce() -> T,
    {
        debug_assert!(self.len < self.cap);

        // SAFETY: the caller guarantees slot `len` lies inside the block.
        let slot = unsafe { self.ptr.as_ptr().add(self.len) };
        // SAFETY: the slot is uninitialized and exclusively ours.
        unsafe { slot.write(f()) };
        self.len += 1;

        // SAFETY: just initialized, and borrowed through `&mut self`.
        unsafe { &mut *slot }
    }

    /// Moves the live elements into a fresh block of `new_cap` slots and releases
    /// the old one. Nothing is modified if allocation fails.
    fn reallocate(&mut self, new_cap: usize) -> Result<(), Error> {
        debug_assert!(new_cap >= self.len);

        let layout = Layout::array::<T>(new_cap).map_err(|_| Error::CapacityOverflow)?;
        let new_ptr = if layout.size() == 0 {
            NonNull::dangling()
        } else {
            // SAFETY: the layout has a non-zero size.
            let raw = unsafe { alloc(layout) }.cast::<T>();
            match NonNull::new(raw) {
                Some(ptr) => ptr,
                None => {
                    error!(
                        size = layout.size(),
                        align = layout.align(),
                        "storage allocation failed"
                    );
                    return Err(Error::AllocFailed { layout });
                }
            }
        };

        trace!(
            len = self.len,
            old_capacity = self.cap,
            new_capacity = new_cap,
            "relocating storage"
        );

        // SAFETY: both blocks hold at least `len` slots and do not overlap. The moved-from
        // slots are never read again because the old block is released right after.
        unsafe {
            ptr::copy_nonoverlapping(self.ptr.as_ptr(), new_ptr.as_ptr(), self.len);
            release_block(self.ptr, self.cap);
        }

        self.ptr = new_ptr;
        self.cap = new_cap;
        Ok(())
    }
}

/// Owns a storage block and returns it to the allocator when dropped,
/// including while unwinding out of an element destructor.
struct BlockGuard<T> {
    ptr: NonNull<T>,
    cap: usize,
}

impl<T> Drop for BlockGuard<T> {
    fn drop(&mut self) {
        // SAFETY: the guard is built only from a block its owner gives up.
        unsafe { release_block(self.ptr, self.cap) };
    }
}

/// Returns a storage block of `cap` slots to the global allocator.
///
/// # Safety
///
/// `ptr` must come from [`DynArray::reallocate`] with the same `cap` (or be
/// dangling with a zero-sized layout) and must not be used afterwards.
unsafe fn release_block<T>(ptr: NonNull<T>, cap: usize) {
    let size = mem::size_of::<T>() * cap;
    if size != 0 {
        // SAFETY: this exact layout was validated when the block was allocated.
        unsafe {
            dealloc(
                ptr.as_ptr().cast(),
                Layout::from_size_align_unchecked(size, mem::align_of::<T>()),
            );
        }
    }
}

impl<T> Drop for DynArray<T> {
    fn drop(&mut self) {
        let _block = BlockGuard {
            ptr: self.ptr,
            cap: self.cap,
        };
        self.clear();
    }
}

impl<T> Deref for DynArray<T> {
    type Target = [T];

    fn deref(&self) -> &Self::Target {
        self.as_slice()
    }
}

impl<T> DerefMut for DynArray<T> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.as_mut_slice()
    }
}

impl<T> Extend<T> for DynArray<T> {
    fn extend<I>(&mut self, iter: I)
    where
        I: IntoIterator<Item = T>,
    {
        let iter = iter.into_iter();
        self.reserve(iter.size_hint().0);
        iter.for_each(|element| self.push(element));
    }
}

impl<'a, T> Extend<&'a T> for DynArray<T>
where
    T: Copy + 'a,
{
    fn extend<I>(&mut self, iter: I)
    where
        I: IntoIterator<Item = &'a T>,
    {
        self.extend(iter.into_iter().copied());
    }
}

impl<T> FromIterator<T> for DynArray<T> {
    fn from_iter<I>(iter: I) -> Self
    where
        I: IntoIterator<Item = T>,
    {
        let mut array = Self::new();
        array.extend(iter);
        array
    }
}

impl<T> IntoIterator for DynArray<T> {
    type Item = T;
    type IntoIter = IntoIter<T>;

    fn into_iter(self) -> Self::IntoIter {
        let this = ManuallyDrop::new(self);
        IntoIter {
            buf: this.ptr,
            cap: this.cap,
            start: 0,
            end: this.len,
            _marker: PhantomData,
        }
    }
}

impl<'a, T> IntoIterator for &'a DynArray<T> {
    type Item = &'a T;
    type IntoIter = Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<'a, T> IntoIterator for &'a mut DynArray<T> {
    type Item = &'a mut T;
    type IntoIter = IterMut<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter_mut()
    }
}

impl<T> PartialEq for DynArray<T>
where
    T: PartialEq,
{
    fn eq(&self, other: &Self) -> bool {
        self.as_slice() == other.as_slice()
    }
}

impl<T> PartialEq<[T]> for DynArray<T>
where
    T: PartialEq,
{
    fn eq(&self, other: &[T]) -> bool {
        self.as_slice() == other
    }
}

impl<T> PartialEq<&[T]> for DynArray<T>
where
    T: PartialEq,
{
    fn eq(&self, other: &&[T]) -> bool {
        self.as_slice() == *other
    }
}

impl<T, const M: usize> PartialEq<[T; M]> for DynArray<T>
where
    T: PartialEq,
{
    fn eq(&self, other: &[T; M]) -> bool {
        self.as_slice() == other
    }
}

impl<T> Eq for DynArray<T> where T: Eq {}

impl<T> PartialOrd for DynArray<T>
where
    T: PartialOrd,
{
    fn partial_cmp(&self, other: &Self) -> Option<core::cmp::Ordering> {
        self.as_slice().partial_cmp(other.as_slice())
    }
}

impl<T> Ord for DynArray<T>
where
    T: Ord,
{
    fn cmp(&self, other: &Self) -> core::cmp::Ordering {
        self.as_slice().cmp(other.as_slice())
    }
}

impl<T> Hash for DynArray<T>
where
    T: Hash,
{
    fn hash<H: core::hash::Hasher>(&self, state: &mut H) {
        self.as_slice().hash(state);
    }
}

impl<T> core::fmt::Debug for DynArray<T>
where
    T: core::fmt::Debug,
{
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_list().entries(self.as_slice()).finish()
    }
}

// ---

#[track_caller]
fn offset(index: usize, rhs: usize) -> usize {
    match index.checked_add(rhs) {
        Some(index) => index,
        None => panic!("cursor offset {rhs} from index {index} overflows usize"),
    }
}

#[cold]
#[track_caller]
fn past_the_end(index: usize, len: usize) -> ! {
    panic!("cursor at index {index} dereferenced outside 0..{len}")
}

/// A position inside a [`DynArray`]: the array plus an index.
///
/// The cursor borrows the array, so it cannot outlive a growth or a clear.
/// The index itself is only checked when the cursor is dereferenced;
/// dereferencing at or past the end panics.
pub struct Cursor<'a, T> {
    array: &'a DynArray<T>,
    index: usize,
}

impl<T> Clone for Cursor<'_, T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Cursor<'_, T> {}

impl<'a, T> Cursor<'a, T> {
    /// Index this cursor refers to.
    pub const fn index(&self) -> usize {
        self.index
    }

    /// Returns `true` once the cursor reached or passed the end.
    pub const fn is_end(&self) -> bool {
        self.index >= self.array.len
    }

    /// Returns the referenced element, or `None` past the end.
    pub fn get(&self) -> Option<&'a T> {
        self.array.as_slice().get(self.index)
    }

    /// Advances to the next index.
    #[track_caller]
    pub fn move_next(&mut self) -> &mut Self {
        self.index = offset(self.index, 1);
        self
    }
}

impl<T> Deref for Cursor<'_, T> {
    type Target = T;

    #[track_caller]
    fn deref(&self) -> &T {
        match self.get() {
            Some(element) => element,
            None => past_the_end(self.index, self.array.len),
        }
    }
}

impl<T> Add<usize> for Cursor<'_, T> {
    type Output = Self;

    #[track_caller]
    fn add(mut self, rhs: usize) -> Self {
        self += rhs;
        self
    }
}

impl<T> AddAssign<usize> for Cursor<'_, T> {
    #[track_caller]
    fn add_assign(&mut self, rhs: usize) {
        self.index = offset(self.index, rhs);
    }
}

impl<T> Sub for Cursor<'_, T> {
    type Output = isize;

    /// Signed distance between two cursors into the same array.
    ///
    /// # Panics
    ///
    /// Panics if the cursors belong to different arrays or if the distance
    /// does not fit in an `isize`.
    #[track_caller]
    fn sub(self, rhs: Self) -> isize {
        assert!(
            ptr::eq(self.array, rhs.array),
            "cursors belong to different arrays"
        );

        let distance = if self.index >= rhs.index {
            isize::try_from(self.index - rhs.index)
        } else {
            isize::try_from(rhs.index - self.index).map(|d| -d)
        };
        match distance {
            Ok(distance) => distance,
            Err(_) => panic!(
                "distance between cursors at {} and {} does not fit in isize",
                self.index, rhs.index
            ),
        }
    }
}

impl<T> PartialEq for Cursor<'_, T> {
    fn eq(&self, other: &Self) -> bool {
        ptr::eq(self.array, other.array) && self.index == other.index
    }
}

impl<T> Eq for Cursor<'_, T> {}

impl<T> core::fmt::Debug for Cursor<'_, T> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Cursor")
            .field("index", &self.index)
            .field("len", &self.array.len)
            .finish()
    }
}

/// A position inside a [`DynArray`] with write access to the referenced element.
pub struct CursorMut<'a, T> {
    array: &'a mut DynArray<T>,
    index: usize,
}

impl<'a, T> CursorMut<'a, T> {
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn is_end(&self) -> bool {
        self.index >= self.array.len
    }

    pub fn get(&self) -> Option<&T> {
        self.array.as_slice().get(self.index)
    }

    pub fn get_mut(&mut self) -> Option<&mut T> {
        self.array.as_mut_slice().get_mut(self.index)
    }

    /// Advances to the next index.
    #[track_caller]
    pub fn move_next(&mut self) -> &mut Self {
        self.index = offset(self.index, 1);
        self
    }

    /// Read-only cursor at the same position.
    pub fn as_cursor(&self) -> Cursor<'_, T> {
        Cursor {
            array: &*self.array,
            index: self.index,
        }
    }

    /// Consumes the cursor, keeping the borrow on the referenced element.
    pub fn into_mut(self) -> Option<&'a mut T> {
        let CursorMut { array, index } = self;
        array.as_mut_slice().get_mut(index)
    }
}

impl<T> Deref for CursorMut<'_, T> {
    type Target = T;

    #[track_caller]
    fn deref(&self) -> &T {
        match self.get() {
            Some(element) => element,
            None => past_the_end(self.index, self.array.len),
        }
    }
}

impl<T> DerefMut for CursorMut<'_, T> {
    #[track_caller]
    fn deref_mut(&mut self) -> &mut T {
        let (index, len) = (self.index, self.array.len);
        match self.get_mut() {
            Some(element) => element,
            None => past_the_end(index, len),
        }
    }
}

impl<T> Add<usize> for CursorMut<'_, T> {
    type Output = Self;

    #[track_caller]
    fn add(mut self, rhs: usize) -> Self {
        self += rhs;
        self
    }
}

impl<T> AddAssign<usize> for CursorMut<'_, T> {
    #[track_caller]
    fn add_assign(&mut self, rhs: usize) {
        self.index = offset(self.index, rhs);
    }
}

impl<T> core::fmt::Debug for CursorMut<'_, T> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("CursorMut")
            .field("index", &self.index)
            .field("len", &self.array.len)
            .finish()
    }
}

// ---

/// An iterator that moves elements out of a [`DynArray`].
///
/// Elements not yielded are dropped together with the storage block.
pub struct IntoIter<T> {
    buf: NonNull<T>,
    cap: usize,
    start: usize,
    end: usize,
    _marker: PhantomData<T>,
}

// SAFETY: same ownership as the array it came from.
unsafe impl<T: Send> Send for IntoIter<T> {}
// SAFETY: shared access only ever hands out `&T`.
unsafe impl<T: Sync> Sync for IntoIter<T> {}

impl<T> IntoIter<T> {
    /// Returns the elements not yet yielded.
    pub fn as_slice(&self) -> &[T] {
        // SAFETY: `start..end` are initialized and still owned by the iterator.
        unsafe {
            core::slice::from_raw_parts(self.buf.as_ptr().add(self.start), self.end - self.start)
        }
    }
}

impl<T> core::fmt::Debug for IntoIter<T>
where
    T: core::fmt::Debug,
{
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_tuple("IntoIter").field(&self.as_slice()).finish()
    }
}

impl<T> Iterator for IntoIter<T> {
    type Item = T;

    fn next(&mut self) -> Option<Self::Item> {
        if self.start == self.end {
            return None;
        }

        // SAFETY: `start < end`, so the slot is initialized; it leaves the live range.
        let element = unsafe { self.buf.as_ptr().add(self.start).read() };
        self.start += 1;
        Some(element)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.end - self.start;
        (remaining, Some(remaining))
    }
}

impl<T> DoubleEndedIterator for IntoIter<T> {
    fn next_back(&mut self) -> Option<Self::Item> {
        if self.start == self.end {
            return None;
        }

        self.end -= 1;
        // SAFETY: slot `end` was initialized and now leaves the live range.
        Some(unsafe { self.buf.as_ptr().add(self.end).read() })
    }
}

impl<T> FusedIterator for IntoIter<T> {}

impl<T> ExactSizeIterator for IntoIter<T> {
    fn len(&self) -> usize {
        self.end - self.start
    }
}

impl<T> Drop for IntoIter<T> {
    fn drop(&mut self) {
        let _block = BlockGuard {
            ptr: self.buf,
            cap: self.cap,
        };
        let remaining = self.end - self.start;

        // SAFETY: `start..end` are initialized and dropped exactly once.
        unsafe {
            let tail = ptr::slice_from_raw_parts_mut(self.buf.as_ptr().add(self.start), remaining);
            self.start = self.end;
            ptr::drop_in_place(tail);
        }
    }
}
