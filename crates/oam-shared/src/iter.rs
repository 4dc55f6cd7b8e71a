//! A fallible counterpart to [`FromIterator`], used by [`crate::kvp`] to build validated
//! collections (like [`crate::kvp::Labels`]) from raw string tuples.
pub trait TryFromIterator<A>: Sized {
    type Error;

    fn try_from_iter<I: IntoIterator<Item = A>>(iter: I) -> Result<Self, Self::Error>;
}
