//! Reference resolution and interning.
//!
//! One [`ResolveSession`] lives for exactly one pass over one foreign module. It maps
//! every foreign handle (type, method, field, generic parameter) onto a canonical,
//! de-duplicated symbol, breaking the generic owner/parameter recursion through a
//! memoized fixed point. See [`ResolveSession`] for the algorithm.

mod session;

pub use session::ResolveSession;
