//! Mercedes-Benz XENTRY portal.
//!
//! The XENTRY download center lists its packages as buttons whose inline
//! action starts the download. The button text is generic, so the file
//! name is recovered from the surrounding row (`<name>.<ext> (<size>)`).
//!
//! Login success is recognized from the identity banner of the
//! authenticated area rather than from the address, which stays on the
//! same single-page application.

mod descriptor;
mod portal;
pub(crate) mod rules;

pub use descriptor::mercedes_descriptor;
pub use portal::MercedesPortal;
