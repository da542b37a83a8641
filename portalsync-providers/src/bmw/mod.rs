//! BMW Aftersales Online System (AOS) portal.
//!
//! AOS hosts the ISTA workshop system and the E-Sys engineering tools. The
//! download lists are rendered inside nested frames and every file is
//! served through the portal's `/downloadservice/` path.
//!
//! ## Login
//!
//! The group login is identifier-first: the user name is submitted before
//! the password field appears. Success is recognized by the browser landing
//! on the AOS start page.
//!
//! ## Application Surfaces
//!
//! | Id | Categories |
//! |----|------------|
//! | `ista` | `programming_data`, `diagnostic_data`, `client` |
//! | `esys` | `psdz_data`, `launcher`, `installer` |

mod descriptor;
mod portal;
pub(crate) mod rules;

pub use descriptor::bmw_descriptor;
pub use portal::BmwPortal;
