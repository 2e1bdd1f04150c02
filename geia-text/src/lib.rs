//! Normalization of free-text maintenance records.
//!
//! Records are normalized as a batch of text values keyed by record identifier. A pipeline of
//! [`Step`]s rewrites the batch in place:
//!
//!  1. An optional [`TranslateSpec`] replaces characters by Unicode category.
//!  2. The [`AbbreviationCatalog`] expands domain shorthand, category by category.
//!  3. The built-in [`TaggerFamily`] rules turn dates, reference codes, equipment tags, hours,
//!     durations and voting ratios into canonical tags such as `<DTM: 12/03/21>`.
//!  4. [`tag_locations`] turns well mentions into `<LOC: Gu|ABC|12U>` tags, falling back to the
//!     facility of each record.
//!
//! Text inside existing tags is never rewritten, so running a pipeline on its own output does not
//! change it.
//!
//! # Example
//!
//! ```
//! use std::collections::BTreeMap;
//! use geia_text::{FacilityDirectory, PipelineContext, Step, TechnicalDocument};
//!
//! let data = BTreeMap::from([(0, "leak at well 07 since 12/03/21".to_owned())]);
//! let facilities = BTreeMap::from([(0, "Palas".to_owned())]);
//! let directory = FacilityDirectory::default();
//!
//! let context = PipelineContext {
//!     catalog: None,
//!     directory: &directory,
//!     facilities: Some(&facilities),
//! };
//!
//! let mut document = TechnicalDocument::new(data);
//! document.run(&[Step::Datetime, Step::Location], &context)?;
//!
//! assert_eq!(
//!     document.data()[&0],
//!     "leak at well <LOC: Pa|A|07> since <DTM: 12/03/21>"
//! );
//! # Ok::<(), geia_text::DocumentError>(())
//! ```

#![warn(missing_docs)]

mod catalog;
mod document;
mod location;
mod pattern;
mod substitution;
mod taggers;
mod unicode;

pub use self::catalog::*;
pub use self::document::*;
pub use self::location::*;
pub use self::pattern::*;
pub use self::substitution::*;
pub use self::taggers::*;
pub use self::unicode::*;
