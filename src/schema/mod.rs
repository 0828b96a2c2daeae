//! Raw activity payload schema
//!
//! This module defines the source-tagged input accepted from collaborators:
//! head-unit recordings (`device`), cloud activity exports (`cloud`) and
//! manually typed workout logs (`manual`). Every field is optional and numeric
//! fields are decoded leniently so partial or sloppy payloads still parse.

mod lenient;
mod payload;

pub use payload::*;

pub(crate) use lenient::offset_by_seconds;
