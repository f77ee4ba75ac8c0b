//! Persisted record types
//!
//! Location records keep the snake_case keys of the geocoder payloads they
//! are built from; contact records use the camelCase keys the browser forms
//! submit. Unknown keys are carried through untouched on both.

pub mod contact;
pub mod location;

pub use contact::ContactRecord;
pub use location::{
    unique_tags, AddressComponent, FreeForm, Geometry, LatLng, LocationDocument, LocationRecord,
};
