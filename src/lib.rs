pub mod notary;
pub mod params;
pub mod protocol;
pub mod source;
pub mod tag;

pub use notary::{Directive, NotaryError, NotaryLayout, NotaryResult};
pub use params::{GetParams, ParamsError, ParamsResult, PutParams};
pub use protocol::{CheckRequest, InRequest, OutRequest, Response};
pub use source::{ContentTrust, MetadataField, Source, Version, DEFAULT_TAG};
pub use tag::Tag;
