//! Spec resolution for benchmark experiments and systems.
//!
//! A spec string such as `saxpy programming_model=cuda +debug` is lexed and
//! parsed into an abstract [`Spec`], then concretized against the variants
//! its type declares into an immutable [`ConcreteSpec`].

pub mod concretize;
pub mod directive;
pub mod error;
pub mod repo;
pub mod scaling;
pub mod spec;
pub mod variant;
pub mod view;

pub use concretize::{Concretizer, concretize};
pub use directive::{Capability, SpecTypeBuilder, SpecTypeDescriptor};
pub use error::{DirectiveError, SpecError, TokenizationError};
pub use repo::{ObjectType, RepoPath, Repository};
pub use spec::{ConcreteSpec, Spec, SpecLike, SpecParser, parse_all, parse_one};
pub use variant::{Variant, VariantArgs, VariantMap, VariantOptions};
