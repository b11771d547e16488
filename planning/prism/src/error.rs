use ppddl::errors::Message;
use thiserror::Error;

use crate::catalog::CatalogError;
use crate::effects::EffectError;
use crate::policy::PolicyError;

pub type Res<T> = std::result::Result<T, TranslationError>;

#[derive(Error, Debug)]
pub enum TranslationError {
    #[error(transparent)]
    Syntax(#[from] Message),
    #[error(transparent)]
    Catalog(#[from] CatalogError),
    #[error("in action `{action}`: {source}")]
    Effect { action: String, source: EffectError },
    #[error("`{name}` is the name of both {first} and {second}")]
    NameCollision { name: String, first: String, second: String },
    #[error(transparent)]
    Policy(#[from] PolicyError),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
