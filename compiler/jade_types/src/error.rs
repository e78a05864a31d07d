//! Registration errors.

use std::fmt;

use jade_ir::Name;

use crate::TypeId;

/// Error produced by type registration.
///
/// Registration failures are fatal for the registering statement only; the
/// driver collects them and keeps analyzing.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum RegistryError {
    /// A type with this name is already registered.
    DuplicateType(Name),
    /// A declared supertype id does not refer to a registered type.
    UnknownSupertype(TypeId),
    /// Adding the declared edges would create a cycle in the supertype graph.
    CyclicSupertypes {
        /// The type whose registration was refused.
        type_id: TypeId,
        /// The supertype edge that would close the cycle.
        through: TypeId,
    },
    /// A shape operation was attempted on a non-shape type.
    NotAShape(TypeId),
}

impl fmt::Display for RegistryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegistryError::DuplicateType(name) => {
                write!(f, "type with name {name:?} is already registered")
            }
            RegistryError::UnknownSupertype(id) => {
                write!(f, "supertype {id} is not a registered type")
            }
            RegistryError::CyclicSupertypes { type_id, through } => {
                write!(
                    f,
                    "registering {type_id} with supertype {through} would create a cycle"
                )
            }
            RegistryError::NotAShape(id) => {
                write!(f, "{id} is not a shape type")
            }
        }
    }
}

impl std::error::Error for RegistryError {}
