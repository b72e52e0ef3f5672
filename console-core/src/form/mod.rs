//! Form items, composite field bindings and validation

mod binding;
mod field;
mod model;
mod validators;

pub use binding::{BindingSpec, BranchRule, FieldBinding, LocalState, derive_local_state};
pub use field::{FieldKind, FieldSpec, FieldView, SelectOption};
pub use model::FormModel;
pub use validators::{
    FieldValidator, NAME_WITHOUT_CJK, PatternValidator, Required, UniqueNameValidator,
    ValidationContext,
};
