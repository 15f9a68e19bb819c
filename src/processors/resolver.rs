//! Schema resolution: attach a [`ColumnMapping`] to a raw table.
//!
//! A mapping comes from one of three places, in order: a caller-supplied
//! known mapping, a named entry in the [`SchemaStore`], or manual
//! field-by-field assignment through a [`Prompter`]. Manually built mappings
//! may be saved back to the store.

use thiserror::Error;

use crate::core::loaders::RawTable;
use crate::core::schema::{ColumnMapping, Field, MappingBuilder, Result, SchemaError, SchemaStore};

/// Failure of the interactive collaborator itself (not a bad answer).
#[derive(Error, Debug)]
pub enum PromptError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("input closed before an answer was given")]
    Closed,
}

/// Result type for prompter answers.
pub type PromptResult<T> = std::result::Result<T, PromptError>;

/// Interactive collaborator consulted during resolution.
///
/// Implementations own any re-prompting for malformed answers; the resolver
/// treats whatever they return as final.
pub trait Prompter {
    /// Pick one of `names`, or `None` to build a mapping by hand.
    fn choose_from_list(&mut self, names: &[String]) -> PromptResult<Option<String>>;

    /// Column position holding `field` in `table`.
    fn column_for(&mut self, field: Field, table: &RawTable) -> PromptResult<usize>;

    /// Name to save `mapping` under, or `None` to skip saving.
    fn confirm_save(&mut self, mapping: &ColumnMapping) -> PromptResult<Option<String>>;
}

/// Validate a known mapping against `table`.
pub fn resolve_known(table: &RawTable, mapping: &ColumnMapping) -> Result<ColumnMapping> {
    mapping.validate_width(table.width())?;
    Ok(mapping.clone())
}

/// Resolve by schema name without prompting.
pub fn resolve_named<S: SchemaStore + ?Sized>(
    store: &S,
    table: &RawTable,
    name: &str,
) -> Result<ColumnMapping> {
    let mapping = store
        .lookup(name)
        .ok_or_else(|| SchemaError::UnknownSchema(name.to_string()))?;
    log::info!("Using schema '{}'", name);
    resolve_known(table, &mapping)
}

pub struct SchemaResolver<'a, S: SchemaStore + ?Sized, P: Prompter + ?Sized> {
    store: &'a mut S,
    prompter: &'a mut P,
}

impl<'a, S: SchemaStore + ?Sized, P: Prompter + ?Sized> SchemaResolver<'a, S, P> {
    pub fn new(store: &'a mut S, prompter: &'a mut P) -> Self {
        Self { store, prompter }
    }

    /// Resolve the mapping for `table`.
    ///
    /// With `known` set, the store and prompter are not consulted. The store
    /// is only written when a manually built mapping is confirmed for saving.
    ///
    /// # Errors
    ///
    /// [`SchemaError`] for invalid mappings, unknown schema choices,
    /// out-of-range or reused columns, and prompt or library I/O failures.
    pub fn resolve(
        &mut self,
        table: &RawTable,
        known: Option<&ColumnMapping>,
    ) -> Result<ColumnMapping> {
        if let Some(mapping) = known {
            return resolve_known(table, mapping);
        }

        let names = self.store.names();
        if !names.is_empty() {
            if let Some(name) = self.prompter.choose_from_list(&names)? {
                return resolve_named(&*self.store, table, &name);
            }
        }

        let mapping = self.assign_manually(table)?;

        if let Some(name) = self.prompter.confirm_save(&mapping)? {
            self.store.save(&name, &mapping)?;
        }

        Ok(mapping)
    }

    fn assign_manually(&mut self, table: &RawTable) -> Result<ColumnMapping> {
        let mut builder = MappingBuilder::new(table.width());
        for field in Field::prompt_order() {
            let column = self.prompter.column_for(field, table)?;
            builder.assign(column, field)?;
            log::debug!("Assigned column {} to {}", column, field);
        }
        builder.build()
    }
}
