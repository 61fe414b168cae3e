//! Generic parameters functions
//!
//! Two styles of parameter access are provided:
//!
//! - [`load`] deserialises a whole parameter file into a typed struct, for modules with a fixed
//!   set of required parameters.
//! - [`ParamStore`] keeps the raw TOML tree so that plugins which are only known by name at run
//!   time (e.g. critics) can look up their own parameters, falling back to a default for anything
//!   that isn't set.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use log::warn;
use serde::de::DeserializeOwned;
use std::fs::read_to_string;
use thiserror::Error;
use toml::{self, value::Table, Value};

/// A raw parameter value
pub use toml::Value as ParamValue;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A tree of parameters addressed by a dotted namespace and a parameter name.
#[derive(Debug, Clone, Default)]
pub struct ParamStore {
    root: Table,
}

/// A view into a [`ParamStore`] scoped to one namespace.
#[derive(Debug, Clone)]
pub struct ParamGetter<'a> {
    store: &'a ParamStore,
    ns: String,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// An error that occurs during loading of a parameter file.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("The software root environment variable (MPPI_SW_ROOT) is not set")]
    SwRootNotSet,

    #[error("Cannot load the parmeter file: {0}")]
    FileLoadError(std::io::Error),

    #[error("Cannot read the parameter file: {0}")]
    DeserialiseError(toml::de::Error),
}

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Load a parameter file
///
/// The file path is relative to the "$MPPI_SW_ROOT/params" directory
pub fn load<P>(param_file_path: &str) -> Result<P, LoadError>
where
    P: DeserializeOwned,
{
    // Get the params dir
    let mut path = crate::host::get_sw_root().map_err(|_| LoadError::SwRootNotSet)?;
    path.push("params");
    path.push(param_file_path);

    // Load the file into a string
    let params_str = read_to_string(path).map_err(LoadError::FileLoadError)?;

    // Parse the string into the parameter struct
    toml::from_str(params_str.as_str()).map_err(LoadError::DeserialiseError)
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl ParamStore {
    /// Create an empty store, in which every lookup returns its default.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store from an already parsed TOML table.
    pub fn from_table(root: Table) -> Self {
        Self { root }
    }

    /// Parse a store from a TOML document.
    pub fn parse(s: &str) -> Result<Self, LoadError> {
        toml::from_str(s)
            .map(Self::from_table)
            .map_err(LoadError::DeserialiseError)
    }

    /// Load a store from a parameter file relative to "$MPPI_SW_ROOT/params".
    pub fn load(param_file_path: &str) -> Result<Self, LoadError> {
        load::<Table>(param_file_path).map(Self::from_table)
    }

    /// Get the raw value of `name` in the namespace `ns`, if it is set.
    ///
    /// `ns` is a dot separated path of tables, an empty namespace refers to the root table.
    pub fn lookup(&self, ns: &str, name: &str) -> Option<&Value> {
        let mut table = &self.root;

        for key in ns_keys(ns) {
            table = table.get(key)?.as_table()?;
        }

        table.get(name)
    }

    /// Set `name` in the namespace `ns`, creating any missing tables along the way.
    ///
    /// Any non-table value found along the namespace path is replaced by a table.
    pub fn set<V: Into<Value>>(&mut self, ns: &str, name: &str, value: V) {
        let mut table = &mut self.root;

        for key in ns_keys(ns) {
            let entry = table
                .entry(key.to_string())
                .or_insert(Value::Table(Table::new()));

            if !entry.is_table() {
                *entry = Value::Table(Table::new());
            }

            table = match entry.as_table_mut() {
                Some(t) => t,
                None => {
                    warn!("Cannot create the parameter namespace {}", ns);
                    return;
                }
            };
        }

        table.insert(name.to_string(), value.into());
    }

    /// Get a getter scoped to the given namespace.
    pub fn getter(&self, ns: &str) -> ParamGetter<'_> {
        ParamGetter {
            store: self,
            ns: ns.to_string(),
        }
    }
}

impl<'a> ParamGetter<'a> {
    /// The namespace this getter reads from.
    pub fn namespace(&self) -> &str {
        &self.ns
    }

    /// Get the parameter `name`, or `default` if it is not set.
    ///
    /// A value which is set but can't be converted into `T` is reported and replaced by the
    /// default.
    pub fn get<T>(&self, name: &str, default: T) -> T
    where
        T: DeserializeOwned,
    {
        match self.store.lookup(&self.ns, name) {
            Some(value) => match value.clone().try_into() {
                Ok(v) => v,
                Err(e) => {
                    warn!(
                        "Parameter {}.{} has an unexpected type ({}), using the default",
                        self.ns, name, e
                    );
                    default
                }
            },
            None => default,
        }
    }

    /// A getter for a namespace nested inside this one.
    pub fn nested(&self, ns: &str) -> ParamGetter<'a> {
        let ns = if self.ns.is_empty() {
            ns.to_string()
        } else {
            format!("{}.{}", self.ns, ns)
        };

        ParamGetter {
            store: self.store,
            ns,
        }
    }
}

// ---------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ---------------------------------------------------------------------------

/// Split a dotted namespace into table keys, ignoring empty components.
fn ns_keys(ns: &str) -> impl Iterator<Item = &str> {
    ns.split('.').filter(|k| !k.is_empty())
}
