//! Write operation semantics shared by every backend variant.
//!
//! Each function checks its precondition before touching the directory,
//! so a failure leaves the directory exactly as it was.

use crate::backend::Modification;
use ldapdb_common::{Dn, Error, Result};
use ldapdb_store::{Attributes, Directory, Entry};

/// Insert a new entry at `dn`
pub fn add_entry(directory: &mut Directory, dn: Dn, attributes: Attributes) -> Result<()> {
    if directory.contains(&dn) {
        return Err(Error::entry_already_exists(dn.as_str()));
    }
    directory.insert(dn, Entry::from(attributes));
    Ok(())
}

/// Remove the entry at `dn`
pub fn delete_entry(directory: &mut Directory, dn: &Dn) -> Result<Entry> {
    directory
        .remove(dn)
        .ok_or_else(|| Error::no_such_object(dn.as_str()))
}

/// Apply `changes` in order to the entry at `dn`
pub fn modify_entry(directory: &mut Directory, dn: &Dn, changes: &[Modification]) -> Result<()> {
    let entry = directory
        .get_mut(dn)
        .ok_or_else(|| Error::no_such_object(dn.as_str()))?;
    for change in changes {
        change.apply(entry);
    }
    Ok(())
}
